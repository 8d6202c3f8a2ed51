use std::str::FromStr;

use rust_decimal::Decimal;

use crate::{ast::Token, diagnostics::LexError};

/// Delimiters accepted after `m` to open a regex literal (`m#...#`).
const REGEX_DELIMITERS: &[char] = &['#', '|', '!', ',', ';', ':', '@'];

/// Sub-mode the lexer is in. Strings and variable references nest one level
/// deep: a string may contain `%{...}`, but a variable may not contain a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    String { quote: char, start: usize },
    Variable { start: usize },
}

pub struct Lexer {
    input: Vec<(usize, char)>,
    source_len: usize,
    position: usize,
    token_offset: usize,
    modes: Vec<Mode>,
    template: bool,
    // Set after `=~`, `!~` and unary tests, the only places `m#...#` may start
    regex_allowed: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.char_indices().collect(),
            source_len: input.len(),
            position: 0,
            token_offset: 0,
            modes: vec![Mode::Normal],
            template: false,
            regex_allowed: false,
        }
    }

    /// Lexer for string-template mode: the whole input is the body of a
    /// string with no surrounding quotes. Produces the tokens of a quoted
    /// string without `StrBegin`/`StrEnd`, then `Eof`.
    pub fn template(input: &str) -> Self {
        let mut lexer = Lexer::new(input);
        // NUL acts as the closing quote, so it is rejected in template text
        lexer.modes = vec![Mode::String {
            quote: '\0',
            start: 0,
        }];
        lexer.template = true;
        lexer
    }

    /// Byte offset where the most recently returned token starts.
    pub fn token_offset(&self) -> usize {
        self.token_offset
    }

    /// Byte offset of the cursor.
    pub fn offset(&self) -> usize {
        self.input
            .get(self.position)
            .map_or(self.source_len, |(offset, _)| *offset)
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).map(|(_, c)| *c)
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).map(|(_, c)| *c)
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn mode(&self) -> Mode {
        self.modes.last().copied().unwrap_or(Mode::Normal)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_number(&mut self, negative: bool) -> Result<Token, LexError> {
        let start = self.token_offset;
        let mut number = String::new();
        if negative {
            number.push('-');
        }
        let mut is_decimal = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_decimal
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_decimal = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Decimal::from_str(&number)
            .map(Token::Number)
            .map_err(|e| LexError::new(format!("invalid number '{number}': {e}"), start))
    }

    /// Reads the body of a regex literal after its opening delimiter, plus an
    /// optional trailing `i` flag.
    fn read_regex(&mut self, delimiter: char) -> Result<Token, LexError> {
        let start = self.token_offset;
        let mut pattern = String::new();

        loop {
            match self.current_char() {
                None => return Err(LexError::new("unterminated regex literal", start)),
                Some(c) if c == delimiter => {
                    self.advance();
                    break;
                }
                Some('\\') if self.peek_char(1) == Some(delimiter) => {
                    pattern.push(delimiter);
                    self.advance();
                    self.advance();
                }
                Some('\\') => {
                    pattern.push('\\');
                    self.advance();
                    if let Some(c) = self.current_char() {
                        pattern.push(c);
                        self.advance();
                    }
                }
                Some(c) => {
                    pattern.push(c);
                    self.advance();
                }
            }
        }

        let case_insensitive = self.current_char() == Some('i')
            && !self
                .peek_char(1)
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
        if case_insensitive {
            self.advance();
        }

        Ok(Token::Regex {
            pattern,
            case_insensitive,
        })
    }

    fn read_backref(&mut self) -> Token {
        self.advance(); // consume '$'
        let digit = self.current_char().and_then(|c| c.to_digit(10)).unwrap_or(0);
        self.advance();
        Token::Backref(digit as usize)
    }

    fn begin_variable(&mut self) -> Token {
        let start = self.token_offset;
        self.advance(); // '%'
        self.advance(); // '{'
        self.modes.push(Mode::Variable { start });
        Token::VarBegin
    }

    fn begin_string(&mut self, quote: char) -> Token {
        let start = self.token_offset;
        self.advance();
        self.modes.push(Mode::String { quote, start });
        Token::StrBegin
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        if self.template && self.modes.len() == 1 && self.current_char().is_none() {
            self.token_offset = self.source_len;
            return Ok(Token::Eof);
        }

        match self.mode() {
            Mode::Normal => {
                let token = self.next_normal_token()?;
                self.regex_allowed =
                    matches!(token, Token::Match | Token::NotMatch | Token::UnaryOp(_));
                Ok(token)
            }
            Mode::String { quote, start } => {
                self.regex_allowed = false;
                self.next_string_token(quote, start)
            }
            Mode::Variable { start } => {
                self.regex_allowed = false;
                self.next_variable_token(start)
            }
        }
    }

    fn next_string_token(&mut self, quote: char, start: usize) -> Result<Token, LexError> {
        self.token_offset = self.offset();

        match self.current_char() {
            None => Err(LexError::new("unterminated string literal", start)),
            Some(c) if c == quote => {
                self.advance();
                self.modes.pop();
                Ok(Token::StrEnd)
            }
            Some('%') if self.peek_char(1) == Some('{') => Ok(self.begin_variable()),
            Some('$') if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => {
                Ok(self.read_backref())
            }
            Some(_) => self.read_string_text(quote, start),
        }
    }

    fn read_string_text(&mut self, quote: char, start: usize) -> Result<Token, LexError> {
        let mut result = String::new();

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => break,
                '%' if self.peek_char(1) == Some('{') => break,
                '$' if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => break,
                '\\' => {
                    let escape_offset = self.offset();
                    self.advance(); // Consume backslash
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some(c @ ('"' | '\'' | '\\' | '$' | '%')) => result.push(c),
                        Some(c) => {
                            return Err(LexError::new(
                                format!("invalid escape sequence '\\{c}'"),
                                escape_offset,
                            ));
                        }
                        None => return Err(LexError::new("unterminated string literal", start)),
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Ok(Token::StrText(result))
    }

    fn next_variable_token(&mut self, start: usize) -> Result<Token, LexError> {
        self.skip_whitespace();
        self.token_offset = self.offset();

        match self.current_char() {
            None => Err(LexError::new("unterminated variable reference", start)),
            Some('}') => {
                self.advance();
                self.modes.pop();
                Ok(Token::VarEnd)
            }
            Some(':') => {
                self.advance();
                let mut arg = String::new();
                while let Some(ch) = self.current_char() {
                    if ch == '}' {
                        return Ok(Token::VarArg(arg));
                    }
                    arg.push(ch);
                    self.advance();
                }
                Err(LexError::new("unterminated variable reference", start))
            }
            Some(ch) if ch.is_ascii_alphanumeric() || ch == '_' => {
                Ok(Token::Identifier(self.read_identifier()))
            }
            Some(ch) => Err(LexError::new(
                format!("unexpected character '{ch}' in variable reference"),
                self.token_offset,
            )),
        }
    }

    fn next_normal_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        self.token_offset = self.offset();

        let token = match self.current_char() {
            None => Token::Eof,
            Some('"') => self.begin_string('"'),
            Some('\'') => self.begin_string('\''),
            Some('%') if self.peek_char(1) == Some('{') => self.begin_variable(),
            Some('$') if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.read_backref()
            }
            Some('/') => {
                self.advance();
                self.read_regex('/')?
            }
            Some('(') => {
                self.advance();
                Token::LParen
            }
            Some(')') => {
                self.advance();
                Token::RParen
            }
            Some('{') => {
                self.advance();
                Token::LBrace
            }
            Some('}') => {
                self.advance();
                Token::RBrace
            }
            Some(',') => {
                self.advance();
                Token::Comma
            }
            Some('.') => {
                self.advance();
                Token::Dot
            }
            Some('&') if self.peek_char(1) == Some('&') => {
                self.advance();
                self.advance();
                Token::And
            }
            Some('|') if self.peek_char(1) == Some('|') => {
                self.advance();
                self.advance();
                Token::Or
            }
            Some('=') => {
                self.advance();
                match self.current_char() {
                    Some('=') => {
                        self.advance();
                        Token::EqEq
                    }
                    Some('~') => {
                        self.advance();
                        Token::Match
                    }
                    _ => Token::EqEq,
                }
            }
            Some('!') => {
                self.advance();
                match self.current_char() {
                    Some('=') => {
                        self.advance();
                        Token::NotEq
                    }
                    Some('~') => {
                        self.advance();
                        Token::NotMatch
                    }
                    _ => Token::Not,
                }
            }
            Some('<') => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.advance();
                    Token::LtEq
                } else {
                    Token::Lt
                }
            }
            Some('>') => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.advance();
                    Token::GtEq
                } else {
                    Token::Gt
                }
            }
            Some('-') if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.advance();
                self.read_number(true)?
            }
            Some('-') if self.peek_char(1).is_some_and(|c| c.is_ascii_alphabetic() || c == '_') => {
                self.advance();
                let word = self.read_identifier();
                match word.as_str() {
                    "eq" => Token::NumEq,
                    "ne" => Token::NumNe,
                    "lt" => Token::NumLt,
                    "le" => Token::NumLe,
                    "gt" => Token::NumGt,
                    "ge" => Token::NumGe,
                    _ if word.chars().count() == 1 => Token::UnaryOp(format!("-{word}")),
                    _ => Token::BinaryOp(format!("-{word}")),
                }
            }
            Some('m')
                if self.regex_allowed
                    && self.peek_char(1).is_some_and(|c| REGEX_DELIMITERS.contains(&c)) =>
            {
                self.advance();
                let delimiter = self.current_char().unwrap_or('/');
                self.advance();
                self.read_regex(delimiter)?
            }
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();

                match ident.as_str() {
                    "true" => Token::Boolean(true),
                    "false" => Token::Boolean(false),
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    "eq" => Token::NumEq,
                    "ne" => Token::NumNe,
                    "lt" => Token::NumLt,
                    "le" => Token::NumLe,
                    "gt" => Token::NumGt,
                    "ge" => Token::NumGe,
                    _ => Token::Identifier(ident),
                }
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number(false)?,
            Some(ch) => {
                return Err(LexError::new(
                    format!("unexpected character '{ch}'"),
                    self.token_offset,
                ));
            }
        };

        Ok(token)
    }
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("true false and or not in");
    assert_eq!(lexer.next_token().unwrap(), Token::Boolean(true));
    assert_eq!(lexer.next_token().unwrap(), Token::Boolean(false));
    assert_eq!(lexer.next_token().unwrap(), Token::And);
    assert_eq!(lexer.next_token().unwrap(), Token::Or);
    assert_eq!(lexer.next_token().unwrap(), Token::Not);
    assert_eq!(lexer.next_token().unwrap(), Token::In);
    assert_eq!(lexer.next_token().unwrap(), Token::Eof);
}

#[test]
fn test_token_offsets() {
    let mut lexer = Lexer::new("%{HOST} == \"x\"");
    assert_eq!(lexer.next_token().unwrap(), Token::VarBegin);
    assert_eq!(lexer.token_offset(), 0);
    assert_eq!(lexer.next_token().unwrap(), Token::Identifier("HOST".to_string()));
    assert_eq!(lexer.token_offset(), 2);
    assert_eq!(lexer.next_token().unwrap(), Token::VarEnd);
    assert_eq!(lexer.next_token().unwrap(), Token::EqEq);
    assert_eq!(lexer.token_offset(), 8);
    assert_eq!(lexer.next_token().unwrap(), Token::StrBegin);
    assert_eq!(lexer.token_offset(), 11);
}
