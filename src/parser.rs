use std::mem;

use regex::RegexBuilder;

use crate::{
    ast::{CmpOp, Expr, LogicalOp, RegexLiteral, StringPart, Token},
    diagnostics::{ErrorKind, ParseError},
    expression::ParseOptions,
    lexer::Lexer,
};

/// Nesting limit for `!`, parentheses and call arguments. Deeper input is a
/// syntax error rather than a stack overflow.
pub const MAX_NESTING_DEPTH: usize = 128;

/// `-R arg` is shorthand for `%{REMOTE_ADDR} -ipmatch arg`, or for
/// `%{REMOTE_ADDR} =~ arg` when `arg` is a regex literal.
const REMOTE_ADDR_TEST: &str = "-R";
const REMOTE_ADDR_VARIABLE: &str = "REMOTE_ADDR";

/// Precedence-climbing parser for the condition language.
///
/// Precedence, lowest first: `||`, `&&`, `!`, comparison/match/membership,
/// concatenation `.`, primary. The first error aborts the parse.
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    current_offset: usize,
    options: ParseOptions,
    depth: usize,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Result<Self, ParseError> {
        Self::with_options(lexer, ParseOptions::default())
    }

    pub fn with_options(mut lexer: Lexer, options: ParseOptions) -> Result<Self, ParseError> {
        let current_token = lexer.next_token()?;
        let current_offset = lexer.token_offset();
        Ok(Parser {
            lexer,
            current_token,
            current_offset,
            options,
            depth: 0,
        })
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.current_token = self.lexer.next_token()?;
        self.current_offset = self.lexer.token_offset();
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if !self.check(&expected) {
            return Err(self.unexpected(&format!("expected {}", expected.describe())));
        }
        self.advance()
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current_token) == mem::discriminant(token)
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::syntax(
                "expression nested too deeply",
                self.current_offset,
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn unexpected(&self, context: &str) -> ParseError {
        ParseError::syntax(
            format!("{context}, found {}", self.current_token.describe()),
            self.current_offset,
        )
    }

    /// Parse a complete boolean expression; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expression()?;
        if !self.check(&Token::Eof) {
            return Err(self.unexpected("expected end of input"));
        }
        Ok(expr)
    }

    /// Parse a string template produced by [`Lexer::template`].
    pub fn parse_template(&mut self) -> Result<Expr, ParseError> {
        let mut parts = vec![];

        loop {
            match mem::replace(&mut self.current_token, Token::Eof) {
                Token::Eof => break,
                Token::StrText(text) => {
                    self.advance()?;
                    parts.push(StringPart::Text(text));
                }
                Token::Backref(n) => {
                    self.advance()?;
                    parts.push(StringPart::Backref(n));
                }
                Token::VarBegin => {
                    self.advance()?;
                    let (name, args) = self.parse_variable_body()?;
                    parts.push(StringPart::Variable { name, args });
                }
                token => {
                    self.current_token = token;
                    return Err(self.unexpected("unexpected token in template"));
                }
            }
        }

        Ok(Expr::String(parts))
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;

        while self.check(&Token::Or) {
            self.advance()?;
            let right = self.parse_and()?;

            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;

        while self.check(&Token::And) {
            self.advance()?;
            let right = self.parse_not()?;

            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.check(&Token::Not) {
            self.enter()?;
            self.advance()?;
            let operand = self.parse_not()?;
            self.leave();
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.parse_comparison()
    }

    fn comparison_op(&self) -> Option<CmpOp> {
        match &self.current_token {
            Token::NumEq => Some(CmpOp::NumEqual),
            Token::NumNe => Some(CmpOp::NumNotEqual),
            Token::NumLt => Some(CmpOp::NumLessThan),
            Token::NumLe => Some(CmpOp::NumLessEqual),
            Token::NumGt => Some(CmpOp::NumGreaterThan),
            Token::NumGe => Some(CmpOp::NumGreaterEqual),
            Token::EqEq => Some(CmpOp::StrEqual),
            Token::NotEq => Some(CmpOp::StrNotEqual),
            Token::Lt => Some(CmpOp::StrLessThan),
            Token::LtEq => Some(CmpOp::StrLessEqual),
            Token::Gt => Some(CmpOp::StrGreaterThan),
            Token::GtEq => Some(CmpOp::StrGreaterEqual),
            _ => None,
        }
    }

    fn at_relational_operator(&self) -> bool {
        self.comparison_op().is_some()
            || matches!(
                self.current_token,
                Token::Match | Token::NotMatch | Token::In | Token::BinaryOp(_)
            )
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let expr = if let Token::UnaryOp(op) = &self.current_token {
            let op = op.clone();
            self.advance()?;
            if op == REMOTE_ADDR_TEST {
                self.parse_remote_addr_test()?
            } else {
                let operand = self.parse_concat()?;
                Expr::UnaryTest {
                    op,
                    operand: Box::new(operand),
                }
            }
        } else {
            let left = self.parse_concat()?;
            self.parse_relation(left)?
        };

        // Comparisons are non-associative: `a == b == c` is rejected
        if self.at_relational_operator() {
            return Err(self.unexpected("comparison operators cannot be chained"));
        }
        Ok(expr)
    }

    /// Operand of `-R`, rewritten against the client address variable.
    fn parse_remote_addr_test(&mut self) -> Result<Expr, ParseError> {
        let subject = Box::new(Expr::Variable {
            name: REMOTE_ADDR_VARIABLE.to_string(),
            args: vec![],
        });

        if matches!(self.current_token, Token::Regex { .. }) {
            let regex = self.parse_regex_literal()?;
            return Ok(Expr::Match {
                negated: false,
                subject,
                regex,
            });
        }

        let network = self.parse_concat()?;
        Ok(Expr::BinaryTest {
            op: "-ipmatch".to_string(),
            left: subject,
            right: Box::new(network),
        })
    }

    fn parse_relation(&mut self, left: Expr) -> Result<Expr, ParseError> {
        if let Some(op) = self.comparison_op() {
            self.advance()?;
            let right = self.parse_concat()?;
            return Ok(Expr::Comparison {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        match &self.current_token {
            Token::Match | Token::NotMatch => {
                let negated = self.check(&Token::NotMatch);
                self.advance()?;
                let regex = self.parse_regex_literal()?;
                Ok(Expr::Match {
                    negated,
                    subject: Box::new(left),
                    regex,
                })
            }
            Token::In => {
                self.advance()?;
                let list = self.parse_list()?;
                Ok(Expr::In {
                    needle: Box::new(left),
                    list,
                })
            }
            Token::BinaryOp(op) => {
                let op = op.clone();
                self.advance()?;
                let right = self.parse_concat()?;
                Ok(Expr::BinaryTest {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            _ => Ok(left),
        }
    }

    /// Compile the regex literal at the cursor. Compilation happens here so
    /// the finished tree needs no lazy state.
    fn parse_regex_literal(&mut self) -> Result<RegexLiteral, ParseError> {
        let offset = self.current_offset;
        let Token::Regex {
            pattern,
            case_insensitive,
        } = &self.current_token
        else {
            return Err(self.unexpected("expected regex literal"));
        };

        let case_insensitive = *case_insensitive || self.options.case_insensitive_regex;
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| {
                ParseError::new(
                    ErrorKind::RegexCompile,
                    format!("invalid regex /{pattern}/: {e}"),
                    offset,
                )
            })?;

        let literal = RegexLiteral {
            pattern: pattern.clone(),
            case_insensitive,
            regex,
        };
        self.advance()?;
        Ok(literal)
    }

    fn parse_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(Token::LBrace)?;
        let mut elements = vec![];

        while !self.check(&Token::RBrace) {
            elements.push(self.parse_concat()?);

            if !self.check(&Token::RBrace) {
                self.expect(Token::Comma)?;
            }
        }

        self.expect(Token::RBrace)?;
        Ok(elements)
    }

    fn parse_concat(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_primary()?;
        if !self.check(&Token::Dot) {
            return Ok(first);
        }

        let mut parts = vec![first];
        while self.check(&Token::Dot) {
            self.advance()?;
            parts.push(self.parse_primary()?);
        }
        Ok(Expr::Concat(parts))
    }

    /// Parse primary expressions: literals, strings, variables, backreferences,
    /// function calls and parenthesized sub-expressions.
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Boolean(b) => {
                self.advance()?;
                Ok(Expr::Boolean(b))
            }
            Token::Number(n) => {
                self.advance()?;
                Ok(Expr::Number(n))
            }
            Token::StrBegin => {
                self.advance()?;
                self.parse_string_body()
            }
            Token::VarBegin => {
                self.advance()?;
                let (name, args) = self.parse_variable_body()?;
                Ok(Expr::Variable { name, args })
            }
            Token::Backref(n) => {
                self.advance()?;
                Ok(Expr::Backref(n))
            }
            Token::Identifier(name) => {
                self.advance()?;
                if self.check(&Token::LParen) {
                    self.enter()?;
                    self.advance()?;
                    let args = self.parse_call_args()?;
                    self.leave();
                    Ok(Expr::Call { name, args })
                } else {
                    // A bare word is a string literal
                    Ok(Expr::String(vec![StringPart::Text(name)]))
                }
            }
            Token::LParen => {
                self.enter()?;
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                self.leave();
                Ok(expr)
            }
            token @ Token::Regex { .. } => {
                self.current_token = token;
                Err(self.unexpected("a regex literal must follow '=~', '!~' or '-R'"))
            }
            Token::Eof => Err(ParseError::syntax(
                "unexpected end of input, expected an operand",
                self.current_offset,
            )),
            token => {
                self.current_token = token;
                Err(self.unexpected("expected an operand"))
            }
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = vec![];

        while !self.check(&Token::RParen) {
            args.push(self.parse_concat()?);

            if !self.check(&Token::RParen) {
                self.expect(Token::Comma)?;
            }
        }

        self.expect(Token::RParen)?;
        Ok(args)
    }

    /// Parse the inside of a quoted string; the opening quote is consumed.
    fn parse_string_body(&mut self) -> Result<Expr, ParseError> {
        let mut parts = vec![];

        loop {
            match mem::replace(&mut self.current_token, Token::Eof) {
                Token::StrEnd => {
                    self.advance()?;
                    break;
                }
                Token::StrText(text) => {
                    self.advance()?;
                    parts.push(StringPart::Text(text));
                }
                Token::Backref(n) => {
                    self.advance()?;
                    parts.push(StringPart::Backref(n));
                }
                Token::VarBegin => {
                    self.advance()?;
                    let (name, args) = self.parse_variable_body()?;
                    parts.push(StringPart::Variable { name, args });
                }
                token => {
                    self.current_token = token;
                    return Err(self.unexpected("unexpected token in string"));
                }
            }
        }

        Ok(Expr::String(parts))
    }

    /// Parse `NAME[:arg]}`; the `%{` is consumed.
    fn parse_variable_body(&mut self) -> Result<(String, Vec<String>), ParseError> {
        let name = match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Identifier(name) => name,
            token => {
                self.current_token = token;
                return Err(self.unexpected("expected variable name after '%{'"));
            }
        };
        self.advance()?;

        let mut args = vec![];
        if let Token::VarArg(arg) = &self.current_token {
            args.push(arg.clone());
            self.advance()?;
        }

        self.expect(Token::VarEnd)?;
        Ok((name, args))
    }
}
