//! Structured errors for parsing and evaluation.
//!
//! Every failure carries an [`ErrorKind`] and a message. Parse-time failures
//! also carry the byte offset into the source text where the problem starts.

use std::fmt;

/// The category of a parse or evaluation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed token (unterminated string or regex, bad escape, stray character)
    Lexical,
    /// Grammar violation, including unexpected end of input
    Syntax,
    /// Regex literal that does not compile
    RegexCompile,
    /// Operand of the wrong type for a function or operator
    TypeMismatch,
    /// Variable lookup that the host reported as a hard failure
    UnknownVariable,
    /// Call to a function or operator missing from the function table
    UnknownFunction,
    /// Function called with the wrong number of arguments
    Arity,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Lexical => "lexical error",
            ErrorKind::Syntax => "syntax error",
            ErrorKind::RegexCompile => "regex error",
            ErrorKind::TypeMismatch => "type error",
            ErrorKind::UnknownVariable => "variable error",
            ErrorKind::UnknownFunction => "unknown function",
            ErrorKind::Arity => "arity error",
        };
        f.write_str(name)
    }
}

/// Error produced by the lexer. Converted into a [`ParseError`] of kind
/// [`ErrorKind::Lexical`] by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub offset: usize,
}

impl LexError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        LexError {
            message: message.into(),
            offset,
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for LexError {}

/// A failed parse. No tree is produced alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ErrorKind,
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, offset: usize) -> Self {
        ParseError {
            kind,
            message: message.into(),
            offset,
        }
    }

    pub fn syntax(message: impl Into<String>, offset: usize) -> Self {
        Self::new(ErrorKind::Syntax, message, offset)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}: {}", self.kind, self.offset, self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError::new(ErrorKind::Lexical, e.message, e.offset)
    }
}

/// A failed evaluation. The compiled expression stays usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError {
    pub kind: ErrorKind,
    pub message: String,
}

impl EvalError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        EvalError {
            kind,
            message: message.into(),
        }
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, message)
    }

    pub fn unknown_function(name: &str) -> Self {
        Self::new(ErrorKind::UnknownFunction, format!("unknown function '{name}'"))
    }

    pub fn arity(name: &str, expected: usize, got: usize) -> Self {
        Self::new(
            ErrorKind::Arity,
            format!("'{name}' takes {expected} argument(s), got {got}"),
        )
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for EvalError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_error_becomes_lexical_parse_error() {
        let err: ParseError = LexError::new("unterminated string", 4).into();
        assert_eq!(err.kind, ErrorKind::Lexical);
        assert_eq!(err.offset, 4);
        assert_eq!(err.to_string(), "lexical error at offset 4: unterminated string");
    }

    #[test]
    fn arity_message() {
        let err = EvalError::arity("tolower", 1, 2);
        assert_eq!(err.kind, ErrorKind::Arity);
        assert_eq!(err.to_string(), "arity error: 'tolower' takes 1 argument(s), got 2");
    }
}
