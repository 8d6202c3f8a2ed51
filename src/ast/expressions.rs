use regex::Regex;
use rust_decimal::Decimal;

use crate::ast::{CmpOp, LogicalOp};

/// Abstract Syntax Tree node representing a parsed expression.
///
/// The tree is built once by the parser and never modified afterwards; every
/// node owns its children.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Literals
    /// Boolean literal
    Boolean(bool),

    /// Numeric literal
    ///
    /// # Example
    /// ```text
    /// 42
    /// 1.5
    /// ```
    Number(Decimal),

    /// String literal with interpolated segments
    ///
    /// # Example
    /// ```text
    /// "Host: %{HTTP_HOST}, first group: $1"
    /// ```
    String(Vec<StringPart>),

    // References
    /// Variable reference resolved by the runtime context
    ///
    /// # Examples
    /// ```text
    /// %{REQUEST_URI}      // Variable { name: "REQUEST_URI", args: [] }
    /// %{HTTP:Accept}      // Variable { name: "HTTP", args: ["Accept"] }
    /// ```
    Variable { name: String, args: Vec<String> },

    /// Bare backreference to a capture group of the last regex match (`$1`)
    Backref(usize),

    // Operations
    /// Logical negation (`!`)
    Not(Box<Expr>),

    /// Short-circuit logical operation
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Numeric or string comparison
    Comparison {
        op: CmpOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Regex match (`=~`) or non-match (`!~`)
    Match {
        negated: bool,
        subject: Box<Expr>,
        regex: RegexLiteral,
    },

    /// Membership test against a braced list
    ///
    /// # Example
    /// ```text
    /// %{REQUEST_METHOD} in {"GET", "HEAD"}
    /// ```
    In { needle: Box<Expr>, list: Vec<Expr> },

    /// String concatenation (`.`)
    Concat(Vec<Expr>),

    /// Function call
    ///
    /// # Example
    /// ```text
    /// tolower(%{HTTP_HOST})
    /// ```
    Call { name: String, args: Vec<Expr> },

    /// Single-operand test operator
    ///
    /// # Example
    /// ```text
    /// -z %{QUERY_STRING}
    /// ```
    UnaryTest { op: String, operand: Box<Expr> },

    /// Two-operand word operator
    ///
    /// # Example
    /// ```text
    /// %{REMOTE_ADDR} -ipmatch "192.168.0.0/16"
    /// ```
    BinaryTest {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

/// One segment of an interpolated string literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringPart {
    Text(String),
    Variable { name: String, args: Vec<String> },
    Backref(usize),
}

/// A regex literal compiled when the expression was parsed.
///
/// Equality compares the source pattern and flag, so two parses of the same
/// text produce equal trees.
#[derive(Debug, Clone)]
pub struct RegexLiteral {
    pub pattern: String,
    pub case_insensitive: bool,
    pub regex: Regex,
}

impl PartialEq for RegexLiteral {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.case_insensitive == other.case_insensitive
    }
}
