use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Boolean values
    ///
    /// # Examples
    /// ```text
    /// true
    /// false
    /// ```
    Boolean(bool),

    /// Integer or decimal number
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 3.14
    /// -1
    /// ```
    Number(Decimal),

    /// Function name or keyword-like word
    ///
    /// Must start with letter or underscore, followed by letters, digits, or underscores.
    ///
    /// # Examples
    /// ```text
    /// tolower
    /// file_size
    /// ```
    Identifier(String),

    // Strings
    /// Opening quote of a string literal (`"` or `'`)
    StrBegin,

    /// Literal text inside a string, escapes already resolved
    StrText(String),

    /// Closing quote of a string literal
    StrEnd,

    // Variables
    /// Start of a variable reference (`%{`)
    VarBegin,

    /// Argument of a variable reference, the raw text after `:`
    ///
    /// # Examples
    /// ```text
    /// %{HTTP:Accept-Language}   // VarArg("Accept-Language")
    /// ```
    VarArg(String),

    /// End of a variable reference (`}`)
    VarEnd,

    /// Positional backreference (`$0` through `$9`)
    Backref(usize),

    /// Regex literal
    ///
    /// # Examples
    /// ```text
    /// /^www\./
    /// m#^/api/#i
    /// ```
    Regex {
        pattern: String,
        case_insensitive: bool,
    },

    // Operators
    /// Single-letter test operator
    ///
    /// # Examples
    /// ```text
    /// -n %{QUERY_STRING}
    /// -f "/etc/passwd"
    /// ```
    UnaryOp(String),

    /// Word test operator between two operands
    ///
    /// # Examples
    /// ```text
    /// %{REMOTE_ADDR} -ipmatch "10.0.0.0/8"
    /// ```
    BinaryOp(String),

    // Numeric comparison
    /// `-eq` or `eq`
    NumEq,
    /// `-ne` or `ne`
    NumNe,
    /// `-lt` or `lt`
    NumLt,
    /// `-le` or `le`
    NumLe,
    /// `-gt` or `gt`
    NumGt,
    /// `-ge` or `ge`
    NumGe,

    // String comparison
    /// `==` or `=`
    EqEq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,

    // Regex
    /// `=~`
    Match,
    /// `!~`
    NotMatch,

    /// Membership (`in`)
    In,

    /// Concatenation (`.`)
    Dot,

    // Logical
    /// `&&` or `and`
    And,
    /// `||` or `or`
    Or,
    /// `!` or `not`
    Not,

    // Delimiters
    /// Left parenthesis for grouping or function calls
    LParen,

    /// Right parenthesis
    RParen,

    /// Left brace opening a list
    LBrace,

    /// Right brace closing a list
    RBrace,

    /// Comma for separating arguments or list elements
    Comma,

    /// End of input
    Eof,
}

impl Token {
    /// Short human-readable description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Token::Boolean(b) => format!("'{b}'"),
            Token::Number(n) => format!("number {n}"),
            Token::Identifier(name) => format!("identifier '{name}'"),
            Token::StrBegin => "start of string".to_string(),
            Token::StrText(_) => "string text".to_string(),
            Token::StrEnd => "end of string".to_string(),
            Token::VarBegin => "'%{'".to_string(),
            Token::VarArg(_) => "variable argument".to_string(),
            Token::VarEnd => "'}'".to_string(),
            Token::Backref(n) => format!("'${n}'"),
            Token::Regex { pattern, .. } => format!("regex /{pattern}/"),
            Token::UnaryOp(op) | Token::BinaryOp(op) => format!("operator '{op}'"),
            Token::NumEq => "'-eq'".to_string(),
            Token::NumNe => "'-ne'".to_string(),
            Token::NumLt => "'-lt'".to_string(),
            Token::NumLe => "'-le'".to_string(),
            Token::NumGt => "'-gt'".to_string(),
            Token::NumGe => "'-ge'".to_string(),
            Token::EqEq => "'=='".to_string(),
            Token::NotEq => "'!='".to_string(),
            Token::Lt => "'<'".to_string(),
            Token::LtEq => "'<='".to_string(),
            Token::Gt => "'>'".to_string(),
            Token::GtEq => "'>='".to_string(),
            Token::Match => "'=~'".to_string(),
            Token::NotMatch => "'!~'".to_string(),
            Token::In => "'in'".to_string(),
            Token::Dot => "'.'".to_string(),
            Token::And => "'&&'".to_string(),
            Token::Or => "'||'".to_string(),
            Token::Not => "'!'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}
