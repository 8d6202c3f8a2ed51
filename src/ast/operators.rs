/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    // Numeric
    /// Numeric equal (`-eq`)
    NumEqual,
    /// Numeric not equal (`-ne`)
    NumNotEqual,
    /// Numeric less than (`-lt`)
    NumLessThan,
    /// Numeric less than or equal (`-le`)
    NumLessEqual,
    /// Numeric greater than (`-gt`)
    NumGreaterThan,
    /// Numeric greater than or equal (`-ge`)
    NumGreaterEqual,

    // String
    /// String equal (`==`)
    StrEqual,
    /// String not equal (`!=`)
    StrNotEqual,
    /// String less than (`<`)
    StrLessThan,
    /// String less than or equal (`<=`)
    StrLessEqual,
    /// String greater than (`>`)
    StrGreaterThan,
    /// String greater than or equal (`>=`)
    StrGreaterEqual,
}

impl CmpOp {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            CmpOp::NumEqual
                | CmpOp::NumNotEqual
                | CmpOp::NumLessThan
                | CmpOp::NumLessEqual
                | CmpOp::NumGreaterThan
                | CmpOp::NumGreaterEqual
        )
    }
}

/// Logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// Logical AND (`&&`)
    And,
    /// Logical OR (`||`)
    Or,
}
