use std::str::FromStr;

use rust_decimal::Decimal;

/// A runtime value produced while evaluating an expression.
///
/// Variables resolved by the host, literals, and function results all share
/// this type. Numbers are exact decimals so `1.10 -eq 1.1` holds.
///
/// # Examples
///
/// ```
/// use reqexpr::Value;
/// use rust_decimal::Decimal;
///
/// let host = Value::from("example.com");
/// let port = Value::Number(Decimal::from(8080));
///
/// assert!(host.is_truthy());
/// assert_eq!(port.as_string(), "8080");
/// assert!(!Value::from("").is_truthy());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean result of a condition
    Boolean(bool),

    /// Integer or decimal number
    Number(Decimal),

    /// UTF-8 string
    String(String),
}

impl Value {
    /// Check if the value is truthy (for conditions).
    ///
    /// Empty strings, zero and `false` are false; everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Number(n) => !n.is_zero(),
            Value::String(s) => !s.is_empty(),
        }
    }

    /// String form used by string comparison, membership and concatenation.
    pub fn as_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.normalize().to_string(),
            Value::Boolean(b) => b.to_string(),
        }
    }

    /// Numeric form used by numeric comparison.
    ///
    /// Strings that do not parse as numbers coerce to zero. The coercion is
    /// logged as a warning rather than failing the evaluation.
    pub fn to_number(&self) -> Decimal {
        match self {
            Value::Number(n) => *n,
            Value::Boolean(b) => Decimal::from(u8::from(*b)),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Decimal::ZERO;
                }
                match Decimal::from_str(trimmed) {
                    Ok(n) => n,
                    Err(_) if is_oversized_integer_part(trimmed) => {
                        log::warn!("numeric value {s:?} out of range, clamping");
                        if trimmed.starts_with('-') {
                            Decimal::MIN
                        } else {
                            Decimal::MAX
                        }
                    }
                    Err(_) => {
                        log::warn!("non-numeric value {s:?} used in numeric comparison, treating as 0");
                        Decimal::ZERO
                    }
                }
            }
        }
    }

    /// Returns a human-readable type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }
}

/// Whether `s` is plain decimal notation whose integer part has more
/// significant digits than `Decimal` can hold.
fn is_oversized_integer_part(s: &str) -> bool {
    let unsigned = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let plain = !integer.is_empty()
        && integer.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit());
    plain && integer.trim_start_matches('0').len() > 28
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Decimal> for Value {
    fn from(n: Decimal) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Decimal::from(n))
    }
}
