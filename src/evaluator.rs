use std::cmp::Ordering;

use crate::{
    ast::{CmpOp, Expr, LogicalOp, RegexLiteral, StringPart},
    context::{Lookup, RuntimeContext},
    diagnostics::{ErrorKind, EvalError},
    functions::FunctionTable,
    value::Value,
};

/// Capture groups of the most recent regex match in one evaluation.
///
/// Index 0 is the whole match. Groups that did not participate in the match
/// are empty strings. A fresh, empty `Captures` is allocated for every
/// evaluation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    groups: Vec<String>,
}

impl Captures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group `n`, or `None` when there was no match or no such group.
    pub fn get(&self, n: usize) -> Option<&str> {
        self.groups.get(n).map(String::as_str)
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn replace(&mut self, regex: &RegexLiteral, subject: &str) -> bool {
        self.groups.clear();
        match regex.regex.captures(subject) {
            Some(caps) => {
                self.groups.extend(
                    caps.iter()
                        .map(|m| m.map_or_else(String::new, |m| m.as_str().to_string())),
                );
                true
            }
            None => false,
        }
    }

    fn backref(&self, n: usize) -> String {
        self.get(n).unwrap_or_default().to_string()
    }
}

/// Tree-walking evaluator.
///
/// Borrows the host's runtime context and function table for one evaluation.
/// The only mutable state is the [`Captures`] slot passed down the walk.
pub struct Evaluator<'a> {
    context: &'a dyn RuntimeContext,
    functions: &'a FunctionTable,
}

impl<'a> Evaluator<'a> {
    pub fn new(context: &'a dyn RuntimeContext, functions: &'a FunctionTable) -> Self {
        Evaluator { context, functions }
    }

    /// Evaluates an expression tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use reqexpr::{Captures, Evaluator, Expression, FunctionTable, MapContext, Value};
    ///
    /// let expr = Expression::parse(r#""v1.2" =~ /v(\d+)/"#).unwrap();
    /// let ctx = MapContext::new();
    /// let mut captures = Captures::new();
    ///
    /// let result = Evaluator::new(&ctx, FunctionTable::builtin())
    ///     .eval(expr.root(), &mut captures)
    ///     .unwrap();
    /// assert_eq!(result, Value::Boolean(true));
    /// assert_eq!(captures.get(1), Some("1"));
    /// ```
    pub fn eval(&self, expr: &Expr, captures: &mut Captures) -> Result<Value, EvalError> {
        match expr {
            Expr::Boolean(b) => Ok(Value::Boolean(*b)),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::String(parts) => self.eval_string(parts, captures).map(Value::String),
            Expr::Variable { name, args } => self.resolve(name, args),
            Expr::Backref(n) => Ok(Value::String(captures.backref(*n))),
            Expr::Not(operand) => {
                let value = self.eval(operand, captures)?;
                Ok(Value::Boolean(!value.is_truthy()))
            }
            Expr::Logical { op, left, right } => {
                let left_val = self.eval(left, captures)?.is_truthy();
                let result = match op {
                    LogicalOp::And => left_val && self.eval(right, captures)?.is_truthy(),
                    LogicalOp::Or => left_val || self.eval(right, captures)?.is_truthy(),
                };
                Ok(Value::Boolean(result))
            }
            Expr::Comparison { op, left, right } => {
                let left_val = self.eval(left, captures)?;
                let right_val = self.eval(right, captures)?;
                Ok(Value::Boolean(compare(*op, &left_val, &right_val)))
            }
            Expr::Match {
                negated,
                subject,
                regex,
            } => {
                let subject = self.eval(subject, captures)?.as_string();
                let matched = captures.replace(regex, &subject);
                log::trace!("/{}/ against {subject:?}: {matched}", regex.pattern);
                Ok(Value::Boolean(matched != *negated))
            }
            Expr::In { needle, list } => {
                let needle = self.eval(needle, captures)?.as_string();
                for item in list {
                    if self.eval(item, captures)?.as_string() == needle {
                        return Ok(Value::Boolean(true));
                    }
                }
                Ok(Value::Boolean(false))
            }
            Expr::Concat(parts) => {
                let mut result = String::new();
                for part in parts {
                    result.push_str(&self.eval(part, captures)?.as_string());
                }
                Ok(Value::String(result))
            }
            Expr::Call { name, args } => {
                let values = self.eval_args(args, captures)?;
                self.functions.call(name, &values)
            }
            Expr::UnaryTest { op, operand } => {
                let value = self.eval(operand, captures)?;
                self.functions.call(op, &[value])
            }
            Expr::BinaryTest { op, left, right } => {
                let left_val = self.eval(left, captures)?;
                let right_val = self.eval(right, captures)?;
                self.functions.call(op, &[left_val, right_val])
            }
        }
    }

    fn eval_args(&self, args: &[Expr], captures: &mut Captures) -> Result<Vec<Value>, EvalError> {
        args.iter().map(|arg| self.eval(arg, captures)).collect()
    }

    /// Builds an interpolated string. Backreferences see the capture state as
    /// it is at this point of the walk.
    fn eval_string(&self, parts: &[StringPart], captures: &Captures) -> Result<String, EvalError> {
        let mut result = String::new();
        for part in parts {
            match part {
                StringPart::Text(text) => result.push_str(text),
                StringPart::Variable { name, args } => {
                    result.push_str(&self.resolve(name, args)?.as_string());
                }
                StringPart::Backref(n) => result.push_str(&captures.backref(*n)),
            }
        }
        Ok(result)
    }

    fn resolve(&self, name: &str, args: &[String]) -> Result<Value, EvalError> {
        match self.context.lookup(name, args) {
            Lookup::Resolved(value) => Ok(value),
            Lookup::Unresolved => {
                log::trace!("variable {name} unresolved, using empty string");
                Ok(Value::String(String::new()))
            }
            Lookup::HardError(reason) => Err(EvalError::new(
                ErrorKind::UnknownVariable,
                format!("lookup of '{name}' failed: {reason}"),
            )),
        }
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> bool {
    let ordering = if op.is_numeric() {
        left.to_number().cmp(&right.to_number())
    } else {
        left.as_string().as_bytes().cmp(right.as_string().as_bytes())
    };

    match op {
        CmpOp::NumEqual | CmpOp::StrEqual => ordering == Ordering::Equal,
        CmpOp::NumNotEqual | CmpOp::StrNotEqual => ordering != Ordering::Equal,
        CmpOp::NumLessThan | CmpOp::StrLessThan => ordering == Ordering::Less,
        CmpOp::NumLessEqual | CmpOp::StrLessEqual => ordering != Ordering::Greater,
        CmpOp::NumGreaterThan | CmpOp::StrGreaterThan => ordering == Ordering::Greater,
        CmpOp::NumGreaterEqual | CmpOp::StrGreaterEqual => ordering != Ordering::Less,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn numeric_comparison_uses_decimal_order() {
        let a = Value::from("10");
        let b = Value::from("9");
        assert!(compare(CmpOp::NumGreaterThan, &a, &b));
        assert!(compare(CmpOp::StrLessThan, &a, &b));

        let x = Value::Number(Decimal::from_str("1.10").unwrap());
        let y = Value::from("1.1");
        assert!(compare(CmpOp::NumEqual, &x, &y));
        // string form is normalized, so the decimal also compares equal as text
        assert!(compare(CmpOp::StrEqual, &x, &y));
    }

    #[test]
    fn failed_match_clears_captures() {
        let regex = RegexLiteral {
            pattern: "a(b)".to_string(),
            case_insensitive: false,
            regex: regex::Regex::new("a(b)").unwrap(),
        };
        let mut captures = Captures::new();
        assert!(captures.replace(&regex, "xab"));
        assert_eq!(captures.get(1), Some("b"));
        assert!(!captures.replace(&regex, "zzz"));
        assert!(captures.is_empty());
        assert_eq!(captures.backref(1), "");
    }
}
