//! Compiled expressions.
//!
//! An [`Expression`] is parsed once and evaluated many times. It holds no
//! interior mutability (regex literals are compiled during parsing), so a
//! single instance can be shared across threads and evaluated concurrently
//! with different runtime contexts.

use crate::{
    ast::Expr,
    context::RuntimeContext,
    diagnostics::{EvalError, ParseError},
    evaluator::{Captures, Evaluator},
    functions::FunctionTable,
    lexer::Lexer,
    parser::Parser,
    value::Value,
};

/// Parse-time configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Compile every regex literal case-insensitively, as if it carried the
    /// `i` flag.
    pub case_insensitive_regex: bool,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn case_insensitive_regex(mut self, enabled: bool) -> Self {
        self.case_insensitive_regex = enabled;
        self
    }
}

/// Whether the source was parsed as a condition or as a string template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionKind {
    Condition,
    Template,
}

/// A parsed, immutable expression.
///
/// # Examples
///
/// ```
/// use reqexpr::{Expression, MapContext};
///
/// let expr = Expression::parse(r#"%{HOST} == "example.com""#).unwrap();
///
/// let mut ctx = MapContext::new();
/// ctx.insert("HOST", "example.com");
/// assert!(expr.evaluate(&ctx).unwrap());
///
/// ctx.insert("HOST", "other.com");
/// assert!(!expr.evaluate(&ctx).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    kind: ExpressionKind,
    root: Expr,
}

impl Expression {
    /// Parse a condition with default options.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        Self::parse_with(source, ParseOptions::default())
    }

    /// Parse a condition.
    pub fn parse_with(source: &str, options: ParseOptions) -> Result<Self, ParseError> {
        log::debug!("parsing condition {source:?}");
        let mut parser = Parser::with_options(Lexer::new(source), options)?;
        let root = parser.parse()?;
        Ok(Expression {
            source: source.to_string(),
            kind: ExpressionKind::Condition,
            root,
        })
    }

    /// Parse a string template: unquoted text with `%{...}` and `$N`
    /// interpolation.
    ///
    /// ```
    /// use reqexpr::{Expression, MapContext};
    ///
    /// let expr = Expression::parse_template("Hello, %{USER}!").unwrap();
    /// let mut ctx = MapContext::new();
    /// ctx.insert("USER", "alice");
    /// assert_eq!(expr.evaluate_string(&ctx).unwrap(), "Hello, alice!");
    /// ```
    pub fn parse_template(source: &str) -> Result<Self, ParseError> {
        log::debug!("parsing template {source:?}");
        let mut parser = Parser::with_options(Lexer::template(source), ParseOptions::default())?;
        let root = parser.parse_template()?;
        Ok(Expression {
            source: source.to_string(),
            kind: ExpressionKind::Template,
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> ExpressionKind {
        self.kind
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Evaluate as a condition using the default function table.
    pub fn evaluate(&self, context: &dyn RuntimeContext) -> Result<bool, EvalError> {
        self.evaluate_with(context, FunctionTable::builtin())
    }

    /// Evaluate as a condition using a host-supplied function table.
    pub fn evaluate_with(
        &self,
        context: &dyn RuntimeContext,
        functions: &FunctionTable,
    ) -> Result<bool, EvalError> {
        self.evaluate_captured_with(context, functions)
            .map(|(result, _)| result)
    }

    /// Evaluate as a condition and hand back the capture groups of the last
    /// regex match, e.g. for logging.
    pub fn evaluate_captured(
        &self,
        context: &dyn RuntimeContext,
    ) -> Result<(bool, Captures), EvalError> {
        self.evaluate_captured_with(context, FunctionTable::builtin())
    }

    pub fn evaluate_captured_with(
        &self,
        context: &dyn RuntimeContext,
        functions: &FunctionTable,
    ) -> Result<(bool, Captures), EvalError> {
        log::debug!("evaluating {:?}", self.source);
        let mut captures = Captures::new();
        let value = Evaluator::new(context, functions).eval(&self.root, &mut captures)?;
        Ok((value.is_truthy(), captures))
    }

    /// Evaluate to a value without reducing it to a boolean.
    pub fn evaluate_value(&self, context: &dyn RuntimeContext) -> Result<Value, EvalError> {
        self.evaluate_value_with(context, FunctionTable::builtin())
    }

    pub fn evaluate_value_with(
        &self,
        context: &dyn RuntimeContext,
        functions: &FunctionTable,
    ) -> Result<Value, EvalError> {
        log::debug!("evaluating {:?} to a value", self.source);
        let mut captures = Captures::new();
        Evaluator::new(context, functions).eval(&self.root, &mut captures)
    }

    /// Evaluate to the string form of the result.
    pub fn evaluate_string(&self, context: &dyn RuntimeContext) -> Result<String, EvalError> {
        self.evaluate_string_with(context, FunctionTable::builtin())
    }

    pub fn evaluate_string_with(
        &self,
        context: &dyn RuntimeContext,
        functions: &FunctionTable,
    ) -> Result<String, EvalError> {
        self.evaluate_value_with(context, functions)
            .map(|v| v.as_string())
    }
}
