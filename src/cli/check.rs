//! Parse and evaluate an expression against JSON variables

use super::{CliError, context_from_json, value_to_json};
use crate::{Expression, MapContext, ParseOptions};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The expression source
    pub expression: String,
    /// JSON object of variable bindings
    pub variables: Option<String>,
    /// Parse the expression as a string template instead of a condition
    pub template: bool,
    /// Match regex literals case-insensitively by default
    pub case_insensitive: bool,
    /// Unknown variables fail the evaluation instead of reading as empty
    pub strict: bool,
    /// Only validate syntax, don't evaluate
    pub syntax_only: bool,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// Syntax validation passed
    SyntaxValid,
    /// Evaluation succeeded; `{"result": ..., "captures": [...]}`
    Success(serde_json::Value),
}

/// Execute a check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let expression = if options.template {
        Expression::parse_template(&options.expression)?
    } else {
        let parse_options = ParseOptions::new().case_insensitive_regex(options.case_insensitive);
        Expression::parse_with(&options.expression, parse_options)?
    };

    if options.syntax_only {
        return Ok(CheckResult::SyntaxValid);
    }

    let context = match &options.variables {
        Some(json) => context_from_json(json, options.strict)?,
        None if options.strict => MapContext::strict(),
        None => MapContext::new(),
    };

    let output = if options.template {
        let result = expression.evaluate_value(&context)?;
        serde_json::json!({ "result": value_to_json(result) })
    } else {
        let (result, captures) = expression.evaluate_captured(&context)?;
        serde_json::json!({
            "result": result,
            "captures": captures.groups(),
        })
    };

    Ok(CheckResult::Success(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_with_variables_and_reports_captures() {
        let options = CheckOptions {
            expression: r#"%{HOST} =~ /^www\.(.+)$/"#.to_string(),
            variables: Some(r#"{"HOST": "www.example.com"}"#.to_string()),
            ..Default::default()
        };

        match execute_check(&options).unwrap() {
            CheckResult::Success(output) => {
                assert_eq!(output["result"], serde_json::json!(true));
                assert_eq!(output["captures"][1], serde_json::json!("example.com"));
            }
            CheckResult::SyntaxValid => panic!("expected evaluation"),
        }
    }

    #[test]
    fn syntax_only_skips_evaluation() {
        let options = CheckOptions {
            expression: "%{MISSING} == x".to_string(),
            strict: true,
            syntax_only: true,
            ..Default::default()
        };
        assert!(matches!(execute_check(&options).unwrap(), CheckResult::SyntaxValid));
    }

    #[test]
    fn strict_mode_rejects_unknown_variables() {
        let options = CheckOptions {
            expression: "%{MISSING} == x".to_string(),
            strict: true,
            ..Default::default()
        };
        assert!(matches!(execute_check(&options), Err(CliError::Eval(_))));
    }

    #[test]
    fn template_output_is_a_string() {
        let options = CheckOptions {
            expression: "user=%{USER}".to_string(),
            variables: Some(r#"{"USER": "bob"}"#.to_string()),
            template: true,
            ..Default::default()
        };
        match execute_check(&options).unwrap() {
            CheckResult::Success(output) => {
                assert_eq!(output["result"], serde_json::json!("user=bob"));
            }
            CheckResult::SyntaxValid => panic!("expected evaluation"),
        }
    }

    #[test]
    fn non_object_variables_are_rejected() {
        let options = CheckOptions {
            expression: "true".to_string(),
            variables: Some("[1, 2]".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            execute_check(&options),
            Err(CliError::InvalidVariables(_))
        ));
    }
}
