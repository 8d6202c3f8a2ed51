//! JSON <-> reqexpr Value conversion utilities

use rust_decimal::Decimal;

use super::CliError;
use crate::{MapContext, Value};

/// Convert a scalar serde_json::Value to a reqexpr Value.
///
/// `null` becomes the empty string; arrays and objects are rejected.
pub fn json_to_value(v: serde_json::Value) -> Result<Value, CliError> {
    match v {
        serde_json::Value::Null => Ok(Value::String(String::new())),
        serde_json::Value::Bool(b) => Ok(Value::Boolean(b)),
        serde_json::Value::Number(n) => n
            .to_string()
            .parse::<Decimal>()
            .map(Value::Number)
            .map_err(|e| CliError::InvalidVariables(format!("number {n} out of range: {e}"))),
        serde_json::Value::String(s) => Ok(Value::String(s)),
        other => Err(CliError::InvalidVariables(format!(
            "expected a string, number or boolean, got {other}"
        ))),
    }
}

/// Convert a reqexpr Value to serde_json::Value
pub fn value_to_json(v: Value) -> serde_json::Value {
    match v {
        Value::Boolean(b) => serde_json::Value::Bool(b),
        Value::String(s) => serde_json::Value::String(s),
        Value::Number(n) => {
            let text = n.normalize().to_string();
            serde_json::from_str::<serde_json::Number>(&text)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::String(text))
        }
    }
}

/// Build a runtime context from a JSON object of variable bindings.
///
/// Keys are variable names; `"HTTP:Accept"` binds `%{HTTP:Accept}`.
pub fn context_from_json(json: &str, strict: bool) -> Result<MapContext, CliError> {
    let parsed: serde_json::Value = serde_json::from_str(json)?;
    let serde_json::Value::Object(map) = parsed else {
        return Err(CliError::InvalidVariables(
            "variables must be a JSON object".to_string(),
        ));
    };

    let mut context = if strict {
        MapContext::strict()
    } else {
        MapContext::new()
    };
    for (name, value) in map {
        context.insert(name, json_to_value(value)?);
    }
    Ok(context)
}
