// ABOUTME: Validates function-call arguments against a tool's declared JSON schema
// ABOUTME: Checks object type, required fields, primitive types, enums and integer minimums

use serde_json::{Map, Value};

use crate::errors::ToolError;

/// Validate `args` against `schema`
///
/// Supports the subset of JSON schema tools declare: an `object` root,
/// `required`, and per-property `type` (`string`, `integer`, `number`,
/// `boolean`), `enum` and `minimum`. Undeclared arguments are ignored.
///
/// # Errors
///
/// Returns `MissingParameter` or `InvalidParameter` for the first violation
pub fn validate_arguments(
    tool_name: &str,
    schema: &Value,
    args: &Map<String, Value>,
) -> Result<(), ToolError> {
    if let Some(root) = schema.get("type").and_then(Value::as_str) {
        if root != "object" {
            return Err(ToolError::invalid_parameter(
                tool_name,
                "arguments",
                format!("schema root must be an object, found '{root}'"),
            ));
        }
    }

    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str);
    for name in required {
        if args.get(name).is_none_or(Value::is_null) {
            return Err(ToolError::missing_parameter(tool_name, name));
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (name, value) in args {
        if value.is_null() {
            continue;
        }
        if let Some(property) = properties.get(name) {
            check_property(tool_name, name, property, value)?;
        }
    }

    Ok(())
}

fn check_property(
    tool_name: &str,
    name: &str,
    property: &Value,
    value: &Value,
) -> Result<(), ToolError> {
    if let Some(expected) = property.get("type").and_then(Value::as_str) {
        let matches = match expected {
            "string" => value.is_string(),
            "integer" => as_integer(value).is_some(),
            "number" => value.is_number(),
            "boolean" => value.is_boolean(),
            "object" => value.is_object(),
            "array" => value.is_array(),
            _ => true,
        };
        if !matches {
            return Err(ToolError::invalid_parameter(
                tool_name,
                name,
                format!("expected {expected}"),
            ));
        }
    }

    if let Some(allowed) = property.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            return Err(ToolError::invalid_parameter(
                tool_name,
                name,
                "value is not one of the allowed options",
            ));
        }
    }

    if let (Some(minimum), Some(actual)) = (
        property.get("minimum").and_then(Value::as_i64),
        as_integer(value),
    ) {
        if actual < minimum {
            return Err(ToolError::invalid_parameter(
                tool_name,
                name,
                format!("must be at least {minimum}"),
            ));
        }
    }

    Ok(())
}

/// Integer value of `value`, accepting floats without a fractional part
pub fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract().abs() < f64::EPSILON && f.abs() < 9.0e15)
            .map(|f| f as i64)
    })
}
