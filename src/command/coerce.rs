//! Dynamic argument coercion.
//!
//! JSON argument values are loosely typed; declared parameters are not. This
//! module maps one onto the other with a small per-type table instead of a
//! chain of runtime type tests. Failures are hard errors naming the parameter
//! (and, inside arrays, the offending index), never a silent substitution.

use serde_json::Value;
use thiserror::Error;

use super::{ParamType, ParamValue};

/// A coercion failure. The message always names the parameter.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CoerceError(String);

impl CoerceError {
    fn mismatch(value: &Value, ty: &ParamType, param: &str) -> Self {
        Self(format!(
            "Cannot convert value '{value}' to type '{ty}' for parameter '{param}'."
        ))
    }
}

/// Coerce one JSON value onto a declared parameter type.
pub fn coerce_value(
    value: &Value,
    ty: &ParamType,
    param: &str,
) -> Result<ParamValue, CoerceError> {
    match ty {
        ParamType::String => coerce_string(value, param),
        ParamType::Integer => coerce_integer(value, param),
        ParamType::Float => coerce_float(value, param),
        ParamType::Boolean => coerce_boolean(value, param),
        ParamType::Enum(variants) => coerce_enum(value, variants, param),
        ParamType::Array(elem) => coerce_array(value, elem, param),
        ParamType::Object => Ok(ParamValue::Json(value.clone())),
    }
}

fn coerce_string(value: &Value, param: &str) -> Result<ParamValue, CoerceError> {
    match value {
        Value::String(s) => Ok(ParamValue::Str(s.clone())),
        Value::Number(n) => Ok(ParamValue::Str(n.to_string())),
        Value::Bool(b) => Ok(ParamValue::Str(b.to_string())),
        other => Err(CoerceError::mismatch(other, &ParamType::String, param)),
    }
}

fn coerce_integer(value: &Value, param: &str) -> Result<ParamValue, CoerceError> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(ParamValue::Int(i));
            }
            // Fractional values do not narrow silently.
            if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                    return Ok(ParamValue::Int(f as i64));
                }
            }
            Err(CoerceError::mismatch(value, &ParamType::Integer, param))
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(ParamValue::Int)
            .map_err(|_| CoerceError::mismatch(value, &ParamType::Integer, param)),
        Value::Bool(b) => Ok(ParamValue::Int(i64::from(*b))),
        other => Err(CoerceError::mismatch(other, &ParamType::Integer, param)),
    }
}

fn coerce_float(value: &Value, param: &str) -> Result<ParamValue, CoerceError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(ParamValue::Float)
            .ok_or_else(|| CoerceError::mismatch(value, &ParamType::Float, param)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(ParamValue::Float)
            .map_err(|_| CoerceError::mismatch(value, &ParamType::Float, param)),
        Value::Bool(b) => Ok(ParamValue::Float(if *b { 1.0 } else { 0.0 })),
        other => Err(CoerceError::mismatch(other, &ParamType::Float, param)),
    }
}

fn coerce_boolean(value: &Value, param: &str) -> Result<ParamValue, CoerceError> {
    match value {
        Value::Bool(b) => Ok(ParamValue::Bool(*b)),
        Value::Number(n) => Ok(ParamValue::Bool(n.as_f64().is_some_and(|f| f != 0.0))),
        Value::String(s) => {
            let s = s.trim();
            if s.eq_ignore_ascii_case("true") {
                Ok(ParamValue::Bool(true))
            } else if s.eq_ignore_ascii_case("false") {
                Ok(ParamValue::Bool(false))
            } else {
                Err(CoerceError::mismatch(value, &ParamType::Boolean, param))
            }
        }
        other => Err(CoerceError::mismatch(other, &ParamType::Boolean, param)),
    }
}

fn coerce_enum(
    value: &Value,
    variants: &[String],
    param: &str,
) -> Result<ParamValue, CoerceError> {
    let name = match value {
        Value::String(s) => s.as_str(),
        other => {
            return Err(CoerceError::mismatch(
                other,
                &ParamType::Enum(variants.to_vec()),
                param,
            ))
        }
    };

    variants
        .iter()
        .find(|v| v.eq_ignore_ascii_case(name))
        .map(|v| ParamValue::Str(v.clone()))
        .ok_or_else(|| {
            CoerceError(format!(
                "Value '{}' is not a valid variant for parameter '{}' (expected one of: {}).",
                name,
                param,
                variants.join(", ")
            ))
        })
}

fn coerce_array(
    value: &Value,
    elem: &ParamType,
    param: &str,
) -> Result<ParamValue, CoerceError> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(CoerceError::mismatch(
                other,
                &ParamType::Array(Box::new(elem.clone())),
                param,
            ))
        }
    };

    let mut coerced = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match coerce_value(item, elem, param) {
            Ok(v) => coerced.push(v),
            Err(_) => {
                return Err(CoerceError(format!(
                    "Cannot convert array element '{}' at index {} to type '{}' for parameter '{}'.",
                    item, index, elem, param
                )))
            }
        }
    }
    Ok(ParamValue::List(coerced))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_passthrough() {
        assert_eq!(
            coerce_value(&json!("x"), &ParamType::String, "p").unwrap(),
            ParamValue::Str("x".to_string())
        );
        assert_eq!(
            coerce_value(&json!(42), &ParamType::Integer, "p").unwrap(),
            ParamValue::Int(42)
        );
        assert_eq!(
            coerce_value(&json!(2.5), &ParamType::Float, "p").unwrap(),
            ParamValue::Float(2.5)
        );
        assert_eq!(
            coerce_value(&json!(true), &ParamType::Boolean, "p").unwrap(),
            ParamValue::Bool(true)
        );
    }

    #[test]
    fn test_string_accepts_numbers_and_booleans() {
        assert_eq!(
            coerce_value(&json!(7), &ParamType::String, "p").unwrap(),
            ParamValue::Str("7".to_string())
        );
        assert_eq!(
            coerce_value(&json!(false), &ParamType::String, "p").unwrap(),
            ParamValue::Str("false".to_string())
        );
    }

    #[test]
    fn test_string_rejects_containers() {
        let err = coerce_value(&json!([1]), &ParamType::String, "addr").unwrap_err();
        assert!(err.to_string().contains("'addr'"));
    }

    #[test]
    fn test_integer_conversions() {
        assert_eq!(
            coerce_value(&json!("2"), &ParamType::Integer, "p").unwrap(),
            ParamValue::Int(2)
        );
        assert_eq!(
            coerce_value(&json!(" 10 "), &ParamType::Integer, "p").unwrap(),
            ParamValue::Int(10)
        );
        assert_eq!(
            coerce_value(&json!(3.0), &ParamType::Integer, "p").unwrap(),
            ParamValue::Int(3)
        );
        assert_eq!(
            coerce_value(&json!(true), &ParamType::Integer, "p").unwrap(),
            ParamValue::Int(1)
        );
    }

    #[test]
    fn test_integer_rejects_fractional_and_garbage() {
        assert!(coerce_value(&json!(2.7), &ParamType::Integer, "size").is_err());
        let err = coerce_value(&json!("abc"), &ParamType::Integer, "size").unwrap_err();
        assert!(err.to_string().contains("'size'"));
    }

    #[test]
    fn test_float_conversions() {
        assert_eq!(
            coerce_value(&json!(2), &ParamType::Float, "p").unwrap(),
            ParamValue::Float(2.0)
        );
        assert_eq!(
            coerce_value(&json!("1.5"), &ParamType::Float, "p").unwrap(),
            ParamValue::Float(1.5)
        );
        assert_eq!(
            coerce_value(&json!(true), &ParamType::Float, "p").unwrap(),
            ParamValue::Float(1.0)
        );
    }

    #[test]
    fn test_boolean_conversions() {
        assert_eq!(
            coerce_value(&json!("TRUE"), &ParamType::Boolean, "p").unwrap(),
            ParamValue::Bool(true)
        );
        assert_eq!(
            coerce_value(&json!("False"), &ParamType::Boolean, "p").unwrap(),
            ParamValue::Bool(false)
        );
        assert_eq!(
            coerce_value(&json!(0), &ParamType::Boolean, "p").unwrap(),
            ParamValue::Bool(false)
        );
        assert_eq!(
            coerce_value(&json!(-3), &ParamType::Boolean, "p").unwrap(),
            ParamValue::Bool(true)
        );
        assert!(coerce_value(&json!("yes"), &ParamType::Boolean, "p").is_err());
    }

    #[test]
    fn test_enum_resolves_case_insensitively_to_canonical() {
        let ty = ParamType::Enum(vec!["Label".to_string(), "Comment".to_string()]);
        assert_eq!(
            coerce_value(&json!("label"), &ty, "mode").unwrap(),
            ParamValue::Str("Label".to_string())
        );
        assert_eq!(
            coerce_value(&json!("COMMENT"), &ty, "mode").unwrap(),
            ParamValue::Str("Comment".to_string())
        );
    }

    #[test]
    fn test_enum_unknown_variant_names_parameter_and_choices() {
        let ty = ParamType::Enum(vec!["Label".to_string(), "Comment".to_string()]);
        let err = coerce_value(&json!("Bookmark"), &ty, "mode").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'mode'"));
        assert!(msg.contains("Label, Comment"));
    }

    #[test]
    fn test_array_coerces_element_wise() {
        let ty = ParamType::Array(Box::new(ParamType::Integer));
        assert_eq!(
            coerce_value(&json!(["1", 2, "3"]), &ty, "bytes").unwrap(),
            ParamValue::List(vec![
                ParamValue::Int(1),
                ParamValue::Int(2),
                ParamValue::Int(3)
            ])
        );
    }

    #[test]
    fn test_array_failure_reports_parameter_and_index() {
        let ty = ParamType::Array(Box::new(ParamType::Integer));
        let err = coerce_value(&json!([1, "oops", 3]), &ty, "bytes").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("index 1"));
        assert!(msg.contains("'bytes'"));
    }

    #[test]
    fn test_nested_arrays() {
        let ty = ParamType::Array(Box::new(ParamType::Array(Box::new(ParamType::Integer))));
        let result = coerce_value(&json!([[1, 2], ["3"]]), &ty, "matrix").unwrap();
        assert_eq!(
            result,
            ParamValue::List(vec![
                ParamValue::List(vec![ParamValue::Int(1), ParamValue::Int(2)]),
                ParamValue::List(vec![ParamValue::Int(3)]),
            ])
        );
    }

    #[test]
    fn test_non_array_for_array_parameter_fails() {
        let ty = ParamType::Array(Box::new(ParamType::String));
        assert!(coerce_value(&json!("not-a-list"), &ty, "names").is_err());
    }

    #[test]
    fn test_object_passes_anything_through() {
        let value = json!({"nested": {"deep": [1, 2]}});
        assert_eq!(
            coerce_value(&value, &ParamType::Object, "blob").unwrap(),
            ParamValue::Json(value.clone())
        );
    }
}
