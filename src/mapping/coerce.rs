//! Attribute coercion from template strings to schema types

use serde_json::{Number, Value};

use crate::registry::{AttributeSchema, AttributeType};

/// Attribute value before coercion
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// `name="value"` in the template
    Text(String),
    /// Valueless attribute such as `hidden`
    Bare,
    /// Value fixed by a mapping rule
    Typed(Value),
}

impl RawValue {
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some(v) => RawValue::Text(v.to_string()),
            None => RawValue::Bare,
        }
    }
}

/// Result of coercing one attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Coercion {
    pub value: Value,
    /// Set when the raw value did not fit the schema and was kept as a string
    pub mismatch: Option<String>,
}

impl Coercion {
    fn ok(value: Value) -> Self {
        Self {
            value,
            mismatch: None,
        }
    }

    fn fallback(raw: &str, message: String) -> Self {
        Self {
            value: Value::String(raw.to_string()),
            mismatch: Some(message),
        }
    }
}

/// Coerce a raw attribute value against an optional schema
///
/// Never fails: a value that does not fit falls back to its raw string and
/// carries a mismatch message.
pub fn coerce(name: &str, raw: &RawValue, schema: Option<&AttributeSchema>) -> Coercion {
    let coerced = match (raw, schema) {
        (RawValue::Typed(value), _) => Coercion::ok(value.clone()),
        (RawValue::Bare, Some(s)) if s.ty == AttributeType::Boolean => Coercion::ok(Value::Bool(true)),
        (RawValue::Bare, _) => Coercion::ok(Value::String(String::new())),
        (RawValue::Text(text), None) => Coercion::ok(Value::String(text.clone())),
        (RawValue::Text(text), Some(s)) => coerce_text(name, text, s.ty),
    };
    match schema {
        Some(s) if coerced.mismatch.is_none() => check_enum(name, coerced, s),
        _ => coerced,
    }
}

fn coerce_text(name: &str, text: &str, ty: AttributeType) -> Coercion {
    let mismatch = || format!("expected {} for '{}', got {:?}", ty, name, text);
    let trimmed = text.trim();
    match ty {
        AttributeType::String => Coercion::ok(Value::String(text.to_string())),
        AttributeType::Boolean => match trimmed {
            "true" => Coercion::ok(Value::Bool(true)),
            "false" => Coercion::ok(Value::Bool(false)),
            _ => Coercion::fallback(text, mismatch()),
        },
        AttributeType::Integer => match trimmed.parse::<i64>() {
            Ok(n) => Coercion::ok(Value::from(n)),
            Err(_) => Coercion::fallback(text, mismatch()),
        },
        AttributeType::Number => {
            if let Ok(n) = trimmed.parse::<i64>() {
                return Coercion::ok(Value::from(n));
            }
            match trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
                Some(n) => Coercion::ok(Value::Number(n)),
                None => Coercion::fallback(text, mismatch()),
            }
        }
        AttributeType::Object => match serde_json::from_str::<Value>(trimmed) {
            Ok(value @ Value::Object(_)) => Coercion::ok(value),
            _ => Coercion::fallback(text, mismatch()),
        },
        AttributeType::Array => match serde_json::from_str::<Value>(trimmed) {
            Ok(value @ Value::Array(_)) => Coercion::ok(value),
            _ => Coercion::fallback(text, mismatch()),
        },
    }
}

fn check_enum(name: &str, coerced: Coercion, schema: &AttributeSchema) -> Coercion {
    match &schema.enum_values {
        Some(allowed) if !allowed.contains(&coerced.value) => {
            let listed: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
            let message = format!(
                "value {} for '{}' is not one of {}",
                coerced.value,
                name,
                listed.join(", ")
            );
            Coercion {
                value: coerced.value,
                mismatch: Some(message),
            }
        }
        _ => coerced,
    }
}
