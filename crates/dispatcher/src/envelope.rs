//! The uniform JSON contract every operation is homogenized into
//! (spec.md §4.9): `{success, data?, error?}` plus a machine-readable
//! `error_kind` tag mirroring [`adt_domain::Error::kind_tag`].

use adt_domain::Error;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

impl Envelope {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
        }
    }

    pub fn err(e: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(e.to_string()),
            error_kind: Some(e.kind_tag()),
        }
    }
}

/// Read a required string field out of a JSON args object.
pub fn require_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, Error> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidArgument(format!("missing required field: {field}")))
}

pub fn optional_str<'a>(args: &'a Value, field: &str) -> Option<&'a str> {
    args.get(field).and_then(Value::as_str)
}

pub fn optional_u32(args: &Value, field: &str) -> Option<u32> {
    args.get(field).and_then(Value::as_u64).map(|v| v as u32)
}

pub fn optional_bool(args: &Value, field: &str, default: bool) -> bool {
    args.get(field).and_then(Value::as_bool).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn require_str_missing_is_invalid_argument() {
        let args = json!({});
        let err = require_str(&args, "name").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn require_str_present() {
        let args = json!({"name": "ZTEST"});
        assert_eq!(require_str(&args, "name").unwrap(), "ZTEST");
    }

    #[test]
    fn optional_bool_falls_back_to_default() {
        let args = json!({});
        assert!(!optional_bool(&args, "activate", false));
        assert!(optional_bool(&args, "activate", true));
    }
}
