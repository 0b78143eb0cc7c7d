//! Tolerant serde field readers for provider payloads.

use serde::Deserialize;
use serde::de::{DeserializeOwned, Deserializer};
use serde_json::Value;

/// Strings pass through, numbers and booleans are rendered, anything else is absent.
pub(crate) fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Booleans pass through, numbers are truthy when non-zero.
pub(crate) fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "y" | "yes" => Some(true),
            "false" | "n" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// Objects are decoded as `T`; `null`, scalars and arrays fall back to the default.
pub(crate) fn object_or_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    match Value::deserialize(d)? {
        value @ Value::Object(_) => T::deserialize(value).map_err(serde::de::Error::custom),
        _ => Ok(T::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "lenient_string")]
        code: Option<String>,
        #[serde(default, deserialize_with = "lenient_bool")]
        flag: Option<bool>,
        #[serde(default, deserialize_with = "object_or_default")]
        nested: Option<Nested>,
    }

    #[derive(Debug, Default, Deserialize)]
    struct Nested {
        #[serde(default, deserialize_with = "lenient_string")]
        name: Option<String>,
    }

    fn parse(json: &str) -> Sample {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_lenient_string() {
        assert_eq!(parse(r#"{"code": "6006"}"#).code.as_deref(), Some("6006"));
        assert_eq!(parse(r#"{"code": 6006}"#).code.as_deref(), Some("6006"));
        assert_eq!(parse(r#"{"code": null}"#).code, None);
        assert_eq!(parse(r#"{"code": [1]}"#).code, None);
        assert_eq!(parse("{}").code, None);
    }

    #[test]
    fn test_lenient_bool() {
        assert_eq!(parse(r#"{"flag": true}"#).flag, Some(true));
        assert_eq!(parse(r#"{"flag": 0}"#).flag, Some(false));
        assert_eq!(parse(r#"{"flag": "Y"}"#).flag, Some(true));
        assert_eq!(parse(r#"{"flag": "maybe"}"#).flag, None);
    }

    #[test]
    fn test_object_or_default() {
        let sample = parse(r#"{"nested": {"name": 42}}"#);
        assert_eq!(sample.nested.and_then(|n| n.name).as_deref(), Some("42"));
        assert!(parse(r#"{"nested": "text"}"#).nested.is_none());
        assert!(parse(r#"{"nested": null}"#).nested.is_none());
    }
}
