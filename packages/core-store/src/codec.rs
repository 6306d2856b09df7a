//! Property naming and text codecs.
//!
//! State lives on nodes as text under a property name derived from the key:
//! `prefix + key`, or `prefix + scope + "-" + key` when scoped.

use std::fmt;

use serde_json::Value;

use crate::{Error, Result};

/// Prefix for every state property.
pub const DEFAULT_PREFIX: &str = "--state-";

/// Prefix for durable-storage keys.
pub const STORAGE_PREFIX: &str = "state-";

/// A physical property name on a node.
///
/// Construction validates the key, so a `PropertyName` always names a
/// non-empty key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyName(String);

impl PropertyName {
    /// Build the property name for `key` under an optional `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] when `key` is empty.
    pub fn new(prefix: &str, scope: Option<&str>, key: &str) -> Result<Self> {
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }
        let name = match scope {
            Some(scope) => format!("{prefix}{scope}-{key}"),
            None => format!("{prefix}{key}"),
        };
        Ok(Self(name))
    }

    /// Get the property name string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the state key, if this name belongs to `prefix` and `scope`.
    pub fn state_key(&self, prefix: &str, scope: Option<&str>) -> Option<&str> {
        let rest = self.0.strip_prefix(prefix)?;
        let key = match scope {
            Some(scope) => rest.strip_prefix(scope)?.strip_prefix('-')?,
            None => rest,
        };
        (!key.is_empty()).then_some(key)
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PropertyName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Whether `name` is a state property under `prefix`.
pub fn is_state_property(name: &str, prefix: &str) -> bool {
    name.len() > prefix.len() && name.starts_with(prefix)
}

/// The durable-storage key for `key` under an optional `scope`.
///
/// # Errors
///
/// Returns [`Error::InvalidKey`] when `key` is empty.
pub fn storage_key(scope: Option<&str>, key: &str) -> Result<String> {
    Ok(PropertyName::new(STORAGE_PREFIX, scope, key)?.0)
}

/// Converts values to and from property text.
///
/// Decoding never fails: text a codec cannot parse is returned as a raw
/// string value.
pub trait Codec {
    /// Encode a value to property text.
    fn encode(&self, value: &Value) -> Result<String>;

    /// Decode property text into a value.
    fn decode(&self, text: &str) -> Value;
}

/// The default codec: JSON text.
///
/// Every value is written as JSON, strings included, so any JSON value
/// survives a round trip. Text written by someone else that is not JSON
/// (say, a bare `dark`) decodes to the trimmed string itself.
///
/// # Example
///
/// ```rust
/// use nodestate_core::{Codec, JsonCodec};
/// use serde_json::json;
///
/// let codec = JsonCodec;
/// let text = codec.encode(&json!({"open": true})).unwrap();
/// assert_eq!(codec.decode(&text), json!({"open": true}));
/// assert_eq!(codec.decode("  dark "), json!("dark"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<String> {
        serde_json::to_string(value).map_err(|e| Error::encode(e.to_string()))
    }

    fn decode(&self, text: &str) -> Value {
        let text = text.trim();
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    }
}

impl<T: Codec + ?Sized> Codec for Box<T> {
    fn encode(&self, value: &Value) -> Result<String> {
        self.as_ref().encode(value)
    }

    fn decode(&self, text: &str) -> Value {
        self.as_ref().decode(text)
    }
}

/// Encode with the default codec.
pub fn serialize(value: &Value) -> Result<String> {
    JsonCodec.encode(value)
}

/// Decode with the default codec.
pub fn deserialize(text: &str) -> Value {
    JsonCodec.decode(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn property_names() {
        let unscoped = PropertyName::new(DEFAULT_PREFIX, None, "count").unwrap();
        assert_eq!(unscoped.as_str(), "--state-count");

        let scoped = PropertyName::new(DEFAULT_PREFIX, Some("cart"), "count").unwrap();
        assert_eq!(scoped.as_str(), "--state-cart-count");
        assert_ne!(unscoped, scoped);
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(
            PropertyName::new(DEFAULT_PREFIX, None, ""),
            Err(Error::InvalidKey)
        ));
        assert!(matches!(storage_key(Some("s"), ""), Err(Error::InvalidKey)));
    }

    #[test]
    fn state_key_inverts_naming() {
        let name = PropertyName::new(DEFAULT_PREFIX, Some("form"), "email").unwrap();
        assert_eq!(name.state_key(DEFAULT_PREFIX, Some("form")), Some("email"));
        assert_eq!(name.state_key(DEFAULT_PREFIX, Some("other")), None);
        assert_eq!(name.state_key("--theme-", None), None);
    }

    #[test]
    fn recognises_state_properties() {
        assert!(is_state_property("--state-count", DEFAULT_PREFIX));
        assert!(!is_state_property("--state-", DEFAULT_PREFIX));
        assert!(!is_state_property("color", DEFAULT_PREFIX));
    }

    #[test]
    fn storage_keys() {
        assert_eq!(storage_key(None, "theme").unwrap(), "state-theme");
        assert_eq!(storage_key(Some("user"), "theme").unwrap(), "state-user-theme");
    }

    #[test]
    fn json_values_roundtrip() {
        let values = [
            json!(null),
            json!(true),
            json!(0),
            json!(-17),
            json!(2.5),
            json!("hello"),
            json!("42"),
            json!("{not json"),
            json!([1, "two", {"three": 3}]),
            json!({"name": "Alice", "tags": ["a", "b"], "nested": {"x": null}}),
        ];
        for value in values {
            let text = serialize(&value).unwrap();
            assert_eq!(deserialize(&text), value, "round trip of {text}");
        }
    }

    #[test]
    fn unparsable_text_is_returned_raw() {
        assert_eq!(deserialize("dark"), json!("dark"));
        assert_eq!(deserialize("  {broken "), json!("{broken"));
        assert_eq!(deserialize(&"dark".to_string()), json!("dark"));
    }

    #[test]
    fn scalars_encode_as_json() {
        assert_eq!(serialize(&json!(3)).unwrap(), "3");
        assert_eq!(serialize(&json!(false)).unwrap(), "false");
        assert_eq!(serialize(&json!("s")).unwrap(), "\"s\"");
    }
}
