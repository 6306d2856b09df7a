//! Conversions between stored values and serde types.

use nodestate_core::{Error, Result, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Convert a stored value to a Rust type via serde.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::decode(e.to_string()))
}

/// Convert a Rust type to a storable value via serde.
pub fn to_value<T: Serialize + ?Sized>(data: &T) -> Result<Value> {
    serde_json::to_value(data).map_err(|e| Error::encode(e.to_string()))
}
