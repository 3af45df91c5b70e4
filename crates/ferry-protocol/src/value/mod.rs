//! Closed value type for configuration, parameters, and message properties.
//!
//! [`Value`] serialises untagged, so on the wire it is plain JSON. Decoding
//! accepts any JSON document; integers that fit in `i64` stay integral and
//! everything else numeric becomes a float. JSON has no spelling for NaN or
//! infinities, so encoding a non-finite [`Value::Float`] is an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer, ser};

/// Mapping of string keys to [`Value`]s, ordered for deterministic encoding.
pub type ValueMap = BTreeMap<String, Value>;

/// A dynamically shaped value carried inside protocol messages.
///
/// # Example
///
/// ```
/// use ferry_protocol::Value;
///
/// let value: Value = serde_json::from_str(r#"{"retries": 3, "tls": true}"#).unwrap();
/// let map = value.as_map().unwrap();
/// assert_eq!(map.get("retries").and_then(Value::as_i64), Some(3));
/// assert_eq!(map.get("tls").and_then(Value::as_bool), Some(true));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Explicit absence of a value.
    #[default]
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating point number. Must be finite to be encoded.
    Float(#[serde(serialize_with = "serialize_finite")] f64),
    /// UTF-8 string.
    String(String),
    /// Ordered list of values.
    List(Vec<Value>),
    /// Nested mapping.
    Map(ValueMap),
}

impl Value {
    /// Returns the string content when this is a [`Value::String`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Returns the flag when this is a [`Value::Bool`].
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Returns the integer when this is a [`Value::Integer`].
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(number) => Some(*number),
            _ => None,
        }
    }

    /// Returns the nested mapping when this is a [`Value::Map`].
    #[must_use]
    pub const fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

#[expect(
    clippy::trivially_copy_pass_by_ref,
    reason = "serde passes fields to serialize_with by reference"
)]
fn serialize_finite<S: Serializer>(number: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if number.is_finite() {
        serializer.serialize_f64(*number)
    } else {
        Err(ser::Error::custom(format_args!("non-finite float {number}")))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl From<ValueMap> for Value {
    fn from(value: ValueMap) -> Self {
        Self::Map(value)
    }
}

/// Merges a per-call configuration override over instance defaults.
///
/// Keys present in `overrides` replace the default entry; keys absent from
/// it keep the default. The merge is shallow: a nested map in the override
/// replaces the whole default map under that key.
///
/// # Example
///
/// ```
/// use ferry_protocol::{Value, ValueMap, merge_config};
///
/// let mut defaults = ValueMap::new();
/// defaults.insert("baseDirectory".into(), Value::from("/a"));
/// let mut overrides = ValueMap::new();
/// overrides.insert("baseDirectory".into(), Value::from("/b"));
/// overrides.insert("x".into(), Value::from("y"));
///
/// let merged = merge_config(&defaults, Some(overrides.clone()));
/// assert_eq!(merged, overrides);
/// ```
#[must_use]
pub fn merge_config(defaults: &ValueMap, overrides: Option<ValueMap>) -> ValueMap {
    let mut merged = defaults.clone();
    if let Some(entries) = overrides {
        merged.extend(entries);
    }
    merged
}

/// Deserialises a field that may be absent or JSON `null` into its default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
