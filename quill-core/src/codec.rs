//! Canonical value encoding.
//!
//! Every value stored in a map entry, list element or text embed is
//! kept by the engine as a JSON string. Decoding is directed by the
//! caller's static type and fails closed: a value that does not fit
//! the requested shape reads as absent.
//!
//! ```text
//! app value ──encode──► "{\"name\":\"Ada\",\"age\":36}" ──► engine slot
//! engine slot ──► &str ──decode::<T>──► Some(T) | None
//! ```
//!
//! Formatting attributes on text are the one place where structured
//! values reach the engine natively; `attributes_to_engine` and
//! `attributes_from_engine` convert them to and from JSON.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use yrs::types::Attrs;
use yrs::Any;

use crate::error::CodecError;

/// Inline formatting attributes attached to a run of text.
pub type Attributes = BTreeMap<String, Value>;

/// Encode a value into its canonical string form.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, CodecError> {
    serde_json::to_string(value).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode a canonical string into `T`, or `None` if the shape does not match.
pub fn decode<T: DeserializeOwned>(encoded: &str) -> Option<T> {
    match serde_json::from_str(encoded) {
        Ok(value) => Some(value),
        Err(e) => {
            log::debug!("Dropping undecodable value ({e}): {encoded}");
            None
        }
    }
}

/// Encode every element; fails if any element cannot be encoded.
pub fn encode_many<T: Serialize>(values: &[T]) -> Result<Vec<String>, CodecError> {
    values.iter().map(encode).collect()
}

/// Decode every element, silently dropping the ones that do not fit `T`.
pub fn decode_many<T, I, S>(encoded: I) -> Vec<T>
where
    T: DeserializeOwned,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    encoded
        .into_iter()
        .filter_map(|s| decode(s.as_ref()))
        .collect()
}

/// Convert an engine attribute value to JSON.
pub fn any_to_json(any: &Any) -> Value {
    match any {
        Any::Null | Any::Undefined => Value::Null,
        Any::Bool(b) => Value::Bool(*b),
        Any::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Any::BigInt(i) => Value::from(*i),
        Any::String(s) => Value::String(s.to_string()),
        Any::Buffer(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
        Any::Array(items) => Value::Array(items.iter().map(any_to_json).collect()),
        Any::Map(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), any_to_json(v)))
                .collect(),
        ),
    }
}

/// Convert JSON to an engine attribute value.
pub fn json_to_any(value: &Value) -> Any {
    match value {
        Value::Null => Any::Null,
        Value::Bool(b) => Any::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Any::BigInt(i),
            None => Any::Number(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => Any::String(s.as_str().into()),
        Value::Array(items) => Any::Array(items.iter().map(json_to_any).collect::<Vec<_>>().into()),
        Value::Object(entries) => Any::Map(Arc::new(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), json_to_any(v)))
                .collect::<HashMap<_, _>>(),
        )),
    }
}

const EMBED_KEY: &str = "embed";

// Embeds are wrapped so observers can tell them from plain string chunks.
pub(crate) fn embed_to_engine(encoded: String) -> Any {
    Any::Map(Arc::new(HashMap::from([(
        EMBED_KEY.to_owned(),
        Any::String(encoded.into()),
    )])))
}

pub(crate) fn embed_from_engine(any: &Any) -> Option<&str> {
    match any {
        Any::Map(entries) => match entries.get(EMBED_KEY) {
            Some(Any::String(s)) => Some(s.as_ref()),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn attributes_to_engine(attributes: &Attributes) -> Attrs {
    attributes
        .iter()
        .map(|(k, v)| (Arc::<str>::from(k.as_str()), json_to_any(v)))
        .collect()
}

pub(crate) fn attributes_from_engine(attrs: &Attrs) -> Attributes {
    attrs
        .iter()
        .map(|(k, v)| (k.to_string(), any_to_json(v)))
        .collect()
}
