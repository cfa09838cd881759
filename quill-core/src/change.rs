//! Change descriptions delivered to collection observers.
//!
//! Each committed transaction that touches a collection produces one
//! batch of changes, built fresh from the engine's event for that
//! transaction.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use yrs::types::{Change, Delta, EntryChange};
use yrs::{Any, Out};

use crate::codec::{self, Attributes};

/// One run of a text change.
#[derive(Debug, Clone, PartialEq)]
pub enum TextChange {
    /// Text inserted at the current position
    Inserted {
        text: String,
        attributes: Option<Attributes>,
    },
    /// An embed inserted at the current position, in its encoded form
    Embedded {
        value: String,
        attributes: Option<Attributes>,
    },
    /// Characters removed at the current position
    Deleted(u32),
    /// Characters skipped, possibly with formatting applied
    Retained {
        len: u32,
        attributes: Option<Attributes>,
    },
}

impl TextChange {
    pub(crate) fn from_delta(delta: &Delta) -> Self {
        match delta {
            Delta::Inserted(value, attrs) => {
                let attributes = attrs.as_deref().map(codec::attributes_from_engine);
                let embed = match value {
                    Out::Any(any) => codec::embed_from_engine(any),
                    _ => None,
                };
                match embed {
                    Some(encoded) => TextChange::Embedded {
                        value: encoded.to_owned(),
                        attributes,
                    },
                    None => TextChange::Inserted {
                        text: out_text(value),
                        attributes,
                    },
                }
            }
            Delta::Deleted(len) => TextChange::Deleted(*len),
            Delta::Retain(len, attrs) => TextChange::Retained {
                len: *len,
                attributes: attrs.as_deref().map(codec::attributes_from_engine),
            },
        }
    }

    /// Decoded embed value, `None` for other runs or on shape mismatch.
    pub fn embedded<T: DeserializeOwned>(&self) -> Option<T> {
        match self {
            TextChange::Embedded { value, .. } => codec::decode(value),
            _ => None,
        }
    }
}

/// One run of an ordered list change.
#[derive(Debug, Clone, PartialEq)]
pub enum ListChange<T> {
    /// Elements inserted at the current position (undecodable ones are dropped)
    Added(Vec<T>),
    /// Elements removed at the current position
    Removed(u32),
    /// Elements skipped
    Retained(u32),
}

impl<T: DeserializeOwned> ListChange<T> {
    pub(crate) fn from_change(change: &Change) -> Self {
        match change {
            Change::Added(values) => {
                ListChange::Added(codec::decode_many(values.iter().filter_map(out_str)))
            }
            Change::Removed(len) => ListChange::Removed(*len),
            Change::Retain(len) => ListChange::Retained(*len),
        }
    }
}

/// A change to one map entry. Values that do not decode as `T` are `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum MapChange<T> {
    Added {
        key: String,
        value: Option<T>,
    },
    Updated {
        key: String,
        old: Option<T>,
        new: Option<T>,
    },
    Removed {
        key: String,
        old: Option<T>,
    },
}

impl<T> MapChange<T> {
    pub fn key(&self) -> &str {
        match self {
            MapChange::Added { key, .. }
            | MapChange::Updated { key, .. }
            | MapChange::Removed { key, .. } => key,
        }
    }
}

impl<T: DeserializeOwned> MapChange<T> {
    /// Build a batch from the engine's per-key changes, ordered by key.
    pub(crate) fn batch(keys: &HashMap<Arc<str>, EntryChange>) -> Vec<Self> {
        let mut changes: Vec<Self> = keys
            .iter()
            .map(|(key, change)| {
                let key = key.to_string();
                match change {
                    EntryChange::Inserted(value) => MapChange::Added {
                        key,
                        value: decode_out(value),
                    },
                    EntryChange::Updated(old, new) => MapChange::Updated {
                        key,
                        old: decode_out(old),
                        new: decode_out(new),
                    },
                    EntryChange::Removed(old) => MapChange::Removed {
                        key,
                        old: decode_out(old),
                    },
                }
            })
            .collect();
        changes.sort_by(|a, b| a.key().cmp(b.key()));
        changes
    }
}

pub(crate) fn out_str(out: &Out) -> Option<&str> {
    match out {
        Out::Any(Any::String(s)) => Some(s.as_ref()),
        _ => None,
    }
}

pub(crate) fn decode_out<T: DeserializeOwned>(out: &Out) -> Option<T> {
    out_str(out).and_then(codec::decode)
}

// Shared types embedded by other replicas carry no text of their own.
fn out_text(out: &Out) -> String {
    out_str(out).map(str::to_owned).unwrap_or_default()
}
