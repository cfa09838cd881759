//! Typed views over the shared values of a document.
//!
//! | View             | Engine type | Addressing                 |
//! |------------------|-------------|----------------------------|
//! | `TextCollection` | `TextRef`   | text index (bytes / UTF-16)|
//! | `ListCollection` | `ArrayRef`  | element index              |
//! | `MapCollection`  | `MapRef`    | string key                 |
//!
//! Every mutation exists twice: `op_in(&mut Transaction, ..)` joins a
//! transaction the caller already holds, `op(..)` opens and commits one
//! around the single operation. Reads follow the same pattern with a
//! shared borrow of the transaction.

mod list;
mod map;
mod text;

pub use list::ListCollection;
pub use map::MapCollection;
pub use text::TextCollection;

use yrs::{ArrayRef, MapRef, TextRef};

use crate::error::DocError;

/// The three kinds of shared value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Text,
    List,
    Map,
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::List => write!(f, "list"),
            Self::Map => write!(f, "map"),
        }
    }
}

/// Engine handle behind a collection view.
#[derive(Clone)]
pub enum SharedRef {
    Text(TextRef),
    List(ArrayRef),
    Map(MapRef),
}

/// Common surface of all collection views.
pub trait Collection {
    fn name(&self) -> &str;

    fn kind(&self) -> CollectionKind;

    fn shared_ref(&self) -> SharedRef;
}

/// A collection whose kind was chosen at runtime.
#[derive(Clone)]
pub enum AnyCollection {
    Text(TextCollection),
    List(ListCollection),
    Map(MapCollection),
}

impl AnyCollection {
    pub fn as_text(&self) -> Option<&TextCollection> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListCollection> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapCollection> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl Collection for AnyCollection {
    fn name(&self) -> &str {
        match self {
            Self::Text(c) => c.name(),
            Self::List(c) => c.name(),
            Self::Map(c) => c.name(),
        }
    }

    fn kind(&self) -> CollectionKind {
        match self {
            Self::Text(_) => CollectionKind::Text,
            Self::List(_) => CollectionKind::List,
            Self::Map(_) => CollectionKind::Map,
        }
    }

    fn shared_ref(&self) -> SharedRef {
        match self {
            Self::Text(c) => c.shared_ref(),
            Self::List(c) => c.shared_ref(),
            Self::Map(c) => c.shared_ref(),
        }
    }
}

/// `index <= len` for insertions, `index + count <= len` for ranges.
pub(crate) fn check_range(index: u32, count: u32, len: u32) -> Result<(), DocError> {
    match index.checked_add(count) {
        Some(end) if end <= len => Ok(()),
        _ => Err(DocError::IndexOutOfBounds { index, len }),
    }
}
