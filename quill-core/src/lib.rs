//! # quill-core - transaction-scoped access to a shared CRDT document
//!
//! Wraps a `yrs` replica behind typed collections whose values are stored
//! in their JSON encoding.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  text/list/map   ┌──────────────────┐
//! │   Document   │ ───────────────► │ Collection views │
//! │ (one replica)│                  │ Text│List│Map    │
//! └──────┬───────┘                  └────────┬─────────┘
//!        │ transact()                        │ op_in(&mut txn, ..)
//!        ▼                                   ▼
//! ┌──────────────┐    commit     ┌──────────────────────┐
//! │ Transaction  │ ────────────► │ observers / channels │
//! └──────────────┘               │ (one batch per txn)  │
//!                                └──────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`document`]: replica ownership, update encoding and application
//! - [`transaction`]: explicit transaction handles
//! - [`collection`]: `TextCollection`, `ListCollection`, `MapCollection`
//! - [`change`]: change records delivered to observers
//! - [`codec`]: value encoding
//! - [`undo`]: scoped undo/redo
//!
//! ## Example
//!
//! ```
//! use quill_core::Document;
//!
//! let doc = Document::new();
//! let notes = doc.text("notes").unwrap();
//! notes.append("Hello, ").unwrap();
//! notes.append("World!").unwrap();
//! assert_eq!(notes.get_string(), "Hello, World!");
//!
//! let replica = Document::new();
//! replica.apply_update(&doc.encode_full_state().unwrap()).unwrap();
//! assert_eq!(replica.text("notes").unwrap().get_string(), "Hello, World!");
//! ```

pub mod change;
pub mod codec;
pub mod collection;
pub mod config;
pub mod document;
pub mod error;
pub mod subscription;
pub mod transaction;
pub mod undo;

pub use change::{ListChange, MapChange, TextChange};
pub use codec::Attributes;
pub use collection::{
    AnyCollection, Collection, CollectionKind, ListCollection, MapCollection, SharedRef,
    TextCollection,
};
pub use config::{DocumentConfig, TextIndexing};
pub use document::Document;
pub use error::{CodecError, DocError};
pub use subscription::Subscription;
pub use transaction::Transaction;
pub use undo::UndoManager;
