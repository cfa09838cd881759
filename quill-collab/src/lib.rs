//! # quill-collab - replica synchronization for quill documents
//!
//! Brings two [`quill_core::Document`] replicas to the same state with a
//! three-message handshake and keeps them there with incremental updates.
//! Transport is left to the caller: messages encode to bytes and decode
//! back, nothing here opens a socket.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  Step1 / Step2 / Update   ┌────────────┐
//! │ Document A │ ◄───────────────────────► │ Document B │
//! └─────┬──────┘   (bincode + lz4 frames)  └────────────┘
//!       │ committed local updates
//!       ▼
//! ┌────────────┐  disconnected   ┌──────────────┐
//! │ UpdateFeed │ ──────────────► │ OfflineQueue │ ── flush: one merged Update
//! └────────────┘                 └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: `SyncMessage` and its wire framing
//! - [`handshake`]: stateless handlers plus the `SyncSession` tracker
//! - [`feed`]: local updates as outgoing messages, remote echoes skipped
//! - [`queue`]: offline buffering with merge on flush
//! - [`config`]: `SyncConfig`

pub mod config;
pub mod feed;
pub mod handshake;
pub mod protocol;
pub mod queue;

pub use config::SyncConfig;
pub use feed::UpdateFeed;
pub use handshake::{SyncSession, SyncState};
pub use protocol::{MessageKind, ProtocolError, SyncMessage};
pub use queue::OfflineQueue;
