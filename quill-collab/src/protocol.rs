//! Sync messages and their binary framing.
//!
//! Wire format (bincode-encoded `Frame`):
//! ```text
//! ┌──────────┬────────────┬──────────────────────────────┐
//! │ kind     │ compressed │ payload                      │
//! │ 1 byte   │ 1 byte     │ varint length + bytes        │
//! └──────────┴────────────┴──────────────────────────────┘
//! ```
//!
//! Payloads at or above [`SyncConfig::compression_threshold`] are
//! LZ4-compressed with the original size prepended.

use quill_core::DocError;
use serde::{Deserialize, Serialize};

use crate::config::SyncConfig;

/// The three handshake message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageKind {
    /// Sender's state vector
    Step1 = 0,
    /// Everything the receiver of a Step1 lacks
    Step2 = 1,
    /// Incremental update, sent at any time
    Update = 2,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Step1 => write!(f, "Step1"),
            Self::Step2 => write!(f, "Step2"),
            Self::Update => write!(f, "Update"),
        }
    }
}

/// One protocol message. The buffer is opaque engine bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncMessage {
    pub kind: MessageKind,
    pub buffer: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct Frame {
    kind: MessageKind,
    compressed: bool,
    payload: Vec<u8>,
}

impl SyncMessage {
    pub fn step1(state_vector: Vec<u8>) -> Self {
        Self {
            kind: MessageKind::Step1,
            buffer: state_vector,
        }
    }

    pub fn step2(update: Vec<u8>) -> Self {
        Self {
            kind: MessageKind::Step2,
            buffer: update,
        }
    }

    pub fn update(update: Vec<u8>) -> Self {
        Self {
            kind: MessageKind::Update,
            buffer: update,
        }
    }

    /// Serialize to the binary wire format.
    pub fn encode(&self, config: &SyncConfig) -> Result<Vec<u8>, ProtocolError> {
        let compressed = self.buffer.len() >= config.compression_threshold;
        let payload = if compressed {
            lz4_flex::compress_prepend_size(&self.buffer)
        } else {
            self.buffer.clone()
        };
        let frame = Frame {
            kind: self.kind,
            compressed,
            payload,
        };
        let bytes = bincode::serde::encode_to_vec(&frame, bincode::config::standard())
            .map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        if bytes.len() > config.max_message_size {
            return Err(ProtocolError::MessageTooLarge {
                size: bytes.len(),
                max: config.max_message_size,
            });
        }
        log::debug!(
            "Encoded {} ({} -> {} bytes{})",
            self.kind,
            self.buffer.len(),
            bytes.len(),
            if compressed { ", lz4" } else { "" }
        );
        Ok(bytes)
    }

    /// Deserialize from the binary wire format.
    pub fn decode(bytes: &[u8], config: &SyncConfig) -> Result<Self, ProtocolError> {
        if bytes.len() > config.max_message_size {
            return Err(ProtocolError::MessageTooLarge {
                size: bytes.len(),
                max: config.max_message_size,
            });
        }
        let (frame, _): (Frame, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| ProtocolError::Deserialization(e.to_string()))?;
        let buffer = if frame.compressed {
            let declared = declared_size(&frame.payload)?;
            if declared > config.max_message_size {
                return Err(ProtocolError::MessageTooLarge {
                    size: declared,
                    max: config.max_message_size,
                });
            }
            lz4_flex::decompress_size_prepended(&frame.payload)
                .map_err(|e| ProtocolError::Decompression(e.to_string()))?
        } else {
            frame.payload
        };
        if buffer.len() > config.max_message_size {
            return Err(ProtocolError::MessageTooLarge {
                size: buffer.len(),
                max: config.max_message_size,
            });
        }
        Ok(Self {
            kind: frame.kind,
            buffer,
        })
    }
}

/// Uncompressed size from the little-endian prefix written by
/// `compress_prepend_size`.
fn declared_size(payload: &[u8]) -> Result<usize, ProtocolError> {
    let prefix: [u8; 4] = payload
        .get(..4)
        .and_then(|p| p.try_into().ok())
        .ok_or_else(|| ProtocolError::Decompression("missing size prefix".into()))?;
    Ok(u32::from_le_bytes(prefix) as usize)
}

/// Protocol errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolError {
    Serialization(String),
    Deserialization(String),
    Decompression(String),
    MessageTooLarge { size: usize, max: usize },
    UnexpectedMessage { expected: MessageKind, got: MessageKind },
    Document(DocError),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialization(e) => write!(f, "Serialization error: {e}"),
            Self::Deserialization(e) => write!(f, "Deserialization error: {e}"),
            Self::Decompression(e) => write!(f, "Decompression failed: {e}"),
            Self::MessageTooLarge { size, max } => {
                write!(f, "Message of {size} bytes exceeds limit of {max}")
            }
            Self::UnexpectedMessage { expected, got } => {
                write!(f, "Expected {expected} message, got {got}")
            }
            Self::Document(e) => write!(f, "Document error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Document(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DocError> for ProtocolError {
    fn from(e: DocError) -> Self {
        Self::Document(e)
    }
}
