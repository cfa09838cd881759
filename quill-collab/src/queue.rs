//! Outgoing updates held while disconnected.

use std::collections::VecDeque;

use quill_core::DocError;
use yrs::updates::decoder::Decode;
use yrs::Update;

use crate::config::SyncConfig;
use crate::protocol::{ProtocolError, SyncMessage};

/// Offline queue for edits made while disconnected.
///
/// Queued updates are merged into a single `Update` on flush. When the
/// queue reaches capacity it compacts itself into one entry instead of
/// dropping edits.
pub struct OfflineQueue {
    queue: VecDeque<Vec<u8>>,
    capacity: usize,
}

impl OfflineQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    pub fn with_config(config: &SyncConfig) -> Self {
        Self::new(config.offline_queue_capacity)
    }

    /// Queue an update for later replay.
    ///
    /// Updates the engine cannot decode are refused and leave the queue as
    /// it was.
    pub fn enqueue(&mut self, update: Vec<u8>) -> Result<(), ProtocolError> {
        Update::decode_v1(&update)
            .map_err(|e| ProtocolError::Document(DocError::Decode(e.to_string())))?;
        self.queue.push_back(update);
        if self.queue.len() > self.capacity {
            log::warn!(
                "Offline queue exceeded {} updates, compacting",
                self.capacity
            );
            match self.merged() {
                Ok(merged) => {
                    self.queue.clear();
                    self.queue.push_back(merged);
                }
                Err(e) => log::warn!("Offline queue compaction failed, keeping all: {e}"),
            }
        }
        Ok(())
    }

    /// Queue the payload of an outgoing message.
    pub fn enqueue_message(&mut self, msg: SyncMessage) -> Result<(), ProtocolError> {
        self.enqueue(msg.buffer)
    }

    /// Merge everything queued into one `Update` and empty the queue.
    ///
    /// On a merge failure the queue is left untouched.
    pub fn flush(&mut self) -> Result<Option<SyncMessage>, ProtocolError> {
        if self.queue.is_empty() {
            return Ok(None);
        }
        let merged = self.merged()?;
        log::info!(
            "Flushing {} queued updates as {} bytes",
            self.queue.len(),
            merged.len()
        );
        self.queue.clear();
        Ok(Some(SyncMessage::update(merged)))
    }

    fn merged(&self) -> Result<Vec<u8>, ProtocolError> {
        if self.queue.len() == 1 {
            return Ok(self.queue[0].clone());
        }
        let updates: Vec<&[u8]> = self.queue.iter().map(Vec::as_slice).collect();
        yrs::merge_updates_v1(&updates)
            .map_err(|e| ProtocolError::Document(DocError::Decode(e.to_string())))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Total bytes queued.
    pub fn total_bytes(&self) -> usize {
        self.queue.iter().map(Vec::len).sum()
    }
}
