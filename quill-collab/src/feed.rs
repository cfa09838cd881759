//! Outgoing stream of local updates.

use quill_core::{Document, Subscription};
use tokio::sync::mpsc;

use crate::config::SyncConfig;
use crate::protocol::SyncMessage;

/// Turns every locally committed transaction into an `Update` message.
///
/// Transactions tagged with the remote origin are skipped, so updates
/// received from a peer are not sent back to it.
pub struct UpdateFeed {
    subscription: Subscription,
    rx: mpsc::UnboundedReceiver<SyncMessage>,
}

impl UpdateFeed {
    pub fn new(doc: &Document, config: &SyncConfig) -> Result<Self, quill_core::DocError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let remote = config.remote_origin.clone();
        let subscription = doc.observe_updates(move |update, origin| {
            if origin == Some(remote.as_str()) {
                return;
            }
            if tx.send(SyncMessage::update(update.to_vec())).is_err() {
                log::debug!("Update feed receiver dropped");
            }
        })?;
        Ok(Self { subscription, rx })
    }

    /// Wait for the next outgoing update. `None` once closed and drained.
    pub async fn next(&mut self) -> Option<SyncMessage> {
        self.rx.recv().await
    }

    pub fn try_next(&mut self) -> Option<SyncMessage> {
        self.rx.try_recv().ok()
    }

    /// Everything queued so far.
    pub fn drain(&mut self) -> Vec<SyncMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }

    /// Stop producing; messages already queued stay readable.
    pub fn close(&mut self) {
        self.subscription.close();
        self.rx.close();
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }
}
