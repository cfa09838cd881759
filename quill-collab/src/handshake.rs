//! Step1 / Step2 / Update handshake.
//!
//! ```text
//!   A (initiator)                         B (responder)
//!   start() ── Step1(sv_A) ─────────────►
//!                           ◄──────────── Step2(diff_B(sv_A)) + Step1(sv_B)
//!   apply, on_synced ── Step2(diff_A(sv_B)) ─►
//!                                          apply, on_synced
//!   ◄──────────────── Update(bytes) ─────► (either side, any time)
//! ```
//!
//! The free functions are stateless: every message is handled on its own
//! against the document. [`SyncSession`] adds state tracking on top for
//! callers that want to know when both directions are complete.

use log::{debug, info};
use quill_core::Document;

use crate::config::SyncConfig;
use crate::protocol::{MessageKind, ProtocolError, SyncMessage};

/// Open a handshake with the local state vector.
pub fn start(doc: &Document) -> Result<SyncMessage, ProtocolError> {
    Ok(SyncMessage::step1(doc.state_vector()?))
}

/// Answer a peer's state vector with what the peer lacks.
pub fn handle_step1(doc: &Document, state_vector: &[u8]) -> Result<SyncMessage, ProtocolError> {
    Ok(SyncMessage::step2(doc.diff(state_vector)?))
}

pub fn handle_step2(doc: &Document, update: &[u8], origin: &str) -> Result<(), ProtocolError> {
    doc.apply_update_with_origin(update, origin)?;
    Ok(())
}

pub fn handle_update(doc: &Document, update: &[u8], origin: &str) -> Result<(), ProtocolError> {
    doc.apply_update_with_origin(update, origin)?;
    Ok(())
}

/// Dispatch one incoming message, returning the reply if there is one.
///
/// `on_synced` runs after a Step2 has been applied.
pub fn handle_message<F: FnOnce()>(
    doc: &Document,
    msg: &SyncMessage,
    origin: &str,
    on_synced: F,
) -> Result<Option<SyncMessage>, ProtocolError> {
    debug!(
        "Handling {} ({} bytes) for document {}",
        msg.kind,
        msg.buffer.len(),
        doc.id()
    );
    match msg.kind {
        MessageKind::Step1 => handle_step1(doc, &msg.buffer).map(Some),
        MessageKind::Step2 => {
            handle_step2(doc, &msg.buffer, origin)?;
            on_synced();
            Ok(None)
        }
        MessageKind::Update => {
            handle_update(doc, &msg.buffer, origin)?;
            Ok(None)
        }
    }
}

/// Progress of a two-way handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Nothing sent yet
    Idle,
    /// Our Step1 is out, waiting for the peer's Step2
    AwaitingStep1Response,
    /// We have the peer's state; the peer still needs ours
    AwaitingStep2Confirmation,
    /// Both replicas have exchanged their differences
    Synced,
}

/// Handshake state tracker for one peer connection.
#[derive(Debug, Clone)]
pub struct SyncSession {
    config: SyncConfig,
    state: SyncState,
    answered_peer: bool,
}

impl SyncSession {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            state: SyncState::Idle,
            answered_peer: false,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_synced(&self) -> bool {
        self.state == SyncState::Synced
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Begin as initiator.
    pub fn start(&mut self, doc: &Document) -> Result<SyncMessage, ProtocolError> {
        let msg = start(doc)?;
        self.state = SyncState::AwaitingStep1Response;
        Ok(msg)
    }

    /// Handle one incoming message and return the replies to send, in order.
    pub fn handle(
        &mut self,
        doc: &Document,
        msg: &SyncMessage,
    ) -> Result<Vec<SyncMessage>, ProtocolError> {
        let origin = self.config.remote_origin.as_str();
        match msg.kind {
            MessageKind::Step1 => {
                let mut replies = vec![handle_step1(doc, &msg.buffer)?];
                self.answered_peer = true;
                match self.state {
                    SyncState::Idle => {
                        replies.push(start(doc)?);
                        self.state = SyncState::AwaitingStep1Response;
                    }
                    SyncState::AwaitingStep2Confirmation => self.complete(doc),
                    SyncState::AwaitingStep1Response | SyncState::Synced => {}
                }
                Ok(replies)
            }
            MessageKind::Step2 => {
                if self.state != SyncState::AwaitingStep1Response {
                    // late or repeated Step2 still carries valid state
                    debug!("Step2 received in state {:?}", self.state);
                }
                handle_step2(doc, &msg.buffer, origin)?;
                if self.state == SyncState::AwaitingStep1Response {
                    if self.answered_peer {
                        self.complete(doc);
                    } else {
                        self.state = SyncState::AwaitingStep2Confirmation;
                    }
                }
                Ok(Vec::new())
            }
            MessageKind::Update => {
                handle_update(doc, &msg.buffer, origin)?;
                Ok(Vec::new())
            }
        }
    }

    /// Start over, e.g. after a reconnect.
    pub fn reset(&mut self) {
        self.state = SyncState::Idle;
        self.answered_peer = false;
    }

    fn complete(&mut self, doc: &Document) {
        self.state = SyncState::Synced;
        info!("Document {} synced with peer", doc.id());
    }
}

/// Expect `msg` to be of `kind`.
pub fn expect_kind(msg: &SyncMessage, kind: MessageKind) -> Result<(), ProtocolError> {
    if msg.kind == kind {
        Ok(())
    } else {
        Err(ProtocolError::UnexpectedMessage {
            expected: kind,
            got: msg.kind,
        })
    }
}
