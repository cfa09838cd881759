//! Explicit mutation scope over a document.
//!
//! ```text
//! open ──free()/drop──► freed
//! ```
//!
//! A [`Transaction`] owns the engine's read-write transaction for its
//! lifetime. Committing happens when the engine transaction is dropped,
//! which happens exactly once no matter how many times `free` is called.
//! Observers of every touched collection fire during that commit.

use yrs::{Doc, Transact, TransactionMut};

use crate::error::DocError;

/// A single atomic batch of mutations, optionally tagged with an origin.
pub struct Transaction<'doc> {
    inner: Option<TransactionMut<'doc>>,
    origin: Option<String>,
}

impl<'doc> Transaction<'doc> {
    pub(crate) fn begin(doc: &'doc Doc, origin: Option<&str>) -> Result<Self, DocError> {
        let inner = match origin {
            Some(origin) => doc.try_transact_mut_with(origin),
            None => doc.try_transact_mut(),
        }
        .map_err(|e| DocError::TransactionBusy(e.to_string()))?;

        log::trace!("Transaction opened (origin: {origin:?})");
        Ok(Self {
            inner: Some(inner),
            origin: origin.map(str::to_owned),
        })
    }

    /// Origin tag supplied when the transaction was opened.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Whether mutations may still be applied.
    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    /// Commit and release the engine transaction.
    ///
    /// Idempotent: only the first call reaches the engine.
    pub fn free(&mut self) {
        if let Some(inner) = self.inner.take() {
            drop(inner);
            log::trace!("Transaction committed (origin: {:?})", self.origin);
        }
    }

    pub(crate) fn engine(&self) -> Result<&TransactionMut<'doc>, DocError> {
        self.inner.as_ref().ok_or(DocError::TransactionFreed)
    }

    pub(crate) fn engine_mut(&mut self) -> Result<&mut TransactionMut<'doc>, DocError> {
        self.inner.as_mut().ok_or(DocError::TransactionFreed)
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.free();
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("origin", &self.origin)
            .field("open", &self.is_open())
            .finish()
    }
}
