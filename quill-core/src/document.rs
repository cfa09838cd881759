//! Document: owner of one engine replica.
//!
//! ```text
//! ┌──────────────────────── Document ────────────────────────┐
//! │  yrs::Doc (replica)                                      │
//! │    ├── "notes"  TextRef  ◄── TextCollection view(s)      │
//! │    ├── "items"  ArrayRef ◄── ListCollection view(s)      │
//! │    └── "meta"   MapRef   ◄── MapCollection view(s)       │
//! │                                                          │
//! │  transact() ──► Transaction ──commit──► observers fire   │
//! │  state_vector / diff / encode_full_state / apply_update  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Collections are cheap views: asking for the same name and kind twice
//! yields two views over the same engine value. All mutation goes
//! through a [`Transaction`], either one supplied by the caller or one
//! opened and committed around a single operation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use yrs::updates::decoder::Decode;
use yrs::updates::encoder::Encode;
use yrs::{Doc, ReadTxn, StateVector, Transact, Update};

use crate::collection::{
    AnyCollection, Collection, CollectionKind, ListCollection, MapCollection, TextCollection,
};
use crate::config::DocumentConfig;
use crate::error::DocError;
use crate::subscription::{Gate, Subscription};
use crate::transaction::Transaction;
use crate::undo::UndoManager;

/// Engine replica shared by a document and the collection views it hands out.
#[derive(Clone)]
pub(crate) struct DocHandle {
    doc: Doc,
    alive: Arc<AtomicBool>,
}

impl DocHandle {
    pub(crate) fn raw(&self) -> &Doc {
        &self.doc
    }

    pub(crate) fn engine(&self) -> Result<&Doc, DocError> {
        if self.alive.load(Ordering::Acquire) {
            Ok(&self.doc)
        } else {
            Err(DocError::Released)
        }
    }

    /// Run `f` in a transaction of its own, committed before returning.
    pub(crate) fn write<R>(
        &self,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<R, DocError>,
    ) -> Result<R, DocError> {
        let mut txn = Transaction::begin(self.engine()?, None)?;
        let result = f(&mut txn);
        txn.free();
        result
    }

    /// Run `f` against a read-only snapshot; a neutral value if none can be had.
    pub(crate) fn read<R: Default>(&self, f: impl FnOnce(&yrs::Transaction<'_>) -> R) -> R {
        let doc = match self.engine() {
            Ok(doc) => doc,
            Err(e) => {
                log::warn!("Read on unavailable document: {e}");
                return R::default();
            }
        };
        match doc.try_transact() {
            Ok(txn) => f(&txn),
            Err(e) => {
                log::warn!("Read skipped, document is mid-transaction: {e}");
                R::default()
            }
        }
    }
}

/// A shared document replica.
pub struct Document {
    id: String,
    handle: Option<DocHandle>,
    config: DocumentConfig,
    kinds: Mutex<HashMap<String, CollectionKind>>,
}

impl Document {
    /// Create a document with a fresh, empty replica.
    pub fn new() -> Self {
        Self::with_config(DocumentConfig::default())
    }

    pub fn with_config(config: DocumentConfig) -> Self {
        let doc = Doc::with_options(config.engine_options());
        let id = doc.guid().to_string();
        log::debug!("Created document {id}");
        Self {
            id,
            handle: Some(DocHandle {
                doc,
                alive: Arc::new(AtomicBool::new(true)),
            }),
            config,
            kinds: Mutex::new(HashMap::new()),
        }
    }

    /// Replica identifier, used in log lines.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Engine client id stamped on edits made through this replica.
    pub fn client_id(&self) -> Result<u64, DocError> {
        Ok(self.engine()?.client_id())
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }

    fn handle(&self) -> Result<&DocHandle, DocError> {
        self.handle.as_ref().ok_or(DocError::Released)
    }

    fn engine(&self) -> Result<&Doc, DocError> {
        self.handle()?.engine()
    }

    /// Reserve `name` for `kind` and make sure the engine can create root types.
    fn claim(&self, name: &str, kind: CollectionKind) -> Result<&DocHandle, DocError> {
        let handle = self.handle()?;
        // root lookup needs exclusive engine access
        handle
            .engine()?
            .try_transact()
            .map_err(|e| DocError::TransactionBusy(e.to_string()))?;
        {
            let mut kinds = self.kinds.lock().unwrap_or_else(PoisonError::into_inner);
            match kinds.get(name) {
                Some(existing) if *existing != kind => {
                    return Err(DocError::KindMismatch {
                        name: name.to_owned(),
                        existing: *existing,
                        requested: kind,
                    });
                }
                Some(_) => {}
                None => {
                    kinds.insert(name.to_owned(), kind);
                }
            }
        }
        Ok(handle)
    }

    /// Shared text named `name`.
    pub fn text(&self, name: &str) -> Result<TextCollection, DocError> {
        let handle = self.claim(name, CollectionKind::Text)?;
        Ok(TextCollection::new(handle.clone(), name))
    }

    /// Shared ordered list named `name`.
    pub fn list(&self, name: &str) -> Result<ListCollection, DocError> {
        let handle = self.claim(name, CollectionKind::List)?;
        Ok(ListCollection::new(handle.clone(), name))
    }

    /// Shared map named `name`.
    pub fn map(&self, name: &str) -> Result<MapCollection, DocError> {
        let handle = self.claim(name, CollectionKind::Map)?;
        Ok(MapCollection::new(handle.clone(), name))
    }

    /// Collection of the given kind, for callers that pick the kind at runtime.
    pub fn collection(&self, name: &str, kind: CollectionKind) -> Result<AnyCollection, DocError> {
        Ok(match kind {
            CollectionKind::Text => AnyCollection::Text(self.text(name)?),
            CollectionKind::List => AnyCollection::List(self.list(name)?),
            CollectionKind::Map => AnyCollection::Map(self.map(name)?),
        })
    }

    /// Open a transaction. The caller owns it and must free (or drop) it.
    pub fn transact(&self, origin: Option<&str>) -> Result<Transaction<'_>, DocError> {
        Transaction::begin(self.engine()?, origin)
    }

    /// Run `body` inside a new transaction, freeing it on every exit path.
    pub fn run_in_transaction<R, E, F>(&self, origin: Option<&str>, body: F) -> Result<R, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<R, E>,
        E: From<DocError>,
    {
        let mut txn = self.transact(origin)?;
        let result = body(&mut txn);
        txn.free();
        result
    }

    /// Encoded state vector summarizing what this replica has seen.
    pub fn state_vector(&self) -> Result<Vec<u8>, DocError> {
        let txn = self
            .engine()?
            .try_transact()
            .map_err(|e| DocError::TransactionBusy(e.to_string()))?;
        Ok(txn.state_vector().encode_v1())
    }

    pub fn state_vector_in(&self, txn: &Transaction<'_>) -> Result<Vec<u8>, DocError> {
        Ok(txn.engine()?.state_vector().encode_v1())
    }

    /// Update holding everything a peer with `peer_state_vector` is missing.
    pub fn diff(&self, peer_state_vector: &[u8]) -> Result<Vec<u8>, DocError> {
        let sv = StateVector::decode_v1(peer_state_vector)?;
        let txn = self
            .engine()?
            .try_transact()
            .map_err(|e| DocError::TransactionBusy(e.to_string()))?;
        Ok(txn.encode_diff_v1(&sv))
    }

    pub fn diff_in(&self, txn: &Transaction<'_>, peer_state_vector: &[u8]) -> Result<Vec<u8>, DocError> {
        let sv = StateVector::decode_v1(peer_state_vector)?;
        Ok(txn.engine()?.encode_diff_v1(&sv))
    }

    /// Update encoding the whole document.
    pub fn encode_full_state(&self) -> Result<Vec<u8>, DocError> {
        let txn = self
            .engine()?
            .try_transact()
            .map_err(|e| DocError::TransactionBusy(e.to_string()))?;
        Ok(txn.encode_state_as_update_v1(&StateVector::default()))
    }

    pub fn encode_full_state_in(&self, txn: &Transaction<'_>) -> Result<Vec<u8>, DocError> {
        Ok(txn
            .engine()?
            .encode_state_as_update_v1(&StateVector::default()))
    }

    /// Merge an update produced by this or any other replica.
    ///
    /// Applying the same update twice is harmless. Malformed bytes are a
    /// hard error.
    pub fn apply_update(&self, update: &[u8]) -> Result<(), DocError> {
        self.run_in_transaction(None, |txn| self.apply_update_in(txn, update))
    }

    /// Like [`apply_update`](Self::apply_update), tagging the transaction with `origin`.
    pub fn apply_update_with_origin(&self, update: &[u8], origin: &str) -> Result<(), DocError> {
        self.run_in_transaction(Some(origin), |txn| self.apply_update_in(txn, update))
    }

    pub fn apply_update_in(&self, txn: &mut Transaction<'_>, update: &[u8]) -> Result<(), DocError> {
        let decoded = Update::decode_v1(update)?;
        txn.engine_mut()?
            .apply_update(decoded)
            .map_err(|e| DocError::Apply(e.to_string()))?;
        log::debug!("Applied {} byte update to document {}", update.len(), self.id);
        Ok(())
    }

    /// Observe every committed transaction as a v1 update plus its origin.
    pub fn observe_updates<F>(&self, f: F) -> Result<Subscription, DocError>
    where
        F: Fn(&[u8], Option<&str>) + Send + Sync + 'static,
    {
        let gate = Gate::open();
        let delivery = gate.clone();
        let inner = self
            .engine()?
            .observe_update_v1(move |txn, event| {
                if !delivery.is_open() {
                    return;
                }
                let origin = txn
                    .origin()
                    .map(|o| String::from_utf8_lossy(o.as_ref()).into_owned());
                f(&event.update, origin.as_deref());
            })
            .map_err(|e| DocError::TransactionBusy(format!("{e:?}")))?;
        Ok(Subscription::new(gate, inner))
    }

    /// Undo manager scoped to `tracked`.
    pub fn undo_manager(&self, tracked: &[&dyn Collection]) -> Result<UndoManager, DocError> {
        UndoManager::new(self.engine()?, tracked, &self.config)
    }

    /// Release the replica. Views handed out earlier become inert.
    pub fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.alive.store(false, Ordering::Release);
            log::info!("Released document {}", self.id);
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_client_ids_differ() {
        let a = Document::new();
        let b = Document::new();
        assert_ne!(a.client_id().unwrap(), b.client_id().unwrap());
        assert!(!a.id().is_empty());
    }

    #[test]
    fn test_same_name_same_value() {
        let doc = Document::new();
        let first = doc.text("notes").unwrap();
        let second = doc.text("notes").unwrap();
        first.append("shared").unwrap();
        assert_eq!(second.get_string(), "shared");
    }

    #[test]
    fn test_kind_mismatch() {
        let doc = Document::new();
        doc.map("m").unwrap();
        assert!(matches!(
            doc.text("m"),
            Err(DocError::KindMismatch {
                existing: CollectionKind::Map,
                requested: CollectionKind::Text,
                ..
            })
        ));
    }

    #[test]
    fn test_collection_by_kind() {
        let doc = Document::new();
        let any = doc.collection("items", CollectionKind::List).unwrap();
        assert_eq!(any.kind(), CollectionKind::List);
        assert_eq!(any.name(), "items");
    }

    #[test]
    fn test_collection_while_transaction_open() {
        let doc = Document::new();
        let _txn = doc.transact(None).unwrap();
        assert!(matches!(doc.text("t"), Err(DocError::TransactionBusy(_))));
    }

    #[test]
    fn test_busy_lookup_does_not_reserve_name() {
        let doc = Document::new();
        let mut txn = doc.transact(None).unwrap();
        assert!(matches!(doc.map("x"), Err(DocError::TransactionBusy(_))));
        txn.free();

        let text = doc.text("x").unwrap();
        text.append("free").unwrap();
        assert_eq!(text.get_string(), "free");
    }

    #[test]
    fn test_run_in_transaction_frees_on_error() {
        let doc = Document::new();
        let text = doc.text("t").unwrap();

        let result: Result<(), DocError> = doc.run_in_transaction(None, |txn| {
            text.append_in(txn, "partial")?;
            Err(DocError::EmptyUndoScope)
        });
        assert_eq!(result, Err(DocError::EmptyUndoScope));

        // transaction was freed, so a new one can be opened
        let txn = doc.transact(None).unwrap();
        assert!(txn.is_open());
        drop(txn);
        assert_eq!(text.get_string(), "partial");
    }

    #[test]
    fn test_run_in_transaction_returns_body_result() {
        let doc = Document::new();
        let list = doc.list("l").unwrap();
        let len = doc
            .run_in_transaction(Some("local"), |txn| {
                assert_eq!(txn.origin(), Some("local"));
                list.append_in(txn, &1)?;
                list.append_in(txn, &2)?;
                list.len_in(txn)
            })
            .unwrap();
        assert_eq!(len, 2);
    }

    #[test]
    fn test_full_state_roundtrip() {
        let source = Document::new();
        source.text("t").unwrap().append("hello").unwrap();
        source.map("m").unwrap().set("k", &7).unwrap();

        let target = Document::new();
        target.apply_update(&source.encode_full_state().unwrap()).unwrap();
        assert_eq!(target.text("t").unwrap().get_string(), "hello");
        assert_eq!(target.map("m").unwrap().get::<i32>("k"), Some(7));
    }

    #[test]
    fn test_diff_against_state_vector() {
        let a = Document::new();
        let b = Document::new();
        a.text("t").unwrap().append("one").unwrap();
        b.apply_update(&a.encode_full_state().unwrap()).unwrap();

        a.text("t").unwrap().append(" two").unwrap();
        let diff = a.diff(&b.state_vector().unwrap()).unwrap();
        b.apply_update(&diff).unwrap();
        assert_eq!(b.text("t").unwrap().get_string(), "one two");
    }

    #[test]
    fn test_idempotent_apply() {
        let a = Document::new();
        a.list("l").unwrap().insert_range(0, &["x", "y"]).unwrap();
        let update = a.encode_full_state().unwrap();

        let b = Document::new();
        b.apply_update(&update).unwrap();
        let once: Vec<String> = b.list("l").unwrap().to_vec();
        b.apply_update(&update).unwrap();
        let twice: Vec<String> = b.list("l").unwrap().to_vec();
        assert_eq!(once, twice);
        assert_eq!(twice, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_malformed_update_is_error() {
        let doc = Document::new();
        assert!(doc.apply_update(&[0xFF, 0xFF, 0xFF, 0xFF]).is_err());
        assert!(matches!(doc.diff(&[0xFF, 0xFF, 0xFF]), Err(DocError::Decode(_))));
    }

    #[test]
    fn test_in_transaction_encoders() {
        let doc = Document::new();
        let text = doc.text("t").unwrap();
        let mut txn = doc.transact(None).unwrap();
        text.append_in(&mut txn, "abc").unwrap();
        let sv = doc.state_vector_in(&txn).unwrap();
        let full = doc.encode_full_state_in(&txn).unwrap();
        let empty_diff = doc.diff_in(&txn, &sv).unwrap();
        txn.free();

        let other = Document::new();
        other.apply_update(&full).unwrap();
        assert_eq!(other.text("t").unwrap().get_string(), "abc");
        // diff against our own state vector carries no content
        other.apply_update(&empty_diff).unwrap();
        assert_eq!(other.text("t").unwrap().get_string(), "abc");
    }

    #[test]
    fn test_observe_updates_reports_origin() {
        let doc = Document::new();
        let text = doc.text("t").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let _sub = doc
            .observe_updates(move |update, origin| {
                sink.lock()
                    .unwrap()
                    .push((update.len(), origin.map(str::to_owned)));
            })
            .unwrap();

        text.append("local").unwrap();
        doc.run_in_transaction(Some("remote"), |txn| text.append_in(txn, "!"))
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].0 > 0);
        assert_eq!(seen[0].1, None);
        assert_eq!(seen[1].1.as_deref(), Some("remote"));
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut doc = Document::new();
        let text = doc.text("t").unwrap();
        doc.release();
        doc.release();
        assert!(doc.is_released());
        assert!(matches!(doc.transact(None), Err(DocError::Released)));
        assert!(matches!(doc.state_vector(), Err(DocError::Released)));
        assert!(matches!(text.append("x"), Err(DocError::Released)));
        assert_eq!(text.get_string(), "");
    }

    #[test]
    fn test_released_document_does_not_touch_others() {
        let mut a = Document::new();
        let b = Document::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _sub = b
            .text("t")
            .unwrap()
            .observe(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        a.release();
        b.text("t").unwrap().append("still alive").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
