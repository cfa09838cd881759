use serde::Serialize;
use tokio::sync::mpsc;
use yrs::{GetString, Observable, Text, TextRef};

use super::{check_range, Collection, CollectionKind, SharedRef};
use crate::change::TextChange;
use crate::codec::{self, Attributes};
use crate::document::DocHandle;
use crate::error::DocError;
use crate::subscription::{Gate, Subscription};
use crate::transaction::Transaction;

/// Shared rich text.
///
/// Positions are measured in the unit configured by
/// [`TextIndexing`](crate::TextIndexing).
#[derive(Clone)]
pub struct TextCollection {
    handle: DocHandle,
    name: String,
    text: TextRef,
}

impl TextCollection {
    pub(crate) fn new(handle: DocHandle, name: &str) -> Self {
        let text = handle.raw().get_or_insert_text(name);
        Self {
            handle,
            name: name.to_owned(),
            text,
        }
    }

    pub fn append_in(&self, txn: &mut Transaction<'_>, chunk: &str) -> Result<(), DocError> {
        let txn = txn.engine_mut()?;
        self.text.push(txn, chunk);
        Ok(())
    }

    pub fn append(&self, chunk: &str) -> Result<(), DocError> {
        self.handle.write(|txn| self.append_in(txn, chunk))
    }

    pub fn insert_in(
        &self,
        txn: &mut Transaction<'_>,
        index: u32,
        chunk: &str,
    ) -> Result<(), DocError> {
        let txn = txn.engine_mut()?;
        check_range(index, 0, self.text.len(&*txn))?;
        self.text.insert(txn, index, chunk);
        Ok(())
    }

    pub fn insert(&self, index: u32, chunk: &str) -> Result<(), DocError> {
        self.handle.write(|txn| self.insert_in(txn, index, chunk))
    }

    pub fn insert_with_attributes_in(
        &self,
        txn: &mut Transaction<'_>,
        index: u32,
        chunk: &str,
        attributes: &Attributes,
    ) -> Result<(), DocError> {
        let txn = txn.engine_mut()?;
        check_range(index, 0, self.text.len(&*txn))?;
        self.text
            .insert_with_attributes(txn, index, chunk, codec::attributes_to_engine(attributes));
        Ok(())
    }

    pub fn insert_with_attributes(
        &self,
        index: u32,
        chunk: &str,
        attributes: &Attributes,
    ) -> Result<(), DocError> {
        self.handle
            .write(|txn| self.insert_with_attributes_in(txn, index, chunk, attributes))
    }

    /// Insert an embedded value, stored in its encoded form.
    pub fn insert_embed_in<T: Serialize>(
        &self,
        txn: &mut Transaction<'_>,
        index: u32,
        value: &T,
    ) -> Result<(), DocError> {
        let encoded = codec::encode(value)?;
        let txn = txn.engine_mut()?;
        check_range(index, 0, self.text.len(&*txn))?;
        self.text.insert_embed(txn, index, codec::embed_to_engine(encoded));
        Ok(())
    }

    pub fn insert_embed<T: Serialize>(&self, index: u32, value: &T) -> Result<(), DocError> {
        self.handle.write(|txn| self.insert_embed_in(txn, index, value))
    }

    /// Apply formatting attributes to `len` units starting at `index`.
    pub fn format_in(
        &self,
        txn: &mut Transaction<'_>,
        index: u32,
        len: u32,
        attributes: &Attributes,
    ) -> Result<(), DocError> {
        let txn = txn.engine_mut()?;
        check_range(index, len, self.text.len(&*txn))?;
        self.text
            .format(txn, index, len, codec::attributes_to_engine(attributes));
        Ok(())
    }

    pub fn format(&self, index: u32, len: u32, attributes: &Attributes) -> Result<(), DocError> {
        self.handle
            .write(|txn| self.format_in(txn, index, len, attributes))
    }

    pub fn remove_range_in(
        &self,
        txn: &mut Transaction<'_>,
        start: u32,
        len: u32,
    ) -> Result<(), DocError> {
        let txn = txn.engine_mut()?;
        check_range(start, len, self.text.len(&*txn))?;
        self.text.remove_range(txn, start, len);
        Ok(())
    }

    pub fn remove_range(&self, start: u32, len: u32) -> Result<(), DocError> {
        self.handle.write(|txn| self.remove_range_in(txn, start, len))
    }

    pub fn get_string_in(&self, txn: &Transaction<'_>) -> Result<String, DocError> {
        Ok(self.text.get_string(txn.engine()?))
    }

    /// Plain text content, without formatting.
    ///
    /// Empty if the document is released or a transaction is open on it;
    /// use [`get_string_in`](Self::get_string_in) inside a transaction.
    pub fn get_string(&self) -> String {
        self.handle.read(|txn| self.text.get_string(txn))
    }

    pub fn len_in(&self, txn: &Transaction<'_>) -> Result<u32, DocError> {
        Ok(self.text.len(txn.engine()?))
    }

    /// `0` if the document is released or a transaction is open on it.
    pub fn len(&self) -> u32 {
        self.handle.read(|txn| self.text.len(txn))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call `f` with the changes of every committed transaction touching this text.
    pub fn observe<F>(&self, f: F) -> Subscription
    where
        F: Fn(&[TextChange]) + Send + Sync + 'static,
    {
        let gate = Gate::open();
        let delivery = gate.clone();
        let inner = self.text.observe(move |txn, event| {
            if !delivery.is_open() {
                return;
            }
            let changes: Vec<TextChange> =
                event.delta(txn).iter().map(TextChange::from_delta).collect();
            if !changes.is_empty() {
                f(&changes);
            }
        });
        Subscription::new(gate, inner)
    }

    /// Like [`observe`](Self::observe), queueing batches on a channel instead.
    pub fn observe_channel(&self) -> (Subscription, mpsc::UnboundedReceiver<Vec<TextChange>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.observe(move |changes| {
            // receiver gone means nobody is listening any more
            let _ = tx.send(changes.to_vec());
        });
        (subscription, rx)
    }
}

impl Collection for TextCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> CollectionKind {
        CollectionKind::Text
    }

    fn shared_ref(&self) -> SharedRef {
        SharedRef::Text(self.text.clone())
    }
}
