use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;
use yrs::{Array, ArrayRef, Observable, ReadTxn};

use super::{check_range, Collection, CollectionKind, SharedRef};
use crate::change::{decode_out, out_str, ListChange};
use crate::codec;
use crate::document::DocHandle;
use crate::error::DocError;
use crate::subscription::{Gate, Subscription};
use crate::transaction::Transaction;

/// Shared ordered list of encoded values.
#[derive(Clone)]
pub struct ListCollection {
    handle: DocHandle,
    name: String,
    array: ArrayRef,
}

impl ListCollection {
    pub(crate) fn new(handle: DocHandle, name: &str) -> Self {
        let array = handle.raw().get_or_insert_array(name);
        Self {
            handle,
            name: name.to_owned(),
            array,
        }
    }

    fn element<T: DeserializeOwned, R: ReadTxn>(&self, txn: &R, index: u32) -> Option<T> {
        self.array.get(txn, index).and_then(|out| decode_out(&out))
    }

    fn elements<T: DeserializeOwned, R: ReadTxn>(&self, txn: &R) -> Vec<T> {
        let encoded: Vec<String> = self
            .array
            .iter(txn)
            .filter_map(|out| out_str(&out).map(str::to_owned))
            .collect();
        codec::decode_many(encoded)
    }

    /// Element at `index`; `None` when out of range or not decodable as `T`.
    pub fn get_in<T: DeserializeOwned>(
        &self,
        txn: &Transaction<'_>,
        index: u32,
    ) -> Result<Option<T>, DocError> {
        Ok(self.element(txn.engine()?, index))
    }

    /// Like [`get_in`](Self::get_in), but `None` as well while a transaction
    /// is open on the document or after release.
    pub fn get<T: DeserializeOwned>(&self, index: u32) -> Option<T> {
        self.handle.read(|txn| self.element(txn, index))
    }

    /// Replace the element at `index`.
    ///
    /// Performed as a removal followed by an insertion at the same index,
    /// not as an atomic replace.
    pub fn set_in<T: Serialize>(
        &self,
        txn: &mut Transaction<'_>,
        index: u32,
        value: &T,
    ) -> Result<(), DocError> {
        let encoded = codec::encode(value)?;
        let txn = txn.engine_mut()?;
        check_range(index, 1, self.array.len(&*txn))?;
        self.array.remove(txn, index);
        self.array.insert(txn, index, encoded);
        Ok(())
    }

    pub fn set<T: Serialize>(&self, index: u32, value: &T) -> Result<(), DocError> {
        self.handle.write(|txn| self.set_in(txn, index, value))
    }

    pub fn insert_in<T: Serialize>(
        &self,
        txn: &mut Transaction<'_>,
        index: u32,
        value: &T,
    ) -> Result<(), DocError> {
        let encoded = codec::encode(value)?;
        let txn = txn.engine_mut()?;
        check_range(index, 0, self.array.len(&*txn))?;
        self.array.insert(txn, index, encoded);
        Ok(())
    }

    pub fn insert<T: Serialize>(&self, index: u32, value: &T) -> Result<(), DocError> {
        self.handle.write(|txn| self.insert_in(txn, index, value))
    }

    pub fn insert_range_in<T: Serialize>(
        &self,
        txn: &mut Transaction<'_>,
        index: u32,
        values: &[T],
    ) -> Result<(), DocError> {
        let encoded = codec::encode_many(values)?;
        let txn = txn.engine_mut()?;
        check_range(index, 0, self.array.len(&*txn))?;
        if !encoded.is_empty() {
            self.array.insert_range(txn, index, encoded);
        }
        Ok(())
    }

    pub fn insert_range<T: Serialize>(&self, index: u32, values: &[T]) -> Result<(), DocError> {
        self.handle
            .write(|txn| self.insert_range_in(txn, index, values))
    }

    pub fn append_in<T: Serialize>(
        &self,
        txn: &mut Transaction<'_>,
        value: &T,
    ) -> Result<(), DocError> {
        let encoded = codec::encode(value)?;
        self.array.push_back(txn.engine_mut()?, encoded);
        Ok(())
    }

    pub fn append<T: Serialize>(&self, value: &T) -> Result<(), DocError> {
        self.handle.write(|txn| self.append_in(txn, value))
    }

    pub fn prepend_in<T: Serialize>(
        &self,
        txn: &mut Transaction<'_>,
        value: &T,
    ) -> Result<(), DocError> {
        let encoded = codec::encode(value)?;
        self.array.push_front(txn.engine_mut()?, encoded);
        Ok(())
    }

    pub fn prepend<T: Serialize>(&self, value: &T) -> Result<(), DocError> {
        self.handle.write(|txn| self.prepend_in(txn, value))
    }

    pub fn remove_in(&self, txn: &mut Transaction<'_>, index: u32) -> Result<(), DocError> {
        self.remove_range_in(txn, index, 1)
    }

    pub fn remove(&self, index: u32) -> Result<(), DocError> {
        self.handle.write(|txn| self.remove_in(txn, index))
    }

    pub fn remove_range_in(
        &self,
        txn: &mut Transaction<'_>,
        index: u32,
        len: u32,
    ) -> Result<(), DocError> {
        let txn = txn.engine_mut()?;
        check_range(index, len, self.array.len(&*txn))?;
        if len > 0 {
            self.array.remove_range(txn, index, len);
        }
        Ok(())
    }

    pub fn remove_range(&self, index: u32, len: u32) -> Result<(), DocError> {
        self.handle.write(|txn| self.remove_range_in(txn, index, len))
    }

    /// All elements that decode as `T`, in list order.
    pub fn to_vec_in<T: DeserializeOwned>(&self, txn: &Transaction<'_>) -> Result<Vec<T>, DocError> {
        Ok(self.elements(txn.engine()?))
    }

    pub fn to_vec<T: DeserializeOwned>(&self) -> Vec<T> {
        self.handle.read(|txn| self.elements(txn))
    }

    /// Visit every element that decodes as `T`.
    ///
    /// The snapshot is taken first, so `f` may mutate the document.
    pub fn for_each<T: DeserializeOwned, F: FnMut(T)>(&self, f: F) {
        self.to_vec().into_iter().for_each(f);
    }

    pub fn len_in(&self, txn: &Transaction<'_>) -> Result<u32, DocError> {
        Ok(self.array.len(txn.engine()?))
    }

    /// `0` if the document is released or a transaction is open on it.
    pub fn len(&self) -> u32 {
        self.handle.read(|txn| self.array.len(txn))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call `f` with the changes of every committed transaction touching this list.
    pub fn observe<T, F>(&self, f: F) -> Subscription
    where
        T: DeserializeOwned + 'static,
        F: Fn(&[ListChange<T>]) + Send + Sync + 'static,
    {
        let gate = Gate::open();
        let delivery = gate.clone();
        let inner = self.array.observe(move |txn, event| {
            if !delivery.is_open() {
                return;
            }
            let changes: Vec<ListChange<T>> = event
                .delta(txn)
                .iter()
                .map(ListChange::from_change)
                .collect();
            if !changes.is_empty() {
                f(&changes);
            }
        });
        Subscription::new(gate, inner)
    }

    pub fn observe_channel<T>(&self) -> (Subscription, mpsc::UnboundedReceiver<Vec<ListChange<T>>>)
    where
        T: DeserializeOwned + Clone + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.observe(move |changes: &[ListChange<T>]| {
            let _ = tx.send(changes.to_vec());
        });
        (subscription, rx)
    }
}

impl Collection for ListCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> CollectionKind {
        CollectionKind::List
    }

    fn shared_ref(&self) -> SharedRef {
        SharedRef::List(self.array.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;
    use serde::Deserialize;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Card {
        rank: String,
    }

    fn card(rank: &str) -> Card {
        Card { rank: rank.into() }
    }

    #[test]
    fn test_set_and_remove_scenario() {
        let doc = Document::new();
        let list = doc.list("hand").unwrap();
        list.insert_range(0, &[card("A"), card("K"), card("J")])
            .unwrap();
        list.set(0, &card("B")).unwrap();
        list.remove(1).unwrap();

        assert_eq!(list.to_vec::<Card>(), vec![card("B"), card("J")]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_get_out_of_range_is_none() {
        let doc = Document::new();
        let list = doc.list("l").unwrap();
        assert_eq!(list.get::<i32>(0), None);
        list.append(&1).unwrap();
        assert_eq!(list.get::<i32>(0), Some(1));
        assert_eq!(list.get::<i32>(1), None);
        assert_eq!(list.get::<i32>(u32::MAX), None);
    }

    #[test]
    fn test_get_wrong_shape_is_none() {
        let doc = Document::new();
        let list = doc.list("l").unwrap();
        list.append(&"text").unwrap();
        assert_eq!(list.get::<Card>(0), None);
        assert_eq!(list.get::<String>(0), Some("text".to_string()));
    }

    #[test]
    fn test_append_prepend() {
        let doc = Document::new();
        let list = doc.list("l").unwrap();
        list.append(&2).unwrap();
        list.prepend(&1).unwrap();
        list.append(&3).unwrap();
        assert_eq!(list.to_vec::<i32>(), vec![1, 2, 3]);

        let mut seen = Vec::new();
        list.for_each(|v: i32| seen.push(v * 10));
        assert_eq!(seen, vec![10, 20, 30]);
    }

    #[test]
    fn test_mixed_shapes_filtered() {
        let doc = Document::new();
        let list = doc.list("l").unwrap();
        list.append(&1).unwrap();
        list.append(&"two").unwrap();
        list.append(&3).unwrap();
        assert_eq!(list.to_vec::<i32>(), vec![1, 3]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_out_of_range_mutations() {
        let doc = Document::new();
        let list = doc.list("l").unwrap();
        list.append(&1).unwrap();
        assert!(matches!(
            list.set(1, &2),
            Err(DocError::IndexOutOfBounds { index: 1, len: 1 })
        ));
        assert!(list.insert(2, &2).is_err());
        assert!(list.remove(1).is_err());
        assert!(list.remove_range(0, 2).is_err());
        assert_eq!(list.to_vec::<i32>(), vec![1]);
    }

    #[test]
    fn test_remove_range() {
        let doc = Document::new();
        let list = doc.list("l").unwrap();
        list.insert_range(0, &[1, 2, 3, 4, 5]).unwrap();
        list.remove_range(1, 3).unwrap();
        assert_eq!(list.to_vec::<i32>(), vec![1, 5]);
        list.remove_range(0, 0).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_observe_batches() {
        let doc = Document::new();
        let list = doc.list("l").unwrap();
        list.insert_range(0, &[1, 2, 3]).unwrap();

        let batches = Arc::new(Mutex::new(Vec::new()));
        let sink = batches.clone();
        let _sub = list.observe(move |changes: &[ListChange<i32>]| {
            sink.lock().unwrap().push(changes.to_vec())
        });

        doc.run_in_transaction(None, |txn| {
            list.remove_in(txn, 0)?;
            list.append_in(txn, &4)
        })
        .unwrap();

        let batches = batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0],
            vec![
                ListChange::Removed(1),
                ListChange::Retained(2),
                ListChange::Added(vec![4]),
            ]
        );
    }

    #[test]
    fn test_in_transaction_reads() {
        let doc = Document::new();
        let list = doc.list("l").unwrap();
        let mut txn = doc.transact(None).unwrap();
        list.append_in(&mut txn, &"a").unwrap();
        assert_eq!(list.get_in::<String>(&txn, 0).unwrap(), Some("a".into()));
        assert_eq!(list.to_vec_in::<String>(&txn).unwrap(), vec!["a".to_string()]);
        assert_eq!(list.len_in(&txn).unwrap(), 1);
        txn.free();
        assert_eq!(list.append_in(&mut txn, &"b"), Err(DocError::TransactionFreed));
    }
}
