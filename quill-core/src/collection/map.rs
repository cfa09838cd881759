use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;
use yrs::{Map, MapRef, Observable, ReadTxn};

use super::{Collection, CollectionKind, SharedRef};
use crate::change::{decode_out, out_str, MapChange};
use crate::codec;
use crate::document::DocHandle;
use crate::error::DocError;
use crate::subscription::{Gate, Subscription};
use crate::transaction::Transaction;

/// Shared string-keyed map of encoded values.
///
/// Iteration order is whatever the engine yields, not insertion order.
#[derive(Clone)]
pub struct MapCollection {
    handle: DocHandle,
    name: String,
    map: MapRef,
}

impl MapCollection {
    pub(crate) fn new(handle: DocHandle, name: &str) -> Self {
        let map = handle.raw().get_or_insert_map(name);
        Self {
            handle,
            name: name.to_owned(),
            map,
        }
    }

    fn entries<R: ReadTxn>(&self, txn: &R) -> Vec<(String, String)> {
        self.map
            .iter(txn)
            .filter_map(|(key, out)| out_str(&out).map(|v| (key.to_owned(), v.to_owned())))
            .collect()
    }

    pub fn get_in<T: DeserializeOwned>(
        &self,
        txn: &Transaction<'_>,
        key: &str,
    ) -> Result<Option<T>, DocError> {
        Ok(self
            .map
            .get(txn.engine()?, key)
            .and_then(|out| decode_out(&out)))
    }

    /// Value under `key`; `None` when missing or not decodable as `T`.
    ///
    /// Also `None` while a transaction is open on the document, which looks
    /// the same as a missing key. Read through [`get_in`](Self::get_in) there.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.handle
            .read(|txn| self.map.get(txn, key).and_then(|out| decode_out(&out)))
    }

    /// Store `value` under `key`. A value encoding to `null` removes the key.
    pub fn set_in<T: Serialize + ?Sized>(
        &self,
        txn: &mut Transaction<'_>,
        key: &str,
        value: &T,
    ) -> Result<(), DocError> {
        let encoded = codec::encode(value)?;
        let txn = txn.engine_mut()?;
        if encoded == "null" {
            self.map.remove(txn, key);
        } else {
            self.map.insert(txn, key, encoded);
        }
        Ok(())
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), DocError> {
        self.handle.write(|txn| self.set_in(txn, key, value))
    }

    pub fn contains_key_in(&self, txn: &Transaction<'_>, key: &str) -> Result<bool, DocError> {
        Ok(self.map.contains_key(txn.engine()?, key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.handle.read(|txn| self.map.contains_key(txn, key))
    }

    /// Remove `key`; nothing happens if it is missing.
    pub fn remove_value_in(&self, txn: &mut Transaction<'_>, key: &str) -> Result<(), DocError> {
        self.map.remove(txn.engine_mut()?, key);
        Ok(())
    }

    pub fn remove_value(&self, key: &str) -> Result<(), DocError> {
        self.handle.write(|txn| self.remove_value_in(txn, key))
    }

    pub fn remove_all_in(&self, txn: &mut Transaction<'_>) -> Result<(), DocError> {
        self.map.clear(txn.engine_mut()?);
        Ok(())
    }

    pub fn remove_all(&self) -> Result<(), DocError> {
        self.handle.write(|txn| self.remove_all_in(txn))
    }

    /// Visit every key. Callbacks run after the read snapshot is released.
    pub fn keys<F: FnMut(&str)>(&self, mut f: F) {
        let keys: Vec<String> = self
            .handle
            .read(|txn| self.map.keys(txn).map(str::to_owned).collect());
        for key in &keys {
            f(key);
        }
    }

    /// Visit every value that decodes as `T`.
    pub fn values<T: DeserializeOwned, F: FnMut(T)>(&self, mut f: F) {
        self.each(|_, value| f(value));
    }

    /// Visit every entry whose value decodes as `T`.
    pub fn each<T: DeserializeOwned, F: FnMut(&str, T)>(&self, mut f: F) {
        let entries = self.handle.read(|txn| self.entries(txn));
        for (key, encoded) in entries {
            if let Some(value) = codec::decode(&encoded) {
                f(&key, value);
            }
        }
    }

    pub fn to_map_in<T: DeserializeOwned>(
        &self,
        txn: &Transaction<'_>,
    ) -> Result<HashMap<String, T>, DocError> {
        Ok(self
            .entries(txn.engine()?)
            .into_iter()
            .filter_map(|(key, encoded)| codec::decode(&encoded).map(|v| (key, v)))
            .collect())
    }

    /// Snapshot of every entry whose value decodes as `T`.
    pub fn to_map<T: DeserializeOwned>(&self) -> HashMap<String, T> {
        let mut map = HashMap::new();
        self.each(|key, value| {
            map.insert(key.to_owned(), value);
        });
        map
    }

    pub fn len_in(&self, txn: &Transaction<'_>) -> Result<u32, DocError> {
        Ok(self.map.len(txn.engine()?))
    }

    /// `0` if the document is released or a transaction is open on it.
    pub fn len(&self) -> u32 {
        self.handle.read(|txn| self.map.len(txn))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call `f` with the per-key changes of every committed transaction touching this map.
    pub fn observe<T, F>(&self, f: F) -> Subscription
    where
        T: DeserializeOwned + 'static,
        F: Fn(&[MapChange<T>]) + Send + Sync + 'static,
    {
        let gate = Gate::open();
        let delivery = gate.clone();
        let inner = self.map.observe(move |txn, event| {
            if !delivery.is_open() {
                return;
            }
            let changes = MapChange::batch(event.keys(txn));
            if !changes.is_empty() {
                f(&changes);
            }
        });
        Subscription::new(gate, inner)
    }

    pub fn observe_channel<T>(&self) -> (Subscription, mpsc::UnboundedReceiver<Vec<MapChange<T>>>)
    where
        T: DeserializeOwned + Clone + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.observe(move |changes: &[MapChange<T>]| {
            let _ = tx.send(changes.to_vec());
        });
        (subscription, rx)
    }
}

impl Collection for MapCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> CollectionKind {
        CollectionKind::Map
    }

    fn shared_ref(&self) -> SharedRef {
        SharedRef::Map(self.map.clone())
    }
}
