//! The state-RW contract: a generic key/value store with prefix iteration
//! and a transactional-snapshot primitive used to roll back a failed
//! transaction's side effects (spec §3, §7).
//!
//! This is the ledger's sole piece of shared mutable state (design note §9):
//! every other component (fork manager, fee manager, validator manager,
//! bridge, rollup aggregator, ...) holds only a handle into this map, never
//! its own copy of account or contract state.

use std::collections::BTreeMap;

use crate::error::Result;

/// An in-memory, sorted key/value store. Sorted iteration order makes the
/// ledger's state-root computation deterministic regardless of insertion
/// order (spec §4.1, §8).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateStore {
    map: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl StateStore {
    pub fn new() -> Self {
        StateStore { map: BTreeMap::new() }
    }

    pub fn get(&self, key: &[u8]) -> Option<&Vec<u8>> {
        self.map.get(key)
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.map.insert(key.into(), value.into());
    }

    pub fn delete(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        self.map.remove(key)
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Lazily enumerate every (key, value) pair whose key begins with
    /// `prefix`, in sorted key order, exactly once per call.
    pub fn prefix_iter(&self, prefix: &[u8]) -> impl Iterator<Item = (&Vec<u8>, &Vec<u8>)> + '_ {
        let prefix = prefix.to_vec();
        self.map
            .range(prefix.clone()..)
            .take_while(move |(k, _)| k.starts_with(&prefix))
    }

    /// Delete every entry whose key begins with `prefix`; returns the count removed.
    pub fn delete_prefix(&mut self, prefix: &[u8]) -> usize {
        let keys: Vec<Vec<u8>> = self.prefix_iter(prefix).map(|(k, _)| k.clone()).collect();
        let count = keys.len();
        for k in keys {
            self.map.remove(&k);
        }
        count
    }

    /// SHA-256 of concatenated (key || value) pairs in sorted key order —
    /// the ledger's state root (spec §4.1).
    pub fn state_root(&self) -> crate::types::Hash {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        for (k, v) in &self.map {
            hasher.update(k);
            hasher.update(v);
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        crate::types::Hash(bytes)
    }

    /// Full serialisable snapshot of the store.
    pub fn snapshot(&self) -> StateStore {
        self.clone()
    }

    pub fn restore(&mut self, snapshot: StateStore) {
        self.map = snapshot.map;
    }

    /// Run `f` against this store. If `f` returns an error, every mutation
    /// made during the call is rolled back and the error is propagated
    /// (spec §7: "the state-RW snapshot primitive wraps a closure and
    /// restores all mutations on error").
    pub fn with_snapshot<T>(&mut self, f: impl FnOnce(&mut StateStore) -> Result<T>) -> Result<T> {
        let before = self.snapshot();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.restore(before);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_iteration_enumerates_matching_keys_once() {
        let mut store = StateStore::new();
        store.put(b"a:1".to_vec(), b"x".to_vec());
        store.put(b"a:2".to_vec(), b"y".to_vec());
        store.put(b"b:1".to_vec(), b"z".to_vec());
        let matched: Vec<_> = store.prefix_iter(b"a:").collect();
        assert_eq!(matched.len(), 2);
    }

    #[test]
    fn state_root_is_order_independent() {
        let mut s1 = StateStore::new();
        s1.put(b"a".to_vec(), b"1".to_vec());
        s1.put(b"b".to_vec(), b"2".to_vec());

        let mut s2 = StateStore::new();
        s2.put(b"b".to_vec(), b"2".to_vec());
        s2.put(b"a".to_vec(), b"1".to_vec());

        assert_eq!(s1.state_root(), s2.state_root());
    }

    #[test]
    fn with_snapshot_rolls_back_on_error() {
        let mut store = StateStore::new();
        store.put(b"k".to_vec(), b"v1".to_vec());
        let result: Result<()> = store.with_snapshot(|s| {
            s.put(b"k".to_vec(), b"v2".to_vec());
            Err(crate::error::SynnergyError::InvalidInput("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(store.get(b"k"), Some(&b"v1".to_vec()));
    }

    #[test]
    fn delete_prefix_removes_every_match() {
        let mut store = StateStore::new();
        store.put(b"sc:hdr:1:0".to_vec(), b"a".to_vec());
        store.put(b"sc:hdr:1:1".to_vec(), b"b".to_vec());
        store.put(b"sc:hdr:2:0".to_vec(), b"c".to_vec());
        let removed = store.delete_prefix(b"sc:hdr:1:");
        assert_eq!(removed, 2);
        assert!(store.contains(b"sc:hdr:2:0"));
    }
}
