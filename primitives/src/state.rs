//! Dirty-tracked transient state overlay.
//!
//! A `TransientState` holds, per contract, key/value entries flagged as
//! either clean (a read-through cache of committed state) or dirty (a write
//! that must show up in the output diff). Every call chain gets its own
//! overlay; a transaction set additionally shares one batch overlay that
//! accumulates the writes of successful transactions.
//!
//! Iteration follows insertion order per contract and per key, so diffs
//! built from the same ordered batch are identical on every node.

use indexmap::IndexMap;

use crate::execution::{ContractStateDiff, StateRecord};
use crate::types::ContractName;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    value: Vec<u8>,
    dirty: bool,
}

/// Per-contract key/value overlay with dirty flags.
///
/// There is no deletion: clearing a key is a dirty write of an empty value.
#[derive(Debug, Clone, Default)]
pub struct TransientState {
    contracts: IndexMap<ContractName, IndexMap<Vec<u8>, Entry>>,
}

impl TransientState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key of a contract.
    ///
    /// `Some(value)` means the overlay knows the key, even if the value is
    /// empty. `None` means the caller must look further down.
    pub fn get(&self, contract_name: &str, key: &[u8]) -> Option<&[u8]> {
        self.contracts
            .get(contract_name)
            .and_then(|keys| keys.get(key))
            .map(|entry| entry.value.as_slice())
    }

    /// Upsert a key. An existing key keeps its position in the order and
    /// gets its value and dirty flag replaced.
    pub fn set(&mut self, contract_name: &str, key: &[u8], value: Vec<u8>, dirty: bool) {
        let keys = self.contracts.entry(contract_name.to_owned()).or_default();
        match keys.get_mut(key) {
            Some(entry) => {
                entry.value = value;
                entry.dirty = dirty;
            }
            None => {
                keys.insert(key.to_vec(), Entry { value, dirty });
            }
        }
    }

    /// Visit the dirty keys of one contract in insertion order.
    pub fn for_each_dirty<F>(&self, contract_name: &str, mut f: F)
    where
        F: FnMut(&[u8], &[u8]),
    {
        if let Some(keys) = self.contracts.get(contract_name) {
            for (key, entry) in keys.iter().filter(|(_, entry)| entry.dirty) {
                f(key, &entry.value);
            }
        }
    }

    /// Replay every dirty entry into `target` as a dirty write.
    pub fn merge_into(&self, target: &mut TransientState) {
        for contract_name in self.contracts.keys() {
            self.for_each_dirty(contract_name, |key, value| {
                target.set(contract_name, key, value.to_vec(), true);
            });
        }
    }

    /// Replay every dirty entry into `target` as a clean entry, refreshing
    /// whatever `target` cached for those keys without making them part of
    /// its diff.
    pub fn merge_into_as_cache(&self, target: &mut TransientState) {
        for contract_name in self.contracts.keys() {
            self.for_each_dirty(contract_name, |key, value| {
                target.set(contract_name, key, value.to_vec(), false);
            });
        }
    }

    /// Contracts known to the overlay, in first-touch order.
    pub fn contract_names(&self) -> impl Iterator<Item = &str> {
        self.contracts.keys().map(String::as_str)
    }

    /// Number of dirty entries across all contracts.
    pub fn dirty_len(&self) -> usize {
        self.contracts
            .values()
            .map(|keys| keys.values().filter(|entry| entry.dirty).count())
            .sum()
    }

    /// One diff per contract with at least one dirty key.
    pub fn contract_state_diffs(&self) -> Vec<ContractStateDiff> {
        let mut diffs = Vec::new();
        for contract_name in self.contract_names() {
            let mut state_diffs = Vec::new();
            self.for_each_dirty(contract_name, |key, value| {
                state_diffs.push(StateRecord { key: key.to_vec(), value: value.to_vec() });
            });
            if !state_diffs.is_empty() {
                diffs.push(ContractStateDiff {
                    contract_name: contract_name.to_owned(),
                    state_diffs,
                });
            }
        }
        diffs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dirty_keys(state: &TransientState, contract: &str) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut out = Vec::new();
        state.for_each_dirty(contract, |k, v| out.push((k.to_vec(), v.to_vec())));
        out
    }

    #[test]
    fn test_get_missing() {
        let state = TransientState::new();
        assert_eq!(state.get("Token", b"k"), None);
    }

    #[test]
    fn test_set_and_get_scoped_by_contract() {
        let mut state = TransientState::new();
        state.set("Token", b"k", b"v1".to_vec(), true);
        assert_eq!(state.get("Token", b"k"), Some(&b"v1"[..]));
        assert_eq!(state.get("Other", b"k"), None);
    }

    #[test]
    fn test_empty_value_is_found() {
        let mut state = TransientState::new();
        state.set("Token", b"k", Vec::new(), true);
        assert_eq!(state.get("Token", b"k"), Some(&b""[..]));
    }

    #[test]
    fn test_overwrite_keeps_order() {
        let mut state = TransientState::new();
        state.set("Token", b"a", b"1".to_vec(), true);
        state.set("Token", b"b", b"2".to_vec(), true);
        state.set("Token", b"a", b"3".to_vec(), true);
        assert_eq!(
            dirty_keys(&state, "Token"),
            vec![(b"a".to_vec(), b"3".to_vec()), (b"b".to_vec(), b"2".to_vec())]
        );
    }

    #[test]
    fn test_overwrite_replaces_dirty_flag() {
        let mut state = TransientState::new();
        state.set("Token", b"a", b"1".to_vec(), true);
        state.set("Token", b"a", b"1".to_vec(), false);
        assert!(dirty_keys(&state, "Token").is_empty());
    }

    #[test]
    fn test_for_each_dirty_skips_clean() {
        let mut state = TransientState::new();
        state.set("Token", b"k1", b"v1".to_vec(), true);
        state.set("Token", b"k2", b"v2".to_vec(), false);
        state.set("Token", b"k3", b"v3".to_vec(), true);
        let keys: Vec<_> = dirty_keys(&state, "Token").into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"k1".to_vec(), b"k3".to_vec()]);
    }

    #[test]
    fn test_merge_copies_only_dirty_in_order() {
        let mut source = TransientState::new();
        source.set("Token", b"K1", b"v1".to_vec(), true);
        source.set("Token", b"K2", b"v2".to_vec(), false);
        source.set("Token", b"K3", b"v3".to_vec(), true);

        let mut target = TransientState::new();
        source.merge_into(&mut target);

        assert_eq!(
            dirty_keys(&target, "Token"),
            vec![(b"K1".to_vec(), b"v1".to_vec()), (b"K3".to_vec(), b"v3".to_vec())]
        );
        assert_eq!(target.get("Token", b"K2"), None);
    }

    #[test]
    fn test_merge_overwrites_and_marks_dirty() {
        let mut target = TransientState::new();
        target.set("Token", b"a", b"old".to_vec(), false);
        target.set("Token", b"b", b"keep".to_vec(), true);

        let mut source = TransientState::new();
        source.set("Token", b"a", b"new".to_vec(), true);
        source.merge_into(&mut target);

        assert_eq!(target.get("Token", b"a"), Some(&b"new"[..]));
        assert_eq!(
            dirty_keys(&target, "Token"),
            vec![(b"a".to_vec(), b"new".to_vec()), (b"b".to_vec(), b"keep".to_vec())]
        );
    }

    #[test]
    fn test_merge_as_cache_refreshes_without_dirtying() {
        let mut target = TransientState::new();
        target.set("_Deployments", b"Token", Vec::new(), false);

        let mut source = TransientState::new();
        source.set("_Deployments", b"Token", vec![1, 0, 0, 0], true);
        source.merge_into_as_cache(&mut target);

        assert_eq!(target.get("_Deployments", b"Token"), Some(&[1u8, 0, 0, 0][..]));
        assert!(dirty_keys(&target, "_Deployments").is_empty());
    }

    #[test]
    fn test_state_diffs_skip_clean_contracts() {
        let mut state = TransientState::new();
        state.set("Cache", b"x", b"1".to_vec(), false);
        state.set("Token", b"a", b"17".to_vec(), true);
        state.set("Token", b"b", b"3".to_vec(), true);

        let diffs = state.contract_state_diffs();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].contract_name, "Token");
        assert_eq!(diffs[0].state_diffs.len(), 2);
        assert_eq!(diffs[0].state_diffs[0].key, b"a".to_vec());
        assert_eq!(state.dirty_len(), 2);
    }

    #[test]
    fn test_contract_order_is_first_touch() {
        let mut state = TransientState::new();
        state.set("B", b"k", b"1".to_vec(), true);
        state.set("A", b"k", b"1".to_vec(), true);
        state.set("B", b"j", b"1".to_vec(), true);
        let names: Vec<_> = state.contract_names().collect();
        assert_eq!(names, vec!["B", "A"]);
    }
}
