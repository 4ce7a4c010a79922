//! External collaborators of the virtual machine.
//!
//! The engine is decoupled from persisted storage, cross-chain connectors,
//! IPFS and the management (subscription) service through the traits
//! below. Every call that may block on I/O receives the `Deadline` of the
//! top-level batch or query it runs on behalf of.
//!
//! - In production: implemented by the node's storage and connector adapters
//! - In tests: `MemStateStorage` plus small hand-written fakes

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use basalt_primitives::{BlockHeight, ContractName, TimestampNano, TimestampSeconds};
use parking_lot::Mutex;

use crate::error::CollaboratorError;

/// Point in time after which external calls should be abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline.
    pub fn none() -> Self {
        Self(None)
    }

    pub fn after(budget: Duration) -> Self {
        Self(Instant::now().checked_add(budget))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.0, Some(at) if Instant::now() >= at)
    }

    /// Time left, or `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.0.map(|at| at.saturating_duration_since(Instant::now()))
    }
}

/// Persisted, committed contract state.
pub trait StateStorage: Send + Sync {
    /// Read keys of one contract as of `block_height`. Missing keys come
    /// back as empty values; the result has one value per requested key.
    fn read_keys(
        &self,
        block_height: BlockHeight,
        contract_name: &str,
        keys: &[Vec<u8>],
        deadline: Deadline,
    ) -> Result<Vec<Vec<u8>>, CollaboratorError>;

    /// Height and timestamp of the last committed block.
    fn get_state_storage_block_height(&self) -> Result<(BlockHeight, TimestampNano), CollaboratorError>;
}

/// Input of an Ethereum contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthereumCallInput {
    /// Block timestamp the call is made on behalf of; connectors map it to a
    /// finality-safe Ethereum block.
    pub reference_timestamp: TimestampNano,
    /// Explicit Ethereum block, or 0 for "derive from reference timestamp".
    pub block_number: u64,
    pub contract_address: String,
    pub json_abi: String,
    pub method_name: String,
    pub packed_arguments: Vec<u8>,
}

/// Input of an Ethereum transaction log lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthereumLogsInput {
    pub reference_timestamp: TimestampNano,
    pub contract_address: String,
    pub json_abi: String,
    pub tx_hash: String,
    pub event_name: String,
}

/// Logs of one Ethereum transaction matching an event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EthereumLogsOutput {
    pub packed_outputs: Vec<Vec<u8>>,
    pub block_number: u64,
    pub tx_index: u32,
}

/// Cross-chain connector to Ethereum.
pub trait CrosschainConnector: Send + Sync {
    fn ethereum_call_contract(
        &self,
        input: &EthereumCallInput,
        deadline: Deadline,
    ) -> Result<Vec<u8>, CollaboratorError>;

    fn ethereum_get_transaction_logs(
        &self,
        input: &EthereumLogsInput,
        deadline: Deadline,
    ) -> Result<EthereumLogsOutput, CollaboratorError>;

    fn ethereum_get_block_number(
        &self,
        reference_timestamp: TimestampNano,
        deadline: Deadline,
    ) -> Result<u64, CollaboratorError>;
}

/// Content-addressed storage reader.
pub trait IpfsConnector: Send + Sync {
    fn read(&self, hash: &str, deadline: Deadline) -> Result<Vec<u8>, CollaboratorError>;
}

/// Management service answering subscription status queries.
pub trait ManagementProvider: Send + Sync {
    fn get_subscription_status(&self, reference_time: TimestampSeconds) -> Result<bool, CollaboratorError>;
}

// ── MemStateStorage: in-memory committed state ──

/// In-memory `StateStorage` holding a single committed snapshot.
///
/// Counts `read_keys` calls so tests can assert on read-through caching.
#[derive(Debug, Default)]
pub struct MemStateStorage {
    state: Mutex<BTreeMap<ContractName, BTreeMap<Vec<u8>, Vec<u8>>>>,
    block: Mutex<(BlockHeight, TimestampNano)>,
    read_calls: AtomicUsize,
    last_read_height: Mutex<Option<BlockHeight>>,
    fail_height_queries: Mutex<bool>,
}

impl MemStateStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the last committed block reported by this storage.
    pub fn set_block(&self, block_height: BlockHeight, block_timestamp: TimestampNano) {
        *self.block.lock() = (block_height, block_timestamp);
    }

    /// Insert committed state for a contract.
    pub fn set_committed(&self, contract_name: &str, key: &[u8], value: &[u8]) {
        self.state
            .lock()
            .entry(contract_name.to_owned())
            .or_default()
            .insert(key.to_vec(), value.to_vec());
    }

    /// Make `get_state_storage_block_height` fail, simulating an
    /// unavailable storage.
    pub fn fail_height_queries(&self, fail: bool) {
        *self.fail_height_queries.lock() = fail;
    }

    /// Number of `read_keys` calls served so far.
    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn last_read_height(&self) -> Option<BlockHeight> {
        *self.last_read_height.lock()
    }
}

impl StateStorage for MemStateStorage {
    fn read_keys(
        &self,
        block_height: BlockHeight,
        contract_name: &str,
        keys: &[Vec<u8>],
        deadline: Deadline,
    ) -> Result<Vec<Vec<u8>>, CollaboratorError> {
        if deadline.is_expired() {
            return Err(CollaboratorError::Timeout);
        }
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_read_height.lock() = Some(block_height);

        let state = self.state.lock();
        let contract = state.get(contract_name);
        Ok(keys
            .iter()
            .map(|key| {
                contract
                    .and_then(|entries| entries.get(key))
                    .cloned()
                    .unwrap_or_default()
            })
            .collect())
    }

    fn get_state_storage_block_height(&self) -> Result<(BlockHeight, TimestampNano), CollaboratorError> {
        if *self.fail_height_queries.lock() {
            return Err(CollaboratorError::Storage("block height unavailable".into()));
        }
        Ok(*self.block.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_storage_reads_committed_state() {
        let storage = MemStateStorage::new();
        storage.set_committed("Token", b"alice", b"20");

        let values = storage
            .read_keys(5, "Token", &[b"alice".to_vec(), b"bob".to_vec()], Deadline::none())
            .unwrap();
        assert_eq!(values, vec![b"20".to_vec(), Vec::new()]);
        assert_eq!(storage.read_calls(), 1);
        assert_eq!(storage.last_read_height(), Some(5));
    }

    #[test]
    fn test_mem_storage_unknown_contract_reads_empty() {
        let storage = MemStateStorage::new();
        let values = storage.read_keys(1, "Nope", &[b"k".to_vec()], Deadline::none()).unwrap();
        assert_eq!(values, vec![Vec::<u8>::new()]);
    }

    #[test]
    fn test_mem_storage_block_height() {
        let storage = MemStateStorage::new();
        storage.set_block(12, 1_700_000_000_000_000_000);
        assert_eq!(
            storage.get_state_storage_block_height().unwrap(),
            (12, 1_700_000_000_000_000_000)
        );
        storage.fail_height_queries(true);
        assert!(storage.get_state_storage_block_height().is_err());
    }

    #[test]
    fn test_expired_deadline_fails_read() {
        let storage = MemStateStorage::new();
        let deadline = Deadline::after(Duration::ZERO);
        let result = storage.read_keys(1, "Token", &[b"k".to_vec()], deadline);
        assert_eq!(result, Err(CollaboratorError::Timeout));
        assert_eq!(storage.read_calls(), 0);
    }

    #[test]
    fn test_deadline_none_never_expires() {
        let deadline = Deadline::none();
        assert!(!deadline.is_expired());
        assert_eq!(deadline.remaining(), None);
        assert!(Deadline::after(Duration::from_secs(60)).remaining().is_some());
    }
}
