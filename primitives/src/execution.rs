//! Execution boundary types: scopes, arguments, events, receipts and diffs.
//!
//! These are the values exchanged between the virtual machine, the
//! processor backends, and the consensus layer that consumes receipts and
//! state diffs.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ExecutionResult;
use crate::types::{ContractName, EventName, Hash};

/// Whether a call may write state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessScope {
    ReadOnly,
    ReadWrite,
}

impl fmt::Display for AccessScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "ACCESS_SCOPE_READ_ONLY"),
            Self::ReadWrite => write!(f, "ACCESS_SCOPE_READ_WRITE"),
        }
    }
}

/// Privilege level of a call.
///
/// `System` may call internal (`_`-prefixed) methods of other contracts,
/// `Service` may not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionScope {
    System,
    Service,
}

impl fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "PERMISSION_SCOPE_SYSTEM"),
            Self::Service => write!(f, "PERMISSION_SCOPE_SERVICE"),
        }
    }
}

/// Processor backend type tag as stored by the deployment registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ProcessorType {
    Native = 1,
    JavaScript = 2,
}

impl ProcessorType {
    pub fn from_u32(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(Self::Native),
            2 => Some(Self::JavaScript),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for ProcessorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "PROCESSOR_TYPE_NATIVE"),
            Self::JavaScript => write!(f, "PROCESSOR_TYPE_JAVASCRIPT"),
        }
    }
}

/// A single typed argument passed to or returned from a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Uint32(u32),
    Uint64(u64),
    String(String),
    Bytes(Vec<u8>),
}

impl Argument {
    /// Short type name used in validation error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Uint32(_) => "uint32",
            Self::Uint64(_) => "uint64",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
        }
    }

    pub fn as_uint32(&self) -> Option<u32> {
        match self {
            Self::Uint32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_uint64(&self) -> Option<u64> {
        match self {
            Self::Uint64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

impl From<u32> for Argument {
    fn from(v: u32) -> Self {
        Self::Uint32(v)
    }
}

impl From<u64> for Argument {
    fn from(v: u64) -> Self {
        Self::Uint64(v)
    }
}

impl From<&str> for Argument {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Argument {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<u8>> for Argument {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<&[u8]> for Argument {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

/// An ordered list of arguments.
///
/// Contracts receive and return argument arrays; when they cross the SDK
/// boundary nested inside another argument they travel in packed form
/// (see [`crate::codec::encode_argument_array`]).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArgumentArray(Vec<Argument>);

impl ArgumentArray {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Argument> {
        self.0.get(index)
    }

    pub fn push(&mut self, arg: impl Into<Argument>) {
        self.0.push(arg.into());
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Argument> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Argument] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Argument> {
        self.0
    }

    /// Convenience for the common single-argument output.
    pub fn single(arg: impl Into<Argument>) -> Self {
        Self(vec![arg.into()])
    }
}

impl From<Vec<Argument>> for ArgumentArray {
    fn from(args: Vec<Argument>) -> Self {
        Self(args)
    }
}

impl FromIterator<Argument> for ArgumentArray {
    fn from_iter<I: IntoIterator<Item = Argument>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ArgumentArray {
    type Item = &'a Argument;
    type IntoIter = core::slice::Iter<'a, Argument>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// An event emitted by a contract during a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Contract that was on top of the service stack when the event fired.
    pub contract_name: ContractName,
    pub event_name: EventName,
    /// Packed argument array supplied by the contract.
    pub packed_arguments: Vec<u8>,
}

/// Per-transaction receipt.
///
/// Events are recorded whether or not the transaction's state changes were
/// committed to the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub tx_hash: Hash,
    pub execution_result: ExecutionResult,
    pub output_arguments: ArgumentArray,
    pub output_events: Vec<Event>,
}

/// A single key/value pair in a state diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRecord {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Dirty entries of one contract, in key insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractStateDiff {
    pub contract_name: ContractName,
    pub state_diffs: Vec<StateRecord>,
}
