//! `basalt-primitives`: foundational types for the Basalt virtual machine.
//!
//! This crate provides the protocol types, result codes, deterministic
//! codec, cryptographic helpers, and the transient state overlay shared by
//! the execution engine and the processor backends plugged into it.

pub mod types;
pub mod error;
pub mod block;
pub mod execution;
pub mod crypto;
pub mod state;
pub mod codec;

// Re-export commonly used types at the crate root for convenience.
pub use types::{
    BlockHeight, ClientAddress, ContractName, EventName, Hash, MethodName, TimestampNano,
    TimestampSeconds, VirtualChainId, CLIENT_ADDRESS_SIZE, PROTOCOL_VERSION,
    to_hex, is_internal_method,
};
pub use error::{CodecError, ExecutionResult, TransactionStatus};
pub use execution::{
    AccessScope, Argument, ArgumentArray, ContractStateDiff, Event, PermissionScope,
    ProcessorType, StateRecord, TransactionReceipt,
};
pub use block::{Query, SignedTransaction, Signer, Transaction, UnknownSigner};
pub use state::TransientState;
