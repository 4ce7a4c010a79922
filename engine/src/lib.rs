//! `basalt-engine`: transaction execution core of a Basalt node.
//!
//! The engine runs ordered transaction sets, validates candidate sets before
//! ordering, and answers read-only queries. Contract code runs inside
//! pluggable [`Processor`] backends and reaches back into the engine through
//! the SDK call boundary.
//!
//! ## Architecture
//!
//! - [`context`]: execution contexts, their service stack, and the registry
//!   that hands out context ids
//! - [`sdk`]: the SDK call router (`Sdk.State`, `Sdk.Service`, ...)
//! - [`deployment`]: which processor runs a contract, with auto-deploy
//! - [`system_contract`]: system contract catalogue and direct invocation
//! - [`executor`]: `process_transaction_set`, the block state transition
//! - [`validation`]: `transaction_set_pre_order`
//! - [`query`]: `run_local_method`
//! - [`host`]: collaborator traits (storage, cross-chain, IPFS, management)
//!   and the in-memory [`MemStateStorage`]
//!
//! Everything is wired together by [`VirtualMachine`].

pub mod config;
pub mod context;
pub mod deployment;
pub mod error;
pub mod executor;
pub mod host;
pub mod processor;
pub mod query;
pub mod sdk;
pub mod service;
pub mod system_contract;
pub mod transaction;
pub mod validation;

// Re-export key types for convenience
pub use config::VmConfig;
pub use context::{ContextParams, ContextRegistry, ExecutionContext, ExecutionContextId};
pub use error::{CollaboratorError, DeploymentError, PreOrderError, ProcessorFault, SdkError, VmError};
pub use executor::TransactionSetOutput;
pub use host::{
    CrosschainConnector, Deadline, EthereumCallInput, EthereumLogsInput, EthereumLogsOutput,
    IpfsConnector, ManagementProvider, MemStateStorage, StateStorage,
};
pub use processor::{
    ContractInfo, ProcessCallInput, ProcessCallOutput, Processor, SdkCallHandler, SdkCallRequest,
};
pub use query::QueryOutput;
pub use sdk::SdkCall;
pub use service::{VirtualMachine, VirtualMachineBuilder};
pub use system_contract::{SystemCallOutput, SystemContractCall};
