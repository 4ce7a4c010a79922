//! Engine error types.
//!
//! Protocol-visible outcomes live in `basalt_primitives::ExecutionResult`;
//! the types here describe why a host-side operation failed and map onto a
//! result code where one is needed.

use basalt_primitives::{BlockHeight, CodecError, ExecutionResult, ProcessorType};

use crate::context::ExecutionContextId;

/// Failure reported by an external collaborator (storage, cross-chain,
/// IPFS, management). Propagated unchanged through the SDK call that
/// triggered it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("state storage error: {0}")]
    Storage(String),

    #[error("crosschain connector error: {0}")]
    Crosschain(String),

    #[error("ipfs error: {0}")]
    Ipfs(String),

    #[error("management error: {0}")]
    Management(String),

    /// The collaborator gave up because the caller's deadline passed.
    #[error("deadline exceeded")]
    Timeout,
}

/// A processor backend failed outside of normal contract execution.
///
/// Contract-level failures are reported through the call result instead;
/// a fault always becomes `ERROR_UNEXPECTED`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("processor fault: {0}")]
pub struct ProcessorFault(pub String);

/// Errors from deployment resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeploymentError {
    #[error("contract {0} is not deployed")]
    NotDeployed(String),

    #[error("auto deployment of {contract} failed: {reason}")]
    AutoDeployFailed { contract: String, reason: String },

    #[error("deployment registry returned unknown processor type {0}")]
    UnknownProcessorType(u32),

    #[error("processor {0} is not registered on this node")]
    ProcessorNotRegistered(ProcessorType),

    #[error("deployment registry call failed: {0}")]
    RegistryFault(String),

    #[error("deployment registry returned corrupt output")]
    CorruptRegistryOutput,
}

impl DeploymentError {
    /// Result code reported when resolution fails for a top-level call.
    pub fn execution_result(&self) -> ExecutionResult {
        match self {
            Self::NotDeployed(_) | Self::AutoDeployFailed { .. } => {
                ExecutionResult::ErrorContractNotDeployed
            }
            _ => ExecutionResult::ErrorUnexpected,
        }
    }
}

/// Errors returned synchronously to a contract from an SDK call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SdkError {
    #[error("unknown execution context {0}")]
    UnknownContext(ExecutionContextId),

    #[error("unknown SDK operation: {0}")]
    UnknownOperation(String),

    #[error("unknown SDK method {operation}.{method}")]
    UnknownMethod { operation: String, method: String },

    #[error("invalid arguments for {operation}.{method}: {reason}")]
    InvalidArguments {
        operation: &'static str,
        method: &'static str,
        reason: String,
    },

    #[error("malformed packed arguments: {0}")]
    MalformedPackedArguments(#[from] CodecError),

    #[error("state write attempted without read-write access")]
    WriteWithoutAccess,

    #[error("service stack is empty")]
    EmptyServiceStack,

    #[error("no transaction signer in this context")]
    NoSigner,

    #[error("method {contract}.{method} is internal and cannot be called from another service")]
    InternalMethodAccess { contract: String, method: String },

    #[error("service {contract} method {method} call failed ({result}): {message}")]
    ServiceCallFailed {
        contract: String,
        method: String,
        result: ExecutionResult,
        message: String,
    },

    #[error(transparent)]
    Deployment(#[from] DeploymentError),

    #[error("{0} connector is not configured")]
    ConnectorNotConfigured(&'static str),

    #[error("deadline exceeded before {0}")]
    DeadlineExceeded(&'static str),

    #[error("ethereum returned no logs for transaction {0}")]
    EmptyTransactionLog(String),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

/// Reasons the global pre-order check rejects a whole batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreOrderError {
    #[error("block timestamp {block_timestamp}s is more than {timeout}s past reference time {reference_time}s")]
    LivenessExpired {
        block_timestamp: u64,
        reference_time: u64,
        timeout: u64,
    },

    #[error("subscription is not active")]
    SubscriptionInactive,

    #[error("subscription status unavailable: {0}")]
    SubscriptionUnavailable(CollaboratorError),

    #[error("global pre-order contract rejected the batch ({result}): {message}")]
    Rejected { result: ExecutionResult, message: String },

    #[error(transparent)]
    Vm(#[from] VmError),
}

/// Top-level errors of the virtual machine's public operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    #[error("failed to read committed block height: {0}")]
    StorageHeight(CollaboratorError),

    #[error("processor {0} is not registered on this node")]
    ProcessorNotRegistered(ProcessorType),

    /// The caller's deadline passed before the operation finished. Nothing
    /// it computed may be used.
    #[error("deadline exceeded while executing at block height {block_height}")]
    DeadlineExceeded { block_height: BlockHeight },
}

impl VmError {
    pub fn execution_result(&self) -> ExecutionResult {
        ExecutionResult::ErrorUnexpected
    }
}
