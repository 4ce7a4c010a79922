//! Processor backend boundary.
//!
//! A processor executes contract logic for one processor type. While it
//! runs, it calls back into the virtual machine through the
//! [`SdkCallHandler`] it was handed at registration, carrying the context
//! id it received in [`ProcessCallInput`].

use std::sync::Weak;

use basalt_primitives::{
    AccessScope, ArgumentArray, ContractName, ExecutionResult, MethodName, PermissionScope, Signer,
};

use crate::context::ExecutionContextId;
use crate::error::{ProcessorFault, SdkError};

/// One contract invocation handed to a processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCallInput {
    pub context_id: ExecutionContextId,
    pub contract_name: ContractName,
    pub method_name: MethodName,
    pub input_arguments: ArgumentArray,
    pub access_scope: AccessScope,
    pub calling_permission_scope: PermissionScope,
    /// Contract that made the call, `None` for top-level calls.
    pub calling_service: Option<ContractName>,
    pub transaction_signer: Option<Signer>,
}

/// What a processor reports back for one invocation.
///
/// A failing contract is still a normal output: the result carries the
/// failure class and the output arguments usually carry its message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCallOutput {
    pub output_arguments: ArgumentArray,
    pub call_result: ExecutionResult,
}

impl ProcessCallOutput {
    pub fn success(output_arguments: ArgumentArray) -> Self {
        Self { output_arguments, call_result: ExecutionResult::Success }
    }

    /// A failed call whose only output argument is the error message.
    pub fn failure(call_result: ExecutionResult, message: impl Into<String>) -> Self {
        Self {
            output_arguments: ArgumentArray::single(message.into()),
            call_result,
        }
    }

    /// First string output argument, used as the error message of a
    /// failed call.
    pub fn error_message(&self) -> String {
        self.output_arguments
            .iter()
            .find_map(|arg| arg.as_str())
            .unwrap_or_default()
            .to_owned()
    }
}

/// Static information a processor knows about a contract it can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractInfo {
    pub permission_scope: PermissionScope,
}

/// One SDK call issued by running contract code.
///
/// Operation and method names are the wire-level strings (for example
/// `"Sdk.State"` / `"read"`); the router parses them into a typed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkCallRequest {
    pub context_id: ExecutionContextId,
    pub operation_name: String,
    pub method_name: String,
    pub input_arguments: ArgumentArray,
    /// Permission scope the calling contract is running with.
    pub permission_scope: PermissionScope,
}

impl SdkCallRequest {
    pub fn new(
        context_id: ExecutionContextId,
        operation_name: &str,
        method_name: &str,
        input_arguments: ArgumentArray,
        permission_scope: PermissionScope,
    ) -> Self {
        Self {
            context_id,
            operation_name: operation_name.to_owned(),
            method_name: method_name.to_owned(),
            input_arguments,
            permission_scope,
        }
    }
}

/// Host side of the contract/host boundary.
pub trait SdkCallHandler: Send + Sync {
    fn handle_sdk_call(&self, request: SdkCallRequest) -> Result<ArgumentArray, SdkError>;
}

/// Execution backend for one processor type.
pub trait Processor: Send + Sync {
    /// Run one contract method. Contract failures are reported in the
    /// output; `Err` is reserved for backend faults.
    fn process_call(&self, input: ProcessCallInput) -> Result<ProcessCallOutput, ProcessorFault>;

    /// Whether this processor knows the contract, and with which scope it
    /// runs.
    fn get_contract_info(&self, contract_name: &str) -> Result<ContractInfo, ProcessorFault>;

    /// Called once when the processor is attached to a virtual machine.
    fn register_sdk_call_handler(&self, handler: Weak<dyn SdkCallHandler>);
}
