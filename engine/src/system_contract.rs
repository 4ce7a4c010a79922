//! System contract catalogue and invocation.

use basalt_primitives::{
    AccessScope, ArgumentArray, BlockHeight, ContractName, MethodName, PermissionScope,
    ProcessorType, TimestampNano,
};
use tracing::{info, warn};

use crate::context::ContextParams;
use crate::error::VmError;
use crate::host::Deadline;
use crate::processor::{ProcessCallInput, ProcessCallOutput};
use crate::service::VirtualMachine;
use crate::transaction::call_on_stack;

/// Deployment registry.
pub const DEPLOYMENTS_CONTRACT: &str = "_Deployments";
pub const DEPLOYMENTS_METHOD_GET_INFO: &str = "getInfo";
pub const DEPLOYMENTS_METHOD_DEPLOY_SERVICE: &str = "deployService";

/// Global pre-order gate, consulted once per batch.
pub const GLOBAL_PRE_ORDER_CONTRACT: &str = "_GlobalPreOrder";
pub const GLOBAL_PRE_ORDER_METHOD_APPROVE: &str = "approve";

pub const INFO_CONTRACT: &str = "_Info";
pub const TRIGGERS_CONTRACT: &str = "_Triggers";
pub const COMMITTEE_CONTRACT: &str = "_Committee";
pub const ELECTIONS_CONTRACT: &str = "_Elections";

/// Contracts that are deployed on the native processor without a registry
/// entry.
pub const IMPLICITLY_DEPLOYED_CONTRACTS: [&str; 6] = [
    DEPLOYMENTS_CONTRACT,
    GLOBAL_PRE_ORDER_CONTRACT,
    INFO_CONTRACT,
    TRIGGERS_CONTRACT,
    COMMITTEE_CONTRACT,
    ELECTIONS_CONTRACT,
];

pub fn is_implicitly_deployed(contract_name: &str) -> bool {
    IMPLICITLY_DEPLOYED_CONTRACTS.contains(&contract_name)
}

/// A call to a system contract outside of any transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemContractCall {
    pub block_height: BlockHeight,
    pub block_timestamp: TimestampNano,
    pub access_scope: AccessScope,
    pub contract_name: ContractName,
    pub method_name: MethodName,
    pub input_arguments: ArgumentArray,
    /// Supplied by the caller; the call fails as a whole once it passes.
    pub deadline: Deadline,
}

/// Output of a system contract call.
pub type SystemCallOutput = ProcessCallOutput;

impl VirtualMachine {
    /// Call a system contract on the native processor in a throwaway
    /// context with no batch state and no signer.
    ///
    /// Contract failures are reported in the output; `Err` means the call
    /// could not be made at all or its deadline passed.
    pub fn call_system_contract(&self, call: SystemContractCall) -> Result<SystemCallOutput, VmError> {
        info!(
            contract = %call.contract_name,
            method = %call.method_name,
            block_height = call.block_height,
            "calling system contract"
        );
        let native = self
            .native_processor()
            .map_err(|_| VmError::ProcessorNotRegistered(ProcessorType::Native))?;

        let guard = self.contexts.allocate_scoped(ContextParams {
            last_committed_block_height: call.block_height,
            block_height: call.block_height,
            block_timestamp: call.block_timestamp,
            access_scope: call.access_scope,
            signer: None,
            batch_state: None,
            deadline: call.deadline,
        });
        let input = ProcessCallInput {
            context_id: guard.id(),
            contract_name: call.contract_name,
            method_name: call.method_name,
            input_arguments: call.input_arguments,
            access_scope: call.access_scope,
            calling_permission_scope: PermissionScope::System,
            calling_service: None,
            transaction_signer: None,
        };
        let output = call_on_stack(guard.context(), native.as_ref(), input);

        if call.deadline.is_expired() {
            warn!(block_height = call.block_height, "system contract call ran past its deadline");
            return Err(VmError::DeadlineExceeded { block_height: call.block_height });
        }
        Ok(output)
    }
}
