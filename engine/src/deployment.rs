//! Deployment resolution: which processor runs a contract.
//!
//! Resolution asks the `_Deployments` system contract for the processor
//! type of a contract, through the native processor and on the caller's own
//! context. It comes in two phases:
//!
//! - [`try_resolve_processor`](VirtualMachine::try_resolve_processor) only
//!   reads the registry and is what read-only calls use.
//! - [`resolve_processor_or_deploy`](VirtualMachine::resolve_processor_or_deploy)
//!   additionally auto-deploys a contract the native processor knows, then
//!   retries the lookup exactly once.

use std::sync::Arc;

use basalt_primitives::{AccessScope, Argument, ArgumentArray, ExecutionResult, PermissionScope, ProcessorType};
use tracing::{debug, info, warn};

use crate::context::{ContextParams, ExecutionContextId, SharedContext};
use crate::error::DeploymentError;
use crate::processor::{ProcessCallInput, Processor};
use crate::service::VirtualMachine;
use crate::system_contract::{
    is_implicitly_deployed, DEPLOYMENTS_CONTRACT, DEPLOYMENTS_METHOD_DEPLOY_SERVICE,
    DEPLOYMENTS_METHOD_GET_INFO,
};
use crate::transaction::call_on_stack;

/// What the deployment registry knows about a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Deployment {
    Deployed(ProcessorType),
    NotDeployed,
}

impl VirtualMachine {
    /// Look up the deployment of `contract_name` without writing anything.
    pub(crate) fn query_deployment(
        &self,
        context_id: ExecutionContextId,
        context: &SharedContext,
        contract_name: &str,
    ) -> Result<Deployment, DeploymentError> {
        if is_implicitly_deployed(contract_name) {
            return Ok(Deployment::Deployed(ProcessorType::Native));
        }

        let native = self.native_processor()?;
        let input = {
            let ctx = context.lock();
            ProcessCallInput {
                context_id,
                contract_name: DEPLOYMENTS_CONTRACT.to_owned(),
                method_name: DEPLOYMENTS_METHOD_GET_INFO.to_owned(),
                input_arguments: ArgumentArray::single(contract_name),
                access_scope: ctx.access_scope(),
                calling_permission_scope: PermissionScope::Service,
                calling_service: ctx.current_service().map(str::to_owned),
                transaction_signer: ctx.signer().cloned(),
            }
        };
        let output = call_on_stack(context, native.as_ref(), input);

        match output.call_result {
            ExecutionResult::Success => {
                let tag = output
                    .output_arguments
                    .get(0)
                    .and_then(Argument::as_uint32)
                    .ok_or(DeploymentError::CorruptRegistryOutput)?;
                let processor_type =
                    ProcessorType::from_u32(tag).ok_or(DeploymentError::UnknownProcessorType(tag))?;
                Ok(Deployment::Deployed(processor_type))
            }
            ExecutionResult::ErrorSmartContract => Ok(Deployment::NotDeployed),
            result => Err(DeploymentError::RegistryFault(format!(
                "{}: {}",
                result,
                output.error_message()
            ))),
        }
    }

    /// Resolve the processor of a contract without deploying it.
    pub(crate) fn try_resolve_processor(
        &self,
        context_id: ExecutionContextId,
        context: &SharedContext,
        contract_name: &str,
    ) -> Result<Arc<dyn Processor>, DeploymentError> {
        match self.query_deployment(context_id, context, contract_name)? {
            Deployment::Deployed(processor_type) => self.processor(processor_type),
            Deployment::NotDeployed => Err(DeploymentError::NotDeployed(contract_name.to_owned())),
        }
    }

    /// Resolve the processor of a contract, auto-deploying it first if the
    /// registry does not know it and the native processor does.
    pub(crate) fn resolve_processor_or_deploy(
        &self,
        context_id: ExecutionContextId,
        context: &SharedContext,
        contract_name: &str,
    ) -> Result<Arc<dyn Processor>, DeploymentError> {
        if let Deployment::Deployed(processor_type) =
            self.query_deployment(context_id, context, contract_name)?
        {
            return self.processor(processor_type);
        }

        self.auto_deploy_native_contract(context, contract_name)?;

        match self.query_deployment(context_id, context, contract_name)? {
            Deployment::Deployed(processor_type) => self.processor(processor_type),
            Deployment::NotDeployed => Err(DeploymentError::AutoDeployFailed {
                contract: contract_name.to_owned(),
                reason: "registry still reports the contract as not deployed".to_owned(),
            }),
        }
    }

    /// Deploy a native contract through `_Deployments.deployService`.
    ///
    /// The deployment runs in its own short-lived context linked to the
    /// caller's batch. On success its writes are merged into the batch (or,
    /// without a batch, into the caller's transient state), so the
    /// deployment is visible to the retry and to later transactions even if
    /// the calling transaction fails.
    fn auto_deploy_native_contract(
        &self,
        context: &SharedContext,
        contract_name: &str,
    ) -> Result<(), DeploymentError> {
        let not_deployed = || DeploymentError::NotDeployed(contract_name.to_owned());

        if !self.config.auto_deploy_native_contracts {
            return Err(not_deployed());
        }

        let params = {
            let ctx = context.lock();
            if ctx.access_scope() != AccessScope::ReadWrite {
                debug!(contract = %contract_name, "auto deployment needs a read-write context");
                return Err(not_deployed());
            }
            ContextParams {
                last_committed_block_height: ctx.last_committed_block_height(),
                block_height: ctx.block_height(),
                block_timestamp: ctx.block_timestamp(),
                access_scope: AccessScope::ReadWrite,
                signer: ctx.signer().cloned(),
                batch_state: ctx.batch_state().cloned(),
                deadline: ctx.deadline(),
            }
        };

        let native = self.native_processor()?;
        if let Err(err) = native.get_contract_info(contract_name) {
            debug!(contract = %contract_name, error = %err, "contract is not a known native contract");
            return Err(not_deployed());
        }

        info!(contract = %contract_name, "auto deploying native contract");
        let guard = self.contexts.allocate_scoped(params);
        let input = ProcessCallInput {
            context_id: guard.id(),
            contract_name: DEPLOYMENTS_CONTRACT.to_owned(),
            method_name: DEPLOYMENTS_METHOD_DEPLOY_SERVICE.to_owned(),
            input_arguments: ArgumentArray::from(vec![
                Argument::from(contract_name),
                Argument::Uint32(ProcessorType::Native.as_u32()),
                Argument::Bytes(Vec::new()),
            ]),
            access_scope: AccessScope::ReadWrite,
            calling_permission_scope: PermissionScope::System,
            calling_service: None,
            transaction_signer: None,
        };
        let output = call_on_stack(guard.context(), native.as_ref(), input);
        if !output.call_result.is_success() {
            let reason = format!("{}: {}", output.call_result, output.error_message());
            warn!(contract = %contract_name, reason = %reason, "auto deployment failed");
            return Err(DeploymentError::AutoDeployFailed {
                contract: contract_name.to_owned(),
                reason,
            });
        }

        let deploy_ctx = guard.context().lock();
        match deploy_ctx.batch_state() {
            Some(batch) => {
                deploy_ctx.transient_state.merge_into(&mut batch.write());
                // The failed lookup may have cached the empty registry entry.
                deploy_ctx
                    .transient_state
                    .merge_into_as_cache(&mut context.lock().transient_state);
            }
            None => deploy_ctx.transient_state.merge_into(&mut context.lock().transient_state),
        }
        Ok(())
    }
}
