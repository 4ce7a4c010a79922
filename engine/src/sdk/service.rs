//! `Sdk.Service`: nested contract calls.
//!
//! A nested call runs on the caller's own context, so it shares the
//! caller's transient state and sees the caller's earlier writes. The
//! target is pushed onto the service stack for the duration of the call.

use basalt_primitives::codec::{decode_argument_array, encode_argument_array};
use basalt_primitives::types::is_internal_method;
use basalt_primitives::{ArgumentArray, PermissionScope};
use tracing::debug;

use super::{unknown_method, ArgReader, SDK_OPERATION_NAME_SERVICE};
use crate::context::{ExecutionContextId, SharedContext};
use crate::error::SdkError;
use crate::processor::ProcessCallInput;
use crate::service::VirtualMachine;
use crate::transaction::call_on_stack;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    /// Arguments of the target method travel packed with the argument
    /// array codec; the output comes back packed the same way.
    CallMethod {
        service_name: String,
        method_name: String,
        packed_arguments: Vec<u8>,
    },
}

impl ServiceCall {
    pub(super) fn parse(method_name: &str, args: &ArgumentArray) -> Result<Self, SdkError> {
        match method_name {
            "callMethod" => {
                let r = ArgReader::new(SDK_OPERATION_NAME_SERVICE, "callMethod", args, 3)?;
                Ok(Self::CallMethod {
                    service_name: r.string(0)?,
                    method_name: r.string(1)?,
                    packed_arguments: r.bytes(2)?,
                })
            }
            other => Err(unknown_method(SDK_OPERATION_NAME_SERVICE, other)),
        }
    }
}

/// Scope of a nested call: SYSTEM when the calling frame already runs with
/// SYSTEM scope or when a contract calls itself.
pub(crate) fn nested_permission_scope(
    caller_scope: PermissionScope,
    caller: &str,
    target: &str,
) -> PermissionScope {
    if caller_scope == PermissionScope::System || caller == target {
        PermissionScope::System
    } else {
        PermissionScope::Service
    }
}

impl VirtualMachine {
    pub(crate) fn handle_service_call(
        &self,
        context_id: ExecutionContextId,
        context: &SharedContext,
        call: ServiceCall,
        caller_scope: PermissionScope,
    ) -> Result<ArgumentArray, SdkError> {
        let ServiceCall::CallMethod { service_name, method_name, packed_arguments } = call;
        let input_arguments = decode_argument_array(&packed_arguments)?;

        let (caller, access_scope, signer) = {
            let ctx = context.lock();
            let caller = ctx.current_service().ok_or(SdkError::EmptyServiceStack)?.to_owned();
            (caller, ctx.access_scope(), ctx.signer().cloned())
        };

        let permission_scope = nested_permission_scope(caller_scope, &caller, &service_name);
        if permission_scope == PermissionScope::Service && is_internal_method(&method_name) {
            return Err(SdkError::InternalMethodAccess {
                contract: service_name,
                method: method_name,
            });
        }

        let processor = self.resolve_processor_or_deploy(context_id, context, &service_name)?;
        debug!(
            context = %context_id,
            caller = %caller,
            contract = %service_name,
            method = %method_name,
            scope = %permission_scope,
            "nested service call"
        );

        let input = ProcessCallInput {
            context_id,
            contract_name: service_name.clone(),
            method_name: method_name.clone(),
            input_arguments,
            access_scope,
            calling_permission_scope: permission_scope,
            calling_service: Some(caller),
            transaction_signer: signer,
        };
        let output = call_on_stack(context, processor.as_ref(), input);

        if !output.call_result.is_success() {
            return Err(SdkError::ServiceCallFailed {
                message: output.error_message(),
                contract: service_name,
                method: method_name,
                result: output.call_result,
            });
        }
        Ok(ArgumentArray::single(encode_argument_array(&output.output_arguments)))
    }
}
