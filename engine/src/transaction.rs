//! Running one contract method in its own execution context.
//!
//! Every processor invocation goes through [`invoke_processor`], which turns
//! backend faults and panics into `ERROR_UNEXPECTED` outputs so that no
//! unwind ever crosses into the executor. [`VirtualMachine::run_method`] is
//! the shared path of transactions and queries: allocate a context, resolve
//! the contract, invoke it, and merge into the batch on success.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use basalt_primitives::{
    AccessScope, ArgumentArray, Event, ExecutionResult, PermissionScope, Signer,
};
use tracing::{debug, warn};

use crate::context::{ContextParams, SharedContext};
use crate::processor::{ProcessCallInput, ProcessCallOutput, Processor};
use crate::service::VirtualMachine;

/// Invoke a processor, containing faults and panics.
///
/// A `ProcessorFault` or a panic becomes `ERROR_UNEXPECTED` with the
/// message as the sole output argument.
pub(crate) fn invoke_processor(processor: &dyn Processor, input: ProcessCallInput) -> ProcessCallOutput {
    let context_id = input.context_id;
    let contract = input.contract_name.clone();
    let method = input.method_name.clone();

    match panic::catch_unwind(AssertUnwindSafe(|| processor.process_call(input))) {
        Ok(Ok(output)) => output,
        Ok(Err(fault)) => {
            warn!(context = %context_id, contract = %contract, method = %method, error = %fault, "processor fault");
            ProcessCallOutput::failure(ExecutionResult::ErrorUnexpected, fault.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(context = %context_id, contract = %contract, method = %method, panic = %message, "processor panicked");
            ProcessCallOutput::failure(ExecutionResult::ErrorUnexpected, message)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "processor panicked".to_owned()
    }
}

/// Push the target contract, invoke the processor, pop.
///
/// The context lock is released while the processor runs so its SDK calls
/// can reach the same context.
pub(crate) fn call_on_stack(
    context: &SharedContext,
    processor: &dyn Processor,
    input: ProcessCallInput,
) -> ProcessCallOutput {
    context.lock().push_service(&input.contract_name);
    let output = invoke_processor(processor, input);
    context.lock().pop_service();
    output
}

/// Contract method addressed by a transaction or a query.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MethodCall<'a> {
    pub contract_name: &'a str,
    pub method_name: &'a str,
    pub input_arguments: &'a ArgumentArray,
    pub signer: &'a Signer,
}

/// Outcome of [`VirtualMachine::run_method`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MethodOutcome {
    pub call_result: ExecutionResult,
    pub output_arguments: ArgumentArray,
    pub events: Vec<Event>,
}

impl VirtualMachine {
    /// Run one top-level method call in a fresh context.
    ///
    /// Read-only calls never auto-deploy. On success, the context's writes
    /// are merged into the batch state if the context has one; otherwise
    /// they are discarded with the context.
    pub(crate) fn run_method(&self, params: ContextParams, call: MethodCall<'_>) -> MethodOutcome {
        let access_scope = params.access_scope;
        let guard = self.contexts.allocate_scoped(params);
        let context = guard.context();

        let resolved = match access_scope {
            AccessScope::ReadOnly => self.try_resolve_processor(guard.id(), context, call.contract_name),
            AccessScope::ReadWrite => {
                self.resolve_processor_or_deploy(guard.id(), context, call.contract_name)
            }
        };
        let processor = match resolved {
            Ok(processor) => processor,
            Err(err) => {
                warn!(contract = %call.contract_name, error = %err, "get deployment info for contract failed");
                return MethodOutcome {
                    call_result: err.execution_result(),
                    output_arguments: ArgumentArray::single(err.to_string()),
                    events: Vec::new(),
                };
            }
        };

        let input = ProcessCallInput {
            context_id: guard.id(),
            contract_name: call.contract_name.to_owned(),
            method_name: call.method_name.to_owned(),
            input_arguments: call.input_arguments.clone(),
            access_scope,
            calling_permission_scope: PermissionScope::Service,
            calling_service: None,
            transaction_signer: Some(call.signer.clone()),
        };
        let output = call_on_stack(context, processor.as_ref(), input);

        let mut ctx = context.lock();
        if output.call_result.is_success() {
            if let Some(batch) = ctx.batch_state().cloned() {
                ctx.transient_state.merge_into(&mut batch.write());
            }
        } else {
            debug!(
                contract = %call.contract_name,
                method = %call.method_name,
                result = %output.call_result,
                error = %output.error_message(),
                "method call did not succeed"
            );
        }

        MethodOutcome {
            call_result: output.call_result,
            output_arguments: output.output_arguments,
            events: ctx.take_events(),
        }
    }
}
