//! `Sdk.State`: contract-scoped key/value access.
//!
//! Reads go through three tiers: the context's transient state, the batch
//! state, then committed storage. A storage hit is cached (clean) in the
//! context so repeated reads do not reach storage again. Writes only ever
//! touch the context's transient state.

use basalt_primitives::{AccessScope, ArgumentArray};

use super::{unknown_method, ArgReader, SDK_OPERATION_NAME_STATE};
use crate::context::SharedContext;
use crate::error::SdkError;
use crate::service::VirtualMachine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateCall {
    Read { key: Vec<u8> },
    Write { key: Vec<u8>, value: Vec<u8> },
    /// Writes an empty value; empty means absent.
    Clear { key: Vec<u8> },
}

impl StateCall {
    pub(super) fn parse(method_name: &str, args: &ArgumentArray) -> Result<Self, SdkError> {
        match method_name {
            "read" => {
                let r = ArgReader::new(SDK_OPERATION_NAME_STATE, "read", args, 1)?;
                Ok(Self::Read { key: r.bytes(0)? })
            }
            "write" => {
                let r = ArgReader::new(SDK_OPERATION_NAME_STATE, "write", args, 2)?;
                Ok(Self::Write { key: r.bytes(0)?, value: r.bytes(1)? })
            }
            "clear" => {
                let r = ArgReader::new(SDK_OPERATION_NAME_STATE, "clear", args, 1)?;
                Ok(Self::Clear { key: r.bytes(0)? })
            }
            other => Err(unknown_method(SDK_OPERATION_NAME_STATE, other)),
        }
    }
}

impl VirtualMachine {
    pub(crate) fn handle_state_call(
        &self,
        context: &SharedContext,
        call: StateCall,
    ) -> Result<ArgumentArray, SdkError> {
        match call {
            StateCall::Read { key } => {
                let value = self.read_state(context, &key)?;
                Ok(ArgumentArray::single(value))
            }
            StateCall::Write { key, value } => {
                write_state(context, &key, value)?;
                Ok(ArgumentArray::new())
            }
            StateCall::Clear { key } => {
                write_state(context, &key, Vec::new())?;
                Ok(ArgumentArray::new())
            }
        }
    }

    fn read_state(&self, context: &SharedContext, key: &[u8]) -> Result<Vec<u8>, SdkError> {
        let (contract_name, batch, block_height, deadline) = {
            let ctx = context.lock();
            let contract_name = ctx.current_service().ok_or(SdkError::EmptyServiceStack)?.to_owned();
            if let Some(value) = ctx.transient_state.get(&contract_name, key) {
                return Ok(value.to_vec());
            }
            (
                contract_name,
                ctx.batch_state().cloned(),
                ctx.last_committed_block_height(),
                ctx.deadline(),
            )
        };

        if let Some(batch) = batch {
            if let Some(value) = batch.read().get(&contract_name, key) {
                return Ok(value.to_vec());
            }
        }

        if deadline.is_expired() {
            return Err(SdkError::DeadlineExceeded("state storage read"));
        }
        let values = self
            .state_storage
            .read_keys(block_height, &contract_name, &[key.to_vec()], deadline)?;
        let value = values.into_iter().next().unwrap_or_default();

        context
            .lock()
            .transient_state
            .set(&contract_name, key, value.clone(), false);
        Ok(value)
    }
}

fn write_state(context: &SharedContext, key: &[u8], value: Vec<u8>) -> Result<(), SdkError> {
    let mut ctx = context.lock();
    if ctx.access_scope() != AccessScope::ReadWrite {
        return Err(SdkError::WriteWithoutAccess);
    }
    let contract_name = ctx.current_service().ok_or(SdkError::EmptyServiceStack)?.to_owned();
    ctx.transient_state.set(&contract_name, key, value, true);
    Ok(())
}
