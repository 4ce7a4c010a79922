//! `Sdk.Env`: block environment, no I/O.

use basalt_primitives::{Argument, ArgumentArray};

use super::{unknown_method, ArgReader, SDK_OPERATION_NAME_ENV};
use crate::context::SharedContext;
use crate::error::SdkError;
use crate::service::VirtualMachine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvCall {
    GetBlockHeight,
    GetBlockTimestamp,
    GetVirtualChainId,
}

impl EnvCall {
    pub(super) fn parse(method_name: &str, args: &ArgumentArray) -> Result<Self, SdkError> {
        let (call, name) = match method_name {
            "getBlockHeight" => (Self::GetBlockHeight, "getBlockHeight"),
            "getBlockTimestamp" => (Self::GetBlockTimestamp, "getBlockTimestamp"),
            "getVirtualChainId" => (Self::GetVirtualChainId, "getVirtualChainId"),
            other => return Err(unknown_method(SDK_OPERATION_NAME_ENV, other)),
        };
        ArgReader::new(SDK_OPERATION_NAME_ENV, name, args, 0)?;
        Ok(call)
    }
}

impl VirtualMachine {
    pub(crate) fn handle_env_call(
        &self,
        context: &SharedContext,
        call: EnvCall,
    ) -> Result<ArgumentArray, SdkError> {
        let value = match call {
            EnvCall::GetBlockHeight => Argument::Uint64(context.lock().block_height()),
            EnvCall::GetBlockTimestamp => Argument::Uint64(context.lock().block_timestamp()),
            EnvCall::GetVirtualChainId => Argument::Uint32(self.config.virtual_chain_id),
        };
        Ok(ArgumentArray::single(value))
    }
}
