//! `Sdk.Address`: 20-byte addresses of the signer and of contracts.

use basalt_primitives::crypto::contract_address;
use basalt_primitives::{ArgumentArray, ClientAddress};

use super::{unknown_method, ArgReader, SDK_OPERATION_NAME_ADDRESS};
use crate::context::{ExecutionContext, SharedContext};
use crate::error::SdkError;
use crate::service::VirtualMachine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressCall {
    GetSignerAddress,
    /// The signer for a top-level frame, otherwise the contract one below
    /// the top of the stack.
    GetCallerAddress,
    GetOwnAddress,
}

impl AddressCall {
    pub(super) fn parse(method_name: &str, args: &ArgumentArray) -> Result<Self, SdkError> {
        let call = match method_name {
            "getSignerAddress" => Self::GetSignerAddress,
            "getCallerAddress" => Self::GetCallerAddress,
            "getOwnAddress" => Self::GetOwnAddress,
            other => return Err(unknown_method(SDK_OPERATION_NAME_ADDRESS, other)),
        };
        ArgReader::new(SDK_OPERATION_NAME_ADDRESS, call.method_name(), args, 0)?;
        Ok(call)
    }

    fn method_name(self) -> &'static str {
        match self {
            Self::GetSignerAddress => "getSignerAddress",
            Self::GetCallerAddress => "getCallerAddress",
            Self::GetOwnAddress => "getOwnAddress",
        }
    }
}

fn signer_address(ctx: &ExecutionContext) -> Result<ClientAddress, SdkError> {
    ctx.signer().and_then(|signer| signer.address()).ok_or(SdkError::NoSigner)
}

impl VirtualMachine {
    pub(crate) fn handle_address_call(
        &self,
        context: &SharedContext,
        call: AddressCall,
    ) -> Result<ArgumentArray, SdkError> {
        let ctx = context.lock();
        let address = match call {
            AddressCall::GetSignerAddress => signer_address(&ctx)?,
            AddressCall::GetCallerAddress => match ctx.stack_depth() {
                0 => return Err(SdkError::EmptyServiceStack),
                1 => signer_address(&ctx)?,
                _ => {
                    let caller = ctx.calling_service().ok_or(SdkError::EmptyServiceStack)?;
                    contract_address(caller)
                }
            },
            AddressCall::GetOwnAddress => {
                let own = ctx.current_service().ok_or(SdkError::EmptyServiceStack)?;
                contract_address(own)
            }
        };
        Ok(ArgumentArray::single(address.to_vec()))
    }
}
