//! `Sdk.IPFS`: content-addressed reads.

use basalt_primitives::ArgumentArray;
use tracing::warn;

use super::{unknown_method, ArgReader, SDK_OPERATION_NAME_IPFS};
use crate::context::SharedContext;
use crate::error::SdkError;
use crate::service::VirtualMachine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpfsCall {
    Read { hash: String },
}

impl IpfsCall {
    pub(super) fn parse(method_name: &str, args: &ArgumentArray) -> Result<Self, SdkError> {
        match method_name {
            "read" => {
                let r = ArgReader::new(SDK_OPERATION_NAME_IPFS, "read", args, 1)?;
                Ok(Self::Read { hash: r.string(0)? })
            }
            other => Err(unknown_method(SDK_OPERATION_NAME_IPFS, other)),
        }
    }
}

impl VirtualMachine {
    pub(crate) fn handle_ipfs_call(
        &self,
        context: &SharedContext,
        call: IpfsCall,
    ) -> Result<ArgumentArray, SdkError> {
        let IpfsCall::Read { hash } = call;
        let ipfs = self.ipfs.as_ref().ok_or(SdkError::ConnectorNotConfigured("ipfs"))?;
        let deadline = context.lock().deadline();
        if deadline.is_expired() {
            return Err(SdkError::DeadlineExceeded("ipfs read"));
        }

        let content = ipfs.read(&hash, deadline).map_err(|err| {
            warn!(hash = %hash, error = %err, "ipfs read failed");
            err
        })?;
        Ok(ArgumentArray::single(content))
    }
}
