//! SDK call router: the host side of the contract/host boundary.
//!
//! Contract code issues SDK calls by wire-level operation and method names.
//! The router recovers the caller's context from the id in the request,
//! parses the call into a typed [`SdkCall`] (validating argument count and
//! types exactly), and dispatches it to the handler of its operation.

mod address;
mod env;
mod ethereum;
mod events;
mod ipfs;
mod service;
mod state;

pub use address::AddressCall;
pub use env::EnvCall;
pub use ethereum::EthereumCall;
pub use events::EventsCall;
pub use ipfs::IpfsCall;
pub use service::ServiceCall;
pub use state::StateCall;

use basalt_primitives::{Argument, ArgumentArray};
use tracing::debug;

use crate::error::SdkError;
use crate::processor::{SdkCallHandler, SdkCallRequest};
use crate::service::VirtualMachine;

pub const SDK_OPERATION_NAME_STATE: &str = "Sdk.State";
pub const SDK_OPERATION_NAME_SERVICE: &str = "Sdk.Service";
pub const SDK_OPERATION_NAME_EVENTS: &str = "Sdk.Events";
pub const SDK_OPERATION_NAME_ADDRESS: &str = "Sdk.Address";
pub const SDK_OPERATION_NAME_ENV: &str = "Sdk.Env";
pub const SDK_OPERATION_NAME_ETHEREUM: &str = "Sdk.Ethereum";
pub const SDK_OPERATION_NAME_IPFS: &str = "Sdk.IPFS";

/// A parsed SDK call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkCall {
    State(StateCall),
    Service(ServiceCall),
    Events(EventsCall),
    Address(AddressCall),
    Env(EnvCall),
    Ethereum(EthereumCall),
    Ipfs(IpfsCall),
}

impl SdkCall {
    /// Parse wire-level names and arguments into a typed call.
    pub fn from_wire(operation_name: &str, method_name: &str, args: &ArgumentArray) -> Result<Self, SdkError> {
        match operation_name {
            SDK_OPERATION_NAME_STATE => StateCall::parse(method_name, args).map(Self::State),
            SDK_OPERATION_NAME_SERVICE => ServiceCall::parse(method_name, args).map(Self::Service),
            SDK_OPERATION_NAME_EVENTS => EventsCall::parse(method_name, args).map(Self::Events),
            SDK_OPERATION_NAME_ADDRESS => AddressCall::parse(method_name, args).map(Self::Address),
            SDK_OPERATION_NAME_ENV => EnvCall::parse(method_name, args).map(Self::Env),
            SDK_OPERATION_NAME_ETHEREUM => EthereumCall::parse(method_name, args).map(Self::Ethereum),
            SDK_OPERATION_NAME_IPFS => IpfsCall::parse(method_name, args).map(Self::Ipfs),
            other => Err(SdkError::UnknownOperation(other.to_owned())),
        }
    }
}

impl SdkCallHandler for VirtualMachine {
    fn handle_sdk_call(&self, request: SdkCallRequest) -> Result<ArgumentArray, SdkError> {
        let context = self.contexts.lookup(request.context_id)?;
        let call = SdkCall::from_wire(
            &request.operation_name,
            &request.method_name,
            &request.input_arguments,
        )?;
        debug!(
            context = %request.context_id,
            operation = %request.operation_name,
            method = %request.method_name,
            "handling sdk call"
        );

        match call {
            SdkCall::State(call) => self.handle_state_call(&context, call),
            SdkCall::Service(call) => {
                self.handle_service_call(request.context_id, &context, call, request.permission_scope)
            }
            SdkCall::Events(call) => self.handle_events_call(&context, call),
            SdkCall::Address(call) => self.handle_address_call(&context, call),
            SdkCall::Env(call) => self.handle_env_call(&context, call),
            SdkCall::Ethereum(call) => self.handle_ethereum_call(&context, call),
            SdkCall::Ipfs(call) => self.handle_ipfs_call(&context, call),
        }
    }
}

fn unknown_method(operation: &str, method: &str) -> SdkError {
    SdkError::UnknownMethod {
        operation: operation.to_owned(),
        method: method.to_owned(),
    }
}

/// Positional argument access with exact type checks.
struct ArgReader<'a> {
    operation: &'static str,
    method: &'static str,
    args: &'a ArgumentArray,
}

impl<'a> ArgReader<'a> {
    /// Fails unless exactly `count` arguments were passed.
    fn new(
        operation: &'static str,
        method: &'static str,
        args: &'a ArgumentArray,
        count: usize,
    ) -> Result<Self, SdkError> {
        let reader = Self { operation, method, args };
        if args.len() != count {
            return Err(reader.invalid(format!("expected {} arguments, got {}", count, args.len())));
        }
        Ok(reader)
    }

    fn invalid(&self, reason: String) -> SdkError {
        SdkError::InvalidArguments {
            operation: self.operation,
            method: self.method,
            reason,
        }
    }

    fn arg(&self, index: usize) -> Result<&'a Argument, SdkError> {
        self.args
            .get(index)
            .ok_or_else(|| self.invalid(format!("missing argument {}", index)))
    }

    fn mismatch(&self, index: usize, expected: &str, got: &Argument) -> SdkError {
        self.invalid(format!("argument {} must be {}, got {}", index, expected, got.type_name()))
    }

    fn string(&self, index: usize) -> Result<String, SdkError> {
        let arg = self.arg(index)?;
        arg.as_str()
            .map(str::to_owned)
            .ok_or_else(|| self.mismatch(index, "string", arg))
    }

    fn bytes(&self, index: usize) -> Result<Vec<u8>, SdkError> {
        let arg = self.arg(index)?;
        arg.as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| self.mismatch(index, "bytes", arg))
    }

    fn uint64(&self, index: usize) -> Result<u64, SdkError> {
        let arg = self.arg(index)?;
        arg.as_uint64().ok_or_else(|| self.mismatch(index, "uint64", arg))
    }
}
