//! `Sdk.Events`: event emission.

use basalt_primitives::codec::decode_argument_array;
use basalt_primitives::ArgumentArray;

use super::{unknown_method, ArgReader, SDK_OPERATION_NAME_EVENTS};
use crate::context::SharedContext;
use crate::error::SdkError;
use crate::service::VirtualMachine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventsCall {
    EmitEvent { event_name: String, packed_arguments: Vec<u8> },
}

impl EventsCall {
    pub(super) fn parse(method_name: &str, args: &ArgumentArray) -> Result<Self, SdkError> {
        match method_name {
            "emitEvent" => {
                let r = ArgReader::new(SDK_OPERATION_NAME_EVENTS, "emitEvent", args, 2)?;
                Ok(Self::EmitEvent {
                    event_name: r.string(0)?,
                    packed_arguments: r.bytes(1)?,
                })
            }
            other => Err(unknown_method(SDK_OPERATION_NAME_EVENTS, other)),
        }
    }
}

impl VirtualMachine {
    pub(crate) fn handle_events_call(
        &self,
        context: &SharedContext,
        call: EventsCall,
    ) -> Result<ArgumentArray, SdkError> {
        let EventsCall::EmitEvent { event_name, packed_arguments } = call;
        // Receipts carry the packed bytes as-is, so reject what would not decode.
        decode_argument_array(&packed_arguments)?;
        context.lock().add_event(&event_name, packed_arguments)?;
        Ok(ArgumentArray::new())
    }
}
