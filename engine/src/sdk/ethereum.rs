//! `Sdk.Ethereum`: calls through the cross-chain connector.
//!
//! Every call is made on behalf of the block timestamp of the context, so
//! all nodes executing the same block ask Ethereum the same question.

use basalt_primitives::{Argument, ArgumentArray};
use tracing::warn;

use super::{unknown_method, ArgReader, SDK_OPERATION_NAME_ETHEREUM};
use crate::context::SharedContext;
use crate::error::SdkError;
use crate::host::{CrosschainConnector, Deadline, EthereumCallInput, EthereumLogsInput};
use crate::service::VirtualMachine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EthereumCall {
    CallMethod {
        contract_address: String,
        json_abi: String,
        /// 0 lets the connector pick a block from the reference timestamp.
        block_number: u64,
        method_name: String,
        packed_arguments: Vec<u8>,
    },
    GetTransactionLog {
        contract_address: String,
        json_abi: String,
        tx_hash: String,
        event_name: String,
    },
    GetBlockNumber,
}

impl EthereumCall {
    pub(super) fn parse(method_name: &str, args: &ArgumentArray) -> Result<Self, SdkError> {
        match method_name {
            "callMethod" => {
                let r = ArgReader::new(SDK_OPERATION_NAME_ETHEREUM, "callMethod", args, 5)?;
                Ok(Self::CallMethod {
                    contract_address: r.string(0)?,
                    json_abi: r.string(1)?,
                    block_number: r.uint64(2)?,
                    method_name: r.string(3)?,
                    packed_arguments: r.bytes(4)?,
                })
            }
            "getTransactionLog" => {
                let r = ArgReader::new(SDK_OPERATION_NAME_ETHEREUM, "getTransactionLog", args, 4)?;
                Ok(Self::GetTransactionLog {
                    contract_address: r.string(0)?,
                    json_abi: r.string(1)?,
                    tx_hash: r.string(2)?,
                    event_name: r.string(3)?,
                })
            }
            "getBlockNumber" => {
                ArgReader::new(SDK_OPERATION_NAME_ETHEREUM, "getBlockNumber", args, 0)?;
                Ok(Self::GetBlockNumber)
            }
            other => Err(unknown_method(SDK_OPERATION_NAME_ETHEREUM, other)),
        }
    }
}

impl VirtualMachine {
    fn crosschain_connector(&self) -> Result<&dyn CrosschainConnector, SdkError> {
        self.crosschain
            .as_deref()
            .ok_or(SdkError::ConnectorNotConfigured("ethereum"))
    }

    pub(crate) fn handle_ethereum_call(
        &self,
        context: &SharedContext,
        call: EthereumCall,
    ) -> Result<ArgumentArray, SdkError> {
        let connector = self.crosschain_connector()?;
        let (reference_timestamp, deadline) = {
            let ctx = context.lock();
            (ctx.block_timestamp(), ctx.deadline())
        };
        if deadline.is_expired() {
            return Err(SdkError::DeadlineExceeded("ethereum call"));
        }

        match call {
            EthereumCall::CallMethod {
                contract_address,
                json_abi,
                block_number,
                method_name,
                packed_arguments,
            } => {
                let input = EthereumCallInput {
                    reference_timestamp,
                    block_number,
                    contract_address,
                    json_abi,
                    method_name,
                    packed_arguments,
                };
                let output = connector
                    .ethereum_call_contract(&input, deadline)
                    .map_err(|err| {
                        warn!(address = %input.contract_address, method = %input.method_name, error = %err, "ethereum call failed");
                        err
                    })?;
                Ok(ArgumentArray::single(output))
            }
            EthereumCall::GetTransactionLog {
                contract_address,
                json_abi,
                tx_hash,
                event_name,
            } => {
                let input = EthereumLogsInput {
                    reference_timestamp,
                    contract_address,
                    json_abi,
                    tx_hash,
                    event_name,
                };
                get_transaction_log(connector, &input, deadline)
            }
            EthereumCall::GetBlockNumber => {
                let number = connector.ethereum_get_block_number(reference_timestamp, deadline)?;
                Ok(ArgumentArray::single(number))
            }
        }
    }
}

/// Only the first matching log is handed to the contract.
fn get_transaction_log(
    connector: &dyn CrosschainConnector,
    input: &EthereumLogsInput,
    deadline: Deadline,
) -> Result<ArgumentArray, SdkError> {
    let logs = connector
        .ethereum_get_transaction_logs(input, deadline)
        .map_err(|err| {
            warn!(tx_hash = %input.tx_hash, event = %input.event_name, error = %err, "ethereum log lookup failed");
            err
        })?;
    let packed = logs
        .packed_outputs
        .into_iter()
        .next()
        .ok_or_else(|| SdkError::EmptyTransactionLog(input.tx_hash.clone()))?;

    Ok(ArgumentArray::from(vec![
        Argument::Bytes(packed),
        Argument::Uint64(logs.block_number),
        Argument::Uint32(logs.tx_index),
    ]))
}
