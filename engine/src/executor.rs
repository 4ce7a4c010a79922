//! Transaction set executor: the deterministic state transition of a block.
//!
//! `VirtualMachine::process_transaction_set` runs a block's transactions
//! strictly in the order consensus gave them:
//!
//! 1. Create one batch transient state for the whole set
//! 2. For each transaction:
//!    a. Reject a foreign protocol version with a `RESERVED` receipt
//!    b. Allocate a read-write context linked to the batch
//!    c. Resolve the contract (auto-deploying if needed) and invoke it
//!    d. Merge the context's writes into the batch on success only
//!    e. Build the receipt, with the transaction's events either way
//! 3. Derive the per-contract state diff from the batch
//!
//! A failing transaction never aborts the set. Its writes are dropped with
//! its context, so later transactions and the diff never see them.
//!
//! The deadline comes from the caller. Receipts must not depend on how fast
//! a node runs, so a deadline that passes mid-set aborts the whole set with
//! [`VmError::DeadlineExceeded`] instead of failing individual transactions.

use std::sync::Arc;

use basalt_primitives::{
    AccessScope, ArgumentArray, BlockHeight, ContractStateDiff, ExecutionResult,
    SignedTransaction, TimestampNano, TransactionReceipt, TransientState, to_hex,
};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::context::{BatchState, ContextParams};
use crate::error::VmError;
use crate::host::Deadline;
use crate::service::VirtualMachine;
use crate::transaction::MethodCall;

/// Output of [`VirtualMachine::process_transaction_set`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionSetOutput {
    /// One receipt per input transaction, in input order.
    pub transaction_receipts: Vec<TransactionReceipt>,
    pub contract_state_diffs: Vec<ContractStateDiff>,
}

impl VirtualMachine {
    /// Execute an ordered transaction set on top of the state committed at
    /// `block_height - 1`.
    ///
    /// Fails only if `deadline` passes before the last transaction is done.
    pub fn process_transaction_set(
        &self,
        block_height: BlockHeight,
        block_timestamp: TimestampNano,
        transactions: &[SignedTransaction],
        deadline: Deadline,
    ) -> Result<TransactionSetOutput, VmError> {
        info!(
            block_height,
            transactions = transactions.len(),
            "processing transaction set"
        );

        let batch: BatchState = Arc::new(RwLock::new(TransientState::new()));
        let last_committed_block_height = block_height.saturating_sub(1);

        let mut receipts = Vec::with_capacity(transactions.len());
        for (index, signed) in transactions.iter().enumerate() {
            let tx = &signed.transaction;
            let tx_hash = signed.hash();

            if tx.protocol_version != self.config.protocol_version {
                warn!(
                    index,
                    protocol_version = tx.protocol_version,
                    expected = self.config.protocol_version,
                    "transaction has unsupported protocol version"
                );
                receipts.push(TransactionReceipt {
                    tx_hash,
                    execution_result: ExecutionResult::Reserved,
                    output_arguments: ArgumentArray::single(format!(
                        "unsupported protocol version {}",
                        tx.protocol_version
                    )),
                    output_events: Vec::new(),
                });
                continue;
            }

            let params = ContextParams {
                last_committed_block_height,
                block_height,
                block_timestamp,
                access_scope: AccessScope::ReadWrite,
                signer: Some(tx.signer.clone()),
                batch_state: Some(Arc::clone(&batch)),
                deadline,
            };
            let outcome = self.run_method(
                params,
                MethodCall {
                    contract_name: &tx.contract_name,
                    method_name: &tx.method_name,
                    input_arguments: &tx.input_arguments,
                    signer: &tx.signer,
                },
            );

            // Any read that gave up on the deadline happened before this check.
            if deadline.is_expired() {
                warn!(block_height, index, "deadline exceeded, aborting transaction set");
                return Err(VmError::DeadlineExceeded { block_height });
            }

            if outcome.call_result.is_success() {
                debug!(index, contract = %tx.contract_name, method = %tx.method_name, "transaction succeeded");
            } else {
                warn!(
                    index,
                    tx_hash = %to_hex(&tx_hash),
                    contract = %tx.contract_name,
                    method = %tx.method_name,
                    result = %outcome.call_result,
                    "transaction failed"
                );
            }

            receipts.push(TransactionReceipt {
                tx_hash,
                execution_result: outcome.call_result,
                output_arguments: outcome.output_arguments,
                output_events: outcome.events,
            });
        }

        let contract_state_diffs = batch.read().contract_state_diffs();
        info!(
            block_height,
            receipts = receipts.len(),
            contracts_changed = contract_state_diffs.len(),
            "transaction set processed"
        );

        Ok(TransactionSetOutput {
            transaction_receipts: receipts,
            contract_state_diffs,
        })
    }
}
