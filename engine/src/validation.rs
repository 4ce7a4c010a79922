//! Pre-order validation of candidate transaction sets.
//!
//! Pre-order classifies transactions as admissible or not before they are
//! ordered into a block. It never mutates state.
//!
//! Each transaction is checked on its own (protocol version, virtual chain,
//! signer scheme and signature). Admissible transactions must also pass the
//! global gate, which is evaluated once per batch:
//!
//! 1. Liveness: the block timestamp may not run ahead of the reference time
//!    by more than the committee validity timeout
//! 2. Subscription: the management service must report it active
//! 3. `_GlobalPreOrder.approve` must succeed
//!
//! A global failure rejects every transaction in the batch except those
//! addressed to `_GlobalPreOrder` itself.

use basalt_primitives::codec::encode_transaction;
use basalt_primitives::crypto::verify_ed25519_slice;
use basalt_primitives::{
    AccessScope, ArgumentArray, BlockHeight, SignedTransaction, Signer, TimestampNano,
    TimestampSeconds, TransactionStatus,
};
use tracing::{debug, info, warn};

use crate::config::VmConfig;
use crate::error::PreOrderError;
use crate::host::Deadline;
use crate::service::VirtualMachine;
use crate::system_contract::{
    SystemContractCall, GLOBAL_PRE_ORDER_CONTRACT, GLOBAL_PRE_ORDER_METHOD_APPROVE,
};

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Fail if the block timestamp is more than `timeout` seconds past the
/// reference time. A block behind the reference time is accepted.
pub fn check_liveness(
    block_timestamp: TimestampNano,
    reference_time: TimestampSeconds,
    timeout: u64,
) -> Result<(), PreOrderError> {
    let block_seconds = block_timestamp / NANOS_PER_SECOND;
    if block_seconds > reference_time.saturating_add(timeout) {
        return Err(PreOrderError::LivenessExpired {
            block_timestamp: block_seconds,
            reference_time,
            timeout,
        });
    }
    Ok(())
}

/// Checks of one transaction that do not depend on the rest of the batch.
pub fn validate_transaction(config: &VmConfig, signed: &SignedTransaction) -> TransactionStatus {
    let tx = &signed.transaction;
    if tx.protocol_version != config.protocol_version {
        return TransactionStatus::RejectedUnsupportedVersion;
    }
    if tx.virtual_chain_id != config.virtual_chain_id {
        return TransactionStatus::RejectedVirtualChainMismatch;
    }
    match &tx.signer {
        Signer::Ed25519 { public_key } => {
            let message = encode_transaction(tx);
            if verify_ed25519_slice(&message, &signed.signature, public_key) {
                TransactionStatus::PreOrderValid
            } else {
                TransactionStatus::RejectedSignatureMismatch
            }
        }
        Signer::Unknown(_) => TransactionStatus::RejectedUnknownSignerScheme,
    }
}

impl VirtualMachine {
    /// Classify a candidate batch. Returns one status per transaction, in
    /// input order.
    ///
    /// `block_height` is the height of the last committed block the batch is
    /// validated against. A `deadline` that passes during the global check
    /// rejects the batch.
    pub fn transaction_set_pre_order(
        &self,
        block_height: BlockHeight,
        block_timestamp: TimestampNano,
        reference_time: TimestampSeconds,
        transactions: &[SignedTransaction],
        deadline: Deadline,
    ) -> Vec<TransactionStatus> {
        if transactions.is_empty() {
            return Vec::new();
        }

        let global =
            self.check_global_pre_order(block_height, block_timestamp, reference_time, deadline);
        if let Err(err) = &global {
            warn!(block_height, error = %err, "global pre-order check failed");
        }

        let statuses: Vec<TransactionStatus> = transactions
            .iter()
            .enumerate()
            .map(|(index, signed)| {
                let status = validate_transaction(&self.config, signed);
                if status.is_admissible()
                    && global.is_err()
                    && signed.transaction.contract_name != GLOBAL_PRE_ORDER_CONTRACT
                {
                    return TransactionStatus::RejectedGlobalPreOrder;
                }
                if !status.is_admissible() {
                    debug!(index, status = %status, "transaction rejected in pre-order");
                }
                status
            })
            .collect();

        let admitted = statuses.iter().filter(|status| status.is_admissible()).count();
        info!(
            block_height,
            transactions = transactions.len(),
            admitted,
            "pre-order completed"
        );
        statuses
    }

    /// The batch-wide part of pre-order.
    pub fn check_global_pre_order(
        &self,
        block_height: BlockHeight,
        block_timestamp: TimestampNano,
        reference_time: TimestampSeconds,
        deadline: Deadline,
    ) -> Result<(), PreOrderError> {
        check_liveness(
            block_timestamp,
            reference_time,
            self.config.committee_validity_timeout_secs,
        )?;

        if let Some(management) = &self.management {
            let active = management
                .get_subscription_status(reference_time)
                .map_err(PreOrderError::SubscriptionUnavailable)?;
            if !active {
                return Err(PreOrderError::SubscriptionInactive);
            }
        }

        let output = self.call_system_contract(SystemContractCall {
            block_height,
            block_timestamp,
            access_scope: AccessScope::ReadOnly,
            contract_name: GLOBAL_PRE_ORDER_CONTRACT.to_owned(),
            method_name: GLOBAL_PRE_ORDER_METHOD_APPROVE.to_owned(),
            input_arguments: ArgumentArray::new(),
            deadline,
        })?;
        if !output.call_result.is_success() {
            return Err(PreOrderError::Rejected {
                result: output.call_result,
                message: output.error_message(),
            });
        }
        Ok(())
    }
}
