//! Read-only queries against the last committed state.
//!
//! A query runs in its own read-only context with no batch state, so it
//! can run concurrently with block processing and never deploys anything.

use basalt_primitives::{
    AccessScope, ArgumentArray, BlockHeight, Event, ExecutionResult, Query, TimestampNano,
};
use tracing::{info, warn};

use crate::context::ContextParams;
use crate::error::VmError;
use crate::host::Deadline;
use crate::service::VirtualMachine;
use crate::transaction::MethodCall;

/// Output of [`VirtualMachine::run_local_method`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutput {
    pub call_result: ExecutionResult,
    pub output_arguments: ArgumentArray,
    pub output_events: Vec<Event>,
    /// Committed block the query was answered against.
    pub reference_block_height: BlockHeight,
    pub reference_block_timestamp: TimestampNano,
}

impl VirtualMachine {
    /// Run a query against the latest committed block.
    ///
    /// Contract failures are reported in the output. `Err` means the
    /// committed height could not be determined or `deadline` passed; its
    /// result code is [`VmError::execution_result`].
    pub fn run_local_method(&self, query: &Query, deadline: Deadline) -> Result<QueryOutput, VmError> {
        let (block_height, block_timestamp) = self
            .state_storage
            .get_state_storage_block_height()
            .map_err(|err| {
                warn!(contract = %query.contract_name, error = %err, "query could not read committed block height");
                VmError::StorageHeight(err)
            })?;

        info!(
            contract = %query.contract_name,
            method = %query.method_name,
            block_height,
            "running local method"
        );

        let params = ContextParams {
            last_committed_block_height: block_height,
            block_height,
            block_timestamp,
            access_scope: AccessScope::ReadOnly,
            signer: Some(query.signer.clone()),
            batch_state: None,
            deadline,
        };
        let outcome = self.run_method(
            params,
            MethodCall {
                contract_name: &query.contract_name,
                method_name: &query.method_name,
                input_arguments: &query.input_arguments,
                signer: &query.signer,
            },
        );

        if deadline.is_expired() {
            warn!(contract = %query.contract_name, block_height, "query ran past its deadline");
            return Err(VmError::DeadlineExceeded { block_height });
        }

        Ok(QueryOutput {
            call_result: outcome.call_result,
            output_arguments: outcome.output_arguments,
            output_events: outcome.events,
            reference_block_height: block_height,
            reference_block_timestamp: block_timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use basalt_primitives::{Signer, PROTOCOL_VERSION};

    use crate::config::VmConfig;
    use crate::error::CollaboratorError;
    use crate::host::MemStateStorage;

    fn query() -> Query {
        Query {
            protocol_version: PROTOCOL_VERSION,
            virtual_chain_id: 42,
            timestamp: 0,
            signer: Signer::ed25519([3u8; 32]),
            contract_name: "Token".into(),
            method_name: "getBalance".into(),
            input_arguments: ArgumentArray::new(),
        }
    }

    #[test]
    fn test_storage_height_failure_is_unexpected() {
        let storage = Arc::new(MemStateStorage::new());
        storage.fail_height_queries(true);
        let vm = VirtualMachine::builder(VmConfig::default(), storage).build();

        let err = vm.run_local_method(&query(), Deadline::none()).unwrap_err();
        assert!(matches!(err, VmError::StorageHeight(CollaboratorError::Storage(_))));
        assert_eq!(err.execution_result(), ExecutionResult::ErrorUnexpected);
    }

    #[test]
    fn test_reference_block_is_reported() {
        let storage = Arc::new(MemStateStorage::new());
        storage.set_block(12, 34_000);
        let vm = VirtualMachine::builder(VmConfig::default(), storage).build();

        // No native processor: resolution fails but the reference is still set.
        let output = vm.run_local_method(&query(), Deadline::none()).unwrap();
        assert_eq!(output.call_result, ExecutionResult::ErrorUnexpected);
        assert_eq!(output.reference_block_height, 12);
        assert_eq!(output.reference_block_timestamp, 34_000);
    }

    #[test]
    fn test_expired_deadline_fails_the_query() {
        let storage = Arc::new(MemStateStorage::new());
        storage.set_block(12, 34_000);
        let vm = VirtualMachine::builder(VmConfig::default(), storage).build();

        let err = vm
            .run_local_method(&query(), Deadline::after(std::time::Duration::ZERO))
            .unwrap_err();
        assert_eq!(err, VmError::DeadlineExceeded { block_height: 12 });
    }
}
