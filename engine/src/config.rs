//! Virtual machine configuration.

use std::time::Duration;

use basalt_primitives::{VirtualChainId, PROTOCOL_VERSION};
use serde::Deserialize;

use crate::host::Deadline;

/// Configuration for the virtual machine.
///
/// Missing fields fall back to their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Virtual chain served by this node. Exposed to contracts through
    /// `Env.getVirtualChainId` and checked in pre-order.
    pub virtual_chain_id: VirtualChainId,

    /// Accepted transaction protocol version.
    pub protocol_version: u32,

    /// Maximal drift in seconds between the block timestamp and the block
    /// reference time before the committee is considered stale.
    pub committee_validity_timeout_secs: u64,

    /// Budget of the deadline a node passes to queries and system contract
    /// calls. Transaction sets run under the deadline of the consensus round
    /// instead, never one derived from local configuration.
    pub external_call_timeout_ms: u64,

    /// Whether contracts known to the native processor are deployed on
    /// first reference by a committing transaction.
    pub auto_deploy_native_contracts: bool,
}

impl VmConfig {
    pub fn external_call_timeout(&self) -> Duration {
        Duration::from_millis(self.external_call_timeout_ms)
    }

    /// A deadline `external_call_timeout_ms` from now.
    pub fn query_deadline(&self) -> Deadline {
        Deadline::after(self.external_call_timeout())
    }
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            virtual_chain_id: 42,
            protocol_version: PROTOCOL_VERSION,
            committee_validity_timeout_secs: 1800, // 30 minutes
            external_call_timeout_ms: 5000,
            auto_deploy_native_contracts: true,
        }
    }
}
