//! Core type aliases and constants for the Basalt virtual machine.
//!
//! These types are shared by the primitives, the execution engine, and the
//! collaborator adapters plugged into it.

/// 32-byte hash used for transaction hashes.
pub type Hash = [u8; 32];

/// Block height (monotonically increasing).
pub type BlockHeight = u64;

/// Block timestamp in nanoseconds since the Unix epoch.
pub type TimestampNano = u64;

/// Reference time in seconds since the Unix epoch (consensus reference time).
pub type TimestampSeconds = u64;

/// Name of a deployed contract (service).
pub type ContractName = String;

/// Name of a contract method.
pub type MethodName = String;

/// Name of an event emitted by a contract.
pub type EventName = String;

/// Identifier of a virtual chain.
pub type VirtualChainId = u32;

/// Size in bytes of a client or contract address.
pub const CLIENT_ADDRESS_SIZE: usize = 20;

/// A client or contract address.
pub type ClientAddress = [u8; CLIENT_ADDRESS_SIZE];

/// Current transaction protocol version.
pub const PROTOCOL_VERSION: u32 = 1;

/// Convert a byte slice to a hex string for display purposes.
pub fn to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(2 + bytes.len() * 2);
    s.push_str("0x");
    for byte in bytes {
        use core::fmt::Write;
        let _ = write!(s, "{:02x}", byte);
    }
    s
}

/// Returns true if the method name marks an internal method (`_` prefix).
pub fn is_internal_method(method_name: &str) -> bool {
    method_name.starts_with('_')
}
