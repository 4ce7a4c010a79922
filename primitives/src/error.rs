//! Result codes and error types for the Basalt virtual machine.
//!
//! `ExecutionResult` is reported in every transaction receipt and query
//! output. `TransactionStatus` is the admission-time classification produced
//! by the pre-order stage, kept separate so a client can tell "never ran"
//! apart from "ran and failed".

use core::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of executing a contract call.
///
/// The repr values are part of the receipt encoding and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum ExecutionResult {
    /// Rejected before execution (e.g. unsupported protocol version).
    #[default]
    Reserved = 0,
    Success = 1,
    /// The contract returned an error or explicitly failed.
    ErrorSmartContract = 2,
    /// Panic or host-side fault.
    ErrorUnexpected = 3,
    /// Argument mismatch.
    ErrorInput = 4,
    ErrorContractNotDeployed = 5,
}

impl ExecutionResult {
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Reserved),
            1 => Some(Self::Success),
            2 => Some(Self::ErrorSmartContract),
            3 => Some(Self::ErrorUnexpected),
            4 => Some(Self::ErrorInput),
            5 => Some(Self::ErrorContractNotDeployed),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserved => write!(f, "EXECUTION_RESULT_RESERVED"),
            Self::Success => write!(f, "EXECUTION_RESULT_SUCCESS"),
            Self::ErrorSmartContract => write!(f, "EXECUTION_RESULT_ERROR_SMART_CONTRACT"),
            Self::ErrorUnexpected => write!(f, "EXECUTION_RESULT_ERROR_UNEXPECTED"),
            Self::ErrorInput => write!(f, "EXECUTION_RESULT_ERROR_INPUT"),
            Self::ErrorContractNotDeployed => {
                write!(f, "EXECUTION_RESULT_ERROR_CONTRACT_NOT_DEPLOYED")
            }
        }
    }
}

/// Admission status assigned to a transaction by the pre-order stage.
///
/// Every status starts as `Reserved` and is then either accepted or
/// rejected with a specific reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum TransactionStatus {
    #[default]
    Reserved = 0,
    PreOrderValid = 1,
    RejectedUnsupportedVersion = 2,
    RejectedVirtualChainMismatch = 3,
    RejectedUnknownSignerScheme = 4,
    RejectedSignatureMismatch = 5,
    RejectedGlobalPreOrder = 6,
}

impl TransactionStatus {
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Reserved),
            1 => Some(Self::PreOrderValid),
            2 => Some(Self::RejectedUnsupportedVersion),
            3 => Some(Self::RejectedVirtualChainMismatch),
            4 => Some(Self::RejectedUnknownSignerScheme),
            5 => Some(Self::RejectedSignatureMismatch),
            6 => Some(Self::RejectedGlobalPreOrder),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns true if the transaction may be handed to the executor.
    pub fn is_admissible(self) -> bool {
        matches!(self, Self::PreOrderValid)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserved => write!(f, "TRANSACTION_STATUS_RESERVED"),
            Self::PreOrderValid => write!(f, "TRANSACTION_STATUS_PRE_ORDER_VALID"),
            Self::RejectedUnsupportedVersion => {
                write!(f, "TRANSACTION_STATUS_REJECTED_UNSUPPORTED_VERSION")
            }
            Self::RejectedVirtualChainMismatch => {
                write!(f, "TRANSACTION_STATUS_REJECTED_VIRTUAL_CHAIN_MISMATCH")
            }
            Self::RejectedUnknownSignerScheme => {
                write!(f, "TRANSACTION_STATUS_REJECTED_UNKNOWN_SIGNER_SCHEME")
            }
            Self::RejectedSignatureMismatch => {
                write!(f, "TRANSACTION_STATUS_REJECTED_SIGNATURE_MISMATCH")
            }
            Self::RejectedGlobalPreOrder => {
                write!(f, "TRANSACTION_STATUS_REJECTED_GLOBAL_PRE_ORDER")
            }
        }
    }
}

/// Errors raised while decoding the deterministic binary encoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("unexpected end of data")]
    UnexpectedEof,

    #[error("unknown argument type tag 0x{0:02x}")]
    UnknownArgumentType(u8),

    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    #[error("{0} trailing bytes after decoding")]
    TrailingBytes(usize),

    #[error("invalid value: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_codes_serialize_as_snake_case() {
        let json = serde_json::to_string(&ExecutionResult::ErrorSmartContract).unwrap();
        assert_eq!(json, "\"error_smart_contract\"");
        let status: TransactionStatus = serde_json::from_str("\"pre_order_valid\"").unwrap();
        assert_eq!(status, TransactionStatus::PreOrderValid);
    }

    #[test]
    fn test_execution_result_repr_values() {
        assert_eq!(ExecutionResult::Reserved as u16, 0);
        assert_eq!(ExecutionResult::Success as u16, 1);
        assert_eq!(ExecutionResult::ErrorSmartContract as u16, 2);
        assert_eq!(ExecutionResult::ErrorUnexpected as u16, 3);
        assert_eq!(ExecutionResult::ErrorInput as u16, 4);
        assert_eq!(ExecutionResult::ErrorContractNotDeployed as u16, 5);
    }

    #[test]
    fn test_execution_result_from_u16() {
        for code in 0..=5 {
            let result = ExecutionResult::from_u16(code).unwrap();
            assert_eq!(result.as_u16(), code);
        }
        assert_eq!(ExecutionResult::from_u16(6), None);
    }

    #[test]
    fn test_transaction_status_from_u16() {
        for code in 0..=6 {
            let status = TransactionStatus::from_u16(code).unwrap();
            assert_eq!(status.as_u16(), code);
        }
        assert_eq!(TransactionStatus::from_u16(99), None);
    }

    #[test]
    fn test_defaults_are_reserved() {
        assert_eq!(ExecutionResult::default(), ExecutionResult::Reserved);
        assert_eq!(TransactionStatus::default(), TransactionStatus::Reserved);
    }

    #[test]
    fn test_only_valid_status_is_admissible() {
        assert!(TransactionStatus::PreOrderValid.is_admissible());
        assert!(!TransactionStatus::Reserved.is_admissible());
        assert!(!TransactionStatus::RejectedGlobalPreOrder.is_admissible());
    }

    #[test]
    fn test_display() {
        let s = format!("{}", ExecutionResult::ErrorUnexpected);
        assert!(s.contains("ERROR_UNEXPECTED"));
        let err = CodecError::UnknownArgumentType(0x7f);
        assert!(format!("{}", err).contains("0x7f"));
    }
}
