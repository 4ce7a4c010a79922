//! Transaction, signer and query types handed to the virtual machine.
//!
//! Consensus delivers ordered batches of `SignedTransaction`s; clients submit
//! `Query`s for read-only local calls outside of any block.

use crate::codec;
use crate::crypto;
use crate::error::CodecError;
use crate::execution::ArgumentArray;
use crate::types::{ClientAddress, ContractName, Hash, MethodName, TimestampNano, VirtualChainId};

/// Signer scheme tag for Ed25519 in the transaction encoding.
pub const SIGNER_SCHEME_ED25519: u8 = 1;

/// Identity of the party that signed a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signer {
    Ed25519 { public_key: [u8; 32] },
    /// A scheme this node does not understand. Kept so the pre-order stage
    /// can reject it with a specific status instead of failing to decode.
    Unknown(UnknownSigner),
}

/// Signer of an unsupported scheme. Never carries a supported scheme tag,
/// so its encoding cannot be mistaken for an Ed25519 signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSigner {
    scheme: u8,
    key: Vec<u8>,
}

impl UnknownSigner {
    pub fn scheme(&self) -> u8 {
        self.scheme
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }
}

impl Signer {
    pub fn ed25519(public_key: [u8; 32]) -> Self {
        Self::Ed25519 { public_key }
    }

    /// Signer of an unsupported scheme. Fails for the Ed25519 tag.
    pub fn unknown(scheme: u8, key: Vec<u8>) -> Result<Self, CodecError> {
        if scheme == SIGNER_SCHEME_ED25519 {
            return Err(CodecError::InvalidValue(format!(
                "signer scheme {scheme} is not an unknown scheme"
            )));
        }
        Ok(Self::Unknown(UnknownSigner { scheme, key }))
    }

    pub fn scheme(&self) -> u8 {
        match self {
            Self::Ed25519 { .. } => SIGNER_SCHEME_ED25519,
            Self::Unknown(unknown) => unknown.scheme,
        }
    }

    /// Client address derived from the signer's public key, if the scheme is
    /// supported.
    pub fn address(&self) -> Option<ClientAddress> {
        match self {
            Self::Ed25519 { public_key } => Some(crypto::client_address_from_public_key(public_key)),
            Self::Unknown(_) => None,
        }
    }
}

/// A transaction as ordered by consensus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub protocol_version: u32,
    pub virtual_chain_id: VirtualChainId,
    /// Client-side creation time, nanoseconds.
    pub timestamp: TimestampNano,
    pub signer: Signer,
    pub contract_name: ContractName,
    pub method_name: MethodName,
    pub input_arguments: ArgumentArray,
}

impl Transaction {
    /// SHA-256 over the canonical encoding. This is also the message covered
    /// by the signature.
    pub fn hash(&self) -> Hash {
        crypto::hash_sha256(&codec::encode_transaction(self))
    }
}

/// A transaction together with its signature over `transaction.hash()`'s
/// preimage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: Vec<u8>,
}

impl SignedTransaction {
    pub fn hash(&self) -> Hash {
        self.transaction.hash()
    }

    /// Sign a transaction with an Ed25519 key. The signer field must already
    /// carry the matching public key.
    #[cfg(feature = "keygen")]
    pub fn sign_ed25519(transaction: Transaction, signing_key: &ed25519_dalek::SigningKey) -> Self {
        let message = codec::encode_transaction(&transaction);
        let signature = crypto::sign_ed25519(&message, signing_key).to_vec();
        Self { transaction, signature }
    }
}

/// A read-only call submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub protocol_version: u32,
    pub virtual_chain_id: VirtualChainId,
    pub timestamp: TimestampNano,
    pub signer: Signer,
    pub contract_name: ContractName,
    pub method_name: MethodName,
    pub input_arguments: ArgumentArray,
}
