//! Cryptographic helpers for the Basalt virtual machine.
//!
//! - SHA-256 for transaction hashes
//! - BLAKE3 for client and contract address derivation
//! - Ed25519 for transaction signatures
//!
//! Everything here is deterministic. Key generation is only compiled with the
//! `keygen` feature and is never used by the engine itself.

use crate::types::{ClientAddress, Hash, CLIENT_ADDRESS_SIZE};

/// Compute BLAKE3 hash of the input data.
pub fn hash_blake3(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Compute SHA-256 hash of the input data.
pub fn hash_sha256(data: &[u8]) -> Hash {
    use sha2::Digest;
    let result = sha2::Sha256::digest(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Last 20 bytes of the BLAKE3 hash.
fn address_from_hash(hash: &Hash) -> ClientAddress {
    let mut address = [0u8; CLIENT_ADDRESS_SIZE];
    address.copy_from_slice(&hash[32 - CLIENT_ADDRESS_SIZE..]);
    address
}

/// Client address of an Ed25519 signer.
pub fn client_address_from_public_key(public_key: &[u8]) -> ClientAddress {
    address_from_hash(&hash_blake3(public_key))
}

/// Address of a deployed contract, derived from its name.
pub fn contract_address(contract_name: &str) -> ClientAddress {
    address_from_hash(&hash_blake3(contract_name.as_bytes()))
}

/// Verify an Ed25519 signature.
///
/// Returns `true` if the signature is valid for the given message and
/// public key, `false` otherwise.
pub fn verify_ed25519(message: &[u8], signature: &[u8; 64], public_key: &[u8; 32]) -> bool {
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let sig = Signature::from_bytes(signature);
    verifying_key.verify(message, &sig).is_ok()
}

/// Like [`verify_ed25519`], for signatures carried as a byte vector.
/// A signature of the wrong length never verifies.
pub fn verify_ed25519_slice(message: &[u8], signature: &[u8], public_key: &[u8; 32]) -> bool {
    match <&[u8; 64]>::try_from(signature) {
        Ok(signature) => verify_ed25519(message, signature, public_key),
        Err(_) => false,
    }
}

/// Sign a message with an Ed25519 private key.
#[cfg(feature = "keygen")]
pub fn sign_ed25519(message: &[u8], secret_key: &ed25519_dalek::SigningKey) -> [u8; 64] {
    use ed25519_dalek::Signer;
    secret_key.sign(message).to_bytes()
}

/// Generate an Ed25519 keypair from OS randomness. Clients and tests only.
#[cfg(feature = "keygen")]
pub fn generate_keypair() -> (ed25519_dalek::VerifyingKey, ed25519_dalek::SigningKey) {
    use ed25519_dalek::SigningKey;
    let mut rng = rand::rngs::OsRng;
    let signing_key = SigningKey::generate(&mut rng);
    let verifying_key = signing_key.verifying_key();
    (verifying_key, signing_key)
}
