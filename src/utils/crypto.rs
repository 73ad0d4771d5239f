// src/utils/crypto.rs
//! Hashing and hex helpers shared by the signer, the portal model and the
//! HTTP layer.
//!
//! Everything hashes with Keccak-256 so that digests line up with what the
//! portal contract computes with Solidity's `keccak256()`.

use ethers::types::{Address, Bytes};
use ethers::utils::{hex, keccak256};

/// Computes a Keccak-256 hash of the input data (Ethereum-compatible).
///
/// # Arguments
/// * `data` - Binary data to hash (as bytes slice)
///
/// # Returns
/// Fixed-size 32-byte array (`[u8; 32]`) containing the hash.
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    keccak256(data)
}

/// Builds the final EIP-712 digest: `keccak256(0x19 0x01 ‖ domainSeparator ‖ structHash)`.
pub fn typed_data_digest(domain_separator: &[u8; 32], struct_hash: &[u8; 32]) -> [u8; 32] {
    let mut message = Vec::with_capacity(66);
    message.extend_from_slice(&[0x19, 0x01]);
    message.extend_from_slice(domain_separator);
    message.extend_from_slice(struct_hash);
    hash_data(&message)
}

/// Lowercase `0x`-prefixed hex, the format wallets and the frontend expect.
pub fn to_prefixed_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

/// Reads a 20-byte address out of an attestation `subject` field.
///
/// Mirrors Solidity's `bytes20(bytes)` conversion: longer inputs are truncated,
/// shorter ones are right-padded with zeros.
pub fn address_from_subject(subject: &Bytes) -> Address {
    let mut raw = [0u8; 20];
    let len = subject.len().min(20);
    raw[..len].copy_from_slice(&subject[..len]);
    Address::from(raw)
}
