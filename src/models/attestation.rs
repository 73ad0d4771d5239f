// src/models/attestation.rs
//! Attestation payload forwarded by the portal to the Verax router.
//!
//! The payload layout is fixed by Verax's `AttestationPayload` struct and the
//! data layout by the registered schema [`SCHEMA_STRING`].

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, H256, U256};
use thiserror::Error;

/// Schema registered in the attestation registry.
pub const SCHEMA_STRING: &str = "(uint256 segmentId, uint64 completionDate)";

/// `(bytes32 schemaId, uint64 expirationDate, bytes subject, bytes attestationData)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationPayload {
    pub schema_id: H256,
    /// `0` means the attestation never expires
    pub expiration_date: u64,
    /// Raw 20 address bytes of the attested wallet
    pub subject: Bytes,
    /// ABI encoding of [`SegmentAttestationData`]
    pub attestation_data: Bytes,
}

impl AttestationPayload {
    /// Builds a non-expiring payload for `subject` under `schema_id`.
    pub fn for_segment(schema_id: H256, subject: Address, data: &SegmentAttestationData) -> Self {
        Self {
            schema_id,
            expiration_date: 0,
            subject: Bytes::from(subject.as_bytes().to_vec()),
            attestation_data: data.encode(),
        }
    }

    /// ABI tuple token, as passed to the portal's `attest`.
    pub fn to_token(&self) -> Token {
        Token::Tuple(vec![
            Token::FixedBytes(self.schema_id.as_bytes().to_vec()),
            Token::Uint(U256::from(self.expiration_date)),
            Token::Bytes(self.subject.to_vec()),
            Token::Bytes(self.attestation_data.to_vec()),
        ])
    }
}

#[derive(Debug, Error)]
pub enum AttestationDataError {
    #[error("malformed attestation data: {0}")]
    Abi(#[from] abi::Error),
    #[error("completion date does not fit in uint64")]
    CompletionDateOverflow,
    #[error("unexpected token layout in attestation data")]
    UnexpectedLayout,
}

/// Decoded `(uint256 segmentId, uint64 completionDate)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentAttestationData {
    pub segment_id: U256,
    pub completion_date: u64,
}

impl SegmentAttestationData {
    pub fn new(segment_id: impl Into<U256>, completion_date: u64) -> Self {
        Self {
            segment_id: segment_id.into(),
            completion_date,
        }
    }

    pub fn encode(&self) -> Bytes {
        abi::encode(&[
            Token::Uint(self.segment_id),
            Token::Uint(U256::from(self.completion_date)),
        ])
        .into()
    }

    /// Decodes the schema layout, rejecting values a `uint64` cannot hold the
    /// same way `abi.decode` would revert on them.
    pub fn decode(data: &[u8]) -> Result<Self, AttestationDataError> {
        let tokens = abi::decode(&[ParamType::Uint(256), ParamType::Uint(64)], data)?;
        match tokens.as_slice() {
            [Token::Uint(segment_id), Token::Uint(completion_date)] => {
                if *completion_date > U256::from(u64::MAX) {
                    return Err(AttestationDataError::CompletionDateOverflow);
                }
                Ok(Self {
                    segment_id: *segment_id,
                    completion_date: completion_date.as_u64(),
                })
            }
            _ => Err(AttestationDataError::UnexpectedLayout),
        }
    }
}
