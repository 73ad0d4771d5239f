// src/wallet/segment_signer.rs
//! Server-held signing key for segment claims.
//!
//! The key is parsed once at process start and shared read-only. It never
//! leaves this module: there is no accessor for it and `Debug` only shows the
//! derived address.

use crate::models::segment::SegmentClaim;
use crate::wallet::typed_data::{segment_digest, SegmentDomain};
use ethers::signers::{LocalWallet, Signer, WalletError};
use ethers::types::{Address, Signature};
use ethers::utils::hex;
use k256::ecdsa::SigningKey;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignerError {
    /// No signing account configured for this process.
    #[error("signer account not configured")]
    NotConfigured,
    #[error("invalid signer private key")]
    InvalidKey,
    #[error("signing failed: {0}")]
    Wallet(#[from] WalletError),
}

/// Secp256k1 signer producing EIP-712 segment signatures.
///
/// Signatures are deterministic (RFC 6979 nonces): the same claim, domain and
/// key always produce the same 65 bytes.
#[derive(Clone)]
pub struct SegmentSigner {
    wallet: Option<LocalWallet>,
}

impl SegmentSigner {
    /// Loads the key from a `0x`-prefixed (or bare) 32-byte hex string.
    ///
    /// # Errors
    /// `SignerError::InvalidKey` if the string is not hex or not a valid
    /// secp256k1 scalar. The offending value is never echoed back.
    pub fn from_private_key(private_key: &str) -> Result<Self, SignerError> {
        let stripped = private_key.strip_prefix("0x").unwrap_or(private_key);
        let key_bytes = hex::decode(stripped).map_err(|_| SignerError::InvalidKey)?;
        let signing_key = SigningKey::from_slice(&key_bytes).map_err(|_| SignerError::InvalidKey)?;
        Ok(Self {
            wallet: Some(LocalWallet::from(signing_key)),
        })
    }

    /// A signer with no account; every signing attempt fails with
    /// `SignerError::NotConfigured`.
    pub fn unconfigured() -> Self {
        Self { wallet: None }
    }

    pub fn is_configured(&self) -> bool {
        self.wallet.is_some()
    }

    /// Address the portal must be configured with as `signerAddress`.
    pub fn address(&self) -> Result<Address, SignerError> {
        self.wallet
            .as_ref()
            .map(|wallet| wallet.address())
            .ok_or(SignerError::NotConfigured)
    }

    /// Signs `Segment(segmentId, subject)` under `domain`.
    ///
    /// # Returns
    /// 65-byte signature with `v` in `{27, 28}`, the layout OpenZeppelin's
    /// `ECDSA.recover` accepts.
    pub fn sign_segment(
        &self,
        claim: &SegmentClaim,
        domain: &SegmentDomain,
    ) -> Result<Signature, SignerError> {
        let wallet = self.wallet.as_ref().ok_or(SignerError::NotConfigured)?;
        Ok(wallet.sign_hash(segment_digest(claim, domain))?)
    }
}

impl fmt::Debug for SegmentSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentSigner")
            .field("address", &self.wallet.as_ref().map(|wallet| wallet.address()))
            .finish_non_exhaustive()
    }
}
