// src/blockchain/transaction_tracker.rs
//! Follows a submitted attestation transaction to its outcome.
//!
//! A transaction hash only means the wallet accepted the transaction. It can
//! still be replaced (sped up or cancelled with the same nonce), dropped from
//! the mempool, or mined and reverted.

use ethers::providers::{Middleware, PendingTransaction};
use ethers::types::{Address, TransactionReceipt, H256, U256, U64};
use log::{info, warn};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum AttestationStatus {
    /// Accepted by the wallet, not yet mined.
    Submitted(H256),
    /// Another transaction with the same nonce was mined instead.
    Replaced(H256),
    /// Left the mempool without being mined.
    Dropped(H256),
    Confirmed(TransactionReceipt),
    Reverted(TransactionReceipt),
}

impl AttestationStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, AttestationStatus::Submitted(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AttestationStatus::Confirmed(_))
    }

    pub fn tx_hash(&self) -> H256 {
        match self {
            AttestationStatus::Submitted(hash)
            | AttestationStatus::Replaced(hash)
            | AttestationStatus::Dropped(hash) => *hash,
            AttestationStatus::Confirmed(receipt) | AttestationStatus::Reverted(receipt) => {
                receipt.transaction_hash
            }
        }
    }
}

#[derive(Debug, Error)]
#[error("failed to track transaction: {0}")]
pub struct TrackingError(String);

/// Decides the final status from what the chain reports.
///
/// `nonce_consumed` tells whether the sender's nonce moved past the tracked
/// transaction's nonce, which is how a replacement shows up once the original
/// hash has vanished.
pub fn resolve_status(
    tx_hash: H256,
    receipt: Option<TransactionReceipt>,
    nonce_consumed: bool,
) -> AttestationStatus {
    match receipt {
        Some(receipt) if receipt.status == Some(U64::from(1)) => AttestationStatus::Confirmed(receipt),
        Some(receipt) => AttestationStatus::Reverted(receipt),
        None if nonce_consumed => AttestationStatus::Replaced(tx_hash),
        None => AttestationStatus::Dropped(tx_hash),
    }
}

/// A transaction as it left the client: hash, sender and the nonce it used.
///
/// The nonce is fixed at submission so a replacement can be told apart from a
/// drop even if the node never indexed the original transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmittedTransaction {
    pub hash: H256,
    pub sender: Address,
    pub nonce: U256,
}

/// Waits for `submitted` with `confirmations` blocks and classifies the outcome.
pub async fn track_transaction<M: Middleware>(
    client: &M,
    submitted: &SubmittedTransaction,
    confirmations: usize,
    poll_interval: Duration,
) -> Result<AttestationStatus, TrackingError> {
    let receipt = PendingTransaction::new(submitted.hash, client.provider())
        .interval(poll_interval)
        .confirmations(confirmations)
        .await
        .map_err(|e| TrackingError(e.to_string()))?;

    let nonce_consumed = match &receipt {
        Some(_) => false,
        None => {
            let mined = client
                .get_transaction_count(submitted.sender, None)
                .await
                .map_err(|e| TrackingError(e.to_string()))?;
            mined > submitted.nonce
        }
    };

    let status = resolve_status(submitted.hash, receipt, nonce_consumed);
    match &status {
        AttestationStatus::Confirmed(_) => info!("Attestation transaction {:?} confirmed", submitted.hash),
        other => warn!(
            "Attestation transaction {:?} ended as {}",
            submitted.hash,
            status_label(other)
        ),
    }
    Ok(status)
}

fn status_label(status: &AttestationStatus) -> &'static str {
    match status {
        AttestationStatus::Submitted(_) => "submitted",
        AttestationStatus::Replaced(_) => "replaced",
        AttestationStatus::Dropped(_) => "dropped",
        AttestationStatus::Confirmed(_) => "confirmed",
        AttestationStatus::Reverted(_) => "reverted",
    }
}
