// src/blockchain/deployments.rs
//! Closed table of the networks the portal is deployed on.
//!
//! Chain ids outside this table are rejected everywhere: the backend never
//! signs for, and the client never submits to, an unrecognized chain.

use ethers::types::{Address, H160, H256, U256};
use std::fmt;

/// Sepolia portal `0xc04228f66b1aa75a2a8f6887730f55b54281e9d9`.
pub const PORTAL_ADDRESS_SEPOLIA: Address = H160([
    0xc0, 0x42, 0x28, 0xf6, 0x6b, 0x1a, 0xa7, 0x5a, 0x2a, 0x8f, 0x68, 0x87, 0x73, 0x0f, 0x55, 0xb5,
    0x42, 0x81, 0xe9, 0xd9,
]);

/// Mainnet portal `0xe1301b12c2dbe0be67187432fb2519801439f552`.
pub const PORTAL_ADDRESS_MAINNET: Address = H160([
    0xe1, 0x30, 0x1b, 0x12, 0xc2, 0xdb, 0xe0, 0xbe, 0x67, 0x18, 0x74, 0x32, 0xfb, 0x25, 0x19, 0x80,
    0x14, 0x39, 0xf5, 0x52,
]);

/// Registry id of the `(uint256 segmentId, uint64 completionDate)` schema.
pub const SCHEMA_ID: H256 = H256([
    0xc1, 0x70, 0x83, 0x60, 0xb3, 0xdf, 0x59, 0xe9, 0x1d, 0xfd, 0x33, 0xf9, 0x01, 0xc6, 0x59, 0xc0,
    0x35, 0x04, 0x61, 0xe6, 0xa3, 0x03, 0x92, 0xd1, 0xe3, 0x21, 0x8d, 0x48, 0x47, 0xe6, 0xb2, 0x0d,
]);

/// 0.0001 ETH in wei.
pub const ATTESTATION_FEE_WEI: u64 = 100_000_000_000_000;

pub fn attestation_fee() -> U256 {
    U256::from(ATTESTATION_FEE_WEI)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedChain {
    LineaMainnet,
    LineaSepolia,
}

impl SupportedChain {
    pub const ALL: [SupportedChain; 2] = [SupportedChain::LineaMainnet, SupportedChain::LineaSepolia];

    /// Returns `None` for any chain id outside the table.
    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|chain| chain.chain_id() == chain_id)
    }

    pub fn chain_id(self) -> u64 {
        match self {
            SupportedChain::LineaMainnet => 59144,
            SupportedChain::LineaSepolia => 59141,
        }
    }

    /// Portal the signatures for this chain are bound to.
    pub fn portal_address(self) -> Address {
        match self {
            SupportedChain::LineaMainnet => PORTAL_ADDRESS_MAINNET,
            SupportedChain::LineaSepolia => PORTAL_ADDRESS_SEPOLIA,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SupportedChain::LineaMainnet => "Linea Mainnet",
            SupportedChain::LineaSepolia => "Linea Sepolia",
        }
    }

    pub fn explorer_url(self) -> &'static str {
        match self {
            SupportedChain::LineaMainnet => "https://lineascan.build",
            SupportedChain::LineaSepolia => "https://sepolia.lineascan.build",
        }
    }

    /// Block explorer link for a submitted transaction.
    pub fn transaction_url(self, tx_hash: H256) -> String {
        format!("{}/tx/{:?}", self.explorer_url(), tx_hash)
    }
}

impl fmt::Display for SupportedChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.chain_id())
    }
}
