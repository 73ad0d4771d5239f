// src/lib.rs

//! # Strava Segment Attestations
//!
//! Turns a Strava segment effort into an onchain attestation on Linea.
//!
//! ## Architecture Overview
//! 1. **Services Layer**: `/sign` and `/auth` endpoints, Strava API client, client orchestrator
//! 2. **Wallet Layer**: EIP-712 typed data and the backend segment signer
//! 3. **Contracts Layer**: the portal's verification and fee logic
//! 4. **Blockchain Layer**: deployments table, ethers portal client, transaction tracking

pub mod blockchain; // Linea deployments and ethers clients
pub mod config; // Environment settings
pub mod contracts; // Portal state machine
pub mod error; // HTTP error taxonomy
pub mod models; // Data structures
pub mod services; // HTTP API and Strava integration
pub mod utils; // Hashing helpers
pub mod wallet; // Typed-data signing
