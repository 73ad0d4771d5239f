// src/contracts/attestation_router.rs
//! The registry side of the portal: where accepted attestations go.
//!
//! Verax itself is out of scope; the portal only needs somewhere to forward a
//! validated payload and get an attestation id back.

use crate::models::attestation::AttestationPayload;
use ethers::types::{Address, H256};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    #[error("portal is not registered with the router")]
    PortalNotRegistered,
}

pub trait AttestationRouter {
    /// Registers `payload`, attested by `attester` through `portal`.
    fn attest(
        &mut self,
        payload: &AttestationPayload,
        attester: Address,
        portal: Address,
    ) -> Result<H256, RouterError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAttestation {
    pub id: H256,
    pub payload: AttestationPayload,
    pub attester: Address,
    pub portal: Address,
}

/// Keeps forwarded attestations in memory with sequential ids.
#[derive(Debug, Default)]
pub struct InMemoryRouter {
    registered_portals: Option<Vec<Address>>,
    attestations: Vec<RecordedAttestation>,
}

impl InMemoryRouter {
    /// Router that accepts any portal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Router that only accepts the listed portals.
    pub fn with_registered_portals(portals: Vec<Address>) -> Self {
        Self {
            registered_portals: Some(portals),
            attestations: Vec::new(),
        }
    }

    pub fn attestations(&self) -> &[RecordedAttestation] {
        &self.attestations
    }
}

impl AttestationRouter for InMemoryRouter {
    fn attest(
        &mut self,
        payload: &AttestationPayload,
        attester: Address,
        portal: Address,
    ) -> Result<H256, RouterError> {
        if let Some(registered) = &self.registered_portals {
            if !registered.contains(&portal) {
                return Err(RouterError::PortalNotRegistered);
            }
        }
        let id = H256::from_low_u64_be(self.attestations.len() as u64 + 1);
        self.attestations.push(RecordedAttestation {
            id,
            payload: payload.clone(),
            attester,
            portal,
        });
        Ok(id)
    }
}
