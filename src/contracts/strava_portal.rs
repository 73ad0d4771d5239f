// src/contracts/strava_portal.rs
//! Portal state machine: fee gate, schema check and EIP-712 signature
//! verification in front of the attestation router.
//!
//! This is the reference model of the deployed `StravaPortal` contract. Every
//! entry point either applies all of its effects or none of them, matching a
//! reverted transaction.
//!
//! The signature is verified against this portal's own address and the chain
//! id of its deployment, never against values supplied by the caller, so a
//! signature minted for another chain or another portal cannot be redeemed
//! here. There is no replay protection: the same signature can be used again
//! on this portal.

use crate::blockchain::deployments::attestation_fee;
use crate::contracts::attestation_router::{AttestationRouter, RouterError};
use crate::models::attestation::{AttestationDataError, AttestationPayload, SegmentAttestationData};
use crate::models::segment::SegmentClaim;
use crate::utils::crypto::address_from_subject;
use crate::wallet::typed_data::{recover_segment_signer, SegmentDomain};
use ethers::types::{Address, Bytes, Signature, H256, U256};
use thiserror::Error;

/// secp256k1 order / 2; signatures with a larger `s` are malleable duplicates.
const HALF_CURVE_ORDER: U256 = U256([
    0xDFE9_2F46_681B_20A0,
    0x5D57_6E73_57A4_501D,
    0xFFFF_FFFF_FFFF_FFFF,
    0x7FFF_FFFF_FFFF_FFFF,
]);

/// Reverts of the portal. No variant leaves state modified.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("insufficient fee: required {required}, provided {provided}")]
    InsufficientFee { required: U256, provided: U256 },
    #[error("schema id does not match the portal schema")]
    SchemaMismatch,
    #[error("missing validation payload")]
    MissingValidationPayload,
    #[error("{0}")]
    MalformedAttestationData(#[from] AttestationDataError),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("caller is not the owner")]
    Unauthorized,
    #[error("router rejected attestation: {0}")]
    Router(#[from] RouterError),
    /// Collected fees would exceed `uint256`; Solidity 0.8 reverts on overflow.
    #[error("portal balance overflow")]
    BalanceOverflow,
}

/// `msg.sender` and `msg.value` of a call.
#[derive(Debug, Clone, Copy)]
pub struct CallContext {
    pub sender: Address,
    pub value: U256,
}

impl CallContext {
    pub fn new(sender: Address, value: impl Into<U256>) -> Self {
        Self {
            sender,
            value: value.into(),
        }
    }

    /// A call carrying no value.
    pub fn sender_only(sender: Address) -> Self {
        Self::new(sender, U256::zero())
    }
}

pub struct StravaPortal<R: AttestationRouter> {
    address: Address,
    chain_id: u64,
    owner: Address,
    fee: U256,
    signer_address: Address,
    schema_id: H256,
    balance: U256,
    router: R,
}

impl<R: AttestationRouter> StravaPortal<R> {
    /// Deploys a portal at `address` on `chain_id`, owned by `owner`, with the
    /// default 0.0001 ETH fee.
    pub fn deploy(
        address: Address,
        chain_id: u64,
        owner: Address,
        signer_address: Address,
        schema_id: H256,
        router: R,
    ) -> Self {
        Self {
            address,
            chain_id,
            owner,
            fee: attestation_fee(),
            signer_address,
            schema_id,
            balance: U256::zero(),
            router,
        }
    }

    /// Validates and forwards one attestation.
    ///
    /// # Reverts
    /// * `InsufficientFee` when `msg.value < fee`
    /// * `SchemaMismatch` when the payload targets another schema
    /// * `MalformedAttestationData` when the data is not `(uint256, uint64)`
    /// * `MissingValidationPayload` when no signature is supplied
    /// * `InvalidSignature` when the signature does not recover to `signerAddress`
    /// * `BalanceOverflow` when the collected fees would not fit in `uint256`
    /// * `Router` when the registry refuses the payload
    pub fn attest(
        &mut self,
        ctx: CallContext,
        payload: &AttestationPayload,
        validation_payloads: &[Bytes],
    ) -> Result<H256, PortalError> {
        if ctx.value < self.fee {
            return Err(PortalError::InsufficientFee {
                required: self.fee,
                provided: ctx.value,
            });
        }
        self.verify(payload, validation_payloads)?;
        let balance = self
            .balance
            .checked_add(ctx.value)
            .ok_or(PortalError::BalanceOverflow)?;

        let attestation_id = self.router.attest(payload, ctx.sender, self.address)?;
        self.balance = balance;
        Ok(attestation_id)
    }

    /// The payload checks of [`attest`](Self::attest), without the fee.
    pub fn verify(
        &self,
        payload: &AttestationPayload,
        validation_payloads: &[Bytes],
    ) -> Result<SegmentAttestationData, PortalError> {
        if payload.schema_id != self.schema_id {
            return Err(PortalError::SchemaMismatch);
        }

        let subject = address_from_subject(&payload.subject);
        let data = SegmentAttestationData::decode(&payload.attestation_data)?;
        let raw_signature = validation_payloads
            .first()
            .ok_or(PortalError::MissingValidationPayload)?;

        let claim = SegmentClaim::new(data.segment_id, subject);
        let recovered = recover_signer(&claim, &self.domain(), raw_signature)
            .ok_or(PortalError::InvalidSignature)?;
        if recovered != self.signer_address {
            return Err(PortalError::InvalidSignature);
        }
        Ok(data)
    }

    /// Domain this portal verifies under: its own address and chain.
    pub fn domain(&self) -> SegmentDomain {
        SegmentDomain::new(self.chain_id, self.address)
    }

    pub fn set_fee(&mut self, ctx: CallContext, fee: U256) -> Result<(), PortalError> {
        self.only_owner(ctx)?;
        self.fee = fee;
        Ok(())
    }

    pub fn set_signer_address(&mut self, ctx: CallContext, signer_address: Address) -> Result<(), PortalError> {
        self.only_owner(ctx)?;
        self.signer_address = signer_address;
        Ok(())
    }

    pub fn set_schema_id(&mut self, ctx: CallContext, schema_id: H256) -> Result<(), PortalError> {
        self.only_owner(ctx)?;
        self.schema_id = schema_id;
        Ok(())
    }

    /// Sends the whole balance to the owner and returns the amount sent.
    /// An empty balance is a successful zero transfer.
    pub fn withdraw(&mut self, ctx: CallContext) -> Result<U256, PortalError> {
        self.only_owner(ctx)?;
        Ok(std::mem::take(&mut self.balance))
    }

    fn only_owner(&self, ctx: CallContext) -> Result<(), PortalError> {
        if ctx.sender != self.owner {
            return Err(PortalError::Unauthorized);
        }
        Ok(())
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn fee(&self) -> U256 {
        self.fee
    }

    pub fn signer_address(&self) -> Address {
        self.signer_address
    }

    pub fn schema_id(&self) -> H256 {
        self.schema_id
    }

    pub fn balance(&self) -> U256 {
        self.balance
    }

    pub fn router(&self) -> &R {
        &self.router
    }
}

/// Recovers like OpenZeppelin's `ECDSA.tryRecover`: 65 bytes, `v` of 27 or 28,
/// low `s`. Anything else recovers to nothing.
fn recover_signer(claim: &SegmentClaim, domain: &SegmentDomain, raw: &Bytes) -> Option<Address> {
    let signature = Signature::try_from(raw.as_ref()).ok()?;
    if !(signature.v == 27 || signature.v == 28) || signature.s > HALF_CURVE_ORDER {
        return None;
    }
    recover_segment_signer(claim, domain, &signature).ok()
}
