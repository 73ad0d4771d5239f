// src/wallet/typed_data.rs
//! EIP-712 typed data for segment claims.
//!
//! Domain `{name: "VerifyStrava", version: "1", chainId, verifyingContract}` and
//! struct `Segment(uint256 segmentId,address subject)`. The domain binds a
//! signature to one portal on one chain; the same claim signed for another
//! chain or another portal address yields a different digest.

use crate::blockchain::deployments::SupportedChain;
use crate::models::segment::SegmentClaim;
use crate::utils::crypto::hash_data;
use ethers::abi::{self, Token};
use ethers::types::transaction::eip712::{EIP712Domain, Eip712};
use ethers::types::{Address, Signature, SignatureError, H256, U256};
use once_cell::sync::Lazy;
use std::convert::Infallible;

pub const DOMAIN_NAME: &str = "VerifyStrava";
pub const DOMAIN_VERSION: &str = "1";
pub const SEGMENT_TYPE: &str = "Segment(uint256 segmentId,address subject)";

static SEGMENT_TYPE_HASH: Lazy<[u8; 32]> = Lazy::new(|| hash_data(SEGMENT_TYPE.as_bytes()));

/// The variable half of the domain. Name and version are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentDomain {
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl SegmentDomain {
    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            chain_id,
            verifying_contract,
        }
    }

    /// Domain of the compiled-in portal deployment for `chain`.
    pub fn for_chain(chain: SupportedChain) -> Self {
        Self::new(chain.chain_id(), chain.portal_address())
    }

    pub fn to_eip712(&self) -> EIP712Domain {
        EIP712Domain {
            name: Some(DOMAIN_NAME.to_string()),
            version: Some(DOMAIN_VERSION.to_string()),
            chain_id: Some(U256::from(self.chain_id)),
            verifying_contract: Some(self.verifying_contract),
            salt: None,
        }
    }
}

/// A claim together with the domain it is signed under.
#[derive(Debug, Clone, Copy)]
pub struct SegmentTypedData {
    pub claim: SegmentClaim,
    pub domain: SegmentDomain,
}

impl Eip712 for SegmentTypedData {
    type Error = Infallible;

    fn domain(&self) -> Result<EIP712Domain, Self::Error> {
        Ok(self.domain.to_eip712())
    }

    fn type_hash() -> Result<[u8; 32], Self::Error> {
        Ok(*SEGMENT_TYPE_HASH)
    }

    fn struct_hash(&self) -> Result<[u8; 32], Self::Error> {
        let encoded = abi::encode(&[
            Token::FixedBytes(SEGMENT_TYPE_HASH.to_vec()),
            Token::Uint(self.claim.segment_id),
            Token::Address(self.claim.subject),
        ]);
        Ok(hash_data(&encoded))
    }
}

/// The 32-byte digest that gets signed and later recovered on-chain.
pub fn segment_digest(claim: &SegmentClaim, domain: &SegmentDomain) -> H256 {
    let typed = SegmentTypedData {
        claim: *claim,
        domain: *domain,
    };
    let digest = typed.encode_eip712().unwrap_or_else(|never| match never {});
    H256::from(digest)
}

/// Recovers the address that signed `claim` under `domain`.
pub fn recover_segment_signer(
    claim: &SegmentClaim,
    domain: &SegmentDomain,
    signature: &Signature,
) -> Result<Address, SignatureError> {
    signature.recover(segment_digest(claim, domain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::crypto::typed_data_digest;

    fn subject() -> Address {
        "0x1234567890123456789012345678901234567890".parse().unwrap()
    }

    #[test]
    fn type_hash_covers_field_order_and_types() {
        assert_eq!(
            SegmentTypedData::type_hash().unwrap(),
            hash_data(b"Segment(uint256 segmentId,address subject)")
        );
    }

    #[test]
    fn domain_separator_matches_manual_encoding() {
        let domain = SegmentDomain::for_chain(SupportedChain::LineaSepolia);
        let manual = hash_data(&abi::encode(&[
            Token::FixedBytes(
                hash_data(b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)")
                    .to_vec(),
            ),
            Token::FixedBytes(hash_data(b"VerifyStrava").to_vec()),
            Token::FixedBytes(hash_data(b"1").to_vec()),
            Token::Uint(U256::from(59141u64)),
            Token::Address(SupportedChain::LineaSepolia.portal_address()),
        ]));
        assert_eq!(domain.to_eip712().separator(), manual);
    }

    #[test]
    fn digest_is_prefixed_keccak_of_separator_and_struct_hash() {
        let claim = SegmentClaim::new(456u64, subject());
        let domain = SegmentDomain::for_chain(SupportedChain::LineaSepolia);
        let typed = SegmentTypedData { claim, domain };
        let expected = typed_data_digest(
            &typed.domain_separator().unwrap(),
            &typed.struct_hash().unwrap(),
        );
        assert_eq!(segment_digest(&claim, &domain), H256::from(expected));
    }

    #[test]
    fn every_domain_field_changes_the_digest() {
        let claim = SegmentClaim::new(456u64, subject());
        let base = SegmentDomain::for_chain(SupportedChain::LineaSepolia);
        let other_chain = SegmentDomain::new(59144, base.verifying_contract);
        let other_portal = SegmentDomain::new(base.chain_id, SupportedChain::LineaMainnet.portal_address());

        let digest = segment_digest(&claim, &base);
        assert_ne!(digest, segment_digest(&claim, &other_chain));
        assert_ne!(digest, segment_digest(&claim, &other_portal));
    }

    #[test]
    fn every_claim_field_changes_the_digest() {
        let domain = SegmentDomain::for_chain(SupportedChain::LineaMainnet);
        let digest = segment_digest(&SegmentClaim::new(111u64, subject()), &domain);
        assert_ne!(digest, segment_digest(&SegmentClaim::new(222u64, subject()), &domain));
        assert_ne!(
            digest,
            segment_digest(&SegmentClaim::new(111u64, Address::repeat_byte(0x09)), &domain)
        );
    }
}
