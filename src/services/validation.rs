// src/services/validation.rs
//! Fail-fast validation of `/sign` requests.
//!
//! Checks run in a fixed order and the first failure wins. All of them happen
//! before any network call; in particular the activity id is restricted to
//! digits because it is interpolated into the upstream URL path.

use crate::blockchain::deployments::SupportedChain;
use crate::models::segment::SignRequest;
use ethers::types::Address;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required parameters")]
    MissingParameter,
    #[error("Invalid activityId format")]
    InvalidFormat,
    #[error("Invalid subject address")]
    InvalidAddress,
    #[error("Invalid chainId")]
    InvalidChain,
    #[error("Invalid request body")]
    MalformedBody,
}

/// A request that passed every check.
pub struct ValidatedSignRequest {
    pub access_token: String,
    pub activity_id: String,
    pub segment_id: u64,
    pub subject: Address,
    pub chain: SupportedChain,
}

pub fn validate_sign_request(request: SignRequest) -> Result<ValidatedSignRequest, ValidationError> {
    let SignRequest {
        access_token,
        activity_id,
        segment_id,
        subject,
        chain_id,
    } = request;

    let (Some(access_token), Some(activity_id), Some(segment_id), Some(subject), Some(chain_id)) = (
        non_empty(access_token),
        non_empty(activity_id),
        segment_id,
        non_empty(subject),
        chain_id,
    ) else {
        return Err(ValidationError::MissingParameter);
    };

    if !is_numeric_id(&activity_id) {
        return Err(ValidationError::InvalidFormat);
    }
    let subject = parse_subject(&subject)?;
    let chain = SupportedChain::from_chain_id(chain_id).ok_or(ValidationError::InvalidChain)?;

    Ok(ValidatedSignRequest {
        access_token,
        activity_id,
        segment_id,
        subject,
        chain,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// `^\d+$`
pub fn is_numeric_id(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// `^0x[0-9a-fA-F]{40}$`, checksum not enforced.
pub fn parse_subject(value: &str) -> Result<Address, ValidationError> {
    let well_formed = value
        .strip_prefix("0x")
        .is_some_and(|rest| rest.len() == 40 && rest.bytes().all(|b| b.is_ascii_hexdigit()));
    if !well_formed {
        return Err(ValidationError::InvalidAddress);
    }
    value.parse().map_err(|_| ValidationError::InvalidAddress)
}
