// src/models/segment.rs
//! Segment claim and the signed payload returned by `/sign`.

use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// The message signed for the portal: `Segment(uint256 segmentId, address subject)`.
///
/// Field order and types must match the struct hashed by the contract. Claims
/// are never persisted; each `/sign` call rebuilds one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentClaim {
    /// Strava segment identifier, widened to `uint256`
    pub segment_id: U256,
    /// Wallet that will receive the attestation
    pub subject: Address,
}

impl SegmentClaim {
    pub fn new(segment_id: impl Into<U256>, subject: Address) -> Self {
        Self {
            segment_id: segment_id.into(),
            subject,
        }
    }
}

/// Response body of `POST /sign`.
///
/// `signature` is the 65-byte `r ‖ s ‖ v` ECDSA signature, serialized as
/// `0x`-prefixed hex (132 characters).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignedSegment {
    pub segment_id: u64,
    /// Unix seconds of the effort's `start_date`
    pub completion_date: u64,
    pub signature: Bytes,
}

/// Request body of `POST /sign`.
///
/// Every field is optional at the wire level so that a missing field is
/// reported as a missing parameter instead of a deserialization failure.
#[derive(Serialize, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    pub access_token: Option<String>,
    /// Accepted as a JSON string or number; the digits-only check runs later.
    #[serde(default, deserialize_with = "string_or_number")]
    pub activity_id: Option<String>,
    pub segment_id: Option<u64>,
    pub subject: Option<String>,
    pub chain_id: Option<u64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(|value| match value {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    }))
}

impl fmt::Debug for SignRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignRequest")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("activity_id", &self.activity_id)
            .field("segment_id", &self.segment_id)
            .field("subject", &self.subject)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_segment_uses_camel_case_and_numeric_ids() {
        let signed = SignedSegment {
            segment_id: 456,
            completion_date: 1_704_067_200,
            signature: Bytes::from(vec![0x1b; 65]),
        };
        let json = serde_json::to_value(&signed).unwrap();
        assert_eq!(json["segmentId"], 456);
        assert_eq!(json["completionDate"], 1_704_067_200u64);
        assert_eq!(json["signature"].as_str().unwrap().len(), 132);
    }

    #[test]
    fn sign_request_debug_hides_the_access_token() {
        let request = SignRequest {
            access_token: Some("super-secret".into()),
            ..Default::default()
        };
        let printed = format!("{:?}", request);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("REDACTED"));
    }

    #[test]
    fn numeric_activity_id_is_read_as_its_digits() {
        let request: SignRequest =
            serde_json::from_str(r#"{"activityId": 123, "segmentId": 456}"#).unwrap();
        assert_eq!(request.activity_id.as_deref(), Some("123"));

        let request: SignRequest = serde_json::from_str(r#"{"activityId": -5}"#).unwrap();
        assert_eq!(request.activity_id.as_deref(), Some("-5"));

        let request: SignRequest = serde_json::from_str(r#"{"segmentId": 456}"#).unwrap();
        assert!(request.activity_id.is_none());

        assert!(serde_json::from_str::<SignRequest>(r#"{"activityId": [1]}"#).is_err());
    }
}
