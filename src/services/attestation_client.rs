// src/services/attestation_client.rs
//! Client side of an attestation: fetch the backend signature, build the
//! Verax payload, submit it to the portal and follow the transaction.

use crate::blockchain::deployments::{attestation_fee, SupportedChain, SCHEMA_ID};
use crate::blockchain::portal_client::{PortalClient, PortalClientError};
use crate::blockchain::transaction_tracker::{
    track_transaction, AttestationStatus, SubmittedTransaction, TrackingError,
};
use crate::models::attestation::{AttestationPayload, SegmentAttestationData};
use crate::models::segment::{SignRequest, SignedSegment};
use ethers::providers::Middleware;
use ethers::types::Address;
use log::{info, warn};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum ClientError {
    /// The Strava session is over; the user has to reconnect.
    #[error("Your Strava session has expired. Please reconnect.")]
    TokenExpired,
    /// The backend refused to sign; `message` is its `error` field.
    #[error("{message}")]
    SignRejected { status: u16, message: String },
    #[error("request to signing backend failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Portal(#[from] PortalClientError),
    #[error(transparent)]
    Tracking(#[from] TrackingError),
}

impl ClientError {
    /// Cancelled in the wallet; callers should not report it.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, ClientError::Portal(portal) if portal.is_user_rejection())
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: Option<String>,
    #[serde(default)]
    token_expired: bool,
}

/// Non-expiring payload for `subject` carrying the signed completion.
pub fn build_attestation_payload(subject: Address, signed: &SignedSegment) -> AttestationPayload {
    let data = SegmentAttestationData::new(signed.segment_id, signed.completion_date);
    AttestationPayload::for_segment(SCHEMA_ID, subject, &data)
}

pub struct AttestationClient<M> {
    http: reqwest::Client,
    api_url: String,
    portal: PortalClient<M>,
    poll_interval: Duration,
}

impl<M: Middleware + 'static> AttestationClient<M> {
    pub fn new(api_url: impl Into<String>, portal: PortalClient<M>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            portal,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn chain(&self) -> SupportedChain {
        self.portal.chain()
    }

    /// `POST {api_url}/sign`.
    pub async fn request_signature(&self, request: &SignRequest) -> Result<SignedSegment, ClientError> {
        let response = self
            .http
            .post(format!("{}/sign", self.api_url))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body: ErrorBody = response.json().await.unwrap_or_default();
        if body.token_expired {
            return Err(ClientError::TokenExpired);
        }
        Err(ClientError::SignRejected {
            status: status.as_u16(),
            message: body.error.unwrap_or_else(|| "Failed to sign segment".to_string()),
        })
    }

    /// Submits the attestation paying the standard fee.
    ///
    /// The attestation exists only once [`track`](Self::track) reports it
    /// confirmed.
    pub async fn submit(
        &self,
        subject: Address,
        signed: &SignedSegment,
    ) -> Result<SubmittedTransaction, ClientError> {
        let payload = build_attestation_payload(subject, signed);
        let submitted = self
            .portal
            .attest(&payload, &signed.signature, attestation_fee())
            .await
            .map_err(|err| {
                if err.is_user_rejection() {
                    info!("Attestation cancelled in wallet");
                } else {
                    warn!("Attestation submission failed: {}", err);
                }
                err
            })?;
        info!(
            "Attestation submitted: {}",
            self.portal.chain().transaction_url(submitted.hash)
        );
        Ok(submitted)
    }

    pub async fn track(
        &self,
        submitted: &SubmittedTransaction,
        confirmations: usize,
    ) -> Result<AttestationStatus, ClientError> {
        let client = self.portal.client();
        Ok(track_transaction(client.as_ref(), submitted, confirmations, self.poll_interval).await?)
    }

    /// Sign, submit and wait for one confirmation.
    pub async fn attest_segment(&self, request: &SignRequest) -> Result<AttestationStatus, ClientError> {
        let subject = request
            .subject
            .as_deref()
            .and_then(|s| s.parse::<Address>().ok())
            .ok_or_else(|| ClientError::SignRejected {
                status: 400,
                message: "Invalid wallet address".to_string(),
            })?;
        let signed = self.request_signature(request).await?;
        let submitted = self.submit(subject, &signed).await?;
        self.track(&submitted, 1).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::{JsonRpcError, MockProvider, MockResponse, Provider};
    use ethers::types::Bytes;
    use mockito::{mock, server_url, Matcher};
    use serde_json::json;
    use std::sync::Arc;

    fn client() -> AttestationClient<Provider<MockProvider>> {
        let (provider, _mock) = Provider::mocked();
        let portal = PortalClient::new(Arc::new(provider), SupportedChain::LineaSepolia).unwrap();
        AttestationClient::new(server_url(), portal)
    }

    fn request(activity_id: &str) -> SignRequest {
        SignRequest {
            access_token: Some("token".into()),
            activity_id: Some(activity_id.into()),
            segment_id: Some(456),
            subject: Some("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf".into()),
            chain_id: Some(59141),
        }
    }

    #[test]
    fn payload_never_expires_and_carries_raw_subject_bytes() {
        let subject: Address = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf".parse().unwrap();
        let signed = SignedSegment {
            segment_id: 456,
            completion_date: 1_704_067_200,
            signature: Bytes::from(vec![0u8; 65]),
        };
        let payload = build_attestation_payload(subject, &signed);

        assert_eq!(payload.schema_id, SCHEMA_ID);
        assert_eq!(payload.expiration_date, 0);
        assert_eq!(payload.subject.as_ref(), subject.as_bytes());
        assert_eq!(
            SegmentAttestationData::decode(&payload.attestation_data).unwrap(),
            SegmentAttestationData::new(456u64, 1_704_067_200)
        );
    }

    #[tokio::test]
    async fn signature_is_returned_on_success() {
        let _m = mock("POST", "/sign")
            .match_body(Matcher::PartialJson(json!({ "activityId": "1" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"segmentId": 456, "completionDate": 1704067200, "signature": "0x{}"}}"#,
                "ab".repeat(65)
            ))
            .create();

        let signed = client().request_signature(&request("1")).await.unwrap();
        assert_eq!(signed.segment_id, 456);
        assert_eq!(signed.signature.len(), 65);
    }

    #[tokio::test]
    async fn expired_token_is_its_own_error() {
        let _m = mock("POST", "/sign")
            .match_body(Matcher::PartialJson(json!({ "activityId": "2" })))
            .with_status(401)
            .with_body(r#"{"error": "Invalid Strava token", "tokenExpired": true}"#)
            .create();

        let result = client().request_signature(&request("2")).await;
        assert!(matches!(result, Err(ClientError::TokenExpired)));
    }

    #[tokio::test]
    async fn other_rejections_keep_the_server_message() {
        let _m = mock("POST", "/sign")
            .match_body(Matcher::PartialJson(json!({ "activityId": "3" })))
            .with_status(404)
            .with_body(r#"{"error": "Segment not found in this activity"}"#)
            .create();

        match client().request_signature(&request("3")).await {
            Err(ClientError::SignRejected { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "Segment not found in this activity");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn wallet_cancellation_is_reported_as_user_rejection() {
        let (provider, mock) = Provider::mocked();
        let provider = provider.with_sender(Address::repeat_byte(0x44));
        let portal = PortalClient::new(Arc::new(provider), SupportedChain::LineaSepolia).unwrap();
        let client = AttestationClient::new(server_url(), portal);
        mock.push_response(MockResponse::Error(JsonRpcError {
            code: 4001,
            message: "User rejected the request.".into(),
            data: None,
        }));
        let signed = SignedSegment {
            segment_id: 456,
            completion_date: 1_704_067_200,
            signature: Bytes::from(vec![0x1b; 65]),
        };

        let err = tokio_test::block_on(client.submit(Address::repeat_byte(0x44), &signed)).unwrap_err();
        assert!(err.is_user_rejection(), "{err:?}");
        assert!(matches!(err, ClientError::Portal(_)));
    }
}
