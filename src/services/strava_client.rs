// src/services/strava_client.rs
//! Strava API client: the segment ownership oracle and the OAuth token calls.
//!
//! Each call is one HTTP round trip with no retry. An upstream 401 is kept
//! apart from other failures because the frontend reconnects on it.

use crate::config::{Secret, Settings};
use crate::models::strava::{ActivityDetails, SegmentCompletion, SegmentEffort, TokenResponse};
use chrono::DateTime;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum StravaError {
    /// Upstream answered 401: the access (or refresh) token is no longer valid.
    #[error("Strava token expired or invalid")]
    TokenExpired,
    #[error("Segment not found in this activity")]
    SegmentNotFound,
    #[error("Strava API error: {0}")]
    Upstream(u16),
    #[error("Strava request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unparseable segment effort start date")]
    InvalidStartDate,
}

#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    api_base: String,
    token_url: String,
    client_id: String,
    client_secret: Secret,
}

impl StravaClient {
    pub fn new(
        api_base: impl Into<String>,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: Secret,
    ) -> Result<Self, StravaError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, StravaError> {
        Self::new(
            settings.strava_api_base.clone(),
            settings.strava_token_url.clone(),
            settings.strava_client_id.clone(),
            settings.strava_client_secret.clone(),
        )
    }

    /// Segment efforts of one activity, as seen by the token's athlete.
    ///
    /// `activity_id` must already be validated as digits only.
    pub async fn activity_segment_efforts(
        &self,
        access_token: &str,
        activity_id: &str,
    ) -> Result<Vec<SegmentEffort>, StravaError> {
        let url = format!("{}/activities/{}", self.api_base, activity_id);
        let response = self.http.get(url).bearer_auth(access_token).send().await?;
        let response = check_status(response)?;
        let details: ActivityDetails = response.json().await?;
        Ok(details.segment_efforts.unwrap_or_default())
    }

    /// Confirms that `segment_id` was completed in `activity_id` and returns
    /// the effort's start time as the completion date.
    pub async fn segment_completion(
        &self,
        access_token: &str,
        activity_id: &str,
        segment_id: u64,
    ) -> Result<SegmentCompletion, StravaError> {
        let efforts = self.activity_segment_efforts(access_token, activity_id).await?;
        let effort = find_effort(&efforts, segment_id).ok_or(StravaError::SegmentNotFound)?;
        Ok(SegmentCompletion {
            segment_id: effort.segment.id,
            completion_date: completion_date(&effort.start_date)?,
        })
    }

    /// Exchanges an OAuth authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, StravaError> {
        self.post_token(&[("code", code), ("grant_type", "authorization_code")])
            .await
    }

    /// Trades a refresh token for a fresh access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, StravaError> {
        self.post_token(&[("refresh_token", refresh_token), ("grant_type", "refresh_token")])
            .await
    }

    async fn post_token(&self, grant: &[(&str, &str)]) -> Result<TokenResponse, StravaError> {
        let mut form: Vec<(&str, &str)> = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose()),
        ];
        form.extend_from_slice(grant);

        let response = self.http.post(&self.token_url).form(&form).send().await?;
        let response = check_status(response)?;
        Ok(response.json().await?)
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StravaError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED => Err(StravaError::TokenExpired),
        status => Err(StravaError::Upstream(status.as_u16())),
    }
}

/// First effort on `segment_id`; an activity may pass a segment several times.
pub fn find_effort(efforts: &[SegmentEffort], segment_id: u64) -> Option<&SegmentEffort> {
    efforts.iter().find(|effort| effort.segment.id == segment_id)
}

/// RFC 3339 start date to unix seconds, rounded down.
pub fn completion_date(start_date: &str) -> Result<u64, StravaError> {
    let parsed = DateTime::parse_from_rfc3339(start_date).map_err(|_| StravaError::InvalidStartDate)?;
    u64::try_from(parsed.timestamp()).map_err(|_| StravaError::InvalidStartDate)
}
