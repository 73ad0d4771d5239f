// src/models/strava.rs
//! Wire types for the parts of the Strava API the backend touches.

use serde::{Deserialize, Serialize};

/// A segment as embedded in an activity's segment efforts.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StravaSegment {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub activity_type: String,
    #[serde(default)]
    pub distance: f64,
}

/// One completion of a segment inside an activity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SegmentEffort {
    pub id: u64,
    pub segment: StravaSegment,
    #[serde(default)]
    pub elapsed_time: Option<u64>,
    /// RFC 3339 timestamp, e.g. `2024-01-01T00:00:00Z`
    pub start_date: String,
}

/// `GET /activities/{id}`; only the efforts are read.
#[derive(Deserialize, Debug, Default)]
pub struct ActivityDetails {
    #[serde(default)]
    pub segment_efforts: Option<Vec<SegmentEffort>>,
}

/// The verified fact extracted from an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentCompletion {
    pub segment_id: u64,
    pub completion_date: u64,
}

/// Token endpoint response. Refresh responses carry no athlete.
///
/// Deliberately not `Debug`: it holds live tokens.
#[derive(Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub token_type: Option<String>,
    pub expires_at: i64,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub refresh_token: String,
    pub access_token: String,
    #[serde(default)]
    pub athlete: Option<serde_json::Value>,
}

/// Body returned by `/auth`.
#[derive(Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub athlete: Option<serde_json::Value>,
}

impl From<TokenResponse> for AuthResponse {
    fn from(token: TokenResponse) -> Self {
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token.expires_at,
            athlete: token.athlete,
        }
    }
}

/// Body accepted by `/auth`: an OAuth code or a refresh token.
#[derive(Deserialize, Default)]
pub struct AuthRequest {
    pub code: Option<String>,
    pub refresh_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_without_efforts_deserializes() {
        let details: ActivityDetails = serde_json::from_str(r#"{"id": 1, "name": "Ride"}"#).unwrap();
        assert!(details.segment_efforts.is_none());
    }

    #[test]
    fn effort_ignores_unknown_fields() {
        let effort: SegmentEffort = serde_json::from_str(
            r#"{"id": 9, "elapsed_time": 300, "start_date": "2024-01-01T00:00:00Z",
                "segment": {"id": 456, "name": "Col", "activity_type": "Ride", "distance": 1200.5, "climb_category": 3}}"#,
        )
        .unwrap();
        assert_eq!(effort.segment.id, 456);
        assert_eq!(effort.elapsed_time, Some(300));
    }

    #[test]
    fn auth_response_omits_missing_athlete() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"token_type": "Bearer", "expires_at": 1700000000, "expires_in": 21600,
                "refresh_token": "r", "access_token": "a"}"#,
        )
        .unwrap();
        let json = serde_json::to_value(AuthResponse::from(token)).unwrap();
        assert!(json.get("athlete").is_none());
        assert_eq!(json["expires_at"], 1_700_000_000i64);
    }
}
