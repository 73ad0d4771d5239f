// src/error.rs
//! HTTP error taxonomy shared by the `/sign` and `/auth` handlers.
//!
//! Bodies are always `{"error": "<message>"}`. Messages are generic on purpose
//! for server-side failures; the underlying cause is only logged.

use crate::services::validation::ValidationError;
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("Missing code or refresh_token")]
    MissingAuthParameters,
    #[error("Too many requests")]
    RateLimited { retry_after: Duration },
    #[error("Segment not found in this activity")]
    SegmentNotFound,
    /// Strava rejected the access token passed to `/sign`.
    #[error("Invalid Strava token")]
    TokenExpired,
    /// Strava rejected the code or refresh token passed to `/auth`.
    #[error("Invalid or expired token")]
    InvalidGrant,
    #[error("Signing failed")]
    SigningFailed,
    #[error("Authentication failed")]
    AuthenticationFailed,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Request body too large")]
    PayloadTooLarge,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::MissingAuthParameters => StatusCode::BAD_REQUEST,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::SegmentNotFound => StatusCode::NOT_FOUND,
            ApiError::TokenExpired | ApiError::InvalidGrant => StatusCode::UNAUTHORIZED,
            ApiError::SigningFailed | ApiError::AuthenticationFailed => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            ApiError::TokenExpired => json!({ "error": self.to_string(), "tokenExpired": true }),
            _ => json!({ "error": self.to_string() }),
        };
        let mut response = (self.status(), Json(body)).into_response();

        if let ApiError::RateLimited { retry_after } = self {
            let seconds = retry_after.as_secs().max(1).to_string();
            if let Ok(value) = HeaderValue::from_str(&seconds) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}
