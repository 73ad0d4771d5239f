// src/services/cors.rs
//! CORS for the browser frontend.
//!
//! Only an origin that equals an allowed origin exactly is echoed back. Any
//! other origin, including ones that merely start with an allowed origin such
//! as `https://example.com.evil.com`, gets the primary frontend origin.

use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Local development origins accepted next to the configured frontend.
pub const DEV_ORIGINS: [&str; 2] = ["http://localhost:5174", "http://localhost:8888"];

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
}

impl CorsPolicy {
    /// The first origin is the default sent to callers that are not allowed.
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self {
            allowed_origins: allowed_origins.into_iter().filter(|o| !o.is_empty()).collect(),
        }
    }

    /// `frontend_url` followed by the local development origins.
    pub fn for_frontend(frontend_url: &str) -> Self {
        let mut origins = vec![frontend_url.to_string()];
        origins.extend(DEV_ORIGINS.iter().map(|origin| origin.to_string()));
        Self::new(origins)
    }

    /// Value for `Access-Control-Allow-Origin` given the request's `Origin`.
    pub fn allow_origin(&self, origin: Option<&str>) -> &str {
        let default = self.allowed_origins.first().map(String::as_str).unwrap_or("");
        match origin {
            Some(origin) => self
                .allowed_origins
                .iter()
                .find(|allowed| allowed.as_str() == origin)
                .map(String::as_str)
                .unwrap_or(default),
            None => default,
        }
    }

    pub fn apply(&self, headers: &mut HeaderMap, origin: Option<&str>) {
        if let Ok(value) = HeaderValue::from_str(self.allow_origin(origin)) {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
    }
}

/// Answers preflights directly and stamps CORS headers on every response.
pub async fn cors_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };
    policy.apply(response.headers_mut(), origin.as_deref());
    response
}
