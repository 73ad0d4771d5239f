// src/services/api_server.rs
//! HTTP surface of the backend: `/sign` and `/auth`.
//!
//! `/sign` is the only place the signing key is used. It checks the request,
//! asks Strava whether the segment is really in the caller's activity and
//! returns an EIP-712 signature bound to the portal of the requested chain.
//! `/auth` proxies the Strava OAuth token exchange so the client secret stays
//! on the server.

use crate::config::Settings;
use crate::error::ApiError;
use crate::models::segment::{SegmentClaim, SignRequest, SignedSegment};
use crate::models::strava::{AuthRequest, AuthResponse};
use crate::services::cors::{cors_middleware, CorsPolicy};
use crate::services::rate_limiter::{InMemoryRateLimiter, RateDecision, RateLimiter};
use crate::services::strava_client::{StravaClient, StravaError};
use crate::services::validation::{validate_sign_request, ValidationError};
use crate::wallet::segment_signer::SegmentSigner;
use crate::wallet::typed_data::SegmentDomain;
use axum::extract::rejection::BytesRejection;
use axum::extract::{ConnectInfo, DefaultBodyLimit, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use bytes::Bytes;
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 16 * 1024;

const UNKNOWN_CLIENT: &str = "unknown";

/// Server state shared by every handler.
pub struct ApiServer {
    /// Strava API client (oracle and token exchange)
    strava: StravaClient,

    /// Backend signing key, read-only after startup
    signer: Arc<SegmentSigner>,

    /// Origin allow-list
    cors: Arc<CorsPolicy>,

    sign_limiter: Arc<dyn RateLimiter>,
    auth_limiter: Arc<dyn RateLimiter>,

    /// Key rate limits on `X-Forwarded-For` instead of the peer address
    trust_proxy_headers: bool,
}

impl ApiServer {
    /// Creates a server with the default in-memory rate limits.
    pub fn new(strava: StravaClient, signer: Arc<SegmentSigner>, cors: CorsPolicy) -> Self {
        ApiServer {
            strava,
            signer,
            cors: Arc::new(cors),
            sign_limiter: Arc::new(InMemoryRateLimiter::for_sign()),
            auth_limiter: Arc::new(InMemoryRateLimiter::for_auth()),
            trust_proxy_headers: false,
        }
    }

    pub fn from_settings(settings: &Settings, signer: Arc<SegmentSigner>) -> Result<Self, StravaError> {
        let strava = StravaClient::from_settings(settings)?;
        let cors = CorsPolicy::for_frontend(&settings.frontend_url);
        Ok(Self::new(strava, signer, cors).with_trusted_proxy_headers(settings.trust_proxy_headers))
    }

    pub fn with_rate_limiters(mut self, sign: Arc<dyn RateLimiter>, auth: Arc<dyn RateLimiter>) -> Self {
        self.sign_limiter = sign;
        self.auth_limiter = auth;
        self
    }

    pub fn with_trusted_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    /// Builds the axum router. Unsupported methods get 405, `OPTIONS` is
    /// answered by the CORS layer, and every response is JSON.
    pub fn router(self) -> Router {
        let cors = self.cors.clone();
        let state = Arc::new(self);

        Router::new()
            .route(
                "/sign",
                post(Self::sign_handler).fallback(Self::method_not_allowed),
            )
            .route(
                "/auth",
                get(Self::auth_handler)
                    .post(Self::auth_handler)
                    .fallback(Self::method_not_allowed),
            )
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetResponseHeaderLayer::if_not_present(
                        CONTENT_TYPE,
                        HeaderValue::from_static("application/json"),
                    ))
                    .layer(middleware::from_fn_with_state(cors, cors_middleware))
                    .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
            )
    }

    /// Binds `addr` and serves until the process stops.
    pub async fn run(self, addr: SocketAddr) -> std::io::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server listening on http://{}", addr);
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await
    }

    /// POST /sign
    ///
    /// Order: parse, validate, rate limit, Strava lookup, sign.
    async fn sign_handler(
        State(state): State<Arc<ApiServer>>,
        connect_info: Option<ConnectInfo<SocketAddr>>,
        headers: HeaderMap,
        body: Result<Bytes, BytesRejection>,
    ) -> Result<Json<SignedSegment>, ApiError> {
        let body = body.map_err(body_rejection)?;
        let request: SignRequest =
            serde_json::from_slice(&body).map_err(|_| ValidationError::MalformedBody)?;
        let request = validate_sign_request(request)?;

        let key = client_key(&headers, connect_info.map(|c| c.0), state.trust_proxy_headers);
        if let RateDecision::Limited { retry_after } = state.sign_limiter.check(&key) {
            warn!("Rate limit exceeded on /sign");
            return Err(ApiError::RateLimited { retry_after });
        }

        let completion = state
            .strava
            .segment_completion(&request.access_token, &request.activity_id, request.segment_id)
            .await
            .map_err(|err| match err {
                StravaError::TokenExpired => {
                    warn!("Sign error: status 401");
                    ApiError::TokenExpired
                }
                StravaError::SegmentNotFound => ApiError::SegmentNotFound,
                other => {
                    error!("Sign error: {}", other);
                    ApiError::SigningFailed
                }
            })?;

        let claim = SegmentClaim::new(completion.segment_id, request.subject);
        let domain = SegmentDomain::for_chain(request.chain);
        let signature = state.signer.sign_segment(&claim, &domain).map_err(|err| {
            error!("Sign error: {}", err);
            ApiError::SigningFailed
        })?;

        info!(
            "Signed segment {} for {:?} on {}",
            completion.segment_id, request.subject, request.chain
        );
        Ok(Json(SignedSegment {
            segment_id: completion.segment_id,
            completion_date: completion.completion_date,
            signature: signature.to_vec().into(),
        }))
    }

    /// GET|POST /auth
    ///
    /// A JSON body may carry `code` or `refresh_token`; an unreadable body is
    /// ignored and `?code=` from the OAuth redirect is used instead.
    async fn auth_handler(
        State(state): State<Arc<ApiServer>>,
        connect_info: Option<ConnectInfo<SocketAddr>>,
        method: Method,
        headers: HeaderMap,
        query: Option<Query<AuthRequest>>,
        body: Result<Bytes, BytesRejection>,
    ) -> Result<Json<AuthResponse>, ApiError> {
        let key = client_key(&headers, connect_info.map(|c| c.0), state.trust_proxy_headers);
        if let RateDecision::Limited { retry_after } = state.auth_limiter.check(&key) {
            warn!("Rate limit exceeded on /auth");
            return Err(ApiError::RateLimited { retry_after });
        }

        let body = body.map_err(body_rejection)?;
        let from_body = if method == Method::POST {
            serde_json::from_slice::<AuthRequest>(&body).unwrap_or_default()
        } else {
            AuthRequest::default()
        };
        let code = non_empty(from_body.code);
        let refresh_token = non_empty(from_body.refresh_token);
        let code = match (code, &refresh_token) {
            (None, None) => query.and_then(|Query(q)| non_empty(q.code)),
            (code, _) => code,
        };

        let exchange = match (code, refresh_token) {
            (Some(code), _) => state.strava.exchange_code(&code).await,
            (None, Some(refresh_token)) => state.strava.refresh_token(&refresh_token).await,
            (None, None) => return Err(ApiError::MissingAuthParameters),
        };

        let token = exchange.map_err(|err| match err {
            StravaError::TokenExpired => {
                warn!("Auth error: status 401");
                ApiError::InvalidGrant
            }
            other => {
                error!("Auth error: {}", other);
                ApiError::AuthenticationFailed
            }
        })?;
        Ok(Json(AuthResponse::from(token)))
    }

    async fn method_not_allowed() -> ApiError {
        ApiError::MethodNotAllowed
    }
}

fn body_rejection(rejection: BytesRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::Validation(ValidationError::MalformedBody)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Rate-limit key for a request.
///
/// `X-Forwarded-For` is client controlled, so it is only honoured behind a
/// proxy that overwrites it.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwarded(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn peer_ip_is_the_default_key() {
        let peer: SocketAddr = "203.0.113.7:51234".parse().unwrap();
        assert_eq!(client_key(&forwarded("198.51.100.1"), Some(peer), false), "203.0.113.7");
    }

    #[test]
    fn forwarded_for_is_used_only_when_trusted() {
        let peer: SocketAddr = "10.0.0.2:443".parse().unwrap();
        let headers = forwarded("198.51.100.1, 10.0.0.2");
        assert_eq!(client_key(&headers, Some(peer), true), "198.51.100.1");
        assert_eq!(client_key(&HeaderMap::new(), Some(peer), true), "10.0.0.2");
    }

    #[test]
    fn unknown_peer_shares_one_bucket() {
        assert_eq!(client_key(&HeaderMap::new(), None, false), UNKNOWN_CLIENT);
    }
}
