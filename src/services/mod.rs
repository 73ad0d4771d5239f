pub mod api_server;
pub mod attestation_client;
pub mod cors;
pub mod rate_limiter;
pub mod strava_client;
pub mod validation;
