#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use strava_attestations::config::Secret;
use strava_attestations::services::api_server::ApiServer;
use strava_attestations::services::cors::CorsPolicy;
use strava_attestations::services::strava_client::StravaClient;
use strava_attestations::wallet::segment_signer::SegmentSigner;
use tower::ServiceExt;

pub const FRONTEND: &str = "https://verify.example";
pub const SIGNER_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
pub const SUBJECT: &str = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";

pub fn strava_client() -> StravaClient {
    StravaClient::new(
        mockito::server_url(),
        format!("{}/oauth/token", mockito::server_url()),
        "client-id",
        Secret::new("client-secret"),
    )
    .unwrap()
}

pub fn server_with(signer: SegmentSigner) -> ApiServer {
    ApiServer::new(strava_client(), Arc::new(signer), CorsPolicy::for_frontend(FRONTEND))
}

pub fn app() -> Router {
    server_with(SegmentSigner::from_private_key(SIGNER_KEY).unwrap()).router()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn activity_body(segment_id: u64, start_date: &str) -> String {
    format!(
        r#"{{"id": 1, "name": "Morning Ride", "segment_efforts": [
            {{"id": 10, "elapsed_time": 95, "start_date": "2023-12-31T10:00:00Z",
              "segment": {{"id": 1, "name": "Warmup", "activity_type": "Ride", "distance": 500.0}}}},
            {{"id": 11, "elapsed_time": 300, "start_date": "{start_date}",
              "segment": {{"id": {segment_id}, "name": "Col", "activity_type": "Ride", "distance": 1200.0}}}}
        ]}}"#
    )
}
