// src/main.rs

//! # Strava Segment Attestations - Main Entry Point
//!
//! Loads settings, parses the signing key once and starts the API server.
//!
//! ## Environment Variables
//! - `STRAVA_CLIENT_ID`, `STRAVA_CLIENT_SECRET`: Strava OAuth application
//! - `FRONTEND_URL`: Origin of the web frontend (CORS)
//! - `SIGNER_PRIVATE_KEY`: (Optional) `0x`-prefixed signing key; without it `/sign` answers 500
//! - `BIND_ADDR`: (Optional) listen address (default: 127.0.0.1:8888)
//! - `STRAVA_API_BASE`, `STRAVA_TOKEN_URL`: (Optional) Strava endpoints
//! - `TRUST_PROXY_HEADERS`: (Optional) rate-limit on `X-Forwarded-For`

use anyhow::Context;
use dotenv::dotenv;
use log::{info, warn};
use std::sync::Arc;
use strava_attestations::config::Settings;
use strava_attestations::services::api_server::ApiServer;
use strava_attestations::utils::crypto::to_prefixed_hex;
use strava_attestations::wallet::segment_signer::SegmentSigner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::from_env().context("invalid configuration")?;

    let signer = match &settings.signer_private_key {
        Some(key) => SegmentSigner::from_private_key(key.expose()).context("invalid SIGNER_PRIVATE_KEY")?,
        None => {
            warn!("SIGNER_PRIVATE_KEY not set; /sign will fail until it is configured");
            SegmentSigner::unconfigured()
        }
    };
    if let Ok(address) = signer.address() {
        info!("Signing as {}", to_prefixed_hex(address.as_bytes()));
    }

    let api_server = ApiServer::from_settings(&settings, Arc::new(signer))
        .context("failed to build Strava client")?;

    info!("Available endpoints:");
    info!("- POST /sign");
    info!("- GET|POST /auth");

    api_server.run(settings.bind_addr).await.context("API server stopped")?;
    Ok(())
}
