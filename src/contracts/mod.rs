pub mod attestation_router;
pub mod strava_portal;
