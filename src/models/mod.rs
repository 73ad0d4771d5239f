pub mod attestation;
pub mod segment;
pub mod strava;
