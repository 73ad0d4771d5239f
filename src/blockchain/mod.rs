pub mod deployments;
pub mod portal_client;
pub mod transaction_tracker;
