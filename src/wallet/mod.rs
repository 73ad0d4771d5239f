pub mod segment_signer;
pub mod typed_data;
pub mod wallet_error;
