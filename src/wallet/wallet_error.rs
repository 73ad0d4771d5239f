// src/wallet/wallet_error.rs
//! Classification of wallet and JSON-RPC failures.
//!
//! A user cancelling a transaction in their wallet is not a failure and must
//! not be surfaced as one; everything else is mapped to a readable message.

use ethers::providers::{JsonRpcError, RpcError};
use std::fmt;

/// EIP-1193 user rejection.
pub const USER_REJECTED_CODE: i64 = 4001;

const KNOWN_CODES: &[(i64, &str)] = &[
    (4001, "Transaction rejected by user"),
    (4100, "Wallet is not authorized"),
    (4200, "Method not supported by wallet"),
    (4900, "Wallet is disconnected"),
    (4901, "Wallet is disconnected from this chain"),
    (-32000, "Insufficient funds"),
    (-32002, "Request already pending"),
    (-32003, "Transaction rejected"),
    (-32600, "Invalid request"),
    (-32601, "Method not found"),
    (-32602, "Invalid parameters"),
    (-32603, "Internal error"),
];

const DEFAULT_MESSAGE: &str = "An unexpected error occurred";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletError {
    pub code: i64,
    pub message: String,
    pub is_user_rejection: bool,
}

impl WalletError {
    /// Classifies a JSON-RPC error object by its code.
    pub fn from_json_rpc(error: &JsonRpcError) -> Self {
        if let Some(from_message) = Self::match_message(&error.message) {
            return from_message;
        }
        let message = known_message(error.code)
            .map(str::to_string)
            .or_else(|| (!error.message.is_empty()).then(|| error.message.clone()))
            .unwrap_or_else(|| DEFAULT_MESSAGE.to_string());
        Self {
            code: error.code,
            message,
            is_user_rejection: error.code == USER_REJECTED_CODE,
        }
    }

    /// Classifies any provider-side error, falling back to its message text.
    pub fn from_rpc<E: RpcError>(error: &E) -> Self {
        match error.as_error_response() {
            Some(response) => Self::from_json_rpc(response),
            None => Self::from_message(&error.to_string()),
        }
    }

    /// Classifies an error known only by its text.
    pub fn from_message(message: &str) -> Self {
        Self::match_message(message).unwrap_or_else(|| Self {
            code: -1,
            message: if message.is_empty() {
                DEFAULT_MESSAGE.to_string()
            } else {
                message.to_string()
            },
            is_user_rejection: false,
        })
    }

    fn match_message(message: &str) -> Option<Self> {
        let lowered = message.to_lowercase();
        if lowered.contains("user rejected") || lowered.contains("user denied") {
            return Some(Self {
                code: USER_REJECTED_CODE,
                message: "Transaction cancelled".to_string(),
                is_user_rejection: true,
            });
        }
        if lowered.contains("insufficient funds") {
            return Some(Self {
                code: -32000,
                message: "Insufficient funds for transaction".to_string(),
                is_user_rejection: false,
            });
        }
        None
    }

    pub fn is_user_rejection(&self) -> bool {
        self.is_user_rejection
    }
}

fn known_message(code: i64) -> Option<&'static str> {
    KNOWN_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, message)| *message)
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for WalletError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc_error(code: i64, message: &str) -> JsonRpcError {
        JsonRpcError {
            code,
            message: message.to_string(),
            data: None,
        }
    }

    #[test]
    fn code_4001_is_a_user_rejection() {
        let error = WalletError::from_json_rpc(&rpc_error(4001, "whatever"));
        assert!(error.is_user_rejection());
        assert_eq!(error.message, "Transaction rejected by user");
    }

    #[test]
    fn rejection_is_detected_from_message_text() {
        for text in ["User rejected the request.", "MetaMask Tx Signature: User denied transaction signature."] {
            let error = WalletError::from_message(text);
            assert!(error.is_user_rejection(), "{text}");
            assert_eq!(error.code, USER_REJECTED_CODE);
        }
    }

    #[test]
    fn insufficient_funds_is_not_a_rejection() {
        let error = WalletError::from_message("insufficient funds for gas * price + value");
        assert!(!error.is_user_rejection());
        assert_eq!(error.code, -32000);
    }

    #[test]
    fn unknown_codes_keep_the_server_message() {
        let error = WalletError::from_json_rpc(&rpc_error(3, "execution reverted: InvalidSignature"));
        assert_eq!(error.message, "execution reverted: InvalidSignature");
        assert!(!error.is_user_rejection());
    }

    #[test]
    fn empty_message_falls_back_to_default() {
        assert_eq!(WalletError::from_message("").message, DEFAULT_MESSAGE);
        assert_eq!(WalletError::from_json_rpc(&rpc_error(12345, "")).message, DEFAULT_MESSAGE);
    }
}
