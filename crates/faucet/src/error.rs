//! Error types for the faucet service

use crate::selector::InsufficientFunds;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use faucet_crypto::AddressDecodeError;
use serde_json::json;
use thiserror::Error;

pub const RATE_LIMITED_MESSAGE: &str = "A user is allowed to have one request from the faucet every 24 hours";

/// Per-request failures, classified once at the dispensing boundary.
#[derive(Error, Debug)]
pub enum FaucetError {
    #[error("IP already received funds within the request interval")]
    RateLimited,

    #[error("Usage store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Address parameter missing or empty")]
    MissingAddress,

    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] AddressDecodeError),

    #[error(transparent)]
    InsufficientFunds(#[from] InsufficientFunds),

    #[error("Node unavailable: {0}")]
    NodeUnavailable(String),

    #[error("Node rejected transaction: {0}")]
    NodeRejected(String),

    #[error("Signing failed: {0}")]
    SigningFailure(String),
}

impl FaucetError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            FaucetError::RateLimited | FaucetError::StoreUnavailable(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// Stable label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FaucetError::RateLimited => "rate_limited",
            FaucetError::StoreUnavailable(_) => "store_unavailable",
            FaucetError::MissingAddress | FaucetError::InvalidAddress(_) => "invalid_address",
            FaucetError::InsufficientFunds(_) => "insufficient_funds",
            FaucetError::NodeUnavailable(_) => "node_unavailable",
            FaucetError::NodeRejected(_) => "node_rejected",
            FaucetError::SigningFailure(_) => "signing_failure",
        }
    }

    /// Message safe to return to the caller. Internal detail stays in the logs,
    /// except for the node's rejection reason which is relayed verbatim.
    pub fn client_message(&self) -> String {
        match self {
            FaucetError::RateLimited => RATE_LIMITED_MESSAGE.to_string(),
            FaucetError::StoreUnavailable(_) => "Unable to verify request history, please try again later".to_string(),
            FaucetError::MissingAddress => "The address parameter is either missing or empty".to_string(),
            FaucetError::InvalidAddress(_) => "Error decoding address".to_string(),
            FaucetError::InsufficientFunds(funds) => format!("Error sending Kaspa: {}", funds),
            FaucetError::NodeUnavailable(_) => "Error sending Kaspa: node is unavailable".to_string(),
            FaucetError::NodeRejected(reason) => format!("Error sending Kaspa: {}", reason),
            FaucetError::SigningFailure(_) => "Error sending Kaspa: could not sign transaction".to_string(),
        }
    }
}

impl IntoResponse for FaucetError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "errorCode": status.as_u16(),
            "errorMessage": self.client_message(),
        }));

        (status, body).into_response()
    }
}

pub type FaucetResult<T> = Result<T, FaucetError>;

/// Failures before the listener is bound. The process exits instead of serving.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid faucet private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Failed to open usage store: {0}")]
    Store(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(FaucetError::RateLimited.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(FaucetError::StoreUnavailable("down".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(FaucetError::MissingAddress.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            FaucetError::InsufficientFunds(InsufficientFunds { required: 10, available: 5 }).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(FaucetError::NodeRejected("spent".into()).status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(FaucetError::SigningFailure("bad".into()).status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_client_messages_hide_internal_detail() {
        let err = FaucetError::StoreUnavailable("connection refused to /var/lib/faucet".into());
        assert!(!err.client_message().contains("/var/lib"));

        let err = FaucetError::NodeUnavailable("tcp connect error 10.1.2.3".into());
        assert!(!err.client_message().contains("10.1.2.3"));

        let err = FaucetError::NodeRejected("transaction input already spent".into());
        assert_eq!(err.client_message(), "Error sending Kaspa: transaction input already spent");
    }
}
