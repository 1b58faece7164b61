/*
[INPUT]:  Error sources (wallets, chain node, verifier, storage, serialization)
[OUTPUT]: Structured error types with taxonomy helpers
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;

use crate::types::Provider;

/// Main error type for the sign-in crate
#[derive(Error, Debug)]
pub enum SiwaError {
    /// Wallet connection failed (user rejected, transport down, wallet missing)
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Suggested transaction parameters could not be fetched from the node
    #[error("Suggested transaction parameters unavailable: {0}")]
    ParametersUnavailable(String),

    /// Wallet refused to sign or returned a malformed signature
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Signature did not validate or the verifier failed
    #[error("Verification failed: {0}")]
    Verification(String),

    /// Operation called outside of its required flow state
    #[error(transparent)]
    State(#[from] StateError),

    /// Result discarded because a disconnect happened while the call was in flight
    #[error("Operation cancelled by disconnect")]
    Cancelled,

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Persisted client state could not be written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Account identifier is not a valid Algorand address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid response from a remote collaborator
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised when an operation is invoked in the wrong flow state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("No address connected")]
    NoAddressConnected,

    #[error("No signed message to verify")]
    NoSignedMessage,

    #[error("Sign-in already verified; disconnect to start over")]
    AlreadyVerified,

    #[error("{0} is already connected; disconnect before connecting again")]
    AlreadyConnected(Provider),

    #[error("No wallet adapter registered for {0}")]
    UnsupportedProvider(Provider),
}

/// Coarse error classification matching the sign-in error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    ParametersUnavailable,
    Signing,
    Verification,
    State,
    Cancelled,
    Internal,
}

impl SiwaError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SiwaError::Connection(_) => ErrorKind::Connection,
            SiwaError::ParametersUnavailable(_) => ErrorKind::ParametersUnavailable,
            SiwaError::Signing(_) => ErrorKind::Signing,
            SiwaError::Verification(_) => ErrorKind::Verification,
            SiwaError::State(_) => ErrorKind::State,
            SiwaError::Cancelled => ErrorKind::Cancelled,
            SiwaError::Http(_)
            | SiwaError::Serialization(_)
            | SiwaError::UrlParse(_)
            | SiwaError::Storage(_)
            | SiwaError::InvalidAddress(_)
            | SiwaError::InvalidResponse(_)
            | SiwaError::Config(_) => ErrorKind::Internal,
        }
    }

    /// Check if the error only reports a discarded result
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SiwaError::Cancelled)
    }

    /// Create an invalid-response error from a status code and message
    pub fn status_error(status: StatusCode, message: impl Into<String>) -> Self {
        SiwaError::InvalidResponse(format!("status {}: {}", status.as_u16(), message.into()))
    }
}

/// Result type alias for sign-in operations
pub type Result<T> = std::result::Result<T, SiwaError>;
