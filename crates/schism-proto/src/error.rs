//! Error types for the Schism protocol layer.
//!
//! These cover request validation and wire (de)serialization. Storage,
//! key material and signing failures belong to `schism-ca`.

use thiserror::Error;

/// Errors that can occur within the `schism-proto` crate.
#[derive(Debug, Error)]
pub enum ProtoError {
    // --- Request validation ---
    #[error("unknown certificate type: {0:?}")]
    UnknownCertificateType(String),

    #[error("invalid issuance request: {0}")]
    InvalidRequest(String),

    // --- Serialization ---
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtoError {
    /// Returns true if the error was caused by the caller's request rather
    /// than by a local encoding failure.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            ProtoError::UnknownCertificateType(_) | ProtoError::InvalidRequest(_)
        )
    }
}

/// Result type alias using [`ProtoError`].
pub type Result<T> = std::result::Result<T, ProtoError>;
