//! Error types for the CA issuance core.
//!
//! [`IssuerError`] separates three situations that need different operator
//! responses: the request was invalid, the CA material itself is broken, or
//! the certificate was signed but not durably recorded. [`IssuerError::class`]
//! maps each variant onto the wire-level [`ErrorClass`].

use std::sync::Arc;

use schism_proto::{CertificateType, ErrorClass, LookupKey, ProtoError};
use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Errors returned by parameter store and object store ports.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store backend error: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("store I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl StoreError {
    /// A backend error without an underlying cause.
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

/// One object that could not be written after signing.
#[derive(Debug, Clone)]
pub struct PublishFailure {
    pub object_key: String,
    pub error: StoreError,
}

/// Errors that can occur while issuing a certificate.
#[derive(Debug, Error)]
pub enum IssuerError {
    // --- CA key material ---
    #[error("no CA key stored under {name}")]
    NotFound { name: String },

    #[error("stored CA key {name} is corrupt: {reason}")]
    CorruptKey { name: String, reason: String },

    #[error("CA key material is unusable: {0}")]
    InvalidCaKey(String),

    #[error("failed to generate CA key: {0}")]
    KeyGeneration(String),

    // --- Request ---
    #[error("request rejected: {0}")]
    Request(#[from] ProtoError),

    #[error("malformed client public key: {0}")]
    MalformedPublicKey(String),

    // --- Signing ---
    #[error("certificate signing failed: {0}")]
    Signing(String),

    // --- Persistence ---
    #[error("failed to encode stored value: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("parameter store error for {name}: {source}")]
    ParameterStore {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("object store error for {key}: {source}")]
    ObjectStore {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error(
        "{certificate_type} certificate {lookup_key} was signed but {} object(s) failed to publish",
        failures.len()
    )]
    Unpublished {
        certificate_type: CertificateType,
        lookup_key: LookupKey,
        /// The marshaled certificate, so the caller may still hand it out.
        certificate: String,
        failures: Vec<PublishFailure>,
    },
}

impl IssuerError {
    /// The coarse failure category reported to the invocation trigger.
    pub fn class(&self) -> ErrorClass {
        match self {
            IssuerError::Request(e) if e.is_request_error() => ErrorClass::InvalidRequest,
            IssuerError::Request(_) => ErrorClass::Storage,
            IssuerError::MalformedPublicKey(_) => ErrorClass::InvalidRequest,
            IssuerError::CorruptKey { .. }
            | IssuerError::InvalidCaKey(_)
            | IssuerError::KeyGeneration(_) => ErrorClass::CaMaterial,
            IssuerError::Signing(_) => ErrorClass::Signing,
            IssuerError::Unpublished { .. } => ErrorClass::Unpublished,
            IssuerError::NotFound { .. }
            | IssuerError::Encoding(_)
            | IssuerError::ParameterStore { .. }
            | IssuerError::ObjectStore { .. } => ErrorClass::Storage,
        }
    }

    /// Returns true if the request itself was rejected; nothing was stored.
    pub fn is_invalid_request(&self) -> bool {
        self.class() == ErrorClass::InvalidRequest
    }

    /// Returns true if the stored or generated CA material is broken.
    pub fn is_ca_material(&self) -> bool {
        self.class() == ErrorClass::CaMaterial
    }

    /// Returns true if a certificate exists but was not durably recorded.
    pub fn is_unpublished(&self) -> bool {
        matches!(self, IssuerError::Unpublished { .. })
    }
}

/// Result type alias using [`IssuerError`].
pub type Result<T> = std::result::Result<T, IssuerError>;
