//! Issuance request/response contract.
//!
//! [`IssuanceRequest`] is the payload an invocation trigger decodes from its
//! inbound event. It carries the certificate type as free text; converting it
//! into a [`SigningRequest`] is the single validation point, after which the
//! certificate type is an exhaustive enum and no downstream code needs a
//! default branch.
//!
//! ```text
//! {"certificateType":"host","identity":"h1","principals":["h1"],
//!  "publicKey":"ssh-ed25519 AAAA...","validityInterval":3600}
//! ```

use serde::{Deserialize, Serialize};

use crate::cert_type::CertificateType;
use crate::error::{ProtoError, Result};
use crate::lookup::LookupKey;

/// Wire-format issuance request, as received from the invocation trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceRequest {
    /// `host` or `user`. Validated by [`SigningRequest::try_from`].
    pub certificate_type: String,
    /// Key id recorded in the certificate (hostname or `user@realm`).
    pub identity: String,
    /// Principals the certificate authorizes. Order is not significant.
    #[serde(default)]
    pub principals: Vec<String>,
    /// Client public key in authorized-key format.
    pub public_key: String,
    /// Requested certificate lifetime in seconds.
    pub validity_interval: i64,
}

impl IssuanceRequest {
    /// Decode a request from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// A validated signing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    /// Client public key in authorized-key format.
    pub public_key: String,
    pub certificate_type: CertificateType,
    pub identity: String,
    /// Principals with duplicates removed, first occurrence kept.
    pub principals: Vec<String>,
    pub validity_seconds: u64,
}

impl SigningRequest {
    /// Build a request directly from typed values.
    ///
    /// Duplicate principals are dropped, keeping the first occurrence.
    pub fn new(
        certificate_type: CertificateType,
        identity: impl Into<String>,
        principals: impl IntoIterator<Item = impl Into<String>>,
        public_key: impl Into<String>,
        validity_seconds: u64,
    ) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for principal in principals.into_iter().map(Into::into) {
            if !unique.contains(&principal) {
                unique.push(principal);
            }
        }
        Self {
            public_key: public_key.into(),
            certificate_type,
            identity: identity.into(),
            principals: unique,
            validity_seconds,
        }
    }

    /// The lookup key this request's certificate will be published under.
    pub fn lookup_key(&self) -> LookupKey {
        LookupKey::derive(&self.identity, &self.principals)
    }
}

impl TryFrom<IssuanceRequest> for SigningRequest {
    type Error = ProtoError;

    fn try_from(req: IssuanceRequest) -> Result<Self> {
        let certificate_type: CertificateType = req.certificate_type.parse()?;

        let validity_seconds = u64::try_from(req.validity_interval).map_err(|_| {
            ProtoError::InvalidRequest(format!(
                "validityInterval must not be negative, got {}",
                req.validity_interval
            ))
        })?;

        Ok(SigningRequest::new(
            certificate_type,
            req.identity,
            req.principals,
            req.public_key,
            validity_seconds,
        ))
    }
}

/// Coarse failure category reported back to the invocation trigger.
///
/// Each class calls for a different operator response: fix the request,
/// repair the CA material, or retry publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The request was invalid; nothing was stored.
    InvalidRequest,
    /// The stored CA key material is unreadable or unusable.
    CaMaterial,
    /// The certificate was signed but could not be durably recorded.
    Unpublished,
    /// A parameter store or object store call failed before signing finished.
    Storage,
    /// The CA signer could not produce a signature.
    Signing,
}

/// Wire-format issuance response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceResponse {
    /// Lookup key of the published certificate, present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_key: Option<String>,
    /// Human-readable failure description, present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_class: Option<ErrorClass>,
}

impl IssuanceResponse {
    pub fn issued(lookup_key: &LookupKey) -> Self {
        Self {
            lookup_key: Some(lookup_key.to_string()),
            error: None,
            error_class: None,
        }
    }

    pub fn failed(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            lookup_key: None,
            error: Some(message.into()),
            error_class: Some(class),
        }
    }

    /// Returns true if the response carries a lookup key.
    pub fn is_success(&self) -> bool {
        self.lookup_key.is_some()
    }

    /// Encode the response as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
