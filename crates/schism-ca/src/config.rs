//! Issuer configuration.
//!
//! The core consumes configuration only as already-resolved values. The
//! `schism` binary resolves them from flags and `SCHISM_*` environment
//! variables; tests construct them directly.

use schism_proto::CertificateType;
use serde::{Deserialize, Serialize};

/// Default parameter-name prefix; CA keys live at `schism-host` / `schism-user`.
pub const DEFAULT_CA_PARAM_PREFIX: &str = "schism";

/// Default bucket for signed certificates and CA trust anchors.
pub const DEFAULT_CERTS_BUCKET: &str = "schism-signed-certificates";

/// Resolved configuration for an [`IssuanceCoordinator`](crate::IssuanceCoordinator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IssuerConfig {
    /// Prefix for CA key parameter names.
    pub ca_param_prefix: String,
    /// Encryption key id handed to the parameter store when persisting CA keys.
    pub ca_kms_key_id: Option<String>,
    /// Object-store bucket for published objects.
    pub certs_bucket: String,
    /// Prefix prepended to signed-certificate object keys.
    pub certs_prefix: String,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            ca_param_prefix: DEFAULT_CA_PARAM_PREFIX.to_string(),
            ca_kms_key_id: None,
            certs_bucket: DEFAULT_CERTS_BUCKET.to_string(),
            certs_prefix: String::new(),
        }
    }
}

impl IssuerConfig {
    pub fn with_ca_param_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ca_param_prefix = prefix.into();
        self
    }

    /// Set the encryption key id. An empty id is treated as unset.
    pub fn with_ca_kms_key_id(mut self, key_id: impl Into<String>) -> Self {
        let key_id = key_id.into();
        self.ca_kms_key_id = (!key_id.is_empty()).then_some(key_id);
        self
    }

    pub fn with_certs_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.certs_bucket = bucket.into();
        self
    }

    pub fn with_certs_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.certs_prefix = prefix.into();
        self
    }

    /// Parameter name holding the CA key pair for `certificate_type`:
    /// `{prefix}-{type}`.
    pub fn ca_param_name(&self, certificate_type: CertificateType) -> String {
        format!("{}-{}", self.ca_param_prefix, certificate_type)
    }
}
