//! Certificate type tag shared by requests, stored CA keys and object keys.
//!
//! Every SSH certificate is either a host certificate or a user certificate,
//! and each type is signed by its own CA. The lowercase tag (`host`, `user`)
//! appears in parameter names, object keys and the wire contract.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;

/// The kind of SSH certificate being issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateType {
    /// Host certificate, presented by servers to connecting clients.
    Host,
    /// User certificate, presented by clients to servers.
    User,
}

impl CertificateType {
    /// Both certificate types, host first.
    pub const ALL: [CertificateType; 2] = [CertificateType::Host, CertificateType::User];

    /// The lowercase tag used in parameter names and object keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateType::Host => "host",
            CertificateType::User => "user",
        }
    }

    /// The counterpart authority whose trust anchor a verifier of this
    /// certificate type needs for the other side of the handshake.
    pub fn opposite(&self) -> CertificateType {
        match self {
            CertificateType::Host => CertificateType::User,
            CertificateType::User => CertificateType::Host,
        }
    }
}

impl fmt::Display for CertificateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CertificateType {
    type Err = ProtoError;

    /// Parse a lowercase tag. Anything other than `host` or `user` is
    /// rejected; there is no default.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" => Ok(CertificateType::Host),
            "user" => Ok(CertificateType::User),
            other => Err(ProtoError::UnknownCertificateType(other.to_string())),
        }
    }
}
