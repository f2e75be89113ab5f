//! Objects published to the object store after each issuance.
//!
//! Two records are written per signed certificate:
//!
//! | Object | Key |
//! |--------|-----|
//! | [`SignedCertificateObject`] | `{prefix}{type}s/{lookupKey}.json` |
//! | [`CaPublicKeyObject`] (opposite CA) | `CA-Pubkeys/{type}.json` |
//!
//! The CA object is addressed by certificate type alone so that a verifier
//! can fetch the trust anchor without knowing any lookup key.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::cert_type::CertificateType;
use crate::error::Result;
use crate::lookup::LookupKey;

/// Directory holding the published CA trust anchors.
pub const CA_PUBKEYS_DIR: &str = "CA-Pubkeys";

/// A record that knows its own object-store key and JSON body.
pub trait StoredObject: Serialize {
    /// The object key under the configured certificate prefix.
    fn object_key(&self, prefix: &str) -> String;

    /// JSON body written to the object store.
    fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Object key of a signed certificate record.
pub fn certificate_object_key(
    prefix: &str,
    certificate_type: CertificateType,
    lookup_key: &LookupKey,
) -> String {
    format!("{prefix}{certificate_type}s/{lookup_key}.json")
}

/// Object key of a published CA trust anchor.
pub fn ca_public_key_object_key(certificate_type: CertificateType) -> String {
    format!("{CA_PUBKEYS_DIR}/{certificate_type}.json")
}

/// Published authorized key of one CA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaPublicKeyObject {
    /// The type of certificates this CA signs.
    pub certificate_type: CertificateType,
    /// Authorized-key line of the CA public key.
    pub authorized_key: String,
}

impl StoredObject for CaPublicKeyObject {
    fn object_key(&self, _prefix: &str) -> String {
        ca_public_key_object_key(self.certificate_type)
    }
}

/// Record of one issued certificate, addressed by its lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCertificateObject {
    pub certificate_type: CertificateType,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_on: OffsetDateTime,
    pub identity: String,
    pub principals: Vec<String>,
    /// Requested lifetime in seconds.
    pub validity_interval: u64,
    /// Marshaled certificate: `<cert-algo> <base64> <identity>`.
    pub raw_signed_certificate: String,
    /// Authorized key of the opposite CA, the verifier's trust anchor.
    pub opposite_ca_authorized_key: String,
    /// Object key of the published opposite CA record.
    pub opposite_public_ca: String,
    /// The lookup key this record is stored under.
    pub lookup_key: LookupKey,
}

impl StoredObject for SignedCertificateObject {
    fn object_key(&self, prefix: &str) -> String {
        certificate_object_key(prefix, self.certificate_type, &self.lookup_key)
    }
}
