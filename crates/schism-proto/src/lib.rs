//! Schism SSH CA protocol definitions.
//!
//! Shared protocol layer used by `schism-ca` and any invocation trigger:
//!
//! - Certificate type tag (host / user) and its opposite
//! - Lookup key derivation (content-addressed certificate names)
//! - Issuance request/response wire contract
//! - Published object records and their object-store keys

pub mod cert_type;
pub mod error;
pub mod lookup;
pub mod objects;
pub mod request;

pub use cert_type::CertificateType;
pub use error::ProtoError;
pub use lookup::{LookupKey, derive_lookup_key};
pub use objects::{CaPublicKeyObject, SignedCertificateObject, StoredObject};
pub use request::{ErrorClass, IssuanceRequest, IssuanceResponse, SigningRequest};
