//! Schism SSH certificate authority issuance core.
//!
//! Issues short-lived OpenSSH certificates for hosts and users:
//!
//! - CA key lifecycle: one Ed25519 CA per certificate type, created on first
//!   use and persisted through a [`ParameterStore`]
//! - Certificate signing with a 60 s backdated validity window
//! - Publication of the certificate record and the opposite CA trust anchor
//!   through an [`ObjectStore`]
//!
//! [`IssuanceCoordinator`] ties these together behind the JSON request and
//! response contract defined in `schism-proto`.

pub mod ca;
pub mod config;
pub mod error;
pub mod issuance;
pub mod ports;
pub mod signer;

pub use ca::{CaKeyPair, CaKeyStore, CaSigner};
pub use config::IssuerConfig;
pub use error::{IssuerError, PublishFailure, StoreError};
pub use issuance::{IssuanceCoordinator, Issued};
pub use ports::{
    FsObjectStore, FsParameterStore, MemoryObjectStore, MemoryParameterStore, ObjectStore,
    ParameterStore,
};
pub use signer::SignedCertificate;
