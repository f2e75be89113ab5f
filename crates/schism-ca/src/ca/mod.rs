//! CA key pairs and their persistence.
//!
//! Each certificate type has exactly one Ed25519 CA key pair, created on the
//! first issuance that needs it and loaded from the parameter store after
//! that.

pub mod keypair;
pub mod store;

pub use keypair::{CaKeyPair, CaSigner};
pub use store::CaKeyStore;
