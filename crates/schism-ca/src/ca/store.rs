//! CaKeyStore: loads CA key pairs from the parameter store, creating and
//! persisting them on first use.
//!
//! ```text
//!  Absent ──create──► Created ──put_if_absent──► Persisted
//!                                                   ▲
//!                           load ───────────────────┘
//! ```
//!
//! `Persisted` is terminal. A stored value that cannot be decoded is reported
//! as [`IssuerError::CorruptKey`] and is never replaced.

use std::sync::Arc;

use schism_proto::CertificateType;
use tracing::{debug, info, warn};

use crate::ca::keypair::CaKeyPair;
use crate::config::IssuerConfig;
use crate::error::{IssuerError, Result};
use crate::ports::ParameterStore;

/// Owns access to the host and user CA key pairs.
pub struct CaKeyStore {
    params: Arc<dyn ParameterStore>,
    config: IssuerConfig,
}

impl CaKeyStore {
    /// Create a key store over `params`, naming parameters and encrypting
    /// them per `config`.
    pub fn new(params: Arc<dyn ParameterStore>, config: &IssuerConfig) -> Self {
        Self {
            params,
            config: config.clone(),
        }
    }

    /// Parameter name holding the key pair for `certificate_type`.
    pub fn param_name(&self, certificate_type: CertificateType) -> String {
        self.config.ca_param_name(certificate_type)
    }

    /// Load the stored key pair for `certificate_type`.
    ///
    /// Returns [`IssuerError::NotFound`] if nothing is stored and
    /// [`IssuerError::CorruptKey`] if the stored value cannot be decoded
    /// into usable key material.
    pub fn load(&self, certificate_type: CertificateType) -> Result<CaKeyPair> {
        let name = self.param_name(certificate_type);
        let raw = self
            .params
            .get(&name)
            .map_err(|source| IssuerError::ParameterStore {
                name: name.clone(),
                source,
            })?
            .ok_or_else(|| IssuerError::NotFound { name: name.clone() })?;

        let pair = CaKeyPair::from_json(&raw)
            .map_err(|reason| IssuerError::CorruptKey { name: name.clone(), reason })?;

        debug!(%certificate_type, %name, "loaded CA key pair");
        Ok(pair)
    }

    /// Generate a fresh key pair. Nothing is persisted.
    pub fn create(&self) -> Result<CaKeyPair> {
        CaKeyPair::generate()
    }

    /// Load the key pair for `certificate_type`, creating and persisting a
    /// new one if none is stored.
    ///
    /// Creation uses a conditional write. If another issuer persisted a key
    /// between our load and our write, its key is loaded and returned and
    /// ours is discarded. Any failure other than "not found" propagates
    /// without creating a replacement.
    pub fn get_or_create(&self, certificate_type: CertificateType) -> Result<CaKeyPair> {
        match self.load(certificate_type) {
            Ok(pair) => return Ok(pair),
            Err(IssuerError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let name = self.param_name(certificate_type);
        let pair = self.create()?;
        let encoded = pair.to_json()?;

        let created = self
            .params
            .put_if_absent(&name, &encoded, self.config.ca_kms_key_id.as_deref())
            .map_err(|source| IssuerError::ParameterStore {
                name: name.clone(),
                source,
            })?;

        if created {
            info!(
                %certificate_type,
                %name,
                fingerprint = pair.fingerprint().unwrap_or_default(),
                "created CA key pair"
            );
            Ok(pair)
        } else {
            warn!(%certificate_type, %name, "CA key pair created concurrently; using stored key");
            self.load(certificate_type)
        }
    }

    /// The key pair for `certificate_type` and the key pair of its opposite
    /// CA, both created if absent.
    pub fn get_or_create_pair(
        &self,
        certificate_type: CertificateType,
    ) -> Result<(CaKeyPair, CaKeyPair)> {
        let signing = self.get_or_create(certificate_type)?;
        let opposite = self.get_or_create(certificate_type.opposite())?;
        Ok((signing, opposite))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::ports::{MemoryParameterStore, StoreResult};

    fn store_with(params: Arc<MemoryParameterStore>) -> CaKeyStore {
        CaKeyStore::new(params, &IssuerConfig::default())
    }

    #[test]
    fn load_missing_is_not_found() {
        let params = Arc::new(MemoryParameterStore::new());
        let err = store_with(params).load(CertificateType::Host).unwrap_err();
        assert!(matches!(err, IssuerError::NotFound { ref name } if name == "schism-host"));
    }

    #[test]
    fn get_or_create_persists_new_pair() {
        let params = Arc::new(MemoryParameterStore::new());
        let store = store_with(params.clone());
        let pair = store.get_or_create(CertificateType::User).unwrap();

        let stored = params.stored("schism-user").expect("pair persisted");
        assert_eq!(CaKeyPair::from_json(&stored.value).unwrap(), pair);
        assert!(params.stored("schism-host").is_none());
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let params = Arc::new(MemoryParameterStore::new());
        let store = store_with(params.clone());
        let first = store.get_or_create(CertificateType::Host).unwrap();
        let second = store.get_or_create(CertificateType::Host).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.private_key_pem(), second.private_key_pem());
        assert_eq!(params.put_calls(), 1);
    }

    #[test]
    fn corrupt_pair_is_not_replaced() {
        let params = Arc::new(MemoryParameterStore::new());
        params.insert_raw("schism-host", r#"{"private_key": "IsThisValidBase64?"}"#);
        let store = store_with(params.clone());

        let err = store.get_or_create(CertificateType::Host).unwrap_err();
        assert!(matches!(err, IssuerError::CorruptKey { ref name, .. } if name == "schism-host"));
        assert!(err.is_ca_material());
        assert_eq!(params.put_calls(), 0);
        assert_eq!(
            params.stored("schism-host").unwrap().value,
            br#"{"private_key": "IsThisValidBase64?"}"#
        );
    }

    #[test]
    fn non_utf8_payload_is_corrupt() {
        let params = Arc::new(MemoryParameterStore::new());
        params.insert_raw("schism-user", vec![0xff, 0xfe, 0x00]);
        let err = store_with(params).load(CertificateType::User).unwrap_err();
        assert!(matches!(err, IssuerError::CorruptKey { .. }));
    }

    #[test]
    fn kms_key_id_is_passed_through() {
        let params = Arc::new(MemoryParameterStore::new());
        let config = IssuerConfig::default().with_ca_kms_key_id("test-kms-key-id");
        let store = CaKeyStore::new(params.clone(), &config);
        store.get_or_create(CertificateType::User).unwrap();
        assert_eq!(
            params.stored("schism-user").unwrap().kms_key_id.as_deref(),
            Some("test-kms-key-id")
        );
    }

    #[test]
    fn pair_returns_opposite_ca() {
        let params = Arc::new(MemoryParameterStore::new());
        let store = store_with(params.clone());
        let (signing, opposite) = store.get_or_create_pair(CertificateType::Host).unwrap();
        assert_ne!(signing, opposite);
        assert_eq!(store.load(CertificateType::Host).unwrap(), signing);
        assert_eq!(store.load(CertificateType::User).unwrap(), opposite);
    }

    /// Simulates another issuer winning the creation race: the first `get`
    /// sees nothing, but a key is already stored by the time we write.
    struct RacingStore {
        inner: MemoryParameterStore,
        winner: Vec<u8>,
    }

    impl ParameterStore for RacingStore {
        fn get(&self, name: &str) -> StoreResult<Option<Vec<u8>>> {
            let value = self.inner.get(name)?;
            if value.is_none() {
                self.inner.insert_raw(name, self.winner.clone());
            }
            Ok(value)
        }

        fn put(&self, name: &str, value: &[u8], kms_key_id: Option<&str>) -> StoreResult<()> {
            self.inner.put(name, value, kms_key_id)
        }

        fn put_if_absent(
            &self,
            name: &str,
            value: &[u8],
            kms_key_id: Option<&str>,
        ) -> StoreResult<bool> {
            self.inner.put_if_absent(name, value, kms_key_id)
        }
    }

    #[test]
    fn lost_creation_race_returns_winner() {
        let winner = CaKeyPair::generate().unwrap();
        let params = Arc::new(RacingStore {
            inner: MemoryParameterStore::new(),
            winner: winner.to_json().unwrap(),
        });
        let store = CaKeyStore::new(params, &IssuerConfig::default());
        let pair = store.get_or_create(CertificateType::Host).unwrap();
        assert_eq!(pair, winner);
    }

    struct BrokenStore;

    impl ParameterStore for BrokenStore {
        fn get(&self, _name: &str) -> StoreResult<Option<Vec<u8>>> {
            Err(StoreError::backend("InvalidKeyId"))
        }

        fn put(&self, _name: &str, _value: &[u8], _kms: Option<&str>) -> StoreResult<()> {
            panic!("must not write after a failed read");
        }
    }

    #[test]
    fn backend_failure_propagates_without_create() {
        let store = CaKeyStore::new(Arc::new(BrokenStore), &IssuerConfig::default());
        let err = store.get_or_create(CertificateType::User).unwrap_err();
        assert!(matches!(err, IssuerError::ParameterStore { ref name, .. } if name == "schism-user"));
    }
}
