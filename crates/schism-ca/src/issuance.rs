//! IssuanceCoordinator: one signing transaction end to end.
//!
//! ```text
//! IssuanceRequest ──validate──► SigningRequest
//!        │
//!        ▼
//! CaKeyStore::get_or_create_pair ──► signer() ──► sign ──► lookup key
//!                                                             │
//!                  ┌──────────────────────────────────────────┤
//!                  ▼                                          ▼
//!   {prefix}{type}s/{lookup}.json             CA-Pubkeys/{opposite}.json
//! ```
//!
//! Both objects are written after every successful signature. A failure of
//! either write is reported as [`IssuerError::Unpublished`], which still
//! carries the signed certificate.

use std::sync::Arc;

use schism_proto::{
    CaPublicKeyObject, ErrorClass, IssuanceRequest, IssuanceResponse, LookupKey, ProtoError,
    SignedCertificateObject, SigningRequest, StoredObject,
};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::ca::CaKeyStore;
use crate::config::IssuerConfig;
use crate::error::{IssuerError, PublishFailure, Result};
use crate::ports::{ObjectStore, ParameterStore};
use crate::signer;

/// Outcome of a fully published issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issued {
    /// Name the certificate record is published under.
    pub lookup_key: LookupKey,
    /// Marshaled certificate: `<cert-algo> <base64> <identity>`.
    pub certificate: String,
    /// Object key of the certificate record.
    pub certificate_key: String,
    /// Object key of the published opposite CA.
    pub opposite_ca_key: String,
    pub serial: u64,
}

/// Runs issuances against one configuration and one pair of ports.
pub struct IssuanceCoordinator {
    config: IssuerConfig,
    keys: CaKeyStore,
    objects: Arc<dyn ObjectStore>,
}

impl IssuanceCoordinator {
    pub fn new(
        config: IssuerConfig,
        params: Arc<dyn ParameterStore>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        let keys = CaKeyStore::new(params, &config);
        Self {
            config,
            keys,
            objects,
        }
    }

    pub fn config(&self) -> &IssuerConfig {
        &self.config
    }

    /// The CA key store backing this coordinator.
    pub fn key_store(&self) -> &CaKeyStore {
        &self.keys
    }

    /// Issue and publish a certificate for `request` at the current time.
    pub fn issue(&self, request: &SigningRequest) -> Result<Issued> {
        self.issue_at(request, OffsetDateTime::now_utc().unix_timestamp())
    }

    /// Issue and publish a certificate as if the current time were
    /// `now_epoch_secs`.
    pub fn issue_at(&self, request: &SigningRequest, now_epoch_secs: i64) -> Result<Issued> {
        let certificate_type = request.certificate_type;
        debug!(
            %certificate_type,
            identity = %request.identity,
            principals = ?request.principals,
            validity_seconds = request.validity_seconds,
            "issuance requested"
        );

        // Reject an unparseable client key before touching any store.
        signer::parse_public_key(&request.public_key)?;

        let (signing_ca, opposite_ca) = self.keys.get_or_create_pair(certificate_type)?;
        let ca = signing_ca.signer()?;

        let signed = signer::sign_at(request, &ca, now_epoch_secs)?;
        let certificate = signed.marshal()?;
        let lookup_key = request.lookup_key();

        let anchor = CaPublicKeyObject {
            certificate_type: certificate_type.opposite(),
            authorized_key: opposite_ca.authorized_key().to_string(),
        };
        let opposite_ca_key = anchor.object_key(&self.config.certs_prefix);

        let record = SignedCertificateObject {
            certificate_type,
            issued_on: signed.issued_at()?,
            identity: request.identity.clone(),
            principals: request.principals.clone(),
            validity_interval: request.validity_seconds,
            raw_signed_certificate: certificate.clone(),
            opposite_ca_authorized_key: anchor.authorized_key.clone(),
            opposite_public_ca: opposite_ca_key.clone(),
            lookup_key: lookup_key.clone(),
        };
        let certificate_key = record.object_key(&self.config.certs_prefix);

        let mut failures = Vec::new();
        self.publish(&record, &certificate_key, &mut failures)?;
        self.publish(&anchor, &opposite_ca_key, &mut failures)?;

        if !failures.is_empty() {
            warn!(
                %certificate_type,
                %lookup_key,
                serial = signed.serial(),
                failed = failures.len(),
                "certificate signed but not published"
            );
            return Err(IssuerError::Unpublished {
                certificate_type,
                lookup_key,
                certificate,
                failures,
            });
        }

        info!(
            %certificate_type,
            %lookup_key,
            serial = signed.serial(),
            key = %certificate_key,
            bucket = %self.config.certs_bucket,
            "certificate issued"
        );

        Ok(Issued {
            lookup_key,
            certificate,
            certificate_key,
            opposite_ca_key,
            serial: signed.serial(),
        })
    }

    /// Write one object to the certificate bucket, recording a failed write
    /// instead of returning early.
    fn publish<T: StoredObject>(
        &self,
        object: &T,
        key: &str,
        failures: &mut Vec<PublishFailure>,
    ) -> Result<()> {
        let body = object.to_json_bytes()?;
        match self.objects.put(&self.config.certs_bucket, key, &body) {
            Ok(_) => {
                debug!(bucket = %self.config.certs_bucket, key, "published object");
            }
            Err(error) => {
                warn!(bucket = %self.config.certs_bucket, key, %error, "object publish failed");
                failures.push(PublishFailure {
                    object_key: key.to_string(),
                    error,
                });
            }
        }
        Ok(())
    }

    /// Invocation boundary: validate, issue, and convert the outcome into
    /// the response contract.
    pub fn handle(&self, request: IssuanceRequest) -> IssuanceResponse {
        let request = match SigningRequest::try_from(request) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "rejected issuance request");
                return failure_response(&IssuerError::from(e));
            }
        };

        match self.issue(&request) {
            Ok(issued) => IssuanceResponse::issued(&issued.lookup_key),
            Err(e) => {
                warn!(
                    certificate_type = %request.certificate_type,
                    identity = %request.identity,
                    class = ?e.class(),
                    error = %e,
                    "issuance failed"
                );
                failure_response(&e)
            }
        }
    }

    /// Decode a JSON request and [`handle`](Self::handle) it. Undecodable
    /// input is an invalid request.
    pub fn handle_json(&self, bytes: &[u8]) -> IssuanceResponse {
        match IssuanceRequest::from_json(bytes) {
            Ok(request) => self.handle(request),
            Err(ProtoError::Json(e)) => {
                warn!(error = %e, "undecodable issuance request");
                IssuanceResponse::failed(
                    ErrorClass::InvalidRequest,
                    format!("malformed request body: {e}"),
                )
            }
            Err(e) => failure_response(&IssuerError::from(e)),
        }
    }
}

fn failure_response(error: &IssuerError) -> IssuanceResponse {
    IssuanceResponse::failed(error.class(), error.to_string())
}
