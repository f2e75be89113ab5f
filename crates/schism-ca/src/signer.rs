//! CertificateSigner: turns a signing request into a signed OpenSSH
//! certificate.
//!
//! The certificate structure and its signature follow PROTOCOL.certkeys; the
//! to-be-signed encoding and signature are produced by `ssh-key`.
//!
//! Validity window: `[now - 60s, now + ttl)`. The start is backdated by a
//! fixed skew margin so a verifier whose clock runs slightly behind the
//! issuer still accepts a freshly issued certificate.
//!
//! Certificates carry no critical options and no extensions: no forced
//! command, no source-address restriction, no permit-* flags.

use rand::RngCore;
use rand::rngs::OsRng;
use schism_proto::{CertificateType, SigningRequest};
use ssh_key::PublicKey;
use ssh_key::certificate::{Builder, CertType, Certificate};
use time::OffsetDateTime;
use tracing::debug;

use crate::ca::CaSigner;
use crate::error::{IssuerError, Result};

/// Backdating applied to `valid_after` to tolerate clock skew.
pub const VALIDITY_SKEW_SECS: u64 = 60;

/// A signed certificate together with the instant it was signed.
#[derive(Debug, Clone)]
pub struct SignedCertificate {
    cert: Certificate,
    certificate_type: CertificateType,
    issued_at_epoch: i64,
}

impl SignedCertificate {
    /// The underlying OpenSSH certificate.
    pub fn certificate(&self) -> &Certificate {
        &self.cert
    }

    /// Random serial number (audit/display only).
    pub fn serial(&self) -> u64 {
        self.cert.serial()
    }

    /// Key id, equal to the request identity.
    pub fn key_id(&self) -> &str {
        self.cert.key_id()
    }

    pub fn valid_principals(&self) -> &[String] {
        self.cert.valid_principals()
    }

    /// Start of validity, seconds since Unix epoch.
    pub fn valid_after(&self) -> u64 {
        self.cert.valid_after()
    }

    /// End of validity, seconds since Unix epoch.
    pub fn valid_before(&self) -> u64 {
        self.cert.valid_before()
    }

    pub fn certificate_type(&self) -> CertificateType {
        self.certificate_type
    }

    /// Raw signature bytes produced by the CA key.
    pub fn signature(&self) -> &[u8] {
        self.cert.signature().as_bytes()
    }

    /// Signing instant, seconds since Unix epoch.
    pub fn issued_at_epoch(&self) -> i64 {
        self.issued_at_epoch
    }

    /// Signing instant as a timestamp.
    pub fn issued_at(&self) -> Result<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp(self.issued_at_epoch)
            .map_err(|e| IssuerError::Signing(format!("invalid issuance time: {e}")))
    }

    /// Authorized-key encoding with the identity as comment:
    /// `ssh-ed25519-cert-v01@openssh.com <base64> <identity>`.
    pub fn marshal(&self) -> Result<String> {
        self.cert
            .to_openssh()
            .map_err(|e| IssuerError::Signing(format!("certificate encoding: {e}")))
    }
}

/// The OpenSSH certificate type tag for `certificate_type`.
pub fn ssh_cert_type(certificate_type: CertificateType) -> CertType {
    match certificate_type {
        CertificateType::Host => CertType::Host,
        CertificateType::User => CertType::User,
    }
}

/// Parse a client public key in authorized-key format.
///
/// Leading and trailing whitespace is ignored; a trailing comment is allowed.
pub fn parse_public_key(authorized_key: &str) -> Result<PublicKey> {
    PublicKey::from_openssh(authorized_key.trim())
        .map_err(|e| IssuerError::MalformedPublicKey(e.to_string()))
}

/// Sign `request` with `ca` at the current time.
pub fn sign(request: &SigningRequest, ca: &CaSigner) -> Result<SignedCertificate> {
    sign_at(request, ca, OffsetDateTime::now_utc().unix_timestamp())
}

/// Sign `request` with `ca` as if the current time were `now_epoch_secs`.
pub fn sign_at(
    request: &SigningRequest,
    ca: &CaSigner,
    now_epoch_secs: i64,
) -> Result<SignedCertificate> {
    let subject = parse_public_key(&request.public_key)?;

    let now = u64::try_from(now_epoch_secs)
        .map_err(|_| IssuerError::Signing(format!("clock before Unix epoch: {now_epoch_secs}")))?;
    let valid_after = now.saturating_sub(VALIDITY_SKEW_SECS);
    let valid_before = now
        .checked_add(request.validity_seconds)
        .ok_or_else(|| IssuerError::Signing("validity window overflows".into()))?;

    let serial = OsRng.next_u64();

    let mut builder =
        Builder::new_with_random_nonce(&mut OsRng, subject.key_data().clone(), valid_after, valid_before)
            .map_err(signing_error)?;
    builder.serial(serial).map_err(signing_error)?;
    builder
        .cert_type(ssh_cert_type(request.certificate_type))
        .map_err(signing_error)?;
    builder.key_id(request.identity.as_str()).map_err(signing_error)?;
    if request.principals.is_empty() {
        // An empty principal list means "any principal" in OpenSSH.
        builder.all_principals_valid().map_err(signing_error)?;
    }
    for principal in &request.principals {
        builder.valid_principal(principal.as_str()).map_err(signing_error)?;
    }
    builder.comment(request.identity.as_str()).map_err(signing_error)?;

    let cert = builder.sign(ca.private_key()).map_err(signing_error)?;

    debug!(
        serial,
        key_id = %request.identity,
        certificate_type = %request.certificate_type,
        valid_after,
        valid_before,
        "signed certificate"
    );

    Ok(SignedCertificate {
        cert,
        certificate_type: request.certificate_type,
        issued_at_epoch: now_epoch_secs,
    })
}

fn signing_error(e: ssh_key::Error) -> IssuerError {
    IssuerError::Signing(e.to_string())
}

#[cfg(test)]
mod tests {
    use ssh_key::{Algorithm, PrivateKey};

    use super::*;
    use crate::ca::CaKeyPair;

    /// Reference epoch: 2025-01-01 00:00:00 UTC.
    const JAN_1_2025: i64 = 1735689600;

    fn client_public_key() -> String {
        let client = PrivateKey::random(&mut OsRng, Algorithm::Ed25519).unwrap();
        format!("{} client@example.com", client.public_key().to_openssh().unwrap())
    }

    fn test_ca() -> CaSigner {
        CaKeyPair::generate().unwrap().signer().unwrap()
    }

    fn host_request() -> SigningRequest {
        SigningRequest::new(
            CertificateType::Host,
            "test.example.com",
            ["test.example.com"],
            client_public_key(),
            300,
        )
    }

    #[test]
    fn produces_signed_certificate() {
        let ca = test_ca();
        let cert = sign(&host_request(), &ca).expect("signing should succeed");
        assert!(!cert.signature().is_empty());
        assert_eq!(cert.key_id(), "test.example.com");
        assert_eq!(cert.valid_principals(), ["test.example.com".to_string()]);
        assert_eq!(cert.certificate().cert_type(), CertType::Host);
    }

    #[test]
    fn validity_window_is_backdated() {
        let ca = test_ca();
        let cert = sign_at(&host_request(), &ca, JAN_1_2025).unwrap();
        assert_eq!(cert.valid_after(), JAN_1_2025 as u64 - 60);
        assert_eq!(cert.valid_before(), JAN_1_2025 as u64 + 300);
        assert!(cert.valid_after() < cert.valid_before());
        assert_eq!(cert.issued_at_epoch(), JAN_1_2025);
    }

    #[test]
    fn valid_after_is_in_the_past() {
        let ca = test_ca();
        let before = OffsetDateTime::now_utc().unix_timestamp() as u64;
        let cert = sign(&host_request(), &ca).unwrap();
        assert!(cert.valid_after() <= before);
        assert!(cert.valid_after() < cert.valid_before());
    }

    #[test]
    fn zero_ttl_still_has_a_window() {
        let ca = test_ca();
        let mut req = host_request();
        req.validity_seconds = 0;
        let cert = sign_at(&req, &ca, JAN_1_2025).unwrap();
        assert!(cert.valid_after() < cert.valid_before());
    }

    #[test]
    fn certificate_verifies_against_ca_fingerprint() {
        let ca = test_ca();
        let cert = sign_at(&host_request(), &ca, JAN_1_2025).unwrap();
        cert.certificate()
            .validate_at(JAN_1_2025 as u64, [ca.fingerprint()])
            .expect("certificate should verify against its CA");
    }

    #[test]
    fn certificate_does_not_verify_against_other_ca() {
        let ca = test_ca();
        let other = test_ca();
        let cert = sign_at(&host_request(), &ca, JAN_1_2025).unwrap();
        assert!(
            cert.certificate()
                .validate_at(JAN_1_2025 as u64, [other.fingerprint()])
                .is_err()
        );
    }

    #[test]
    fn user_request_gets_user_type() {
        let ca = test_ca();
        let req = SigningRequest::new(
            CertificateType::User,
            "user@test.schism.example.com",
            ["user1", "app_user"],
            client_public_key(),
            3600,
        );
        let cert = sign(&req, &ca).unwrap();
        assert_eq!(cert.certificate().cert_type(), CertType::User);
        assert_eq!(cert.certificate_type(), CertificateType::User);
        assert_eq!(cert.valid_principals().len(), 2);
    }

    #[test]
    fn no_options_or_extensions() {
        let ca = test_ca();
        let cert = sign(&host_request(), &ca).unwrap();
        assert!(cert.certificate().critical_options().is_empty());
        assert!(cert.certificate().extensions().is_empty());
    }

    #[test]
    fn empty_principals_are_allowed() {
        let ca = test_ca();
        let req = SigningRequest::new(
            CertificateType::Host,
            "wildcard",
            Vec::<String>::new(),
            client_public_key(),
            60,
        );
        let cert = sign(&req, &ca).expect("empty principal list signs");
        assert!(cert.valid_principals().is_empty());
    }

    #[test]
    fn marshal_ends_with_identity_comment() {
        let ca = test_ca();
        let cert = sign(&host_request(), &ca).unwrap();
        let marshaled = cert.marshal().unwrap();
        assert!(marshaled.starts_with("ssh-ed25519-cert-v01@openssh.com "));
        assert!(marshaled.ends_with(" test.example.com"));
        assert!(!marshaled.ends_with('\n'));
        assert_eq!(marshaled.split(' ').count(), 3);
    }

    #[test]
    fn marshaled_certificate_parses_back() {
        let ca = test_ca();
        let cert = sign_at(&host_request(), &ca, JAN_1_2025).unwrap();
        let parsed = Certificate::from_openssh(&cert.marshal().unwrap()).unwrap();
        assert_eq!(parsed.serial(), cert.serial());
        assert_eq!(parsed.key_id(), "test.example.com");
        assert_eq!(parsed.comment(), "test.example.com");
    }

    #[test]
    fn serials_are_random() {
        let ca = test_ca();
        let req = host_request();
        let a = sign(&req, &ca).unwrap();
        let b = sign(&req, &ca).unwrap();
        assert_ne!(a.serial(), b.serial());
    }

    #[test]
    fn malformed_public_key_is_rejected() {
        let ca = test_ca();
        let mut req = host_request();
        req.public_key = "not an authorized key".to_string();
        let err = sign(&req, &ca).unwrap_err();
        assert!(matches!(err, IssuerError::MalformedPublicKey(_)));
        assert!(err.is_invalid_request());
    }

    #[test]
    fn empty_public_key_is_rejected() {
        let ca = test_ca();
        let mut req = host_request();
        req.public_key = String::new();
        assert!(matches!(
            sign(&req, &ca),
            Err(IssuerError::MalformedPublicKey(_))
        ));
    }
}
