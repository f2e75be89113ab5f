//! Command-line arguments and environment variable handling.

use std::path::PathBuf;

use clap::Parser;
use schism_ca::IssuerConfig;
use schism_ca::config::{DEFAULT_CA_PARAM_PREFIX, DEFAULT_CERTS_BUCKET};

/// Issue one SSH certificate from a JSON issuance request.
///
/// CA key pairs and published objects are kept under the state directory.
#[derive(Parser, Debug, Clone)]
#[command(name = "schism")]
#[command(about = "SSH certificate authority: sign and publish one host or user certificate")]
pub struct Args {
    /// Prefix of the parameter names holding the CA key pairs
    #[arg(long, env = "SCHISM_CA_PARAM_PREFIX", default_value = DEFAULT_CA_PARAM_PREFIX)]
    pub ca_param_prefix: String,

    /// Key id used to encrypt newly created CA key pairs
    #[arg(long, env = "SCHISM_CA_KMS_KEY_ID")]
    pub ca_kms_key_id: Option<String>,

    /// Bucket receiving signed certificates and CA public keys
    #[arg(long, env = "SCHISM_CERTS_S3_BUCKET", default_value = DEFAULT_CERTS_BUCKET)]
    pub certs_bucket: String,

    /// Prefix prepended to certificate record keys
    #[arg(long, env = "SCHISM_CERTS_S3_PREFIX", default_value = "")]
    pub certs_prefix: String,

    /// Directory backing the parameter and object stores
    #[arg(long, env = "SCHISM_STATE_DIR", default_value = ".schism")]
    pub state_dir: PathBuf,

    /// Issuance request file; reads stdin when absent or `-`
    #[arg(long, short = 'r')]
    pub request: Option<PathBuf>,

    /// Pretty-print the JSON response
    #[arg(long)]
    pub pretty: bool,
}

impl Args {
    /// Issuer configuration resolved from flags and environment.
    pub fn issuer_config(&self) -> IssuerConfig {
        let config = IssuerConfig::default()
            .with_ca_param_prefix(&self.ca_param_prefix)
            .with_certs_bucket(&self.certs_bucket)
            .with_certs_prefix(&self.certs_prefix);
        match &self.ca_kms_key_id {
            Some(key_id) => config.with_ca_kms_key_id(key_id),
            None => config,
        }
    }

    /// The request file, or `None` for stdin.
    pub fn request_path(&self) -> Option<&PathBuf> {
        self.request
            .as_ref()
            .filter(|path| path.as_os_str() != "-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_issuer_defaults() {
        let args = Args::parse_from(["schism"]);
        let config = args.issuer_config();
        assert_eq!(config, IssuerConfig::default());
        assert!(args.request_path().is_none());
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "schism",
            "--ca-param-prefix",
            "prod",
            "--ca-kms-key-id",
            "alias/ca",
            "--certs-bucket",
            "certs",
            "--certs-prefix",
            "issued/",
            "--request",
            "req.json",
        ]);
        let config = args.issuer_config();
        assert_eq!(config.ca_param_prefix, "prod");
        assert_eq!(config.ca_kms_key_id.as_deref(), Some("alias/ca"));
        assert_eq!(config.certs_bucket, "certs");
        assert_eq!(config.certs_prefix, "issued/");
        assert_eq!(args.request_path(), Some(&PathBuf::from("req.json")));
    }

    #[test]
    fn dash_means_stdin() {
        let args = Args::parse_from(["schism", "-r", "-"]);
        assert!(args.request_path().is_none());
    }
}
