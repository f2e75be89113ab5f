//! Schism command-line trigger.
//!
//! Reads one JSON issuance request, runs it through an
//! [`IssuanceCoordinator`] backed by filesystem stores, and returns the
//! response contract for printing.

pub mod config;

use std::fs;
use std::io::Read;
use std::sync::Arc;

use anyhow::Context;
use schism_ca::{FsObjectStore, FsParameterStore, IssuanceCoordinator};
use schism_proto::IssuanceResponse;
use tracing::info;

pub use config::Args;

/// Build a coordinator over the state directory named in `args`.
pub fn coordinator(args: &Args) -> IssuanceCoordinator {
    IssuanceCoordinator::new(
        args.issuer_config(),
        Arc::new(FsParameterStore::new(&args.state_dir)),
        Arc::new(FsObjectStore::new(&args.state_dir)),
    )
}

/// Read the request body from the file named in `args`, or from `stdin`.
pub fn read_request(args: &Args, mut stdin: impl Read) -> anyhow::Result<Vec<u8>> {
    match args.request_path() {
        Some(path) => fs::read(path)
            .with_context(|| format!("failed to read request file {}", path.display())),
        None => {
            let mut body = Vec::new();
            stdin
                .read_to_end(&mut body)
                .context("failed to read request from stdin")?;
            Ok(body)
        }
    }
}

/// Run one issuance. Issuance failures are reported in the response;
/// only failures to obtain the request are returned as errors.
pub fn run(args: &Args, stdin: impl Read) -> anyhow::Result<IssuanceResponse> {
    let body = read_request(args, stdin)?;
    info!(
        state_dir = %args.state_dir.display(),
        bucket = %args.certs_bucket,
        "running issuance"
    );
    Ok(coordinator(args).handle_json(&body))
}
