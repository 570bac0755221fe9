//! Source of fresh credentials.
//!
//! A [`CertificateIssuer`] produces a new private key and certificate chain
//! for the configured domains. Talking to a CA is left to implementors;
//! [`PemFileIssuer`] hands out a credential that was obtained elsewhere and
//! saved as PEM files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use certsync_config::Config;

use crate::credential::Credential;

/// What an issuer is asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRequest {
    pub domains: Vec<String>,
    pub email: Option<String>,
    /// RSA modulus size for newly generated keys
    pub key_length: u32,
}

impl IssueRequest {
    pub fn from_config(config: &Config) -> Self {
        Self {
            domains: config.domains.clone(),
            email: config.email.clone(),
            key_length: config.key_length,
        }
    }
}

/// Produces a fresh credential.
pub trait CertificateIssuer {
    /// Issue a credential for `request`. The chain must start with the leaf.
    fn issue(&self, request: &IssueRequest) -> Result<Credential>;
}

/// Issuer backed by a key file and a chain file on disk.
#[derive(Debug, Clone)]
pub struct PemFileIssuer {
    key: PathBuf,
    chain: PathBuf,
}

impl PemFileIssuer {
    pub fn new(key: impl Into<PathBuf>, chain: impl Into<PathBuf>) -> Self {
        Self {
            key: key.into(),
            chain: chain.into(),
        }
    }

    pub fn key_path(&self) -> &Path {
        &self.key
    }

    pub fn chain_path(&self) -> &Path {
        &self.chain
    }
}

impl CertificateIssuer for PemFileIssuer {
    fn issue(&self, request: &IssueRequest) -> Result<Credential> {
        debug!(
            key = %self.key.display(),
            chain = %self.chain.display(),
            domains = ?request.domains,
            "Reading credential from PEM files"
        );

        let key = std::fs::read(&self.key)
            .with_context(|| format!("Failed to read key file {}", self.key.display()))?;
        let chain = std::fs::read(&self.chain)
            .with_context(|| format!("Failed to read chain file {}", self.chain.display()))?;

        let credential = Credential::from_pem(&key, &chain).with_context(|| {
            format!(
                "Failed to decode credential from {} and {}",
                self.key.display(),
                self.chain.display()
            )
        })?;

        info!(
            algorithm = %credential.key.algorithm(),
            certificates = credential.chain.len(),
            "Loaded credential from PEM files"
        );
        Ok(credential)
    }
}
