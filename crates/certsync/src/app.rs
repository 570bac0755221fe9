//! Renewal driver.
//!
//! Reads the canonical bundle, checks it and, when it is missing or no longer
//! usable, obtains a new credential from a [`CertificateIssuer`] and publishes
//! it to every save format.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use certsync_config::Config;

use crate::bundle::BundleError;
use crate::issuer::{CertificateIssuer, IssueRequest};
use crate::sync::Synchronizer;
use crate::validation::{self, Requirements, ValidationError};

/// Process exit codes.
pub mod exit {
    /// Work was done.
    pub const OK: u8 = 0;
    /// Nothing needed to change.
    pub const NO_CHANGE: u8 = 1;
    pub const ERROR: u8 = 2;
}

#[derive(Debug)]
pub enum RenewOutcome {
    /// The stored credential is usable and nothing was written.
    Unchanged,
    /// A new credential was issued and written to every save format.
    ///
    /// The chain is always well formed. `revalidation` holds the reason the
    /// issued credential failed the remaining checks, if it did.
    Renewed {
        revalidation: Option<ValidationError>,
    },
}

impl RenewOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            RenewOutcome::Unchanged => exit::NO_CHANGE,
            RenewOutcome::Renewed { .. } => exit::OK,
        }
    }
}

/// Renew the credential described by `config` if needed.
pub fn renew(
    config: &Config,
    issuer: &dyn CertificateIssuer,
    now: DateTime<Utc>,
) -> Result<RenewOutcome> {
    let synchronizer =
        Synchronizer::from_config(config).context("Failed to open save formats")?;
    let requirements = Requirements::from_config(config);

    match synchronizer.canonical().get() {
        Ok(credential) => match validation::validate_credential(&credential, &requirements, now) {
            Ok(()) => {
                info!(
                    bundle = %synchronizer.canonical().name(),
                    "Certificate bundle is valid"
                );
                return Ok(RenewOutcome::Unchanged);
            }
            Err(e) => {
                warn!(
                    bundle = %synchronizer.canonical().name(),
                    error = %e,
                    "Certificate bundle is not usable, renewing"
                );
            }
        },
        Err(e @ (BundleError::KeyNotFound { .. } | BundleError::CertificateNotFound { .. })) => {
            info!(
                bundle = %synchronizer.canonical().name(),
                reason = %e,
                "No certificate bundle stored yet, issuing"
            );
        }
        Err(e) => return Err(e).context("Failed to read canonical bundle"),
    }

    let request = IssueRequest::from_config(config);
    let credential = issuer
        .issue(&request)
        .context("Failed to obtain a new certificate")?;

    validation::validate_chain(&credential.chain).context("Issued chain is malformed")?;

    synchronizer
        .set(&credential)
        .context("Failed to store the new certificate")?;

    let revalidation = validation::validate_credential(&credential, &requirements, now).err();
    match &revalidation {
        Some(e) => error!(error = %e, "Issued certificate bundle is not valid"),
        None => info!(
            domains = ?request.domains,
            not_after = ?credential.leaf().map(|leaf| leaf.not_after()),
            "Certificate renewed"
        ),
    }

    Ok(RenewOutcome::Renewed { revalidation })
}
