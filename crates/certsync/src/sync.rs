//! Multi-bundle synchronization.
//!
//! A [`Synchronizer`] owns one [`Bundle`] per save format. The first bundle
//! is canonical: [`Synchronizer::sync`] makes every other bundle match it,
//! and [`Synchronizer::set`] publishes a new credential to all of them.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use certsync_config::Config;

use crate::bundle::{Bundle, BundleError};
use crate::credential::Credential;

/// Errors raised by a [`Synchronizer`].
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("at least one bundle is required")]
    NoBundles,

    #[error("failed to open bundle for save format '{name}'")]
    Open {
        name: String,
        #[source]
        source: BundleError,
    },

    #[error("failed to read bundle {index} ('{name}')")]
    Read {
        index: usize,
        name: String,
        #[source]
        source: BundleError,
    },

    #[error("failed to write bundle {index} ('{name}')")]
    Write {
        index: usize,
        name: String,
        #[source]
        source: BundleError,
    },
}

/// Why a bundle was rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncReason {
    /// The bundle's own slots disagreed with each other.
    NeedSync,
    KeyMissing,
    KeyMismatch,
    CertificateMissing,
    CertificateMismatch,
    IntermediatesMismatch,
}

impl fmt::Display for SyncReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncReason::NeedSync => "slots disagree",
            SyncReason::KeyMissing => "private key missing",
            SyncReason::KeyMismatch => "private key differs",
            SyncReason::CertificateMissing => "certificate missing",
            SyncReason::CertificateMismatch => "certificate differs",
            SyncReason::IntermediatesMismatch => "intermediates differ",
        })
    }
}

/// One bundle rewritten by a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rewrite {
    pub index: usize,
    pub name: String,
    pub reason: SyncReason,
}

/// What a [`Synchronizer::sync`] run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub rewritten: Vec<Rewrite>,
}

impl SyncReport {
    /// Whether any bundle was written.
    pub fn changed(&self) -> bool {
        !self.rewritten.is_empty()
    }
}

pub struct Synchronizer {
    bundles: Vec<Bundle>,
}

impl Synchronizer {
    /// Create a synchronizer. `bundles[0]` is the canonical bundle.
    pub fn new(bundles: Vec<Bundle>) -> Result<Self, SyncError> {
        if bundles.is_empty() {
            return Err(SyncError::NoBundles);
        }
        Ok(Self { bundles })
    }

    /// One bundle per configured save format, in configuration order.
    pub fn from_config(config: &Config) -> Result<Self, SyncError> {
        let bundles = config
            .save_formats
            .iter()
            .map(|format| {
                Bundle::from_save_format(format).map_err(|source| SyncError::Open {
                    name: format.name.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(bundles)
    }

    pub fn canonical(&self) -> &Bundle {
        &self.bundles[0]
    }

    pub fn bundles(&self) -> &[Bundle] {
        &self.bundles
    }

    /// Read the canonical credential.
    pub fn get(&self) -> Result<Credential, SyncError> {
        self.canonical().get().map_err(|source| SyncError::Read {
            index: 0,
            name: self.canonical().name().to_string(),
            source,
        })
    }

    /// Write `credential` to every bundle, canonical first.
    ///
    /// Stops at the first bundle that fails; earlier bundles keep the new
    /// credential.
    pub fn set(&self, credential: &Credential) -> Result<(), SyncError> {
        for (index, bundle) in self.bundles.iter().enumerate() {
            bundle
                .set(&credential.key, &credential.chain)
                .map_err(|source| SyncError::Write {
                    index,
                    name: bundle.name().to_string(),
                    source,
                })?;
        }

        info!(bundles = self.bundles.len(), "Published credential to all bundles");
        Ok(())
    }

    /// Reconcile every bundle with the canonical one.
    ///
    /// When the canonical bundle has no usable credential there is nothing
    /// to propagate and the report is empty.
    pub fn sync(&self) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();

        let canonical = match self.canonical().get() {
            Ok(credential) => credential,
            Err(e) => {
                warn!(
                    bundle = 0,
                    name = %self.canonical().name(),
                    error = %e,
                    "Canonical bundle has no usable credential, nothing to sync"
                );
                return Ok(report);
            }
        };

        for (index, bundle) in self.bundles.iter().enumerate() {
            let reason = if index == 0 {
                self.need_sync(index, bundle)?.then_some(SyncReason::NeedSync)
            } else {
                self.mismatch(index, bundle, &canonical)?
            };

            let Some(reason) = reason else {
                debug!(bundle = index, name = %bundle.name(), "Bundle in sync");
                continue;
            };

            info!(bundle = index, name = %bundle.name(), reason = %reason, "Rewriting bundle");
            bundle
                .set(&canonical.key, &canonical.chain)
                .map_err(|source| SyncError::Write {
                    index,
                    name: bundle.name().to_string(),
                    source,
                })?;

            report.rewritten.push(Rewrite {
                index,
                name: bundle.name().to_string(),
                reason,
            });
        }

        info!(
            bundles = self.bundles.len(),
            rewritten = report.rewritten.len(),
            "Sync complete"
        );
        Ok(report)
    }

    fn need_sync(&self, index: usize, bundle: &Bundle) -> Result<bool, SyncError> {
        bundle.need_sync().map_err(|source| SyncError::Read {
            index,
            name: bundle.name().to_string(),
            source,
        })
    }

    /// First reason `bundle` differs from `canonical`, if any.
    fn mismatch(
        &self,
        index: usize,
        bundle: &Bundle,
        canonical: &Credential,
    ) -> Result<Option<SyncReason>, SyncError> {
        let read_error = |source: BundleError| SyncError::Read {
            index,
            name: bundle.name().to_string(),
            source,
        };

        if self.need_sync(index, bundle)? {
            return Ok(Some(SyncReason::NeedSync));
        }

        if bundle.should_have_private_key() {
            match bundle.private_key().map_err(read_error)? {
                None => return Ok(Some(SyncReason::KeyMissing)),
                Some(key) if key != canonical.key => return Ok(Some(SyncReason::KeyMismatch)),
                Some(_) => {}
            }
        }

        if bundle.should_have_certificate() {
            match bundle.certificate().map_err(read_error)? {
                None => return Ok(Some(SyncReason::CertificateMissing)),
                Some(leaf) if Some(&leaf) != canonical.leaf() => {
                    return Ok(Some(SyncReason::CertificateMismatch))
                }
                Some(_) => {}
            }
        }

        if bundle.should_have_intermediates() {
            let intermediates = bundle.intermediates().map_err(read_error)?.unwrap_or_default();
            if intermediates != canonical.intermediates() {
                return Ok(Some(SyncReason::IntermediatesMismatch));
            }
        }

        Ok(None)
    }
}

impl fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synchronizer")
            .field("bundles", &self.bundles)
            .finish()
    }
}
