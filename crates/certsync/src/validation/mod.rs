//! Credential validation.
//!
//! Stages run in a fixed order and the first failure stops validation:
//!
//! 1. structure: the chain is not empty
//! 2. order: every certificate is signed by the one after it, which must be
//!    a CA
//! 3. expiry: every certificate is valid now and for at least the minimum
//!    remaining time
//! 4. key correspondence: the leaf carries the private key's public half
//! 5. domain coverage: the leaf is valid for every required domain
//!
//! [`validate_chain`] runs stages 1 and 2, [`validate_bundle`] runs all five.
//! Every stage takes `now` explicitly; the `_now` wrappers use the system
//! clock.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;
use tracing::{debug, trace};

use certsync_config::Config;

use crate::certificate::Certificate;
use crate::codec::CodecError;
use crate::credential::Credential;
use crate::key::PrivateKeyMaterial;

mod domains;

pub use domains::covers;

/// Why a credential is not usable.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("certificate chain is empty")]
    EmptyChain,

    #[error("certificate {index} ('{subject}') is not signed by the next certificate ('{next}')")]
    Order {
        index: usize,
        subject: String,
        next: String,
    },

    #[error("certificate {index} ('{subject}') is not valid before {not_before}, now is {now}")]
    NotYetValid {
        index: usize,
        subject: String,
        not_before: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("certificate {index} ('{subject}') expires at {not_after}, must be valid until {required}")]
    ExpiresTooSoon {
        index: usize,
        subject: String,
        not_after: DateTime<Utc>,
        required: DateTime<Utc>,
    },

    #[error("leaf public key cannot be read")]
    LeafKey(#[source] CodecError),

    #[error("leaf certificate does not match the {algorithm} private key")]
    KeyMismatch { algorithm: String },

    #[error("leaf certificate does not cover '{domain}'")]
    DomainNotCovered { domain: String },

    #[error("RSA key has {bits} bits, at least {min} are required")]
    WeakKey { bits: usize, min: usize },
}

/// What a usable credential must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirements {
    pub domains: Vec<String>,
    pub min_remaining: Duration,
    /// Minimum RSA modulus size in bits
    pub min_key_bits: usize,
}

impl Requirements {
    pub fn from_config(config: &Config) -> Self {
        Self {
            domains: config.domains.clone(),
            min_remaining: config.min_remaining(),
            min_key_bits: config.key_length as usize,
        }
    }
}

pub fn validate_structure(chain: &[Certificate]) -> Result<(), ValidationError> {
    if chain.is_empty() {
        return Err(ValidationError::EmptyChain);
    }
    Ok(())
}

/// Check that `chain[i]` is signed by `chain[i + 1]` for every `i`, and that
/// `chain[i + 1]` may issue certificates.
///
/// The last certificate is not checked against anything.
pub fn validate_order(chain: &[Certificate]) -> Result<(), ValidationError> {
    for (index, pair) in chain.windows(2).enumerate() {
        if !pair[0].is_signed_by(&pair[1]) {
            return Err(ValidationError::Order {
                index,
                subject: pair[0].subject().to_string(),
                next: pair[1].subject().to_string(),
            });
        }
    }
    Ok(())
}

/// Check that every certificate is valid at `now` and at `now + min_remaining`.
pub fn validate_expiry(
    chain: &[Certificate],
    now: DateTime<Utc>,
    min_remaining: Duration,
) -> Result<(), ValidationError> {
    let required = TimeDelta::from_std(min_remaining)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    for (index, cert) in chain.iter().enumerate() {
        if now < cert.not_before() {
            return Err(ValidationError::NotYetValid {
                index,
                subject: cert.subject().to_string(),
                not_before: cert.not_before(),
                now,
            });
        }
        if cert.not_after() < required {
            return Err(ValidationError::ExpiresTooSoon {
                index,
                subject: cert.subject().to_string(),
                not_after: cert.not_after(),
                required,
            });
        }
    }
    Ok(())
}

/// Check that the leaf certificate carries `key`'s public half.
pub fn validate_key_match(
    key: &PrivateKeyMaterial,
    chain: &[Certificate],
) -> Result<(), ValidationError> {
    let leaf = chain.first().ok_or(ValidationError::EmptyChain)?;
    let public = leaf.public_key().map_err(ValidationError::LeafKey)?;

    if public != key.public_key() {
        return Err(ValidationError::KeyMismatch {
            algorithm: key.algorithm().to_string(),
        });
    }
    Ok(())
}

/// Check that the leaf covers every domain, naming the first one it misses.
pub fn validate_domains(chain: &[Certificate], domains: &[String]) -> Result<(), ValidationError> {
    let leaf = chain.first().ok_or(ValidationError::EmptyChain)?;

    match domains.iter().find(|domain| !covers(leaf, domain)) {
        Some(domain) => Err(ValidationError::DomainNotCovered {
            domain: domain.clone(),
        }),
        None => Ok(()),
    }
}

/// Check the RSA modulus size. EC keys always pass.
pub fn validate_key_strength(
    key: &PrivateKeyMaterial,
    min_bits: usize,
) -> Result<(), ValidationError> {
    match key.rsa_bits() {
        Some(bits) if bits < min_bits => Err(ValidationError::WeakKey {
            bits,
            min: min_bits,
        }),
        _ => Ok(()),
    }
}

/// Whether the chain is well formed: stages 1 and 2.
pub fn validate_chain(chain: &[Certificate]) -> Result<(), ValidationError> {
    validate_structure(chain)?;
    validate_order(chain)
}

/// Whether the bundle is usable: stages 1 to 5.
pub fn validate_bundle(
    key: &PrivateKeyMaterial,
    chain: &[Certificate],
    requirements: &Requirements,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    validate_chain(chain)?;
    validate_expiry(chain, now, requirements.min_remaining)?;
    validate_key_match(key, chain)?;
    validate_domains(chain, &requirements.domains)?;

    trace!(
        subject = %chain[0].subject(),
        not_after = %chain[0].not_after(),
        "Bundle is usable"
    );
    Ok(())
}

pub fn validate_bundle_now(
    key: &PrivateKeyMaterial,
    chain: &[Certificate],
    requirements: &Requirements,
) -> Result<(), ValidationError> {
    validate_bundle(key, chain, requirements, Utc::now())
}

/// [`validate_bundle`] followed by [`validate_key_strength`].
pub fn validate_credential(
    credential: &Credential,
    requirements: &Requirements,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    validate_bundle(&credential.key, &credential.chain, requirements, now)?;
    validate_key_strength(&credential.key, requirements.min_key_bits)?;
    debug!(
        algorithm = %credential.key.algorithm(),
        certificates = credential.chain.len(),
        "Credential is valid"
    );
    Ok(())
}

pub fn validate_credential_now(
    credential: &Credential,
    requirements: &Requirements,
) -> Result<(), ValidationError> {
    validate_credential(credential, requirements, Utc::now())
}
