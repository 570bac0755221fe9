//! Keep one TLS credential materialized across several on-disk layouts.
//!
//! A credential (private key plus certificate chain, leaf first) is written
//! by every configured save format: a combined file for one consumer, split
//! key and chain files for another, numbered intermediate files for a
//! third. The first save format is canonical; [`sync::Synchronizer`]
//! reconciles the others with it and [`validation`] decides whether the
//! canonical credential is still usable.
//!
//! # Layers
//!
//! - [`codec`]: PEM blocks to and from [`Certificate`] and [`PrivateKeyMaterial`]
//! - [`store::PemStore`]: ordered PEM blocks over a byte store
//! - [`bundle::Bundle`]: one save format's slots
//! - [`sync::Synchronizer`]: all bundles, canonical first
//! - [`validation`]: chain order, expiry, key match and domain coverage
//! - [`app::renew`]: the renewal driver over a [`CertificateIssuer`]

pub mod app;
pub mod bundle;
pub mod certificate;
pub mod codec;
pub mod credential;
pub mod issuer;
pub mod key;
pub mod store;
pub mod sync;
pub mod validation;

#[cfg(test)]
pub(crate) mod testutil;

pub use bundle::{Bundle, BundleError};
pub use certificate::Certificate;
pub use codec::CodecError;
pub use credential::Credential;
pub use issuer::{CertificateIssuer, IssueRequest, PemFileIssuer};
pub use key::{KeyAlgorithm, PrivateKeyMaterial, PublicKeyMaterial};
pub use store::PemStore;
pub use sync::{SyncError, SyncReason, SyncReport, Synchronizer};
pub use validation::{Requirements, ValidationError};
