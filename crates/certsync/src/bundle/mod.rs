//! Bundle: one save format's slots bound to live PEM stores.
//!
//! # Read precedence
//!
//! - private key: `private-key`, then `private-key-and-certificate`, then
//!   `all-in-one`; the first slot holding a decodable key wins.
//! - certificate: `certificate-chain`, `all-in-one`, `certificate`,
//!   `private-key-and-certificate`.
//! - intermediates: everything after the leaf in `certificate-chain` or
//!   `all-in-one`, otherwise `intermediate`, then `intermediate-pattern`.
//!
//! # Writes
//!
//! [`Bundle::set`] encodes the credential once and writes each configured slot
//! in [`SLOT_TABLE`](slots::SLOT_TABLE) order. Writes are not atomic: the first
//! failing slot stops the write and is reported as
//! [`BundleError::PartialWrite`].

use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::{debug, error, info, trace};

use certsync_config::{SaveFormat, SlotKind};

use crate::certificate::Certificate;
use crate::codec;
use crate::credential::Credential;
use crate::key::PrivateKeyMaterial;
use crate::store::PemStore;

mod error;
pub mod slots;

pub use error::BundleError;
pub use slots::Part;

use slots::{layout, SLOT_TABLE};

const KEY_PRECEDENCE: [SlotKind; 3] = [
    SlotKind::PrivateKey,
    SlotKind::PrivateKeyAndCertificate,
    SlotKind::AllInOne,
];

const CERTIFICATE_PRECEDENCE: [SlotKind; 4] = [
    SlotKind::CertificateChain,
    SlotKind::AllInOne,
    SlotKind::Certificate,
    SlotKind::PrivateKeyAndCertificate,
];

/// The credential as materialized by one save format.
pub struct Bundle {
    name: String,
    slots: BTreeMap<SlotKind, PemStore>,
    cached: Mutex<Option<Credential>>,
}

impl Bundle {
    /// An empty bundle; add slots with [`Bundle::with_slot`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: BTreeMap::new(),
            cached: Mutex::new(None),
        }
    }

    pub fn with_slot(mut self, kind: SlotKind, store: PemStore) -> Self {
        self.slots.insert(kind, store);
        self
    }

    /// Bind every configured slot of `format` to a file store.
    ///
    /// # Errors
    ///
    /// Fails when a slot folder is missing or a pattern is malformed.
    pub fn from_save_format(format: &SaveFormat) -> Result<Self, BundleError> {
        Self::build(format, false)
    }

    /// Like [`Bundle::from_save_format`], but single-file slots are read
    /// from disk only once. Suitable when nothing else writes the files while
    /// the bundle is alive.
    pub fn from_save_format_cached(format: &SaveFormat) -> Result<Self, BundleError> {
        Self::build(format, true)
    }

    fn build(format: &SaveFormat, cached: bool) -> Result<Self, BundleError> {
        let mut bundle = Bundle::new(&format.name);

        for kind in format.configured_slots() {
            let (Some(path), Some(mode)) = (format.slot_path(kind), format.slot_mode(kind)) else {
                continue;
            };

            let store = if kind.is_pattern() {
                PemStore::pattern(&path, mode)
            } else if cached {
                PemStore::cached_file(&path, mode)
            } else {
                PemStore::file(&path, mode)
            }
            .map_err(|source| BundleError::Open {
                format: format.name.clone(),
                slot: kind,
                source,
            })?;

            trace!(bundle = %format.name, slot = %kind, path = %path.display(), mode = %mode, "Bound slot");
            bundle.slots.insert(kind, store);
        }

        debug!(bundle = %bundle.name, slots = bundle.slots.len(), "Created bundle");
        Ok(bundle)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn configured_slots(&self) -> impl Iterator<Item = SlotKind> + '_ {
        self.slots.keys().copied()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The private key, following the key read precedence.
    pub fn private_key(&self) -> Result<Option<PrivateKeyMaterial>, BundleError> {
        for kind in KEY_PRECEDENCE {
            if let Some(key) = self.first_key_in(kind)? {
                trace!(bundle = %self.name, slot = %kind, "Private key found");
                return Ok(Some(key));
            }
        }
        Ok(None)
    }

    /// The leaf certificate, following the certificate read precedence.
    pub fn certificate(&self) -> Result<Option<Certificate>, BundleError> {
        for kind in CERTIFICATE_PRECEDENCE {
            if let Some(cert) = self.certificates_in(kind)?.into_iter().next() {
                trace!(bundle = %self.name, slot = %kind, "Certificate found");
                return Ok(Some(cert));
            }
        }
        Ok(None)
    }

    /// The intermediates, or `None` when no slot yields any certificate.
    pub fn intermediates(&self) -> Result<Option<Vec<Certificate>>, BundleError> {
        for kind in [SlotKind::CertificateChain, SlotKind::AllInOne] {
            let certs = self.certificates_in(kind)?;
            if !certs.is_empty() {
                return Ok(Some(certs.into_iter().skip(1).collect()));
            }
        }
        for kind in [SlotKind::Intermediate, SlotKind::IntermediatePattern] {
            let certs = self.certificates_in(kind)?;
            if !certs.is_empty() {
                return Ok(Some(certs));
            }
        }
        Ok(None)
    }

    /// Read the full credential. An empty intermediate list is valid.
    pub fn get(&self) -> Result<Credential, BundleError> {
        let key = self
            .private_key()?
            .ok_or_else(|| BundleError::KeyNotFound {
                format: format!("save format '{}'", self.name),
            })?;
        let leaf = self
            .certificate()?
            .ok_or_else(|| BundleError::CertificateNotFound {
                format: format!("save format '{}'", self.name),
            })?;

        let mut chain = vec![leaf];
        chain.extend(self.intermediates()?.unwrap_or_default());

        let credential = Credential::new(key, chain);
        *self.cached.lock() = Some(credential.clone());
        Ok(credential)
    }

    /// The credential last read or written through this bundle.
    pub fn cached(&self) -> Option<Credential> {
        self.cached.lock().clone()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Write `key` and `chain` to every configured slot.
    pub fn set(&self, key: &PrivateKeyMaterial, chain: &[Certificate]) -> Result<(), BundleError> {
        if chain.is_empty() {
            return Err(BundleError::EmptyChain);
        }

        let mut blocks = Vec::with_capacity(chain.len() + 1);
        blocks.push(codec::private_key_to_block(key)?);
        blocks.extend(codec::certificates_to_blocks(chain));

        *self.cached.lock() = None;

        for slot in &SLOT_TABLE {
            let Some(store) = self.slots.get(&slot.kind) else {
                continue;
            };

            let selected = slot.selection.apply(&blocks);
            store.save(selected).map_err(|source| {
                error!(
                    bundle = %self.name,
                    slot = %slot.kind,
                    error = %source,
                    "Slot write failed, bundle is partially written"
                );
                BundleError::PartialWrite {
                    slot: slot.kind,
                    source,
                }
            })?;
            debug!(bundle = %self.name, slot = %slot.kind, blocks = selected.len(), "Wrote slot");
        }

        *self.cached.lock() = Some(Credential::new(key.clone(), chain.to_vec()));
        info!(bundle = %self.name, slots = self.slots.len(), "Stored credential");
        Ok(())
    }

    // =========================================================================
    // Sync predicates
    // =========================================================================

    pub fn should_have(&self, part: Part) -> bool {
        self.slots.keys().any(|kind| layout(*kind).holds(part))
    }

    pub fn should_have_private_key(&self) -> bool {
        self.should_have(Part::PrivateKey)
    }

    pub fn should_have_certificate(&self) -> bool {
        self.should_have(Part::Certificate)
    }

    pub fn should_have_intermediates(&self) -> bool {
        self.should_have(Part::Intermediates)
    }

    /// Whether the slots of this bundle disagree with each other.
    ///
    /// For each part, every slot holding it is decoded. The bundle needs a
    /// sync when two slots hold different values, or when fewer slots yield
    /// the part than are configured for it. Intermediates are compared as
    /// ordered lists; when no slot yields any, the chain is leaf-only and the
    /// slots agree.
    pub fn need_sync(&self) -> Result<bool, BundleError> {
        let holding = |part: Part| -> Vec<SlotKind> {
            self.configured_slots()
                .filter(|kind| layout(*kind).holds(part))
                .collect()
        };

        let key_slots = holding(Part::PrivateKey);
        let mut keys = Vec::new();
        for kind in &key_slots {
            keys.extend(self.first_key_in(*kind)?);
        }
        if disagree(key_slots.len(), &keys) {
            debug!(bundle = %self.name, part = %Part::PrivateKey, "Slots disagree");
            return Ok(true);
        }

        let cert_slots = holding(Part::Certificate);
        let mut certs = Vec::new();
        for kind in &cert_slots {
            certs.extend(self.certificates_in(*kind)?.into_iter().next());
        }
        if disagree(cert_slots.len(), &certs) {
            debug!(bundle = %self.name, part = %Part::Certificate, "Slots disagree");
            return Ok(true);
        }

        let intermediate_slots = holding(Part::Intermediates);
        let mut intermediates = Vec::new();
        for kind in &intermediate_slots {
            let found = self.intermediates_in(*kind)?;
            if !found.is_empty() {
                intermediates.push(found);
            }
        }
        if !intermediates.is_empty() && disagree(intermediate_slots.len(), &intermediates) {
            debug!(bundle = %self.name, part = %Part::Intermediates, "Slots disagree");
            return Ok(true);
        }

        trace!(bundle = %self.name, "Slots agree");
        Ok(false)
    }

    // =========================================================================
    // Per-slot decoding
    // =========================================================================

    fn first_key_in(&self, kind: SlotKind) -> Result<Option<PrivateKeyMaterial>, BundleError> {
        let Some(store) = self.slots.get(&kind) else {
            return Ok(None);
        };
        let decoded = store.load_private_keys().map_err(|source| BundleError::Read {
            store: store.label().to_string(),
            source,
        })?;
        Ok(decoded.values.into_iter().next())
    }

    fn certificates_in(&self, kind: SlotKind) -> Result<Vec<Certificate>, BundleError> {
        let Some(store) = self.slots.get(&kind) else {
            return Ok(Vec::new());
        };
        let decoded = store.load_certificates().map_err(|source| BundleError::Read {
            store: store.label().to_string(),
            source,
        })?;
        Ok(decoded.values)
    }

    /// Intermediates held by one slot: everything after the leaf for slots
    /// that also hold the leaf.
    fn intermediates_in(&self, kind: SlotKind) -> Result<Vec<Certificate>, BundleError> {
        let certs = self.certificates_in(kind)?;
        if layout(kind).holds(Part::Certificate) {
            Ok(certs.into_iter().skip(1).collect())
        } else {
            Ok(certs)
        }
    }
}

impl std::fmt::Debug for Bundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bundle")
            .field("name", &self.name)
            .field("slots", &self.slots.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn disagree<T: PartialEq>(configured: usize, values: &[T]) -> bool {
    values.len() != configured || values.windows(2).any(|pair| pair[0] != pair[1])
}
