//! PEM block storage over a multi byte store.

use std::path::Path;

use pem::Pem;
use tracing::{debug, trace, warn};

use certsync_common::{
    CachedStore, FileMode, FileStore, MemoryStore, MultiByteStore, PatternFileStore,
    SingleBlobAdapter, StorageError,
};

use crate::certificate::Certificate;
use crate::codec::{self, Decoded, CERTIFICATE_TAG};
use crate::key::PrivateKeyMaterial;

/// Ordered PEM blocks persisted through a [`MultiByteStore`].
///
/// Each saved block becomes one element of the underlying store: a single
/// file adapter concatenates them, a pattern store writes one file each.
pub struct PemStore {
    label: String,
    inner: Box<dyn MultiByteStore>,
}

impl PemStore {
    pub fn new(label: impl Into<String>, inner: impl MultiByteStore + 'static) -> Self {
        Self {
            label: label.into(),
            inner: Box::new(inner),
        }
    }

    /// Blocks stored in a single file.
    pub fn file(path: impl AsRef<Path>, mode: FileMode) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let store = FileStore::new(path, mode)?;
        Ok(Self::new(path.display().to_string(), SingleBlobAdapter::new(store)))
    }

    /// Blocks stored in a single file, read once and then served from memory.
    pub fn cached_file(path: impl AsRef<Path>, mode: FileMode) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let store = CachedStore::new(FileStore::new(path, mode)?);
        Ok(Self::new(path.display().to_string(), SingleBlobAdapter::new(store)))
    }

    /// Blocks stored one per file, numbered through a `{n}` pattern.
    pub fn pattern(pattern: impl AsRef<Path>, mode: FileMode) -> Result<Self, StorageError> {
        let pattern = pattern.as_ref();
        let store = PatternFileStore::new(pattern, mode)?;
        Ok(Self::new(pattern.display().to_string(), store))
    }

    /// Blocks held in memory, optionally seeded with PEM text.
    pub fn memory(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let store = if data.is_empty() {
            MemoryStore::new()
        } else {
            MemoryStore::with_data(data)
        };
        Self::new("memory", SingleBlobAdapter::new(store))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Load all blocks in storage order. `None` when nothing is stored.
    pub fn load(&self) -> Result<Option<Vec<Pem>>, StorageError> {
        let Some(elements) = self.inner.load()? else {
            trace!(store = %self.label, "No PEM data stored");
            return Ok(None);
        };

        let mut blocks = Vec::new();
        for element in &elements {
            let decoded = codec::blocks_from_bytes(element);
            for (index, error) in &decoded.errors {
                warn!(store = %self.label, block = index, error = %error, "Skipping unreadable PEM block");
            }
            blocks.extend(decoded.values);
        }

        debug!(store = %self.label, blocks = blocks.len(), "Loaded PEM blocks");
        Ok(Some(blocks))
    }

    /// Replace the stored blocks. An empty list deletes the backing data.
    pub fn save(&self, blocks: &[Pem]) -> Result<(), StorageError> {
        if blocks.is_empty() {
            debug!(store = %self.label, "No PEM blocks to store, deleting");
            return self.inner.delete();
        }

        self.inner.save(&codec::blocks_to_bytes(blocks))?;
        debug!(store = %self.label, blocks = blocks.len(), "Saved PEM blocks");
        Ok(())
    }

    pub fn delete(&self) -> Result<(), StorageError> {
        self.inner.delete()
    }

    /// Decode every private key block.
    pub fn load_private_keys(&self) -> Result<Decoded<PrivateKeyMaterial>, StorageError> {
        let blocks = self.load()?.unwrap_or_default();
        let keys: Vec<Pem> = blocks
            .into_iter()
            .filter(|block| block.tag() != CERTIFICATE_TAG)
            .collect();
        let decoded = codec::private_keys_from_blocks(&keys);
        self.log_errors("private key", &decoded);
        Ok(decoded)
    }

    /// Decode every certificate block.
    pub fn load_certificates(&self) -> Result<Decoded<Certificate>, StorageError> {
        let blocks = self.load()?.unwrap_or_default();
        let certs: Vec<Pem> = blocks
            .into_iter()
            .filter(|block| !codec::is_private_key_tag(block.tag()))
            .collect();
        let decoded = codec::certificates_from_blocks(&certs);
        self.log_errors("certificate", &decoded);
        Ok(decoded)
    }

    fn log_errors<T>(&self, kind: &str, decoded: &Decoded<T>) {
        for (index, error) in &decoded.errors {
            warn!(
                store = %self.label,
                kind = kind,
                block = index,
                error = %error,
                "Failed to decode PEM block"
            );
        }
    }
}

impl std::fmt::Debug for PemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PemStore")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
