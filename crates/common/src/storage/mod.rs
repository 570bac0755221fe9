//! Byte storage contract and its implementations.

mod adapter;
mod cache;
mod error;
mod file;
mod memory;
mod pattern;

pub use adapter::SingleBlobAdapter;
pub use cache::CachedStore;
pub use error::StorageError;
pub use file::{FileMode, FileStore};
pub use memory::MemoryStore;
pub use pattern::{PatternFileStore, NUMBER_PLACEHOLDER};

/// Raw byte persistence for a single resource.
///
/// Absence of backing data is `Ok(None)`, never an error: callers treat it as
/// a legitimately empty slot.
pub trait ByteStore: Send + Sync {
    /// Load the stored bytes, or `None` when nothing is stored.
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the stored bytes. Saving zero-length data behaves as [`delete`].
    ///
    /// [`delete`]: ByteStore::delete
    fn save(&self, data: &[u8]) -> Result<(), StorageError>;

    /// Remove the stored bytes. Deleting absent data is not an error.
    fn delete(&self) -> Result<(), StorageError>;
}

/// Raw byte persistence for an ordered list of resources.
pub trait MultiByteStore: Send + Sync {
    /// Load every stored element in order, or `None` when nothing is stored.
    fn load(&self) -> Result<Option<Vec<Vec<u8>>>, StorageError>;

    /// Replace all stored elements with `data`.
    fn save(&self, data: &[Vec<u8>]) -> Result<(), StorageError>;

    /// Remove every stored element.
    fn delete(&self) -> Result<(), StorageError>;
}

impl<T: ByteStore + ?Sized> ByteStore for Box<T> {
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).load()
    }

    fn save(&self, data: &[u8]) -> Result<(), StorageError> {
        (**self).save(data)
    }

    fn delete(&self) -> Result<(), StorageError> {
        (**self).delete()
    }
}

impl<T: ByteStore + ?Sized> ByteStore for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).load()
    }

    fn save(&self, data: &[u8]) -> Result<(), StorageError> {
        (**self).save(data)
    }

    fn delete(&self) -> Result<(), StorageError> {
        (**self).delete()
    }
}
