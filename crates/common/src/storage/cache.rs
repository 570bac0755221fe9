//! Read-through cache over a byte store.

use parking_lot::Mutex;

use super::{ByteStore, StorageError};

/// Caches the last loaded or saved bytes of the wrapped store.
///
/// The cache is never invalidated by outside changes to the backing
/// resource; call [`CachedStore::clear`] to force the next load through.
#[derive(Debug)]
pub struct CachedStore<S> {
    inner: S,
    cached: Mutex<Option<Vec<u8>>>,
}

impl<S: ByteStore> CachedStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cached: Mutex::new(None),
        }
    }

    /// Drop cached bytes so the next load reads the backing store.
    pub fn clear(&self) {
        *self.cached.lock() = None;
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: ByteStore> ByteStore for CachedStore<S> {
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        let mut cached = self.cached.lock();
        if cached.is_none() {
            *cached = self.inner.load()?;
        }
        Ok(cached.clone())
    }

    fn save(&self, data: &[u8]) -> Result<(), StorageError> {
        self.inner.save(data)?;
        *self.cached.lock() = (!data.is_empty()).then(|| data.to_vec());
        Ok(())
    }

    fn delete(&self) -> Result<(), StorageError> {
        self.inner.delete()?;
        *self.cached.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_cache_serves_stale_until_cleared() {
        let backing = Arc::new(MemoryStore::with_data("v1"));
        let cached = CachedStore::new(backing.clone());

        assert_eq!(cached.load().unwrap(), Some(b"v1".to_vec()));

        backing.save(b"v2").unwrap();
        assert_eq!(cached.load().unwrap(), Some(b"v1".to_vec()));

        cached.clear();
        assert_eq!(cached.load().unwrap(), Some(b"v2".to_vec()));
    }

    #[test]
    fn test_save_and_delete_write_through() {
        let backing = Arc::new(MemoryStore::new());
        let cached = CachedStore::new(backing.clone());

        cached.save(b"data").unwrap();
        assert_eq!(backing.load().unwrap(), Some(b"data".to_vec()));

        cached.delete().unwrap();
        assert!(backing.load().unwrap().is_none());
        assert!(cached.load().unwrap().is_none());
    }
}
