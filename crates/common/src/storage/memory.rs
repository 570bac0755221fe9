//! In-memory byte store.

use parking_lot::Mutex;

use super::{ByteStore, StorageError};

/// Byte store that keeps its data in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<Option<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `data`.
    pub fn with_data(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        Self {
            data: Mutex::new((!data.is_empty()).then_some(data)),
        }
    }
}

impl ByteStore for MemoryStore {
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.lock().clone())
    }

    fn save(&self, data: &[u8]) -> Result<(), StorageError> {
        if data.is_empty() {
            return self.delete();
        }
        *self.data.lock() = Some(data.to_vec());
        Ok(())
    }

    fn delete(&self) -> Result<(), StorageError> {
        *self.data.lock() = None;
        Ok(())
    }
}
