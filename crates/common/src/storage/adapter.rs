use super::{ByteStore, MultiByteStore, StorageError};

/// Presents a single byte store as a multi store.
///
/// Saving concatenates every element with no separator; loading returns the
/// whole resource as one element.
#[derive(Debug)]
pub struct SingleBlobAdapter<S> {
    inner: S,
}

impl<S: ByteStore> SingleBlobAdapter<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: ByteStore> MultiByteStore for SingleBlobAdapter<S> {
    fn load(&self) -> Result<Option<Vec<Vec<u8>>>, StorageError> {
        Ok(self.inner.load()?.map(|bytes| vec![bytes]))
    }

    fn save(&self, data: &[Vec<u8>]) -> Result<(), StorageError> {
        self.inner.save(&data.concat())
    }

    fn delete(&self) -> Result<(), StorageError> {
        self.inner.delete()
    }
}
