//! Single file byte store.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{ByteStore, StorageError};

/// Unix permission bits applied to files a store writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileMode(u32);

impl FileMode {
    /// Owner read/write only, used for anything holding a private key.
    pub const PRIVATE: FileMode = FileMode(0o600);

    /// World readable, used for public certificate material.
    pub const PUBLIC: FileMode = FileMode(0o644);

    pub const fn new(bits: u32) -> Self {
        Self(bits & 0o7777)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether group or other users get any access.
    pub const fn is_group_or_world_accessible(self) -> bool {
        self.0 & 0o077 != 0
    }
}

impl Default for FileMode {
    fn default() -> Self {
        Self::PRIVATE
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

/// Byte store backed by one file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    mode: FileMode,
}

impl FileStore {
    /// Create a store for `path`.
    ///
    /// # Errors
    ///
    /// Fails when the parent folder does not exist or the path has no file
    /// name.
    pub fn new(path: impl Into<PathBuf>, mode: FileMode) -> Result<Self, StorageError> {
        let path = path.into();
        if path.file_name().is_none() {
            return Err(StorageError::EmptyFileName(path));
        }
        ensure_folder(parent_folder(&path))?;

        Ok(Self { path, mode })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    /// Open for writing with the store's mode already applied, so the new
    /// content never sits under the umask's or the old file's permissions.
    #[cfg(unix)]
    fn open_for_write(&self) -> io::Result<File> {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(self.mode.bits())
            .open(&self.path)?;
        file.set_permissions(fs::Permissions::from_mode(self.mode.bits()))?;
        Ok(file)
    }

    #[cfg(not(unix))]
    fn open_for_write(&self) -> io::Result<File> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
    }
}

impl ByteStore for FileStore {
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(&self.path) {
            Ok(data) => {
                trace!(path = %self.path.display(), bytes = data.len(), "Loaded file");
                Ok(Some(data))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(path = %self.path.display(), "File absent");
                Ok(None)
            }
            Err(e) => Err(StorageError::io(&self.path, e)),
        }
    }

    fn save(&self, data: &[u8]) -> Result<(), StorageError> {
        if data.is_empty() {
            return self.delete();
        }

        self.open_for_write()
            .and_then(|mut file| file.write_all(data))
            .map_err(|e| StorageError::io(&self.path, e))?;

        debug!(
            path = %self.path.display(),
            bytes = data.len(),
            mode = %self.mode,
            "Saved file"
        );
        Ok(())
    }

    fn delete(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Deleted file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&self.path, e)),
        }
    }
}

pub(crate) fn parent_folder(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

pub(crate) fn ensure_folder(folder: &Path) -> Result<(), StorageError> {
    if folder.is_dir() {
        Ok(())
    } else {
        Err(StorageError::MissingFolder(folder.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_absent_file_is_no_data() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("cert.pem"), FileMode::PUBLIC).unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("cert.pem"), FileMode::PUBLIC).unwrap();

        store.save(b"hello").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some(&b"hello"[..]));
    }

    #[test]
    fn test_save_empty_deletes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("key.pem");
        let store = FileStore::new(&path, FileMode::PRIVATE).unwrap();

        store.save(b"secret").unwrap();
        assert!(path.exists());

        store.save(b"").unwrap();
        assert!(!path.exists());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_delete_absent_is_ok() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("missing.pem"), FileMode::PRIVATE).unwrap();
        store.delete().unwrap();
    }

    #[test]
    fn test_missing_folder_rejected() {
        let dir = TempDir::new().unwrap();
        let err = FileStore::new(dir.path().join("nope").join("a.pem"), FileMode::PUBLIC)
            .unwrap_err();
        assert!(matches!(err, StorageError::MissingFolder(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_permissions_applied() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("key.pem");
        let store = FileStore::new(&path, FileMode::new(0o640)).unwrap();
        store.save(b"secret").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[cfg(unix)]
    #[test]
    fn test_rewrite_tightens_existing_file_before_writing() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("key.pem");
        fs::write(&path, b"old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o666)).unwrap();

        let store = FileStore::new(&path, FileMode::PRIVATE).unwrap();
        let mut file = store.open_for_write().unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);

        file.write_all(b"secret").unwrap();
        drop(file);
        assert_eq!(store.load().unwrap().as_deref(), Some(&b"secret"[..]));
    }

    #[test]
    fn test_file_mode_display() {
        assert_eq!(FileMode::PRIVATE.to_string(), "0600");
        assert!(FileMode::PUBLIC.is_group_or_world_accessible());
        assert!(!FileMode::PRIVATE.is_group_or_world_accessible());
    }
}
