//! Numbered multi-file byte store.
//!
//! A pattern such as `/etc/ssl/chain{n}.pem` maps element `i` (1-based) of a
//! list to `chain{i}.pem`, zero-padded to the digit width of the list length:
//! ten elements produce `chain01.pem` .. `chain10.pem`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use super::file::{ensure_folder, parent_folder};
use super::{ByteStore, FileMode, FileStore, MultiByteStore, StorageError};

/// Placeholder replaced by the element number in a file pattern.
pub const NUMBER_PLACEHOLDER: &str = "{n}";

/// Multi-file store addressed by a `{n}` file name pattern.
#[derive(Debug, Clone)]
pub struct PatternFileStore {
    folder: PathBuf,
    prefix: String,
    suffix: String,
    mode: FileMode,
}

impl PatternFileStore {
    /// Create a store from a pattern with exactly one `{n}` in its file name.
    ///
    /// # Errors
    ///
    /// Fails when the placeholder count is wrong, the placeholder sits in the
    /// folder part, or the folder does not exist.
    pub fn new(pattern: impl AsRef<Path>, mode: FileMode) -> Result<Self, StorageError> {
        let pattern = pattern.as_ref();
        let display = pattern.display().to_string();

        let file_name = pattern
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| StorageError::InvalidPattern {
                pattern: display.clone(),
                reason: "missing or non UTF-8 file name".to_string(),
            })?;

        let folder = parent_folder(pattern);
        if folder.to_string_lossy().contains(NUMBER_PLACEHOLDER) {
            return Err(StorageError::InvalidPattern {
                pattern: display,
                reason: format!("{} is only allowed in the file name", NUMBER_PLACEHOLDER),
            });
        }

        let (prefix, suffix) = split_pattern(file_name).ok_or_else(|| {
            StorageError::InvalidPattern {
                pattern: display.clone(),
                reason: format!("expected exactly one {} placeholder", NUMBER_PLACEHOLDER),
            }
        })?;

        ensure_folder(folder)?;

        Ok(Self {
            folder: folder.to_path_buf(),
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            mode,
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Path of element `index` (1-based) in a list of `total` elements.
    pub fn path_for(&self, total: usize, index: usize) -> PathBuf {
        self.folder.join(file_name_for(&self.prefix, &self.suffix, total, index))
    }

    /// Files currently matching the pattern, ordered by their number.
    pub fn matching_files(&self) -> Result<Vec<PathBuf>, StorageError> {
        let entries = fs::read_dir(&self.folder).map_err(|e| StorageError::io(&self.folder, e))?;

        let mut matches = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.folder, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| StorageError::io(entry.path(), e))?;
            if file_type.is_dir() {
                continue;
            }

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(number) = match_number(&self.prefix, &self.suffix, name) {
                matches.push((number, name.to_string(), entry.path()));
            }
        }

        matches.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        Ok(matches.into_iter().map(|(_, _, path)| path).collect())
    }
}

impl MultiByteStore for PatternFileStore {
    fn load(&self) -> Result<Option<Vec<Vec<u8>>>, StorageError> {
        let mut data = Vec::new();
        for path in self.matching_files()? {
            let store = FileStore::new(&path, self.mode)?;
            if let Some(bytes) = store.load()? {
                if !bytes.is_empty() {
                    data.push(bytes);
                }
            }
        }

        trace!(folder = %self.folder.display(), files = data.len(), "Loaded pattern files");

        if data.is_empty() {
            Ok(None)
        } else {
            Ok(Some(data))
        }
    }

    fn save(&self, data: &[Vec<u8>]) -> Result<(), StorageError> {
        self.delete()?;

        let total = data.len();
        for (offset, bytes) in data.iter().enumerate() {
            let store = FileStore::new(self.path_for(total, offset + 1), self.mode)?;
            store.save(bytes)?;
        }

        debug!(folder = %self.folder.display(), files = total, "Saved pattern files");
        Ok(())
    }

    fn delete(&self) -> Result<(), StorageError> {
        for path in self.matching_files()? {
            FileStore::new(&path, self.mode)?.delete()?;
        }
        Ok(())
    }
}

fn split_pattern(file_name: &str) -> Option<(&str, &str)> {
    let mut parts = file_name.split(NUMBER_PLACEHOLDER);
    let prefix = parts.next()?;
    let suffix = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some((prefix, suffix))
}

fn file_name_for(prefix: &str, suffix: &str, total: usize, index: usize) -> String {
    let width = total.to_string().len();
    format!("{prefix}{index:0width$}{suffix}")
}

fn match_number(prefix: &str, suffix: &str, name: &str) -> Option<u64> {
    let middle = name.strip_prefix(prefix)?.strip_suffix(suffix)?;
    if middle.is_empty() || !middle.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    middle.parse().ok()
}
