//! File system path validation
//!
//! Checks that every folder a slot writes into exists and that no two slots
//! claim the same file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{ErrorCategory, ValidationError, ValidationResult};
use crate::Config;

/// Validate slot folders and detect files claimed twice
pub fn validate_paths(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();
    let mut claimed: HashMap<PathBuf, String> = HashMap::new();

    for format in &config.save_formats {
        for kind in format.configured_slots() {
            let Some(path) = format.slot_path(kind) else {
                continue;
            };

            let folder = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            if !folder.is_dir() {
                result.add_error(ValidationError::new(
                    ErrorCategory::Path,
                    format!(
                        "Folder {} for slot '{}' of save format '{}' does not exist",
                        folder.display(),
                        kind,
                        format.name
                    ),
                ));
            }

            let owner = format!("'{}' of save format '{}'", kind, format.name);
            if let Some(previous) = claimed.insert(path.clone(), owner.clone()) {
                result.add_error(ValidationError::new(
                    ErrorCategory::Path,
                    format!(
                        "File {} is used by both slot {} and slot {}",
                        path.display(),
                        previous,
                        owner
                    ),
                ));
            }
        }
    }

    result
}
