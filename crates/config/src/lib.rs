//! Configuration for certsync.
//!
//! Configuration is written in KDL:
//!
//! ```kdl
//! domains "example.com" "www.example.com"
//! email "admin@example.com"
//! cert-days-left-min 30
//! key-length 2048
//! root "/etc/ssl/app"
//!
//! save-format "nginx" {
//!     folder "nginx"
//!     certificate-chain "fullchain.pem" mode=0o644
//!     private-key "privkey.pem" mode=0o600
//! }
//! save-format "haproxy" {
//!     all-in-one "haproxy.pem"
//! }
//! ```
//!
//! The first save format is canonical: its files are the source of truth
//! when the others are synchronized.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

mod error;
pub mod kdl;
mod save_format;
pub mod validate;

pub use error::ConfigError;
pub use save_format::{SaveFormat, SlotConfig, SlotKind};
pub use validate::{ErrorCategory, ValidationError, ValidationResult, ValidationWarning};

/// Minimum days of validity a certificate must have left, by default.
pub const DEFAULT_CERT_DAYS_LEFT_MIN: u32 = 30;

/// Default RSA modulus size in bits.
pub const DEFAULT_KEY_LENGTH: u32 = 2048;

/// Top-level certsync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Domains the certificate must cover
    pub domains: Vec<String>,

    /// Contact email handed to the certificate issuer
    #[serde(default)]
    pub email: Option<String>,

    /// Renew when fewer days than this are left
    #[serde(default = "default_cert_days_left_min")]
    pub cert_days_left_min: u32,

    /// Minimum accepted RSA key size in bits
    #[serde(default = "default_key_length")]
    pub key_length: u32,

    /// Folder that relative save format folders are resolved against
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Save formats, canonical first
    #[serde(default)]
    pub save_formats: Vec<SaveFormat>,
}

fn default_cert_days_left_min() -> u32 {
    DEFAULT_CERT_DAYS_LEFT_MIN
}

fn default_key_length() -> u32 {
    DEFAULT_KEY_LENGTH
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domains: Vec::new(),
            email: None,
            cert_days_left_min: DEFAULT_CERT_DAYS_LEFT_MIN,
            key_length: DEFAULT_KEY_LENGTH,
            root: None,
            save_formats: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a KDL file.
    ///
    /// A relative `root` is resolved against the folder holding the file,
    /// then every save format folder is resolved against the root.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config = Self::from_kdl(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);

        info!(
            path = %path.display(),
            save_formats = config.save_formats.len(),
            domains = config.domains.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse configuration from KDL text without resolving paths.
    pub fn from_kdl(content: &str) -> Result<Self> {
        kdl::parse_config(content)
    }

    /// Resolve `root` against `base` and save format folders against `root`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let root = match &self.root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => base.join(root),
            None => base.to_path_buf(),
        };

        for format in &mut self.save_formats {
            format.resolve_against(&root);
            debug!(
                save_format = %format.name,
                folder = ?format.folder,
                "Resolved save format folder"
            );
        }
        self.root = Some(root);
    }

    /// Minimum remaining validity a certificate must have.
    pub fn min_remaining(&self) -> Duration {
        Duration::from_secs(u64::from(self.cert_days_left_min) * 24 * 3600)
    }

    /// The canonical save format, if any is configured.
    pub fn canonical_format(&self) -> Option<&SaveFormat> {
        self.save_formats.first()
    }

    /// Check the configuration, returning every problem found.
    pub fn validate(&self) -> Result<ValidationResult, ConfigError> {
        let result = validate::validate_config(self);
        if result.errors.is_empty() {
            Ok(result)
        } else {
            Err(ConfigError::Invalid(result.errors))
        }
    }
}
