//! Save format definitions.
//!
//! A save format describes how one consumer expects the certificate bundle
//! to be laid out on disk: which of the seven slots exist, where their files
//! live and which permissions they get.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use certsync_common::FileMode;

/// One storage slot of a save format.
///
/// The declaration order is the order in which a bundle writes its slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotKind {
    /// Key followed by the full chain in one file
    AllInOne,
    /// Private key only
    PrivateKey,
    /// Leaf certificate only
    Certificate,
    /// Leaf followed by intermediates
    CertificateChain,
    /// Key followed by the leaf certificate
    PrivateKeyAndCertificate,
    /// Intermediates concatenated in one file
    Intermediate,
    /// Intermediates as numbered files
    IntermediatePattern,
}

impl SlotKind {
    pub const ALL: [SlotKind; 7] = [
        SlotKind::AllInOne,
        SlotKind::PrivateKey,
        SlotKind::Certificate,
        SlotKind::CertificateChain,
        SlotKind::PrivateKeyAndCertificate,
        SlotKind::Intermediate,
        SlotKind::IntermediatePattern,
    ];

    /// Node name used in KDL configuration.
    pub fn node_name(self) -> &'static str {
        match self {
            SlotKind::AllInOne => "all-in-one",
            SlotKind::PrivateKey => "private-key",
            SlotKind::Certificate => "certificate",
            SlotKind::CertificateChain => "certificate-chain",
            SlotKind::PrivateKeyAndCertificate => "private-key-and-certificate",
            SlotKind::Intermediate => "intermediate",
            SlotKind::IntermediatePattern => "intermediate-pattern",
        }
    }

    pub fn from_node_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.node_name() == name)
    }

    /// Whether files of this slot contain the private key.
    pub fn holds_private_key(self) -> bool {
        matches!(
            self,
            SlotKind::AllInOne | SlotKind::PrivateKey | SlotKind::PrivateKeyAndCertificate
        )
    }

    /// Whether the slot path is a `{n}` pattern rather than a file name.
    pub fn is_pattern(self) -> bool {
        matches!(self, SlotKind::IntermediatePattern)
    }

    pub fn default_mode(self) -> FileMode {
        if self.holds_private_key() {
            FileMode::PRIVATE
        } else {
            FileMode::PUBLIC
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.node_name())
    }
}

/// File name (or pattern) and permissions of a configured slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConfig {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<FileMode>,
}

impl SlotConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mode: None,
        }
    }

    pub fn with_mode(mut self, mode: FileMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// Named on-disk layout of the certificate bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveFormat {
    pub name: String,
    /// Folder that relative slot paths are resolved against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<PathBuf>,
    #[serde(default)]
    pub slots: BTreeMap<SlotKind, SlotConfig>,
}

impl SaveFormat {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            folder: None,
            slots: BTreeMap::new(),
        }
    }

    pub fn with_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn with_slot(mut self, kind: SlotKind, slot: SlotConfig) -> Self {
        self.slots.insert(kind, slot);
        self
    }

    pub fn slot(&self, kind: SlotKind) -> Option<&SlotConfig> {
        self.slots.get(&kind)
    }

    /// Full path of a slot, with the format folder applied.
    pub fn slot_path(&self, kind: SlotKind) -> Option<PathBuf> {
        let slot = self.slot(kind)?;
        Some(match &self.folder {
            Some(folder) => folder.join(&slot.path),
            None => slot.path.clone(),
        })
    }

    /// Effective permissions of a slot.
    pub fn slot_mode(&self, kind: SlotKind) -> Option<FileMode> {
        self.slot(kind)
            .map(|slot| slot.mode.unwrap_or_else(|| kind.default_mode()))
    }

    /// Configured slots in write order.
    pub fn configured_slots(&self) -> impl Iterator<Item = SlotKind> + '_ {
        self.slots.keys().copied()
    }

    /// Make a relative folder absolute against `root`.
    pub(crate) fn resolve_against(&mut self, root: &Path) {
        match &self.folder {
            Some(folder) if folder.is_relative() => self.folder = Some(root.join(folder)),
            None => self.folder = Some(root.to_path_buf()),
            _ => {}
        }
    }
}
