use thiserror::Error;

use certsync_common::StorageError;
use certsync_config::SlotKind;

use crate::codec::CodecError;

/// Errors raised by a [`Bundle`](super::Bundle).
#[derive(Debug, Error)]
pub enum BundleError {
    /// No slot yielded a decodable private key.
    #[error("no private key found in {format}")]
    KeyNotFound { format: String },

    /// No slot yielded a decodable certificate.
    #[error("no certificate found in {format}")]
    CertificateNotFound { format: String },

    /// A bundle is never written without a leaf certificate.
    #[error("refusing to store an empty certificate chain")]
    EmptyChain,

    /// A slot's backing store could not be created.
    #[error("failed to open slot '{slot}' of save format '{format}'")]
    Open {
        format: String,
        slot: SlotKind,
        #[source]
        source: StorageError,
    },

    #[error("failed to read {store}")]
    Read {
        store: String,
        #[source]
        source: StorageError,
    },

    /// Writing stopped at `slot`. Slots before it in write order keep the
    /// new content; the next sync repairs the rest.
    #[error("failed to write slot '{slot}', earlier slots were already written")]
    PartialWrite {
        slot: SlotKind,
        #[source]
        source: StorageError,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),
}
