//! Shared building blocks for certsync.
//!
//! The only thing the certificate core knows about the file system is the
//! byte storage contract defined here: load, save and delete raw bytes, with
//! "no data" reported as `Ok(None)` rather than as an error.
//!
//! # Stores
//!
//! - [`storage::FileStore`] - one file on disk
//! - [`storage::PatternFileStore`] - numbered files matching a `{n}` pattern
//! - [`storage::MemoryStore`] - in-memory bytes, used for tests and for
//!   decoding material that never touches the disk
//! - [`storage::CachedStore`] - read-through cache over another byte store
//! - [`storage::SingleBlobAdapter`] - presents a single byte store as a
//!   one-element multi store

pub mod storage;

pub use storage::{
    ByteStore, CachedStore, FileMode, FileStore, MemoryStore, MultiByteStore, PatternFileStore,
    SingleBlobAdapter, StorageError, NUMBER_PLACEHOLDER,
};
