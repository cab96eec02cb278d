//! # Meta-Exchange Storage Crate
//!
//! This crate loads exchange snapshots before a run and writes the mutated
//! ones back afterwards. It is the only place that knows about the on-disk
//! file layout.
//!
//! ## Public API
//!
//! - `SnapshotSource` / `SnapshotSink`: The collaborator contracts the binary drives.
//! - `JsonDirectoryStore`: One JSON document per exchange in a directory.
//! - `ExchangeRecord`: The file layout, convertible to and from `ExchangeSnapshot`.
//! - `StorageError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod error;
pub mod records;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use error::StorageError;
pub use records::ExchangeRecord;
pub use store::{JsonDirectoryStore, SnapshotSink, SnapshotSource};
