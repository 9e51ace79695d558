//! Storage layer
//!
//! Handles persistence of the note collection to a local key-value medium.
//!
//! ## Architecture
//!
//! - **Backends** (`KvBackend`): raw string values under string keys, kept
//!   in memory, in one file per key, or in a SQLite table
//! - **Adapter** (`Storage`): JSON values with fallback to defaults on any
//!   read problem, and reported (non-fatal) write failures

pub mod adapter;
pub mod backend;
pub mod error;
pub mod file;
pub mod sqlite;

pub use adapter::{DynStorage, Storage};
pub use backend::{KvBackend, MemoryBackend};
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use sqlite::SqliteBackend;
