//! Storage module for persisting scrape results
//!
//! This module handles:
//! - SQLite database initialization and schema management
//! - Idempotent listing upserts keyed by URL
//! - Scrape run history with a retention cap
//! - Raw markup artifacts on the filesystem

mod artifacts;
mod schema;
mod sqlite;
mod traits;

pub use artifacts::{artifact_key, FsArtifactStore};
pub use sqlite::SqliteStorage;
pub use traits::{ArtifactStore, Storage, StorageError, StorageResult};

use crate::HomefinderError;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Storage handle shared between the coordinator and its workers
pub type SharedStorage = Arc<Mutex<dyn Storage + Send>>;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
/// * `history_retention` - Maximum number of scrape runs kept
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(HomefinderError)` - Failed to initialize storage
pub fn open_storage(path: &Path, history_retention: usize) -> Result<SqliteStorage, HomefinderError> {
    SqliteStorage::new(path, history_retention)
}

/// Wraps a storage backend for sharing across tasks
pub fn share<S: Storage + Send + 'static>(storage: S) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}
