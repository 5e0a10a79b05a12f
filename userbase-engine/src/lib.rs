//! Durable user storage using fjall

use fjall::{Config, Keyspace, PersistMode};
use parking_lot::{Mutex, MutexGuard};
use std::path::Path;
use std::sync::Arc;
use userbase_core::*;

pub mod users;

pub use users::*;

/// Storage engine wrapping a fjall keyspace
#[derive(Clone)]
pub struct StorageEngine {
    keyspace: Arc<Keyspace>,
    writer: Arc<Mutex<()>>,
}

impl StorageEngine {
    /// Create new storage engine at the given path
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let keyspace = Config::new(path)
            .open()
            .map_err(|e| UserbaseError::Storage(e.to_string()))?;

        Ok(StorageEngine {
            keyspace: Arc::new(keyspace),
            writer: Arc::new(Mutex::new(())),
        })
    }

    /// Create temporary storage engine for testing
    #[cfg(any(test, feature = "test-utils"))]
    pub fn temp() -> Result<(Self, tempfile::TempDir)> {
        let temp_dir = tempfile::tempdir()?;
        let engine = Self::new(temp_dir.path())?;
        Ok((engine, temp_dir))
    }

    /// Open the user table
    pub fn users(&self) -> Result<FjallUserStore> {
        FjallUserStore::open(self.clone())
    }

    pub(crate) fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    /// Serializes writers across every table handle of this engine
    pub(crate) fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.writer.lock()
    }

    /// Persist all changes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .map_err(|e| UserbaseError::Storage(e.to_string()))
    }
}
