pub mod error;
pub mod models;
pub mod queries;

pub use error::{DbError, Result};
pub use models::{ChirpRow, DbStructure, UserRow};

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tempfile::NamedTempFile;
use tracing::{debug, info};

/// File-backed document store.
///
/// The whole aggregate lives in one JSON file. Every call loads the file,
/// and every mutation rewrites it in full while holding the write lock, so
/// readers always observe the last completed write and nothing is cached.
pub struct Database {
    path: PathBuf,
    lock: RwLock<()>,
}

impl Database {
    /// Open the store at `path`, creating an empty aggregate if none exists.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Self {
            path: path.to_path_buf(),
            lock: RwLock::new(()),
        };
        db.ensure()?;

        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against a freshly loaded aggregate under the shared lock.
    pub fn with_read<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&DbStructure) -> Result<T>,
    {
        let _guard = self.lock.read().map_err(|_| DbError::LockPoisoned)?;
        let structure = self.load()?;
        f(&structure)
    }

    /// Load, mutate and persist the aggregate under the exclusive lock.
    /// Nothing is written when `f` fails.
    pub fn with_write<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut DbStructure) -> Result<T>,
    {
        let _guard = self.lock.write().map_err(|_| DbError::LockPoisoned)?;
        let mut structure = self.load()?;
        let value = f(&mut structure)?;
        self.persist(&structure)?;
        Ok(value)
    }

    fn ensure(&self) -> Result<()> {
        let _guard = self.lock.write().map_err(|_| DbError::LockPoisoned)?;
        match fs::metadata(&self.path) {
            Ok(_) => {
                // Fail fast on a corrupt file instead of on the first request.
                self.load()?;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(self.dir())?;
                self.persist(&DbStructure::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn load(&self) -> Result<DbStructure> {
        let data = fs::read(&self.path)?;
        let structure = serde_json::from_slice(&data)?;
        Ok(structure)
    }

    /// Write to a sibling temp file, fsync, then rename over the real file so
    /// a crash leaves either the old or the new aggregate on disk.
    fn persist(&self, structure: &DbStructure) -> Result<()> {
        let data = serde_json::to_vec(structure)?;

        let mut tmp = NamedTempFile::new_in(self.dir())?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!("Persisted {} bytes to {}", data.len(), self.path.display());
        Ok(())
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}
