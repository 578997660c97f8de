//! On-disk cache for artifact resolution results.
//!
//! Version-range listings and transitive closures are expensive to recompute
//! against a large repository, so [`LocalRepository`](crate::resolver::LocalRepository)
//! stores them here as JSON. The merge engine never reads this cache.
//!
//! A single coarse mutex serializes every read-modify-write of the cache file
//! within the process, and writes go through a temporary file plus rename so a
//! reader never sees a half-written file. There is no per-key locking, and two
//! processes may still compute the same entry twice.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

type Entries = BTreeMap<String, serde_json::Value>;

/// JSON-file-backed key/value cache.
#[derive(Debug)]
pub struct ResolutionCache {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ResolutionCache {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a cached value. A missing file or key is `Ok(None)`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let _guard = self.lock.lock().map_err(|_| Error::LockPoisoned {
            context: "resolution cache".to_string(),
        })?;
        let entries = self.read_entries()?;
        match entries.get(key) {
            Some(value) => {
                debug!("cache hit for {}", key);
                Ok(Some(serde_json::from_value(value.clone())?))
            }
            None => {
                debug!("cache miss for {}", key);
                Ok(None)
            }
        }
    }

    /// Store a value, replacing any previous value for `key`.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| Error::LockPoisoned {
            context: "resolution cache".to_string(),
        })?;
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), serde_json::to_value(value)?);
        self.write_entries(&entries)
    }

    /// Remove the cache file.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| Error::LockPoisoned {
            context: "resolution cache".to_string(),
        })?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn read_entries(&self) -> Result<Entries> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(
                    "ignoring unreadable cache file {}: {}",
                    self.path.display(),
                    e
                );
                Ok(Entries::new())
            }
        }
    }

    fn write_entries(&self, entries: &Entries) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::Cache {
                message: format!("Failed to create directory '{}': {}", parent.display(), e),
            })?;
        }
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&staging, &self.path).map_err(|e| Error::Cache {
            message: format!("Failed to replace '{}': {}", self.path.display(), e),
        })
    }
}
