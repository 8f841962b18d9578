//! Durable grant storage
//!
//! Persisted grants are written as one JSON document. Saves replace the
//! whole document through a temporary file and a rename, so a crash leaves
//! either the old or the new set on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use r_droid_core::Result;

use crate::grant::PersistedGrant;

/// Where persisted grants live between restarts
pub trait GrantStore: Send + Sync {
    fn load(&self) -> Result<Vec<PersistedGrant>>;

    fn save(&self, grants: &[PersistedGrant]) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GrantDocument {
    version: u32,
    grants: Vec<PersistedGrant>,
}

const DOCUMENT_VERSION: u32 = 1;

/// JSON file store
#[derive(Debug, Clone)]
pub struct JsonGrantStore {
    path: PathBuf,
}

impl JsonGrantStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GrantStore for JsonGrantStore {
    fn load(&self) -> Result<Vec<PersistedGrant>> {
        if !self.path.exists() {
            debug!("No grant store at {:?}", self.path);
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        let document: GrantDocument = serde_json::from_str(&content)?;
        debug!("Loaded {} persisted grants from {:?}", document.grants.len(), self.path);
        Ok(document.grants)
    }

    fn save(&self, grants: &[PersistedGrant]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let document = GrantDocument {
            version: DOCUMENT_VERSION,
            grants: grants.to_vec(),
        };
        let content = serde_json::to_string_pretty(&document)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;

        debug!("Saved {} persisted grants to {:?}", grants.len(), self.path);
        Ok(())
    }
}

/// In-memory store; clones share contents, which lets tests simulate a restart
#[derive(Debug, Clone, Default)]
pub struct MemoryGrantStore {
    grants: Arc<Mutex<Vec<PersistedGrant>>>,
}

impl MemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.grants.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.lock().is_empty()
    }
}

impl GrantStore for MemoryGrantStore {
    fn load(&self) -> Result<Vec<PersistedGrant>> {
        Ok(self.grants.lock().clone())
    }

    fn save(&self, grants: &[PersistedGrant]) -> Result<()> {
        *self.grants.lock() = grants.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::ModeFlags;
    use chrono::Utc;
    use r_droid_intent::Uri;
    use tempfile::TempDir;

    fn sample() -> PersistedGrant {
        PersistedGrant {
            uri: Uri::parse("content://notes/1").unwrap(),
            prefix: false,
            grantee_uid: 10_002,
            grantor_uid: 10_001,
            mode: ModeFlags::READ,
            persisted_at: Utc::now(),
        }
    }

    #[test]
    fn test_json_store_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonGrantStore::new(dir.path().join("grants.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_json_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = JsonGrantStore::new(dir.path().join("nested").join("grants.json"));
        let grants = vec![sample()];

        store.save(&grants).unwrap();
        assert_eq!(store.load().unwrap(), grants);
        assert!(!dir.path().join("nested").join("grants.json.tmp").exists());
    }

    #[test]
    fn test_json_store_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("grants.json");
        fs::write(&path, "not json").unwrap();
        assert!(JsonGrantStore::new(path).load().is_err());
    }

    #[test]
    fn test_memory_store_shared_between_clones() {
        let store = MemoryGrantStore::new();
        let other = store.clone();
        store.save(&[sample()]).unwrap();
        assert_eq!(other.len(), 1);
    }
}
