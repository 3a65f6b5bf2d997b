//! Cache backing stores
//!
//! A store maps (content digest, build identifier) to a previously computed
//! feature record. Entries are write-once; re-inserting an existing key is a
//! no-op. Inserts must be atomic from a concurrent reader's perspective.

use crate::error::{AudioprintError, Result};
use crate::types::FeatureRecord;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::debug;

/// Addressable store keyed by (content digest, build identifier)
pub trait CacheStore: Send + Sync {
    fn lookup(&self, digest: &str, build_id: &str) -> Result<Option<FeatureRecord>>;
    fn insert(&self, digest: &str, build_id: &str, record: &FeatureRecord) -> Result<()>;

    /// Name of this store (for logging)
    fn name(&self) -> &'static str;
}

// =============================================================================
// Filesystem store
// =============================================================================

/// One serialized record per cache entry, named `<digest>-<build_id>.json`.
///
/// Writes go through a unique temp file followed by an atomic rename, so a
/// concurrent reader sees either no entry or a complete one. Bumping the
/// build identifier leaves old entries unreachable rather than deleted.
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| AudioprintError::CacheError(format!(
                "cannot create cache directory {}: {}",
                dir.display(),
                e
            )))?;
        debug!("Cache directory: {}", dir.display());
        Ok(Self { dir })
    }

    fn entry_path(&self, digest: &str, build_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}-{}.json", digest, sanitize_key(build_id)))
    }
}

/// Restrict build identifiers to filename-safe characters
fn sanitize_key(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl CacheStore for DirectoryStore {
    fn lookup(&self, digest: &str, build_id: &str) -> Result<Option<FeatureRecord>> {
        let path = self.entry_path(digest, build_id);
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path).map_err(|e| {
            AudioprintError::CacheError(format!("cannot open {}: {}", path.display(), e))
        })?;
        let record: FeatureRecord =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| {
                AudioprintError::CacheError(format!("corrupt entry {}: {}", path.display(), e))
            })?;
        Ok(Some(record))
    }

    fn insert(&self, digest: &str, build_id: &str, record: &FeatureRecord) -> Result<()> {
        let path = self.entry_path(digest, build_id);
        // Write-once: an existing entry for this key already holds the same
        // computation, so re-insert is a no-op.
        if path.exists() {
            return Ok(());
        }

        let temp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| {
            AudioprintError::CacheError(format!("cannot create temp entry: {}", e))
        })?;

        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, record).map_err(|e| {
                AudioprintError::CacheError(format!("cannot serialize entry: {}", e))
            })?;
            writer.flush().map_err(|e| {
                AudioprintError::CacheError(format!("cannot flush entry: {}", e))
            })?;
        }

        // Atomic rename: concurrent inserts of the same key race benignly,
        // last rename wins with identical content.
        temp.persist(&path).map_err(|e| {
            AudioprintError::CacheError(format!("cannot persist {}: {}", path.display(), e))
        })?;

        debug!("Cache entry written: {}", path.display());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "directory"
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Per-run map used when persistent caching is disabled
///
/// Still provides the at-most-once guarantee for duplicate content within a
/// single batch while persisting nothing.
#[derive(Default)]
pub struct MemoryStore {
    map: RwLock<HashMap<(String, String), FeatureRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn lookup(&self, digest: &str, build_id: &str) -> Result<Option<FeatureRecord>> {
        let map = self
            .map
            .read()
            .map_err(|_| AudioprintError::CacheError("poisoned cache lock".to_string()))?;
        Ok(map.get(&(digest.to_string(), build_id.to_string())).cloned())
    }

    fn insert(&self, digest: &str, build_id: &str, record: &FeatureRecord) -> Result<()> {
        let mut map = self
            .map
            .write()
            .map_err(|_| AudioprintError::CacheError("poisoned cache lock".to_string()))?;
        map.entry((digest.to_string(), build_id.to_string()))
            .or_insert_with(|| record.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FeatureSet, RecordMetadata};
    use tempfile::TempDir;

    fn sample_record(mfcc: Vec<f32>) -> FeatureRecord {
        FeatureRecord::success(
            RecordMetadata::new("a.mp3", 1, 1024, false, Some("abcd".into()), "test"),
            FeatureSet {
                mfcc,
                spectral_contrast: None,
                chroma: None,
                tempo: Some(120.0),
            },
        )
    }

    #[test]
    fn directory_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();

        assert!(store.lookup("abcd", "v1").unwrap().is_none());

        let record = sample_record(vec![1.0, 2.0, 3.0]);
        store.insert("abcd", "v1", &record).unwrap();

        let loaded = store.lookup("abcd", "v1").unwrap().unwrap();
        assert_eq!(loaded.features.unwrap().mfcc, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn reinsert_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();

        let record = sample_record(vec![1.0]);
        store.insert("abcd", "v1", &record).unwrap();
        // A second insert for the same key must not error or corrupt the entry
        store.insert("abcd", "v1", &record).unwrap();

        let loaded = store.lookup("abcd", "v1").unwrap().unwrap();
        assert_eq!(loaded.features.unwrap().mfcc, vec![1.0]);
    }

    #[test]
    fn build_id_is_part_of_the_key() {
        let dir = TempDir::new().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();

        store.insert("abcd", "v1", &sample_record(vec![1.0])).unwrap();

        // Same digest, bumped build identifier: miss, old entry untouched
        assert!(store.lookup("abcd", "v2").unwrap().is_none());
        assert!(store.lookup("abcd", "v1").unwrap().is_some());
    }

    #[test]
    fn corrupt_entry_is_a_cache_error() {
        let dir = TempDir::new().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();

        std::fs::write(store.entry_path("abcd", "v1"), b"{not json").unwrap();

        let err = store.lookup("abcd", "v1").unwrap_err();
        assert!(err.is_cache_error());
    }

    #[test]
    fn build_id_is_sanitized_for_filenames() {
        let dir = TempDir::new().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();

        store
            .insert("abcd", "feature/x 1", &sample_record(vec![1.0]))
            .unwrap();
        assert!(store.lookup("abcd", "feature/x 1").unwrap().is_some());
    }

    #[test]
    fn memory_store_roundtrip_and_idempotence() {
        let store = MemoryStore::new();
        assert!(store.lookup("abcd", "v1").unwrap().is_none());

        store.insert("abcd", "v1", &sample_record(vec![2.0])).unwrap();
        store.insert("abcd", "v1", &sample_record(vec![9.0])).unwrap();

        // First write wins, re-insert is a no-op
        let loaded = store.lookup("abcd", "v1").unwrap().unwrap();
        assert_eq!(loaded.features.unwrap().mfcc, vec![2.0]);
    }
}
