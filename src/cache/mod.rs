//! Content-addressed result cache
//!
//! Maps (content digest, pipeline build identifier) to previously computed
//! feature records, giving at-most-once expensive computation per distinct
//! file content at a given pipeline version. Store failures degrade to
//! recomputation; they are logged and never surface as file failures.

pub mod digest;
pub mod store;

pub use digest::{content_digest, ContentDigest};
pub use store::{CacheStore, DirectoryStore, MemoryStore};

use crate::config::Settings;
use crate::error::Result;
use crate::types::FeatureRecord;
use tracing::warn;

/// Facade over the configured backing store
///
/// With caching enabled the store is a filesystem directory that persists
/// across runs; with `--no-cache` it is a per-run in-memory map, so
/// duplicate content within one batch is still computed at most once.
pub struct ResultCache {
    store: Box<dyn CacheStore>,
}

impl ResultCache {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let store: Box<dyn CacheStore> = if settings.cache_enabled {
            Box::new(DirectoryStore::open(&settings.cache_dir)?)
        } else {
            Box::new(MemoryStore::new())
        };
        Ok(Self { store })
    }

    pub fn with_store(store: Box<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Look up a previously computed record; store errors degrade to a miss
    pub fn lookup(&self, digest: &str, build_id: &str) -> Option<FeatureRecord> {
        match self.store.lookup(digest, build_id) {
            Ok(hit) => hit,
            Err(e) => {
                warn!("Cache lookup failed ({} store), recomputing: {}", self.store.name(), e);
                None
            }
        }
    }

    /// Insert a computed record; store errors are logged and ignored, since
    /// caching is an optimization, not a correctness requirement
    pub fn insert(&self, digest: &str, build_id: &str, record: &FeatureRecord) {
        if let Err(e) = self.store.insert(digest, build_id, record) {
            warn!("Cache write failed ({} store): {}", self.store.name(), e);
        }
    }
}
