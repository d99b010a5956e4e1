//! Bounded cache of parsed source documents
//!
//! Opening and indexing a PDF is the most expensive step of a split, and the
//! page count is queried repeatedly while planning. Entries are keyed by
//! canonical path and carry a fingerprint of the file (modification time and
//! length); a lookup whose fingerprint no longer matches re-parses the file.

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use log::debug;
use lru::LruCache;

use super::reader::SourceDocument;
use crate::error::{Error, Result};

/// Default number of documents kept
pub const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

impl Fingerprint {
    fn of(path: &Path) -> Result<Self> {
        let meta = fs::metadata(path).map_err(|_| Error::SourceNotFound(path.to_path_buf()))?;
        Ok(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

struct CacheEntry {
    fingerprint: Fingerprint,
    document: Arc<SourceDocument>,
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// LRU cache of opened documents
pub struct DocumentCache {
    entries: LruCache<PathBuf, CacheEntry>,
    stats: CacheStats,
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl DocumentCache {
    /// Create a cache holding at most `capacity` documents (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            stats: CacheStats::default(),
        }
    }

    fn key(path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path).map_err(|_| Error::SourceNotFound(path.to_path_buf()))
    }

    /// Return the cached document for `path`, opening it on a miss or when the file changed
    pub fn get_or_open<P: AsRef<Path>>(&mut self, path: P) -> Result<Arc<SourceDocument>> {
        let key = Self::key(path.as_ref())?;
        let fingerprint = Fingerprint::of(&key)?;

        if let Some(entry) = self.entries.get(&key) {
            if entry.fingerprint == fingerprint {
                self.stats.hits += 1;
                return Ok(Arc::clone(&entry.document));
            }
            debug!("{} changed on disk, re-reading", key.display());
        }

        self.stats.misses += 1;
        let document = Arc::new(SourceDocument::open(&key)?);
        self.entries.put(
            key,
            CacheEntry {
                fingerprint,
                document: Arc::clone(&document),
            },
        );
        Ok(document)
    }

    /// Page count of `path`, parsing it only if it is not cached
    pub fn page_count<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        Ok(self.get_or_open(path)?.page_count())
    }

    /// Drop the entry for `path`; returns whether one existed
    pub fn invalidate<P: AsRef<Path>>(&mut self, path: P) -> bool {
        match Self::key(path.as_ref()) {
            Ok(key) => self.entries.pop(&key).is_some(),
            Err(_) => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
