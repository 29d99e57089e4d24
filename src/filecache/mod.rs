//! Content-addressed read cache for file context.
//!
//! Sits beside the external read-file tool: consulted before every read,
//! updated after every successful read. An entry stays valid while it is
//! younger than the TTL and the on-disk modification fingerprint still
//! matches; staleness in either dimension forces a re-read.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Instant, UNIX_EPOCH};

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::FileCacheConfig;

/// Requested slice of a file, in lines. `ReadWindow::full()` is the whole file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReadWindow {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ReadWindow {
    pub fn full() -> Self {
        Self::default()
    }

    pub fn new(limit: Option<usize>, offset: Option<usize>) -> Self {
        Self { limit, offset }
    }

    pub fn is_full(&self) -> bool {
        self.limit.is_none() && self.offset.is_none()
    }

    /// Apply this window to full-file content.
    fn slice(&self, content: &str) -> String {
        let offset = self.offset.unwrap_or(0);
        let lines = content.lines().skip(offset);
        let selected: Vec<&str> = match self.limit {
            Some(limit) => lines.take(limit).collect(),
            None => lines.collect(),
        };
        selected.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    path: PathBuf,
    window: ReadWindow,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    content: String,
    cached_at: Instant,
    content_hash: String,
    size: u64,
    line_count: usize,
    /// Modification time + size of the file when cached. `None` when the
    /// metadata could not be read; such entries always re-verify as stale.
    disk_fingerprint: Option<String>,
}

/// Whether the caller should perform a fresh read, and the cached content
/// when it should not.
#[derive(Debug, Clone)]
pub struct ReadDecision {
    pub should_read: bool,
    pub cached_content: Option<String>,
}

impl ReadDecision {
    fn fresh() -> Self {
        Self {
            should_read: true,
            cached_content: None,
        }
    }

    fn cached(content: String) -> Self {
        Self {
            should_read: false,
            cached_content: Some(content),
        }
    }
}

pub struct FileContextTracker {
    config: FileCacheConfig,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl FileContextTracker {
    pub fn new(config: FileCacheConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Decide whether a read can be served from cache.
    ///
    /// Missing files always read so the not-found error surfaces through the
    /// normal tool path. A windowed request that misses its exact key can
    /// still be served by slicing a cached full-file entry.
    pub fn should_read_file(&self, path: &Path, window: ReadWindow) -> ReadDecision {
        let normalized = normalize(path);
        if !normalized.exists() {
            debug!(path = %normalized.display(), "File missing on disk, reading");
            return ReadDecision::fresh();
        }

        let entries = self.entries.lock();
        let exact = CacheKey {
            path: normalized.clone(),
            window,
        };

        let (entry, needs_slice) = match entries.get(&exact) {
            Some(entry) => (entry, false),
            None if !window.is_full() => {
                let full = CacheKey {
                    path: normalized.clone(),
                    window: ReadWindow::full(),
                };
                match entries.get(&full) {
                    Some(entry) => (entry, true),
                    None => return ReadDecision::fresh(),
                }
            }
            None => return ReadDecision::fresh(),
        };

        let age = entry.cached_at.elapsed();
        if age.as_secs() >= self.config.ttl_secs {
            debug!(path = %normalized.display(), age_secs = age.as_secs(), "Cache entry expired");
            return ReadDecision::fresh();
        }

        // Within the cooldown the disk fingerprint is trusted without a stat.
        if age.as_secs() >= self.config.cooldown_secs {
            let current = disk_fingerprint(&normalized);
            if entry.disk_fingerprint.is_none() || entry.disk_fingerprint != current {
                debug!(path = %normalized.display(), "Disk fingerprint changed, re-reading");
                return ReadDecision::fresh();
            }
        }

        debug!(path = %normalized.display(), hash = %&entry.content_hash[..8], "Cache hit");
        if needs_slice {
            ReadDecision::cached(window.slice(&entry.content))
        } else {
            ReadDecision::cached(entry.content.clone())
        }
    }

    /// Store content after a successful read. Content over the size ceiling
    /// is never cached and stays always-fresh.
    pub fn cache_file_content(&self, path: &Path, content: &str, window: ReadWindow) {
        if content.len() > self.config.max_content_bytes {
            debug!(
                path = %path.display(),
                bytes = content.len(),
                "Content exceeds cache ceiling, not caching"
            );
            return;
        }

        let normalized = normalize(path);
        let entry = CacheEntry {
            content: content.to_string(),
            cached_at: Instant::now(),
            content_hash: content_hash(content),
            size: content.len() as u64,
            line_count: content.lines().count(),
            disk_fingerprint: disk_fingerprint(&normalized),
        };

        let mut entries = self.entries.lock();
        entries.insert(
            CacheKey {
                path: normalized,
                window,
            },
            entry,
        );

        if entries.len() > self.config.max_entries {
            self.evict_oldest(&mut entries);
        }
    }

    /// Drop every cached window of a path, e.g. after an external edit tool
    /// reports a write.
    pub fn invalidate(&self, path: &Path) {
        let normalized = normalize(path);
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| key.path != normalized);
        let dropped = before - entries.len();
        if dropped > 0 {
            debug!(path = %normalized.display(), dropped, "Invalidated cache entries");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Batched eviction: drop the oldest fraction of entries by cache-write
    /// time in one pass, amortizing the cost over many inserts.
    fn evict_oldest(&self, entries: &mut HashMap<CacheKey, CacheEntry>) {
        let count = ((self.config.max_entries as f64) * self.config.evict_fraction).ceil() as usize;
        let count = count.max(1);

        let mut by_age: Vec<(CacheKey, Instant)> = entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.cached_at))
            .collect();
        by_age.sort_by_key(|(_, cached_at)| *cached_at);

        for (key, _) in by_age.into_iter().take(count) {
            entries.remove(&key);
        }
        debug!(evicted = count, remaining = entries.len(), "Evicted oldest cache entries");
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn disk_fingerprint(path: &Path) -> Option<String> {
    let metadata = std::fs::metadata(path).ok()?;
    let mtime = metadata
        .modified()
        .ok()?
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    Some(format!("{}:{}", mtime, metadata.len()))
}
