//! Per-document artifact cache plus the coarse whole-program snapshot cache.
//!
//! Entries are keyed by document id and version. Invalidation removes entries
//! outright and bumps a per-document generation; a computation that started
//! before an invalidation finds the generation moved and drops its result instead
//! of inserting stale data.

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub invalidations: u64,
    pub discarded_inserts: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

struct CacheEntry<A> {
    version: u64,
    artifact: Arc<A>,
    last_access: u64,
}

struct Inner<A> {
    entries: HashMap<String, CacheEntry<A>>,
    generations: HashMap<String, u64>,
}

pub struct ResultCache<A> {
    inner: Mutex<Inner<A>>,
    tick: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
    discarded: AtomicU64,
}

impl<A> Default for ResultCache<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> ResultCache<A> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                generations: HashMap::new(),
            }),
            tick: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Cached artifact for `(document, version)`, computing it on a miss.
    ///
    /// The lock is not held while `compute` runs, so two readers may compute the
    /// same artifact; the later insert simply replaces the earlier one.
    pub fn get_or_compute<E>(
        &self,
        document: &str,
        version: u64,
        compute: impl FnOnce() -> Result<A, E>,
    ) -> Result<Arc<A>, E> {
        let generation = {
            let mut inner = self.inner.lock();
            let tick = self.next_tick();
            if let Some(entry) = inner.entries.get_mut(document) {
                if entry.version == version {
                    entry.last_access = tick;
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Arc::clone(&entry.artifact));
                }
            }
            inner.generations.get(document).copied().unwrap_or(0)
        };
        self.misses.fetch_add(1, Ordering::Relaxed);

        let artifact = Arc::new(compute()?);

        let mut inner = self.inner.lock();
        let current_generation = inner.generations.get(document).copied().unwrap_or(0);
        let newer_present = inner
            .entries
            .get(document)
            .map(|e| e.version > version)
            .unwrap_or(false);
        if current_generation != generation || newer_present {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            debug!(document, version, "discarding artifact computed across an invalidation");
            return Ok(artifact);
        }
        let tick = self.next_tick();
        inner.entries.insert(
            document.to_string(),
            CacheEntry {
                version,
                artifact: Arc::clone(&artifact),
                last_access: tick,
            },
        );
        Ok(artifact)
    }

    /// Peek without computing. A version mismatch is a miss.
    pub fn get(&self, document: &str, version: u64) -> Option<Arc<A>> {
        let mut inner = self.inner.lock();
        let tick = self.next_tick();
        match inner.entries.get_mut(document) {
            Some(e) if e.version == version => {
                e.last_access = tick;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(&e.artifact))
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn invalidate(&self, document: &str) {
        let mut inner = self.inner.lock();
        inner.entries.remove(document);
        *inner.generations.entry(document.to_string()).or_insert(0) += 1;
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let docs: Vec<String> = inner.entries.keys().cloned().collect();
        inner.entries.clear();
        for d in docs {
            *inner.generations.entry(d).or_insert(0) += 1;
        }
    }

    /// Evict least recently used entries until at most `max_entries` remain.
    /// Returns how many were evicted.
    pub fn cleanup(&self, max_entries: usize) -> usize {
        let mut inner = self.inner.lock();
        let excess = inner.entries.len().saturating_sub(max_entries);
        if excess == 0 {
            return 0;
        }
        let mut by_age: Vec<(u64, String)> = inner
            .entries
            .iter()
            .map(|(k, e)| (e.last_access, k.clone()))
            .collect();
        by_age.sort();
        for (_, key) in by_age.into_iter().take(excess) {
            inner.entries.remove(&key);
        }
        self.evictions.fetch_add(excess as u64, Ordering::Relaxed);
        debug!(evicted = excess, "result cache trimmed");
        excess
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            discarded_inserts: self.discarded.load(Ordering::Relaxed),
        }
    }
}

/// Holds the one whole-program artifact. Any document change clears it; it is
/// rebuilt on the next read, never patched.
pub struct SnapshotCache<S> {
    slot: RwLock<Option<Arc<S>>>,
    generation: AtomicU64,
    builds: AtomicU64,
}

impl<S> Default for SnapshotCache<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> SnapshotCache<S> {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
            generation: AtomicU64::new(0),
            builds: AtomicU64::new(0),
        }
    }

    pub fn get(&self) -> Option<Arc<S>> {
        self.slot.read().clone()
    }

    pub fn get_or_build<E>(&self, build: impl FnOnce() -> Result<S, E>) -> Result<Arc<S>, E> {
        if let Some(s) = self.get() {
            return Ok(s);
        }
        let generation = self.generation.load(Ordering::Acquire);
        let built = Arc::new(build()?);
        self.builds.fetch_add(1, Ordering::Relaxed);

        let mut slot = self.slot.write();
        if self.generation.load(Ordering::Acquire) == generation {
            if let Some(existing) = slot.as_ref() {
                return Ok(Arc::clone(existing));
            }
            *slot = Some(Arc::clone(&built));
        } else {
            debug!("snapshot invalidated while building; not caching it");
        }
        Ok(built)
    }

    pub fn invalidate(&self) {
        let mut slot = self.slot.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        *slot = None;
    }

    pub fn is_cached(&self) -> bool {
        self.slot.read().is_some()
    }

    pub fn build_count(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }
}
