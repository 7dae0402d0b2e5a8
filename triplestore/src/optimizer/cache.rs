/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use shared::terms::TriplePattern;

use super::plan::Plan;
use super::shape::{QueryShape, ShapeKey};
use crate::config::CacheConfig;
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
}

/// LRU cache of plans keyed by normalized query shape.
///
/// Plans are computed outside the lock, so two threads missing on the same
/// shape may both plan it; the later insert wins. A plan whose computation
/// overlapped an invalidation is returned but not cached.
pub struct PlanCache {
    entries: Mutex<LruCache<ShapeKey, Arc<Plan>>>,
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl PlanCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_capacity(config.capacity)
    }

    /// A zero capacity is raised to one entry
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Cached plan of `shape`, or the result of `compute` on its normalized
    /// patterns. A failing `compute` leaves the cache untouched.
    pub fn get_or_compute<F>(&self, shape: &QueryShape, compute: F) -> Result<Arc<Plan>>
    where
        F: FnOnce(&[TriplePattern]) -> Result<Plan>,
    {
        if let Some(plan) = self.entries.lock().get(shape.key()) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(plan));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let generation = self.generation.load(Ordering::Acquire);
        let plan = Arc::new(compute(shape.patterns())?);
        let mut entries = self.entries.lock();
        if self.generation.load(Ordering::Acquire) != generation {
            log::debug!("plan cache skipped insert of shape {:016x} after invalidation", shape.fingerprint());
            return Ok(plan);
        }
        let evicted = entries.push(shape.key().clone(), Arc::clone(&plan));
        drop(entries);
        if let Some((key, _)) = evicted {
            if &key != shape.key() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                log::debug!("plan cache evicted shape with {} patterns", key.patterns().len());
            }
        }
        Ok(plan)
    }

    pub fn get(&self, shape: &QueryShape) -> Option<Arc<Plan>> {
        self.entries.lock().peek(shape.key()).cloned()
    }

    /// Drops every cached plan
    pub fn invalidate(&self) {
        let mut entries = self.entries.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        log::debug!("plan cache invalidated ({} entries)", entries.len());
        entries.clear();
    }

    /// Drops the plan of one shape; true if it was cached
    pub fn invalidate_shape(&self, shape: &QueryShape) -> bool {
        let mut entries = self.entries.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        let removed = entries.pop(shape.key()).is_some();
        drop(entries);
        if removed {
            log::debug!("plan cache invalidated shape {:016x}", shape.fingerprint());
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.len(),
        }
    }
}

impl Default for PlanCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
