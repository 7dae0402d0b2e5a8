/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use shared::index_key::{IndexKey, IndexOrdering, COMPONENT_LEN};
use shared::triple::Triple;

use super::{IndexStorage, RawIndexIterator};
use crate::error::StorageError;

/// The three sorted permutations, each a sorted set of 24-byte keys.
#[derive(Debug, Clone, Default)]
struct IndexSet {
    spo: BTreeSet<IndexKey>,
    pos: BTreeSet<IndexKey>,
    osp: BTreeSet<IndexKey>,
}

impl IndexSet {
    fn index(&self, ordering: IndexOrdering) -> &BTreeSet<IndexKey> {
        match ordering {
            IndexOrdering::Spo => &self.spo,
            IndexOrdering::Pos => &self.pos,
            IndexOrdering::Osp => &self.osp,
        }
    }

    fn insert(&mut self, triple: &Triple) -> bool {
        if !self.spo.insert(IndexKey::encode(IndexOrdering::Spo, triple)) {
            return false; // triple already stored
        }
        self.pos.insert(IndexKey::encode(IndexOrdering::Pos, triple));
        self.osp.insert(IndexKey::encode(IndexOrdering::Osp, triple));
        true
    }
}

/// In-memory sorted index store used as the reference storage backend.
///
/// Loads swap in a new copy of the index set; cursors keep the `Arc` of the
/// set they were opened on, so an open query never observes a later load.
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    indexes: RwLock<Arc<IndexSet>>,
    open_cursors: Arc<AtomicUsize>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_triples<I: IntoIterator<Item = Triple>>(triples: I) -> Self {
        let store = Self::new();
        store.extend(triples);
        store
    }

    /// Inserts one triple, returning false when it was already present
    pub fn insert(&self, triple: Triple) -> bool {
        let mut guard = self.indexes.write();
        Arc::make_mut(&mut guard).insert(&triple)
    }

    pub fn extend<I: IntoIterator<Item = Triple>>(&self, triples: I) -> usize {
        let mut guard = self.indexes.write();
        let set = Arc::make_mut(&mut guard);
        triples.into_iter().filter(|t| set.insert(t)).count()
    }

    pub fn len(&self) -> usize {
        self.indexes.read().spo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All triples in SPO order
    pub fn triples(&self) -> Vec<Triple> {
        let set = self.indexes.read().clone();
        set.spo.iter().map(|k| k.decode(IndexOrdering::Spo)).collect()
    }

    /// Freezes the current contents; later inserts are invisible to the snapshot.
    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            indexes: self.indexes.read().clone(),
            open_cursors: self.open_cursors.clone(),
        }
    }

    /// Number of cursors opened and not yet closed, across all snapshots
    pub fn open_iterator_count(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }
}

impl IndexStorage for MemoryIndexStore {
    fn open_iterator(
        &self,
        ordering: IndexOrdering,
        prefix: &[u8],
        level: u8,
    ) -> Result<Box<dyn RawIndexIterator>, StorageError> {
        let indexes = self.indexes.read().clone();
        MemoryCursor::open(indexes, self.open_cursors.clone(), ordering, prefix, level)
    }
}

/// Immutable view of a [`MemoryIndexStore`] at one point in time.
#[derive(Debug, Clone)]
pub struct MemorySnapshot {
    indexes: Arc<IndexSet>,
    open_cursors: Arc<AtomicUsize>,
}

impl MemorySnapshot {
    pub fn len(&self) -> usize {
        self.indexes.spo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.spo.is_empty()
    }
}

impl IndexStorage for MemorySnapshot {
    fn open_iterator(
        &self,
        ordering: IndexOrdering,
        prefix: &[u8],
        level: u8,
    ) -> Result<Box<dyn RawIndexIterator>, StorageError> {
        MemoryCursor::open(self.indexes.clone(), self.open_cursors.clone(), ordering, prefix, level)
    }
}

struct MemoryCursor {
    indexes: Arc<IndexSet>,
    ordering: IndexOrdering,
    prefix: Vec<u8>,
    level: usize,
    current: Option<IndexKey>,
    // Some while open
    open_cursors: Option<Arc<AtomicUsize>>,
}

impl MemoryCursor {
    fn open(
        indexes: Arc<IndexSet>,
        open_cursors: Arc<AtomicUsize>,
        ordering: IndexOrdering,
        prefix: &[u8],
        level: u8,
    ) -> Result<Box<dyn RawIndexIterator>, StorageError> {
        if prefix.len() % COMPONENT_LEN != 0 || prefix.len() > 2 * COMPONENT_LEN {
            return Err(StorageError::InvalidPrefix(prefix.len()));
        }
        if level > 2 || level as usize != prefix.len() / COMPONENT_LEN {
            return Err(StorageError::InvalidLevel { level, prefix_len: prefix.len() });
        }
        open_cursors.fetch_add(1, Ordering::SeqCst);
        let mut cursor = MemoryCursor {
            indexes,
            ordering,
            prefix: prefix.to_vec(),
            level: level as usize,
            current: None,
            open_cursors: Some(open_cursors),
        };
        cursor.current = cursor.first_at_or_after(IndexKey::lower_bound(prefix, cursor.level, 0));
        Ok(Box::new(cursor))
    }

    fn first_at_or_after(&self, lower: IndexKey) -> Option<IndexKey> {
        self.indexes
            .index(self.ordering)
            .range(lower..)
            .next()
            .filter(|key| key.starts_with(&self.prefix))
            .copied()
    }
}

impl RawIndexIterator for MemoryCursor {
    fn seek(&mut self, target: u64) -> Result<Option<u64>, StorageError> {
        if self.open_cursors.is_none() {
            return Err(StorageError::Unavailable("cursor is closed".to_string()));
        }
        self.current = self.first_at_or_after(IndexKey::lower_bound(&self.prefix, self.level, target));
        Ok(self.current())
    }

    fn current(&self) -> Option<u64> {
        self.current.map(|key| key.value_at(self.level))
    }

    fn close(&mut self) {
        if let Some(counter) = self.open_cursors.take() {
            counter.fetch_sub(1, Ordering::SeqCst);
        }
        self.current = None;
    }
}

impl Drop for MemoryCursor {
    fn drop(&mut self) {
        self.close();
    }
}
