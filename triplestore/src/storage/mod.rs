/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Narrow interface to the storage layer.
//!
//! The query core only needs range-seek cursors over the three sorted
//! indexes. A cursor is opened on an ordering, a byte prefix of 0, 8 or 16
//! bytes and the level whose component it reports. Keys follow the layout
//! in [`shared::index_key`].

pub mod memory;

use std::sync::Arc;

use shared::index_key::{encode_prefix, IndexOrdering};
use shared::triple::Triple;

use crate::error::StorageError;

pub use memory::{MemoryIndexStore, MemorySnapshot};

/// Storage-side cursor over one index range.
pub trait RawIndexIterator: Send {
    /// Positions at the first key within the prefix whose component at the
    /// cursor's level is `>= target`. Returns that component, or `None` when
    /// the range holds no such key.
    fn seek(&mut self, target: u64) -> Result<Option<u64>, StorageError>;

    /// Component at the cursor's level of the current key
    fn current(&self) -> Option<u64>;

    /// Releases the cursor. Calling it twice is harmless.
    fn close(&mut self);
}

/// A point-in-time readable set of the SPO, POS and OSP indexes.
pub trait IndexStorage: Send + Sync {
    /// Opens a cursor positioned at the first key `>= prefix` inside the prefix range.
    /// `level` must equal `prefix.len() / 8`.
    fn open_iterator(
        &self,
        ordering: IndexOrdering,
        prefix: &[u8],
        level: u8,
    ) -> Result<Box<dyn RawIndexIterator>, StorageError>;
}

impl<T: IndexStorage + ?Sized> IndexStorage for Arc<T> {
    fn open_iterator(
        &self,
        ordering: IndexOrdering,
        prefix: &[u8],
        level: u8,
    ) -> Result<Box<dyn RawIndexIterator>, StorageError> {
        (**self).open_iterator(ordering, prefix, level)
    }
}

/// Point probe: does the store hold `triple`?
pub fn contains_triple<S: IndexStorage + ?Sized>(
    storage: &S,
    triple: &Triple,
) -> Result<bool, StorageError> {
    let prefix = encode_prefix(&[triple.subject, triple.predicate]);
    let mut cursor = storage.open_iterator(IndexOrdering::Spo, &prefix, 2)?;
    let found = cursor.seek(triple.object);
    cursor.close();
    Ok(found? == Some(triple.object))
}
