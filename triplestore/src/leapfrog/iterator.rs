/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use shared::index_key::{IndexOrdering, COMPONENT_LEN};

use crate::error::{QueryError, Result};
use crate::storage::{IndexStorage, RawIndexIterator};

/// Cursor over the distinct values at one level of a prefix-bounded index range.
///
/// The level must equal `prefix.len() / 8`: the iterator reports the
/// component right after the prefix, and `advance` skips every key that
/// shares the current value, so each value is seen once.
pub struct SortedIndexIterator {
    ordering: IndexOrdering,
    prefix: Vec<u8>,
    level: u8,
    cursor: Option<Box<dyn RawIndexIterator>>,
    current: Option<u64>,
    seeks: u64,
}

impl SortedIndexIterator {
    /// Opens a cursor positioned at the first key of the prefix range
    pub fn open<S: IndexStorage + ?Sized>(
        storage: &S,
        ordering: IndexOrdering,
        prefix: Vec<u8>,
        level: u8,
    ) -> Result<Self> {
        validate_level(level, prefix.len())?;
        let cursor = storage.open_iterator(ordering, &prefix, level)?;
        let current = cursor.current();
        Ok(Self {
            ordering,
            prefix,
            level,
            cursor: Some(cursor),
            current,
            seeks: 0,
        })
    }

    /// Moves to the first value `>= target`. Never moves backwards: a target at
    /// or below the current value leaves the iterator where it is.
    pub fn seek(&mut self, target: u64) -> Result<Option<u64>> {
        let cursor = self.cursor.as_mut().ok_or(QueryError::IteratorClosed)?;
        match self.current {
            None => return Ok(None),
            Some(current) if target <= current => return Ok(Some(current)),
            Some(_) => {}
        }
        self.seeks += 1;
        self.current = cursor.seek(target)?;
        Ok(self.current)
    }

    /// Moves to the next distinct value
    pub fn advance(&mut self) -> Result<Option<u64>> {
        if self.cursor.is_none() {
            return Err(QueryError::IteratorClosed);
        }
        match self.current {
            None => Ok(None),
            // no successor; must not wrap to 0
            Some(u64::MAX) => {
                self.seeks += 1;
                self.current = None;
                Ok(None)
            }
            Some(current) => self.seek(current + 1),
        }
    }

    pub fn current(&self) -> Option<u64> {
        self.current
    }

    pub fn is_exhausted(&self) -> bool {
        self.current.is_none()
    }

    pub fn is_closed(&self) -> bool {
        self.cursor.is_none()
    }

    /// Releases the storage cursor. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
        }
        self.current = None;
    }

    /// Number of seeks and advances issued since opening
    pub fn seek_count(&self) -> u64 {
        self.seeks
    }

    pub fn ordering(&self) -> IndexOrdering {
        self.ordering
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }
}

impl Drop for SortedIndexIterator {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for SortedIndexIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortedIndexIterator")
            .field("ordering", &self.ordering)
            .field("level", &self.level)
            .field("prefix_len", &self.prefix.len())
            .field("current", &self.current)
            .field("closed", &self.cursor.is_none())
            .finish()
    }
}

fn validate_level(level: u8, prefix_len: usize) -> Result<()> {
    let whole = prefix_len % COMPONENT_LEN == 0 && prefix_len <= 2 * COMPONENT_LEN;
    if !whole || level as usize != prefix_len / COMPONENT_LEN {
        return Err(QueryError::InvalidLevel { level, prefix_len });
    }
    Ok(())
}
