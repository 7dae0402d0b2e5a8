/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Physical key layout of the three sorted triple indexes.
//!
//! A key is 24 bytes: three big-endian `u64` in the permutation of its
//! ordering (SPO = s,p,o; POS = p,o,s; OSP = o,s,p). Unsigned byte order of
//! keys equals tuple order of the permuted components, so a byte prefix of
//! 0, 8 or 16 bytes selects a contiguous range.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::triple::{Position, Triple};

pub const COMPONENT_LEN: usize = 8;
pub const KEY_LEN: usize = 3 * COMPONENT_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndexOrdering {
    Spo,
    Pos,
    Osp,
}

impl IndexOrdering {
    pub const ALL: [IndexOrdering; 3] = [IndexOrdering::Spo, IndexOrdering::Pos, IndexOrdering::Osp];

    /// Triple positions stored at levels 0, 1 and 2
    pub fn positions(self) -> [Position; 3] {
        match self {
            IndexOrdering::Spo => [Position::Subject, Position::Predicate, Position::Object],
            IndexOrdering::Pos => [Position::Predicate, Position::Object, Position::Subject],
            IndexOrdering::Osp => [Position::Object, Position::Subject, Position::Predicate],
        }
    }

    /// Level at which `position` is stored in this ordering
    pub fn level_of(self, position: Position) -> usize {
        self.positions()
            .iter()
            .position(|p| *p == position)
            .unwrap_or(0)
    }

    /// The ordering whose leading levels hold exactly the positions in `bound`,
    /// if one exists. Every set of zero to three distinct positions has one.
    pub fn for_bound(bound: &[Position]) -> Option<IndexOrdering> {
        let mut distinct: Vec<Position> = bound.to_vec();
        distinct.sort();
        distinct.dedup();
        Self::ALL.into_iter().find(|ordering| {
            let leading = &ordering.positions()[..distinct.len()];
            distinct.iter().all(|p| leading.contains(p))
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            IndexOrdering::Spo => "SPO",
            IndexOrdering::Pos => "POS",
            IndexOrdering::Osp => "OSP",
        }
    }
}

impl fmt::Display for IndexOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 24-byte physical key in one of the three orderings.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexKey([u8; KEY_LEN]);

impl IndexKey {
    pub fn from_components(components: [u64; 3]) -> Self {
        let mut bytes = [0u8; KEY_LEN];
        for (level, value) in components.iter().enumerate() {
            let start = level * COMPONENT_LEN;
            bytes[start..start + COMPONENT_LEN].copy_from_slice(&value.to_be_bytes());
        }
        IndexKey(bytes)
    }

    pub fn encode(ordering: IndexOrdering, triple: &Triple) -> Self {
        let [a, b, c] = ordering.positions();
        Self::from_components([triple.get(a), triple.get(b), triple.get(c)])
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let array: [u8; KEY_LEN] = bytes.try_into().ok()?;
        Some(IndexKey(array))
    }

    /// Smallest key that starts with `prefix` and whose component at `level` is
    /// at least `target`. Components after `level` are zero.
    pub fn lower_bound(prefix: &[u8], level: usize, target: u64) -> Self {
        let mut bytes = [0u8; KEY_LEN];
        let len = prefix.len().min(KEY_LEN);
        bytes[..len].copy_from_slice(&prefix[..len]);
        if level < 3 {
            let start = level * COMPONENT_LEN;
            bytes[start..start + COMPONENT_LEN].copy_from_slice(&target.to_be_bytes());
        }
        IndexKey(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    pub fn value_at(&self, level: usize) -> u64 {
        let start = level * COMPONENT_LEN;
        let mut buf = [0u8; COMPONENT_LEN];
        buf.copy_from_slice(&self.0[start..start + COMPONENT_LEN]);
        u64::from_be_bytes(buf)
    }

    pub fn components(&self) -> [u64; 3] {
        [self.value_at(0), self.value_at(1), self.value_at(2)]
    }

    pub fn decode(&self, ordering: IndexOrdering) -> Triple {
        let mut triple = Triple::new(0, 0, 0);
        for (level, position) in ordering.positions().into_iter().enumerate() {
            triple.set(position, self.value_at(level));
        }
        triple
    }

    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Debug for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.components();
        write!(f, "IndexKey({}, {}, {})", a, b, c)
    }
}

/// Concatenates big-endian components into a key prefix.
pub fn encode_prefix(values: &[u64]) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(values.len() * COMPONENT_LEN);
    for value in values {
        prefix.extend_from_slice(&value.to_be_bytes());
    }
    prefix
}
