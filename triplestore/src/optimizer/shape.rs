/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};
use shared::terms::{Term, TriplePattern};
use shared::triple::Position;

/// Patterns with variables renamed to their first-appearance index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeKey(Vec<TriplePattern>);

impl ShapeKey {
    pub fn patterns(&self) -> &[TriplePattern] {
        &self.0
    }
}

/// Normalized form of a basic graph pattern, used as plan cache key.
///
/// Two queries that differ only in variable names share a shape. Constants
/// and pattern order are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryShape {
    key: ShapeKey,
    /// Original variable name of each positional variable
    variables: Vec<String>,
}

impl QueryShape {
    pub fn normalize(patterns: &[TriplePattern]) -> Self {
        let mut index: FxHashMap<String, usize> = FxHashMap::default();
        let mut variables = Vec::new();
        let mut normalized = patterns.to_vec();
        for pattern in &mut normalized {
            for position in Position::ALL {
                if let Term::Variable(name) = pattern.term_mut(position) {
                    let next = variables.len();
                    let slot = *index.entry(name.clone()).or_insert_with(|| {
                        variables.push(name.clone());
                        next
                    });
                    *name = slot.to_string();
                }
            }
        }
        Self { key: ShapeKey(normalized), variables }
    }

    pub fn key(&self) -> &ShapeKey {
        &self.key
    }

    pub fn patterns(&self) -> &[TriplePattern] {
        self.key.patterns()
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Map from positional names back to the caller's variable names
    pub fn original_names(&self) -> BTreeMap<String, String> {
        self.variables
            .iter()
            .enumerate()
            .map(|(i, name)| (i.to_string(), name.clone()))
            .collect()
    }

    /// Stable 64-bit hash of the normalized key
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.key.hash(&mut hasher);
        hasher.finish()
    }
}
