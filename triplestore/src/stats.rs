/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use shared::index_key::{encode_prefix, IndexOrdering};
use shared::triple::Triple;

use crate::error::Result;
use crate::leapfrog::SortedIndexIterator;
use crate::storage::IndexStorage;

/// Statistics consumed by ordering and estimation. Every accessor may
/// return `None`; callers fall back to default selectivities.
pub trait StatisticsSource: Send + Sync {
    /// Number of triples per predicate identifier
    fn predicate_histogram(&self) -> Option<&HashMap<u64, u64>>;

    fn total_triples(&self) -> Option<u64>;

    fn distinct_subjects(&self) -> Option<u64> {
        None
    }

    fn distinct_predicates(&self) -> Option<u64> {
        None
    }

    fn distinct_objects(&self) -> Option<u64> {
        None
    }
}

/// Statistics source that knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStatistics;

impl StatisticsSource for NoStatistics {
    fn predicate_histogram(&self) -> Option<&HashMap<u64, u64>> {
        None
    }

    fn total_triples(&self) -> Option<u64> {
        None
    }
}

/// Database statistics for cost-based optimization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripleStats {
    pub total_triples: u64,
    pub predicate_histogram: HashMap<u64, u64>,
    pub distinct_subjects: u64,
    pub distinct_predicates: u64,
    pub distinct_objects: u64,
}

#[derive(Default)]
struct PartialStats {
    total: u64,
    predicates: HashMap<u64, u64>,
    subjects: HashSet<u64>,
    objects: HashSet<u64>,
}

impl PartialStats {
    fn merge(mut self, other: PartialStats) -> PartialStats {
        self.total += other.total;
        for (predicate, count) in other.predicates {
            *self.predicates.entry(predicate).or_insert(0) += count;
        }
        self.subjects.extend(other.subjects);
        self.objects.extend(other.objects);
        self
    }
}

impl TripleStats {
    /// Builds exact statistics from a triple slice, counting chunks in parallel
    pub fn from_triples(triples: &[Triple]) -> Self {
        let merged = triples
            .par_iter()
            .fold(PartialStats::default, |mut acc, triple| {
                acc.total += 1;
                *acc.predicates.entry(triple.predicate).or_insert(0) += 1;
                acc.subjects.insert(triple.subject);
                acc.objects.insert(triple.object);
                acc
            })
            .reduce(PartialStats::default, PartialStats::merge);

        Self {
            total_triples: merged.total,
            distinct_predicates: merged.predicates.len() as u64,
            predicate_histogram: merged.predicates,
            distinct_subjects: merged.subjects.len() as u64,
            distinct_objects: merged.objects.len() as u64,
        }
    }

    /// Gathers statistics by walking the indexes through the storage interface.
    /// Predicates are counted in parallel.
    pub fn gather<S: IndexStorage + ?Sized>(storage: &S) -> Result<Self> {
        let predicates = distinct_values(storage, IndexOrdering::Pos, &[])?;
        let predicate_histogram: HashMap<u64, u64> = predicates
            .par_iter()
            .map(|&predicate| Ok((predicate, count_predicate(storage, predicate)?)))
            .collect::<Result<HashMap<u64, u64>>>()?;

        let stats = Self {
            total_triples: predicate_histogram.values().sum(),
            distinct_subjects: distinct_values(storage, IndexOrdering::Spo, &[])?.len() as u64,
            distinct_predicates: predicates.len() as u64,
            distinct_objects: distinct_values(storage, IndexOrdering::Osp, &[])?.len() as u64,
            predicate_histogram,
        };
        log::debug!(
            "gathered stats: {} triples, {} predicates",
            stats.total_triples,
            stats.distinct_predicates
        );
        Ok(stats)
    }

    /// Gets the cardinality for a predicate
    pub fn predicate_count(&self, predicate: u64) -> u64 {
        self.predicate_histogram.get(&predicate).copied().unwrap_or(0)
    }
}

impl StatisticsSource for TripleStats {
    fn predicate_histogram(&self) -> Option<&HashMap<u64, u64>> {
        Some(&self.predicate_histogram)
    }

    fn total_triples(&self) -> Option<u64> {
        Some(self.total_triples)
    }

    fn distinct_subjects(&self) -> Option<u64> {
        (self.distinct_subjects > 0).then_some(self.distinct_subjects)
    }

    fn distinct_predicates(&self) -> Option<u64> {
        (self.distinct_predicates > 0).then_some(self.distinct_predicates)
    }

    fn distinct_objects(&self) -> Option<u64> {
        (self.distinct_objects > 0).then_some(self.distinct_objects)
    }
}

/// Distinct values at the level right after `prefix`
fn distinct_values<S: IndexStorage + ?Sized>(
    storage: &S,
    ordering: IndexOrdering,
    prefix: &[u8],
) -> Result<Vec<u64>> {
    let level = (prefix.len() / 8) as u8;
    let mut iterator = SortedIndexIterator::open(storage, ordering, prefix.to_vec(), level)?;
    let mut values = Vec::new();
    while let Some(value) = iterator.current() {
        values.push(value);
        iterator.advance()?;
    }
    iterator.close();
    Ok(values)
}

fn count_predicate<S: IndexStorage + ?Sized>(storage: &S, predicate: u64) -> Result<u64> {
    let mut count = 0;
    for object in distinct_values(storage, IndexOrdering::Pos, &encode_prefix(&[predicate]))? {
        let prefix = encode_prefix(&[predicate, object]);
        count += distinct_values(storage, IndexOrdering::Pos, &prefix)?.len() as u64;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryIndexStore;

    fn triples() -> Vec<Triple> {
        vec![
            Triple::new(1, 10, 5),
            Triple::new(2, 10, 5),
            Triple::new(5, 20, 9),
            Triple::new(5, 20, 2),
            Triple::new(5, 30, 1),
        ]
    }

    #[test]
    fn test_from_triples() {
        let stats = TripleStats::from_triples(&triples());
        assert_eq!(stats.total_triples, 5);
        assert_eq!(stats.predicate_count(10), 2);
        assert_eq!(stats.predicate_count(20), 2);
        assert_eq!(stats.predicate_count(99), 0);
        assert_eq!(stats.distinct_subjects, 3);
        assert_eq!(stats.distinct_objects, 4);
        assert_eq!(stats.distinct_predicates, 3);
    }

    #[test]
    fn test_gather_matches_from_triples() {
        let store = MemoryIndexStore::from_triples(triples());
        let gathered = TripleStats::gather(&store).unwrap();
        assert_eq!(gathered, TripleStats::from_triples(&triples()));
        assert_eq!(store.open_iterator_count(), 0);
    }

    #[test]
    fn test_empty_store() {
        let store = MemoryIndexStore::new();
        let stats = TripleStats::gather(&store).unwrap();
        assert_eq!(stats.total_triples, 0);
        assert_eq!(stats.distinct_subjects(), None);
        assert_eq!(NoStatistics.total_triples(), None);
    }
}
