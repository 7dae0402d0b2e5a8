/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

extern crate triplestore;

mod common;

use std::sync::Arc;

use common::*;
use shared::index_key::{encode_prefix, IndexOrdering};
use shared::triple::Triple;
use triplestore::leapfrog::{LeapfrogJoin, SortedIndexIterator};
use triplestore::optimizer::{PlanCache, QueryShape, Strategy};
use triplestore::{Binding, EngineConfig, MemoryIndexStore, QueryEngine, Result};

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(pairs: &[(&str, u64)]) -> Binding {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_two_hop_path() {
        let store = MemoryIndexStore::from_triples(vec![
            Triple::new(1, 10, 5),
            Triple::new(5, 20, 9),
            Triple::new(5, 20, 2),
        ]);
        let engine = QueryEngine::new(Arc::new(store), EngineConfig::default());
        let patterns = vec![tp(var("x"), id(10), var("y")), tp(var("y"), id(20), var("z"))];

        let lazy = engine
            .open_execution(&patterns)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        let expected = sorted(vec![
            binding(&[("x", 1), ("y", 5), ("z", 9)]),
            binding(&[("x", 1), ("y", 5), ("z", 2)]),
        ]);
        assert_eq!(sorted(lazy), expected);
        assert_eq!(sorted(engine.query(&patterns).unwrap()), expected);
    }

    #[test]
    fn test_four_way_star_picks_leapfrog() {
        // 200 subjects per predicate, only subject 7 has all four
        let mut triples = Vec::new();
        for predicate in 1..=4u64 {
            for i in 0..200u64 {
                let subject = 1000 * predicate + i;
                triples.push(Triple::new(subject, predicate, i));
            }
            triples.push(Triple::new(7, predicate, 40 + predicate));
        }
        let store = MemoryIndexStore::from_triples(triples);
        let engine = QueryEngine::new(Arc::new(store), EngineConfig::default());
        engine.refresh_stats().unwrap();

        let patterns: Vec<_> = (1..=4u64)
            .map(|p| tp(var("x"), id(p), var(&format!("o{}", p))))
            .collect();
        let plan = engine.plan(&patterns).unwrap();
        assert_eq!(plan.strategy, Strategy::Leapfrog);
        assert_eq!(plan.variable_order().map(|o| o[0].as_str()), Some("x"));

        let rows = engine
            .open_execution(&patterns)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(rows, vec![binding(&[("x", 7), ("o1", 41), ("o2", 42), ("o3", 43), ("o4", 44)])]);
        assert_eq!(engine.query(&patterns).unwrap(), rows);
    }

    #[test]
    fn test_empty_participant_ends_join_without_seeks() {
        let triples: Vec<Triple> = (0..50u64)
            .map(|s| Triple::new(s, 1, 0))
            .chain((0..50u64).map(|s| Triple::new(s * 2, 2, 0)))
            .collect();
        let store = MemoryIndexStore::from_triples(triples);
        let open = |predicate: u64| {
            SortedIndexIterator::open(&store, IndexOrdering::Pos, encode_prefix(&[predicate, 0]), 2).unwrap()
        };
        let iterators = vec![open(1), open(3), open(2)];
        assert!(iterators[1].is_exhausted());

        let mut join = LeapfrogJoin::new(iterators, 1_000);
        assert_eq!(join.search().unwrap(), None);
        assert!(join.is_at_end());
        assert_eq!(join.seek_count(), 0);
        join.close();
        assert_eq!(store.open_iterator_count(), 0);
    }

    #[test]
    fn test_cache_of_two_evicts_oldest() {
        let cache = PlanCache::with_capacity(2);
        let config = EngineConfig::default();
        let store = Arc::new(MemoryIndexStore::new());
        let engine = QueryEngine::with_cache(store, config, Arc::new(cache));

        let shape = |p: u64| vec![tp(var("s"), id(p), var("o"))];
        for p in [1, 2, 3] {
            engine.plan_cached(&shape(p)).unwrap();
        }
        let stats = engine.cache_stats();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.size, 2);
        assert!(engine.cache().get(&QueryShape::normalize(&shape(1))).is_none());
        assert!(engine.cache().get(&QueryShape::normalize(&shape(3))).is_some());
    }
}
