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

use common::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use triplestore::leapfrog::{MultiLevelExecutor, VariableOrdering};
use triplestore::optimizer::{JoinEnumerator, PlanExecutor};
use triplestore::{open_execution, Binding, EngineConfig, MemoryIndexStore, Result, TripleStats};

#[cfg(test)]
mod tests {
    use super::*;

    fn leapfrog_rows(store: &MemoryIndexStore, patterns: &[shared::terms::TriplePattern], stats: &TripleStats) -> Vec<Binding> {
        let config = EngineConfig::default();
        let rows = open_execution(store, patterns, Some(stats), &config)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        sorted(rows)
    }

    #[test]
    fn test_random_shapes_match_naive_evaluation() {
        let mut checked = 0;
        for seed in 0..12u64 {
            let triples = random_triples(seed, 90);
            let store = MemoryIndexStore::from_triples(triples.clone());
            let stats = TripleStats::from_triples(&triples);
            let mut rng = StdRng::seed_from_u64(1000 + seed);
            for shape in SHAPES {
                for size in 2..=4 {
                    let patterns = random_bgp(&mut rng, shape, size);
                    let expected = naive_evaluate(&triples, &patterns);
                    assert_eq!(
                        leapfrog_rows(&store, &patterns, &stats),
                        expected,
                        "seed {} shape {:?} patterns {:?}",
                        seed,
                        shape,
                        patterns
                    );
                    assert_eq!(store.open_iterator_count(), 0);
                    checked += 1;
                }
            }
        }
        assert_eq!(checked, 12 * 3 * 3);
    }

    #[test]
    fn test_every_variable_order_gives_same_result() {
        let triples = random_triples(7, 120);
        let store = MemoryIndexStore::from_triples(triples.clone());
        let patterns = vec![
            tp(var("a"), id(1), var("b")),
            tp(var("b"), id(2), var("c")),
            tp(var("c"), id(3), var("a")),
        ];
        let expected = naive_evaluate(&triples, &patterns);
        let names = ["a", "b", "c"];
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for order in orders {
            let order: Vec<String> = order.iter().map(|&i| names[i].to_string()).collect();
            let rows = MultiLevelExecutor::open(&store, patterns.clone(), order.clone(), Default::default())
                .unwrap()
                .collect::<Result<Vec<_>>>()
                .unwrap();
            assert_eq!(sorted(rows), expected, "order {:?}", order);
        }
    }

    #[test]
    fn test_binary_plans_match_naive_evaluation() {
        let config = EngineConfig::default();
        for seed in 0..8u64 {
            let triples = random_triples(seed, 80);
            let store = MemoryIndexStore::from_triples(triples.clone());
            let stats = TripleStats::from_triples(&triples);
            let enumerator = JoinEnumerator::new(&config, Some(&stats));
            let executor = PlanExecutor::new(&store, config.executor.clone());
            let mut rng = StdRng::seed_from_u64(500 + seed);
            for shape in SHAPES {
                let patterns = random_bgp(&mut rng, shape, 3);
                let expected = naive_evaluate(&triples, &patterns);

                let plan = enumerator.plan(&patterns).unwrap();
                assert_eq!(sorted(executor.execute(&plan).unwrap()), expected, "plan {:?}", plan.strategy);

                // the binary tree, even where leapfrog would win
                let root = enumerator.plan_exhaustive(&patterns).unwrap();
                let binary = triplestore::Plan { patterns: patterns.clone(), root, strategy: plan.strategy };
                assert_eq!(sorted(executor.execute(&binary).unwrap()), expected);
            }
        }
    }

    #[test]
    fn test_ordering_is_deterministic() {
        let config = EngineConfig::default();
        let triples = random_triples(3, 100);
        let stats = TripleStats::from_triples(&triples);
        let mut rng = StdRng::seed_from_u64(3);
        let patterns = random_bgp(&mut rng, Shape::Star, 4);
        let ordering = VariableOrdering::new(&config.ordering);
        let first = ordering.compute(&patterns, Some(&stats));
        for _ in 0..5 {
            assert_eq!(ordering.compute(&patterns, Some(&stats)), first);
        }
        assert_eq!(first[0], "x");
    }
}
