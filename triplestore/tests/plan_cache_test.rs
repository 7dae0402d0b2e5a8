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
use rand::rngs::StdRng;
use rand::SeedableRng;
use triplestore::optimizer::{JoinEnumerator, PlanCache, QueryShape};
use triplestore::{EngineConfig, QueryError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrent_get_or_compute() {
        let cache = Arc::new(PlanCache::with_capacity(8));
        let config = EngineConfig::default();
        let threads = 8;
        let rounds = 50;

        crossbeam::scope(|scope| {
            for t in 0..threads {
                let cache = Arc::clone(&cache);
                let config = &config;
                scope.spawn(move |_| {
                    let enumerator = JoinEnumerator::new(config, None);
                    for round in 0..rounds {
                        let predicate = ((t + round) % 12) as u64 + 1;
                        let patterns = vec![
                            tp(var(&format!("a{}", t)), id(predicate), var("b")),
                            tp(var("b"), id(1), var(&format!("c{}", round))),
                        ];
                        let shape = QueryShape::normalize(&patterns);
                        let plan = cache.get_or_compute(&shape, |p| enumerator.plan(p)).unwrap();
                        assert_eq!(plan.patterns.as_slice(), shape.patterns());
                    }
                });
            }
        })
        .unwrap();

        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, (threads * rounds) as u64);
        assert!(stats.size <= 8);
        assert!(stats.misses >= 12);
    }

    #[test]
    fn test_normalization_is_idempotent_on_random_queries() {
        let mut rng = StdRng::seed_from_u64(11);
        for shape in SHAPES {
            for size in 1..=5 {
                let patterns = random_bgp(&mut rng, shape, size);
                let once = QueryShape::normalize(&patterns);
                let twice = QueryShape::normalize(once.patterns());
                assert_eq!(once.key(), twice.key());
                assert_eq!(once.fingerprint(), twice.fingerprint());
            }
        }
    }

    #[test]
    fn test_failed_planning_is_not_cached() {
        let cache = PlanCache::with_capacity(4);
        let patterns: Vec<_> = (0..70u64).map(|i| tp(var("x"), id(i), var("y"))).collect();
        let shape = QueryShape::normalize(&patterns);
        let config = EngineConfig::default();
        let enumerator = JoinEnumerator::new(&config, None);
        for _ in 0..2 {
            let err = cache.get_or_compute(&shape, |p| enumerator.plan(p)).unwrap_err();
            assert!(matches!(err, QueryError::TooManyPatterns { count: 70, max: 64 }));
        }
        let stats = cache.stats();
        assert_eq!((stats.misses, stats.size), (2, 0));
    }
}
