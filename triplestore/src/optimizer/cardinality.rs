/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::HashSet;

use shared::terms::{Term, TriplePattern};
use shared::triple::Position;

use crate::config::CardinalityConfig;
use crate::stats::StatisticsSource;

/// Cardinality estimator for triple patterns and pattern sets.
///
/// Never fails: a missing statistic falls back to the configured default
/// selectivity.
pub struct CardinalityEstimator<'a> {
    config: &'a CardinalityConfig,
    stats: Option<&'a dyn StatisticsSource>,
}

impl<'a> CardinalityEstimator<'a> {
    pub fn new(config: &'a CardinalityConfig, stats: Option<&'a dyn StatisticsSource>) -> Self {
        Self { config, stats }
    }

    /// Total number of triples, or the configured default when unknown
    pub fn total(&self) -> f64 {
        self.stats
            .and_then(|s| s.total_triples())
            .unwrap_or(self.config.default_total_triples) as f64
    }

    /// Estimated matches of `pattern` once the variables in `bound` have values.
    /// Floored at 1.0.
    pub fn estimate(&self, pattern: &TriplePattern, bound: &[&str]) -> f64 {
        let total = self.total();
        let mut estimate = total;
        for (position, term) in pattern.terms() {
            let selectivity = match term {
                Term::Constant(id) if position == Position::Predicate => {
                    self.predicate_selectivity(*id, total)
                }
                Term::Constant(_) => self.point_selectivity(position),
                Term::Variable(name) if bound.contains(&name.as_str()) => {
                    self.point_selectivity(position)
                }
                Term::Variable(_) => 1.0,
            };
            estimate *= selectivity;
        }
        estimate.max(1.0)
    }

    /// Output size of joining two inputs on `shared_vars` variables.
    /// No shared variable means a Cartesian product.
    pub fn join(&self, left: f64, right: f64, shared_vars: usize) -> f64 {
        left * right * self.config.join_selectivity.powi(shared_vars as i32)
    }

    /// Cardinality of a pattern set, independent of the join tree.
    ///
    /// Folds the patterns in with [`join`](Self::join), counting as shared the
    /// variables already seen. Each variable thus pays the join selectivity
    /// once per extra occurrence, whatever the order.
    pub fn subset<'p, I>(&self, patterns: I) -> f64
    where
        I: IntoIterator<Item = &'p TriplePattern>,
    {
        let mut seen: HashSet<&'p str> = HashSet::new();
        let mut cardinality = 1.0;
        for pattern in patterns {
            let variables = pattern.variables();
            let shared = variables.iter().filter(|v| seen.contains(*v)).count();
            cardinality = self.join(cardinality, self.estimate(pattern, &[]), shared);
            seen.extend(variables);
        }
        cardinality.max(1.0)
    }

    fn point_selectivity(&self, position: Position) -> f64 {
        let distinct = self.stats.and_then(|s| match position {
            Position::Subject => s.distinct_subjects(),
            Position::Predicate => s.distinct_predicates(),
            Position::Object => s.distinct_objects(),
        });
        match (distinct, position) {
            (Some(n), _) if n > 0 => 1.0 / n as f64,
            (_, Position::Predicate) => self.config.default_predicate_selectivity,
            _ => self.config.default_point_selectivity,
        }
    }

    fn predicate_selectivity(&self, predicate: u64, total: f64) -> f64 {
        match self.stats.and_then(|s| s.predicate_histogram()) {
            Some(histogram) if total > 0.0 => {
                histogram.get(&predicate).copied().unwrap_or(0) as f64 / total
            }
            Some(_) => 0.0,
            None => self.config.default_predicate_selectivity,
        }
    }
}
