/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use shared::index_key::{encode_prefix, IndexOrdering};
use shared::terms::{Term, TriplePattern};
use shared::triple::Position;

use crate::config::OrderingConfig;
use crate::stats::StatisticsSource;

/// Which index (and level) serves a variable given the positions already bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexChoice {
    pub ordering: IndexOrdering,
    pub level: u8,
    /// True when every bound position is part of the prefix. A false choice
    /// scans a superset of the pattern's matches.
    pub exact: bool,
}

impl IndexChoice {
    /// Prefix built from the values at the leading positions of the ordering
    pub fn prefix<F>(&self, value_at: F) -> Vec<u8>
    where
        F: Fn(Position) -> Option<u64>,
    {
        let values: Vec<u64> = self.ordering.positions()[..self.level as usize]
            .iter()
            .filter_map(|p| value_at(*p))
            .collect();
        encode_prefix(&values)
    }
}

/// Picks the ordering whose longest prefix over `bound` reaches `target`.
/// Falls back to an unbounded scan with `target` at level 0.
pub fn best_index_for(target: Position, bound: &[Position]) -> IndexChoice {
    let mut best: Option<IndexChoice> = None;
    for ordering in IndexOrdering::ALL {
        let positions = ordering.positions();
        let level = ordering.level_of(target);
        if !positions[..level].iter().all(|p| bound.contains(p)) {
            continue;
        }
        if best.map_or(true, |b| level > b.level as usize) {
            best = Some(IndexChoice { ordering, level: level as u8, exact: false });
        }
    }
    // the ordering with `target` first always qualifies
    let mut choice = best.unwrap_or(IndexChoice { ordering: IndexOrdering::Spo, level: 0, exact: false });
    let mut distinct_bound: Vec<Position> = bound.iter().copied().filter(|p| *p != target).collect();
    distinct_bound.sort();
    distinct_bound.dedup();
    choice.exact = choice.level as usize == distinct_bound.len();
    choice
}

/// Computes the order in which a multiway join binds variables.
pub struct VariableOrdering<'a> {
    config: &'a OrderingConfig,
}

impl<'a> VariableOrdering<'a> {
    pub fn new(config: &'a OrderingConfig) -> Self {
        Self { config }
    }

    /// Variables by ascending selectivity score; ties keep first-appearance order
    pub fn compute(
        &self,
        patterns: &[TriplePattern],
        stats: Option<&dyn StatisticsSource>,
    ) -> Vec<String> {
        let mut scored = self.scores(patterns, stats);
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.into_iter().map(|(name, _)| name).collect()
    }

    /// Score of every variable, in first-appearance order
    pub fn scores(
        &self,
        patterns: &[TriplePattern],
        stats: Option<&dyn StatisticsSource>,
    ) -> Vec<(String, f64)> {
        let mut variables: Vec<String> = Vec::new();
        for pattern in patterns {
            for name in pattern.variables() {
                if !variables.iter().any(|v| v == name) {
                    variables.push(name.to_string());
                }
            }
        }

        variables
            .into_iter()
            .map(|name| {
                let score = self.score(&name, patterns, stats);
                (name, score)
            })
            .collect()
    }

    fn score(&self, variable: &str, patterns: &[TriplePattern], stats: Option<&dyn StatisticsSource>) -> f64 {
        let mut pattern_count = 0;
        let mut best = f64::INFINITY;
        for pattern in patterns.iter().filter(|p| p.contains_variable(variable)) {
            pattern_count += 1;
            let constants = self.config.constant_factor.powi(pattern.constant_count() as i32);
            for position in pattern.positions_of(variable) {
                let factor = self.position_weight(position, pattern, stats) * constants;
                best = best.min(factor);
            }
        }
        if pattern_count == 0 {
            return f64::INFINITY;
        }
        best * self.config.pattern_decay.powi(pattern_count - 1)
    }

    fn position_weight(
        &self,
        position: Position,
        pattern: &TriplePattern,
        stats: Option<&dyn StatisticsSource>,
    ) -> f64 {
        if let Some(selectivity) = self.histogram_selectivity(pattern, stats) {
            return selectivity;
        }
        match position {
            Position::Subject => self.config.subject_weight,
            Position::Predicate => self.config.predicate_weight,
            Position::Object => self.config.object_weight,
        }
    }

    /// Empirical bucketed selectivity of the pattern's constant predicate
    fn histogram_selectivity(
        &self,
        pattern: &TriplePattern,
        stats: Option<&dyn StatisticsSource>,
    ) -> Option<f64> {
        let Term::Constant(predicate) = pattern.predicate else {
            return None;
        };
        let stats = stats?;
        let histogram = stats.predicate_histogram()?;
        let total = stats.total_triples().filter(|t| *t > 0)?;
        let count = histogram.get(&predicate).copied().unwrap_or(0);
        let ratio = count as f64 / total as f64;
        let bucket = self
            .config
            .histogram_buckets
            .iter()
            .find(|bucket| ratio <= bucket.max_ratio)
            .map(|bucket| bucket.selectivity)
            .unwrap_or(self.config.histogram_ceiling);
        Some(bucket)
    }
}
