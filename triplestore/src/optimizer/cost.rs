/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use shared::terms::TriplePattern;

use crate::config::CostConfig;

/// How much of the key a scan can bind up front
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanKind {
    /// All three positions constant
    Point,
    /// One or two positions constant
    Prefix,
    /// No constant
    Full,
}

impl ScanKind {
    pub fn for_pattern(pattern: &TriplePattern) -> Self {
        match pattern.constant_count() {
            3 => ScanKind::Point,
            0 => ScanKind::Full,
            _ => ScanKind::Prefix,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScanKind::Point => "point",
            ScanKind::Prefix => "prefix",
            ScanKind::Full => "full",
        }
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cost model for plan operators
pub struct CostModel<'a> {
    config: &'a CostConfig,
    join_selectivity: f64,
}

impl<'a> CostModel<'a> {
    pub fn new(config: &'a CostConfig, join_selectivity: f64) -> Self {
        Self { config, join_selectivity }
    }

    /// Reading `cardinality` entries with the given access kind
    pub fn scan(&self, cardinality: f64, kind: ScanKind) -> f64 {
        let weight = match kind {
            ScanKind::Point => self.config.point_scan_weight,
            ScanKind::Prefix => self.config.prefix_scan_weight,
            ScanKind::Full => self.config.full_scan_weight,
        };
        cardinality * weight
    }

    /// Cost of one probe into the inner input of a nested loop.
    /// A scan inner is probed through the index with the join variables bound;
    /// any other inner is re-evaluated in full.
    pub fn probe(&self, inner_cardinality: f64, inner_cost: f64, inner_is_scan: bool, shared_vars: usize) -> f64 {
        if inner_is_scan {
            let matches = inner_cardinality * self.join_selectivity.powi(shared_vars as i32);
            self.config.index_probe_weight * matches.max(1.0)
        } else {
            inner_cost
        }
    }

    /// Operator cost of a nested loop, inputs excluded
    pub fn nested_loop(&self, outer_cardinality: f64, probe: f64) -> f64 {
        outer_cardinality * probe
    }

    /// Operator cost of a hash join building the smaller input, inputs excluded
    pub fn hash_join(&self, left_cardinality: f64, right_cardinality: f64) -> f64 {
        let build = left_cardinality.min(right_cardinality);
        let probe = left_cardinality.max(right_cardinality);
        self.config.hash_build_weight * build + self.config.hash_probe_weight * probe
    }

    /// Cost of a leapfrog join over participants of the given cardinalities
    pub fn leapfrog(&self, participants: &[f64]) -> f64 {
        let sum: f64 = participants.iter().sum();
        let max = participants.iter().copied().fold(0.0, f64::max);
        self.config.leapfrog_weight * sum * (2.0 + max).log2()
    }

    /// Leapfrog pays off only when some variable joins enough patterns
    pub fn leapfrog_applicable(&self, patterns: &[TriplePattern]) -> bool {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for pattern in patterns {
            for variable in pattern.variables() {
                *counts.entry(variable).or_insert(0) += 1;
            }
        }
        counts.values().any(|&n| n >= self.config.leapfrog_min_shared_patterns)
    }
}
