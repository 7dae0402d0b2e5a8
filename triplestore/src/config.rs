/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Tunable constants for ordering, estimation, costing, enumeration,
//! execution limits and plan caching.
//!
//! The selectivity constants are empirical defaults. Every section
//! deserializes with `#[serde(default)]`, so a JSON document only needs
//! the fields it overrides:
//!
//! ```json
//! { "cost": { "leapfrog_weight": 0.5 }, "cache": { "capacity": 64 } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};

/// One bucket of the empirical predicate selectivity table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    /// Upper bound (inclusive) of `matches / total` covered by this bucket
    pub max_ratio: f64,
    pub selectivity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderingConfig {
    /// Score multiplier per extra pattern a variable appears in
    pub pattern_decay: f64,
    pub subject_weight: f64,
    pub predicate_weight: f64,
    pub object_weight: f64,
    /// Score multiplier per bound constant in the same pattern
    pub constant_factor: f64,
    /// Ascending by `max_ratio`; ratios above the last bucket use `histogram_ceiling`
    pub histogram_buckets: Vec<HistogramBucket>,
    pub histogram_ceiling: f64,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            pattern_decay: 0.3,
            subject_weight: 1.0,
            predicate_weight: 0.5,
            object_weight: 1.0,
            constant_factor: 0.1,
            histogram_buckets: vec![
                HistogramBucket { max_ratio: 0.001, selectivity: 0.05 },
                HistogramBucket { max_ratio: 0.01, selectivity: 0.1 },
                HistogramBucket { max_ratio: 0.1, selectivity: 0.3 },
                HistogramBucket { max_ratio: 0.5, selectivity: 0.6 },
            ],
            histogram_ceiling: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardinalityConfig {
    /// Assumed store size when no statistics are available
    pub default_total_triples: u64,
    /// Subject/object bound, distinct count unknown
    pub default_point_selectivity: f64,
    /// Predicate bound, histogram unknown
    pub default_predicate_selectivity: f64,
    /// Reduction per variable shared by both sides of a join
    pub join_selectivity: f64,
}

impl Default for CardinalityConfig {
    fn default() -> Self {
        Self {
            default_total_triples: 1_000_000,
            default_point_selectivity: 0.001,
            default_predicate_selectivity: 0.01,
            join_selectivity: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    pub point_scan_weight: f64,
    pub prefix_scan_weight: f64,
    pub full_scan_weight: f64,
    /// Cost per row of an index lookup from a nested-loop outer row
    pub index_probe_weight: f64,
    pub hash_build_weight: f64,
    pub hash_probe_weight: f64,
    pub leapfrog_weight: f64,
    /// Leapfrog is only considered when a variable is shared by this many patterns
    pub leapfrog_min_shared_patterns: usize,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            point_scan_weight: 1.0,
            prefix_scan_weight: 2.0,
            full_scan_weight: 4.0,
            index_probe_weight: 2.0,
            hash_build_weight: 1.5,
            hash_probe_weight: 1.0,
            leapfrog_weight: 0.25,
            leapfrog_min_shared_patterns: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumerationConfig {
    /// Up to this many patterns every join tree is enumerated; above it DPccp runs
    pub exhaustive_threshold: usize,
}

impl Default for EnumerationConfig {
    fn default() -> Self {
        Self { exhaustive_threshold: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub max_join_iterations: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { max_join_iterations: 5_000_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ordering: OrderingConfig,
    pub cardinality: CardinalityConfig,
    pub cost: CostConfig,
    pub enumeration: EnumerationConfig,
    pub executor: ExecutorConfig,
    pub cache: CacheConfig,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| QueryError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
