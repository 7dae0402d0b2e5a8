/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Worst-case optimal evaluation of basic graph patterns
//!
//! Leapfrog Triejoin over the SPO/POS/OSP index orderings. Variables are
//! bound one at a time; for each variable every pattern mentioning it
//! contributes one sorted iterator and the iterators are intersected by
//! leapfrogging.
//!
//! - `iterator`: forward-only cursor over the distinct values at one index level
//! - `join`: k-way leapfrog intersection
//! - `ordering`: variable order heuristics and index choice per pattern
//! - `executor`: pull-driven state machine producing bindings
//!
//! ## Usage
//!
//! ```rust,ignore
//! let store = MemoryIndexStore::from_triples(triples);
//! let config = EngineConfig::default();
//! for binding in open_execution(&store, &patterns, None, &config)? {
//!     println!("{:?}", binding?);
//! }
//! ```

pub mod executor;
pub mod iterator;
pub mod join;
pub mod ordering;

pub use executor::{Binding, ExecutionStats, MultiLevelExecutor};
pub use iterator::SortedIndexIterator;
pub use join::LeapfrogJoin;
pub use ordering::{best_index_for, IndexChoice, VariableOrdering};

use shared::terms::TriplePattern;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::stats::StatisticsSource;
use crate::storage::IndexStorage;

/// Orders the variables of `patterns` and opens an executor over them
pub fn open_execution<'s, S: IndexStorage + ?Sized>(
    storage: &'s S,
    patterns: &[TriplePattern],
    stats: Option<&dyn StatisticsSource>,
    config: &EngineConfig,
) -> Result<MultiLevelExecutor<'s, S>> {
    let order = VariableOrdering::new(&config.ordering).compute(patterns, stats);
    log::debug!("leapfrog variable order: {:?}", order);
    MultiLevelExecutor::open(storage, patterns.to_vec(), order, config.executor.clone())
}
