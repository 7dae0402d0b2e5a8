/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Cost-based join planning for basic graph patterns
//!
//! The optimizer estimates pattern cardinalities, costs binary join trees
//! (hash join, index nested loop) and leapfrog plans, and keeps the
//! cheapest. Plans are cached by query shape.
//!
//! ## Architecture
//!
//! - `cardinality`: pattern and pattern-set cardinality estimation
//! - `cost`: operator cost model
//! - `plan`: plan trees and their explain view
//! - `enumeration`: exhaustive and DPccp join enumeration
//! - `shape`: variable-name-independent query shapes
//! - `cache`: LRU plan cache keyed by shape
//! - `execution`: materializing executor for any plan tree
//!
//! ## Usage
//!
//! ```rust,ignore
//! let config = EngineConfig::default();
//! let plan = JoinEnumerator::new(&config, Some(&stats)).plan(&patterns)?;
//! println!("{}", explain(&plan).tree_description());
//! let rows = PlanExecutor::new(&store, config.executor.clone()).execute(&plan)?;
//! ```

pub mod cache;
pub mod cardinality;
pub mod cost;
pub mod enumeration;
pub mod execution;
pub mod plan;
pub mod shape;

pub use cache::{CacheStats, PlanCache};
pub use cardinality::CardinalityEstimator;
pub use cost::{CostModel, ScanKind};
pub use enumeration::{JoinEnumerator, MAX_PATTERNS};
pub use execution::PlanExecutor;
pub use plan::{explain, CostBreakdown, ExplainNode, Operator, Plan, PlanExplain, PlanNode, Strategy};
pub use shape::{QueryShape, ShapeKey};
