/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

pub mod config;
pub mod error;
pub mod leapfrog;
pub mod optimizer;
pub mod query_engine;
pub mod stats;
pub mod storage;

pub use config::EngineConfig;
pub use error::{QueryError, Result, StorageError};
pub use leapfrog::{open_execution, Binding};
pub use optimizer::{explain, Plan, PlanCache, QueryShape};
pub use query_engine::{Execution, QueryEngine};
pub use stats::{StatisticsSource, TripleStats};
pub use storage::{IndexStorage, MemoryIndexStore};
