/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::sync::Arc;

use parking_lot::RwLock;
use shared::terms::TriplePattern;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::leapfrog::{open_execution, Binding, ExecutionStats, MultiLevelExecutor};
use crate::optimizer::{explain, CacheStats, JoinEnumerator, Plan, PlanCache, PlanExecutor, PlanExplain, QueryShape};
use crate::stats::{StatisticsSource, TripleStats};
use crate::storage::IndexStorage;

/// Entry point for planning and running basic graph patterns over a store
pub struct QueryEngine<S: IndexStorage> {
    storage: Arc<S>,
    config: EngineConfig,
    cache: Arc<PlanCache>,
    stats: RwLock<Option<Arc<TripleStats>>>,
}

impl<S: IndexStorage> QueryEngine<S> {
    /// Create a new query engine without statistics
    pub fn new(storage: Arc<S>, config: EngineConfig) -> Self {
        let cache = Arc::new(PlanCache::new(&config.cache));
        Self::with_cache(storage, config, cache)
    }

    /// Create an engine sharing an existing plan cache
    pub fn with_cache(storage: Arc<S>, config: EngineConfig, cache: Arc<PlanCache>) -> Self {
        Self { storage, config, cache, stats: RwLock::new(None) }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<PlanCache> {
        &self.cache
    }

    pub fn stats(&self) -> Option<Arc<TripleStats>> {
        self.stats.read().clone()
    }

    /// Replaces the statistics; cached plans were built on the old ones
    pub fn set_stats(&self, stats: Option<TripleStats>) {
        *self.stats.write() = stats.map(Arc::new);
        self.cache.invalidate();
    }

    /// Re-gathers statistics from the storage and drops every cached plan
    pub fn refresh_stats(&self) -> Result<Arc<TripleStats>> {
        let stats = Arc::new(TripleStats::gather(self.storage.as_ref())?);
        *self.stats.write() = Some(Arc::clone(&stats));
        self.cache.invalidate();
        Ok(stats)
    }

    /// Plans `patterns` without touching the cache
    pub fn plan(&self, patterns: &[TriplePattern]) -> Result<Plan> {
        let stats = self.stats();
        let source = stats.as_deref().map(|s| s as &dyn StatisticsSource);
        JoinEnumerator::new(&self.config, source).plan(patterns)
    }

    /// Plans `patterns` through the shape cache. The returned plan uses the
    /// caller's variable names.
    pub fn plan_cached(&self, patterns: &[TriplePattern]) -> Result<Arc<Plan>> {
        let shape = QueryShape::normalize(patterns);
        let normalized = self.cache.get_or_compute(&shape, |p| self.plan(p))?;
        Ok(Arc::new(normalized.rename_variables(&shape.original_names())))
    }

    pub fn explain(&self, plan: &Plan) -> PlanExplain {
        explain(plan)
    }

    /// Opens a lazy leapfrog execution over `patterns`
    pub fn open_execution(&self, patterns: &[TriplePattern]) -> Result<Execution<'_, S>> {
        let stats = self.stats();
        let source = stats.as_deref().map(|s| s as &dyn StatisticsSource);
        let inner = open_execution(self.storage.as_ref(), patterns, source, &self.config)?;
        Ok(Execution { inner })
    }

    /// Runs `patterns` with the cached plan and returns every binding
    pub fn query(&self, patterns: &[TriplePattern]) -> Result<Vec<Binding>> {
        let plan = self.plan_cached(patterns)?;
        PlanExecutor::new(self.storage.as_ref(), self.config.executor.clone()).execute(&plan)
    }

    pub fn invalidate_plans(&self) {
        self.cache.invalidate();
    }

    pub fn invalidate_shape(&self, patterns: &[TriplePattern]) -> bool {
        self.cache.invalidate_shape(&QueryShape::normalize(patterns))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// A running query; pull bindings with `next`, stop early with `close`
pub struct Execution<'e, S: IndexStorage> {
    inner: MultiLevelExecutor<'e, S>,
}

impl<S: IndexStorage> Execution<'_, S> {
    pub fn close(&mut self) {
        self.inner.close();
    }

    pub fn variable_order(&self) -> &[String] {
        self.inner.variable_order()
    }

    pub fn stats(&self) -> ExecutionStats {
        self.inner.stats()
    }
}

impl<S: IndexStorage> Iterator for Execution<'_, S> {
    type Item = Result<Binding>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
