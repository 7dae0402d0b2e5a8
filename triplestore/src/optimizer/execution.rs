/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use rustc_hash::FxHashMap;
use shared::index_key::{encode_prefix, IndexKey, IndexOrdering};
use shared::terms::TriplePattern;

use super::plan::{Operator, Plan, PlanNode};
use crate::config::ExecutorConfig;
use crate::error::{QueryError, Result};
use crate::leapfrog::{Binding, MultiLevelExecutor, SortedIndexIterator};
use crate::storage::{contains_triple, IndexStorage};

/// Executes plan trees against a storage, materializing every operator's output
pub struct PlanExecutor<'s, S: IndexStorage + ?Sized> {
    storage: &'s S,
    config: ExecutorConfig,
}

impl<'s, S: IndexStorage + ?Sized> PlanExecutor<'s, S> {
    pub fn new(storage: &'s S, config: ExecutorConfig) -> Self {
        Self { storage, config }
    }

    pub fn execute(&self, plan: &Plan) -> Result<Vec<Binding>> {
        let rows = self.run(&plan.root, &plan.patterns)?;
        log::debug!("{} plan produced {} bindings", plan.strategy, rows.len());
        Ok(rows)
    }

    fn run(&self, node: &PlanNode, patterns: &[TriplePattern]) -> Result<Vec<Binding>> {
        match &node.operator {
            Operator::Scan { pattern, .. } => self.scan(pattern_at(patterns, *pattern)?),
            Operator::HashJoin { build, probe, on } => {
                let mut table: FxHashMap<Vec<u64>, Vec<Binding>> = FxHashMap::default();
                for row in self.run(build, patterns)? {
                    if let Some(key) = join_key(&row, on) {
                        table.entry(key).or_default().push(row);
                    }
                }
                let mut out = Vec::new();
                for row in self.run(probe, patterns)? {
                    let Some(matches) = join_key(&row, on).and_then(|key| table.get(&key)) else {
                        continue;
                    };
                    for other in matches {
                        if let Some(merged) = merge(&row, other) {
                            out.push(merged);
                        }
                    }
                }
                Ok(out)
            }
            Operator::NestedLoopJoin { outer, inner, .. } => {
                let outer_rows = self.run(outer, patterns)?;
                let mut out = Vec::new();
                if let Operator::Scan { pattern, .. } = &inner.operator {
                    // index probe with the outer row's values substituted
                    let pattern = pattern_at(patterns, *pattern)?;
                    for row in &outer_rows {
                        for found in self.scan(&pattern.substitute(row))? {
                            if let Some(merged) = merge(row, &found) {
                                out.push(merged);
                            }
                        }
                    }
                } else {
                    let inner_rows = self.run(inner, patterns)?;
                    for row in &outer_rows {
                        out.extend(inner_rows.iter().filter_map(|other| merge(row, other)));
                    }
                }
                Ok(out)
            }
            Operator::Leapfrog { patterns: members, order } => {
                let selected = members
                    .iter()
                    .map(|i| pattern_at(patterns, *i).cloned())
                    .collect::<Result<Vec<_>>>()?;
                MultiLevelExecutor::open(self.storage, selected, order.clone(), self.config.clone())?.collect()
            }
        }
    }

    /// Every binding of the variables of `pattern` present in the store
    pub fn scan(&self, pattern: &TriplePattern) -> Result<Vec<Binding>> {
        if let Some(triple) = pattern.to_triple() {
            return Ok(if contains_triple(self.storage, &triple)? { vec![Binding::new()] } else { Vec::new() });
        }
        let constants = pattern.constant_positions();
        let ordering = IndexOrdering::for_bound(&constants).unwrap_or(IndexOrdering::Spo);
        let mut values: Vec<u64> = ordering.positions()[..constants.len()]
            .iter()
            .filter_map(|p| pattern.term(*p).as_constant())
            .collect();
        let mut out = Vec::new();
        self.walk(pattern, ordering, &mut values, &mut out)?;
        Ok(out)
    }

    /// Depth-first walk of the index levels below the prefix in `values`
    fn walk(
        &self,
        pattern: &TriplePattern,
        ordering: IndexOrdering,
        values: &mut Vec<u64>,
        out: &mut Vec<Binding>,
    ) -> Result<()> {
        let level = values.len() as u8;
        let mut iterator = SortedIndexIterator::open(self.storage, ordering, encode_prefix(values), level)?;
        while let Some(value) = iterator.current() {
            values.push(value);
            if values.len() == 3 {
                let triple = IndexKey::from_components([values[0], values[1], values[2]]).decode(ordering);
                if let Some(binding) = pattern.match_triple(&triple) {
                    out.push(binding);
                }
            } else {
                self.walk(pattern, ordering, values, out)?;
            }
            values.pop();
            iterator.advance()?;
        }
        iterator.close();
        Ok(())
    }
}

fn pattern_at(patterns: &[TriplePattern], index: usize) -> Result<&TriplePattern> {
    patterns
        .get(index)
        .ok_or_else(|| QueryError::MalformedPattern(format!("plan refers to missing pattern #{}", index)))
}

fn join_key(row: &Binding, on: &[String]) -> Option<Vec<u64>> {
    on.iter().map(|var| row.get(var).copied()).collect()
}

/// Union of two bindings, or `None` if they disagree on a variable
fn merge(left: &Binding, right: &Binding) -> Option<Binding> {
    let mut merged = left.clone();
    for (var, value) in right {
        match merged.get(var) {
            Some(existing) if existing != value => return None,
            Some(_) => {}
            None => {
                merged.insert(var.clone(), *value);
            }
        }
    }
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::optimizer::JoinEnumerator;
    use crate::storage::MemoryIndexStore;
    use shared::terms::Term;
    use shared::triple::Triple;

    fn tp(s: Term, p: Term, o: Term) -> TriplePattern {
        TriplePattern::new(s, p, o)
    }

    fn sorted(mut rows: Vec<Binding>) -> Vec<Binding> {
        rows.sort();
        rows
    }

    #[test]
    fn test_scan_with_repeated_variable() {
        let store = MemoryIndexStore::from_triples(vec![
            Triple::new(1, 5, 1),
            Triple::new(1, 5, 2),
            Triple::new(3, 6, 3),
        ]);
        let executor = PlanExecutor::new(&store, ExecutorConfig::default());
        let rows = executor.scan(&tp(Term::var("x"), Term::var("p"), Term::var("x"))).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|b| b.len() == 2));

        let by_predicate = executor.scan(&tp(Term::var("s"), Term::Constant(5), Term::var("o"))).unwrap();
        assert_eq!(by_predicate.len(), 2);
        assert_eq!(store.open_iterator_count(), 0);
    }

    #[test]
    fn test_merge() {
        let a: Binding = [("x".to_string(), 1)].into_iter().collect();
        let b: Binding = [("x".to_string(), 1), ("y".to_string(), 2)].into_iter().collect();
        let c: Binding = [("x".to_string(), 3)].into_iter().collect();
        assert_eq!(merge(&a, &b), Some(b.clone()));
        assert_eq!(merge(&a, &c), None);
    }

    #[test]
    fn test_plans_agree_with_leapfrog() {
        let triples: Vec<Triple> = (0..30u64)
            .flat_map(|i| [Triple::new(i, 1, (i * 7) % 30), Triple::new(i, 2, (i * 3) % 30), Triple::new(i % 5, 3, i)])
            .collect();
        let store = MemoryIndexStore::from_triples(triples);
        let patterns = vec![
            tp(Term::var("a"), Term::Constant(1), Term::var("b")),
            tp(Term::var("b"), Term::Constant(2), Term::var("c")),
            tp(Term::var("c"), Term::Constant(3), Term::var("d")),
        ];
        let config = EngineConfig::default();
        let plan = JoinEnumerator::new(&config, None).plan(&patterns).unwrap();
        let executor = PlanExecutor::new(&store, config.executor.clone());
        let binary = sorted(executor.execute(&plan).unwrap());

        let order = vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()];
        let leapfrog = MultiLevelExecutor::open(&store, patterns, order, ExecutorConfig::default())
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert!(!binary.is_empty());
        assert_eq!(binary, sorted(leapfrog));
    }
}
