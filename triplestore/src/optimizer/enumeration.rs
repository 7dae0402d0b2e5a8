/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use shared::index_key::IndexOrdering;
use shared::terms::TriplePattern;

use super::cardinality::CardinalityEstimator;
use super::cost::{CostModel, ScanKind};
use super::plan::{Operator, Plan, PlanNode, Strategy};
use crate::config::EngineConfig;
use crate::error::{QueryError, Result};
use crate::leapfrog::VariableOrdering;
use crate::stats::StatisticsSource;

/// Pattern sets are bitmasks, which bounds the query size
pub const MAX_PATTERNS: usize = 64;

/// Cost-based plan enumeration for basic graph patterns.
///
/// Small queries enumerate every cross-product-free bushy tree; larger ones
/// run DPccp over connected subgraphs. A leapfrog plan replaces the best
/// binary tree when it is cheaper.
pub struct JoinEnumerator<'a> {
    config: &'a EngineConfig,
    stats: Option<&'a dyn StatisticsSource>,
    estimator: CardinalityEstimator<'a>,
    costs: CostModel<'a>,
}

/// Planning state for one query
struct QueryGraph<'p> {
    patterns: &'p [TriplePattern],
    /// Distinct variables of each pattern
    variables: Vec<BTreeSet<&'p str>>,
    /// Patterns sharing at least one variable with each pattern
    neighbors: Vec<u64>,
    scans: Vec<PlanNode>,
}

impl<'p> QueryGraph<'p> {
    fn all(&self) -> u64 {
        mask_below(self.patterns.len())
    }

    fn neighborhood(&self, set: u64) -> u64 {
        bits(set).fold(0, |acc, i| acc | self.neighbors[i]) & !set
    }

    fn is_connected(&self, set: u64) -> bool {
        if set == 0 {
            return false;
        }
        let mut reached = set & set.wrapping_neg();
        loop {
            let grown = reached | (self.neighborhood(reached) & set);
            if grown == reached {
                return reached == set;
            }
            reached = grown;
        }
    }

    /// Connected components in ascending order of their lowest pattern
    fn components(&self) -> Vec<u64> {
        let mut remaining = self.all();
        let mut components = Vec::new();
        while remaining != 0 {
            let mut component = remaining & remaining.wrapping_neg();
            loop {
                let grown = component | (self.neighborhood(component) & remaining);
                if grown == component {
                    break;
                }
                component = grown;
            }
            components.push(component);
            remaining &= !component;
        }
        components
    }

    fn variables_of(&self, set: u64) -> BTreeSet<&'p str> {
        bits(set).flat_map(|i| self.variables[i].iter().copied()).collect()
    }

    fn shared_variables(&self, left: u64, right: u64) -> Vec<String> {
        let right_vars = self.variables_of(right);
        self.variables_of(left)
            .into_iter()
            .filter(|v| right_vars.contains(v))
            .map(str::to_string)
            .collect()
    }
}

impl<'a> JoinEnumerator<'a> {
    pub fn new(config: &'a EngineConfig, stats: Option<&'a dyn StatisticsSource>) -> Self {
        Self {
            config,
            stats,
            estimator: CardinalityEstimator::new(&config.cardinality, stats),
            costs: CostModel::new(&config.cost, config.cardinality.join_selectivity),
        }
    }

    /// Chooses a plan for `patterns`
    pub fn plan(&self, patterns: &[TriplePattern]) -> Result<Plan> {
        let n = patterns.len();
        if n > MAX_PATTERNS {
            return Err(QueryError::TooManyPatterns { count: n, max: MAX_PATTERNS });
        }
        if n == 0 {
            return Ok(Plan {
                patterns: Vec::new(),
                root: PlanNode {
                    operator: Operator::Leapfrog { patterns: Vec::new(), order: Vec::new() },
                    cardinality: 1.0,
                    cost: 0.0,
                    local_cost: 0.0,
                    patterns: 0,
                },
                strategy: Strategy::Empty,
            });
        }

        let graph = self.build_graph(patterns);
        if n == 1 {
            return Ok(Plan {
                patterns: patterns.to_vec(),
                root: graph.scans[0].clone(),
                strategy: Strategy::Single,
            });
        }

        let (root, strategy) = if n <= self.config.enumeration.exhaustive_threshold {
            (self.best_exhaustive(&graph), Strategy::Exhaustive)
        } else {
            (self.best_dpccp(&graph), Strategy::DpCcp)
        };
        log::debug!("best {} plan for {} patterns: cost {:.2}", strategy, n, root.cost);

        let plan = match self.leapfrog_candidate(&graph) {
            Some(leapfrog) if leapfrog.cost < root.cost => {
                log::debug!("leapfrog wins: cost {:.2} < {:.2}", leapfrog.cost, root.cost);
                Plan { patterns: patterns.to_vec(), root: leapfrog, strategy: Strategy::Leapfrog }
            }
            _ => Plan { patterns: patterns.to_vec(), root, strategy },
        };
        Ok(plan)
    }

    /// Best binary plan over every cross-product-free bushy tree
    pub fn plan_exhaustive(&self, patterns: &[TriplePattern]) -> Result<PlanNode> {
        let graph = self.checked_graph(patterns)?;
        Ok(self.best_exhaustive(&graph))
    }

    /// Best binary plan found by DPccp
    pub fn plan_dpccp(&self, patterns: &[TriplePattern]) -> Result<PlanNode> {
        let graph = self.checked_graph(patterns)?;
        Ok(self.best_dpccp(&graph))
    }

    fn checked_graph<'p>(&self, patterns: &'p [TriplePattern]) -> Result<QueryGraph<'p>> {
        if patterns.is_empty() {
            return Err(QueryError::MalformedPattern("no pattern to join".to_string()));
        }
        if patterns.len() > MAX_PATTERNS {
            return Err(QueryError::TooManyPatterns { count: patterns.len(), max: MAX_PATTERNS });
        }
        Ok(self.build_graph(patterns))
    }

    fn build_graph<'p>(&self, patterns: &'p [TriplePattern]) -> QueryGraph<'p> {
        let variables: Vec<BTreeSet<&'p str>> =
            patterns.iter().map(|p| p.variables().into_iter().collect()).collect();
        let neighbors = (0..patterns.len())
            .map(|i| {
                (0..patterns.len())
                    .filter(|&j| j != i && !variables[i].is_disjoint(&variables[j]))
                    .fold(0u64, |acc, j| acc | (1 << j))
            })
            .collect();
        let scans = patterns.iter().enumerate().map(|(i, p)| self.scan(i, p)).collect();
        QueryGraph { patterns, variables, neighbors, scans }
    }

    fn scan(&self, index: usize, pattern: &TriplePattern) -> PlanNode {
        let kind = ScanKind::for_pattern(pattern);
        let ordering = IndexOrdering::for_bound(&pattern.constant_positions()).unwrap_or(IndexOrdering::Spo);
        let cardinality = self.estimator.estimate(pattern, &[]);
        let cost = self.costs.scan(cardinality, kind);
        PlanNode {
            operator: Operator::Scan { pattern: index, kind, ordering },
            cardinality,
            cost,
            local_cost: cost,
            patterns: 1 << index,
        }
    }

    /// Cheapest binary operator joining two disjoint subplans
    fn combine(&self, graph: &QueryGraph<'_>, left: &PlanNode, right: &PlanNode) -> PlanNode {
        let on = graph.shared_variables(left.patterns, right.patterns);
        let set = left.patterns | right.patterns;
        let cardinality = self.estimator.subset(bits(set).map(|i| &graph.patterns[i]));
        let inputs = left.cost + right.cost;

        let (build, probe) = if right.cardinality < left.cardinality { (right, left) } else { (left, right) };
        let hash_local = self.costs.hash_join(left.cardinality, right.cardinality);
        let mut best = PlanNode {
            operator: Operator::HashJoin {
                build: Box::new(build.clone()),
                probe: Box::new(probe.clone()),
                on: on.clone(),
            },
            cardinality,
            cost: inputs + hash_local,
            local_cost: hash_local,
            patterns: set,
        };

        for (outer, inner) in [(left, right), (right, left)] {
            let probe = self.costs.probe(inner.cardinality, inner.cost, inner.is_scan(), on.len());
            let local = self.costs.nested_loop(outer.cardinality, probe);
            let cost = outer.cost + local;
            if cost < best.cost {
                best = PlanNode {
                    operator: Operator::NestedLoopJoin {
                        outer: Box::new(outer.clone()),
                        inner: Box::new(inner.clone()),
                        on: on.clone(),
                    },
                    cardinality,
                    cost,
                    local_cost: cost - outer.cost,
                    patterns: set,
                };
            }
        }
        best
    }

    /// Joins independent components with cross products, smallest first
    fn cross_products(&self, graph: &QueryGraph<'_>, mut parts: Vec<PlanNode>) -> PlanNode {
        parts.sort_by(|a, b| a.cardinality.total_cmp(&b.cardinality));
        let mut parts = parts.into_iter();
        let Some(mut acc) = parts.next() else {
            return graph.scans[0].clone();
        };
        for part in parts {
            let set = acc.patterns | part.patterns;
            let cardinality = self.estimator.subset(bits(set).map(|i| &graph.patterns[i]));
            let probe = self.costs.probe(part.cardinality, part.cost, part.is_scan(), 0);
            let local = self.costs.nested_loop(acc.cardinality, probe);
            let cost = acc.cost + local;
            acc = PlanNode {
                operator: Operator::NestedLoopJoin { outer: Box::new(acc), inner: Box::new(part), on: Vec::new() },
                cardinality,
                cost,
                local_cost: local,
                patterns: set,
            };
        }
        acc
    }

    fn best_exhaustive(&self, graph: &QueryGraph<'_>) -> PlanNode {
        let mut memo: FxHashMap<u64, Vec<PlanNode>> = FxHashMap::default();
        let parts = graph
            .components()
            .into_iter()
            .map(|component| {
                self.all_trees(graph, component, &mut memo)
                    .into_iter()
                    .min_by(|a, b| a.cost.total_cmp(&b.cost))
                    .unwrap_or_else(|| graph.scans[lowest(component)].clone())
            })
            .collect();
        self.cross_products(graph, parts)
    }

    /// Every cross-product-free join tree over the connected set `set`
    fn all_trees(&self, graph: &QueryGraph<'_>, set: u64, memo: &mut FxHashMap<u64, Vec<PlanNode>>) -> Vec<PlanNode> {
        if let Some(trees) = memo.get(&set) {
            return trees.clone();
        }
        if set.count_ones() == 1 {
            return vec![graph.scans[lowest(set)].clone()];
        }
        let anchor = set & set.wrapping_neg();
        let mut trees = Vec::new();
        // unordered splits: the left side always holds the lowest pattern
        let rest = set & !anchor;
        let mut extra = rest;
        loop {
            let left = anchor | extra;
            let right = set & !left;
            if right != 0
                && graph.is_connected(left)
                && graph.is_connected(right)
                && graph.neighborhood(left) & right != 0
            {
                let left_trees = self.all_trees(graph, left, memo);
                let right_trees = self.all_trees(graph, right, memo);
                for l in &left_trees {
                    for r in &right_trees {
                        trees.push(self.combine(graph, l, r));
                    }
                }
            }
            if extra == 0 {
                break;
            }
            extra = (extra - 1) & rest;
        }
        memo.insert(set, trees.clone());
        trees
    }

    fn best_dpccp(&self, graph: &QueryGraph<'_>) -> PlanNode {
        let mut pairs = CcpPairs { graph, pairs: Vec::new() };
        for i in (0..graph.patterns.len()).rev() {
            let start = 1u64 << i;
            pairs.emit_csg(start);
            pairs.enumerate_csg_rec(start, mask_below(i + 1));
        }
        // both halves of a pair are strictly smaller than their union
        let mut pairs = pairs.pairs;
        pairs.sort_by_key(|(left, right)| (left | right).count_ones());

        let mut best: FxHashMap<u64, PlanNode> =
            graph.scans.iter().map(|scan| (scan.patterns, scan.clone())).collect();
        for (left, right) in pairs {
            let (Some(l), Some(r)) = (best.get(&left), best.get(&right)) else {
                continue;
            };
            let candidate = self.combine(graph, l, r);
            let set = left | right;
            if best.get(&set).map_or(true, |current| candidate.cost < current.cost) {
                best.insert(set, candidate);
            }
        }
        log::trace!("dpccp kept {} connected subplans", best.len());

        let parts = graph
            .components()
            .into_iter()
            .map(|component| best.remove(&component).unwrap_or_else(|| graph.scans[lowest(component)].clone()))
            .collect();
        self.cross_products(graph, parts)
    }

    /// Leapfrog plan over all patterns, when some variable joins enough of them
    fn leapfrog_candidate(&self, graph: &QueryGraph<'_>) -> Option<PlanNode> {
        if !self.costs.leapfrog_applicable(graph.patterns) {
            return None;
        }
        let order = VariableOrdering::new(&self.config.ordering).compute(graph.patterns, self.stats);
        let all_vars = graph.variables_of(graph.all());
        if order.len() != all_vars.len() || !order.iter().all(|v| all_vars.contains(v.as_str())) {
            return None;
        }
        let participants: Vec<f64> = graph.scans.iter().map(|s| s.cardinality).collect();
        let cost = self.costs.leapfrog(&participants);
        Some(PlanNode {
            operator: Operator::Leapfrog { patterns: (0..graph.patterns.len()).collect(), order },
            cardinality: self.estimator.subset(graph.patterns),
            cost,
            local_cost: cost,
            patterns: graph.all(),
        })
    }
}

/// Connected subgraph / complement pair enumeration (Moerkotte and Neumann).
/// Every pair of disjoint connected sets joined by an edge is emitted once.
struct CcpPairs<'g, 'p> {
    graph: &'g QueryGraph<'p>,
    pairs: Vec<(u64, u64)>,
}

impl CcpPairs<'_, '_> {
    fn enumerate_csg_rec(&mut self, set: u64, excluded: u64) {
        let neighborhood = self.graph.neighborhood(set) & !excluded;
        for subset in subsets(neighborhood) {
            self.emit_csg(set | subset);
        }
        for subset in subsets(neighborhood) {
            self.enumerate_csg_rec(set | subset, excluded | neighborhood);
        }
    }

    fn emit_csg(&mut self, set: u64) {
        let excluded = set | mask_below(lowest(set) + 1);
        let neighborhood = self.graph.neighborhood(set) & !excluded;
        for v in bits(neighborhood).rev() {
            let complement = 1u64 << v;
            self.pairs.push((set, complement));
            self.enumerate_cmp_rec(set, complement, excluded | (mask_below(v + 1) & neighborhood));
        }
    }

    fn enumerate_cmp_rec(&mut self, csg: u64, cmp: u64, excluded: u64) {
        let neighborhood = self.graph.neighborhood(cmp) & !excluded;
        for subset in subsets(neighborhood) {
            self.pairs.push((csg, cmp | subset));
        }
        for subset in subsets(neighborhood) {
            self.enumerate_cmp_rec(csg, cmp | subset, excluded | neighborhood);
        }
    }
}

fn mask_below(n: usize) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

fn lowest(set: u64) -> usize {
    set.trailing_zeros() as usize
}

fn bits(set: u64) -> impl DoubleEndedIterator<Item = usize> {
    (0..64usize).filter(move |i| set & (1u64 << *i) != 0)
}

/// Non-empty subsets of `set`
fn subsets(set: u64) -> impl Iterator<Item = u64> {
    let mut next = set;
    std::iter::from_fn(move || {
        if next == 0 {
            return None;
        }
        let current = next;
        next = (next - 1) & set;
        Some(current)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::TripleStats;
    use shared::terms::Term;
    use shared::triple::Triple;

    fn tp(s: Term, p: Term, o: Term) -> TriplePattern {
        TriplePattern::new(s, p, o)
    }

    fn chain(n: u64) -> Vec<TriplePattern> {
        (0..n)
            .map(|i| tp(Term::var(&format!("v{}", i)), Term::Constant(i + 1), Term::var(&format!("v{}", i + 1))))
            .collect()
    }

    fn count_leaves(node: &PlanNode) -> usize {
        match &node.operator {
            Operator::Scan { .. } => 1,
            Operator::Leapfrog { patterns, .. } => patterns.len(),
            other => other.children().into_iter().map(count_leaves).sum(),
        }
    }

    #[test]
    fn test_subsets_and_bits() {
        let mut all: Vec<u64> = subsets(0b101).collect();
        all.sort();
        assert_eq!(all, vec![0b001, 0b100, 0b101]);
        assert_eq!(bits(0b1010).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(bits(0b1010).rev().collect::<Vec<_>>(), vec![3, 1]);
        assert_eq!(mask_below(64), u64::MAX);
    }

    #[test]
    fn test_empty_and_single() {
        let config = EngineConfig::default();
        let enumerator = JoinEnumerator::new(&config, None);
        let empty = enumerator.plan(&[]).unwrap();
        assert_eq!(empty.strategy, Strategy::Empty);
        assert_eq!(empty.cardinality(), 1.0);

        let single = enumerator.plan(&chain(1)).unwrap();
        assert_eq!(single.strategy, Strategy::Single);
        assert!(single.root.is_scan());
    }

    #[test]
    fn test_too_many_patterns() {
        let config = EngineConfig::default();
        let enumerator = JoinEnumerator::new(&config, None);
        let err = enumerator.plan(&chain(65)).unwrap_err();
        assert!(matches!(err, QueryError::TooManyPatterns { count: 65, max: 64 }));
    }

    #[test]
    fn test_strategy_threshold() {
        let config = EngineConfig::default();
        let enumerator = JoinEnumerator::new(&config, None);
        let small = enumerator.plan(&chain(5)).unwrap();
        assert_eq!(small.strategy, Strategy::Exhaustive);
        let large = enumerator.plan(&chain(7)).unwrap();
        assert_eq!(large.strategy, Strategy::DpCcp);
        assert_eq!(count_leaves(&large.root), 7);
        assert_eq!(large.root.patterns, 0b111_1111);
    }

    #[test]
    fn test_dpccp_matches_exhaustive_on_chain() {
        let config = EngineConfig::default();
        let enumerator = JoinEnumerator::new(&config, None);
        for n in 2..=6 {
            let patterns = chain(n);
            let exhaustive = enumerator.plan_exhaustive(&patterns).unwrap();
            let dpccp = enumerator.plan_dpccp(&patterns).unwrap();
            assert!(
                (exhaustive.cost - dpccp.cost).abs() <= 1e-9 * exhaustive.cost.max(1.0),
                "n={}: exhaustive {} vs dpccp {}",
                n,
                exhaustive.cost,
                dpccp.cost
            );
        }
    }

    #[test]
    fn test_disconnected_components_cross_product() {
        let config = EngineConfig::default();
        let enumerator = JoinEnumerator::new(&config, None);
        let patterns = vec![
            tp(Term::var("a"), Term::Constant(1), Term::var("b")),
            tp(Term::var("b"), Term::Constant(2), Term::var("c")),
            tp(Term::var("x"), Term::Constant(3), Term::Constant(9)),
        ];
        let plan = enumerator.plan(&patterns).unwrap();
        assert_eq!(count_leaves(&plan.root), 3);
        match &plan.root.operator {
            Operator::NestedLoopJoin { on, outer, .. } => {
                assert!(on.is_empty());
                // the lone pattern is the smaller component
                assert_eq!(outer.patterns, 0b100);
            }
            other => panic!("expected a cross product, got {:?}", other),
        }
        let exhaustive = enumerator.plan_exhaustive(&patterns).unwrap();
        let dpccp = enumerator.plan_dpccp(&patterns).unwrap();
        assert!((exhaustive.cost - dpccp.cost).abs() <= 1e-9 * exhaustive.cost);
    }

    #[test]
    fn test_star_prefers_leapfrog() {
        // star on ?x with large, equally sized predicates
        let triples: Vec<Triple> = (0..3u64)
            .flat_map(|p| (0..1000u64).map(move |s| Triple::new(s, p, s + 1)))
            .collect();
        let stats = TripleStats::from_triples(&triples);
        let config = EngineConfig::default();
        let enumerator = JoinEnumerator::new(&config, Some(&stats));
        let patterns: Vec<TriplePattern> = (0..3u64)
            .map(|p| tp(Term::var("x"), Term::Constant(p), Term::var(&format!("o{}", p))))
            .collect();
        let plan = enumerator.plan(&patterns).unwrap();
        assert_eq!(plan.strategy, Strategy::Leapfrog);
        assert_eq!(plan.variable_order().map(|o| o[0].as_str()), Some("x"));
    }

    #[test]
    fn test_selective_chain_uses_binary_joins() {
        let config = EngineConfig::default();
        let enumerator = JoinEnumerator::new(&config, None);
        let patterns = vec![
            tp(Term::Constant(5), Term::Constant(1), Term::var("a")),
            tp(Term::var("a"), Term::Constant(2), Term::var("b")),
        ];
        let plan = enumerator.plan(&patterns).unwrap();
        assert_eq!(plan.strategy, Strategy::Exhaustive);
        assert!(matches!(plan.root.operator, Operator::NestedLoopJoin { .. } | Operator::HashJoin { .. }));
    }
}
