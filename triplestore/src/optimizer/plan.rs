/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use serde::Serialize;
use shared::index_key::IndexOrdering;
use shared::terms::{Term, TriplePattern};

use super::cost::ScanKind;
use crate::error::Result;

/// Physical operators of a plan tree. Scans and leapfrog joins refer to
/// patterns by their index in `Plan::patterns`.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Scan {
        pattern: usize,
        kind: ScanKind,
        ordering: IndexOrdering,
    },
    NestedLoopJoin {
        outer: Box<PlanNode>,
        inner: Box<PlanNode>,
        on: Vec<String>,
    },
    HashJoin {
        build: Box<PlanNode>,
        probe: Box<PlanNode>,
        on: Vec<String>,
    },
    Leapfrog {
        patterns: Vec<usize>,
        order: Vec<String>,
    },
}

impl Operator {
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Scan { .. } => "Scan",
            Operator::NestedLoopJoin { .. } => "NestedLoopJoin",
            Operator::HashJoin { .. } => "HashJoin",
            Operator::Leapfrog { .. } => "Leapfrog",
        }
    }

    pub fn children(&self) -> Vec<&PlanNode> {
        match self {
            Operator::Scan { .. } | Operator::Leapfrog { .. } => Vec::new(),
            Operator::NestedLoopJoin { outer, inner, .. } => vec![outer.as_ref(), inner.as_ref()],
            Operator::HashJoin { build, probe, .. } => vec![build.as_ref(), probe.as_ref()],
        }
    }
}

/// A node of the plan tree with its estimates
#[derive(Debug, Clone, PartialEq)]
pub struct PlanNode {
    pub operator: Operator,
    pub cardinality: f64,
    /// Total cost, inputs included
    pub cost: f64,
    /// Share of `cost` spent in this operator
    pub local_cost: f64,
    /// Bitmask of the patterns covered by this subtree
    pub patterns: u64,
}

impl PlanNode {
    pub fn is_scan(&self) -> bool {
        matches!(self.operator, Operator::Scan { .. })
    }

    pub fn pattern_count(&self) -> u32 {
        self.patterns.count_ones()
    }

    fn rename(&mut self, names: &BTreeMap<String, String>) {
        let rename_all = |vars: &mut Vec<String>| {
            for var in vars.iter_mut() {
                if let Some(name) = names.get(var) {
                    *var = name.clone();
                }
            }
        };
        match &mut self.operator {
            Operator::Scan { .. } => {}
            Operator::Leapfrog { order, .. } => rename_all(order),
            Operator::NestedLoopJoin { outer: left, inner: right, on }
            | Operator::HashJoin { build: left, probe: right, on } => {
                rename_all(on);
                left.rename(names);
                right.rename(names);
            }
        }
    }
}

/// How the plan was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Strategy {
    /// No pattern: a single empty solution
    Empty,
    Single,
    Exhaustive,
    DpCcp,
    Leapfrog,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Empty => "empty",
            Strategy::Single => "single",
            Strategy::Exhaustive => "exhaustive",
            Strategy::DpCcp => "dpccp",
            Strategy::Leapfrog => "leapfrog",
        };
        f.write_str(name)
    }
}

/// An immutable physical plan for one basic graph pattern
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub patterns: Vec<TriplePattern>,
    pub root: PlanNode,
    pub strategy: Strategy,
}

impl Plan {
    pub fn cost(&self) -> f64 {
        self.root.cost
    }

    pub fn cardinality(&self) -> f64 {
        self.root.cardinality
    }

    /// Variable order when the root is a leapfrog join
    pub fn variable_order(&self) -> Option<&[String]> {
        match &self.root.operator {
            Operator::Leapfrog { order, .. } => Some(order),
            _ => None,
        }
    }

    /// Copy of the plan with variables renamed through `names`; names absent
    /// from the map are kept.
    pub fn rename_variables(&self, names: &BTreeMap<String, String>) -> Plan {
        let mut plan = self.clone();
        for pattern in &mut plan.patterns {
            for position in shared::triple::Position::ALL {
                if let Term::Variable(var) = pattern.term_mut(position) {
                    if let Some(name) = names.get(var.as_str()) {
                        *var = name.clone();
                    }
                }
            }
        }
        plan.root.rename(names);
        plan
    }
}

/// Cost split of one node
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostBreakdown {
    /// Cost of producing the inputs
    pub inputs: f64,
    /// Cost of the operator itself
    pub operator: f64,
}

/// Explain view of a plan node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplainNode {
    pub operator: String,
    pub estimated_cardinality: f64,
    pub cost: f64,
    pub cost_breakdown: CostBreakdown,
    pub detail: String,
    pub children: Vec<ExplainNode>,
}

/// Explain view of a whole plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanExplain {
    pub strategy: Strategy,
    pub pattern_count: usize,
    pub root: ExplainNode,
}

impl PlanExplain {
    /// Indented text rendering, one operator per line
    pub fn tree_description(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "strategy: {} ({} patterns)", self.strategy, self.pattern_count);
        describe(&self.root, 0, &mut out);
        out
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn describe(node: &ExplainNode, depth: usize, out: &mut String) {
    let _ = writeln!(
        out,
        "{}{} [{}] card={:.1} cost={:.1}",
        "  ".repeat(depth),
        node.operator,
        node.detail,
        node.estimated_cardinality,
        node.cost
    );
    for child in &node.children {
        describe(child, depth + 1, out);
    }
}

/// Builds the explain view of `plan`
pub fn explain(plan: &Plan) -> PlanExplain {
    PlanExplain {
        strategy: plan.strategy,
        pattern_count: plan.patterns.len(),
        root: explain_node(&plan.root, &plan.patterns),
    }
}

fn explain_node(node: &PlanNode, patterns: &[TriplePattern]) -> ExplainNode {
    let detail = match &node.operator {
        Operator::Scan { pattern, kind, ordering } => match patterns.get(*pattern) {
            Some(p) => format!("{} {} scan of {}", ordering, kind, p),
            None => format!("{} {} scan of #{}", ordering, kind, pattern),
        },
        Operator::NestedLoopJoin { on, .. } | Operator::HashJoin { on, .. } => {
            if on.is_empty() {
                "cross product".to_string()
            } else {
                format!("on {}", join_vars(on))
            }
        }
        Operator::Leapfrog { patterns: members, order } => {
            let listed: Vec<String> = members
                .iter()
                .filter_map(|i| patterns.get(*i))
                .map(|p| p.to_string())
                .collect();
            format!("order {} over {}", join_vars(order), listed.join(", "))
        }
    };
    ExplainNode {
        operator: node.operator.name().to_string(),
        estimated_cardinality: node.cardinality,
        cost: node.cost,
        cost_breakdown: CostBreakdown {
            inputs: node.cost - node.local_cost,
            operator: node.local_cost,
        },
        detail,
        children: node
            .operator
            .children()
            .into_iter()
            .map(|child| explain_node(child, patterns))
            .collect(),
    }
}

fn join_vars(vars: &[String]) -> String {
    vars.iter().map(|v| format!("?{}", v)).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> Plan {
        let patterns = vec![
            TriplePattern::new(Term::var("a"), Term::Constant(1), Term::var("b")),
            TriplePattern::new(Term::var("b"), Term::Constant(2), Term::var("c")),
        ];
        let scan = |i: usize, card: f64| PlanNode {
            operator: Operator::Scan { pattern: i, kind: ScanKind::Prefix, ordering: IndexOrdering::Pos },
            cardinality: card,
            cost: card * 2.0,
            local_cost: card * 2.0,
            patterns: 1 << i,
        };
        Plan {
            patterns,
            root: PlanNode {
                operator: Operator::HashJoin {
                    build: Box::new(scan(0, 10.0)),
                    probe: Box::new(scan(1, 100.0)),
                    on: vec!["b".to_string()],
                },
                cardinality: 100.0,
                cost: 335.0,
                local_cost: 115.0,
                patterns: 0b11,
            },
            strategy: Strategy::Exhaustive,
        }
    }

    #[test]
    fn test_explain_tree() {
        let view = explain(&sample_plan());
        assert_eq!(view.root.operator, "HashJoin");
        assert_eq!(view.root.children.len(), 2);
        assert_eq!(view.root.cost_breakdown.inputs, 220.0);
        assert_eq!(view.root.cost_breakdown.operator, 115.0);

        let text = view.tree_description();
        assert!(text.starts_with("strategy: exhaustive (2 patterns)"));
        assert!(text.contains("HashJoin [on ?b]"));
        assert!(text.contains("\n  Scan [POS prefix scan of"));

        let json = view.to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["root"]["children"][1]["estimated_cardinality"], 100.0);
        assert_eq!(parsed["strategy"], "Exhaustive");
    }

    #[test]
    fn test_rename_variables() {
        let names: BTreeMap<String, String> =
            [("b".to_string(), "mid".to_string())].into_iter().collect();
        let renamed = sample_plan().rename_variables(&names);
        assert!(renamed.patterns[0].contains_variable("mid"));
        assert!(renamed.patterns[1].contains_variable("mid"));
        assert!(renamed.patterns[1].contains_variable("c"));
        match &renamed.root.operator {
            Operator::HashJoin { on, .. } => assert_eq!(on, &vec!["mid".to_string()]),
            other => panic!("unexpected operator {:?}", other),
        }
    }
}
