/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::terms::{Term, TriplePattern};
use shared::triple::Triple;
use triplestore::Binding;

pub const PREDICATES: u64 = 3;
pub const NODES: u64 = 12;

pub fn tp(s: Term, p: Term, o: Term) -> TriplePattern {
    TriplePattern::new(s, p, o)
}

pub fn var(name: &str) -> Term {
    Term::var(name)
}

pub fn id(value: u64) -> Term {
    Term::Constant(value)
}

/// Random graph over `NODES` nodes and predicates `1..=PREDICATES`
pub fn random_triples(seed: u64, count: usize) -> Vec<Triple> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut triples: Vec<Triple> = (0..count)
        .map(|_| {
            Triple::new(
                rng.gen_range(0..NODES),
                rng.gen_range(1..=PREDICATES),
                rng.gen_range(0..NODES),
            )
        })
        .collect();
    triples.sort();
    triples.dedup();
    triples
}

#[derive(Debug, Clone, Copy)]
pub enum Shape {
    Star,
    Chain,
    Triangle,
}

pub const SHAPES: [Shape; 3] = [Shape::Star, Shape::Chain, Shape::Triangle];

/// Random basic graph pattern of the given shape. Predicates are random;
/// some leaves are replaced by constants.
pub fn random_bgp(rng: &mut StdRng, shape: Shape, size: usize) -> Vec<TriplePattern> {
    let predicate = |rng: &mut StdRng| id(rng.gen_range(1..=PREDICATES));
    let leaf = |rng: &mut StdRng, name: String| {
        if rng.gen_bool(0.2) {
            id(rng.gen_range(0..NODES))
        } else {
            Term::var(&name)
        }
    };
    match shape {
        Shape::Star => (0..size)
            .map(|i| {
                let p = predicate(rng);
                let o = leaf(rng, format!("o{}", i));
                tp(var("x"), p, o)
            })
            .collect(),
        Shape::Chain => (0..size)
            .map(|i| {
                let p = predicate(rng);
                tp(var(&format!("v{}", i)), p, var(&format!("v{}", i + 1)))
            })
            .collect(),
        Shape::Triangle => {
            let mut patterns = vec![
                tp(var("a"), predicate(rng), var("b")),
                tp(var("b"), predicate(rng), var("c")),
                tp(var("c"), predicate(rng), var("a")),
            ];
            for i in 3..size {
                let p = predicate(rng);
                let o = leaf(rng, format!("t{}", i));
                patterns.push(tp(var("a"), p, o));
            }
            patterns
        }
    }
}

/// Reference evaluation: one nested loop per pattern over every triple
pub fn naive_evaluate(triples: &[Triple], patterns: &[TriplePattern]) -> Vec<Binding> {
    let mut rows = vec![Binding::new()];
    for pattern in patterns {
        let mut next = Vec::new();
        for row in &rows {
            let bound = pattern.substitute(row);
            for triple in triples {
                if let Some(found) = bound.match_triple(triple) {
                    let mut merged = row.clone();
                    merged.extend(found);
                    next.push(merged);
                }
            }
        }
        rows = next;
    }
    sorted(rows)
}

pub fn sorted(mut rows: Vec<Binding>) -> Vec<Binding> {
    rows.sort();
    rows
}
