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
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::triple::{Position, Triple};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Term {
    Variable(String),
    Constant(u64),
}

impl Term {
    /// Builds a variable term, stripping a leading `?` if present
    pub fn var(name: &str) -> Self {
        Term::Variable(name.strip_prefix('?').unwrap_or(name).to_string())
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Term::Variable(name) => Some(name),
            Term::Constant(_) => None,
        }
    }

    pub fn as_constant(&self) -> Option<u64> {
        match self {
            Term::Constant(id) => Some(*id),
            Term::Variable(_) => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(name) => write!(f, "?{}", name),
            Term::Constant(id) => write!(f, "{}", id),
        }
    }
}

/// Raised when a pattern is built from anything but three terms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("a triple pattern needs exactly 3 terms, got {0}")]
pub struct PatternArityError(pub usize);

/// A triple template whose slots are constants or variables.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl TriplePattern {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self { subject, predicate, object }
    }

    pub fn term(&self, position: Position) -> &Term {
        match position {
            Position::Subject => &self.subject,
            Position::Predicate => &self.predicate,
            Position::Object => &self.object,
        }
    }

    pub fn term_mut(&mut self, position: Position) -> &mut Term {
        match position {
            Position::Subject => &mut self.subject,
            Position::Predicate => &mut self.predicate,
            Position::Object => &mut self.object,
        }
    }

    pub fn terms(&self) -> [(Position, &Term); 3] {
        [
            (Position::Subject, &self.subject),
            (Position::Predicate, &self.predicate),
            (Position::Object, &self.object),
        ]
    }

    /// Distinct variable names in subject, predicate, object order
    pub fn variables(&self) -> Vec<&str> {
        let mut vars: Vec<&str> = Vec::with_capacity(3);
        for (_, term) in self.terms() {
            if let Some(name) = term.as_variable() {
                if !vars.contains(&name) {
                    vars.push(name);
                }
            }
        }
        vars
    }

    pub fn contains_variable(&self, variable: &str) -> bool {
        self.terms().iter().any(|(_, t)| t.as_variable() == Some(variable))
    }

    /// Every position at which `variable` occurs
    pub fn positions_of(&self, variable: &str) -> Vec<Position> {
        self.terms()
            .iter()
            .filter(|(_, t)| t.as_variable() == Some(variable))
            .map(|(p, _)| *p)
            .collect()
    }

    pub fn constant_positions(&self) -> Vec<Position> {
        self.terms()
            .iter()
            .filter(|(_, t)| !t.is_var())
            .map(|(p, _)| *p)
            .collect()
    }

    pub fn constant_count(&self) -> usize {
        self.terms().iter().filter(|(_, t)| !t.is_var()).count()
    }

    pub fn is_ground(&self) -> bool {
        self.constant_count() == 3
    }

    /// Replaces every variable that has a value in `binding` by that value.
    pub fn substitute(&self, binding: &BTreeMap<String, u64>) -> TriplePattern {
        let mut out = self.clone();
        for position in Position::ALL {
            let term = out.term_mut(position);
            if let Some(value) = term.as_variable().and_then(|name| binding.get(name)) {
                *term = Term::Constant(*value);
            }
        }
        out
    }

    /// The fully bound triple, if every slot is a constant
    pub fn to_triple(&self) -> Option<Triple> {
        Some(Triple::new(
            self.subject.as_constant()?,
            self.predicate.as_constant()?,
            self.object.as_constant()?,
        ))
    }

    /// Matches `triple` against the pattern, returning the variable assignment.
    /// A variable repeated inside the pattern must see the same identifier everywhere.
    pub fn match_triple(&self, triple: &Triple) -> Option<BTreeMap<String, u64>> {
        let mut binding = BTreeMap::new();
        for (position, term) in self.terms() {
            let value = triple.get(position);
            match term {
                Term::Constant(id) => {
                    if *id != value {
                        return None;
                    }
                }
                Term::Variable(name) => {
                    if let Some(previous) = binding.insert(name.clone(), value) {
                        if previous != value {
                            return None;
                        }
                    }
                }
            }
        }
        Some(binding)
    }
}

impl TryFrom<Vec<Term>> for TriplePattern {
    type Error = PatternArityError;

    fn try_from(terms: Vec<Term>) -> Result<Self, Self::Error> {
        let len = terms.len();
        let [subject, predicate, object]: [Term; 3] =
            terms.try_into().map_err(|_| PatternArityError(len))?;
        Ok(Self { subject, predicate, object })
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.subject, self.predicate, self.object)
    }
}
