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

use shared::terms::{Term, TriplePattern};
use shared::triple::Position;

use super::iterator::SortedIndexIterator;
use super::join::LeapfrogJoin;
use super::ordering::best_index_for;
use crate::config::ExecutorConfig;
use crate::error::{QueryError, Result};
use crate::storage::{contains_triple, IndexStorage};

/// Variable name to identifier, for one solution
pub type Binding = BTreeMap<String, u64>;

/// One level of the descent: the variable, its join and the value bound now.
#[derive(Debug)]
pub struct LevelFrame {
    pub variable: String,
    join: LeapfrogJoin,
    value: Option<u64>,
}

impl LevelFrame {
    pub fn value(&self) -> Option<u64> {
        self.value
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Descend(usize),
    Advance,
    Backtrack,
    Yield,
    Done,
}

/// Counters of one execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    pub seeks: u64,
    pub levels_descended: u64,
    pub bindings: u64,
}

/// Drives leapfrog joins level by level over a variable order.
///
/// Pull-driven: every call to `next` resumes the state machine until a full
/// binding is produced or the search space is exhausted. Iterators opened
/// for a level are closed when the level is popped, on error, on `close` and
/// on drop.
pub struct MultiLevelExecutor<'s, S: IndexStorage + ?Sized> {
    storage: &'s S,
    patterns: Vec<TriplePattern>,
    order: Vec<String>,
    // per level: patterns joined on the level's variable
    participants: Vec<Vec<usize>>,
    // per level: patterns that repeat the variable and are fully bound there
    probes: Vec<Vec<usize>>,
    frames: Vec<LevelFrame>,
    binding: Binding,
    state: State,
    config: ExecutorConfig,
    stats: ExecutionStats,
}

impl<'s, S: IndexStorage + ?Sized> MultiLevelExecutor<'s, S> {
    pub fn open(
        storage: &'s S,
        patterns: Vec<TriplePattern>,
        order: Vec<String>,
        config: ExecutorConfig,
    ) -> Result<Self> {
        let mut level_of: BTreeMap<&str, usize> = BTreeMap::new();
        for (level, variable) in order.iter().enumerate() {
            if level_of.insert(variable.as_str(), level).is_some() {
                return Err(QueryError::MalformedPattern(format!(
                    "variable ?{} appears twice in the variable order",
                    variable
                )));
            }
        }

        let mut participants = vec![Vec::new(); order.len()];
        let mut probes = vec![Vec::new(); order.len()];
        for (index, pattern) in patterns.iter().enumerate() {
            let variables = pattern.variables();
            let mut last_level = None;
            for variable in &variables {
                let Some(&level) = level_of.get(variable) else {
                    return Err(QueryError::MalformedPattern(format!(
                        "variable ?{} of pattern {} is missing from the variable order",
                        variable, pattern
                    )));
                };
                participants[level].push(index);
                last_level = last_level.max(Some(level));
            }
            if let Some(level) = last_level {
                if pattern.positions_of(&order[level]).len() > 1 {
                    probes[level].push(index);
                }
            }
        }
        if let Some(level) = participants.iter().position(|p| p.is_empty()) {
            return Err(QueryError::MalformedPattern(format!(
                "variable ?{} of the variable order occurs in no pattern",
                order[level]
            )));
        }

        let mut executor = Self {
            storage,
            patterns,
            order,
            participants,
            probes,
            frames: Vec::new(),
            binding: Binding::new(),
            state: State::Descend(0),
            config,
            stats: ExecutionStats::default(),
        };

        // variable-free patterns only filter: all present or no result at all
        for pattern in &executor.patterns {
            if let Some(triple) = pattern.to_triple() {
                if !contains_triple(executor.storage, &triple)? {
                    executor.state = State::Done;
                    break;
                }
            }
        }
        Ok(executor)
    }

    fn step(&mut self) -> Result<Option<Binding>> {
        loop {
            match self.state {
                State::Done => return Ok(None),
                State::Yield => {
                    self.state = State::Advance;
                    self.stats.bindings += 1;
                    return Ok(Some(self.binding.clone()));
                }
                State::Descend(depth) => {
                    if depth == self.order.len() {
                        self.state = State::Yield;
                        continue;
                    }
                    let mut join = self.open_level(depth)?;
                    self.stats.levels_descended += 1;
                    let value = join.search()?;
                    log::trace!("descend to ?{} at depth {}: {:?}", self.order[depth], depth, value);
                    self.frames.push(LevelFrame {
                        variable: self.order[depth].clone(),
                        join,
                        value,
                    });
                    self.state = match value {
                        Some(value) => self.bind(depth, value)?,
                        None => State::Backtrack,
                    };
                }
                State::Advance => {
                    let Some(frame) = self.frames.last_mut() else {
                        self.state = State::Done;
                        continue;
                    };
                    let value = frame.join.next()?;
                    frame.value = value;
                    let depth = self.frames.len() - 1;
                    self.state = match value {
                        Some(value) => self.bind(depth, value)?,
                        None => State::Backtrack,
                    };
                }
                State::Backtrack => {
                    if let Some(mut frame) = self.frames.pop() {
                        self.release(&mut frame);
                        self.binding.remove(&frame.variable);
                    }
                    self.state = if self.frames.is_empty() { State::Done } else { State::Advance };
                }
            }
        }
    }

    /// Binds the level's variable and decides where to go next
    fn bind(&mut self, depth: usize, value: u64) -> Result<State> {
        self.binding.insert(self.order[depth].clone(), value);
        for &index in &self.probes[depth] {
            let Some(triple) = self.patterns[index].substitute(&self.binding).to_triple() else {
                continue;
            };
            if !contains_triple(self.storage, &triple)? {
                return Ok(State::Advance);
            }
        }
        Ok(if depth + 1 == self.order.len() { State::Yield } else { State::Descend(depth + 1) })
    }

    /// One iterator per pattern mentioning the level's variable
    fn open_level(&self, depth: usize) -> Result<LeapfrogJoin> {
        let variable = &self.order[depth];
        let mut iterators = Vec::with_capacity(self.participants[depth].len());
        for &index in &self.participants[depth] {
            let pattern = &self.patterns[index];
            let value_at = |position: Position| match pattern.term(position) {
                Term::Constant(id) => Some(*id),
                Term::Variable(name) => self.binding.get(name).copied(),
            };
            let bound: Vec<Position> = Position::ALL
                .into_iter()
                .filter(|p| value_at(*p).is_some())
                .collect();
            let choice = pattern
                .positions_of(variable)
                .into_iter()
                .map(|target| best_index_for(target, &bound))
                .max_by_key(|choice| (choice.exact, choice.level))
                .ok_or_else(|| QueryError::MalformedPattern(format!("?{} not in {}", variable, pattern)))?;
            let prefix = choice.prefix(value_at);
            iterators.push(SortedIndexIterator::open(self.storage, choice.ordering, prefix, choice.level)?);
        }
        Ok(LeapfrogJoin::new(iterators, self.config.max_join_iterations))
    }

    fn release(&mut self, frame: &mut LevelFrame) {
        self.stats.seeks += frame.join.seek_count();
        frame.join.close();
    }

    /// Closes every open iterator; the executor yields nothing afterwards.
    pub fn close(&mut self) {
        while let Some(mut frame) = self.frames.pop() {
            self.release(&mut frame);
        }
        self.binding.clear();
        self.state = State::Done;
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Current depth of the frame stack
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn variable_order(&self) -> &[String] {
        &self.order
    }

    pub fn patterns(&self) -> &[TriplePattern] {
        &self.patterns
    }

    /// Counters so far; seeks of still-open levels are included
    pub fn stats(&self) -> ExecutionStats {
        let open: u64 = self.frames.iter().map(|f| f.join.seek_count()).sum();
        ExecutionStats { seeks: self.stats.seeks + open, ..self.stats }
    }
}

impl<S: IndexStorage + ?Sized> Iterator for MultiLevelExecutor<'_, S> {
    type Item = Result<Binding>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(Some(binding)) => Some(Ok(binding)),
            Ok(None) => None,
            Err(err) => {
                self.close();
                Some(Err(err))
            }
        }
    }
}

impl<S: IndexStorage + ?Sized> Drop for MultiLevelExecutor<'_, S> {
    fn drop(&mut self) {
        self.close();
    }
}
