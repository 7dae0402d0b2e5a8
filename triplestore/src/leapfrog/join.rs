/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::iterator::SortedIndexIterator;
use crate::error::{QueryError, Result};

/// Leapfrog intersection of k iterators positioned at the same level.
///
/// The iterators are kept in cyclic sorted order: `iterators[position]` holds
/// the smallest value and the one just before it the largest. Seeking the
/// smallest to the largest and stepping `position` forward keeps that order,
/// so no re-sort is needed after the first one.
#[derive(Debug)]
pub struct LeapfrogJoin {
    iterators: Vec<SortedIndexIterator>,
    position: usize,
    key: Option<u64>,
    at_end: bool,
    started: bool,
    iterations: u64,
    limit: u64,
}

impl LeapfrogJoin {
    pub fn new(iterators: Vec<SortedIndexIterator>, limit: u64) -> Self {
        Self {
            iterators,
            position: 0,
            key: None,
            at_end: false,
            started: false,
            iterations: 0,
            limit,
        }
    }

    /// Finds the first common value. Any exhausted participant ends the join
    /// before a single seek is issued.
    pub fn search(&mut self) -> Result<Option<u64>> {
        if self.started {
            return Ok(self.key);
        }
        self.started = true;
        if self.iterators.is_empty() || self.iterators.iter().any(|it| it.is_exhausted()) {
            return Ok(self.finish());
        }
        self.iterators.sort_by_key(|it| it.current());
        self.position = 0;
        self.leapfrog_search()
    }

    /// Moves past the last reported value and finds the next common one
    pub fn next(&mut self) -> Result<Option<u64>> {
        if !self.started {
            return self.search();
        }
        if self.at_end {
            return Ok(None);
        }
        let k = self.iterators.len();
        if self.iterators[self.position].advance()?.is_none() {
            return Ok(self.finish());
        }
        self.position = (self.position + 1) % k;
        self.leapfrog_search()
    }

    fn leapfrog_search(&mut self) -> Result<Option<u64>> {
        let k = self.iterators.len();
        let Some(mut max) = self.iterators[(self.position + k - 1) % k].current() else {
            return Ok(self.finish());
        };
        loop {
            self.iterations += 1;
            if self.iterations > self.limit {
                log::warn!("leapfrog join stopped after {} iterations", self.limit);
                return Err(QueryError::LimitExceeded { limit: self.limit });
            }
            let Some(min) = self.iterators[self.position].current() else {
                return Ok(self.finish());
            };
            if min == max {
                self.key = Some(min);
                return Ok(self.key);
            }
            match self.iterators[self.position].seek(max)? {
                None => return Ok(self.finish()),
                Some(value) => {
                    max = value;
                    self.position = (self.position + 1) % k;
                }
            }
        }
    }

    fn finish(&mut self) -> Option<u64> {
        self.at_end = true;
        self.key = None;
        None
    }

    /// Last common value found, if the join is not at its end
    pub fn key(&self) -> Option<u64> {
        self.key
    }

    pub fn is_at_end(&self) -> bool {
        self.at_end
    }

    /// Seeks issued by all participants
    pub fn seek_count(&self) -> u64 {
        self.iterators.iter().map(|it| it.seek_count()).sum()
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn participants(&self) -> &[SortedIndexIterator] {
        &self.iterators
    }

    pub fn close(&mut self) {
        for iterator in &mut self.iterators {
            iterator.close();
        }
        self.at_end = true;
        self.key = None;
    }
}
