/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */
use serde::{Serialize, Deserialize};

/// One of the three slots of a triple.
#[derive(PartialEq, Debug, Clone, Copy, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    Subject,
    Predicate,
    Object,
}

impl Position {
    pub const ALL: [Position; 3] = [Position::Subject, Position::Predicate, Position::Object];

    pub fn name(self) -> &'static str {
        match self {
            Position::Subject => "subject",
            Position::Predicate => "predicate",
            Position::Object => "object",
        }
    }
}

#[derive(PartialEq, Debug, Clone, Copy, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: u64,
    pub predicate: u64,
    pub object: u64,
}

impl Triple {
    pub fn new(subject: u64, predicate: u64, object: u64) -> Self {
        Self { subject, predicate, object }
    }

    /// Identifier stored at `position`
    pub fn get(&self, position: Position) -> u64 {
        match position {
            Position::Subject => self.subject,
            Position::Predicate => self.predicate,
            Position::Object => self.object,
        }
    }

    pub fn set(&mut self, position: Position, value: u64) {
        match position {
            Position::Subject => self.subject = value,
            Position::Predicate => self.predicate = value,
            Position::Object => self.object = value,
        }
    }
}

impl From<(u64, u64, u64)> for Triple {
    fn from((subject, predicate, object): (u64, u64, u64)) -> Self {
        Self { subject, predicate, object }
    }
}
