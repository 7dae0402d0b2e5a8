/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::path::PathBuf;

use shared::terms::PatternArityError;
use thiserror::Error;

/// Failures reported by the storage layer. They are propagated unchanged;
/// retrying is the storage layer's business.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("prefix of {0} bytes is not a whole number of key components")]
    InvalidPrefix(usize),
    #[error("cursor level {level} does not fit a prefix of {prefix_len} bytes")]
    InvalidLevel { level: u8, prefix_len: usize },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum QueryError {
    /// The iterator level must equal `prefix_len / 8`.
    #[error("iterator level {level} does not match a prefix of {prefix_len} bytes")]
    InvalidLevel { level: u8, prefix_len: usize },

    #[error("malformed pattern: {0}")]
    MalformedPattern(String),

    #[error("query has {count} patterns, at most {max} are supported")]
    TooManyPatterns { count: usize, max: usize },

    /// Iteration ceiling hit; the caller may narrow the query or abort.
    #[error("iteration limit of {limit} exceeded")]
    LimitExceeded { limit: u64 },

    #[error("iterator used after close")]
    IteratorClosed,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("cannot read configuration file {path:?}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<PatternArityError> for QueryError {
    fn from(err: PatternArityError) -> Self {
        QueryError::MalformedPattern(err.to_string())
    }
}

impl QueryError {
    /// Structural errors are caller bugs and should not be retried.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            QueryError::InvalidLevel { .. }
                | QueryError::MalformedPattern(_)
                | QueryError::TooManyPatterns { .. }
                | QueryError::IteratorClosed
        )
    }

    pub fn is_limit_exceeded(&self) -> bool {
        matches!(self, QueryError::LimitExceeded { .. })
    }
}

pub type Result<T, E = QueryError> = std::result::Result<T, E>;
