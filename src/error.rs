// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;

use thiserror::Error;

/// A diagnostic anchored at a position inside a condition or query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    pub line: u32,
    pub col: u32,
    pub message: String,
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.message)
    }
}

/// Alias kept for callers that only deal with condition compilation.
pub type ParseError = SourceError;

// Cached evaluations hand the same failure out on every lookup, hence Clone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("property kind not supported")]
    PropertyKindNotSupported,

    #[error("property not supported")]
    PropertyNotSupported(String),

    #[error("failed to resolve path: {0}")]
    PathResolution(String),

    #[error("failed to stat {path}")]
    Stat { path: String },

    #[error("no files found for {pattern}")]
    NoMatch { pattern: String },

    #[error("{0}")]
    Parse(SourceError),

    #[error("{0}")]
    Eval(SourceError),

    #[error("expression is not iterable: got {count} candidates")]
    NotIterable { count: usize },

    #[error("{kind} query failed: {message}")]
    Query { kind: String, message: String },

    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },
}

impl Error {
    pub fn io(path: impl fmt::Display, err: std::io::Error) -> Self {
        Error::Io {
            path: path.to_string(),
            message: err.to_string(),
        }
    }

    /// True for failures of the condition text itself rather than of the
    /// system being inspected.
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse(_))
    }
}

pub type Result<T> = core::result::Result<T, Error>;
