// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The boundary between the engine and the system being scanned.
//!
//! Conditions and checks never touch process state directly: they map paths
//! and evaluate side-effecting calls through an [`Environment`]. One
//! environment value lives for exactly one evaluation pass; build a fresh
//! one per pass so that memoized facts never leak into a later run.

mod cache;
mod host;
mod process;

pub use cache::EvalCache;
pub use host::{HostEnv, HostEnvConfig};
pub use process::{parse_flags, ProcFs, ProcessLookup};

use crate::ast::Expr;
use crate::docquery::QueryKind;
use crate::error::Result;
use crate::value::Value;

pub trait Environment {
    /// Maps a rule-authored (logical) path to the path to inspect. The
    /// result may still be a glob pattern.
    fn normalize_to_host_root(&self, path: &str) -> String;

    /// Inverse of [`Environment::normalize_to_host_root`], used for reporting.
    fn relative_to_host_root(&self, path: &str) -> String;

    /// Evaluates `expr` at most once per environment lifetime for each
    /// distinct expression; later calls return the memoized outcome.
    fn evaluate_from_cache(&self, expr: &Expr) -> Result<Value>;

    /// Runs a structured-document or regexp query against a file.
    fn query_document(&self, path: &str, kind: QueryKind, query: &str) -> Result<String>;
}
