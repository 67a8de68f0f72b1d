// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::Expr;
use crate::docquery::{self, QueryKind};
use crate::environment::{EvalCache, Environment, ProcFs, ProcessLookup};
use crate::error::{Error, Result};
use crate::evaluator::{Evaluator, Instance};
use crate::functions::{ensure_args_count, Function, FUNCTIONS};
use crate::value::Value;

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Where the scanned host's filesystem is visible to the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HostEnvConfig {
    /// `/` on the host itself, the mount point (e.g. `/host`) in a container.
    pub host_root: PathBuf,
}

impl Default for HostEnvConfig {
    fn default() -> Self {
        Self {
            host_root: PathBuf::from("/"),
        }
    }
}

impl HostEnvConfig {
    pub const HOST_ROOT_VAR: &'static str = "HOST_ROOT";

    /// Reads `HOST_ROOT`, falling back to `/` when unset or empty.
    pub fn from_env() -> Self {
        match std::env::var(Self::HOST_ROOT_VAR) {
            Ok(root) if !root.is_empty() => Self {
                host_root: PathBuf::from(root),
            },
            _ => Self::default(),
        }
    }
}

/// Production environment for one evaluation pass.
pub struct HostEnv {
    config: HostEnvConfig,
    cache: EvalCache,
    processes: Box<dyn ProcessLookup>,
}

impl HostEnv {
    pub fn new(config: HostEnvConfig) -> Self {
        let procfs = ProcFs::new(config.host_root.join("proc"));
        Self::with_processes(config, Box::new(procfs))
    }

    pub fn with_processes(config: HostEnvConfig, processes: Box<dyn ProcessLookup>) -> Self {
        Self {
            config,
            cache: EvalCache::new(),
            processes,
        }
    }

    pub fn host_root(&self) -> &Path {
        &self.config.host_root
    }

    pub fn cache(&self) -> &EvalCache {
        &self.cache
    }

    fn is_host(&self) -> bool {
        self.config.host_root == Path::new("/")
    }

    fn resolve(&self, expr: &Expr) -> Result<Value> {
        let (span, fcn, params) = match expr {
            Expr::Call { span, fcn, params } => (span, fcn, params),
            _ => return Evaluator::new(self).eval_value(expr, &Instance::default()),
        };

        let (handler, arity) = match FUNCTIONS.get(fcn) {
            Some(Function::Cached { fcn, arity }) => (*fcn, *arity as usize),
            _ => {
                return Err(Error::Eval(
                    span.error(format!("unknown function {fcn}()").as_str()),
                ))
            }
        };

        // Arguments of a cached call cannot refer to instance properties.
        let mut evaluator = Evaluator::new(self);
        let mut args = Vec::with_capacity(params.len());
        for p in params {
            args.push(evaluator.eval_value(p, &Instance::default())?);
        }
        ensure_args_count(span, fcn, &args, arity)?;
        handler(span, &args, self.processes.as_ref())
    }
}

impl Environment for HostEnv {
    fn normalize_to_host_root(&self, path: &str) -> String {
        if self.is_host() {
            return path.to_string();
        }
        self.config
            .host_root
            .join(path.trim_start_matches('/'))
            .to_string_lossy()
            .into_owned()
    }

    fn relative_to_host_root(&self, path: &str) -> String {
        if self.is_host() {
            return path.to_string();
        }
        match Path::new(path).strip_prefix(&self.config.host_root) {
            Ok(rel) => format!("/{}", rel.to_string_lossy()),
            Err(_) => path.to_string(),
        }
    }

    fn evaluate_from_cache(&self, expr: &Expr) -> Result<Value> {
        let key = expr.to_string();
        self.cache.get_or_insert_with(&key, || self.resolve(expr))
    }

    fn query_document(&self, path: &str, kind: QueryKind, query: &str) -> Result<String> {
        docquery::query_file(path, kind, query)
    }
}
