// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub mod file;
pub mod process;

use crate::environment::{Environment, ProcessLookup};
use crate::error::{Error, Result};
use crate::evaluator::PropertyResolver;
use crate::lexer::Span;
use crate::value::Value;

use std::collections::HashMap;

use lazy_static::lazy_static;

/// Handler reading from the instance under evaluation.
pub type InstanceFcn =
    fn(&Span, &[Value], &dyn PropertyResolver, &dyn Environment) -> Result<Value>;

/// Handler for a side-effecting call. Only an environment invokes it, when
/// filling its evaluation cache.
pub type CachedFcn = fn(&Span, &[Value], &dyn ProcessLookup) -> Result<Value>;

#[derive(Clone, Copy)]
pub enum Function {
    Instance { fcn: InstanceFcn, arity: u8 },
    Cached { fcn: CachedFcn, arity: u8 },
}

impl Function {
    pub fn arity(&self) -> usize {
        match self {
            Function::Instance { arity, .. } | Function::Cached { arity, .. } => *arity as usize,
        }
    }

    pub fn is_side_effecting(&self) -> bool {
        matches!(self, Function::Cached { .. })
    }
}

/// Qualified function name (`namespace.function`) to handler.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<&'static str, Function>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every function shipped by the crate.
    pub fn builtin() -> Self {
        let mut m = Self::new();
        file::register(&mut m);
        process::register(&mut m);
        m
    }

    pub fn insert(&mut self, name: &'static str, function: Function) {
        self.functions.insert(name, function);
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &&'static str> {
        self.functions.keys()
    }
}

lazy_static! {
    pub static ref FUNCTIONS: FunctionRegistry = FunctionRegistry::builtin();
}

pub fn ensure_args_count(span: &Span, fcn: &str, args: &[Value], expected: usize) -> Result<()> {
    if args.len() != expected {
        let msg = if expected == 1 {
            format!("`{fcn}` expects 1 argument")
        } else {
            format!("`{fcn}` expects {expected} arguments")
        };
        return Err(Error::Eval(span.error(&msg)));
    }
    Ok(())
}

pub fn ensure_string<'a>(span: &Span, fcn: &str, v: &'a Value) -> Result<&'a str> {
    match v {
        Value::String(s) => Ok(s.as_str()),
        _ => Err(Error::Eval(span.error(
            format!("`{fcn}` expects string argument. Got `{v}` instead").as_str(),
        ))),
    }
}
