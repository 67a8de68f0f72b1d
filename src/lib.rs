// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod ast;
mod checks;
mod docquery;
mod environment;
mod error;
mod evaluator;
mod functions;
mod identity;
mod lexer;
mod parser;
mod utils;
mod value;

pub use checks::{check_file, check_resource, Field, File, PropertyKind, Report, Resource, Rule};
pub use docquery::{query_file, query_str, QueryKind};
pub use environment::{
    parse_flags, Environment, EvalCache, HostEnv, HostEnvConfig, ProcFs, ProcessLookup,
};
pub use error::{Error, ParseError, Result, SourceError};
pub use evaluator::{
    compare, Evaluation, Evaluator, Instance, IterationResult, PropertyResolver,
};
pub use functions::{Function, FunctionRegistry, FUNCTIONS};
pub use parser::{parse, Expression};
pub use value::{Value, KV};

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::ast::*;
    pub use crate::lexer::*;
    pub use crate::parser::*;
}
