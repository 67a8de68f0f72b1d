// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::docquery::QueryKind;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::evaluator::PropertyResolver;
use crate::functions::{ensure_string, Function, FunctionRegistry};
use crate::lexer::Span;
use crate::value::Value;

pub fn register(m: &mut FunctionRegistry) {
    m.insert("file.jq", Function::Instance { fcn: jq, arity: 1 });
    m.insert("file.yaml", Function::Instance { fcn: yaml, arity: 1 });
    m.insert("file.regexp", Function::Instance { fcn: regexp, arity: 1 });
}

fn query(
    span: &Span,
    name: &str,
    kind: QueryKind,
    args: &[Value],
    instance: &dyn PropertyResolver,
    env: &dyn Environment,
) -> Result<Value> {
    let query = ensure_string(span, name, &args[0])?;
    let path = match instance.document() {
        Some(p) => p,
        None => {
            return Err(Error::Eval(
                span.error(format!("`{name}` needs a file to read").as_str()),
            ))
        }
    };
    env.query_document(path, kind, query).map(Value::String)
}

fn jq(
    span: &Span,
    args: &[Value],
    instance: &dyn PropertyResolver,
    env: &dyn Environment,
) -> Result<Value> {
    query(span, "file.jq", QueryKind::Jq, args, instance, env)
}

fn yaml(
    span: &Span,
    args: &[Value],
    instance: &dyn PropertyResolver,
    env: &dyn Environment,
) -> Result<Value> {
    query(span, "file.yaml", QueryKind::Yaml, args, instance, env)
}

fn regexp(
    span: &Span,
    args: &[Value],
    instance: &dyn PropertyResolver,
    env: &dyn Environment,
) -> Result<Value> {
    query(span, "file.regexp", QueryKind::Regexp, args, instance, env)
}
