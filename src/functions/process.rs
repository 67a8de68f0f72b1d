// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::environment::{parse_flags, ProcessLookup};
use crate::error::Result;
use crate::functions::{ensure_string, Function, FunctionRegistry};
use crate::lexer::Span;
use crate::value::Value;

pub fn register(m: &mut FunctionRegistry) {
    m.insert("process.flag", Function::Cached { fcn: flag, arity: 2 });
    m.insert(
        "process.hasFlag",
        Function::Cached {
            fcn: has_flag,
            arity: 2,
        },
    );
}

// Flags of the first running process named `name`.
fn first_process_flags(
    span: &Span,
    fcn: &str,
    args: &[Value],
    processes: &dyn ProcessLookup,
) -> Result<Option<std::collections::BTreeMap<String, String>>> {
    let name = ensure_string(span, fcn, &args[0])?;
    let cmdlines = processes.cmdlines(name)?;
    Ok(cmdlines
        .first()
        .map(|cmdline| parse_flags(cmdline.get(1..).unwrap_or_default())))
}

/// Value of `flag` on the command line of process `name`; empty when the
/// process or the flag is absent.
fn flag(span: &Span, args: &[Value], processes: &dyn ProcessLookup) -> Result<Value> {
    let flag = ensure_string(span, "process.flag", &args[1])?;
    let value = first_process_flags(span, "process.flag", args, processes)?
        .and_then(|mut flags| flags.remove(flag))
        .unwrap_or_default();
    Ok(Value::String(value))
}

fn has_flag(span: &Span, args: &[Value], processes: &dyn ProcessLookup) -> Result<Value> {
    let flag = ensure_string(span, "process.hasFlag", &args[1])?;
    let found = first_process_flags(span, "process.hasFlag", args, processes)?
        .map(|flags| flags.contains_key(flag))
        .unwrap_or(false);
    Ok(Value::Bool(found))
}
