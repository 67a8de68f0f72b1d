// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::checks::{Field, File, PropertyKind, Report};
use crate::docquery::QueryKind;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::evaluator::Instance;
use crate::identity::Accounts;
use crate::parser::Expression;
use crate::utils::glob;
use crate::value::{Value, KV};

use std::fs::{self, Metadata};
use std::os::unix::fs::MetadataExt;

use log::{debug, warn};

/// Checks every file `file.path` resolves to against `condition`.
///
/// The check passes only when all matched files satisfy the condition; the
/// report carries the data of the first failing file, or of the first file
/// when all pass.
pub fn check_file(
    env: &dyn Environment,
    rule_id: &str,
    file: &File,
    condition: &Expression,
) -> Result<Report> {
    debug!("{rule_id}: file check: {}", file.path);

    let path = resolve_path(env, &file.path)?;
    let pattern = env.normalize_to_host_root(&path);
    let matches = glob::expand(&pattern)?;
    if matches.is_empty() {
        return Err(Error::NoMatch { pattern: path });
    }

    let accounts = Accounts::load(env);
    let mut instances = Vec::with_capacity(matches.len());
    for physical in &matches {
        let physical = physical.to_string_lossy();
        debug!("{rule_id}: candidate {physical}");
        instances.push(file_instance(env, &accounts, file, &physical)?);
    }

    let result = condition.evaluate_iterator(&instances, env)?;

    let mut data = instances.swap_remove(result.index).into_vars();
    data.extend(result.evidence);
    Ok(Report {
        passed: result.passed,
        data,
    })
}

// A path that parses as a call is resolved through the environment cache.
fn resolve_path(env: &dyn Environment, path: &str) -> Result<String> {
    let expr = match Expression::parse(path) {
        Ok(expr) if expr.is_call() => expr,
        _ => return Ok(path.to_string()),
    };

    let value = env
        .evaluate_from_cache(expr.root())
        .map_err(|e| Error::PathResolution(e.to_string()))?;

    match value {
        Value::String(s) if s.is_empty() => {
            Err(Error::PathResolution(format!("empty path from {path}")))
        }
        Value::String(s) => Ok(s),
        v => Err(Error::PathResolution(format!(
            "expected string from {path} got \"{v}\""
        ))),
    }
}

fn file_instance(
    env: &dyn Environment,
    accounts: &Accounts,
    file: &File,
    physical: &str,
) -> Result<Instance> {
    let meta = fs::metadata(physical).map_err(|_| Error::Stat {
        path: physical.to_string(),
    })?;

    let mut vars = KV::new();
    vars.insert(
        "file.path".to_string(),
        Value::String(env.relative_to_host_root(physical)),
    );
    vars.insert(
        "file.permissions".to_string(),
        Value::Uint((meta.mode() & 0o777) as u64),
    );
    vars.insert(
        "file.user".to_string(),
        Value::String(accounts.user_name(meta.uid())),
    );
    vars.insert(
        "file.group".to_string(),
        Value::String(accounts.group_name(meta.gid())),
    );

    for field in &file.report {
        if let Some((key, value)) = report_field(env, accounts, field, &meta, physical)? {
            vars.insert(key, value);
        }
    }

    Ok(Instance::new(vars).with_document(physical))
}

fn report_field(
    env: &dyn Environment,
    accounts: &Accounts,
    field: &Field,
    meta: &Metadata,
    physical: &str,
) -> Result<Option<(String, Value)>> {
    if let Some(value) = field.literal_value() {
        return match field.alias.as_deref() {
            Some(alias) if !alias.is_empty() => {
                Ok(Some((alias.to_string(), Value::from(value))))
            }
            _ => {
                warn!("report field with value `{value}` has no `as`, skipped");
                Ok(None)
            }
        };
    }

    let value = match field.kind {
        PropertyKind::Attribute => attribute(accounts, meta, &field.property)?,
        PropertyKind::JsonPath => {
            Value::String(env.query_document(physical, QueryKind::Jq, &field.property)?)
        }
        PropertyKind::YamlPath => {
            Value::String(env.query_document(physical, QueryKind::Yaml, &field.property)?)
        }
        PropertyKind::Regexp => {
            Value::String(env.query_document(physical, QueryKind::Regexp, &field.property)?)
        }
        PropertyKind::Template => return Err(Error::PropertyKindNotSupported),
    };

    Ok(Some((field.key().to_string(), value)))
}

fn attribute(accounts: &Accounts, meta: &Metadata, property: &str) -> Result<Value> {
    match property {
        "permissions" => Ok(Value::String(format!("{:03o}", meta.mode() & 0o777))),
        "owner" => Ok(Value::String(format!(
            "{}:{}",
            accounts.group_name(meta.gid()),
            accounts.user_name(meta.uid())
        ))),
        _ => Err(Error::PropertyNotSupported(property.to_string())),
    }
}
