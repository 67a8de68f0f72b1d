// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod file;

pub use file::check_file;

use crate::environment::Environment;
use crate::error::Result;
use crate::parser::Expression;
use crate::value::KV;

use serde::{Deserialize, Serialize};

/// How a report field is extracted from a resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    #[default]
    Attribute,
    JsonPath,
    YamlPath,
    Regexp,
    Template,
}

/// One value to copy into a report.
///
/// A non-empty `value` is copied verbatim under `as`. Otherwise `property`
/// is extracted according to `kind` and reported under `as`, defaulting to
/// the property name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default)]
    pub kind: PropertyKind,
    #[serde(default)]
    pub property: String,
    #[serde(rename = "as", default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Field {
    pub fn attribute(property: &str) -> Self {
        Self {
            kind: PropertyKind::Attribute,
            property: property.to_string(),
            ..Default::default()
        }
    }

    pub fn literal(alias: &str, value: &str) -> Self {
        Self {
            alias: Some(alias.to_string()),
            value: Some(value.to_string()),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: PropertyKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    fn literal_value(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.is_empty())
    }

    fn key(&self) -> &str {
        match self.alias.as_deref() {
            Some(a) if !a.is_empty() => a,
            _ => &self.property,
        }
    }
}

/// A file, or every file matched by a glob, to check.
///
/// `path` is either a literal (possibly glob) path or a call expression
/// such as `process.flag("dockerd", "--config-file")` yielding one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub report: Vec<Field>,
}

impl File {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            report: vec![],
        }
    }
}

/// Subject of a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    File(File),
}

/// A compliance requirement: one resource and the condition it must meet.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub resource: Resource,
    pub condition: Expression,
}

impl Rule {
    /// Compiles `condition` in iterable mode so that glob paths can yield
    /// several candidates.
    pub fn new(id: &str, resource: Resource, condition: &str) -> Result<Rule> {
        Ok(Rule {
            id: id.to_string(),
            resource,
            condition: Expression::parse_iterable(condition)?,
        })
    }
}

/// Verdict and evidence of one check invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub passed: bool,
    pub data: KV,
}

/// Runs the check matching the rule's resource kind.
///
/// An `Err` means the rule could not be evaluated; it is distinct from a
/// report with `passed == false`.
pub fn check_resource(env: &dyn Environment, rule: &Rule) -> Result<Report> {
    match &rule.resource {
        Resource::File(file) => check_file(env, &rule.id, file, &rule.condition),
    }
}
