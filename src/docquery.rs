// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Extraction of a single string from a file's contents.
//!
//! `jq` and `yaml` queries accept the path subset of jq: `.`, `.name`,
//! `."quoted name"`, `.["quoted name"]` and `.[index]`, chained.

use crate::error::{Error, Result};
use crate::lexer::{Lexer, Source, TokenKind};

use core::fmt;
use std::fs;

use regex::Regex;
use serde_json::Value as Json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Jq,
    Yaml,
    Regexp,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QueryKind::Jq => "jq",
            QueryKind::Yaml => "yaml",
            QueryKind::Regexp => "regexp",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Key(String),
    Index(usize),
}

fn query_error(kind: QueryKind, message: impl fmt::Display) -> Error {
    Error::Query {
        kind: kind.to_string(),
        message: message.to_string(),
    }
}

pub fn query_file(path: &str, kind: QueryKind, query: &str) -> Result<String> {
    let contents = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    query_str(&contents, kind, query)
}

pub fn query_str(contents: &str, kind: QueryKind, query: &str) -> Result<String> {
    match kind {
        QueryKind::Jq => {
            let doc: Json =
                serde_json::from_str(contents).map_err(|e| query_error(kind, e))?;
            select(&doc, kind, query)
        }
        QueryKind::Yaml => {
            let doc: Json = serde_yaml::from_str(contents).map_err(|e| query_error(kind, e))?;
            select(&doc, kind, query)
        }
        QueryKind::Regexp => {
            let re = Regex::new(&format!("(?m){query}")).map_err(|e| query_error(kind, e))?;
            Ok(re
                .find(contents)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default())
        }
    }
}

fn select(doc: &Json, kind: QueryKind, query: &str) -> Result<String> {
    let steps = parse_path(query).map_err(|e| query_error(kind, e))?;
    let mut current = doc;
    for step in &steps {
        let next = match (step, current) {
            (Step::Key(k), Json::Object(fields)) => fields.get(k),
            (Step::Index(i), Json::Array(items)) => items.get(*i),
            _ => None,
        };
        match next {
            Some(v) => current = v,
            None => return Ok(String::new()),
        }
    }
    render(current).map_err(|e| query_error(kind, e))
}

fn render(v: &Json) -> serde_json::Result<String> {
    Ok(match v {
        Json::Null => String::new(),
        Json::String(s) => s.clone(),
        Json::Bool(b) => b.to_string(),
        Json::Number(n) => n.to_string(),
        _ => serde_json::to_string(v)?,
    })
}

fn parse_path(query: &str) -> Result<Vec<Step>> {
    let source = Source::new(query);
    let mut lexer = Lexer::new(&source);
    let mut steps = vec![];

    let mut tok = lexer.next_token()?;
    if tok.1.text() != "." || tok.0 != TokenKind::Symbol {
        return Err(Error::Parse(tok.1.error("query must start with `.`")));
    }
    tok = lexer.next_token()?;

    // Right after a `.`: a name, a quoted name or a bracket.
    let mut after_dot = true;
    loop {
        match (&tok.0, tok.1.text()) {
            (TokenKind::Eof, _) => break,
            (TokenKind::Ident, name) if after_dot => {
                steps.push(Step::Key(name.to_string()));
                after_dot = false;
            }
            (TokenKind::String, _) if after_dot => {
                steps.push(Step::Key(decode(&tok.1)?));
                after_dot = false;
            }
            (TokenKind::Symbol, ".") if !after_dot => after_dot = true,
            (TokenKind::Symbol, "[") => {
                let index = lexer.next_token()?;
                let step = match index.0 {
                    TokenKind::String => Step::Key(decode(&index.1)?),
                    TokenKind::Number => match index.1.text().parse::<usize>() {
                        Ok(i) => Step::Index(i),
                        Err(_) => return Err(Error::Parse(index.1.error("invalid index"))),
                    },
                    _ => return Err(Error::Parse(index.1.error("expecting string or index"))),
                };
                steps.push(step);
                let close = lexer.next_token()?;
                if close.1.text() != "]" {
                    return Err(Error::Parse(close.1.error("expecting `]`")));
                }
                after_dot = false;
            }
            _ => return Err(Error::Parse(tok.1.error("unexpected token in query"))),
        }
        tok = lexer.next_token()?;
    }

    Ok(steps)
}

fn decode(span: &crate::lexer::Span) -> Result<String> {
    serde_json::from_str::<String>(&format!("\"{}\"", span.text()))
        .map_err(|e| Error::Parse(span.error(&format!("invalid string literal. {e}"))))
}
