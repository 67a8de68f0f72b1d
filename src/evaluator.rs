// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::functions::{self, Function, FunctionRegistry};
use crate::lexer::Span;
use crate::parser::Expression;
use crate::value::{Value, KV};

use core::cmp::Ordering;

use log::debug;

/// Source of the named properties a condition refers to.
pub trait PropertyResolver {
    fn resolve(&self, name: &str) -> Option<Value>;

    /// Physical path of the document read by functions such as `file.jq`.
    fn document(&self) -> Option<&str> {
        None
    }
}

/// Property bag of one concrete subject (e.g. one matched file).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Instance {
    vars: KV,
    document: Option<String>,
}

impl Instance {
    pub fn new(vars: KV) -> Self {
        Self {
            vars,
            document: None,
        }
    }

    pub fn with_document(mut self, path: impl Into<String>) -> Self {
        self.document = Some(path.into());
        self
    }

    pub fn vars(&self) -> &KV {
        &self.vars
    }

    pub fn into_vars(self) -> KV {
        self.vars
    }
}

impl PropertyResolver for Instance {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.vars.get(name).cloned()
    }

    fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }
}

impl PropertyResolver for KV {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// Verdict of one evaluation together with every value consulted.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub passed: bool,
    pub evidence: KV,
}

/// Outcome of evaluating an iterable expression over several instances.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationResult {
    pub passed: bool,
    /// Index of the instance the verdict is reported for: the first
    /// failing one, or the first one when every instance passed.
    pub index: usize,
    pub evidence: KV,
}

pub struct Evaluator<'a> {
    env: &'a dyn Environment,
    functions: &'a FunctionRegistry,
    evidence: KV,
}

impl<'a> Evaluator<'a> {
    pub fn new(env: &'a dyn Environment) -> Self {
        Self::with_functions(env, &functions::FUNCTIONS)
    }

    pub fn with_functions(env: &'a dyn Environment, functions: &'a FunctionRegistry) -> Self {
        Self {
            env,
            functions,
            evidence: KV::new(),
        }
    }

    pub fn evidence(&self) -> &KV {
        &self.evidence
    }

    pub fn take_evidence(&mut self) -> KV {
        core::mem::take(&mut self.evidence)
    }

    /// Evaluates a condition to its boolean verdict.
    pub fn evaluate(&mut self, expr: &Expr, resolver: &dyn PropertyResolver) -> Result<bool> {
        let value = self.eval_expr(expr, resolver)?;
        match value {
            Value::Bool(b) => Ok(b),
            v => Err(Error::Eval(expr.span().error(
                format!("expression must evaluate to a boolean, got `{v}`").as_str(),
            ))),
        }
    }

    /// Evaluates any expression to a value.
    pub fn eval_value(&mut self, expr: &Expr, resolver: &dyn PropertyResolver) -> Result<Value> {
        self.eval_expr(expr, resolver)
    }

    fn eval_expr(&mut self, expr: &Expr, resolver: &dyn PropertyResolver) -> Result<Value> {
        match expr {
            Expr::String { value, .. } => Ok(Value::String(value.clone())),
            Expr::Number { value, .. } => Ok(Value::Uint(*value)),
            Expr::Bool { value, .. } => Ok(Value::Bool(*value)),
            Expr::Array { span, .. } => Err(Error::Eval(
                span.error("array is only allowed on the right of `in`"),
            )),
            Expr::Property { span, name } => self.eval_property(span, name, resolver),
            Expr::Call { span, fcn, params } => self.eval_call(expr, span, fcn, params, resolver),
            Expr::Not { expr, .. } => {
                let v = self.evaluate(expr, resolver)?;
                Ok(Value::Bool(!v))
            }
            Expr::BoolExpr {
                span, op, lhs, rhs, ..
            } => {
                let lhs = self.eval_expr(lhs, resolver)?;
                let rhs = self.eval_expr(rhs, resolver)?;
                compare(span, *op, &lhs, &rhs).map(Value::Bool)
            }
            Expr::Membership {
                span,
                value,
                collection,
            } => self.eval_membership(span, value, collection, resolver),
            Expr::LogicalExpr { op, lhs, rhs, .. } => {
                let lhs = self.evaluate(lhs, resolver)?;
                let result = match op {
                    LogicalOp::And if !lhs => false,
                    LogicalOp::Or if lhs => true,
                    _ => self.evaluate(rhs, resolver)?,
                };
                Ok(Value::Bool(result))
            }
        }
    }

    fn eval_property(
        &mut self,
        span: &Span,
        name: &str,
        resolver: &dyn PropertyResolver,
    ) -> Result<Value> {
        match resolver.resolve(name) {
            Some(v) => {
                self.evidence.insert(name.to_string(), v.clone());
                Ok(v)
            }
            None => Err(Error::Eval(
                span.error(format!("unknown property {name}").as_str()),
            )),
        }
    }

    fn eval_call(
        &mut self,
        call: &Expr,
        span: &Span,
        fcn: &str,
        params: &[Ref<Expr>],
        resolver: &dyn PropertyResolver,
    ) -> Result<Value> {
        let function = match self.functions.get(fcn) {
            Some(f) => f,
            None => {
                return Err(Error::Eval(
                    span.error(format!("unknown function {fcn}()").as_str()),
                ))
            }
        };

        let value = match function {
            // Side-effecting calls only ever run through the environment cache.
            Function::Cached { .. } => self.env.evaluate_from_cache(call)?,
            Function::Instance { fcn: handler, arity } => {
                let mut args = Vec::with_capacity(params.len());
                for p in params {
                    args.push(self.eval_expr(p, resolver)?);
                }
                functions::ensure_args_count(span, fcn, &args, *arity as usize)?;
                handler(span, &args, resolver, self.env)?
            }
        };

        self.evidence.insert(call.to_string(), value.clone());
        Ok(value)
    }

    fn eval_membership(
        &mut self,
        span: &Span,
        value: &Expr,
        collection: &Expr,
        resolver: &dyn PropertyResolver,
    ) -> Result<Value> {
        let value = self.eval_expr(value, resolver)?;
        let items = match collection {
            Expr::Array { items, .. } => items,
            _ => {
                return Err(Error::Eval(
                    collection.span().error("`in` expects an array"),
                ))
            }
        };

        for item in items {
            let item = self.eval_expr(item, resolver)?;
            if compare(span, BoolOp::Eq, &value, &item)? {
                return Ok(Value::Bool(true));
            }
        }
        Ok(Value::Bool(false))
    }
}

/// Compares two values. When either side is numeric both sides are read as
/// unsigned integers, and a side that cannot be read that way is never equal.
/// Booleans compare with `==`/`!=` only.
pub fn compare(span: &Span, op: BoolOp, lhs: &Value, rhs: &Value) -> Result<bool> {
    let ord = match (lhs, rhs) {
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Uint(_), _) | (_, Value::Uint(_)) => {
            match (lhs.coerce_u64(), rhs.coerce_u64()) {
                (Some(l), Some(r)) => Some(l.cmp(&r)),
                _ => None,
            }
        }
        _ => match (lhs.coerce_bool(), rhs.coerce_bool()) {
            (Some(l), Some(r)) => Some(l.cmp(&r)),
            _ => None,
        },
    };

    let ord = match op {
        BoolOp::Eq => return Ok(ord == Some(Ordering::Equal)),
        BoolOp::Ne => return Ok(ord != Some(Ordering::Equal)),
        _ => match ord {
            Some(o) if lhs.as_bool().is_none() && rhs.as_bool().is_none() => o,
            _ => {
                return Err(Error::Eval(span.error(
                    format!("cannot order `{lhs}` and `{rhs}`").as_str(),
                )))
            }
        },
    };

    Ok(match op {
        BoolOp::Lt => ord == Ordering::Less,
        BoolOp::Le => ord != Ordering::Greater,
        BoolOp::Gt => ord == Ordering::Greater,
        _ => ord != Ordering::Less,
    })
}

impl Expression {
    /// Evaluates the expression against a single instance.
    pub fn evaluate(
        &self,
        resolver: &dyn PropertyResolver,
        env: &dyn Environment,
    ) -> Result<Evaluation> {
        let mut evaluator = Evaluator::new(env);
        let passed = evaluator.evaluate(self.root(), resolver)?;
        Ok(Evaluation {
            passed,
            evidence: evaluator.take_evidence(),
        })
    }

    /// Evaluates the expression against every instance; it passes only when
    /// all of them do. Evaluation stops at the first failing instance.
    pub fn evaluate_iterator(
        &self,
        instances: &[Instance],
        env: &dyn Environment,
    ) -> Result<IterationResult> {
        if instances.len() > 1 && !self.is_iterable() {
            return Err(Error::NotIterable {
                count: instances.len(),
            });
        }

        let mut first = None;
        for (index, instance) in instances.iter().enumerate() {
            let evaluation = self.evaluate(instance, env)?;
            debug!(
                "`{}` on candidate {index}: passed={}",
                self.text(),
                evaluation.passed
            );
            if !evaluation.passed {
                return Ok(IterationResult {
                    passed: false,
                    index,
                    evidence: evaluation.evidence,
                });
            }
            if first.is_none() {
                first = Some(evaluation.evidence);
            }
        }

        Ok(IterationResult {
            passed: true,
            index: 0,
            evidence: first.unwrap_or_default(),
        })
    }
}
