// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::*;

use core::{cmp, fmt, ops::Deref};
use std::rc::Rc;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BoolOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
}

impl BoolOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoolOp::Lt => "<",
            BoolOp::Le => "<=",
            BoolOp::Eq => "==",
            BoolOp::Ge => ">=",
            BoolOp::Gt => ">",
            BoolOp::Ne => "!=",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LogicalOp {
    And,
    Or,
}

pub struct NodeRef<T> {
    r: Rc<T>,
}

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        Self { r: self.r.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.r.as_ref().fmt(f)
    }
}

impl<T: fmt::Display> fmt::Display for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.r.as_ref().fmt(f)
    }
}

impl<T> cmp::PartialEq for NodeRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::as_ptr(&self.r).eq(&Rc::as_ptr(&other.r))
    }
}

impl<T> cmp::Eq for NodeRef<T> {}

impl<T> Deref for NodeRef<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.r
    }
}

impl<T> AsRef<T> for NodeRef<T> {
    fn as_ref(&self) -> &T {
        self.deref()
    }
}

impl<T> NodeRef<T> {
    pub fn new(t: T) -> Self {
        Self { r: Rc::new(t) }
    }
}

pub type Ref<T> = NodeRef<T>;

#[derive(Debug)]
pub enum Expr {
    String {
        span: Span,
        value: String,
    },

    Number {
        span: Span,
        value: u64,
    },

    Bool {
        span: Span,
        value: bool,
    },

    // Literal set, only meaningful on the right of `in`.
    Array {
        span: Span,
        items: Vec<Ref<Expr>>,
    },

    // Dotted property name such as `file.permissions`.
    Property {
        span: Span,
        name: String,
    },

    Call {
        span: Span,
        fcn: String,
        params: Vec<Ref<Expr>>,
    },

    Not {
        span: Span,
        expr: Ref<Expr>,
    },

    BoolExpr {
        span: Span,
        op: BoolOp,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
    },

    Membership {
        span: Span,
        value: Ref<Expr>,
        collection: Ref<Expr>,
    },

    LogicalExpr {
        span: Span,
        op: LogicalOp,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        use Expr::*;
        match self {
            String { span, .. }
            | Number { span, .. }
            | Bool { span, .. }
            | Array { span, .. }
            | Property { span, .. }
            | Call { span, .. }
            | Not { span, .. }
            | BoolExpr { span, .. }
            | Membership { span, .. }
            | LogicalExpr { span, .. } => span,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Expr::Call { .. })
    }
}

// Canonical rendering, independent of the whitespace in the source text.
// Used as the identity of cached calls and as evidence keys.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::String { value, .. } => match serde_json::to_string(value) {
                Ok(s) => f.write_str(&s),
                Err(_) => Err(fmt::Error),
            },
            Expr::Number { span, .. } => f.write_str(span.text()),
            Expr::Bool { value, .. } => write!(f, "{value}"),
            Expr::Array { items, .. } => {
                f.write_str("[")?;
                write_list(f, items)?;
                f.write_str("]")
            }
            Expr::Property { name, .. } => f.write_str(name),
            Expr::Call { fcn, params, .. } => {
                write!(f, "{fcn}(")?;
                write_list(f, params)?;
                f.write_str(")")
            }
            Expr::Not { expr, .. } => write!(f, "!({expr})"),
            Expr::BoolExpr { op, lhs, rhs, .. } => write!(f, "{lhs} {} {rhs}", op.as_str()),
            Expr::Membership {
                value, collection, ..
            } => write!(f, "{value} in {collection}"),
            Expr::LogicalExpr { op, lhs, rhs, .. } => match op {
                LogicalOp::And => write!(f, "{lhs} && {rhs}"),
                LogicalOp::Or => write!(f, "({lhs} || {rhs})"),
            },
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Ref<Expr>]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}
