// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::error::{Error, Result};
use crate::lexer::*;
use crate::value::parse_uint;

use core::fmt;

// Deepest nesting of parentheses, negations, arrays and call arguments.
const MAX_DEPTH: u32 = 256;

#[derive(Clone)]
pub struct Parser<'source> {
    source: Source,
    lexer: Lexer<'source>,
    tok: Token,
    end: u32,
    depth: u32,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source Source) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let tok = lexer.next_token()?;
        Ok(Self {
            source: source.clone(),
            lexer,
            tok,
            end: 0,
            depth: 0,
        })
    }

    pub fn token_text(&self) -> &str {
        match self.tok.0 {
            TokenKind::Symbol | TokenKind::Number | TokenKind::Ident | TokenKind::Eof => {
                self.tok.1.text()
            }
            TokenKind::String | TokenKind::RawString => "",
        }
    }

    pub fn next_token(&mut self) -> Result<()> {
        self.end = self.tok.1.end;
        self.tok = self.lexer.next_token()?;
        Ok(())
    }

    fn error(&self, msg: &str) -> Error {
        Error::Parse(self.source.error(self.tok.1.line, self.tok.1.col, msg))
    }

    fn expect(&mut self, text: &str, context: &str) -> Result<()> {
        if self.token_text() == text && self.tok.0 != TokenKind::Eof {
            self.next_token()
        } else {
            Err(self.error(&format!("expecting `{text}` {context}")))
        }
    }

    fn enter(&mut self) -> Result<()> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn is_keyword(ident: &str) -> bool {
        matches!(ident, "false" | "in" | "true")
    }

    fn parse_ident(&mut self) -> Result<Span> {
        let span = self.tok.1.clone();
        match self.tok.0 {
            TokenKind::Ident if Self::is_keyword(span.text()) => {
                Err(self.error(&format!("unexpected keyword `{}`", span.text())))
            }
            TokenKind::Ident => {
                self.next_token()?;
                Ok(span)
            }
            _ => Err(self.error("expecting identifier")),
        }
    }

    fn read_number(span: Span) -> Result<Expr> {
        match parse_uint(span.text()) {
            Some(value) => Ok(Expr::Number { span, value }),
            None => Err(Error::Parse(span.error("could not parse number"))),
        }
    }

    fn read_string(span: Span) -> Result<Expr> {
        match serde_json::from_str::<String>(format!("\"{}\"", span.text()).as_str()) {
            Ok(value) => Ok(Expr::String { span, value }),
            Err(e) => Err(Error::Parse(
                span.error(format!("invalid string literal. {e}").as_str()),
            )),
        }
    }

    // identifier ("." identifier)* ( "(" args ")" )?
    fn parse_ref_or_call(&mut self) -> Result<Expr> {
        let mut span = self.tok.1.clone();
        let first = self.parse_ident()?;
        let mut name = first.text().to_string();

        while self.token_text() == "." && self.tok.0 == TokenKind::Symbol {
            if self.tok.1.start != self.end {
                return Err(self.error("invalid whitespace before ."));
            }
            let sep_pos = self.tok.1.start;
            self.next_token()?;
            let field = self.parse_ident()?;
            if field.start != sep_pos + 1 {
                return Err(Error::Parse(self.source.error(
                    field.line,
                    field.col - 1,
                    "invalid whitespace between . and identifier",
                )));
            }
            name.push('.');
            name.push_str(field.text());
        }

        if self.token_text() != "(" {
            span.end = self.end;
            return Ok(Expr::Property { span, name });
        }

        self.next_token()?;
        self.enter()?;
        let mut params = vec![];
        if self.token_text() != ")" {
            params.push(Ref::new(self.parse_expr()?));
            while self.token_text() == "," {
                self.next_token()?;
                params.push(Ref::new(self.parse_expr()?));
            }
        }
        self.leave();
        self.expect(")", "while parsing call expr")?;
        span.end = self.end;
        Ok(Expr::Call {
            span,
            fcn: name,
            params,
        })
    }

    fn parse_array(&mut self) -> Result<Expr> {
        let mut span = self.tok.1.clone();
        self.enter()?;
        self.next_token()?;
        let mut items = vec![];
        if self.token_text() != "]" {
            items.push(Ref::new(self.parse_expr()?));
            while self.token_text() == "," {
                self.next_token()?;
                if self.token_text() == "]" {
                    break;
                }
                items.push(Ref::new(self.parse_expr()?));
            }
        }
        self.leave();
        self.expect("]", "while parsing array")?;
        span.end = self.end;
        Ok(Expr::Array { span, items })
    }

    fn parse_parens_expr(&mut self) -> Result<Expr> {
        self.enter()?;
        self.next_token()?;
        let expr = self.parse_expr()?;
        self.leave();
        self.expect(")", "while parsing parenthesized expression")?;
        Ok(expr)
    }

    fn parse_not_expr(&mut self) -> Result<Expr> {
        let mut span = self.tok.1.clone();
        self.enter()?;
        self.next_token()?;
        let expr = self.parse_term()?;
        self.leave();
        span.end = self.end;
        Ok(Expr::Not {
            span,
            expr: Ref::new(expr),
        })
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let span = self.tok.1.clone();
        match &self.tok.0 {
            TokenKind::Number => {
                self.next_token()?;
                Self::read_number(span)
            }
            TokenKind::String => {
                self.next_token()?;
                Self::read_string(span)
            }
            TokenKind::RawString => {
                self.next_token()?;
                let value = span.text().to_string();
                Ok(Expr::String { span, value })
            }
            TokenKind::Ident => match self.token_text() {
                "true" | "false" => {
                    let value = self.token_text() == "true";
                    self.next_token()?;
                    Ok(Expr::Bool { span, value })
                }
                _ => self.parse_ref_or_call(),
            },
            TokenKind::Symbol => match self.token_text() {
                "[" => self.parse_array(),
                "(" => self.parse_parens_expr(),
                "!" => self.parse_not_expr(),
                _ => Err(self.error("expecting expression")),
            },
            TokenKind::Eof => Err(self.error("expecting expression")),
        }
    }

    fn parse_bool_expr(&mut self) -> Result<Expr> {
        let mut span = self.tok.1.clone();
        let expr = self.parse_term()?;

        if self.tok.0 == TokenKind::Ident && self.token_text() == "in" {
            self.next_token()?;
            let collection = self.parse_term()?;
            span.end = self.end;
            return Ok(Expr::Membership {
                span,
                value: Ref::new(expr),
                collection: Ref::new(collection),
            });
        }

        let op = match (&self.tok.0, self.token_text()) {
            (TokenKind::Symbol, "<") => BoolOp::Lt,
            (TokenKind::Symbol, "<=") => BoolOp::Le,
            (TokenKind::Symbol, "==") => BoolOp::Eq,
            (TokenKind::Symbol, ">=") => BoolOp::Ge,
            (TokenKind::Symbol, ">") => BoolOp::Gt,
            (TokenKind::Symbol, "!=") => BoolOp::Ne,
            _ => return Ok(expr),
        };
        self.next_token()?;
        let rhs = self.parse_term()?;
        span.end = self.end;
        Ok(Expr::BoolExpr {
            span,
            op,
            lhs: Ref::new(expr),
            rhs: Ref::new(rhs),
        })
    }

    fn parse_and_expr(&mut self) -> Result<Expr> {
        let start = self.tok.1.clone();
        let mut expr = self.parse_bool_expr()?;
        // Each operand deepens the left-leaning tree by one level.
        let depth = self.depth;
        while self.token_text() == "&&" && self.tok.0 == TokenKind::Symbol {
            self.enter()?;
            self.next_token()?;
            let rhs = self.parse_bool_expr()?;
            let mut span = start.clone();
            span.end = self.end;
            expr = Expr::LogicalExpr {
                span,
                op: LogicalOp::And,
                lhs: Ref::new(expr),
                rhs: Ref::new(rhs),
            };
        }
        self.depth = depth;
        Ok(expr)
    }

    pub fn parse_or_expr(&mut self) -> Result<Expr> {
        let start = self.tok.1.clone();
        let mut expr = self.parse_and_expr()?;
        // Each operand deepens the left-leaning tree by one level.
        let depth = self.depth;
        while self.token_text() == "||" && self.tok.0 == TokenKind::Symbol {
            self.enter()?;
            self.next_token()?;
            let rhs = self.parse_and_expr()?;
            let mut span = start.clone();
            span.end = self.end;
            expr = Expr::LogicalExpr {
                span,
                op: LogicalOp::Or,
                lhs: Ref::new(expr),
                rhs: Ref::new(rhs),
            };
        }
        self.depth = depth;
        Ok(expr)
    }

    pub fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or_expr()
    }

    /// Parses a complete expression; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Expr> {
        let expr = self.parse_expr()?;
        if self.tok.0 != TokenKind::Eof {
            return Err(self.error(&format!("unexpected `{}`", self.tok.1.text())));
        }
        Ok(expr)
    }
}

/// A compiled condition. Immutable once built; cloning shares the tree.
#[derive(Clone)]
pub struct Expression {
    source: Source,
    expr: Ref<Expr>,
    iterable: bool,
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("text", &self.source.contents())
            .field("iterable", &self.iterable)
            .finish()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source.contents())
    }
}

impl Expression {
    fn compile(text: &str, iterable: bool) -> Result<Expression> {
        let source = Source::new(text);
        let expr = Parser::new(&source)?.parse()?;
        Ok(Expression {
            source,
            expr: Ref::new(expr),
            iterable,
        })
    }

    /// Compiles an expression that is evaluated against a single instance.
    pub fn parse(text: &str) -> Result<Expression> {
        Self::compile(text, false)
    }

    /// Compiles an expression that may be evaluated against zero or more
    /// candidate instances, e.g. every file matched by a glob.
    pub fn parse_iterable(text: &str) -> Result<Expression> {
        Self::compile(text, true)
    }

    pub fn text(&self) -> &str {
        self.source.contents()
    }

    pub fn root(&self) -> &Ref<Expr> {
        &self.expr
    }

    pub fn is_iterable(&self) -> bool {
        self.iterable
    }

    pub fn is_call(&self) -> bool {
        self.expr.is_call()
    }

    /// Canonical text of the expression, stable across whitespace changes.
    pub fn canonical(&self) -> String {
        self.expr.to_string()
    }
}

/// Compiles `text`; with `iterable` set the result accepts many instances.
pub fn parse(text: &str, iterable: bool) -> Result<Expression> {
    Expression::compile(text, iterable)
}
