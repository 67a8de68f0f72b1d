// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{anyhow, bail, Result};
use compliance::{unstable::*, *};
use serde::{Deserialize, Serialize};
use test_generator::test_resources;

macro_rules! my_assert_eq {
    ($left:expr, $right:expr, $($arg:tt)+) => {
	match (&($left), &($right)) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
		    return Err(anyhow!("mismatch:\nleft  = {}\nright = {}\n{}",
		     		       &$left, &$right, format_args!($($arg)+)));
                }
            }
	}
    }
}

#[derive(Serialize, Deserialize, Debug)]
struct TestCase {
    note: String,
    expr: String,
    canonical: Option<String>,
    error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn yaml_test_impl(file: &str) -> Result<()> {
    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    println!("running {file}");

    for case in test.cases {
        print!("case {} ", case.note);
        match (Expression::parse(&case.expr), &case.canonical, &case.error) {
            (Ok(expr), Some(canonical), None) => {
                my_assert_eq!(expr.canonical(), *canonical, "case {}", case.note);
                my_assert_eq!(expr.text(), case.expr.as_str(), "case {}", case.note);
                // Canonical text must parse back to itself.
                let reparsed = Expression::parse(&expr.canonical())?;
                my_assert_eq!(reparsed.canonical(), *canonical, "case {}", case.note);
            }
            (Err(actual), None, Some(expected)) => {
                if !actual.is_parse() {
                    bail!("case {}: expected a parse error, got {actual:?}", case.note);
                }
                my_assert_eq!(actual.to_string(), *expected, "case {}", case.note);
            }
            (Ok(expr), _, Some(_)) => {
                bail!("case {}: parsed as `{}`, expected an error", case.note, expr.canonical())
            }
            (Err(e), _, _) => return Err(e.into()),
            _ => bail!("either canonical or error must be specified in test case."),
        }
        println!("passed");
    }

    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{}", e);
        }
    }
}

#[test_resources("tests/parser/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

#[test]
fn precedence() -> Result<()> {
    let expr = Expression::parse("a == 1 || b == 2 && c == 3")?;
    let Expr::LogicalExpr { op, rhs, .. } = expr.root().as_ref() else {
        bail!("expected logical expression, got {}", expr.canonical());
    };
    assert_eq!(*op, LogicalOp::Or);
    assert!(matches!(
        rhs.as_ref(),
        Expr::LogicalExpr {
            op: LogicalOp::And,
            ..
        }
    ));
    Ok(())
}

#[test]
fn numbers_use_literal_radix() -> Result<()> {
    for (text, want) in [("0644", 0o644), ("0x1a4", 420), ("420", 420), ("0", 0)] {
        let expr = Expression::parse(text)?;
        match expr.root().as_ref() {
            Expr::Number { value, .. } => assert_eq!(*value, want, "{text}"),
            _ => bail!("{text} did not parse as a number"),
        }
    }
    let err = Expression::parse("089").unwrap_err();
    assert_eq!(err.to_string(), "1:1: could not parse number");
    Ok(())
}

#[test]
fn iterable_mode() -> Result<()> {
    let single = parse("file.permissions == 0644", false)?;
    let many = parse("file.permissions == 0644", true)?;
    assert!(!single.is_iterable());
    assert!(many.is_iterable());
    assert_eq!(single.canonical(), many.canonical());

    let path = Expression::parse(r#"process.flag("dockerd", "--config-file")"#)?;
    assert!(path.is_call());
    assert!(!Expression::parse("/etc/docker/daemon.json").is_ok_and(|e| e.is_call()));
    Ok(())
}

#[test]
fn spans_cover_operands() -> Result<()> {
    let expr = Expression::parse("file.permissions == 0644")?;
    let Expr::BoolExpr { span, lhs, rhs, .. } = expr.root().as_ref() else {
        bail!("expected comparison");
    };
    assert_eq!(span.text(), "file.permissions == 0644");
    assert_eq!(lhs.span().text(), "file.permissions");
    assert_eq!((rhs.span().line, rhs.span().col), (1, 21));

    let expr = Expression::parse(r#"file.user == "root""#)?;
    let Expr::BoolExpr { rhs, .. } = expr.root().as_ref() else {
        bail!("expected comparison");
    };
    // String spans exclude the quotes.
    assert_eq!(rhs.span().text(), "root");
    assert_eq!((rhs.span().line, rhs.span().col), (1, 15));
    Ok(())
}

#[test]
fn deep_nesting_is_a_parse_error() -> Result<()> {
    let deep = [
        format!("{}true{}", "(".repeat(200000), ")".repeat(200000)),
        format!("{}true", "!".repeat(200000)),
        format!("a in {}1{}", "[".repeat(200000), "]".repeat(200000)),
        format!("{}1{}", "f(".repeat(200000), ")".repeat(200000)),
        vec!["a == 1"; 100000].join(" && "),
        vec!["a == 1"; 100000].join(" || "),
    ];
    for text in &deep {
        match Expression::parse(text) {
            Err(err) if err.is_parse() => {
                assert!(err.to_string().ends_with("expression nested too deeply"))
            }
            other => bail!("expected a nesting error, got {other:?}"),
        }
    }

    // The limit is reached exactly, not before.
    Expression::parse(&format!("{}true{}", "(".repeat(256), ")".repeat(256)))?;
    Expression::parse(&vec!["a == 1"; 200].join(" && "))?;
    Ok(())
}
