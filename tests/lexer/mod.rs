// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Result};
use compliance::unstable::*;
use serde::{Deserialize, Serialize};
use test_generator::test_resources;

fn get_tokens(source: &Source) -> compliance::Result<Vec<Token>> {
    let mut tokens = vec![];
    let mut lex = Lexer::new(source);
    loop {
        let tok = lex.next_token()?;
        tokens.push(tok.clone());
        if tok.0 == TokenKind::Eof {
            break;
        }
    }

    Ok(tokens)
}

// Compact form of a token: `<kind> <line>:<col> <text>`.
fn describe(tok: &Token) -> String {
    format!("{:?} {}:{} {}", tok.0, tok.1.line, tok.1.col, tok.1.text())
        .trim_end()
        .to_string()
}

#[derive(Serialize, Deserialize, Debug)]
struct TestCase {
    note: String,
    source: String,
    tokens: Option<Vec<String>>,
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
        let source = Source::new(&case.source);
        match (get_tokens(&source), &case.tokens, &case.error) {
            (Ok(tokens), Some(expected), None) => {
                let actual: Vec<String> = tokens.iter().map(describe).collect();
                if &actual != expected {
                    bail!(
                        "case {}: token mismatch\nactual   = {actual:#?}\nexpected = {expected:#?}",
                        case.note
                    );
                }
            }
            (Err(actual), None, Some(expected)) => {
                let actual = actual.to_string();
                if !actual.contains(expected.as_str()) {
                    bail!("Error message\n`{actual}\n`\ndoes not contain `{expected}`");
                }
            }
            (Ok(_), _, Some(_)) => bail!("case {}: lexing succeeded, expected an error", case.note),
            (Err(e), _, _) => return Err(e.into()),
            _ => bail!("either tokens or error must be specified in test case."),
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

#[test_resources("tests/lexer/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

#[test]
fn debug() -> Result<()> {
    let text = "\"This string is 35 characters long.\"\"short string\"";
    let source = Source::new(text);

    let mut lexer = Lexer::new(&source);
    let tok = lexer.next_token()?;
    assert_eq!(
        format!("{:?}", tok.1),
        "1:2:1:35, \"This string is 35 characters lon...\"",
        "long span not truncated correctly"
    );

    let tok = lexer.next_token()?;
    assert_eq!(format!("{:?}", tok.1), "1:38:37:49, \"short string\"");

    Ok(())
}

#[test]
fn error_positions() -> Result<()> {
    let source = Source::new("a ==\n   b ~");
    let err = get_tokens(&source).unwrap_err();
    assert!(err.is_parse());
    assert_eq!(err.to_string(), "2:6: invalid character");
    Ok(())
}

#[test]
fn debug_truncates_on_char_boundary() -> Result<()> {
    let text = format!("\"a{}\" == \"x\"", "é".repeat(40));
    let source = Source::new(&text);
    let tok = Lexer::new(&source).next_token()?;
    assert_eq!(
        format!("{:?}", tok.1),
        format!("1:2:1:82, \"a{}...\"", "é".repeat(31))
    );

    // Debug output of a parsed tree walks the same spans.
    let expr = compliance::Expression::parse(&text)?;
    assert!(format!("{:?}", expr.root()).contains("..."));
    Ok(())
}

#[test]
fn nul_is_not_end_of_input() -> Result<()> {
    let cases = [
        ("a == 1\0 || true", "1:7: invalid character"),
        ("\"ab\0c\" == a", "1:4: invalid character in string"),
        ("`ab\0c` == a", "1:4: invalid character in string"),
    ];
    for (text, expected) in cases {
        let source = Source::new(text);
        match get_tokens(&source) {
            Err(err) => assert_eq!(err.to_string(), expected, "{text:?}"),
            Ok(tokens) => bail!("{text:?} lexed as {tokens:?}"),
        }
        assert!(compliance::Expression::parse(text).is_err());
    }
    Ok(())
}
