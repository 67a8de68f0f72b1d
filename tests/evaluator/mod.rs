// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Result};
use compliance::*;
use serde::{Deserialize, Serialize};
use test_generator::test_resources;

// Process table seen by `process.*` functions in the cases.
struct Processes;

impl ProcessLookup for Processes {
    fn cmdlines(&self, name: &str) -> compliance::Result<Vec<Vec<String>>> {
        let cmdline = |args: &[&str]| -> Vec<String> { args.iter().map(|a| a.to_string()).collect() };
        Ok(match name {
            "dockerd" => vec![cmdline(&[
                "/usr/bin/dockerd",
                "--config-file",
                "/etc/docker/daemon.json",
                "--icc=false",
                "--live-restore",
            ])],
            "kubelet" => vec![
                cmdline(&["kubelet", "--anonymous-auth=false"]),
                cmdline(&["kubelet", "--anonymous-auth=true"]),
            ],
            _ => vec![],
        })
    }
}

#[derive(Serialize, Deserialize, Debug)]
struct TestCase {
    note: String,
    condition: String,
    #[serde(default)]
    iterable: bool,
    #[serde(default)]
    properties: KV,
    instances: Option<Vec<KV>>,
    document: Option<String>,
    want: Option<bool>,
    index: Option<usize>,
    evidence: Option<KV>,
    error: Option<String>,
    skip: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug)]
struct YamlTest {
    cases: Vec<TestCase>,
}

struct Outcome {
    passed: bool,
    index: Option<usize>,
    evidence: KV,
}

fn eval_case(case: &TestCase) -> Result<Outcome> {
    let env = HostEnv::with_processes(HostEnvConfig::default(), Box::new(Processes));
    let expr = parse(&case.condition, case.iterable)?;
    let instance = |vars: &KV| {
        let instance = Instance::new(vars.clone());
        match &case.document {
            Some(path) => instance.with_document(path.as_str()),
            None => instance,
        }
    };

    match &case.instances {
        Some(vars) => {
            let instances: Vec<Instance> = vars.iter().map(instance).collect();
            let result = expr.evaluate_iterator(&instances, &env)?;
            Ok(Outcome {
                passed: result.passed,
                index: Some(result.index),
                evidence: result.evidence,
            })
        }
        None => {
            let evaluation = expr.evaluate(&instance(&case.properties), &env)?;
            Ok(Outcome {
                passed: evaluation.passed,
                index: None,
                evidence: evaluation.evidence,
            })
        }
    }
}

fn check_outcome(case: &TestCase, outcome: &Outcome) -> Result<()> {
    if case.want != Some(outcome.passed) {
        bail!(
            "case {}: verdict {} does not match {:?}",
            case.note,
            outcome.passed,
            case.want
        );
    }
    if let Some(index) = case.index {
        if outcome.index != Some(index) {
            bail!(
                "case {}: reported instance {:?}, expected {index}",
                case.note,
                outcome.index
            );
        }
    }
    for (key, value) in case.evidence.iter().flatten() {
        match outcome.evidence.get(key) {
            Some(actual) if actual == value => (),
            actual => bail!(
                "case {}: evidence `{key}` is {actual:?}, expected {value:?}\n{:#?}",
                case.note,
                outcome.evidence
            ),
        }
    }
    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    println!("running {file}");

    for case in test.cases {
        print!("case {} ", case.note);
        if case.skip == Some(true) {
            println!("skipped");
            continue;
        }

        match (&case.want, &case.error) {
            (Some(_), None) | (None, Some(_)) => (),
            _ => panic!("either want or error must be specified in test case."),
        }

        match eval_case(&case) {
            Ok(outcome) => match case.error {
                None => check_outcome(&case, &outcome)?,
                Some(_) => bail!("eval succeeded and did not produce any errors"),
            },
            Err(actual) => match &case.error {
                Some(expected) => {
                    let actual = actual.to_string();
                    if !actual.contains(expected) {
                        bail!(
                            "Error message\n`{}\n`\ndoes not contain `{}`",
                            actual,
                            expected
                        );
                    }
                    println!("{actual}");
                }
                _ => return Err(actual),
            },
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

#[test_resources("tests/evaluator/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

#[test]
fn side_effecting_calls_resolve_once_per_environment() -> Result<()> {
    let env = HostEnv::with_processes(HostEnvConfig::default(), Box::new(Processes));
    let expr = Expression::parse(
        r#"process.flag("dockerd", "--config-file") != "" && process.flag( "dockerd", "--config-file" ) == "/etc/docker/daemon.json""#,
    )?;

    for _ in 0..3 {
        assert!(expr.evaluate(&KV::new(), &env)?.passed);
    }
    assert_eq!(env.cache().misses(), 1);
    assert_eq!(env.cache().len(), 1);

    // A new environment starts from an empty cache.
    let fresh = HostEnv::with_processes(HostEnvConfig::default(), Box::new(Processes));
    assert!(fresh.cache().is_empty());
    Ok(())
}

#[test]
fn custom_function_registry() -> Result<()> {
    fn always(
        _span: &unstable::Span,
        args: &[Value],
        _instance: &dyn PropertyResolver,
        _env: &dyn Environment,
    ) -> compliance::Result<Value> {
        Ok(Value::from(args.len() as u64))
    }

    let mut functions = FunctionRegistry::new();
    functions.insert("test.count", Function::Instance { fcn: always, arity: 2 });

    let env = HostEnv::new(HostEnvConfig::default());
    let expr = Expression::parse(r#"test.count("a", 1) == 2"#)?;
    let mut evaluator = Evaluator::with_functions(&env, &functions);
    assert!(evaluator.evaluate(expr.root(), &KV::new())?);
    assert_eq!(
        evaluator.evidence().get(r#"test.count("a", 1)"#),
        Some(&Value::Uint(2))
    );

    // Builtins are not visible through a custom registry.
    let expr = Expression::parse(r#"file.jq(".a") == """#)?;
    let err = evaluator.evaluate(expr.root(), &KV::new()).unwrap_err();
    assert_eq!(err.to_string(), "1:1: unknown function file.jq()");
    Ok(())
}

#[test]
fn builtin_functions() {
    let mut names: Vec<_> = FUNCTIONS.names().copied().collect();
    names.sort();
    assert_eq!(
        names,
        [
            "file.jq",
            "file.regexp",
            "file.yaml",
            "process.flag",
            "process.hasFlag"
        ]
    );
    assert!(FUNCTIONS
        .get("process.flag")
        .is_some_and(|f| f.is_side_effecting() && f.arity() == 2));
    assert!(FUNCTIONS
        .get("file.jq")
        .is_some_and(|f| !f.is_side_effecting() && f.arity() == 1));
}

#[test]
fn compare_semantics() {
    use compliance::unstable::{BoolOp, Source, Span};

    let source = Source::new("x");
    let span = Span {
        source,
        line: 1,
        col: 1,
        start: 0,
        end: 1,
    };
    let cmp = |op, l: Value, r: Value| compare(&span, op, &l, &r);

    assert_eq!(cmp(BoolOp::Eq, Value::from("0644"), Value::Uint(0o644)), Ok(true));
    assert_eq!(cmp(BoolOp::Lt, Value::from("abc"), Value::from("abd")), Ok(true));
    assert_eq!(cmp(BoolOp::Eq, Value::from("abc"), Value::Uint(1)), Ok(false));
    assert_eq!(cmp(BoolOp::Ne, Value::from("abc"), Value::Uint(1)), Ok(true));
    assert_eq!(cmp(BoolOp::Eq, Value::from("true"), Value::Bool(true)), Ok(true));
    assert!(cmp(BoolOp::Gt, Value::Bool(true), Value::Bool(false)).is_err());
    assert!(cmp(BoolOp::Ge, Value::from("abc"), Value::Uint(1)).is_err());
}
