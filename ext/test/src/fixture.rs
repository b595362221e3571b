//! Conformance test fixture runner
//!
//! Loads YAML fixtures and runs them against the chainer engine. A fixture is a
//! pipeline config, a start chain, and cases pairing an input context with
//! the complete context expected after the run.

use crate::TestContext;
use chainer::prelude::*;
use chainer::{PipelineConfig, Registry, RegistryBuilder};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// A complete test fixture
#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub pipeline: PipelineConfig,
    pub start: String,
    /// When set, loading must fail with a message containing this text.
    #[serde(default)]
    pub load_error: Option<String>,
    #[serde(default)]
    pub cases: Vec<TestCase>,
}

/// Test case
#[derive(Debug, Deserialize)]
pub struct TestCase {
    pub name: String,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Every key holding a value after the run. Ignored when `expect_error` is set.
    #[serde(default)]
    pub expect: BTreeMap<String, String>,
    #[serde(default)]
    pub expect_error: Option<ErrorKind>,
}

/// Which run error a case expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ChainNotFound,
    MissingContextValue,
    Processor,
}

impl ErrorKind {
    fn of(err: &PipelineError) -> Self {
        match err {
            PipelineError::ChainNotFound { .. } => Self::ChainNotFound,
            PipelineError::MissingContextValue(_) => Self::MissingContextValue,
            PipelineError::Processor { .. } => Self::Processor,
        }
    }
}

impl TestCase {
    /// Build a `MetaData` from this case's context map
    pub fn build_meta_data(&self) -> MetaData {
        TestContext::from(self.context.clone()).into_meta_data()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Runner
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of a run, in a form comparable across cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Context(BTreeMap<String, String>),
    Error(ErrorKind),
}

/// Result of running a single test case
#[derive(Debug)]
pub struct CaseResult {
    pub case_name: String,
    pub passed: bool,
    pub expected: Outcome,
    pub actual: Outcome,
}

fn registry() -> &'static Registry {
    static REGISTRY: LazyLock<Registry> =
        LazyLock::new(|| crate::register(RegistryBuilder::new()).build());
    &REGISTRY
}

impl Fixture {
    /// Parse a fixture from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Parse multiple fixtures from a YAML file with `---` separators
    pub fn from_yaml_multi(yaml: &str) -> Result<Vec<Self>, serde_yaml::Error> {
        let mut fixtures = Vec::new();
        for doc in serde_yaml::Deserializer::from_str(yaml) {
            fixtures.push(Self::deserialize(doc)?);
        }
        Ok(fixtures)
    }

    /// Load the pipeline with every chainer-test type registered.
    ///
    /// # Errors
    ///
    /// Whatever [`Registry::load_pipeline`] rejects.
    pub fn load(&self) -> Result<ChainRegistry, ConfigError> {
        registry().load_pipeline(self.pipeline.clone())
    }

    /// Run all test cases and return results
    ///
    /// # Errors
    ///
    /// Returns the load error when the pipeline cannot be built.
    pub fn run(&self) -> Result<Vec<CaseResult>, ConfigError> {
        let chains = self.load()?;
        let results = self
            .cases
            .iter()
            .map(|case| {
                let expected = match case.expect_error {
                    Some(kind) => Outcome::Error(kind),
                    None => Outcome::Context(case.expect.clone()),
                };
                let actual = match chains.run(case.build_meta_data(), &self.start) {
                    Ok(md) => Outcome::Context(TestContext::snapshot(&md).values().clone()),
                    Err(err) => Outcome::Error(ErrorKind::of(&err)),
                };
                CaseResult {
                    case_name: case.name.clone(),
                    passed: actual == expected,
                    expected,
                    actual,
                }
            })
            .collect();
        Ok(results)
    }

    /// Run all test cases and panic on first failure
    pub fn run_and_assert(&self) {
        if let Some(expected) = &self.load_error {
            match self.load() {
                Ok(_) => panic!(
                    "Fixture '{}' loaded, expected error containing {expected:?}",
                    self.name
                ),
                Err(err) => assert!(
                    err.to_string().contains(expected.as_str()),
                    "Fixture '{}' failed to load with {err}, expected {expected:?}",
                    self.name
                ),
            }
            return;
        }

        let results = self
            .run()
            .unwrap_or_else(|err| panic!("Fixture '{}' failed to load: {err}", self.name));
        for result in results {
            assert!(
                result.passed,
                "Fixture '{}' case '{}' failed: expected {:?}, got {:?}",
                self.name, result.case_name, result.expected, result.actual
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
name: fixture.smoke
description: one chain, one processor
pipeline:
  chains:
    - name: A
      steps:
        - type: processor
          type_url: chainer.test.v1.SetValue
          config: { key: fixture.smoke.out, value: "1" }
start: A
cases:
  - name: sets value
    context: { fixture.smoke.in: x }
    expect: { fixture.smoke.in: x, fixture.smoke.out: "1" }
  - name: wrong expectation
    expect: {}
"#;

    #[test]
    fn run_reports_each_case() {
        let fixture = Fixture::from_yaml(FIXTURE).unwrap();
        let results = fixture.run().unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].passed);
        assert!(!results[1].passed);
    }

    #[test]
    fn multi_document() {
        let yaml = format!("{FIXTURE}\n---\n{FIXTURE}");
        assert_eq!(Fixture::from_yaml_multi(&yaml).unwrap().len(), 2);
    }
}
