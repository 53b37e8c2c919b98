//! Run dataset: the JSON document a test executor hands over after a run.
//!
//! Parsing only checks shape. Turning the document into leaf records
//! assigns verification numbers, applies the fail-safe outcome default and
//! rejects duplicate test numbers.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::core::errors::{DvError, Result};
use crate::health::grader::HealthReading;
use crate::results::rollup::{StepRecord, SuiteRecord, TestRecord};
use crate::results::verification::{CheckInput, VerificationRecorder};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunDataset {
    pub title: String,
    pub description: String,
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub aborted: bool,
    pub force_fail: bool,
    pub tests: Vec<TestInput>,
    pub health: Vec<HealthReading>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestInput {
    pub number: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_executed")]
    pub executed: bool,
    #[serde(default)]
    pub force_fail: bool,
    #[serde(default)]
    pub steps: Vec<StepInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub aborted: bool,
    #[serde(default)]
    pub force_fail: bool,
    #[serde(default)]
    pub verifications: Vec<CheckInput>,
}

const fn default_executed() -> bool {
    true
}

/// Deserialize a JSON scalar as display text: strings as-is, numbers and
/// booleans via their JSON spelling, `null` as empty.
pub fn scalar_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a scalar value, found {other}"
        ))),
    }
}

impl RunDataset {
    /// Read and parse a dataset file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| DvError::io(path, source))?;
        Self::from_json_str(&raw)
    }

    /// Parse a dataset document. Shape errors surface as `DV-2002`.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|error| DvError::MalformedRecord {
            context: "run dataset",
            details: error.to_string(),
        })
    }

    /// Build leaf records, numbering verifications across the whole suite.
    pub fn to_suite(&self) -> Result<SuiteRecord> {
        let mut seen = HashSet::new();
        for test in &self.tests {
            if !seen.insert(test.number) {
                return Err(DvError::DuplicateTestNumber {
                    number: test.number,
                });
            }
        }

        let mut recorder = VerificationRecorder::new();
        let tests = self
            .tests
            .iter()
            .map(|test| TestRecord {
                number: test.number,
                title: test.title.clone(),
                description: test.description.clone(),
                executed: test.executed,
                force_fail: test.force_fail,
                steps: test
                    .steps
                    .iter()
                    .map(|step| StepRecord {
                        title: step.title.clone(),
                        description: step.description.clone(),
                        aborted: step.aborted,
                        force_fail: step.force_fail,
                        verifications: step
                            .verifications
                            .iter()
                            .cloned()
                            .map(|check| recorder.record(check))
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        Ok(SuiteRecord {
            title: self.title.clone(),
            description: self.description.clone(),
            run_id: self.run_id.clone(),
            model: self.model.clone(),
            tests,
            aborted: self.aborted,
            force_fail: self.force_fail,
        })
    }
}
