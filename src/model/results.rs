//! Read-only results model: one evaluated run, ready for presentation.
//!
//! A [`ResultsModel`] is built once from leaf records and never changes
//! afterwards. Views sort and filter references into it; none of them can
//! touch a verdict or a severity.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::config::Config;
use crate::core::errors::Result;
use crate::health::grader::{HealthGrader, HealthParameter};
use crate::health::rollup::{self, HealthGroup, HealthRollup, SystemHealth};
use crate::model::dataset::RunDataset;
use crate::results::requirements::{Requirement, RequirementIndex};
use crate::results::rollup::{
    EvaluatedSuite, EvaluatedTest, RollupPolicy, SuiteRecord, SuiteVerdict, evaluate_suite,
};
use crate::results::verification::Verification;

/// Knobs that change a verdict or a displayed severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationPolicy {
    pub rollup: RollupPolicy,
    pub missing_banner_as_good: bool,
}

impl Default for EvaluationPolicy {
    fn default() -> Self {
        Self {
            rollup: RollupPolicy::default(),
            missing_banner_as_good: true,
        }
    }
}

impl EvaluationPolicy {
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            rollup: RollupPolicy::from_config(&config.rollup),
            missing_banner_as_good: config.health.missing_banner_as_good,
        }
    }
}

/// Verification with its position in the suite tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationRow {
    pub test_number: u32,
    pub step_number: u32,
    #[serde(flatten)]
    pub verification: Verification,
}

/// Health parameter with its position in run order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterRow {
    pub position: u32,
    #[serde(flatten)]
    pub parameter: HealthParameter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsModel {
    suite: EvaluatedSuite,
    requirements: RequirementIndex,
    parameters: Vec<HealthParameter>,
    health: HealthRollup,
    evaluated_at: DateTime<Utc>,
}

impl ResultsModel {
    /// Roll up leaf records and graded parameters.
    #[must_use]
    pub fn evaluate(
        suite: &SuiteRecord,
        parameters: Vec<HealthParameter>,
        policy: &EvaluationPolicy,
    ) -> Self {
        let evaluated = evaluate_suite(suite, &policy.rollup);
        let requirements = RequirementIndex::build(suite.verifications());
        let health = rollup::roll_up(&parameters, policy.missing_banner_as_good);
        Self {
            suite: evaluated,
            requirements,
            parameters,
            health,
            evaluated_at: Utc::now(),
        }
    }

    /// Ingest a dataset, grade its health readings and evaluate it.
    ///
    /// Fails only on contract violations (unknown severity label, duplicate
    /// test number, empty parameter name).
    pub fn from_dataset(data: &RunDataset, config: &Config) -> Result<Self> {
        let suite = data.to_suite()?;
        let grader = HealthGrader::from_config(&config.health);
        let parameters = grader.grade_all(&data.health)?;
        Ok(Self::evaluate(
            &suite,
            parameters,
            &EvaluationPolicy::from_config(config),
        ))
    }

    #[must_use]
    pub const fn suite(&self) -> &EvaluatedSuite {
        &self.suite
    }

    #[must_use]
    pub const fn verdict(&self) -> SuiteVerdict {
        self.suite.verdict
    }

    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.suite.verdict.exit_code()
    }

    #[must_use]
    pub fn test(&self, number: u32) -> Option<&EvaluatedTest> {
        self.suite.test(number)
    }

    #[must_use]
    pub const fn requirements(&self) -> &RequirementIndex {
        &self.requirements
    }

    /// Requirement by id; unknown ids come back as zero-count entries.
    #[must_use]
    pub fn requirement(&self, id: u32) -> Requirement {
        self.requirements.get(id)
    }

    #[must_use]
    pub fn parameters(&self) -> &[HealthParameter] {
        &self.parameters
    }

    #[must_use]
    pub fn groups(&self) -> &[HealthGroup] {
        &self.health.groups
    }

    #[must_use]
    pub const fn banner(&self) -> SystemHealth {
        self.health.banner
    }

    #[must_use]
    pub const fn health(&self) -> &HealthRollup {
        &self.health
    }

    #[must_use]
    pub const fn evaluated_at(&self) -> DateTime<Utc> {
        self.evaluated_at
    }

    // ──────────────────── row projections ────────────────────

    #[must_use]
    pub fn requirement_rows(&self) -> Vec<Requirement> {
        self.requirements.iter().cloned().collect()
    }

    /// Every verification in the suite, or only those of one test.
    #[must_use]
    pub fn verification_rows(&self, test_number: Option<u32>) -> Vec<VerificationRow> {
        self.suite
            .tests
            .iter()
            .filter(|t| test_number.is_none_or(|n| n == t.number))
            .flat_map(|t| {
                t.steps.iter().flat_map(move |s| {
                    s.verifications.iter().map(move |v| VerificationRow {
                        test_number: t.number,
                        step_number: s.number,
                        verification: v.clone(),
                    })
                })
            })
            .collect()
    }

    /// Verifications recorded against one requirement, across all tests.
    #[must_use]
    pub fn requirement_evidence(&self, id: u32) -> Vec<VerificationRow> {
        self.verification_rows(None)
            .into_iter()
            .filter(|row| row.verification.requirement_id() == Some(id))
            .collect()
    }

    #[must_use]
    pub fn parameter_rows(&self) -> Vec<ParameterRow> {
        self.parameters
            .iter()
            .zip(1u32..)
            .map(|(p, position)| ParameterRow {
                position,
                parameter: p.clone(),
            })
            .collect()
    }
}
