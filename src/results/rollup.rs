//! Step → TestCase → Suite aggregation.
//!
//! Every derived result is recomputed from the leaf verifications on each
//! call. Nothing is cached between calls, so an aggregate can never disagree
//! with its children. Leaf records are only read, never modified.

#![allow(missing_docs)]

use std::fmt;

use serde::Serialize;

use crate::core::config::RollupConfig;
use crate::results::requirements::RequirementIndex;
use crate::results::verification::{Outcome, Verification};

// ──────────────────── counters ────────────────────

/// Pass/fail counter with `total == pass + fail`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub total: u32,
    pub pass: u32,
    pub fail: u32,
}

impl Tally {
    pub fn add(&mut self, outcome: Outcome) {
        self.record(outcome.is_pass());
    }

    pub fn record(&mut self, passed: bool) {
        self.total += 1;
        if passed {
            self.pass += 1;
        } else {
            self.fail += 1;
        }
    }
}

// ──────────────────── result vocabularies ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepResult {
    Passed,
    Failed,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestResult {
    Passed,
    Failed,
    Skipped,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SuiteVerdict {
    Passed,
    Failed,
    Aborted,
}

impl StepResult {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Aborted => "ABORTED",
        }
    }
}

impl TestResult {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
            Self::Aborted => "ABORTED",
        }
    }

    /// Sort position: passed, skipped, failed, aborted.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Passed => 0,
            Self::Skipped => 1,
            Self::Failed => 2,
            Self::Aborted => 3,
        }
    }
}

impl SuiteVerdict {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Aborted => "ABORTED",
        }
    }

    /// Process exit code a caller should report: 0 only for a passing suite.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Passed => 0,
            Self::Failed | Self::Aborted => 1,
        }
    }
}

macro_rules! display_via_label {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        })*
    };
}

display_via_label!(StepResult, TestResult, SuiteVerdict);

// ──────────────────── leaf-holding records ────────────────────

/// Executed step with its recorded verifications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepRecord {
    pub title: String,
    pub description: String,
    pub verifications: Vec<Verification>,
    /// Executor reported the step did not run to completion.
    pub aborted: bool,
    /// Executor stopped the step and forced it to fail.
    pub force_fail: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestRecord {
    pub number: u32,
    pub title: String,
    pub description: String,
    pub steps: Vec<StepRecord>,
    /// False when the test was skipped and never ran.
    pub executed: bool,
    pub force_fail: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteRecord {
    pub title: String,
    pub description: String,
    pub run_id: String,
    pub model: Option<String>,
    pub tests: Vec<TestRecord>,
    /// Executor reported the suite itself did not finish.
    pub aborted: bool,
    /// Executor stopped the suite and forced it to fail.
    pub force_fail: bool,
}

impl SuiteRecord {
    /// All leaf verifications in suite order.
    pub fn verifications(&self) -> impl Iterator<Item = &Verification> {
        self.tests
            .iter()
            .flat_map(|t| t.steps.iter())
            .flat_map(|s| s.verifications.iter())
    }
}

// ──────────────────── derived views ────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluatedStep {
    /// 1-based position within its test case.
    pub number: u32,
    pub title: String,
    pub description: String,
    pub result: StepResult,
    pub verifications: Vec<Verification>,
    pub tally: Tally,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TestSummary {
    pub steps: Tally,
    pub verifications: Tally,
    pub requirements: Tally,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluatedTest {
    pub number: u32,
    pub title: String,
    pub description: String,
    pub result: TestResult,
    pub steps: Vec<EvaluatedStep>,
    pub summary: TestSummary,
    /// Requirements restricted to this test case's verifications.
    pub requirements: RequirementIndex,
}

impl EvaluatedTest {
    pub fn verifications(&self) -> impl Iterator<Item = &Verification> {
        self.steps.iter().flat_map(|s| s.verifications.iter())
    }
}

/// Suite-level test counts. Aborted tests are counted in `fail`, so
/// `total == pass + fail + skip` always holds; `aborted` says how many of
/// the failures were aborts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SuiteTotals {
    pub total: u32,
    pub pass: u32,
    pub fail: u32,
    pub skip: u32,
    pub aborted: u32,
}

impl SuiteTotals {
    fn add(&mut self, result: TestResult) {
        self.total += 1;
        match result {
            TestResult::Passed => self.pass += 1,
            TestResult::Failed => self.fail += 1,
            TestResult::Skipped => self.skip += 1,
            TestResult::Aborted => {
                self.fail += 1;
                self.aborted += 1;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SuiteSummary {
    pub tests: SuiteTotals,
    pub verifications: Tally,
    pub requirements: Tally,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluatedSuite {
    pub title: String,
    pub description: String,
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub verdict: SuiteVerdict,
    /// No test aborted and the suite itself ran to completion.
    pub complete: bool,
    pub summary: SuiteSummary,
    pub tests: Vec<EvaluatedTest>,
}

impl EvaluatedSuite {
    #[must_use]
    pub fn test(&self, number: u32) -> Option<&EvaluatedTest> {
        self.tests.iter().find(|t| t.number == number)
    }

    pub fn verifications(&self) -> impl Iterator<Item = &Verification> {
        self.tests.iter().flat_map(EvaluatedTest::verifications)
    }
}

/// Suite-verdict knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollupPolicy {
    /// A skipped test fails the suite verdict (it still counts as `skip`).
    pub skipped_fails_suite: bool,
}

impl Default for RollupPolicy {
    fn default() -> Self {
        Self {
            skipped_fails_suite: true,
        }
    }
}

impl RollupPolicy {
    #[must_use]
    pub const fn from_config(config: &RollupConfig) -> Self {
        Self {
            skipped_fails_suite: config.skipped_fails_suite,
        }
    }
}

// ──────────────────── aggregation ────────────────────

#[must_use]
pub fn step_result(step: &StepRecord) -> StepResult {
    if step.force_fail || step.verifications.iter().any(|v| !v.passed()) {
        StepResult::Failed
    } else if step.aborted {
        StepResult::Aborted
    } else {
        StepResult::Passed
    }
}

#[must_use]
pub fn evaluate_step(step: &StepRecord, number: u32) -> EvaluatedStep {
    let mut tally = Tally::default();
    for v in &step.verifications {
        tally.add(v.outcome());
    }
    EvaluatedStep {
        number,
        title: step.title.clone(),
        description: step.description.clone(),
        result: step_result(step),
        verifications: step.verifications.clone(),
        tally,
    }
}

#[must_use]
pub fn evaluate_test(test: &TestRecord) -> EvaluatedTest {
    let steps: Vec<EvaluatedStep> = test
        .steps
        .iter()
        .zip(1u32..)
        .map(|(s, n)| evaluate_step(s, n))
        .collect();

    let result = if steps.iter().any(|s| s.result == StepResult::Aborted) {
        TestResult::Aborted
    } else if test.force_fail || steps.iter().any(|s| s.result == StepResult::Failed) {
        TestResult::Failed
    } else if !test.executed {
        TestResult::Skipped
    } else {
        TestResult::Passed
    };

    let mut summary = TestSummary::default();
    for step in &steps {
        summary.steps.record(step.result == StepResult::Passed);
        for v in &step.verifications {
            summary.verifications.add(v.outcome());
        }
    }
    let requirements = RequirementIndex::build(steps.iter().flat_map(|s| s.verifications.iter()));
    summary.requirements = requirements.summary();

    EvaluatedTest {
        number: test.number,
        title: test.title.clone(),
        description: test.description.clone(),
        result,
        steps,
        summary,
        requirements,
    }
}

#[must_use]
pub fn evaluate_suite(suite: &SuiteRecord, policy: &RollupPolicy) -> EvaluatedSuite {
    let tests: Vec<EvaluatedTest> = suite.tests.iter().map(evaluate_test).collect();

    let mut summary = SuiteSummary::default();
    for test in &tests {
        summary.tests.add(test.result);
        for v in test.verifications() {
            summary.verifications.add(v.outcome());
        }
    }
    summary.requirements = RequirementIndex::build(suite.verifications()).summary();

    let totals = summary.tests;
    let verdict = if suite.aborted {
        SuiteVerdict::Aborted
    } else if suite.force_fail
        || totals.fail > 0
        || (policy.skipped_fails_suite && totals.skip > 0)
    {
        SuiteVerdict::Failed
    } else {
        SuiteVerdict::Passed
    };

    EvaluatedSuite {
        title: suite.title.clone(),
        description: suite.description.clone(),
        run_id: suite.run_id.clone(),
        model: suite.model.clone(),
        verdict,
        complete: !suite.aborted && totals.aborted == 0,
        summary,
        tests,
    }
}
