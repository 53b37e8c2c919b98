//! Verification recorder: normalizes one measured check into an immutable record.

#![allow(missing_docs)]

use std::fmt;

use serde::{Deserialize, Serialize};

/// Binary outcome of a check. Also the verdict vocabulary for requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    #[serde(alias = "Passed", alias = "PASSED")]
    Passed,
    #[serde(alias = "Failed", alias = "FAILED")]
    Failed,
}

impl Outcome {
    #[must_use]
    pub const fn from_verified(verified: bool) -> Self {
        if verified { Self::Passed } else { Self::Failed }
    }

    #[must_use]
    pub const fn is_pass(self) -> bool {
        matches!(self, Self::Passed)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Check descriptor as produced by a test executor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInput {
    pub title: String,
    #[serde(default, deserialize_with = "crate::model::dataset::scalar_text")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement_id: Option<u32>,
    /// Absent outcomes are recorded as failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl CheckInput {
    /// Check against a requirement with an explicit result.
    #[must_use]
    pub fn requirement(id: u32, title: &str, value: impl ToString, verified: bool) -> Self {
        Self {
            title: title.to_string(),
            value: value.to_string(),
            requirement_id: Some(id),
            outcome: Some(Outcome::from_verified(verified)),
            reviewer: None,
            note: None,
        }
    }
}

/// Canonical, immutable pass/fail record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    number: u32,
    title: String,
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    requirement_id: Option<u32>,
    outcome: Outcome,
    /// True when the producer omitted the outcome and the fail-safe applied.
    outcome_defaulted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reviewer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

impl Verification {
    /// 1-based recording order across the whole suite.
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.number
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub const fn requirement_id(&self) -> Option<u32> {
        self.requirement_id
    }

    #[must_use]
    pub const fn outcome(&self) -> Outcome {
        self.outcome
    }

    #[must_use]
    pub const fn passed(&self) -> bool {
        self.outcome.is_pass()
    }

    #[must_use]
    pub const fn outcome_defaulted(&self) -> bool {
        self.outcome_defaulted
    }

    #[must_use]
    pub fn reviewer(&self) -> Option<&str> {
        self.reviewer.as_deref()
    }

    #[must_use]
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }
}

/// Assigns suite-wide sequence numbers and applies the fail-safe default.
#[derive(Debug, Clone, Default)]
pub struct VerificationRecorder {
    recorded: u32,
}

impl VerificationRecorder {
    #[must_use]
    pub const fn new() -> Self {
        Self { recorded: 0 }
    }

    /// Number of verifications recorded so far.
    #[must_use]
    pub const fn recorded(&self) -> u32 {
        self.recorded
    }

    pub fn record(&mut self, check: CheckInput) -> Verification {
        self.recorded = self.recorded.saturating_add(1);
        let (outcome, outcome_defaulted) = match check.outcome {
            Some(outcome) => (outcome, false),
            None => (Outcome::Failed, true),
        };
        Verification {
            number: self.recorded,
            title: check.title,
            value: check.value,
            requirement_id: check.requirement_id,
            outcome,
            outcome_defaulted,
            reviewer: check.reviewer.filter(|s| !s.trim().is_empty()),
            note: check.note.filter(|s| !s.trim().is_empty()),
        }
    }
}
