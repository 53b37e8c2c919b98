//! Parameter grading: turns raw device readings into [`Severity`] values.
//!
//! A reading either carries an explicit severity label from its producer, or
//! a raw value that is classified by the configured rule for that parameter
//! name. Explicit labels always win. A reading with no label and no rule, or
//! with a value the rule cannot interpret, grades `Missing`.

#![allow(missing_docs)]

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::config::HealthConfig;
use crate::core::errors::{DvError, Result};
use crate::health::severity::Severity;

/// Raw values that mean "the producer could not read this parameter".
const UNREADABLE_VALUES: [&str; 4] = ["", "not reported", "n/a", "unknown"];

/// Classification rule for one named parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GradeRule {
    /// Integer event counter: zero is good, anything else is critical.
    ZeroCount,
    /// Numeric reading: below `suspect_at` is good, below `critical_at` is
    /// suspect, otherwise critical.
    Thresholds { suspect_at: f64, critical_at: f64 },
    /// Reading must equal an expected value (e.g. negotiated vs rated link
    /// speed); a mismatch is suspect.
    Matches { expected: String },
    /// Status flag: the `good` token is good, anything else is critical.
    Flag { good: String },
}

impl GradeRule {
    /// Classify a raw value.
    #[must_use]
    pub fn classify(&self, raw: &str) -> Severity {
        if is_unreadable(raw) {
            return Severity::Missing;
        }
        match self {
            Self::ZeroCount => match leading_number(raw) {
                Some(n) if n == 0.0 => Severity::Good,
                Some(_) => Severity::Critical,
                None => Severity::Missing,
            },
            Self::Thresholds {
                suspect_at,
                critical_at,
            } => match leading_number(raw) {
                Some(n) if n < *suspect_at => Severity::Good,
                Some(n) if n < *critical_at => Severity::Suspect,
                Some(_) => Severity::Critical,
                None => Severity::Missing,
            },
            Self::Matches { expected } => {
                if same_token(raw, expected) {
                    Severity::Good
                } else {
                    Severity::Suspect
                }
            }
            Self::Flag { good } => {
                if same_token(raw, good) {
                    Severity::Good
                } else {
                    Severity::Critical
                }
            }
        }
    }

    /// Reject rules whose parameters cannot produce a meaningful grade.
    pub fn validate(&self, name: &str) -> Result<()> {
        match self {
            Self::Thresholds {
                suspect_at,
                critical_at,
            } => {
                if !suspect_at.is_finite() || !critical_at.is_finite() {
                    return Err(DvError::InvalidConfig {
                        details: format!("health rule {name:?}: thresholds must be finite"),
                    });
                }
                if suspect_at > critical_at {
                    return Err(DvError::InvalidConfig {
                        details: format!(
                            "health rule {name:?}: suspect_at ({suspect_at}) must be <= critical_at ({critical_at})"
                        ),
                    });
                }
            }
            Self::Flag { good } if good.trim().is_empty() => {
                return Err(DvError::InvalidConfig {
                    details: format!("health rule {name:?}: flag good token must not be empty"),
                });
            }
            _ => {}
        }
        Ok(())
    }
}

/// Named rule entry as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRule {
    pub name: String,
    pub rule: GradeRule,
}

/// One parameter reading as delivered by the acquisition side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReading {
    pub name: String,
    #[serde(default, deserialize_with = "crate::model::dataset::scalar_text")]
    pub value: String,
    pub group: String,
    /// Producer-assigned severity label; graded by rule when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

impl HealthReading {
    #[must_use]
    pub fn labeled(name: &str, group: &str, severity: Severity) -> Self {
        Self {
            name: name.to_string(),
            value: String::new(),
            group: group.to_string(),
            severity: Some(severity.label().to_string()),
        }
    }

    #[must_use]
    pub fn raw(name: &str, group: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            group: group.to_string(),
            severity: None,
        }
    }
}

/// How a parameter's severity was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeSource {
    /// Producer supplied the label.
    Label,
    /// A configured rule classified the raw value.
    Rule,
    /// No label and no rule; defaulted to `Missing`.
    Unclassified,
}

/// Graded leaf fact of the health pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthParameter {
    pub name: String,
    pub value: String,
    pub group: String,
    pub severity: Severity,
    pub source: GradeSource,
}

/// Rule-driven grader built from [`HealthConfig`].
#[derive(Debug, Clone, Default)]
pub struct HealthGrader {
    rules: HashMap<String, GradeRule>,
}

impl HealthGrader {
    #[must_use]
    pub fn from_config(config: &HealthConfig) -> Self {
        Self::with_rules(config.rules.iter().cloned())
    }

    #[must_use]
    pub fn with_rules<I>(rules: I) -> Self
    where
        I: IntoIterator<Item = ParameterRule>,
    {
        Self {
            rules: rules.into_iter().map(|r| (r.name, r.rule)).collect(),
        }
    }

    /// Rule registered for a parameter name, if any.
    #[must_use]
    pub fn rule_for(&self, name: &str) -> Option<&GradeRule> {
        self.rules.get(name)
    }

    /// Grade one reading. Fails only on an unrecognized severity label.
    pub fn grade(&self, reading: &HealthReading) -> Result<HealthParameter> {
        if reading.name.trim().is_empty() {
            return Err(DvError::MalformedRecord {
                context: "health parameter",
                details: "parameter name is empty".to_string(),
            });
        }

        let (severity, source) = match reading.severity.as_deref() {
            Some(label) => (Severity::parse(label)?, GradeSource::Label),
            None => match self.rules.get(&reading.name) {
                Some(rule) => (rule.classify(&reading.value), GradeSource::Rule),
                None => (Severity::Missing, GradeSource::Unclassified),
            },
        };

        Ok(HealthParameter {
            name: reading.name.clone(),
            value: reading.value.clone(),
            group: reading.group.clone(),
            severity,
            source,
        })
    }

    /// Grade a batch, failing fast on the first contract violation.
    pub fn grade_all<'a, I>(&self, readings: I) -> Result<Vec<HealthParameter>>
    where
        I: IntoIterator<Item = &'a HealthReading>,
    {
        readings.into_iter().map(|r| self.grade(r)).collect()
    }
}

fn is_unreadable(raw: &str) -> bool {
    let trimmed = raw.trim();
    UNREADABLE_VALUES
        .iter()
        .any(|token| token.eq_ignore_ascii_case(trimmed))
}

fn same_token(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Parse the leading numeric token of a reading such as `"1,234 GB"` or `"7%"`.
pub(crate) fn leading_number(raw: &str) -> Option<f64> {
    let token = raw.split_whitespace().next()?;
    let cleaned: String = token.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim_end_matches('%');
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}
