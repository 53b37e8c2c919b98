//! Closed severity vocabulary and the monotonic escalation fold.
//!
//! Every health parameter lands in exactly one of four severities. Severities
//! are merged with [`combine`], which never de-escalates: once `Critical` or
//! `Suspect` is reached nothing in the same fold can lower it. Because the
//! rule is equivalent to taking the maximum under the escalation order
//! `Good < Missing < Suspect < Critical`, folding is independent of the order
//! in which proposals arrive.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::{DvError, Result};

/// Health classification of one parameter, group or run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Severity {
    /// Parameter is within expected limits.
    #[default]
    Good,
    /// Parameter could not be read or classified.
    Missing,
    /// Parameter is outside its nominal range but not failing.
    Suspect,
    /// Parameter indicates a failing or failed device.
    Critical,
}

impl Severity {
    /// Every member of the vocabulary, lowest escalation first.
    pub const ALL: [Self; 4] = [Self::Good, Self::Missing, Self::Suspect, Self::Critical];

    /// Canonical lowercase label used on the wire and in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Missing => "missing",
            Self::Suspect => "suspect",
            Self::Critical => "critical",
        }
    }

    /// Position in the escalation order.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Good => 0,
            Self::Missing => 1,
            Self::Suspect => 2,
            Self::Critical => 3,
        }
    }

    /// Parse a producer-supplied label. Case-insensitive, surrounding
    /// whitespace ignored; anything outside the vocabulary is rejected.
    pub fn parse(label: &str) -> Result<Self> {
        let trimmed = label.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| DvError::UnknownSeverity {
                label: label.to_string(),
            })
    }

    /// Escalate `self` with a proposed severity. See [`combine`].
    #[must_use]
    pub const fn escalate(self, proposed: Self) -> Self {
        combine(self, proposed)
    }

    /// Whether the severity calls for operator attention.
    #[must_use]
    pub const fn is_concern(self) -> bool {
        matches!(self, Self::Suspect | Self::Critical)
    }
}

/// Merge a proposed severity into the current one.
///
/// - `Critical` always wins.
/// - `Suspect` wins unless the current state is already `Critical`.
/// - `Missing` wins only over `Good`.
/// - `Good` never changes the current state.
#[must_use]
pub const fn combine(current: Severity, proposed: Severity) -> Severity {
    match proposed {
        Severity::Critical => Severity::Critical,
        Severity::Suspect => match current {
            Severity::Critical => Severity::Critical,
            _ => Severity::Suspect,
        },
        Severity::Missing => match current {
            Severity::Critical | Severity::Suspect => current,
            _ => Severity::Missing,
        },
        Severity::Good => current,
    }
}

/// Fold [`combine`] over a sequence of severities, seeded at `Good`.
pub fn fold<I>(severities: I) -> Severity
where
    I: IntoIterator<Item = Severity>,
{
    severities.into_iter().fold(Severity::Good, combine)
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Severity {
    type Err = DvError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Severity {
    type Error = DvError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Severity> for String {
    fn from(value: Severity) -> Self {
        value.label().to_string()
    }
}
