//! Per-group and system-wide severity folds.
//!
//! Groups fold only their own members; the banner folds every parameter in
//! the run directly, so it never depends on how parameters are grouped.

#![allow(missing_docs)]

use serde::Serialize;

use crate::health::grader::HealthParameter;
use crate::health::severity::{self, Severity};

/// Severity tile for one named group of parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthGroup {
    pub name: String,
    /// Fold of member severities. `Missing` is kept as-is for tiles.
    pub severity: Severity,
    /// Member parameter names in run order.
    pub parameters: Vec<String>,
}

/// Top-level banner for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SystemHealth {
    /// Fold over every parameter in the run.
    pub severity: Severity,
    missing_as_good: bool,
}

impl SystemHealth {
    #[must_use]
    pub const fn new(severity: Severity, missing_as_good: bool) -> Self {
        Self {
            severity,
            missing_as_good,
        }
    }

    /// Severity as presented at the top level.
    ///
    /// An unreadable parameter is not evidence of a problem, so a banner that
    /// only reached `Missing` is shown as `Good`. Group tiles keep `Missing`.
    #[must_use]
    pub const fn display_severity(&self) -> Severity {
        match self.severity {
            Severity::Missing if self.missing_as_good => Severity::Good,
            other => other,
        }
    }
}

/// Result of both health folds for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthRollup {
    /// Groups in order of first appearance.
    pub groups: Vec<HealthGroup>,
    pub banner: SystemHealth,
}

impl HealthRollup {
    /// Look up a group tile by name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&HealthGroup> {
        self.groups.iter().find(|g| g.name == name)
    }
}

/// Compute group tiles and the banner from graded parameters.
#[must_use]
pub fn roll_up(parameters: &[HealthParameter], missing_as_good: bool) -> HealthRollup {
    let mut groups: Vec<HealthGroup> = Vec::new();
    for param in parameters {
        let idx = match groups.iter().position(|g| g.name == param.group) {
            Some(idx) => idx,
            None => {
                groups.push(HealthGroup {
                    name: param.group.clone(),
                    severity: Severity::Good,
                    parameters: Vec::new(),
                });
                groups.len() - 1
            }
        };
        let group = &mut groups[idx];
        group.severity = severity::combine(group.severity, param.severity);
        group.parameters.push(param.name.clone());
    }

    let banner = severity::fold(parameters.iter().map(|p| p.severity));

    HealthRollup {
        groups,
        banner: SystemHealth::new(banner, missing_as_good),
    }
}
