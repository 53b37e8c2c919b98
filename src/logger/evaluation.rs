//! Maps an evaluated run onto JSONL event lines.

#![allow(missing_docs)]

use crate::health::severity::Severity;
use crate::logger::jsonl::{EventType, JsonlWriter, LogEntry, LogLevel};
use crate::model::results::ResultsModel;
use crate::results::rollup::{SuiteVerdict, TestResult};

/// Event lines for one evaluation, in a fixed order: failed verifications,
/// aborted tests, escalated health groups, then the run summary.
#[must_use]
pub fn entries(model: &ResultsModel) -> Vec<LogEntry> {
    let suite = model.suite();
    let run_id = (!suite.run_id.is_empty()).then(|| suite.run_id.clone());
    let mut out = Vec::new();

    for row in model.verification_rows(None) {
        let v = &row.verification;
        if v.passed() {
            continue;
        }
        out.push(LogEntry {
            run_id: run_id.clone(),
            test_number: Some(row.test_number),
            step_number: Some(row.step_number),
            verification_number: Some(v.number()),
            requirement_id: v.requirement_id(),
            title: Some(v.title().to_string()),
            value: Some(v.value().to_string()),
            result: Some(v.outcome().label().to_string()),
            details: v
                .outcome_defaulted()
                .then(|| "outcome not reported; recorded as failed".to_string()),
            ..LogEntry::new(EventType::VerificationFailed, LogLevel::Warning)
        });
    }

    for test in &suite.tests {
        if test.result == TestResult::Aborted {
            out.push(LogEntry {
                run_id: run_id.clone(),
                test_number: Some(test.number),
                title: Some(test.title.clone()),
                result: Some(test.result.label().to_string()),
                ..LogEntry::new(EventType::TestAborted, LogLevel::Warning)
            });
        }
    }

    for group in model.groups() {
        if group.severity == Severity::Good {
            continue;
        }
        let level = if group.severity == Severity::Critical {
            LogLevel::Critical
        } else {
            LogLevel::Warning
        };
        out.push(LogEntry {
            run_id: run_id.clone(),
            group: Some(group.name.clone()),
            severity: Some(group.severity.label().to_string()),
            ..LogEntry::new(EventType::HealthEscalated, level)
        });
    }

    let totals = suite.summary.tests;
    let level = match suite.verdict {
        SuiteVerdict::Passed => LogLevel::Info,
        SuiteVerdict::Failed => LogLevel::Warning,
        SuiteVerdict::Aborted => LogLevel::Critical,
    };
    out.push(LogEntry {
        run_id,
        title: (!suite.title.is_empty()).then(|| suite.title.clone()),
        result: Some(suite.verdict.label().to_string()),
        severity: Some(model.banner().display_severity().label().to_string()),
        tests: Some([totals.total, totals.pass, totals.fail, totals.skip]),
        details: (!suite.complete).then(|| "run incomplete".to_string()),
        ..LogEntry::new(EventType::RunEvaluated, level)
    });

    out
}

/// Write every event line for `model` and flush.
pub fn write(writer: &mut JsonlWriter, model: &ResultsModel) {
    writer.write_all(&entries(model));
}
