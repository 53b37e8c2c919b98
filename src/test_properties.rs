//! Property-based tests for the aggregation invariants.
//!
//! Arbitrary runs and severity sequences are generated with `proptest` and
//! checked against the fold laws: order independence of severity escalation,
//! conservation of suite totals, requirement counts agreeing with their
//! verdicts, and sorting that is stable and reversible.

use proptest::prelude::*;

use crate::health::severity::{self, Severity, combine};
use crate::results::requirements::RequirementIndex;
use crate::results::rollup::{
    RollupPolicy, StepRecord, StepResult, SuiteRecord, SuiteVerdict, TestRecord, TestResult,
    evaluate_suite, step_result,
};
use crate::results::verification::{CheckInput, Outcome, VerificationRecorder};
use crate::view::query::{self, Queryable, SortDirection, TestColumn};
use crate::view::state::{SortColumn, ViewAction, ViewState, update};

// ──────────────────── strategies ────────────────────

fn arb_severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Good),
        Just(Severity::Missing),
        Just(Severity::Suspect),
        Just(Severity::Critical),
    ]
}

/// (requirement id, verified) pairs for one step.
fn arb_checks() -> impl Strategy<Value = Vec<(Option<u32>, bool)>> {
    prop::collection::vec((prop::option::of(1u32..6), any::<bool>()), 0..5)
}

#[derive(Debug, Clone)]
struct StepShape {
    checks: Vec<(Option<u32>, bool)>,
    aborted: bool,
    force_fail: bool,
}

#[derive(Debug, Clone)]
struct TestShape {
    steps: Vec<StepShape>,
    executed: bool,
    force_fail: bool,
}

fn arb_step() -> impl Strategy<Value = StepShape> {
    (arb_checks(), prop::bool::weighted(0.15), prop::bool::weighted(0.1)).prop_map(
        |(checks, aborted, force_fail)| StepShape {
            checks,
            aborted,
            force_fail,
        },
    )
}

fn arb_test() -> impl Strategy<Value = TestShape> {
    (
        prop::collection::vec(arb_step(), 0..4),
        prop::bool::weighted(0.85),
        prop::bool::weighted(0.1),
    )
        .prop_map(|(steps, executed, force_fail)| TestShape {
            steps,
            executed,
            force_fail,
        })
}

fn build_suite(shapes: &[TestShape], aborted: bool, force_fail: bool) -> SuiteRecord {
    let mut recorder = VerificationRecorder::new();
    let tests = shapes
        .iter()
        .zip(1u32..)
        .map(|(shape, number)| TestRecord {
            number,
            title: format!("test {number}"),
            executed: shape.executed,
            force_fail: shape.force_fail,
            steps: if shape.executed {
                shape
                    .steps
                    .iter()
                    .map(|s| StepRecord {
                        title: "step".to_string(),
                        verifications: s
                            .checks
                            .iter()
                            .map(|(req, ok)| {
                                recorder.record(CheckInput {
                                    title: "check".to_string(),
                                    requirement_id: *req,
                                    outcome: Some(Outcome::from_verified(*ok)),
                                    ..CheckInput::default()
                                })
                            })
                            .collect(),
                        aborted: s.aborted,
                        force_fail: s.force_fail,
                        ..StepRecord::default()
                    })
                    .collect()
            } else {
                Vec::new()
            },
            ..TestRecord::default()
        })
        .collect();
    SuiteRecord {
        tests,
        aborted,
        force_fail,
        ..SuiteRecord::default()
    }
}

// ──────────────────── properties ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Folding severities gives the same result for any permutation.
    #[test]
    fn severity_fold_is_order_independent(
        mut severities in prop::collection::vec(arb_severity(), 0..20),
        seed in any::<u64>(),
    ) {
        let forward = severity::fold(severities.iter().copied());
        let reversed = severity::fold(severities.iter().rev().copied());
        prop_assert_eq!(forward, reversed);

        let len = severities.len();
        if len > 1 {
            let pivot = usize::try_from(seed % (len as u64)).unwrap_or(0);
            severities.rotate_left(pivot);
        }
        prop_assert_eq!(forward, severity::fold(severities));
    }

    /// `combine` never lowers the current state, is idempotent, and
    /// `Critical` absorbs everything.
    #[test]
    fn combine_is_monotonic(current in arb_severity(), proposed in arb_severity()) {
        let merged = combine(current, proposed);
        prop_assert!(merged.rank() >= current.rank());
        prop_assert!(merged.rank() >= proposed.rank());
        prop_assert_eq!(merged, combine(proposed, current));
        prop_assert_eq!(combine(merged, proposed), merged);
        prop_assert_eq!(combine(Severity::Critical, proposed), Severity::Critical);
        prop_assert_eq!(combine(current, Severity::Good), current);
    }

    /// Totals are conserved and the verdict agrees with them.
    #[test]
    fn suite_totals_are_conserved(
        shapes in prop::collection::vec(arb_test(), 0..8),
        aborted in prop::bool::weighted(0.1),
        suite_force_fail in prop::bool::weighted(0.1),
        skipped_fails_suite in any::<bool>(),
    ) {
        let suite = build_suite(&shapes, aborted, suite_force_fail);
        let policy = RollupPolicy { skipped_fails_suite };
        let evaluated = evaluate_suite(&suite, &policy);
        let t = evaluated.summary.tests;

        prop_assert_eq!(t.total as usize, shapes.len());
        prop_assert_eq!(t.total, t.pass + t.fail + t.skip);
        prop_assert!(t.aborted <= t.fail);

        let v = evaluated.summary.verifications;
        prop_assert_eq!(v.total, v.pass + v.fail);

        if aborted {
            prop_assert_eq!(evaluated.verdict, SuiteVerdict::Aborted);
        } else if suite_force_fail || t.fail > 0 {
            prop_assert_eq!(evaluated.verdict, SuiteVerdict::Failed);
        } else if t.skip > 0 {
            let expected = if skipped_fails_suite {
                SuiteVerdict::Failed
            } else {
                SuiteVerdict::Passed
            };
            prop_assert_eq!(evaluated.verdict, expected);
        } else {
            prop_assert_eq!(evaluated.verdict, SuiteVerdict::Passed);
        }
        prop_assert_eq!(evaluated.complete, !aborted && t.aborted == 0);
    }

    /// Step and test results follow from their children and flags.
    #[test]
    fn results_follow_children(shapes in prop::collection::vec(arb_test(), 1..6)) {
        let suite = build_suite(&shapes, false, false);
        let evaluated = evaluate_suite(&suite, &RollupPolicy::default());
        for (record, test) in suite.tests.iter().zip(&evaluated.tests) {
            for (raw, step) in record.steps.iter().zip(&test.steps) {
                let any_failed = raw.verifications.iter().any(|v| !v.passed());
                prop_assert_eq!(step.result, step_result(raw));
                if raw.force_fail || any_failed {
                    prop_assert_eq!(step.result, StepResult::Failed);
                } else if !raw.aborted {
                    prop_assert_eq!(step.result, StepResult::Passed);
                }
                prop_assert_eq!(step.tally.total, step.tally.pass + step.tally.fail);
            }
            let any_step_aborted = test.steps.iter().any(|s| s.result == StepResult::Aborted);
            if any_step_aborted {
                prop_assert_eq!(test.result, TestResult::Aborted);
            } else if test.result == TestResult::Passed {
                prop_assert!(test.steps.iter().all(|s| s.result == StepResult::Passed));
                prop_assert!(record.executed && !record.force_fail);
            }
        }
    }

    /// A requirement passes exactly when none of its verifications failed.
    #[test]
    fn requirement_verdict_matches_counts(shapes in prop::collection::vec(arb_test(), 0..6)) {
        let suite = build_suite(&shapes, false, false);
        let index = RequirementIndex::build(suite.verifications());
        let mut counted = 0u32;
        for requirement in index.iter() {
            prop_assert_eq!(requirement.total(), requirement.pass() + requirement.fail());
            prop_assert_eq!(requirement.result().is_pass(), requirement.fail() == 0);
            prop_assert!(requirement.has_evidence());
            counted += requirement.total();
        }
        let linked = suite
            .verifications()
            .filter(|v| v.requirement_id().is_some())
            .count();
        prop_assert_eq!(counted as usize, linked);
    }

    /// Sorting keeps every row, ties resolve by number, and toggling the
    /// same column twice restores the original order.
    #[test]
    fn sort_is_stable_and_toggle_restores(
        shapes in prop::collection::vec(arb_test(), 0..10),
        column in prop_oneof![
            Just(TestColumn::Number),
            Just(TestColumn::Title),
            Just(TestColumn::Result),
            Just(TestColumn::Failures),
        ],
    ) {
        let suite = build_suite(&shapes, false, false);
        let evaluated = evaluate_suite(&suite, &RollupPolicy::default());
        let rows = &evaluated.tests;

        let first = query::query(rows, "", column, SortDirection::Ascending);
        prop_assert_eq!(first.len(), rows.len());
        prop_assert_eq!(&first, &query::query(rows, "", column, SortDirection::Ascending));

        let state = update(
            &ViewState::default(),
            ViewAction::SortRequested(SortColumn::Test(column)),
        );
        let state = if state.tests_sort.direction == SortDirection::Descending {
            update(&state, ViewAction::SortRequested(SortColumn::Test(column)))
        } else {
            state
        };
        let toggled = update(&state, ViewAction::SortRequested(SortColumn::Test(column)));
        let restored = update(&toggled, ViewAction::SortRequested(SortColumn::Test(column)));
        prop_assert_eq!(restored.tests_sort, state.tests_sort);
        let again = query::query(rows, "", restored.tests_sort.column, restored.tests_sort.direction);
        prop_assert_eq!(&first, &again);

        let descending = query::query(rows, "", column, SortDirection::Descending);
        prop_assert_eq!(descending.len(), rows.len());
        for (sorted, direction) in [
            (&first, SortDirection::Ascending),
            (&descending, SortDirection::Descending),
        ] {
            for pair in sorted.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                let (ka, kb) = (a.sort_key(column), b.sort_key(column));
                if ka == kb {
                    prop_assert!(a.row_id() < b.row_id(), "equal keys out of id order");
                } else if direction == SortDirection::Ascending {
                    prop_assert!(ka < kb);
                } else {
                    prop_assert!(ka > kb);
                }
            }
        }
    }
}
