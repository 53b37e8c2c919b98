//! Requirement aggregator: cross-cuts verifications by requirement id.
//!
//! The index spans test boundaries. A requirement verified by several test
//! cases gets one verdict over every recorded check against it, not the
//! verdict of whichever test ran last.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use serde::Serialize;

use crate::results::rollup::Tally;
use crate::results::verification::{Outcome, Verification};

/// Per-requirement counts and verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    number: u32,
    title: String,
    pass: u32,
    fail: u32,
    result: Outcome,
}

impl Requirement {
    fn from_counts(number: u32, title: String, pass: u32, fail: u32) -> Self {
        Self {
            number,
            title,
            pass,
            fail,
            result: if fail == 0 {
                Outcome::Passed
            } else {
                Outcome::Failed
            },
        }
    }

    /// Zero-count entry for a requirement nothing verified.
    #[must_use]
    pub fn without_evidence(number: u32) -> Self {
        Self::from_counts(number, String::new(), 0, 0)
    }

    #[must_use]
    pub const fn number(&self) -> u32 {
        self.number
    }

    /// Title of the first verification recorded against this requirement.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub const fn pass(&self) -> u32 {
        self.pass
    }

    #[must_use]
    pub const fn fail(&self) -> u32 {
        self.fail
    }

    #[must_use]
    pub const fn total(&self) -> u32 {
        self.pass + self.fail
    }

    /// `Passed` iff no verification against it failed.
    #[must_use]
    pub const fn result(&self) -> Outcome {
        self.result
    }

    /// Whether any verification referenced this requirement.
    #[must_use]
    pub const fn has_evidence(&self) -> bool {
        self.total() > 0
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    title: Option<String>,
    pass: u32,
    fail: u32,
}

/// Requirement index ordered by requirement number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RequirementIndex {
    entries: BTreeMap<u32, Requirement>,
}

impl RequirementIndex {
    /// Build the index from every verification of a suite (or test case).
    /// Verifications without a requirement reference are skipped.
    pub fn build<'a, I>(verifications: I) -> Self
    where
        I: IntoIterator<Item = &'a Verification>,
    {
        let mut acc: BTreeMap<u32, Accumulator> = BTreeMap::new();
        for v in verifications {
            let Some(id) = v.requirement_id() else {
                continue;
            };
            let slot = acc.entry(id).or_default();
            if slot.title.is_none() {
                slot.title = Some(v.title().to_string());
            }
            match v.outcome() {
                Outcome::Passed => slot.pass += 1,
                Outcome::Failed => slot.fail += 1,
            }
        }

        let entries = acc
            .into_iter()
            .map(|(id, a)| {
                (
                    id,
                    Requirement::from_counts(id, a.title.unwrap_or_default(), a.pass, a.fail),
                )
            })
            .collect();
        Self { entries }
    }

    /// Requirement by id. Unknown ids yield a zero-count entry, not an error.
    #[must_use]
    pub fn get(&self, id: u32) -> Requirement {
        self.entries
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Requirement::without_evidence(id))
    }

    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.entries.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Requirement-level totals: how many requirements passed and failed.
    #[must_use]
    pub fn summary(&self) -> Tally {
        let mut tally = Tally::default();
        for r in self.entries.values() {
            tally.add(r.result());
        }
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::verification::{CheckInput, VerificationRecorder};

    fn verifications(checks: Vec<CheckInput>) -> Vec<Verification> {
        let mut rec = VerificationRecorder::new();
        checks.into_iter().map(|c| rec.record(c)).collect()
    }

    #[test]
    fn mixed_outcomes_fail_the_requirement() {
        let vs = verifications(vec![
            CheckInput::requirement(1, "R1", "a", true),
            CheckInput::requirement(1, "R1", "b", true),
            CheckInput::requirement(1, "R1", "c", false),
        ]);
        let index = RequirementIndex::build(&vs);
        let r1 = index.get(1);
        assert_eq!(r1.pass(), 2);
        assert_eq!(r1.fail(), 1);
        assert_eq!(r1.result(), Outcome::Failed);
    }

    #[test]
    fn unreferenced_verifications_are_excluded() {
        let vs = verifications(vec![
            CheckInput {
                title: "free-form".to_string(),
                outcome: Some(Outcome::Failed),
                ..CheckInput::default()
            },
            CheckInput::requirement(7, "R7", 1, true),
        ]);
        let index = RequirementIndex::build(&vs);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(7).result(), Outcome::Passed);
    }

    #[test]
    fn unknown_requirement_is_zero_count() {
        let index = RequirementIndex::build(&[]);
        let r = index.get(99);
        assert_eq!(r.number(), 99);
        assert_eq!(r.total(), 0);
        assert!(!r.has_evidence());
        assert_eq!(r.result(), Outcome::Passed);
        assert!(!index.contains(99));
    }

    #[test]
    fn title_comes_from_first_verification() {
        let vs = verifications(vec![
            CheckInput::requirement(3, "first title", 0, true),
            CheckInput::requirement(3, "second title", 0, true),
        ]);
        assert_eq!(RequirementIndex::build(&vs).get(3).title(), "first title");
    }

    #[test]
    fn summary_counts_requirements_not_checks() {
        let vs = verifications(vec![
            CheckInput::requirement(1, "a", 0, true),
            CheckInput::requirement(1, "a", 0, true),
            CheckInput::requirement(2, "b", 0, false),
            CheckInput::requirement(3, "c", 0, true),
        ]);
        let summary = RequirementIndex::build(&vs).summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.pass, 2);
        assert_eq!(summary.fail, 1);
    }

    #[test]
    fn iteration_is_ordered_by_number() {
        let vs = verifications(vec![
            CheckInput::requirement(9, "z", 0, true),
            CheckInput::requirement(2, "y", 0, true),
            CheckInput::requirement(5, "x", 0, true),
        ]);
        let ids: Vec<u32> = RequirementIndex::build(&vs).iter().map(Requirement::number).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }
}
