//! Presentation state and its pure update function.
//!
//! [`ViewState`] is a plain value: which list is shown, what is selected,
//! how each list is sorted, and the current search text. [`update`] maps a
//! state and a [`ViewAction`] to the next state without touching the
//! results it is applied to. [`project`] renders the visible rows of a
//! [`ResultsModel`] for a given state.

#![allow(missing_docs)]

use crate::core::config::QueryConfig;
use crate::model::results::{ParameterRow, ResultsModel, VerificationRow};
use crate::results::requirements::Requirement;
use crate::results::rollup::EvaluatedTest;
use crate::view::query::{
    self, Column, ParameterColumn, RequirementColumn, SortDirection, TestColumn,
    VerificationColumn,
};

// ──────────────────── sections ────────────────────

/// Which result list is in front.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Section {
    #[default]
    Tests,
    Requirements,
    Verifications,
    Health,
}

impl Section {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Tests => "tests",
            Self::Requirements => "requirements",
            Self::Verifications => "verifications",
            Self::Health => "health",
        }
    }
}

/// Sort column plus direction for one list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState<C> {
    pub column: C,
    pub direction: SortDirection,
}

impl<C: Column> SortState<C> {
    /// Same column flips direction; a new column starts ascending.
    #[must_use]
    pub fn request(self, column: C) -> Self {
        if column == self.column {
            Self {
                column,
                direction: self.direction.toggle(),
            }
        } else {
            Self {
                column,
                direction: SortDirection::Ascending,
            }
        }
    }
}

impl<C: Column> Default for SortState<C> {
    fn default() -> Self {
        Self {
            column: C::DEFAULT,
            direction: SortDirection::Ascending,
        }
    }
}

/// Column request routed to the list it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Test(TestColumn),
    Requirement(RequirementColumn),
    Verification(VerificationColumn),
    Parameter(ParameterColumn),
}

// ──────────────────── state ────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub section: Section,
    pub selected_test: Option<u32>,
    pub selected_requirement: Option<u32>,
    pub filter: String,
    pub tests_sort: SortState<TestColumn>,
    pub requirements_sort: SortState<RequirementColumn>,
    pub verifications_sort: SortState<VerificationColumn>,
    pub health_sort: SortState<ParameterColumn>,
}

impl ViewState {
    /// Initial state with every list sorted per the configured default.
    ///
    /// Lists that have no column of that name fall back to their own default.
    #[must_use]
    pub fn from_config(config: &QueryConfig) -> Self {
        let direction = SortDirection::from_descending(config.default_descending);
        let name = config.default_sort_column.as_str();
        Self {
            tests_sort: SortState {
                column: query::column_or_default(name),
                direction,
            },
            requirements_sort: SortState {
                column: query::column_or_default(name),
                direction,
            },
            verifications_sort: SortState {
                column: query::column_or_default(name),
                direction,
            },
            health_sort: SortState {
                column: query::column_or_default(name),
                direction,
            },
            ..Self::default()
        }
    }
}

/// Everything that can change the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAction {
    SectionSelected(Section),
    SortRequested(SortColumn),
    FilterChanged(String),
    /// Selecting a test narrows the verification list to that test.
    TestSelected(u32),
    /// Selecting a requirement narrows the verification list to its evidence.
    RequirementSelected(u32),
    ClearSelection,
}

/// Apply an action to a state and return the next state.
#[must_use]
pub fn update(state: &ViewState, action: ViewAction) -> ViewState {
    let mut next = state.clone();
    match action {
        ViewAction::SectionSelected(section) => {
            next.section = section;
        }
        ViewAction::SortRequested(column) => match column {
            SortColumn::Test(c) => next.tests_sort = state.tests_sort.request(c),
            SortColumn::Requirement(c) => {
                next.requirements_sort = state.requirements_sort.request(c);
            }
            SortColumn::Verification(c) => {
                next.verifications_sort = state.verifications_sort.request(c);
            }
            SortColumn::Parameter(c) => next.health_sort = state.health_sort.request(c),
        },
        ViewAction::FilterChanged(text) => {
            next.filter = text;
        }
        ViewAction::TestSelected(number) => {
            next.selected_test = Some(number);
            next.selected_requirement = None;
        }
        ViewAction::RequirementSelected(id) => {
            next.selected_requirement = Some(id);
            next.selected_test = None;
        }
        ViewAction::ClearSelection => {
            next.selected_test = None;
            next.selected_requirement = None;
        }
    }
    next
}

// ──────────────────── projection ────────────────────

/// Visible rows of the section in front, sorted and filtered.
#[derive(Debug, Clone, PartialEq)]
pub enum VisibleRows<'a> {
    Tests(Vec<&'a EvaluatedTest>),
    Requirements(Vec<&'a Requirement>),
    Verifications(Vec<&'a VerificationRow>),
    Health(Vec<&'a ParameterRow>),
}

impl VisibleRows<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Tests(rows) => rows.len(),
            Self::Requirements(rows) => rows.len(),
            Self::Verifications(rows) => rows.len(),
            Self::Health(rows) => rows.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Row storage for sections whose rows are derived rather than stored in
/// the model. Build once per model and project repeatedly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowCache {
    pub requirements: Vec<Requirement>,
    pub verifications: Vec<VerificationRow>,
    pub parameters: Vec<ParameterRow>,
}

impl RowCache {
    #[must_use]
    pub fn new(model: &ResultsModel) -> Self {
        Self {
            requirements: model.requirement_rows(),
            verifications: model.verification_rows(None),
            parameters: model.parameter_rows(),
        }
    }
}

/// Visible rows for `state`. Verification rows honor the selected test or
/// requirement; the other sections ignore selection.
#[must_use]
pub fn project<'a>(
    state: &ViewState,
    model: &'a ResultsModel,
    cache: &'a RowCache,
) -> VisibleRows<'a> {
    let text = state.filter.as_str();
    match state.section {
        Section::Tests => {
            let s = state.tests_sort;
            VisibleRows::Tests(query::query(&model.suite().tests, text, s.column, s.direction))
        }
        Section::Requirements => {
            let s = state.requirements_sort;
            VisibleRows::Requirements(query::query(
                &cache.requirements,
                text,
                s.column,
                s.direction,
            ))
        }
        Section::Verifications => {
            let s = state.verifications_sort;
            let mut rows: Vec<&VerificationRow> = query::filter(&cache.verifications, text)
                .into_iter()
                .filter(|row| {
                    state.selected_test.is_none_or(|n| row.test_number == n)
                        && state
                            .selected_requirement
                            .is_none_or(|id| row.verification.requirement_id() == Some(id))
                })
                .collect();
            query::sort(&mut rows, s.column, s.direction);
            VisibleRows::Verifications(rows)
        }
        Section::Health => {
            let s = state.health_sort;
            VisibleRows::Health(query::query(&cache.parameters, text, s.column, s.direction))
        }
    }
}
