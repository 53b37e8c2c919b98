//! Column-keyed sorting and free-text filtering over result rows.
//!
//! Both operations return a new ordering of borrowed rows and leave the rows
//! themselves untouched. Sorting is stable and breaks ties on each row's
//! numeric id, always ascending, so a descending sort is not simply the
//! reverse of an ascending one for rows that share a key.

#![allow(missing_docs)]

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::{DvError, Result};
use crate::health::grader::leading_number;
use crate::model::results::{ParameterRow, VerificationRow};
use crate::results::requirements::Requirement;
use crate::results::rollup::EvaluatedTest;

// ──────────────────── direction ────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    #[must_use]
    pub const fn from_descending(descending: bool) -> Self {
        if descending {
            Self::Descending
        } else {
            Self::Ascending
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

// ──────────────────── keys ────────────────────

/// Comparable value of one cell. Numbers order before text; integers and
/// decimals compare by value.
#[derive(Debug, Clone)]
pub enum SortKey {
    Int(i64),
    Num(f64),
    Text(String),
}

impl SortKey {
    /// Case-folded text key.
    #[must_use]
    pub fn text(value: &str) -> Self {
        Self::Text(value.to_lowercase())
    }

    /// Leading number of a reading (`"9.5"`, `"45 C"`, `"1,234 GB"`, `"7%"`),
    /// text when none parses.
    #[must_use]
    pub fn numeric_or_text(value: &str) -> Self {
        leading_number(value).map_or_else(|| Self::text(value), Self::Num)
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Num(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Text(_), _) => Ordering::Greater,
            (_, Self::Text(_)) => Ordering::Less,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => Ordering::Equal,
            },
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

// ──────────────────── row contract ────────────────────

/// A column identifier with a stable name.
pub trait Column: Copy + Eq + fmt::Debug + 'static {
    const ALL: &'static [Self];
    const DEFAULT: Self;

    fn name(self) -> &'static str;

    /// Column by case-insensitive name.
    #[must_use]
    fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
    }
}

/// A row that can be sorted by column and matched by search text.
pub trait Queryable {
    type Column: Column;

    fn sort_key(&self, column: Self::Column) -> SortKey;

    /// Secondary numeric id used to break ties.
    fn row_id(&self) -> u64;

    /// Name, description and value text searched by [`filter`].
    fn search_fields(&self) -> Vec<&str>;

    fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        needle.is_empty()
            || self
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
    }
}

// ──────────────────── columns ────────────────────

macro_rules! columns {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? } default $default:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl Column for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];
            const DEFAULT: Self = Self::$default;

            fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = DvError;

            fn from_str(s: &str) -> Result<Self> {
                <Self as Column>::from_name(s).ok_or_else(|| DvError::InvalidConfig {
                    details: format!(
                        "unknown {} column {s:?}; expected one of: {}",
                        stringify!($name),
                        Self::ALL.iter().map(|c| c.name()).collect::<Vec<_>>().join(", ")
                    ),
                })
            }
        }
    };
}

columns!(
    /// Columns of the test-case list.
    TestColumn {
        Number => "number",
        Title => "title",
        Result => "result",
        Failures => "failures",
    } default Number
);

columns!(
    /// Columns of the requirement list.
    RequirementColumn {
        Number => "number",
        Title => "title",
        Pass => "pass",
        Fail => "fail",
        Result => "result",
    } default Number
);

columns!(
    /// Columns of the verification list.
    VerificationColumn {
        Number => "number",
        Title => "title",
        Value => "value",
        Requirement => "requirement",
        Result => "result",
    } default Number
);

columns!(
    /// Columns of the health-parameter list.
    ParameterColumn {
        Name => "name",
        Group => "group",
        Value => "value",
        Severity => "severity",
    } default Name
);

/// Whether `name` is a sortable column of any list.
#[must_use]
pub fn is_known_column(name: &str) -> bool {
    TestColumn::from_name(name).is_some()
        || RequirementColumn::from_name(name).is_some()
        || VerificationColumn::from_name(name).is_some()
        || ParameterColumn::from_name(name).is_some()
}

/// Column by name, or the list's default when the name does not apply.
#[must_use]
pub fn column_or_default<C: Column>(name: &str) -> C {
    C::from_name(name).unwrap_or(C::DEFAULT)
}

// ──────────────────── row impls ────────────────────

impl Queryable for EvaluatedTest {
    type Column = TestColumn;

    fn sort_key(&self, column: TestColumn) -> SortKey {
        match column {
            TestColumn::Number => SortKey::Int(i64::from(self.number)),
            TestColumn::Title => SortKey::text(&self.title),
            TestColumn::Result => SortKey::Int(i64::from(self.result.rank())),
            TestColumn::Failures => SortKey::Int(i64::from(self.summary.verifications.fail)),
        }
    }

    fn row_id(&self) -> u64 {
        u64::from(self.number)
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.title.as_str(), self.description.as_str(), self.result.label()]
    }
}

impl Queryable for Requirement {
    type Column = RequirementColumn;

    fn sort_key(&self, column: RequirementColumn) -> SortKey {
        match column {
            RequirementColumn::Number => SortKey::Int(i64::from(self.number())),
            RequirementColumn::Title => SortKey::text(self.title()),
            RequirementColumn::Pass => SortKey::Int(i64::from(self.pass())),
            RequirementColumn::Fail => SortKey::Int(i64::from(self.fail())),
            RequirementColumn::Result => SortKey::Int(i64::from(!self.result().is_pass())),
        }
    }

    fn row_id(&self) -> u64 {
        u64::from(self.number())
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.title(), self.result().label()]
    }
}

impl Queryable for VerificationRow {
    type Column = VerificationColumn;

    fn sort_key(&self, column: VerificationColumn) -> SortKey {
        let v = &self.verification;
        match column {
            VerificationColumn::Number => SortKey::Int(i64::from(v.number())),
            VerificationColumn::Title => SortKey::text(v.title()),
            VerificationColumn::Value => SortKey::numeric_or_text(v.value()),
            VerificationColumn::Requirement => {
                SortKey::Int(v.requirement_id().map_or(-1, i64::from))
            }
            VerificationColumn::Result => SortKey::Int(i64::from(!v.passed())),
        }
    }

    fn row_id(&self) -> u64 {
        u64::from(self.verification.number())
    }

    fn search_fields(&self) -> Vec<&str> {
        let v = &self.verification;
        let mut fields = vec![v.title(), v.value(), v.outcome().label()];
        fields.extend(v.note());
        fields.extend(v.reviewer());
        fields
    }
}

impl Queryable for ParameterRow {
    type Column = ParameterColumn;

    fn sort_key(&self, column: ParameterColumn) -> SortKey {
        let p = &self.parameter;
        match column {
            ParameterColumn::Name => SortKey::text(&p.name),
            ParameterColumn::Group => SortKey::text(&p.group),
            ParameterColumn::Value => SortKey::numeric_or_text(&p.value),
            ParameterColumn::Severity => SortKey::Int(i64::from(p.severity.rank())),
        }
    }

    fn row_id(&self) -> u64 {
        u64::from(self.position)
    }

    fn search_fields(&self) -> Vec<&str> {
        let p = &self.parameter;
        vec![
            p.name.as_str(),
            p.group.as_str(),
            p.value.as_str(),
            p.severity.label(),
        ]
    }
}

// ──────────────────── operations ────────────────────

/// Rows whose searchable text contains `text`, case-insensitively, in input
/// order. Blank text matches everything.
pub fn filter<'a, R: Queryable>(rows: &'a [R], text: &str) -> Vec<&'a R> {
    rows.iter().filter(|row| row.matches(text)).collect()
}

fn compare<R: Queryable>(a: &R, b: &R, column: R::Column, direction: SortDirection) -> Ordering {
    let primary = a.sort_key(column).cmp(&b.sort_key(column));
    let primary = match direction {
        SortDirection::Ascending => primary,
        SortDirection::Descending => primary.reverse(),
    };
    primary.then_with(|| a.row_id().cmp(&b.row_id()))
}

/// Stable in-place sort of borrowed rows.
pub fn sort<R: Queryable>(rows: &mut [&R], column: R::Column, direction: SortDirection) {
    rows.sort_by(|a, b| compare(*a, *b, column, direction));
}

/// Filter, then sort.
pub fn query<'a, R: Queryable>(
    rows: &'a [R],
    text: &str,
    column: R::Column,
    direction: SortDirection,
) -> Vec<&'a R> {
    let mut out = filter(rows, text);
    sort(&mut out, column, direction);
    out
}
