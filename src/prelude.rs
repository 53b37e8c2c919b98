//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use drive_verdict::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{DvError, Result};

// Results
pub use crate::results::requirements::{Requirement, RequirementIndex};
pub use crate::results::rollup::{
    EvaluatedStep, EvaluatedSuite, EvaluatedTest, RollupPolicy, StepRecord, StepResult,
    SuiteRecord, SuiteVerdict, TestRecord, TestResult, evaluate_suite,
};
pub use crate::results::verification::{CheckInput, Outcome, Verification, VerificationRecorder};

// Health
pub use crate::health::grader::{GradeRule, HealthGrader, HealthParameter, HealthReading};
pub use crate::health::rollup::{HealthGroup, HealthRollup, SystemHealth, roll_up};
pub use crate::health::severity::Severity;

// Model
pub use crate::model::dataset::RunDataset;
pub use crate::model::recorder::{HealthSink, RunHeader, RunRecorder};
pub use crate::model::results::{EvaluationPolicy, ResultsModel};

// View
pub use crate::view::query::{SortDirection, query};
pub use crate::view::state::{ViewAction, ViewState, project, update};

// Logger
pub use crate::logger::jsonl::{JsonlConfig, JsonlWriter, LogEntry};
