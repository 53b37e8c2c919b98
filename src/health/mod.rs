//! Health pipeline: severity vocabulary, parameter grading, group and banner folds.

pub mod grader;
pub mod rollup;
pub mod severity;
