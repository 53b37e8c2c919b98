#![forbid(unsafe_code)]

//! Drive Verdict: hierarchical result and health-severity aggregation for
//! storage-device test runs.
//!
//! Two independent roll-ups run over one recorded run:
//! 1. **Results**: verification outcomes fold into step, test and suite
//!    results, with a per-requirement pass/fail index at every level.
//! 2. **Health**: graded device parameters fold into group tiles and a
//!    single system banner.
//!
//! Both feed one immutable [`model::results::ResultsModel`] that the
//! [`view`] layer sorts and filters without altering.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use drive_verdict::prelude::*;
//!
//! let data = RunDataset::load(std::path::Path::new("run.json"))?;
//! let model = ResultsModel::from_dataset(&data, &Config::default())?;
//! println!("{}", model.verdict());
//! # Ok::<(), DvError>(())
//! ```

pub mod prelude;

pub mod core;
pub mod health;
pub mod logger;
pub mod model;
pub mod results;
pub mod view;

#[cfg(test)]
mod test_properties;
