//! Test-result pipeline: verification records, hierarchical rollup, requirement index.

pub mod requirements;
pub mod rollup;
pub mod verification;
