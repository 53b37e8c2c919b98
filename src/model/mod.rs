//! Run data in and evaluated results out: dataset wire format, results model, live recorder.

pub mod dataset;
pub mod recorder;
pub mod results;
