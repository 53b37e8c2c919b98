//! Presentation surface: column queries and immutable view state.

pub mod query;
pub mod state;
