//! Structured event logging: append-only JSONL with graceful degradation.

pub mod evaluation;
pub mod jsonl;
