//! DV-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, DvError>;

/// Top-level error type for Drive Verdict.
#[derive(Debug, Error)]
pub enum DvError {
    #[error("[DV-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[DV-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[DV-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[DV-2001] unknown severity label {label:?} (expected good, suspect, critical or missing)")]
    UnknownSeverity { label: String },

    #[error("[DV-2002] malformed record in {context}: {details}")]
    MalformedRecord {
        context: &'static str,
        details: String,
    },

    #[error("[DV-2003] duplicate test case number {number}")]
    DuplicateTestNumber { number: u32 },

    #[error("[DV-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[DV-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[DV-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl DvError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "DV-1001",
            Self::MissingConfig { .. } => "DV-1002",
            Self::ConfigParse { .. } => "DV-1003",
            Self::UnknownSeverity { .. } => "DV-2001",
            Self::MalformedRecord { .. } => "DV-2002",
            Self::DuplicateTestNumber { .. } => "DV-2003",
            Self::Serialization { .. } => "DV-2101",
            Self::Io { .. } => "DV-3002",
            Self::Runtime { .. } => "DV-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    ///
    /// Contract violations in the input data never resolve on retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Runtime { .. })
    }

    /// Whether the error is a producer/consumer contract break in the run data.
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::UnknownSeverity { .. }
                | Self::MalformedRecord { .. }
                | Self::DuplicateTestNumber { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for DvError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for DvError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
