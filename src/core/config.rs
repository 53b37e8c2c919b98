//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{DvError, Result};
use crate::health::grader::{GradeRule, ParameterRule};
use crate::view::query;

/// Full dverdict configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub rollup: RollupConfig,
    pub health: HealthConfig,
    pub query: QueryConfig,
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
}

/// Suite-verdict policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RollupConfig {
    /// A skipped test case fails the suite verdict.
    pub skipped_fails_suite: bool,
}

/// Parameter grading rules and banner display policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HealthConfig {
    pub rules: Vec<ParameterRule>,
    /// Present a `Missing` banner as `Good`. Group tiles are unaffected.
    pub missing_banner_as_good: bool,
}

/// Initial sort state of result views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QueryConfig {
    pub default_sort_column: String,
    pub default_descending: bool,
}

/// JSONL evaluation log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Event log path; logging is disabled when unset.
    pub jsonl_path: Option<PathBuf>,
    pub fallback_path: Option<PathBuf>,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

/// Filesystem paths used by dverdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            skipped_fails_suite: true,
        }
    }
}

fn flag_rule(name: &str) -> ParameterRule {
    ParameterRule {
        name: name.to_string(),
        rule: GradeRule::Flag {
            good: "No".to_string(),
        },
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                flag_rule("NVM Subsystem Unreliable"),
                flag_rule("Persistent Memory Unreliable"),
                flag_rule("Media in Read-only"),
                flag_rule("Volatile Memory Backup Failed"),
                ParameterRule {
                    name: "Media and Data Integrity Errors".to_string(),
                    rule: GradeRule::ZeroCount,
                },
                ParameterRule {
                    name: "Percent Throttled".to_string(),
                    rule: GradeRule::Thresholds {
                        suspect_at: 1.0,
                        critical_at: 10.0,
                    },
                },
            ],
            missing_banner_as_good: true,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_sort_column: "number".to_string(),
            default_descending: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            jsonl_path: None,
            fallback_path: None,
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[DV-CONFIG] WARNING: HOME not set, falling back to /tmp for config path"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            config_file: home_dir.join(".config").join("dverdict").join("config.toml"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| DvError::Io {
                path: path_buf.clone(),
                source,
            })?;
            Self::from_toml_str(&raw)?
        } else if is_explicit_path {
            return Err(DvError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document without env overrides or validation.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Deterministic hash of the effective config for log correlation.
    ///
    /// FNV-1a over canonical JSON; stable across processes and releases.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("DV_ROLLUP_SKIPPED_FAILS_SUITE") {
            self.rollup.skipped_fails_suite =
                parse_env_bool("DV_ROLLUP_SKIPPED_FAILS_SUITE", &raw)?;
        }

        if let Some(raw) = lookup("DV_HEALTH_MISSING_BANNER_AS_GOOD") {
            self.health.missing_banner_as_good =
                parse_env_bool("DV_HEALTH_MISSING_BANNER_AS_GOOD", &raw)?;
        }

        if let Some(raw) = lookup("DV_LOGGING_JSONL_PATH") {
            self.logging.jsonl_path = Some(PathBuf::from(raw));
        }

        if let Some(raw) = lookup("DV_LOGGING_MAX_SIZE_BYTES") {
            self.logging.max_size_bytes = parse_env_u64("DV_LOGGING_MAX_SIZE_BYTES", &raw)?;
        }

        if let Some(raw) = lookup("DV_LOGGING_MAX_ROTATED_FILES") {
            self.logging.max_rotated_files =
                parse_env_u32("DV_LOGGING_MAX_ROTATED_FILES", &raw)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.health.rules {
            if entry.name.trim().is_empty() {
                return Err(DvError::InvalidConfig {
                    details: "health.rules entries need a non-empty name".to_string(),
                });
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(DvError::InvalidConfig {
                    details: format!("health.rules has more than one rule for {:?}", entry.name),
                });
            }
            entry.rule.validate(&entry.name)?;
        }

        if !query::is_known_column(&self.query.default_sort_column) {
            return Err(DvError::InvalidConfig {
                details: format!(
                    "query.default_sort_column {:?} is not a sortable column",
                    self.query.default_sort_column
                ),
            });
        }

        if self.logging.max_size_bytes == 0 {
            return Err(DvError::InvalidConfig {
                details: "logging.max_size_bytes must be > 0".to_string(),
            });
        }

        if self.logging.jsonl_path.is_some()
            && self.logging.jsonl_path == self.logging.fallback_path
        {
            return Err(DvError::InvalidConfig {
                details: "logging.fallback_path must differ from logging.jsonl_path".to_string(),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim().parse::<u64>().map_err(|error| DvError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}

fn parse_env_u32(name: &str, raw: &str) -> Result<u32> {
    raw.trim().parse::<u32>().map_err(|error| DvError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.trim().parse::<bool>().map_err(|error| DvError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
