//! Configuration system: compiled-in defaults + optional TOML file + CLI overrides.
//!
//! Precedence, low to high: built-in defaults → TOML file (if found) → CLI flags.
//! CLI-flag application happens in [`crate::cli::args`], which starts from a
//! loaded [`Config`] and layers user-supplied flags on top.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{DupError, Result};

/// Full `dup` configuration model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hashing: HashingConfig,
    pub patterns: PatternsConfig,
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hashing: HashingConfig::default(),
            patterns: PatternsConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Tuning constants for the hash worker pool and buffer pool (spec §4.F/§4.E).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    /// Hard cap on concurrently running hash worker threads.
    pub max_threads: usize,
    /// Number of pre-allocated scratch buffers. Must be `>= max_threads`.
    pub num_buffers: usize,
    /// Size in bytes of each scratch buffer.
    pub buffer_size: usize,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            max_threads: 8,
            num_buffers: 16,
            buffer_size: 64 * 1024,
        }
    }
}

/// Default include/exclude pattern lists, layered under any CLI-supplied patterns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternsConfig {
    pub default_include_file: Vec<String>,
    pub default_exclude_file: Vec<String>,
    pub default_include_path: Vec<String>,
    pub default_exclude_path: Vec<String>,
}

/// Default output formatting strings (spec §4.H/§4.I, overridable per-flag).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub pre_dup: String,
    pub pre_diff: String,
    pub pre_miss: String,
    pub pre_divider: String,
    pub post_divider: String,
    pub separator: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pre_dup: String::new(),
            pre_diff: "!= ".to_string(),
            pre_miss: "--  ".to_string(),
            pre_divider: String::new(),
            post_divider: "__\n".to_string(),
            separator: ", ".to_string(),
        }
    }
}

impl Config {
    /// Load configuration: start from built-in defaults, layer a TOML file on top.
    ///
    /// * `explicit_path` — the `-config=PATH` CLI flag, if given.
    ///
    /// Resolution: an explicit path that does not exist is a configuration
    /// error. Without an explicit path, `./dup.toml` is tried and silently
    /// skipped if absent — absence of a config file is never an error.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let (candidate, is_explicit) = match explicit_path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from("dup.toml"), false),
        };

        let cfg = if candidate.exists() {
            let raw = fs::read_to_string(&candidate).map_err(|source| DupError::Io {
                path: candidate.clone(),
                source,
            })?;
            toml::from_str::<Self>(&raw)?
        } else if is_explicit {
            return Err(DupError::ConfigInvalid {
                details: format!("config file not found: {}", candidate.display()),
            });
        } else {
            Self::default()
        };

        cfg.validate()?;
        Ok(cfg)
    }

    /// Check the invariants the worker pool (§4.F) depends on.
    pub fn validate(&self) -> Result<()> {
        if self.hashing.max_threads == 0 {
            return Err(DupError::ConfigInvalid {
                details: "hashing.max_threads must be at least 1".to_string(),
            });
        }
        if self.hashing.num_buffers < self.hashing.max_threads {
            return Err(DupError::ConfigInvalid {
                details: format!(
                    "hashing.num_buffers ({}) must be >= hashing.max_threads ({})",
                    self.hashing.num_buffers, self.hashing.max_threads
                ),
            });
        }
        if self.hashing.buffer_size == 0 {
            return Err(DupError::ConfigInvalid {
                details: "hashing.buffer_size must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_self_consistent() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.hashing.max_threads, 8);
        assert_eq!(cfg.hashing.num_buffers, 16);
    }

    #[test]
    fn missing_default_path_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let result = Config::load(None);
        std::env::set_current_dir(cwd).unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let result = Config::load(Some(Path::new("/nonexistent/dup-config-test.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn explicit_path_is_loaded_and_merged_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.toml");
        fs::write(
            &path,
            r#"
            [hashing]
            max_threads = 4
            num_buffers = 4

            [output]
            separator = " | "
            "#,
        )
        .unwrap();

        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.hashing.max_threads, 4);
        assert_eq!(cfg.hashing.num_buffers, 4);
        assert_eq!(cfg.output.separator, " | ");
        // Fields not present in the file keep their compiled-in defaults.
        assert_eq!(cfg.hashing.buffer_size, 64 * 1024);
        assert_eq!(cfg.output.pre_diff, "!= ");
    }

    #[test]
    fn rejects_num_buffers_less_than_max_threads() {
        let mut cfg = Config::default();
        cfg.hashing.max_threads = 16;
        cfg.hashing.num_buffers = 8;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.toml");
        fs::write(&path, "not = [valid toml").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }
}
