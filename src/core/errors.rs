//! DUP-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, DupError>;

/// Top-level error type for the `dup` duplicate-file finder.
#[derive(Debug, Error)]
pub enum DupError {
    #[error("[DUP-1001] usage error: {details}")]
    UsageError { details: String },

    #[error("[DUP-1002] no input paths given")]
    NoInputs,

    #[error("[DUP-1003] invalid pattern {pattern:?}: {details}")]
    PatternError { pattern: String, details: String },

    #[error("[DUP-1101] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[DUP-1102] invalid configuration: {details}")]
    ConfigInvalid { details: String },

    #[error("[DUP-2001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[DUP-2002] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[DUP-2003] hash failure for {path}: {details}")]
    HashFailure { path: PathBuf, details: String },

    #[error("[DUP-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl DupError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UsageError { .. } => "DUP-1001",
            Self::NoInputs => "DUP-1002",
            Self::PatternError { .. } => "DUP-1003",
            Self::ConfigParse { .. } => "DUP-1101",
            Self::ConfigInvalid { .. } => "DUP-1102",
            Self::Io { .. } => "DUP-2001",
            Self::ChannelClosed { .. } => "DUP-2002",
            Self::HashFailure { .. } => "DUP-2003",
            Self::Runtime { .. } => "DUP-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::ChannelClosed { .. } | Self::HashFailure { .. }
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

impl From<serde_json::Error> for DupError {
    fn from(value: serde_json::Error) -> Self {
        Self::ConfigParse {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for DupError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
