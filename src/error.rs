use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for tagver operations
#[derive(Error, Debug)]
pub enum TagverError {
    #[error("Unable to detect a supported version control system in {}", path.display())]
    NoVcsFound { path: PathBuf },

    #[error("{}", mismatch_message(.tag.as_deref(), .pattern))]
    PatternMismatch {
        /// Nearest tag that failed to match, if any tag exists
        tag: Option<String>,
        pattern: String,
    },

    #[error("Invalid version base '{base}': expected dot-separated numbers")]
    InvalidBase { base: String },

    #[error("Invalid tag pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Version '{version}' does not conform to {style}: {reason}")]
    NonConformantVersion {
        version: String,
        style: String,
        reason: String,
    },

    #[error("VCS command `{command}` failed: {reason}")]
    VcsCommandFailure { command: String, reason: String },

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Archival metadata error: {0}")]
    Archival(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn mismatch_message(tag: Option<&str>, pattern: &str) -> String {
    match tag {
        Some(tag) => format!("Tag '{}' does not match pattern '{}'", tag, pattern),
        None => format!("No tags found to match pattern '{}'", pattern),
    }
}

/// Convenience type alias for Results in tagver
pub type Result<T> = std::result::Result<T, TagverError>;

impl TagverError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        TagverError::Config(msg.into())
    }

    /// Create a custom format error with context
    pub fn format(msg: impl Into<String>) -> Self {
        TagverError::Format(msg.into())
    }

    /// Create an archival metadata error with context
    pub fn archival(msg: impl Into<String>) -> Self {
        TagverError::Archival(msg.into())
    }

    /// Create a VCS command failure for `command`
    pub fn command(command: impl Into<String>, reason: impl Into<String>) -> Self {
        TagverError::VcsCommandFailure {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Create a non-conformance error for `version` under `style`
    pub fn non_conformant(
        version: impl Into<String>,
        style: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        TagverError::NonConformantVersion {
            version: version.into(),
            style: style.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error came from the version control backend
    pub fn is_vcs_failure(&self) -> bool {
        matches!(
            self,
            TagverError::VcsCommandFailure { .. } | TagverError::Git(_)
        )
    }

    /// Process exit code the CLI uses for this error kind
    pub fn exit_code(&self) -> i32 {
        match self {
            TagverError::NoVcsFound { .. } => 3,
            TagverError::PatternMismatch { .. } => 4,
            TagverError::NonConformantVersion { .. } => 5,
            TagverError::VcsCommandFailure { .. } | TagverError::Git(_) => 6,
            _ => 1,
        }
    }
}
