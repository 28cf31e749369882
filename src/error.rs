//! Error types for SyncView.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=source, 3=not_found, 4=validation, etc.)
//! - Retryability flags
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for SyncView operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Source (exit 2)
    BackendError,
    Unsupported,

    // Not Found (exit 3)
    SourceNotFound,
    WorkingSetNotFound,
    RootNotFound,

    // Validation (exit 4)
    InvalidPath,
    InvalidArgument,

    // Pipeline state (exit 5)
    NotConnected,
    Cancelled,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::BackendError => "BACKEND_ERROR",
            Self::Unsupported => "UNSUPPORTED",
            Self::SourceNotFound => "SOURCE_NOT_FOUND",
            Self::WorkingSetNotFound => "WORKING_SET_NOT_FOUND",
            Self::RootNotFound => "ROOT_NOT_FOUND",
            Self::InvalidPath => "INVALID_PATH",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::NotConnected => "NOT_CONNECTED",
            Self::Cancelled => "CANCELLED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::BackendError | Self::Unsupported => 2,
            Self::SourceNotFound | Self::WorkingSetNotFound | Self::RootNotFound => 3,
            Self::InvalidPath | Self::InvalidArgument => 4,
            Self::NotConnected | Self::Cancelled => 5,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether retrying the same operation can succeed.
    ///
    /// True for backend hiccups and cancelled refreshes. False for
    /// validation, configuration or internal errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendError | Self::Cancelled | Self::NotConnected)
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in SyncView operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Sync status unavailable for {path}: {message}")]
    Backend { path: String, message: String },

    #[error("Operation not supported by source: {0}")]
    Unsupported(String),

    #[error("Sync source not found: {id}")]
    SourceNotFound { id: String },

    #[error("Working set not found: {name}")]
    WorkingSetNotFound { name: String, similar: Vec<String> },

    #[error("Root directory not found: {path}")]
    RootNotFound { path: PathBuf },

    #[error("Invalid resource path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Input is not connected to a source")]
    NotConnected,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a backend failure for a resource.
    pub fn backend(path: impl std::fmt::Display, message: impl Into<String>) -> Self {
        Self::Backend {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Backend { .. } => ErrorCode::BackendError,
            Self::Unsupported(_) => ErrorCode::Unsupported,
            Self::SourceNotFound { .. } => ErrorCode::SourceNotFound,
            Self::WorkingSetNotFound { .. } => ErrorCode::WorkingSetNotFound,
            Self::RootNotFound { .. } => ErrorCode::RootNotFound,
            Self::InvalidPath { .. } => ErrorCode::InvalidPath,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::NotConnected => ErrorCode::NotConnected,
            Self::Cancelled => ErrorCode::Cancelled,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Whether this is the cooperative cancellation outcome.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::WorkingSetNotFound { name, similar } => {
                if similar.is_empty() {
                    Some(format!(
                        "No working set named '{name}'. Use `syncview working-set list` to see saved working sets."
                    ))
                } else {
                    Some(format!("Did you mean: {}?", similar.join(", ")))
                }
            }

            Self::RootNotFound { path } => Some(format!(
                "'{}' does not exist or is not a directory.",
                path.display()
            )),

            Self::InvalidPath { .. } => Some(
                "Resource paths are absolute and slash separated, e.g. /project/src/main.rs"
                    .to_string(),
            ),

            Self::InvalidArgument(msg) => {
                if msg.contains("direction") {
                    Some(
                        "Valid directions: incoming, outgoing, conflicting. \
                         Synonyms: in→incoming, out→outgoing, conflict→conflicting"
                            .to_string(),
                    )
                } else if msg.contains("change") {
                    Some(
                        "Valid change types: addition, deletion, change. \
                         Synonyms: add→addition, delete→deletion, modified→change"
                            .to_string(),
                    )
                } else {
                    None
                }
            }

            Self::Config(_) => Some(
                "Check ~/.syncview/config.json or pass --config to use another file.".to_string(),
            ),

            Self::Cancelled => Some("The refresh was cancelled; run it again.".to_string()),

            Self::Backend { .. }
            | Self::Unsupported(_)
            | Self::SourceNotFound { .. }
            | Self::NotConnected
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
