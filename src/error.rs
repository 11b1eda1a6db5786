//! Error types for osq-glance.
//!
//! Every failure of the process and query layers maps onto one variant of
//! [`OsqError`], so callers can pick a distinct message and affordance.

use std::time::Duration;

use thiserror::Error;

/// Main error type for osq-glance operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OsqError {
    /// The osquery binary or the extension binary could not be found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The SQL failed validation and was never sent to osquery.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// osquery ran but reported a failure (non-zero exit, SQL error, etc.)
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// The invocation exceeded its deadline and the child was killed.
    #[error("Query timed out after {} seconds", .0.as_secs_f64())]
    Timeout(Duration),

    /// The invocation was cancelled before it finished.
    #[error("Query was cancelled")]
    Cancelled,

    /// osquery output could not be decoded, even after recovery.
    #[error("Parse error: {message} (output started with: {preview})")]
    ParseError { message: String, preview: String },

    /// Configuration errors (invalid config file, bad values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, I/O on our own files).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// What a surrounding UI should offer next to an error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestedAction {
    /// Running the same request again may succeed.
    Retry,
    /// The user has to fix installation or settings first.
    OpenSettings,
    /// The query itself has to change.
    EditQuery,
    /// Nothing useful to offer.
    None,
}

impl OsqError {
    /// Creates a not-found error with the given message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Creates an invalid-query error with the given message.
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution_failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// Creates a parse error, keeping only a bounded preview of the output.
    pub fn parse(msg: impl Into<String>, raw: &str) -> Self {
        Self::ParseError {
            message: msg.into(),
            preview: preview(raw),
        }
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Not Found",
            Self::InvalidQuery(_) => "Invalid Query",
            Self::ExecutionFailed(_) => "Execution Failed",
            Self::Timeout(_) => "Timeout",
            Self::Cancelled => "Cancelled",
            Self::ParseError { .. } => "Parse Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the affordance a UI should offer for this error.
    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Self::Timeout(_) | Self::Cancelled | Self::ExecutionFailed(_) => SuggestedAction::Retry,
            Self::NotFound(_) | Self::Config(_) => SuggestedAction::OpenSettings,
            Self::InvalidQuery(_) => SuggestedAction::EditQuery,
            Self::ParseError { .. } | Self::Internal(_) => SuggestedAction::None,
        }
    }
}

/// Maximum number of characters of raw output carried by a parse error.
pub const PREVIEW_CHARS: usize = 200;

/// Returns at most [`PREVIEW_CHARS`] characters of `raw`, never splitting a char.
pub fn preview(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Result type alias using OsqError.
pub type Result<T> = std::result::Result<T, OsqError>;
