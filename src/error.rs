//! Error types for rolesim
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Exit codes for CLI
//!
//! Only input malformation and identity violations are errors. Difficulty
//! anomalies resolve to the default tier and unscored competencies are data
//! in the review, so neither appears here.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::TraitDimension;

/// Result type alias for rolesim operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoNotFound = 203,
    SerializationFailed = 204,

    // Catalog errors (3xx)
    CatalogUnknownKey = 300,
    CatalogInvalid = 301,

    // Rubric errors (4xx)
    ScoreRangeMalformed = 400,
    RubricInvalid = 401,

    // Identity errors (5xx)
    RetryCountOutOfRange = 500,
    IdentityMalformed = 501,
    ReplayOfReplay = 502,

    // Fusion batch errors (6xx)
    PregenJobAborted = 600,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E300")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10,
            200..=299 => 20,
            300..=399 => 30,
            400..=499 => 40,
            500..=599 => 50,
            600..=699 => 60,
            900..=999 => 90,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to parse {what}: {message}")]
    ConfigParse {
        what: String,
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Catalog Errors
    // ─────────────────────────────────────────────────────────────

    /// A selection referenced a key the catalog does not hold
    #[error("Unknown {dimension} key '{key}'")]
    UnknownCatalogKey { dimension: TraitDimension, key: String },

    /// Catalog data failed validation at load time
    #[error("Invalid catalog data in {dimension}: {message}")]
    CatalogInvalid {
        dimension: TraitDimension,
        key: Option<String>,
        message: String,
    },

    // ─────────────────────────────────────────────────────────────
    // Rubric Errors
    // ─────────────────────────────────────────────────────────────

    /// A rubric entry's score range text could not be parsed
    #[error("Malformed score range '{raw}' in rubric entry {entry_id} of competency {competency_id}: {reason}")]
    ScoreRangeMalformed {
        competency_id: String,
        entry_id: String,
        raw: String,
        reason: String,
    },

    #[error("Invalid rubric data: {message}")]
    RubricInvalid { message: String },

    // ─────────────────────────────────────────────────────────────
    // Identity Errors
    // ─────────────────────────────────────────────────────────────

    /// Retry counts are rendered as exactly two digits
    #[error("Retry count {retry_count} out of range (must be 1-99)")]
    RetryCountOutOfRange { retry_count: u32 },

    #[error("Malformed simulation id '{id}': {reason}")]
    IdentityMalformed { id: String, reason: String },

    /// Replays are always derived from the original session id
    #[error("Cannot derive a replay from replay id '{id}'")]
    ReplayOfReplay { id: String },

    // ─────────────────────────────────────────────────────────────
    // Fusion Batch Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Pre-generation job {job} aborted: {message}")]
    PregenJobAborted { job: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) | Error::Json(_) => ErrorCode::SerializationFailed,

            Error::UnknownCatalogKey { .. } => ErrorCode::CatalogUnknownKey,
            Error::CatalogInvalid { .. } => ErrorCode::CatalogInvalid,

            Error::ScoreRangeMalformed { .. } => ErrorCode::ScoreRangeMalformed,
            Error::RubricInvalid { .. } => ErrorCode::RubricInvalid,

            Error::RetryCountOutOfRange { .. } => ErrorCode::RetryCountOutOfRange,
            Error::IdentityMalformed { .. } => ErrorCode::IdentityMalformed,
            Error::ReplayOfReplay { .. } => ErrorCode::ReplayOfReplay,

            Error::PregenJobAborted { .. } => ErrorCode::PregenJobAborted,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Whether the error stems from caller-supplied input (never retried)
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownCatalogKey { .. }
                | Error::ScoreRangeMalformed { .. }
                | Error::RetryCountOutOfRange { .. }
                | Error::IdentityMalformed { .. }
                | Error::ReplayOfReplay { .. }
        )
    }

    /// Name of the field or key that failed, when the error identifies one
    pub fn failing_field(&self) -> Option<String> {
        match self {
            Error::ConfigValidation { field, .. } => field.clone(),
            Error::UnknownCatalogKey { dimension, key } => Some(format!("{}:{}", dimension, key)),
            Error::CatalogInvalid { dimension, key, .. } => {
                Some(key.as_ref().map_or_else(|| dimension.to_string(), |k| format!("{}:{}", dimension, k)))
            }
            Error::ScoreRangeMalformed { entry_id, .. } => Some(format!("score_range:{}", entry_id)),
            Error::RetryCountOutOfRange { .. } => Some("retry_count".to_string()),
            Error::IdentityMalformed { id, .. } | Error::ReplayOfReplay { id } => Some(id.clone()),
            _ => None,
        }
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'rolesim config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check the file syntax. Run 'rolesim config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the configuration file and fix the invalid values."
            ),
            Error::UnknownCatalogKey { .. } => Some(
                "Run 'rolesim catalog list' to see the keys available in each dimension."
            ),
            Error::CatalogInvalid { .. } => Some(
                "Catalog keys must be non-empty and unique within their dimension."
            ),
            Error::ScoreRangeMalformed { .. } => Some(
                "Score ranges are written as 'low-high' (for example '5-7' or '5–7')."
            ),
            Error::RetryCountOutOfRange { .. } => Some(
                "Replay identifiers carry a two-digit retry suffix; start a fresh session instead."
            ),
            Error::ReplayOfReplay { .. } => Some(
                "Pass the original simulation id; replays are numbered against the original."
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!("\x1b[31mError [{}]\x1b[0m: {}\n", self.code().as_str(), self);

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn config_validation(message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: None,
        }
    }

    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn unknown_key(dimension: TraitDimension, key: impl Into<String>) -> Self {
        Error::UnknownCatalogKey {
            dimension,
            key: key.into(),
        }
    }

    pub fn identity_malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::IdentityMalformed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn rubric_invalid(message: impl Into<String>) -> Self {
        Error::RubricInvalid {
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
