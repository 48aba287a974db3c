//! Error types for persona-sim
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Exit codes for CLI
//!
//! Generation failures have their own [`GenerationError`] type so callers can
//! decide between substituting a sentinel turn and aborting.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::gateway::GenerationError;

/// Result type alias for persona-sim operations
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
    IoPermission = 202,
    IoNotFound = 203,

    // Source data errors (3xx)
    DataMalformed = 300,
    DataEmpty = 301,
    PersonaInvalid = 302,
    Serialization = 303,

    // Generation errors (4xx)
    GenerationFailed = 400,
    GenerationTimeout = 401,
    GenerationRateLimited = 402,
    GenerationRejected = 403,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10,
            200..=299 => 20,
            300..=399 => 30,
            400..=499 => 40,
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

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Source Data Errors
    // ─────────────────────────────────────────────────────────────

    /// A data file exists but does not have the expected shape
    #[error("Malformed data in {path}: {message}")]
    MalformedData { path: PathBuf, message: String },

    /// A data file parsed but holds nothing to work on
    #[error("No {what} found in {path}")]
    EmptyData { path: PathBuf, what: &'static str },

    /// Persona catalog entry rejected
    #[error("Invalid persona '{name}': {reason}")]
    PersonaInvalid { name: String, reason: String },

    /// JSON (de)serialization error outside of a file context
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Generation Errors
    // ─────────────────────────────────────────────────────────────

    /// Text generation failed after retries
    #[error("Text generation failed: {0}")]
    Generation(#[from] GenerationError),

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        use crate::gateway::GenerationErrorKind as Kind;

        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::Config(_) => ErrorCode::ConfigValidation,

            Error::IoRead { source, .. } => match source.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Toml(_) => ErrorCode::ConfigParseError,

            Error::MalformedData { .. } => ErrorCode::DataMalformed,
            Error::EmptyData { .. } => ErrorCode::DataEmpty,
            Error::PersonaInvalid { .. } => ErrorCode::PersonaInvalid,
            Error::Json(_) => ErrorCode::Serialization,

            Error::Generation(e) => match e.kind {
                Kind::Timeout => ErrorCode::GenerationTimeout,
                Kind::RateLimited => ErrorCode::GenerationRateLimited,
                Kind::Client => ErrorCode::GenerationRejected,
                _ => ErrorCode::GenerationFailed,
            },

            Error::Internal(_) => ErrorCode::InternalError,
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
        use crate::gateway::GenerationErrorKind as Kind;

        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'persona-sim config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'persona-sim config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the configuration file and fix the invalid values."
            ),
            Error::EmptyData { .. } | Error::MalformedData { .. } => Some(
                "Persona catalogs use {\"characters\": [{\"name\", \"system_prompt\"}]}; question files use {\"questions\": [{\"content\"}]}."
            ),
            Error::PersonaInvalid { .. } => Some(
                "Every persona needs a unique, non-empty name and a system prompt."
            ),
            Error::Generation(e) => match e.kind {
                Kind::Client => Some(
                    "The API rejected the request. Check the API key (PERSONA_SIM_API_KEY or OPENAI_API_KEY) and model name."
                ),
                Kind::RateLimited => Some(
                    "The API is rate limiting requests. Lower pipeline.max_parallel_personas or retry later."
                ),
                Kind::Connection | Kind::Timeout => Some(
                    "Check your network connection and the configured base_url. Run 'persona-sim ping' to test."
                ),
                _ => None,
            },
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            self.code().as_str(),
            self
        );

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
    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a malformed data error
    pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::MalformedData {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a persona validation error
    pub fn persona_invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::PersonaInvalid {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
