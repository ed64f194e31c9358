//! Error types shared across the crate.

use std::path::PathBuf;

/// Errors raised while producing a PDF document.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The output path (or its parent directory) could not be created or written.
    #[error("failed to write report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The low-level PDF writer rejected an operation.
    #[error("PDF backend error: {0}")]
    Pdf(String),

    /// The flowing-layout document (fonts, tables) could not be built or rendered.
    #[error("document layout failed: {0}")]
    Document(#[from] genpdf::error::Error),

    /// An image could not be decoded.
    #[error("image error: {0}")]
    Image(String),
}

impl RenderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by narrative sources that depend on an external model.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The completion client could not produce a response.
    #[error("completion request failed: {0}")]
    Client(String),

    /// The response was not the JSON document we asked for.
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The response parsed but did not satisfy the report schema.
    #[error("response failed validation: {0}")]
    Invalid(String),

    /// Every attempt failed; carries the reason of the final attempt.
    #[error("smart generation failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: usize, last_error: String },

    /// No generator is configured (for example a missing API key).
    #[error("narrative source unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised when configuring the auto-report schedule.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("weekday {0} is out of range (0 = Monday ... 6 = Sunday)")]
    Weekday(u8),

    #[error("hour {0} is out of range (0-23)")]
    Hour(u8),

    #[error("minute {0} is out of range (0-59)")]
    Minute(u8),

    #[error("scheduler worker could not be started: {0}")]
    Spawn(String),
}

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Raised when a category code is not one of the known HMS categories.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown category '{code}'. Available: {available}")]
pub struct CategoryError {
    pub code: String,
    pub available: String,
}
