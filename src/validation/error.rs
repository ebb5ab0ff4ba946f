use crate::core::PointId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised at the fallible boundaries around the geometric core
#[derive(Debug, Error)]
pub enum SurveyError {
    #[error("Unknown point: {id}")]
    UnknownPoint { id: PointId },

    #[error("Index {index} out of range for sequence of {len} points")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Survey not found: {id}")]
    SurveyNotFound { id: String },

    #[error("Invalid survey id {id:?}: {reason}")]
    InvalidSurveyId { id: String, reason: String },

    #[error("Malformed survey document: {reason}")]
    MalformedDocument { reason: String },

    #[error("Import of record {index} failed: {reason}")]
    ImportRecord { index: usize, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SurveyResult<T> = Result<T, SurveyError>;

/// Configuration loading and validation failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value {value} for {parameter} (expected {valid_range})")]
    InvalidValue {
        parameter: String,
        value: String,
        valid_range: String,
    },

    #[error("Configuration failed validation: {}", .errors.join("; "))]
    Validation { errors: Vec<String> },

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn invalid(parameter: &str, value: impl ToString, valid_range: &str) -> Self {
        ConfigError::InvalidValue {
            parameter: parameter.to_string(),
            value: value.to_string(),
            valid_range: valid_range.to_string(),
        }
    }
}

/// How much an error affects the work in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Data may be lost
    Critical,
    /// The requested operation did not happen
    High,
    /// Input was partly skipped
    Medium,
    Low,
}

impl SurveyError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SurveyError::Io(_) | SurveyError::MalformedDocument { .. } => ErrorSeverity::Critical,
            SurveyError::Json(_) | SurveyError::Config(_) | SurveyError::SurveyNotFound { .. } => ErrorSeverity::High,
            SurveyError::InvalidSurveyId { .. } => ErrorSeverity::High,
            SurveyError::ImportRecord { .. } => ErrorSeverity::Medium,
            SurveyError::UnknownPoint { .. } | SurveyError::IndexOutOfRange { .. } => ErrorSeverity::Low,
        }
    }
}
