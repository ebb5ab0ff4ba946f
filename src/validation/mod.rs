//! Error taxonomy and import validation

pub mod error;
pub mod import;

pub use error::{ConfigError, ErrorSeverity, SurveyError, SurveyResult};
pub use import::{import_points, import_str, normalize_kind, ImportIssue, ImportReport};
