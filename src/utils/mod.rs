//! Configuration

pub mod config;

pub use config::{ConfigurationManager, FieldConfig, ValidationResult};
