use crate::algorithms::polygon::{PolygonMetrics, DEFAULT_FALLBACK_EXTENT_M, DEFAULT_FALLBACK_MAX_LATITUDE_DEG};
use crate::algorithms::projection::Projector;
use crate::processing::aggregator::{SampleAggregator, DEFAULT_ACCURACY_THRESHOLD_M, DEFAULT_SAMPLE_COUNT};
use crate::staking::session::DEFAULT_TOLERANCE_DEG;
use crate::survey::repository::JsonFileRepository;
use crate::validation::error::{ConfigError, SurveyResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Largest collinearity tolerance accepted (degrees)
pub const MAX_TOLERANCE_DEG: f64 = 45.0;

/// Field application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Collinearity tolerance for staking (degrees)
    pub tolerance_degrees: f64,
    /// Reject points outside the tolerance instead of only recording the error
    pub strict_collinearity: bool,
    /// Averaged accuracy (m) above which the user is asked to confirm a point
    pub accuracy_threshold_m: f64,
    /// Fixes collected per averaging run
    pub averaging_sample_count: usize,
    /// Projection used for polygon area
    pub projection: Projector,
    /// Distance from the first vertex within which the tangent-plane path is trusted (m)
    pub max_fallback_extent_m: f64,
    /// Latitude limit for the tangent-plane path (degrees)
    pub max_fallback_latitude_deg: f64,
    /// Directory holding survey documents
    pub survey_dir: Option<PathBuf>,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            tolerance_degrees: DEFAULT_TOLERANCE_DEG,
            strict_collinearity: false,
            accuracy_threshold_m: DEFAULT_ACCURACY_THRESHOLD_M,
            averaging_sample_count: DEFAULT_SAMPLE_COUNT,
            projection: Projector::TrueProjection,
            max_fallback_extent_m: DEFAULT_FALLBACK_EXTENT_M,
            max_fallback_latitude_deg: DEFAULT_FALLBACK_MAX_LATITUDE_DEG,
            survey_dir: None,
        }
    }
}

impl FieldConfig {
    pub fn polygon_metrics(&self) -> PolygonMetrics {
        PolygonMetrics::new(self.projection)
            .with_fallback_limits(self.max_fallback_extent_m, self.max_fallback_latitude_deg)
    }

    pub fn sample_aggregator(&self) -> SampleAggregator {
        SampleAggregator::new(self.accuracy_threshold_m)
    }

    /// Repository over `survey_dir`, `None` when no directory is configured
    pub fn survey_repository(&self) -> SurveyResult<Option<JsonFileRepository>> {
        self.survey_dir.as_deref().map(JsonFileRepository::open).transpose()
    }
}

/// Configuration validation result
#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ConfigError>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ValidationResult {
    fn into_error(self) -> ConfigError {
        ConfigError::Validation {
            errors: self.errors.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Owns the active `FieldConfig` and its file location
#[derive(Debug, Default)]
pub struct ConfigurationManager {
    config: FieldConfig,
    config_file_path: Option<PathBuf>,
    is_modified: bool,
}

impl ConfigurationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration manager and load from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    /// Replace the whole configuration after validation
    pub fn update_config(&mut self, config: FieldConfig) -> Result<(), ConfigError> {
        let validation = Self::validate(&config);
        if !validation.is_valid {
            return Err(validation.into_error());
        }
        self.config = config;
        self.is_modified = true;
        Ok(())
    }

    /// Load configuration from a JSON file; missing fields take their defaults
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: FieldConfig = serde_json::from_str(&content)?;

        let validation = Self::validate(&config);
        for warning in &validation.warnings {
            log::warn!("{}: {}", path.as_ref().display(), warning);
        }
        if !validation.is_valid {
            return Err(validation.into_error());
        }

        self.config = config;
        self.config_file_path = Some(path.as_ref().to_path_buf());
        self.is_modified = false;
        log::info!("configuration loaded from {}", path.as_ref().display());
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(&self.config)?;
        fs::write(path.as_ref(), content)?;
        self.config_file_path = Some(path.as_ref().to_path_buf());
        self.is_modified = false;
        log::info!("configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Save to the currently loaded file path
    pub fn save(&mut self) -> Result<(), ConfigError> {
        match self.config_file_path.clone() {
            Some(path) => self.save_to_file(path),
            None => Err(ConfigError::invalid("config_file_path", "none", "a path set by load or save_to_file")),
        }
    }

    /// Check if configuration has been modified since last save
    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.config_file_path.as_deref()
    }

    // Runtime parameter adjustment; each setter returns the previous value

    pub fn set_tolerance(&mut self, tolerance_degrees: f64) -> Result<f64, ConfigError> {
        if !(0.0..=MAX_TOLERANCE_DEG).contains(&tolerance_degrees) {
            return Err(ConfigError::invalid("tolerance_degrees", tolerance_degrees, "0..=45"));
        }
        let old_value = std::mem::replace(&mut self.config.tolerance_degrees, tolerance_degrees);
        self.is_modified = true;
        Ok(old_value)
    }

    pub fn set_strict_collinearity(&mut self, strict: bool) -> bool {
        let old_value = std::mem::replace(&mut self.config.strict_collinearity, strict);
        self.is_modified = true;
        old_value
    }

    pub fn set_accuracy_threshold(&mut self, threshold_m: f64) -> Result<f64, ConfigError> {
        if !(threshold_m > 0.0 && threshold_m <= 1000.0) {
            return Err(ConfigError::invalid("accuracy_threshold_m", threshold_m, "(0, 1000]"));
        }
        let old_value = std::mem::replace(&mut self.config.accuracy_threshold_m, threshold_m);
        self.is_modified = true;
        Ok(old_value)
    }

    pub fn set_averaging_sample_count(&mut self, count: usize) -> Result<usize, ConfigError> {
        if count == 0 {
            return Err(ConfigError::invalid("averaging_sample_count", count, ">= 1"));
        }
        let old_value = std::mem::replace(&mut self.config.averaging_sample_count, count);
        self.is_modified = true;
        Ok(old_value)
    }

    pub fn set_fallback_extent(&mut self, extent_m: f64) -> Result<f64, ConfigError> {
        if !(extent_m > 0.0 && extent_m.is_finite()) {
            return Err(ConfigError::invalid("max_fallback_extent_m", extent_m, "positive"));
        }
        let old_value = std::mem::replace(&mut self.config.max_fallback_extent_m, extent_m);
        self.is_modified = true;
        Ok(old_value)
    }

    pub fn set_projection(&mut self, projection: Projector) -> Projector {
        let old_value = std::mem::replace(&mut self.config.projection, projection);
        self.is_modified = true;
        old_value
    }

    /// Validate a configuration without applying it
    pub fn validate(config: &FieldConfig) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut suggestions = Vec::new();

        if !(0.0..=MAX_TOLERANCE_DEG).contains(&config.tolerance_degrees) {
            errors.push(ConfigError::invalid("tolerance_degrees", config.tolerance_degrees, "0..=45"));
        } else if config.strict_collinearity && config.tolerance_degrees < 0.5 {
            warnings.push("Strict staking below 0.5 degrees rejects most GPS points".to_string());
            suggestions.push("Average several fixes per point or raise the tolerance".to_string());
        }

        if !(config.accuracy_threshold_m > 0.0 && config.accuracy_threshold_m <= 1000.0) {
            errors.push(ConfigError::invalid(
                "accuracy_threshold_m",
                config.accuracy_threshold_m,
                "(0, 1000]",
            ));
        }

        if config.averaging_sample_count == 0 {
            errors.push(ConfigError::invalid("averaging_sample_count", 0, ">= 1"));
        } else if config.averaging_sample_count > 300 {
            warnings.push("Averaging more than 300 fixes keeps the user waiting for minutes".to_string());
        }

        if !(config.max_fallback_extent_m > 0.0 && config.max_fallback_extent_m.is_finite()) {
            errors.push(ConfigError::invalid(
                "max_fallback_extent_m",
                config.max_fallback_extent_m,
                "positive",
            ));
        } else if config.max_fallback_extent_m > 50_000.0 {
            warnings.push("Tangent-plane areas degrade noticeably beyond 50 km".to_string());
        }

        if !(0.0..=90.0).contains(&config.max_fallback_latitude_deg) {
            errors.push(ConfigError::invalid(
                "max_fallback_latitude_deg",
                config.max_fallback_latitude_deg,
                "0..=90",
            ));
        }

        if !config.projection.is_true_projection() {
            suggestions.push("Use transverse_mercator for survey-grade areas".to_string());
        }

        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            suggestions,
        }
    }
}
