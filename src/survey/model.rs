use crate::algorithms::polygon::{PolygonMetrics, PolygonSummary};
use crate::survey::sequence::PointSequence;
use crate::validation::error::{SurveyError, SurveyResult};
use crate::validation::import::{import_points, ImportIssue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named survey and its point sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub points: PointSequence,
}

impl Survey {
    /// New empty survey with a time-based id
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self::with_id(format!("survey-{}", now.format("%Y%m%d-%H%M%S%3f")), name)
    }

    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            created_at: now,
            updated_at: now,
            notes: None,
            points: PointSequence::new(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn summary(&self, metrics: &PolygonMetrics) -> PolygonSummary {
        metrics.summarize(self.points.points())
    }

    /// Build a survey from a stored document
    ///
    /// Documents in the current layout are read directly; anything else goes
    /// through import normalization and the issues are returned alongside.
    pub fn from_document(document: Value, fallback_id: &str) -> SurveyResult<(Self, Vec<ImportIssue>)> {
        let raw = document.clone();
        match serde_json::from_value::<Survey>(document) {
            Ok(mut survey) => {
                survey.points.rederive();
                Ok((survey, Vec::new()))
            }
            Err(strict_err) => {
                log::debug!("survey {} not in current layout ({}), normalizing", fallback_id, strict_err);
                let report = import_points(&raw)?;
                let field = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);

                let mut survey = Survey::with_id(field("id").unwrap_or_else(|| fallback_id.to_string()), "");
                survey.name = field("name").unwrap_or_else(|| survey.id.clone());
                survey.notes = field("notes");
                if let Some(created) = report.points.iter().map(|p| p.timestamp).min() {
                    survey.created_at = created;
                }
                survey.points = PointSequence::from_points(report.points);
                Ok((survey, report.issues))
            }
        }
    }
}

/// Short description of a stored survey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyListing {
    pub id: String,
    pub name: String,
    pub point_count: usize,
    pub updated_at: DateTime<Utc>,
}

impl From<&Survey> for SurveyListing {
    fn from(survey: &Survey) -> Self {
        Self {
            id: survey.id.clone(),
            name: survey.name.clone(),
            point_count: survey.points.len(),
            updated_at: survey.updated_at,
        }
    }
}

/// Survey ids double as file names
pub fn validate_survey_id(id: &str) -> SurveyResult<()> {
    let reason = if id.is_empty() {
        Some("empty")
    } else if id.len() > 128 {
        Some("longer than 128 characters")
    } else if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        Some("only ASCII letters, digits, '-' and '_' are allowed")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(SurveyError::InvalidSurveyId {
            id: id.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}
