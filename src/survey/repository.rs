//! Survey persistence
//!
//! The field controller only sees the `SurveyRepository` trait. Two
//! implementations exist: one JSON document per survey in a directory, and an
//! in-memory map for tests and embedding hosts that persist elsewhere.

use crate::survey::model::{validate_survey_id, Survey, SurveyListing};
use crate::validation::error::{SurveyError, SurveyResult};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub trait SurveyRepository {
    fn load(&self, id: &str) -> SurveyResult<Survey>;
    fn save(&mut self, survey: &Survey) -> SurveyResult<()>;
    /// Listings sorted by id
    fn list(&self) -> SurveyResult<Vec<SurveyListing>>;
    fn delete(&mut self, id: &str) -> SurveyResult<()>;
}

/// One `<id>.json` document per survey
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    dir: PathBuf,
}

impl JsonFileRepository {
    /// Open a repository directory, creating it when missing
    pub fn open<P: AsRef<Path>>(dir: P) -> SurveyResult<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> SurveyResult<PathBuf> {
        validate_survey_id(id)?;
        Ok(self.dir.join(format!("{}.json", id)))
    }

    fn not_found(id: &str, err: std::io::Error) -> SurveyError {
        if err.kind() == ErrorKind::NotFound {
            SurveyError::SurveyNotFound { id: id.to_string() }
        } else {
            SurveyError::Io(err)
        }
    }
}

impl SurveyRepository for JsonFileRepository {
    fn load(&self, id: &str) -> SurveyResult<Survey> {
        let path = self.path_for(id)?;
        let content = fs::read_to_string(&path).map_err(|e| Self::not_found(id, e))?;
        let document: serde_json::Value = serde_json::from_str(&content)?;
        let (survey, issues) = Survey::from_document(document, id)?;
        if !issues.is_empty() {
            log::warn!("survey {} loaded with {} import issues", id, issues.len());
        }
        Ok(survey)
    }

    /// Write to a temporary sibling file, then rename over the target
    fn save(&mut self, survey: &Survey) -> SurveyResult<()> {
        let path = self.path_for(&survey.id)?;
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(survey)?;
        fs::write(&tmp, content)?;
        if let Err(err) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }
        log::info!("saved survey {} ({} points) to {}", survey.id, survey.points.len(), path.display());
        Ok(())
    }

    fn list(&self) -> SurveyResult<Vec<SurveyListing>> {
        let mut listings = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.load(id) {
                Ok(survey) => listings.push(SurveyListing::from(&survey)),
                Err(err) => log::warn!("skipping {}: {}", path.display(), err),
            }
        }
        listings.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(listings)
    }

    fn delete(&mut self, id: &str) -> SurveyResult<()> {
        let path = self.path_for(id)?;
        fs::remove_file(&path).map_err(|e| Self::not_found(id, e))?;
        log::info!("deleted survey {}", id);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    surveys: BTreeMap<String, Survey>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.surveys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surveys.is_empty()
    }
}

impl SurveyRepository for InMemoryRepository {
    fn load(&self, id: &str) -> SurveyResult<Survey> {
        self.surveys
            .get(id)
            .cloned()
            .ok_or_else(|| SurveyError::SurveyNotFound { id: id.to_string() })
    }

    fn save(&mut self, survey: &Survey) -> SurveyResult<()> {
        validate_survey_id(&survey.id)?;
        self.surveys.insert(survey.id.clone(), survey.clone());
        Ok(())
    }

    fn list(&self) -> SurveyResult<Vec<SurveyListing>> {
        Ok(self.surveys.values().map(SurveyListing::from).collect())
    }

    fn delete(&mut self, id: &str) -> SurveyResult<()> {
        self.surveys
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| SurveyError::SurveyNotFound { id: id.to_string() })
    }
}
