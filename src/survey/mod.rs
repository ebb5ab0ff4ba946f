//! Surveys, their point sequences and persistence

pub mod model;
pub mod repository;
pub mod sequence;

pub use model::{validate_survey_id, Survey, SurveyListing};
pub use repository::{InMemoryRepository, JsonFileRepository, SurveyRepository};
pub use sequence::PointSequence;
