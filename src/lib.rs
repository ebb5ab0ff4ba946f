//! Field survey geometry and staking
//!
//! Distances, bearings, polygon area and perimeter for points captured in the
//! field, plus the staking engine that keeps new points on a straight line or
//! a chosen baseline and the aggregator that averages repeated GPS fixes.

pub mod algorithms;
pub mod api;
pub mod core;
pub mod processing;
pub mod staking;
pub mod survey;
pub mod utils;
pub mod validation;

// Re-export commonly used types
pub use crate::core::{GeoPoint, PointId, PointKind, PositionFix, TurnDirection, EARTH_RADIUS_M};
pub use algorithms::geodesy::{bearing, distance, format_bearing, normalize_angle};
pub use algorithms::{MetricPath, PolygonMetrics, PolygonSummary, Projector};
pub use api::{FieldController, FieldEvent, PointInteractionHandler, SurveyReport};
pub use processing::{aggregate, AggregatedPoint, AveragingWindow, SampleAggregator};
pub use staking::{CrossTrack, StakeOutcome, StakingConfig, StakingEngine, StakingPhase};
pub use survey::{InMemoryRepository, JsonFileRepository, PointSequence, Survey, SurveyRepository};
pub use utils::{ConfigurationManager, FieldConfig};
pub use validation::{ConfigError, SurveyError, SurveyResult};
