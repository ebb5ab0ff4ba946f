//! Host-facing interfaces: the event-driven controller and report output

pub mod controller;
pub mod report;

pub use controller::{CallbackHandle, EventCallback, FieldController, FieldEvent, PointInteractionHandler};
pub use report::{JsonFormatter, PointRow, SurveyReport, TextFormatter};
