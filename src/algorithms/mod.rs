//! Geodetic and planar geometry

pub mod geodesy;
pub mod polygon;
pub mod projection;

pub use polygon::{MetricPath, PolygonMetrics, PolygonSummary};
pub use projection::{Hemisphere, PlanarCoordinate, Projector};
