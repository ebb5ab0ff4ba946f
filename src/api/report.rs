//! Survey report output
//!
//! A `SurveyReport` carries everything exporters need (per-point rows with
//! formatted bearings, area in several units, perimeter) so they never repeat
//! geodetic math. Rendering to text or JSON is done by the formatters below.

use crate::algorithms::geodesy::format_bearing;
use crate::algorithms::polygon::{MetricPath, PolygonMetrics};
use crate::algorithms::projection::Projector;
use crate::core::{GeoPoint, PointKind, TurnDirection, SQUARE_METERS_PER_ACRE, SQUARE_METERS_PER_HECTARE};
use crate::survey::model::Survey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// One report line per surveyed point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRow {
    /// 1-based position in the sequence
    pub number: usize,
    pub id: String,
    pub kind: PointKind,
    pub lat: f64,
    pub lng: f64,
    pub accuracy_m: Option<f64>,
    pub altitude_m: Option<f64>,
    pub distance_from_previous_m: Option<f64>,
    pub bearing_from_previous: Option<f64>,
    /// Compass form of the bearing, e.g. `NE 45°0'`
    pub bearing_formatted: Option<String>,
    pub collinearity_error: Option<f64>,
    pub turn_direction: Option<TurnDirection>,
    pub label: Option<String>,
    pub valid: bool,
    pub timestamp: DateTime<Utc>,
}

impl PointRow {
    fn from_point(number: usize, point: &GeoPoint) -> Self {
        Self {
            number,
            id: point.id.to_string(),
            kind: point.kind,
            lat: point.lat,
            lng: point.lng,
            accuracy_m: point.accuracy,
            altitude_m: point.altitude,
            distance_from_previous_m: point.distance_from_previous,
            bearing_from_previous: point.bearing_from_previous,
            bearing_formatted: point.bearing_from_previous.map(format_bearing),
            collinearity_error: point.collinearity_error,
            turn_direction: point.turn_direction,
            label: point.label.clone(),
            valid: point.is_valid(),
            timestamp: point.timestamp,
        }
    }
}

/// Survey summary for exporters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyReport {
    pub survey_id: String,
    pub name: String,
    pub generated_at: DateTime<Utc>,
    pub projection: Projector,
    pub metric_path: MetricPath,
    pub within_valid_region: bool,
    pub area_m2: f64,
    pub area_hectares: f64,
    pub area_acres: f64,
    pub perimeter_m: f64,
    /// Points used for area and perimeter
    pub vertex_count: usize,
    /// Points excluded for invalid coordinates
    pub invalid_point_count: usize,
    pub points: Vec<PointRow>,
}

impl SurveyReport {
    pub fn build(survey: &Survey, metrics: &PolygonMetrics) -> Self {
        let summary = survey.summary(metrics);
        let points: Vec<PointRow> = survey
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| PointRow::from_point(i + 1, p))
            .collect();
        let invalid_point_count = points.iter().filter(|r| !r.valid).count();

        Self {
            survey_id: survey.id.clone(),
            name: survey.name.clone(),
            generated_at: Utc::now(),
            projection: metrics.projector(),
            metric_path: summary.path,
            within_valid_region: summary.within_valid_region,
            area_m2: summary.area_m2,
            area_hectares: summary.area_m2 / SQUARE_METERS_PER_HECTARE,
            area_acres: summary.area_m2 / SQUARE_METERS_PER_ACRE,
            perimeter_m: summary.perimeter_m,
            vertex_count: summary.vertex_count,
            invalid_point_count,
            points,
        }
    }
}

/// Human-readable text formatter
#[derive(Debug, Clone, Default)]
pub struct TextFormatter {
    /// Summary only, no point table
    pub compact: bool,
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compact() -> Self {
        Self { compact: true }
    }

    pub fn format_text(&self, report: &SurveyReport) -> String {
        let mut out = String::new();
        if self.compact {
            let _ = write!(
                out,
                "{}: {:.1} m² ({:.4} ha), perimeter {:.1} m, {} points",
                report.name, report.area_m2, report.area_hectares, report.perimeter_m, report.vertex_count
            );
            return out;
        }

        let _ = writeln!(out, "Survey: {} ({})", report.name, report.survey_id);
        let _ = writeln!(out, "  Area:      {:.1} m²", report.area_m2);
        let _ = writeln!(out, "             {:.4} ha", report.area_hectares);
        let _ = writeln!(out, "             {:.4} ac", report.area_acres);
        let _ = writeln!(out, "  Perimeter: {:.1} m", report.perimeter_m);
        let _ = writeln!(out, "  Points:    {}", report.vertex_count);
        if report.invalid_point_count > 0 {
            let _ = writeln!(out, "  Excluded:  {} invalid", report.invalid_point_count);
        }
        if !report.within_valid_region {
            let _ = writeln!(out, "  Warning:   area computed outside the tangent-plane valid region");
        }

        let _ = writeln!(out, "\nPoints:");
        for row in &report.points {
            let _ = write!(out, "  {:>3} {:<12} {:>11.6} {:>11.6} {:<12}", row.number, row.id, row.lat, row.lng, row.kind);
            if let (Some(d), Some(b)) = (row.distance_from_previous_m, &row.bearing_formatted) {
                let _ = write!(out, " {:>9.2} m  {}", d, b);
            }
            if let (Some(err), Some(turn)) = (row.collinearity_error, row.turn_direction) {
                let _ = write!(out, "  ({:.2}° {:?})", err, turn);
            }
            if !row.valid {
                let _ = write!(out, "  [invalid]");
            }
            out.push('\n');
        }
        out
    }
}

/// JSON formatter for structured output
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn format_json(&self, report: &SurveyReport) -> Result<String, serde_json::Error> {
        if self.pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::geodesy::destination;
    use crate::core::PointId;

    /// 100 m x 50 m rectangle plus one invalid point
    fn survey() -> Survey {
        let mut survey = Survey::with_id("rect", "Rectangle");
        let (lat0, lng0) = (45.0, 7.0);
        let (lat1, lng1) = destination(lat0, lng0, 90.0, 100.0);
        let (lat2, lng2) = destination(lat1, lng1, 0.0, 50.0);
        let (lat3, lng3) = destination(lat0, lng0, 0.0, 50.0);
        for (id, lat, lng) in [("a", lat0, lng0), ("b", lat1, lng1), ("c", lat2, lng2), ("d", lat3, lng3)] {
            survey.points.push(GeoPoint::with_id(PointId::new(id), lat, lng, PointKind::Gps));
        }
        survey.points.push(GeoPoint::with_id(PointId::new("x"), 91.0, 7.0, PointKind::Manual));
        survey
    }

    #[test]
    fn test_report_units_and_rows() {
        let report = SurveyReport::build(&survey(), &PolygonMetrics::default());
        assert!((report.area_m2 - 5000.0).abs() < 5.0, "area {}", report.area_m2);
        assert!((report.area_hectares - 0.5).abs() < 0.001);
        assert!((report.area_acres - report.area_m2 / 4046.8564224).abs() < 1e-9);
        assert!((report.perimeter_m - 300.0).abs() < 0.5);
        assert_eq!(report.vertex_count, 4);
        assert_eq!(report.invalid_point_count, 1);
        assert_eq!(report.points.len(), 5);

        let b = &report.points[1];
        assert_eq!(b.number, 2);
        assert_eq!(b.bearing_formatted.as_deref().map(|s| s.starts_with("E ")), Some(true));
        assert!(report.points[0].bearing_formatted.is_none());
        assert!(!report.points[4].valid);
    }

    #[test]
    fn test_text_output() {
        let report = SurveyReport::build(&survey(), &PolygonMetrics::default());
        let text = TextFormatter::new().format_text(&report);
        assert!(text.starts_with("Survey: Rectangle (rect)"));
        assert!(text.contains("Excluded:  1 invalid"));
        assert!(text.contains("[invalid]"));

        let compact = TextFormatter::compact().format_text(&report);
        assert!(compact.starts_with("Rectangle: "));
        assert!(!compact.contains('\n'));
    }

    #[test]
    fn test_json_output() {
        let report = SurveyReport::build(&survey(), &PolygonMetrics::new(Projector::ApproximateFallback));
        let json = JsonFormatter::new().format_json(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["projection"], "approximate");
        assert_eq!(value["points"].as_array().map(Vec::len), Some(5));
        assert!(JsonFormatter::pretty().format_json(&report).unwrap().contains('\n'));
    }
}
