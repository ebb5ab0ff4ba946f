//! Normalization of loosely-typed point records
//!
//! Survey files written by older clients disagree on field names and value
//! types. Records are read as `serde_json::Value` and mapped onto `GeoPoint`;
//! anything that can be repaired is repaired and reported, anything that can't
//! is skipped and reported. Points with out-of-range coordinates are kept so the
//! user can see and fix them; metrics exclude them.

use crate::core::{GeoPoint, PointId, PointKind, TurnDirection};
use crate::validation::error::{SurveyError, SurveyResult};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const ID_KEYS: &[&str] = &["id", "pointId", "point_id"];
const LAT_KEYS: &[&str] = &["lat", "latitude"];
const LNG_KEYS: &[&str] = &["lng", "lon", "long", "longitude"];
const KIND_KEYS: &[&str] = &["kind", "type", "pointType", "point_type", "source"];
const ALT_KEYS: &[&str] = &["altitude", "alt", "elevation"];
const ACCURACY_KEYS: &[&str] = &["accuracy", "accuracy_m", "hdop"];
const LABEL_KEYS: &[&str] = &["label", "name", "note"];
const TIME_KEYS: &[&str] = &["timestamp", "time", "capturedAt", "captured_at"];
const COLLINEARITY_KEYS: &[&str] = &["collinearity_error", "collinearityError"];
const TURN_KEYS: &[&str] = &["turn_direction", "turnDirection"];

/// Something the importer noticed about one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ImportIssue {
    /// Coordinates outside WGS84 ranges; the point is kept but ignored by metrics
    InvalidCoordinate { index: usize, lat: f64, lng: f64 },
    /// Kind string not recognized, imported as manual
    UnknownKind { index: usize, value: String },
    /// No usable id, a fresh one was generated
    GeneratedId { index: usize },
    /// Id already used by an earlier record, a fresh one was generated
    DuplicateId { index: usize, id: PointId },
    /// Timestamp missing or unparseable, import time used
    MissingTimestamp { index: usize },
    /// Record dropped entirely
    Skipped { index: usize, reason: String },
}

impl ImportIssue {
    pub fn index(&self) -> usize {
        match self {
            ImportIssue::InvalidCoordinate { index, .. }
            | ImportIssue::UnknownKind { index, .. }
            | ImportIssue::GeneratedId { index }
            | ImportIssue::DuplicateId { index, .. }
            | ImportIssue::MissingTimestamp { index }
            | ImportIssue::Skipped { index, .. } => *index,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub points: Vec<GeoPoint>,
    pub issues: Vec<ImportIssue>,
}

impl ImportReport {
    pub fn skipped(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| matches!(i, ImportIssue::Skipped { .. }))
            .count()
    }

    pub fn invalid_points(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| matches!(i, ImportIssue::InvalidCoordinate { .. }))
            .count()
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Map a free-form kind string onto a `PointKind`
///
/// Case, surrounding whitespace, dashes and spaces are ignored.
pub fn normalize_kind(raw: &str) -> Option<PointKind> {
    let key: String = raw
        .trim()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_lowercase() })
        .collect();
    match key.as_str() {
        "gps" | "gnss" | "auto" | "recorded" | "gps_point" => Some(PointKind::Gps),
        "manual" | "tap" | "placed" | "map" => Some(PointKind::Manual),
        "stake" | "staked" | "staking" => Some(PointKind::Staked),
        "intermediate" | "snapped" | "baseline" => Some(PointKind::Intermediate),
        "corner" | "vertex" => Some(PointKind::Corner),
        _ => None,
    }
}

fn field<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| record.get(*k)).filter(|v| !v.is_null())
}

/// Numbers or numeric strings
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A coordinate field: `None` when absent or unreadable, NaN when explicitly null
fn coordinate(record: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    match keys.iter().find_map(|k| record.get(*k))? {
        Value::Null => Some(f64::NAN),
        value => number(value),
    }
}

fn id_of(value: &Value) -> Option<PointId> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(PointId::new(s.trim())),
        Value::Number(n) => Some(PointId::new(n.to_string())),
        _ => None,
    }
}

/// RFC 3339 strings or epoch milliseconds
fn timestamp_of(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

fn turn_of(value: &Value) -> Option<TurnDirection> {
    match value.as_str()?.trim().to_ascii_lowercase().as_str() {
        "left" | "l" => Some(TurnDirection::Left),
        "right" | "r" => Some(TurnDirection::Right),
        _ => None,
    }
}

/// Normalize one record
///
/// Fails only when the record is not an object or has no readable coordinates.
pub fn import_point(index: usize, value: &Value) -> SurveyResult<(GeoPoint, Vec<ImportIssue>)> {
    let record = value.as_object().ok_or_else(|| SurveyError::ImportRecord {
        index,
        reason: "record is not an object".to_string(),
    })?;

    let lat = coordinate(record, LAT_KEYS);
    let lng = coordinate(record, LNG_KEYS);
    let (lat, lng) = match (lat, lng) {
        (Some(lat), Some(lng)) => (lat, lng),
        _ => {
            return Err(SurveyError::ImportRecord {
                index,
                reason: "missing latitude or longitude".to_string(),
            })
        }
    };

    let mut issues = Vec::new();

    let kind = match field(record, KIND_KEYS).and_then(Value::as_str) {
        Some(raw) => normalize_kind(raw).unwrap_or_else(|| {
            issues.push(ImportIssue::UnknownKind {
                index,
                value: raw.to_string(),
            });
            PointKind::Manual
        }),
        None => PointKind::Manual,
    };

    let id = match field(record, ID_KEYS).and_then(id_of) {
        Some(id) => id,
        None => {
            issues.push(ImportIssue::GeneratedId { index });
            PointId::generate()
        }
    };

    let mut point = GeoPoint::with_id(id, lat, lng, kind);
    point.altitude = field(record, ALT_KEYS).and_then(number);
    point.accuracy = field(record, ACCURACY_KEYS).and_then(number);
    point.label = field(record, LABEL_KEYS)
        .and_then(Value::as_str)
        .map(str::to_string);
    point.collinearity_error = field(record, COLLINEARITY_KEYS).and_then(number);
    point.turn_direction = field(record, TURN_KEYS).and_then(turn_of);

    match field(record, TIME_KEYS).and_then(timestamp_of) {
        Some(ts) => point.timestamp = ts,
        None => issues.push(ImportIssue::MissingTimestamp { index }),
    }

    if !point.is_valid() {
        issues.push(ImportIssue::InvalidCoordinate { index, lat, lng });
    }

    Ok((point, issues))
}

/// Normalize a whole document: a bare array of records or an object with `points`
pub fn import_points(document: &Value) -> SurveyResult<ImportReport> {
    let records = match document {
        Value::Array(records) => records,
        Value::Object(obj) => obj
            .get("points")
            .and_then(Value::as_array)
            .ok_or_else(|| SurveyError::MalformedDocument {
                reason: "object has no `points` array".to_string(),
            })?,
        _ => {
            return Err(SurveyError::MalformedDocument {
                reason: "expected an array or an object".to_string(),
            })
        }
    };

    let mut report = ImportReport::default();
    for (index, record) in records.iter().enumerate() {
        match import_point(index, record) {
            Ok((mut point, issues)) => {
                report.issues.extend(issues);
                if report.points.iter().any(|p| p.id == point.id) {
                    report.issues.push(ImportIssue::DuplicateId {
                        index,
                        id: point.id.clone(),
                    });
                    point.id = PointId::generate();
                }
                report.points.push(point);
            }
            Err(err) => {
                log::warn!("{}", err);
                report.issues.push(ImportIssue::Skipped {
                    index,
                    reason: err.to_string(),
                });
            }
        }
    }

    log::info!(
        "imported {} points ({} issues, {} skipped)",
        report.points.len(),
        report.issues.len(),
        report.skipped()
    );
    Ok(report)
}

pub fn import_str(json: &str) -> SurveyResult<ImportReport> {
    let document: Value = serde_json::from_str(json)?;
    import_points(&document)
}
