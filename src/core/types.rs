//! Core data types for survey points and position fixes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static POINT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Stable identifier of a point within a survey
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(String);

impl PointId {
    pub fn new(id: impl Into<String>) -> Self {
        PointId(id.into())
    }

    /// Generate a process-unique id from the capture clock and a counter
    pub fn generate() -> Self {
        let seq = POINT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        PointId(format!("pt-{:x}-{}", Utc::now().timestamp_millis(), seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for PointId {
    fn from(id: &str) -> Self {
        PointId(id.to_string())
    }
}

impl From<String> for PointId {
    fn from(id: String) -> Self {
        PointId(id)
    }
}

/// How a point entered the survey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    /// Acquired from a GPS fix (possibly averaged)
    Gps,
    /// Placed by hand on the map
    Manual,
    /// Placed along a staking line
    Staked,
    /// Snapped onto a baseline between two existing points
    Intermediate,
    /// Corner of a staked figure
    Corner,
}

impl fmt::Display for PointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PointKind::Gps => "gps",
            PointKind::Manual => "manual",
            PointKind::Staked => "staked",
            PointKind::Intermediate => "intermediate",
            PointKind::Corner => "corner",
        };
        f.pad(name)
    }
}

/// Side of the reference line an achieved bearing falls on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    /// `Right` for a strictly positive signed difference, otherwise `Left`
    pub fn from_signed_difference(diff_deg: f64) -> Self {
        if diff_deg > 0.0 {
            TurnDirection::Right
        } else {
            TurnDirection::Left
        }
    }
}

/// Non-finite coordinates are stored as `null` and read back as NaN
mod coordinate {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

/// A surveyed point in WGS84 geodetic coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub id: PointId,
    /// Latitude in decimal degrees
    #[serde(with = "coordinate")]
    pub lat: f64,
    /// Longitude in decimal degrees
    #[serde(with = "coordinate")]
    pub lng: f64,
    /// Altitude above the ellipsoid (m)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Horizontal accuracy, 1-sigma (m)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    pub kind: PointKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Bearing from the preceding point (degrees, [0,360))
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearing_from_previous: Option<f64>,
    /// Distance from the preceding point (m)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_from_previous: Option<f64>,
    /// Deviation from the staking reference bearing at capture (degrees)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collinearity_error: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_direction: Option<TurnDirection>,
}

impl GeoPoint {
    /// Create a point with a fresh id captured now
    pub fn new(lat: f64, lng: f64, kind: PointKind) -> Self {
        Self::with_id(PointId::generate(), lat, lng, kind)
    }

    pub fn with_id(id: PointId, lat: f64, lng: f64, kind: PointKind) -> Self {
        Self {
            id,
            lat,
            lng,
            altitude: None,
            accuracy: None,
            kind,
            timestamp: Utc::now(),
            label: None,
            bearing_from_previous: None,
            distance_from_previous: None,
            collinearity_error: None,
            turn_direction: None,
        }
    }

    pub fn accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy = Some(accuracy_m);
        self
    }

    pub fn altitude(mut self, altitude_m: f64) -> Self {
        self.altitude = Some(altitude_m);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn captured_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Finite and inside the WGS84 coordinate ranges
    pub fn is_valid(&self) -> bool {
        is_valid_coordinate(self.lat, self.lng)
    }

    /// Drop the fields computed relative to the preceding point
    pub fn clear_derived(&mut self) {
        self.bearing_from_previous = None;
        self.distance_from_previous = None;
        self.collinearity_error = None;
        self.turn_direction = None;
    }
}

/// Latitude in [-90, 90], longitude in [-180, 180], both finite
pub fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
    lat.is_finite() && lng.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

/// One raw position fix from the location provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub lat: f64,
    pub lng: f64,
    /// Reported horizontal accuracy (m)
    #[serde(default)]
    pub accuracy_m: Option<f64>,
    #[serde(default)]
    pub altitude_m: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl PositionFix {
    pub fn new(lat: f64, lng: f64, accuracy_m: Option<f64>) -> Self {
        Self {
            lat,
            lng,
            accuracy_m,
            altitude_m: None,
            timestamp: Utc::now(),
        }
    }

    pub fn altitude(mut self, altitude_m: f64) -> Self {
        self.altitude_m = Some(altitude_m);
        self
    }

    pub fn is_valid(&self) -> bool {
        is_valid_coordinate(self.lat, self.lng)
    }
}
