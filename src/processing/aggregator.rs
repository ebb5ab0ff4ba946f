use crate::core::{GeoPoint, PointKind, PositionFix};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of fixes collected by an averaging window
pub const DEFAULT_SAMPLE_COUNT: usize = 10;

/// Default accuracy (m) above which an averaged point is flagged
pub const DEFAULT_ACCURACY_THRESHOLD_M: f64 = 5.0;

/// Accuracy-weighted combination of repeated position fixes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPoint {
    /// Weighted mean latitude
    pub lat: f64,
    /// Weighted mean longitude
    pub lng: f64,
    /// Weighted mean altitude over the fixes that carry one
    pub altitude: Option<f64>,
    /// Unweighted mean of the reported accuracies
    pub accuracy: Option<f64>,
    /// Number of valid fixes combined
    pub sample_count: usize,
    /// Timestamp of the last fix
    pub timestamp: DateTime<Utc>,
}

impl AggregatedPoint {
    /// True when the mean accuracy is worse than `threshold_m`
    ///
    /// Unknown accuracy never exceeds; the caller decides whether to keep the point.
    pub fn exceeds_threshold(&self, threshold_m: f64) -> bool {
        matches!(self.accuracy, Some(acc) if acc > threshold_m)
    }

    pub fn into_point(self, kind: PointKind) -> GeoPoint {
        let mut point = GeoPoint::new(self.lat, self.lng, kind).captured_at(self.timestamp);
        point.altitude = self.altitude;
        point.accuracy = self.accuracy;
        point
    }
}

/// Weight of a fix: `1/accuracy²`, or 1 when accuracy is missing, zero or not finite
fn weight(accuracy_m: Option<f64>) -> f64 {
    match accuracy_m {
        Some(acc) if acc.is_finite() && acc > 0.0 => 1.0 / (acc * acc),
        _ => 1.0,
    }
}

/// Combine fixes into one position; `None` when no valid fix is given
pub fn aggregate(fixes: &[PositionFix]) -> Option<AggregatedPoint> {
    let valid: Vec<&PositionFix> = fixes.iter().filter(|f| f.is_valid()).collect();
    if valid.len() < fixes.len() {
        log::debug!("skipping {} invalid fixes", fixes.len() - valid.len());
    }
    let last = valid.last()?;

    let mut weight_sum = 0.0;
    let mut lat_sum = 0.0;
    let mut lng_sum = 0.0;
    let mut alt_weight = 0.0;
    let mut alt_sum = 0.0;
    let mut acc_sum = 0.0;
    let mut acc_count = 0usize;

    for fix in &valid {
        let w = weight(fix.accuracy_m);
        weight_sum += w;
        lat_sum += fix.lat * w;
        lng_sum += fix.lng * w;
        if let Some(alt) = fix.altitude_m.filter(|a| a.is_finite()) {
            alt_weight += w;
            alt_sum += alt * w;
        }
        if let Some(acc) = fix.accuracy_m.filter(|a| a.is_finite()) {
            acc_sum += acc;
            acc_count += 1;
        }
    }

    Some(AggregatedPoint {
        lat: lat_sum / weight_sum,
        lng: lng_sum / weight_sum,
        altitude: (alt_weight > 0.0).then(|| alt_sum / alt_weight),
        accuracy: (acc_count > 0).then(|| acc_sum / acc_count as f64),
        sample_count: valid.len(),
        timestamp: last.timestamp,
    })
}

/// Sample aggregator with a configured warning threshold
#[derive(Debug, Clone, PartialEq)]
pub struct SampleAggregator {
    /// Accuracy (m) above which results are flagged
    pub accuracy_threshold_m: f64,
}

impl Default for SampleAggregator {
    fn default() -> Self {
        Self {
            accuracy_threshold_m: DEFAULT_ACCURACY_THRESHOLD_M,
        }
    }
}

impl SampleAggregator {
    pub fn new(accuracy_threshold_m: f64) -> Self {
        Self { accuracy_threshold_m }
    }

    /// Aggregate and warn when the result is worse than the threshold
    pub fn aggregate(&self, fixes: &[PositionFix]) -> Option<AggregatedPoint> {
        let result = aggregate(fixes)?;
        if result.exceeds_threshold(self.accuracy_threshold_m) {
            log::warn!(
                "averaged accuracy {:.2} m exceeds threshold {:.2} m",
                result.accuracy.unwrap_or_default(),
                self.accuracy_threshold_m
            );
        }
        Some(result)
    }

    pub fn exceeds_threshold(&self, point: &AggregatedPoint) -> bool {
        point.exceeds_threshold(self.accuracy_threshold_m)
    }
}

/// Collects fixes for one averaging run
///
/// The window completes at `target_count` fixes; stopping early keeps what was
/// collected so far.
#[derive(Debug, Clone)]
pub struct AveragingWindow {
    target_count: usize,
    fixes: Vec<PositionFix>,
    stopped: bool,
}

impl AveragingWindow {
    pub fn new(target_count: usize) -> Self {
        let target_count = target_count.max(1);
        Self {
            target_count,
            fixes: Vec::with_capacity(target_count),
            stopped: false,
        }
    }

    /// Add a fix; returns `true` once the window is complete
    ///
    /// Fixes arriving after completion are ignored.
    pub fn push(&mut self, fix: PositionFix) -> bool {
        if !self.is_complete() {
            self.fixes.push(fix);
        }
        self.is_complete()
    }

    /// End collection early, truncating the set to what was collected
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_complete(&self) -> bool {
        self.stopped || self.fixes.len() >= self.target_count
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    /// Collection progress in [0, 1]
    pub fn progress(&self) -> f64 {
        (self.fixes.len() as f64 / self.target_count as f64).min(1.0)
    }

    pub fn fixes(&self) -> &[PositionFix] {
        &self.fixes
    }

    pub fn finish(self) -> Option<AggregatedPoint> {
        aggregate(&self.fixes)
    }
}
