//! Ordered survey points with derived leg geometry
//!
//! Each point's bearing and distance are measured from the nearest valid point
//! before it. Edits rebuild every derived field in one pass over a working copy
//! and then swap it in, so readers never observe a half-updated sequence.
//! Collinearity error and turn direction describe the moment a point was
//! staked and are carried through re-derivation untouched.

use crate::algorithms::geodesy::{bearing, distance};
use crate::core::{GeoPoint, PointId, PointKind};
use crate::validation::error::{SurveyError, SurveyResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointSequence {
    points: Vec<GeoPoint>,
}

/// Recompute bearing/distance for every point of `points` in place
fn derive_legs(points: &mut [GeoPoint]) {
    let mut previous: Option<(f64, f64)> = None;
    for point in points.iter_mut() {
        point.bearing_from_previous = None;
        point.distance_from_previous = None;
        if !point.is_valid() {
            continue;
        }
        if let Some((lat, lng)) = previous {
            point.bearing_from_previous = Some(bearing(lat, lng, point.lat, point.lng));
            point.distance_from_previous = Some(distance(lat, lng, point.lat, point.lng));
        }
        previous = Some((point.lat, point.lng));
    }
}

impl PointSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `points` and derive their legs
    pub fn from_points(points: Vec<GeoPoint>) -> Self {
        let mut sequence = Self { points };
        sequence.rederive();
        sequence
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<GeoPoint> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GeoPoint> {
        self.points.iter()
    }

    pub fn get(&self, id: &PointId) -> Option<&GeoPoint> {
        self.points.iter().find(|p| &p.id == id)
    }

    pub fn index_of(&self, id: &PointId) -> Option<usize> {
        self.points.iter().position(|p| &p.id == id)
    }

    pub fn last(&self) -> Option<&GeoPoint> {
        self.points.last()
    }

    fn require(&self, id: &PointId) -> SurveyResult<usize> {
        self.index_of(id).ok_or_else(|| SurveyError::UnknownPoint { id: id.clone() })
    }

    /// Append a point; only the new point's leg is computed
    ///
    /// Fields already set by the staking engine are kept.
    pub fn push(&mut self, mut point: GeoPoint) {
        if point.bearing_from_previous.is_none() && point.is_valid() {
            if let Some(prev) = self.points.iter().rev().find(|p| p.is_valid()) {
                point.bearing_from_previous = Some(bearing(prev.lat, prev.lng, point.lat, point.lng));
                point.distance_from_previous = Some(distance(prev.lat, prev.lng, point.lat, point.lng));
            }
        }
        log::debug!("point {} appended at {}", point.id, self.points.len());
        self.points.push(point);
    }

    /// Insert at `index` (equal to `len` appends) and re-derive
    pub fn insert(&mut self, index: usize, point: GeoPoint) -> SurveyResult<()> {
        if index > self.points.len() {
            return Err(SurveyError::IndexOutOfRange {
                index,
                len: self.points.len(),
            });
        }
        let mut working = self.points.clone();
        working.insert(index, point);
        self.replace(working);
        Ok(())
    }

    pub fn remove(&mut self, id: &PointId) -> SurveyResult<GeoPoint> {
        let index = self.require(id)?;
        let mut working = self.points.clone();
        let removed = working.remove(index);
        self.replace(working);
        log::debug!("point {} removed from {}", id, index);
        Ok(removed)
    }

    /// Move a point to `new_index` (position after removal) and re-derive
    pub fn move_point(&mut self, id: &PointId, new_index: usize) -> SurveyResult<()> {
        let index = self.require(id)?;
        if new_index >= self.points.len() {
            return Err(SurveyError::IndexOutOfRange {
                index: new_index,
                len: self.points.len(),
            });
        }
        let mut working = self.points.clone();
        let point = working.remove(index);
        working.insert(new_index, point);
        self.replace(working);
        Ok(())
    }

    /// Relocate a point (e.g. after a marker drag) and re-derive
    pub fn relocate(&mut self, id: &PointId, lat: f64, lng: f64) -> SurveyResult<()> {
        let index = self.require(id)?;
        let mut working = self.points.clone();
        working[index].lat = lat;
        working[index].lng = lng;
        self.replace(working);
        Ok(())
    }

    pub fn set_kind(&mut self, id: &PointId, kind: PointKind) -> SurveyResult<()> {
        let index = self.require(id)?;
        self.points[index].kind = kind;
        Ok(())
    }

    /// Mark the last point as a corner; `None` on an empty sequence
    pub fn mark_last_corner(&mut self) -> Option<&GeoPoint> {
        let last = self.points.last_mut()?;
        last.kind = PointKind::Corner;
        Some(&*last)
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Rebuild bearing/distance of every point
    pub fn rederive(&mut self) {
        let working = self.points.clone();
        self.replace(working);
    }

    fn replace(&mut self, mut working: Vec<GeoPoint>) {
        derive_legs(&mut working);
        self.points = working;
    }

    /// Sum of derived leg lengths
    pub fn path_length(&self) -> f64 {
        self.points.iter().filter_map(|p| p.distance_from_previous).sum()
    }
}

impl<'a> IntoIterator for &'a PointSequence {
    type Item = &'a GeoPoint;
    type IntoIter = std::slice::Iter<'a, GeoPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
