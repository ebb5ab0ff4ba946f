//! Event-driven field controller
//!
//! Owns the open survey, the staking engine and the averaging window, and
//! reports every change through registered event callbacks. Each call runs to
//! completion before the next one is accepted. The rendering layer talks back
//! through `PointInteractionHandler`.

use crate::algorithms::polygon::{PolygonMetrics, PolygonSummary};
use crate::core::{GeoPoint, PointId, PointKind, PositionFix, TurnDirection};
use crate::processing::aggregator::{AggregatedPoint, AveragingWindow, SampleAggregator};
use crate::staking::engine::{StakeOutcome, StakingEngine};
use crate::staking::guidance::CrossTrack;
use crate::staking::session::{BaselineState, StakingConfig, StakingPhase, StakingSession};
use crate::survey::model::{Survey, SurveyListing};
use crate::survey::repository::SurveyRepository;
use crate::utils::config::FieldConfig;
use crate::validation::error::SurveyResult;
use std::collections::HashMap;

/// Callback function type for field events
pub type EventCallback = Box<dyn Fn(&FieldEvent) + Send>;

/// Events emitted by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEvent {
    PointAdded { id: PointId, index: usize },
    PointSnapped { id: PointId, t: f64 },
    /// Strict staking refused a point; nothing changed
    PointRejected {
        error_degrees: f64,
        tolerance_degrees: f64,
        turn_direction: TurnDirection,
    },
    PointRemoved { id: PointId },
    PointMoved { id: PointId },
    /// Area and perimeter after any change to the sequence
    MetricsUpdated { summary: PolygonSummary },
    StakingChanged { phase: StakingPhase },
    BaselineChanged { state: BaselineState },
    CornerTurned { bearing: f64 },
    AveragingProgress { collected: usize, target: usize },
    /// Averaging finished; the caller decides whether to keep the point
    AveragingFinished {
        point: AggregatedPoint,
        exceeds_threshold: bool,
    },
    SurveyOpened { id: String },
    SurveySaved { id: String },
    OperationFailed { operation: String, message: String },
}

/// Callback registration handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackHandle(u32);

impl CallbackHandle {
    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Marker interactions forwarded by the map layer
pub trait PointInteractionHandler {
    fn on_point_selected(&mut self, id: &PointId);
    fn on_point_dragged(&mut self, id: &PointId, lat: f64, lng: f64);
    fn on_point_delete_requested(&mut self, id: &PointId);
}

pub struct FieldController {
    config: FieldConfig,
    metrics: PolygonMetrics,
    aggregator: SampleAggregator,
    engine: StakingEngine,
    survey: Survey,
    repository: Box<dyn SurveyRepository + Send>,
    averaging: Option<AveragingWindow>,
    callback_counter: u32,
    event_callbacks: HashMap<CallbackHandle, EventCallback>,
}

impl FieldController {
    pub fn new(config: FieldConfig, repository: Box<dyn SurveyRepository + Send>) -> Self {
        let mut engine = StakingEngine::new();
        engine.set_strictness(config.strict_collinearity, config.tolerance_degrees);
        Self {
            metrics: config.polygon_metrics(),
            aggregator: config.sample_aggregator(),
            config,
            engine,
            survey: Survey::new("Untitled survey"),
            repository,
            averaging: None,
            callback_counter: 0,
            event_callbacks: HashMap::new(),
        }
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn survey(&self) -> &Survey {
        &self.survey
    }

    pub fn points(&self) -> &[GeoPoint] {
        self.survey.points.points()
    }

    pub fn session(&self) -> &StakingSession {
        self.engine.session()
    }

    pub fn summary(&self) -> PolygonSummary {
        self.survey.summary(&self.metrics)
    }

    pub fn register_event_callback(&mut self, callback: EventCallback) -> CallbackHandle {
        self.callback_counter += 1;
        let handle = CallbackHandle(self.callback_counter);
        self.event_callbacks.insert(handle, callback);
        handle
    }

    /// Returns false for an unknown handle
    pub fn unregister_callback(&mut self, handle: CallbackHandle) -> bool {
        self.event_callbacks.remove(&handle).is_some()
    }

    pub fn callback_count(&self) -> usize {
        self.event_callbacks.len()
    }

    fn emit(&self, event: FieldEvent) {
        for callback in self.event_callbacks.values() {
            callback(&event);
        }
    }

    fn emit_metrics(&self) {
        self.emit(FieldEvent::MetricsUpdated { summary: self.summary() });
    }

    fn report_failure<T>(&self, operation: &str, result: SurveyResult<T>) -> SurveyResult<T> {
        if let Err(err) = &result {
            log::warn!("{} failed: {}", operation, err);
            self.emit(FieldEvent::OperationFailed {
                operation: operation.to_string(),
                message: err.to_string(),
            });
        }
        result
    }

    // Survey lifecycle

    pub fn new_survey(&mut self, name: &str) {
        self.survey = Survey::new(name);
        self.engine.deactivate();
        self.averaging = None;
        self.emit(FieldEvent::SurveyOpened { id: self.survey.id.clone() });
        self.emit_metrics();
    }

    pub fn open_survey(&mut self, id: &str) -> SurveyResult<()> {
        let loaded = self.repository.load(id);
        let survey = self.report_failure("open", loaded)?;
        self.survey = survey;
        self.engine.deactivate();
        self.averaging = None;
        log::info!("opened survey {} ({} points)", self.survey.id, self.survey.points.len());
        self.emit(FieldEvent::SurveyOpened { id: self.survey.id.clone() });
        self.emit_metrics();
        Ok(())
    }

    pub fn save(&mut self) -> SurveyResult<()> {
        self.survey.touch();
        let saved = self.repository.save(&self.survey);
        self.report_failure("save", saved)?;
        self.emit(FieldEvent::SurveySaved { id: self.survey.id.clone() });
        Ok(())
    }

    pub fn list_surveys(&self) -> SurveyResult<Vec<SurveyListing>> {
        self.repository.list()
    }

    pub fn delete_survey(&mut self, id: &str) -> SurveyResult<()> {
        let deleted = self.repository.delete(id);
        self.report_failure("delete", deleted)
    }

    // Staking

    pub fn toggle_staking(&mut self) -> bool {
        let active = self.engine.toggle();
        if active {
            self.engine
                .set_strictness(self.config.strict_collinearity, self.config.tolerance_degrees);
        }
        self.emit(FieldEvent::StakingChanged { phase: self.engine.phase() });
        active
    }

    pub fn set_target_bearing(&mut self, target: Option<f64>) {
        self.engine.set_target_bearing(target);
    }

    pub fn set_strictness(&mut self, strict: bool, tolerance_degrees: f64) {
        self.engine.set_strictness(strict, tolerance_degrees);
    }

    /// Forget target, baseline and running bearing without leaving staking
    pub fn clear_staking(&mut self) {
        self.engine.clear();
        self.emit(FieldEvent::StakingChanged { phase: self.engine.phase() });
        self.emit(FieldEvent::BaselineChanged { state: BaselineState::None });
    }

    pub fn staking_config(&self) -> StakingConfig {
        self.engine.session().to_config()
    }

    /// Restore staking settings held by the host, e.g. after a restart
    pub fn restore_staking(&mut self, config: &StakingConfig) {
        let session = StakingSession::from_config(config, self.points());
        self.engine = StakingEngine::with_session(session);
        self.emit(FieldEvent::StakingChanged { phase: self.engine.phase() });
    }

    /// Turn at a corner: the last point becomes a corner and the bearing rotates
    pub fn turn_corner(&mut self, direction: TurnDirection, angle_degrees: Option<f64>) -> Option<f64> {
        let bearing = self.engine.turn_corner(direction, angle_degrees)?;
        self.survey.points.mark_last_corner();
        self.emit(FieldEvent::CornerTurned { bearing });
        Some(bearing)
    }

    pub fn guidance(&self, fix: &PositionFix) -> Option<CrossTrack> {
        self.engine.guidance(self.points(), fix.lat, fix.lng)
    }

    // Point capture

    /// Run a point through staking and append it unless rejected
    pub fn add_point(&mut self, point: GeoPoint) -> StakeOutcome {
        let outcome = self.engine.stake(self.survey.points.points(), point);
        match &outcome {
            StakeOutcome::Rejected {
                error_degrees,
                tolerance_degrees,
                turn_direction,
            } => {
                self.emit(FieldEvent::PointRejected {
                    error_degrees: *error_degrees,
                    tolerance_degrees: *tolerance_degrees,
                    turn_direction: *turn_direction,
                });
            }
            StakeOutcome::Snapped { point, t } => {
                self.emit(FieldEvent::PointSnapped {
                    id: point.id.clone(),
                    t: *t,
                });
            }
            StakeOutcome::Accepted(_) => {}
        }

        if let Some(point) = outcome.point() {
            let id = point.id.clone();
            self.survey.points.push(point.clone());
            log::info!("point {} added ({} total)", id, self.survey.points.len());
            self.emit(FieldEvent::PointAdded {
                id,
                index: self.survey.points.len() - 1,
            });
            self.emit_metrics();
        }
        outcome
    }

    /// Capture a single fix as a GPS point
    pub fn add_fix(&mut self, fix: &PositionFix) -> StakeOutcome {
        let mut point = GeoPoint::new(fix.lat, fix.lng, PointKind::Gps).captured_at(fix.timestamp);
        point.accuracy = fix.accuracy_m;
        point.altitude = fix.altitude_m;
        self.add_point(point)
    }

    pub fn start_averaging(&mut self) {
        self.averaging = Some(AveragingWindow::new(self.config.averaging_sample_count));
        log::debug!("averaging started ({} fixes)", self.config.averaging_sample_count);
    }

    pub fn is_averaging(&self) -> bool {
        self.averaging.is_some()
    }

    /// Feed a fix to the running averaging window
    ///
    /// Returns the averaged result once the window completes. Without a running
    /// window the fix is ignored.
    pub fn push_fix(&mut self, fix: PositionFix) -> Option<AggregatedPoint> {
        let window = self.averaging.as_mut()?;
        let complete = window.push(fix);
        let (collected, target) = (window.len(), self.config.averaging_sample_count);
        self.emit(FieldEvent::AveragingProgress { collected, target });
        if complete {
            self.finish_averaging()
        } else {
            None
        }
    }

    /// Stop early and average what was collected
    pub fn stop_averaging(&mut self) -> Option<AggregatedPoint> {
        if let Some(window) = self.averaging.as_mut() {
            window.stop();
        }
        self.finish_averaging()
    }

    fn finish_averaging(&mut self) -> Option<AggregatedPoint> {
        let window = self.averaging.take()?;
        let result = self.aggregator.aggregate(window.fixes())?;
        self.emit(FieldEvent::AveragingFinished {
            exceeds_threshold: self.aggregator.exceeds_threshold(&result),
            point: result.clone(),
        });
        Some(result)
    }

    /// Add an averaged point the user chose to keep
    pub fn accept_averaged(&mut self, averaged: AggregatedPoint) -> StakeOutcome {
        self.add_point(averaged.into_point(PointKind::Gps))
    }

    // Sequence edits

    pub fn select_baseline_point(&mut self, id: &PointId) -> BaselineState {
        let state = self
            .engine
            .select_baseline_point(id, self.survey.points.points())
            .clone();
        self.emit(FieldEvent::BaselineChanged { state: state.clone() });
        state
    }

    pub fn remove_point(&mut self, id: &PointId) -> SurveyResult<GeoPoint> {
        let removed = self.survey.points.remove(id);
        let removed = self.report_failure("remove point", removed)?;
        self.emit(FieldEvent::PointRemoved { id: id.clone() });
        self.emit_metrics();
        Ok(removed)
    }

    pub fn move_point(&mut self, id: &PointId, new_index: usize) -> SurveyResult<()> {
        let moved = self.survey.points.move_point(id, new_index);
        self.report_failure("move point", moved)?;
        self.emit(FieldEvent::PointMoved { id: id.clone() });
        self.emit_metrics();
        Ok(())
    }

    pub fn relocate_point(&mut self, id: &PointId, lat: f64, lng: f64) -> SurveyResult<()> {
        let relocated = self.survey.points.relocate(id, lat, lng);
        self.report_failure("relocate point", relocated)?;
        self.emit(FieldEvent::PointMoved { id: id.clone() });
        self.emit_metrics();
        Ok(())
    }
}

impl PointInteractionHandler for FieldController {
    /// Selections feed the baseline while staking, otherwise they are ignored
    fn on_point_selected(&mut self, id: &PointId) {
        if self.engine.session().is_active() {
            self.select_baseline_point(id);
        }
    }

    fn on_point_dragged(&mut self, id: &PointId, lat: f64, lng: f64) {
        let _ = self.relocate_point(id, lat, lng);
    }

    fn on_point_delete_requested(&mut self, id: &PointId) {
        let _ = self.remove_point(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::geodesy::destination;
    use crate::survey::repository::InMemoryRepository;
    use std::sync::{Arc, Mutex};

    fn controller() -> (FieldController, Arc<Mutex<Vec<FieldEvent>>>) {
        let mut controller = FieldController::new(FieldConfig::default(), Box::new(InMemoryRepository::new()));
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        controller.register_event_callback(Box::new(move |event| {
            sink.lock().unwrap().push(event.clone());
        }));
        (controller, events)
    }

    fn gps(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng, PointKind::Gps)
    }

    #[test]
    fn test_points_update_metrics() {
        let (mut c, events) = controller();
        let (lat1, lng1) = destination(0.0, 0.0, 90.0, 100.0);
        let (lat2, lng2) = destination(lat1, lng1, 0.0, 100.0);
        let (lat3, lng3) = destination(0.0, 0.0, 0.0, 100.0);
        for (lat, lng) in [(0.0, 0.0), (lat1, lng1), (lat2, lng2), (lat3, lng3)] {
            assert!(!c.add_point(gps(lat, lng)).is_rejected());
        }
        assert_eq!(c.points().len(), 4);
        assert!((c.summary().area_m2 - 10_000.0).abs() < 50.0);

        let events = events.lock().unwrap();
        let added = events.iter().filter(|e| matches!(e, FieldEvent::PointAdded { .. })).count();
        assert_eq!(added, 4);
        match events.last() {
            Some(FieldEvent::MetricsUpdated { summary }) => assert_eq!(summary.vertex_count, 4),
            other => panic!("unexpected last event {:?}", other),
        }
    }

    #[test]
    fn test_strict_rejection_emits_and_keeps_sequence() {
        let (mut c, events) = controller();
        c.toggle_staking();
        c.set_strictness(true, 1.0);
        c.add_point(gps(0.0, 0.0));
        let (lat, lng) = destination(0.0, 0.0, 0.0, 100.0);
        c.add_point(gps(lat, lng));
        assert_eq!(c.session().phase(), StakingPhase::Tracking);

        let (rl, rg) = destination(lat, lng, 5.0, 100.0);
        let outcome = c.add_point(gps(rl, rg));
        assert!(outcome.is_rejected());
        assert_eq!(c.points().len(), 2);
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, FieldEvent::PointRejected { .. })));
    }

    #[test]
    fn test_corner_turn_marks_last_point() {
        let (mut c, _) = controller();
        c.toggle_staking();
        assert_eq!(c.turn_corner(TurnDirection::Right, None), None);
        c.add_point(gps(0.0, 0.0));
        let (lat, lng) = destination(0.0, 0.0, 0.0, 30.0);
        c.add_point(gps(lat, lng));

        let bearing = c.turn_corner(TurnDirection::Right, None).unwrap();
        assert!((bearing - 90.0).abs() < 1e-6);
        assert_eq!(c.points()[1].kind, PointKind::Corner);
        assert_eq!(c.points().len(), 2);
    }

    #[test]
    fn test_averaging_flow() {
        let mut config = FieldConfig::default();
        config.averaging_sample_count = 3;
        config.accuracy_threshold_m = 2.0;
        let mut c = FieldController::new(config, Box::new(InMemoryRepository::new()));

        assert!(c.push_fix(PositionFix::new(1.0, 1.0, Some(1.0))).is_none());
        c.start_averaging();
        assert!(c.push_fix(PositionFix::new(1.0, 1.0, Some(1.0))).is_none());
        assert!(c.push_fix(PositionFix::new(1.0, 1.0, Some(3.0))).is_none());
        let avg = c.push_fix(PositionFix::new(1.0, 1.0, Some(5.0))).unwrap();
        assert!(!c.is_averaging());
        assert!(avg.exceeds_threshold(2.0));

        c.accept_averaged(avg);
        assert_eq!(c.points().len(), 1);
        assert_eq!(c.points()[0].accuracy, Some(3.0));

        c.start_averaging();
        c.push_fix(PositionFix::new(2.0, 2.0, Some(1.0)));
        let early = c.stop_averaging().unwrap();
        assert_eq!(early.sample_count, 1);
    }

    #[test]
    fn test_interaction_handler() {
        let (mut c, events) = controller();
        c.add_point(gps(0.0, 0.0));
        c.add_point(gps(0.0, 0.001));
        c.add_point(gps(0.001, 0.001));
        let ids: Vec<PointId> = c.points().iter().map(|p| p.id.clone()).collect();

        // selections are ignored while staking is off
        c.on_point_selected(&ids[0]);
        assert_eq!(c.session().baseline(), &BaselineState::None);

        c.toggle_staking();
        c.on_point_selected(&ids[0]);
        c.on_point_selected(&ids[1]);
        assert!(matches!(c.session().baseline(), BaselineState::Set(_)));

        c.on_point_dragged(&ids[2], 0.002, 0.001);
        assert_eq!(c.points()[2].lat, 0.002);

        c.on_point_delete_requested(&ids[2]);
        assert_eq!(c.points().len(), 2);

        c.on_point_delete_requested(&PointId::new("missing"));
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, FieldEvent::OperationFailed { .. })));
    }

    #[test]
    fn test_save_and_reopen() {
        let (mut c, events) = controller();
        c.new_survey("Orchard");
        c.add_point(gps(10.0, 10.0));
        c.save().unwrap();
        let id = c.survey().id.clone();

        c.new_survey("Other");
        assert!(c.points().is_empty());
        c.open_survey(&id).unwrap();
        assert_eq!(c.survey().name, "Orchard");
        assert_eq!(c.points().len(), 1);
        assert_eq!(c.list_surveys().unwrap().len(), 1);

        assert!(c.open_survey("nope").is_err());
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, FieldEvent::SurveySaved { .. })));
    }

    #[test]
    fn test_staking_config_restore() {
        let (mut c, _) = controller();
        c.add_point(gps(0.0, 0.0));
        c.add_point(gps(0.0, 0.001));
        let ids: Vec<PointId> = c.points().iter().map(|p| p.id.clone()).collect();
        c.toggle_staking();
        c.set_target_bearing(Some(90.0));
        c.select_baseline_point(&ids[0]);
        c.select_baseline_point(&ids[1]);
        let saved = c.staking_config();
        assert_eq!(saved.baseline_end_id, Some(ids[1].clone()));

        c.clear_staking();
        assert_eq!(c.session().baseline(), &BaselineState::None);
        c.restore_staking(&saved);
        assert!(matches!(c.session().baseline(), BaselineState::Set(_)));
        assert_eq!(c.session().target_bearing(), Some(90.0));
    }

    #[test]
    fn test_callback_registration() {
        let (mut c, _) = controller();
        let handle = c.register_event_callback(Box::new(|_| {}));
        assert_eq!(c.callback_count(), 2);
        assert!(c.unregister_callback(handle));
        assert!(!c.unregister_callback(handle));
        assert_eq!(c.callback_count(), 1);
    }
}
