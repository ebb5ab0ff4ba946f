//! Transient staking state

use crate::core::{GeoPoint, PointId};
use crate::staking::baseline::Baseline;
use serde::{Deserialize, Serialize};

/// Default collinearity tolerance (degrees)
pub const DEFAULT_TOLERANCE_DEG: f64 = 2.0;

/// Staking settings as exchanged with the host application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakingConfig {
    pub is_active: bool,
    pub target_bearing: Option<f64>,
    pub strict_collinearity: bool,
    pub tolerance_degrees: f64,
    pub baseline_start_id: Option<PointId>,
    pub baseline_end_id: Option<PointId>,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            is_active: false,
            target_bearing: None,
            strict_collinearity: false,
            tolerance_degrees: DEFAULT_TOLERANCE_DEG,
            baseline_start_id: None,
            baseline_end_id: None,
        }
    }
}

/// Line-tracking phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakingPhase {
    /// Staking is off
    Idle,
    /// Staking is on but no bearing has been established yet
    SingleAnchor,
    /// A running bearing exists
    Tracking,
}

/// Baseline selection sub-state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BaselineState {
    #[default]
    None,
    /// Start selected, waiting for the end
    Armed { start: PointId },
    Set(Baseline),
}

/// State of one staking session; never persisted with the survey
#[derive(Debug, Clone, PartialEq)]
pub struct StakingSession {
    pub(crate) active: bool,
    pub(crate) current_bearing: Option<f64>,
    pub(crate) target_bearing: Option<f64>,
    pub(crate) strict_collinearity: bool,
    pub(crate) tolerance_degrees: f64,
    pub(crate) baseline: BaselineState,
    /// Points accepted since staking was switched on
    pub(crate) staked_count: usize,
}

impl Default for StakingSession {
    fn default() -> Self {
        Self {
            active: false,
            current_bearing: None,
            target_bearing: None,
            strict_collinearity: false,
            tolerance_degrees: DEFAULT_TOLERANCE_DEG,
            baseline: BaselineState::None,
            staked_count: 0,
        }
    }
}

impl StakingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a session from host settings, resolving baseline ids in `points`
    ///
    /// Ids that no longer exist leave the baseline cleared.
    pub fn from_config(config: &StakingConfig, points: &[GeoPoint]) -> Self {
        let find = |id: &PointId| points.iter().find(|p| &p.id == id);
        let baseline = match (&config.baseline_start_id, &config.baseline_end_id) {
            (Some(start), Some(end)) => match (find(start), find(end)) {
                (Some(s), Some(e)) => BaselineState::Set(Baseline::between(s, e)),
                _ => {
                    log::warn!("baseline {} -> {} references missing points, cleared", start, end);
                    BaselineState::None
                }
            },
            (Some(start), None) if find(start).is_some() => BaselineState::Armed { start: start.clone() },
            _ => BaselineState::None,
        };

        Self {
            active: config.is_active,
            current_bearing: None,
            target_bearing: config.target_bearing.filter(|b| b.is_finite()),
            strict_collinearity: config.strict_collinearity,
            tolerance_degrees: config.tolerance_degrees,
            baseline,
            staked_count: 0,
        }
    }

    pub fn to_config(&self) -> StakingConfig {
        let (baseline_start_id, baseline_end_id) = match &self.baseline {
            BaselineState::None => (None, None),
            BaselineState::Armed { start } => (Some(start.clone()), None),
            BaselineState::Set(b) => (Some(b.start.clone()), Some(b.end.clone())),
        };
        StakingConfig {
            is_active: self.active,
            target_bearing: self.target_bearing,
            strict_collinearity: self.strict_collinearity,
            tolerance_degrees: self.tolerance_degrees,
            baseline_start_id,
            baseline_end_id,
        }
    }

    pub fn phase(&self) -> StakingPhase {
        match (self.active, self.current_bearing) {
            (false, _) => StakingPhase::Idle,
            (true, None) => StakingPhase::SingleAnchor,
            (true, Some(_)) => StakingPhase::Tracking,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn current_bearing(&self) -> Option<f64> {
        self.current_bearing
    }

    pub fn target_bearing(&self) -> Option<f64> {
        self.target_bearing
    }

    /// Explicit target if set, otherwise the running bearing
    pub fn reference_bearing(&self) -> Option<f64> {
        self.target_bearing.or(self.current_bearing)
    }

    pub fn is_strict(&self) -> bool {
        self.strict_collinearity
    }

    pub fn tolerance_degrees(&self) -> f64 {
        self.tolerance_degrees
    }

    pub fn baseline(&self) -> &BaselineState {
        &self.baseline
    }

    pub fn staked_count(&self) -> usize {
        self.staked_count
    }

    /// Forget target, baseline and running bearing
    pub(crate) fn reset_line(&mut self) {
        self.current_bearing = None;
        self.target_bearing = None;
        self.baseline = BaselineState::None;
        self.staked_count = 0;
    }
}
