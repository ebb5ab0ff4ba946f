//! Field staking: directional lines, baselines and live guidance

pub mod baseline;
pub mod engine;
pub mod guidance;
pub mod session;

pub use baseline::{snap_to_segment, Baseline, Snap};
pub use engine::{collinearity_error, StakeOutcome, StakingEngine};
pub use guidance::{cross_track, CrossTrack};
pub use session::{BaselineState, StakingConfig, StakingPhase, StakingSession, DEFAULT_TOLERANCE_DEG};
