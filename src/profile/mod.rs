//! The behavioral profile: who this player is
//!
//! A profile is generated once per identity from a seed, persisted as
//! canonical JSON, and drifted slightly between sessions so no two days
//! look alike while the identity stays recognizable. Everything the
//! runtime components consume (reaction parameters, click timing, break
//! affinities, camera habits) lives here.

pub mod drift;
pub mod generation;
pub mod performance;
pub mod store;
pub mod traits;
pub mod weights;

pub use drift::ProfileDriftEngine;
pub use generation::generate_profile;
pub use performance::DailyPerformance;
pub use store::ProfileStore;
pub use traits::{
    bounds, BehavioralProfile, DriftKind, DriftRecord, TraitDelta, CURRENT_SCHEMA_VERSION,
};
pub use weights::WeightMap;
