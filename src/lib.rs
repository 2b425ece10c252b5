//! Homunculus - Statistical Human-Behavior Emulation
//!
//! Drives one synthetic game-client player with statistically human
//! behavior: reaction and decision timing, fatigue, attention drift,
//! breaks, predictive target hovering, and a persistent per-identity
//! behavioral profile that slowly evolves across sessions.
//!
//! The host embeds [`engine::BehaviorEngine`], hands it a
//! [`world::WorldView`] and an [`input::PointerDriver`], starts a
//! session, and calls [`engine::BehaviorEngine::tick`] once per game
//! update. Everything else (when to pause, how long to think, where to
//! put the cursor) comes back through the engine's queries.

pub mod activity;
pub mod attention;
pub mod breaks;
pub mod core;
pub mod engine;
pub mod fatigue;
pub mod hover;
pub mod input;
pub mod profile;
pub mod stats;
pub mod timing;
pub mod world;
