//! Hover bookkeeping types
//!
//! A `HoverState` is written once when a hover lands and replaced whole on
//! every later change. Readers copy it out of the slot and work on the
//! copy, so no field is ever observed mid-update.

use std::time::Instant;

use crate::core::types::{ScreenPoint, TargetTypeId, TilePoint};

/// How the pointer landed relative to the intended target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverPrecision {
    /// On the target
    Precise,
    /// Near the target bounds but off them
    Imprecise,
    /// On empty space in the target's neighborhood
    MissedEmptySpace,
    /// On a similar target nearby
    WrongTarget,
}

/// What the player will do with the hover when the moment comes
///
/// Decided when the hover starts, not when the click fires; a person
/// commits to "I'll grab that one" before the spawn actually appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickBehavior {
    Instant,
    Delayed,
    Abandon,
}

/// What kind of thing is under (or near) the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverTarget {
    Creature { index: u32 },
    Prop,
}

/// An in-flight predictive hover
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoverState {
    pub target: HoverTarget,
    pub target_type: TargetTypeId,
    /// Tile the target occupied when the hover landed
    pub target_tile: TilePoint,
    /// Player tile when the hover landed; large movement invalidates
    pub player_tile_at_start: TilePoint,
    /// Where the pointer actually sits
    pub screen_point: ScreenPoint,
    pub precision: HoverPrecision,
    pub behavior: ClickBehavior,
    pub started_at: Instant,
    /// Times this hover has chased a replacement target
    pub reacquisitions: u8,
}

impl HoverState {
    pub fn age_ms(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.started_at).as_millis() as u64
    }
}
