//! Read-only world queries
//!
//! The engine never talks to a game client directly; the host hands it a
//! `WorldView` and the engine asks narrow questions through it. Snapshots
//! are plain values captured at call time, valid for the current tick only.

use crate::core::types::{ScreenRect, TargetTypeId, TilePoint};

/// One creature as seen this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreatureSnapshot {
    pub type_id: TargetTypeId,
    /// Stable per-creature handle for screen-bounds lookups
    pub index: u32,
    pub position: TilePoint,
    pub alive: bool,
}

/// One interactable prop as seen this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropSnapshot {
    pub type_id: TargetTypeId,
    pub position: TilePoint,
}

/// Host-provided view of the game world
pub trait WorldView: Send + Sync {
    /// Player tile, if the player is currently in a loaded scene
    fn player_position(&self) -> Option<TilePoint>;

    /// Creatures of the given types within `radius` tiles of the player
    fn nearby_creatures(&self, types: &[TargetTypeId], radius: i32) -> Vec<CreatureSnapshot>;

    /// Props of the given types within `radius` tiles of the player
    fn nearby_props(&self, types: &[TargetTypeId], radius: i32) -> Vec<PropSnapshot>;

    /// Walking cost between two tiles, None when unreachable
    fn traversal_cost(&self, from: TilePoint, to: TilePoint) -> Option<u32>;

    /// On-screen bounds of a creature, None when off screen
    fn creature_screen_bounds(&self, index: u32) -> Option<ScreenRect>;

    /// On-screen bounds of a prop, None when off screen
    fn prop_screen_bounds(&self, type_id: TargetTypeId, position: TilePoint)
        -> Option<ScreenRect>;
}
