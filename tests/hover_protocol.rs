//! Integration tests for the predictive hover lifecycle
//!
//! Hovers are landed against a staged world that then changes under
//! them: targets die, wander, scroll off screen, the player walks away.
//! Validation has to chase, re-hover, or give up exactly as a person
//! babysitting a spawn point would.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ahash::AHashMap;
use async_trait::async_trait;

use homunculus::attention::AttentionState;
use homunculus::core::config::HoverConfig;
use homunculus::core::error::Result;
use homunculus::core::types::{ScreenPoint, ScreenRect, TargetTypeId, TilePoint};
use homunculus::hover::{HoverContext, HoverPrecision, HoverTarget, PredictiveHoverEngine};
use homunculus::input::PointerDriver;
use homunculus::world::{CreatureSnapshot, PropSnapshot, WorldView};

#[derive(Default)]
struct Stage {
    player: Option<TilePoint>,
    creatures: Vec<CreatureSnapshot>,
    props: Vec<PropSnapshot>,
    creature_bounds: AHashMap<u32, ScreenRect>,
    prop_bounds: AHashMap<(TargetTypeId, TilePoint), ScreenRect>,
}

/// World the test mutates while the engine watches it
struct SharedWorld {
    stage: Mutex<Stage>,
}

impl SharedWorld {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            stage: Mutex::new(Stage {
                player: Some(TilePoint::new(0, 0, 0)),
                ..Stage::default()
            }),
        })
    }

    fn set_player(&self, tile: TilePoint) {
        self.stage.lock().unwrap().player = Some(tile);
    }

    fn add_creature(&self, index: u32, tile: TilePoint, rect: ScreenRect) {
        let mut stage = self.stage.lock().unwrap();
        stage.creatures.push(CreatureSnapshot {
            type_id: 7,
            index,
            position: tile,
            alive: true,
        });
        stage.creature_bounds.insert(index, rect);
    }

    fn remove_creature(&self, index: u32) {
        self.stage.lock().unwrap().creatures.retain(|c| c.index != index);
    }

    fn set_creature_bounds(&self, index: u32, rect: ScreenRect) {
        self.stage.lock().unwrap().creature_bounds.insert(index, rect);
    }

    fn clear_creature_bounds(&self, index: u32) {
        self.stage.lock().unwrap().creature_bounds.remove(&index);
    }

    fn add_prop(&self, type_id: TargetTypeId, tile: TilePoint, rect: ScreenRect) {
        let mut stage = self.stage.lock().unwrap();
        stage.props.push(PropSnapshot { type_id, position: tile });
        stage.prop_bounds.insert((type_id, tile), rect);
    }

    fn remove_prop(&self, tile: TilePoint) {
        self.stage.lock().unwrap().props.retain(|p| p.position != tile);
    }
}

impl WorldView for SharedWorld {
    fn player_position(&self) -> Option<TilePoint> {
        self.stage.lock().unwrap().player
    }

    fn nearby_creatures(&self, types: &[TargetTypeId], radius: i32) -> Vec<CreatureSnapshot> {
        let stage = self.stage.lock().unwrap();
        let Some(origin) = stage.player else {
            return Vec::new();
        };
        stage
            .creatures
            .iter()
            .filter(|c| types.contains(&c.type_id) && c.position.distance_to(&origin) <= radius)
            .copied()
            .collect()
    }

    fn nearby_props(&self, types: &[TargetTypeId], radius: i32) -> Vec<PropSnapshot> {
        let stage = self.stage.lock().unwrap();
        let Some(origin) = stage.player else {
            return Vec::new();
        };
        stage
            .props
            .iter()
            .filter(|p| types.contains(&p.type_id) && p.position.distance_to(&origin) <= radius)
            .copied()
            .collect()
    }

    fn traversal_cost(&self, from: TilePoint, to: TilePoint) -> Option<u32> {
        Some(from.distance_to(&to) as u32)
    }

    fn creature_screen_bounds(&self, index: u32) -> Option<ScreenRect> {
        self.stage.lock().unwrap().creature_bounds.get(&index).copied()
    }

    fn prop_screen_bounds(&self, type_id: TargetTypeId, position: TilePoint) -> Option<ScreenRect> {
        self.stage
            .lock()
            .unwrap()
            .prop_bounds
            .get(&(type_id, position))
            .copied()
    }
}

#[derive(Default)]
struct RecordingPointer {
    moves: Mutex<Vec<ScreenPoint>>,
    clicks: AtomicU64,
}

impl RecordingPointer {
    fn move_count(&self) -> usize {
        self.moves.lock().unwrap().len()
    }
}

#[async_trait]
impl PointerDriver for RecordingPointer {
    async fn move_to(&self, point: ScreenPoint) -> Result<()> {
        self.moves.lock().unwrap().push(point);
        Ok(())
    }

    async fn nudge(&self, _dx: i32, _dy: i32) -> Result<()> {
        Ok(())
    }

    async fn click(&self) -> Result<()> {
        self.clicks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn position(&self) -> Option<ScreenPoint> {
        self.moves.lock().unwrap().last().copied()
    }
}

/// Always hovers, always lands precisely, never fidgets
fn certain_config() -> HoverConfig {
    HoverConfig {
        min_rate: 0.99,
        max_rate: 1.0,
        imprecise_probability: 0.0,
        empty_space_probability: 0.0,
        wrong_target_probability: 0.0,
        cursor_drift_probability: 0.0,
        focused_instant_base: 1.0,
        focused_delayed_base: 0.0,
        focused_abandon_base: 0.0,
        ..HoverConfig::default()
    }
}

fn focused_ctx() -> HoverContext {
    HoverContext {
        base_rate: 1.0,
        speed_bias: 0.5,
        fatigue: 0.0,
        attention: AttentionState::Focused,
    }
}

fn rig(config: HoverConfig) -> (PredictiveHoverEngine, Arc<SharedWorld>, Arc<RecordingPointer>) {
    let world = SharedWorld::new();
    let pointer = Arc::new(RecordingPointer::default());
    let engine = PredictiveHoverEngine::with_config(
        config,
        Arc::clone(&world) as Arc<dyn WorldView>,
        Arc::clone(&pointer) as Arc<dyn PointerDriver>,
        27,
    );
    (engine, world, pointer)
}

#[tokio::test]
async fn test_stale_hover_is_abandoned_on_validation() {
    let (engine, world, _pointer) = rig(HoverConfig {
        staleness_ms: 1_000,
        ..certain_config()
    });
    world.add_creature(1, TilePoint::new(2, 2, 0), ScreenRect::new(100, 100, 40, 40));
    let t0 = Instant::now();

    assert!(engine.request_creature_hover(&focused_ctx(), &[7], t0).await.unwrap());
    assert!(engine.is_hover_active(t0));

    let late = t0 + Duration::from_millis(1_500);
    assert!(!engine.is_hover_active(late));
    engine.validate_tick(late).await.unwrap();
    assert!(engine.current_state().is_none());

    let metrics = engine.metrics();
    assert_eq!(metrics.attempts, 1);
    assert_eq!(metrics.landed, 1);
    assert_eq!(metrics.abandoned, 1);
    assert!((metrics.success_rate() - 1.0).abs() < 1e-12);
}

#[tokio::test]
async fn test_player_walking_away_abandons_the_hover() {
    let (engine, world, pointer) = rig(certain_config());
    world.add_creature(1, TilePoint::new(2, 2, 0), ScreenRect::new(100, 100, 40, 40));
    let t0 = Instant::now();

    assert!(engine.request_creature_hover(&focused_ctx(), &[7], t0).await.unwrap());

    // Four tiles is past the movement tolerance
    world.set_player(TilePoint::new(4, 4, 0));
    engine.validate_tick(t0 + Duration::from_millis(100)).await.unwrap();
    assert!(engine.current_state().is_none());
    assert_eq!(engine.metrics().abandoned, 1);
    assert_eq!(pointer.move_count(), 1, "no chase on invalidation");
}

#[tokio::test]
async fn test_vanished_creature_is_chased_onto_a_neighbor() {
    let (engine, world, pointer) = rig(certain_config());
    world.add_creature(1, TilePoint::new(2, 2, 0), ScreenRect::new(100, 100, 40, 40));
    let t0 = Instant::now();

    assert!(engine.request_creature_hover(&focused_ctx(), &[7], t0).await.unwrap());

    let neighbor_rect = ScreenRect::new(300, 150, 40, 40);
    world.remove_creature(1);
    world.add_creature(2, TilePoint::new(3, 2, 0), neighbor_rect);

    engine.validate_tick(t0 + Duration::from_millis(100)).await.unwrap();
    let state = engine.current_state().expect("chase must keep the hover");
    assert_eq!(state.target, HoverTarget::Creature { index: 2 });
    assert_eq!(state.target_tile, TilePoint::new(3, 2, 0));
    assert_eq!(state.reacquisitions, 1);
    assert!(neighbor_rect.contains(&state.screen_point));
    assert_eq!(pointer.move_count(), 2);
    assert_eq!(engine.metrics().abandoned, 0);
}

#[tokio::test]
async fn test_chasing_gives_up_after_three_reacquisitions() {
    let (engine, world, pointer) = rig(certain_config());
    world.add_creature(1, TilePoint::new(2, 2, 0), ScreenRect::new(100, 100, 40, 40));
    let t0 = Instant::now();

    assert!(engine.request_creature_hover(&focused_ctx(), &[7], t0).await.unwrap());

    // The target keeps getting replaced one tile over; three chases are
    // tolerated, the fourth churn ends it
    for step in 1u32..=4 {
        world.remove_creature(step);
        world.add_creature(
            step + 1,
            TilePoint::new(2 + step as i32, 2, 0),
            ScreenRect::new(100 + 50 * step as i32, 100, 40, 40),
        );
        engine
            .validate_tick(t0 + Duration::from_millis(100 * u64::from(step)))
            .await
            .unwrap();
    }

    assert!(engine.current_state().is_none());
    assert_eq!(engine.metrics().abandoned, 1);
    assert_eq!(pointer.move_count(), 4, "one landing plus three chases");
}

#[tokio::test]
async fn test_no_replacement_within_reach_abandons() {
    let (engine, world, pointer) = rig(certain_config());
    world.add_creature(1, TilePoint::new(2, 2, 0), ScreenRect::new(100, 100, 40, 40));
    let t0 = Instant::now();

    assert!(engine.request_creature_hover(&focused_ctx(), &[7], t0).await.unwrap());

    // The only other candidate sits six tiles from the lost target,
    // one past the chase radius
    world.remove_creature(1);
    world.add_creature(9, TilePoint::new(8, 2, 0), ScreenRect::new(500, 100, 40, 40));

    engine.validate_tick(t0 + Duration::from_millis(100)).await.unwrap();
    assert!(engine.current_state().is_none());
    assert_eq!(engine.metrics().abandoned, 1);
    assert_eq!(pointer.move_count(), 1);
}

#[tokio::test]
async fn test_vanished_prop_is_chased_onto_a_neighbor() {
    let (engine, world, pointer) = rig(certain_config());
    let original = TilePoint::new(2, 0, 0);
    let replacement = TilePoint::new(4, 0, 0);
    world.add_prop(9, original, ScreenRect::new(100, 200, 30, 30));
    let t0 = Instant::now();

    assert!(engine.request_prop_hover(&focused_ctx(), &[9], t0).await.unwrap());
    let state = engine.current_state().unwrap();
    assert_eq!(state.target, HoverTarget::Prop);
    assert_eq!(state.target_tile, original);

    let replacement_rect = ScreenRect::new(250, 200, 30, 30);
    world.remove_prop(original);
    world.add_prop(9, replacement, replacement_rect);

    engine.validate_tick(t0 + Duration::from_millis(100)).await.unwrap();
    let state = engine.current_state().expect("prop chase must keep the hover");
    assert_eq!(state.target_tile, replacement);
    assert_eq!(state.reacquisitions, 1);
    assert!(replacement_rect.contains(&state.screen_point));
    assert_eq!(pointer.move_count(), 2);
}

#[tokio::test]
async fn test_offscreen_target_abandons() {
    let (engine, world, _pointer) = rig(certain_config());
    world.add_creature(1, TilePoint::new(2, 2, 0), ScreenRect::new(100, 100, 40, 40));
    let t0 = Instant::now();

    assert!(engine.request_creature_hover(&focused_ctx(), &[7], t0).await.unwrap());

    // Camera panned; the creature is still there but has no bounds
    world.clear_creature_bounds(1);
    engine.validate_tick(t0 + Duration::from_millis(100)).await.unwrap();
    assert!(engine.current_state().is_none());
    assert_eq!(engine.metrics().abandoned, 1);
}

#[tokio::test]
async fn test_precise_hover_tracks_screen_movement() {
    let (engine, world, pointer) = rig(certain_config());
    world.add_creature(1, TilePoint::new(2, 2, 0), ScreenRect::new(100, 100, 40, 40));
    let t0 = Instant::now();

    assert!(engine.request_creature_hover(&focused_ctx(), &[7], t0).await.unwrap());
    assert_eq!(engine.current_state().unwrap().precision, HoverPrecision::Precise);

    // Target jumps far across the screen: snap to it
    let second = ScreenRect::new(400, 100, 40, 40);
    world.set_creature_bounds(1, second);
    engine.validate_tick(t0 + Duration::from_millis(100)).await.unwrap();
    assert_eq!(pointer.move_count(), 2);
    let state = engine.current_state().unwrap();
    assert!(state.screen_point.distance_to(&second.center()) <= 50.0);
    assert_eq!(state.reacquisitions, 0, "screen tracking is not a chase");

    // Another jump inside the re-hover cooldown is ignored
    let third = ScreenRect::new(700, 100, 40, 40);
    world.set_creature_bounds(1, third);
    engine.validate_tick(t0 + Duration::from_millis(300)).await.unwrap();
    assert_eq!(pointer.move_count(), 2, "cooldown must hold the pointer still");

    // Past the cooldown it snaps again
    engine.validate_tick(t0 + Duration::from_millis(700)).await.unwrap();
    assert_eq!(pointer.move_count(), 3);
    let state = engine.current_state().unwrap();
    assert!(state.screen_point.distance_to(&third.center()) <= 50.0);
    assert_eq!(engine.metrics().abandoned, 0);
}

#[tokio::test]
async fn test_idle_suppression_expires_before_staleness() {
    let (engine, world, _pointer) = rig(HoverConfig {
        idle_suppression_ms: 1_000,
        staleness_ms: 5_000,
        ..certain_config()
    });
    world.add_creature(1, TilePoint::new(2, 2, 0), ScreenRect::new(100, 100, 40, 40));
    let t0 = Instant::now();

    assert!(engine.request_creature_hover(&focused_ctx(), &[7], t0).await.unwrap());

    assert!(engine.suppresses_idle(t0 + Duration::from_millis(500)));
    let after_suppression = t0 + Duration::from_millis(1_200);
    assert!(!engine.suppresses_idle(after_suppression));
    assert!(
        engine.is_hover_active(after_suppression),
        "the hover outlives its idle suppression"
    );
    assert!(!engine.is_hover_active(t0 + Duration::from_millis(5_200)));
}

#[tokio::test]
async fn test_metrics_track_the_full_lifecycle() {
    let (engine, world, pointer) = rig(certain_config());
    world.add_creature(1, TilePoint::new(2, 2, 0), ScreenRect::new(100, 100, 40, 40));
    let t0 = Instant::now();
    let ctx = focused_ctx();

    // Land, click through
    assert!(engine.request_creature_hover(&ctx, &[7], t0).await.unwrap());
    assert!(engine.execute_click(&ctx, t0).await.unwrap());
    assert_eq!(pointer.clicks.load(Ordering::SeqCst), 1);

    // Land again, then lose the target with nothing nearby
    let second = t0 + Duration::from_millis(700);
    assert!(engine.request_creature_hover(&ctx, &[7], second).await.unwrap());
    world.remove_creature(1);
    engine.validate_tick(second + Duration::from_millis(100)).await.unwrap();

    // A try against an empty world counts as an attempt that found nothing
    let third = t0 + Duration::from_millis(1_400);
    assert!(!engine.request_creature_hover(&ctx, &[7], third).await.unwrap());

    let metrics = engine.metrics();
    assert_eq!(metrics.attempts, 3);
    assert_eq!(metrics.landed, 2);
    assert_eq!(metrics.instant_clicks, 1);
    assert_eq!(metrics.delayed_clicks, 0);
    assert_eq!(metrics.abandoned, 1);
    assert!((metrics.success_rate() - 2.0 / 3.0).abs() < 1e-9);
}
