//! Predictive hover engine
//!
//! Players park the cursor where the next click will be needed before the
//! triggering event happens. The engine decides whether to hover at all
//! (worse odds when tired or distracted), where the pointer actually lands
//! (four precision grades), and what happens when the moment arrives
//! (instant click, hesitant click, or quiet abandonment). All randomness
//! is drawn in a synchronous decision phase; pointer actuation is awaited
//! afterwards so no lock is ever held across an await.
//!
//! `validate_tick` must be called from a single driving loop; concurrent
//! validators would race on the state slot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::attention::AttentionState;
use crate::core::config::{self, HoverConfig};
use crate::core::error::Result;
use crate::core::types::{ScreenPoint, ScreenRect, TargetTypeId, TilePoint};
use crate::hover::state::{ClickBehavior, HoverPrecision, HoverState, HoverTarget};
use crate::input::{gaussian_point_in, PointerDriver};
use crate::stats::distributions;
use crate::world::{CreatureSnapshot, PropSnapshot, WorldView};

/// Ln-space spread of the pre-click hesitation
const HESITATION_LOG_SIGMA: f64 = 0.35;

/// Per-tick inputs the hover decision depends on
#[derive(Debug, Clone, Copy)]
pub struct HoverContext {
    /// Profile trait: baseline probability of hovering at all
    pub base_rate: f64,
    /// Profile trait: 0 slow committer, 1 twitchy clicker
    pub speed_bias: f64,
    /// Current fatigue level in [0, 1]
    pub fatigue: f64,
    pub attention: AttentionState,
}

#[derive(Debug, Default)]
struct HoverMetrics {
    attempts: AtomicU64,
    landed: AtomicU64,
    instant_clicks: AtomicU64,
    delayed_clicks: AtomicU64,
    abandoned: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoverMetricsSnapshot {
    pub attempts: u64,
    pub landed: u64,
    pub instant_clicks: u64,
    pub delayed_clicks: u64,
    pub abandoned: u64,
}

impl HoverMetricsSnapshot {
    /// Fraction of attempts that landed a hover; 0 before any attempt
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        self.landed as f64 / self.attempts as f64
    }
}

struct AttemptStamps {
    last_attempt: Option<Instant>,
    last_rehover: Option<Instant>,
}

/// Scaled imperfection ladder; whatever mass is left goes to precise
struct PrecisionWeights {
    wrong: f64,
    empty: f64,
    imprecise: f64,
}

pub struct PredictiveHoverEngine {
    config: HoverConfig,
    world: Arc<dyn WorldView>,
    pointer: Arc<dyn PointerDriver>,
    rng: Mutex<ChaCha8Rng>,
    state: Mutex<Option<HoverState>>,
    stamps: Mutex<AttemptStamps>,
    metrics: HoverMetrics,
}

impl PredictiveHoverEngine {
    pub fn new(world: Arc<dyn WorldView>, pointer: Arc<dyn PointerDriver>, seed: u64) -> Self {
        Self::with_config(config::config().hover.clone(), world, pointer, seed)
    }

    pub fn with_config(
        config: HoverConfig,
        world: Arc<dyn WorldView>,
        pointer: Arc<dyn PointerDriver>,
        seed: u64,
    ) -> Self {
        Self {
            config,
            world,
            pointer,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            state: Mutex::new(None),
            stamps: Mutex::new(AttemptStamps {
                last_attempt: None,
                last_rehover: None,
            }),
            metrics: HoverMetrics::default(),
        }
    }

    /// Try to pre-hover the most promising creature of the given types
    ///
    /// Returns Ok(true) only when a hover actually landed. Refuses while
    /// away, while rate-limited, and when the probability roll fails.
    pub async fn request_creature_hover(
        &self,
        ctx: &HoverContext,
        types: &[TargetTypeId],
        now: Instant,
    ) -> Result<bool> {
        if !self.attempt_allowed(ctx, now) {
            return Ok(false);
        }
        let planned = {
            let mut rng = self.lock_rng();
            self.plan_creature_hover(&mut *rng, ctx, types, now)
        };
        self.land(planned).await
    }

    /// Try to pre-hover the most convenient prop of the given types
    pub async fn request_prop_hover(
        &self,
        ctx: &HoverContext,
        types: &[TargetTypeId],
        now: Instant,
    ) -> Result<bool> {
        if !self.attempt_allowed(ctx, now) {
            return Ok(false);
        }
        let planned = {
            let mut rng = self.lock_rng();
            self.plan_prop_hover(&mut *rng, ctx, types, now)
        };
        self.land(planned).await
    }

    /// Per-tick upkeep of the active hover
    ///
    /// Clears stale or invalidated hovers, chases a vanished target onto a
    /// nearby replacement, snaps a precise hover back onto a target that
    /// moved on screen, and occasionally drifts the cursor a pixel or two.
    pub async fn validate_tick(&self, now: Instant) -> Result<()> {
        let Some(current) = *self.state_slot() else {
            return Ok(());
        };

        if current.age_ms(now) > self.config.staleness_ms {
            debug!(age_ms = current.age_ms(now), "hover went stale");
            self.abandon();
            return Ok(());
        }
        let Some(player) = self.world.player_position() else {
            self.abandon();
            return Ok(());
        };
        if player.distance_to(&current.player_tile_at_start) > self.config.max_player_movement_tiles
        {
            debug!("player walked away from hover");
            self.abandon();
            return Ok(());
        }

        let bounds = match current.target {
            HoverTarget::Creature { index } => {
                let creatures = self
                    .world
                    .nearby_creatures(&[current.target_type], self.config.max_target_distance_tiles);
                if creatures.iter().any(|c| c.index == index && c.alive) {
                    self.world.creature_screen_bounds(index)
                } else {
                    return self.reacquire_creature(&creatures, current, player).await;
                }
            }
            HoverTarget::Prop => {
                let props = self
                    .world
                    .nearby_props(&[current.target_type], self.config.max_target_distance_tiles);
                if props.iter().any(|p| p.position == current.target_tile) {
                    self.world
                        .prop_screen_bounds(current.target_type, current.target_tile)
                } else {
                    return self.reacquire_prop(&props, current, player).await;
                }
            }
        };
        let Some(bounds) = bounds else {
            // Target scrolled off screen
            self.abandon();
            return Ok(());
        };

        // Only a precise hover tracks its target across the screen;
        // imperfect hovers were never really "on" it to begin with
        if current.precision == HoverPrecision::Precise {
            let drift = current.screen_point.distance_to(&bounds.center());
            if drift > self.config.screen_drift_px && self.rehover_allowed(now) {
                let point = {
                    let mut rng = self.lock_rng();
                    let p = gaussian_point_in(&mut *rng, bounds);
                    p.offset(rng.gen_range(-5..=5), rng.gen_range(-5..=5))
                };
                self.pointer.move_to(point).await?;
                self.replace_state(HoverState {
                    screen_point: point,
                    ..current
                });
                return Ok(());
            }
        }

        let nudge = {
            let mut rng = self.lock_rng();
            if distributions::chance(&mut *rng, self.config.cursor_drift_probability) {
                let max = self.config.cursor_drift_max_px;
                let dx = (distributions::gaussian(&mut *rng, 0.0, 1.5).round() as i32)
                    .clamp(-max, max);
                let dy = (distributions::gaussian(&mut *rng, 0.0, 1.5).round() as i32)
                    .clamp(-max, max);
                (dx != 0 || dy != 0).then_some((dx, dy))
            } else {
                None
            }
        };
        if let Some((dx, dy)) = nudge {
            self.pointer.nudge(dx, dy).await?;
            self.replace_state(HoverState {
                screen_point: current.screen_point.offset(dx, dy),
                ..current
            });
        }
        Ok(())
    }

    /// The awaited event fired; act on the hover
    ///
    /// Takes the state before doing anything, so a second call is a no-op.
    /// Returns Ok(true) when a click was actually delivered.
    pub async fn execute_click(&self, ctx: &HoverContext, _now: Instant) -> Result<bool> {
        let Some(current) = self.state_slot().take() else {
            return Ok(false);
        };
        match current.behavior {
            ClickBehavior::Abandon => {
                self.metrics.abandoned.fetch_add(1, Ordering::Relaxed);
                debug!("hover abandoned at the trigger");
                Ok(false)
            }
            ClickBehavior::Instant => {
                self.correct_and_click(&current).await?;
                self.metrics.instant_clicks.fetch_add(1, Ordering::Relaxed);
                Ok(true)
            }
            ClickBehavior::Delayed => {
                let hesitation = {
                    let mut rng = self.lock_rng();
                    let base_ms = distributions::log_normal_around(
                        &mut *rng,
                        self.config.hesitation_median_ms as f64,
                        HESITATION_LOG_SIGMA,
                        self.config.hesitation_min_ms as f64,
                        self.config.hesitation_max_ms as f64,
                    );
                    base_ms * (1.0 + ctx.fatigue * self.config.hesitation_fatigue_scale)
                };
                tokio::time::sleep(Duration::from_secs_f64(hesitation / 1000.0)).await;
                self.correct_and_click(&current).await?;
                self.metrics.delayed_clicks.fetch_add(1, Ordering::Relaxed);
                Ok(true)
            }
        }
    }

    pub fn is_hover_active(&self, now: Instant) -> bool {
        self.state_slot()
            .as_ref()
            .map_or(false, |s| s.age_ms(now) <= self.config.staleness_ms)
    }

    /// Whether idle pointer fidgets should stay away from the cursor
    pub fn suppresses_idle(&self, now: Instant) -> bool {
        self.state_slot()
            .as_ref()
            .map_or(false, |s| s.age_ms(now) <= self.config.idle_suppression_ms)
    }

    pub fn current_state(&self) -> Option<HoverState> {
        *self.state_slot()
    }

    pub fn clear(&self) {
        self.state_slot().take();
    }

    /// Clear plus the abandoned count; for hovers the engine gave up on,
    /// as opposed to a host-requested reset
    fn abandon(&self) {
        self.state_slot().take();
        self.metrics.abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn metrics(&self) -> HoverMetricsSnapshot {
        HoverMetricsSnapshot {
            attempts: self.metrics.attempts.load(Ordering::Relaxed),
            landed: self.metrics.landed.load(Ordering::Relaxed),
            instant_clicks: self.metrics.instant_clicks.load(Ordering::Relaxed),
            delayed_clicks: self.metrics.delayed_clicks.load(Ordering::Relaxed),
            abandoned: self.metrics.abandoned.load(Ordering::Relaxed),
        }
    }

    pub fn metrics_summary(&self) -> String {
        let m = self.metrics();
        format!(
            "hover attempts={} landed={} instant={} delayed={} abandoned={}",
            m.attempts, m.landed, m.instant_clicks, m.delayed_clicks, m.abandoned
        )
    }

    fn attempt_allowed(&self, ctx: &HoverContext, now: Instant) -> bool {
        if ctx.attention == AttentionState::Away {
            return false;
        }
        let mut stamps = self.lock_stamps();
        if let Some(last) = stamps.last_attempt {
            if now.saturating_duration_since(last).as_millis()
                < self.config.attempt_min_gap_ms as u128
            {
                return false;
            }
        }
        stamps.last_attempt = Some(now);
        true
    }

    fn rehover_allowed(&self, now: Instant) -> bool {
        let mut stamps = self.lock_stamps();
        if let Some(last) = stamps.last_rehover {
            if now.saturating_duration_since(last).as_millis()
                < self.config.rehover_min_gap_ms as u128
            {
                return false;
            }
        }
        stamps.last_rehover = Some(now);
        true
    }

    fn effective_rate(&self, ctx: &HoverContext) -> f64 {
        let mut rate = ctx.base_rate * (1.0 - ctx.fatigue * self.config.fatigue_impact);
        if ctx.attention == AttentionState::Distracted {
            rate *= self.config.distracted_multiplier;
        }
        rate.clamp(self.config.min_rate, self.config.max_rate)
    }

    fn plan_creature_hover(
        &self,
        rng: &mut ChaCha8Rng,
        ctx: &HoverContext,
        types: &[TargetTypeId],
        now: Instant,
    ) -> Option<HoverState> {
        self.metrics.attempts.fetch_add(1, Ordering::Relaxed);
        if !distributions::chance(rng, self.effective_rate(ctx)) {
            return None;
        }
        let player = self.world.player_position()?;
        let creatures = self
            .world
            .nearby_creatures(types, self.config.max_target_distance_tiles);
        let target = creatures
            .iter()
            .filter(|c| c.alive)
            .min_by_key(|c| c.position.distance_to(&player))
            .copied()?;
        let bounds = self.world.creature_screen_bounds(target.index)?;

        let weights = self.precision_weights(ctx);
        let mut precision = roll_precision(rng, &weights);
        let point = match precision {
            HoverPrecision::WrongTarget => {
                let alternate = creatures
                    .iter()
                    .filter(|c| {
                        c.alive
                            && c.index != target.index
                            && c.position.distance_to(&target.position)
                                <= self.config.wrong_target_radius_tiles
                    })
                    .min_by_key(|c| c.position.distance_to(&target.position))
                    .and_then(|c| self.world.creature_screen_bounds(c.index));
                match alternate {
                    Some(alt_bounds) => gaussian_point_in(rng, alt_bounds),
                    None => {
                        precision = reroll_without_wrong(rng, &weights);
                        self.imperfect_point(rng, bounds, precision)
                    }
                }
            }
            _ => self.imperfect_point(rng, bounds, precision),
        };

        Some(HoverState {
            target: HoverTarget::Creature {
                index: target.index,
            },
            target_type: target.type_id,
            target_tile: target.position,
            player_tile_at_start: player,
            screen_point: point,
            precision,
            behavior: self.roll_click_behavior(rng, ctx),
            started_at: now,
            reacquisitions: 0,
        })
    }

    fn plan_prop_hover(
        &self,
        rng: &mut ChaCha8Rng,
        ctx: &HoverContext,
        types: &[TargetTypeId],
        now: Instant,
    ) -> Option<HoverState> {
        self.metrics.attempts.fetch_add(1, Ordering::Relaxed);
        if !distributions::chance(rng, self.effective_rate(ctx)) {
            return None;
        }
        let player = self.world.player_position()?;
        let props = self
            .world
            .nearby_props(types, self.config.max_target_distance_tiles);

        // Walking cost decides which prop a player would naturally pick;
        // unreachable props rank as twice their straight-line distance,
        // offscreen ones behind onscreen ones at equal cost
        let mut scored: Vec<(&PropSnapshot, i64, bool)> = props
            .iter()
            .map(|p| {
                let dist = p.position.distance_to(&player) as i64;
                let score = match self.world.traversal_cost(player, p.position) {
                    Some(cost) => cost as i64,
                    None => dist * 2,
                };
                let onscreen = self.world.prop_screen_bounds(p.type_id, p.position).is_some();
                (p, score, onscreen)
            })
            .collect();
        scored.sort_by_key(|(p, score, onscreen)| {
            (*score, !*onscreen, p.position.distance_to(&player))
        });
        let target = scored.first().map(|(p, _, _)| **p)?;
        let bounds = self.world.prop_screen_bounds(target.type_id, target.position)?;

        let weights = self.precision_weights(ctx);
        let mut precision = roll_precision(rng, &weights);
        let point = match precision {
            HoverPrecision::WrongTarget => {
                let alternate = props
                    .iter()
                    .filter(|p| {
                        p.position != target.position
                            && p.position.distance_to(&target.position)
                                <= self.config.wrong_target_radius_tiles
                    })
                    .min_by_key(|p| p.position.distance_to(&target.position))
                    .and_then(|p| self.world.prop_screen_bounds(p.type_id, p.position));
                match alternate {
                    Some(alt_bounds) => gaussian_point_in(rng, alt_bounds),
                    None => {
                        precision = reroll_without_wrong(rng, &weights);
                        self.imperfect_point(rng, bounds, precision)
                    }
                }
            }
            _ => self.imperfect_point(rng, bounds, precision),
        };

        Some(HoverState {
            target: HoverTarget::Prop,
            target_type: target.type_id,
            target_tile: target.position,
            player_tile_at_start: player,
            screen_point: point,
            precision,
            behavior: self.roll_click_behavior(rng, ctx),
            started_at: now,
            reacquisitions: 0,
        })
    }

    async fn land(&self, planned: Option<HoverState>) -> Result<bool> {
        let Some(state) = planned else {
            return Ok(false);
        };
        self.pointer.move_to(state.screen_point).await?;
        debug!(precision = ?state.precision, behavior = ?state.behavior, "hover landed");
        self.replace_state(state);
        self.metrics.landed.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    async fn reacquire_creature(
        &self,
        creatures: &[CreatureSnapshot],
        current: HoverState,
        player: TilePoint,
    ) -> Result<()> {
        if current.reacquisitions >= 3 {
            debug!("hover target churned too often, giving up");
            self.abandon();
            return Ok(());
        }
        let replacement = creatures
            .iter()
            .filter(|c| {
                c.alive
                    && c.position.distance_to(&current.target_tile)
                        <= self.config.wrong_target_radius_tiles
            })
            .min_by_key(|c| reacquire_score(c.position, current.target_tile, player))
            .copied();
        let Some(replacement) = replacement else {
            self.abandon();
            return Ok(());
        };
        let Some(bounds) = self.world.creature_screen_bounds(replacement.index) else {
            self.abandon();
            return Ok(());
        };
        let point = {
            let mut rng = self.lock_rng();
            gaussian_point_in(&mut *rng, bounds)
        };
        self.pointer.move_to(point).await?;
        debug!(reacquisitions = current.reacquisitions + 1, "hover chased replacement creature");
        self.replace_state(HoverState {
            target: HoverTarget::Creature {
                index: replacement.index,
            },
            target_tile: replacement.position,
            screen_point: point,
            reacquisitions: current.reacquisitions + 1,
            ..current
        });
        Ok(())
    }

    async fn reacquire_prop(
        &self,
        props: &[PropSnapshot],
        current: HoverState,
        player: TilePoint,
    ) -> Result<()> {
        if current.reacquisitions >= 3 {
            self.abandon();
            return Ok(());
        }
        let replacement = props
            .iter()
            .filter(|p| {
                p.position.distance_to(&current.target_tile)
                    <= self.config.wrong_target_radius_tiles
            })
            .min_by_key(|p| reacquire_score(p.position, current.target_tile, player))
            .copied();
        let Some(replacement) = replacement else {
            self.abandon();
            return Ok(());
        };
        let Some(bounds) = self
            .world
            .prop_screen_bounds(replacement.type_id, replacement.position)
        else {
            self.abandon();
            return Ok(());
        };
        let point = {
            let mut rng = self.lock_rng();
            gaussian_point_in(&mut *rng, bounds)
        };
        self.pointer.move_to(point).await?;
        self.replace_state(HoverState {
            target_type: replacement.type_id,
            target_tile: replacement.position,
            screen_point: point,
            reacquisitions: current.reacquisitions + 1,
            ..current
        });
        Ok(())
    }

    async fn correct_and_click(&self, state: &HoverState) -> Result<()> {
        if let Some(position) = self.pointer.position() {
            if position.distance_to(&state.screen_point) > self.config.screen_drift_px {
                self.pointer.move_to(state.screen_point).await?;
            }
        }
        self.pointer.click().await
    }

    fn precision_weights(&self, ctx: &HoverContext) -> PrecisionWeights {
        let scale = (1.0 + ctx.fatigue * self.config.precision_fatigue_scale)
            * match ctx.attention {
                AttentionState::Focused => 1.0,
                AttentionState::Distracted => self.config.precision_distracted_mult,
                AttentionState::Away => self.config.precision_away_mult,
            };
        PrecisionWeights {
            wrong: self.config.wrong_target_probability * scale,
            empty: self.config.empty_space_probability * scale,
            imprecise: self.config.imprecise_probability * scale,
        }
    }

    fn imperfect_point(
        &self,
        rng: &mut ChaCha8Rng,
        bounds: ScreenRect,
        precision: HoverPrecision,
    ) -> ScreenPoint {
        match precision {
            HoverPrecision::Imprecise => {
                let on = gaussian_point_in(rng, bounds);
                let angle = rng.gen_range(0.0..std::f64::consts::TAU);
                let magnitude =
                    distributions::gaussian(rng, 0.0, self.config.imprecise_max_px as f64 / 3.0)
                        .abs()
                        .clamp(
                            self.config.imprecise_min_px as f64,
                            self.config.imprecise_max_px as f64,
                        );
                on.offset(
                    (magnitude * angle.cos()).round() as i32,
                    (magnitude * angle.sin()).round() as i32,
                )
            }
            HoverPrecision::MissedEmptySpace => {
                let center = bounds.center();
                // Land clear of the target's own bounds
                let clearance = (bounds.width.max(bounds.height) / 2 + 5)
                    .max(self.config.imprecise_min_px)
                    .min(self.config.empty_space_radius_px - 1);
                let dist =
                    rng.gen_range(clearance as f64..self.config.empty_space_radius_px as f64);
                let angle = rng.gen_range(0.0..std::f64::consts::TAU);
                center.offset(
                    (dist * angle.cos()).round() as i32,
                    (dist * angle.sin()).round() as i32,
                )
            }
            // Wrong-target points are built from the alternate's bounds
            _ => gaussian_point_in(rng, bounds),
        }
    }

    fn roll_click_behavior(&self, rng: &mut ChaCha8Rng, ctx: &HoverContext) -> ClickBehavior {
        let (mut instant, mut delayed, mut abandon) = match ctx.attention {
            AttentionState::Focused => (
                self.config.focused_instant_base,
                self.config.focused_delayed_base,
                self.config.focused_abandon_base,
            ),
            _ => (
                self.config.distracted_instant_base,
                self.config.distracted_delayed_base,
                self.config.distracted_abandon_base,
            ),
        };
        // Twitchy players commit; slow ones hesitate or wander off
        let shift = (ctx.speed_bias - 0.5) * 0.3;
        instant = (instant + shift).max(0.0);
        delayed = (delayed - shift * 0.67).max(0.0);
        abandon = (abandon - shift * 0.33).max(0.0);
        let u = rng.gen_range(0.0..instant + delayed + abandon);
        if u < instant {
            ClickBehavior::Instant
        } else if u < instant + delayed {
            ClickBehavior::Delayed
        } else {
            ClickBehavior::Abandon
        }
    }

    fn lock_rng(&self) -> MutexGuard<'_, ChaCha8Rng> {
        self.rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn state_slot(&self) -> MutexGuard<'_, Option<HoverState>> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock_stamps(&self) -> MutexGuard<'_, AttemptStamps> {
        self.stamps
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn replace_state(&self, state: HoverState) {
        *self.state_slot() = Some(state);
    }
}

fn roll_precision<R: Rng + ?Sized>(rng: &mut R, weights: &PrecisionWeights) -> HoverPrecision {
    let u: f64 = rng.gen();
    if u < weights.wrong {
        HoverPrecision::WrongTarget
    } else if u < weights.wrong + weights.empty {
        HoverPrecision::MissedEmptySpace
    } else if u < weights.wrong + weights.empty + weights.imprecise {
        HoverPrecision::Imprecise
    } else {
        HoverPrecision::Precise
    }
}

/// Re-roll after a wrong-target grade found no plausible wrong target,
/// keeping the remaining grades in proportion
fn reroll_without_wrong<R: Rng + ?Sized>(
    rng: &mut R,
    weights: &PrecisionWeights,
) -> HoverPrecision {
    let u = rng.gen_range(weights.wrong.min(1.0)..1.0);
    if u < weights.wrong + weights.empty {
        HoverPrecision::MissedEmptySpace
    } else if u < weights.wrong + weights.empty + weights.imprecise {
        HoverPrecision::Imprecise
    } else {
        HoverPrecision::Precise
    }
}

fn reacquire_score(candidate: TilePoint, original: TilePoint, player: TilePoint) -> i64 {
    2 * candidate.distance_to(&original) as i64 + candidate.distance_to(&player) as i64
}
