//! Engine composition root
//!
//! `BehaviorEngine` wires the profile store, drift, fatigue, attention,
//! breaks, jitter, and predictive hover into one façade with a session
//! lifecycle: `start_session`, a `tick` per game update, actions and
//! queries in between, `end_session` at logout. The tick path touches
//! one mutex (aggregate tick state) plus the lock-free fatigue level;
//! the profile is shared as an immutable snapshot and replaced whole on
//! the rare writes.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::activity::{ActivityClassifier, ActivityContext, Severity};
use crate::attention::{AttentionState, AttentionStateMachine};
use crate::breaks::{BreakPreferences, BreakScheduler, BreakTier};
use crate::core::config;
use crate::core::error::{HumError, Result};
use crate::core::types::{EpochMillis, IdentityId, RiskClass, TargetTypeId};
use crate::fatigue::{FatigueAccumulator, FatigueEvent};
use crate::hover::{HoverContext, HoverMetricsSnapshot, PredictiveHoverEngine};
use crate::input::PointerDriver;
use crate::profile::performance::proficiency_multiplier;
use crate::profile::{BehavioralProfile, DailyPerformance, ProfileDriftEngine, ProfileStore};
use crate::stats::distributions;
use crate::timing::TickJitterController;
use crate::world::WorldView;

/// Decorrelates the hover engine's stream from the tick stream
const HOVER_SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// What a tick observed and decided
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub severity: Severity,
    pub attention: AttentionState,
    pub fatigue_level: f64,
    pub fatigue_event: Option<FatigueEvent>,
    pub break_event: Option<BreakEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakEvent {
    Started {
        tier: BreakTier,
        duration: Duration,
        fatigue_triggered: bool,
        /// What the player wandered off to do; None for micro-pauses
        activity: Option<String>,
    },
    Ended {
        tier: BreakTier,
    },
    /// The scheduled session length is up; the caller should log out
    SessionEndDue,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionStart {
    pub resumed: bool,
    pub drift_blocks: u32,
    pub daily_multiplier: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionEnd {
    pub minutes: f64,
    /// Whether the player goes through their logout ritual first
    pub logout_ritual: bool,
}

struct ActiveBreak {
    tier: BreakTier,
    until: Instant,
}

/// Components that exist only while logged in
struct SessionComponents {
    attention: AttentionStateMachine,
    breaks: BreakScheduler,
    active_break: Option<ActiveBreak>,
    started_at: Instant,
}

struct TickState {
    classifier: ActivityClassifier,
    rng: ChaCha8Rng,
    last_tick: Option<Instant>,
    session: Option<SessionComponents>,
}

pub struct BehaviorEngine {
    identity: IdentityId,
    risk: RiskClass,
    store: ProfileStore,
    profile: Arc<RwLock<Option<Arc<BehavioralProfile>>>>,
    drift: ProfileDriftEngine,
    fatigue: FatigueAccumulator,
    hover: PredictiveHoverEngine,
    jitter: TickJitterController,
    tick_state: Mutex<TickState>,
    performance: Mutex<DailyPerformance>,
    persist_task: Mutex<Option<JoinHandle<()>>>,
}

impl BehaviorEngine {
    /// Build an engine for one identity
    ///
    /// Must be called from within a tokio runtime; the jitter worker is
    /// spawned here. Nothing is loaded from disk until `start_session`.
    pub fn new(
        identity: IdentityId,
        risk: RiskClass,
        profile_dir: impl Into<PathBuf>,
        world: Arc<dyn WorldView>,
        pointer: Arc<dyn PointerDriver>,
        seed: u64,
    ) -> Self {
        Self {
            identity,
            risk,
            store: ProfileStore::new(profile_dir),
            profile: Arc::new(RwLock::new(None)),
            drift: ProfileDriftEngine::new(),
            fatigue: FatigueAccumulator::new(),
            hover: PredictiveHoverEngine::new(world, pointer, seed ^ HOVER_SEED_SALT),
            jitter: TickJitterController::new(),
            tick_state: Mutex::new(TickState {
                classifier: ActivityClassifier::new(),
                rng: ChaCha8Rng::seed_from_u64(seed),
                last_tick: None,
                session: None,
            }),
            performance: Mutex::new(DailyPerformance {
                multiplier: 1.0,
                rolled_at_ms: 0,
            }),
            persist_task: Mutex::new(None),
        }
    }

    pub fn identity(&self) -> IdentityId {
        self.identity
    }

    /// Load (or create) the profile and bring the session up
    ///
    /// A login within the resume window continues the previous session:
    /// no drift, full fatigue carryover. Otherwise the profile drifts,
    /// long-term blocks are consumed, and the daily form is re-rolled.
    /// Starting over an already-active session resets the session state.
    pub fn start_session(&self, now: Instant, now_ms: EpochMillis) -> Result<SessionStart> {
        let cfg = config::config();
        let mut profile = self.store.load_or_generate(self.identity, now_ms)?;

        let (resumed, hours_away) = if profile.last_session_end_ms == 0 {
            (false, 0.0)
        } else {
            let gap_secs =
                now_ms.saturating_sub(profile.last_session_end_ms) as f64 / 1000.0;
            (
                gap_secs < cfg.persistence.fresh_session_threshold_secs as f64,
                gap_secs / 3600.0,
            )
        };

        let (drift_blocks, perf) = {
            let mut guard = self.lock_tick_state();
            let ts = &mut *guard;

            let drift_blocks = if resumed {
                0
            } else {
                self.drift.apply_session_drift(&mut profile, now_ms, &mut ts.rng);
                self.drift.apply_long_term_drift(&mut profile, now_ms, &mut ts.rng)
            };
            let perf =
                DailyPerformance::roll_for_session(&profile, now_ms, &cfg.performance, &mut ts.rng);
            profile.daily_multiplier = perf.multiplier;
            profile.daily_rolled_at_ms = perf.rolled_at_ms;

            // Persist the drifted profile before committing any session
            // state, so a failed save leaves the engine fully inactive
            self.store.save(&profile)?;

            self.fatigue
                .on_session_start(now, profile.fatigue_at_session_end, hours_away, resumed);

            let attention = AttentionStateMachine::new(
                now,
                self.risk,
                profile.attention_span_multiplier,
                &mut ts.rng,
            );
            let breaks = BreakScheduler::new(
                now,
                BreakPreferences {
                    micro_pause_affinity: profile.micro_pause_affinity,
                    short_break_affinity: profile.short_break_affinity,
                    long_break_affinity: profile.long_break_affinity,
                    session_length_hours: profile.session_length_hours,
                    break_threshold: profile.break_threshold,
                },
                self.risk,
                &mut ts.rng,
            );
            ts.session = Some(SessionComponents {
                attention,
                breaks,
                active_break: None,
                started_at: now,
            });
            ts.last_tick = Some(now);
            (drift_blocks, perf)
        };

        *self.profile_slot_mut() = Some(Arc::new(profile));
        *self.lock_performance() = perf;
        self.spawn_persistence_task();

        info!(
            identity = %self.identity,
            resumed,
            drift_blocks,
            daily_multiplier = perf.multiplier,
            "session started"
        );
        Ok(SessionStart {
            resumed,
            drift_blocks,
            daily_multiplier: perf.multiplier,
        })
    }

    /// Advance every per-tick component; call once per game update
    pub async fn tick(&self, now: Instant, ctx: &ActivityContext) -> Result<TickReport> {
        let report = {
            let mut guard = self.lock_tick_state();
            let ts = &mut *guard;
            let Some(session) = ts.session.as_mut() else {
                return Err(HumError::SessionInactive);
            };

            let severity = ts.classifier.classify(ctx);
            let elapsed = ts
                .last_tick
                .map_or(0.0, |t| now.saturating_duration_since(t).as_secs_f64());
            ts.last_tick = Some(now);

            let fatigue_event = self.fatigue.tick(now, elapsed, severity, &mut ts.rng);
            let attention = session.attention.update(now, severity, &mut ts.rng);
            let break_event = self.drive_breaks(session, severity, now, &mut ts.rng);

            TickReport {
                severity,
                attention,
                fatigue_level: self.fatigue.level(),
                fatigue_event,
                break_event,
            }
        };

        if let Some(BreakEvent::Started {
            activity: Some(name),
            ..
        }) = &report.break_event
        {
            self.reinforce_break_activity(name);
        }

        self.hover.validate_tick(now).await?;
        Ok(report)
    }

    /// Count one deliberate game action
    pub fn record_action(&self, now: Instant, severity: Severity) {
        self.fatigue.record_action(now, severity);
        let mut guard = self.lock_tick_state();
        if let Some(session) = guard.session.as_mut() {
            session.breaks.record_action();
        }
    }

    /// Credit practice time toward a task's proficiency
    pub fn record_task_time(&self, task: &str, minutes: f64) -> Result<()> {
        self.update_profile(|p| p.record_task_minutes(task, minutes))
    }

    /// An incoming chat message; true if it pulled the player away
    pub fn notify_chat(&self, now: Instant) -> bool {
        let mut guard = self.lock_tick_state();
        let ts = &mut *guard;
        match ts.session.as_mut() {
            Some(session) => session.attention.notify_chat_message(now, &mut ts.rng),
            None => false,
        }
    }

    /// Thinking delay before a deliberate action
    ///
    /// Per-identity Gaussian base, stretched by fatigue, attention, and
    /// current mental load, shortened by task familiarity and good form.
    pub fn think_time(&self, task: Option<&str>) -> Result<Duration> {
        let profile = self.profile()?;
        let perf = *self.lock_performance();
        let cfg = config::config();

        let mut guard = self.lock_tick_state();
        let ts = &mut *guard;
        let Some(session) = ts.session.as_mut() else {
            return Err(HumError::SessionInactive);
        };
        let severity = ts.classifier.current();
        let base = distributions::gaussian_bounded(
            &mut ts.rng,
            profile.cognitive_delay_base_ms,
            profile.cognitive_delay_variance_ms,
            profile.cognitive_delay_base_ms * 0.25,
            profile.cognitive_delay_base_ms * 4.0,
        );
        let load = session.attention.cognitive_load(severity);
        let mut ms = base
            * self.fatigue.delay_multiplier()
            * session.attention.delay_multiplier()
            * (1.0 + load * profile.multitask_penalty);
        if let Some(task) = task {
            ms *= proficiency_multiplier(&profile, task, &cfg.performance);
        }
        ms = perf.scale_delay(ms);
        Ok(Duration::from_secs_f64(ms.max(1.0) / 1000.0))
    }

    /// Reaction delay to an external event
    ///
    /// Ex-Gaussian whose spread and tail widen with fatigue, plus the
    /// catch-up lag of a distracted player.
    pub fn reaction_time(&self) -> Result<Duration> {
        let profile = self.profile()?;
        let perf = *self.lock_performance();

        let mut guard = self.lock_tick_state();
        let ts = &mut *guard;
        let Some(session) = ts.session.as_mut() else {
            return Err(HumError::SessionInactive);
        };
        let base = distributions::ex_gaussian(
            &mut ts.rng,
            profile.reaction_median_ms,
            profile.reaction_variance_ms * self.fatigue.sigma_multiplier(),
            profile.reaction_tail_ms * self.fatigue.tau_multiplier(),
        )
        .max(profile.reaction_median_ms * 0.4);
        let lag = session.attention.reaction_lag_ms(&mut ts.rng) as f64;
        let ms = perf.scale_delay(base) + lag;
        Ok(Duration::from_secs_f64(ms / 1000.0))
    }

    /// Whether the next click should miss, given the identity's baseline
    /// and current fatigue
    pub fn roll_misclick(&self) -> Result<bool> {
        let profile = self.profile()?;
        let p = (profile.misclick_probability * self.fatigue.misclick_multiplier()).min(0.5);
        let mut guard = self.lock_tick_state();
        Ok(distributions::chance(&mut guard.rng, p))
    }

    /// Combined delay stretch from fatigue, attention, and today's form
    pub fn delay_multiplier(&self) -> Result<f64> {
        let perf = *self.lock_performance();
        let guard = self.lock_tick_state();
        let Some(session) = guard.session.as_ref() else {
            return Err(HumError::SessionInactive);
        };
        Ok(perf.scale_delay(self.fatigue.delay_multiplier() * session.attention.delay_multiplier()))
    }

    /// Current mental load in [0, 1]
    pub fn cognitive_load(&self) -> Result<f64> {
        let guard = self.lock_tick_state();
        let Some(session) = guard.session.as_ref() else {
            return Err(HumError::SessionInactive);
        };
        Ok(session.attention.cognitive_load(guard.classifier.current()))
    }

    /// Whether the current activity tolerates being paused
    pub fn can_interrupt(&self) -> bool {
        self.lock_tick_state().classifier.current().interruptible()
    }

    /// Whether wandering away from the client is safe right now
    ///
    /// Hardcore accounts refuse at medium stakes too; an unattended
    /// client in a dangerous spot costs them the character.
    pub fn can_enter_away(&self) -> bool {
        let severity = self.lock_tick_state().classifier.current();
        if self.risk.is_hardcore() && severity.at_least(Severity::Medium) {
            return false;
        }
        severity.interruptible()
    }

    /// Whether a break could start this tick
    pub fn can_take_break(&self) -> bool {
        let guard = self.lock_tick_state();
        let on_break = guard
            .session
            .as_ref()
            .map_or(false, |s| s.active_break.is_some());
        guard.classifier.current().interruptible() && !on_break
    }

    /// Queue an action behind sampled tick jitter; false when the slot
    /// is occupied and the caller should retry on a later tick
    pub fn schedule_action<F>(&self, severity: Severity, action: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let delay = {
            let mut guard = self.lock_tick_state();
            TickJitterController::sample_delay(&mut guard.rng, severity)
        };
        self.jitter.schedule(delay, action)
    }

    /// Queue an emergency action, preempting whatever is pending
    pub fn schedule_emergency<F>(&self, action: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let mut guard = self.lock_tick_state();
        self.jitter.schedule_emergency(&mut guard.rng, action)
    }

    pub async fn request_creature_hover(
        &self,
        types: &[TargetTypeId],
        now: Instant,
    ) -> Result<bool> {
        let ctx = self.hover_context()?;
        self.hover.request_creature_hover(&ctx, types, now).await
    }

    pub async fn request_prop_hover(&self, types: &[TargetTypeId], now: Instant) -> Result<bool> {
        let ctx = self.hover_context()?;
        self.hover.request_prop_hover(&ctx, types, now).await
    }

    /// The awaited event fired; act on the prepared hover
    pub async fn execute_pending_click(&self, now: Instant) -> Result<bool> {
        let ctx = self.hover_context()?;
        self.hover.execute_click(&ctx, now).await
    }

    pub fn hover_suppresses_idle(&self, now: Instant) -> bool {
        self.hover.suppresses_idle(now)
    }

    pub fn hover_metrics(&self) -> HoverMetricsSnapshot {
        self.hover.metrics()
    }

    /// Current profile snapshot; cheap to clone, immutable
    pub fn profile(&self) -> Result<Arc<BehavioralProfile>> {
        self.profile
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .as_ref()
            .map(Arc::clone)
            .ok_or(HumError::SessionInactive)
    }

    pub fn fatigue_level(&self) -> f64 {
        self.fatigue.level()
    }

    /// Persist final state and tear the session down
    pub fn end_session(&self, now: Instant, now_ms: EpochMillis) -> Result<SessionEnd> {
        if let Some(task) = self.lock_persist_task().take() {
            task.abort();
        }
        self.jitter.cancel_pending();
        self.hover.clear();

        let ritual_probability = self.profile()?.logout_ritual_probability;
        let (minutes, logout_ritual) = {
            let mut guard = self.lock_tick_state();
            let ts = &mut *guard;
            let Some(session) = ts.session.take() else {
                return Err(HumError::SessionInactive);
            };
            if session.active_break.is_some() {
                self.fatigue.end_break(now);
            }
            let minutes = now.saturating_duration_since(session.started_at).as_secs_f64() / 60.0;
            (minutes, distributions::chance(&mut ts.rng, ritual_probability))
        };

        self.update_profile(|p| {
            p.last_session_end_ms = now_ms;
            p.total_playtime_minutes += minutes;
            p.fatigue_at_session_end = self.fatigue.level();
        })?;
        self.store.save(&*self.profile()?)?;

        info!(
            identity = %self.identity,
            minutes = format!("{minutes:.1}"),
            hover = %self.hover.metrics_summary(),
            "session ended"
        );
        Ok(SessionEnd {
            minutes,
            logout_ritual,
        })
    }

    fn drive_breaks(
        &self,
        session: &mut SessionComponents,
        severity: Severity,
        now: Instant,
        rng: &mut ChaCha8Rng,
    ) -> Option<BreakEvent> {
        if let Some(active) = &session.active_break {
            if now >= active.until {
                let tier = active.tier;
                self.fatigue.end_break(now);
                session.breaks.complete_break(tier, now, rng);
                session.active_break = None;
                debug!(?tier, "break finished");
                return Some(BreakEvent::Ended { tier });
            }
            return None;
        }

        session.breaks.update(now, self.fatigue.level(), rng);
        // Breaks wait out combat; the pending slot holds them
        if !severity.interruptible() {
            return None;
        }
        let pending = session.breaks.take_pending()?;
        if pending.tier == BreakTier::SessionEnd {
            return Some(BreakEvent::SessionEndDue);
        }

        let activity = if pending.tier == BreakTier::Micro {
            None
        } else {
            self.profile()
                .ok()
                .map(|p| p.break_activity_weights.pick(rng).to_string())
        };
        self.fatigue.start_break(now);
        session.attention.force_away(now, pending.duration);
        session.active_break = Some(ActiveBreak {
            tier: pending.tier,
            until: now + pending.duration,
        });
        info!(
            tier = ?pending.tier,
            secs = pending.duration.as_secs_f64(),
            fatigue_triggered = pending.fatigue_triggered,
            "break started"
        );
        Some(BreakEvent::Started {
            tier: pending.tier,
            duration: pending.duration,
            fatigue_triggered: pending.fatigue_triggered,
            activity,
        })
    }

    fn reinforce_break_activity(&self, name: &str) {
        if let Err(error) = self.update_profile(|p| p.break_activity_weights.reinforce(name)) {
            warn!(%error, "break activity reinforcement skipped");
        }
    }

    fn hover_context(&self) -> Result<HoverContext> {
        let profile = self.profile()?;
        let guard = self.lock_tick_state();
        let Some(session) = guard.session.as_ref() else {
            return Err(HumError::SessionInactive);
        };
        Ok(HoverContext {
            base_rate: profile.base_prediction_rate,
            speed_bias: profile.prediction_click_speed_bias,
            fatigue: self.fatigue.level(),
            attention: session.attention.state(),
        })
    }

    /// Clone-on-write update of the shared profile snapshot
    fn update_profile(&self, mutate: impl FnOnce(&mut BehavioralProfile)) -> Result<()> {
        let mut slot = self.profile_slot_mut();
        let Some(current) = slot.as_ref() else {
            return Err(HumError::SessionInactive);
        };
        let mut updated = (**current).clone();
        mutate(&mut updated);
        *slot = Some(Arc::new(updated));
        Ok(())
    }

    fn spawn_persistence_task(&self) {
        let store = self.store.clone();
        let profile = Arc::clone(&self.profile);
        let interval = Duration::from_secs(config::config().persistence.save_interval_secs);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first interval tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let snapshot = profile
                    .read()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .as_ref()
                    .map(Arc::clone);
                if let Some(snapshot) = snapshot {
                    if let Err(error) = store.save(&snapshot) {
                        warn!(%error, "periodic profile save failed");
                    }
                }
            }
        });
        let mut guard = self.lock_persist_task();
        if let Some(old) = guard.take() {
            old.abort();
        }
        *guard = Some(handle);
    }

    fn lock_tick_state(&self) -> MutexGuard<'_, TickState> {
        self.tick_state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock_performance(&self) -> MutexGuard<'_, DailyPerformance> {
        self.performance
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock_persist_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.persist_task
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn profile_slot_mut(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, Option<Arc<BehavioralProfile>>> {
        self.profile
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Drop for BehaviorEngine {
    fn drop(&mut self) {
        if let Some(task) = self.lock_persist_task().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ScreenRect, TilePoint};
    use crate::world::{CreatureSnapshot, PropSnapshot};
    use async_trait::async_trait;

    struct StaticWorld;

    impl WorldView for StaticWorld {
        fn player_position(&self) -> Option<TilePoint> {
            Some(TilePoint::new(10, 10, 0))
        }

        fn nearby_creatures(&self, _types: &[TargetTypeId], _radius: i32) -> Vec<CreatureSnapshot> {
            vec![CreatureSnapshot {
                type_id: 3,
                index: 1,
                position: TilePoint::new(12, 10, 0),
                alive: true,
            }]
        }

        fn nearby_props(&self, _types: &[TargetTypeId], _radius: i32) -> Vec<PropSnapshot> {
            Vec::new()
        }

        fn traversal_cost(&self, from: TilePoint, to: TilePoint) -> Option<u32> {
            Some(from.distance_to(&to) as u32)
        }

        fn creature_screen_bounds(&self, _index: u32) -> Option<ScreenRect> {
            Some(ScreenRect::new(400, 300, 40, 40))
        }

        fn prop_screen_bounds(
            &self,
            _type_id: TargetTypeId,
            _position: TilePoint,
        ) -> Option<ScreenRect> {
            None
        }
    }

    struct NullPointer;

    #[async_trait]
    impl PointerDriver for NullPointer {
        async fn move_to(&self, _point: crate::core::types::ScreenPoint) -> Result<()> {
            Ok(())
        }

        async fn nudge(&self, _dx: i32, _dy: i32) -> Result<()> {
            Ok(())
        }

        async fn click(&self) -> Result<()> {
            Ok(())
        }

        fn position(&self) -> Option<crate::core::types::ScreenPoint> {
            None
        }
    }

    fn engine_in(dir: &std::path::Path, seed: u64) -> BehaviorEngine {
        BehaviorEngine::new(
            IdentityId::new(),
            RiskClass::Standard,
            dir,
            Arc::new(StaticWorld),
            Arc::new(NullPointer),
            seed,
        )
    }

    #[tokio::test]
    async fn test_tick_requires_active_session() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path(), 1);
        let err = engine
            .tick(Instant::now(), &ActivityContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HumError::SessionInactive));
    }

    #[tokio::test]
    async fn test_session_lifecycle_persists_profile() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path(), 2);
        let t0 = Instant::now();

        let started = engine.start_session(t0, 1_000_000).unwrap();
        assert!(!started.resumed);
        let identity = engine.identity();

        let report = engine
            .tick(t0 + Duration::from_millis(600), &ActivityContext::default())
            .await
            .unwrap();
        assert_eq!(report.severity, Severity::Idle);

        engine.record_action(t0 + Duration::from_secs(1), Severity::Medium);
        let ended = engine
            .end_session(t0 + Duration::from_secs(1800), 1_000_000 + 1_800_000)
            .unwrap();
        assert!((ended.minutes - 30.0).abs() < 0.1);

        // The stored profile carries the session's bookkeeping
        let stored = engine.store.load(identity).unwrap();
        assert_eq!(stored.last_session_end_ms, 2_800_000);
        assert!(stored.total_playtime_minutes > 29.0);
    }

    #[tokio::test]
    async fn test_resume_within_window_skips_drift() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path(), 3);
        let t0 = Instant::now();

        engine.start_session(t0, 10_000_000).unwrap();
        let motor_before = engine.profile().unwrap().mouse_speed_multiplier;
        engine.end_session(t0 + Duration::from_secs(600), 10_600_000).unwrap();

        // Five minutes later: inside the resume window
        let resumed = engine
            .start_session(t0 + Duration::from_secs(900), 10_900_000)
            .unwrap();
        assert!(resumed.resumed);
        assert_eq!(resumed.drift_blocks, 0);
        let motor_after = engine.profile().unwrap().mouse_speed_multiplier;
        assert_eq!(motor_before, motor_after, "resume must not drift traits");
    }

    #[tokio::test]
    async fn test_fresh_login_after_long_gap_drifts() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path(), 4);
        let t0 = Instant::now();

        engine.start_session(t0, 20_000_000).unwrap();
        let before = engine.profile().unwrap();
        let motor_before = before.motor_values();
        engine.end_session(t0 + Duration::from_secs(3600), 23_600_000).unwrap();

        // Eight hours away
        let restart = engine
            .start_session(t0 + Duration::from_secs(3600 * 9), 23_600_000 + 8 * 3_600_000)
            .unwrap();
        assert!(!restart.resumed);
        let after = engine.profile().unwrap();
        let changed = motor_before
            .iter()
            .zip(after.motor_values().iter())
            .any(|(a, b)| (a - b).abs() > 1e-12);
        assert!(changed, "a fresh session must drift the motor block");
        assert!(!after.drift_history.is_empty());
    }

    #[tokio::test]
    async fn test_think_time_grows_under_fatigue() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path(), 5);
        let t0 = Instant::now();
        engine.start_session(t0, 30_000_000).unwrap();

        let rested: f64 = (0..300)
            .map(|_| engine.think_time(None).unwrap().as_secs_f64())
            .sum();

        // Pile on fatigue through heavy recorded actions
        for i in 0..4_000 {
            engine.record_action(t0 + Duration::from_millis(i), Severity::Critical);
        }
        assert!(engine.fatigue_level() > 0.5);

        let tired: f64 = (0..300)
            .map(|_| engine.think_time(None).unwrap().as_secs_f64())
            .sum();
        assert!(
            tired > rested * 1.1,
            "tired {tired:.3}s vs rested {rested:.3}s"
        );
    }

    #[tokio::test]
    async fn test_chat_before_session_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path(), 6);
        assert!(!engine.notify_chat(Instant::now()));
    }

    #[tokio::test]
    async fn test_combat_blocks_interruption_predicates() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path(), 7);
        let t0 = Instant::now();
        engine.start_session(t0, 40_000_000).unwrap();

        assert!(engine.can_interrupt());
        assert!(engine.can_enter_away());
        assert!(engine.can_take_break());

        let combat = ActivityContext {
            in_combat: true,
            ..Default::default()
        };
        engine.tick(t0 + Duration::from_millis(600), &combat).await.unwrap();
        assert!(!engine.can_interrupt());
        assert!(!engine.can_enter_away());
        assert!(!engine.can_take_break());

        // Load reflects combat even while focused
        let load = engine.cognitive_load().unwrap();
        assert!((load - 0.4).abs() < 1e-12, "load {load}");
        assert!(engine.delay_multiplier().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_hardcore_refuses_away_at_medium_stakes() {
        let dir = tempfile::tempdir().unwrap();
        let engine = BehaviorEngine::new(
            IdentityId::new(),
            RiskClass::Hardcore,
            dir.path(),
            Arc::new(StaticWorld),
            Arc::new(NullPointer),
            8,
        );
        let t0 = Instant::now();
        engine.start_session(t0, 50_000_000).unwrap();

        let task = ActivityContext {
            running_task: true,
            ..Default::default()
        };
        engine.tick(t0 + Duration::from_millis(600), &task).await.unwrap();
        assert!(engine.can_interrupt(), "a task itself is interruptible");
        assert!(!engine.can_enter_away(), "hardcore must stay at the client");
    }
}
