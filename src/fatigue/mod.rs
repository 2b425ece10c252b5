//! Fatigue accumulation
//!
//! A single [0, 1] level that rises with play and falls with rest. Level
//! reads are lock-free because every timing component samples fatigue on
//! its hot path; all other bookkeeping sits behind a short mutex that
//! only the tick thread takes.
//!
//! On top of the smooth ramp sit two stochastic events: crashes (sudden
//! slumps, the 2 a.m. wall) and recoveries (second winds). Both are
//! rate-limited by cooldowns so they read as occasional human moments,
//! not noise.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use rand::Rng;
use tracing::{debug, info};

use crate::activity::Severity;
use crate::core::config::{self, FatigueConfig};
use crate::stats::distributions;

/// A stochastic fatigue event surfaced to the caller for logging
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FatigueEvent {
    /// Sudden slump; level jumped by this much
    Crash { spike: f64 },
    /// Second wind; level dropped by this much
    Recovery { amount: f64 },
}

#[derive(Debug, Default)]
struct FatigueInner {
    session_started: Option<Instant>,
    break_started: Option<Instant>,
    last_crash: Option<Instant>,
    last_recovery: Option<Instant>,
}

pub struct FatigueAccumulator {
    config: FatigueConfig,
    /// f64 bits of the current level; single writer, many readers
    level_bits: AtomicU64,
    inner: Mutex<FatigueInner>,
}

impl FatigueAccumulator {
    pub fn new() -> Self {
        Self::with_config(config::config().fatigue.clone())
    }

    pub fn with_config(config: FatigueConfig) -> Self {
        Self {
            config,
            level_bits: AtomicU64::new(0f64.to_bits()),
            inner: Mutex::new(FatigueInner::default()),
        }
    }

    /// Current fatigue level in [0, 1]
    pub fn level(&self) -> f64 {
        f64::from_bits(self.level_bits.load(Ordering::Relaxed))
    }

    fn store_level(&self, level: f64) {
        self.level_bits
            .store(level.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    /// Begin a session with fatigue carried over from the last one
    ///
    /// A resumed session (brief disconnect) keeps the carried level as
    /// is; a genuinely new session decays it exponentially per hour
    /// away, so an overnight gap comes back near fresh.
    pub fn on_session_start(&self, now: Instant, carried: f64, hours_away: f64, resume: bool) {
        let level = if resume {
            carried
        } else {
            carried * (1.0 - self.config.carryover_recovery_per_hour).powf(hours_away.max(0.0))
        };
        let mut inner = lock(&self.inner);
        inner.session_started = Some(now);
        inner.break_started = None;
        inner.last_crash = None;
        inner.last_recovery = None;
        drop(inner);
        self.store_level(level);
        debug!(level = format!("{:.3}", self.level()), resume, "fatigue session started");
    }

    /// Advance fatigue by elapsed active time, possibly firing an event
    pub fn tick<R: Rng + ?Sized>(
        &self,
        now: Instant,
        elapsed_secs: f64,
        severity: Severity,
        rng: &mut R,
    ) -> Option<FatigueEvent> {
        let inner = lock(&self.inner);
        if inner.break_started.is_some() {
            return None;
        }
        let hours = session_hours(&inner, now);
        let last_crash = inner.last_crash;
        let last_recovery = inner.last_recovery;
        drop(inner);

        let time_factor = 1.0 + hours * hours * self.config.session_hours_quadratic;
        let mut level = self.level()
            + self.config.per_second * elapsed_secs * severity.fatigue_multiplier() * time_factor;
        level = level.clamp(0.0, 1.0);

        let mut event = None;

        let crash_ready = level >= self.config.crash_min_level
            && last_crash.map_or(true, |t| {
                now.duration_since(t).as_secs() >= self.config.crash_cooldown_secs
            });
        if crash_ready {
            let p = self.config.crash_probability_per_second
                * elapsed_secs
                * (1.0 + level * self.config.crash_level_scaling);
            if distributions::chance(rng, p) {
                let spike = rng.gen_range(self.config.crash_spike_min..self.config.crash_spike_max);
                level = (level + spike).clamp(0.0, 1.0);
                lock(&self.inner).last_crash = Some(now);
                info!(spike = format!("{spike:.3}"), level = format!("{level:.3}"), "fatigue crash");
                event = Some(FatigueEvent::Crash { spike });
            }
        }

        let recovery_ready = event.is_none()
            && level >= self.config.recovery_min_level
            && last_recovery.map_or(true, |t| {
                now.duration_since(t).as_secs() >= self.config.recovery_cooldown_secs
            });
        if recovery_ready {
            let mut p = self.config.recovery_probability_per_second * elapsed_secs;
            // Right after a crash people notice the slump and rally
            if last_crash.map_or(false, |t| {
                now.duration_since(t).as_secs() < self.config.post_crash_window_secs
            }) {
                p *= self.config.post_crash_recovery_boost;
            }
            if distributions::chance(rng, p) {
                let amount =
                    rng.gen_range(self.config.recovery_amount_min..self.config.recovery_amount_max);
                level = (level - amount).clamp(0.0, 1.0);
                lock(&self.inner).last_recovery = Some(now);
                info!(
                    amount = format!("{amount:.3}"),
                    level = format!("{level:.3}"),
                    "fatigue recovery"
                );
                event = Some(FatigueEvent::Recovery { amount });
            }
        }

        self.store_level(level);
        event
    }

    /// Charge one action's worth of fatigue
    pub fn record_action(&self, now: Instant, severity: Severity) {
        let inner = lock(&self.inner);
        if inner.break_started.is_some() {
            return;
        }
        let hours = session_hours(&inner, now);
        drop(inner);

        let time_factor = 1.0 + hours * hours * self.config.session_hours_quadratic;
        self.store_level(
            self.level() + self.config.per_action * severity.fatigue_multiplier() * time_factor,
        );
    }

    /// Pause accumulation for a break
    pub fn start_break(&self, now: Instant) {
        lock(&self.inner).break_started = Some(now);
    }

    /// Resume after a break, crediting recovery for its length
    pub fn end_break(&self, now: Instant) {
        let mut inner = lock(&self.inner);
        let Some(started) = inner.break_started.take() else {
            return;
        };
        drop(inner);
        let minutes = now.duration_since(started).as_secs_f64() / 60.0;
        let recovered = minutes * self.config.recovery_per_break_minute;
        self.store_level(self.level() - recovered);
        debug!(
            minutes = format!("{minutes:.1}"),
            recovered = format!("{recovered:.3}"),
            level = format!("{:.3}", self.level()),
            "break recovery applied"
        );
    }

    pub fn on_break(&self) -> bool {
        lock(&self.inner).break_started.is_some()
    }

    // Effect multipliers, all linear in the current level.

    /// Action delays stretch with fatigue
    pub fn delay_multiplier(&self) -> f64 {
        1.0 + self.level() * self.config.delay_effect
    }

    /// Timing variance widens with fatigue
    pub fn variance_multiplier(&self) -> f64 {
        1.0 + self.level() * self.config.variance_effect
    }

    /// Misclicks grow fastest of all the effects
    pub fn misclick_multiplier(&self) -> f64 {
        1.0 + self.level() * self.config.misclick_effect
    }

    /// Gaussian spread of reaction times widens
    pub fn sigma_multiplier(&self) -> f64 {
        1.0 + self.level() * self.config.sigma_effect
    }

    /// The slow tail of reaction times grows heaviest
    pub fn tau_multiplier(&self) -> f64 {
        1.0 + self.level() * self.config.tau_effect
    }
}

impl Default for FatigueAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

fn session_hours(inner: &FatigueInner, now: Instant) -> f64 {
    inner
        .session_started
        .map(|t| now.duration_since(t).as_secs_f64() / 3600.0)
        .unwrap_or(0.0)
}

fn lock(m: &Mutex<FatigueInner>) -> std::sync::MutexGuard<'_, FatigueInner> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
