//! Break scheduling
//!
//! Four tiers with one shared pending slot: micro-pauses (a few seconds,
//! counted in actions), short breaks, long breaks, and the session end.
//! Higher tiers are checked first; once the slot is filled nothing
//! replaces it, and execution waits until the caller reports the player
//! is interruptible. Failed probability rolls resample the due time so a
//! decision is made once per due interval, not once per tick.

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::debug;

use crate::core::config::{self, BreakConfig};
use crate::core::types::RiskClass;
use crate::stats::distributions;

/// Gap between fatigue-triggered breaks; break recovery needs time to
/// show before the trigger re-arms
const FATIGUE_RETRIGGER_COOLDOWN_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakTier {
    Micro,
    Short,
    Long,
    SessionEnd,
}

/// A break waiting to be executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBreak {
    pub tier: BreakTier,
    /// Zero for a session end; the caller logs out instead of waiting
    pub duration: Duration,
    pub fatigue_triggered: bool,
}

/// Profile-derived inputs to the schedule
#[derive(Debug, Clone, Copy)]
pub struct BreakPreferences {
    pub micro_pause_affinity: f64,
    pub short_break_affinity: f64,
    pub long_break_affinity: f64,
    pub session_length_hours: f64,
    pub break_threshold: f64,
}

pub struct BreakScheduler {
    config: BreakConfig,
    prefs: BreakPreferences,
    actions_since_micro: u32,
    micro_threshold: u32,
    short_due_at: Instant,
    long_due_at: Instant,
    session_ends_at: Instant,
    fatigue_retry_at: Instant,
    pending: Option<PendingBreak>,
}

impl BreakScheduler {
    pub fn new<R: Rng + ?Sized>(
        now: Instant,
        prefs: BreakPreferences,
        risk: RiskClass,
        rng: &mut R,
    ) -> Self {
        Self::with_config(config::config().breaks.clone(), now, prefs, risk, rng)
    }

    pub fn with_config<R: Rng + ?Sized>(
        config: BreakConfig,
        now: Instant,
        prefs: BreakPreferences,
        risk: RiskClass,
        rng: &mut R,
    ) -> Self {
        // Hardcore identities play shorter, more careful sessions
        let factor = if risk.is_hardcore() {
            config.hardcore_session_factor
        } else {
            1.0
        };
        let hours = (prefs.session_length_hours * rng.gen_range(0.85..1.15) * factor)
            .clamp(config.session_min_hours * factor, config.session_max_hours * factor);

        let mut scheduler = Self {
            prefs,
            actions_since_micro: 0,
            micro_threshold: 0,
            short_due_at: now,
            long_due_at: now,
            session_ends_at: now + Duration::from_secs_f64(hours * 3600.0),
            fatigue_retry_at: now,
            pending: None,
            config,
        };
        scheduler.micro_threshold = scheduler.sample_micro_threshold(rng);
        scheduler.short_due_at = now + scheduler.sample_short_interval(rng);
        scheduler.long_due_at = now + scheduler.sample_long_interval(rng);
        scheduler
    }

    /// When this session is scheduled to end
    pub fn scheduled_session_end(&self) -> Instant {
        self.session_ends_at
    }

    pub fn pending_tier(&self) -> Option<BreakTier> {
        self.pending.as_ref().map(|p| p.tier)
    }

    /// Count one action toward the micro-pause cadence
    pub fn record_action(&mut self) {
        self.actions_since_micro += 1;
    }

    /// Check every tier, filling the single pending slot
    pub fn update<R: Rng + ?Sized>(&mut self, now: Instant, fatigue_level: f64, rng: &mut R) {
        if self.pending.is_some() {
            return;
        }

        if now >= self.session_ends_at {
            self.set_pending(PendingBreak {
                tier: BreakTier::SessionEnd,
                duration: Duration::ZERO,
                fatigue_triggered: false,
            });
            return;
        }

        if now >= self.long_due_at {
            let p = (self.config.long_probability * self.prefs.long_break_affinity).min(0.95);
            if distributions::chance(rng, p) {
                let mins = rng
                    .gen_range(self.config.long_duration_min_mins..self.config.long_duration_max_mins);
                self.set_pending(PendingBreak {
                    tier: BreakTier::Long,
                    duration: Duration::from_secs_f64(mins * 60.0),
                    fatigue_triggered: false,
                });
                return;
            }
            self.long_due_at = now + self.sample_long_interval(rng);
        }

        // Fatigue past the personal threshold forces a short break,
        // skipping the probability roll entirely
        if fatigue_level >= self.prefs.break_threshold && now >= self.fatigue_retry_at {
            self.set_pending(PendingBreak {
                tier: BreakTier::Short,
                duration: self.sample_short_duration(rng),
                fatigue_triggered: true,
            });
            return;
        }

        if now >= self.short_due_at {
            let p = (self.config.short_probability * self.prefs.short_break_affinity).min(0.95);
            if distributions::chance(rng, p) {
                self.set_pending(PendingBreak {
                    tier: BreakTier::Short,
                    duration: self.sample_short_duration(rng),
                    fatigue_triggered: false,
                });
                return;
            }
            self.short_due_at = now + self.sample_short_interval(rng);
        }

        if self.actions_since_micro >= self.micro_threshold {
            let p = (self.config.micro_probability * self.prefs.micro_pause_affinity).min(0.95);
            if distributions::chance(rng, p) {
                let secs = rng.gen_range(
                    self.config.micro_duration_min_secs..self.config.micro_duration_max_secs,
                );
                self.set_pending(PendingBreak {
                    tier: BreakTier::Micro,
                    duration: Duration::from_secs_f64(secs),
                    fatigue_triggered: false,
                });
            }
            self.actions_since_micro = 0;
            self.micro_threshold = self.sample_micro_threshold(rng);
        }
    }

    /// Hand over the pending break for execution, emptying the slot
    ///
    /// Callers invoke this only when the player is interruptible; until
    /// then the break simply waits.
    pub fn take_pending(&mut self) -> Option<PendingBreak> {
        self.pending.take()
    }

    /// Report an executed break so the schedule moves on
    pub fn complete_break<R: Rng + ?Sized>(&mut self, tier: BreakTier, now: Instant, rng: &mut R) {
        match tier {
            BreakTier::Micro => {
                self.actions_since_micro = 0;
                self.micro_threshold = self.sample_micro_threshold(rng);
            }
            BreakTier::Short => {
                self.short_due_at = now + self.sample_short_interval(rng);
                self.fatigue_retry_at =
                    now + Duration::from_secs(FATIGUE_RETRIGGER_COOLDOWN_SECS);
            }
            BreakTier::Long => {
                // A long break is also a short break as far as the short
                // cadence is concerned
                self.long_due_at = now + self.sample_long_interval(rng);
                self.short_due_at = now + self.sample_short_interval(rng);
                self.fatigue_retry_at =
                    now + Duration::from_secs(FATIGUE_RETRIGGER_COOLDOWN_SECS);
            }
            BreakTier::SessionEnd => {}
        }
    }

    fn set_pending(&mut self, pending: PendingBreak) {
        debug!(tier = ?pending.tier, secs = pending.duration.as_secs_f64(), fatigue = pending.fatigue_triggered, "break pending");
        self.pending = Some(pending);
    }

    fn sample_micro_threshold<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        let base = rng.gen_range(self.config.micro_actions_min..=self.config.micro_actions_max);
        let jitter =
            rng.gen_range(-self.config.micro_threshold_jitter..=self.config.micro_threshold_jitter);
        (base as i32 + jitter).max(1) as u32
    }

    fn sample_short_duration<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_secs_f64(
            rng.gen_range(self.config.short_duration_min_secs..self.config.short_duration_max_secs),
        )
    }

    fn sample_short_interval<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let mean =
            rng.gen_range(self.config.short_interval_min_mins..self.config.short_interval_max_mins);
        let mins = distributions::exponential(rng, mean).clamp(
            self.config.short_interval_min_mins * 0.5,
            self.config.short_interval_max_mins * 2.0,
        );
        Duration::from_secs_f64(mins * 60.0)
    }

    fn sample_long_interval<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let mean =
            rng.gen_range(self.config.long_interval_min_mins..self.config.long_interval_max_mins);
        let mins = distributions::exponential(rng, mean).clamp(
            self.config.long_interval_min_mins * 0.5,
            self.config.long_interval_max_mins * 2.0,
        );
        Duration::from_secs_f64(mins * 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn prefs() -> BreakPreferences {
        BreakPreferences {
            micro_pause_affinity: 1.0,
            short_break_affinity: 1.0,
            long_break_affinity: 1.0,
            session_length_hours: 4.0,
            break_threshold: 0.7,
        }
    }

    fn scheduler(now: Instant, rng: &mut ChaCha8Rng) -> BreakScheduler {
        BreakScheduler::with_config(BreakConfig::default(), now, prefs(), RiskClass::Standard, rng)
    }

    #[test]
    fn test_session_end_has_top_priority_and_slot_is_single() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let t0 = Instant::now();
        let mut s = scheduler(t0, &mut rng);

        // Far past everything at once
        let late = t0 + Duration::from_secs(8 * 3600);
        s.update(late, 0.9, &mut rng);
        assert_eq!(s.pending_tier(), Some(BreakTier::SessionEnd));

        // Slot already filled; nothing replaces it
        s.update(late + Duration::from_secs(60), 0.95, &mut rng);
        assert_eq!(s.pending_tier(), Some(BreakTier::SessionEnd));

        let taken = s.take_pending().unwrap();
        assert_eq!(taken.tier, BreakTier::SessionEnd);
        assert_eq!(taken.duration, Duration::ZERO);
        assert_eq!(s.pending_tier(), None);
    }

    #[test]
    fn test_session_length_respects_risk_class() {
        let t0 = Instant::now();
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let std = BreakScheduler::with_config(
                BreakConfig::default(),
                t0,
                prefs(),
                RiskClass::Standard,
                &mut rng,
            );
            let hc = BreakScheduler::with_config(
                BreakConfig::default(),
                t0,
                prefs(),
                RiskClass::Hardcore,
                &mut rng,
            );
            let std_hours =
                std.scheduled_session_end().duration_since(t0).as_secs_f64() / 3600.0;
            let hc_hours = hc.scheduled_session_end().duration_since(t0).as_secs_f64() / 3600.0;
            assert!((3.4..=4.6).contains(&std_hours), "standard {std_hours}");
            assert!((2.7..=3.7).contains(&hc_hours), "hardcore {hc_hours}");
        }
    }

    #[test]
    fn test_fatigue_trigger_skips_probability_roll() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let t0 = Instant::now();
        let mut s = scheduler(t0, &mut rng);

        // Well before the short timer is due
        let now = t0 + Duration::from_secs(30);
        s.update(now, 0.85, &mut rng);
        let pending = s.take_pending().expect("fatigue break must fire");
        assert_eq!(pending.tier, BreakTier::Short);
        assert!(pending.fatigue_triggered);
    }

    #[test]
    fn test_fatigue_trigger_cooldown_after_completion() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let t0 = Instant::now();
        let mut s = scheduler(t0, &mut rng);

        let now = t0 + Duration::from_secs(30);
        s.update(now, 0.9, &mut rng);
        s.take_pending().unwrap();
        s.complete_break(BreakTier::Short, now + Duration::from_secs(60), &mut rng);

        // Still exhausted a minute later, but inside the cooldown
        let soon = now + Duration::from_secs(120);
        s.update(soon, 0.9, &mut rng);
        assert_eq!(s.pending_tier(), None);

        let later = now + Duration::from_secs(60 + FATIGUE_RETRIGGER_COOLDOWN_SECS + 1);
        s.update(later, 0.9, &mut rng);
        assert_eq!(s.pending_tier(), Some(BreakTier::Short));
    }

    #[test]
    fn test_micro_pause_cadence() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let t0 = Instant::now();
        let mut s = scheduler(t0, &mut rng);

        // A fixed instant keeps the timed tiers out of the picture
        let now = t0 + Duration::from_secs(1);
        let mut fired = false;
        for _ in 0..50 {
            // Drive a full threshold's worth of actions
            for _ in 0..200 {
                s.record_action();
            }
            s.update(now, 0.0, &mut rng);
            if let Some(pending) = s.take_pending() {
                assert_eq!(pending.tier, BreakTier::Micro);
                let secs = pending.duration.as_secs_f64();
                assert!((2.0..8.0).contains(&secs), "micro duration {secs}");
                fired = true;
                break;
            }
            assert_eq!(s.actions_since_micro, 0, "counter must reset on a failed roll");
        }
        assert!(fired, "micro pause never fired across 50 thresholds");
    }

    #[test]
    fn test_short_break_resamples_on_failed_roll() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let t0 = Instant::now();
        let mut s = scheduler(t0, &mut rng);

        let due = s.short_due_at;
        let mut fired_or_moved = 0;
        for i in 0..200u64 {
            let now = due + Duration::from_secs(i);
            s.update(now, 0.0, &mut rng);
            if s.pending_tier().is_some() || s.short_due_at > due {
                fired_or_moved += 1;
                break;
            }
        }
        assert!(fired_or_moved > 0, "short break neither fired nor rescheduled");
    }

    #[test]
    fn test_long_break_completion_resets_short_cadence() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let t0 = Instant::now();
        let mut s = scheduler(t0, &mut rng);

        let completion = t0 + Duration::from_secs(2 * 3600);
        s.complete_break(BreakTier::Long, completion, &mut rng);
        assert!(s.short_due_at > completion);
        assert!(s.long_due_at > completion);
    }

    #[test]
    fn test_long_break_duration_bounds() {
        let t0 = Instant::now();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut s = scheduler(t0, &mut rng);

        // Pin the due point just ahead of a fixed instant so only the
        // long tier is ever eligible; failed rolls just retry
        let now = t0 + Duration::from_secs(1);
        for _ in 0..60 {
            s.long_due_at = now;
            s.update(now, 0.0, &mut rng);
            if let Some(pending) = s.take_pending() {
                assert_eq!(pending.tier, BreakTier::Long);
                let mins = pending.duration.as_secs_f64() / 60.0;
                assert!((5.0..20.0).contains(&mins), "long duration {mins}");
                return;
            }
        }
        panic!("long break never fired");
    }
}
