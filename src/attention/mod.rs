//! Attention state machine
//!
//! Three states: focused, distracted, away. Dwell times are log-normal
//! (median near 90 seconds with a long right tail) and transitions are
//! sticky, so the machine produces runs of focus broken by wandering
//! rather than a memoryless flicker. Real-world interruptions arrive two
//! ways: a rate-limited external distraction process (phones, doorbells)
//! and incoming chat messages.

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::debug;

use crate::activity::Severity;
use crate::core::config::{self, AttentionConfig};
use crate::core::types::RiskClass;
use crate::stats::distributions;

/// Exit distribution for a scheduled wander-away
const SCHEDULED_EXIT_FOCUSED_P: f64 = 0.75;

/// Exit distribution for a forced interruption; coming back from a real
/// interruption usually means re-engaging properly
const FORCED_EXIT_FOCUSED_P: f64 = 0.80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttentionState {
    Focused,
    Distracted,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AwayKind {
    Scheduled,
    Forced,
}

pub struct AttentionStateMachine {
    config: AttentionConfig,
    hardcore: bool,
    /// Profile trait scaling transition intervals
    span_multiplier: f64,
    state: AttentionState,
    next_transition: Instant,
    away_until: Option<(Instant, AwayKind)>,
    last_external_check: Instant,
    last_severity: Severity,
}

impl AttentionStateMachine {
    pub fn new<R: Rng + ?Sized>(
        now: Instant,
        risk: RiskClass,
        span_multiplier: f64,
        rng: &mut R,
    ) -> Self {
        Self::with_config(config::config().attention.clone(), now, risk, span_multiplier, rng)
    }

    pub fn with_config<R: Rng + ?Sized>(
        config: AttentionConfig,
        now: Instant,
        risk: RiskClass,
        span_multiplier: f64,
        rng: &mut R,
    ) -> Self {
        let mut machine = Self {
            config,
            hardcore: risk.is_hardcore(),
            span_multiplier,
            state: AttentionState::Focused,
            next_transition: now,
            away_until: None,
            last_external_check: now,
            last_severity: Severity::Idle,
        };
        machine.next_transition = now + machine.sample_interval(rng);
        machine
    }

    pub fn state(&self) -> AttentionState {
        self.state
    }

    pub fn is_away(&self) -> bool {
        self.state == AttentionState::Away
    }

    /// Advance the machine; call once per engine tick
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        now: Instant,
        severity: Severity,
        rng: &mut R,
    ) -> AttentionState {
        self.last_severity = severity;

        if let Some((until, kind)) = self.away_until {
            if now < until {
                return self.state;
            }
            let focused_p = match kind {
                AwayKind::Scheduled => SCHEDULED_EXIT_FOCUSED_P,
                AwayKind::Forced => FORCED_EXIT_FOCUSED_P,
            };
            self.state = if distributions::chance(rng, focused_p) {
                AttentionState::Focused
            } else {
                AttentionState::Distracted
            };
            self.away_until = None;
            self.next_transition = now + self.sample_interval(rng);
            debug!(state = ?self.state, "returned from away");
            return self.state;
        }

        self.check_external_distraction(now, severity, rng);
        if self.is_away() {
            return self.state;
        }

        if now >= self.next_transition {
            self.roll_transition(now, severity, rng);
        }
        self.state
    }

    /// An incoming chat message; returns true if it pulled attention away
    pub fn notify_chat_message<R: Rng + ?Sized>(&mut self, now: Instant, rng: &mut R) -> bool {
        if self.is_away() || self.last_severity.at_least(Severity::High) {
            return false;
        }
        if !distributions::chance(rng, self.config.chat_distraction_probability) {
            return false;
        }
        let duration = self.sample_forced_duration(rng);
        debug!(secs = duration.as_secs_f64(), "chat message pulled attention away");
        self.force_away(now, duration);
        true
    }

    /// Force the away state for a fixed duration
    pub fn force_away(&mut self, now: Instant, duration: Duration) {
        self.state = AttentionState::Away;
        self.away_until = Some((now + duration, AwayKind::Forced));
    }

    /// Combined mental load from attention state and activity
    ///
    /// Away contributes nothing: nobody is thinking about the game at all.
    pub fn cognitive_load(&self, severity: Severity) -> f64 {
        let state_load: f64 = match self.state {
            AttentionState::Focused => 0.1,
            AttentionState::Distracted => 0.5,
            AttentionState::Away => 0.0,
        };
        let severity_load = match severity {
            Severity::Critical => 0.5,
            Severity::High => 0.3,
            Severity::Medium => 0.15,
            Severity::Low => 0.05,
            Severity::Idle => 0.0,
        };
        (state_load + severity_load).min(1.0)
    }

    /// Action delay multiplier; callers gate on `is_away` first
    pub fn delay_multiplier(&self) -> f64 {
        match self.state {
            AttentionState::Focused => 1.0,
            AttentionState::Distracted | AttentionState::Away => {
                self.config.distracted_delay_multiplier
            }
        }
    }

    /// Extra event-reaction lag in the current state
    pub fn reaction_lag_ms<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        match self.state {
            AttentionState::Focused => 0,
            AttentionState::Distracted | AttentionState::Away => {
                rng.gen_range(self.config.distracted_lag_min_ms..=self.config.distracted_lag_max_ms)
            }
        }
    }

    fn check_external_distraction<R: Rng + ?Sized>(
        &mut self,
        now: Instant,
        severity: Severity,
        rng: &mut R,
    ) {
        let gap = now.duration_since(self.last_external_check);
        if gap.as_millis() < u128::from(self.config.external_check_min_gap_ms) {
            return;
        }
        self.last_external_check = now;
        if severity.at_least(Severity::High) {
            return;
        }
        let p = self.config.external_rate_per_hour * gap.as_secs_f64() / 3600.0;
        if distributions::chance(rng, p) {
            let duration = self.sample_forced_duration(rng);
            debug!(secs = duration.as_secs_f64(), "external distraction");
            self.force_away(now, duration);
        }
    }

    fn roll_transition<R: Rng + ?Sized>(&mut self, now: Instant, severity: Severity, rng: &mut R) {
        let mut focused_w = self.config.base_focused;
        let mut distracted_w = self.config.base_distracted;
        let mut away_w = self.config.base_away;

        // Stickiness favors staying put
        match self.state {
            AttentionState::Focused => focused_w *= self.config.stickiness_focused,
            AttentionState::Distracted => distracted_w *= self.config.stickiness_distracted,
            AttentionState::Away => away_w *= self.config.stickiness_away,
        }
        // Nobody wanders off mid-fight
        if severity.at_least(Severity::High) {
            away_w = 0.0;
        }
        if self.hardcore {
            away_w *= self.config.hardcore_away_factor;
        }

        let total = focused_w + distracted_w + away_w;
        let roll = rng.gen::<f64>() * total;
        let previous = self.state;
        self.state = if roll < focused_w {
            AttentionState::Focused
        } else if roll < focused_w + distracted_w {
            AttentionState::Distracted
        } else {
            AttentionState::Away
        };

        if self.state == AttentionState::Away {
            let secs = rng.gen_range(
                self.config.away_duration_min_secs..self.config.away_duration_max_secs,
            );
            self.away_until = Some((now + Duration::from_secs_f64(secs), AwayKind::Scheduled));
        }
        self.next_transition = now + self.sample_interval(rng);

        if previous != self.state {
            debug!(from = ?previous, to = ?self.state, "attention transition");
        }
    }

    fn sample_interval<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let secs = distributions::log_normal(
            rng,
            self.config.interval_log_mu,
            self.config.interval_log_sigma,
        ) * self.span_multiplier;
        Duration::from_secs_f64(secs.clamp(
            self.config.interval_min_secs,
            self.config.interval_max_secs,
        ))
    }

    fn sample_forced_duration<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_secs_f64(rng.gen_range(
            self.config.external_duration_min_secs..self.config.external_duration_max_secs,
        ))
    }
}
