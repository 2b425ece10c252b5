//! Profile drift
//!
//! Two clocks move a profile. Session drift runs once per session start:
//! small bounded wander that keeps consecutive sessions from being
//! statistical clones. Long-term drift runs per 20-hour block of
//! accumulated play: slow monotonic skill improvement. Neither ever
//! escapes the trait bounds, and the motor block drifts jointly so its
//! correlation structure survives months of sessions.

use rand::Rng;
use tracing::{debug, info};

use crate::core::config::{self, DriftConfig};
use crate::core::types::EpochMillis;
use crate::profile::traits::{
    bounds, motor_bounds, BehavioralProfile, DriftKind, DriftRecord, TraitDelta,
};
use crate::stats::distributions;
use crate::stats::matrix::MotorTrait;

pub struct ProfileDriftEngine {
    config: DriftConfig,
}

impl Default for ProfileDriftEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileDriftEngine {
    pub fn new() -> Self {
        Self {
            config: config::config().drift.clone(),
        }
    }

    pub fn with_config(config: DriftConfig) -> Self {
        Self { config }
    }

    /// Apply once at session start
    ///
    /// Motor traits drift multiplicatively through the cached Cholesky
    /// factor; drifting them independently would decay the correlation
    /// structure a little more every session, which is exactly the kind
    /// of slow statistical artifact this engine exists to avoid.
    /// Independent traits take Gaussian percentage steps. Everything
    /// reflects off its bounds rather than clamping, so traits never
    /// pile up at the edges.
    pub fn apply_session_drift<R: Rng + ?Sized>(
        &self,
        profile: &mut BehavioralProfile,
        now_ms: EpochMillis,
        rng: &mut R,
    ) {
        let sigma = self.config.session_sigma;
        let mut changes = Vec::new();

        let z = profile.cholesky.correlated_standard(rng);
        for t in MotorTrait::ALL {
            let (lo, hi) = motor_bounds(t);
            let before = profile.motor_value(t);
            let after = distributions::reflect_into(before * (sigma * z[t.index()]).exp(), lo, hi);
            profile.set_motor_value(t, after);
            push_delta(&mut changes, t.label(), before, after);
        }

        drift_scalar(rng, &mut changes, sigma, "click_variance", &mut profile.click_variance, bounds::CLICK_VARIANCE);
        drift_scalar(rng, &mut changes, sigma, "misclick_probability", &mut profile.misclick_probability, bounds::MISCLICK_PROBABILITY);
        drift_scalar(rng, &mut changes, sigma, "micro_correction_probability", &mut profile.micro_correction_probability, bounds::MICRO_CORRECTION_PROBABILITY);
        drift_scalar(rng, &mut changes, sigma, "overshoot_recovery_ms", &mut profile.overshoot_recovery_ms, bounds::OVERSHOOT_RECOVERY_MS);
        drift_scalar(rng, &mut changes, sigma, "double_click_gap_ms", &mut profile.double_click_gap_ms, bounds::DOUBLE_CLICK_GAP_MS);
        drift_scalar(rng, &mut changes, sigma, "reaction_variance_ms", &mut profile.reaction_variance_ms, bounds::REACTION_VARIANCE_MS);
        drift_scalar(rng, &mut changes, sigma, "reaction_tail_ms", &mut profile.reaction_tail_ms, bounds::REACTION_TAIL_MS);
        drift_scalar(rng, &mut changes, sigma, "typing_wpm", &mut profile.typing_wpm, bounds::TYPING_WPM);
        drift_scalar(rng, &mut changes, sigma, "typo_probability", &mut profile.typo_probability, bounds::TYPO_PROBABILITY);
        drift_scalar(rng, &mut changes, sigma, "typing_burst_variance", &mut profile.typing_burst_variance, bounds::TYPING_BURST_VARIANCE);
        drift_scalar(rng, &mut changes, sigma, "idle_jitter_mu_ms", &mut profile.idle_jitter_mu_ms, bounds::IDLE_JITTER_MU_MS);
        drift_scalar(rng, &mut changes, sigma, "idle_jitter_sigma_ms", &mut profile.idle_jitter_sigma_ms, bounds::IDLE_JITTER_SIGMA_MS);
        drift_scalar(rng, &mut changes, sigma, "idle_jitter_tau_ms", &mut profile.idle_jitter_tau_ms, bounds::IDLE_JITTER_TAU_MS);
        drift_scalar(rng, &mut changes, sigma, "cognitive_delay_variance_ms", &mut profile.cognitive_delay_variance_ms, bounds::COGNITIVE_DELAY_VARIANCE_MS);
        drift_scalar(rng, &mut changes, sigma, "decision_noise", &mut profile.decision_noise, bounds::DECISION_NOISE);
        drift_scalar(rng, &mut changes, sigma, "multitask_penalty", &mut profile.multitask_penalty, bounds::MULTITASK_PENALTY);
        drift_scalar(rng, &mut changes, sigma, "attention_span_multiplier", &mut profile.attention_span_multiplier, bounds::ATTENTION_SPAN_MULTIPLIER);
        drift_scalar(rng, &mut changes, sigma, "base_prediction_rate", &mut profile.base_prediction_rate, bounds::BASE_PREDICTION_RATE);
        drift_scalar(rng, &mut changes, sigma, "prediction_click_speed_bias", &mut profile.prediction_click_speed_bias, bounds::PREDICTION_CLICK_SPEED_BIAS);
        drift_scalar(rng, &mut changes, sigma, "break_threshold", &mut profile.break_threshold, bounds::BREAK_THRESHOLD);
        drift_scalar(rng, &mut changes, sigma, "micro_pause_affinity", &mut profile.micro_pause_affinity, bounds::MICRO_PAUSE_AFFINITY);
        drift_scalar(rng, &mut changes, sigma, "short_break_affinity", &mut profile.short_break_affinity, bounds::SHORT_BREAK_AFFINITY);
        drift_scalar(rng, &mut changes, sigma, "long_break_affinity", &mut profile.long_break_affinity, bounds::LONG_BREAK_AFFINITY);
        drift_scalar(rng, &mut changes, sigma, "session_length_hours", &mut profile.session_length_hours, bounds::SESSION_LENGTH_HOURS);
        drift_scalar(rng, &mut changes, sigma, "logout_ritual_probability", &mut profile.logout_ritual_probability, bounds::LOGOUT_RITUAL_PROBABILITY);
        drift_scalar(rng, &mut changes, sigma, "run_enable_threshold", &mut profile.run_enable_threshold, bounds::RUN_ENABLE_THRESHOLD);
        drift_scalar(rng, &mut changes, sigma, "run_disable_threshold", &mut profile.run_disable_threshold, bounds::RUN_DISABLE_THRESHOLD);
        drift_scalar(rng, &mut changes, sigma, "camera_rotation_speed", &mut profile.camera_rotation_speed, bounds::CAMERA_ROTATION_SPEED);
        drift_scalar(rng, &mut changes, sigma, "camera_zoom_preference", &mut profile.camera_zoom_preference, bounds::CAMERA_ZOOM_PREFERENCE);
        drift_scalar(rng, &mut changes, sigma, "idle_examine_rate_per_hour", &mut profile.idle_examine_rate_per_hour, bounds::IDLE_EXAMINE_RATE);
        drift_scalar(rng, &mut changes, sigma, "skill_check_rate_per_hour", &mut profile.skill_check_rate_per_hour, bounds::SKILL_CHECK_RATE);
        drift_scalar(rng, &mut changes, sigma, "inventory_check_rate_per_hour", &mut profile.inventory_check_rate_per_hour, bounds::INVENTORY_CHECK_RATE);
        drift_scalar(rng, &mut changes, sigma, "day_consistency", &mut profile.day_consistency, bounds::DAY_CONSISTENCY);
        drift_scalar(rng, &mut changes, sigma, "tremor_frequency_hz", &mut profile.tremor_frequency_hz, bounds::TREMOR_FREQUENCY_HZ);
        drift_scalar(rng, &mut changes, sigma, "scroll_speed_multiplier", &mut profile.scroll_speed_multiplier, bounds::SCROLL_SPEED_MULTIPLIER);
        drift_scalar(rng, &mut changes, sigma, "menu_hover_dwell_ms", &mut profile.menu_hover_dwell_ms, bounds::MENU_HOVER_DWELL_MS);

        profile.enforce_run_hysteresis();

        debug!(identity = %profile.identity, traits_moved = changes.len(), "session drift applied");
        profile.push_drift_record(
            DriftRecord {
                timestamp_ms: now_ms,
                kind: DriftKind::Session,
                changes,
            },
            self.config.history_cap,
        );
    }

    /// Apply pending long-term skill drift, one record per 20-hour block
    ///
    /// Returns how many blocks were applied.
    pub fn apply_long_term_drift<R: Rng + ?Sized>(
        &self,
        profile: &mut BehavioralProfile,
        now_ms: EpochMillis,
        rng: &mut R,
    ) -> u32 {
        let hours_played = profile.total_playtime_minutes / 60.0;
        let total_blocks = (hours_played / self.config.long_term_block_hours) as u32;
        let pending = total_blocks.saturating_sub(profile.long_term_blocks_applied);
        if pending == 0 {
            return 0;
        }

        for _ in 0..pending {
            let mut changes = Vec::new();

            let before = profile.mouse_speed_multiplier;
            let gain = rng.gen_range(self.config.mouse_speed_gain_min..self.config.mouse_speed_gain_max);
            profile.mouse_speed_multiplier = (before + gain).min(bounds::MOUSE_SPEED.1);
            push_delta(&mut changes, "mouse_speed_multiplier", before, profile.mouse_speed_multiplier);

            let before = profile.click_variance;
            let decline = rng
                .gen_range(self.config.click_variance_decline_min..self.config.click_variance_decline_max);
            profile.click_variance = (before - decline).max(bounds::CLICK_VARIANCE.0);
            push_delta(&mut changes, "click_variance", before, profile.click_variance);

            let before = profile.reaction_median_ms;
            let decline =
                rng.gen_range(self.config.reaction_decline_min_ms..self.config.reaction_decline_max_ms);
            profile.reaction_median_ms = (before - decline).max(bounds::REACTION_MEDIAN_MS.0);
            push_delta(&mut changes, "reaction_median_ms", before, profile.reaction_median_ms);

            profile.push_drift_record(
                DriftRecord {
                    timestamp_ms: now_ms,
                    kind: DriftKind::LongTerm,
                    changes,
                },
                self.config.history_cap,
            );
        }
        profile.long_term_blocks_applied = total_blocks;

        info!(
            identity = %profile.identity,
            blocks = pending,
            hours_played = format!("{hours_played:.1}"),
            "long-term drift applied"
        );
        pending
    }
}

fn drift_scalar<R: Rng + ?Sized>(
    rng: &mut R,
    changes: &mut Vec<TraitDelta>,
    sigma: f64,
    name: &'static str,
    value: &mut f64,
    (lo, hi): (f64, f64),
) {
    let before = *value;
    let noise = distributions::gaussian(rng, 0.0, sigma * before.abs());
    let after = distributions::reflect_into(before + noise, lo, hi);
    *value = after;
    push_delta(changes, name, before, after);
}

fn push_delta(changes: &mut Vec<TraitDelta>, name: &str, before: f64, after: f64) {
    if (after - before).abs() > 1e-12 {
        changes.push(TraitDelta {
            trait_name: name.to_string(),
            before,
            after,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::IdentityId;
    use crate::profile::generation::generate_profile;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn engine() -> ProfileDriftEngine {
        ProfileDriftEngine::with_config(DriftConfig::default())
    }

    #[test]
    fn test_session_drift_respects_all_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut p = generate_profile(IdentityId::new(), 1, 0).unwrap();
        let e = engine();
        for i in 0..300 {
            e.apply_session_drift(&mut p, i, &mut rng);
            assert!(p.validate().is_ok(), "drift {i}: {:?}", p.validate());
        }
    }

    #[test]
    fn test_session_drift_moves_traits() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut p = generate_profile(IdentityId::new(), 2, 0).unwrap();
        let before = p.clone();
        engine().apply_session_drift(&mut p, 1000, &mut rng);
        assert_ne!(p.mouse_speed_multiplier, before.mouse_speed_multiplier);
        assert_ne!(p.typing_wpm, before.typing_wpm);
        // Correlation structure itself never drifts
        assert_eq!(p.correlation, before.correlation);
    }

    #[test]
    fn test_drift_records_accumulate_and_cap() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut p = generate_profile(IdentityId::new(), 3, 0).unwrap();
        let e = ProfileDriftEngine::with_config(DriftConfig {
            history_cap: 50,
            ..DriftConfig::default()
        });
        for i in 0..80 {
            e.apply_session_drift(&mut p, i, &mut rng);
        }
        assert_eq!(p.drift_history.len(), 50);
        assert_eq!(p.drift_history[0].timestamp_ms, 30);
        assert!(p.drift_history.iter().all(|r| r.kind == DriftKind::Session));
        assert!(!p.drift_history[0].changes.is_empty());
    }

    #[test]
    fn test_long_term_drift_applies_whole_blocks() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut p = generate_profile(IdentityId::new(), 4, 0).unwrap();
        p.total_playtime_minutes = 45.0 * 60.0;

        let before_speed = p.mouse_speed_multiplier;
        let before_variance = p.click_variance;
        let before_reaction = p.reaction_median_ms;

        let applied = engine().apply_long_term_drift(&mut p, 500, &mut rng);
        assert_eq!(applied, 2);
        assert_eq!(p.long_term_blocks_applied, 2);
        assert!(p.mouse_speed_multiplier >= before_speed);
        assert!(p.click_variance <= before_variance);
        assert!(p.reaction_median_ms <= before_reaction);
        assert_eq!(
            p.drift_history.iter().filter(|r| r.kind == DriftKind::LongTerm).count(),
            2
        );

        // Same playtime again is a no-op
        assert_eq!(engine().apply_long_term_drift(&mut p, 600, &mut rng), 0);
    }

    #[test]
    fn test_long_term_drift_saturates_at_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let mut p = generate_profile(IdentityId::new(), 5, 0).unwrap();
        p.total_playtime_minutes = 2000.0 * 60.0;

        engine().apply_long_term_drift(&mut p, 0, &mut rng);
        assert!(p.validate().is_ok());
        assert!((p.mouse_speed_multiplier - bounds::MOUSE_SPEED.1).abs() < 1e-9);
        assert!((p.click_variance - bounds::CLICK_VARIANCE.0).abs() < 1e-9);
        assert!((p.reaction_median_ms - bounds::REACTION_MEDIAN_MS.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_block_does_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(15);
        let mut p = generate_profile(IdentityId::new(), 6, 0).unwrap();
        p.total_playtime_minutes = 19.5 * 60.0;
        assert_eq!(engine().apply_long_term_drift(&mut p, 0, &mut rng), 0);
        assert_eq!(p.long_term_blocks_applied, 0);
    }
}
