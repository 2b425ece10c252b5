//! Day-to-day form and task familiarity
//!
//! Two slow modifiers on top of the per-identity baseline: a daily form
//! multiplier (some days are just off days) and per-task proficiency
//! (practiced tasks need less thinking). Both shift timing, never
//! pointer mechanics.

use rand::Rng;

use crate::core::config::PerformanceConfig;
use crate::core::types::EpochMillis;
use crate::profile::traits::BehavioralProfile;
use crate::stats::distributions;

const MS_PER_DAY: u64 = 86_400_000;
const MS_PER_HOUR: f64 = 3_600_000.0;

/// Performance-adjusted overshoot never exceeds this
const OVERSHOOT_CEILING: f64 = 0.40;

/// Performance-adjusted wobble never exceeds this
const WOBBLE_CEILING: f64 = 2.0;

/// Today's form, rolled once and held for the day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyPerformance {
    /// Above 1.0 is a good day: faster, tighter
    pub multiplier: f64,
    pub rolled_at_ms: EpochMillis,
}

impl DailyPerformance {
    /// Resume or re-roll form at session start
    ///
    /// The previous day's value feeds an AR(1) step: good form persists
    /// more strongly than slumps, because people shake off bad days
    /// faster than they lose good ones. Within the same day and under
    /// the regen gap, the existing multiplier is reused as is.
    pub fn roll_for_session<R: Rng + ?Sized>(
        profile: &BehavioralProfile,
        now_ms: EpochMillis,
        cfg: &PerformanceConfig,
        rng: &mut R,
    ) -> Self {
        let prev = profile.daily_multiplier;
        let prev_at = profile.daily_rolled_at_ms;

        if prev_at > 0 {
            let same_day = prev_at / MS_PER_DAY == now_ms / MS_PER_DAY;
            let gap_hours = now_ms.saturating_sub(prev_at) as f64 / MS_PER_HOUR;
            if same_day && gap_hours < cfg.regen_gap_hours {
                return Self {
                    multiplier: prev,
                    rolled_at_ms: prev_at,
                };
            }
        }

        let phi = if prev < 1.0 { cfg.ar_degrading } else { cfg.ar_recovering };
        // Consistent identities swing less day to day
        let sigma = cfg.innovation_sigma * (1.5 - profile.day_consistency);
        let next = 1.0 + phi * (prev - 1.0) + distributions::gaussian(rng, 0.0, sigma);
        Self {
            multiplier: next.clamp(cfg.min_multiplier, cfg.max_multiplier),
            rolled_at_ms: now_ms,
        }
    }

    /// Delays shrink on good days
    pub fn scale_delay(&self, ms: f64) -> f64 {
        ms / self.multiplier
    }

    /// Speeds grow on good days
    pub fn scale_speed(&self, value: f64) -> f64 {
        value * self.multiplier
    }

    /// Overshoot rises on bad days, capped at a hard ceiling
    pub fn adjusted_overshoot(&self, base: f64) -> f64 {
        (base * (2.0 - self.multiplier)).min(OVERSHOOT_CEILING)
    }

    /// Path wobble rises on bad days, capped at a hard ceiling
    pub fn adjusted_wobble(&self, base: f64) -> f64 {
        (base * (2.0 - self.multiplier)).min(WOBBLE_CEILING)
    }
}

/// Cognitive-delay multiplier from accumulated practice on a task
///
/// Linear ramp from 1.0 (never done it) down to `1 - max_reduction`
/// (fully familiar) across `proficiency_full_minutes` of practice.
pub fn proficiency_multiplier(
    profile: &BehavioralProfile,
    task: &str,
    cfg: &PerformanceConfig,
) -> f64 {
    let minutes = profile.minutes_on_task(task);
    1.0 - cfg.proficiency_max_reduction * (minutes / cfg.proficiency_full_minutes).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::IdentityId;
    use crate::profile::generation::generate_profile;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn profile_with(prev: f64, prev_at: EpochMillis) -> BehavioralProfile {
        let mut p = generate_profile(IdentityId::new(), 7, 0).unwrap();
        p.daily_multiplier = prev;
        p.daily_rolled_at_ms = prev_at;
        p.day_consistency = 0.75;
        p
    }

    #[test]
    fn test_same_day_short_gap_resumes() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let cfg = PerformanceConfig::default();
        let noon = 1_700_000_000_000u64 / MS_PER_DAY * MS_PER_DAY + 12 * 3_600_000;
        let p = profile_with(1.08, noon);
        let perf = DailyPerformance::roll_for_session(&p, noon + 2 * 3_600_000, &cfg, &mut rng);
        assert_eq!(perf.multiplier, 1.08);
        assert_eq!(perf.rolled_at_ms, noon);
    }

    #[test]
    fn test_new_day_rerolls() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let cfg = PerformanceConfig::default();
        let day_start = 1_700_000_000_000u64 / MS_PER_DAY * MS_PER_DAY;
        let p = profile_with(1.08, day_start + 3_600_000);
        let next_day = day_start + MS_PER_DAY + 3_600_000;
        let perf = DailyPerformance::roll_for_session(&p, next_day, &cfg, &mut rng);
        assert_eq!(perf.rolled_at_ms, next_day);
    }

    #[test]
    fn test_long_gap_rerolls_within_day() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let cfg = PerformanceConfig::default();
        let day_start = 1_700_000_000_000u64 / MS_PER_DAY * MS_PER_DAY;
        let p = profile_with(0.92, day_start + 3_600_000);
        let later = day_start + 3_600_000 + 7 * 3_600_000;
        let perf = DailyPerformance::roll_for_session(&p, later, &cfg, &mut rng);
        assert_eq!(perf.rolled_at_ms, later);
    }

    #[test]
    fn test_multiplier_stays_clamped() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let cfg = PerformanceConfig::default();
        let mut p = profile_with(1.0, 0);
        for day in 1..400u64 {
            let now = day * MS_PER_DAY + 10 * 3_600_000;
            let perf = DailyPerformance::roll_for_session(&p, now, &cfg, &mut rng);
            assert!((cfg.min_multiplier..=cfg.max_multiplier).contains(&perf.multiplier));
            p.daily_multiplier = perf.multiplier;
            p.daily_rolled_at_ms = perf.rolled_at_ms;
        }
    }

    #[test]
    fn test_good_form_persists_more_than_slumps() {
        let cfg = PerformanceConfig::default();
        let day_start = 1_700_000_000_000u64 / MS_PER_DAY * MS_PER_DAY;
        let next_day = day_start + MS_PER_DAY + 3_600_000;

        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let good = profile_with(1.12, day_start);
        let bad = profile_with(0.88, day_start);
        let n = 3000;
        let mean_after_good: f64 = (0..n)
            .map(|_| DailyPerformance::roll_for_session(&good, next_day, &cfg, &mut rng).multiplier)
            .sum::<f64>()
            / n as f64;
        let mean_after_bad: f64 = (0..n)
            .map(|_| DailyPerformance::roll_for_session(&bad, next_day, &cfg, &mut rng).multiplier)
            .sum::<f64>()
            / n as f64;

        // Expected centers: 1 + 0.7 * 0.12 = 1.084 and 1 - 0.4 * 0.12 = 0.952
        assert!(mean_after_good > 1.05, "good mean {mean_after_good}");
        assert!((0.93..0.98).contains(&mean_after_bad), "bad mean {mean_after_bad}");
        // The good day's pull exceeds the bad day's pull in magnitude
        assert!(mean_after_good - 1.0 > 1.0 - mean_after_bad);
    }

    #[test]
    fn test_scaling_directions() {
        let perf = DailyPerformance {
            multiplier: 1.1,
            rolled_at_ms: 0,
        };
        assert!(perf.scale_delay(300.0) < 300.0);
        assert!(perf.scale_speed(1.0) > 1.0);
        let off = DailyPerformance {
            multiplier: 0.85,
            rolled_at_ms: 0,
        };
        assert!(off.scale_delay(300.0) > 300.0);
        assert!(off.adjusted_overshoot(0.12) > 0.12);
        assert!(off.adjusted_overshoot(0.39) <= OVERSHOOT_CEILING);
        assert!(off.adjusted_wobble(1.9) <= WOBBLE_CEILING);
    }

    #[test]
    fn test_proficiency_ramp() {
        let cfg = PerformanceConfig::default();
        let mut p = generate_profile(IdentityId::new(), 11, 0).unwrap();
        assert_eq!(proficiency_multiplier(&p, "mining", &cfg), 1.0);
        p.record_task_minutes("mining", 600.0);
        let half = proficiency_multiplier(&p, "mining", &cfg);
        assert!((half - 0.875).abs() < 1e-9, "half ramp {half}");
        p.record_task_minutes("mining", 5000.0);
        let full = proficiency_multiplier(&p, "mining", &cfg);
        assert!((full - 0.75).abs() < 1e-9, "full ramp {full}");
    }
}
