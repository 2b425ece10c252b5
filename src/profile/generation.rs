//! Fresh profile generation
//!
//! Generation is fully determined by the stored seed, so any profile can
//! be reproduced exactly when a drift or persistence bug needs a repro
//! case. Motor traits are sampled jointly through the identity's
//! correlation matrix; everything else draws independently inside its
//! bounds.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::error::{HumError, Result};
use crate::core::types::{EpochMillis, IdentityId};
use crate::profile::traits::{bounds, motor_bounds, BehavioralProfile, CURRENT_SCHEMA_VERSION};
use crate::profile::weights::WeightMap;
use crate::stats::distributions;
use crate::stats::matrix::{CholeskyFactor, CorrelationMatrix, MotorTrait, MOTOR_TRAIT_COUNT};

/// Whole-vector redraws before falling back to clamping
const MAX_MOTOR_REDRAWS: u32 = 16;

/// Camera handling styles, in preference-map order
pub const CAMERA_STYLES: [&str; 3] = ["drag_middle", "keys", "mixed"];

/// What a break tends to look like for this identity
pub const BREAK_ACTIVITIES: [&str; 4] = ["stretch", "phone", "window_switch", "idle_stare"];

/// Generate a complete profile for a new identity
pub fn generate_profile(
    identity: IdentityId,
    seed: u64,
    now_ms: EpochMillis,
) -> Result<BehavioralProfile> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let correlation = CorrelationMatrix::generate(&mut rng)?;
    let cholesky = correlation.cholesky();
    let motor = sample_motor_block(&cholesky, &mut rng);

    let mut draw = |b: (f64, f64)| rng.gen_range(b.0..b.1);

    let click_variance = draw(bounds::CLICK_VARIANCE);
    let misclick_probability = draw(bounds::MISCLICK_PROBABILITY);
    let micro_correction_probability = draw(bounds::MICRO_CORRECTION_PROBABILITY);
    let overshoot_recovery_ms = draw(bounds::OVERSHOOT_RECOVERY_MS);
    let double_click_gap_ms = draw(bounds::DOUBLE_CLICK_GAP_MS);
    let reaction_variance_ms = draw(bounds::REACTION_VARIANCE_MS);
    let reaction_tail_ms = draw(bounds::REACTION_TAIL_MS);
    let typing_wpm = draw(bounds::TYPING_WPM);
    let typo_probability = draw(bounds::TYPO_PROBABILITY);
    let typing_burst_variance = draw(bounds::TYPING_BURST_VARIANCE);
    let idle_jitter_mu_ms = draw(bounds::IDLE_JITTER_MU_MS);
    let idle_jitter_sigma_ms = draw(bounds::IDLE_JITTER_SIGMA_MS);
    let idle_jitter_tau_ms = draw(bounds::IDLE_JITTER_TAU_MS);
    let decision_noise = draw(bounds::DECISION_NOISE);
    let multitask_penalty = draw(bounds::MULTITASK_PENALTY);
    let attention_span_multiplier = draw(bounds::ATTENTION_SPAN_MULTIPLIER);
    let base_prediction_rate = draw(bounds::BASE_PREDICTION_RATE);
    let prediction_click_speed_bias = draw(bounds::PREDICTION_CLICK_SPEED_BIAS);
    let break_threshold = draw(bounds::BREAK_THRESHOLD);
    let micro_pause_affinity = draw(bounds::MICRO_PAUSE_AFFINITY);
    let short_break_affinity = draw(bounds::SHORT_BREAK_AFFINITY);
    let long_break_affinity = draw(bounds::LONG_BREAK_AFFINITY);
    let session_length_hours = draw(bounds::SESSION_LENGTH_HOURS);
    let logout_ritual_probability = draw(bounds::LOGOUT_RITUAL_PROBABILITY);
    let run_enable_threshold = draw(bounds::RUN_ENABLE_THRESHOLD);
    let run_disable_threshold = draw(bounds::RUN_DISABLE_THRESHOLD);
    let camera_rotation_speed = draw(bounds::CAMERA_ROTATION_SPEED);
    let camera_zoom_preference = draw(bounds::CAMERA_ZOOM_PREFERENCE);
    let idle_examine_rate_per_hour = draw(bounds::IDLE_EXAMINE_RATE);
    let skill_check_rate_per_hour = draw(bounds::SKILL_CHECK_RATE);
    let inventory_check_rate_per_hour = draw(bounds::INVENTORY_CHECK_RATE);
    let day_consistency = draw(bounds::DAY_CONSISTENCY);
    let tremor_frequency_hz = draw(bounds::TREMOR_FREQUENCY_HZ);
    let scroll_speed_multiplier = draw(bounds::SCROLL_SPEED_MULTIPLIER);
    let menu_hover_dwell_ms = draw(bounds::MENU_HOVER_DWELL_MS);

    // Slow thinkers are also inconsistent thinkers: delay variance shares
    // the base's position in its range, plus independent noise
    let base_lo_hi = bounds::COGNITIVE_DELAY_BASE_MS;
    let var_lo_hi = bounds::COGNITIVE_DELAY_VARIANCE_MS;
    let base_frac = (motor[MotorTrait::CognitiveDelayBase.index()] - base_lo_hi.0)
        / (base_lo_hi.1 - base_lo_hi.0);
    let cognitive_delay_variance_ms = distributions::gaussian_bounded(
        &mut rng,
        var_lo_hi.0 + base_frac * (var_lo_hi.1 - var_lo_hi.0),
        (var_lo_hi.1 - var_lo_hi.0) / 6.0,
        var_lo_hi.0,
        var_lo_hi.1,
    );

    let camera_style_weights = WeightMap::generate(&mut rng, &CAMERA_STYLES);
    let break_activity_weights = WeightMap::generate(&mut rng, &BREAK_ACTIVITIES);

    let mut profile = BehavioralProfile {
        schema_version: CURRENT_SCHEMA_VERSION,
        identity,
        seed,
        created_at_ms: now_ms,
        last_session_end_ms: 0,
        total_playtime_minutes: 0.0,
        long_term_blocks_applied: 0,
        daily_multiplier: 1.0,
        daily_rolled_at_ms: 0,
        fatigue_at_session_end: 0.0,

        mouse_speed_multiplier: motor[MotorTrait::MouseSpeed.index()],
        click_duration_mean_ms: motor[MotorTrait::ClickDurationMu.index()],
        click_duration_std_ms: motor[MotorTrait::ClickDurationSigma.index()],
        tremor_amplitude_px: motor[MotorTrait::TremorAmplitude.index()],
        overshoot_probability: motor[MotorTrait::OvershootProbability.index()],
        path_wobble: motor[MotorTrait::PathWobble.index()],
        reaction_median_ms: motor[MotorTrait::ReactionMedian.index()],
        cognitive_delay_base_ms: motor[MotorTrait::CognitiveDelayBase.index()],
        correlation,
        cholesky,

        click_variance,
        misclick_probability,
        micro_correction_probability,
        overshoot_recovery_ms,
        double_click_gap_ms,
        reaction_variance_ms,
        reaction_tail_ms,
        typing_wpm,
        typo_probability,
        typing_burst_variance,
        idle_jitter_mu_ms,
        idle_jitter_sigma_ms,
        idle_jitter_tau_ms,
        cognitive_delay_variance_ms,
        decision_noise,
        multitask_penalty,
        attention_span_multiplier,
        base_prediction_rate,
        prediction_click_speed_bias,
        break_threshold,
        micro_pause_affinity,
        short_break_affinity,
        long_break_affinity,
        session_length_hours,
        logout_ritual_probability,
        run_enable_threshold,
        run_disable_threshold,
        camera_rotation_speed,
        camera_zoom_preference,
        idle_examine_rate_per_hour,
        skill_check_rate_per_hour,
        inventory_check_rate_per_hour,
        day_consistency,
        tremor_frequency_hz,
        scroll_speed_multiplier,
        menu_hover_dwell_ms,

        camera_style_weights,
        break_activity_weights,

        drift_history: Vec::new(),
        task_minutes: Default::default(),
    };
    profile.enforce_run_hysteresis();

    profile.validate().map_err(HumError::ProfileCorrupt)?;
    Ok(profile)
}

/// Sample the eight motor traits jointly
///
/// Redraws the whole vector while any component lands outside its bounds,
/// preserving the joint shape; clamps only after the redraw budget, which
/// with per-trait sigma at a sixth of the range is vanishingly rare.
fn sample_motor_block<R: Rng + ?Sized>(
    cholesky: &CholeskyFactor,
    rng: &mut R,
) -> [f64; MOTOR_TRAIT_COUNT] {
    let mut values = [0.0f64; MOTOR_TRAIT_COUNT];
    for attempt in 0..=MAX_MOTOR_REDRAWS {
        let z = cholesky.correlated_standard(rng);
        let mut in_bounds = true;
        for t in MotorTrait::ALL {
            let (lo, hi) = motor_bounds(t);
            let mean = 0.5 * (lo + hi);
            let sd = (hi - lo) / 6.0;
            let v = mean + sd * z[t.index()];
            if v < lo || v > hi {
                in_bounds = false;
            }
            values[t.index()] = v;
        }
        if in_bounds || attempt == MAX_MOTOR_REDRAWS {
            break;
        }
    }
    for t in MotorTrait::ALL {
        let (lo, hi) = motor_bounds(t);
        values[t.index()] = values[t.index()].clamp(lo, hi);
    }
    values
}
