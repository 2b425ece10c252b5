//! The behavioral profile data model
//!
//! One profile per identity: roughly fifty scalar traits plus two
//! preference maps, persisted across sessions. The eight motor traits are
//! correlated through a per-identity matrix; everything else is
//! independent. Traits move only through drift, never by direct edits, so
//! an identity stays recognizably itself across months.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{EpochMillis, IdentityId};
use crate::stats::matrix::{CholeskyFactor, CorrelationMatrix, MotorTrait};

/// Bumped whenever the persisted layout changes; older files migrate
/// forward on load
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Minimum run-energy gap between enabling and disabling run
pub const RUN_HYSTERESIS_GAP: f64 = 15.0;

/// Absolute bounds for every scalar trait
///
/// Generation draws inside these, drift reflects off them, validation
/// rejects anything outside them. Ranges come from observed human spread,
/// not from what plays optimally.
pub mod bounds {
    // Correlated motor block
    pub const MOUSE_SPEED: (f64, f64) = (0.8, 1.3);
    pub const CLICK_DURATION_MEAN_MS: (f64, f64) = (45.0, 90.0);
    pub const CLICK_DURATION_STD_MS: (f64, f64) = (8.0, 20.0);
    pub const TREMOR_AMPLITUDE_PX: (f64, f64) = (0.3, 1.2);
    pub const OVERSHOOT_PROBABILITY: (f64, f64) = (0.08, 0.15);
    pub const PATH_WOBBLE: (f64, f64) = (0.5, 1.5);
    pub const REACTION_MEDIAN_MS: (f64, f64) = (180.0, 320.0);
    pub const COGNITIVE_DELAY_BASE_MS: (f64, f64) = (150.0, 400.0);

    // Clicking
    pub const CLICK_VARIANCE: (f64, f64) = (0.7, 1.4);
    pub const MISCLICK_PROBABILITY: (f64, f64) = (0.01, 0.03);
    pub const MICRO_CORRECTION_PROBABILITY: (f64, f64) = (0.15, 0.25);
    pub const OVERSHOOT_RECOVERY_MS: (f64, f64) = (80.0, 220.0);
    pub const DOUBLE_CLICK_GAP_MS: (f64, f64) = (120.0, 260.0);

    // Reaction shape
    pub const REACTION_VARIANCE_MS: (f64, f64) = (20.0, 60.0);
    pub const REACTION_TAIL_MS: (f64, f64) = (40.0, 120.0);

    // Typing
    pub const TYPING_WPM: (f64, f64) = (40.0, 80.0);
    pub const TYPO_PROBABILITY: (f64, f64) = (0.005, 0.02);
    pub const TYPING_BURST_VARIANCE: (f64, f64) = (0.1, 0.5);

    // Idle pointer jitter (ex-Gaussian)
    pub const IDLE_JITTER_MU_MS: (f64, f64) = (30.0, 60.0);
    pub const IDLE_JITTER_SIGMA_MS: (f64, f64) = (10.0, 25.0);
    pub const IDLE_JITTER_TAU_MS: (f64, f64) = (10.0, 30.0);

    // Cognition
    pub const COGNITIVE_DELAY_VARIANCE_MS: (f64, f64) = (40.0, 160.0);
    pub const DECISION_NOISE: (f64, f64) = (0.05, 0.30);
    pub const MULTITASK_PENALTY: (f64, f64) = (0.10, 0.40);
    pub const ATTENTION_SPAN_MULTIPLIER: (f64, f64) = (0.7, 1.3);

    // Predictive hover
    pub const BASE_PREDICTION_RATE: (f64, f64) = (0.40, 0.95);
    pub const PREDICTION_CLICK_SPEED_BIAS: (f64, f64) = (0.0, 1.0);

    // Breaks and session shape
    pub const BREAK_THRESHOLD: (f64, f64) = (0.60, 0.95);
    pub const MICRO_PAUSE_AFFINITY: (f64, f64) = (0.5, 1.5);
    pub const SHORT_BREAK_AFFINITY: (f64, f64) = (0.5, 1.5);
    pub const LONG_BREAK_AFFINITY: (f64, f64) = (0.5, 1.5);
    pub const SESSION_LENGTH_HOURS: (f64, f64) = (1.5, 5.0);
    pub const LOGOUT_RITUAL_PROBABILITY: (f64, f64) = (0.1, 0.9);

    // Movement and camera
    pub const RUN_ENABLE_THRESHOLD: (f64, f64) = (40.0, 100.0);
    pub const RUN_DISABLE_THRESHOLD: (f64, f64) = (0.0, 25.0);
    pub const CAMERA_ROTATION_SPEED: (f64, f64) = (0.7, 1.4);
    pub const CAMERA_ZOOM_PREFERENCE: (f64, f64) = (0.2, 0.8);

    // Idle habits, events per hour
    pub const IDLE_EXAMINE_RATE: (f64, f64) = (0.5, 4.0);
    pub const SKILL_CHECK_RATE: (f64, f64) = (0.5, 6.0);
    pub const INVENTORY_CHECK_RATE: (f64, f64) = (1.0, 8.0);

    // Misc
    pub const DAY_CONSISTENCY: (f64, f64) = (0.5, 1.0);
    pub const TREMOR_FREQUENCY_HZ: (f64, f64) = (6.0, 12.0);
    pub const SCROLL_SPEED_MULTIPLIER: (f64, f64) = (0.7, 1.5);
    pub const MENU_HOVER_DWELL_MS: (f64, f64) = (150.0, 450.0);
}

/// Bounds for one motor trait, in matrix order
pub fn motor_bounds(t: MotorTrait) -> (f64, f64) {
    match t {
        MotorTrait::MouseSpeed => bounds::MOUSE_SPEED,
        MotorTrait::ClickDurationMu => bounds::CLICK_DURATION_MEAN_MS,
        MotorTrait::ClickDurationSigma => bounds::CLICK_DURATION_STD_MS,
        MotorTrait::TremorAmplitude => bounds::TREMOR_AMPLITUDE_PX,
        MotorTrait::OvershootProbability => bounds::OVERSHOOT_PROBABILITY,
        MotorTrait::PathWobble => bounds::PATH_WOBBLE,
        MotorTrait::ReactionMedian => bounds::REACTION_MEDIAN_MS,
        MotorTrait::CognitiveDelayBase => bounds::COGNITIVE_DELAY_BASE_MS,
    }
}

/// What kind of drift produced a record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DriftKind {
    Session,
    LongTerm,
}

/// One trait's before/after within a drift application
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraitDelta {
    pub trait_name: String,
    pub before: f64,
    pub after: f64,
}

/// One drift application, kept for auditability
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriftRecord {
    pub timestamp_ms: EpochMillis,
    pub kind: DriftKind,
    pub changes: Vec<TraitDelta>,
}

fn default_daily_multiplier() -> f64 {
    1.0
}

/// Everything that makes one identity behave like itself
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BehavioralProfile {
    // === BOOKKEEPING ===
    pub schema_version: u32,
    pub identity: IdentityId,
    /// Generation seed, kept so a profile can be reproduced for debugging
    pub seed: u64,
    pub created_at_ms: EpochMillis,
    pub last_session_end_ms: EpochMillis,
    pub total_playtime_minutes: f64,
    /// Long-term drift blocks already consumed from the playtime total
    #[serde(default)]
    pub long_term_blocks_applied: u32,
    /// Daily form carried across restarts so a day keeps one multiplier
    #[serde(default = "default_daily_multiplier")]
    pub daily_multiplier: f64,
    #[serde(default)]
    pub daily_rolled_at_ms: EpochMillis,
    /// Fatigue level at the last logout, decayed on the next login
    #[serde(default)]
    pub fatigue_at_session_end: f64,

    // === CORRELATED MOTOR BLOCK ===
    pub mouse_speed_multiplier: f64,
    pub click_duration_mean_ms: f64,
    pub click_duration_std_ms: f64,
    pub tremor_amplitude_px: f64,
    pub overshoot_probability: f64,
    pub path_wobble: f64,
    pub reaction_median_ms: f64,
    pub cognitive_delay_base_ms: f64,
    /// Per-identity correlation structure over the motor block
    pub correlation: CorrelationMatrix,
    /// Cached factor; recomputing per drift would dominate session start
    pub cholesky: CholeskyFactor,

    // === CLICKING ===
    pub click_variance: f64,
    pub misclick_probability: f64,
    pub micro_correction_probability: f64,
    pub overshoot_recovery_ms: f64,
    pub double_click_gap_ms: f64,

    // === REACTION SHAPE ===
    pub reaction_variance_ms: f64,
    pub reaction_tail_ms: f64,

    // === TYPING ===
    pub typing_wpm: f64,
    pub typo_probability: f64,
    pub typing_burst_variance: f64,

    // === IDLE POINTER JITTER ===
    pub idle_jitter_mu_ms: f64,
    pub idle_jitter_sigma_ms: f64,
    pub idle_jitter_tau_ms: f64,

    // === COGNITION ===
    pub cognitive_delay_variance_ms: f64,
    pub decision_noise: f64,
    pub multitask_penalty: f64,
    pub attention_span_multiplier: f64,

    // === PREDICTIVE HOVER ===
    pub base_prediction_rate: f64,
    /// 0 = deliberate clicker, 1 = snap clicker
    pub prediction_click_speed_bias: f64,

    // === BREAKS AND SESSION SHAPE ===
    pub break_threshold: f64,
    pub micro_pause_affinity: f64,
    pub short_break_affinity: f64,
    pub long_break_affinity: f64,
    pub session_length_hours: f64,
    pub logout_ritual_probability: f64,

    // === MOVEMENT AND CAMERA ===
    pub run_enable_threshold: f64,
    pub run_disable_threshold: f64,
    pub camera_rotation_speed: f64,
    pub camera_zoom_preference: f64,

    // === IDLE HABITS ===
    pub idle_examine_rate_per_hour: f64,
    pub skill_check_rate_per_hour: f64,
    pub inventory_check_rate_per_hour: f64,

    // === MISC ===
    pub day_consistency: f64,
    pub tremor_frequency_hz: f64,
    pub scroll_speed_multiplier: f64,
    pub menu_hover_dwell_ms: f64,

    // === PREFERENCE MAPS ===
    pub camera_style_weights: crate::profile::weights::WeightMap,
    pub break_activity_weights: crate::profile::weights::WeightMap,

    // === HISTORY AND LEDGERS ===
    pub drift_history: Vec<DriftRecord>,
    /// Minutes of practice per named task, feeding proficiency
    #[serde(default)]
    pub task_minutes: AHashMap<String, f64>,
}

impl BehavioralProfile {
    /// Motor trait values in matrix order
    pub fn motor_values(&self) -> [f64; 8] {
        [
            self.mouse_speed_multiplier,
            self.click_duration_mean_ms,
            self.click_duration_std_ms,
            self.tremor_amplitude_px,
            self.overshoot_probability,
            self.path_wobble,
            self.reaction_median_ms,
            self.cognitive_delay_base_ms,
        ]
    }

    pub fn motor_value(&self, t: MotorTrait) -> f64 {
        self.motor_values()[t.index()]
    }

    pub fn set_motor_value(&mut self, t: MotorTrait, value: f64) {
        match t {
            MotorTrait::MouseSpeed => self.mouse_speed_multiplier = value,
            MotorTrait::ClickDurationMu => self.click_duration_mean_ms = value,
            MotorTrait::ClickDurationSigma => self.click_duration_std_ms = value,
            MotorTrait::TremorAmplitude => self.tremor_amplitude_px = value,
            MotorTrait::OvershootProbability => self.overshoot_probability = value,
            MotorTrait::PathWobble => self.path_wobble = value,
            MotorTrait::ReactionMedian => self.reaction_median_ms = value,
            MotorTrait::CognitiveDelayBase => self.cognitive_delay_base_ms = value,
        }
    }

    /// Keep run toggling from flapping: disable must sit at least the
    /// hysteresis gap below enable. Only the disable side moves.
    pub fn enforce_run_hysteresis(&mut self) {
        let ceiling = self.run_enable_threshold - RUN_HYSTERESIS_GAP;
        if self.run_disable_threshold > ceiling {
            self.run_disable_threshold = ceiling.max(bounds::RUN_DISABLE_THRESHOLD.0);
        }
    }

    /// Append a drift record, dropping the oldest past the cap
    pub fn push_drift_record(&mut self, record: DriftRecord, cap: usize) {
        self.drift_history.push(record);
        if self.drift_history.len() > cap {
            let excess = self.drift_history.len() - cap;
            self.drift_history.drain(..excess);
        }
    }

    pub fn record_task_minutes(&mut self, task: &str, minutes: f64) {
        if minutes <= 0.0 {
            return;
        }
        *self.task_minutes.entry(task.to_string()).or_insert(0.0) += minutes;
    }

    pub fn minutes_on_task(&self, task: &str) -> f64 {
        self.task_minutes.get(task).copied().unwrap_or(0.0)
    }

    /// Structural and range validation
    ///
    /// Rejects anything a drift bug or hand-edited file could produce:
    /// out-of-bounds traits, denormalized weight maps, a broken
    /// correlation matrix, a collapsed run hysteresis gap.
    pub fn validate(&self) -> Result<(), String> {
        let checks: [(&str, f64, (f64, f64)); 44] = [
            ("mouse_speed_multiplier", self.mouse_speed_multiplier, bounds::MOUSE_SPEED),
            ("click_duration_mean_ms", self.click_duration_mean_ms, bounds::CLICK_DURATION_MEAN_MS),
            ("click_duration_std_ms", self.click_duration_std_ms, bounds::CLICK_DURATION_STD_MS),
            ("tremor_amplitude_px", self.tremor_amplitude_px, bounds::TREMOR_AMPLITUDE_PX),
            ("overshoot_probability", self.overshoot_probability, bounds::OVERSHOOT_PROBABILITY),
            ("path_wobble", self.path_wobble, bounds::PATH_WOBBLE),
            ("reaction_median_ms", self.reaction_median_ms, bounds::REACTION_MEDIAN_MS),
            ("cognitive_delay_base_ms", self.cognitive_delay_base_ms, bounds::COGNITIVE_DELAY_BASE_MS),
            ("click_variance", self.click_variance, bounds::CLICK_VARIANCE),
            ("misclick_probability", self.misclick_probability, bounds::MISCLICK_PROBABILITY),
            ("micro_correction_probability", self.micro_correction_probability, bounds::MICRO_CORRECTION_PROBABILITY),
            ("overshoot_recovery_ms", self.overshoot_recovery_ms, bounds::OVERSHOOT_RECOVERY_MS),
            ("double_click_gap_ms", self.double_click_gap_ms, bounds::DOUBLE_CLICK_GAP_MS),
            ("reaction_variance_ms", self.reaction_variance_ms, bounds::REACTION_VARIANCE_MS),
            ("reaction_tail_ms", self.reaction_tail_ms, bounds::REACTION_TAIL_MS),
            ("typing_wpm", self.typing_wpm, bounds::TYPING_WPM),
            ("typo_probability", self.typo_probability, bounds::TYPO_PROBABILITY),
            ("typing_burst_variance", self.typing_burst_variance, bounds::TYPING_BURST_VARIANCE),
            ("idle_jitter_mu_ms", self.idle_jitter_mu_ms, bounds::IDLE_JITTER_MU_MS),
            ("idle_jitter_sigma_ms", self.idle_jitter_sigma_ms, bounds::IDLE_JITTER_SIGMA_MS),
            ("idle_jitter_tau_ms", self.idle_jitter_tau_ms, bounds::IDLE_JITTER_TAU_MS),
            ("cognitive_delay_variance_ms", self.cognitive_delay_variance_ms, bounds::COGNITIVE_DELAY_VARIANCE_MS),
            ("decision_noise", self.decision_noise, bounds::DECISION_NOISE),
            ("multitask_penalty", self.multitask_penalty, bounds::MULTITASK_PENALTY),
            ("attention_span_multiplier", self.attention_span_multiplier, bounds::ATTENTION_SPAN_MULTIPLIER),
            ("base_prediction_rate", self.base_prediction_rate, bounds::BASE_PREDICTION_RATE),
            ("prediction_click_speed_bias", self.prediction_click_speed_bias, bounds::PREDICTION_CLICK_SPEED_BIAS),
            ("break_threshold", self.break_threshold, bounds::BREAK_THRESHOLD),
            ("micro_pause_affinity", self.micro_pause_affinity, bounds::MICRO_PAUSE_AFFINITY),
            ("short_break_affinity", self.short_break_affinity, bounds::SHORT_BREAK_AFFINITY),
            ("long_break_affinity", self.long_break_affinity, bounds::LONG_BREAK_AFFINITY),
            ("session_length_hours", self.session_length_hours, bounds::SESSION_LENGTH_HOURS),
            ("logout_ritual_probability", self.logout_ritual_probability, bounds::LOGOUT_RITUAL_PROBABILITY),
            ("run_enable_threshold", self.run_enable_threshold, bounds::RUN_ENABLE_THRESHOLD),
            ("run_disable_threshold", self.run_disable_threshold, bounds::RUN_DISABLE_THRESHOLD),
            ("camera_rotation_speed", self.camera_rotation_speed, bounds::CAMERA_ROTATION_SPEED),
            ("camera_zoom_preference", self.camera_zoom_preference, bounds::CAMERA_ZOOM_PREFERENCE),
            ("idle_examine_rate_per_hour", self.idle_examine_rate_per_hour, bounds::IDLE_EXAMINE_RATE),
            ("skill_check_rate_per_hour", self.skill_check_rate_per_hour, bounds::SKILL_CHECK_RATE),
            ("inventory_check_rate_per_hour", self.inventory_check_rate_per_hour, bounds::INVENTORY_CHECK_RATE),
            ("day_consistency", self.day_consistency, bounds::DAY_CONSISTENCY),
            ("tremor_frequency_hz", self.tremor_frequency_hz, bounds::TREMOR_FREQUENCY_HZ),
            ("scroll_speed_multiplier", self.scroll_speed_multiplier, bounds::SCROLL_SPEED_MULTIPLIER),
            ("menu_hover_dwell_ms", self.menu_hover_dwell_ms, bounds::MENU_HOVER_DWELL_MS),
        ];
        for (name, value, (lo, hi)) in checks {
            if !value.is_finite() || value < lo || value > hi {
                return Err(format!("{name} = {value} outside [{lo}, {hi}]"));
            }
        }

        if !self.fatigue_at_session_end.is_finite()
            || !(0.0..=1.0).contains(&self.fatigue_at_session_end)
        {
            return Err(format!(
                "fatigue_at_session_end = {} outside [0, 1]",
                self.fatigue_at_session_end
            ));
        }

        if self.run_enable_threshold - self.run_disable_threshold < RUN_HYSTERESIS_GAP - 1e-9 {
            return Err(format!(
                "run hysteresis gap {} below {RUN_HYSTERESIS_GAP}",
                self.run_enable_threshold - self.run_disable_threshold
            ));
        }

        for t in MotorTrait::ALL {
            let diag = self.correlation.get(t, t);
            if (diag - 1.0).abs() > 1e-9 {
                return Err(format!("correlation diagonal at {} is {diag}", t.label()));
            }
        }
        for a in MotorTrait::ALL {
            for b in MotorTrait::ALL {
                let r = self.correlation.get(a, b);
                if !r.is_finite() || r.abs() > 1.0 + 1e-9 {
                    return Err(format!(
                        "correlation {} x {} = {r} outside [-1, 1]",
                        a.label(),
                        b.label()
                    ));
                }
                if (r - self.correlation.get(b, a)).abs() > 1e-9 {
                    return Err("correlation matrix is not symmetric".into());
                }
            }
        }

        self.camera_style_weights
            .validate()
            .map_err(|e| format!("camera_style_weights: {e}"))?;
        self.break_activity_weights
            .validate()
            .map_err(|e| format!("break_activity_weights: {e}"))?;

        if self.schema_version == 0 || self.schema_version > CURRENT_SCHEMA_VERSION {
            return Err(format!("schema_version {} not supported", self.schema_version));
        }
        Ok(())
    }
}
