//! Engine configuration with documented constants
//!
//! All tuned numbers are collected here with explanations of their purpose.
//! The defaults are hand-tuned observation-derived values; they are
//! configuration to be adjusted, not load-bearing contracts.

/// Fatigue accumulation and event tuning
#[derive(Debug, Clone)]
pub struct FatigueConfig {
    /// Fatigue added per recorded action (before severity scaling)
    ///
    /// At 0.0005, a thousand medium-severity actions from a rested start
    /// land at roughly 0.5 fatigue. This anchors the whole scale.
    pub per_action: f64,

    /// Fatigue added per second of active play (before severity scaling)
    pub per_second: f64,

    /// Quadratic session-length factor
    ///
    /// Accumulation is multiplied by `1 + hours_played^2 * this`, so a
    /// four-hour session fatigues noticeably faster than four one-hour
    /// sessions. Linear extrapolation underestimates late-session decline.
    pub session_hours_quadratic: f64,

    /// Fatigue removed per minute spent on a break
    pub recovery_per_break_minute: f64,

    /// Fraction of carried-over fatigue recovered per hour away
    /// between sessions
    pub carryover_recovery_per_hour: f64,

    /// Base per-second probability of a fatigue crash
    pub crash_probability_per_second: f64,

    /// Crash probability grows with the current level: p * (1 + level * this)
    pub crash_level_scaling: f64,

    /// Minimum fatigue level before a crash can fire
    pub crash_min_level: f64,

    /// Seconds between crashes
    pub crash_cooldown_secs: u64,

    /// Crash spike magnitude, uniform in [min, max]
    pub crash_spike_min: f64,
    pub crash_spike_max: f64,

    /// Base per-second probability of a spontaneous recovery
    pub recovery_probability_per_second: f64,

    /// Minimum fatigue level before a recovery can fire
    pub recovery_min_level: f64,

    /// Seconds between recoveries
    pub recovery_cooldown_secs: u64,

    /// Recovery magnitude, uniform in [min, max]
    pub recovery_amount_min: f64,
    pub recovery_amount_max: f64,

    /// Window after a crash during which recovery probability is boosted
    /// (a person notices the slump and shakes themselves out of it)
    pub post_crash_window_secs: u64,
    pub post_crash_recovery_boost: f64,

    /// Effect strengths: each derived multiplier is `1 + level * effect`
    pub delay_effect: f64,
    pub variance_effect: f64,
    pub misclick_effect: f64,
    pub sigma_effect: f64,
    pub tau_effect: f64,
}

impl Default for FatigueConfig {
    fn default() -> Self {
        Self {
            per_action: 0.0005,
            per_second: 0.00002,
            session_hours_quadratic: 0.15,
            recovery_per_break_minute: 0.1,
            carryover_recovery_per_hour: 0.3,

            crash_probability_per_second: 0.00025,
            crash_level_scaling: 0.5,
            crash_min_level: 0.20,
            crash_cooldown_secs: 300,
            crash_spike_min: 0.15,
            crash_spike_max: 0.25,

            recovery_probability_per_second: 0.00033,
            recovery_min_level: 0.30,
            recovery_cooldown_secs: 600,
            recovery_amount_min: 0.05,
            recovery_amount_max: 0.12,
            post_crash_window_secs: 180,
            post_crash_recovery_boost: 3.0,

            delay_effect: 0.5,
            variance_effect: 0.4,
            misclick_effect: 2.0,
            sigma_effect: 0.6,
            tau_effect: 0.8,
        }
    }
}

impl FatigueConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.per_action <= 0.0 || self.per_second <= 0.0 {
            return Err("fatigue accumulation rates must be positive".into());
        }
        if self.crash_spike_min > self.crash_spike_max {
            return Err("crash_spike_min must be <= crash_spike_max".into());
        }
        if self.recovery_amount_min > self.recovery_amount_max {
            return Err("recovery_amount_min must be <= recovery_amount_max".into());
        }
        if !(0.0..=1.0).contains(&self.crash_min_level)
            || !(0.0..=1.0).contains(&self.recovery_min_level)
        {
            return Err("event gate levels must lie in [0, 1]".into());
        }
        Ok(())
    }
}

/// Attention state machine tuning
#[derive(Debug, Clone)]
pub struct AttentionConfig {
    /// Log-normal transition interval, ln-space parameters
    ///
    /// mu 4.5 / sigma 0.6 gives a median near 90 seconds with a fat right
    /// tail, matching observed attention-span statistics. Uniform intervals
    /// produce a visibly mechanical cadence.
    pub interval_log_mu: f64,
    pub interval_log_sigma: f64,

    /// Hard bounds on any scheduled interval, seconds
    pub interval_min_secs: f64,
    pub interval_max_secs: f64,

    /// Base state weights at each transition (before stickiness)
    pub base_focused: f64,
    pub base_distracted: f64,
    pub base_away: f64,

    /// Stickiness multiplier applied to the current state's weight
    pub stickiness_focused: f64,
    pub stickiness_distracted: f64,
    pub stickiness_away: f64,

    /// Away-weight multiplier for hardcore accounts
    pub hardcore_away_factor: f64,

    /// Scheduled away duration, uniform seconds
    pub away_duration_min_secs: f64,
    pub away_duration_max_secs: f64,

    /// External distraction rate (phone buzzes, doorbells), events per hour
    pub external_rate_per_hour: f64,

    /// Minimum gap between external distraction checks, milliseconds
    pub external_check_min_gap_ms: u64,

    /// Forced-away duration from an external distraction, uniform seconds
    pub external_duration_min_secs: f64,
    pub external_duration_max_secs: f64,

    /// Probability that an incoming chat message pulls attention away
    pub chat_distraction_probability: f64,

    /// Delay multiplier while distracted
    pub distracted_delay_multiplier: f64,

    /// Extra event-reaction lag while distracted, uniform milliseconds
    pub distracted_lag_min_ms: u64,
    pub distracted_lag_max_ms: u64,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            interval_log_mu: 4.5,
            interval_log_sigma: 0.6,
            interval_min_secs: 30.0,
            interval_max_secs: 600.0,

            // Roughly 70% focused / 25% distracted / 5% away at steady state
            base_focused: 0.70,
            base_distracted: 0.25,
            base_away: 0.05,
            stickiness_focused: 1.2,
            stickiness_distracted: 1.1,
            stickiness_away: 0.5,
            hardcore_away_factor: 0.3,

            away_duration_min_secs: 3.0,
            away_duration_max_secs: 15.0,

            external_rate_per_hour: 4.0,
            external_check_min_gap_ms: 600,
            external_duration_min_secs: 2.0,
            external_duration_max_secs: 15.0,
            chat_distraction_probability: 0.30,

            distracted_delay_multiplier: 1.4,
            distracted_lag_min_ms: 200,
            distracted_lag_max_ms: 800,
        }
    }
}

impl AttentionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.interval_min_secs >= self.interval_max_secs {
            return Err("attention interval bounds are inverted".into());
        }
        if self.base_focused <= 0.0 {
            return Err("base_focused must be positive".into());
        }
        let sum = self.base_focused + self.base_distracted + self.base_away;
        if (sum - 1.0).abs() > 0.01 {
            return Err(format!("attention base weights must sum to 1.0, got {sum}"));
        }
        if !(0.0..=1.0).contains(&self.chat_distraction_probability) {
            return Err("chat_distraction_probability must lie in [0, 1]".into());
        }
        Ok(())
    }
}

/// Break cadence tuning, one block per tier
#[derive(Debug, Clone)]
pub struct BreakConfig {
    /// Micro-pause duration, uniform seconds
    pub micro_duration_min_secs: f64,
    pub micro_duration_max_secs: f64,
    /// Actions between micro-pause checks, uniform
    pub micro_actions_min: u32,
    pub micro_actions_max: u32,
    /// Jitter applied to each sampled action threshold
    pub micro_threshold_jitter: i32,
    /// Probability a due micro-pause actually fires
    pub micro_probability: f64,

    /// Short break duration, uniform seconds
    pub short_duration_min_secs: f64,
    pub short_duration_max_secs: f64,
    /// Short break interval bounds, minutes (exponential, clamped)
    pub short_interval_min_mins: f64,
    pub short_interval_max_mins: f64,
    /// Probability a time-due short break fires (fatigue-triggered breaks
    /// skip this roll and always fire)
    pub short_probability: f64,

    /// Long break duration, uniform minutes
    pub long_duration_min_mins: f64,
    pub long_duration_max_mins: f64,
    /// Long break interval bounds, minutes (exponential, clamped)
    pub long_interval_min_mins: f64,
    pub long_interval_max_mins: f64,
    pub long_probability: f64,

    /// Session length, uniform hours; ending is mandatory once elapsed
    pub session_min_hours: f64,
    pub session_max_hours: f64,
    /// Session length multiplier for hardcore accounts
    pub hardcore_session_factor: f64,
}

impl Default for BreakConfig {
    fn default() -> Self {
        Self {
            micro_duration_min_secs: 2.0,
            micro_duration_max_secs: 8.0,
            micro_actions_min: 30,
            micro_actions_max: 90,
            micro_threshold_jitter: 10,
            micro_probability: 0.30,

            short_duration_min_secs: 30.0,
            short_duration_max_secs: 180.0,
            short_interval_min_mins: 15.0,
            short_interval_max_mins: 40.0,
            short_probability: 0.60,

            long_duration_min_mins: 5.0,
            long_duration_max_mins: 20.0,
            long_interval_min_mins: 60.0,
            long_interval_max_mins: 120.0,
            long_probability: 0.80,

            session_min_hours: 2.0,
            session_max_hours: 6.0,
            hardcore_session_factor: 0.8,
        }
    }
}

impl BreakConfig {
    pub fn validate(&self) -> Result<(), String> {
        let pairs = [
            (self.micro_duration_min_secs, self.micro_duration_max_secs),
            (self.short_duration_min_secs, self.short_duration_max_secs),
            (self.short_interval_min_mins, self.short_interval_max_mins),
            (self.long_duration_min_mins, self.long_duration_max_mins),
            (self.long_interval_min_mins, self.long_interval_max_mins),
            (self.session_min_hours, self.session_max_hours),
        ];
        if pairs.iter().any(|(lo, hi)| lo > hi) {
            return Err("a break tier has inverted [min, max] bounds".into());
        }
        if self.micro_actions_min > self.micro_actions_max {
            return Err("micro_actions bounds are inverted".into());
        }
        for p in [
            self.micro_probability,
            self.short_probability,
            self.long_probability,
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err("break probabilities must lie in [0, 1]".into());
            }
        }
        Ok(())
    }
}

/// Tick jitter tuning
#[derive(Debug, Clone)]
pub struct JitterConfig {
    /// Ex-Gaussian parameters for the jitter delay, milliseconds
    ///
    /// Gaussian bulk (mu, sigma) plus exponential tail (tau): most delays
    /// cluster tightly, a few run long. Pure Gaussian jitter still
    /// synchronizes visibly with the host's fixed update cadence.
    pub mu_ms: f64,
    pub sigma_ms: f64,
    pub tau_ms: f64,

    /// Hard bounds on any jitter delay, milliseconds
    pub min_ms: u64,
    pub max_ms: u64,

    /// Emergency path bounds (uniform), for severity-critical actions
    pub emergency_min_ms: u64,
    pub emergency_max_ms: u64,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            mu_ms: 40.0,
            sigma_ms: 15.0,
            tau_ms: 20.0,
            min_ms: 15,
            max_ms: 150,
            emergency_min_ms: 10,
            emergency_max_ms: 20,
        }
    }
}

impl JitterConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_ms >= self.max_ms {
            return Err("jitter bounds are inverted".into());
        }
        if self.emergency_min_ms >= self.emergency_max_ms {
            return Err("emergency jitter bounds are inverted".into());
        }
        if self.sigma_ms <= 0.0 || self.tau_ms <= 0.0 {
            return Err("jitter sigma and tau must be positive".into());
        }
        Ok(())
    }
}

/// Predictive hover tuning
#[derive(Debug, Clone)]
pub struct HoverConfig {
    /// Effective probability clamp after all modifiers
    pub min_rate: f64,
    pub max_rate: f64,

    /// At max fatigue the hover probability is reduced by this fraction
    pub fatigue_impact: f64,

    /// Probability multiplier while distracted
    pub distracted_multiplier: f64,

    /// Hesitation before a delayed click: log-normal around the median,
    /// clamped, then scaled by `1 + fatigue * hesitation_fatigue_scale`
    pub hesitation_median_ms: u64,
    pub hesitation_min_ms: u64,
    pub hesitation_max_ms: u64,
    pub hesitation_fatigue_scale: f64,

    /// Candidate search radius around the player, tiles
    pub max_target_distance_tiles: i32,

    /// Imprecise hover: lands near but off the target
    pub imprecise_probability: f64,
    pub imprecise_min_px: i32,
    pub imprecise_max_px: i32,

    /// Missed hover: lands on empty space near the target
    pub empty_space_probability: f64,
    pub empty_space_radius_px: i32,

    /// Wrong-target hover: lands on a similar nearby target
    pub wrong_target_probability: f64,
    pub wrong_target_radius_tiles: i32,

    /// Imperfection probabilities scale up with fatigue and inattention
    pub precision_fatigue_scale: f64,
    pub precision_distracted_mult: f64,
    pub precision_away_mult: f64,

    /// Per-tick cursor drift while holding a hover
    pub cursor_drift_probability: f64,
    pub cursor_drift_max_px: i32,

    /// Minimum gap between hover attempts, milliseconds
    pub attempt_min_gap_ms: u64,

    /// Hovers older than this are cleared on the next validation
    pub staleness_ms: u64,

    /// Player movement (tiles) since hover start that invalidates the hover
    pub max_player_movement_tiles: i32,

    /// Active hovers younger than this suppress idle pointer behaviors
    pub idle_suppression_ms: u64,

    /// Pointer-to-target screen drift that triggers a re-hover, pixels
    pub screen_drift_px: f64,
    /// Minimum gap between drift-triggered re-hovers, milliseconds
    pub rehover_min_gap_ms: u64,

    /// Click behavior base distributions; speed bias shifts mass between
    /// instant and the other two (see the hover engine)
    pub focused_instant_base: f64,
    pub focused_delayed_base: f64,
    pub focused_abandon_base: f64,
    pub distracted_instant_base: f64,
    pub distracted_delayed_base: f64,
    pub distracted_abandon_base: f64,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            min_rate: 0.10,
            max_rate: 0.95,
            fatigue_impact: 0.50,
            distracted_multiplier: 0.40,

            hesitation_median_ms: 200,
            hesitation_min_ms: 100,
            hesitation_max_ms: 400,
            hesitation_fatigue_scale: 0.5,

            max_target_distance_tiles: 15,

            imprecise_probability: 0.15,
            imprecise_min_px: 15,
            imprecise_max_px: 40,
            empty_space_probability: 0.08,
            empty_space_radius_px: 80,
            wrong_target_probability: 0.05,
            wrong_target_radius_tiles: 5,
            precision_fatigue_scale: 0.8,
            precision_distracted_mult: 1.5,
            precision_away_mult: 2.0,

            cursor_drift_probability: 0.03,
            cursor_drift_max_px: 3,

            attempt_min_gap_ms: 600,
            staleness_ms: 60_000,
            max_player_movement_tiles: 3,
            idle_suppression_ms: 30_000,
            screen_drift_px: 50.0,
            rehover_min_gap_ms: 500,

            focused_instant_base: 0.50,
            focused_delayed_base: 0.35,
            focused_abandon_base: 0.15,
            distracted_instant_base: 0.25,
            distracted_delayed_base: 0.40,
            distracted_abandon_base: 0.35,
        }
    }
}

impl HoverConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_rate >= self.max_rate {
            return Err("hover rate clamp is inverted".into());
        }
        if !(0.0..=1.0).contains(&self.min_rate) || !(0.0..=1.0).contains(&self.max_rate) {
            return Err("hover rate clamp must lie in [0, 1]".into());
        }
        if self.hesitation_min_ms >= self.hesitation_max_ms {
            return Err("hesitation bounds are inverted".into());
        }
        if self.imprecise_min_px >= self.imprecise_max_px {
            return Err("imprecise offset bounds are inverted".into());
        }
        let base_sum = self.imprecise_probability
            + self.empty_space_probability
            + self.wrong_target_probability;
        if base_sum >= 1.0 {
            return Err("imperfection probabilities must leave room for precise hovers".into());
        }
        Ok(())
    }
}

/// Profile drift tuning
#[derive(Debug, Clone)]
pub struct DriftConfig {
    /// Session drift magnitude (sigma of the multiplicative noise)
    ///
    /// Applied as `trait *= exp(noise)` for the correlated motor block and
    /// as a Gaussian percentage for independent traits. 0.02 keeps
    /// day-to-day movement below what a human rater notices while still
    /// decorrelating consecutive sessions.
    pub session_sigma: f64,

    /// Hours of accumulated playtime per long-term drift block
    pub long_term_block_hours: f64,

    /// Long-term mouse speed gain per block, uniform
    pub mouse_speed_gain_min: f64,
    pub mouse_speed_gain_max: f64,

    /// Long-term click variance decline per block, uniform
    pub click_variance_decline_min: f64,
    pub click_variance_decline_max: f64,

    /// Long-term reaction median decline per block, uniform milliseconds
    pub reaction_decline_min_ms: f64,
    pub reaction_decline_max_ms: f64,

    /// Maximum retained drift-history records (oldest dropped first)
    pub history_cap: usize,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            session_sigma: 0.02,
            long_term_block_hours: 20.0,
            mouse_speed_gain_min: 0.01,
            mouse_speed_gain_max: 0.03,
            click_variance_decline_min: 0.008,
            click_variance_decline_max: 0.02,
            reaction_decline_min_ms: 1.0,
            reaction_decline_max_ms: 4.0,
            history_cap: 200,
        }
    }
}

impl DriftConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.session_sigma <= 0.0 || self.session_sigma > 0.2 {
            return Err("session_sigma must lie in (0, 0.2]".into());
        }
        if self.long_term_block_hours <= 0.0 {
            return Err("long_term_block_hours must be positive".into());
        }
        if self.history_cap == 0 {
            return Err("history_cap must be at least 1".into());
        }
        Ok(())
    }
}

/// Daily performance variation and task proficiency tuning
#[derive(Debug, Clone)]
pub struct PerformanceConfig {
    /// AR(1) persistence when yesterday was a below-baseline day
    pub ar_degrading: f64,
    /// AR(1) persistence when yesterday was an above-baseline day
    ///
    /// Good form persists more strongly than slumps (0.7 vs 0.4); people
    /// shake off bad days faster than they lose good ones.
    pub ar_recovering: f64,
    /// Gaussian innovation sigma per re-roll
    pub innovation_sigma: f64,
    /// Hard clamp on the daily multiplier
    pub min_multiplier: f64,
    pub max_multiplier: f64,
    /// Session gap (hours) that forces a re-roll within the same day
    pub regen_gap_hours: f64,

    /// Minutes of practice at which a task is fully familiar
    pub proficiency_full_minutes: f64,
    /// Cognitive delay reduction at full familiarity
    pub proficiency_max_reduction: f64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            ar_degrading: 0.4,
            ar_recovering: 0.7,
            innovation_sigma: 0.08,
            min_multiplier: 0.85,
            max_multiplier: 1.15,
            regen_gap_hours: 6.0,
            proficiency_full_minutes: 1200.0,
            proficiency_max_reduction: 0.25,
        }
    }
}

impl PerformanceConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_multiplier >= self.max_multiplier {
            return Err("performance multiplier clamp is inverted".into());
        }
        if self.min_multiplier > 1.0 || self.max_multiplier < 1.0 {
            return Err("performance multiplier clamp must contain 1.0".into());
        }
        if !(0.0..1.0).contains(&self.proficiency_max_reduction) {
            return Err("proficiency_max_reduction must lie in [0, 1)".into());
        }
        Ok(())
    }
}

/// Persistence cadence
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Seconds between periodic profile saves
    pub save_interval_secs: u64,
    /// Gap below which a new login resumes the previous session
    pub fresh_session_threshold_secs: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            save_interval_secs: 300,
            fresh_session_threshold_secs: 900,
        }
    }
}

impl PersistenceConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.save_interval_secs == 0 {
            return Err("save_interval_secs must be positive".into());
        }
        Ok(())
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub fatigue: FatigueConfig,
    pub attention: AttentionConfig,
    pub breaks: BreakConfig,
    pub jitter: JitterConfig,
    pub hover: HoverConfig,
    pub drift: DriftConfig,
    pub performance: PerformanceConfig,
    pub persistence: PersistenceConfig,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate internal consistency of every section
    pub fn validate(&self) -> Result<(), String> {
        self.fatigue.validate().map_err(|e| format!("fatigue: {e}"))?;
        self.attention
            .validate()
            .map_err(|e| format!("attention: {e}"))?;
        self.breaks.validate().map_err(|e| format!("breaks: {e}"))?;
        self.jitter.validate().map_err(|e| format!("jitter: {e}"))?;
        self.hover.validate().map_err(|e| format!("hover: {e}"))?;
        self.drift.validate().map_err(|e| format!("drift: {e}"))?;
        self.performance
            .validate()
            .map_err(|e| format!("performance: {e}"))?;
        self.persistence
            .validate()
            .map_err(|e| format!("persistence: {e}"))?;
        Ok(())
    }
}

// === GLOBAL CONFIG ACCESS ===

use std::sync::OnceLock;

static CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Get the global engine config (initializes with defaults if not set)
pub fn config() -> &'static EngineConfig {
    CONFIG.get_or_init(EngineConfig::default)
}

/// Set the global engine config (can only be called once)
///
/// Returns Err if config was already set.
pub fn set_config(config: EngineConfig) -> Result<(), EngineConfig> {
    CONFIG.set(config)
}
