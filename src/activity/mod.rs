//! Activity severity classification
//!
//! Severity is the shared urgency signal: it scales fatigue accumulation,
//! shrinks or stretches tick jitter, and gates attention drift. Combat
//! keeps a player sharp; banking does not.

use tracing::debug;

/// Urgency of the current activity, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Severity {
    Critical = 4,
    High = 3,
    Medium = 2,
    Low = 1,
    Idle = 0,
}

impl Severity {
    /// Fatigue accumulation multiplier; intense play tires faster
    pub fn fatigue_multiplier(&self) -> f64 {
        match self {
            Severity::Critical => 1.5,
            Severity::High => 1.2,
            Severity::Medium => 1.0,
            Severity::Low => 0.7,
            Severity::Idle => 0.3,
        }
    }

    /// Tick jitter scale; urgent actions fire with less added delay
    pub fn jitter_scale(&self) -> f64 {
        match self {
            Severity::Critical => 0.4,
            Severity::High => 0.6,
            Severity::Medium => 1.0,
            Severity::Low => 1.3,
            Severity::Idle => 1.5,
        }
    }

    pub fn at_least(&self, other: Severity) -> bool {
        (*self as u8) >= (other as u8)
    }

    /// Whether the activity tolerates being paused mid-flow
    pub fn interruptible(&self) -> bool {
        !self.at_least(Severity::High)
    }
}

/// World facts the classifier reads each tick
///
/// `override_severity` short-circuits classification entirely; it is how
/// callers express Low (there is no world predicate for it) and how
/// scripted sequences pin urgency during special phases.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityContext {
    pub override_severity: Option<Severity>,
    pub in_combat: bool,
    pub fighting_boss: bool,
    pub recently_attacked: bool,
    pub in_dangerous_area: bool,
    pub running_task: bool,
}

/// Maps world facts to a severity, logging transitions
#[derive(Debug, Default)]
pub struct ActivityClassifier {
    last: Option<Severity>,
}

impl ActivityClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify the current tick
    ///
    /// Precedence: override, then boss fights and combat in dangerous
    /// areas (Critical), then any combat or being under attack (High),
    /// then a running task (Medium), else Idle.
    pub fn classify(&mut self, ctx: &ActivityContext) -> Severity {
        let severity = if let Some(forced) = ctx.override_severity {
            forced
        } else if ctx.fighting_boss || (ctx.in_dangerous_area && ctx.in_combat) {
            Severity::Critical
        } else if ctx.in_combat || ctx.recently_attacked {
            Severity::High
        } else if ctx.running_task {
            Severity::Medium
        } else {
            Severity::Idle
        };

        if self.last != Some(severity) {
            debug!(?severity, previous = ?self.last, "activity severity changed");
            self.last = Some(severity);
        }
        severity
    }

    pub fn current(&self) -> Severity {
        self.last.unwrap_or(Severity::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boss_fight_is_critical() {
        let mut c = ActivityClassifier::new();
        let ctx = ActivityContext {
            fighting_boss: true,
            in_combat: true,
            ..Default::default()
        };
        assert_eq!(c.classify(&ctx), Severity::Critical);
    }

    #[test]
    fn test_dangerous_combat_is_critical() {
        let mut c = ActivityClassifier::new();
        let ctx = ActivityContext {
            in_dangerous_area: true,
            in_combat: true,
            ..Default::default()
        };
        assert_eq!(c.classify(&ctx), Severity::Critical);
    }

    #[test]
    fn test_dangerous_area_alone_is_not_critical() {
        let mut c = ActivityClassifier::new();
        let ctx = ActivityContext {
            in_dangerous_area: true,
            running_task: true,
            ..Default::default()
        };
        assert_eq!(c.classify(&ctx), Severity::Medium);
    }

    #[test]
    fn test_being_attacked_is_high() {
        let mut c = ActivityClassifier::new();
        let ctx = ActivityContext {
            recently_attacked: true,
            ..Default::default()
        };
        assert_eq!(c.classify(&ctx), Severity::High);
    }

    #[test]
    fn test_task_is_medium_and_nothing_is_idle() {
        let mut c = ActivityClassifier::new();
        let task = ActivityContext {
            running_task: true,
            ..Default::default()
        };
        assert_eq!(c.classify(&task), Severity::Medium);
        assert_eq!(c.classify(&ActivityContext::default()), Severity::Idle);
    }

    #[test]
    fn test_override_beats_everything() {
        let mut c = ActivityClassifier::new();
        let ctx = ActivityContext {
            override_severity: Some(Severity::Low),
            fighting_boss: true,
            in_combat: true,
            ..Default::default()
        };
        assert_eq!(c.classify(&ctx), Severity::Low);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical.at_least(Severity::High));
        assert!(Severity::High.at_least(Severity::High));
        assert!(!Severity::Medium.at_least(Severity::High));
        assert!(Severity::Idle.jitter_scale() > Severity::Critical.jitter_scale());
        assert!(Severity::Critical.fatigue_multiplier() > Severity::Idle.fatigue_multiplier());
    }

    #[test]
    fn test_interruptibility_boundary() {
        assert!(Severity::Medium.interruptible());
        assert!(Severity::Idle.interruptible());
        assert!(!Severity::High.interruptible());
        assert!(!Severity::Critical.interruptible());
    }
}
