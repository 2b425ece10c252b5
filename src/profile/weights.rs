//! Preference weight maps
//!
//! Categorical habits (camera handling, what a break looks like) are
//! weighted choices, not fixed picks. Weights are normalized to 1.0 with
//! one dominant entry, and reinforce slowly toward whatever gets used.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Reinforcement added to a used entry
const REINFORCE_STEP: f64 = 0.005;

/// No single habit exceeds this share
const REINFORCE_CAP: f64 = 0.85;

/// Dominant entry share at generation time
const DOMINANT_MIN: f64 = 0.40;
const DOMINANT_MAX: f64 = 0.60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightEntry {
    pub name: String,
    pub weight: f64,
}

/// Normalized weighted preference over named options
///
/// Entries keep a stable order so serialization round-trips exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightMap {
    entries: Vec<WeightEntry>,
}

impl WeightMap {
    /// Generate a fresh map: one dominant habit, the rest sharing the
    /// remainder unevenly
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, options: &[&str]) -> Self {
        debug_assert!(!options.is_empty());
        let dominant_idx = rng.gen_range(0..options.len());
        let dominant_share = rng.gen_range(DOMINANT_MIN..DOMINANT_MAX);

        // Random positive shares for the rest, scaled to the leftover mass
        let mut raw: Vec<f64> = options
            .iter()
            .enumerate()
            .map(|(i, _)| if i == dominant_idx { 0.0 } else { rng.gen_range(0.2..1.0) })
            .collect();
        let raw_sum: f64 = raw.iter().sum();
        let leftover = 1.0 - dominant_share;
        for (i, share) in raw.iter_mut().enumerate() {
            if i == dominant_idx {
                *share = dominant_share;
            } else if raw_sum > 0.0 {
                *share = *share / raw_sum * leftover;
            }
        }

        let entries = options
            .iter()
            .zip(raw)
            .map(|(name, weight)| WeightEntry {
                name: (*name).to_string(),
                weight,
            })
            .collect();
        Self { entries }
    }

    /// Weighted draw; returns the entry name
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        let total: f64 = self.entries.iter().map(|e| e.weight).sum();
        let mut roll = rng.gen::<f64>() * total;
        for entry in &self.entries {
            roll -= entry.weight;
            if roll <= 0.0 {
                return &entry.name;
            }
        }
        // Rounding pushed the roll past the last bucket
        &self.entries[self.entries.len() - 1].name
    }

    /// Nudge a used entry upward and renormalize
    ///
    /// The step is small enough that a habit takes hundreds of uses to
    /// entrench, and the cap keeps every option reachable forever.
    pub fn reinforce(&mut self, name: &str) {
        let Some(idx) = self.entries.iter().position(|e| e.name == name) else {
            return;
        };
        let new_weight = (self.entries[idx].weight + REINFORCE_STEP).min(REINFORCE_CAP);
        let others_old: f64 = self
            .entries
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, e)| e.weight)
            .sum();
        let others_new = 1.0 - new_weight;
        for (i, entry) in self.entries.iter_mut().enumerate() {
            if i == idx {
                entry.weight = new_weight;
            } else if others_old > 0.0 {
                entry.weight = entry.weight / others_old * others_new;
            }
        }
    }

    pub fn weight_of(&self, name: &str) -> Option<f64> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.weight)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.weight).sum()
    }

    pub fn entries(&self) -> &[WeightEntry] {
        &self.entries
    }

    /// Structural check used by profile validation
    pub fn validate(&self) -> Result<(), String> {
        if self.entries.is_empty() {
            return Err("weight map has no entries".into());
        }
        if self.entries.iter().any(|e| e.weight < 0.0 || !e.weight.is_finite()) {
            return Err("weight map has a negative or non-finite weight".into());
        }
        let total = self.total();
        if (total - 1.0).abs() > 1e-6 {
            return Err(format!("weight map sums to {total}, expected 1.0"));
        }
        Ok(())
    }
}
