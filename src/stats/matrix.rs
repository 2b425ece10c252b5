//! Correlated motor-trait machinery
//!
//! The eight core motor traits are not independent: someone who moves the
//! mouse fast tends to overshoot more and react faster. A full correlation
//! matrix over the motor block captures that; generation draws random
//! valid matrices and rejects those violating plausibility constraints.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::core::error::{HumError, Result};

/// Number of traits in the correlated motor block
pub const MOTOR_TRAIT_COUNT: usize = 8;

/// Generation attempts before giving up with a typed error
const MAX_GENERATION_ATTEMPTS: u32 = 10_000;

/// Redraws allowed for a degenerate Gram-Schmidt column
const MAX_COLUMN_REDRAWS: u32 = 32;

/// Floor applied to Cholesky diagonal terms drifting negative from
/// floating-point error
const CHOLESKY_EPSILON: f64 = 1e-10;

/// The correlated motor block, in matrix row/column order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorTrait {
    MouseSpeed,
    ClickDurationMu,
    ClickDurationSigma,
    TremorAmplitude,
    OvershootProbability,
    PathWobble,
    ReactionMedian,
    CognitiveDelayBase,
}

impl MotorTrait {
    pub const ALL: [MotorTrait; MOTOR_TRAIT_COUNT] = [
        MotorTrait::MouseSpeed,
        MotorTrait::ClickDurationMu,
        MotorTrait::ClickDurationSigma,
        MotorTrait::TremorAmplitude,
        MotorTrait::OvershootProbability,
        MotorTrait::PathWobble,
        MotorTrait::ReactionMedian,
        MotorTrait::CognitiveDelayBase,
    ];

    pub fn index(&self) -> usize {
        match self {
            MotorTrait::MouseSpeed => 0,
            MotorTrait::ClickDurationMu => 1,
            MotorTrait::ClickDurationSigma => 2,
            MotorTrait::TremorAmplitude => 3,
            MotorTrait::OvershootProbability => 4,
            MotorTrait::PathWobble => 5,
            MotorTrait::ReactionMedian => 6,
            MotorTrait::CognitiveDelayBase => 7,
        }
    }

    /// Field name used in drift records and logs
    pub fn label(&self) -> &'static str {
        match self {
            MotorTrait::MouseSpeed => "mouse_speed_multiplier",
            MotorTrait::ClickDurationMu => "click_duration_mean_ms",
            MotorTrait::ClickDurationSigma => "click_duration_std_ms",
            MotorTrait::TremorAmplitude => "tremor_amplitude_px",
            MotorTrait::OvershootProbability => "overshoot_probability",
            MotorTrait::PathWobble => "path_wobble",
            MotorTrait::ReactionMedian => "reaction_median_ms",
            MotorTrait::CognitiveDelayBase => "cognitive_delay_base_ms",
        }
    }
}

/// Allowed correlation range for one trait pair
struct PairConstraint {
    a: MotorTrait,
    b: MotorTrait,
    min: f64,
    max: f64,
}

/// Plausibility constraints on pairwise correlations
///
/// Each row encodes a directional expectation: fast mouse movement should
/// not come with long reaction times, long click holds should come with
/// wide click spread, and so on. Bounds are loose on the unexpected side
/// so generation still accepts quickly.
const PAIR_CONSTRAINTS: [PairConstraint; 10] = [
    // Fast movers react fast: speed vs the two latency traits skews negative
    PairConstraint {
        a: MotorTrait::MouseSpeed,
        b: MotorTrait::ReactionMedian,
        min: -0.70,
        max: 0.10,
    },
    PairConstraint {
        a: MotorTrait::MouseSpeed,
        b: MotorTrait::CognitiveDelayBase,
        min: -0.70,
        max: 0.10,
    },
    // Fast movement is sloppier movement
    PairConstraint {
        a: MotorTrait::MouseSpeed,
        b: MotorTrait::PathWobble,
        min: -0.10,
        max: 0.70,
    },
    PairConstraint {
        a: MotorTrait::MouseSpeed,
        b: MotorTrait::OvershootProbability,
        min: -0.10,
        max: 0.70,
    },
    // Long click holds spread wider
    PairConstraint {
        a: MotorTrait::ClickDurationMu,
        b: MotorTrait::ClickDurationSigma,
        min: -0.05,
        max: 0.75,
    },
    // Shaky hands wobble along paths too
    PairConstraint {
        a: MotorTrait::TremorAmplitude,
        b: MotorTrait::PathWobble,
        min: -0.05,
        max: 0.75,
    },
    // The two latency traits move together
    PairConstraint {
        a: MotorTrait::ReactionMedian,
        b: MotorTrait::CognitiveDelayBase,
        min: 0.00,
        max: 0.80,
    },
    // Overshooters wobble
    PairConstraint {
        a: MotorTrait::OvershootProbability,
        b: MotorTrait::PathWobble,
        min: -0.10,
        max: 0.70,
    },
    // Deliberate clickers are deliberate reactors
    PairConstraint {
        a: MotorTrait::ClickDurationMu,
        b: MotorTrait::ReactionMedian,
        min: -0.15,
        max: 0.60,
    },
    // Tremor is not a trait of fast confident movers
    PairConstraint {
        a: MotorTrait::TremorAmplitude,
        b: MotorTrait::MouseSpeed,
        min: -0.60,
        max: 0.15,
    },
];

/// Symmetric unit-diagonal correlation matrix over the motor block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorrelationMatrix {
    entries: [[f64; MOTOR_TRAIT_COUNT]; MOTOR_TRAIT_COUNT],
}

impl CorrelationMatrix {
    /// Generate a random valid correlation matrix
    ///
    /// Draws positive eigenvalues, builds a random orthogonal basis by
    /// Gram-Schmidt, composes Q diag(lambda) Q^T, normalizes to unit
    /// diagonal, and retries until every pair constraint holds. Fails
    /// with a typed error after the attempt cap; identities never get a
    /// silently substituted fallback matrix.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Result<Self> {
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let candidate = Self::draw_candidate(rng);
            if candidate.satisfies_constraints() {
                return Ok(candidate);
            }
        }
        Err(HumError::MatrixRejectionExhausted {
            attempts: MAX_GENERATION_ATTEMPTS,
        })
    }

    fn draw_candidate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        const N: usize = MOTOR_TRAIT_COUNT;

        // Positive eigenvalues scaled so the trace matches the dimension
        let mut eigenvalues = [0.0f64; N];
        for ev in eigenvalues.iter_mut() {
            *ev = rng.gen_range(0.1..1.0);
        }
        let sum: f64 = eigenvalues.iter().sum();
        for ev in eigenvalues.iter_mut() {
            *ev *= N as f64 / sum;
        }

        let q = random_orthogonal(rng);

        // A = Q diag(lambda) Q^T
        let mut a = [[0.0f64; N]; N];
        for (i, row) in a.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..N).map(|k| q[i][k] * eigenvalues[k] * q[j][k]).sum();
            }
        }

        // Normalize to unit diagonal; positive-definiteness survives the
        // congruence transform
        let mut entries = [[0.0f64; N]; N];
        for i in 0..N {
            for j in 0..N {
                entries[i][j] = a[i][j] / (a[i][i] * a[j][j]).sqrt();
            }
        }

        // Symmetrize away floating-point asymmetry and pin the diagonal
        for i in 0..N {
            entries[i][i] = 1.0;
            for j in 0..i {
                let avg = 0.5 * (entries[i][j] + entries[j][i]);
                entries[i][j] = avg;
                entries[j][i] = avg;
            }
        }

        Self { entries }
    }

    fn satisfies_constraints(&self) -> bool {
        for row in &self.entries {
            if row.iter().any(|v| !v.is_finite() || v.abs() > 1.0 + 1e-9) {
                return false;
            }
        }
        PAIR_CONSTRAINTS.iter().all(|c| {
            let r = self.entries[c.a.index()][c.b.index()];
            r >= c.min && r <= c.max
        })
    }

    pub fn get(&self, a: MotorTrait, b: MotorTrait) -> f64 {
        self.entries[a.index()][b.index()]
    }

    /// Lower-triangular Cholesky factor (Banachiewicz)
    ///
    /// Diagonal terms that drift slightly negative from accumulated
    /// floating-point error are floored at a small epsilon, so a factor
    /// always comes back for any matrix this module generated or loaded.
    pub fn cholesky(&self) -> CholeskyFactor {
        const N: usize = MOTOR_TRAIT_COUNT;
        let mut rows = [[0.0f64; N]; N];
        for i in 0..N {
            for j in 0..=i {
                let mut sum = self.entries[i][j];
                for k in 0..j {
                    sum -= rows[i][k] * rows[j][k];
                }
                if i == j {
                    rows[i][j] = sum.max(CHOLESKY_EPSILON).sqrt();
                } else {
                    rows[i][j] = sum / rows[j][j];
                }
            }
        }
        CholeskyFactor { rows }
    }
}

/// Cached lower-triangular factor used to draw correlated samples
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CholeskyFactor {
    rows: [[f64; MOTOR_TRAIT_COUNT]; MOTOR_TRAIT_COUNT],
}

impl CholeskyFactor {
    /// Draw one correlated standard-normal vector (L z)
    pub fn correlated_standard<R: Rng + ?Sized>(&self, rng: &mut R) -> [f64; MOTOR_TRAIT_COUNT] {
        let mut z = [0.0f64; MOTOR_TRAIT_COUNT];
        for zi in z.iter_mut() {
            *zi = rng.sample(StandardNormal);
        }
        let mut out = [0.0f64; MOTOR_TRAIT_COUNT];
        for (i, row) in self.rows.iter().enumerate() {
            out[i] = row[..=i].iter().zip(&z).map(|(l, zk)| l * zk).sum();
        }
        out
    }

    /// Reconstruct L L^T, used to verify factor fidelity
    #[cfg(test)]
    fn product(&self) -> [[f64; MOTOR_TRAIT_COUNT]; MOTOR_TRAIT_COUNT] {
        const N: usize = MOTOR_TRAIT_COUNT;
        let mut out = [[0.0f64; N]; N];
        for i in 0..N {
            for j in 0..N {
                out[i][j] = (0..N).map(|k| self.rows[i][k] * self.rows[j][k]).sum();
            }
        }
        out
    }
}

/// Random orthogonal matrix via Gram-Schmidt on Gaussian columns
fn random_orthogonal<R: Rng + ?Sized>(
    rng: &mut R,
) -> [[f64; MOTOR_TRAIT_COUNT]; MOTOR_TRAIT_COUNT] {
    const N: usize = MOTOR_TRAIT_COUNT;
    // q[i][k] is row i of column k
    let mut q = [[0.0f64; N]; N];
    for k in 0..N {
        let mut redraws = 0;
        loop {
            let mut col = [0.0f64; N];
            for c in col.iter_mut() {
                *c = rng.sample(StandardNormal);
            }
            // Remove projections onto the accepted columns
            for prev in 0..k {
                let dot: f64 = (0..N).map(|i| col[i] * q[i][prev]).sum();
                for (i, c) in col.iter_mut().enumerate() {
                    *c -= dot * q[i][prev];
                }
            }
            let norm = col.iter().map(|c| c * c).sum::<f64>().sqrt();
            if norm > 1e-10 || redraws >= MAX_COLUMN_REDRAWS {
                let norm = norm.max(1e-10);
                for (i, c) in col.iter().enumerate() {
                    q[i][k] = c / norm;
                }
                break;
            }
            redraws += 1;
        }
    }
    q
}
