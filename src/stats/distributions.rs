//! Sampling helpers for human-shaped randomness
//!
//! Human timing is right-skewed: most actions are quick, a few take much
//! longer. Everything here builds on that shape instead of uniform or
//! symmetric noise.

use rand::Rng;
use rand_distr::StandardNormal;

/// Gaussian sample with explicit mean and standard deviation
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    mean + std_dev * z
}

/// Gaussian sample clamped into [min, max]
pub fn gaussian_bounded<R: Rng + ?Sized>(
    rng: &mut R,
    mean: f64,
    std_dev: f64,
    min: f64,
    max: f64,
) -> f64 {
    gaussian(rng, mean, std_dev).clamp(min, max)
}

/// Exponential sample with the given mean
pub fn exponential<R: Rng + ?Sized>(rng: &mut R, mean: f64) -> f64 {
    let u: f64 = rng.gen();
    // 1 - u is in (0, 1], so the log is finite
    -mean * (1.0 - u).ln()
}

/// Log-normal sample from ln-space parameters
pub fn log_normal<R: Rng + ?Sized>(rng: &mut R, log_mu: f64, log_sigma: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    (log_mu + log_sigma * z).exp()
}

/// Log-normal sample around a real-space median, clamped
///
/// The median of exp(N(ln m, sigma)) is exactly m, so the typical draw sits
/// at the requested value while the tail stretches right.
pub fn log_normal_around<R: Rng + ?Sized>(
    rng: &mut R,
    median: f64,
    log_sigma: f64,
    min: f64,
    max: f64,
) -> f64 {
    log_normal(rng, median.max(f64::MIN_POSITIVE).ln(), log_sigma).clamp(min, max)
}

/// Ex-Gaussian sample: Gaussian bulk plus exponential tail
///
/// The standard model for human reaction times. (mu, sigma) set the central
/// cluster, tau sets how heavy the slow tail is.
pub fn ex_gaussian<R: Rng + ?Sized>(rng: &mut R, mu: f64, sigma: f64, tau: f64) -> f64 {
    gaussian(rng, mu, sigma) + exponential(rng, tau)
}

/// Ex-Gaussian sample clamped into [min, max]
pub fn ex_gaussian_bounded<R: Rng + ?Sized>(
    rng: &mut R,
    mu: f64,
    sigma: f64,
    tau: f64,
    min: f64,
    max: f64,
) -> f64 {
    ex_gaussian(rng, mu, sigma, tau).clamp(min, max)
}

/// Bernoulli trial
pub fn chance<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    if probability <= 0.0 {
        return false;
    }
    if probability >= 1.0 {
        return true;
    }
    rng.gen::<f64>() < probability
}

/// Reflect a value into [min, max] by bouncing off the bounds
///
/// Used for bounded drift: a trait pushed past its ceiling comes back
/// inside by the overshoot amount rather than saturating at the edge.
pub fn reflect_into(value: f64, min: f64, max: f64) -> f64 {
    debug_assert!(min < max);
    let mut v = value;
    let span = max - min;
    // Two bounces cover any drift step we produce; the loop guard handles
    // pathological inputs far outside the range.
    let mut guard = 0;
    while (v < min || v > max) && guard < 64 {
        if v < min {
            v = min + (min - v);
        } else if v > max {
            v = max - (v - max);
        }
        guard += 1;
    }
    if guard >= 64 {
        // Overshoot beyond anything drift can produce; give up and clamp
        v = v.clamp(min, max);
    }
    debug_assert!(span > 0.0);
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_gaussian_centering() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mean: f64 = (0..10_000).map(|_| gaussian(&mut rng, 100.0, 15.0)).sum::<f64>() / 10_000.0;
        assert!((mean - 100.0).abs() < 1.0);
    }

    #[test]
    fn test_exponential_mean() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mean: f64 = (0..20_000).map(|_| exponential(&mut rng, 50.0)).sum::<f64>() / 20_000.0;
        assert!((mean - 50.0).abs() < 2.0);
        assert!((0..1000).all(|_| exponential(&mut rng, 50.0) >= 0.0));
    }

    #[test]
    fn test_log_normal_median_near_requested() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut samples: Vec<f64> = (0..10_001)
            .map(|_| log_normal_around(&mut rng, 200.0, 0.4, 0.0, f64::MAX))
            .collect();
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let median = samples[5000];
        assert!((median - 200.0).abs() < 15.0, "median {median}");
    }

    #[test]
    fn test_ex_gaussian_right_skew() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let samples: Vec<f64> = (0..10_000)
            .map(|_| ex_gaussian(&mut rng, 40.0, 15.0, 20.0))
            .collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        // Mean of ex-Gaussian is mu + tau
        assert!((mean - 60.0).abs() < 2.0, "mean {mean}");
        let above = samples.iter().filter(|&&s| s > mean).count();
        // Right skew puts fewer than half of the samples above the mean
        assert!(above < 5000, "above-mean count {above}");
    }

    #[test]
    fn test_bounded_samples_stay_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..1000 {
            let v = ex_gaussian_bounded(&mut rng, 40.0, 15.0, 20.0, 15.0, 150.0);
            assert!((15.0..=150.0).contains(&v));
        }
    }

    #[test]
    fn test_chance_extremes() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(!chance(&mut rng, 0.0));
        assert!(chance(&mut rng, 1.0));
        let hits = (0..10_000).filter(|_| chance(&mut rng, 0.3)).count();
        assert!((2700..3300).contains(&hits), "hits {hits}");
    }

    #[test]
    fn test_reflect_single_bounce() {
        assert!((reflect_into(1.35, 0.8, 1.3) - 1.25).abs() < 1e-12);
        assert!((reflect_into(0.75, 0.8, 1.3) - 0.85).abs() < 1e-12);
        assert!((reflect_into(1.0, 0.8, 1.3) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_reflect_double_bounce() {
        // 1.3 + 0.55 overshoots, reflects to 0.75, reflects again to 0.85
        assert!((reflect_into(1.85, 0.8, 1.3) - 0.85).abs() < 1e-12);
    }
}
