//! Pointer actuation
//!
//! Output side of the engine: a host-provided driver that moves and clicks
//! the pointer. Drivers are async because real actuation takes time (the
//! cursor travels a path); the engine awaits them off the tick thread.

use async_trait::async_trait;
use rand::Rng;

use crate::core::error::Result;
use crate::core::types::{ScreenPoint, ScreenRect};
use crate::stats::distributions;

/// Host-provided pointer driver
#[async_trait]
pub trait PointerDriver: Send + Sync {
    /// Move the pointer to a screen position along a humanized path
    async fn move_to(&self, point: ScreenPoint) -> Result<()>;

    /// Small relative pointer adjustment
    async fn nudge(&self, dx: i32, dy: i32) -> Result<()>;

    /// Press and release at the current pointer position
    async fn click(&self) -> Result<()>;

    /// Current pointer position, None when unknown
    fn position(&self) -> Option<ScreenPoint>;
}

/// Pick a click point inside a target's bounds
///
/// Gaussian around a jittered near-center anchor rather than the exact
/// center; humans cluster toward the middle of a target but never hit the
/// same pixel twice.
pub fn gaussian_point_in<R: Rng + ?Sized>(rng: &mut R, rect: ScreenRect) -> ScreenPoint {
    let anchor_x = rect.x as f64 + rect.width as f64 * rng.gen_range(0.45..0.55);
    let anchor_y = rect.y as f64 + rect.height as f64 * rng.gen_range(0.45..0.55);
    let x = distributions::gaussian(rng, anchor_x, rect.width as f64 * 0.15);
    let y = distributions::gaussian(rng, anchor_y, rect.height as f64 * 0.15);
    ScreenPoint {
        x: (x.round() as i32).clamp(rect.x, rect.x + (rect.width - 1).max(0)),
        y: (y.round() as i32).clamp(rect.y, rect.y + (rect.height - 1).max(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_click_points_stay_inside_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let rect = ScreenRect {
            x: 100,
            y: 200,
            width: 40,
            height: 30,
        };
        for _ in 0..2000 {
            let p = gaussian_point_in(&mut rng, rect);
            assert!(rect.contains(&p), "point {p:?} escaped {rect:?}");
        }
    }

    #[test]
    fn test_click_points_cluster_near_center() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let rect = ScreenRect {
            x: 0,
            y: 0,
            width: 100,
            height: 100,
        };
        let center = rect.center();
        let near = (0..2000)
            .map(|_| gaussian_point_in(&mut rng, rect))
            .filter(|p| p.distance_to(&center) < 30.0)
            .count();
        // Mean distance from center is well under a third of the width
        assert!(near > 1400, "only {near} of 2000 near center");
    }

    #[test]
    fn test_degenerate_rect_still_yields_point() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let rect = ScreenRect {
            x: 5,
            y: 5,
            width: 1,
            height: 1,
        };
        let p = gaussian_point_in(&mut rng, rect);
        assert_eq!((p.x, p.y), (5, 5));
    }
}
