//! Clamped difference
//!
//! `value = max(0, v0 - v1^alpha)`: the subtrahend is raised to `alpha`
//! before removal, which sharpens (alpha > 1) or softens (alpha < 1) the
//! carved region.

use glam::DVec3;

/// Difference value
#[inline(always)]
pub fn difference_value(v0: f64, v1: f64, alpha: f64) -> f64 {
    if v1 <= 0.0 {
        return v0.max(0.0);
    }
    (v0 - v1.powf(alpha)).max(0.0)
}

/// Difference gradient; zero where the clamp is active
#[inline(always)]
pub fn difference_gradient(v0: f64, g0: DVec3, v1: f64, g1: DVec3, alpha: f64) -> DVec3 {
    if difference_value(v0, v1, alpha) <= 0.0 {
        return DVec3::ZERO;
    }
    if v1 <= 0.0 {
        return g0;
    }
    g0 - g1 * (alpha * v1.powf(alpha - 1.0))
}
