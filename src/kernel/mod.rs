//! Compact-support field kernels
//!
//! All SCALIS primitives share the compact polynomial `(1 - r²)³`, where `r`
//! is the distance divided by the support radius `KS * thickness`. The
//! normalization constants put the field at exactly `density` at distance
//! `thickness` from a point, an infinite segment and an infinite plane, so
//! an iso-value of 1 reproduces the thickness as the surface offset.
//!
//! - [`homothetic`]: clipping of a weighted segment against the kernel support
//! - [`convolution`]: the pluggable closed-form integral along that support

pub mod convolution;
pub mod homothetic;

pub use convolution::{ConvolutionKernel, KernelIntegral, Poly6Convolution};
pub use homothetic::{Clip, HomotheticSegment};

use std::f64::consts::PI;

/// Kernel support scale: the field vanishes at `KS * thickness`
pub const KS: f64 = 2.0;
/// Inverse support scale
pub const KIS: f64 = 1.0 / KS;
/// `KS²`
pub const KS2: f64 = KS * KS;
/// `KIS²`
pub const KIS2: f64 = KIS * KIS;

/// `1 - r²` at distance `thickness`
const A2: f64 = 1.0 - KIS2;

/// Point normalization: `1 / (1 - KIS²)³`
pub const NF_POINT: f64 = 1.0 / (A2 * A2 * A2);

/// Segment normalization: inverse of the line integral at distance `thickness`
pub fn nf_segment() -> f64 {
    35.0 / (32.0 * KS * A2.powf(3.5))
}

/// Triangle normalization: inverse of the plane integral at distance `thickness`
pub fn nf_triangle() -> f64 {
    4.0 / (PI * KS2 * A2.powi(4))
}

/// Compact polynomial `(1 - r²)³` of a normalized squared distance
#[inline(always)]
pub fn poly6(r2: f64) -> f64 {
    if r2 >= 1.0 {
        0.0
    } else {
        let a = 1.0 - r2;
        a * a * a
    }
}

/// Derivative of [`poly6`] with respect to `r²`
#[inline(always)]
pub fn poly6_derivative(r2: f64) -> f64 {
    if r2 >= 1.0 {
        0.0
    } else {
        let a = 1.0 - r2;
        -3.0 * a * a
    }
}

/// Normalized point kernel at squared distance `d2` with thickness `t`
///
/// Returns `(value, d value / d d²)` for unit density.
#[inline(always)]
pub fn point_kernel(d2: f64, thickness: f64) -> (f64, f64) {
    let inv_r2 = 1.0 / (KS2 * thickness * thickness);
    let r2 = d2 * inv_r2;
    (
        NF_POINT * poly6(r2),
        NF_POINT * poly6_derivative(r2) * inv_r2,
    )
}

/// Distance at which a unit-density point kernel of thickness `t` equals `value`
///
/// Returns `None` when `value` is above the kernel peak or not positive.
pub fn point_kernel_inverse(value: f64, thickness: f64) -> Option<f64> {
    if value <= 0.0 || value > NF_POINT {
        return None;
    }
    let a = (value / NF_POINT).cbrt();
    Some(KS * thickness * (1.0 - a).max(0.0).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_kernel_unit_at_thickness() {
        let (v, _) = point_kernel(1.0, 1.0);
        assert!((v - 1.0).abs() < 1e-12);
        let (v, _) = point_kernel(9.0, 3.0);
        assert!((v - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_kernel_support() {
        let (v, dv) = point_kernel(KS2, 1.0);
        assert_eq!(v, 0.0);
        assert_eq!(dv, 0.0);
        let (v, _) = point_kernel(KS2 * 0.99, 1.0);
        assert!(v > 0.0);
    }

    #[test]
    fn test_point_kernel_inverse() {
        let r = point_kernel_inverse(0.5, 1.0).unwrap();
        let (v, _) = point_kernel(r * r, 1.0);
        assert!((v - 0.5).abs() < 1e-12);
        assert!(point_kernel_inverse(NF_POINT * 2.0, 1.0).is_none());
    }
}
