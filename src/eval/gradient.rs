//! Finite-difference gradients
//!
//! Every primitive reports an analytic gradient; these central differences
//! exist to cross-check them and to orient normals of arbitrary fields.

use crate::convergence::ScalarField;
use glam::DVec3;

/// Central-difference gradient of `field` at `p`
///
/// Six value-only evaluations, step `h` along each axis.
pub fn numerical_gradient<F: ScalarField + ?Sized>(field: &mut F, p: DVec3, h: f64) -> DVec3 {
    let inv = 0.5 / h;
    let dx = DVec3::new(h, 0.0, 0.0);
    let dy = DVec3::new(0.0, h, 0.0);
    let dz = DVec3::new(0.0, 0.0, h);
    DVec3::new(
        field.value(p + dx) - field.value(p - dx),
        field.value(p + dy) - field.value(p - dy),
        field.value(p + dz) - field.value(p - dz),
    ) * inv
}

/// Outward surface normal: the negated, normalized gradient
///
/// Blobtree fields grow toward the inside, so the outward direction is
/// `-gradient`. Returns zero where the gradient vanishes.
#[inline]
pub fn surface_normal(gradient: DVec3) -> DVec3 {
    (-gradient).normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldSample;

    #[test]
    fn test_numerical_gradient_quadratic() {
        let mut f = |p: DVec3, out: &mut FieldSample| out.value = p.length_squared();
        let g = numerical_gradient(&mut f, DVec3::new(1.0, -2.0, 0.5), 1e-4);
        assert!((g - DVec3::new(2.0, -4.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn test_surface_normal_points_outward() {
        assert_eq!(surface_normal(DVec3::new(-3.0, 0.0, 0.0)), DVec3::X);
        assert_eq!(surface_normal(DVec3::ZERO), DVec3::ZERO);
    }
}
