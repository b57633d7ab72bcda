//! Weighted point primitive
//!
//! The simplest SCALIS primitive: the normalized `(1 - r²)³` kernel of the
//! distance to one thick vertex. Both field models coincide for a point.

use crate::accuracy::AccuracyPolicy;
use crate::area::{Area, AreaShape, AreaSphere};
use crate::kernel::{point_kernel, KS};
use crate::material::Material;
use crate::types::{Aabb, FieldSample, ThickVertex};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Weighted point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalisPoint {
    /// The vertex
    pub vertex: ThickVertex,
    /// Surface appearance
    pub material: Material,
    /// Field scale: the value at distance `thickness`
    pub density: f64,
}

impl ScalisPoint {
    /// Create a point of unit density
    pub fn new(vertex: ThickVertex, material: Material) -> Self {
        ScalisPoint {
            vertex,
            material,
            density: 1.0,
        }
    }

    /// Support radius
    #[inline(always)]
    pub fn support(&self) -> f64 {
        KS * self.vertex.thickness
    }

    /// Bounding box of the support
    pub fn aabb(&self) -> Aabb {
        Aabb::from_sphere(self.vertex.position, self.support())
    }

    /// Field at `p`
    #[inline]
    pub fn eval(&self, p: DVec3, out: &mut FieldSample) {
        let d = p - self.vertex.position;
        let (v, dv) = point_kernel(d.length_squared(), self.vertex.thickness);
        out.value = self.density * v;
        if let Some(g) = out.gradient.as_mut() {
            *g = d * (2.0 * self.density * dv);
        }
        if let Some(m) = out.material.as_mut() {
            *m = self.material;
        }
        if let Some(step) = out.step.as_mut() {
            *step = (d.length() - self.support()).max(0.0);
        }
    }

    /// Accuracy oracle
    pub fn area(&self, policy: AccuracyPolicy) -> Area {
        Area::new(
            AreaShape::Sphere(AreaSphere::new(
                self.vertex.position,
                self.support(),
                self.vertex.thickness,
            )),
            policy,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::NF_POINT;

    fn unit_point() -> ScalisPoint {
        ScalisPoint::new(ThickVertex::new(DVec3::ZERO, 1.0), Material::default())
    }

    #[test]
    fn test_point_peak_and_unit_thickness() {
        let pt = unit_point();
        let mut s = FieldSample::value_only();
        pt.eval(DVec3::ZERO, &mut s);
        assert!((s.value - NF_POINT).abs() < 1e-12);
        pt.eval(DVec3::new(0.0, 1.0, 0.0), &mut s);
        assert!((s.value - 1.0).abs() < 1e-12);
        pt.eval(DVec3::new(0.0, 0.0, 2.0), &mut s);
        assert_eq!(s.value, 0.0);
    }

    #[test]
    fn test_point_gradient_points_inward() {
        let pt = unit_point();
        let mut s = FieldSample::with_gradient();
        pt.eval(DVec3::new(1.0, 0.0, 0.0), &mut s);
        let g = s.gradient.unwrap();
        assert!(g.x < 0.0);
        assert!(g.y.abs() < 1e-12 && g.z.abs() < 1e-12);
    }

    #[test]
    fn test_point_step() {
        let pt = unit_point();
        let mut s = FieldSample::value_only().and_step();
        pt.eval(DVec3::new(5.0, 0.0, 0.0), &mut s);
        assert!((s.step.unwrap() - 3.0).abs() < 1e-12);
        pt.eval(DVec3::new(1.0, 0.0, 0.0), &mut s);
        assert_eq!(s.step, Some(0.0));
    }
}
