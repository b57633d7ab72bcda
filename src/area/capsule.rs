//! Capsule area of a segment primitive
//!
//! Support and thickness both vary linearly from one end to the other.

use crate::kernel::HomotheticSegment;
use crate::types::{Aabb, Axis, EvalSphere};
use glam::DVec3;

/// Weighted capsule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaCapsule {
    /// First end
    pub p0: DVec3,
    /// Second end
    pub p1: DVec3,
    /// Support radius at `p0`
    pub r0: f64,
    /// Support radius at `p1`
    pub r1: f64,
    /// Thickness at `p0`
    pub t0: f64,
    /// Thickness at `p1`
    pub t1: f64,
}

impl AreaCapsule {
    /// Create a capsule area from end supports and thicknesses
    pub fn new(p0: DVec3, p1: DVec3, support: [f64; 2], thickness: [f64; 2]) -> Self {
        AreaCapsule {
            p0,
            p1,
            r0: support[0],
            r1: support[1],
            t0: thickness[0],
            t1: thickness[1],
        }
    }

    /// Bounding box: union of the end spheres
    pub fn aabb(&self) -> Aabb {
        Aabb::from_sphere(self.p0, self.r0).union(&Aabb::from_sphere(self.p1, self.r1))
    }

    #[inline(always)]
    fn homothetic(&self, point: DVec3, margin: f64) -> HomotheticSegment {
        HomotheticSegment::new(
            point,
            self.p0,
            self.p1 - self.p0,
            self.r0 + margin,
            self.r1 - self.r0,
        )
    }

    /// The sphere reaches the support when its center lies in the support
    /// inflated by its radius
    pub fn sphere_intersects(&self, sphere: &EvalSphere) -> bool {
        self.homothetic(sphere.center, sphere.radius).clip().is_some()
    }

    /// Point inside the support
    pub fn contains(&self, point: DVec3) -> bool {
        self.homothetic(point, 0.0).clip().is_some()
    }

    #[inline(always)]
    fn thickness_at(&self, s: f64) -> f64 {
        self.t0 + (self.t1 - self.t0) * s.clamp(0.0, 1.0)
    }

    /// Thinnest point of the axis within reach of the sphere
    pub fn local_thickness(&self, sphere: &EvalSphere) -> f64 {
        let axis = self.p1 - self.p0;
        let len = axis.length();
        if len <= f64::EPSILON {
            return self.t0.min(self.t1);
        }
        let s = (sphere.center - self.p0).dot(axis) / (len * len);
        let window = (sphere.radius + self.r0.max(self.r1)) / len;
        self.thickness_at(s - window).min(self.thickness_at(s + window))
    }

    /// Thinnest point of the axis whose support reaches the plane `axis = coord`
    pub fn slab_thickness(&self, axis: Axis, coord: f64) -> f64 {
        let a = axis.of(self.p0);
        let d = axis.of(self.p1) - a;
        let reach = self.r0.max(self.r1);
        if d.abs() <= f64::EPSILON {
            return self.t0.min(self.t1);
        }
        let s_lo = (coord - reach - a) / d;
        let s_hi = (coord + reach - a) / d;
        self.thickness_at(s_lo).min(self.thickness_at(s_hi))
    }
}
