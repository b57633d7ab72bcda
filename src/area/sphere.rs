//! Spherical area of a point primitive

use crate::types::{Aabb, EvalSphere};
use glam::DVec3;

/// Support sphere of uniform thickness
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaSphere {
    /// Center
    pub center: DVec3,
    /// Radius beyond which the field is neutral
    pub support: f64,
    /// Thickness driving the accuracy
    pub thickness: f64,
}

impl AreaSphere {
    /// Create a spherical area
    pub fn new(center: DVec3, support: f64, thickness: f64) -> Self {
        AreaSphere {
            center,
            support,
            thickness,
        }
    }

    /// Bounding box
    pub fn aabb(&self) -> Aabb {
        Aabb::from_sphere(self.center, self.support)
    }

    /// Sphere/sphere overlap
    #[inline(always)]
    pub fn sphere_intersects(&self, sphere: &EvalSphere) -> bool {
        let reach = self.support + sphere.radius;
        self.center.distance_squared(sphere.center) < reach * reach
    }

    /// Point inside the support
    #[inline(always)]
    pub fn contains(&self, point: DVec3) -> bool {
        self.center.distance_squared(point) < self.support * self.support
    }
}
