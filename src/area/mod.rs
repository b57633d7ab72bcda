//! Accuracy oracles
//!
//! An [`Area`] wraps the bounding geometry of one primitive and answers purely
//! geometric questions for the polygonizer: where the primitive's support
//! lies, and how fine the sampling must be near a given region. It never
//! evaluates the scalar field.
//!
//! Accuracies are lengths: the local thickness multiplied by one of the
//! [`AccuracyPolicy`] factors carried by the area.

mod capsule;
mod sphere;
mod triangle;

pub use capsule::AreaCapsule;
pub use sphere::AreaSphere;
pub use triangle::AreaTriangle;

use crate::accuracy::AccuracyPolicy;
use crate::types::{Aabb, Axis, EvalSphere};
use glam::DVec3;

/// Bounding geometry of one primitive
#[derive(Debug, Clone, PartialEq)]
pub enum AreaShape {
    /// Point primitive: a sphere
    Sphere(AreaSphere),
    /// Segment primitive: a capsule with linearly varying radius
    Capsule(AreaCapsule),
    /// Triangle primitive: a prism of vertex spheres
    Triangle(AreaTriangle),
}

/// Accuracy oracle of one primitive
#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    /// Bounding geometry
    pub shape: AreaShape,
    /// Factors applied to every accuracy query
    pub policy: AccuracyPolicy,
}

impl Area {
    /// Wrap a shape with an accuracy policy
    pub fn new(shape: AreaShape, policy: AccuracyPolicy) -> Self {
        Area { shape, policy }
    }

    /// Bounding box of the support
    pub fn aabb(&self) -> Aabb {
        match &self.shape {
            AreaShape::Sphere(s) => s.aabb(),
            AreaShape::Capsule(c) => c.aabb(),
            AreaShape::Triangle(t) => t.aabb(),
        }
    }

    /// Does the evaluation sphere intersect the support
    pub fn sphere_intersects(&self, sphere: &EvalSphere) -> bool {
        match &self.shape {
            AreaShape::Sphere(s) => s.sphere_intersects(sphere),
            AreaShape::Capsule(c) => c.sphere_intersects(sphere),
            AreaShape::Triangle(t) => t.sphere_intersects(sphere),
        }
    }

    /// Does the point lie inside the support
    pub fn contains(&self, point: DVec3) -> bool {
        match &self.shape {
            AreaShape::Sphere(s) => s.contains(point),
            AreaShape::Capsule(c) => c.contains(point),
            AreaShape::Triangle(t) => t.contains(point),
        }
    }

    /// Sampling length required near `sphere`, scaled by `factor`
    pub fn accuracy(&self, sphere: &EvalSphere, factor: f64) -> f64 {
        factor * self.local_thickness(sphere)
    }

    /// Accuracy under which a region straddling the iso-value may be interpolated
    pub fn nice_accuracy(&self, sphere: &EvalSphere) -> f64 {
        self.accuracy(sphere, self.policy.nice)
    }

    /// Accuracy under which an iso-uniform region may be interpolated
    pub fn raw_accuracy(&self, sphere: &EvalSphere) -> f64 {
        self.accuracy(sphere, self.policy.raw)
    }

    /// Accuracy used to size sampling steps
    pub fn current_accuracy(&self, sphere: &EvalSphere) -> f64 {
        self.accuracy(sphere, self.policy.current)
    }

    /// Finest accuracy needed anywhere in the area
    pub fn min_accuracy(&self, factor: f64) -> f64 {
        factor * self.min_thickness()
    }

    /// Finest accuracy with the `current` factor
    pub fn min_current_accuracy(&self) -> f64 {
        self.min_accuracy(self.policy.current)
    }

    /// Coarsest accuracy needed anywhere in the area
    pub fn max_accuracy(&self, factor: f64) -> f64 {
        factor * self.max_thickness()
    }

    /// Safe step along `axis` from coordinate `coord`
    ///
    /// Before the support this is the distance to its start, inside it the
    /// current accuracy of the slab at `coord`, past it infinity.
    pub fn axis_projection_min_step(&self, axis: Axis, coord: f64) -> f64 {
        let aabb = self.aabb();
        let lo = axis.of(aabb.min);
        let hi = axis.of(aabb.max);
        if coord < lo {
            return lo - coord;
        }
        if coord > hi {
            return f64::INFINITY;
        }
        let thickness = match &self.shape {
            AreaShape::Sphere(s) => s.thickness,
            AreaShape::Capsule(c) => c.slab_thickness(axis, coord),
            AreaShape::Triangle(t) => t.slab_thickness(axis, coord),
        };
        self.policy.current * thickness
    }

    fn local_thickness(&self, sphere: &EvalSphere) -> f64 {
        match &self.shape {
            AreaShape::Sphere(s) => s.thickness,
            AreaShape::Capsule(c) => c.local_thickness(sphere),
            AreaShape::Triangle(t) => t.local_thickness(sphere),
        }
    }

    fn min_thickness(&self) -> f64 {
        match &self.shape {
            AreaShape::Sphere(s) => s.thickness,
            AreaShape::Capsule(c) => c.t0.min(c.t1),
            AreaShape::Triangle(t) => t.thickness.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }

    fn max_thickness(&self) -> f64 {
        match &self.shape {
            AreaShape::Sphere(s) => s.thickness,
            AreaShape::Capsule(c) => c.t0.max(c.t1),
            AreaShape::Triangle(t) => t.thickness.iter().copied().fold(0.0, f64::max),
        }
    }
}
