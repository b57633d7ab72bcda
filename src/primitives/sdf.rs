//! Exact signed-distance primitives
//!
//! These produce unbounded signed distances (negative inside) and only make
//! sense under an SDF root node, which maps the distance through a compact
//! support functor into the blend-style field convention.

use crate::accuracy::AccuracyPolicy;
use crate::area::{Area, AreaCapsule, AreaShape, AreaSphere};
use crate::geometry::segment_parameter;
use crate::material::Material;
use crate::types::{Aabb, FieldSample};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Signed distance to a sphere at arbitrary center
#[inline(always)]
pub fn sdf_sphere_at(point: DVec3, center: DVec3, radius: f64) -> f64 {
    (point - center).length() - radius
}

/// Signed distance to a capsule (segment `[a, b]` inflated by `radius`)
#[inline(always)]
pub fn sdf_capsule(point: DVec3, a: DVec3, b: DVec3, radius: f64) -> f64 {
    let h = segment_parameter(point, a, b);
    (point - a - (b - a) * h).length() - radius
}

/// Analytic SDF shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SdfShape {
    /// Sphere
    Sphere {
        /// Center
        center: DVec3,
        /// Radius
        radius: f64,
    },
    /// Capsule
    Capsule {
        /// Axis start
        a: DVec3,
        /// Axis end
        b: DVec3,
        /// Radius
        radius: f64,
    },
}

/// SDF leaf with a uniform material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdfPrimitive {
    /// Shape
    pub shape: SdfShape,
    /// Surface appearance
    pub material: Material,
}

impl SdfPrimitive {
    /// Sphere leaf
    pub fn sphere(center: DVec3, radius: f64, material: Material) -> Self {
        SdfPrimitive {
            shape: SdfShape::Sphere { center, radius },
            material,
        }
    }

    /// Capsule leaf
    pub fn capsule(a: DVec3, b: DVec3, radius: f64, material: Material) -> Self {
        SdfPrimitive {
            shape: SdfShape::Capsule { a, b, radius },
            material,
        }
    }

    /// Signed distance
    #[inline(always)]
    pub fn distance(&self, p: DVec3) -> f64 {
        match self.shape {
            SdfShape::Sphere { center, radius } => sdf_sphere_at(p, center, radius),
            SdfShape::Capsule { a, b, radius } => sdf_capsule(p, a, b, radius),
        }
    }

    /// Box of the region where the distance is negative
    pub fn aabb(&self) -> Aabb {
        match self.shape {
            SdfShape::Sphere { center, radius } => Aabb::from_sphere(center, radius),
            SdfShape::Capsule { a, b, radius } => {
                Aabb::from_sphere(a, radius).union(&Aabb::from_sphere(b, radius))
            }
        }
    }

    /// Signed distance into `out.value`, unit gradient and material if requested
    pub fn eval(&self, p: DVec3, out: &mut FieldSample) {
        out.value = self.distance(p);
        if let Some(g) = out.gradient.as_mut() {
            let closest = match self.shape {
                SdfShape::Sphere { center, .. } => center,
                SdfShape::Capsule { a, b, .. } => a + (b - a) * segment_parameter(p, a, b),
            };
            // On the axis any direction is valid; pick +Y like the mesher's fallback
            *g = (p - closest).try_normalize().unwrap_or(DVec3::Y);
        }
        if let Some(m) = out.material.as_mut() {
            *m = self.material;
        }
    }

    /// Accuracy oracle for a functor of half-width `support`
    pub fn area(&self, support: f64, policy: AccuracyPolicy) -> Area {
        let shape = match self.shape {
            SdfShape::Sphere { center, radius } => {
                AreaShape::Sphere(AreaSphere::new(center, radius + support, radius.min(support)))
            }
            SdfShape::Capsule { a, b, radius } => {
                let r = radius + support;
                let t = radius.min(support);
                AreaShape::Capsule(AreaCapsule::new(a, b, [r, r], [t, t]))
            }
        };
        Area::new(shape, policy)
    }
}
