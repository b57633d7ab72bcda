//! Field primitives
//!
//! SCALIS primitives (weighted point, segment and triangle) are the leaves of
//! blend-style trees: positive compact-support fields reaching `density` at
//! distance `thickness` from their geometry. SDF primitives are exact signed
//! distances used only under an SDF root node.
//!
//! Dispatch is by enum matching; every primitive exposes the same `aabb`,
//! `eval` and `area` trio.

mod point;
mod sdf;
mod segment;
mod triangle;

pub use point::ScalisPoint;
pub use sdf::{sdf_capsule, sdf_sphere_at, SdfPrimitive, SdfShape};
pub use segment::ScalisSegment;
pub use triangle::ScalisTriangle;

use crate::accuracy::AccuracyPolicy;
use crate::area::Area;
use crate::kernel::ConvolutionKernel;
use crate::material::Material;
use crate::types::{Aabb, FieldSample, ThickVertex};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// How a segment or triangle turns its geometry into a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FieldModel {
    /// Point kernel of the (thickness-normalized) distance to the geometry
    Distance,
    /// Kernel integrated over the geometry (convolution surface)
    #[default]
    Convolution,
}

/// SCALIS leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalisPrimitive {
    /// Weighted point
    Point(ScalisPoint),
    /// Weighted segment
    Segment(ScalisSegment),
    /// Weighted triangle
    Triangle(ScalisTriangle),
}

impl ScalisPrimitive {
    /// Short kind name, used in error messages and logs
    pub fn kind_name(&self) -> &'static str {
        match self {
            ScalisPrimitive::Point(_) => "point",
            ScalisPrimitive::Segment(_) => "segment",
            ScalisPrimitive::Triangle(_) => "triangle",
        }
    }

    /// Refresh cached helper quantities
    pub fn prepare(&mut self) {
        match self {
            ScalisPrimitive::Point(_) => {}
            ScalisPrimitive::Segment(s) => s.prepare(),
            ScalisPrimitive::Triangle(t) => t.prepare(),
        }
    }

    /// Bounding box of the support
    pub fn aabb(&self) -> Aabb {
        match self {
            ScalisPrimitive::Point(p) => p.aabb(),
            ScalisPrimitive::Segment(s) => s.aabb(),
            ScalisPrimitive::Triangle(t) => t.aabb(),
        }
    }

    /// Field at `p` into the requested slots of `out`
    #[inline]
    pub fn eval(&self, p: DVec3, kernel: &dyn ConvolutionKernel, out: &mut FieldSample) {
        match self {
            ScalisPrimitive::Point(pt) => pt.eval(p, out),
            ScalisPrimitive::Segment(s) => s.eval(p, kernel, out),
            ScalisPrimitive::Triangle(t) => t.eval(p, kernel, out),
        }
    }

    /// Accuracy oracle
    pub fn area(&self, policy: AccuracyPolicy) -> Area {
        match self {
            ScalisPrimitive::Point(p) => p.area(policy),
            ScalisPrimitive::Segment(s) => s.area(policy),
            ScalisPrimitive::Triangle(t) => t.area(policy),
        }
    }

    /// Owned vertices
    pub fn vertices(&self) -> &[ThickVertex] {
        match self {
            ScalisPrimitive::Point(p) => std::slice::from_ref(&p.vertex),
            ScalisPrimitive::Segment(s) => &s.vertices,
            ScalisPrimitive::Triangle(t) => &t.vertices,
        }
    }

    /// Owned vertices, mutably; callers must invalidate the element afterwards
    pub(crate) fn vertices_mut(&mut self) -> &mut [ThickVertex] {
        match self {
            ScalisPrimitive::Point(p) => std::slice::from_mut(&mut p.vertex),
            ScalisPrimitive::Segment(s) => &mut s.vertices,
            ScalisPrimitive::Triangle(t) => &mut t.vertices,
        }
    }

    /// Per-vertex materials (one for a point)
    pub(crate) fn materials_mut(&mut self) -> &mut [Material] {
        match self {
            ScalisPrimitive::Point(p) => std::slice::from_mut(&mut p.material),
            ScalisPrimitive::Segment(s) => &mut s.materials,
            ScalisPrimitive::Triangle(t) => &mut t.materials,
        }
    }

    /// Field scale
    pub fn density(&self) -> f64 {
        match self {
            ScalisPrimitive::Point(p) => p.density,
            ScalisPrimitive::Segment(s) => s.density,
            ScalisPrimitive::Triangle(t) => t.density,
        }
    }

    pub(crate) fn set_density(&mut self, density: f64) {
        match self {
            ScalisPrimitive::Point(p) => p.density = density,
            ScalisPrimitive::Segment(s) => s.density = density,
            ScalisPrimitive::Triangle(t) => t.density = density,
        }
    }

    /// Returns `false` for points, which have a single model
    pub(crate) fn set_model(&mut self, model: FieldModel) -> bool {
        match self {
            ScalisPrimitive::Point(_) => false,
            ScalisPrimitive::Segment(s) => {
                s.model = model;
                true
            }
            ScalisPrimitive::Triangle(t) => {
                t.model = model;
                true
            }
        }
    }
}

impl From<ScalisPoint> for ScalisPrimitive {
    fn from(p: ScalisPoint) -> Self {
        ScalisPrimitive::Point(p)
    }
}

impl From<ScalisSegment> for ScalisPrimitive {
    fn from(s: ScalisSegment) -> Self {
        ScalisPrimitive::Segment(s)
    }
}

impl From<ScalisTriangle> for ScalisPrimitive {
    fn from(t: ScalisTriangle) -> Self {
        ScalisPrimitive::Triangle(t)
    }
}
