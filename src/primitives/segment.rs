//! Weighted segment primitive
//!
//! Thickness varies linearly from one vertex to the other. The convolution
//! model integrates the kernel along the clipped segment; the distance model
//! applies the point kernel at the homothetic projection, where the distance
//! normalized by the local support is smallest.

use super::FieldModel;
use crate::accuracy::AccuracyPolicy;
use crate::area::{Area, AreaCapsule, AreaShape};
use crate::geometry::segment_distance;
use crate::kernel::{poly6, poly6_derivative, ConvolutionKernel, HomotheticSegment, KS, NF_POINT};
use crate::material::Material;
use crate::types::{Aabb, FieldSample, ThickVertex};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Helper quantities refreshed by [`ScalisSegment::prepare`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct SegmentCache {
    /// `p1 - p0`
    pub dir: DVec3,
    /// `|p1 - p0|`
    pub length: f64,
    /// Support radius at `p0`
    pub r0: f64,
    /// Support radius slope
    pub dr: f64,
}

/// Weighted segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalisSegment {
    /// End vertices
    pub vertices: [ThickVertex; 2],
    /// Material at each end
    pub materials: [Material; 2],
    /// Field scale
    pub density: f64,
    /// Evaluation model
    pub model: FieldModel,
    #[serde(skip)]
    pub(crate) cache: SegmentCache,
}

impl ScalisSegment {
    /// Create a unit-density segment
    pub fn new(vertices: [ThickVertex; 2], materials: [Material; 2], model: FieldModel) -> Self {
        let mut seg = ScalisSegment {
            vertices,
            materials,
            density: 1.0,
            model,
            cache: SegmentCache::default(),
        };
        seg.prepare();
        seg
    }

    /// Refresh the cached direction and support slope
    pub fn prepare(&mut self) {
        let [a, b] = self.vertices;
        let dir = b.position - a.position;
        self.cache = SegmentCache {
            dir,
            length: dir.length(),
            r0: KS * a.thickness,
            dr: KS * (b.thickness - a.thickness),
        };
    }

    fn max_support(&self) -> f64 {
        KS * self.vertices[0].thickness.max(self.vertices[1].thickness)
    }

    /// Bounding box: union of the end supports
    pub fn aabb(&self) -> Aabb {
        let [a, b] = self.vertices;
        Aabb::from_sphere(a.position, KS * a.thickness)
            .union(&Aabb::from_sphere(b.position, KS * b.thickness))
    }

    #[inline(always)]
    fn homothetic(&self, p: DVec3) -> HomotheticSegment {
        HomotheticSegment::new(
            p,
            self.vertices[0].position,
            self.cache.dir,
            self.cache.r0,
            self.cache.dr,
        )
    }

    /// Field at `p`
    pub fn eval(&self, p: DVec3, kernel: &dyn ConvolutionKernel, out: &mut FieldSample) {
        let seg = self.homothetic(p);
        match self.model {
            FieldModel::Convolution => self.eval_convolution(p, &seg, kernel, out),
            FieldModel::Distance => self.eval_distance(p, &seg, out),
        }
        if let Some(m) = out.material.as_mut() {
            *m = self.materials[0].lerp(&self.materials[1], seg.projection());
        }
        if let Some(step) = out.step.as_mut() {
            let [a, b] = self.vertices;
            *step = (segment_distance(p, a.position, b.position) - self.max_support()).max(0.0);
        }
    }

    fn eval_convolution(
        &self,
        p: DVec3,
        seg: &HomotheticSegment,
        kernel: &dyn ConvolutionKernel,
        out: &mut FieldSample,
    ) {
        let Some(clip) = seg.clip() else {
            out.value = 0.0;
            if let Some(g) = out.gradient.as_mut() {
                *g = DVec3::ZERO;
            }
            return;
        };
        let integral = kernel.integrate(seg, clip, 1, out.wants_gradient());
        let scale = self.density * kernel.segment_normalization() * self.cache.length;
        out.value = scale * integral.value;
        if let Some(g) = out.gradient.as_mut() {
            let w = p - self.vertices[0].position;
            *g = (w * integral.gw + self.cache.dir * integral.gu) * scale;
        }
    }

    fn eval_distance(&self, p: DVec3, seg: &HomotheticSegment, out: &mut FieldSample) {
        let s = seg.projection();
        let r = seg.support(s);
        if r <= 0.0 {
            out.value = 0.0;
            if let Some(g) = out.gradient.as_mut() {
                *g = DVec3::ZERO;
            }
            return;
        }
        let inv_r2 = 1.0 / (r * r);
        let x = seg.squared_distance(s) * inv_r2;
        let scale = self.density * NF_POINT;
        out.value = scale * poly6(x);
        if let Some(g) = out.gradient.as_mut() {
            // The projection minimizes x, so only its explicit dependence on p remains
            let closest = self.vertices[0].position + self.cache.dir * s;
            *g = (p - closest) * (2.0 * inv_r2 * scale * poly6_derivative(x));
        }
    }

    /// Accuracy oracle
    pub fn area(&self, policy: AccuracyPolicy) -> Area {
        let [a, b] = self.vertices;
        Area::new(
            AreaShape::Capsule(AreaCapsule::new(
                a.position,
                b.position,
                [KS * a.thickness, KS * b.thickness],
                [a.thickness, b.thickness],
            )),
            policy,
        )
    }
}
