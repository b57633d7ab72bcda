//! Weighted triangle primitive
//!
//! Thickness is interpolated barycentrically. The convolution model slices
//! the triangle into segments parallel to the edge opposite vertex 0 and
//! integrates each slice with the segment kernel. Only slices within one
//! support radius of the point can contribute, so the slices are combined by
//! Gauss-Legendre quadrature over that window alone.

use super::FieldModel;
use crate::accuracy::AccuracyPolicy;
use crate::area::{Area, AreaShape, AreaTriangle};
use crate::geometry::closest_point_on_triangle;
use crate::kernel::{poly6, ConvolutionKernel, HomotheticSegment, KS, NF_POINT};
use crate::material::Material;
use crate::types::{Aabb, FieldSample, ThickVertex};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Gauss-Legendre nodes on `[0, 1]` (8 points)
const GL8_NODES: [f64; 8] = [
    0.019_855_071_751_231_856,
    0.101_666_761_293_186_63,
    0.237_233_795_041_835_5,
    0.408_282_678_752_175_1,
    0.591_717_321_247_824_9,
    0.762_766_204_958_164_5,
    0.898_333_238_706_813_4,
    0.980_144_928_248_768_2,
];

/// Weights matching [`GL8_NODES`], summing to 1
const GL8_WEIGHTS: [f64; 8] = [
    0.050_614_268_145_188_13,
    0.111_190_517_226_687_2,
    0.156_853_322_938_943_6,
    0.181_341_891_689_181,
    0.181_341_891_689_181,
    0.156_853_322_938_943_6,
    0.111_190_517_226_687_2,
    0.050_614_268_145_188_13,
];

/// Quadrature pieces across the slice window
const THETA_PIECES: usize = 4;

/// Relative step for the distance-model gradient
const GRADIENT_EPS: f64 = 1e-5;

/// Helper quantities refreshed by [`ScalisTriangle::prepare`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct TriangleCache {
    /// `v1 - v0`
    pub e1: DVec3,
    /// `v2 - v0`
    pub e2: DVec3,
    /// Unit normal (zero for degenerate triangles)
    pub normal: DVec3,
    /// `|e1 × e2|`, twice the area
    pub area2: f64,
    /// In-plane unit vector orthogonal to `e2 - e1`, pointing away from v0
    pub across: DVec3,
    /// Distance from v0 to the opposite edge along `across`
    pub height: f64,
}

/// Range of slice parameters `λ` reaching one evaluation point
#[derive(Debug, Clone, Copy)]
struct SliceWindow {
    center: f64,
    reach: f64,
    lo: f64,
    hi: f64,
}

impl SliceWindow {
    /// `θ` with `λ = center + reach sin θ`
    fn angle(&self, lambda: f64) -> f64 {
        ((lambda - self.center) / self.reach).clamp(-1.0, 1.0).asin()
    }
}

/// Weighted triangle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalisTriangle {
    /// Corner vertices
    pub vertices: [ThickVertex; 3],
    /// Material at each corner
    pub materials: [Material; 3],
    /// Field scale
    pub density: f64,
    /// Evaluation model
    pub model: FieldModel,
    #[serde(skip)]
    pub(crate) cache: TriangleCache,
}

impl ScalisTriangle {
    /// Create a unit-density triangle
    pub fn new(vertices: [ThickVertex; 3], materials: [Material; 3], model: FieldModel) -> Self {
        let mut tri = ScalisTriangle {
            vertices,
            materials,
            density: 1.0,
            model,
            cache: TriangleCache::default(),
        };
        tri.prepare();
        tri
    }

    /// Refresh the cached edges and normal
    pub fn prepare(&mut self) {
        let e1 = self.vertices[1].position - self.vertices[0].position;
        let e2 = self.vertices[2].position - self.vertices[0].position;
        let n = e1.cross(e2);
        let area2 = n.length();
        let normal = if area2 > f64::EPSILON { n / area2 } else { DVec3::ZERO };
        let mut across = normal.cross(e2 - e1).normalize_or_zero();
        if across.dot(e1) < 0.0 {
            across = -across;
        }
        self.cache = TriangleCache {
            e1,
            e2,
            normal,
            area2,
            across,
            height: across.dot(e1),
        };
    }

    fn positions(&self) -> [DVec3; 3] {
        [
            self.vertices[0].position,
            self.vertices[1].position,
            self.vertices[2].position,
        ]
    }

    fn thicknesses(&self) -> DVec3 {
        DVec3::new(
            self.vertices[0].thickness,
            self.vertices[1].thickness,
            self.vertices[2].thickness,
        )
    }

    fn max_support(&self) -> f64 {
        KS * self.thicknesses().max_element()
    }

    /// Bounding box: union of the corner supports
    pub fn aabb(&self) -> Aabb {
        self.vertices.iter().fold(Aabb::EMPTY, |acc, v| {
            acc.union(&Aabb::from_sphere(v.position, KS * v.thickness))
        })
    }

    /// Field at `p`
    pub fn eval(&self, p: DVec3, kernel: &dyn ConvolutionKernel, out: &mut FieldSample) {
        let [a, b, c] = self.positions();
        let (closest, bary) = closest_point_on_triangle(p, a, b, c);
        match self.model {
            FieldModel::Convolution => self.eval_convolution(p, kernel, out),
            FieldModel::Distance => {
                out.value = self.distance_value(p);
                if let Some(g) = out.gradient.as_mut() {
                    *g = self.distance_gradient(p);
                }
            }
        }
        if let Some(m) = out.material.as_mut() {
            *m = Material::barycentric(&self.materials, bary);
        }
        if let Some(step) = out.step.as_mut() {
            *step = (closest.distance(p) - self.max_support()).max(0.0);
        }
    }

    /// Slice parameters whose segments may reach `p`
    fn slice_window(&self, p: DVec3) -> Option<SliceWindow> {
        if self.cache.height <= f64::EPSILON {
            return None;
        }
        let w = p - self.vertices[0].position;
        let support = self.max_support();
        let off_plane = self.cache.normal.dot(w).abs();
        if off_plane >= support {
            return None;
        }
        let center = self.cache.across.dot(w) / self.cache.height;
        let reach = (support * support - off_plane * off_plane).sqrt() / self.cache.height;
        let lo = (center - reach).max(0.0);
        let hi = (center + reach).min(1.0);
        (hi > lo).then_some(SliceWindow {
            center,
            reach,
            lo,
            hi,
        })
    }

    fn eval_convolution(&self, p: DVec3, kernel: &dyn ConvolutionKernel, out: &mut FieldSample) {
        let gradient = out.wants_gradient();
        out.value = 0.0;
        if let Some(g) = out.gradient.as_mut() {
            *g = DVec3::ZERO;
        }
        let Some(window) = self.slice_window(p) else {
            return;
        };

        let v0 = self.vertices[0];
        let dt1 = self.vertices[1].thickness - v0.thickness;
        let dt2 = self.vertices[2].thickness - v0.thickness;
        let span = self.cache.e2 - self.cache.e1;

        // λ = center + reach sin θ: slice integrals fade like cos⁷θ at the
        // support edges, which the substitution turns into a smooth integrand
        let theta_lo = window.angle(window.lo);
        let piece = (window.angle(window.hi) - theta_lo) / THETA_PIECES as f64;

        let mut value = 0.0;
        let mut grad = DVec3::ZERO;
        for k in 0..THETA_PIECES {
            let start = theta_lo + k as f64 * piece;
            for (x, w) in GL8_NODES.iter().zip(GL8_WEIGHTS.iter()) {
                let (sin, cos) = (start + piece * x).sin_cos();
                let lambda = window.center + window.reach * sin;
                if lambda <= 0.0 {
                    continue;
                }
                let origin = v0.position + self.cache.e1 * lambda;
                let dir = span * lambda;
                let t_start = v0.thickness + lambda * dt1;
                let t_end = v0.thickness + lambda * dt2;
                let seg = HomotheticSegment::new(
                    p,
                    origin,
                    dir,
                    KS * t_start,
                    KS * (t_end - t_start),
                );
                let Some(clip) = seg.clip() else {
                    continue;
                };
                let slice = kernel.integrate(&seg, clip, 2, gradient);
                // dA = |e1 × e2| λ dλ dμ, dλ = reach cos θ dθ
                let weight = piece * w * window.reach * cos * lambda;
                value += weight * slice.value;
                if gradient {
                    grad += ((p - origin) * slice.gw + dir * slice.gu) * weight;
                }
            }
        }

        let scale = self.density * kernel.triangle_normalization() * self.cache.area2;
        out.value = scale * value;
        if let Some(g) = out.gradient.as_mut() {
            *g = grad * scale;
        }
    }

    /// Point kernel of the distance to the closest point, scaled by the
    /// thickness interpolated there
    fn distance_value(&self, p: DVec3) -> f64 {
        let [a, b, c] = self.positions();
        let (closest, bary) = closest_point_on_triangle(p, a, b, c);
        let t = bary.dot(self.thicknesses());
        if t <= 0.0 {
            return 0.0;
        }
        let r = KS * t;
        self.density * NF_POINT * poly6(closest.distance_squared(p) / (r * r))
    }

    /// Central differences; the interpolated thickness makes the closed form
    /// piecewise across Voronoi regions
    fn distance_gradient(&self, p: DVec3) -> DVec3 {
        let h = GRADIENT_EPS * self.thicknesses().min_element().max(f64::EPSILON);
        let inv = 0.5 / h;
        DVec3::new(
            self.distance_value(p + DVec3::X * h) - self.distance_value(p - DVec3::X * h),
            self.distance_value(p + DVec3::Y * h) - self.distance_value(p - DVec3::Y * h),
            self.distance_value(p + DVec3::Z * h) - self.distance_value(p - DVec3::Z * h),
        ) * inv
    }

    /// Accuracy oracle
    pub fn area(&self, policy: AccuracyPolicy) -> Area {
        let t = self.thicknesses();
        Area::new(
            AreaShape::Triangle(AreaTriangle::new(
                self.positions(),
                [KS * t.x, KS * t.y, KS * t.z],
                t.to_array(),
            )),
            policy,
        )
    }
}
