//! Triangle area: the triangle swept by its vertex supports

use crate::geometry::closest_point_on_triangle;
use crate::types::{Aabb, Axis, EvalSphere};
use glam::DVec3;

/// Weighted triangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaTriangle {
    /// Corner positions
    pub vertices: [DVec3; 3],
    /// Support radius at each corner
    pub support: [f64; 3],
    /// Thickness at each corner
    pub thickness: [f64; 3],
}

impl AreaTriangle {
    /// Create a triangle area
    pub fn new(vertices: [DVec3; 3], support: [f64; 3], thickness: [f64; 3]) -> Self {
        AreaTriangle {
            vertices,
            support,
            thickness,
        }
    }

    fn max_support(&self) -> f64 {
        self.support[0].max(self.support[1]).max(self.support[2])
    }

    /// Bounding box: union of the corner spheres
    pub fn aabb(&self) -> Aabb {
        (0..3).fold(Aabb::EMPTY, |acc, i| {
            acc.union(&Aabb::from_sphere(self.vertices[i], self.support[i]))
        })
    }

    #[inline(always)]
    fn distance(&self, point: DVec3) -> (f64, DVec3) {
        let [a, b, c] = self.vertices;
        let (q, bary) = closest_point_on_triangle(point, a, b, c);
        (q.distance(point), bary)
    }

    /// Conservative overlap test against the largest corner support
    pub fn sphere_intersects(&self, sphere: &EvalSphere) -> bool {
        self.distance(sphere.center).0 < self.max_support() + sphere.radius
    }

    /// Conservative containment against the largest corner support
    pub fn contains(&self, point: DVec3) -> bool {
        self.distance(point).0 < self.max_support()
    }

    /// Thickness at the closest point, lowered by every corner within reach
    pub fn local_thickness(&self, sphere: &EvalSphere) -> f64 {
        let (_, bary) = self.distance(sphere.center);
        let mut t = bary.dot(DVec3::from_array(self.thickness));
        for i in 0..3 {
            if self.vertices[i].distance(sphere.center) < sphere.radius + self.support[i] {
                t = t.min(self.thickness[i]);
            }
        }
        t
    }

    /// Thinnest point of the triangle whose support reaches `axis = coord`
    ///
    /// Thickness is linear over the triangle, so its minimum over the slab
    /// lies on a corner inside the slab or on an edge crossing a slab plane.
    pub fn slab_thickness(&self, axis: Axis, coord: f64) -> f64 {
        let reach = self.max_support();
        let planes = [coord - reach, coord + reach];
        let mut t = f64::INFINITY;
        for i in 0..3 {
            let j = (i + 1) % 3;
            let a = axis.of(self.vertices[i]);
            let b = axis.of(self.vertices[j]);
            if (a - coord).abs() <= reach {
                t = t.min(self.thickness[i]);
            }
            for plane in planes {
                if (a - plane) * (b - plane) < 0.0 {
                    let h = (plane - a) / (b - a);
                    t = t.min(self.thickness[i] + (self.thickness[j] - self.thickness[i]) * h);
                }
            }
        }
        if t.is_finite() {
            t
        } else {
            self.thickness[0].min(self.thickness[1]).min(self.thickness[2])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> AreaTriangle {
        AreaTriangle::new(
            [
                DVec3::ZERO,
                DVec3::new(10.0, 0.0, 0.0),
                DVec3::new(0.0, 10.0, 0.0),
            ],
            [2.0, 2.0, 4.0],
            [1.0, 1.0, 2.0],
        )
    }

    #[test]
    fn test_triangle_contains() {
        let t = sheet();
        assert!(t.contains(DVec3::new(2.0, 2.0, 1.5)));
        assert!(!t.contains(DVec3::new(2.0, 2.0, 5.0)));
    }

    #[test]
    fn test_triangle_slab_thickness() {
        let t = sheet();
        // Slab far from the thin edge only sees the thick corner region
        let far = t.slab_thickness(Axis::Y, 10.0);
        assert!(far > 1.0 && far <= 2.0, "got {}", far);
        assert!((t.slab_thickness(Axis::Y, 0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_triangle_local_thickness() {
        let t = sheet();
        let s = EvalSphere::new(DVec3::new(0.0, 10.0, 0.5), 0.1);
        assert!((t.local_thickness(&s) - 2.0).abs() < 1e-12);
        let s = EvalSphere::new(DVec3::new(1.0, 1.0, 0.5), 0.1);
        assert!((t.local_thickness(&s) - 1.0).abs() < 1e-12);
    }
}
