//! Closest-point queries on segments and triangles
//!
//! Shared by the primitives (distance-model evaluation, materials) and the
//! area oracles (local thickness lookups).

use glam::DVec3;

/// Parameter in `[0, 1]` of the point of `[a, b]` closest to `p`
#[inline(always)]
pub fn segment_parameter(p: DVec3, a: DVec3, b: DVec3) -> f64 {
    let ba = b - a;
    let len2 = ba.length_squared();
    if len2 <= f64::EPSILON {
        return 0.0;
    }
    ((p - a).dot(ba) / len2).clamp(0.0, 1.0)
}

/// Distance from `p` to the segment `[a, b]`
#[inline(always)]
pub fn segment_distance(p: DVec3, a: DVec3, b: DVec3) -> f64 {
    let h = segment_parameter(p, a, b);
    (p - a - (b - a) * h).length()
}

/// Closest point of triangle `(a, b, c)` to `p`, with its barycentric weights
///
/// Walks the Voronoi regions of the vertices and edges before falling back to
/// the face projection. Degenerate triangles resolve to an edge or vertex.
pub fn closest_point_on_triangle(p: DVec3, a: DVec3, b: DVec3, c: DVec3) -> (DVec3, DVec3) {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return (a, DVec3::X);
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return (b, DVec3::Y);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return (a + ab * v, DVec3::new(1.0 - v, v, 0.0));
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return (c, DVec3::Z);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return (a + ac * w, DVec3::new(1.0 - w, 0.0, w));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (b + (c - b) * w, DVec3::new(0.0, 1.0 - w, w));
    }

    let denom = va + vb + vc;
    if denom.abs() <= f64::EPSILON {
        // Collinear vertices: best of the three edges
        let candidates = [
            (segment_parameter(p, a, b), a, b, 0usize, 1usize),
            (segment_parameter(p, b, c), b, c, 1, 2),
            (segment_parameter(p, c, a), c, a, 2, 0),
        ];
        let mut best = (a, DVec3::X);
        let mut best_d2 = f64::INFINITY;
        for (h, s, e, i, j) in candidates {
            let q = s + (e - s) * h;
            let d2 = q.distance_squared(p);
            if d2 < best_d2 {
                let mut bary = [0.0; 3];
                bary[i] = 1.0 - h;
                bary[j] = h;
                best = (q, DVec3::from_array(bary));
                best_d2 = d2;
            }
        }
        return best;
    }
    let v = vb / denom;
    let w = vc / denom;
    (a + ab * v + ac * w, DVec3::new(1.0 - v - w, v, w))
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: DVec3 = DVec3::new(0.0, 0.0, 0.0);
    const B: DVec3 = DVec3::new(2.0, 0.0, 0.0);
    const C: DVec3 = DVec3::new(0.0, 2.0, 0.0);

    #[test]
    fn test_closest_point_inside_face() {
        let (q, bary) = closest_point_on_triangle(DVec3::new(0.5, 0.5, 3.0), A, B, C);
        assert!((q - DVec3::new(0.5, 0.5, 0.0)).length() < 1e-12);
        assert!((bary.x + bary.y + bary.z - 1.0).abs() < 1e-12);
        assert!((bary - DVec3::new(0.5, 0.25, 0.25)).length() < 1e-12);
    }

    #[test]
    fn test_closest_point_vertex_region() {
        let (q, bary) = closest_point_on_triangle(DVec3::new(-1.0, -1.0, 0.0), A, B, C);
        assert_eq!(q, A);
        assert_eq!(bary, DVec3::X);
    }

    #[test]
    fn test_closest_point_edge_region() {
        let (q, bary) = closest_point_on_triangle(DVec3::new(1.0, -1.0, 0.5), A, B, C);
        assert!((q - DVec3::new(1.0, 0.0, 0.0)).length() < 1e-12);
        assert!((bary - DVec3::new(0.5, 0.5, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_segment_distance() {
        assert!((segment_distance(DVec3::new(1.0, 1.0, 0.0), A, B) - 1.0).abs() < 1e-12);
        assert!((segment_distance(DVec3::new(3.0, 0.0, 0.0), A, B) - 1.0).abs() < 1e-12);
        assert_eq!(segment_parameter(DVec3::ONE, A, A), 0.0);
    }
}
