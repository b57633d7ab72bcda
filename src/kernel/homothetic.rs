//! Homothetic clipping of weighted segments
//!
//! A weighted segment `x(s) = a + s u` carries a support radius that varies
//! linearly, `R(s) = r0 + s dr`, for `s` in `[0, 1]`. Seen from a point `p`
//! (with `w = p - a`) the kernel support is non-empty where
//!
//! `R(s)² - |w - s u|² > 0`, i.e. `A s² + B s + C > 0` with
//! `A = dr² - |u|²`, `B = 2 (r0 dr + w·u)`, `C = r0² - |w|²`.
//!
//! Near-zero leading coefficients and non-positive discriminants are handled
//! as "no clipping" or "empty interval" instead of dividing by zero.

use glam::DVec3;

/// Relative threshold under which a coefficient is treated as zero
const DEGENERATE_EPS: f64 = 1e-12;

/// Sub-interval `[s0, s1]` of `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clip {
    /// Start parameter
    pub s0: f64,
    /// End parameter
    pub s1: f64,
}

impl Clip {
    /// The whole segment
    pub const FULL: Clip = Clip { s0: 0.0, s1: 1.0 };

    /// Interval length
    #[inline(always)]
    pub fn length(&self) -> f64 {
        self.s1 - self.s0
    }
}

/// A weighted segment seen from one evaluation point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HomotheticSegment {
    /// `|u|²`
    pub uu: f64,
    /// `w·u`
    pub wu: f64,
    /// `|w|²`
    pub ww: f64,
    /// Support radius at `s = 0`
    pub r0: f64,
    /// Support radius slope along `s`
    pub dr: f64,
}

impl HomotheticSegment {
    /// Build from the evaluation point, segment origin and direction
    #[inline(always)]
    pub fn new(point: DVec3, origin: DVec3, dir: DVec3, r0: f64, dr: f64) -> Self {
        let w = point - origin;
        HomotheticSegment {
            uu: dir.length_squared(),
            wu: w.dot(dir),
            ww: w.length_squared(),
            r0,
            dr,
        }
    }

    /// Squared distance from the point to `x(s)`
    #[inline(always)]
    pub fn squared_distance(&self, s: f64) -> f64 {
        (self.ww - 2.0 * s * self.wu + s * s * self.uu).max(0.0)
    }

    /// Support radius at `s`
    #[inline(always)]
    pub fn support(&self, s: f64) -> f64 {
        self.r0 + s * self.dr
    }

    /// Normalized squared distance `|p - x(s)|² / R(s)²`
    #[inline(always)]
    pub fn normalized_squared_distance(&self, s: f64) -> f64 {
        let r = self.support(s);
        if r <= 0.0 {
            f64::INFINITY
        } else {
            self.squared_distance(s) / (r * r)
        }
    }

    /// Parameter minimizing the normalized distance (homothetic projection)
    ///
    /// The critical point of `|w - s u|² / R(s)²` solves a linear equation;
    /// the result is compared against both endpoints so degenerate
    /// configurations fall back to the better endpoint.
    pub fn projection(&self) -> f64 {
        let denom = self.r0 * self.uu + self.dr * self.wu;
        let mut best = if self.normalized_squared_distance(0.0)
            <= self.normalized_squared_distance(1.0)
        {
            0.0
        } else {
            1.0
        };
        if denom.abs() > DEGENERATE_EPS * (self.r0 * self.uu).abs().max(DEGENERATE_EPS) {
            let s = ((self.dr * self.ww + self.r0 * self.wu) / denom).clamp(0.0, 1.0);
            if self.normalized_squared_distance(s) < self.normalized_squared_distance(best) {
                best = s;
            }
        }
        best
    }

    /// Sub-interval of `[0, 1]` where the support contains the point
    pub fn clip(&self) -> Option<Clip> {
        let a = self.dr * self.dr - self.uu;
        let b = 2.0 * (self.r0 * self.dr + self.wu);
        let c = self.r0 * self.r0 - self.ww;
        let scale = self.uu.max(self.r0 * self.r0).max(DEGENERATE_EPS);

        if a.abs() <= DEGENERATE_EPS * scale {
            // Linear: b s + c > 0
            if b.abs() <= DEGENERATE_EPS * scale {
                return if c > 0.0 { Some(Clip::FULL) } else { None };
            }
            let root = -c / b;
            let clip = if b > 0.0 {
                Clip {
                    s0: root.max(0.0),
                    s1: 1.0,
                }
            } else {
                Clip {
                    s0: 0.0,
                    s1: root.min(1.0),
                }
            };
            return (clip.s1 > clip.s0).then_some(clip);
        }

        let disc = b * b - 4.0 * a * c;
        if a < 0.0 {
            if disc <= 0.0 {
                return None;
            }
            let sq = disc.sqrt();
            // a < 0: roots ordered with the sign flipped
            let r1 = (-b + sq) / (2.0 * a);
            let r2 = (-b - sq) / (2.0 * a);
            let clip = Clip {
                s0: r1.min(r2).max(0.0),
                s1: r1.max(r2).min(1.0),
            };
            (clip.s1 > clip.s0).then_some(clip)
        } else {
            // The support grows faster than the segment: one end sphere
            // swallows the other. Positive outside the roots, keep the hull.
            if disc <= 0.0 {
                return Some(Clip::FULL);
            }
            let sq = disc.sqrt();
            let r1 = (-b - sq) / (2.0 * a);
            let r2 = (-b + sq) / (2.0 * a);
            if r1 <= 0.0 && r2 >= 1.0 {
                None
            } else {
                Some(Clip::FULL)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_uniform_support() {
        // Segment along X from 0 to 4, support radius 1, point above x = 2
        let seg = HomotheticSegment::new(
            DVec3::new(2.0, 0.5, 0.0),
            DVec3::ZERO,
            DVec3::new(4.0, 0.0, 0.0),
            1.0,
            0.0,
        );
        let clip = seg.clip().unwrap();
        // |x - 2| < sqrt(1 - 0.25)
        let half = 0.75f64.sqrt() / 4.0;
        assert!((clip.s0 - (0.5 - half)).abs() < 1e-12);
        assert!((clip.s1 - (0.5 + half)).abs() < 1e-12);
    }

    #[test]
    fn test_clip_out_of_reach() {
        let seg = HomotheticSegment::new(
            DVec3::new(2.0, 3.0, 0.0),
            DVec3::ZERO,
            DVec3::new(4.0, 0.0, 0.0),
            1.0,
            0.0,
        );
        assert!(seg.clip().is_none());
    }

    #[test]
    fn test_clip_degenerate_segment() {
        // Zero-length segment with zero radius slope: a = 0, b = 0
        let seg =
            HomotheticSegment::new(DVec3::new(0.5, 0.0, 0.0), DVec3::ZERO, DVec3::ZERO, 1.0, 0.0);
        assert_eq!(seg.clip(), Some(Clip::FULL));
        let far =
            HomotheticSegment::new(DVec3::new(5.0, 0.0, 0.0), DVec3::ZERO, DVec3::ZERO, 1.0, 0.0);
        assert_eq!(far.clip(), None);
    }

    #[test]
    fn test_projection_uniform_is_orthogonal() {
        let seg = HomotheticSegment::new(
            DVec3::new(1.0, 2.0, 0.0),
            DVec3::ZERO,
            DVec3::new(4.0, 0.0, 0.0),
            1.0,
            0.0,
        );
        assert!((seg.projection() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_projection_favors_thick_end() {
        // Equidistant from both ends; the thicker end wins
        let seg = HomotheticSegment::new(
            DVec3::new(2.0, 1.0, 0.0),
            DVec3::ZERO,
            DVec3::new(4.0, 0.0, 0.0),
            1.0,
            1.0,
        );
        assert!(seg.projection() > 0.5);
    }
}
