//! Axis-aligned bounding boxes

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box
///
/// The empty box has `min = +inf` and `max = -inf` so that it is the identity
/// of [`Aabb::union`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: DVec3,
    /// Maximum corner
    pub max: DVec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Aabb::EMPTY
    }
}

impl Aabb {
    /// Box containing nothing
    pub const EMPTY: Aabb = Aabb {
        min: DVec3::splat(f64::INFINITY),
        max: DVec3::splat(f64::NEG_INFINITY),
    };

    /// Create a new AABB
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Aabb { min, max }
    }

    /// Create from center and half-extents
    pub fn from_center_extents(center: DVec3, half_extents: DVec3) -> Self {
        Aabb {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Box of a sphere
    pub fn from_sphere(center: DVec3, radius: f64) -> Self {
        Aabb::from_center_extents(center, DVec3::splat(radius))
    }

    /// True when the box contains no point
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Get center point
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Get size
    pub fn size(&self) -> DVec3 {
        if self.is_empty() {
            DVec3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Get half-extents
    pub fn half_extents(&self) -> DVec3 {
        self.size() * 0.5
    }

    /// Check if point is inside (boundary included)
    #[inline(always)]
    pub fn contains(&self, point: DVec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// True when the two boxes share at least one point
    #[inline(always)]
    pub fn intersects(&self, other: &Aabb) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Expand to include another AABB
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Region shared by both boxes (possibly empty)
    pub fn intersection(&self, other: &Aabb) -> Aabb {
        let out = Aabb {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        };
        if out.is_empty() {
            Aabb::EMPTY
        } else {
            out
        }
    }

    /// Expand to include a point
    pub fn include_point(&self, point: DVec3) -> Aabb {
        Aabb {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    /// Grow every face outward by `margin`
    pub fn expanded(&self, margin: f64) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        Aabb {
            min: self.min - DVec3::splat(margin),
            max: self.max + DVec3::splat(margin),
        }
    }

    /// Euclidean distance from a point to the box (0 inside)
    pub fn distance_to(&self, point: DVec3) -> f64 {
        if self.is_empty() {
            return f64::INFINITY;
        }
        let d = (self.min - point).max(point - self.max).max(DVec3::ZERO);
        d.length()
    }
}
