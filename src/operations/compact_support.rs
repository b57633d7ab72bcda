//! Compact support functor for SDF subtrees
//!
//! Maps a signed distance `d` to `1 - smoothstep` over `[-support, support]`:
//! 1 deep inside, 0.5 on the surface, 0 beyond `support` outside.

use serde::{Deserialize, Serialize};

/// Cubic falloff of half-width `support`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompactSupport {
    /// Half-width of the transition band
    pub support: f64,
}

impl Default for CompactSupport {
    fn default() -> Self {
        CompactSupport { support: 1.0 }
    }
}

impl CompactSupport {
    /// Create a functor
    pub fn new(support: f64) -> Self {
        CompactSupport { support }
    }

    /// Field value of a distance
    #[inline(always)]
    pub fn value(&self, d: f64) -> f64 {
        let x = (d / self.support).clamp(-1.0, 1.0);
        0.5 - 0.75 * x + 0.25 * x * x * x
    }

    /// `d value / d d`
    #[inline(always)]
    pub fn derivative(&self, d: f64) -> f64 {
        let x = d / self.support;
        if x.abs() >= 1.0 {
            0.0
        } else {
            0.75 * (x * x - 1.0) / self.support
        }
    }

    /// Distance beyond which the value is neutral
    #[inline(always)]
    pub fn outer_distance(&self) -> f64 {
        self.support
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_support_profile() {
        let f = CompactSupport::new(2.0);
        assert_eq!(f.value(-5.0), 1.0);
        assert!((f.value(0.0) - 0.5).abs() < 1e-12);
        assert_eq!(f.value(2.0), 0.0);
        assert_eq!(f.value(10.0), 0.0);
        assert!(f.derivative(0.0) < 0.0);
        assert_eq!(f.derivative(3.0), 0.0);
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let f = CompactSupport::new(0.5);
        let d = 0.2;
        let h = 1e-7;
        let fd = (f.value(d + h) - f.value(d - h)) / (2.0 * h);
        assert!((f.derivative(d) - fd).abs() < 1e-6);
    }
}
