//! Sampling accuracy policy
//!
//! Every area oracle scales its geometric accuracy (a length derived from the
//! local thickness) by one of three factors:
//! - `nice`: accuracy under which a straddling region may be interpolated
//! - `raw`: accuracy under which an iso-uniform region may be interpolated
//! - `current`: accuracy used to size the polygonizer grid

use serde::{Deserialize, Serialize};

/// Factors applied to every primitive's required sampling accuracy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyPolicy {
    /// Fine factor used close to the surface
    pub nice: f64,
    /// Coarse factor used away from the surface
    pub raw: f64,
    /// Factor used for grid sizing
    pub current: f64,
}

impl Default for AccuracyPolicy {
    fn default() -> Self {
        AccuracyPolicy {
            nice: 0.3,
            raw: 1.0,
            current: 0.3,
        }
    }
}

impl AccuracyPolicy {
    /// Policy with every factor multiplied by `ratio`
    pub fn scaled(&self, ratio: f64) -> Self {
        AccuracyPolicy {
            nice: self.nice * ratio,
            raw: self.raw * ratio,
            current: self.current * ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled() {
        let p = AccuracyPolicy::default().scaled(0.5);
        assert!((p.nice - 0.15).abs() < 1e-12);
        assert!((p.raw - 0.5).abs() < 1e-12);
        assert!((p.current - 0.15).abs() < 1e-12);
    }
}
