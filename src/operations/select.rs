//! Min / Max selection blends
//!
//! The result is the sample of the extremal child. Ties keep the earlier
//! child, so iteration order decides.

use serde::{Deserialize, Serialize};

/// Which extremum a selection node keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Extremum {
    /// Smallest value (intersection)
    Min,
    /// Largest value (union)
    Max,
}

impl Extremum {
    /// Does `candidate` strictly beat `best`
    #[inline(always)]
    pub fn improves(self, candidate: f64, best: f64) -> bool {
        match self {
            Extremum::Min => candidate < best,
            Extremum::Max => candidate > best,
        }
    }

    /// Node kind name
    pub fn name(self) -> &'static str {
        match self {
            Extremum::Min => "min",
            Extremum::Max => "max",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ties_keep_the_earlier_value() {
        assert!(Extremum::Min.improves(0.2, 0.5));
        assert!(!Extremum::Min.improves(0.2, 0.2));
        assert!(Extremum::Max.improves(0.9, 0.5));
        assert!(!Extremum::Max.improves(0.9, 0.9));
        assert!(!Extremum::Max.improves(0.1, 0.5));
    }
}
