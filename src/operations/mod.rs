//! Blend operators
//!
//! The math behind every node kind, as free functions and accumulators so it
//! can be tested without a tree:
//! - `ricci`: power blend (sum for n = 1, max as n grows)
//! - `select`: min / max selection
//! - `difference`: clamped, alpha-weighted subtraction
//! - `compact_support`: distance-to-field functor for SDF subtrees

mod compact_support;
mod difference;
mod ricci;
mod select;

pub use compact_support::CompactSupport;
pub use difference::{difference_gradient, difference_value};
pub use ricci::{ricci_blend, RicciAccumulator, ROOT_RICCI_POWER};
pub use select::Extremum;
