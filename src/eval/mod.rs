//! Batch and grid evaluation of a prepared blobtree
//!
//! The tree itself evaluates one point at a time through
//! [`Blobtree::eval`](crate::tree::Blobtree::eval). This module layers the
//! bulk helpers on top: sequential and rayon-parallel batches, Z-slice
//! parallel grids, and a finite-difference gradient used to check the
//! analytic ones.

pub mod gradient;
pub mod parallel;

pub use gradient::{numerical_gradient, surface_normal};
pub use parallel::{
    eval_batch, eval_batch_parallel, eval_grid, grid_coords, grid_index, sample_batch_parallel,
};
