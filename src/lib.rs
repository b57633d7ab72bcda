//! # blobtree
//!
//! Implicit surfaces built from skeletal primitives, blended through a tree
//! of operators, and polygonized by an adaptive sliding marching cubes.
//!
//! ## Features
//!
//! - **Primitives**: weighted points, segments and triangles (SCALIS), in
//!   distance or convolution models, plus SDF spheres and capsules
//! - **Operators**: Ricci power blend, Min, Max, clamped Difference,
//!   compact-support SDF root
//! - **Evaluation**: value, gradient, blended material and safe step in one
//!   pass, with cached bounding boxes and upward invalidation
//! - **Accuracy oracle**: per-primitive areas telling how fine the field must
//!   be sampled around any point
//! - **Polygonization**: sliding two-slice marching cubes with recursive 2D
//!   subdivision, Newton vertex refinement and per-slice tree trimming
//! - **Output**: indexed meshes with normals and materials, OBJ export
//!
//! ## Example
//!
//! ```rust
//! use blobtree::prelude::*;
//! use glam::DVec3;
//!
//! let mut tree = Blobtree::new();
//! let root = tree.root();
//! let limb = tree.create_segment(
//!     [
//!         ThickVertex::new(DVec3::ZERO, 0.5),
//!         ThickVertex::new(DVec3::new(2.0, 0.0, 0.0), 0.3),
//!     ],
//!     [Material::default(); 2],
//!     FieldModel::Convolution,
//! );
//! tree.add_child(root, limb).unwrap();
//!
//! tree.prepare_for_eval();
//! let value = tree.value_at(DVec3::new(1.0, 0.0, 0.0)).unwrap();
//! assert!(value > tree.iso_value());
//!
//! let mesh = polygonize(&mut tree, &PolygonizerConfig::default()).unwrap();
//! assert!(mesh.triangle_count() > 0);
//! ```

#![warn(missing_docs)]

pub mod accuracy;
pub mod area;
pub mod convergence;
pub mod error;
pub mod eval;
pub mod geometry;
pub mod kernel;
pub mod material;
pub mod mesh;
pub mod operations;
pub mod polygonizer;
pub mod primitives;
pub mod tree;
pub mod types;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude - commonly used types and functions
pub mod prelude {
    pub use crate::accuracy::AccuracyPolicy;
    pub use crate::area::{Area, AreaShape};
    pub use crate::convergence::{
        dichotomy_1d, safe_newton_1d, safe_newton_3d, Convergence, Degeneracy, Outcome,
        ScalarField,
    };
    pub use crate::error::{BlobtreeError, Result};
    pub use crate::eval::{eval_batch, eval_batch_parallel, eval_grid, numerical_gradient};
    pub use crate::material::Material;
    pub use crate::mesh::{export_obj, merge_meshes, Mesh, MeshVertex, ObjConfig};
    pub use crate::polygonizer::{
        polygonize, polygonize_with_progress, ConvergenceConfig, PolygonizerConfig,
        PolygonizerStats, SlidingMarchingCubes, ZStepping,
    };
    pub use crate::primitives::{FieldModel, ScalisPrimitive, SdfPrimitive};
    pub use crate::tree::{Blobtree, NodeOp, PreparedField};
    pub use crate::types::{Aabb, Axis, ElementId, EvalSphere, FieldSample, ThickVertex};
}

// Re-exports for convenience
pub use error::{BlobtreeError, Result};
pub use polygonizer::polygonize;
pub use tree::Blobtree;
