//! Common test helpers for blobtree integration tests

#![allow(dead_code)]

use blobtree::prelude::*;
use glam::{DVec3, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ============================================================================
// Standard test trees
// ============================================================================

/// Route `log` output through the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Weighted point under the root
pub fn single_point(iso: f64, thickness: f64) -> (Blobtree, ElementId) {
    let mut tree = Blobtree::with_iso_value(iso);
    let root = tree.root();
    let p = tree.create_point(ThickVertex::new(DVec3::ZERO, thickness), Material::default());
    tree.add_child(root, p).unwrap();
    (tree, p)
}

/// Two points combined by `node`, placed at `±offset` on X
pub fn point_pair(iso: f64, node: NodeOp, offset: f64) -> (Blobtree, ElementId) {
    let mut tree = Blobtree::with_iso_value(iso);
    let root = tree.root();
    let parent = match node {
        NodeOp::Max => tree.create_max(),
        NodeOp::Min => tree.create_min(),
        NodeOp::Ricci { power } => tree.create_ricci(power),
        NodeOp::Difference { alpha } => tree.create_difference(alpha),
        other => panic!("unsupported pair operator {:?}", other),
    };
    for (x, color) in [(-offset, DVec3::X), (offset, DVec3::Y)] {
        let p = tree.create_point(
            ThickVertex::new(DVec3::new(x, 0.0, 0.0), 1.0),
            Material::with_color(color.x, color.y, color.z),
        );
        tree.add_child(parent, p).unwrap();
    }
    tree.add_child(root, parent).unwrap();
    (tree, parent)
}

/// Convolution segment with constant thickness along X
pub fn limb(length: f64, thickness: f64) -> (Blobtree, ElementId) {
    let mut tree = Blobtree::new();
    let root = tree.root();
    let s = tree.create_segment(
        [
            ThickVertex::new(DVec3::ZERO, thickness),
            ThickVertex::new(DVec3::new(length, 0.0, 0.0), thickness),
        ],
        [Material::default(); 2],
        FieldModel::Convolution,
    );
    tree.add_child(root, s).unwrap();
    (tree, s)
}

// ============================================================================
// Sampling
// ============================================================================

/// Seeded random points in `[-extent, extent]^3`
pub fn random_points(count: usize, extent: f64, seed: u64) -> Vec<DVec3> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            DVec3::new(
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
            )
        })
        .collect()
}

// ============================================================================
// Mesh measures
// ============================================================================

/// Signed volume enclosed by a closed mesh (positive for outward winding)
pub fn signed_volume(mesh: &Mesh) -> f64 {
    mesh.indices
        .chunks_exact(3)
        .map(|t| {
            let p = |i: u32| mesh.vertices[i as usize].position.as_dvec3();
            p(t[0]).dot(p(t[1]).cross(p(t[2]))) / 6.0
        })
        .sum()
}

/// Distances of the vertices to `center`
pub fn vertex_distances(mesh: &Mesh, center: Vec3) -> Vec<f64> {
    mesh.vertices
        .iter()
        .map(|v| f64::from(v.position.distance(center)))
        .collect()
}

/// Arithmetic mean
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len().max(1) as f64
}
