//! Parallel batch evaluation
//!
//! A prepared [`Blobtree`] is read-only during evaluation, so a shared
//! reference fans out over rayon workers without locking. Grids are split
//! by Z-slices; each worker walks its slice with nested loops.

use crate::error::Result;
use crate::tree::Blobtree;
use crate::types::FieldSample;
use glam::DVec3;
use rayon::prelude::*;

/// Root values at many points (single-threaded)
pub fn eval_batch(tree: &Blobtree, points: &[DVec3]) -> Result<Vec<f64>> {
    points.iter().map(|&p| tree.value_at(p)).collect()
}

/// Root values at many points (parallel)
pub fn eval_batch_parallel(tree: &Blobtree, points: &[DVec3]) -> Result<Vec<f64>> {
    points.par_iter().map(|&p| tree.value_at(p)).collect()
}

/// Full samples (value, gradient, material) at many points (parallel)
pub fn sample_batch_parallel(tree: &Blobtree, points: &[DVec3]) -> Result<Vec<FieldSample>> {
    points.par_iter().map(|&p| tree.sample_at(p)).collect()
}

/// Root values on a regular grid
///
/// `resolution` samples per axis including both corners; the result is
/// flattened X-major: `x + y*res + z*res*res`.
pub fn eval_grid(tree: &Blobtree, min: DVec3, max: DVec3, resolution: usize) -> Result<Vec<f64>> {
    let root = tree.root();
    tree.field_of(root)?;

    let res = resolution.max(2);
    let step = (max - min) / (res as f64 - 1.0);
    let slice_size = res * res;
    let mut buffer = vec![0.0f64; slice_size * res];

    buffer
        .par_chunks_mut(slice_size)
        .enumerate()
        .try_for_each(|(z, slice)| -> Result<()> {
            let z_pos = min.z + z as f64 * step.z;
            let mut sample = FieldSample::value_only();
            for y in 0..res {
                let y_pos = min.y + y as f64 * step.y;
                let row = &mut slice[y * res..(y + 1) * res];
                for (x, value) in row.iter_mut().enumerate() {
                    let p = DVec3::new(min.x + x as f64 * step.x, y_pos, z_pos);
                    tree.eval(root, p, &mut sample)?;
                    *value = sample.value;
                }
            }
            Ok(())
        })?;

    Ok(buffer)
}

/// Flattened index of grid coordinates
#[inline(always)]
pub fn grid_index(x: usize, y: usize, z: usize, resolution: usize) -> usize {
    x + y * resolution + z * resolution * resolution
}

/// Grid coordinates of a flattened index
#[inline(always)]
pub fn grid_coords(index: usize, resolution: usize) -> (usize, usize, usize) {
    let x = index % resolution;
    let y = (index / resolution) % resolution;
    let z = index / (resolution * resolution);
    (x, y, z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::types::ThickVertex;

    fn point_tree() -> Blobtree {
        let mut tree = Blobtree::new();
        let root = tree.root();
        let p = tree.create_point(ThickVertex::new(DVec3::ZERO, 1.0), Material::default());
        tree.add_child(root, p).unwrap();
        tree.prepare_for_eval();
        tree
    }

    #[test]
    fn test_batch_matches_parallel() {
        let tree = point_tree();
        let points: Vec<DVec3> = (0..500)
            .map(|i| DVec3::new(i as f64 * 0.005, 0.1, -0.2))
            .collect();
        let a = eval_batch(&tree, &points).unwrap();
        let b = eval_batch_parallel(&tree, &points).unwrap();
        assert_eq!(a, b);
        assert!(a[0] > 1.0);
    }

    #[test]
    fn test_mutated_tree_evaluates_without_prepare() {
        let mut tree = point_tree();
        let before = eval_batch(&tree, &[DVec3::new(1.0, 0.0, 0.0)]).unwrap();
        let q = tree.create_point(ThickVertex::new(DVec3::X, 1.0), Material::default());
        let root = tree.root();
        tree.add_child(root, q).unwrap();
        let after = eval_batch_parallel(&tree, &[DVec3::new(1.0, 0.0, 0.0)]).unwrap();
        assert!(after[0] > before[0]);
        assert!(eval_grid(&tree, DVec3::splat(-1.0), DVec3::ONE, 4).is_ok());
    }

    #[test]
    fn test_eval_grid_center_inside() {
        let tree = point_tree();
        let res = 9;
        let grid = eval_grid(&tree, DVec3::splat(-2.0), DVec3::splat(2.0), res).unwrap();
        assert_eq!(grid.len(), res * res * res);
        let center = grid[grid_index(4, 4, 4, res)];
        assert!(center > 1.0);
        assert_eq!(grid[grid_index(0, 0, 0, res)], 0.0);
    }

    #[test]
    fn test_grid_indexing() {
        let res = 7;
        for i in 0..res * res * res {
            let (x, y, z) = grid_coords(i, res);
            assert_eq!(grid_index(x, y, z, res), i);
        }
    }
}
