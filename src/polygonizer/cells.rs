//! Cell classification, vertex placement and face emission for one layer
//!
//! A layer is the row of cells between the back and front slices. Every cell
//! whose corners straddle the iso-value gets one vertex: the mean of its edge
//! crossings, refined by Newton iteration and shaded by one full evaluation.
//! Each grid edge with a sign change produces a quad joining the four cells
//! around it, wound so that the face looks from inside to outside.

use super::subdivide::SliceBuffer;
use super::{ConvergenceConfig, PolygonizerStats};
use crate::convergence::{safe_newton_3d, Outcome, ScalarField};
use crate::eval::surface_normal;
use crate::mesh::{Mesh, MeshVertex};
use crate::types::FieldSample;
use glam::DVec3;
use log::trace;

// Corner offsets for the 8 corners of a cell (x, y, slice)
const CORNER_OFFSETS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [0, 1, 1],
];

// Edge connections (which corners each edge connects)
const EDGE_CONNECTIONS: [[usize; 2]; 12] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [4, 5],
    [5, 6],
    [6, 7],
    [7, 4],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// Geometry of the layer being polygonized
#[derive(Debug, Clone, Copy)]
pub(crate) struct Layer {
    /// World X/Y of grid point `(0, 0)`
    pub(crate) origin: DVec3,
    pub(crate) step_x: f64,
    pub(crate) step_y: f64,
    pub(crate) z_back: f64,
    pub(crate) z_front: f64,
    /// Cells along X
    pub(crate) cells_x: usize,
    /// Cells along Y
    pub(crate) cells_y: usize,
}

impl Layer {
    #[inline(always)]
    fn corner(&self, i: usize, j: usize, c: usize) -> DVec3 {
        let [ox, oy, oz] = CORNER_OFFSETS[c];
        DVec3::new(
            self.origin.x + (i + ox) as f64 * self.step_x,
            self.origin.y + (j + oy) as f64 * self.step_y,
            if oz == 0 { self.z_back } else { self.z_front },
        )
    }

    #[inline(always)]
    fn cell_index(&self, i: usize, j: usize) -> usize {
        j * self.cells_x + i
    }

    fn diagonal(&self) -> f64 {
        DVec3::new(self.step_x, self.step_y, self.z_front - self.z_back).length()
    }

    fn min_step(&self) -> f64 {
        self.step_x.min(self.step_y).min(self.z_front - self.z_back)
    }
}

/// Polygonizes one layer, appending to a mesh
pub(crate) struct LayerMesher<'a, F: ScalarField + ?Sized> {
    pub(crate) field: &'a mut F,
    pub(crate) iso: f64,
    pub(crate) convergence: Option<ConvergenceConfig>,
    pub(crate) stats: &'a mut PolygonizerStats,
}

impl<F: ScalarField + ?Sized> LayerMesher<'_, F> {
    /// Emit the vertices of `layer` into `front_verts` and the faces around
    /// the Z-edges of the layer and the X/Y-edges of its back slice
    pub(crate) fn run(
        &mut self,
        layer: &Layer,
        back: &SliceBuffer,
        front: &SliceBuffer,
        back_verts: &[Option<u32>],
        front_verts: &mut [Option<u32>],
        mesh: &mut Mesh,
    ) {
        let mut values = [0.0f64; 8];
        for j in 0..layer.cells_y {
            for i in 0..layer.cells_x {
                let mut mask = 0u8;
                for (c, [ox, oy, oz]) in CORNER_OFFSETS.iter().copied().enumerate() {
                    let slice = if oz == 0 { back } else { front };
                    values[c] = slice.get(i + ox, j + oy);
                    if values[c] > self.iso {
                        mask |= 1 << c;
                    }
                }
                if mask == 0 || mask == 0xFF {
                    continue;
                }

                let vertex = self.place_vertex(layer, i, j, &values);
                front_verts[layer.cell_index(i, j)] = Some(mesh.push_vertex(vertex));
                self.emit_faces(layer, i, j, mask, back_verts, front_verts, mesh);
            }
        }
    }

    fn place_vertex(&mut self, layer: &Layer, i: usize, j: usize, values: &[f64; 8]) -> MeshVertex {
        let mut sum = DVec3::ZERO;
        let mut crossings = 0;
        for [a, b] in EDGE_CONNECTIONS {
            let (va, vb) = (values[a], values[b]);
            if (va > self.iso) != (vb > self.iso) {
                let t = (self.iso - va) / (vb - va);
                sum += layer.corner(i, j, a).lerp(layer.corner(i, j, b), t);
                crossings += 1;
            }
        }
        let start = sum / crossings.max(1) as f64;

        let point = match self.convergence {
            Some(cfg) => {
                let eps = cfg.ratio * layer.min_step();
                let result = safe_newton_3d(
                    &mut *self.field,
                    start,
                    self.iso,
                    eps,
                    cfg.max_steps,
                    layer.diagonal(),
                );
                match result.outcome {
                    Outcome::Converged => self.stats.refined += 1,
                    Outcome::MaxSteps => {}
                    Outcome::Degenerate(kind) => {
                        self.stats.refinement_aborts += 1;
                        trace!("refinement of cell ({}, {}) aborted: {:?}", i, j, kind);
                    }
                }
                result.point
            }
            None => start,
        };

        let mut sample = FieldSample::full();
        self.field.sample(point, &mut sample);
        self.stats.evaluations += 1;
        let mut normal = surface_normal(sample.gradient.unwrap_or(DVec3::ZERO));
        if normal == DVec3::ZERO {
            normal = surface_normal(corner_gradient(layer, values));
        }
        MeshVertex::new(point, normal, &sample.material.unwrap_or_default())
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_faces(
        &mut self,
        layer: &Layer,
        i: usize,
        j: usize,
        mask: u8,
        back_verts: &[Option<u32>],
        front_verts: &[Option<u32>],
        mesh: &mut Mesh,
    ) {
        let inside = |c: usize| mask & (1 << c) != 0;
        let at = |verts: &[Option<u32>], i: usize, j: usize| verts[layer.cell_index(i, j)];

        // Z-edge at the cell's low XY corner
        if i > 0 && j > 0 && inside(0) != inside(4) {
            self.quad(
                mesh,
                [
                    at(front_verts, i - 1, j - 1),
                    at(front_verts, i, j - 1),
                    at(front_verts, i, j),
                    at(front_verts, i - 1, j),
                ],
                inside(0),
            );
        }
        // Y-edge of the back slice
        if i > 0 && inside(0) != inside(3) {
            self.quad(
                mesh,
                [
                    at(back_verts, i - 1, j),
                    at(front_verts, i - 1, j),
                    at(front_verts, i, j),
                    at(back_verts, i, j),
                ],
                inside(0),
            );
        }
        // X-edge of the back slice
        if j > 0 && inside(0) != inside(1) {
            self.quad(
                mesh,
                [
                    at(back_verts, i, j - 1),
                    at(back_verts, i, j),
                    at(front_verts, i, j),
                    at(front_verts, i, j - 1),
                ],
                inside(0),
            );
        }
    }

    /// Two triangles; `forward` keeps the given order, otherwise reversed
    fn quad(&mut self, mesh: &mut Mesh, verts: [Option<u32>; 4], forward: bool) {
        let [Some(a), Some(b), Some(c), Some(d)] = verts else {
            self.stats.dropped_faces += 1;
            return;
        };
        if forward {
            mesh.push_triangle(a, b, c);
            mesh.push_triangle(a, c, d);
        } else {
            mesh.push_triangle(a, d, c);
            mesh.push_triangle(a, c, b);
        }
    }
}

/// Gradient estimated from the eight corner values
fn corner_gradient(layer: &Layer, v: &[f64; 8]) -> DVec3 {
    let dz = (layer.z_front - layer.z_back).max(f64::MIN_POSITIVE);
    DVec3::new(
        ((v[1] - v[0]) + (v[2] - v[3]) + (v[5] - v[4]) + (v[6] - v[7])) / (4.0 * layer.step_x),
        ((v[3] - v[0]) + (v[2] - v[1]) + (v[7] - v[4]) + (v[6] - v[5])) / (4.0 * layer.step_y),
        ((v[4] - v[0]) + (v[5] - v[1]) + (v[6] - v[2]) + (v[7] - v[3])) / (4.0 * dz),
    )
}
