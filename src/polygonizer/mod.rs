//! Adaptive Sliding Marching Cubes
//!
//! Sweeps a regular XY grid along Z, keeping only two slices of field values
//! and two layers of vertex indices alive, so memory stays proportional to
//! one slice. The grid spacing comes from the finest accuracy any primitive
//! area asks for; inside each slice a recursive subdivision decides which
//! grid points are evaluated exactly, interpolated, or known to be neutral.
//!
//! Per slice the tree is trimmed to a slab around the slice, so elements
//! that cannot contribute are skipped entirely, and untrimmed afterwards.
//!
//! # Example
//!
//! ```rust
//! use blobtree::prelude::*;
//! use glam::DVec3;
//!
//! let mut tree = Blobtree::with_iso_value(0.5);
//! let root = tree.root();
//! let p = tree.create_point(ThickVertex::new(DVec3::ZERO, 1.0), Material::default());
//! tree.add_child(root, p).unwrap();
//!
//! let mesh = polygonize(&mut tree, &PolygonizerConfig::default()).unwrap();
//! assert!(mesh.is_closed());
//! ```

mod cells;
mod split;
mod subdivide;

pub use split::collect_shells;

use crate::accuracy::AccuracyPolicy;
use crate::area::Area;
use crate::error::{BlobtreeError, Result};
use crate::mesh::{merge_meshes, Mesh};
use crate::tree::Blobtree;
use crate::types::{Aabb, Axis, ElementId};
use cells::{Layer, LayerMesher};
use glam::DVec3;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use subdivide::{AccuracyRect, SliceBuffer, SlicePlane, SliceSampler};

/// Smallest accepted detail ratio
pub const MIN_DETAIL_RATIO: f64 = 0.01;

/// How slices are spaced along Z
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZStepping {
    /// Same spacing as X and Y
    #[default]
    Uniform,
    /// Each step sized by the areas crossing the current slice
    Adaptive,
}

/// Newton refinement of vertex positions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    /// Tolerance as a fraction of the smallest cell side
    pub ratio: f64,
    /// Newton step budget per vertex
    pub max_steps: usize,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        ConvergenceConfig {
            ratio: 0.01,
            max_steps: 10,
        }
    }
}

/// Polygonizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolygonizerConfig {
    /// Global accuracy scale; below 1 is finer (clamped to [`MIN_DETAIL_RATIO`])
    pub detail_ratio: f64,
    /// Slice spacing mode
    pub z_stepping: ZStepping,
    /// Vertex refinement, `None` keeps the interpolated positions
    pub convergence: Option<ConvergenceConfig>,
    /// Polygonize each shell under Max nodes and Ricci nodes of at least
    /// this power separately
    pub ricci_threshold: Option<f64>,
    /// Accuracy factors handed to every area
    pub accuracy: AccuracyPolicy,
    /// Cap on the number of cells along each axis
    pub max_resolution: usize,
}

impl Default for PolygonizerConfig {
    fn default() -> Self {
        PolygonizerConfig {
            detail_ratio: 1.0,
            z_stepping: ZStepping::Uniform,
            convergence: Some(ConvergenceConfig::default()),
            ricci_threshold: None,
            accuracy: AccuracyPolicy::default(),
            max_resolution: 1024,
        }
    }
}

impl PolygonizerConfig {
    /// Parse from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Set the detail ratio
    pub fn with_detail_ratio(mut self, detail_ratio: f64) -> Self {
        self.detail_ratio = detail_ratio;
        self
    }

    /// Set the Z stepping mode
    pub fn with_z_stepping(mut self, z_stepping: ZStepping) -> Self {
        self.z_stepping = z_stepping;
        self
    }

    /// Set or disable vertex refinement
    pub fn with_convergence(mut self, convergence: Option<ConvergenceConfig>) -> Self {
        self.convergence = convergence;
        self
    }

    /// Enable split polygonization
    pub fn with_ricci_threshold(mut self, threshold: f64) -> Self {
        self.ricci_threshold = Some(threshold);
        self
    }

    /// Set the accuracy factors
    pub fn with_accuracy(mut self, accuracy: AccuracyPolicy) -> Self {
        self.accuracy = accuracy;
        self
    }

    /// Set the per-axis cell cap
    pub fn with_max_resolution(mut self, max_resolution: usize) -> Self {
        self.max_resolution = max_resolution;
        self
    }

    /// Detail ratio after clamping
    pub fn effective_detail_ratio(&self) -> f64 {
        if self.detail_ratio < MIN_DETAIL_RATIO {
            warn!(
                "detail ratio {} below minimum, using {}",
                self.detail_ratio, MIN_DETAIL_RATIO
            );
            MIN_DETAIL_RATIO
        } else {
            self.detail_ratio
        }
    }

    /// Reject settings the sweep cannot honor
    pub fn validate(&self) -> Result<()> {
        if !self.detail_ratio.is_finite() {
            return Err(BlobtreeError::Config(format!(
                "detail ratio must be finite, got {}",
                self.detail_ratio
            )));
        }
        if self.max_resolution == 0 {
            return Err(BlobtreeError::Config("max resolution must be at least 1".into()));
        }
        let a = &self.accuracy;
        if ![a.nice, a.raw, a.current].iter().all(|f| f.is_finite() && *f > 0.0) {
            return Err(BlobtreeError::Config(format!(
                "accuracy factors must be positive, got {:?}",
                a
            )));
        }
        if let Some(c) = &self.convergence {
            if !(c.ratio.is_finite() && c.ratio > 0.0) {
                return Err(BlobtreeError::Config(format!(
                    "convergence ratio must be positive, got {}",
                    c.ratio
                )));
            }
        }
        Ok(())
    }
}

/// Counters of one polygonization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolygonizerStats {
    /// Slices swept
    pub slices: usize,
    /// Exact field evaluations (slice samples and vertex shading)
    pub evaluations: usize,
    /// Grid points filled by bilinear interpolation
    pub interpolated: usize,
    /// Grid points filled with the neutral value
    pub neutral: usize,
    /// Vertices whose refinement converged
    pub refined: usize,
    /// Vertices whose refinement aborted on a degeneracy
    pub refinement_aborts: usize,
    /// Faces skipped because a neighbor cell had no vertex
    pub dropped_faces: usize,
    /// Elements detached by slab trims, summed over slices
    pub trimmed: usize,
}

/// Progress reporting that never goes backwards
struct Progress<'p> {
    callback: Option<Box<dyn FnMut(f64) + 'p>>,
    last: f64,
}

impl Progress<'_> {
    fn report(&mut self, percent: f64) {
        let percent = percent.clamp(self.last, 100.0);
        if let Some(cb) = self.callback.as_mut() {
            cb(percent);
        }
        self.last = percent;
    }

    fn finish(&mut self) {
        if self.last < 100.0 {
            self.report(100.0);
        }
    }
}

/// Regular XY grid and Z extent of one sweep
#[derive(Debug, Clone, Copy)]
struct Grid {
    bounds: Aabb,
    cells_x: usize,
    cells_y: usize,
    step: DVec3,
    /// Uniform slice count
    cells_z: usize,
}

impl Grid {
    fn plane(&self, z: f64) -> SlicePlane {
        SlicePlane {
            origin: DVec3::new(self.bounds.min.x, self.bounds.min.y, z),
            step_x: self.step.x,
            step_y: self.step.y,
        }
    }
}

/// Polygonizer bound to one tree
pub struct SlidingMarchingCubes<'t> {
    tree: &'t mut Blobtree,
    config: PolygonizerConfig,
    progress: Progress<'t>,
    stats: PolygonizerStats,
}

impl<'t> SlidingMarchingCubes<'t> {
    /// Polygonizer over `tree`
    pub fn new(tree: &'t mut Blobtree, config: PolygonizerConfig) -> Self {
        SlidingMarchingCubes {
            tree,
            config,
            progress: Progress {
                callback: None,
                last: 0.0,
            },
            stats: PolygonizerStats::default(),
        }
    }

    /// Receive the completion percentage after every slice
    pub fn with_progress(mut self, callback: impl FnMut(f64) + 't) -> Self {
        self.progress.callback = Some(Box::new(callback));
        self
    }

    /// Counters of the last run
    pub fn stats(&self) -> &PolygonizerStats {
        &self.stats
    }

    /// Extract the iso-surface
    ///
    /// The tree is left untrimmed on return.
    pub fn run(&mut self) -> Result<Mesh> {
        self.config.validate()?;
        let iso = self.tree.iso_value();
        if !(iso.is_finite() && iso > 0.0) {
            return Err(BlobtreeError::Config(format!(
                "iso value must be positive, got {}",
                iso
            )));
        }
        self.stats = PolygonizerStats::default();
        self.progress.last = 0.0;

        let mesh = match self.config.ricci_threshold {
            Some(threshold) => {
                let shells = collect_shells(&*self.tree, threshold)?;
                debug!("split polygonization: {} shells", shells.len());
                let n = shells.len().max(1) as f64;
                let mut meshes = Vec::with_capacity(shells.len());
                for (k, &shell) in shells.iter().enumerate() {
                    let range = (100.0 * k as f64 / n, 100.0 * (k + 1) as f64 / n);
                    meshes.push(self.sweep(shell, range)?);
                }
                merge_meshes(meshes)
            }
            None => {
                let root = self.tree.root();
                self.sweep(root, (0.0, 100.0))?
            }
        };
        self.progress.finish();

        debug!(
            "polygonized {} vertices, {} triangles; {:?}",
            mesh.vertex_count(),
            mesh.triangle_count(),
            self.stats
        );
        Ok(mesh)
    }

    fn grid(&self, bounds: Aabb, areas: &[Area]) -> Option<Grid> {
        let accuracy = areas
            .iter()
            .map(Area::min_current_accuracy)
            .filter(|a| a.is_finite() && *a > 0.0)
            .fold(f64::INFINITY, f64::min);
        if !accuracy.is_finite() {
            warn!("no area reports a usable accuracy; nothing to polygonize");
            return None;
        }

        let bounds = bounds.expanded(accuracy);
        let size = bounds.size();
        let max = self.config.max_resolution;
        let cells = |extent: f64| -> usize {
            let n = (extent / accuracy).ceil().max(1.0);
            if n > max as f64 {
                warn!("grid of {} cells capped to {}", n, max);
                max
            } else {
                n as usize
            }
        };
        let (cells_x, cells_y, cells_z) = (cells(size.x), cells(size.y), cells(size.z));
        let step = DVec3::new(
            size.x / cells_x as f64,
            size.y / cells_y as f64,
            size.z / cells_z as f64,
        );
        debug!(
            "grid {}x{}x{} over {:?}..{:?}, step {:?}",
            cells_x, cells_y, cells_z, bounds.min, bounds.max, step
        );
        Some(Grid {
            bounds,
            cells_x,
            cells_y,
            step,
            cells_z,
        })
    }

    /// Next slice position after `z`
    fn next_z(&self, grid: &Grid, areas: &[Area], k: usize, z: f64) -> f64 {
        let end = grid.bounds.max.z;
        match self.config.z_stepping {
            ZStepping::Uniform => {
                if k + 1 >= grid.cells_z {
                    end
                } else {
                    grid.bounds.min.z + (k + 1) as f64 * grid.step.z
                }
            }
            ZStepping::Adaptive => {
                let step = areas
                    .iter()
                    .map(|a| a.axis_projection_min_step(Axis::Z, z))
                    .filter(|s| !s.is_nan())
                    .fold(f64::INFINITY, f64::min)
                    .max(grid.step.z);
                (z + step).min(end)
            }
        }
    }

    /// Polygonize the field of `entry` over its own bounds
    fn sweep(&mut self, entry: ElementId, range: (f64, f64)) -> Result<Mesh> {
        let detail = self.config.effective_detail_ratio();
        let policy = self.config.accuracy.scaled(detail);
        self.tree.prepare_element(entry)?;
        let areas = self.tree.areas_of(entry, policy)?;
        let bounds = self.tree.aabb(entry)?;
        if areas.is_empty() || bounds.is_empty() {
            debug!("element {} has no support; empty mesh", entry);
            return Ok(Mesh::new());
        }
        let Some(grid) = self.grid(bounds, &areas) else {
            return Ok(Mesh::new());
        };

        let iso = self.tree.iso_value();
        let points = (grid.cells_x + 1, grid.cells_y + 1);
        let cells = grid.cells_x * grid.cells_y;
        let mut back = SliceBuffer::new(points.0, points.1);
        let mut front = SliceBuffer::new(points.0, points.1);
        let mut back_verts: Vec<Option<u32>> = vec![None; cells];
        let mut front_verts: Vec<Option<u32>> = vec![None; cells];
        let mut rects: Vec<AccuracyRect> = Vec::new();
        let mut mesh = Mesh::new();

        let z_start = grid.bounds.min.z;
        let z_end = grid.bounds.max.z;
        let mut z_back: Option<f64> = None;
        let mut z = z_start;
        let mut k = 0;

        loop {
            std::mem::swap(&mut back, &mut front);
            std::mem::swap(&mut back_verts, &mut front_verts);
            front.reset();
            front_verts.fill(None);

            // Slab reachable by this slice's samples and Newton iterates
            let margin = DVec3::new(grid.step.x, grid.step.y, z - z_back.unwrap_or(z)).length();
            let slab = Aabb::new(
                DVec3::new(grid.bounds.min.x, grid.bounds.min.y, z_back.unwrap_or(z) - margin),
                DVec3::new(grid.bounds.max.x, grid.bounds.max.y, z + margin),
            );
            let record = self.tree.external_trim(&slab);
            self.stats.trimmed += record.len();

            let pass = self.tree.field_of(entry).map(|mut field| {
                let mut sampler = SliceSampler::new(&mut field, &areas, grid.plane(z), iso);
                sampler.collect_rects(&front, &mut rects);
                sampler.fill(&mut front, &mut rects);
                let counts = sampler.counts;
                trace!(
                    "slice z={:.4}: {} evaluated, {} interpolated, {} neutral, {} trimmed",
                    z,
                    counts.evaluated,
                    counts.interpolated,
                    counts.neutral,
                    record.len()
                );
                self.stats.evaluations += counts.evaluated;
                self.stats.interpolated += counts.interpolated;
                self.stats.neutral += counts.neutral;

                if let Some(zb) = z_back {
                    let layer = Layer {
                        origin: grid.bounds.min,
                        step_x: grid.step.x,
                        step_y: grid.step.y,
                        z_back: zb,
                        z_front: z,
                        cells_x: grid.cells_x,
                        cells_y: grid.cells_y,
                    };
                    let mut mesher = LayerMesher {
                        field: &mut field,
                        iso,
                        convergence: self.config.convergence,
                        stats: &mut self.stats,
                    };
                    mesher.run(&layer, &back, &front, &back_verts, &mut front_verts, &mut mesh);
                }
            });
            self.tree.untrim(&record)?;
            pass?;

            self.stats.slices += 1;
            let t = if z_end > z_start {
                (z - z_start) / (z_end - z_start)
            } else {
                1.0
            };
            self.progress.report(range.0 + (range.1 - range.0) * t);

            if z >= z_end {
                break;
            }
            z_back = Some(z);
            z = self.next_z(&grid, &areas, k, z);
            k += 1;
        }
        Ok(mesh)
    }
}

/// Polygonize the whole tree
pub fn polygonize(tree: &mut Blobtree, config: &PolygonizerConfig) -> Result<Mesh> {
    SlidingMarchingCubes::new(tree, config.clone()).run()
}

/// Polygonize the whole tree, reporting progress percentages
pub fn polygonize_with_progress<'t>(
    tree: &'t mut Blobtree,
    config: &PolygonizerConfig,
    progress: impl FnMut(f64) + 't,
) -> Result<Mesh> {
    SlidingMarchingCubes::new(tree, config.clone())
        .with_progress(progress)
        .run()
}
