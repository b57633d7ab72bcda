//! Recursive 2D accuracy subdivision of one Z-slice
//!
//! The slice rectangle is bisected along its longer side. Each half keeps the
//! accuracy rectangles of the areas overlapping it, and stops recursing as
//! soon as one of these holds:
//! - no area overlaps: the region is filled with the neutral value
//! - the corners agree on the iso side and the region is within raw accuracy
//! - the region is within nice accuracy
//!
//! The last two interpolate bilinearly from the corners. Values written once
//! are never overwritten, so rectangles sharing an edge see the same samples.

use crate::area::Area;
use crate::convergence::ScalarField;
use crate::types::{Aabb, EvalSphere, FieldSample};
use glam::DVec3;

/// Values of one slice of grid points, with a set flag per point
#[derive(Debug, Clone)]
pub(crate) struct SliceBuffer {
    width: usize,
    height: usize,
    values: Vec<f64>,
    set: Vec<bool>,
}

impl SliceBuffer {
    /// Buffer of `width * height` grid points, all unset
    pub(crate) fn new(width: usize, height: usize) -> Self {
        SliceBuffer {
            width,
            height,
            values: vec![0.0; width * height],
            set: vec![false; width * height],
        }
    }

    /// Mark every point unset
    pub(crate) fn reset(&mut self) {
        self.set.fill(false);
    }

    #[inline(always)]
    fn index(&self, i: usize, j: usize) -> usize {
        j * self.width + i
    }

    /// Value at grid point `(i, j)`
    #[inline(always)]
    pub(crate) fn get(&self, i: usize, j: usize) -> f64 {
        self.values[self.index(i, j)]
    }

    #[inline(always)]
    pub(crate) fn is_set(&self, i: usize, j: usize) -> bool {
        self.set[self.index(i, j)]
    }

    #[inline(always)]
    fn put(&mut self, i: usize, j: usize, value: f64) {
        let k = self.index(i, j);
        self.values[k] = value;
        self.set[k] = true;
    }

    /// Whether every point has been written
    #[cfg(test)]
    pub(crate) fn is_complete(&self) -> bool {
        self.set.iter().all(|&s| s)
    }

    pub(crate) fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn height(&self) -> usize {
        self.height
    }
}

/// Inclusive rectangle of grid point indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Rect {
    pub(crate) i0: usize,
    pub(crate) j0: usize,
    pub(crate) i1: usize,
    pub(crate) j1: usize,
}

impl Rect {
    pub(crate) fn new(i0: usize, j0: usize, i1: usize, j1: usize) -> Self {
        Rect { i0, j0, i1, j1 }
    }

    /// Cells along X
    #[inline(always)]
    pub(crate) fn width(&self) -> usize {
        self.i1 - self.i0
    }

    /// Cells along Y
    #[inline(always)]
    pub(crate) fn height(&self) -> usize {
        self.j1 - self.j0
    }

    #[inline(always)]
    pub(crate) fn intersects(&self, other: &Rect) -> bool {
        self.i0 <= other.i1 && other.i0 <= self.i1 && self.j0 <= other.j1 && other.j0 <= self.j1
    }

    /// Halves sharing the middle row or column
    fn split(&self) -> (Rect, Rect) {
        if self.width() >= self.height() {
            let mid = self.i0 + self.width() / 2;
            (
                Rect::new(self.i0, self.j0, mid, self.j1),
                Rect::new(mid, self.j0, self.i1, self.j1),
            )
        } else {
            let mid = self.j0 + self.height() / 2;
            (
                Rect::new(self.i0, self.j0, self.i1, mid),
                Rect::new(self.i0, mid, self.i1, self.j1),
            )
        }
    }
}

/// Placement of a slice in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SlicePlane {
    /// World position of grid point `(0, 0)`
    pub(crate) origin: DVec3,
    /// Grid spacing along X
    pub(crate) step_x: f64,
    /// Grid spacing along Y
    pub(crate) step_y: f64,
}

impl SlicePlane {
    #[inline(always)]
    pub(crate) fn point(&self, i: usize, j: usize) -> DVec3 {
        DVec3::new(
            self.origin.x + i as f64 * self.step_x,
            self.origin.y + j as f64 * self.step_y,
            self.origin.z,
        )
    }

    /// Smallest rectangle of grid points covering `aabb` in XY
    pub(crate) fn covering_rect(&self, aabb: &Aabb, width: usize, height: usize) -> Option<Rect> {
        let max_i = width.checked_sub(1)?;
        let max_j = height.checked_sub(1)?;
        let lo_x = ((aabb.min.x - self.origin.x) / self.step_x).floor();
        let hi_x = ((aabb.max.x - self.origin.x) / self.step_x).ceil();
        let lo_y = ((aabb.min.y - self.origin.y) / self.step_y).floor();
        let hi_y = ((aabb.max.y - self.origin.y) / self.step_y).ceil();
        if hi_x < 0.0 || hi_y < 0.0 || lo_x > max_i as f64 || lo_y > max_j as f64 {
            return None;
        }
        let clamp = |v: f64, max: usize| (v.max(0.0) as usize).min(max);
        Some(Rect::new(
            clamp(lo_x, max_i),
            clamp(lo_y, max_j),
            clamp(hi_x, max_i),
            clamp(hi_y, max_j),
        ))
    }

    fn enclosing_sphere(&self, rect: &Rect) -> EvalSphere {
        let lo = self.point(rect.i0, rect.j0);
        let hi = self.point(rect.i1, rect.j1);
        EvalSphere::new((lo + hi) * 0.5, (hi - lo).length() * 0.5)
    }
}

/// Grid rectangle covered by one area in the current slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AccuracyRect {
    pub(crate) rect: Rect,
    /// Index into the area list
    pub(crate) area: usize,
}

/// Per-slice sampling counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SliceCounts {
    pub(crate) evaluated: usize,
    pub(crate) interpolated: usize,
    pub(crate) neutral: usize,
}

/// Fills one slice buffer following the area accuracies
pub(crate) struct SliceSampler<'a, F: ScalarField + ?Sized> {
    pub(crate) field: &'a mut F,
    pub(crate) areas: &'a [Area],
    pub(crate) plane: SlicePlane,
    pub(crate) iso: f64,
    pub(crate) counts: SliceCounts,
    sample: FieldSample,
}

impl<'a, F: ScalarField + ?Sized> SliceSampler<'a, F> {
    pub(crate) fn new(field: &'a mut F, areas: &'a [Area], plane: SlicePlane, iso: f64) -> Self {
        SliceSampler {
            field,
            areas,
            plane,
            iso,
            counts: SliceCounts::default(),
            sample: FieldSample::value_only(),
        }
    }

    /// Accuracy rectangles of the areas whose support crosses the slice plane
    pub(crate) fn collect_rects(&self, buffer: &SliceBuffer, out: &mut Vec<AccuracyRect>) {
        out.clear();
        let z = self.plane.origin.z;
        for (area, a) in self.areas.iter().enumerate() {
            let aabb = a.aabb();
            if aabb.min.z > z || aabb.max.z < z {
                continue;
            }
            if let Some(rect) = self.plane.covering_rect(&aabb, buffer.width(), buffer.height()) {
                out.push(AccuracyRect { rect, area });
            }
        }
    }

    /// Fill every point of `buffer`
    ///
    /// `stack` holds the slice's accuracy rectangles on entry; it is used as
    /// scratch below them and restored on return.
    pub(crate) fn fill(&mut self, buffer: &mut SliceBuffer, stack: &mut Vec<AccuracyRect>) {
        let (Some(i1), Some(j1)) = (buffer.width().checked_sub(1), buffer.height().checked_sub(1))
        else {
            return;
        };
        let end = stack.len();
        self.fill_rect(buffer, Rect::new(0, 0, i1, j1), stack, 0, end);
    }

    fn fill_rect(
        &mut self,
        buffer: &mut SliceBuffer,
        rect: Rect,
        stack: &mut Vec<AccuracyRect>,
        from: usize,
        end: usize,
    ) {
        let start = stack.len();
        for k in from..end {
            let candidate = stack[k];
            if candidate.rect.intersects(&rect) {
                stack.push(candidate);
            }
        }
        if stack.len() == start {
            self.fill_neutral(buffer, &rect);
            return;
        }

        let corners = [
            self.exact(buffer, rect.i0, rect.j0),
            self.exact(buffer, rect.i1, rect.j0),
            self.exact(buffer, rect.i0, rect.j1),
            self.exact(buffer, rect.i1, rect.j1),
        ];
        if rect.width() <= 1 && rect.height() <= 1 {
            stack.truncate(start);
            return;
        }

        let sphere = self.plane.enclosing_sphere(&rect);
        let (nice, raw) = stack[start..]
            .iter()
            .map(|c| &self.areas[c.area])
            .fold((f64::INFINITY, f64::INFINITY), |(nice, raw), a| {
                (nice.min(a.nice_accuracy(&sphere)), raw.min(a.raw_accuracy(&sphere)))
            });
        let size = (rect.width() as f64 * self.plane.step_x)
            .max(rect.height() as f64 * self.plane.step_y);
        let inside = corners[0] > self.iso;
        let uniform = corners.iter().all(|&v| (v > self.iso) == inside);

        if (uniform && size <= raw) || size <= nice {
            self.interpolate(buffer, &rect, corners);
        } else {
            let (a, b) = rect.split();
            let overlapping = stack.len();
            self.fill_rect(buffer, a, stack, start, overlapping);
            self.fill_rect(buffer, b, stack, start, overlapping);
        }
        stack.truncate(start);
    }

    /// Field value at a grid point, evaluated once
    fn exact(&mut self, buffer: &mut SliceBuffer, i: usize, j: usize) -> f64 {
        if buffer.is_set(i, j) {
            return buffer.get(i, j);
        }
        self.field.sample(self.plane.point(i, j), &mut self.sample);
        self.counts.evaluated += 1;
        buffer.put(i, j, self.sample.value);
        self.sample.value
    }

    fn fill_neutral(&mut self, buffer: &mut SliceBuffer, rect: &Rect) {
        for j in rect.j0..=rect.j1 {
            for i in rect.i0..=rect.i1 {
                if !buffer.is_set(i, j) {
                    buffer.put(i, j, 0.0);
                    self.counts.neutral += 1;
                }
            }
        }
    }

    /// Bilinear fill from `[v00, v10, v01, v11]`
    fn interpolate(&mut self, buffer: &mut SliceBuffer, rect: &Rect, corners: [f64; 4]) {
        let [v00, v10, v01, v11] = corners;
        let w = rect.width().max(1) as f64;
        let h = rect.height().max(1) as f64;
        for j in rect.j0..=rect.j1 {
            let ty = (j - rect.j0) as f64 / h;
            let left = v00 + (v01 - v00) * ty;
            let right = v10 + (v11 - v10) * ty;
            for i in rect.i0..=rect.i1 {
                if !buffer.is_set(i, j) {
                    let tx = (i - rect.i0) as f64 / w;
                    buffer.put(i, j, left + (right - left) * tx);
                    self.counts.interpolated += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accuracy::AccuracyPolicy;
    use crate::area::{AreaShape, AreaSphere};

    fn plane(step: f64) -> SlicePlane {
        SlicePlane {
            origin: DVec3::new(-2.0, -2.0, 0.0),
            step_x: step,
            step_y: step,
        }
    }

    fn disk_field(p: DVec3, out: &mut FieldSample) {
        out.value = (2.0 - p.length()).max(0.0);
    }

    fn sphere_area(center: DVec3, thickness: f64) -> Area {
        Area::new(
            AreaShape::Sphere(AreaSphere::new(center, 2.0 * thickness, thickness)),
            AccuracyPolicy::default(),
        )
    }

    fn run(areas: &[Area], width: usize) -> (SliceBuffer, SliceCounts) {
        let mut field = disk_field;
        let step = 4.0 / (width - 1) as f64;
        let mut sampler = SliceSampler::new(&mut field, areas, plane(step), 1.0);
        let mut buffer = SliceBuffer::new(width, width);
        let mut stack = Vec::new();
        sampler.collect_rects(&buffer, &mut stack);
        sampler.fill(&mut buffer, &mut stack);
        (buffer, sampler.counts)
    }

    #[test]
    fn test_no_area_is_all_neutral() {
        let (buffer, counts) = run(&[], 9);
        assert!(buffer.is_complete());
        assert_eq!(counts.evaluated, 0);
        assert_eq!(counts.neutral, 81);
    }

    #[test]
    fn test_every_point_written_once() {
        let areas = [sphere_area(DVec3::ZERO, 1.0)];
        let (buffer, counts) = run(&areas, 33);
        assert!(buffer.is_complete());
        assert_eq!(counts.evaluated + counts.interpolated + counts.neutral, 33 * 33);
        assert!(counts.evaluated < 33 * 33);
    }

    #[test]
    fn test_fine_policy_evaluates_everything_covered() {
        let fine = AccuracyPolicy {
            nice: 1e-3,
            raw: 1e-3,
            current: 1e-3,
        };
        let areas = [Area::new(AreaShape::Sphere(AreaSphere::new(DVec3::ZERO, 4.0, 2.0)), fine)];
        let width = 17;
        let (buffer, counts) = run(&areas, width);
        assert_eq!(counts.interpolated, 0);
        assert_eq!(counts.evaluated, width * width);
        let p = plane(4.0 / (width - 1) as f64);
        let mut out = FieldSample::value_only();
        disk_field(p.point(3, 11), &mut out);
        assert_eq!(buffer.get(3, 11), out.value);
    }

    #[test]
    fn test_rect_split_shares_middle() {
        let (a, b) = Rect::new(0, 0, 8, 3).split();
        assert_eq!(a, Rect::new(0, 0, 4, 3));
        assert_eq!(b, Rect::new(4, 0, 8, 3));
        let (a, b) = Rect::new(0, 0, 1, 5).split();
        assert_eq!(a.j1, b.j0);
    }

    #[test]
    fn test_covering_rect_clamps() {
        let p = plane(0.5);
        let r = p
            .covering_rect(&Aabb::new(DVec3::splat(-10.0), DVec3::new(-1.2, 0.1, 0.0)), 9, 9)
            .unwrap();
        assert_eq!(r, Rect::new(0, 0, 2, 5));
        assert!(p
            .covering_rect(&Aabb::new(DVec3::splat(5.0), DVec3::splat(6.0)), 9, 9)
            .is_none());
    }
}
