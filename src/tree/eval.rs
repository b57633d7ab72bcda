//! Field evaluation through the tree
//!
//! Each recursion level keeps its child record on the stack: `FieldSample`
//! is `Copy`, so evaluation never touches the heap and never mutates the
//! tree, which lets a prepared tree be shared across threads.

use super::{Blobtree, Element, ElementKind, Node, NodeOp};
use crate::convergence::ScalarField;
use crate::error::{BlobtreeError, Result};
use crate::operations::{
    difference_gradient, difference_value, CompactSupport, Extremum, RicciAccumulator,
    ROOT_RICCI_POWER,
};
use crate::types::{ElementId, FieldSample};
use glam::DVec3;

impl Blobtree {
    /// Evaluate `id` at `p` into the slots requested by `out`
    ///
    /// Fails with [`BlobtreeError::InvalidAabb`] when `id` is a detached
    /// element not prepared since its last mutation, and with
    /// [`BlobtreeError::Unsupported`] when the step slot is requested through
    /// a Min or Max node.
    pub fn eval(&self, id: ElementId, p: DVec3, out: &mut FieldSample) -> Result<()> {
        let e = self.get(id)?;
        if !e.valid_aabb {
            return Err(BlobtreeError::InvalidAabb { element: id });
        }
        self.eval_element(e, p, out)
    }

    /// Root value at `p`
    pub fn value_at(&self, p: DVec3) -> Result<f64> {
        let mut out = FieldSample::value_only();
        self.eval(self.root, p, &mut out)?;
        Ok(out.value)
    }

    /// Root value, gradient and material at `p`
    pub fn sample_at(&self, p: DVec3) -> Result<FieldSample> {
        let mut out = FieldSample::full();
        self.eval(self.root, p, &mut out)?;
        Ok(out)
    }

    /// Read-only field view of the root for root finders and samplers
    pub fn field(&self) -> Result<PreparedField<'_>> {
        self.field_of(self.root)
    }

    /// Read-only field view of any prepared element
    pub fn field_of(&self, id: ElementId) -> Result<PreparedField<'_>> {
        if !self.get(id)?.valid_aabb {
            return Err(BlobtreeError::InvalidAabb { element: id });
        }
        Ok(PreparedField {
            tree: self,
            entry: id,
        })
    }

    fn eval_element(&self, e: &Element, p: DVec3, out: &mut FieldSample) -> Result<()> {
        match &e.kind {
            ElementKind::Scalis(prim) => {
                prim.eval(p, self.kernel.as_ref(), out);
                Ok(())
            }
            ElementKind::Sdf(prim) => {
                prim.eval(p, out);
                if let Some(step) = out.step.as_mut() {
                    *step = out.value.max(0.0);
                }
                Ok(())
            }
            ElementKind::Node(node) => match node.op {
                NodeOp::Root => self.eval_ricci(node, ROOT_RICCI_POWER, p, out),
                NodeOp::Ricci { power } => self.eval_ricci(node, power, p, out),
                NodeOp::Min => self.eval_select(node, Extremum::Min, p, out),
                NodeOp::Max => self.eval_select(node, Extremum::Max, p, out),
                NodeOp::Difference { alpha } => self.eval_difference(node, alpha, p, out),
                NodeOp::SdfRoot(functor) => self.eval_sdf_root(node, functor, p, out),
                NodeOp::SdfUnion => self.eval_sdf_union(node, p, out),
            },
        }
    }

    fn eval_ricci(&self, node: &Node, power: f64, p: DVec3, out: &mut FieldSample) -> Result<()> {
        let mut acc = RicciAccumulator::new(power);
        let mut step = f64::INFINITY;
        let mut child = FieldSample::request_like(out);
        for &c in &node.children {
            let ce = self.get(c)?;
            if ce.aabb.contains(p) {
                self.eval_element(ce, p, &mut child)?;
                acc.add(&child);
                if let Some(s) = child.step {
                    step = step.min(s);
                }
            } else if out.wants_step() {
                step = step.min(ce.aabb.distance_to(p));
            }
        }
        acc.finish(out);
        if let Some(s) = out.step.as_mut() {
            *s = step;
        }
        Ok(())
    }

    fn eval_select(
        &self,
        node: &Node,
        extremum: Extremum,
        p: DVec3,
        out: &mut FieldSample,
    ) -> Result<()> {
        if out.wants_step() {
            return Err(BlobtreeError::Unsupported {
                operation: "safe step",
                node: extremum.name(),
            });
        }
        let mut child = FieldSample::request_like(out);
        let mut best: Option<FieldSample> = None;
        for &c in &node.children {
            let ce = self.get(c)?;
            // Only children whose box holds `p` compete, for Min as for Max
            if !ce.aabb.contains(p) {
                continue;
            }
            self.eval_element(ce, p, &mut child)?;
            match best {
                Some(b) if !extremum.improves(child.value, b.value) => {}
                _ => best = Some(child),
            }
        }
        match best {
            Some(b) => *out = b,
            None => out.set_neutral(),
        }
        Ok(())
    }

    fn eval_difference(
        &self,
        node: &Node,
        alpha: f64,
        p: DVec3,
        out: &mut FieldSample,
    ) -> Result<()> {
        let Some(&minuend) = node.children.first() else {
            out.set_neutral();
            if let Some(s) = out.step.as_mut() {
                *s = f64::INFINITY;
            }
            return Ok(());
        };
        let e0 = self.get(minuend)?;
        if !e0.aabb.contains(p) {
            out.set_neutral();
            if let Some(s) = out.step.as_mut() {
                *s = e0.aabb.distance_to(p);
            }
            return Ok(());
        }
        self.eval_element(e0, p, out)?;

        let mut sub = FieldSample {
            gradient: out.gradient.map(|_| DVec3::ZERO),
            ..Default::default()
        };
        if let Some(&subtrahend) = node.children.get(1) {
            let e1 = self.get(subtrahend)?;
            if e1.aabb.contains(p) {
                self.eval_element(e1, p, &mut sub)?;
            }
        }

        let v0 = out.value;
        out.value = difference_value(v0, sub.value, alpha);
        if let Some(g) = out.gradient.as_mut() {
            let sub_gradient = sub.gradient.unwrap_or(DVec3::ZERO);
            *g = difference_gradient(v0, *g, sub.value, sub_gradient, alpha);
        }
        Ok(())
    }

    fn eval_sdf_root(
        &self,
        node: &Node,
        functor: CompactSupport,
        p: DVec3,
        out: &mut FieldSample,
    ) -> Result<()> {
        let Some(&child) = node.children.first() else {
            out.set_neutral();
            if let Some(s) = out.step.as_mut() {
                *s = f64::INFINITY;
            }
            return Ok(());
        };
        let mut dist = FieldSample {
            step: None,
            ..FieldSample::request_like(out)
        };
        self.eval_element(self.get(child)?, p, &mut dist)?;
        let d = dist.value;
        out.value = functor.value(d);
        if let Some(g) = out.gradient.as_mut() {
            *g = dist.gradient.unwrap_or(DVec3::ZERO) * functor.derivative(d);
        }
        if let (Some(m), Some(dm)) = (out.material.as_mut(), dist.material) {
            *m = dm;
        }
        if let Some(s) = out.step.as_mut() {
            *s = (d - functor.outer_distance()).max(0.0);
        }
        Ok(())
    }

    fn eval_sdf_union(&self, node: &Node, p: DVec3, out: &mut FieldSample) -> Result<()> {
        let mut child = FieldSample::request_like(out);
        let mut best: Option<FieldSample> = None;
        for &c in &node.children {
            self.eval_element(self.get(c)?, p, &mut child)?;
            match best {
                Some(b) if child.value >= b.value => {}
                _ => best = Some(child),
            }
        }
        match best {
            Some(b) => *out = b,
            None => {
                out.set_neutral();
                out.value = f64::INFINITY;
                if let Some(s) = out.step.as_mut() {
                    *s = f64::INFINITY;
                }
            }
        }
        Ok(())
    }
}

/// A prepared element seen as a total scalar field
///
/// Evaluation errors (only possible if the tree is mutated behind the view,
/// which the borrow forbids) fall back to the neutral value. The step slot is
/// never computed: Min and Max nodes cannot provide it.
#[derive(Debug, Clone, Copy)]
pub struct PreparedField<'a> {
    tree: &'a Blobtree,
    entry: ElementId,
}

impl<'a> PreparedField<'a> {
    /// Underlying tree
    pub fn tree(&self) -> &'a Blobtree {
        self.tree
    }

    /// Evaluated element
    pub fn entry(&self) -> ElementId {
        self.entry
    }
}

impl ScalarField for PreparedField<'_> {
    #[inline]
    fn sample(&mut self, p: DVec3, out: &mut FieldSample) {
        let step = out.step.take();
        if self.tree.eval(self.entry, p, out).is_err() {
            out.set_neutral();
        }
        out.step = step;
    }
}
