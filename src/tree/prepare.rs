//! Bottom-up refresh of cached bounds and area collection

use super::{Blobtree, ElementKind, NodeOp};
use crate::accuracy::AccuracyPolicy;
use crate::area::Area;
use crate::error::{BlobtreeError, Result};
use crate::operations::CompactSupport;
use crate::types::{Aabb, ElementId};

impl Blobtree {
    /// Refresh every invalid element reachable from the root
    ///
    /// Idempotent while nothing changes: valid subtrees are skipped whole.
    pub fn prepare_for_eval(&mut self) {
        let root = self.root;
        self.prepare_rec(root);
    }

    /// Refresh a detached subtree
    pub fn prepare_element(&mut self, id: ElementId) -> Result<()> {
        self.get(id)?;
        self.prepare_rec(id);
        Ok(())
    }

    fn prepare_rec(&mut self, id: ElementId) {
        let count = match self.get(id) {
            Ok(e) if !e.valid_aabb => e.node().map_or(0, |n| n.children.len()),
            _ => return,
        };
        for i in 0..count {
            let child = self
                .get(id)
                .ok()
                .and_then(|e| e.node())
                .and_then(|n| n.children.get(i).copied());
            if let Some(child) = child {
                self.prepare_rec(child);
            }
        }
        let (aabb, height) = self.compute_bounds(id);
        if let Ok(e) = self.get_mut(id) {
            e.aabb = aabb;
            e.height = height;
            e.valid_aabb = true;
        }
    }

    /// Box and height of an element whose children are already valid
    fn compute_bounds(&mut self, id: ElementId) -> (Aabb, usize) {
        let op = match self.get_mut(id).map(|e| &mut e.kind) {
            Ok(ElementKind::Scalis(p)) => {
                p.prepare();
                return (p.aabb(), 0);
            }
            Ok(ElementKind::Sdf(p)) => return (p.aabb(), 0),
            Ok(ElementKind::Node(n)) => n.op,
            Err(_) => return (Aabb::EMPTY, 0),
        };
        let Some(node) = self.get(id).ok().and_then(|e| e.node()) else {
            return (Aabb::EMPTY, 0);
        };

        let mut boxes = node
            .children
            .iter()
            .filter_map(|&c| self.get(c).ok())
            .map(|e| (e.aabb, e.height));
        let mut height = 0;
        let mut track = |h: usize| height = height.max(h + 1);

        let aabb = match op {
            NodeOp::Difference { .. } => {
                let first = boxes.next();
                let rest_height = boxes.map(|(_, h)| h).max();
                if let Some(h) = rest_height {
                    track(h);
                }
                match first {
                    Some((b, h)) => {
                        track(h);
                        b
                    }
                    None => Aabb::EMPTY,
                }
            }
            NodeOp::SdfRoot(functor) => match boxes.next() {
                Some((b, h)) => {
                    track(h);
                    b.expanded(functor.outer_distance())
                }
                None => Aabb::EMPTY,
            },
            NodeOp::Root
            | NodeOp::Ricci { .. }
            | NodeOp::Min
            | NodeOp::Max
            | NodeOp::SdfUnion => {
                boxes.fold(Aabb::EMPTY, |acc, (b, h)| {
                    track(h);
                    acc.union(&b)
                })
            }
        };
        (aabb, height.max(1))
    }

    /// Accuracy oracles of every primitive under the root
    pub fn areas(&self, policy: AccuracyPolicy) -> Result<Vec<Area>> {
        self.areas_of(self.root, policy)
    }

    /// Accuracy oracles of every primitive under `id`
    ///
    /// Subtrahends of Difference nodes contribute nothing: they can only
    /// carve inside the minuend's region.
    pub fn areas_of(&self, id: ElementId, policy: AccuracyPolicy) -> Result<Vec<Area>> {
        if !self.get(id)?.valid_aabb {
            return Err(BlobtreeError::InvalidAabb { element: id });
        }
        let mut out = Vec::new();
        self.collect_areas(id, policy, None, &mut out)?;
        Ok(out)
    }

    fn collect_areas(
        &self,
        id: ElementId,
        policy: AccuracyPolicy,
        functor: Option<CompactSupport>,
        out: &mut Vec<Area>,
    ) -> Result<()> {
        match &self.get(id)?.kind {
            ElementKind::Scalis(p) => out.push(p.area(policy)),
            ElementKind::Sdf(p) => {
                let support = functor.unwrap_or_default().support;
                out.push(p.area(support, policy));
            }
            ElementKind::Node(node) => {
                let (children, functor) = match node.op {
                    NodeOp::Difference { .. } => {
                        (&node.children[..node.children.len().min(1)], functor)
                    }
                    NodeOp::SdfRoot(f) => (&node.children[..], Some(f)),
                    _ => (&node.children[..], functor),
                };
                for &child in children {
                    self.collect_areas(child, policy, functor, out)?;
                }
            }
        }
        Ok(())
    }
}
