//! Reversible pruning of subtrees outside a region of interest
//!
//! Trimming detaches every child of a union-style node (root, Ricci, Max)
//! whose AABB misses the region, recursing into the union-style children
//! that remain. Min, Difference and SDF nodes are kept or removed whole, so
//! their operands are never separated. Each detachment is recorded with the
//! child's former position; untrimming replays the record backwards.

use super::{Blobtree, ElementKind};
use crate::error::{BlobtreeError, Result};
use crate::types::{Aabb, ElementId};

/// Detachments performed by one trim, in the order they happened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrimRecord {
    /// Detached elements
    pub trimmed: Vec<ElementId>,
    /// Former parent of each detached element
    pub parents: Vec<ElementId>,
    /// Former position of each detached element among its siblings
    pub positions: Vec<usize>,
}

impl TrimRecord {
    /// Number of detached elements
    pub fn len(&self) -> usize {
        self.trimmed.len()
    }

    /// True when nothing was detached
    pub fn is_empty(&self) -> bool {
        self.trimmed.is_empty()
    }

    fn push(&mut self, child: ElementId, parent: ElementId, position: usize) {
        self.trimmed.push(child);
        self.parents.push(parent);
        self.positions.push(position);
    }
}

impl Blobtree {
    /// Detach every subtree that cannot contribute inside `region`
    ///
    /// The caller owns the returned record and must hand it back to
    /// [`Blobtree::untrim`]. The boxes above detached children are tightened
    /// before returning.
    pub fn external_trim(&mut self, region: &Aabb) -> TrimRecord {
        let mut record = TrimRecord::default();
        let root = self.root;
        self.trim_rec(root, region, &mut record);
        self.prepare_for_eval();
        record
    }

    /// Reattach what `record` detached, restoring the original child order
    pub fn untrim(&mut self, record: &TrimRecord) -> Result<()> {
        if record.trimmed.len() != record.parents.len()
            || record.trimmed.len() != record.positions.len()
        {
            return Err(BlobtreeError::TrimMismatch {
                trimmed: record.trimmed.len(),
                parents: record.parents.len(),
                positions: record.positions.len(),
            });
        }
        let result = self.reattach(record);
        self.prepare_for_eval();
        result
    }

    fn reattach(&mut self, record: &TrimRecord) -> Result<()> {
        for i in (0..record.trimmed.len()).rev() {
            let child = record.trimmed[i];
            let parent = record.parents[i];
            self.get(child)?;
            let node = self.node_mut(parent)?;
            let position = record.positions[i].min(node.children.len());
            node.children.insert(position, child);
            self.get_mut(child)?.parent = Some(parent);
            self.mark_invalid(parent);
        }
        Ok(())
    }

    /// Trim and push the record on the tree's own stack
    pub fn trim(&mut self, region: &Aabb) -> usize {
        let record = self.external_trim(region);
        let count = record.len();
        self.trim_stack.push(record);
        count
    }

    /// Undo the most recent [`Blobtree::trim`]
    pub fn untrim_last(&mut self) -> Result<()> {
        match self.trim_stack.pop() {
            Some(record) => self.untrim(&record),
            None => Ok(()),
        }
    }

    /// Undo every pending [`Blobtree::trim`]
    pub fn untrim_all(&mut self) -> Result<()> {
        while let Some(record) = self.trim_stack.pop() {
            self.untrim(&record)?;
        }
        Ok(())
    }

    /// Number of pending internal trims
    pub fn trim_depth(&self) -> usize {
        self.trim_stack.len()
    }

    fn trim_rec(&mut self, id: ElementId, region: &Aabb, record: &mut TrimRecord) {
        let count = match self.get(id).ok().and_then(|e| e.node()) {
            Some(node) if node.op.is_union() => node.children.len(),
            _ => return,
        };
        // Back to front, so replaying the record in reverse restores positions
        for position in (0..count).rev() {
            let Some(child) = self
                .get(id)
                .ok()
                .and_then(|e| e.node())
                .and_then(|n| n.children.get(position).copied())
            else {
                continue;
            };
            let (misses, union_child) = match self.get(child) {
                Ok(ce) => (
                    ce.valid_aabb && !ce.aabb.intersects(region),
                    matches!(&ce.kind, ElementKind::Node(n) if n.op.is_union()),
                ),
                Err(_) => continue,
            };
            if misses {
                if let Ok(node) = self.node_mut(id) {
                    node.children.remove(position);
                }
                if let Ok(ce) = self.get_mut(child) {
                    ce.parent = None;
                }
                self.mark_invalid(id);
                record.push(child, id, position);
            } else if union_child {
                self.trim_rec(child, region, record);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::types::ThickVertex;
    use glam::DVec3;

    fn row_of_points(tree: &mut Blobtree, n: usize) -> Vec<ElementId> {
        let root = tree.root();
        (0..n)
            .map(|i| {
                let p = tree.create_point(
                    ThickVertex::new(DVec3::new(i as f64 * 10.0, 0.0, 0.0), 1.0),
                    Material::default(),
                );
                tree.add_child(root, p).unwrap();
                p
            })
            .collect()
    }

    #[test]
    fn test_trim_then_untrim_restores_order() {
        let mut tree = Blobtree::new();
        let points = row_of_points(&mut tree, 5);
        tree.prepare_for_eval();
        let region = Aabb::from_sphere(DVec3::new(20.0, 0.0, 0.0), 1.0);
        let record = tree.external_trim(&region);
        assert_eq!(record.len(), 4);
        assert_eq!(tree.children(tree.root()).unwrap(), &[points[2]]);
        tree.untrim(&record).unwrap();
        assert_eq!(tree.children(tree.root()).unwrap(), points.as_slice());
    }

    #[test]
    fn test_trim_refreshes_root_box() {
        let mut tree = Blobtree::new();
        row_of_points(&mut tree, 3);
        let record = tree.external_trim(&Aabb::from_sphere(DVec3::ZERO, 1.0));
        assert!(tree.is_valid(tree.root()).unwrap());
        assert_eq!(tree.root_aabb().max.x, 2.0);
        tree.untrim(&record).unwrap();
        assert_eq!(tree.root_aabb().max.x, 22.0);
    }

    #[test]
    fn test_internal_trim_stack() {
        let mut tree = Blobtree::new();
        let points = row_of_points(&mut tree, 3);
        tree.prepare_for_eval();
        assert_eq!(tree.trim(&Aabb::from_sphere(DVec3::ZERO, 1.0)), 2);
        assert_eq!(tree.trim_depth(), 1);
        tree.untrim_all().unwrap();
        assert_eq!(tree.trim_depth(), 0);
        assert_eq!(tree.children(tree.root()).unwrap(), points.as_slice());
    }

    #[test]
    fn test_mismatched_record_rejected() {
        let mut tree = Blobtree::new();
        let points = row_of_points(&mut tree, 1);
        let record = TrimRecord {
            trimmed: points.clone(),
            parents: vec![],
            positions: vec![0],
        };
        assert!(matches!(
            tree.untrim(&record),
            Err(BlobtreeError::TrimMismatch { trimmed: 1, parents: 0, positions: 1 })
        ));
    }

    #[test]
    fn test_trim_never_splits_difference() {
        let mut tree = Blobtree::new();
        let root = tree.root();
        let diff = tree.create_difference(1.0);
        let a = tree.create_point(ThickVertex::new(DVec3::ZERO, 1.0), Material::default());
        let far = ThickVertex::new(DVec3::new(50.0, 0.0, 0.0), 1.0);
        let b = tree.create_point(far, Material::default());
        tree.add_child(diff, a).unwrap();
        tree.add_child(diff, b).unwrap();
        tree.add_child(root, diff).unwrap();
        tree.prepare_for_eval();
        let record = tree.external_trim(&Aabb::from_sphere(DVec3::ZERO, 0.5));
        assert!(record.is_empty());
        assert_eq!(tree.children(diff).unwrap(), &[a, b]);
    }
}
