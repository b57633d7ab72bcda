//! Shell decomposition for split polygonization
//!
//! Max nodes and Ricci nodes of high enough power barely blend their
//! children, so each child can be polygonized on its own grid and the
//! meshes concatenated.

use crate::error::Result;
use crate::tree::{Blobtree, NodeOp};
use crate::types::ElementId;

/// Subtrees reached by descending the root through Max nodes and Ricci
/// nodes of power at least `ricci_threshold`, in child order
pub fn collect_shells(tree: &Blobtree, ricci_threshold: f64) -> Result<Vec<ElementId>> {
    let mut shells = Vec::new();
    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        let descend = match tree.get(id)?.node() {
            Some(node) => match node.op {
                NodeOp::Root | NodeOp::Max => true,
                NodeOp::Ricci { power } => power >= ricci_threshold,
                _ => false,
            },
            None => false,
        };
        if descend {
            stack.extend(tree.children(id)?.iter().rev());
        } else {
            shells.push(id);
        }
    }
    Ok(shells)
}
