//! The blobtree: an arena of nodes and primitives
//!
//! Elements live in a generational slot arena. Children and parents are
//! stored as [`ElementId`] cross-references, so the parent back-link used for
//! upward invalidation is just an index.
//!
//! # Lifecycle
//!
//! Every element is either valid (its cached AABB bounds its non-neutral
//! region) or invalid. Mutations mark the element invalid and climb towards
//! the root while the parent is still valid, which keeps invalidation
//! O(depth) and preserves the invariant that a valid element only has valid
//! descendants. [`Blobtree::prepare_for_eval`] refreshes invalid elements
//! bottom-up; evaluation and area queries require a valid entry element.

mod eval;
mod prepare;
mod trim;

pub use eval::PreparedField;
pub use trim::TrimRecord;

use crate::error::{BlobtreeError, Result};
use crate::kernel::{ConvolutionKernel, Poly6Convolution};
use crate::material::Material;
use crate::operations::CompactSupport;
use crate::primitives::{
    FieldModel, ScalisPoint, ScalisPrimitive, ScalisSegment, ScalisTriangle, SdfPrimitive,
};
use crate::types::{Aabb, ElementId, ThickVertex};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Default surface threshold: the field equals the density at distance `thickness`
pub const DEFAULT_ISO_VALUE: f64 = 1.0;

/// Blend operator of a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NodeOp {
    /// Tree entry point: a Ricci blend of power 64
    Root,
    /// Power blend `(Σ vⁿ)^(1/n)`
    Ricci {
        /// Blend power
        power: f64,
    },
    /// Smallest value among the children whose box holds the point
    Min,
    /// Largest value among the children whose box holds the point
    Max,
    /// `max(0, v0 - v1^alpha)`, strictly binary
    Difference {
        /// Exponent applied to the subtrahend
        alpha: f64,
    },
    /// Maps the signed distance of its single SDF child to a blend field
    SdfRoot(CompactSupport),
    /// Smallest signed distance of its SDF children
    SdfUnion,
}

impl NodeOp {
    /// Kind name for messages
    pub fn name(&self) -> &'static str {
        match self {
            NodeOp::Root => "root",
            NodeOp::Ricci { .. } => "ricci",
            NodeOp::Min => "min",
            NodeOp::Max => "max",
            NodeOp::Difference { .. } => "difference",
            NodeOp::SdfRoot(_) => "sdf root",
            NodeOp::SdfUnion => "sdf union",
        }
    }

    /// Maximum number of children
    pub fn max_children(&self) -> Option<usize> {
        match self {
            NodeOp::Difference { .. } => Some(2),
            NodeOp::SdfRoot(_) => Some(1),
            _ => None,
        }
    }

    /// Whether children are signed distances rather than blend fields
    fn takes_distances(&self) -> bool {
        matches!(self, NodeOp::SdfRoot(_) | NodeOp::SdfUnion)
    }

    /// Union-style nodes whose children may be trimmed independently
    pub(crate) fn is_union(&self) -> bool {
        matches!(self, NodeOp::Root | NodeOp::Ricci { .. } | NodeOp::Max)
    }
}

/// Inner element: an operator over ordered children
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Blend operator
    pub op: NodeOp,
    /// Children; order matters for `Difference`
    pub children: Vec<ElementId>,
}

/// What an element is
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// Operator node
    Node(Node),
    /// SCALIS leaf
    Scalis(ScalisPrimitive),
    /// Signed-distance leaf
    Sdf(SdfPrimitive),
}

impl ElementKind {
    /// Kind name for messages
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Node(n) => n.op.name(),
            ElementKind::Scalis(p) => p.kind_name(),
            ElementKind::Sdf(_) => "sdf primitive",
        }
    }

    /// Produces a signed distance rather than a blend field
    fn is_distance(&self) -> bool {
        match self {
            ElementKind::Node(n) => matches!(n.op, NodeOp::SdfUnion),
            ElementKind::Scalis(_) => false,
            ElementKind::Sdf(_) => true,
        }
    }
}

/// One stored element with its cached bounding state
#[derive(Debug, Clone)]
pub struct Element {
    pub(crate) aabb: Aabb,
    pub(crate) valid_aabb: bool,
    pub(crate) parent: Option<ElementId>,
    /// Longest path to a leaf, refreshed by `prepare_for_eval`
    pub(crate) height: usize,
    pub(crate) kind: ElementKind,
}

impl Element {
    fn new(kind: ElementKind) -> Self {
        Element {
            aabb: Aabb::EMPTY,
            valid_aabb: false,
            parent: None,
            height: 0,
            kind,
        }
    }

    /// Kind and payload
    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    /// Whether the cached AABB is current
    pub fn is_valid(&self) -> bool {
        self.valid_aabb
    }

    /// Parent, `None` for the root and detached elements
    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub(crate) fn node(&self) -> Option<&Node> {
        match &self.kind {
            ElementKind::Node(n) => Some(n),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    element: Option<Element>,
}

/// Blobtree arena with a single root node
#[derive(Debug)]
pub struct Blobtree {
    slots: Vec<Slot>,
    free_list: Vec<usize>,
    root: ElementId,
    iso_value: f64,
    trim_stack: Vec<TrimRecord>,
    kernel: Box<dyn ConvolutionKernel>,
}

impl Default for Blobtree {
    fn default() -> Self {
        Self::new()
    }
}

impl Blobtree {
    /// Empty tree with the default iso-value and the poly6 kernel
    pub fn new() -> Self {
        Self::with_iso_value(DEFAULT_ISO_VALUE)
    }

    /// Empty tree with a custom iso-value
    pub fn with_iso_value(iso_value: f64) -> Self {
        let mut tree = Blobtree {
            slots: Vec::new(),
            free_list: Vec::new(),
            root: ElementId::new(0, 0),
            iso_value,
            trim_stack: Vec::new(),
            kernel: Box::new(Poly6Convolution),
        };
        tree.root = tree.alloc(ElementKind::Node(Node {
            op: NodeOp::Root,
            children: Vec::new(),
        }));
        tree.prepare_for_eval();
        tree
    }

    /// Replace the convolution kernel used by segments and triangles
    pub fn with_kernel(mut self, kernel: Box<dyn ConvolutionKernel>) -> Self {
        self.kernel = kernel;
        self.invalidate_all();
        self
    }

    /// Root node
    #[inline(always)]
    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Surface threshold
    #[inline(always)]
    pub fn iso_value(&self) -> f64 {
        self.iso_value
    }

    /// Change the surface threshold
    pub fn set_iso_value(&mut self, iso_value: f64) {
        self.iso_value = iso_value;
    }

    /// Active convolution kernel
    pub fn kernel(&self) -> &dyn ConvolutionKernel {
        self.kernel.as_ref()
    }

    /// Number of live elements, root included
    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    /// True when only the root exists
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    // ---------------------------------------------------------------------
    // Arena access
    // ---------------------------------------------------------------------

    fn alloc(&mut self, kind: ElementKind) -> ElementId {
        let element = Element::new(kind);
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index];
            slot.generation = slot.generation.wrapping_add(1);
            slot.element = Some(element);
            ElementId::new(index, slot.generation)
        } else {
            self.slots.push(Slot {
                generation: 0,
                element: Some(element),
            });
            ElementId::new(self.slots.len() - 1, 0)
        }
    }

    /// Does `id` name a live element
    pub fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_ok()
    }

    /// Element named by `id`
    pub fn get(&self, id: ElementId) -> Result<&Element> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.element.as_ref())
            .ok_or(BlobtreeError::UnknownElement { element: id })
    }

    pub(crate) fn get_mut(&mut self, id: ElementId) -> Result<&mut Element> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.element.as_mut())
            .ok_or(BlobtreeError::UnknownElement { element: id })
    }

    fn node_mut(&mut self, id: ElementId) -> Result<&mut Node> {
        match &mut self.get_mut(id)?.kind {
            ElementKind::Node(n) => Ok(n),
            _ => Err(BlobtreeError::NotANode { element: id }),
        }
    }

    fn scalis_mut(&mut self, id: ElementId) -> Result<&mut ScalisPrimitive> {
        match &mut self.get_mut(id)?.kind {
            ElementKind::Scalis(p) => Ok(p),
            _ => Err(BlobtreeError::NotAPrimitive { element: id }),
        }
    }

    /// Children of a node
    pub fn children(&self, id: ElementId) -> Result<&[ElementId]> {
        self.get(id)?
            .node()
            .map(|n| n.children.as_slice())
            .ok_or(BlobtreeError::NotANode { element: id })
    }

    /// Parent of an element
    pub fn parent(&self, id: ElementId) -> Result<Option<ElementId>> {
        Ok(self.get(id)?.parent)
    }

    /// Cached AABB; fails while a detached element is invalid
    ///
    /// Elements attached under the root are always current.
    pub fn aabb(&self, id: ElementId) -> Result<Aabb> {
        let e = self.get(id)?;
        if e.valid_aabb {
            Ok(e.aabb)
        } else {
            Err(BlobtreeError::InvalidAabb { element: id })
        }
    }

    /// Root AABB
    pub fn root_aabb(&self) -> Aabb {
        self.get(self.root).map(|e| e.aabb).unwrap_or(Aabb::EMPTY)
    }

    /// Whether the cached AABB of `id` is current
    pub fn is_valid(&self, id: ElementId) -> Result<bool> {
        Ok(self.get(id)?.valid_aabb)
    }

    // ---------------------------------------------------------------------
    // Creation
    // ---------------------------------------------------------------------

    fn create_node(&mut self, op: NodeOp) -> ElementId {
        self.alloc(ElementKind::Node(Node {
            op,
            children: Vec::new(),
        }))
    }

    /// Detached Ricci node of power `power`
    pub fn create_ricci(&mut self, power: f64) -> ElementId {
        self.create_node(NodeOp::Ricci { power })
    }

    /// Detached Min node
    pub fn create_min(&mut self) -> ElementId {
        self.create_node(NodeOp::Min)
    }

    /// Detached Max node
    pub fn create_max(&mut self) -> ElementId {
        self.create_node(NodeOp::Max)
    }

    /// Detached Difference node
    pub fn create_difference(&mut self, alpha: f64) -> ElementId {
        self.create_node(NodeOp::Difference { alpha })
    }

    /// Detached SDF root with a compact-support half-width of `support`
    pub fn create_sdf_root(&mut self, support: f64) -> ElementId {
        self.create_node(NodeOp::SdfRoot(CompactSupport::new(support)))
    }

    /// Detached SDF union
    pub fn create_sdf_union(&mut self) -> ElementId {
        self.create_node(NodeOp::SdfUnion)
    }

    /// Detached SCALIS primitive
    pub fn create_primitive(&mut self, primitive: impl Into<ScalisPrimitive>) -> ElementId {
        self.alloc(ElementKind::Scalis(primitive.into()))
    }

    /// Detached weighted point
    pub fn create_point(&mut self, vertex: ThickVertex, material: Material) -> ElementId {
        self.create_primitive(ScalisPoint::new(vertex, material))
    }

    /// Detached weighted segment
    pub fn create_segment(
        &mut self,
        vertices: [ThickVertex; 2],
        materials: [Material; 2],
        model: FieldModel,
    ) -> ElementId {
        self.create_primitive(ScalisSegment::new(vertices, materials, model))
    }

    /// Detached weighted triangle
    pub fn create_triangle(
        &mut self,
        vertices: [ThickVertex; 3],
        materials: [Material; 3],
        model: FieldModel,
    ) -> ElementId {
        self.create_primitive(ScalisTriangle::new(vertices, materials, model))
    }

    /// Detached SDF leaf
    pub fn create_sdf(&mut self, primitive: SdfPrimitive) -> ElementId {
        self.alloc(ElementKind::Sdf(primitive))
    }

    // ---------------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------------

    /// Attach `child` under `parent`, detaching it from any former parent
    ///
    /// Re-adding an element to its current parent is a no-op.
    pub fn add_child(&mut self, parent: ElementId, child: ElementId) -> Result<()> {
        if child == self.root {
            return Err(BlobtreeError::RootImmutable("re-parented"));
        }
        let child_el = self.get(child)?;
        let child_is_distance = child_el.kind.is_distance();
        let former = child_el.parent;
        let node = self
            .get(parent)?
            .node()
            .ok_or(BlobtreeError::NotANode { element: parent })?;

        if node.op.takes_distances() != child_is_distance {
            return Err(BlobtreeError::IncompatibleChild { parent, child });
        }
        if former == Some(parent) {
            return Ok(());
        }
        if let Some(max) = node.op.max_children() {
            if node.children.len() >= max {
                return Err(BlobtreeError::ArityExceeded {
                    element: parent,
                    max,
                });
            }
        }
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(BlobtreeError::CycleDetected { parent, child });
            }
            cursor = self.get(id)?.parent;
        }

        if let Some(former) = former {
            self.remove_child(former, child)?;
        }
        self.node_mut(parent)?.children.push(child);
        self.get_mut(child)?.parent = Some(parent);
        self.invalidate_aabb(parent)
    }

    /// Detach `child` from `parent`, keeping the order of the remaining children
    pub fn remove_child(&mut self, parent: ElementId, child: ElementId) -> Result<()> {
        self.get(child)?;
        let node = self.node_mut(parent)?;
        let position = node
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(BlobtreeError::NotAChild { parent, child })?;
        node.children.remove(position);
        self.get_mut(child)?.parent = None;
        self.invalidate_aabb(parent)
    }

    /// Destroy an element and its whole subtree
    ///
    /// Outstanding ids into the subtree become stale and are rejected with
    /// [`BlobtreeError::UnknownElement`].
    pub fn destroy(&mut self, id: ElementId) -> Result<()> {
        if id == self.root {
            return Err(BlobtreeError::RootImmutable("destroyed"));
        }
        if let Some(parent) = self.get(id)?.parent {
            self.remove_child(parent, id)?;
        }
        self.release(id);
        Ok(())
    }

    fn release(&mut self, id: ElementId) {
        let Some(slot) = self.slots.get_mut(id.index()) else {
            return;
        };
        if slot.generation != id.generation() {
            return;
        }
        let Some(element) = slot.element.take() else {
            return;
        };
        self.free_list.push(id.index());
        if let ElementKind::Node(node) = element.kind {
            for child in node.children {
                self.release(child);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Invalidation
    // ---------------------------------------------------------------------

    /// Mark `id` invalid and climb while the parent is still valid
    ///
    /// The root never stays stale: when the climb reaches it, the invalidated
    /// path is recomputed on the spot. Detached subtrees stay invalid until
    /// [`Blobtree::prepare_element`].
    pub fn invalidate_aabb(&mut self, id: ElementId) -> Result<()> {
        self.get(id)?;
        self.mark_invalid(id);
        self.prepare_for_eval();
        Ok(())
    }

    /// Clear the valid flag of `id` and of its valid ancestors
    pub(crate) fn mark_invalid(&mut self, id: ElementId) {
        let mut cursor = Some(id);
        let mut first = true;
        while let Some(current) = cursor {
            cursor = match self.get_mut(current) {
                Ok(e) if first || e.valid_aabb => {
                    e.valid_aabb = false;
                    e.parent
                }
                _ => None,
            };
            first = false;
        }
    }

    fn invalidate_all(&mut self) {
        for slot in &mut self.slots {
            if let Some(e) = slot.element.as_mut() {
                e.valid_aabb = false;
            }
        }
        self.prepare_for_eval();
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    fn vertex_mut(&mut self, id: ElementId, index: usize) -> Result<&mut ThickVertex> {
        let vertices = self.scalis_mut(id)?.vertices_mut();
        let count = vertices.len();
        vertices
            .get_mut(index)
            .ok_or(BlobtreeError::VertexOutOfRange {
                element: id,
                index,
                count,
            })
    }

    /// Move one vertex of a primitive
    pub fn set_vertex_position(
        &mut self,
        id: ElementId,
        index: usize,
        position: DVec3,
    ) -> Result<()> {
        self.vertex_mut(id, index)?.position = position;
        self.invalidate_aabb(id)
    }

    /// Change the thickness of one vertex of a primitive
    pub fn set_vertex_thickness(
        &mut self,
        id: ElementId,
        index: usize,
        thickness: f64,
    ) -> Result<()> {
        self.vertex_mut(id, index)?.thickness = thickness;
        self.invalidate_aabb(id)
    }

    /// Change the material attached to one vertex of a primitive
    pub fn set_vertex_material(
        &mut self,
        id: ElementId,
        index: usize,
        material: Material,
    ) -> Result<()> {
        let materials = self.scalis_mut(id)?.materials_mut();
        let count = materials.len();
        let slot = materials
            .get_mut(index)
            .ok_or(BlobtreeError::VertexOutOfRange {
                element: id,
                index,
                count,
            })?;
        *slot = material;
        Ok(())
    }

    /// Change the field scale of a primitive
    pub fn set_density(&mut self, id: ElementId, density: f64) -> Result<()> {
        self.scalis_mut(id)?.set_density(density);
        self.invalidate_aabb(id)
    }

    /// Switch a segment or triangle between distance and convolution fields
    pub fn set_field_model(&mut self, id: ElementId, model: FieldModel) -> Result<()> {
        if !self.scalis_mut(id)?.set_model(model) {
            return Err(BlobtreeError::Unsupported {
                operation: "set_field_model",
                node: "point",
            });
        }
        self.invalidate_aabb(id)
    }

    /// Change the power of a Ricci node
    pub fn set_ricci_power(&mut self, id: ElementId, power: f64) -> Result<()> {
        let node = self.node_mut(id)?;
        match &mut node.op {
            NodeOp::Ricci { power: p } => *p = power,
            other => {
                return Err(BlobtreeError::Unsupported {
                    operation: "set_ricci_power",
                    node: other.name(),
                })
            }
        }
        self.invalidate_aabb(id)
    }

    /// Change the subtrahend exponent of a Difference node
    pub fn set_difference_alpha(&mut self, id: ElementId, alpha: f64) -> Result<()> {
        let node = self.node_mut(id)?;
        match &mut node.op {
            NodeOp::Difference { alpha: a } => *a = alpha,
            other => {
                return Err(BlobtreeError::Unsupported {
                    operation: "set_difference_alpha",
                    node: other.name(),
                })
            }
        }
        self.invalidate_aabb(id)
    }

    /// Change the compact-support half-width of an SDF root
    pub fn set_compact_support(&mut self, id: ElementId, support: f64) -> Result<()> {
        let node = self.node_mut(id)?;
        match &mut node.op {
            NodeOp::SdfRoot(functor) => functor.support = support,
            other => {
                return Err(BlobtreeError::Unsupported {
                    operation: "set_compact_support",
                    node: other.name(),
                })
            }
        }
        self.invalidate_aabb(id)
    }
}
