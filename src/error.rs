//! Error types for blobtree
//!
//! Two failure classes surface as errors: precondition violations (misuse of
//! the tree API) and unsupported combinations (documented limitations).
//! Numerical degeneracies are handled where they occur and are reported as
//! [`Degeneracy`](crate::convergence::Degeneracy) outcomes instead.

use crate::types::ElementId;
use thiserror::Error;

/// Blobtree errors
#[derive(Error, Debug)]
pub enum BlobtreeError {
    /// A detached element was evaluated before `prepare_element`
    #[error("element {element} has an invalid AABB; call prepare_element first")]
    InvalidAabb {
        /// Element whose box is out of date
        element: ElementId,
    },

    /// Handle does not name a live element
    #[error("unknown or destroyed element {element}")]
    UnknownElement {
        /// Offending handle
        element: ElementId,
    },

    /// Node cannot hold another child
    #[error("element {element} accepts at most {max} children")]
    ArityExceeded {
        /// Full node
        element: ElementId,
        /// Maximum child count
        max: usize,
    },

    /// Child kind cannot be attached under this parent
    #[error("element {child} cannot be a child of {parent}")]
    IncompatibleChild {
        /// Parent node
        parent: ElementId,
        /// Rejected child
        child: ElementId,
    },

    /// Attaching the child would make an element its own ancestor
    #[error("attaching {child} under {parent} would create a cycle")]
    CycleDetected {
        /// Parent node
        parent: ElementId,
        /// Rejected child
        child: ElementId,
    },

    /// `child` is not attached under `parent`
    #[error("element {child} is not a child of {parent}")]
    NotAChild {
        /// Parent node
        parent: ElementId,
        /// Element expected among its children
        child: ElementId,
    },

    /// Element is not a node (children requested from a leaf)
    #[error("element {element} is not a node")]
    NotANode {
        /// Offending element
        element: ElementId,
    },

    /// Element is not a SCALIS primitive
    #[error("element {element} is not a primitive")]
    NotAPrimitive {
        /// Offending element
        element: ElementId,
    },

    /// Vertex index past the primitive's vertex count
    #[error("vertex {index} out of range for element {element} ({count} vertices)")]
    VertexOutOfRange {
        /// Primitive
        element: ElementId,
        /// Requested vertex
        index: usize,
        /// Vertex count of the primitive
        count: usize,
    },

    /// Trim record arrays do not pair up
    #[error("malformed trim record: {trimmed} trimmed, {parents} parents, {positions} positions")]
    TrimMismatch {
        /// Length of the trimmed array
        trimmed: usize,
        /// Length of the parents array
        parents: usize,
        /// Length of the positions array
        positions: usize,
    },

    /// The root node cannot be detached, destroyed or re-parented
    #[error("the root node cannot be {0}")]
    RootImmutable(&'static str),

    /// Requested output not available on this node kind
    #[error("{operation} is not implemented for {node} nodes")]
    Unsupported {
        /// Requested operation
        operation: &'static str,
        /// Node kind name
        node: &'static str,
    },

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Malformed JSON configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias
pub type Result<T> = std::result::Result<T, BlobtreeError>;
