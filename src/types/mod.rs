//! Core value types for blobtree
//!
//! Defines the identifiers, bounding boxes, thick vertices and the field
//! result record shared by every element of the tree.

use glam::DVec3;
use serde::{Deserialize, Serialize};

mod aabb;
mod sample;

pub use aabb::Aabb;
pub use sample::FieldSample;

/// Handle to an element stored in a [`Blobtree`](crate::tree::Blobtree)
///
/// The generation guards against reusing a handle after the element it named
/// was destroyed and its slot recycled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ElementId {
    pub(crate) fn new(index: usize, generation: u32) -> Self {
        ElementId {
            index: index as u32,
            generation,
        }
    }

    /// Slot index inside the arena
    #[inline(always)]
    pub fn index(self) -> usize {
        self.index as usize
    }

    /// Generation of the slot when this handle was issued
    #[inline(always)]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// A primitive vertex: position plus field radius of influence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThickVertex {
    /// Position in world space
    pub position: DVec3,
    /// Thickness (the field reaches `density` at this distance)
    pub thickness: f64,
}

impl ThickVertex {
    /// Create a new vertex
    pub fn new(position: DVec3, thickness: f64) -> Self {
        ThickVertex {
            position,
            thickness,
        }
    }
}

/// Sphere used to query accuracy oracles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalSphere {
    /// Center of the query region
    pub center: DVec3,
    /// Radius of the query region
    pub radius: f64,
}

impl EvalSphere {
    /// Create a new query sphere
    pub fn new(center: DVec3, radius: f64) -> Self {
        EvalSphere { center, radius }
    }

    /// Smallest sphere enclosing a box
    pub fn enclosing(aabb: &Aabb) -> Self {
        EvalSphere {
            center: aabb.center(),
            radius: aabb.half_extents().length(),
        }
    }
}

/// Coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// X axis
    X,
    /// Y axis
    Y,
    /// Z axis
    Z,
}

impl Axis {
    /// Component of `v` along this axis
    #[inline(always)]
    pub fn of(self, v: DVec3) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }
}
