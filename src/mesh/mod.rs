//! Polygonizer output
//!
//! An indexed triangle mesh in f32 with per-vertex normal and material
//! channels, plus topology statistics and Wavefront OBJ export.

mod obj;
mod topology;

pub use obj::{export_obj, write_obj, ObjConfig};
pub use topology::{EdgeKey, MeshTopology};

use crate::material::Material;
use glam::{DVec3, Vec3};
use serde::{Deserialize, Serialize};

/// Vertex with position, outward normal and blended material
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshVertex {
    /// Position in 3D space
    pub position: Vec3,
    /// Outward unit normal
    pub normal: Vec3,
    /// Base color (RGB, linear space)
    pub color: [f32; 3],
    /// Roughness factor
    pub roughness: f32,
    /// Metallic factor
    pub metalness: f32,
}

impl MeshVertex {
    /// Vertex from field-space quantities
    pub fn new(position: DVec3, normal: DVec3, material: &Material) -> Self {
        MeshVertex {
            position: position.as_vec3(),
            normal: normal.as_vec3(),
            color: material.color_f32(),
            roughness: material.roughness as f32,
            metalness: material.metalness as f32,
        }
    }
}

/// Indexed triangle mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Mesh vertices
    pub vertices: Vec<MeshVertex>,
    /// Triangle indices, three per face, counter-clockwise seen from outside
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// True when the mesh has no triangle
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Append a vertex and return its index
    #[inline]
    pub fn push_vertex(&mut self, vertex: MeshVertex) -> u32 {
        self.vertices.push(vertex);
        (self.vertices.len() - 1) as u32
    }

    /// Append a triangle
    #[inline]
    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Append another mesh, offsetting its indices
    pub fn append(&mut self, other: Mesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend(other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    /// Axis-aligned bounds of the vertices, `None` for an empty mesh
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = self.vertices.first()?.position;
        Some(self.vertices.iter().fold((first, first), |(lo, hi), v| {
            (lo.min(v.position), hi.max(v.position))
        }))
    }

    /// Topology statistics
    pub fn topology(&self) -> MeshTopology {
        MeshTopology::of(self)
    }

    /// Every edge shared by exactly two faces
    pub fn is_closed(&self) -> bool {
        self.topology().is_closed()
    }

    /// `V - E + F`
    pub fn euler_characteristic(&self) -> i64 {
        self.topology().euler_characteristic()
    }

    /// Number of edge-connected face groups
    pub fn connected_components(&self) -> usize {
        self.topology().components
    }
}

/// Concatenate meshes into one
pub fn merge_meshes(meshes: Vec<Mesh>) -> Mesh {
    let total_vertices: usize = meshes.iter().map(|m| m.vertices.len()).sum();
    let total_indices: usize = meshes.iter().map(|m| m.indices.len()).sum();
    let mut merged = Mesh {
        vertices: Vec::with_capacity(total_vertices),
        indices: Vec::with_capacity(total_indices),
    };
    for mesh in meshes {
        merged.append(mesh);
    }
    merged
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Unit tetrahedron with outward winding
    pub(crate) fn tetrahedron(offset: Vec3) -> Mesh {
        let m = Material::default();
        let p = [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(0.0, 0.0, 1.0),
        ];
        let mut mesh = Mesh::new();
        for q in p {
            mesh.push_vertex(MeshVertex::new(q + offset.as_dvec3(), q, &m));
        }
        mesh.push_triangle(0, 2, 1);
        mesh.push_triangle(0, 1, 3);
        mesh.push_triangle(0, 3, 2);
        mesh.push_triangle(1, 2, 3);
        mesh
    }

    #[test]
    fn test_merge_offsets_indices() {
        let merged = merge_meshes(vec![tetrahedron(Vec3::ZERO), tetrahedron(Vec3::splat(5.0))]);
        assert_eq!(merged.vertex_count(), 8);
        assert_eq!(merged.triangle_count(), 8);
        assert_eq!(&merged.indices[12..15], &[4, 6, 5]);
        assert_eq!(merged.connected_components(), 2);
    }

    #[test]
    fn test_bounds() {
        assert!(Mesh::new().bounds().is_none());
        let (lo, hi) = tetrahedron(Vec3::ONE).bounds().unwrap();
        assert_eq!(lo, Vec3::ONE);
        assert_eq!(hi, Vec3::splat(2.0));
    }
}
