//! Topology statistics
//!
//! Counts edges by undirected key to decide closedness, checks that every
//! directed edge is matched by its reverse (consistent winding), and groups
//! faces into edge-connected components with a union-find.

use super::Mesh;
use std::collections::HashMap;

/// Edge key for hash map lookup (order-independent)
#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
pub struct EdgeKey(pub u32, pub u32);

impl EdgeKey {
    /// Key of the undirected edge `a-b`
    pub fn new(a: u32, b: u32) -> Self {
        if a <= b {
            EdgeKey(a, b)
        } else {
            EdgeKey(b, a)
        }
    }
}

/// Topology report of a triangle mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshTopology {
    /// Vertices referenced by at least one face
    pub vertices: usize,
    /// Distinct undirected edges
    pub edges: usize,
    /// Faces
    pub faces: usize,
    /// Edges used by a single face
    pub boundary_edges: usize,
    /// Edges used by more than two faces
    pub non_manifold_edges: usize,
    /// Directed edges used twice in the same direction
    pub inconsistent_edges: usize,
    /// Edge-connected face groups
    pub components: usize,
}

impl MeshTopology {
    /// Analyze `mesh`
    pub fn of(mesh: &Mesh) -> Self {
        let faces = mesh.indices.len() / 3;
        let mut edge_faces: HashMap<EdgeKey, Vec<usize>> = HashMap::new();
        let mut directed: HashMap<(u32, u32), u32> = HashMap::new();
        let mut used = vec![false; mesh.vertices.len()];

        for (f, tri) in mesh.indices.chunks_exact(3).enumerate() {
            for k in 0..3 {
                let (a, b) = (tri[k], tri[(k + 1) % 3]);
                edge_faces.entry(EdgeKey::new(a, b)).or_default().push(f);
                *directed.entry((a, b)).or_insert(0) += 1;
                if let Some(u) = used.get_mut(a as usize) {
                    *u = true;
                }
            }
        }

        let mut components = DisjointSet::new(faces);
        for shared in edge_faces.values() {
            for pair in shared.windows(2) {
                components.union(pair[0], pair[1]);
            }
        }

        MeshTopology {
            vertices: used.iter().filter(|&&u| u).count(),
            edges: edge_faces.len(),
            faces,
            boundary_edges: edge_faces.values().filter(|f| f.len() == 1).count(),
            non_manifold_edges: edge_faces.values().filter(|f| f.len() > 2).count(),
            inconsistent_edges: directed.values().filter(|&&c| c > 1).count(),
            components: components.count(),
        }
    }

    /// Every edge shared by exactly two faces
    pub fn is_closed(&self) -> bool {
        self.faces > 0 && self.boundary_edges == 0 && self.non_manifold_edges == 0
    }

    /// Closed with every pair of neighboring faces wound the same way
    pub fn is_consistently_oriented(&self) -> bool {
        self.is_closed() && self.inconsistent_edges == 0
    }

    /// `V - E + F` (2 per genus-0 closed component)
    pub fn euler_characteristic(&self) -> i64 {
        self.vertices as i64 - self.edges as i64 + self.faces as i64
    }
}

impl std::fmt::Display for MeshTopology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Mesh Topology")?;
        writeln!(f, "  V/E/F: {}/{}/{}", self.vertices, self.edges, self.faces)?;
        writeln!(f, "  Euler characteristic: {}", self.euler_characteristic())?;
        writeln!(f, "  Boundary edges: {}", self.boundary_edges)?;
        writeln!(f, "  Non-manifold edges: {}", self.non_manifold_edges)?;
        writeln!(f, "  Inconsistent edges: {}", self.inconsistent_edges)?;
        write!(f, "  Components: {}", self.components)
    }
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        DisjointSet {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra] = rb;
        }
    }

    fn count(&mut self) -> usize {
        (0..self.parent.len()).filter(|&i| self.find(i) == i).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tests::tetrahedron;
    use glam::Vec3;

    #[test]
    fn test_tetrahedron_is_closed_sphere() {
        let topo = tetrahedron(Vec3::ZERO).topology();
        assert!(topo.is_closed());
        assert!(topo.is_consistently_oriented());
        assert_eq!(topo.euler_characteristic(), 2);
        assert_eq!(topo.components, 1);
    }

    #[test]
    fn test_open_and_flipped() {
        let mut mesh = tetrahedron(Vec3::ZERO);
        mesh.indices.truncate(9);
        let topo = mesh.topology();
        assert!(!topo.is_closed());
        assert_eq!(topo.boundary_edges, 3);

        let mut flipped = tetrahedron(Vec3::ZERO);
        flipped.indices.swap(0, 1);
        let topo = flipped.topology();
        assert!(topo.is_closed());
        assert!(!topo.is_consistently_oriented());
    }

    #[test]
    fn test_edge_key_order_independent() {
        assert_eq!(EdgeKey::new(3, 1), EdgeKey::new(1, 3));
    }
}
