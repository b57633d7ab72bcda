//! Wavefront OBJ export
//!
//! Positions, optional normals (`vn`) and optional per-vertex colors written
//! as the common `v x y z r g b` extension read by Blender and MeshLab.

use super::Mesh;
use crate::error::Result;
use std::io::Write;
use std::path::Path;

/// OBJ export configuration
#[derive(Debug, Clone)]
pub struct ObjConfig {
    /// Export normals (vn)
    pub export_normals: bool,
    /// Append vertex colors to `v` lines
    pub export_colors: bool,
    /// Object name written in the `o` statement
    pub object_name: String,
}

impl Default for ObjConfig {
    fn default() -> Self {
        ObjConfig {
            export_normals: true,
            export_colors: false,
            object_name: "blobtree".to_string(),
        }
    }
}

/// Write a mesh in OBJ format to any writer
pub fn write_obj(mesh: &Mesh, w: &mut impl Write, config: &ObjConfig) -> std::io::Result<()> {
    writeln!(w, "# blobtree OBJ export")?;
    writeln!(w, "# Vertices: {}", mesh.vertex_count())?;
    writeln!(w, "# Triangles: {}", mesh.triangle_count())?;
    writeln!(w, "o {}", config.object_name)?;

    for v in &mesh.vertices {
        if config.export_colors {
            writeln!(
                w,
                "v {} {} {} {} {} {}",
                v.position.x, v.position.y, v.position.z, v.color[0], v.color[1], v.color[2]
            )?;
        } else {
            writeln!(w, "v {} {} {}", v.position.x, v.position.y, v.position.z)?;
        }
    }
    if config.export_normals {
        for v in &mesh.vertices {
            writeln!(w, "vn {} {} {}", v.normal.x, v.normal.y, v.normal.z)?;
        }
    }

    for tri in mesh.indices.chunks_exact(3) {
        // OBJ is 1-indexed
        let (a, b, c) = (tri[0] + 1, tri[1] + 1, tri[2] + 1);
        if config.export_normals {
            writeln!(w, "f {}//{} {}//{} {}//{}", a, a, b, b, c, c)?;
        } else {
            writeln!(w, "f {} {} {}", a, b, c)?;
        }
    }
    Ok(())
}

/// Export a mesh to an OBJ file
pub fn export_obj(mesh: &Mesh, path: impl AsRef<Path>, config: &ObjConfig) -> Result<()> {
    let file = std::fs::File::create(path.as_ref())?;
    let mut w = std::io::BufWriter::new(file);
    write_obj(mesh, &mut w, config)?;
    w.flush()?;
    Ok(())
}
