// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Binary STL exporter

use crate::result::MeshBuffers;
use anyhow::{bail, Context, Result};
use nalgebra::Vector3;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use stl_io::{Normal, Triangle, Vertex};

/// Export mesh to a binary STL file
pub fn export_stl(mesh: &MeshBuffers, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create STL file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_stl(mesh, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write binary STL to any writer.
///
/// STL stores one normal per facet, so it is recomputed from the triangle's
/// geometry instead of taking the averaged vertex normals.
pub fn write_stl<W: Write>(mesh: &MeshBuffers, writer: &mut W) -> Result<()> {
    if mesh.indices.is_empty() {
        bail!("Cannot export a mesh without triangles");
    }

    let vertex = |index: u32| -> Result<[f32; 3]> {
        mesh.vertex(index as usize)
            .map(|(position, _)| position)
            .with_context(|| format!("Triangle references missing vertex {}", index))
    };

    let mut triangles = Vec::with_capacity(mesh.triangle_count());
    for triangle in mesh.indices.chunks_exact(3) {
        let [v0, v1, v2] = [vertex(triangle[0])?, vertex(triangle[1])?, vertex(triangle[2])?];
        triangles.push(Triangle {
            normal: Normal::new(facet_normal(v0, v1, v2)),
            vertices: [Vertex::new(v0), Vertex::new(v1), Vertex::new(v2)],
        });
    }

    stl_io::write_stl(writer, triangles.iter()).context("Failed to write STL data")?;
    Ok(())
}

fn facet_normal(v0: [f32; 3], v1: [f32; 3], v2: [f32; 3]) -> [f32; 3] {
    let a = Vector3::from(v0);
    let normal = (Vector3::from(v1) - a).cross(&(Vector3::from(v2) - a));
    match normal.try_normalize(f32::EPSILON) {
        Some(n) => [n.x, n.y, n.z],
        None => [0.0, 0.0, 0.0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::NamedTempFile;

    fn square() -> MeshBuffers {
        MeshBuffers {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            normals: [0.0, 0.0, 1.0].repeat(4),
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    #[test]
    fn test_binary_layout() -> Result<()> {
        let mut bytes = Vec::new();
        write_stl(&square(), &mut bytes)?;
        // 80-byte header, triangle count, 50 bytes per triangle
        assert_eq!(bytes.len(), 84 + 2 * 50);
        assert_eq!(u32::from_le_bytes(bytes[80..84].try_into()?), 2);
        Ok(())
    }

    #[test]
    fn test_facet_normals_survive_roundtrip() -> Result<()> {
        let file = NamedTempFile::with_suffix(".stl")?;
        export_stl(&square(), file.path())?;

        let mut reader = Cursor::new(std::fs::read(file.path())?);
        let stl = stl_io::read_stl(&mut reader)?;
        assert_eq!(stl.faces.len(), 2);
        assert_eq!(stl.faces[0].normal, Normal::new([0.0, 0.0, 1.0]));
        Ok(())
    }

    #[test]
    fn test_dangling_index_is_an_error() {
        let mut mesh = square();
        mesh.indices.push(9);
        mesh.indices.extend([0, 1]);
        let mut bytes = Vec::new();
        assert!(write_stl(&mesh, &mut bytes).is_err());
    }
}
