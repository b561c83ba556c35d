// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh extraction: triangulated polygon mesh to flat GPU buffers

use crate::geometry::PolySet;
use crate::result::MeshBuffers;
use nalgebra::Vector3;

/// Normal assigned to vertices no valid triangle touches
pub const DEFAULT_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];

/// Flatten a triangulated mesh into position, normal and index buffers.
///
/// Only the first three indices of each face are read; faces are expected to
/// be triangles already. Faces with fewer than three vertices, or referencing
/// a vertex the mesh does not have, are skipped. Vertex normals are the
/// unweighted sum of adjacent unit face normals, renormalized; degenerate
/// triangles still emit their indices but add nothing to the normals.
pub fn extract_mesh(mesh: &PolySet) -> MeshBuffers {
    let vertex_count = mesh.vertex_count();

    let mut positions = Vec::with_capacity(vertex_count * 3);
    for vertex in &mesh.vertices {
        positions.extend_from_slice(&[vertex.x as f32, vertex.y as f32, vertex.z as f32]);
    }

    let mut accumulated = vec![Vector3::<f64>::zeros(); vertex_count];
    let mut indices = Vec::with_capacity(mesh.face_count() * 3);

    for face in &mesh.faces {
        let Some(triangle) = face_triangle(face, vertex_count) else {
            continue;
        };
        indices.extend(triangle.iter().map(|&i| i as u32));

        let [i0, i1, i2] = triangle;
        let v0 = mesh.vertices[i0];
        let normal = (mesh.vertices[i1] - v0).cross(&(mesh.vertices[i2] - v0));
        let length = normal.norm();
        if length > 0.0 {
            let unit = normal / length;
            for index in triangle {
                accumulated[index] += unit;
            }
        }
    }

    let mut normals = Vec::with_capacity(vertex_count * 3);
    for sum in &accumulated {
        let length = sum.norm();
        if length > 0.0 {
            let unit = sum / length;
            normals.extend_from_slice(&[unit.x as f32, unit.y as f32, unit.z as f32]);
        } else {
            normals.extend_from_slice(&DEFAULT_NORMAL);
        }
    }

    MeshBuffers {
        positions,
        normals,
        indices,
    }
}

/// First three indices of a face, if it has them and they are addressable
fn face_triangle(face: &[usize], vertex_count: usize) -> Option<[usize; 3]> {
    let triangle = [*face.first()?, *face.get(1)?, *face.get(2)?];
    let addressable = triangle
        .iter()
        .all(|&i| i < vertex_count && u32::try_from(i).is_ok());
    addressable.then_some(triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn tetrahedron() -> PolySet {
        PolySet::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            vec![vec![0, 2, 1], vec![0, 1, 3], vec![0, 3, 2], vec![1, 2, 3]],
        )
    }

    fn normal_at(buffers: &MeshBuffers, vertex: usize) -> [f32; 3] {
        [
            buffers.normals[vertex * 3],
            buffers.normals[vertex * 3 + 1],
            buffers.normals[vertex * 3 + 2],
        ]
    }

    #[test]
    fn test_tetrahedron_buffers() {
        let buffers = extract_mesh(&tetrahedron());

        assert_eq!(buffers.vertex_count(), 4);
        assert_eq!(buffers.triangle_count(), 4);
        assert_eq!(buffers.positions.len(), 12);
        assert_eq!(buffers.normals.len(), 12);
        assert_eq!(buffers.indices, vec![0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3]);
        assert_eq!(&buffers.positions[9..12], &[0.0, 0.0, 1.0]);

        // Origin touches the three axis-aligned faces, each pointing outwards
        let n = normal_at(&buffers, 0);
        let expected = -1.0 / 3f32.sqrt();
        assert_relative_eq!(n[0], expected, epsilon = 1e-6);
        assert_relative_eq!(n[1], expected, epsilon = 1e-6);
        assert_relative_eq!(n[2], expected, epsilon = 1e-6);
    }

    #[test]
    fn test_normals_are_unit_length() {
        let buffers = extract_mesh(&tetrahedron());
        for vertex in 0..buffers.vertex_count() {
            let [x, y, z] = normal_at(&buffers, vertex);
            assert_relative_eq!((x * x + y * y + z * z).sqrt(), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_unweighted_average() {
        // A big and a tiny triangle sharing vertex 0 at a right angle; area
        // weighting would tilt the normal toward the big one.
        let mesh = PolySet::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(100.0, 0.0, 0.0),
                Point3::new(0.0, 100.0, 0.0),
                Point3::new(0.0, 0.0, 0.01),
                Point3::new(0.0, 0.01, 0.0),
            ],
            vec![vec![0, 1, 2], vec![0, 3, 4]],
        );
        let n = normal_at(&extract_mesh(&mesh), 0);

        let expected = 1.0 / 2f32.sqrt();
        assert_relative_eq!(n[0], -expected, epsilon = 1e-6);
        assert_relative_eq!(n[1], 0.0, epsilon = 1e-6);
        assert_relative_eq!(n[2], expected, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_triangle_keeps_indices_and_spares_neighbours() {
        let mut mesh = tetrahedron();
        let clean = extract_mesh(&mesh);

        // Two distinct vertices, one repeated
        mesh.faces.push(vec![1, 2, 2]);
        let buffers = extract_mesh(&mesh);

        assert_eq!(buffers.triangle_count(), 5);
        assert_eq!(&buffers.indices[12..15], &[1, 2, 2]);
        assert_eq!(buffers.normals, clean.normals);
    }

    #[test]
    fn test_untouched_vertex_gets_default_normal() {
        let mut mesh = tetrahedron();
        mesh.add_vertex(Point3::new(5.0, 5.0, 5.0));
        let buffers = extract_mesh(&mesh);

        assert_eq!(buffers.vertex_count(), 5);
        assert_eq!(normal_at(&buffers, 4), DEFAULT_NORMAL);
    }

    #[test]
    fn test_short_and_dangling_faces_are_skipped() {
        let mut mesh = tetrahedron();
        mesh.faces.push(vec![0, 1]);
        mesh.faces.push(vec![]);
        mesh.faces.push(vec![0, 1, 42]);
        let buffers = extract_mesh(&mesh);

        assert_eq!(buffers.triangle_count(), 4);
        assert!(buffers.indices.iter().all(|&i| (i as usize) < buffers.vertex_count()));
    }

    #[test]
    fn test_only_first_three_indices_of_polygon_are_read() {
        let mesh = PolySet::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![vec![0, 1, 2, 3]],
        );
        let buffers = extract_mesh(&mesh);

        assert_eq!(buffers.indices, vec![0, 1, 2]);
        assert_eq!(normal_at(&buffers, 3), DEFAULT_NORMAL);
        assert_eq!(normal_at(&buffers, 0), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_empty_mesh() {
        let buffers = extract_mesh(&PolySet::new());
        assert_eq!(buffers, MeshBuffers::default());
    }
}
