// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Polygon mesh (vertices plus arbitrary polygonal faces)

use super::BoundingBox;
use anyhow::{bail, Result};
use nalgebra::{Matrix4, Point3};
use serde::{Deserialize, Serialize};

/// Polygon mesh whose faces may have any number of vertices.
///
/// Faces index into `vertices` and are wound counter-clockwise when seen
/// from outside the solid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolySet {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<Vec<usize>>,
}

impl PolySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
        }
    }

    pub fn from_parts(vertices: Vec<Point3<f64>>, faces: Vec<Vec<usize>>) -> Self {
        Self { vertices, faces }
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, position: Point3<f64>) -> usize {
        let index = self.vertices.len();
        self.vertices.push(position);
        index
    }

    pub fn add_face(&mut self, face: Vec<usize>) {
        self.faces.push(face);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// A mesh without faces carries no surface, whatever its vertex list
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Every face has exactly three vertices
    pub fn is_triangular(&self) -> bool {
        self.faces.iter().all(|face| face.len() == 3)
    }

    /// Check that every face index refers to an existing vertex
    pub fn validate(&self) -> Result<()> {
        let count = self.vertices.len();
        for (face_index, face) in self.faces.iter().enumerate() {
            if let Some(&bad) = face.iter().find(|&&index| index >= count) {
                bail!(
                    "face {} references vertex {} but the mesh has only {} vertices",
                    face_index,
                    bad,
                    count
                );
            }
        }
        Ok(())
    }

    /// Transform all vertices.
    ///
    /// A mirroring matrix turns faces inside out, so their winding is
    /// reversed to keep them facing outwards.
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for vertex in &mut self.vertices {
            *vertex = matrix.transform_point(vertex);
        }

        if matrix.fixed_view::<3, 3>(0, 0).determinant() < 0.0 {
            for face in &mut self.faces {
                face.reverse();
            }
        }
    }

    /// Append another mesh, offsetting its face indices
    pub fn append(&mut self, other: &PolySet) {
        let offset = self.vertices.len();
        self.vertices.extend_from_slice(&other.vertices);
        self.faces.extend(
            other
                .faces
                .iter()
                .map(|face| face.iter().map(|index| index + offset).collect()),
        );
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn quad() -> PolySet {
        PolySet::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![vec![0, 1, 2, 3]],
        )
    }

    #[test]
    fn test_triangular_detection() {
        let mut mesh = quad();
        assert!(!mesh.is_triangular());
        assert!(!mesh.is_empty());

        mesh.faces = vec![vec![0, 1, 2], vec![0, 2, 3]];
        assert!(mesh.is_triangular());

        assert!(PolySet::new().is_empty());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut mesh = quad();
        assert!(mesh.validate().is_ok());

        mesh.faces.push(vec![0, 1, 7]);
        let err = mesh.validate().unwrap_err().to_string();
        assert!(err.contains("vertex 7"), "{}", err);
    }

    #[test]
    fn test_append_offsets_indices() {
        let mut mesh = quad();
        mesh.append(&quad());

        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.faces[1], vec![4, 5, 6, 7]);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_mirror_reverses_winding() {
        let mut mesh = quad();
        mesh.transform(&Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0)));

        assert_eq!(mesh.faces[0], vec![3, 2, 1, 0]);
        assert_eq!(mesh.vertices[1], Point3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_translation_keeps_winding() {
        let mut mesh = quad();
        mesh.transform(&Matrix4::new_translation(&Vector3::new(0.0, 0.0, 5.0)));

        assert_eq!(mesh.faces[0], vec![0, 1, 2, 3]);
        assert_eq!(mesh.bounding_box().min.z, 5.0);
    }
}
