// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Polygon face tessellation
//!
//! Each face is projected onto the coordinate plane its normal is most
//! aligned with and cut into triangles by ear clipping. Faces whose normal
//! cannot be determined, or that ear clipping cannot finish, are fanned from
//! their first vertex instead.

use super::PolySet;
use nalgebra::{Point3, Vector3};

const EPS: f64 = 1e-12;

/// Triangulate every face of `mesh`.
///
/// Returns `None` when there is nothing to triangulate or a face references
/// a vertex that does not exist. Faces with fewer than three vertices are
/// dropped.
pub fn tessellate(mesh: &PolySet) -> Option<PolySet> {
    if mesh.is_empty() || mesh.validate().is_err() {
        return None;
    }

    let mut result = PolySet::with_capacity(mesh.vertex_count(), mesh.face_count() * 2);
    result.vertices = mesh.vertices.clone();

    for face in &mesh.faces {
        for triangle in triangulate_face(&mesh.vertices, face) {
            result.add_face(triangle.to_vec());
        }
    }

    if result.is_empty() {
        None
    } else {
        Some(result)
    }
}

/// Split one polygon into triangles that keep its winding
pub fn triangulate_face(vertices: &[Point3<f64>], face: &[usize]) -> Vec<[usize; 3]> {
    match face.len() {
        0..=2 => Vec::new(),
        3 => vec![[face[0], face[1], face[2]]],
        _ => {
            let normal = newell_normal(vertices, face);
            if normal.norm() < EPS {
                return fan(face);
            }
            ear_clip(vertices, face, &normal).unwrap_or_else(|| fan(face))
        }
    }
}

fn fan(face: &[usize]) -> Vec<[usize; 3]> {
    (1..face.len() - 1)
        .map(|i| [face[0], face[i], face[i + 1]])
        .collect()
}

/// Polygon normal by Newell's method; robust for non-planar and concave faces
fn newell_normal(vertices: &[Point3<f64>], face: &[usize]) -> Vector3<f64> {
    let mut normal = Vector3::zeros();
    for (i, &current) in face.iter().enumerate() {
        let a = vertices[current];
        let b = vertices[face[(i + 1) % face.len()]];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal
}

fn ear_clip(vertices: &[Point3<f64>], face: &[usize], normal: &Vector3<f64>) -> Option<Vec<[usize; 3]>> {
    // Drop the dominant axis. The sign of that normal component tells us
    // whether the projected polygon runs counter-clockwise.
    let abs = normal.abs();
    let (axis_u, axis_v, sign) = if abs.x >= abs.y && abs.x >= abs.z {
        (1, 2, normal.x.signum())
    } else if abs.y >= abs.z {
        (2, 0, normal.y.signum())
    } else {
        (0, 1, normal.z.signum())
    };

    let projected: Vec<(f64, f64)> = face
        .iter()
        .map(|&index| {
            let p = vertices[index];
            (p[axis_u], p[axis_v] * sign)
        })
        .collect();

    let mut remaining: Vec<usize> = (0..face.len()).collect();
    let mut triangles = Vec::with_capacity(face.len() - 2);

    while remaining.len() > 3 {
        let count = remaining.len();
        let ear = (0..count).find(|&i| {
            let prev = remaining[(i + count - 1) % count];
            let curr = remaining[i];
            let next = remaining[(i + 1) % count];
            is_ear(&projected, &remaining, prev, curr, next)
        })?;

        let prev = remaining[(ear + count - 1) % count];
        let curr = remaining[ear];
        let next = remaining[(ear + 1) % count];
        triangles.push([face[prev], face[curr], face[next]]);
        remaining.remove(ear);
    }

    triangles.push([face[remaining[0]], face[remaining[1]], face[remaining[2]]]);
    Some(triangles)
}

fn is_ear(points: &[(f64, f64)], remaining: &[usize], prev: usize, curr: usize, next: usize) -> bool {
    let (a, b, c) = (points[prev], points[curr], points[next]);
    if cross(a, b, c) <= EPS {
        return false; // reflex or collinear corner
    }

    remaining
        .iter()
        .filter(|&&i| i != prev && i != curr && i != next)
        .all(|&i| !point_in_triangle(points[i], a, b, c))
}

fn cross(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

fn point_in_triangle(p: (f64, f64), a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> bool {
    cross(a, b, p) >= -EPS && cross(b, c, p) >= -EPS && cross(c, a, p) >= -EPS
}
