// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometric primitives generator
//!
//! Primitives are emitted as polygon meshes the way OpenSCAD builds them:
//! cube faces are quads, cylinder and sphere caps are n-gons. Turning them
//! into triangles is the tessellator's job.

use super::PolySet;
use anyhow::{bail, Result};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Smallest polygon a round primitive is approximated with
pub const MIN_FRAGMENTS: u32 = 3;

/// Finest polygon a round primitive is approximated with. A sphere at this
/// count already has over half a million vertices.
pub const MAX_FRAGMENTS: u32 = 1024;

/// Geometric primitives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    Cube {
        size: Vector3<f64>,
        center: bool,
    },
    Sphere {
        r: f64,
        fragments: u32,
    },
    Cylinder {
        h: f64,
        r1: f64,
        r2: f64,
        center: bool,
        fragments: u32,
    },
    Polyhedron {
        points: Vec<Point3<f64>>,
        faces: Vec<Vec<usize>>,
    },
}

impl Primitive {
    pub fn cube(size: Vector3<f64>, center: bool) -> Self {
        Self::Cube { size, center }
    }

    pub fn sphere(r: f64, fragments: u32) -> Self {
        Self::Sphere {
            r,
            fragments: fragments.clamp(MIN_FRAGMENTS, MAX_FRAGMENTS),
        }
    }

    pub fn cylinder(h: f64, r1: f64, r2: f64, center: bool, fragments: u32) -> Self {
        Self::Cylinder {
            h,
            r1,
            r2,
            center,
            fragments: fragments.clamp(MIN_FRAGMENTS, MAX_FRAGMENTS),
        }
    }

    pub fn polyhedron(points: Vec<Point3<f64>>, faces: Vec<Vec<usize>>) -> Self {
        Self::Polyhedron { points, faces }
    }

    /// Build the polygon mesh.
    ///
    /// Degenerate sizes (zero or negative extents, zero radius) produce an
    /// empty mesh rather than an error; a polyhedron whose faces reference
    /// missing points is an error.
    pub fn to_polyset(&self) -> Result<PolySet> {
        match self {
            Self::Cube { size, center } => Ok(generate_cube(*size, *center)),
            Self::Sphere { r, fragments } => Ok(generate_sphere(*r, *fragments)),
            Self::Cylinder {
                h,
                r1,
                r2,
                center,
                fragments,
            } => Ok(generate_cylinder(*h, *r1, *r2, *center, *fragments)),
            Self::Polyhedron { points, faces } => generate_polyhedron(points, faces),
        }
    }
}

fn generate_cube(size: Vector3<f64>, center: bool) -> PolySet {
    if size.x <= 0.0 || size.y <= 0.0 || size.z <= 0.0 {
        return PolySet::new();
    }

    let offset = if center { -size / 2.0 } else { Vector3::zeros() };
    let (x, y, z) = (size.x, size.y, size.z);

    let corners = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(x, 0.0, 0.0),
        Point3::new(x, y, 0.0),
        Point3::new(0.0, y, 0.0),
        Point3::new(0.0, 0.0, z),
        Point3::new(x, 0.0, z),
        Point3::new(x, y, z),
        Point3::new(0.0, y, z),
    ];

    let mut mesh = PolySet::with_capacity(8, 6);
    for corner in corners {
        mesh.add_vertex(corner + offset);
    }

    // Counter-clockwise seen from outside
    mesh.add_face(vec![0, 3, 2, 1]); // bottom (z-)
    mesh.add_face(vec![4, 5, 6, 7]); // top (z+)
    mesh.add_face(vec![0, 1, 5, 4]); // front (y-)
    mesh.add_face(vec![3, 7, 6, 2]); // back (y+)
    mesh.add_face(vec![0, 4, 7, 3]); // left (x-)
    mesh.add_face(vec![1, 2, 6, 5]); // right (x+)

    mesh
}

fn ring(mesh: &mut PolySet, radius: f64, z: f64, fragments: u32) -> Vec<usize> {
    (0..fragments)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / fragments as f64;
            mesh.add_vertex(Point3::new(radius * angle.cos(), radius * angle.sin(), z))
        })
        .collect()
}

fn generate_sphere(radius: f64, fragments: u32) -> PolySet {
    if radius <= 0.0 {
        return PolySet::new();
    }

    // Rings sit at the centres of equal latitude bands, so the poles are
    // flat n-gon caps rather than single points.
    let fragments = fragments.clamp(MIN_FRAGMENTS, MAX_FRAGMENTS);
    let rings = (fragments as usize + 1) / 2;
    let vertex_count = rings * fragments as usize;
    let mut mesh = PolySet::with_capacity(vertex_count, vertex_count + 2);

    let ring_indices: Vec<Vec<usize>> = (0..rings)
        .map(|i| {
            let phi = PI * (i as f64 + 0.5) / rings as f64;
            ring(&mut mesh, radius * phi.sin(), radius * phi.cos(), fragments)
        })
        .collect();

    mesh.add_face(ring_indices[0].clone());

    for pair in ring_indices.windows(2) {
        let (upper, lower) = (&pair[0], &pair[1]);
        for j in 0..fragments as usize {
            let next = (j + 1) % fragments as usize;
            mesh.add_face(vec![upper[j], lower[j], lower[next], upper[next]]);
        }
    }

    let mut bottom = ring_indices[ring_indices.len() - 1].clone();
    bottom.reverse();
    mesh.add_face(bottom);

    mesh
}

fn generate_cylinder(height: f64, r1: f64, r2: f64, center: bool, fragments: u32) -> PolySet {
    if height <= 0.0 || r1 < 0.0 || r2 < 0.0 || (r1 <= 0.0 && r2 <= 0.0) {
        return PolySet::new();
    }

    let (z0, z1) = if center {
        (-height / 2.0, height / 2.0)
    } else {
        (0.0, height)
    };
    let fragments = fragments.clamp(MIN_FRAGMENTS, MAX_FRAGMENTS);
    let n = fragments as usize;
    let mut mesh = PolySet::with_capacity(2 * n, n + 2);

    // A zero radius collapses that end of the cylinder into an apex
    let bottom = if r1 > 0.0 {
        ring(&mut mesh, r1, z0, fragments)
    } else {
        vec![mesh.add_vertex(Point3::new(0.0, 0.0, z0))]
    };
    let top = if r2 > 0.0 {
        ring(&mut mesh, r2, z1, fragments)
    } else {
        vec![mesh.add_vertex(Point3::new(0.0, 0.0, z1))]
    };

    if bottom.len() > 1 {
        mesh.add_face(bottom.iter().rev().copied().collect());
    }
    if top.len() > 1 {
        mesh.add_face(top.clone());
    }

    for j in 0..n {
        let next = (j + 1) % n;
        let side = match (bottom.len() > 1, top.len() > 1) {
            (true, true) => vec![bottom[j], bottom[next], top[next], top[j]],
            (true, false) => vec![bottom[j], bottom[next], top[0]],
            (false, true) => vec![bottom[0], top[next], top[j]],
            (false, false) => unreachable!("both radii zero is rejected above"),
        };
        mesh.add_face(side);
    }

    mesh
}

fn generate_polyhedron(points: &[Point3<f64>], faces: &[Vec<usize>]) -> Result<PolySet> {
    for (face_index, face) in faces.iter().enumerate() {
        if let Some(&bad) = face.iter().find(|&&index| index >= points.len()) {
            bail!(
                "polyhedron face {} references point {} but only {} points are defined",
                face_index,
                bad,
                points.len()
            );
        }
    }

    // Polyhedron faces are listed clockwise as seen from outside
    let faces = faces
        .iter()
        .map(|face| face.iter().rev().copied().collect())
        .collect();

    Ok(PolySet::from_parts(points.to_vec(), faces))
}
