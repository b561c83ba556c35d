// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - polygon meshes, primitives and tessellation

mod bbox;
mod boolean;
mod polyset;
mod primitives;
mod tessellate;

pub use bbox::BoundingBox;
pub use boolean::BooleanOp;
pub use polyset::PolySet;
pub use primitives::{Primitive, MAX_FRAGMENTS, MIN_FRAGMENTS};
pub use tessellate::{tessellate, triangulate_face};

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

/// Evaluated geometry: a tree of polygon meshes.
///
/// Groups are what unions evaluate to; their parts are kept apart until the
/// geometry is flattened into a single [`PolySet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Empty,
    Mesh(PolySet),
    Group(Vec<Geometry>),
}

impl Geometry {
    /// True when no part carries a face
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Mesh(mesh) => mesh.is_empty(),
            Self::Group(parts) => parts.iter().all(Geometry::is_empty),
        }
    }

    /// Box around every vertex, `None` for empty geometry
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut bbox = BoundingBox::empty();
        self.visit_meshes(&mut |mesh| {
            if !mesh.is_empty() {
                bbox.merge(&mesh.bounding_box());
            }
        });
        bbox.is_valid().then_some(bbox)
    }

    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        match self {
            Self::Empty => {}
            Self::Mesh(mesh) => mesh.transform(matrix),
            Self::Group(parts) => parts.iter_mut().for_each(|part| part.transform(matrix)),
        }
    }

    /// Flatten into one polygon mesh; `None` when there is nothing to flatten
    pub fn to_polyset(&self) -> Option<PolySet> {
        if matches!(self, Self::Empty) {
            return None;
        }

        let mut result = PolySet::new();
        self.visit_meshes(&mut |mesh| result.append(mesh));
        Some(result)
    }

    fn visit_meshes(&self, visit: &mut impl FnMut(&PolySet)) {
        match self {
            Self::Empty => {}
            Self::Mesh(mesh) => visit(mesh),
            Self::Group(parts) => parts.iter().for_each(|part| part.visit_meshes(visit)),
        }
    }
}
