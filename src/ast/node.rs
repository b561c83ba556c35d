// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Scene graph nodes produced by instantiation

use crate::geometry::Primitive;
use nalgebra::{Matrix4, Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// 3D Vector type alias
pub type Vec3 = Vector3<f64>;

/// Scene graph node representing a single operation or primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    /// Module that produced the node, for diagnostics
    pub origin: Option<String>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self { kind, origin: None }
    }

    pub fn with_origin(kind: NodeKind, origin: impl Into<String>) -> Self {
        Self {
            kind,
            origin: Some(origin.into()),
        }
    }

    pub fn empty() -> Self {
        Self::new(NodeKind::Empty)
    }

    /// Number of nodes in this subtree
    pub fn count(&self) -> usize {
        1 + self.kind.children().iter().map(|c| c.count()).sum::<usize>()
    }
}

/// Types of scene graph nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Primitive(Primitive),

    // Boolean operations
    Union(Vec<Node>),
    Difference(Vec<Node>),
    Intersection(Vec<Node>),

    // Transformations
    Transform {
        op: TransformOp,
        children: Vec<Node>,
    },

    // Empty node
    Empty,
}

impl NodeKind {
    pub fn children(&self) -> &[Node] {
        match self {
            NodeKind::Union(children)
            | NodeKind::Difference(children)
            | NodeKind::Intersection(children)
            | NodeKind::Transform { children, .. } => children,
            NodeKind::Primitive(_) | NodeKind::Empty => &[],
        }
    }
}

/// Transformation operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransformOp {
    Translate(Vec3),
    /// Euler angles in degrees, applied X then Y then Z
    Rotate(Vec3),
    /// Angle in degrees about an arbitrary axis
    RotateAxis { angle: f64, axis: Vec3 },
    Scale(Vec3),
    /// Reflection across the plane through the origin with this normal
    Mirror(Vec3),
    Multmatrix(Matrix4<f64>),
}

impl TransformOp {
    /// Convert transformation to a 4x4 matrix
    pub fn to_matrix(&self) -> Matrix4<f64> {
        match self {
            TransformOp::Translate(v) => Matrix4::new_translation(v),
            TransformOp::Rotate(angles) => {
                let rx = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), angles.x.to_radians());
                let ry = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angles.y.to_radians());
                let rz = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angles.z.to_radians());
                (rz * ry * rx).to_homogeneous()
            }
            TransformOp::RotateAxis { angle, axis } => match Unit::try_new(*axis, 1e-12) {
                Some(axis) => UnitQuaternion::from_axis_angle(&axis, angle.to_radians()).to_homogeneous(),
                None => Matrix4::identity(),
            },
            TransformOp::Scale(s) => Matrix4::new_nonuniform_scaling(s),
            TransformOp::Mirror(normal) => {
                let length_sq = normal.norm_squared();
                if length_sq == 0.0 {
                    return Matrix4::identity();
                }
                let reflection =
                    nalgebra::Matrix3::identity() - (normal * normal.transpose()) * (2.0 / length_sq);
                reflection.to_homogeneous()
            }
            TransformOp::Multmatrix(m) => *m,
        }
    }
}
