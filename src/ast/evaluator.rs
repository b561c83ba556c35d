// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Scene graph evaluator - converts nodes to geometry

use super::{Node, NodeKind};
use crate::geometry::{BooleanOp, Geometry};
use anyhow::{Context, Result};
use nalgebra::Matrix4;

/// Walks the scene graph, building primitives and applying transforms
#[derive(Debug, Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a scene graph node into geometry
    pub fn evaluate(&self, node: &Node) -> Result<Geometry> {
        self.evaluate_node(node, &Matrix4::identity())
    }

    fn evaluate_node(&self, node: &Node, transform: &Matrix4<f64>) -> Result<Geometry> {
        match &node.kind {
            NodeKind::Primitive(primitive) => {
                let mut mesh = primitive.to_polyset().with_context(|| {
                    format!("Failed to build {}", node.origin.as_deref().unwrap_or("primitive"))
                })?;
                mesh.transform(transform);
                Ok(Geometry::Mesh(mesh))
            }

            NodeKind::Union(children) => self.evaluate_boolean(children, transform, BooleanOp::Union),

            NodeKind::Difference(children) => {
                self.evaluate_boolean(children, transform, BooleanOp::Difference)
            }

            NodeKind::Intersection(children) => {
                self.evaluate_boolean(children, transform, BooleanOp::Intersection)
            }

            NodeKind::Transform { op, children } => {
                let new_transform = transform * op.to_matrix();
                self.evaluate_boolean(children, &new_transform, BooleanOp::Union)
            }

            NodeKind::Empty => Ok(Geometry::Empty),
        }
    }

    fn evaluate_boolean(
        &self,
        children: &[Node],
        transform: &Matrix4<f64>,
        op: BooleanOp,
    ) -> Result<Geometry> {
        let operands = children
            .iter()
            .map(|child| self.evaluate_node(child, transform))
            .collect::<Result<Vec<_>>>()?;

        Ok(op.apply(operands))
    }
}
