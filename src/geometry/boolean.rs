// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Bounding-volume boolean operations
//!
//! Exact CSG belongs to an external kernel. The reference engine decides
//! booleans from operand bounding boxes only: unions keep every operand,
//! differences remove the base when a subtrahend encloses it, intersections
//! vanish when operands are disjoint. Partial overlaps keep the conservative
//! operand unchanged.

use super::Geometry;
use serde::{Deserialize, Serialize};

const TOLERANCE: f64 = 1e-9;

/// Boolean operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanOp {
    Union,
    Difference,
    Intersection,
}

impl BooleanOp {
    /// Combine already evaluated operands, first operand first
    pub fn apply(self, operands: Vec<Geometry>) -> Geometry {
        match self {
            Self::Union => union(operands),
            Self::Difference => difference(operands),
            Self::Intersection => intersection(operands),
        }
    }
}

fn union(operands: Vec<Geometry>) -> Geometry {
    let parts: Vec<Geometry> = operands.into_iter().filter(|g| !g.is_empty()).collect();
    match parts.len() {
        0 => Geometry::Empty,
        1 => parts.into_iter().next().unwrap_or(Geometry::Empty),
        _ => Geometry::Group(parts),
    }
}

fn difference(operands: Vec<Geometry>) -> Geometry {
    let mut operands = operands.into_iter();
    let Some(base) = operands.next() else {
        return Geometry::Empty;
    };
    let Some(base_box) = base.bounding_box() else {
        return Geometry::Empty;
    };

    for subtrahend in operands {
        if let Some(cut) = subtrahend.bounding_box() {
            if cut.contains(&base_box, TOLERANCE) {
                return Geometry::Empty;
            }
        }
    }

    base
}

fn intersection(operands: Vec<Geometry>) -> Geometry {
    if operands.is_empty() {
        return Geometry::Empty;
    }

    let mut boxes = Vec::with_capacity(operands.len());
    for operand in &operands {
        match operand.bounding_box() {
            Some(bbox) => boxes.push(bbox),
            None => return Geometry::Empty,
        }
    }

    for (i, a) in boxes.iter().enumerate() {
        if boxes[i + 1..].iter().any(|b| !a.overlaps(b, TOLERANCE)) {
            return Geometry::Empty;
        }
    }

    // Keep the operand enclosed by all others, else the first one
    let innermost = boxes
        .iter()
        .position(|inner| boxes.iter().all(|outer| outer.contains(inner, TOLERANCE)))
        .unwrap_or(0);

    operands
        .into_iter()
        .nth(innermost)
        .unwrap_or(Geometry::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use nalgebra::{Matrix4, Vector3};

    fn cube_at(size: f64, offset: [f64; 3]) -> Geometry {
        let mut mesh = Primitive::cube(Vector3::new(size, size, size), false)
            .to_polyset()
            .unwrap();
        mesh.transform(&Matrix4::new_translation(&Vector3::new(offset[0], offset[1], offset[2])));
        Geometry::Mesh(mesh)
    }

    #[test]
    fn test_union_groups_operands() {
        let result = BooleanOp::Union.apply(vec![cube_at(10.0, [0.0; 3]), cube_at(10.0, [20.0, 0.0, 0.0])]);
        assert!(matches!(&result, Geometry::Group(parts) if parts.len() == 2));

        let single = BooleanOp::Union.apply(vec![Geometry::Empty, cube_at(1.0, [0.0; 3])]);
        assert!(matches!(single, Geometry::Mesh(_)));
    }

    #[test]
    fn test_difference_with_enclosing_cut_is_empty() {
        let result = BooleanOp::Difference.apply(vec![
            cube_at(10.0, [0.0; 3]),
            cube_at(20.0, [-5.0, -5.0, -5.0]),
        ]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_difference_with_partial_cut_keeps_base() {
        let base = cube_at(10.0, [0.0; 3]);
        let result = BooleanOp::Difference.apply(vec![base.clone(), cube_at(5.0, [8.0, 0.0, 0.0])]);
        assert_eq!(result, base);
    }

    #[test]
    fn test_intersection() {
        let disjoint = BooleanOp::Intersection.apply(vec![
            cube_at(10.0, [0.0; 3]),
            cube_at(10.0, [30.0, 0.0, 0.0]),
        ]);
        assert!(disjoint.is_empty());

        let inner = cube_at(2.0, [4.0, 4.0, 4.0]);
        let nested = BooleanOp::Intersection.apply(vec![cube_at(10.0, [0.0; 3]), inner.clone()]);
        assert_eq!(nested, inner);
    }
}
