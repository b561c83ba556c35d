// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Modeling engine seam
//!
//! The render pipeline only sequences stages; everything that understands
//! the modeling language sits behind [`Engine`]. Stages receive the
//! [`Console`] so diagnostic text (echo output, warnings, errors) lands in the
//! render result.

mod scad;

pub use scad::ScadEngine;

use crate::console::Console;
use crate::geometry::PolySet;
use anyhow::Result;

/// Parser, instantiator, geometry evaluator and tessellator of a modeling
/// language.
///
/// Intermediate artifacts are owned by the pipeline for the duration of one
/// render and dropped before it returns.
pub trait Engine {
    type Ast;
    type SceneGraph;
    type Geometry;

    /// One-time setup, run before the first render
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn parse(&self, source: &str, console: &Console) -> Result<Self::Ast>;

    fn instantiate(&self, ast: &Self::Ast, console: &Console) -> Result<Self::SceneGraph>;

    fn evaluate_geometry(&self, scene: &Self::SceneGraph, console: &Console) -> Result<Self::Geometry>;

    /// Flatten evaluated geometry; `None` when there is nothing to flatten
    fn to_polygon_set(&self, geometry: &Self::Geometry) -> Option<PolySet>;

    /// Split faces into triangles; `None` when that is not possible
    fn tessellate(&self, mesh: &PolySet) -> Option<PolySet>;
}
