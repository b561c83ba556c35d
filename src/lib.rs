// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! scadmesh
//!
//! Render orchestration for OpenSCAD-style solid modeling source. A render
//! drives parse, instantiate, evaluate, triangulate and extract through an
//! [`Engine`] and returns GPU-ready triangle buffers (positions, unit vertex
//! normals, indices) together with every line of diagnostic text the engine
//! printed.
//!
//! The free functions below share one process-wide pipeline backed by the
//! reference [`ScadEngine`]; use [`Pipeline`] directly for isolated state or
//! a custom engine.

pub mod ast;
pub mod cli;
pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod geometry;
pub mod io;
pub mod pipeline;
pub mod result;
pub mod state;

pub use config::EngineConfig;
pub use console::{CaptureGuard, Console};
pub use engine::{Engine, ScadEngine};
pub use error::RenderError;
pub use geometry::{Geometry, PolySet, Primitive};
pub use io::{export_gltf, export_glb, export_stl, import_scad_file, parse_scad};
pub use pipeline::{extract_mesh, Pipeline, Stage};
pub use result::{MeshBuffers, RenderResult, ShadingVertex};
pub use state::{CancelToken, EngineState};

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::OnceLock;

// NUL-terminated so the C ABI can hand out the same bytes
const VERSION: &str = concat!("scadmesh ", env!("CARGO_PKG_VERSION"), " (OpenSCAD-compatible)\0");

static DEFAULT_PIPELINE: OnceLock<Pipeline<ScadEngine>> = OnceLock::new();

/// Process-wide pipeline; its engine reads `scadmesh.toml` and the
/// environment on first initialization
pub fn default_pipeline() -> &'static Pipeline<ScadEngine> {
    DEFAULT_PIPELINE.get_or_init(|| Pipeline::new(ScadEngine::from_environment()))
}

/// Initialize the default engine. Idempotent; concurrent first calls set
/// it up once.
pub fn initialize_engine() -> std::result::Result<(), RenderError> {
    default_pipeline().initialize()
}

/// Render SCAD source with the default pipeline
pub fn render(source: &str, fonts_path: Option<&str>) -> RenderResult {
    default_pipeline().render(source, fonts_path)
}

/// Render a SCAD file with the default pipeline
pub fn render_file(path: impl AsRef<Path>) -> Result<RenderResult> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read SCAD file: {}", path.display()))?;
    Ok(render(&source, None))
}

/// Ask the render in progress on the default pipeline to stop at its next
/// stage boundary. Requests made while no render runs are cleared by the
/// next render.
pub fn request_cancellation() {
    default_pipeline().request_cancellation();
}

/// Free a result and its buffers
pub fn release(result: RenderResult) {
    result.release();
}

pub fn engine_version() -> &'static str {
    VERSION.trim_end_matches('\0')
}

pub(crate) fn engine_version_c() -> &'static str {
    VERSION
}
