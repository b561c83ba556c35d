// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Node.js bindings using napi-rs

use crate::result::RenderResult;
use napi::bindgen_prelude::*;
use napi_derive::napi;

// JS numbers hold every count a mesh can reach without rounding
fn js_count(n: usize) -> f64 {
    n as f64
}

#[napi]
pub struct JsRenderResult {
    inner: RenderResult,
}

#[napi]
impl JsRenderResult {
    #[napi(getter)]
    pub fn success(&self) -> bool {
        self.inner.success()
    }

    #[napi(getter)]
    pub fn error_message(&self) -> String {
        self.inner.error_message().to_string()
    }

    #[napi(getter)]
    pub fn console_output(&self) -> String {
        self.inner.console_output().to_string()
    }

    /// Get vertex count
    #[napi(getter)]
    pub fn vertex_count(&self) -> f64 {
        js_count(self.inner.vertex_count())
    }

    /// Get triangle count
    #[napi(getter)]
    pub fn triangle_count(&self) -> f64 {
        js_count(self.inner.triangle_count())
    }

    #[napi]
    pub fn positions(&self) -> Float32Array {
        Float32Array::new(self.inner.positions().to_vec())
    }

    #[napi]
    pub fn normals(&self) -> Float32Array {
        Float32Array::new(self.inner.normals().to_vec())
    }

    #[napi]
    pub fn indices(&self) -> Uint32Array {
        Uint32Array::new(self.inner.indices().to_vec())
    }

    /// Export to STL file
    #[napi]
    pub fn export_stl(&self, path: String) -> Result<()> {
        crate::io::export_stl(self.inner.mesh(), &path)
            .map_err(|e| Error::from_reason(format!("Export error: {:#}", e)))
    }

    /// Export to GLB file
    #[napi]
    pub fn export_glb(&self, path: String) -> Result<()> {
        crate::io::export_glb(self.inner.mesh(), &path)
            .map_err(|e| Error::from_reason(format!("Export error: {:#}", e)))
    }
}

/// Parse and render SCAD source code
#[napi]
pub fn render(source: String, fonts_path: Option<String>) -> JsRenderResult {
    JsRenderResult {
        inner: crate::render(&source, fonts_path.as_deref()),
    }
}

/// Render SCAD file
#[napi]
pub fn render_file(path: String) -> Result<JsRenderResult> {
    let inner = crate::render_file(&path).map_err(|e| Error::from_reason(format!("Render error: {:#}", e)))?;

    Ok(JsRenderResult { inner })
}

/// Request cancellation of the render in progress
#[napi]
pub fn cancel() {
    crate::request_cancellation();
}

/// Parse SCAD and return JSON AST
#[napi]
pub fn parse_scad(source: String) -> Result<String> {
    let ast = crate::io::parse_scad(&source).map_err(|e| Error::from_reason(format!("Parse error: {:#}", e)))?;

    serde_json::to_string_pretty(&ast).map_err(|e| Error::from_reason(format!("JSON error: {}", e)))
}

/// Get version
#[napi]
pub fn version() -> String {
    crate::engine_version().to_string()
}
