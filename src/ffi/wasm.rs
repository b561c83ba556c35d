// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! WASM bindings using wasm-bindgen

use crate::io;
use crate::result::RenderResult;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmRenderResult {
    inner: RenderResult,
}

#[wasm_bindgen]
impl WasmRenderResult {
    pub fn success(&self) -> bool {
        self.inner.success()
    }

    pub fn error_message(&self) -> String {
        self.inner.error_message().to_string()
    }

    pub fn console_output(&self) -> String {
        self.inner.console_output().to_string()
    }

    pub fn vertex_count(&self) -> usize {
        self.inner.vertex_count()
    }

    pub fn triangle_count(&self) -> usize {
        self.inner.triangle_count()
    }

    /// Copied into a `Float32Array`
    pub fn positions(&self) -> Vec<f32> {
        self.inner.positions().to_vec()
    }

    /// Copied into a `Float32Array`
    pub fn normals(&self) -> Vec<f32> {
        self.inner.normals().to_vec()
    }

    /// Copied into a `Uint32Array`
    pub fn indices(&self) -> Vec<u32> {
        self.inner.indices().to_vec()
    }

    /// Export to STL format (returns binary data)
    pub fn to_stl(&self) -> Result<Vec<u8>, JsValue> {
        let mut buffer = Vec::new();
        io::write_stl(self.inner.mesh(), &mut buffer)
            .map_err(|e| JsValue::from_str(&format!("STL export error: {:#}", e)))?;
        Ok(buffer)
    }

    /// Export to GLB format (returns binary data)
    pub fn to_glb(&self) -> Result<Vec<u8>, JsValue> {
        let mut buffer = Vec::new();
        io::write_glb(self.inner.mesh(), &mut buffer)
            .map_err(|e| JsValue::from_str(&format!("GLB export error: {:#}", e)))?;
        Ok(buffer)
    }
}

/// Render SCAD source code. Failures are reported through the result.
#[wasm_bindgen]
pub fn render_scad(source: &str) -> WasmRenderResult {
    WasmRenderResult {
        inner: crate::render(source, None),
    }
}

/// Request cancellation of the render in progress
#[wasm_bindgen]
pub fn cancel() {
    crate::request_cancellation();
}

/// Parse SCAD source code and return JSON AST
#[wasm_bindgen]
pub fn parse_scad_to_json(source: &str) -> Result<String, JsValue> {
    let ast = io::parse_scad(source).map_err(|e| JsValue::from_str(&format!("Parse error: {:#}", e)))?;

    serde_json::to_string_pretty(&ast)
        .map_err(|e| JsValue::from_str(&format!("JSON serialization error: {}", e)))
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    crate::engine_version().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_cube() {
        let result = render_scad("cube([10, 10, 10]);");
        assert!(result.success());
        assert_eq!(result.indices().len(), 36);
    }
}
