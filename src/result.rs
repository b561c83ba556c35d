// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Render result container

use crate::error::RenderError;
use serde::{Deserialize, Serialize};

/// Flat triangle mesh ready for upload to a GPU.
///
/// `positions` and `normals` hold `x, y, z` triples per vertex, `indices`
/// three vertex indices per triangle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshBuffers {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshBuffers {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.indices.is_empty()
    }

    /// Position and normal interleaved per vertex, the layout a shading
    /// pass binds as a single vertex buffer
    pub fn interleaved(&self) -> Vec<ShadingVertex> {
        self.positions
            .chunks_exact(3)
            .zip(self.normals.chunks_exact(3))
            .map(|(p, n)| ShadingVertex {
                position: [p[0], p[1], p[2]],
                normal: [n[0], n[1], n[2]],
            })
            .collect()
    }

    /// Position and normal of one vertex
    pub fn vertex(&self, index: usize) -> Option<([f32; 3], [f32; 3])> {
        let p = self.positions.get(index * 3..index * 3 + 3)?;
        let n = self.normals.get(index * 3..index * 3 + 3)?;
        Some(([p[0], p[1], p[2]], [n[0], n[1], n[2]]))
    }
}

/// Interleaved vertex with C layout
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShadingVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Outcome of one render call.
///
/// Populated exactly once: either with an error and the console text
/// captured before it, or with mesh data. A failed result never carries
/// mesh data. The caller owns the value; [`RenderResult::release`] (or
/// dropping it) frees the buffers, and the borrow checker rules out any use
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderResult {
    error: Option<RenderError>,
    error_message: String,
    console_output: String,
    mesh: MeshBuffers,
}

impl RenderResult {
    pub(crate) fn succeeded(mesh: MeshBuffers, console_output: String) -> Self {
        Self {
            error: None,
            error_message: String::new(),
            console_output,
            mesh,
        }
    }

    pub(crate) fn failed(error: RenderError, console_output: String) -> Self {
        Self {
            error_message: error.to_string(),
            error: Some(error),
            console_output,
            mesh: MeshBuffers::default(),
        }
    }

    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    /// Empty on success
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn error(&self) -> Option<&RenderError> {
        self.error.as_ref()
    }

    /// Everything written to the diagnostic streams during the call
    pub fn console_output(&self) -> &str {
        &self.console_output
    }

    pub fn vertex_count(&self) -> usize {
        self.mesh.vertex_count()
    }

    pub fn triangle_count(&self) -> usize {
        self.mesh.triangle_count()
    }

    pub fn positions(&self) -> &[f32] {
        &self.mesh.positions
    }

    pub fn normals(&self) -> &[f32] {
        &self.mesh.normals
    }

    pub fn indices(&self) -> &[u32] {
        &self.mesh.indices
    }

    pub fn mesh(&self) -> &MeshBuffers {
        &self.mesh
    }

    /// Take the mesh out, consuming the result
    pub fn into_mesh(self) -> MeshBuffers {
        self.mesh
    }

    /// Convert to a `Result`, keeping console text only on success
    pub fn into_result(self) -> Result<(MeshBuffers, String), RenderError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok((self.mesh, self.console_output)),
        }
    }

    /// Free the result. Equivalent to dropping it; spelled out for callers
    /// mirroring the C API.
    pub fn release(self) {}
}
