// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! GLTF/GLB exporter

use crate::result::MeshBuffers;
use anyhow::{bail, Context, Result};
use serde_json::json;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const GLB_MAGIC: u32 = 0x4654_6C67; // "glTF"
const CHUNK_JSON: u32 = 0x4E4F_534A; // "JSON"
const CHUNK_BIN: u32 = 0x004E_4942; // "BIN\0"

/// Export mesh to GLTF with a `.bin` buffer next to it
pub fn export_gltf(mesh: &MeshBuffers, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let bin_path = path.with_extension("bin");
    let bin_name = bin_path
        .file_name()
        .and_then(|name| name.to_str())
        .context("GLTF output path has no file name")?;

    let (document, buffer_data) = create_gltf_json(mesh, Some(bin_name))?;

    let json_string = serde_json::to_string_pretty(&document)?;
    std::fs::write(path, json_string)
        .with_context(|| format!("Failed to write GLTF file: {}", path.display()))?;
    std::fs::write(&bin_path, buffer_data)
        .with_context(|| format!("Failed to write GLTF buffer: {}", bin_path.display()))?;

    Ok(())
}

/// Export mesh to GLB (binary GLTF)
pub fn export_glb(mesh: &MeshBuffers, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create GLB file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_glb(mesh, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write a GLB container to any writer
pub fn write_glb<W: Write>(mesh: &MeshBuffers, writer: &mut W) -> Result<()> {
    let (document, buffer_data) = create_gltf_json(mesh, None)?;

    let json_string = serde_json::to_string(&document)?;
    let json_length = align_to_multiple_of_four(json_string.len());
    let buffer_length = align_to_multiple_of_four(buffer_data.len());
    let total_length = 12 + 8 + json_length + 8 + buffer_length;
    let total_length = u32::try_from(total_length).context("Mesh too large for a GLB container")?;

    // Header
    writer.write_all(&GLB_MAGIC.to_le_bytes())?;
    writer.write_all(&2u32.to_le_bytes())?;
    writer.write_all(&total_length.to_le_bytes())?;

    // JSON chunk, padded with spaces
    writer.write_all(&(json_length as u32).to_le_bytes())?;
    writer.write_all(&CHUNK_JSON.to_le_bytes())?;
    writer.write_all(json_string.as_bytes())?;
    writer.write_all(&vec![b' '; json_length - json_string.len()])?;

    // BIN chunk, padded with zeros
    writer.write_all(&(buffer_length as u32).to_le_bytes())?;
    writer.write_all(&CHUNK_BIN.to_le_bytes())?;
    writer.write_all(&buffer_data)?;
    writer.write_all(&vec![0u8; buffer_length - buffer_data.len()])?;

    Ok(())
}

fn create_gltf_json(mesh: &MeshBuffers, bin_uri: Option<&str>) -> Result<(serde_json::Value, Vec<u8>)> {
    if mesh.indices.is_empty() {
        bail!("Cannot export a mesh without triangles");
    }

    let mut buffer_data = Vec::with_capacity(
        (mesh.positions.len() + mesh.normals.len() + mesh.indices.len()) * 4,
    );

    let position_offset = buffer_data.len();
    for value in &mesh.positions {
        buffer_data.extend_from_slice(&value.to_le_bytes());
    }
    let position_length = buffer_data.len() - position_offset;

    let normal_offset = buffer_data.len();
    for value in &mesh.normals {
        buffer_data.extend_from_slice(&value.to_le_bytes());
    }
    let normal_length = buffer_data.len() - normal_offset;

    let indices_offset = buffer_data.len();
    for index in &mesh.indices {
        buffer_data.extend_from_slice(&index.to_le_bytes());
    }
    let indices_length = buffer_data.len() - indices_offset;

    let (min_pos, max_pos) = calculate_bounds(mesh);

    let mut buffer = json!({ "byteLength": buffer_data.len() });
    if let Some(uri) = bin_uri {
        buffer["uri"] = json!(uri);
    }

    let gltf = json!({
        "asset": {
            "generator": concat!("scadmesh ", env!("CARGO_PKG_VERSION")),
            "version": "2.0"
        },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [
            {
                "primitives": [
                    {
                        "attributes": {
                            "POSITION": 0,
                            "NORMAL": 1
                        },
                        "indices": 2,
                        "mode": 4
                    }
                ]
            }
        ],
        "accessors": [
            {
                "bufferView": 0,
                "byteOffset": 0,
                "componentType": 5126,
                "count": mesh.vertex_count(),
                "type": "VEC3",
                "min": min_pos,
                "max": max_pos
            },
            {
                "bufferView": 1,
                "byteOffset": 0,
                "componentType": 5126,
                "count": mesh.vertex_count(),
                "type": "VEC3"
            },
            {
                "bufferView": 2,
                "byteOffset": 0,
                "componentType": 5125,
                "count": mesh.indices.len(),
                "type": "SCALAR"
            }
        ],
        "bufferViews": [
            {
                "buffer": 0,
                "byteOffset": position_offset,
                "byteLength": position_length,
                "target": 34962
            },
            {
                "buffer": 0,
                "byteOffset": normal_offset,
                "byteLength": normal_length,
                "target": 34962
            },
            {
                "buffer": 0,
                "byteOffset": indices_offset,
                "byteLength": indices_length,
                "target": 34963
            }
        ],
        "buffers": [buffer]
    });

    Ok((gltf, buffer_data))
}

fn calculate_bounds(mesh: &MeshBuffers) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];

    for position in mesh.positions.chunks_exact(3) {
        for axis in 0..3 {
            min[axis] = min[axis].min(position[axis]);
            max[axis] = max[axis].max(position[axis]);
        }
    }

    (min, max)
}

fn align_to_multiple_of_four(n: usize) -> usize {
    (n + 3) & !3
}
