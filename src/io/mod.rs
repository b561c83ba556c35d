// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - parsing, importing, and exporting

mod export_gltf;
mod export_stl;
mod importer;
mod parser;

pub use export_gltf::{export_glb, export_gltf, write_glb};
pub use export_stl::{export_stl, write_stl};
pub use importer::import_scad_file;
pub use parser::parse_scad;
