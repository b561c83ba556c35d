// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CLI subsystem for scadmesh

pub mod batch;
pub mod reporter;

pub use batch::{discover_scad_files, run_batch, BatchReport, FileReport};
pub use reporter::Reporter;
