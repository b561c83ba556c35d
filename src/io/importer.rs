// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! SCAD file importer

use crate::ast::Program;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Import a .scad file and parse it into a syntax tree
pub fn import_scad_file(path: impl AsRef<Path>) -> Result<Program> {
    let path = path.as_ref();
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read SCAD file: {}", path.display()))?;

    super::parse_scad(&source).with_context(|| format!("Failed to parse SCAD file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_import_scad_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "cube([10, 10, 10]);")?;

        let program = import_scad_file(file.path())?;
        assert_eq!(program.statements.len(), 1);

        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let err = import_scad_file("/nonexistent/model.scad").unwrap_err();
        assert!(err.to_string().contains("Failed to read SCAD file"));
    }
}
