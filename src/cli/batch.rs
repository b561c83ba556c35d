// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Batch rendering of a directory of SCAD files

use crate::config::EngineConfig;
use crate::console::Console;
use crate::engine::ScadEngine;
use crate::pipeline::Pipeline;
use crate::state::EngineState;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

/// Outcome of rendering one file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub success: bool,
    pub error: Option<String>,
    pub console: String,
    pub vertices: usize,
    pub triangles: usize,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub engine: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub files: Vec<FileReport>,
}

impl BatchReport {
    fn from_files(files: Vec<FileReport>) -> Self {
        let succeeded = files.iter().filter(|f| f.success).count();
        Self {
            generated_at: Utc::now(),
            engine: crate::engine_version().to_string(),
            total: files.len(),
            succeeded,
            failed: files.len() - succeeded,
            files,
        }
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize batch report")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }
}

/// All `.scad` files under `dir`, sorted by path
pub fn discover_scad_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        bail!("Not a directory: {}", dir.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map(|s| s == "scad").unwrap_or(false))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    Ok(files)
}

/// Render every file in parallel.
///
/// Each file gets its own pipeline and a discarding console, so diagnostics
/// land only in the per-file report.
pub fn run_batch(files: &[PathBuf], config: &EngineConfig, show_progress: bool) -> BatchReport {
    let progress = show_progress.then(|| {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    });

    let reports: Vec<FileReport> = files
        .par_iter()
        .map(|path| {
            let report = render_one(path, config);
            if let Some(ref pb) = progress {
                pb.inc(1);
            }
            report
        })
        .collect();

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    BatchReport::from_files(reports)
}

fn render_one(path: &Path, config: &EngineConfig) -> FileReport {
    let start = Instant::now();
    let pipeline = Pipeline::with_parts(
        ScadEngine::new(config.clone()),
        Arc::new(EngineState::new()),
        Console::sink(),
    );

    let (success, error, console, vertices, triangles) = match std::fs::read_to_string(path) {
        Ok(source) => {
            let result = pipeline.render(&source, None);
            (
                result.success(),
                (!result.success()).then(|| result.error_message().to_string()),
                result.console_output().to_string(),
                result.vertex_count(),
                result.triangle_count(),
            )
        }
        Err(e) => (false, Some(format!("Failed to read file: {}", e)), String::new(), 0, 0),
    };

    FileReport {
        path: path.to_path_buf(),
        success,
        error,
        console,
        vertices,
        triangles,
        duration_ms: start.elapsed().as_secs_f64() * 1000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, source: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, source).unwrap();
        path
    }

    #[test]
    fn test_discover_only_scad() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        write(dir.path(), "b.scad", "cube(1);");
        write(dir.path(), "notes.txt", "");
        write(&dir.path().join("nested"), "a.scad", "sphere(1);");

        let files = discover_scad_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().unwrap() == "scad"));
    }

    #[test]
    fn test_discover_rejects_file() {
        let dir = TempDir::new().unwrap();
        let file = write(dir.path(), "a.scad", "");
        assert!(discover_scad_files(file).is_err());
    }

    #[test]
    fn test_batch_counts() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            write(dir.path(), "ok.scad", "echo(1); cube(2);"),
            write(dir.path(), "bad.scad", "cube(1"),
            dir.path().join("missing.scad"),
        ];

        let report = run_batch(&files, &EngineConfig::default(), false);
        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 2);

        let ok = &report.files[0];
        assert_eq!(ok.triangles, 12);
        assert!(ok.console.contains("ECHO: 1"));
        assert!(report.files[1].error.as_deref().unwrap().starts_with("parse failed"));
        assert!(report.files[2].error.as_deref().unwrap().starts_with("Failed to read file"));
    }

    #[test]
    fn test_report_json() {
        let dir = TempDir::new().unwrap();
        let report = run_batch(&[write(dir.path(), "a.scad", "cube(1);")], &EngineConfig::default(), false);
        let out = dir.path().join("report.json");
        report.write_json(&out).unwrap();

        let parsed: BatchReport = serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(parsed.total, 1);
        assert_eq!(parsed.files[0].triangles, 12);
    }
}
