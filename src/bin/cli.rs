// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! scadmesh CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use scadmesh::cli::{discover_scad_files, run_batch, Reporter};
use scadmesh::{io, Console, EngineConfig, EngineState, Pipeline, ScadEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "scadmesh")]
#[command(about = "Render OpenSCAD-style source into triangle meshes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine settings file (defaults to ./scadmesh.toml and the environment)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a SCAD file to a mesh
    Render {
        /// Input SCAD file
        input: PathBuf,

        /// Output file; without one only the summary is printed
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Stl)]
        format: Format,
    },

    /// Parse a SCAD file and output the AST as JSON
    Parse {
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render every .scad file under a directory
    Batch {
        dir: PathBuf,

        /// Write a JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Stl,
    Gltf,
    Glb,
    /// Raw buffers and console text as JSON
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Render { input, output, format } => {
            let config = load_config(cli.config.as_deref())?;
            render_command(input, output.as_deref(), *format, config, cli.verbose)?;
        }
        Commands::Parse { input, output } => {
            parse_command(input, output.as_deref())?;
        }
        Commands::Batch { dir, output } => {
            let config = load_config(cli.config.as_deref())?;
            batch_command(dir, output.as_deref(), &config, cli.verbose)?;
        }
        Commands::Version => {
            println!("{}", scadmesh::engine_version());
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::load()?,
    };
    config.validate().context("Invalid engine configuration")?;
    Ok(config)
}

fn render_command(
    input: &Path,
    output: Option<&Path>,
    format: Format,
    config: EngineConfig,
    verbose: bool,
) -> Result<()> {
    if !input.exists() {
        Reporter::report_error(&format!("Input file not found: {}", input.display()));
        std::process::exit(1);
    }

    let source = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read SCAD file: {}", input.display()))?;

    // Diagnostics come back in the result, so the live console stays quiet
    let pipeline = Pipeline::with_parts(ScadEngine::new(config), Arc::new(EngineState::new()), Console::sink());

    let start = Instant::now();
    let result = pipeline.render(&source, None);
    let duration = start.elapsed();

    Reporter::report_console(result.console_output());
    if verbose || output.is_none() {
        Reporter::report_render(&input.display().to_string(), &result, duration);
    }

    if !result.success() {
        Reporter::report_error(result.error_message());
        std::process::exit(1);
    }

    let Some(output) = output else {
        return Ok(());
    };

    let mesh = result.mesh();
    match format {
        Format::Stl => io::export_stl(mesh, output)?,
        Format::Gltf => io::export_gltf(mesh, output)?,
        Format::Glb => io::export_glb(mesh, output)?,
        Format::Json => {
            let json = serde_json::json!({
                "console": result.console_output(),
                "positions": mesh.positions,
                "normals": mesh.normals,
                "indices": mesh.indices,
            });
            std::fs::write(output, serde_json::to_string(&json)?)
                .with_context(|| format!("Failed to write {}", output.display()))?;
        }
    }

    Reporter::success(&format!("{} -> {}", input.display(), output.display()));
    Ok(())
}

fn parse_command(input: &Path, output: Option<&Path>) -> Result<()> {
    let program = io::import_scad_file(input)?;
    let json = serde_json::to_string_pretty(&program)?;

    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            Reporter::success(&format!("AST written to {}", path.display()));
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn batch_command(dir: &Path, output: Option<&Path>, config: &EngineConfig, verbose: bool) -> Result<()> {
    let files = discover_scad_files(dir)?;
    if files.is_empty() {
        Reporter::report_info(&format!("No .scad files under {}", dir.display()));
        return Ok(());
    }

    let report = run_batch(&files, config, verbose);
    Reporter::report_batch(&report);

    if let Some(path) = output {
        report.write_json(path)?;
        Reporter::report_info(&format!("Report written to {}", path.display()));
    }

    if report.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
