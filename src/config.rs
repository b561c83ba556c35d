// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Engine configuration

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory by [`EngineConfig::load`]
pub const CONFIG_FILE: &str = "scadmesh.toml";

/// Default module nesting limit. It fits the 2 MiB stack that spawned
/// threads get by default; raise it only for callers with larger stacks.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Settings for the reference SCAD engine.
///
/// `fn_`, `fa` and `fs` are the defaults of OpenSCAD's `$fn`, `$fa` and
/// `$fs` special variables that control how finely round primitives are
/// faceted. Source code can still override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed fragment count; 0 derives it from `fa` and `fs`
    #[serde(rename = "fn")]
    pub fn_: u32,
    /// Minimum angle per fragment, in degrees
    pub fa: f64,
    /// Minimum fragment edge length
    pub fs: f64,
    /// Maximum nesting of module calls, builtin or user defined
    pub max_depth: usize,
    /// Font directory, reserved for text support
    pub fonts_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fn_: 0,
            fa: 12.0,
            fs: 2.0,
            max_depth: DEFAULT_MAX_DEPTH,
            fonts_path: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: EngineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load `scadmesh.toml` if present, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = if Path::new(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };

        if let Ok(value) = std::env::var("SCADMESH_FN") {
            config.fn_ = value
                .parse()
                .with_context(|| format!("SCADMESH_FN is not a fragment count: {value:?}"))?;
        }

        if let Ok(value) = std::env::var("SCADMESH_MAX_DEPTH") {
            config.max_depth = value
                .parse()
                .with_context(|| format!("SCADMESH_MAX_DEPTH is not a depth: {value:?}"))?;
        }

        if let Ok(path) = std::env::var("SCADMESH_FONTS_PATH") {
            config.fonts_path = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(self.fa > 0.0 && self.fa.is_finite()) {
            bail!("fa must be a positive angle, got {}", self.fa);
        }
        if !(self.fs > 0.0 && self.fs.is_finite()) {
            bail!("fs must be a positive length, got {}", self.fs);
        }
        if self.max_depth == 0 {
            bail!("max_depth must be at least 1");
        }
        Ok(())
    }
}
