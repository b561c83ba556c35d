// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Reference engine for the OpenSCAD subset

use super::Engine;
use crate::ast::{instantiate, Evaluator, Node, Program};
use crate::config::EngineConfig;
use crate::console::Console;
use crate::geometry::{self, Geometry, PolySet};
use crate::io::parse_scad;
use anyhow::{Context, Result};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Engine backed by the crate's own parser, instantiator and evaluator
#[derive(Debug, Default)]
pub struct ScadEngine {
    preset: Option<EngineConfig>,
    config: OnceLock<EngineConfig>,
}

impl ScadEngine {
    /// Engine with fixed settings
    pub fn new(config: EngineConfig) -> Self {
        Self {
            preset: Some(config),
            config: OnceLock::new(),
        }
    }

    /// Engine that reads `scadmesh.toml` and the environment when initialized
    pub fn from_environment() -> Self {
        Self::default()
    }

    /// Settings in effect; defaults until initialization has run
    pub fn config(&self) -> &EngineConfig {
        self.config
            .get_or_init(|| self.preset.clone().unwrap_or_default())
    }

    /// Install loaded settings. Returns false when a render already pinned
    /// different ones, which stay in effect.
    fn pin(&self, config: EngineConfig) -> bool {
        match self.config.set(config) {
            Ok(()) => true,
            Err(rejected) => {
                let pinned = self.config();
                if *pinned == rejected {
                    return true;
                }
                warn!(
                    fn_ = rejected.fn_,
                    fa = rejected.fa,
                    fs = rejected.fs,
                    max_depth = rejected.max_depth,
                    "engine configuration loaded after settings were pinned; keeping the pinned settings"
                );
                false
            }
        }
    }
}

impl Engine for ScadEngine {
    type Ast = Program;
    type SceneGraph = Node;
    type Geometry = Geometry;

    fn initialize(&self) -> Result<()> {
        let config = match &self.preset {
            Some(config) => config.clone(),
            None => EngineConfig::load().context("Failed to load engine configuration")?,
        };
        config.validate().context("Invalid engine configuration")?;

        info!(
            fn_ = config.fn_,
            fa = config.fa,
            fs = config.fs,
            max_depth = config.max_depth,
            "SCAD engine initialized"
        );
        // A render that raced ahead of initialization may already have
        // pinned the defaults
        self.pin(config);
        Ok(())
    }

    fn parse(&self, source: &str, console: &Console) -> Result<Program> {
        match parse_scad(source) {
            Ok(program) => {
                debug!(statements = program.statements.len(), "parsed source");
                Ok(program)
            }
            Err(err) => {
                console.error(&format!("Parser error: {:#}", err));
                Err(err)
            }
        }
    }

    fn instantiate(&self, ast: &Program, console: &Console) -> Result<Node> {
        let root = instantiate(ast, console, self.config())?;
        debug!(nodes = root.count(), "instantiated scene graph");
        Ok(root)
    }

    fn evaluate_geometry(&self, scene: &Node, _console: &Console) -> Result<Geometry> {
        Evaluator::new().evaluate(scene)
    }

    fn to_polygon_set(&self, geometry: &Geometry) -> Option<PolySet> {
        geometry.to_polyset()
    }

    fn tessellate(&self, mesh: &PolySet) -> Option<PolySet> {
        geometry::tessellate(mesh)
    }
}
