// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Render pipeline
//!
//! Drives one render through parse, instantiate, evaluate, triangulate and
//! extract, polling for cancellation between stages. Every outcome,
//! including a panic inside the engine, becomes a [`RenderResult`] that
//! carries the console text captured during the call.

mod extract;

pub use extract::{extract_mesh, DEFAULT_NORMAL};

use crate::console::Console;
use crate::engine::Engine;
use crate::error::RenderError;
use crate::geometry::PolySet;
use crate::result::{MeshBuffers, RenderResult};
use crate::state::{CancelToken, EngineState};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Parsing,
    Instantiating,
    Evaluating,
    Triangulating,
    Extracting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Parsing => "parsing",
            Stage::Instantiating => "instantiating",
            Stage::Evaluating => "evaluating",
            Stage::Triangulating => "triangulating",
            Stage::Extracting => "extracting",
        };
        f.write_str(name)
    }
}

/// Runs renders against one engine.
///
/// Renders on the same pipeline are serialized: the console redirection is
/// shared by everything writing to that console.
pub struct Pipeline<E: Engine> {
    engine: E,
    state: Arc<EngineState>,
    console: Console,
    render_lock: Mutex<()>,
}

impl<E: Engine> Pipeline<E> {
    /// Pipeline with its own state, writing diagnostics to stdout/stderr
    /// outside of renders
    pub fn new(engine: E) -> Self {
        Self::with_parts(engine, Arc::new(EngineState::new()), Console::stdio())
    }

    pub fn with_parts(engine: E, state: Arc<EngineState>, console: Console) -> Self {
        Self {
            engine,
            state,
            console,
            render_lock: Mutex::new(()),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn state(&self) -> &Arc<EngineState> {
        &self.state
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Handle other threads can use to cancel the active render
    pub fn cancel_token(&self) -> CancelToken {
        CancelToken::new(Arc::clone(&self.state))
    }

    pub fn request_cancellation(&self) {
        self.state.request_cancellation();
    }

    /// Run the engine's one-time setup if no caller has yet.
    ///
    /// Idempotent; a failure leaves the pipeline uninitialized so a later
    /// call retries.
    pub fn initialize(&self) -> Result<(), RenderError> {
        self.state.initialize_with(|| {
            match panic::catch_unwind(AssertUnwindSafe(|| self.engine.initialize())) {
                Ok(Ok(())) => {
                    info!("engine initialized");
                    Ok(())
                }
                Ok(Err(err)) => Err(RenderError::Initialization(RenderError::chain(&err))),
                Err(payload) => Err(RenderError::Initialization(
                    panic_message(payload.as_ref()).unwrap_or_else(|| "unknown exception".to_string()),
                )),
            }
        })
    }

    /// Render `source` into a mesh.
    ///
    /// `fonts_path` is reserved for text support and currently has no
    /// effect. Never panics: engine failures and panics are reported through
    /// the result.
    pub fn render(&self, source: &str, fonts_path: Option<&str>) -> RenderResult {
        let _serial = self.render_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.state.reset_cancellation();

        if !self.state.is_initialized() {
            if let Err(err) = self.initialize() {
                warn!(error = %err, "render aborted before parsing");
                return RenderResult::failed(err, String::new());
            }
        }

        if let Some(path) = fonts_path {
            debug!(fonts_path = path, "fonts path ignored");
        }

        let capture = self.console.capture();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_stages(source)));
        let console_output = capture.finish();

        match outcome {
            Ok(Ok(mesh)) => {
                debug!(
                    vertices = mesh.vertex_count(),
                    triangles = mesh.triangle_count(),
                    "render succeeded"
                );
                RenderResult::succeeded(mesh, console_output)
            }
            Ok(Err(err)) => {
                debug!(kind = err.kind(), error = %err, "render failed");
                RenderResult::failed(err, console_output)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(panic = message.as_deref().unwrap_or(""), "engine panicked during render");
                RenderResult::failed(RenderError::UnexpectedFault(message), console_output)
            }
        }
    }

    fn run_stages(&self, source: &str) -> Result<MeshBuffers, RenderError> {
        let console = &self.console;

        debug!(stage = %Stage::Parsing, "render stage");
        let ast = self
            .engine
            .parse(source, console)
            .map_err(|e| RenderError::Parse(RenderError::chain(&e)))?;

        self.checkpoint(Stage::Instantiating)?;
        let scene = self
            .engine
            .instantiate(&ast, console)
            .map_err(|e| RenderError::Instantiation(RenderError::chain(&e)))?;
        drop(ast);

        self.checkpoint(Stage::Evaluating)?;
        let geometry = self
            .engine
            .evaluate_geometry(&scene, console)
            .map_err(|e| RenderError::Evaluation(RenderError::chain(&e)))?;
        drop(scene);

        self.checkpoint(Stage::Triangulating)?;
        let mesh = self
            .engine
            .to_polygon_set(&geometry)
            .filter(|mesh| !mesh.is_empty())
            .ok_or(RenderError::EmptyGeometry)?;
        drop(geometry);
        let mesh = self.triangulate(mesh);

        self.checkpoint(Stage::Extracting)?;
        Ok(extract_mesh(&mesh))
    }

    fn checkpoint(&self, next: Stage) -> Result<(), RenderError> {
        if self.state.is_cancellation_requested() {
            warn!(stage = %next, "render cancelled");
            return Err(RenderError::Cancelled);
        }
        debug!(stage = %next, "render stage");
        Ok(())
    }

    /// Best effort: a mesh the engine cannot tessellate is extracted as is
    fn triangulate(&self, mesh: PolySet) -> PolySet {
        if mesh.is_triangular() {
            return mesh;
        }
        match self.engine.tessellate(&mesh) {
            Some(triangles) => triangles,
            None => {
                warn!(
                    faces = mesh.face_count(),
                    "tessellation failed, extracting the untriangulated mesh"
                );
                mesh
            }
        }
    }
}

impl<E: Engine + fmt::Debug> fmt::Debug for Pipeline<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("engine", &self.engine)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::ScadEngine;

    fn pipeline() -> Pipeline<ScadEngine> {
        Pipeline::with_parts(
            ScadEngine::new(EngineConfig::default()),
            Arc::new(EngineState::new()),
            Console::sink(),
        )
    }

    #[test]
    fn test_render_cube() {
        let result = pipeline().render("cube(10);", None);
        assert!(result.success(), "{}", result.error_message());
        assert_eq!(result.vertex_count(), 8);
        assert_eq!(result.triangle_count(), 12);
    }

    #[test]
    fn test_render_initializes_once() {
        let pipeline = pipeline();
        assert!(!pipeline.state().is_initialized());
        pipeline.render("cube(1);", None);
        assert!(pipeline.state().is_initialized());
        assert_eq!(pipeline.initialize(), Ok(()));
    }

    #[test]
    fn test_stale_cancellation_is_cleared() {
        let pipeline = pipeline();
        pipeline.request_cancellation();
        let result = pipeline.render("cube(1);", Some("/nonexistent/fonts"));
        assert!(result.success());
        assert!(!pipeline.cancel_token().is_cancelled());
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(&"boom"), Some("boom".to_string()));
        assert_eq!(panic_message(&String::from("bang")), Some("bang".to_string()));
        assert_eq!(panic_message(&42_u32), None);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Triangulating.to_string(), "triangulating");
    }
}
