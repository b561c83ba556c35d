// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Pipeline control flow driven through stub engines

use anyhow::{bail, Result};
use nalgebra::Point3;
use scadmesh::{CancelToken, Console, Engine, EngineState, Pipeline, PolySet, RenderError, Stage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

fn quad() -> PolySet {
    PolySet::from_parts(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ],
        vec![vec![0, 1, 2, 3]],
    )
}

#[derive(Default)]
enum Behavior {
    #[default]
    Succeed,
    /// Request cancellation from inside the given stage
    CancelDuring(Stage),
    FailInstantiation,
    Panic,
    PanicWithCode,
    NoGeometry,
    Untessellatable,
}

/// Engine whose every stage is scripted
#[derive(Default)]
struct StubEngine {
    behavior: Behavior,
    token: OnceLock<CancelToken>,
    init_failures: AtomicUsize,
    init_calls: AtomicUsize,
    evaluations: AtomicUsize,
    flattenings: AtomicUsize,
}

impl StubEngine {
    fn with(behavior: Behavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    fn cancel_if(&self, stage: Stage) {
        if let Behavior::CancelDuring(target) = self.behavior {
            if target == stage {
                if let Some(token) = self.token.get() {
                    token.cancel();
                }
            }
        }
    }
}

impl Engine for StubEngine {
    type Ast = String;
    type SceneGraph = ();
    type Geometry = PolySet;

    fn initialize(&self) -> Result<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.init_failures.load(Ordering::SeqCst) > 0 {
            self.init_failures.fetch_sub(1, Ordering::SeqCst);
            bail!("font cache unavailable");
        }
        Ok(())
    }

    fn parse(&self, source: &str, console: &Console) -> Result<String> {
        console.echo(&format!("parsing {}", source));
        self.cancel_if(Stage::Parsing);
        Ok(source.to_string())
    }

    fn instantiate(&self, _ast: &String, console: &Console) -> Result<()> {
        self.cancel_if(Stage::Instantiating);
        match self.behavior {
            Behavior::FailInstantiation => {
                console.error("bad call");
                bail!("unknown module")
            }
            Behavior::Panic => panic!("instantiator blew up"),
            Behavior::PanicWithCode => std::panic::panic_any(42_u32),
            _ => Ok(()),
        }
    }

    fn evaluate_geometry(&self, _scene: &(), _console: &Console) -> Result<PolySet> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        self.cancel_if(Stage::Evaluating);
        Ok(quad())
    }

    fn to_polygon_set(&self, geometry: &PolySet) -> Option<PolySet> {
        self.flattenings.fetch_add(1, Ordering::SeqCst);
        self.cancel_if(Stage::Triangulating);
        match self.behavior {
            Behavior::NoGeometry => None,
            _ => Some(geometry.clone()),
        }
    }

    fn tessellate(&self, mesh: &PolySet) -> Option<PolySet> {
        match self.behavior {
            Behavior::Untessellatable => None,
            _ => scadmesh::geometry::tessellate(mesh),
        }
    }
}

fn pipeline(engine: StubEngine) -> Pipeline<StubEngine> {
    Pipeline::with_parts(engine, Arc::new(EngineState::new()), Console::sink())
}

#[test]
fn test_success_tessellates_polygons() {
    let result = pipeline(StubEngine::default()).render("quad", None);
    assert!(result.success(), "{}", result.error_message());
    assert_eq!(result.vertex_count(), 4);
    assert_eq!(result.triangle_count(), 2);
    assert_eq!(result.console_output(), "ECHO: parsing quad\n");
}

#[test]
fn test_cancel_while_parsing_stops_at_first_checkpoint() {
    let pipeline = pipeline(StubEngine::with(Behavior::CancelDuring(Stage::Parsing)));
    let _ = pipeline.engine().token.set(pipeline.cancel_token());

    let result = pipeline.render("quad", None);
    assert!(matches!(result.error(), Some(RenderError::Cancelled)));
    assert_eq!(result.error_message(), "cancelled");
    assert_eq!(result.console_output(), "ECHO: parsing quad\n");
    assert_eq!(pipeline.engine().evaluations.load(Ordering::SeqCst), 0);
    assert!(result.positions().is_empty());
}

fn render_cancelled_during(stage: Stage) -> (Pipeline<StubEngine>, scadmesh::RenderResult) {
    let pipeline = pipeline(StubEngine::with(Behavior::CancelDuring(stage)));
    let _ = pipeline.engine().token.set(pipeline.cancel_token());
    let result = pipeline.render("quad", None);
    (pipeline, result)
}

fn assert_cancelled(result: &scadmesh::RenderResult) {
    assert!(matches!(result.error(), Some(RenderError::Cancelled)));
    assert_eq!(result.vertex_count(), 0);
    assert_eq!(result.triangle_count(), 0);
    assert!(result.positions().is_empty());
    assert!(result.normals().is_empty());
    assert!(result.indices().is_empty());
    assert_eq!(result.console_output(), "ECHO: parsing quad\n");
}

#[test]
fn test_cancel_while_instantiating_skips_evaluation() {
    let (pipeline, result) = render_cancelled_during(Stage::Instantiating);
    assert_cancelled(&result);
    assert_eq!(pipeline.engine().evaluations.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cancel_while_evaluating_discards_geometry() {
    let (pipeline, result) = render_cancelled_during(Stage::Evaluating);
    assert_cancelled(&result);
    assert_eq!(pipeline.engine().evaluations.load(Ordering::SeqCst), 1);
    assert_eq!(pipeline.engine().flattenings.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cancel_while_flattening_discards_mesh() {
    let (pipeline, result) = render_cancelled_during(Stage::Triangulating);
    assert_cancelled(&result);
    assert_eq!(pipeline.engine().flattenings.load(Ordering::SeqCst), 1);
}

#[test]
fn test_request_between_renders_is_discarded() {
    let pipeline = pipeline(StubEngine::default());
    pipeline.request_cancellation();
    assert!(pipeline.state().is_cancellation_requested());

    let result = pipeline.render("quad", None);
    assert!(result.success(), "{}", result.error_message());
    assert_eq!(pipeline.engine().evaluations.load(Ordering::SeqCst), 1);
}

#[test]
fn test_shared_state_token_cancels_render() {
    let state = Arc::new(EngineState::new());
    let engine = StubEngine::with(Behavior::CancelDuring(Stage::Parsing));
    let pipeline = Pipeline::with_parts(engine, Arc::clone(&state), Console::sink());
    let token = pipeline.cancel_token();
    let _ = pipeline.engine().token.set(token.clone());

    assert!(!pipeline.render("x", None).success());
    assert!(token.is_cancelled());
    assert!(state.is_cancellation_requested());
}

#[test]
fn test_stage_failure_keeps_console() {
    let result = pipeline(StubEngine::with(Behavior::FailInstantiation)).render("quad", None);
    assert!(matches!(result.error(), Some(RenderError::Instantiation(_))));
    assert_eq!(result.error_message(), "instantiation failed: unknown module");
    assert_eq!(result.console_output(), "ECHO: parsing quad\nERROR: bad call\n");
}

#[test]
fn test_panic_becomes_unexpected_fault() {
    let result = pipeline(StubEngine::with(Behavior::Panic)).render("quad", None);
    assert_eq!(
        result.error(),
        Some(&RenderError::UnexpectedFault(Some("instantiator blew up".to_string())))
    );
    assert!(result.error_message().contains("instantiator blew up"));
    assert_eq!(result.console_output(), "ECHO: parsing quad\n");
}

#[test]
fn test_opaque_panic_payload() {
    let pipeline = pipeline(StubEngine::with(Behavior::PanicWithCode));
    let result = pipeline.render("quad", None);
    assert_eq!(result.error(), Some(&RenderError::UnexpectedFault(None)));
    assert!(!result.error_message().is_empty());

    // The console is restored and the pipeline stays usable
    let again = pipeline.render("again", None);
    assert_eq!(again.console_output(), "ECHO: parsing again\n");
}

#[test]
fn test_missing_geometry_is_empty() {
    let result = pipeline(StubEngine::with(Behavior::NoGeometry)).render("quad", None);
    assert!(matches!(result.error(), Some(RenderError::EmptyGeometry)));
    assert_eq!(result.console_output(), "ECHO: parsing quad\n");
}

#[test]
fn test_tessellation_fallback_extracts_polygons() {
    let result = pipeline(StubEngine::with(Behavior::Untessellatable)).render("quad", None);
    assert!(result.success());
    assert_eq!(result.vertex_count(), 4);
    // Only the first three corners of the quad are emitted
    assert_eq!(result.indices(), &[0, 1, 2]);
}

#[test]
fn test_initialization_failure_then_retry() {
    let engine = StubEngine::default();
    engine.init_failures.store(1, Ordering::SeqCst);
    let pipeline = pipeline(engine);

    let first = pipeline.render("quad", None);
    assert!(matches!(first.error(), Some(RenderError::Initialization(_))));
    assert!(first.error_message().contains("font cache unavailable"));
    assert_eq!(first.console_output(), "");
    assert!(!pipeline.state().is_initialized());

    let second = pipeline.render("quad", None);
    assert!(second.success());
    assert_eq!(pipeline.engine().init_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_initialize_is_idempotent() {
    let pipeline = pipeline(StubEngine::default());
    assert_eq!(pipeline.initialize(), Ok(()));
    assert_eq!(pipeline.initialize(), Ok(()));
    pipeline.render("quad", None);
    assert_eq!(pipeline.engine().init_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_first_initialization_runs_once() {
    let pipeline = Arc::new(pipeline(StubEngine::default()));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            std::thread::spawn(move || pipeline.initialize())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), Ok(()));
    }
    assert_eq!(pipeline.engine().init_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_console_passes_through_outside_renders() {
    let pipeline = pipeline(StubEngine::default());
    let capture = pipeline.console().capture();
    pipeline.console().warning("outside");
    assert_eq!(capture.finish(), "WARNING: outside\n");
}
