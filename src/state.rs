// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Engine lifecycle state shared between a pipeline and other threads

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One-time initialization flag plus the cooperative cancellation flag.
///
/// Both flags are plain atomics: cancellation is polled by the pipeline at
/// stage boundaries and never interrupts a stage that is already running.
#[derive(Debug, Default)]
pub struct EngineState {
    initialized: AtomicBool,
    cancel_requested: AtomicBool,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether one-time setup has been performed (or is being performed)
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Run `setup` at most once across all callers.
    ///
    /// The first caller wins the test-and-set and runs `setup`; later callers
    /// return immediately without waiting for it. A failed setup clears the
    /// flag again so a subsequent call can retry.
    pub fn initialize_with<E>(&self, setup: impl FnOnce() -> Result<(), E>) -> Result<(), E> {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        if let Err(err) = setup() {
            self.initialized.store(false, Ordering::Release);
            return Err(err);
        }

        Ok(())
    }

    /// Ask the active render to stop at its next checkpoint
    pub fn request_cancellation(&self) {
        self.cancel_requested.store(true, Ordering::Release);
    }

    pub fn is_cancellation_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    /// Cleared at the start of every render call
    pub(crate) fn reset_cancellation(&self) {
        self.cancel_requested.store(false, Ordering::Release);
    }
}

/// Cloneable, thread-safe handle for requesting cancellation.
///
/// There is no acknowledgement: inspect the returned result's error to see
/// whether the request took effect.
#[derive(Debug, Clone)]
pub struct CancelToken {
    state: Arc<EngineState>,
}

impl CancelToken {
    pub(crate) fn new(state: Arc<EngineState>) -> Self {
        Self { state }
    }

    pub fn cancel(&self) {
        self.state.request_cancellation();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancellation_requested()
    }
}
