// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Diagnostic console with scoped output capture
//!
//! A [`Console`] owns the two diagnostic sinks (out and err) that the engine
//! writes `ECHO:`, `WARNING:` and `ERROR:` lines to. By default they are the
//! process stdout/stderr. [`Console::capture`] swaps both sinks for a single
//! in-memory buffer and returns a guard that puts the previous sinks back when
//! it is finished or dropped, including while a panic unwinds.

use std::io::{self, Write};
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard};

type Sink = Box<dyn Write + Send>;

struct Sinks {
    out: Sink,
    err: Sink,
}

/// Shared handle to a pair of diagnostic sinks.
///
/// Cloning is cheap and clones share the same sinks, so a capture started on
/// one handle is seen by writes through every clone.
#[derive(Clone)]
pub struct Console {
    sinks: Arc<Mutex<Sinks>>,
}

impl Console {
    /// Console writing to the process stdout and stderr
    pub fn stdio() -> Self {
        Self::with_sinks(io::stdout(), io::stderr())
    }

    pub fn with_sinks(out: impl Write + Send + 'static, err: impl Write + Send + 'static) -> Self {
        Self {
            sinks: Arc::new(Mutex::new(Sinks {
                out: Box::new(out),
                err: Box::new(err),
            })),
        }
    }

    /// Console that discards everything
    pub fn sink() -> Self {
        Self::with_sinks(io::sink(), io::sink())
    }

    /// Write to the out stream.
    ///
    /// Diagnostics are best effort: a failing sink never fails the render.
    pub fn write_out(&self, text: &str) {
        let _ = self.lock().out.write_all(text.as_bytes());
    }

    /// Write to the err stream
    pub fn write_err(&self, text: &str) {
        let _ = self.lock().err.write_all(text.as_bytes());
    }

    /// `ECHO: ...` line on the out stream
    pub fn echo(&self, message: &str) {
        self.write_out(&format!("ECHO: {message}\n"));
    }

    /// `WARNING: ...` line on the err stream
    pub fn warning(&self, message: &str) {
        self.write_err(&format!("WARNING: {message}\n"));
    }

    /// `ERROR: ...` line on the err stream
    pub fn error(&self, message: &str) {
        self.write_err(&format!("ERROR: {message}\n"));
    }

    pub fn flush(&self) {
        let mut sinks = self.lock();
        let _ = sinks.out.flush();
        let _ = sinks.err.flush();
    }

    /// Redirect both sinks into one buffer until the guard is finished or dropped
    pub fn capture(&self) -> CaptureGuard {
        let buffer = CaptureBuffer::default();
        let previous = {
            let mut sinks = self.lock();
            let _ = sinks.out.flush();
            let _ = sinks.err.flush();
            Sinks {
                out: mem::replace(&mut sinks.out, Box::new(buffer.clone())),
                err: mem::replace(&mut sinks.err, Box::new(buffer.clone())),
            }
        };

        CaptureGuard {
            console: self.clone(),
            buffer,
            previous: Some(previous),
        }
    }

    // A panic while a sink is locked leaves plain byte buffers behind, which
    // are still safe to keep writing to.
    fn lock(&self) -> MutexGuard<'_, Sinks> {
        self.sinks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::stdio()
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

/// In-memory sink shared by both redirected streams
#[derive(Clone, Default)]
pub struct CaptureBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    /// Everything written so far, decoded lossily as UTF-8
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Active redirection of a [`Console`]; restores the previous sinks on drop
pub struct CaptureGuard {
    console: Console,
    buffer: CaptureBuffer,
    previous: Option<Sinks>,
}

impl CaptureGuard {
    /// Text captured so far, without ending the capture
    pub fn contents(&self) -> String {
        self.buffer.contents()
    }

    /// End the capture and return everything written during it
    pub fn finish(mut self) -> String {
        self.restore();
        self.buffer.contents()
    }

    fn restore(&mut self) {
        if let Some(previous) = self.previous.take() {
            let mut sinks = self.console.lock();
            sinks.out = previous.out;
            sinks.err = previous.err;
        }
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.restore();
    }
}
