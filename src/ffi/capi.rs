// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! C ABI over the process-wide pipeline
//!
//! Declared in `include/scadmesh.h`. Results are heap handles owned by the
//! caller until passed to [`scadmesh_result_free`]. Every accessor accepts a
//! null handle and answers with an empty value.

use crate::error::RenderError;
use crate::result::{RenderResult, ShadingVertex};
use std::ffi::{c_char, c_int, CStr, CString};
use std::ptr;

/// Opaque render result handle
pub struct ScadMeshResult {
    result: RenderResult,
    error: CString,
    console: CString,
    vertices: Vec<ShadingVertex>,
}

impl ScadMeshResult {
    fn new(result: RenderResult) -> Self {
        Self {
            error: c_string(result.error_message()),
            console: c_string(result.console_output()),
            vertices: result.mesh().interleaved(),
            result,
        }
    }
}

// Interior NULs would truncate the text on the C side anyway
fn c_string(text: &str) -> CString {
    CString::new(text.replace('\0', "")).unwrap_or_default()
}

/// # Safety
///
/// `raw` must be null or a live pointer returned by [`scadmesh_render`].
unsafe fn handle<'a>(raw: *const ScadMeshResult) -> Option<&'a ScadMeshResult> {
    raw.as_ref()
}

fn array_ptr<T>(items: &[T]) -> *const T {
    if items.is_empty() {
        ptr::null()
    } else {
        items.as_ptr()
    }
}

/// Initialize the engine. Returns 0 on success, -1 on failure.
#[no_mangle]
pub extern "C" fn scadmesh_init() -> c_int {
    match crate::initialize_engine() {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

/// Render SCAD source. Never returns null.
///
/// # Safety
///
/// `source` and `fonts_path` must each be null or a NUL-terminated string
/// valid for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn scadmesh_render(
    source: *const c_char,
    fonts_path: *const c_char,
) -> *mut ScadMeshResult {
    let fonts_path = (!fonts_path.is_null()).then(|| CStr::from_ptr(fonts_path).to_string_lossy());

    let result = if source.is_null() {
        RenderResult::failed(RenderError::Parse("source is null".into()), String::new())
    } else {
        let source = CStr::from_ptr(source).to_string_lossy();
        crate::render(&source, fonts_path.as_deref())
    };

    Box::into_raw(Box::new(ScadMeshResult::new(result)))
}

/// # Safety
///
/// `result` must be null or a live handle from [`scadmesh_render`].
#[no_mangle]
pub unsafe extern "C" fn scadmesh_result_success(result: *const ScadMeshResult) -> bool {
    handle(result).is_some_and(|r| r.result.success())
}

/// Error text, empty on success. Valid until the handle is freed.
///
/// # Safety
///
/// `result` must be null or a live handle from [`scadmesh_render`].
#[no_mangle]
pub unsafe extern "C" fn scadmesh_result_error(result: *const ScadMeshResult) -> *const c_char {
    match handle(result) {
        Some(r) => r.error.as_ptr(),
        None => c"".as_ptr(),
    }
}

/// Captured diagnostic text. Valid until the handle is freed.
///
/// # Safety
///
/// `result` must be null or a live handle from [`scadmesh_render`].
#[no_mangle]
pub unsafe extern "C" fn scadmesh_result_console(result: *const ScadMeshResult) -> *const c_char {
    match handle(result) {
        Some(r) => r.console.as_ptr(),
        None => c"".as_ptr(),
    }
}

/// # Safety
///
/// `result` must be null or a live handle from [`scadmesh_render`].
#[no_mangle]
pub unsafe extern "C" fn scadmesh_result_vertex_count(result: *const ScadMeshResult) -> usize {
    handle(result).map_or(0, |r| r.result.vertex_count())
}

/// # Safety
///
/// `result` must be null or a live handle from [`scadmesh_render`].
#[no_mangle]
pub unsafe extern "C" fn scadmesh_result_triangle_count(result: *const ScadMeshResult) -> usize {
    handle(result).map_or(0, |r| r.result.triangle_count())
}

/// `3 * vertex_count` floats, or null when empty
///
/// # Safety
///
/// `result` must be null or a live handle from [`scadmesh_render`].
#[no_mangle]
pub unsafe extern "C" fn scadmesh_result_positions(result: *const ScadMeshResult) -> *const f32 {
    handle(result).map_or(ptr::null(), |r| array_ptr(r.result.positions()))
}

/// `3 * vertex_count` floats, or null when empty
///
/// # Safety
///
/// `result` must be null or a live handle from [`scadmesh_render`].
#[no_mangle]
pub unsafe extern "C" fn scadmesh_result_normals(result: *const ScadMeshResult) -> *const f32 {
    handle(result).map_or(ptr::null(), |r| array_ptr(r.result.normals()))
}

/// `3 * triangle_count` indices, or null when empty
///
/// # Safety
///
/// `result` must be null or a live handle from [`scadmesh_render`].
#[no_mangle]
pub unsafe extern "C" fn scadmesh_result_indices(result: *const ScadMeshResult) -> *const u32 {
    handle(result).map_or(ptr::null(), |r| array_ptr(r.result.indices()))
}

/// `vertex_count` interleaved position/normal pairs, or null when empty
///
/// # Safety
///
/// `result` must be null or a live handle from [`scadmesh_render`].
#[no_mangle]
pub unsafe extern "C" fn scadmesh_result_vertices(
    result: *const ScadMeshResult,
) -> *const ShadingVertex {
    handle(result).map_or(ptr::null(), |r| array_ptr(&r.vertices))
}

/// Free a result. Null is ignored.
///
/// # Safety
///
/// `result` must be null or a handle from [`scadmesh_render`] that has not
/// been freed yet. It must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn scadmesh_result_free(result: *mut ScadMeshResult) {
    if !result.is_null() {
        drop(Box::from_raw(result));
    }
}

/// Request cancellation of the render in progress
#[no_mangle]
pub extern "C" fn scadmesh_cancel() {
    crate::request_cancellation();
}

/// Static version string
#[no_mangle]
pub extern "C" fn scadmesh_version() -> *const c_char {
    crate::engine_version_c().as_ptr().cast()
}
