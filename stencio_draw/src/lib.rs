// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint interface and display lists for the stencio Visio decoder.
//!
//! This crate is the output side of the decoder: a [`Painter`] trait that
//! consumers implement (SVG writers, text extractors, rasterisers), the
//! property lists that carry ODF-flavoured drawing attributes to it, and
//! [`DisplayList`], a replayable buffer of paint calls used by the decoder to
//! reorder shape output into page z-order before anything reaches the sink.

// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![no_std]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

mod display;
mod property;
mod recorder;

pub use display::{DisplayItem, DisplayList};
pub use property::{PropertyList, Unit, Value};
pub use recorder::CallRecorder;

/// The abstract paint sink driven by the decoder.
///
/// Calls arrive strictly bracketed: every `start_*` is matched by its `end_*`
/// (or `open_*`/`close_*`) in LIFO order, even when the decoder recovers from
/// mid-document corruption. Property keys mirror ODF/SVG naming (`svg:x`,
/// `draw:fill`, `fo:font-size`, `libwpg:path-action`, ...).
pub trait Painter {
    fn start_document(&mut self, props: &PropertyList);
    fn end_document(&mut self);
    fn start_page(&mut self, props: &PropertyList);
    fn end_page(&mut self);

    /// Sets the style for subsequent draw calls. `gradient` carries the
    /// gradient stop list when `draw:fill` is `"gradient"`.
    fn set_style(&mut self, props: &PropertyList, gradient: &[PropertyList]);
    fn start_layer(&mut self, props: &PropertyList);
    fn end_layer(&mut self);
    /// Draws a path given as a sequence of path-element property lists, each
    /// carrying a `libwpg:path-action` of `M`, `L`, `C`, `Q`, `A` or `Z`.
    fn draw_path(&mut self, path: &[PropertyList]);
    fn draw_ellipse(&mut self, props: &PropertyList);
    fn draw_graphic_object(&mut self, props: &PropertyList, data: &[u8]);

    fn start_text_object(&mut self, props: &PropertyList);
    fn end_text_object(&mut self);
    fn open_paragraph(&mut self, props: &PropertyList);
    fn close_paragraph(&mut self);
    fn open_span(&mut self, props: &PropertyList);
    fn close_span(&mut self);
    fn insert_text(&mut self, text: &str);
    fn insert_tab(&mut self) {}
    fn insert_space(&mut self) {}
    fn insert_line_break(&mut self) {}
    fn insert_field(&mut self, _kind: &str, _props: &PropertyList) {}
}
