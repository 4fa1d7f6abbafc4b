// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Extracts the text of a binary Visio document to stdout.
//!
//! Expects the raw `VisioDocument` stream (already pulled out of the OLE
//! container) as its single argument:
//!
//! ```sh
//! cargo run --example extract_text -- VisioDocument.bin
//! ```

use std::io::Write as _;

use stencio_draw::{Painter, PropertyList};

/// A painter that only cares about text events.
#[derive(Default)]
struct TextSink {
    out: String,
}

impl Painter for TextSink {
    fn start_document(&mut self, _props: &PropertyList) {}
    fn end_document(&mut self) {}
    fn start_page(&mut self, _props: &PropertyList) {}

    fn end_page(&mut self) {
        self.out.push('\n');
    }

    fn set_style(&mut self, _props: &PropertyList, _gradient: &[PropertyList]) {}
    fn start_layer(&mut self, _props: &PropertyList) {}
    fn end_layer(&mut self) {}
    fn draw_path(&mut self, _path: &[PropertyList]) {}
    fn draw_ellipse(&mut self, _props: &PropertyList) {}
    fn draw_graphic_object(&mut self, _props: &PropertyList, _data: &[u8]) {}
    fn start_text_object(&mut self, _props: &PropertyList) {}
    fn end_text_object(&mut self) {}
    fn open_paragraph(&mut self, _props: &PropertyList) {}

    fn close_paragraph(&mut self) {
        if !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn open_span(&mut self, _props: &PropertyList) {}
    fn close_span(&mut self) {}

    fn insert_text(&mut self, text: &str) {
        self.out.push_str(text);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .ok_or("usage: extract_text <VisioDocument stream>")?;
    let data = std::fs::read(path)?;

    let mut sink = TextSink::default();
    stencio::parse_binary(&data, &mut sink)?;

    std::io::stdout().write_all(sink.out.as_bytes())?;
    Ok(())
}
