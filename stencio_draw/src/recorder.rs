// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A painter that records its call sequence as strings, for tests.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::{Painter, PropertyList};

/// Records every paint call as one formatted line.
///
/// Path elements are rendered inline so a whole `drawPath` call compares as a
/// single string. Property lists render key-sorted, which keeps expectations
/// independent of insertion order.
#[derive(Clone, Debug, Default)]
pub struct CallRecorder {
    calls: Vec<String>,
}

impl CallRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    /// The recorded call names only (`"drawPath"`, `"startPage"`, ...).
    pub fn call_names(&self) -> Vec<&str> {
        self.calls
            .iter()
            .map(|c| c.split_whitespace().next().unwrap_or(""))
            .collect()
    }

    fn push(&mut self, name: &str, props: &PropertyList) {
        if props.is_empty() {
            self.calls.push(name.to_string());
        } else {
            self.calls.push(format!("{name} {props}"));
        }
    }
}

impl Painter for CallRecorder {
    fn start_document(&mut self, props: &PropertyList) {
        self.push("startDocument", props);
    }

    fn end_document(&mut self) {
        self.calls.push("endDocument".to_string());
    }

    fn start_page(&mut self, props: &PropertyList) {
        self.push("startPage", props);
    }

    fn end_page(&mut self) {
        self.calls.push("endPage".to_string());
    }

    fn set_style(&mut self, props: &PropertyList, _gradient: &[PropertyList]) {
        self.push("setStyle", props);
    }

    fn start_layer(&mut self, props: &PropertyList) {
        self.push("startLayer", props);
    }

    fn end_layer(&mut self) {
        self.calls.push("endLayer".to_string());
    }

    fn draw_path(&mut self, path: &[PropertyList]) {
        let mut line = String::from("drawPath");
        for element in path {
            line.push_str(" [");
            line.push_str(&element.to_string());
            line.push(']');
        }
        self.calls.push(line);
    }

    fn draw_ellipse(&mut self, props: &PropertyList) {
        self.push("drawEllipse", props);
    }

    fn draw_graphic_object(&mut self, props: &PropertyList, data: &[u8]) {
        self.calls
            .push(format!("drawGraphicObject {props} bytes={}", data.len()));
    }

    fn start_text_object(&mut self, props: &PropertyList) {
        self.push("startTextObject", props);
    }

    fn end_text_object(&mut self) {
        self.calls.push("endTextObject".to_string());
    }

    fn open_paragraph(&mut self, props: &PropertyList) {
        self.push("openParagraph", props);
    }

    fn close_paragraph(&mut self) {
        self.calls.push("closeParagraph".to_string());
    }

    fn open_span(&mut self, props: &PropertyList) {
        self.push("openSpan", props);
    }

    fn close_span(&mut self) {
        self.calls.push("closeSpan".to_string());
    }

    fn insert_text(&mut self, text: &str) {
        self.calls.push(format!("insertText \"{text}\""));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DisplayList;

    #[test]
    fn display_list_replay_matches_direct_calls() {
        let mut list = DisplayList::new();
        let mut props = PropertyList::new();
        props.insert("svg:width", 8.26);
        list.add_start_layer(props.clone());
        list.add_text("Hi".to_string());
        list.add_end_layer();

        let mut direct = CallRecorder::new();
        direct.start_layer(&props);
        direct.insert_text("Hi");
        direct.end_layer();

        let mut replayed = CallRecorder::new();
        list.play(&mut replayed);
        assert_eq!(direct.calls(), replayed.calls());
    }
}
