// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Page storage and final replay into the paint interface.

use std::collections::BTreeMap;

use stencio_draw::{DisplayList, Painter, PropertyList};

use crate::types::MINUS_ONE;

/// One finished page: its dimensions and the z-ordered display list.
#[derive(Clone, Debug, Default)]
pub struct Page {
    pub width: f64,
    pub height: f64,
    pub name: String,
    pub id: u32,
    pub background_id: u32,
    elements: DisplayList,
}

impl Page {
    pub fn new() -> Self {
        Self {
            background_id: MINUS_ONE,
            ..Self::default()
        }
    }

    pub fn append(&mut self, elements: &DisplayList) {
        self.elements.append(elements);
    }

    pub fn draw(&self, painter: &mut dyn Painter) {
        self.elements.play(painter);
    }
}

/// All pages of a document, drawn in order with background chaining.
///
/// Visio shows background pages in tabs after the drawing pages, so they are
/// also emitted as pages of their own at the end.
#[derive(Clone, Debug, Default)]
pub struct Pages {
    pages: Vec<Page>,
    background: BTreeMap<u32, Page>,
}

impl Pages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    pub fn add_background_page(&mut self, page: Page) {
        self.background.insert(page.id, page);
    }

    pub fn draw(&self, painter: &mut dyn Painter) {
        if self.pages.is_empty() && self.background.is_empty() {
            return;
        }
        painter.start_document(&PropertyList::new());
        for page in &self.pages {
            self.draw_page(painter, page);
        }
        for page in self.background.values() {
            self.draw_page(painter, page);
        }
        painter.end_document();
    }

    fn draw_page(&self, painter: &mut dyn Painter, page: &Page) {
        let mut props = PropertyList::new();
        props.insert("svg:width", page.width);
        props.insert("svg:height", page.height);
        if !page.name.is_empty() {
            props.insert("draw:name", page.name.as_str());
        }
        painter.start_page(&props);
        // Deepest background first. The visited set stops malformed
        // background chains that loop back on themselves.
        let mut chain: Vec<&Page> = Vec::new();
        let mut visited = vec![page.id];
        let mut cursor = page;
        loop {
            chain.push(cursor);
            match self.background.get(&cursor.background_id) {
                Some(background) if !visited.contains(&background.id) => {
                    visited.push(background.id);
                    cursor = background;
                }
                _ => break,
            }
        }
        for layer in chain.iter().rev() {
            layer.draw(painter);
        }
        painter.end_page();
    }
}
