// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A replayable buffer of paint calls.

use alloc::string::String;
use alloc::vec::Vec;

use crate::{Painter, PropertyList};

/// One recorded paint call.
#[derive(Clone, Debug, PartialEq)]
pub enum DisplayItem {
    Style {
        props: PropertyList,
        gradient: Vec<PropertyList>,
    },
    Path {
        path: Vec<PropertyList>,
    },
    Ellipse {
        props: PropertyList,
    },
    GraphicObject {
        props: PropertyList,
        data: Vec<u8>,
    },
    StartLayer {
        props: PropertyList,
    },
    EndLayer,
    StartTextObject {
        props: PropertyList,
    },
    EndTextObject,
    OpenParagraph {
        props: PropertyList,
    },
    CloseParagraph,
    OpenSpan {
        props: PropertyList,
    },
    CloseSpan,
    Text {
        text: String,
    },
}

impl DisplayItem {
    fn play(&self, painter: &mut dyn Painter) {
        match self {
            Self::Style { props, gradient } => painter.set_style(props, gradient),
            Self::Path { path } => painter.draw_path(path),
            Self::Ellipse { props } => painter.draw_ellipse(props),
            Self::GraphicObject { props, data } => painter.draw_graphic_object(props, data),
            Self::StartLayer { props } => painter.start_layer(props),
            Self::EndLayer => painter.end_layer(),
            Self::StartTextObject { props } => painter.start_text_object(props),
            Self::EndTextObject => painter.end_text_object(),
            Self::OpenParagraph { props } => painter.open_paragraph(props),
            Self::CloseParagraph => painter.close_paragraph(),
            Self::OpenSpan { props } => painter.open_span(props),
            Self::CloseSpan => painter.close_span(),
            Self::Text { text } => painter.insert_text(text),
        }
    }
}

/// A FIFO of paint calls for one shape (or one page, once shapes have been
/// stitched together in z-order).
///
/// Replay is a trivial dispatch; no drawing logic lives here.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplayList {
    items: Vec<DisplayItem>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Appends a copy of all of `other`'s calls.
    pub fn append(&mut self, other: &Self) {
        self.items.extend(other.items.iter().cloned());
    }

    /// Replays every call against `painter` in recording order.
    pub fn play(&self, painter: &mut dyn Painter) {
        for item in &self.items {
            item.play(painter);
        }
    }

    pub fn items(&self) -> &[DisplayItem] {
        &self.items
    }

    pub fn add_style(&mut self, props: PropertyList, gradient: Vec<PropertyList>) {
        self.items.push(DisplayItem::Style { props, gradient });
    }

    pub fn add_path(&mut self, path: Vec<PropertyList>) {
        self.items.push(DisplayItem::Path { path });
    }

    pub fn add_ellipse(&mut self, props: PropertyList) {
        self.items.push(DisplayItem::Ellipse { props });
    }

    pub fn add_graphic_object(&mut self, props: PropertyList, data: Vec<u8>) {
        self.items.push(DisplayItem::GraphicObject { props, data });
    }

    pub fn add_start_layer(&mut self, props: PropertyList) {
        self.items.push(DisplayItem::StartLayer { props });
    }

    pub fn add_end_layer(&mut self) {
        self.items.push(DisplayItem::EndLayer);
    }

    pub fn add_start_text_object(&mut self, props: PropertyList) {
        self.items.push(DisplayItem::StartTextObject { props });
    }

    pub fn add_end_text_object(&mut self) {
        self.items.push(DisplayItem::EndTextObject);
    }

    pub fn add_open_paragraph(&mut self, props: PropertyList) {
        self.items.push(DisplayItem::OpenParagraph { props });
    }

    pub fn add_close_paragraph(&mut self) {
        self.items.push(DisplayItem::CloseParagraph);
    }

    pub fn add_open_span(&mut self, props: PropertyList) {
        self.items.push(DisplayItem::OpenSpan { props });
    }

    pub fn add_close_span(&mut self) {
        self.items.push(DisplayItem::CloseSpan);
    }

    pub fn add_text(&mut self, text: String) {
        self.items.push(DisplayItem::Text { text });
    }
}
