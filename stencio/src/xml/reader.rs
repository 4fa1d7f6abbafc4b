// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared machinery for the XML parsers: the accumulated shape tree, its
//! replay as the common event stream, and text reading with run markers.

use std::collections::BTreeMap;

use crate::collector::Collector;
use crate::error::Result;
use crate::shape::Shape;
use crate::style::{OptionalCharStyle, OptionalParaStyle};
use crate::types::TextFormat;

use super::{Token, TokenSource, XmlNode};

/// Synthetic levels used when replaying XML content as chunk-style events.
/// Shapes all share one level so each `collect_shape` seals its predecessor,
/// exactly as sibling sub-streams do in the binary container.
pub(super) const LEVEL_PAGE_SHEET: u32 = 2;
pub(super) const LEVEL_SHAPE: u32 = 3;
pub(super) const LEVEL_CONTENT: u32 = 4;
pub(super) const LEVEL_ROW: u32 = 5;

/// One contiguous stretch of shape text under a single char/para run pair.
#[derive(Clone, Debug, Default, PartialEq)]
pub(super) struct TextSegment {
    pub char_ix: Option<u32>,
    pub para_ix: Option<u32>,
    pub bytes: usize,
}

/// A shape as accumulated from XML, with its children.
#[derive(Clone, Debug, Default)]
pub(super) struct XmlShape {
    pub shape: Shape,
    pub char_rows: BTreeMap<u32, OptionalCharStyle>,
    pub para_rows: BTreeMap<u32, OptionalParaStyle>,
    pub segments: Vec<TextSegment>,
    pub children: Vec<XmlShape>,
}

impl XmlShape {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Replays a page's shape forest in the order the collectors expect: the
/// page-level id list, then each shape followed depth-first by its children.
pub(super) fn emit_shapes(collector: &mut dyn Collector, shapes: &[XmlShape]) {
    for (i, node) in shapes.iter().enumerate() {
        collector.collect_shape_id(i as u32, LEVEL_ROW, node.shape.shape_id);
    }
    for node in shapes {
        emit_shape(collector, node);
    }
}

fn emit_shape(collector: &mut dyn Collector, node: &XmlShape) {
    let shape = &node.shape;
    collector.collect_shape(
        shape.shape_id,
        LEVEL_SHAPE,
        shape.parent,
        shape.master_page,
        shape.master_shape,
        shape.line_style_id,
        shape.fill_style_id,
        shape.text_style_id,
    );
    collector.collect_xform(LEVEL_CONTENT, &shape.xform);
    if let Some(txtxform) = &shape.txtxform {
        collector.collect_txt_xform(LEVEL_CONTENT, txtxform);
    }
    collector.collect_line(LEVEL_CONTENT, &shape.line_style);
    collector.collect_fill_and_shadow(LEVEL_CONTENT, &shape.fill_style);
    collector.collect_text_block(LEVEL_CONTENT, &shape.text_block_style);

    if let Some(foreign) = &shape.foreign {
        collector.collect_foreign_data_type(
            LEVEL_CONTENT,
            foreign.kind,
            foreign.format,
            foreign.offset_x,
            foreign.offset_y,
            foreign.width,
            foreign.height,
        );
        collector.collect_foreign_data(LEVEL_CONTENT, &foreign.data);
    }
    for (id, data) in &shape.nurbs_data {
        collector.collect_nurbs_data(*id, LEVEL_CONTENT, data);
    }
    for (id, data) in &shape.polyline_data {
        collector.collect_polyline_data(*id, LEVEL_CONTENT, data);
    }
    for (id, name) in &shape.names {
        collector.collect_name(*id, LEVEL_CONTENT, name);
    }
    if !shape.text.is_empty() {
        collector.collect_text(LEVEL_CONTENT, &shape.text, shape.text_format);
    }

    // Run markers become char/para runs with explicit byte counts.
    let mut run_id = 0u32;
    for (char_ix, bytes) in merge_runs(&node.segments, |s| s.char_ix) {
        let mut style = char_ix
            .and_then(|ix| node.char_rows.get(&ix).cloned())
            .unwrap_or_default();
        style.char_count = Some(bytes as u32);
        collector.collect_char_ix(run_id, LEVEL_ROW, &style);
        run_id += 1;
    }
    let mut run_id = 0u32;
    for (para_ix, bytes) in merge_runs(&node.segments, |s| s.para_ix) {
        let mut style = para_ix
            .and_then(|ix| node.para_rows.get(&ix).copied())
            .unwrap_or_default();
        style.char_count = Some(bytes as u32);
        collector.collect_para_ix(run_id, LEVEL_ROW, &style);
        run_id += 1;
    }

    shape.fields.replay(collector);

    for list in shape.geometries.values() {
        list.replay(collector);
    }

    for (i, child) in node.children.iter().enumerate() {
        collector.collect_shape_id(i as u32, LEVEL_ROW, child.shape.shape_id);
    }
    for child in &node.children {
        emit_shape(collector, child);
    }
}

/// Coalesces adjacent segments that share a run index.
fn merge_runs(
    segments: &[TextSegment],
    key: impl Fn(&TextSegment) -> Option<u32>,
) -> Vec<(Option<u32>, usize)> {
    let mut runs: Vec<(Option<u32>, usize)> = Vec::new();
    for segment in segments {
        let ix = key(segment);
        match runs.last_mut() {
            Some((last_ix, bytes)) if *last_ix == ix => *bytes += segment.bytes,
            _ => runs.push((ix, segment.bytes)),
        }
    }
    runs
}

/// Flattens a master's shape tree into per-id stencil entries.
pub(super) fn flatten_master(node: XmlShape, out: &mut Vec<(u32, Shape)>) {
    let id = node.shape.shape_id;
    out.push((id, node.shape));
    for child in node.children {
        flatten_master(child, out);
    }
}

/// Reads a `<Text>` element: mixed character content and `cp`/`pp` run
/// markers. The decoded text lands on the shape as UTF-8; each marker opens
/// a new segment bound to its run index.
pub(super) fn read_text(source: &mut dyn TokenSource, node: &mut XmlShape) -> Result<()> {
    let mut text = String::new();
    let mut char_ix: Option<u32> = None;
    let mut para_ix: Option<u32> = None;
    let mut segment_start = 0usize;
    let mut depth = 0u32;

    let close_segment = |text: &str, start: &mut usize, char_ix, para_ix, segments: &mut Vec<TextSegment>| {
        if text.len() > *start {
            segments.push(TextSegment {
                char_ix,
                para_ix,
                bytes: text.len() - *start,
            });
            *start = text.len();
        }
    };

    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::Text(content) => text.push_str(&content),
            XmlNode::StartElement {
                token,
                attributes,
                is_empty,
            } => {
                let ix = XmlNode::attribute(&attributes, Token::Ix)
                    .and_then(super::parse_long)
                    .map(|v| v as u32);
                match token {
                    Token::Cp => {
                        close_segment(&text, &mut segment_start, char_ix, para_ix, &mut node.segments);
                        char_ix = ix;
                    }
                    Token::Pp => {
                        close_segment(&text, &mut segment_start, char_ix, para_ix, &mut node.segments);
                        para_ix = ix;
                    }
                    Token::Tp => {}
                    _ => {
                        if !is_empty {
                            depth += 1;
                        }
                    }
                }
            }
            XmlNode::EndElement { token } => {
                if token == Token::Text && depth == 0 {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
        }
    }

    close_segment(&text, &mut segment_start, char_ix, para_ix, &mut node.segments);
    if !text.is_empty() {
        node.shape.text = text.into_bytes();
        node.shape.text_format = TextFormat::Utf8;
    }
    Ok(())
}

/// Collects the character content of the current element up to its end tag.
/// `None` for an empty element (a "touch").
pub(super) fn read_scalar(
    source: &mut dyn TokenSource,
    token: Token,
    attributes: &[(Token, String)],
    is_empty: bool,
) -> Result<Option<String>> {
    // `del="1"` deletes the inherited value: no override is recorded.
    let deleted = XmlNode::attribute(attributes, Token::Del) == Some("1");
    if is_empty {
        return Ok(None);
    }
    let mut value = String::new();
    let mut depth = 0u32;
    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::Text(content) => value.push_str(&content),
            XmlNode::StartElement { is_empty: false, .. } => depth += 1,
            XmlNode::StartElement { .. } => {}
            XmlNode::EndElement { token: end } => {
                if end == token && depth == 0 {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
        }
    }
    if deleted || value.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}

/// Skips the rest of the current element, honouring nested same-name tags.
pub(super) fn skip_element(source: &mut dyn TokenSource, token: Token) -> Result<()> {
    let mut depth = 0u32;
    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token: start,
                is_empty: false,
                ..
            } if start == token => depth += 1,
            XmlNode::EndElement { token: end } if end == token => {
                if depth == 0 {
                    return Ok(());
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    Ok(())
}
