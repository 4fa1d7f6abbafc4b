// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The VDX (2003 XML schema) parser: one element per cell.

use log::warn;

use crate::collector::Collector;
use crate::content::ContentCollector;
use crate::error::Result;
use crate::geometry::{GeometryElement, GeometryList};
use crate::stencil::{Stencil, Stencils};
use crate::style::{
    OptionalCharStyle, OptionalFillStyle, OptionalLineStyle, OptionalParaStyle,
    OptionalTextBlockStyle,
};
use crate::styles_collector::StylesCollector;
use crate::types::{Colour, TextFormat, MINUS_ONE};

use super::reader::{
    self, emit_shapes, flatten_master, read_scalar, read_text, skip_element, XmlShape,
    LEVEL_PAGE_SHEET,
};
use super::{parse_bool, parse_colour, parse_double, parse_long, Token, TokenSource, XmlNode, XmlSource};

/// Document-wide state shared by the readers.
#[derive(Debug, Default)]
struct DocState {
    colours: Vec<Colour>,
    stencils: Stencils,
    /// Masters load on the first pass only; the second pass reuses them.
    load_stencils: bool,
}

/// The VDX parser. The document is walked twice, once per collection pass.
pub struct VdxParser<'a> {
    source: &'a dyn XmlSource,
}

impl core::fmt::Debug for VdxParser<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VdxParser").finish_non_exhaustive()
    }
}

impl<'a> VdxParser<'a> {
    pub fn new(source: &'a dyn XmlSource) -> Self {
        Self { source }
    }

    pub fn parse(&mut self, painter: &mut dyn stencio_draw::Painter) -> Result<()> {
        let mut state = DocState {
            load_stencils: true,
            ..DocState::default()
        };

        let mut styles_collector = StylesCollector::new();
        process_document(&mut *self.source.tokens()?, &mut styles_collector, &mut state)?;
        let layout = styles_collector.into_layout();

        state.load_stencils = false;
        state.colours.clear();
        let stencils = state.stencils.clone();
        let mut content_collector = ContentCollector::new(painter, layout, stencils);
        process_document(&mut *self.source.tokens()?, &mut content_collector, &mut state)?;
        Ok(())
    }
}

fn process_document(
    source: &mut dyn TokenSource,
    collector: &mut dyn Collector,
    state: &mut DocState,
) -> Result<()> {
    while let Some(event) = source.next_node()? {
        let XmlNode::StartElement {
            token,
            attributes,
            is_empty,
        } = event
        else {
            continue;
        };
        match token {
            Token::Colors if !is_empty => read_colours(source, state)?,
            Token::FaceNames if !is_empty => read_face_names(source, collector)?,
            Token::StyleSheet if !is_empty => {
                read_style_sheet(source, collector, state, &attributes)?;
            }
            Token::Masters if !is_empty => {
                if state.load_stencils {
                    read_masters(source, state)?;
                } else {
                    skip_element(source, Token::Masters)?;
                }
            }
            Token::Page if !is_empty => read_page(source, collector, state, &attributes)?,
            _ => {}
        }
    }
    // Seal whatever aggregate is still open.
    collector.collect_unhandled_chunk(0, 0);
    collector.end_pages();
    Ok(())
}

fn read_colours(source: &mut dyn TokenSource, state: &mut DocState) -> Result<()> {
    state.colours.clear();
    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token: Token::ColorEntry,
                attributes,
                ..
            } => {
                let colour = XmlNode::attribute(&attributes, Token::Rgb)
                    .and_then(|v| parse_colour(v, &[]))
                    .unwrap_or_default();
                let ix = XmlNode::attribute(&attributes, Token::Ix)
                    .and_then(parse_long)
                    .unwrap_or(state.colours.len() as i64) as usize;
                if ix >= state.colours.len() {
                    state.colours.resize(ix + 1, Colour::default());
                }
                state.colours[ix] = colour;
            }
            XmlNode::EndElement {
                token: Token::Colors,
            } => break,
            _ => {}
        }
    }
    Ok(())
}

fn read_face_names(source: &mut dyn TokenSource, collector: &mut dyn Collector) -> Result<()> {
    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token: Token::FaceName,
                attributes,
                ..
            } => {
                let id = XmlNode::attribute(&attributes, Token::Id)
                    .and_then(parse_long)
                    .unwrap_or(0) as u16;
                if let Some(name) = XmlNode::attribute(&attributes, Token::NameU)
                    .or_else(|| XmlNode::attribute(&attributes, Token::NameAttr))
                {
                    collector.collect_font(id, name.as_bytes(), TextFormat::Utf8);
                }
            }
            XmlNode::EndElement {
                token: Token::FaceNames,
            } => break,
            _ => {}
        }
    }
    Ok(())
}

fn read_style_sheet(
    source: &mut dyn TokenSource,
    collector: &mut dyn Collector,
    state: &mut DocState,
    attributes: &[(Token, String)],
) -> Result<()> {
    let id = attr_id(attributes, Token::Id);
    let line_parent = attr_id(attributes, Token::LineStyle);
    let fill_parent = attr_id(attributes, Token::FillStyle);
    let text_parent = attr_id(attributes, Token::TextStyle);
    collector.collect_style_sheet(id, LEVEL_PAGE_SHEET, line_parent, fill_parent, text_parent);

    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token,
                is_empty,
                ..
            } => match token {
                Token::Line if !is_empty => {
                    let style = read_line(source, state)?;
                    collector.collect_line_style(LEVEL_PAGE_SHEET + 1, &style);
                }
                Token::Fill if !is_empty => {
                    let style = read_fill(source, state)?;
                    collector.collect_fill_style(LEVEL_PAGE_SHEET + 1, &style);
                }
                Token::TextBlock if !is_empty => {
                    let style = read_text_block(source, state)?;
                    collector.collect_text_block_style(LEVEL_PAGE_SHEET + 1, &style);
                }
                Token::Char if !is_empty => {
                    let style = read_char(source, state)?;
                    collector.collect_char_ix_style(LEVEL_PAGE_SHEET + 1, &style);
                }
                Token::Para if !is_empty => {
                    let style = read_para(source)?;
                    collector.collect_para_ix_style(LEVEL_PAGE_SHEET + 1, &style);
                }
                other => {
                    if !is_empty {
                        skip_element(source, other)?;
                    }
                }
            },
            XmlNode::EndElement {
                token: Token::StyleSheet,
            } => break,
            _ => {}
        }
    }
    Ok(())
}

fn read_masters(source: &mut dyn TokenSource, state: &mut DocState) -> Result<()> {
    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token: Token::Master,
                attributes,
                is_empty,
            } if !is_empty => {
                let id = attr_id(&attributes, Token::Id);
                let mut stencil = Stencil::new();
                while let Some(inner) = source.next_node()? {
                    match inner {
                        XmlNode::StartElement {
                            token: Token::Shapes,
                            is_empty: false,
                            ..
                        } => {
                            let forest = read_shapes(source, state)?;
                            let mut flat = Vec::new();
                            for node in forest {
                                flatten_master(node, &mut flat);
                            }
                            for (shape_id, shape) in flat {
                                stencil.add_shape(shape_id, shape);
                            }
                        }
                        XmlNode::StartElement {
                            token: Token::PageSheet,
                            is_empty: false,
                            ..
                        } => {
                            let props = read_page_sheet(source, state)?;
                            stencil.shadow_offset_x = props.shadow_offset_x;
                            stencil.shadow_offset_y = props.shadow_offset_y;
                        }
                        XmlNode::EndElement {
                            token: Token::Master,
                        } => break,
                        _ => {}
                    }
                }
                state.stencils.add_stencil(id, stencil);
            }
            XmlNode::EndElement {
                token: Token::Masters,
            } => break,
            _ => {}
        }
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, Default)]
struct PageProps {
    width: f64,
    height: f64,
    shadow_offset_x: f64,
    shadow_offset_y: f64,
    scale: f64,
}

fn read_page_sheet(source: &mut dyn TokenSource, _state: &mut DocState) -> Result<PageProps> {
    let mut props = PageProps {
        scale: 1.0,
        ..PageProps::default()
    };
    let mut page_scale = 1.0;
    let mut drawing_scale = 1.0;
    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token,
                attributes,
                is_empty,
            } => match token {
                // Descend into the properties container.
                Token::PageProps => {}
                Token::PageWidth
                | Token::PageHeight
                | Token::ShdwOffsetX
                | Token::ShdwOffsetY
                | Token::PageScale
                | Token::DrawingScale => {
                    let value = read_scalar(source, token, &attributes, is_empty)?;
                    let double = value.as_deref().and_then(parse_double);
                    match token {
                        Token::PageWidth => props.width = double.unwrap_or(props.width),
                        Token::PageHeight => props.height = double.unwrap_or(props.height),
                        Token::ShdwOffsetX => {
                            props.shadow_offset_x = double.unwrap_or(props.shadow_offset_x);
                        }
                        Token::ShdwOffsetY => {
                            props.shadow_offset_y = -double.unwrap_or(-props.shadow_offset_y);
                        }
                        Token::PageScale => page_scale = double.unwrap_or(page_scale),
                        _ => drawing_scale = double.unwrap_or(drawing_scale),
                    }
                }
                other => {
                    if !is_empty {
                        skip_element(source, other)?;
                    }
                }
            },
            XmlNode::EndElement {
                token: Token::PageSheet,
            } => break,
            _ => {}
        }
    }
    props.scale = if drawing_scale != 0.0 {
        page_scale / drawing_scale
    } else {
        1.0
    };
    Ok(props)
}

fn read_page(
    source: &mut dyn TokenSource,
    collector: &mut dyn Collector,
    state: &mut DocState,
    attributes: &[(Token, String)],
) -> Result<()> {
    let id = attr_id(attributes, Token::Id);
    let background_id = attr_id(attributes, Token::BackPage);
    let is_background = XmlNode::attribute(attributes, Token::Background)
        .and_then(parse_bool)
        .unwrap_or(false);
    let name = XmlNode::attribute(attributes, Token::NameU)
        .or_else(|| XmlNode::attribute(attributes, Token::NameAttr))
        .unwrap_or("")
        .to_string();

    collector.start_page(id);
    collector.collect_page_sheet(id, LEVEL_PAGE_SHEET);

    let mut forest = Vec::new();
    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token: Token::PageSheet,
                is_empty: false,
                ..
            } => {
                let props = read_page_sheet(source, state)?;
                collector.collect_page_props(
                    id,
                    LEVEL_PAGE_SHEET,
                    props.width,
                    props.height,
                    props.shadow_offset_x,
                    props.shadow_offset_y,
                    props.scale,
                );
            }
            XmlNode::StartElement {
                token: Token::Shapes,
                is_empty: false,
                ..
            } => {
                forest = read_shapes(source, state)?;
            }
            XmlNode::EndElement { token: Token::Page } => break,
            _ => {}
        }
    }

    collector.collect_page(id, LEVEL_PAGE_SHEET, background_id, is_background, &name);
    emit_shapes(collector, &forest);
    collector.end_page();
    Ok(())
}

pub(super) fn attr_id(attributes: &[(Token, String)], token: Token) -> u32 {
    XmlNode::attribute(attributes, token)
        .and_then(parse_long)
        .map(|v| v as u32)
        .unwrap_or(MINUS_ONE)
}

fn read_shapes(source: &mut dyn TokenSource, state: &mut DocState) -> Result<Vec<XmlShape>> {
    let mut shapes = Vec::new();
    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token: Token::Shape,
                attributes,
                is_empty,
            } if !is_empty => {
                shapes.push(read_shape(source, state, &attributes)?);
            }
            XmlNode::EndElement {
                token: Token::Shapes,
            } => break,
            _ => {}
        }
    }
    Ok(shapes)
}

fn read_shape(
    source: &mut dyn TokenSource,
    state: &mut DocState,
    attributes: &[(Token, String)],
) -> Result<XmlShape> {
    let mut node = XmlShape::new();
    node.shape.shape_id = attr_id(attributes, Token::Id);
    node.shape.master_page = attr_id(attributes, Token::Master);
    node.shape.master_shape = attr_id(attributes, Token::MasterShape);
    node.shape.line_style_id = attr_id(attributes, Token::LineStyle);
    node.shape.fill_style_id = attr_id(attributes, Token::FillStyle);
    node.shape.text_style_id = attr_id(attributes, Token::TextStyle);

    let mut saw_xform = false;
    let mut geom_count = 0u32;

    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token,
                attributes,
                is_empty,
            } => match token {
                Token::XForm if !is_empty => {
                    read_xform(source, &mut node)?;
                    saw_xform = true;
                }
                Token::TextXForm if !is_empty => read_text_xform(source, &mut node)?,
                Token::Line if !is_empty => node.shape.line_style = read_line(source, state)?,
                Token::Fill if !is_empty => node.shape.fill_style = read_fill(source, state)?,
                Token::TextBlock if !is_empty => {
                    node.shape.text_block_style = read_text_block(source, state)?;
                }
                Token::Char => {
                    let ix = XmlNode::attribute(&attributes, Token::Ix)
                        .and_then(parse_long)
                        .unwrap_or(0) as u32;
                    if !is_empty {
                        let style = read_char(source, state)?;
                        node.char_rows.insert(ix, style);
                    }
                }
                Token::Para => {
                    let ix = XmlNode::attribute(&attributes, Token::Ix)
                        .and_then(parse_long)
                        .unwrap_or(0) as u32;
                    if !is_empty {
                        let style = read_para(source)?;
                        node.para_rows.insert(ix, style);
                    }
                }
                Token::Geom if !is_empty => {
                    let ix = XmlNode::attribute(&attributes, Token::Ix)
                        .and_then(parse_long)
                        .unwrap_or(i64::from(geom_count)) as u32;
                    let list = read_geometry(source)?;
                    node.shape.geometries.insert(ix, list);
                    geom_count += 1;
                }
                Token::Text if !is_empty => read_text(source, &mut node)?,
                Token::Shapes if !is_empty => {
                    node.children = read_shapes(source, state)?;
                }
                Token::Foreign | Token::ForeignData => {
                    // Embedded objects only travel in the binary container.
                    warn!("skipping xml foreign data");
                    if !is_empty {
                        skip_element(source, token)?;
                    }
                }
                other => {
                    if !is_empty {
                        skip_element(source, other)?;
                    }
                }
            },
            XmlNode::EndElement {
                token: Token::Shape,
            } => break,
            _ => {}
        }
    }

    // An instance without its own transform inherits the master's.
    if !saw_xform {
        if let Some(master) = state
            .stencils
            .shape(node.shape.master_page, node.shape.master_shape)
        {
            node.shape.xform = master.xform;
        }
    }
    Ok(node)
}

fn read_xform(source: &mut dyn TokenSource, node: &mut XmlShape) -> Result<()> {
    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token,
                attributes,
                is_empty,
            } => {
                let value = read_scalar(source, token, &attributes, is_empty)?;
                let xform = &mut node.shape.xform;
                match token {
                    Token::PinX => apply_double(&value, &mut xform.pin_x),
                    Token::PinY => apply_double(&value, &mut xform.pin_y),
                    Token::Width => apply_double(&value, &mut xform.width),
                    Token::Height => apply_double(&value, &mut xform.height),
                    Token::LocPinX => apply_double(&value, &mut xform.pin_loc_x),
                    Token::LocPinY => apply_double(&value, &mut xform.pin_loc_y),
                    Token::Angle => apply_double(&value, &mut xform.angle),
                    Token::FlipX => apply_bool(&value, &mut xform.flip_x),
                    Token::FlipY => apply_bool(&value, &mut xform.flip_y),
                    _ => {}
                }
            }
            XmlNode::EndElement {
                token: Token::XForm,
            } => break,
            _ => {}
        }
    }
    Ok(())
}

fn read_text_xform(source: &mut dyn TokenSource, node: &mut XmlShape) -> Result<()> {
    let mut xform = node.shape.txtxform.take().unwrap_or_default();
    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token,
                attributes,
                is_empty,
            } => {
                let value = read_scalar(source, token, &attributes, is_empty)?;
                match token {
                    Token::TxtPinX => apply_double(&value, &mut xform.pin_x),
                    Token::TxtPinY => apply_double(&value, &mut xform.pin_y),
                    Token::TxtWidth => apply_double(&value, &mut xform.width),
                    Token::TxtHeight => apply_double(&value, &mut xform.height),
                    Token::TxtLocPinX => apply_double(&value, &mut xform.pin_loc_x),
                    Token::TxtLocPinY => apply_double(&value, &mut xform.pin_loc_y),
                    Token::TxtAngle => apply_double(&value, &mut xform.angle),
                    _ => {}
                }
            }
            XmlNode::EndElement {
                token: Token::TextXForm,
            } => break,
            _ => {}
        }
    }
    node.shape.txtxform = Some(xform);
    Ok(())
}

fn apply_double(value: &Option<String>, slot: &mut f64) {
    if let Some(v) = value.as_deref().and_then(parse_double) {
        *slot = v;
    }
}

fn apply_bool(value: &Option<String>, slot: &mut bool) {
    if let Some(v) = value.as_deref().and_then(parse_bool) {
        *slot = v;
    }
}

fn read_line(source: &mut dyn TokenSource, state: &DocState) -> Result<OptionalLineStyle> {
    let mut style = OptionalLineStyle::default();
    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token,
                attributes,
                is_empty,
            } => {
                let value = read_scalar(source, token, &attributes, is_empty)?;
                let value = value.as_deref();
                match token {
                    Token::LineWeight => style.width = value.and_then(parse_double),
                    Token::LineColor => {
                        style.colour = value.and_then(|v| parse_colour(v, &state.colours));
                    }
                    Token::LinePattern => {
                        style.pattern = value.and_then(parse_long).map(|v| v as u8);
                    }
                    Token::BeginArrow => {
                        style.start_marker = value.and_then(parse_long).map(|v| v as u8);
                    }
                    Token::EndArrow => {
                        style.end_marker = value.and_then(parse_long).map(|v| v as u8);
                    }
                    Token::LineCap => style.cap = value.and_then(parse_long).map(|v| v as u8),
                    _ => {}
                }
            }
            XmlNode::EndElement { token: Token::Line } => break,
            _ => {}
        }
    }
    Ok(style)
}

fn read_fill(source: &mut dyn TokenSource, state: &DocState) -> Result<OptionalFillStyle> {
    let mut style = OptionalFillStyle::default();
    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token,
                attributes,
                is_empty,
            } => {
                let value = read_scalar(source, token, &attributes, is_empty)?;
                let value = value.as_deref();
                match token {
                    Token::FillForegnd => {
                        style.fg_colour = value.and_then(|v| parse_colour(v, &state.colours));
                    }
                    Token::FillBkgnd => {
                        style.bg_colour = value.and_then(|v| parse_colour(v, &state.colours));
                    }
                    Token::FillPattern => {
                        style.pattern = value.and_then(parse_long).map(|v| v as u8);
                    }
                    Token::FillForegndTrans => {
                        style.fg_transparency = value.and_then(parse_double);
                    }
                    Token::FillBkgndTrans => {
                        style.bg_transparency = value.and_then(parse_double);
                    }
                    Token::ShdwForegnd => {
                        style.shadow_fg_colour = value.and_then(|v| parse_colour(v, &state.colours));
                    }
                    Token::ShdwPattern => {
                        style.shadow_pattern = value.and_then(parse_long).map(|v| v as u8);
                    }
                    Token::ShapeShdwOffsetX => {
                        style.shadow_offset_x = value.and_then(shadow_offset_double);
                    }
                    Token::ShapeShdwOffsetY => {
                        style.shadow_offset_y = value.and_then(shadow_offset_double).map(|v| -v);
                    }
                    _ => {}
                }
            }
            XmlNode::EndElement { token: Token::Fill } => break,
            _ => {}
        }
    }
    Ok(style)
}

/// Shadow offsets clamp through the low byte, matching the long-standing
/// observable behaviour of this reader; the clamp is logged when it bites.
fn shadow_offset_double(value: &str) -> Option<f64> {
    let parsed = parse_double(value)?;
    let clamped = f64::from(parsed as u8);
    if clamped != parsed {
        warn!("shadow offset {parsed} clamped to low byte {clamped}");
    }
    Some(clamped)
}

fn read_text_block(source: &mut dyn TokenSource, state: &DocState) -> Result<OptionalTextBlockStyle> {
    let mut style = OptionalTextBlockStyle::default();
    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token,
                attributes,
                is_empty,
            } => {
                let value = read_scalar(source, token, &attributes, is_empty)?;
                let value = value.as_deref();
                match token {
                    Token::LeftMargin => style.left_margin = value.and_then(parse_double),
                    Token::RightMargin => style.right_margin = value.and_then(parse_double),
                    Token::TopMargin => style.top_margin = value.and_then(parse_double),
                    Token::BottomMargin => style.bottom_margin = value.and_then(parse_double),
                    Token::VerticalAlign => {
                        style.vertical_align = value.and_then(parse_long).map(|v| v as u8);
                    }
                    Token::TextBkgnd => {
                        // 0 = unfilled; a colour reference is offset by one.
                        if let Some(index) = value.and_then(parse_long) {
                            if index == 0 {
                                style.is_text_bkgnd_filled = Some(false);
                            } else {
                                style.is_text_bkgnd_filled = Some(true);
                                style.text_bkgnd_colour = state
                                    .colours
                                    .get((index - 1).max(0) as usize)
                                    .copied()
                                    .or(style.text_bkgnd_colour);
                            }
                        } else if let Some(colour) = value.and_then(|v| parse_colour(v, &state.colours)) {
                            style.is_text_bkgnd_filled = Some(true);
                            style.text_bkgnd_colour = Some(colour);
                        }
                    }
                    Token::DefaultTabStop => style.default_tab_stop = value.and_then(parse_double),
                    Token::TextDirection => {
                        style.text_direction = value.and_then(parse_long).map(|v| v as u8);
                    }
                    _ => {}
                }
            }
            XmlNode::EndElement {
                token: Token::TextBlock,
            } => break,
            _ => {}
        }
    }
    Ok(style)
}

fn read_char(source: &mut dyn TokenSource, state: &DocState) -> Result<OptionalCharStyle> {
    let mut style = OptionalCharStyle::default();
    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token,
                attributes,
                is_empty,
            } => {
                let value = read_scalar(source, token, &attributes, is_empty)?;
                let value = value.as_deref();
                match token {
                    Token::Font => style.font_id = value.and_then(parse_long).map(|v| v as u16),
                    Token::Color => {
                        style.colour = value.and_then(|v| parse_colour(v, &state.colours));
                    }
                    Token::Size => style.size = value.and_then(parse_double),
                    Token::FontStyle => {
                        if let Some(bits) = value.and_then(parse_long) {
                            style.bold = Some(bits & 1 != 0);
                            style.italic = Some(bits & 2 != 0);
                            style.underline = Some(bits & 4 != 0);
                            style.smallcaps = Some(bits & 8 != 0);
                        }
                    }
                    Token::Case => {
                        if let Some(case) = value.and_then(parse_long) {
                            style.allcaps = Some(case == 1);
                            style.initcaps = Some(case == 2);
                        }
                    }
                    Token::Pos => {
                        if let Some(pos) = value.and_then(parse_long) {
                            style.superscript = Some(pos == 1);
                            style.subscript = Some(pos == 2);
                        }
                    }
                    _ => {}
                }
            }
            XmlNode::EndElement { token: Token::Char } => break,
            _ => {}
        }
    }
    Ok(style)
}

fn read_para(source: &mut dyn TokenSource) -> Result<OptionalParaStyle> {
    let mut style = OptionalParaStyle::default();
    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token,
                attributes,
                is_empty,
            } => {
                let value = read_scalar(source, token, &attributes, is_empty)?;
                let value = value.as_deref();
                match token {
                    Token::IndFirst => style.ind_first = value.and_then(parse_double),
                    Token::IndLeft => style.ind_left = value.and_then(parse_double),
                    Token::IndRight => style.ind_right = value.and_then(parse_double),
                    Token::SpLine => style.sp_line = value.and_then(parse_double),
                    Token::SpBefore => style.sp_before = value.and_then(parse_double),
                    Token::SpAfter => style.sp_after = value.and_then(parse_double),
                    Token::HorzAlign => style.align = value.and_then(parse_long).map(|v| v as u8),
                    Token::Flags => style.flags = value.and_then(parse_long).map(|v| v as u32),
                    _ => {}
                }
            }
            XmlNode::EndElement { token: Token::Para } => break,
            _ => {}
        }
    }
    Ok(style)
}

fn read_geometry(source: &mut dyn TokenSource) -> Result<GeometryList> {
    let mut list = GeometryList::new();
    let mut no_fill = false;
    let mut no_line = false;
    let mut no_show = false;

    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token,
                attributes,
                is_empty,
            } => {
                // Row ids shift up by one so the section flags sit at id 0.
                let ix = XmlNode::attribute(&attributes, Token::Ix)
                    .and_then(parse_long)
                    .map(|v| v as u32 + 1)
                    .unwrap_or(list.len() as u32 + 1);
                let deleted = XmlNode::attribute(&attributes, Token::Del) == Some("1");
                match token {
                    Token::NoFill | Token::NoLine | Token::NoShow => {
                        let value = read_scalar(source, token, &attributes, is_empty)?
                            .as_deref()
                            .and_then(parse_bool)
                            .unwrap_or(false);
                        match token {
                            Token::NoFill => no_fill = value,
                            Token::NoLine => no_line = value,
                            _ => no_show = value,
                        }
                    }
                    Token::MoveTo
                    | Token::LineTo
                    | Token::ArcTo
                    | Token::EllipticalArcTo
                    | Token::Ellipse
                    | Token::InfiniteLine
                    | Token::NurbsTo
                    | Token::PolylineTo
                    | Token::SplineStart
                    | Token::SplineKnot
                    | Token::RelMoveTo
                    | Token::RelLineTo
                    | Token::RelCubBezTo
                    | Token::RelQuadBezTo
                    | Token::RelEllipticalArcTo => {
                        if is_empty || deleted {
                            if !is_empty {
                                skip_element(source, token)?;
                            }
                        } else if let Some(element) = read_geometry_row(source, token)? {
                            list.add(ix, reader::LEVEL_ROW, element);
                        }
                    }
                    other => {
                        if !is_empty {
                            skip_element(source, other)?;
                        }
                    }
                }
            }
            XmlNode::EndElement { token: Token::Geom } => break,
            _ => {}
        }
    }

    list.add(
        0,
        reader::LEVEL_ROW,
        GeometryElement::Geometry {
            no_fill,
            no_line,
            no_show,
        },
    );
    Ok(list)
}

/// Reads one geometry row's cells and builds the element. `None` when the
/// row kind is unknown.
fn read_geometry_row(source: &mut dyn TokenSource, row: Token) -> Result<Option<GeometryElement>> {
    let mut x = None;
    let mut y = None;
    let mut a = None;
    let mut b = None;
    let mut c = None;
    let mut d = None;
    let mut formula: Option<String> = None;

    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token,
                attributes,
                is_empty,
            } => {
                let value = read_scalar(source, token, &attributes, is_empty)?;
                match token {
                    Token::X => x = value.as_deref().and_then(parse_double),
                    Token::Y => y = value.as_deref().and_then(parse_double),
                    Token::A => {
                        a = value.as_deref().and_then(parse_double);
                        if a.is_none() {
                            formula = formula.or(value);
                        }
                    }
                    Token::B => b = value.as_deref().and_then(parse_double),
                    Token::C => c = value.as_deref().and_then(parse_double),
                    Token::D => d = value.as_deref().and_then(parse_double),
                    Token::E => formula = value.or(formula),
                    _ => {}
                }
            }
            XmlNode::EndElement { token } if token == row => break,
            _ => {}
        }
    }

    Ok(build_geometry_element(row, x, y, a, b, c, d, formula))
}

#[allow(clippy::too_many_arguments)]
pub(super) fn build_geometry_element(
    row: Token,
    x: Option<f64>,
    y: Option<f64>,
    a: Option<f64>,
    b: Option<f64>,
    c: Option<f64>,
    d: Option<f64>,
    formula: Option<String>,
) -> Option<GeometryElement> {
    let x0 = x.unwrap_or(0.0);
    let y0 = y.unwrap_or(0.0);
    match row {
        Token::MoveTo => Some(GeometryElement::MoveTo { x: x0, y: y0 }),
        Token::LineTo => Some(GeometryElement::LineTo { x: x0, y: y0 }),
        Token::ArcTo => Some(GeometryElement::ArcTo {
            x2: x0,
            y2: y0,
            bow: a.unwrap_or(0.0),
        }),
        Token::EllipticalArcTo => Some(GeometryElement::EllipticalArcTo {
            x3: x0,
            y3: y0,
            x2: a.unwrap_or(0.0),
            y2: b.unwrap_or(0.0),
            angle: c.unwrap_or(0.0),
            ecc: d.unwrap_or(1.0),
        }),
        Token::Ellipse => Some(GeometryElement::Ellipse {
            cx: x0,
            cy: y0,
            xleft: a.unwrap_or(0.0),
            yleft: b.unwrap_or(0.0),
            xtop: c.unwrap_or(0.0),
            ytop: d.unwrap_or(0.0),
        }),
        Token::InfiniteLine => Some(GeometryElement::InfiniteLine {
            x1: x0,
            y1: y0,
            x2: a.unwrap_or(0.0),
            y2: b.unwrap_or(0.0),
        }),
        Token::SplineStart => Some(GeometryElement::SplineStart {
            x: x0,
            y: y0,
            second_knot: a.unwrap_or(0.0),
            first_knot: b.unwrap_or(0.0),
            last_knot: c.unwrap_or(0.0),
            degree: d.unwrap_or(3.0) as u8,
        }),
        Token::SplineKnot => Some(GeometryElement::SplineKnot {
            x: x0,
            y: y0,
            knot: a.unwrap_or(0.0),
        }),
        Token::RelMoveTo => Some(GeometryElement::RelMoveTo { x: x0, y: y0 }),
        Token::RelLineTo => Some(GeometryElement::RelLineTo { x: x0, y: y0 }),
        Token::RelCubBezTo => Some(GeometryElement::RelCubBezTo {
            x: x0,
            y: y0,
            a: a.unwrap_or(0.0),
            b: b.unwrap_or(0.0),
            c: c.unwrap_or(0.0),
            d: d.unwrap_or(0.0),
        }),
        Token::RelQuadBezTo => Some(GeometryElement::RelQuadBezTo {
            x: x0,
            y: y0,
            a: a.unwrap_or(0.0),
            b: b.unwrap_or(0.0),
        }),
        Token::RelEllipticalArcTo => Some(GeometryElement::RelEllipticalArcTo {
            x: x0,
            y: y0,
            a: a.unwrap_or(0.0),
            b: b.unwrap_or(0.0),
            c: c.unwrap_or(0.0),
            d: d.unwrap_or(1.0),
        }),
        Token::NurbsTo => Some(parse_nurbs_formula(formula.as_deref(), x0, y0, a, b, c, d)),
        Token::PolylineTo => Some(parse_polyline_formula(formula.as_deref(), x0, y0)),
        _ => None,
    }
}

/// `NURBS(lastKnot, degree, xType, yType, x1, y1, knot1, weight1, ...)`.
fn parse_nurbs_formula(
    formula: Option<&str>,
    x: f64,
    y: f64,
    knot: Option<f64>,
    weight: Option<f64>,
    knot_prev: Option<f64>,
    weight_prev: Option<f64>,
) -> GeometryElement {
    let Some(args) = formula_args(formula, "NURBS(") else {
        return GeometryElement::LineTo { x, y };
    };
    if args.len() < 4 {
        return GeometryElement::LineTo { x, y };
    }
    let last_knot = args[0];
    let degree = args[1] as u8;
    let x_type = args[2] as u8;
    let y_type = args[3] as u8;

    let mut control_points = Vec::new();
    let mut knots = vec![knot_prev.unwrap_or(0.0)];
    let mut weights = vec![weight_prev.unwrap_or(1.0)];
    for quad in args[4..].chunks_exact(4) {
        control_points.push((quad[0], quad[1]));
        knots.push(quad[2]);
        weights.push(quad[3]);
    }
    knots.push(knot.unwrap_or(last_knot));
    knots.push(last_knot);
    weights.push(weight.unwrap_or(1.0));

    GeometryElement::NurbsTo {
        x2: x,
        y2: y,
        x_type,
        y_type,
        degree,
        control_points,
        knots,
        weights,
    }
}

/// `POLYLINE(xType, yType, x1, y1, ...)`.
fn parse_polyline_formula(formula: Option<&str>, x: f64, y: f64) -> GeometryElement {
    let Some(args) = formula_args(formula, "POLYLINE(") else {
        return GeometryElement::LineTo { x, y };
    };
    if args.len() < 2 {
        return GeometryElement::LineTo { x, y };
    }
    let x_type = args[0] as u8;
    let y_type = args[1] as u8;
    let points = args[2..]
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect();
    GeometryElement::PolylineTo {
        x,
        y,
        x_type,
        y_type,
        points,
    }
}

fn formula_args(formula: Option<&str>, prefix: &str) -> Option<Vec<f64>> {
    let formula = formula?.trim();
    let rest = formula.strip_prefix(prefix)?;
    let body = rest.strip_suffix(')')?;
    body.split(',')
        .map(|arg| parse_double(arg).ok_or(()))
        .collect::<core::result::Result<Vec<_>, ()>>()
        .ok()
}
