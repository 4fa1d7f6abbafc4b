// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The VSDX (OPC package) parser: generic `Cell`/`Section`/`Row` elements
//! spread over relationship-linked parts.

use hashbrown::HashMap;

use log::{debug, warn};

use crate::collector::Collector;
use crate::content::ContentCollector;
use crate::error::{ParseError, Result};
use crate::geometry::{GeometryElement, GeometryList};
use crate::stencil::{Stencil, Stencils};
use crate::style::{OptionalCharStyle, OptionalParaStyle};
use crate::styles_collector::StylesCollector;

use super::reader::{
    emit_shapes, flatten_master, read_text, skip_element, XmlShape, LEVEL_PAGE_SHEET, LEVEL_ROW,
};
use super::vdx::{attr_id, build_geometry_element};
use super::{parse_bool, parse_colour, parse_double, parse_long, tokens, Token, TokenSource, XmlNode};

/// Provides package parts as token streams, by OPC part name.
///
/// The ZIP reader and the XML lexer are external; a part may be requested
/// more than once (once per collection pass).
pub trait Package {
    fn part(&self, name: &str) -> Option<Box<dyn TokenSource + '_>>;
}

/// One `.rels` relationship.
#[derive(Clone, Debug, Default)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

/// The VSDX parser.
pub struct VsdxParser<'a> {
    package: &'a dyn Package,
}

impl core::fmt::Debug for VsdxParser<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VsdxParser").finish_non_exhaustive()
    }
}

impl<'a> VsdxParser<'a> {
    pub fn new(package: &'a dyn Package) -> Self {
        Self { package }
    }

    pub fn parse(&mut self, painter: &mut dyn stencio_draw::Painter) -> Result<()> {
        let root_rels = self.read_rels("_rels/.rels")?;
        let document = root_rels
            .iter()
            .find(|r| r.rel_type.ends_with("/document"))
            .map(|r| r.target.clone())
            .ok_or_else(|| ParseError::MissingPart("document".to_string()))?;
        let document_rels = self.read_rels(&rels_name(&document))?;
        let base = part_directory(&document);

        let masters = document_rels
            .iter()
            .find(|r| r.rel_type.ends_with("/masters"))
            .map(|r| resolve_target(&base, &r.target));
        let pages = document_rels
            .iter()
            .find(|r| r.rel_type.ends_with("/pages"))
            .map(|r| resolve_target(&base, &r.target))
            .ok_or_else(|| ParseError::MissingPart("pages".to_string()))?;
        // Theme and core-properties parts are recognised but not consumed.
        for rel in &document_rels {
            if rel.rel_type.ends_with("/theme") || rel.rel_type.ends_with("/core-properties") {
                debug!("ignoring package part {}", rel.target);
            }
        }

        let mut stencils = Stencils::new();
        if let Some(masters) = &masters {
            self.load_masters(masters, &mut stencils)?;
        }

        let mut styles_collector = StylesCollector::new();
        self.process_pages(&pages, &mut styles_collector)?;
        let layout = styles_collector.into_layout();

        let mut content_collector = ContentCollector::new(painter, layout, stencils);
        self.process_pages(&pages, &mut content_collector)?;
        content_collector.end_pages();
        Ok(())
    }

    fn read_rels(&self, name: &str) -> Result<Vec<Relationship>> {
        let Some(mut source) = self.package.part(name) else {
            return Ok(Vec::new());
        };
        let mut rels = Vec::new();
        while let Some(event) = source.next_node()? {
            if let XmlNode::StartElement {
                token: Token::Relationship,
                attributes,
                ..
            } = event
            {
                rels.push(Relationship {
                    id: XmlNode::attribute(&attributes, Token::Id)
                        .unwrap_or("")
                        .to_string(),
                    rel_type: XmlNode::attribute(&attributes, Token::RelationshipType)
                        .unwrap_or("")
                        .to_string(),
                    target: XmlNode::attribute(&attributes, Token::Target)
                        .unwrap_or("")
                        .to_string(),
                });
            }
        }
        Ok(rels)
    }

    /// Loads every master into the stencil registry before any page parses.
    fn load_masters(&self, masters_part: &str, stencils: &mut Stencils) -> Result<()> {
        let rels = self.read_rels(&rels_name(masters_part))?;
        let rel_map: HashMap<&str, &Relationship> =
            rels.iter().map(|r| (r.id.as_str(), r)).collect();
        let base = part_directory(masters_part);

        let Some(mut source) = self.package.part(masters_part) else {
            return Ok(());
        };
        while let Some(event) = source.next_node()? {
            let XmlNode::StartElement {
                token: Token::Master,
                attributes,
                is_empty,
            } = event
            else {
                continue;
            };
            let master_id = attr_id(&attributes, Token::Id);
            let mut part_name = None;
            if !is_empty {
                while let Some(inner) = source.next_node()? {
                    match inner {
                        XmlNode::StartElement {
                            token: Token::Rel,
                            attributes,
                            ..
                        } => {
                            part_name = XmlNode::attribute(&attributes, Token::RelId)
                                .and_then(|rid| rel_map.get(rid))
                                .map(|rel| resolve_target(&base, &rel.target));
                        }
                        XmlNode::EndElement {
                            token: Token::Master,
                        } => break,
                        _ => {}
                    }
                }
            }
            let Some(part_name) = part_name else {
                warn!("master {master_id} has no content part");
                continue;
            };
            let Some(mut part) = self.package.part(&part_name) else {
                warn!("missing master part {part_name}");
                continue;
            };
            let mut stencil = Stencil::new();
            let forest = read_contents(&mut *part)?;
            let mut flat = Vec::new();
            for node in forest {
                flatten_master(node, &mut flat);
            }
            for (shape_id, shape) in flat {
                stencil.add_shape(shape_id, shape);
            }
            stencils.add_stencil(master_id, stencil);
        }
        Ok(())
    }

    /// Walks the page index part and each page's contents in order.
    fn process_pages(&self, pages_part: &str, collector: &mut dyn Collector) -> Result<()> {
        let rels = self.read_rels(&rels_name(pages_part))?;
        let rel_map: HashMap<&str, &Relationship> =
            rels.iter().map(|r| (r.id.as_str(), r)).collect();
        let base = part_directory(pages_part);

        let Some(mut source) = self.package.part(pages_part) else {
            return Err(ParseError::MissingPart(pages_part.to_string()));
        };
        while let Some(event) = source.next_node()? {
            let XmlNode::StartElement {
                token: Token::Page,
                attributes,
                is_empty,
            } = event
            else {
                continue;
            };
            if is_empty {
                continue;
            }
            let id = attr_id(&attributes, Token::Id);
            let background_id = attr_id(&attributes, Token::BackPage);
            let is_background = XmlNode::attribute(&attributes, Token::Background)
                .and_then(parse_bool)
                .unwrap_or(false);
            let name = XmlNode::attribute(&attributes, Token::NameU)
                .or_else(|| XmlNode::attribute(&attributes, Token::NameAttr))
                .unwrap_or("")
                .to_string();

            let mut props = PageCells::default();
            let mut part_name = None;
            while let Some(inner) = source.next_node()? {
                match inner {
                    XmlNode::StartElement {
                        token: Token::PageSheet,
                        is_empty: false,
                        ..
                    } => read_page_cells(&mut *source, &mut props)?,
                    XmlNode::StartElement {
                        token: Token::Rel,
                        attributes,
                        ..
                    } => {
                        part_name = XmlNode::attribute(&attributes, Token::RelId)
                            .and_then(|rid| rel_map.get(rid))
                            .map(|rel| resolve_target(&base, &rel.target));
                    }
                    XmlNode::EndElement { token: Token::Page } => break,
                    _ => {}
                }
            }

            collector.start_page(id);
            collector.collect_page_sheet(id, LEVEL_PAGE_SHEET);
            collector.collect_page_props(
                id,
                LEVEL_PAGE_SHEET,
                props.width,
                props.height,
                props.shadow_offset_x,
                props.shadow_offset_y,
                props.scale(),
            );
            collector.collect_page(id, LEVEL_PAGE_SHEET, background_id, is_background, &name);

            if let Some(part_name) = part_name {
                match self.package.part(&part_name) {
                    Some(mut part) => {
                        let forest = read_contents(&mut *part)?;
                        emit_shapes(collector, &forest);
                    }
                    None => warn!("missing page part {part_name}"),
                }
            }
            collector.end_page();
        }
        Ok(())
    }
}

/// The `_rels` sibling of a part.
fn rels_name(part: &str) -> String {
    let (dir, file) = match part.rfind('/') {
        Some(pos) => (&part[..pos + 1], &part[pos + 1..]),
        None => ("", part),
    };
    format!("{dir}_rels/{file}.rels")
}

fn part_directory(part: &str) -> String {
    match part.rfind('/') {
        Some(pos) => part[..pos + 1].to_string(),
        None => String::new(),
    }
}

/// Resolves a relationship target against its source part's directory.
fn resolve_target(base: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[derive(Clone, Copy, Debug, Default)]
struct PageCells {
    width: f64,
    height: f64,
    shadow_offset_x: f64,
    shadow_offset_y: f64,
    page_scale: f64,
    drawing_scale: f64,
}

impl PageCells {
    fn scale(&self) -> f64 {
        if self.drawing_scale != 0.0 && self.page_scale != 0.0 {
            self.page_scale / self.drawing_scale
        } else {
            1.0
        }
    }
}

fn read_page_cells(source: &mut dyn TokenSource, props: &mut PageCells) -> Result<()> {
    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token: Token::Cell,
                attributes,
                ..
            } => {
                let Some((name, value)) = cell_name_value(&attributes) else {
                    continue;
                };
                let double = parse_double(value).unwrap_or(0.0);
                match name {
                    Token::PageWidth => props.width = double,
                    Token::PageHeight => props.height = double,
                    Token::ShdwOffsetX => props.shadow_offset_x = double,
                    Token::ShdwOffsetY => props.shadow_offset_y = -double,
                    Token::PageScale => props.page_scale = double,
                    Token::DrawingScale => props.drawing_scale = double,
                    _ => {}
                }
            }
            XmlNode::EndElement {
                token: Token::PageSheet,
            } => break,
            _ => {}
        }
    }
    Ok(())
}

fn cell_name_value(attributes: &[(Token, String)]) -> Option<(Token, &str)> {
    let name = XmlNode::attribute(attributes, Token::N).map(tokens::lookup)?;
    let value = XmlNode::attribute(attributes, Token::V)?;
    Some((name, value))
}

/// Reads a `PageContents`/`MasterContents` part into a shape forest.
fn read_contents(source: &mut dyn TokenSource) -> Result<Vec<XmlShape>> {
    let mut forest = Vec::new();
    while let Some(event) = source.next_node()? {
        if let XmlNode::StartElement {
            token: Token::Shapes,
            is_empty: false,
            ..
        } = event
        {
            forest = read_cell_shapes(source)?;
        }
    }
    Ok(forest)
}

fn read_cell_shapes(source: &mut dyn TokenSource) -> Result<Vec<XmlShape>> {
    let mut shapes = Vec::new();
    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token: Token::Shape,
                attributes,
                is_empty,
            } if !is_empty => {
                shapes.push(read_cell_shape(source, &attributes)?);
            }
            XmlNode::EndElement {
                token: Token::Shapes,
            } => break,
            _ => {}
        }
    }
    Ok(shapes)
}

fn read_cell_shape(
    source: &mut dyn TokenSource,
    attributes: &[(Token, String)],
) -> Result<XmlShape> {
    let mut node = XmlShape::new();
    node.shape.shape_id = attr_id(attributes, Token::Id);
    node.shape.master_page = attr_id(attributes, Token::Master);
    node.shape.master_shape = attr_id(attributes, Token::MasterShape);
    node.shape.line_style_id = attr_id(attributes, Token::LineStyle);
    node.shape.fill_style_id = attr_id(attributes, Token::FillStyle);
    node.shape.text_style_id = attr_id(attributes, Token::TextStyle);

    let mut geom_count = 0u32;

    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token,
                attributes,
                is_empty,
            } => match token {
                Token::Cell => apply_shape_cell(&mut node, &attributes),
                Token::Section if !is_empty => {
                    let section = XmlNode::attribute(&attributes, Token::N)
                        .unwrap_or("")
                        .to_string();
                    match section.as_str() {
                        "Geometry" => {
                            let ix = XmlNode::attribute(&attributes, Token::Ix)
                                .and_then(parse_long)
                                .unwrap_or(i64::from(geom_count))
                                as u32;
                            let list = read_geometry_section(source)?;
                            node.shape.geometries.insert(ix, list);
                            geom_count += 1;
                        }
                        "Character" => read_run_section(source, &mut node, true)?,
                        "Paragraph" => read_run_section(source, &mut node, false)?,
                        _ => skip_element(source, Token::Section)?,
                    }
                }
                Token::Text if !is_empty => read_text(source, &mut node)?,
                Token::Shapes if !is_empty => node.children = read_cell_shapes(source)?,
                Token::ForeignData => {
                    warn!("skipping xml foreign data");
                    if !is_empty {
                        skip_element(source, Token::ForeignData)?;
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
    Ok(node)
}

/// Flat shape cells: transform, text transform, line, fill and text-block
/// values all sit directly under the shape element.
fn apply_shape_cell(node: &mut XmlShape, attributes: &[(Token, String)]) {
    let Some((name, value)) = cell_name_value(attributes) else {
        return;
    };
    let double = parse_double(value);
    let long = parse_long(value);
    let boolean = parse_bool(value);
    let colour = parse_colour(value, &[]);

    let shape = &mut node.shape;
    match name {
        Token::PinX => shape.xform.pin_x = double.unwrap_or(0.0),
        Token::PinY => shape.xform.pin_y = double.unwrap_or(0.0),
        Token::Width => shape.xform.width = double.unwrap_or(0.0),
        Token::Height => shape.xform.height = double.unwrap_or(0.0),
        Token::LocPinX => shape.xform.pin_loc_x = double.unwrap_or(0.0),
        Token::LocPinY => shape.xform.pin_loc_y = double.unwrap_or(0.0),
        Token::Angle => shape.xform.angle = double.unwrap_or(0.0),
        Token::FlipX => shape.xform.flip_x = boolean.unwrap_or(false),
        Token::FlipY => shape.xform.flip_y = boolean.unwrap_or(false),
        Token::TxtPinX => txtxform(shape).pin_x = double.unwrap_or(0.0),
        Token::TxtPinY => txtxform(shape).pin_y = double.unwrap_or(0.0),
        Token::TxtWidth => txtxform(shape).width = double.unwrap_or(0.0),
        Token::TxtHeight => txtxform(shape).height = double.unwrap_or(0.0),
        Token::TxtLocPinX => txtxform(shape).pin_loc_x = double.unwrap_or(0.0),
        Token::TxtLocPinY => txtxform(shape).pin_loc_y = double.unwrap_or(0.0),
        Token::TxtAngle => txtxform(shape).angle = double.unwrap_or(0.0),
        Token::LineWeight => shape.line_style.width = double,
        Token::LineColor => shape.line_style.colour = colour,
        Token::LinePattern => shape.line_style.pattern = long.map(|v| v as u8),
        Token::BeginArrow => shape.line_style.start_marker = long.map(|v| v as u8),
        Token::EndArrow => shape.line_style.end_marker = long.map(|v| v as u8),
        Token::LineCap => shape.line_style.cap = long.map(|v| v as u8),
        Token::FillForegnd => shape.fill_style.fg_colour = colour,
        Token::FillBkgnd => shape.fill_style.bg_colour = colour,
        Token::FillPattern => shape.fill_style.pattern = long.map(|v| v as u8),
        Token::FillForegndTrans => shape.fill_style.fg_transparency = double,
        Token::FillBkgndTrans => shape.fill_style.bg_transparency = double,
        Token::ShdwForegnd => shape.fill_style.shadow_fg_colour = colour,
        Token::ShdwPattern => shape.fill_style.shadow_pattern = long.map(|v| v as u8),
        Token::ShapeShdwOffsetX => shape.fill_style.shadow_offset_x = double,
        Token::ShapeShdwOffsetY => shape.fill_style.shadow_offset_y = double.map(|v| -v),
        Token::LeftMargin => shape.text_block_style.left_margin = double,
        Token::RightMargin => shape.text_block_style.right_margin = double,
        Token::TopMargin => shape.text_block_style.top_margin = double,
        Token::BottomMargin => shape.text_block_style.bottom_margin = double,
        Token::VerticalAlign => {
            shape.text_block_style.vertical_align = long.map(|v| v as u8);
        }
        Token::TextBkgnd => {
            if let Some(colour) = colour {
                shape.text_block_style.is_text_bkgnd_filled = Some(true);
                shape.text_block_style.text_bkgnd_colour = Some(colour);
            } else if long == Some(0) {
                shape.text_block_style.is_text_bkgnd_filled = Some(false);
            }
        }
        Token::DefaultTabStop => shape.text_block_style.default_tab_stop = double,
        Token::TextDirection => {
            shape.text_block_style.text_direction = long.map(|v| v as u8);
        }
        _ => {}
    }
}

fn txtxform(shape: &mut crate::shape::Shape) -> &mut crate::types::XForm {
    shape.txtxform.get_or_insert_with(Default::default)
}

fn read_geometry_section(source: &mut dyn TokenSource) -> Result<GeometryList> {
    let mut list = GeometryList::new();
    let mut no_fill = false;
    let mut no_line = false;
    let mut no_show = false;

    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token: Token::Cell,
                attributes,
                ..
            } => {
                if let Some((name, value)) = cell_name_value(&attributes) {
                    let flag = parse_bool(value).unwrap_or(false);
                    match name {
                        Token::NoFill => no_fill = flag,
                        Token::NoLine => no_line = flag,
                        Token::NoShow => no_show = flag,
                        _ => {}
                    }
                }
            }
            XmlNode::StartElement {
                token: Token::Row,
                attributes,
                is_empty,
            } => {
                let ix = XmlNode::attribute(&attributes, Token::Ix)
                    .and_then(parse_long)
                    .map(|v| v as u32 + 1)
                    .unwrap_or(list.len() as u32 + 1);
                let deleted = XmlNode::attribute(&attributes, Token::Del) == Some("1");
                let row = XmlNode::attribute(&attributes, Token::T)
                    .map(tokens::lookup)
                    .unwrap_or(Token::Unknown);
                if is_empty || deleted {
                    if !is_empty {
                        skip_element(source, Token::Row)?;
                    }
                    continue;
                }
                if let Some(element) = read_geometry_row_cells(source, row)? {
                    list.add(ix, LEVEL_ROW, element);
                }
            }
            XmlNode::EndElement {
                token: Token::Section,
            } => break,
            _ => {}
        }
    }

    list.add(
        0,
        LEVEL_ROW,
        GeometryElement::Geometry {
            no_fill,
            no_line,
            no_show,
        },
    );
    Ok(list)
}

fn read_geometry_row_cells(
    source: &mut dyn TokenSource,
    row: Token,
) -> Result<Option<GeometryElement>> {
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
                token: Token::Cell,
                attributes,
                ..
            } => {
                let Some((name, value)) = cell_name_value(&attributes) else {
                    continue;
                };
                let double = parse_double(value);
                match name {
                    Token::X => x = double,
                    Token::Y => y = double,
                    Token::A => {
                        a = double;
                        if double.is_none() {
                            formula = Some(value.to_string());
                        }
                    }
                    Token::B => b = double,
                    Token::C => c = double,
                    Token::D => d = double,
                    Token::E => formula = Some(value.to_string()),
                    _ => {}
                }
                // Formula attributes carry the NURBS/polyline data too.
                if formula.is_none() {
                    if let Some(f) = XmlNode::attribute(&attributes, Token::F) {
                        if f.starts_with("NURBS(") || f.starts_with("POLYLINE(") {
                            formula = Some(f.to_string());
                        }
                    }
                }
            }
            XmlNode::EndElement { token: Token::Row } => break,
            _ => {}
        }
    }

    Ok(build_geometry_element(row, x, y, a, b, c, d, formula))
}

/// Character or paragraph section rows.
fn read_run_section(
    source: &mut dyn TokenSource,
    node: &mut XmlShape,
    character: bool,
) -> Result<()> {
    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token: Token::Row,
                attributes,
                is_empty,
            } => {
                let ix = XmlNode::attribute(&attributes, Token::Ix)
                    .and_then(parse_long)
                    .unwrap_or(0) as u32;
                if is_empty {
                    continue;
                }
                if character {
                    let style = read_char_row(source)?;
                    node.char_rows.insert(ix, style);
                } else {
                    let style = read_para_row(source)?;
                    node.para_rows.insert(ix, style);
                }
            }
            XmlNode::EndElement {
                token: Token::Section,
            } => break,
            _ => {}
        }
    }
    Ok(())
}

fn read_char_row(source: &mut dyn TokenSource) -> Result<OptionalCharStyle> {
    let mut style = OptionalCharStyle::default();
    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token: Token::Cell,
                attributes,
                ..
            } => {
                let Some((name, value)) = cell_name_value(&attributes) else {
                    continue;
                };
                match name {
                    Token::Font => style.font_id = parse_long(value).map(|v| v as u16),
                    Token::Color => style.colour = parse_colour(value, &[]),
                    Token::Size => style.size = parse_double(value),
                    Token::FontStyle => {
                        if let Some(bits) = parse_long(value) {
                            style.bold = Some(bits & 1 != 0);
                            style.italic = Some(bits & 2 != 0);
                            style.underline = Some(bits & 4 != 0);
                            style.smallcaps = Some(bits & 8 != 0);
                        }
                    }
                    Token::Case => {
                        if let Some(case) = parse_long(value) {
                            style.allcaps = Some(case == 1);
                            style.initcaps = Some(case == 2);
                        }
                    }
                    Token::Pos => {
                        if let Some(pos) = parse_long(value) {
                            style.superscript = Some(pos == 1);
                            style.subscript = Some(pos == 2);
                        }
                    }
                    _ => {}
                }
            }
            XmlNode::EndElement { token: Token::Row } => break,
            _ => {}
        }
    }
    Ok(style)
}

fn read_para_row(source: &mut dyn TokenSource) -> Result<OptionalParaStyle> {
    let mut style = OptionalParaStyle::default();
    while let Some(event) = source.next_node()? {
        match event {
            XmlNode::StartElement {
                token: Token::Cell,
                attributes,
                ..
            } => {
                let Some((name, value)) = cell_name_value(&attributes) else {
                    continue;
                };
                match name {
                    Token::IndFirst => style.ind_first = parse_double(value),
                    Token::IndLeft => style.ind_left = parse_double(value),
                    Token::IndRight => style.ind_right = parse_double(value),
                    Token::SpLine => style.sp_line = parse_double(value),
                    Token::SpBefore => style.sp_before = parse_double(value),
                    Token::SpAfter => style.sp_after = parse_double(value),
                    Token::HorzAlign => style.align = parse_long(value).map(|v| v as u8),
                    Token::Flags => style.flags = parse_long(value).map(|v| v as u32),
                    _ => {}
                }
            }
            XmlNode::EndElement { token: Token::Row } => break,
            _ => {}
        }
    }
    Ok(style)
}
