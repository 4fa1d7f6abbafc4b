// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The binary (VSD/VSS/VST) chunk decoder.
//!
//! The container's `VisioDocument` stream holds a trailer stream whose
//! pointer table fans out into sub-streams (styles, stencils, pages), each
//! either a blob, a nested pointer list, or a run of chunks. The decoder
//! walks them twice: once against the styles collector, once against the
//! content collector.

mod header;
mod legacy;
mod records;

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::chunks::{self, ChunkHeader};
use crate::collector::Collector;
use crate::error::{ParseError, Result};
use crate::fields::FieldList;
use crate::geometry::GeometryList;
use crate::lists::{CharacterList, ParagraphList, ShapeList};
use crate::shape::Shape;
use crate::source::Stream;
use crate::stencil::{Stencil, Stencils};
use crate::types::{Colour, MINUS_ONE};

pub use header::Version;
use header::Pointer;

/// Parse-time options.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParseOptions {
    /// Render stencil pages as drawing pages (VSS extraction).
    pub extract_stencils: bool,
}

/// The version-dispatched binary parser.
#[derive(Debug)]
pub struct VsdParser<'a> {
    input: Stream<'a>,
    version: Version,
    options: ParseOptions,

    header: ChunkHeader,
    current_level: u32,
    current_shape_level: u32,
    current_shape_id: u32,
    is_in_styles: bool,
    is_background_page: bool,

    colours: Vec<Colour>,
    shadow_offset_x: f64,
    shadow_offset_y: f64,

    geom_list: GeometryList,
    geom_lists: Vec<GeometryList>,
    char_list: CharacterList,
    char_lists: Vec<CharacterList>,
    para_list: ParagraphList,
    para_lists: Vec<ParagraphList>,
    field_list: FieldList,
    shape_list: ShapeList,

    stencils: Stencils,
    current_stencil: Option<Stencil>,
    shape: Shape,
    is_stencil_started: bool,
    current_geom_list_count: u32,
}

impl<'a> VsdParser<'a> {
    /// Creates a parser over the raw `VisioDocument` stream, sniffing the
    /// format generation from its header.
    pub fn new(input: &'a [u8]) -> Result<Self> {
        let version = Version::sniff(input)?;
        Ok(Self::with_version(input, version))
    }

    pub fn with_version(input: &'a [u8], version: Version) -> Self {
        Self {
            input: Stream::new(input),
            version,
            options: ParseOptions::default(),
            header: ChunkHeader::default(),
            current_level: 0,
            current_shape_level: 0,
            current_shape_id: MINUS_ONE,
            is_in_styles: false,
            is_background_page: false,
            colours: Vec::new(),
            shadow_offset_x: 0.0,
            shadow_offset_y: 0.0,
            geom_list: GeometryList::new(),
            geom_lists: Vec::new(),
            char_list: CharacterList::new(),
            char_lists: Vec::new(),
            para_list: ParagraphList::new(),
            para_lists: Vec::new(),
            field_list: FieldList::new(),
            shape_list: ShapeList::new(),
            stencils: Stencils::new(),
            current_stencil: None,
            shape: Shape::new(),
            is_stencil_started: false,
            current_geom_list_count: 0,
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Parses the document: a styles pass, then a content pass driving the
    /// painter.
    pub fn parse(&mut self, painter: &mut dyn stencio_draw::Painter) -> Result<()> {
        let mut styles_collector = crate::styles_collector::StylesCollector::new();
        self.stencils.clear();
        self.reset_pass_state();
        self.parse_document(&mut styles_collector)?;
        let layout = styles_collector.into_layout();

        let stencils = self.stencils.clone();
        let mut content_collector =
            crate::content::ContentCollector::new(painter, layout, stencils);
        self.reset_pass_state();
        self.parse_document(&mut content_collector)?;
        Ok(())
    }

    fn reset_pass_state(&mut self) {
        self.header = ChunkHeader::default();
        self.current_level = 0;
        self.current_shape_level = 0;
        self.current_shape_id = MINUS_ONE;
        self.is_in_styles = false;
        self.is_background_page = false;
        self.geom_list.clear();
        self.geom_lists.clear();
        self.char_list.clear();
        self.char_lists.clear();
        self.para_list.clear();
        self.para_lists.clear();
        self.field_list.clear();
        self.shape_list.clear();
        self.current_stencil = None;
        self.shape = Shape::new();
        self.is_stencil_started = false;
        self.current_geom_list_count = 0;
    }

    /// Reads the trailer stream pointer at `0x24` and walks the document's
    /// stream tree.
    fn parse_document(&mut self, collector: &mut dyn Collector) -> Result<()> {
        self.input.seek(0x24);
        self.input.skip(8);
        let offset = self.input.read_u32()?;
        let length = self.input.read_u32()?;
        let format = self.input.read_u16()?;
        let compressed = format & 2 == 2;

        self.input.seek(offset as usize);
        let mut trailer = self.input.internal(length as usize, compressed)?;
        self.handle_streams(&mut trailer, 4, 0, collector);
        Ok(())
    }

    /// Reads a stream's pointer table and recurses into every sub-stream,
    /// `FONTFACES` first, then the declared order, then the rest.
    fn handle_streams(
        &mut self,
        input: &mut Stream<'_>,
        shift: u32,
        level: u32,
        collector: &mut dyn Collector,
    ) {
        let mut pointer_order: Vec<u32> = Vec::new();
        let mut pointers: BTreeMap<u32, Pointer> = BTreeMap::new();
        let mut font_faces: BTreeMap<u32, Pointer> = BTreeMap::new();

        let read = (|| -> Result<()> {
            let (list_size, pointer_count) =
                header::read_pointer_info(self.version, input, self.header.chunk_type, shift)?;
            for i in 0..pointer_count.max(0) as u32 {
                let ptr = header::read_pointer(self.version, input)?;
                if ptr.ptr_type == chunks::FONTFACES {
                    font_faces.insert(i, ptr);
                } else if ptr.ptr_type != 0 {
                    pointers.insert(i, ptr);
                }
            }
            for _ in 0..list_size {
                pointer_order.push(input.read_u32()?);
            }
            Ok(())
        })();
        if read.is_err() {
            pointer_order.clear();
            pointers.clear();
            font_faces.clear();
        }

        for (idx, ptr) in font_faces {
            self.handle_stream(&ptr, idx, level + 1, collector);
        }
        for idx in pointer_order {
            if let Some(ptr) = pointers.remove(&idx) {
                self.handle_stream(&ptr, idx, level + 1, collector);
            }
        }
        for (idx, ptr) in core::mem::take(&mut pointers) {
            self.handle_stream(&ptr, idx, level + 1, collector);
        }
    }

    /// Dispatches one sub-stream: lifecycle bookkeeping around the recursion
    /// into blobs, nested pointer lists or chunk runs.
    fn handle_stream(
        &mut self,
        ptr: &Pointer,
        idx: u32,
        level: u32,
        collector: &mut dyn Collector,
    ) {
        self.header.level = level;
        self.header.id = idx;
        self.header.chunk_type = ptr.ptr_type;
        self.handle_level_change(level, collector);

        debug!(
            "stream type {:#04x} offset {:#x} length {:#x} format {:#06x} at level {}",
            ptr.ptr_type, ptr.offset, ptr.length, ptr.format, level
        );

        match ptr.ptr_type {
            chunks::STYLES => self.is_in_styles = true,
            chunks::PAGES | chunks::PAGE if self.options.extract_stencils => return,
            chunks::PAGE => {
                self.is_background_page = ptr.format == 0xd2 || ptr.format == 0xd6;
                collector.start_page(idx);
            }
            chunks::STENCILS => {
                if !self.options.extract_stencils {
                    if self.stencils.count() > 0 {
                        return;
                    }
                    self.is_stencil_started = true;
                }
            }
            chunks::STENCIL_PAGE => {
                if self.options.extract_stencils {
                    self.is_background_page = false;
                    collector.start_page(idx);
                } else {
                    self.current_stencil = Some(Stencil::new());
                }
            }
            chunks::SHAPE_GROUP | chunks::SHAPE_SHAPE | chunks::SHAPE_GUIDE
            | chunks::SHAPE_FOREIGN => {
                self.current_shape_id = idx;
            }
            chunks::OLE_LIST => {
                if self.is_stencil_started {
                    self.shape.foreign_mut();
                }
            }
            _ => {}
        }

        self.input.seek(ptr.offset as usize);
        let body = self
            .input
            .internal(ptr.length as usize, ptr.is_compressed())
            .and_then(|mut stream| {
                let shift = if ptr.is_compressed() { 4 } else { 0 };
                match ptr.format >> 4 {
                    0x4 | 0x5 | 0x0 => {
                        if ptr.length > 4 {
                            self.handle_blob(&mut stream, level + 1, collector)?;
                        }
                        if ptr.format >> 4 == 0x5 && ptr.ptr_type != chunks::COLORS {
                            self.handle_streams(&mut stream, shift, level + 1, collector);
                        }
                    }
                    0xd | 0x8 => self.handle_chunks(&mut stream, level + 1, collector)?,
                    _ => {}
                }
                Ok(())
            });
        if let Err(error) = body {
            // The sub-stream is abandoned; siblings still parse, and the
            // close-out below keeps paint bracketing intact.
            warn!("sub-stream {:#04x} aborted: {error}", ptr.ptr_type);
        }

        match ptr.ptr_type {
            chunks::STYLES => {
                self.handle_level_change(0, collector);
                self.is_in_styles = false;
            }
            chunks::PAGE => {
                self.handle_level_change(0, collector);
                collector.end_page();
            }
            chunks::PAGES => collector.end_pages(),
            chunks::STENCILS => {
                if self.options.extract_stencils {
                    collector.end_pages();
                } else {
                    self.is_stencil_started = false;
                }
            }
            chunks::STENCIL_PAGE => {
                if self.options.extract_stencils {
                    self.handle_level_change(0, collector);
                    collector.end_page();
                } else if let Some(stencil) = self.current_stencil.take() {
                    self.stencils.add_stencil(idx, stencil);
                }
            }
            chunks::SHAPE_GROUP | chunks::SHAPE_SHAPE | chunks::SHAPE_GUIDE
            | chunks::SHAPE_FOREIGN => {
                if self.is_stencil_started {
                    self.handle_level_change(0, collector);
                    let shape = core::mem::take(&mut self.shape);
                    if let Some(stencil) = self.current_stencil.as_mut() {
                        stencil.add_shape(idx, shape);
                    }
                }
            }
            _ => {}
        }
    }

    /// A blob stream: a single chunk body with a length prefix (none in
    /// generation 2).
    fn handle_blob(
        &mut self,
        input: &mut Stream<'_>,
        level: u32,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        self.header.level = level;
        self.header.trailer = 0;
        if self.version == Version::V2 {
            self.header.data_length = input.len() as u32;
        } else {
            self.header.data_length = input.read_u32()?;
        }
        self.handle_level_change(self.header.level, collector);
        match self.handle_chunk(input, collector) {
            Err(ParseError::EndOfStream) => {
                debug!("end of stream inside blob chunk");
                Ok(())
            }
            other => other,
        }
    }

    /// The chunk loop: header, level change, dispatch, then a seek to the
    /// next chunk from `data_length + trailer`.
    fn handle_chunks(
        &mut self,
        input: &mut Stream<'_>,
        level: u32,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        while !input.at_end() {
            match header::read_chunk_header(self.version, input, &mut self.header) {
                Ok(true) => {}
                // A truncated header is a clean end of the chunk run.
                Ok(false) | Err(ParseError::EndOfStream) => break,
                Err(error) => return Err(error),
            }
            self.header.level += level;
            let end_pos =
                input.tell() + self.header.data_length as usize + self.header.trailer as usize;

            self.handle_level_change(self.header.level, collector);
            debug!(
                "chunk type {:#04x} id {} level {} length {:#x}",
                self.header.chunk_type, self.header.id, self.header.level, self.header.data_length
            );
            match self.handle_chunk(input, collector) {
                Ok(()) | Err(ParseError::EndOfStream) => {}
                Err(error) => return Err(error),
            }
            input.seek(end_pos);
        }
        Ok(())
    }

    fn handle_chunk(&mut self, input: &mut Stream<'_>, collector: &mut dyn Collector) -> Result<()> {
        match self.header.chunk_type {
            chunks::SHAPE_GROUP | chunks::SHAPE_SHAPE | chunks::SHAPE_GUIDE
            | chunks::SHAPE_FOREIGN => self.read_shape(input, collector),
            chunks::XFORM_DATA => self.read_xform_data(input, collector),
            chunks::TEXT_XFORM => self.read_txt_xform(input, collector),
            chunks::SHAPE_LIST => self.read_shape_list(input, collector),
            chunks::SHAPE_ID => self.read_shape_id(input),
            chunks::LINE => self.read_line(input, collector),
            chunks::FILL_AND_SHADOW => self.read_fill_and_shadow(input, collector),
            chunks::GEOM_LIST => self.read_geom_list(input, collector),
            chunks::GEOMETRY => self.read_geometry(input),
            chunks::MOVE_TO => self.read_move_to(input),
            chunks::LINE_TO => self.read_line_to(input),
            chunks::ARC_TO => self.read_arc_to(input),
            chunks::ELLIPSE => self.read_ellipse(input),
            chunks::ELLIPTICAL_ARC_TO => self.read_elliptical_arc_to(input),
            chunks::NURBS_TO => self.read_nurbs_to(input),
            chunks::POLYLINE_TO => self.read_polyline_to(input),
            chunks::INFINITE_LINE => self.read_infinite_line(input),
            chunks::SHAPE_DATA => self.read_shape_data(input, collector),
            chunks::FOREIGN_DATA_TYPE => self.read_foreign_data_type(input, collector),
            chunks::FOREIGN_DATA => self.read_foreign_data(input, collector),
            chunks::OLE_LIST => self.read_ole_list(input, collector),
            chunks::OLE_DATA => self.read_ole_data(input, collector),
            chunks::PAGE_PROPS => self.read_page_props(input, collector),
            chunks::CHAR_LIST => self.read_char_list(input, collector),
            chunks::PARA_LIST => self.read_para_list(input, collector),
            chunks::TEXT => self.read_text(input, collector),
            chunks::CHAR_IX => self.read_char_ix(input, collector),
            chunks::PARA_IX => self.read_para_ix(input, collector),
            chunks::TEXT_BLOCK => self.read_text_block(input, collector),
            chunks::FONT_IX => self.read_font_ix(input, collector),
            chunks::PAGE => self.read_page(input, collector),
            chunks::STENCIL_PAGE => {
                if self.options.extract_stencils {
                    self.read_page(input, collector)
                } else {
                    Ok(())
                }
            }
            chunks::SPLINE_START => self.read_spline_start(input),
            chunks::SPLINE_KNOT => self.read_spline_knot(input),
            chunks::NAME_LIST => self.read_name_list(input, collector),
            chunks::NAME => self.read_name(input, collector),
            chunks::FIELD_LIST => self.read_field_list(input, collector),
            chunks::TEXT_FIELD => self.read_text_field(input),
            chunks::STYLE_SHEET => self.read_style_sheet(input, collector),
            chunks::PAGE_SHEET => self.read_page_sheet(input, collector),
            chunks::COLORS => self.read_colours(input),
            chunks::FONTFACE => self.read_font(input, collector),
            _ => {
                collector.collect_unhandled_chunk(self.header.id, self.header.level);
                Ok(())
            }
        }
    }

    /// Flushes accumulated lists when the level drops: list aggregates at
    /// `shape level + 1`, everything shape-scoped at the shape level.
    fn handle_level_change(&mut self, level: u32, collector: &mut dyn Collector) {
        if level == self.current_level {
            return;
        }
        if level <= self.current_shape_level + 1 {
            self.geom_lists.push(core::mem::take(&mut self.geom_list));
            self.char_lists.push(core::mem::take(&mut self.char_list));
            self.para_lists.push(core::mem::take(&mut self.para_list));
            self.shape_list.replay(collector);
            self.shape_list.clear();
        }
        if level <= self.current_shape_level {
            for list in core::mem::take(&mut self.geom_lists) {
                list.replay(collector);
            }
            for list in core::mem::take(&mut self.char_lists) {
                list.replay(collector);
            }
            for list in core::mem::take(&mut self.para_lists) {
                list.replay(collector);
            }
            if !self.field_list.is_empty() {
                self.field_list.replay(collector);
                self.field_list.clear();
            }
        }
        self.current_level = level;
    }

    fn colour_from_index(&self, idx: u8) -> Colour {
        self.colours
            .get(usize::from(idx))
            .copied()
            .unwrap_or_default()
    }

    /// The current geometry list: the stencil shape's newest section while a
    /// stencil is open, the parser's accumulator otherwise.
    fn current_geometry_list(&mut self) -> &mut GeometryList {
        if self.is_stencil_started {
            let key = self.current_geom_list_count.saturating_sub(1);
            self.shape.geometries.entry(key).or_default()
        } else {
            &mut self.geom_list
        }
    }
}
