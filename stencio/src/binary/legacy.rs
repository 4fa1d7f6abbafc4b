// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Record readers for the 16-bit generations (2 and 5): indexed colours,
//! sign-extended ids, and chunk lists encoded as sub-records addressed from
//! the chunk tail.

use std::collections::BTreeMap;

use crate::chunks::ChunkHeader;
use crate::collector::Collector;
use crate::error::Result;
use crate::fields;
use crate::source::Stream;
use crate::style::{
    OptionalCharStyle, OptionalFillStyle, OptionalLineStyle, OptionalTextBlockStyle,
};
use crate::types::MINUS_ONE;

use super::header::read_legacy_uint;
use super::VsdParser;

impl VsdParser<'_> {
    /// Chunk lists in these generations carry their children as sub-records:
    /// a `(count, end)` pair at the chunk tail precedes a reverse-ordered
    /// table of `(type, offset)` words addressing the records.
    pub(super) fn handle_chunk_records(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        let start_position = input.tell();
        let end_position = input.tell() + self.header.data_length as usize;
        input.seek(end_position.saturating_sub(4));
        let num_records = input.read_u16()?;
        let mut end_offset = u32::from(input.read_u16()?);

        let mut records: BTreeMap<u32, ChunkHeader> = BTreeMap::new();
        input.seek(end_position.saturating_sub(4 * (usize::from(num_records) + 1)));
        for _ in 0..num_records {
            let chunk_type = u32::from(input.read_u16()?);
            let offset = u32::from(input.read_u16()?);
            let mut record_start = offset;
            while record_start % 4 != 0 {
                record_start += 1;
            }
            let header = ChunkHeader {
                chunk_type,
                data_length: end_offset.saturating_sub(record_start),
                level: self.header.level + 1,
                ..ChunkHeader::default()
            };
            records.insert(record_start, header);
            end_offset = offset;
        }

        for (i, (record_start, header)) in records.into_iter().enumerate() {
            self.header = header;
            self.header.id = i as u32;
            input.seek(start_position + record_start as usize);
            match self.handle_chunk(input, collector) {
                Ok(()) | Err(crate::error::ParseError::EndOfStream) => {}
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    pub(super) fn read_list_legacy(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        if !self.is_stencil_started {
            collector.collect_unhandled_chunk(self.header.id, self.header.level);
        }
        self.handle_chunk_records(input, collector)
    }

    pub(super) fn read_shape_legacy(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        if self.header.id != MINUS_ONE {
            self.current_shape_id = self.header.id;
        }
        self.current_shape_level = self.header.level;
        self.current_geom_list_count = 0;

        let mut parent = 0;
        let mut master_page = MINUS_ONE;
        let mut master_shape = MINUS_ONE;
        let mut line_style = MINUS_ONE;
        let mut fill_style = MINUS_ONE;
        let mut text_style = MINUS_ONE;
        let _ = (|| -> Result<()> {
            input.skip(2);
            parent = read_legacy_uint(input)?;
            input.skip(2);
            master_page = read_legacy_uint(input)?;
            master_shape = read_legacy_uint(input)?;
            line_style = read_legacy_uint(input)?;
            fill_style = read_legacy_uint(input)?;
            text_style = read_legacy_uint(input)?;
            Ok(())
        })();

        if self.is_stencil_started {
            self.shape.clear();
            if let Some(master) = self.stencils.shape(master_page, master_shape) {
                self.shape.foreign = master.foreign.clone();
                self.shape.text = master.text.clone();
                self.shape.text_format = master.text_format;
            }
            self.shape.line_style_id = line_style;
            self.shape.fill_style_id = fill_style;
            self.shape.text_style_id = text_style;
            self.shape.parent = parent;
            self.shape.master_page = master_page;
            self.shape.master_shape = master_shape;
            self.shape.shape_id = self.current_shape_id;
        } else {
            collector.collect_shape(
                self.current_shape_id,
                self.header.level,
                parent,
                master_page,
                master_shape,
                line_style,
                fill_style,
                text_style,
            );
        }
        self.current_shape_id = MINUS_ONE;
        Ok(())
    }

    pub(super) fn read_line_legacy(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        input.skip(1);
        let stroke_width = input.read_f64()?;
        let colour = self.colour_from_index(input.read_u8()?);
        let line_pattern = input.read_u8()?;
        input.skip(10);
        let start_marker = input.read_u8()?;
        let end_marker = input.read_u8()?;
        let line_cap = input.read_u8()?;

        let style = OptionalLineStyle {
            width: Some(stroke_width),
            colour: Some(colour),
            pattern: Some(line_pattern),
            start_marker: Some(start_marker),
            end_marker: Some(end_marker),
            cap: Some(line_cap),
        };
        if self.is_in_styles {
            collector.collect_line_style(self.header.level, &style);
        } else if self.is_stencil_started {
            self.shape.line_style.overlay(&style);
        } else {
            collector.collect_line(self.header.level, &style);
        }
        Ok(())
    }

    pub(super) fn read_fill_and_shadow_legacy(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        let fg_colour = self.colour_from_index(input.read_u8()?);
        let bg_colour = self.colour_from_index(input.read_u8()?);
        let fill_pattern = input.read_u8()?;
        let shadow_fg = self.colour_from_index(input.read_u8()?);
        input.skip(1); // shadow background colour
        let shadow_pattern = input.read_u8()?;

        let (shadow_offset_x, shadow_offset_y) = if self.is_stencil_started {
            self.current_stencil
                .as_ref()
                .map(|s| (s.shadow_offset_x, s.shadow_offset_y))
                .unwrap_or((0.0, 0.0))
        } else {
            (self.shadow_offset_x, self.shadow_offset_y)
        };

        let style = OptionalFillStyle {
            fg_colour: Some(fg_colour),
            bg_colour: Some(bg_colour),
            pattern: Some(fill_pattern),
            fg_transparency: Some(0.0),
            bg_transparency: Some(0.0),
            shadow_fg_colour: Some(shadow_fg),
            shadow_pattern: Some(shadow_pattern),
            shadow_offset_x: Some(shadow_offset_x),
            shadow_offset_y: Some(shadow_offset_y),
        };
        if self.is_in_styles {
            collector.collect_fill_style(self.header.level, &style);
        } else if self.is_stencil_started {
            self.shape.fill_style.overlay(&style);
        } else {
            collector.collect_fill_and_shadow(self.header.level, &style);
        }
        Ok(())
    }

    pub(super) fn read_text_block_legacy(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        input.skip(1);
        let left_margin = input.read_f64()?;
        input.skip(1);
        let right_margin = input.read_f64()?;
        input.skip(1);
        let top_margin = input.read_f64()?;
        input.skip(1);
        let bottom_margin = input.read_f64()?;
        let vertical_align = input.read_u8()?;
        let colour_index = input.read_u8()?;
        let is_bg_filled = colour_index != 0;
        let colour = if is_bg_filled {
            self.colour_from_index(colour_index - 1)
        } else {
            Default::default()
        };

        let style = OptionalTextBlockStyle {
            left_margin: Some(left_margin),
            right_margin: Some(right_margin),
            top_margin: Some(top_margin),
            bottom_margin: Some(bottom_margin),
            vertical_align: Some(vertical_align),
            is_text_bkgnd_filled: Some(is_bg_filled),
            text_bkgnd_colour: Some(colour),
            default_tab_stop: Some(0.0),
            text_direction: Some(0),
        };
        if self.is_in_styles {
            collector.collect_text_block_style(self.header.level, &style);
        } else if self.is_stencil_started {
            self.shape.text_block_style.overlay(&style);
        } else {
            collector.collect_text_block(self.header.level, &style);
        }
        Ok(())
    }

    pub(super) fn read_char_ix_legacy(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        let char_count = u32::from(input.read_u16()?);
        let font_id = input.read_u16()?;
        let font_colour = self.colour_from_index(input.read_u8()?);

        let font_mod = input.read_u8()?;
        let bold = font_mod & 1 != 0;
        let italic = font_mod & 2 != 0;
        let underline = font_mod & 4 != 0;
        let smallcaps = font_mod & 8 != 0;
        let font_mod = input.read_u8()?;
        let allcaps = font_mod & 1 != 0;
        let initcaps = font_mod & 2 != 0;
        let font_mod = input.read_u8()?;
        let superscript = font_mod & 1 != 0;
        let subscript = font_mod & 2 != 0;

        input.skip(4);
        let font_size = input.read_f64()?;

        let style = OptionalCharStyle {
            char_count: Some(char_count),
            font_id: Some(font_id),
            colour: Some(font_colour),
            size: Some(font_size),
            bold: Some(bold),
            italic: Some(italic),
            underline: Some(underline),
            doubleunderline: Some(false),
            strikeout: Some(false),
            doublestrikeout: Some(false),
            allcaps: Some(allcaps),
            initcaps: Some(initcaps),
            smallcaps: Some(smallcaps),
            superscript: Some(superscript),
            subscript: Some(subscript),
            font: None,
        };
        if self.is_in_styles {
            collector.collect_char_ix_style(self.header.level, &style);
        } else if self.is_stencil_started {
            self.shape.char_style.overlay(&style);
        } else {
            self.char_list.add(self.header.id, self.header.level, style);
        }
        Ok(())
    }

    pub(super) fn read_text_field_legacy(&mut self, input: &mut Stream<'_>) -> Result<()> {
        input.skip(3);
        let code = input.read_u8()?;
        let list = if self.is_stencil_started {
            &mut self.shape.fields
        } else {
            &mut self.field_list
        };
        if code == 0xe8 {
            let name_id = i32::from(input.read_i16()?);
            list.add_text_field(self.header.id, self.header.level, name_id, -1);
        } else {
            let value = input.read_f64()?;
            list.add_numeric_field(
                self.header.id,
                self.header.level,
                fields::FORMAT_UNKNOWN,
                value,
                -1,
            );
        }
        Ok(())
    }
}
