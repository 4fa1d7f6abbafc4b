// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text layout: turns the shape's text stream plus its char/paragraph runs
//! into text object / paragraph / span paint calls.

use stencio_draw::{PropertyList, Value};

use super::ContentCollector;
use crate::charsets::append_characters;
use crate::types::TextFormat;

const PI: f64 = core::f64::consts::PI;

impl ContentCollector<'_> {
    /// Emits the current shape's text object.
    ///
    /// Char and paragraph runs partition the text by codepoint counts (UTF-16
    /// code units for UTF-16 text, bytes otherwise); a zero count means "the
    /// remainder". A char run reaching past its paragraph's end is split in
    /// two so each paragraph closes on a span boundary.
    pub(super) fn flush_text(&mut self) {
        if self.text_stream.is_empty() {
            return;
        }

        let (frame_width, frame_height) = match &self.txtxform {
            Some(txt) => (txt.width, txt.height),
            None => (self.xform.width, self.xform.height),
        };
        let txtxform = self.txtxform;

        let mut xmiddle = frame_width / 2.0;
        let mut ymiddle = frame_height / 2.0;
        self.transform_point(&mut xmiddle, &mut ymiddle, txtxform.as_ref());

        let x = xmiddle - frame_width / 2.0;
        let y = ymiddle - frame_height / 2.0;

        let mut angle = 0.0;
        self.transform_angle(&mut angle, txtxform.as_ref());

        let mut flip_x = false;
        let mut flip_y = false;
        self.transform_flips(&mut flip_x, &mut flip_y);
        if flip_x {
            angle -= PI;
        }
        while angle > PI {
            angle -= 2.0 * PI;
        }
        while angle < -PI {
            angle += 2.0 * PI;
        }

        let mut block_props = PropertyList::new();
        block_props.insert("svg:x", self.scale * x);
        block_props.insert("svg:y", self.scale * y);
        block_props.insert("svg:height", self.scale * frame_height);
        block_props.insert("svg:width", self.scale * frame_width);
        block_props.insert("fo:padding-top", self.text_block_style.top_margin);
        block_props.insert("fo:padding-bottom", self.text_block_style.bottom_margin);
        block_props.insert("fo:padding-left", self.text_block_style.left_margin);
        block_props.insert("fo:padding-right", self.text_block_style.right_margin);
        block_props.insert("libwpg:rotate", Value::generic(angle * 180.0 / PI));
        block_props.insert(
            "draw:textarea-vertical-align",
            match self.text_block_style.vertical_align {
                0 => "top",
                2 => "bottom",
                _ => "middle",
            },
        );

        if self.char_formats.is_empty() {
            self.char_formats.push(self.default_char_style.clone());
        }
        if self.para_formats.is_empty() {
            self.para_formats.push(self.default_para_style);
        }

        let total_chars = if self.text_format == TextFormat::Utf16 {
            self.text_stream.len() / 2
        } else {
            self.text_stream.len()
        } as u32;

        // A zero-count run absorbs whatever the sized runs leave over.
        let mut remainder = total_chars;
        for format in &self.char_formats {
            remainder = remainder.saturating_sub(format.char_count);
        }
        for format in &mut self.char_formats {
            if format.char_count == 0 {
                format.char_count = remainder;
            }
        }
        let mut remainder = total_chars;
        for format in &self.para_formats {
            remainder = remainder.saturating_sub(format.char_count);
        }
        for format in &mut self.para_formats {
            if format.char_count == 0 {
                format.char_count = remainder;
            }
        }

        self.shape_output_text().add_start_text_object(block_props);

        let para_formats = self.para_formats.clone();
        let mut char_index = 0usize;
        let mut buffer_position = 0usize;
        for para in &para_formats {
            let mut para_props = PropertyList::new();
            para_props.insert("fo:text-indent", para.ind_first);
            para_props.insert("fo:margin-left", para.ind_left);
            para_props.insert("fo:margin-right", para.ind_right);
            para_props.insert("fo:margin-top", para.sp_before);
            para_props.insert("fo:margin-bottom", para.sp_after);
            let align = match para.align {
                0 => {
                    if para.flags == 0 {
                        "left"
                    } else {
                        "end"
                    }
                }
                2 => {
                    if para.flags == 0 {
                        "end"
                    } else {
                        "left"
                    }
                }
                3 => "justify",
                4 => "full",
                _ => "center",
            };
            para_props.insert("fo:text-align", align);
            if para.sp_line > 0.0 {
                para_props.insert("fo:line-height", Value::points(para.sp_line));
            } else {
                para_props.insert("fo:line-height", Value::percent(-para.sp_line));
            }

            self.shape_output_text().add_open_paragraph(para_props);

            let mut para_chars_left = para.char_count;
            while char_index < self.char_formats.len() && para_chars_left > 0 {
                // Re-balance: a run reaching past the paragraph is split so
                // its tail continues in the next paragraph.
                if self.char_formats[char_index].char_count > para_chars_left {
                    let mut head = self.char_formats[char_index].clone();
                    let tail_count = head.char_count - para_chars_left;
                    head.char_count = para_chars_left;
                    self.char_formats[char_index].char_count = tail_count;
                    self.char_formats.insert(char_index, head);
                }
                let run = self.char_formats[char_index].clone();
                para_chars_left -= run.char_count;

                let mut span_props = PropertyList::new();
                let font = self.fonts.get(&run.font_id).filter(|f| !f.name.is_empty());
                let (face_name, encoding) = match font {
                    Some(font) => (font.name.clone(), font.format),
                    None => (run.font.name.clone(), run.font.format),
                };
                span_props.insert("style:font-name", face_name);
                if run.bold {
                    span_props.insert("fo:font-weight", "bold");
                }
                if run.italic {
                    span_props.insert("fo:font-style", "italic");
                }
                if run.underline {
                    span_props.insert("style:text-underline-type", "single");
                }
                if run.doubleunderline {
                    span_props.insert("style:text-underline-type", "double");
                }
                if run.strikeout {
                    span_props.insert("style:text-line-through-type", "single");
                }
                if run.doublestrikeout {
                    span_props.insert("style:text-line-through-type", "double");
                }
                if run.allcaps {
                    span_props.insert("fo:text-transform", "uppercase");
                }
                if run.initcaps {
                    span_props.insert("fo:text-transform", "capitalize");
                }
                if run.smallcaps {
                    span_props.insert("fo:font-variant", "small-caps");
                }
                if run.superscript {
                    span_props.insert("style:text-position", "super");
                }
                if run.subscript {
                    span_props.insert("style:text-position", "sub");
                }
                span_props.insert("fo:font-size", Value::points(run.size * 72.0));
                span_props.insert("fo:color", run.colour.to_hex());
                let opacity = 1.0 - f64::from(run.colour.a) / 255.0;
                span_props.insert("svg:stroke-opacity", Value::percent(opacity));
                span_props.insert("svg:fill-opacity", Value::percent(opacity));
                if self.text_block_style.is_text_bkgnd_filled {
                    span_props.insert(
                        "fo:background-color",
                        self.text_block_style.text_bkgnd_colour.to_hex(),
                    );
                }

                let is_para_end = para_chars_left == 0;
                let text = self.take_run_text(run.char_count, &mut buffer_position, is_para_end, encoding);

                let output = self.shape_output_text();
                output.add_open_span(span_props);
                output.add_text(text);
                output.add_close_span();

                char_index += 1;
            }
            self.shape_output_text().add_close_paragraph();
        }

        self.shape_output_text().add_end_text_object();
    }

    /// Slices `char_count` codepoints from the text stream and decodes them,
    /// stripping the paragraph terminator from a paragraph's final run.
    fn take_run_text(
        &mut self,
        char_count: u32,
        buffer_position: &mut usize,
        is_para_end: bool,
        encoding: TextFormat,
    ) -> String {
        let mut text = String::new();
        if self.text_format == TextFormat::Utf16 {
            let total_units = self.text_stream.len() / 2;
            let mut units = (char_count as usize).min(total_units);
            if char_count == 0 && total_units > 0 {
                units = total_units;
            }
            let start = (*buffer_position).min(self.text_stream.len());
            let end = (start + units * 2).min(self.text_stream.len());
            let mut run: Vec<u8> = self.text_stream[start..end].to_vec();
            if is_para_end && run.len() >= 2 {
                while run.len() >= 2 && run[run.len() - 2] == 0 && run[run.len() - 1] == 0 {
                    run.truncate(run.len() - 2);
                }
                if run.len() >= 2 {
                    // The final code unit is the paragraph terminator.
                    let n = run.len();
                    run[n - 2] = 0;
                    run[n - 1] = 0;
                } else {
                    run.clear();
                }
            }
            if !run.is_empty() {
                let mut field_index = self.field_index;
                append_characters(&mut text, &run, TextFormat::Utf16, &self.fields, &mut field_index);
                self.field_index = field_index;
            }
            *buffer_position += units * 2;
        } else {
            let total = self.text_stream.len();
            let mut bytes = (char_count as usize).min(total);
            if char_count == 0 && total > 0 {
                bytes = total;
            }
            let start = (*buffer_position).min(total);
            let end = (start + bytes).min(total);
            let mut run: Vec<u8> = self.text_stream[start..end].to_vec();
            if is_para_end && !run.is_empty() {
                while run.last() == Some(&0) {
                    run.pop();
                }
                if matches!(run.last(), Some(&0x0a) | Some(&0x0e)) {
                    let n = run.len();
                    run[n - 1] = 0;
                }
            }
            if !run.is_empty() {
                let effective = if self.text_format == TextFormat::Utf8 {
                    TextFormat::Utf8
                } else {
                    encoding
                };
                let mut field_index = self.field_index;
                append_characters(&mut text, &run, effective, &self.fields, &mut field_index);
                self.field_index = field_index;
            }
            *buffer_position += bytes;
        }
        text
    }
}
