// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Style entities and the style-sheet registry.
//!
//! Every style exists in a required and an optional flavour. The optional
//! flavour carries only what a style sheet (or a local shape chunk) actually
//! set; a `None` field means "inherit". Resolution composes optional layers
//! outside-in along the parent chain and finally overlays the result onto the
//! defaults.

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::types::{Colour, Font, MINUS_ONE};

macro_rules! overlay_fields {
    ($base:expr, $over:expr, $($field:ident),+ $(,)?) => {
        $(if let Some(value) = $over.$field.clone() {
            $base.$field = value;
        })+
    };
}

macro_rules! merge_fields {
    ($base:expr, $over:expr, $($field:ident),+ $(,)?) => {
        $(if $over.$field.is_some() {
            $base.$field = $over.$field.clone();
        })+
    };
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineStyle {
    pub width: f64,
    pub colour: Colour,
    pub pattern: u8,
    pub start_marker: u8,
    pub end_marker: u8,
    pub cap: u8,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            width: 0.01,
            colour: Colour::default(),
            pattern: 1,
            start_marker: 0,
            end_marker: 0,
            cap: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OptionalLineStyle {
    pub width: Option<f64>,
    pub colour: Option<Colour>,
    pub pattern: Option<u8>,
    pub start_marker: Option<u8>,
    pub end_marker: Option<u8>,
    pub cap: Option<u8>,
}

impl LineStyle {
    pub fn overlay(&mut self, over: &OptionalLineStyle) {
        overlay_fields!(self, over, width, colour, pattern, start_marker, end_marker, cap);
    }
}

impl OptionalLineStyle {
    pub fn overlay(&mut self, over: &Self) {
        merge_fields!(self, over, width, colour, pattern, start_marker, end_marker, cap);
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FillStyle {
    pub fg_colour: Colour,
    pub bg_colour: Colour,
    pub pattern: u8,
    /// Foreground transparency in `[0, 1]`.
    pub fg_transparency: f64,
    pub bg_transparency: f64,
    pub shadow_fg_colour: Colour,
    pub shadow_pattern: u8,
    pub shadow_offset_x: f64,
    pub shadow_offset_y: f64,
}

impl Default for FillStyle {
    fn default() -> Self {
        Self {
            fg_colour: Colour::default(),
            bg_colour: Colour::new(0xff, 0xff, 0xff, 0),
            pattern: 0,
            fg_transparency: 0.0,
            bg_transparency: 0.0,
            shadow_fg_colour: Colour::default(),
            shadow_pattern: 0,
            shadow_offset_x: 0.0,
            shadow_offset_y: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OptionalFillStyle {
    pub fg_colour: Option<Colour>,
    pub bg_colour: Option<Colour>,
    pub pattern: Option<u8>,
    pub fg_transparency: Option<f64>,
    pub bg_transparency: Option<f64>,
    pub shadow_fg_colour: Option<Colour>,
    pub shadow_pattern: Option<u8>,
    pub shadow_offset_x: Option<f64>,
    pub shadow_offset_y: Option<f64>,
}

impl FillStyle {
    pub fn overlay(&mut self, over: &OptionalFillStyle) {
        overlay_fields!(
            self,
            over,
            fg_colour,
            bg_colour,
            pattern,
            fg_transparency,
            bg_transparency,
            shadow_fg_colour,
            shadow_pattern,
            shadow_offset_x,
            shadow_offset_y,
        );
    }
}

impl OptionalFillStyle {
    pub fn overlay(&mut self, over: &Self) {
        merge_fields!(
            self,
            over,
            fg_colour,
            bg_colour,
            pattern,
            fg_transparency,
            bg_transparency,
            shadow_fg_colour,
            shadow_pattern,
            shadow_offset_x,
            shadow_offset_y,
        );
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextBlockStyle {
    pub left_margin: f64,
    pub right_margin: f64,
    pub top_margin: f64,
    pub bottom_margin: f64,
    /// 0 = top, 2 = bottom, anything else = centre.
    pub vertical_align: u8,
    pub is_text_bkgnd_filled: bool,
    pub text_bkgnd_colour: Colour,
    pub default_tab_stop: f64,
    pub text_direction: u8,
}

impl Default for TextBlockStyle {
    fn default() -> Self {
        Self {
            left_margin: 0.0,
            right_margin: 0.0,
            top_margin: 0.0,
            bottom_margin: 0.0,
            vertical_align: 1,
            is_text_bkgnd_filled: false,
            text_bkgnd_colour: Colour::new(0xff, 0xff, 0xff, 0),
            default_tab_stop: 0.5,
            text_direction: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OptionalTextBlockStyle {
    pub left_margin: Option<f64>,
    pub right_margin: Option<f64>,
    pub top_margin: Option<f64>,
    pub bottom_margin: Option<f64>,
    pub vertical_align: Option<u8>,
    pub is_text_bkgnd_filled: Option<bool>,
    pub text_bkgnd_colour: Option<Colour>,
    pub default_tab_stop: Option<f64>,
    pub text_direction: Option<u8>,
}

impl TextBlockStyle {
    pub fn overlay(&mut self, over: &OptionalTextBlockStyle) {
        overlay_fields!(
            self,
            over,
            left_margin,
            right_margin,
            top_margin,
            bottom_margin,
            vertical_align,
            is_text_bkgnd_filled,
            text_bkgnd_colour,
            default_tab_stop,
            text_direction,
        );
    }
}

impl OptionalTextBlockStyle {
    pub fn overlay(&mut self, over: &Self) {
        merge_fields!(
            self,
            over,
            left_margin,
            right_margin,
            top_margin,
            bottom_margin,
            vertical_align,
            is_text_bkgnd_filled,
            text_bkgnd_colour,
            default_tab_stop,
            text_direction,
        );
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CharStyle {
    /// Number of codepoints this run covers; 0 in the last run means "to the
    /// end of the text".
    pub char_count: u32,
    pub font_id: u16,
    pub colour: Colour,
    /// Font size in inches.
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub doubleunderline: bool,
    pub strikeout: bool,
    pub doublestrikeout: bool,
    pub allcaps: bool,
    pub initcaps: bool,
    pub smallcaps: bool,
    pub superscript: bool,
    pub subscript: bool,
    pub font: Font,
}

impl Default for CharStyle {
    fn default() -> Self {
        Self {
            char_count: 0,
            font_id: 0,
            colour: Colour::default(),
            size: 12.0 / 72.0,
            bold: false,
            italic: false,
            underline: false,
            doubleunderline: false,
            strikeout: false,
            doublestrikeout: false,
            allcaps: false,
            initcaps: false,
            smallcaps: false,
            superscript: false,
            subscript: false,
            font: Font::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OptionalCharStyle {
    pub char_count: Option<u32>,
    pub font_id: Option<u16>,
    pub colour: Option<Colour>,
    pub size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub doubleunderline: Option<bool>,
    pub strikeout: Option<bool>,
    pub doublestrikeout: Option<bool>,
    pub allcaps: Option<bool>,
    pub initcaps: Option<bool>,
    pub smallcaps: Option<bool>,
    pub superscript: Option<bool>,
    pub subscript: Option<bool>,
    pub font: Option<Font>,
}

impl CharStyle {
    pub fn overlay(&mut self, over: &OptionalCharStyle) {
        overlay_fields!(
            self,
            over,
            char_count,
            font_id,
            colour,
            size,
            bold,
            italic,
            underline,
            doubleunderline,
            strikeout,
            doublestrikeout,
            allcaps,
            initcaps,
            smallcaps,
            superscript,
            subscript,
            font,
        );
    }
}

impl OptionalCharStyle {
    pub fn overlay(&mut self, over: &Self) {
        merge_fields!(
            self,
            over,
            char_count,
            font_id,
            colour,
            size,
            bold,
            italic,
            underline,
            doubleunderline,
            strikeout,
            doublestrikeout,
            allcaps,
            initcaps,
            smallcaps,
            superscript,
            subscript,
            font,
        );
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParaStyle {
    pub char_count: u32,
    pub ind_first: f64,
    pub ind_left: f64,
    pub ind_right: f64,
    /// Line spacing: positive = absolute points, negative = multiple of the
    /// line height.
    pub sp_line: f64,
    pub sp_before: f64,
    pub sp_after: f64,
    pub align: u8,
    pub flags: u32,
}

impl Default for ParaStyle {
    fn default() -> Self {
        Self {
            char_count: 0,
            ind_first: 0.0,
            ind_left: 0.0,
            ind_right: 0.0,
            sp_line: -1.2,
            sp_before: 0.0,
            sp_after: 0.0,
            align: 1,
            flags: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OptionalParaStyle {
    pub char_count: Option<u32>,
    pub ind_first: Option<f64>,
    pub ind_left: Option<f64>,
    pub ind_right: Option<f64>,
    pub sp_line: Option<f64>,
    pub sp_before: Option<f64>,
    pub sp_after: Option<f64>,
    pub align: Option<u8>,
    pub flags: Option<u32>,
}

impl ParaStyle {
    pub fn overlay(&mut self, over: &OptionalParaStyle) {
        overlay_fields!(
            self, over, char_count, ind_first, ind_left, ind_right, sp_line, sp_before, sp_after,
            align, flags,
        );
    }
}

impl OptionalParaStyle {
    pub fn overlay(&mut self, over: &Self) {
        merge_fields!(
            self, over, char_count, ind_first, ind_left, ind_right, sp_line, sp_before, sp_after,
            align, flags,
        );
    }
}

/// The style-sheet registry built by the first pass.
///
/// Line and fill styles hang off their own parent chains; text-block, char
/// and paragraph styles share the text parent chain. A chain walk visits each
/// sheet at most once, so cyclic parent references terminate where the cycle
/// closes.
#[derive(Clone, Debug, Default)]
pub struct Styles {
    line: HashMap<u32, OptionalLineStyle>,
    fill: HashMap<u32, OptionalFillStyle>,
    text_block: HashMap<u32, OptionalTextBlockStyle>,
    character: HashMap<u32, OptionalCharStyle>,
    paragraph: HashMap<u32, OptionalParaStyle>,
    line_parents: HashMap<u32, u32>,
    fill_parents: HashMap<u32, u32>,
    text_parents: HashMap<u32, u32>,
}

impl Styles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_line_style(&mut self, id: u32, style: OptionalLineStyle) {
        self.line.insert(id, style);
    }

    pub fn add_fill_style(&mut self, id: u32, style: OptionalFillStyle) {
        self.fill.insert(id, style);
    }

    pub fn add_text_block_style(&mut self, id: u32, style: OptionalTextBlockStyle) {
        self.text_block.insert(id, style);
    }

    pub fn add_char_style(&mut self, id: u32, style: OptionalCharStyle) {
        self.character.insert(id, style);
    }

    pub fn add_para_style(&mut self, id: u32, style: OptionalParaStyle) {
        self.paragraph.insert(id, style);
    }

    pub fn add_line_parent(&mut self, id: u32, parent: u32) {
        self.line_parents.insert(id, parent);
    }

    pub fn add_fill_parent(&mut self, id: u32, parent: u32) {
        self.fill_parents.insert(id, parent);
    }

    pub fn add_text_parent(&mut self, id: u32, parent: u32) {
        self.text_parents.insert(id, parent);
    }

    /// Ancestor chain of `id` (leaf first), stopping at the sentinel or where
    /// a cycle closes.
    fn chain(parents: &HashMap<u32, u32>, id: u32) -> SmallVec<[u32; 16]> {
        let mut chain = SmallVec::new();
        let mut cur = id;
        while cur != MINUS_ONE && !chain.contains(&cur) {
            chain.push(cur);
            cur = parents.get(&cur).copied().unwrap_or(MINUS_ONE);
        }
        chain
    }

    pub fn optional_line_style(&self, id: u32) -> OptionalLineStyle {
        let mut style = OptionalLineStyle::default();
        for sheet in Self::chain(&self.line_parents, id).iter().rev() {
            if let Some(layer) = self.line.get(sheet) {
                style.overlay(layer);
            }
        }
        style
    }

    pub fn optional_fill_style(&self, id: u32) -> OptionalFillStyle {
        let mut style = OptionalFillStyle::default();
        for sheet in Self::chain(&self.fill_parents, id).iter().rev() {
            if let Some(layer) = self.fill.get(sheet) {
                style.overlay(layer);
            }
        }
        style
    }

    pub fn optional_text_block_style(&self, id: u32) -> OptionalTextBlockStyle {
        let mut style = OptionalTextBlockStyle::default();
        for sheet in Self::chain(&self.text_parents, id).iter().rev() {
            if let Some(layer) = self.text_block.get(sheet) {
                style.overlay(layer);
            }
        }
        style
    }

    pub fn optional_char_style(&self, id: u32) -> OptionalCharStyle {
        let mut style = OptionalCharStyle::default();
        for sheet in Self::chain(&self.text_parents, id).iter().rev() {
            if let Some(layer) = self.character.get(sheet) {
                style.overlay(layer);
            }
        }
        style
    }

    pub fn optional_para_style(&self, id: u32) -> OptionalParaStyle {
        let mut style = OptionalParaStyle::default();
        for sheet in Self::chain(&self.text_parents, id).iter().rev() {
            if let Some(layer) = self.paragraph.get(sheet) {
                style.overlay(layer);
            }
        }
        style
    }

    pub fn line_style(&self, id: u32) -> LineStyle {
        let mut style = LineStyle::default();
        style.overlay(&self.optional_line_style(id));
        style
    }

    pub fn fill_style(&self, id: u32) -> FillStyle {
        let mut style = FillStyle::default();
        style.overlay(&self.optional_fill_style(id));
        style
    }

    pub fn text_block_style(&self, id: u32) -> TextBlockStyle {
        let mut style = TextBlockStyle::default();
        style.overlay(&self.optional_text_block_style(id));
        style
    }

    pub fn char_style(&self, id: u32) -> CharStyle {
        let mut style = CharStyle::default();
        style.overlay(&self.optional_char_style(id));
        style
    }

    pub fn para_style(&self, id: u32) -> ParaStyle {
        let mut style = ParaStyle::default();
        style.overlay(&self.optional_para_style(id));
        style
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_overlays_outside_in() {
        let mut styles = Styles::new();
        // Sheet 1: width + colour. Sheet 2 (child of 1): colour only.
        styles.add_line_style(
            1,
            OptionalLineStyle {
                width: Some(0.05),
                colour: Some(Colour::new(1, 2, 3, 0)),
                ..Default::default()
            },
        );
        styles.add_line_style(
            2,
            OptionalLineStyle {
                colour: Some(Colour::new(9, 9, 9, 0)),
                ..Default::default()
            },
        );
        styles.add_line_parent(1, MINUS_ONE);
        styles.add_line_parent(2, 1);

        let resolved = styles.line_style(2);
        assert_eq!(resolved.width, 0.05);
        assert_eq!(resolved.colour, Colour::new(9, 9, 9, 0));
        // Unset everywhere falls back to the defaults.
        assert_eq!(resolved.pattern, 1);
    }

    #[test]
    fn cyclic_parents_terminate() {
        let mut styles = Styles::new();
        styles.add_line_style(
            1,
            OptionalLineStyle {
                width: Some(0.2),
                ..Default::default()
            },
        );
        styles.add_line_parent(1, 2);
        styles.add_line_parent(2, 1);
        assert_eq!(styles.line_style(1).width, 0.2);
    }

    #[test]
    fn zero_value_means_inherit() {
        // A sheet that never set a width must not clobber its parent's.
        let mut styles = Styles::new();
        styles.add_line_style(
            3,
            OptionalLineStyle {
                width: Some(0.1),
                ..Default::default()
            },
        );
        styles.add_line_style(4, OptionalLineStyle::default());
        styles.add_line_parent(4, 3);
        assert_eq!(styles.line_style(4).width, 0.1);
    }
}
