// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! First pass: harvests style sheets, group transforms, group memberships
//! and per-page z-order. Emits no paint calls.

use hashbrown::HashMap;

use crate::collector::Collector;
use crate::style::{
    OptionalCharStyle, OptionalFillStyle, OptionalLineStyle, OptionalParaStyle,
    OptionalTextBlockStyle, Styles,
};
use crate::types::{Name, NurbsData, PolylineData, TextFormat, XForm};

/// Everything the second pass needs before the first paint call, keyed by
/// page index in document order.
#[derive(Clone, Debug, Default)]
pub struct DocumentLayout {
    pub group_xforms: Vec<HashMap<u32, XForm>>,
    pub group_memberships: Vec<HashMap<u32, u32>>,
    pub page_shape_orders: Vec<Vec<u32>>,
    pub styles: Styles,
}

/// The first-pass collector.
#[derive(Debug, Default)]
pub struct StylesCollector {
    current_level: u32,
    is_shape_started: bool,
    current_shape_id: u32,
    current_shape_level: u32,

    page_group_xforms: HashMap<u32, XForm>,
    page_group_memberships: HashMap<u32, u32>,
    shape_list: Vec<u32>,
    page_shape_order: Vec<u32>,
    group_shape_order: HashMap<u32, Vec<u32>>,

    is_style_started: bool,
    current_style_sheet: u32,
    line_style: Option<OptionalLineStyle>,
    fill_style: Option<OptionalFillStyle>,
    text_block_style: Option<OptionalTextBlockStyle>,
    char_style: Option<OptionalCharStyle>,
    para_style: Option<OptionalParaStyle>,

    layout: DocumentLayout,
}

impl StylesCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the collector, yielding the tables for the second pass.
    pub fn into_layout(self) -> DocumentLayout {
        self.layout
    }

    fn handle_level_change(&mut self, level: u32) {
        if self.current_level == level {
            return;
        }
        if level <= self.current_shape_level + 1 {
            self.flush_shape_list();
        }
        if level <= self.current_shape_level {
            self.is_shape_started = false;
            if self.is_style_started {
                self.is_style_started = false;
                let styles = &mut self.layout.styles;
                if let Some(style) = self.line_style.take() {
                    styles.add_line_style(self.current_style_sheet, style);
                }
                if let Some(style) = self.fill_style.take() {
                    styles.add_fill_style(self.current_style_sheet, style);
                }
                if let Some(style) = self.text_block_style.take() {
                    styles.add_text_block_style(self.current_style_sheet, style);
                }
                if let Some(style) = self.char_style.take() {
                    styles.add_char_style(self.current_style_sheet, style);
                }
                if let Some(style) = self.para_style.take() {
                    styles.add_para_style(self.current_style_sheet, style);
                }
            }
        }
        self.current_level = level;
    }

    fn flush_shape_list(&mut self) {
        if self.shape_list.is_empty() {
            return;
        }
        let list = core::mem::take(&mut self.shape_list);
        if self.is_shape_started {
            self.group_shape_order.insert(self.current_shape_id, list);
        } else {
            self.page_shape_order = list;
        }
    }

    /// Splices every group's child list in right after the group itself,
    /// repeatedly, to produce the depth-first pre-order flattening.
    fn splice_shape_orders(&mut self) {
        while !self.group_shape_order.is_empty() {
            let mut spliced = false;
            let mut i = 0;
            while i < self.page_shape_order.len() {
                let id = self.page_shape_order[i];
                if let Some(children) = self.group_shape_order.remove(&id) {
                    let at = i + 1;
                    self.page_shape_order.splice(at..at, children);
                    spliced = true;
                }
                i += 1;
            }
            if !spliced {
                // Remaining groups are unreachable from the page order.
                break;
            }
        }
    }
}

impl Collector for StylesCollector {
    fn collect_geometry(&mut self, _id: u32, level: u32, _nf: bool, _nl: bool, _ns: bool) {
        self.handle_level_change(level);
    }

    fn collect_move_to(&mut self, _id: u32, level: u32, _x: f64, _y: f64) {
        self.handle_level_change(level);
    }

    fn collect_line_to(&mut self, _id: u32, level: u32, _x: f64, _y: f64) {
        self.handle_level_change(level);
    }

    fn collect_arc_to(&mut self, _id: u32, level: u32, _x2: f64, _y2: f64, _bow: f64) {
        self.handle_level_change(level);
    }

    fn collect_ellipse(
        &mut self,
        _id: u32,
        level: u32,
        _cx: f64,
        _cy: f64,
        _xleft: f64,
        _yleft: f64,
        _xtop: f64,
        _ytop: f64,
    ) {
        self.handle_level_change(level);
    }

    fn collect_elliptical_arc_to(
        &mut self,
        _id: u32,
        level: u32,
        _x3: f64,
        _y3: f64,
        _x2: f64,
        _y2: f64,
        _angle: f64,
        _ecc: f64,
    ) {
        self.handle_level_change(level);
    }

    fn collect_nurbs_to(
        &mut self,
        _id: u32,
        level: u32,
        _x2: f64,
        _y2: f64,
        _x_type: u8,
        _y_type: u8,
        _degree: u8,
        _control_points: &[(f64, f64)],
        _knots: &[f64],
        _weights: &[f64],
    ) {
        self.handle_level_change(level);
    }

    fn collect_nurbs_to_data(
        &mut self,
        _id: u32,
        level: u32,
        _x2: f64,
        _y2: f64,
        _knot: f64,
        _knot_prev: f64,
        _weight: f64,
        _weight_prev: f64,
        _data_id: u32,
    ) {
        self.handle_level_change(level);
    }

    fn collect_polyline_to(
        &mut self,
        _id: u32,
        level: u32,
        _x: f64,
        _y: f64,
        _x_type: u8,
        _y_type: u8,
        _points: &[(f64, f64)],
    ) {
        self.handle_level_change(level);
    }

    fn collect_polyline_to_data(&mut self, _id: u32, level: u32, _x: f64, _y: f64, _data_id: u32) {
        self.handle_level_change(level);
    }

    fn collect_infinite_line(&mut self, _id: u32, level: u32, _x1: f64, _y1: f64, _x2: f64, _y2: f64) {
        self.handle_level_change(level);
    }

    fn collect_spline_start(
        &mut self,
        _id: u32,
        level: u32,
        _x: f64,
        _y: f64,
        _second_knot: f64,
        _first_knot: f64,
        _last_knot: f64,
        _degree: u8,
    ) {
        self.handle_level_change(level);
    }

    fn collect_spline_knot(&mut self, _id: u32, level: u32, _x: f64, _y: f64, _knot: f64) {
        self.handle_level_change(level);
    }

    fn collect_spline_end(&mut self) {}

    fn collect_rel_move_to(&mut self, _id: u32, level: u32, _x: f64, _y: f64) {
        self.handle_level_change(level);
    }

    fn collect_rel_line_to(&mut self, _id: u32, level: u32, _x: f64, _y: f64) {
        self.handle_level_change(level);
    }

    fn collect_rel_cub_bez_to(
        &mut self,
        _id: u32,
        level: u32,
        _x: f64,
        _y: f64,
        _a: f64,
        _b: f64,
        _c: f64,
        _d: f64,
    ) {
        self.handle_level_change(level);
    }

    fn collect_rel_quad_bez_to(&mut self, _id: u32, level: u32, _x: f64, _y: f64, _a: f64, _b: f64) {
        self.handle_level_change(level);
    }

    fn collect_rel_elliptical_arc_to(
        &mut self,
        _id: u32,
        level: u32,
        _x: f64,
        _y: f64,
        _a: f64,
        _b: f64,
        _c: f64,
        _d: f64,
    ) {
        self.handle_level_change(level);
    }

    fn collect_nurbs_data(&mut self, _id: u32, level: u32, _data: &NurbsData) {
        self.handle_level_change(level);
    }

    fn collect_polyline_data(&mut self, _id: u32, level: u32, _data: &PolylineData) {
        self.handle_level_change(level);
    }

    fn collect_shape(
        &mut self,
        id: u32,
        level: u32,
        _parent: u32,
        _master_page: u32,
        _master_shape: u32,
        _line_style: u32,
        _fill_style: u32,
        _text_style: u32,
    ) {
        self.handle_level_change(level);
        self.current_shape_level = level;
        self.current_shape_id = id;
        self.is_shape_started = true;
    }

    fn collect_shape_id(&mut self, _id: u32, level: u32, shape_id: u32) {
        self.handle_level_change(level);
        if self.is_shape_started {
            self.page_group_memberships
                .insert(shape_id, self.current_shape_id);
        }
        self.shape_list.push(shape_id);
    }

    fn collect_xform(&mut self, level: u32, xform: &XForm) {
        self.handle_level_change(level);
        if self.is_shape_started {
            self.page_group_xforms.insert(self.current_shape_id, *xform);
        }
    }

    fn collect_txt_xform(&mut self, level: u32, _xform: &XForm) {
        self.handle_level_change(level);
    }

    fn collect_foreign_data_type(
        &mut self,
        level: u32,
        _kind: u16,
        _format: u32,
        _offset_x: f64,
        _offset_y: f64,
        _width: f64,
        _height: f64,
    ) {
        self.handle_level_change(level);
    }

    fn collect_foreign_data(&mut self, level: u32, _data: &[u8]) {
        self.handle_level_change(level);
    }

    fn collect_ole_list(&mut self, _id: u32, level: u32) {
        self.handle_level_change(level);
    }

    fn collect_ole_data(&mut self, _id: u32, level: u32, _data: &[u8]) {
        self.handle_level_change(level);
    }

    fn collect_line(&mut self, level: u32, _style: &OptionalLineStyle) {
        self.handle_level_change(level);
    }

    fn collect_fill_and_shadow(&mut self, level: u32, _style: &OptionalFillStyle) {
        self.handle_level_change(level);
    }

    fn collect_text_block(&mut self, level: u32, _style: &OptionalTextBlockStyle) {
        self.handle_level_change(level);
    }

    fn collect_char_ix(&mut self, _id: u32, level: u32, _style: &OptionalCharStyle) {
        self.handle_level_change(level);
    }

    fn collect_para_ix(&mut self, _id: u32, level: u32, _style: &OptionalParaStyle) {
        self.handle_level_change(level);
    }

    fn collect_text(&mut self, level: u32, _text: &[u8], _format: TextFormat) {
        self.handle_level_change(level);
    }

    fn collect_font(&mut self, _font_id: u16, _name: &[u8], _format: TextFormat) {}

    fn collect_name(&mut self, _id: u32, level: u32, _name: &Name) {
        self.handle_level_change(level);
    }

    fn collect_name_list(&mut self, _id: u32, level: u32) {
        self.handle_level_change(level);
    }

    fn collect_field_list(&mut self, _id: u32, level: u32) {
        self.handle_level_change(level);
    }

    fn collect_text_field(&mut self, _id: u32, level: u32, _name_id: i32, _format_id: i32) {
        self.handle_level_change(level);
    }

    fn collect_numeric_field(
        &mut self,
        _id: u32,
        level: u32,
        _format: u16,
        _value: f64,
        _format_id: i32,
    ) {
        self.handle_level_change(level);
    }

    fn collect_style_sheet(
        &mut self,
        id: u32,
        level: u32,
        line_parent: u32,
        fill_parent: u32,
        text_parent: u32,
    ) {
        self.handle_level_change(level);
        // Style sheets reuse the shape-level bookkeeping for their flush.
        self.current_shape_level = level;
        self.current_style_sheet = id;
        self.line_style = None;
        self.fill_style = None;
        self.text_block_style = None;
        self.char_style = None;
        self.para_style = None;
        self.layout.styles.add_line_parent(id, line_parent);
        self.layout.styles.add_fill_parent(id, fill_parent);
        self.layout.styles.add_text_parent(id, text_parent);
        self.is_style_started = true;
    }

    fn collect_line_style(&mut self, level: u32, style: &OptionalLineStyle) {
        self.handle_level_change(level);
        self.line_style
            .get_or_insert_with(Default::default)
            .overlay(style);
    }

    fn collect_fill_style(&mut self, level: u32, style: &OptionalFillStyle) {
        self.handle_level_change(level);
        self.fill_style
            .get_or_insert_with(Default::default)
            .overlay(style);
    }

    fn collect_text_block_style(&mut self, level: u32, style: &OptionalTextBlockStyle) {
        self.handle_level_change(level);
        self.text_block_style
            .get_or_insert_with(Default::default)
            .overlay(style);
    }

    fn collect_char_ix_style(&mut self, level: u32, style: &OptionalCharStyle) {
        self.handle_level_change(level);
        if self.char_style.is_none() {
            self.char_style = Some(style.clone());
        }
    }

    fn collect_para_ix_style(&mut self, level: u32, style: &OptionalParaStyle) {
        self.handle_level_change(level);
        if self.para_style.is_none() {
            self.para_style = Some(*style);
        }
    }

    fn collect_page_sheet(&mut self, _id: u32, level: u32) {
        self.handle_level_change(level);
        self.current_shape_level = level;
    }

    fn collect_page_props(
        &mut self,
        _id: u32,
        level: u32,
        _width: f64,
        _height: f64,
        _shadow_offset_x: f64,
        _shadow_offset_y: f64,
        _scale: f64,
    ) {
        self.handle_level_change(level);
    }

    fn collect_page(&mut self, _id: u32, level: u32, _background_id: u32, _is_background: bool, _name: &str) {
        self.handle_level_change(level);
    }

    fn collect_unhandled_chunk(&mut self, _id: u32, level: u32) {
        self.handle_level_change(level);
    }

    fn start_page(&mut self, _id: u32) {
        self.page_group_xforms.clear();
        self.page_group_memberships.clear();
        self.page_shape_order.clear();
        self.group_shape_order.clear();
    }

    fn end_page(&mut self) {
        self.handle_level_change(0);
        self.splice_shape_orders();
        self.layout
            .group_xforms
            .push(core::mem::take(&mut self.page_group_xforms));
        self.layout
            .group_memberships
            .push(core::mem::take(&mut self.page_group_memberships));
        self.layout
            .page_shape_orders
            .push(core::mem::take(&mut self.page_shape_order));
    }

    fn end_pages(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_children_splice_after_their_group() {
        let mut collector = StylesCollector::new();
        collector.start_page(0);
        // Page sheet at level 2; the page's shape-id elements replay at list
        // child depth, then the first Shape chunk at level 3 seals them as
        // the page order.
        collector.collect_page_sheet(0, 2);
        collector.collect_shape_id(0, 4, 10);
        collector.collect_shape_id(1, 4, 20);
        // Group 10 carries children 11 and 12.
        collector.collect_shape(10, 3, 0, u32::MAX, u32::MAX, 0, 0, 0);
        collector.collect_shape_id(0, 5, 11);
        collector.collect_shape_id(1, 5, 12);
        collector.end_page();

        let layout = collector.into_layout();
        assert_eq!(layout.page_shape_orders[0], vec![10, 11, 12, 20]);
        assert_eq!(layout.group_memberships[0].get(&11), Some(&10));
        assert_eq!(layout.group_memberships[0].get(&12), Some(&10));
    }

    #[test]
    fn style_sheet_attributes_flush_on_level_drop() {
        let mut collector = StylesCollector::new();
        collector.collect_style_sheet(3, 2, u32::MAX, u32::MAX, u32::MAX);
        collector.collect_line_style(
            3,
            &OptionalLineStyle {
                width: Some(0.02),
                ..Default::default()
            },
        );
        // Dropping to level 0 seals sheet 3.
        collector.collect_unhandled_chunk(0, 0);
        let layout = collector.into_layout();
        assert_eq!(layout.styles.line_style(3).width, 0.02);
    }
}
