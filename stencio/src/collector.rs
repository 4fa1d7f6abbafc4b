// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The event surface shared by both collection passes.
//!
//! The decoders (binary and XML) translate their input into a linear
//! sequence of `collect_*` calls. The first pass accumulates styles and
//! orderings; the second drives the painter. Every call carries the chunk
//! `level`, and a level decrease is the only signal that a shape or a list
//! has ended; collectors flush pending aggregates from their own level
//! bookkeeping, never from lookahead.

use crate::style::{
    OptionalCharStyle, OptionalFillStyle, OptionalLineStyle, OptionalParaStyle,
    OptionalTextBlockStyle,
};
use crate::types::{Name, NurbsData, PolylineData, TextFormat, XForm};

pub trait Collector {
    // Geometry rows.
    fn collect_geometry(&mut self, id: u32, level: u32, no_fill: bool, no_line: bool, no_show: bool);
    fn collect_move_to(&mut self, id: u32, level: u32, x: f64, y: f64);
    fn collect_line_to(&mut self, id: u32, level: u32, x: f64, y: f64);
    fn collect_arc_to(&mut self, id: u32, level: u32, x2: f64, y2: f64, bow: f64);
    fn collect_ellipse(
        &mut self,
        id: u32,
        level: u32,
        cx: f64,
        cy: f64,
        xleft: f64,
        yleft: f64,
        xtop: f64,
        ytop: f64,
    );
    fn collect_elliptical_arc_to(
        &mut self,
        id: u32,
        level: u32,
        x3: f64,
        y3: f64,
        x2: f64,
        y2: f64,
        angle: f64,
        ecc: f64,
    );
    #[allow(clippy::too_many_arguments)]
    fn collect_nurbs_to(
        &mut self,
        id: u32,
        level: u32,
        x2: f64,
        y2: f64,
        x_type: u8,
        y_type: u8,
        degree: u8,
        control_points: &[(f64, f64)],
        knots: &[f64],
        weights: &[f64],
    );
    fn collect_nurbs_to_data(
        &mut self,
        id: u32,
        level: u32,
        x2: f64,
        y2: f64,
        knot: f64,
        knot_prev: f64,
        weight: f64,
        weight_prev: f64,
        data_id: u32,
    );
    fn collect_polyline_to(
        &mut self,
        id: u32,
        level: u32,
        x: f64,
        y: f64,
        x_type: u8,
        y_type: u8,
        points: &[(f64, f64)],
    );
    fn collect_polyline_to_data(&mut self, id: u32, level: u32, x: f64, y: f64, data_id: u32);
    fn collect_infinite_line(&mut self, id: u32, level: u32, x1: f64, y1: f64, x2: f64, y2: f64);
    fn collect_spline_start(
        &mut self,
        id: u32,
        level: u32,
        x: f64,
        y: f64,
        second_knot: f64,
        first_knot: f64,
        last_knot: f64,
        degree: u8,
    );
    fn collect_spline_knot(&mut self, id: u32, level: u32, x: f64, y: f64, knot: f64);
    fn collect_spline_end(&mut self);
    fn collect_rel_move_to(&mut self, id: u32, level: u32, x: f64, y: f64);
    fn collect_rel_line_to(&mut self, id: u32, level: u32, x: f64, y: f64);
    fn collect_rel_cub_bez_to(
        &mut self,
        id: u32,
        level: u32,
        x: f64,
        y: f64,
        a: f64,
        b: f64,
        c: f64,
        d: f64,
    );
    fn collect_rel_quad_bez_to(&mut self, id: u32, level: u32, x: f64, y: f64, a: f64, b: f64);
    fn collect_rel_elliptical_arc_to(
        &mut self,
        id: u32,
        level: u32,
        x: f64,
        y: f64,
        a: f64,
        b: f64,
        c: f64,
        d: f64,
    );

    // Shape data blocks referenced by data id.
    fn collect_nurbs_data(&mut self, id: u32, level: u32, data: &NurbsData);
    fn collect_polyline_data(&mut self, id: u32, level: u32, data: &PolylineData);

    // Shape structure.
    #[allow(clippy::too_many_arguments)]
    fn collect_shape(
        &mut self,
        id: u32,
        level: u32,
        parent: u32,
        master_page: u32,
        master_shape: u32,
        line_style: u32,
        fill_style: u32,
        text_style: u32,
    );
    fn collect_shape_id(&mut self, id: u32, level: u32, shape_id: u32);
    fn collect_xform(&mut self, level: u32, xform: &XForm);
    fn collect_txt_xform(&mut self, level: u32, xform: &XForm);
    fn collect_foreign_data_type(
        &mut self,
        level: u32,
        kind: u16,
        format: u32,
        offset_x: f64,
        offset_y: f64,
        width: f64,
        height: f64,
    );
    fn collect_foreign_data(&mut self, level: u32, data: &[u8]);
    fn collect_ole_list(&mut self, id: u32, level: u32);
    fn collect_ole_data(&mut self, id: u32, level: u32, data: &[u8]);

    // Local style overrides on a shape.
    fn collect_line(&mut self, level: u32, style: &OptionalLineStyle);
    fn collect_fill_and_shadow(&mut self, level: u32, style: &OptionalFillStyle);
    fn collect_text_block(&mut self, level: u32, style: &OptionalTextBlockStyle);
    fn collect_char_ix(&mut self, id: u32, level: u32, style: &OptionalCharStyle);
    fn collect_para_ix(&mut self, id: u32, level: u32, style: &OptionalParaStyle);

    // Text content.
    fn collect_text(&mut self, level: u32, text: &[u8], format: TextFormat);
    fn collect_font(&mut self, font_id: u16, name: &[u8], format: TextFormat);
    fn collect_name(&mut self, id: u32, level: u32, name: &Name);
    fn collect_name_list(&mut self, id: u32, level: u32);

    // Fields.
    fn collect_field_list(&mut self, id: u32, level: u32);
    fn collect_text_field(&mut self, id: u32, level: u32, name_id: i32, format_id: i32);
    fn collect_numeric_field(&mut self, id: u32, level: u32, format: u16, value: f64, format_id: i32);

    // Style sheets (first pass harvests these).
    fn collect_style_sheet(
        &mut self,
        id: u32,
        level: u32,
        line_parent: u32,
        fill_parent: u32,
        text_parent: u32,
    );
    fn collect_line_style(&mut self, level: u32, style: &OptionalLineStyle);
    fn collect_fill_style(&mut self, level: u32, style: &OptionalFillStyle);
    fn collect_text_block_style(&mut self, level: u32, style: &OptionalTextBlockStyle);
    fn collect_char_ix_style(&mut self, level: u32, style: &OptionalCharStyle);
    fn collect_para_ix_style(&mut self, level: u32, style: &OptionalParaStyle);

    // Pages.
    fn collect_page_sheet(&mut self, id: u32, level: u32);
    fn collect_page_props(
        &mut self,
        id: u32,
        level: u32,
        width: f64,
        height: f64,
        shadow_offset_x: f64,
        shadow_offset_y: f64,
        scale: f64,
    );
    fn collect_page(&mut self, id: u32, level: u32, background_id: u32, is_background: bool, name: &str);

    /// Unknown chunks still report their level so flush bookkeeping stays
    /// correct.
    fn collect_unhandled_chunk(&mut self, id: u32, level: u32);

    fn start_page(&mut self, id: u32);
    fn end_page(&mut self);
    fn end_pages(&mut self);
}
