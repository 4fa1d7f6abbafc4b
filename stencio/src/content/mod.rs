// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Second pass: consumes the event stream plus the first pass's tables and
//! queues paint calls in page z-order.

mod path;
mod text;

use hashbrown::HashMap;

use stencio_draw::{DisplayList, Painter, PropertyList};

use crate::charsets::decode_string;
use crate::collector::Collector;
use crate::fields::{parse_format_id, FieldElement, FieldList, FORMAT_UNKNOWN};
use crate::pages::{Page, Pages};
use crate::shape::Shape;
use crate::stencil::Stencils;
use crate::style::{
    CharStyle, FillStyle, LineStyle, OptionalCharStyle, OptionalFillStyle, OptionalLineStyle,
    OptionalParaStyle, OptionalTextBlockStyle, ParaStyle, TextBlockStyle,
};
use crate::styles_collector::DocumentLayout;
use crate::types::{Font, Name, NurbsData, PolylineData, TextFormat, XForm, MINUS_ONE};

/// The second-pass collector, driving a [`Painter`].
///
/// Built from the first pass's [`DocumentLayout`] and the loaded stencils;
/// both are owned so nothing aliases across the passes.
pub struct ContentCollector<'a> {
    painter: &'a mut dyn Painter,
    layout: DocumentLayout,
    stencils: Stencils,

    is_page_started: bool,
    page_width: f64,
    page_height: f64,
    shadow_offset_x: f64,
    shadow_offset_y: f64,
    scale: f64,

    // Current point, in page space and in local shape space.
    x: f64,
    y: f64,
    original_x: f64,
    original_y: f64,
    xform: XForm,
    txtxform: Option<XForm>,

    current_fill_geometry: Vec<PropertyList>,
    current_line_geometry: Vec<PropertyList>,

    current_foreign_data: Vec<u8>,
    current_foreign_props: PropertyList,
    foreign_kind: u16,
    foreign_format: u32,
    foreign_offset_x: f64,
    foreign_offset_y: f64,
    foreign_width: f64,
    foreign_height: f64,

    style_props: PropertyList,
    line_pattern: u8,
    fill_pattern: u8,
    fill_fg_transparency: f64,
    fill_bg_transparency: f64,
    no_line: bool,
    no_fill: bool,
    no_show: bool,

    fonts: HashMap<u16, Font>,
    current_level: u32,
    current_shape_level: u32,
    current_shape_id: u32,
    is_shape_started: bool,
    current_page_number: usize,

    page_output_drawing: HashMap<u32, DisplayList>,
    page_output_text: HashMap<u32, DisplayList>,

    nurbs_data: HashMap<u32, NurbsData>,
    polyline_data: HashMap<u32, PolylineData>,

    text_stream: Vec<u8>,
    text_format: TextFormat,
    names: HashMap<u32, String>,
    stencil_names: HashMap<u32, String>,
    fields: Vec<String>,
    stencil_fields: FieldList,
    field_index: usize,
    char_formats: Vec<CharStyle>,
    para_formats: Vec<ParaStyle>,

    line_style: LineStyle,
    fill_style: FillStyle,
    text_block_style: TextBlockStyle,
    default_char_style: CharStyle,
    default_para_style: ParaStyle,

    stencil_shape: Option<Shape>,
    is_stencil_replay: bool,
    current_geometry_count: u32,

    current_page: Page,
    pages: Pages,
    is_background_page: bool,

    spline_control_points: Vec<(f64, f64)>,
    spline_knots: Vec<f64>,
    spline_x: f64,
    spline_y: f64,
    spline_last_knot: f64,
    spline_degree: u8,
    spline_level: u32,
}

impl core::fmt::Debug for ContentCollector<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContentCollector")
            .field("current_page_number", &self.current_page_number)
            .field("current_shape_id", &self.current_shape_id)
            .field("current_level", &self.current_level)
            .finish_non_exhaustive()
    }
}

impl<'a> ContentCollector<'a> {
    pub fn new(painter: &'a mut dyn Painter, layout: DocumentLayout, stencils: Stencils) -> Self {
        Self {
            painter,
            layout,
            stencils,
            is_page_started: false,
            page_width: 0.0,
            page_height: 0.0,
            shadow_offset_x: 0.0,
            shadow_offset_y: 0.0,
            scale: 1.0,
            x: 0.0,
            y: 0.0,
            original_x: 0.0,
            original_y: 0.0,
            xform: XForm::default(),
            txtxform: None,
            current_fill_geometry: Vec::new(),
            current_line_geometry: Vec::new(),
            current_foreign_data: Vec::new(),
            current_foreign_props: PropertyList::new(),
            foreign_kind: 0,
            foreign_format: 0,
            foreign_offset_x: 0.0,
            foreign_offset_y: 0.0,
            foreign_width: 0.0,
            foreign_height: 0.0,
            style_props: PropertyList::new(),
            line_pattern: 1,
            fill_pattern: 1,
            fill_fg_transparency: 0.0,
            fill_bg_transparency: 0.0,
            no_line: false,
            no_fill: false,
            no_show: false,
            fonts: HashMap::new(),
            current_level: 0,
            current_shape_level: 0,
            current_shape_id: 0,
            is_shape_started: false,
            current_page_number: 0,
            page_output_drawing: HashMap::new(),
            page_output_text: HashMap::new(),
            nurbs_data: HashMap::new(),
            polyline_data: HashMap::new(),
            text_stream: Vec::new(),
            text_format: TextFormat::Ansi,
            names: HashMap::new(),
            stencil_names: HashMap::new(),
            fields: Vec::new(),
            stencil_fields: FieldList::new(),
            field_index: 0,
            char_formats: Vec::new(),
            para_formats: Vec::new(),
            line_style: LineStyle::default(),
            fill_style: FillStyle::default(),
            text_block_style: TextBlockStyle::default(),
            default_char_style: CharStyle::default(),
            default_para_style: ParaStyle::default(),
            stencil_shape: None,
            is_stencil_replay: false,
            current_geometry_count: 0,
            current_page: Page::new(),
            pages: Pages::new(),
            is_background_page: false,
            spline_control_points: Vec::new(),
            spline_knots: Vec::new(),
            spline_x: 0.0,
            spline_y: 0.0,
            spline_last_knot: 0.0,
            spline_degree: 0,
            spline_level: 0,
        }
    }

    fn group_xforms(&self) -> Option<&HashMap<u32, XForm>> {
        self.layout
            .group_xforms
            .get(self.current_page_number.wrapping_sub(1))
    }

    fn group_memberships(&self) -> Option<&HashMap<u32, u32>> {
        self.layout
            .group_memberships
            .get(self.current_page_number.wrapping_sub(1))
    }

    fn page_shape_order(&self) -> &[u32] {
        self.layout
            .page_shape_orders
            .get(self.current_page_number.wrapping_sub(1))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Maps a point through one transform: translate(−pinLoc), flips about
    /// the local origin, rotate, translate(+pin).
    pub(crate) fn apply_xform(x: &mut f64, y: &mut f64, xform: &XForm) {
        *x -= xform.pin_loc_x;
        *y -= xform.pin_loc_y;
        if xform.flip_x {
            *x = -*x;
        }
        if xform.flip_y {
            *y = -*y;
        }
        if xform.angle != 0.0 {
            let (sin, cos) = xform.angle.sin_cos();
            let tmp_x = *x * cos - *y * sin;
            let tmp_y = *y * cos + *x * sin;
            *x = tmp_x;
            *y = tmp_y;
        }
        *x += xform.pin_x;
        *y += xform.pin_y;
    }

    /// Maps a local point to paint space: the shape's transform chain from
    /// the first pass (innermost first), then the page-height y-flip.
    pub(crate) fn transform_point(&self, x: &mut f64, y: &mut f64, txtxform: Option<&XForm>) {
        if !self.is_shape_started || self.current_shape_id == 0 {
            return;
        }
        if let Some(txt) = txtxform {
            Self::apply_xform(x, y, txt);
        }
        let mut shape_id = self.current_shape_id;
        if let Some(xforms) = self.group_xforms() {
            loop {
                let Some(xform) = xforms.get(&shape_id) else {
                    break;
                };
                Self::apply_xform(x, y, xform);
                match self.group_memberships().and_then(|m| m.get(&shape_id)) {
                    Some(&parent) => shape_id = parent,
                    None => break,
                }
            }
        }
        *y = self.page_height - *y;
    }

    /// Transforms an angle by pushing a unit vector through the full chain
    /// and recovering it with `acos`, which handles every flip × rotation
    /// combination.
    pub(crate) fn transform_angle(&self, angle: &mut f64, txtxform: Option<&XForm>) {
        if !self.is_shape_started || self.current_shape_id == 0 {
            return;
        }
        let mut x0 = self.xform.pin_loc_x;
        let mut y0 = self.xform.pin_loc_y;
        let mut x1 = self.xform.pin_loc_x + angle.cos();
        let mut y1 = self.xform.pin_loc_y + angle.sin();
        self.transform_point(&mut x0, &mut y0, txtxform);
        self.transform_point(&mut x1, &mut y1, txtxform);
        let length = ((x1 - x0) * (x1 - x0) + (y1 - y0) * (y1 - y0)).sqrt();
        let sign = if y1 > y0 { 1.0 } else { -1.0 };
        *angle = (2.0 * core::f64::consts::PI + sign * ((x1 - x0) / length).acos())
            % (2.0 * core::f64::consts::PI);
    }

    /// Effective flips: the XOR of the shape's own and all ancestors'.
    pub(crate) fn transform_flips(&self, flip_x: &mut bool, flip_y: &mut bool) {
        if !self.is_shape_started || self.current_shape_id == 0 {
            return;
        }
        let mut shape_id = self.current_shape_id;
        if let Some(xforms) = self.group_xforms() {
            loop {
                let Some(xform) = xforms.get(&shape_id) else {
                    break;
                };
                if xform.flip_x {
                    *flip_x = !*flip_x;
                }
                if xform.flip_y {
                    *flip_y = !*flip_y;
                }
                match self.group_memberships().and_then(|m| m.get(&shape_id)) {
                    Some(&parent) => shape_id = parent,
                    None => break,
                }
            }
        }
    }

    fn shape_output_drawing(&mut self) -> &mut DisplayList {
        self.page_output_drawing
            .entry(self.current_shape_id)
            .or_default()
    }

    fn shape_output_text(&mut self) -> &mut DisplayList {
        self.page_output_text
            .entry(self.current_shape_id)
            .or_default()
    }

    fn convert_data_to_string(&self, name: &Name) -> String {
        decode_string(&name.data, name.format)
    }

    fn handle_level_change(&mut self, level: u32) {
        if self.current_level == level {
            return;
        }
        if level <= self.current_shape_level {
            if self.is_shape_started {
                // Geometry inheritance: a shape that produced no local path
                // of its own draws its master's sections instead.
                if let Some(stencil) = self.stencil_shape.clone() {
                    if !self.is_stencil_replay {
                        self.is_stencil_replay = true;
                        self.nurbs_data = stencil.nurbs_data.clone();
                        self.polyline_data = stencil.polyline_data.clone();
                        if self.current_fill_geometry.is_empty()
                            && self.current_line_geometry.is_empty()
                            && !self.no_show
                        {
                            for list in stencil.geometries.values() {
                                self.x = 0.0;
                                self.y = 0.0;
                                list.replay(self);
                            }
                        }
                        self.is_stencil_replay = false;
                    }
                }
                self.flush_current_path();
                self.flush_current_foreign_data();
                if !self.text_stream.is_empty() {
                    self.flush_text();
                }
                self.is_shape_started = false;
            }
            self.original_x = 0.0;
            self.original_y = 0.0;
            self.x = 0.0;
            self.y = 0.0;
            self.txtxform = None;
            self.xform = XForm::default();
            self.nurbs_data.clear();
            self.polyline_data.clear();
        }
        self.current_level = level;
    }

    /// Builds the foreign-data blob and its mime type. Headerless bitmaps
    /// get a synthesised 14-byte BMP file header; enhanced metafiles are told
    /// apart from WMF by the EMF signature at `0x28`.
    fn handle_foreign_data(&mut self, data: &[u8]) {
        match self.foreign_kind {
            1 | 4 => {
                self.current_foreign_data.clear();
                if self.foreign_kind == 1 && self.foreign_format == 0 {
                    let size = (data.len() as u32).wrapping_add(14);
                    self.current_foreign_data.extend_from_slice(b"BM");
                    self.current_foreign_data.extend_from_slice(&size.to_le_bytes());
                    self.current_foreign_data.extend_from_slice(&[0, 0, 0, 0]);
                    self.current_foreign_data
                        .extend_from_slice(&0x36u32.to_le_bytes());
                }
                self.current_foreign_data.extend_from_slice(data);

                if self.foreign_kind == 1 {
                    let mime = match self.foreign_format {
                        0 | 255 => Some("image/bmp"),
                        1 => Some("image/jpeg"),
                        2 => Some("image/gif"),
                        3 => Some("image/tiff"),
                        4 => Some("image/png"),
                        _ => None,
                    };
                    if let Some(mime) = mime {
                        self.current_foreign_props.insert("libwpg:mime-type", mime);
                    }
                } else {
                    let is_emf = self.current_foreign_data.len() > 0x2b
                        && self.current_foreign_data[0x28..=0x2b] == [0x20, 0x45, 0x4d, 0x46];
                    self.current_foreign_props
                        .insert("libwpg:mime-type", if is_emf { "image/emf" } else { "image/wmf" });
                }
            }
            2 => {
                self.current_foreign_props
                    .insert("libwpg:mime-type", "object/ole");
                self.current_foreign_data.extend_from_slice(data);
            }
            _ => {}
        }
    }

    fn flush_current_foreign_data(&mut self) {
        let mut xmiddle = self.foreign_offset_x + self.foreign_width / 2.0;
        let mut ymiddle = self.foreign_offset_y + self.foreign_height / 2.0;
        self.transform_point(&mut xmiddle, &mut ymiddle, None);

        let mut flip_x = false;
        let mut flip_y = false;
        self.transform_flips(&mut flip_x, &mut flip_y);

        self.current_foreign_props
            .insert("svg:x", self.scale * (xmiddle - self.foreign_width / 2.0));
        self.current_foreign_props
            .insert("svg:width", self.scale * self.foreign_width);
        self.current_foreign_props
            .insert("svg:y", self.scale * (ymiddle - self.foreign_height / 2.0));
        self.current_foreign_props
            .insert("svg:height", self.scale * self.foreign_height);

        let mut angle = 0.0;
        self.transform_angle(&mut angle, None);
        if flip_x {
            self.current_foreign_props
                .insert("draw:mirror-horizontal", true);
            angle = core::f64::consts::PI - angle;
        }
        if flip_y {
            self.current_foreign_props.insert("draw:mirror-vertical", true);
            angle = -angle;
        }
        if angle != 0.0 {
            self.current_foreign_props.insert(
                "libwpg:rotate",
                stencio_draw::Value::generic(angle * 180.0 / core::f64::consts::PI),
            );
        }

        if !self.current_foreign_data.is_empty()
            && self.current_foreign_props.contains("libwpg:mime-type")
            && self.foreign_width != 0.0
            && self.foreign_height != 0.0
        {
            let props = self.current_foreign_props.clone();
            let data = core::mem::take(&mut self.current_foreign_data);
            let output = self.shape_output_drawing();
            output.add_style(PropertyList::new(), Vec::new());
            output.add_graphic_object(props, data);
        }
        self.current_foreign_data.clear();
        self.current_foreign_props.clear();
    }

    /// Stitches per-shape display lists into the page in z-order. Group text
    /// is deferred on a stack and drained when leaving the group, so all of a
    /// group's graphics precede all of its text.
    fn flush_current_page(&mut self) {
        let order: Vec<u32> = self.page_shape_order().to_vec();
        if !order.is_empty() {
            let memberships = self.group_memberships().cloned().unwrap_or_default();
            let mut group_text_stack: Vec<(u32, DisplayList)> = Vec::new();
            for shape_id in order {
                match memberships.get(&shape_id) {
                    None => {
                        while let Some((_, text)) = group_text_stack.pop() {
                            self.current_page.append(&text);
                        }
                    }
                    Some(&parent) => loop {
                        match group_text_stack.last() {
                            Some((group, _)) if *group != parent => {
                                if let Some((_, text)) = group_text_stack.pop() {
                                    self.current_page.append(&text);
                                }
                            }
                            _ => break,
                        }
                    },
                }
                if let Some(drawing) = self.page_output_drawing.get(&shape_id) {
                    self.current_page.append(drawing);
                }
                let text = self
                    .page_output_text
                    .get(&shape_id)
                    .cloned()
                    .unwrap_or_default();
                group_text_stack.push((shape_id, text));
            }
            while let Some((_, text)) = group_text_stack.pop() {
                self.current_page.append(&text);
            }
        }
        self.page_output_drawing.clear();
        self.page_output_text.clear();
    }
}

impl Collector for ContentCollector<'_> {
    fn collect_geometry(&mut self, _id: u32, level: u32, no_fill: bool, no_line: bool, no_show: bool) {
        self.handle_level_change(level);
        self.x = 0.0;
        self.y = 0.0;
        self.original_x = 0.0;
        self.original_y = 0.0;
        self.no_fill = no_fill;
        self.no_line = no_line;
        self.no_show = no_show;
        self.current_geometry_count += 1;
    }

    fn collect_move_to(&mut self, id: u32, level: u32, x: f64, y: f64) {
        self.content_move_to(id, level, x, y);
    }

    fn collect_line_to(&mut self, id: u32, level: u32, x: f64, y: f64) {
        self.content_line_to(id, level, x, y);
    }

    fn collect_arc_to(&mut self, id: u32, level: u32, x2: f64, y2: f64, bow: f64) {
        self.content_arc_to(id, level, x2, y2, bow);
    }

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
    ) {
        self.content_ellipse(id, level, cx, cy, xleft, yleft, xtop, ytop);
    }

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
    ) {
        self.content_elliptical_arc_to(id, level, x3, y3, x2, y2, angle, ecc);
    }

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
    ) {
        self.content_nurbs_to(
            id,
            level,
            x2,
            y2,
            x_type,
            y_type,
            degree,
            control_points,
            knots,
            weights,
        );
    }

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
    ) {
        self.content_nurbs_to_data(id, level, x2, y2, knot, knot_prev, weight, weight_prev, data_id);
    }

    fn collect_polyline_to(
        &mut self,
        id: u32,
        level: u32,
        x: f64,
        y: f64,
        x_type: u8,
        y_type: u8,
        points: &[(f64, f64)],
    ) {
        self.content_polyline_to(id, level, x, y, x_type, y_type, points);
    }

    fn collect_polyline_to_data(&mut self, id: u32, level: u32, x: f64, y: f64, data_id: u32) {
        self.content_polyline_to_data(id, level, x, y, data_id);
    }

    fn collect_infinite_line(&mut self, id: u32, level: u32, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.content_infinite_line(id, level, x1, y1, x2, y2);
    }

    fn collect_spline_start(
        &mut self,
        _id: u32,
        level: u32,
        x: f64,
        y: f64,
        second_knot: f64,
        first_knot: f64,
        last_knot: f64,
        degree: u8,
    ) {
        self.spline_level = level;
        self.spline_knots.push(first_knot);
        self.spline_knots.push(second_knot);
        self.spline_last_knot = last_knot;
        self.spline_x = x;
        self.spline_y = y;
        self.spline_degree = degree;
    }

    fn collect_spline_knot(&mut self, _id: u32, _level: u32, x: f64, y: f64, knot: f64) {
        self.spline_knots.push(knot);
        self.spline_control_points.push((self.spline_x, self.spline_y));
        self.spline_x = x;
        self.spline_y = y;
    }

    fn collect_spline_end(&mut self) {
        if self.spline_knots.is_empty() || self.spline_control_points.is_empty() {
            self.spline_knots.clear();
            self.spline_control_points.clear();
            return;
        }
        self.spline_knots.push(self.spline_last_knot);
        let control_points = core::mem::take(&mut self.spline_control_points);
        let knots = core::mem::take(&mut self.spline_knots);
        let weights = vec![1.0; control_points.len() + 2];
        let degree = self.spline_degree;
        let (x, y, level) = (self.spline_x, self.spline_y, self.spline_level);
        self.content_nurbs_to(0, level, x, y, 1, 1, degree, &control_points, &knots, &weights);
    }

    fn collect_rel_move_to(&mut self, id: u32, level: u32, x: f64, y: f64) {
        let x = x * self.xform.width;
        let y = y * self.xform.height;
        self.content_move_to(id, level, x, y);
    }

    fn collect_rel_line_to(&mut self, id: u32, level: u32, x: f64, y: f64) {
        let x = x * self.xform.width;
        let y = y * self.xform.height;
        self.content_line_to(id, level, x, y);
    }

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
    ) {
        self.content_rel_cub_bez_to(id, level, x, y, a, b, c, d);
    }

    fn collect_rel_quad_bez_to(&mut self, id: u32, level: u32, x: f64, y: f64, a: f64, b: f64) {
        self.content_rel_quad_bez_to(id, level, x, y, a, b);
    }

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
    ) {
        let x = x * self.xform.width;
        let y = y * self.xform.height;
        let a = a * self.xform.width;
        let b = b * self.xform.height;
        self.content_elliptical_arc_to(id, level, x, y, a, b, c, d);
    }

    fn collect_nurbs_data(&mut self, id: u32, level: u32, data: &NurbsData) {
        self.handle_level_change(level);
        self.nurbs_data.insert(id, data.clone());
    }

    fn collect_polyline_data(&mut self, id: u32, level: u32, data: &PolylineData) {
        self.handle_level_change(level);
        self.polyline_data.insert(id, data.clone());
    }

    fn collect_shape(
        &mut self,
        id: u32,
        level: u32,
        _parent: u32,
        master_page: u32,
        master_shape: u32,
        line_style: u32,
        fill_style: u32,
        text_style: u32,
    ) {
        self.handle_level_change(level);
        self.current_shape_level = level;

        self.foreign_kind = 0;
        self.foreign_format = 0;
        self.foreign_offset_x = 0.0;
        self.foreign_offset_y = 0.0;
        self.foreign_width = 0.0;
        self.foreign_height = 0.0;

        self.original_x = 0.0;
        self.original_y = 0.0;
        self.x = 0.0;
        self.y = 0.0;

        self.no_line = false;
        self.no_fill = false;
        self.no_show = false;

        self.fill_pattern = 1;
        self.fill_fg_transparency = 0.0;
        self.fill_bg_transparency = 0.0;

        self.text_stream.clear();
        self.text_format = TextFormat::Ansi;
        self.char_formats.clear();
        self.para_formats.clear();

        self.default_char_style = self.layout.styles.char_style(0);
        self.default_para_style = self.layout.styles.para_style(0);
        self.text_block_style = self.layout.styles.text_block_style(0);

        self.current_shape_id = id;
        self.page_output_drawing.insert(id, DisplayList::new());
        self.page_output_text.insert(id, DisplayList::new());
        self.is_shape_started = true;

        self.names.clear();
        self.stencil_names.clear();
        self.fields.clear();
        self.stencil_fields.clear();

        self.line_style = LineStyle::default();
        self.fill_style = FillStyle::default();
        self.stencil_shape = self.stencils.shape(master_page, master_shape).cloned();

        if let Some(stencil) = self.stencil_shape.clone() {
            if let Some(foreign) = &stencil.foreign {
                self.foreign_kind = foreign.kind;
                self.foreign_format = foreign.format;
                self.foreign_offset_x = foreign.offset_x;
                self.foreign_offset_y = foreign.offset_y;
                self.foreign_width = foreign.width;
                self.foreign_height = foreign.height;
                self.current_foreign_data.clear();
                self.handle_foreign_data(&foreign.data);
            }

            self.text_stream = stencil.text.clone();
            self.text_format = stencil.text_format;

            for (name_id, name) in &stencil.names {
                let decoded = self.convert_data_to_string(name);
                self.stencil_names.insert(*name_id, decoded);
            }

            self.stencil_fields = stencil.fields.clone();
            for i in 0..self.stencil_fields.len() {
                let resolved = self
                    .stencil_fields
                    .element(i)
                    .map(|e| e.format(&self.stencil_names))
                    .unwrap_or_default();
                self.fields.push(resolved);
            }

            if stencil.line_style_id != MINUS_ONE {
                self.line_style
                    .overlay(&self.layout.styles.optional_line_style(stencil.line_style_id));
            }
            self.line_style.overlay(&stencil.line_style);

            if stencil.fill_style_id != MINUS_ONE {
                self.fill_style
                    .overlay(&self.layout.styles.optional_fill_style(stencil.fill_style_id));
            }
            self.fill_style.overlay(&stencil.fill_style);

            if stencil.text_style_id != MINUS_ONE {
                self.default_char_style = self.layout.styles.char_style(stencil.text_style_id);
                self.default_para_style = self.layout.styles.para_style(stencil.text_style_id);
                self.text_block_style = self.layout.styles.text_block_style(stencil.text_style_id);
            }
            self.text_block_style.overlay(&stencil.text_block_style);
            self.default_char_style.overlay(&stencil.char_style);
            self.default_para_style.overlay(&stencil.para_style);
        }

        if line_style != MINUS_ONE {
            self.line_style
                .overlay(&self.layout.styles.optional_line_style(line_style));
        }
        if fill_style != MINUS_ONE {
            self.fill_style
                .overlay(&self.layout.styles.optional_fill_style(fill_style));
        }
        if text_style != MINUS_ONE {
            self.default_char_style = self.layout.styles.char_style(text_style);
            self.default_para_style = self.layout.styles.para_style(text_style);
            self.text_block_style = self.layout.styles.text_block_style(text_style);
        }

        self.current_geometry_count = 0;
        self.field_index = 0;
    }

    fn collect_shape_id(&mut self, _id: u32, level: u32, _shape_id: u32) {
        self.handle_level_change(level);
    }

    fn collect_xform(&mut self, level: u32, xform: &XForm) {
        self.handle_level_change(level);
        self.xform = *xform;
    }

    fn collect_txt_xform(&mut self, level: u32, xform: &XForm) {
        self.handle_level_change(level);
        let mut txtxform = *xform;
        txtxform.x = txtxform.pin_x - txtxform.pin_loc_x;
        txtxform.y = txtxform.pin_y - txtxform.pin_loc_y;
        self.txtxform = Some(txtxform);
    }

    fn collect_foreign_data_type(
        &mut self,
        level: u32,
        kind: u16,
        format: u32,
        offset_x: f64,
        offset_y: f64,
        width: f64,
        height: f64,
    ) {
        self.handle_level_change(level);
        self.foreign_kind = kind;
        self.foreign_format = format;
        self.foreign_offset_x = offset_x;
        self.foreign_offset_y = offset_y;
        self.foreign_width = width;
        self.foreign_height = height;
    }

    fn collect_foreign_data(&mut self, level: u32, data: &[u8]) {
        self.handle_level_change(level);
        self.handle_foreign_data(data);
    }

    fn collect_ole_list(&mut self, _id: u32, level: u32) {
        self.handle_level_change(level);
        self.current_foreign_data.clear();
        self.handle_foreign_data(&[]);
    }

    fn collect_ole_data(&mut self, _id: u32, level: u32, data: &[u8]) {
        self.handle_level_change(level);
        self.current_foreign_data.extend_from_slice(data);
    }

    fn collect_line(&mut self, level: u32, style: &OptionalLineStyle) {
        self.handle_level_change(level);
        self.line_style.overlay(style);
    }

    fn collect_fill_and_shadow(&mut self, level: u32, style: &OptionalFillStyle) {
        self.handle_level_change(level);
        self.fill_style.overlay(style);
    }

    fn collect_text_block(&mut self, level: u32, style: &OptionalTextBlockStyle) {
        self.handle_level_change(level);
        self.text_block_style.overlay(style);
    }

    fn collect_char_ix(&mut self, _id: u32, level: u32, style: &OptionalCharStyle) {
        self.handle_level_change(level);
        let mut format = self.default_char_style.clone();
        format.overlay(style);
        self.char_formats.push(format);
    }

    fn collect_para_ix(&mut self, _id: u32, level: u32, style: &OptionalParaStyle) {
        self.handle_level_change(level);
        let mut format = self.default_para_style;
        format.overlay(style);
        self.para_formats.push(format);
    }

    fn collect_text(&mut self, level: u32, text: &[u8], format: TextFormat) {
        self.handle_level_change(level);
        self.text_stream = text.to_vec();
        self.text_format = format;
    }

    fn collect_font(&mut self, font_id: u16, name: &[u8], format: TextFormat) {
        let font = Font {
            name: decode_string(name, format),
            format,
        };
        self.fonts.insert(font_id, font);
    }

    fn collect_name(&mut self, id: u32, level: u32, name: &Name) {
        self.handle_level_change(level);
        let decoded = self.convert_data_to_string(name);
        self.names.insert(id, decoded);
    }

    fn collect_name_list(&mut self, _id: u32, level: u32) {
        self.handle_level_change(level);
        self.names.clear();
    }

    fn collect_field_list(&mut self, _id: u32, level: u32) {
        self.handle_level_change(level);
        self.fields.clear();
    }

    fn collect_text_field(&mut self, _id: u32, level: u32, name_id: i32, format_id: i32) {
        self.handle_level_change(level);
        if self.stencil_fields.element(self.fields.len()).is_some() {
            if name_id == -2 {
                let resolved = self
                    .stencil_fields
                    .element(self.fields.len())
                    .map(|e| e.format(&self.stencil_names))
                    .unwrap_or_default();
                self.fields.push(resolved);
            } else if name_id >= 0 {
                self.fields
                    .push(self.names.get(&(name_id as u32)).cloned().unwrap_or_default());
            } else {
                self.fields.push(String::new());
            }
        } else {
            let field = FieldElement::Text { name_id, format_id };
            self.fields.push(field.format(&self.names));
        }
    }

    fn collect_numeric_field(&mut self, _id: u32, level: u32, format: u16, value: f64, format_id: i32) {
        self.handle_level_change(level);
        match self.stencil_fields.element(self.fields.len()).cloned() {
            Some(mut element) => {
                let mut format = format;
                if format == FORMAT_UNKNOWN && format_id >= 0 {
                    if let Some(format_string) = self.names.get(&(format_id as u32)) {
                        if let Some(parsed) = parse_format_id(format_string) {
                            format = parsed;
                        }
                    }
                }
                if let FieldElement::Numeric {
                    format: element_format,
                    value: element_value,
                    ..
                } = &mut element
                {
                    *element_value = value;
                    if format != FORMAT_UNKNOWN {
                        *element_format = format;
                    }
                }
                self.fields.push(element.format(&self.names));
            }
            None => {
                let field = FieldElement::Numeric {
                    format,
                    value,
                    format_id,
                };
                self.fields.push(field.format(&self.names));
            }
        }
    }

    fn collect_style_sheet(&mut self, _id: u32, level: u32, _lp: u32, _fp: u32, _tp: u32) {
        self.handle_level_change(level);
    }

    fn collect_line_style(&mut self, level: u32, _style: &OptionalLineStyle) {
        self.handle_level_change(level);
    }

    fn collect_fill_style(&mut self, level: u32, _style: &OptionalFillStyle) {
        self.handle_level_change(level);
    }

    fn collect_text_block_style(&mut self, level: u32, _style: &OptionalTextBlockStyle) {
        self.handle_level_change(level);
    }

    fn collect_char_ix_style(&mut self, level: u32, _style: &OptionalCharStyle) {
        self.handle_level_change(level);
    }

    fn collect_para_ix_style(&mut self, level: u32, _style: &OptionalParaStyle) {
        self.handle_level_change(level);
    }

    fn collect_page_sheet(&mut self, _id: u32, level: u32) {
        self.handle_level_change(level);
        self.current_shape_level = level;
    }

    fn collect_page_props(
        &mut self,
        _id: u32,
        level: u32,
        width: f64,
        height: f64,
        shadow_offset_x: f64,
        shadow_offset_y: f64,
        scale: f64,
    ) {
        self.handle_level_change(level);
        self.page_width = width;
        self.page_height = height;
        self.scale = scale;
        self.shadow_offset_x = shadow_offset_x;
        self.shadow_offset_y = shadow_offset_y;
        self.current_page.width = self.scale * self.page_width;
        self.current_page.height = self.scale * self.page_height;
    }

    fn collect_page(&mut self, _id: u32, level: u32, background_id: u32, is_background: bool, name: &str) {
        self.handle_level_change(level);
        self.current_page.background_id = background_id;
        self.current_page.name = name.to_string();
        self.is_background_page = is_background;
    }

    fn collect_unhandled_chunk(&mut self, _id: u32, level: u32) {
        self.handle_level_change(level);
    }

    fn start_page(&mut self, id: u32) {
        if self.is_shape_started {
            self.flush_current_path();
            self.flush_current_foreign_data();
            if !self.text_stream.is_empty() {
                self.flush_text();
            }
            self.is_shape_started = false;
        }
        self.original_x = 0.0;
        self.original_y = 0.0;
        self.x = 0.0;
        self.y = 0.0;
        self.txtxform = None;
        self.xform = XForm::default();
        self.current_page_number += 1;
        self.current_page = Page::new();
        self.current_page.id = id;
        self.is_page_started = true;
    }

    fn end_page(&mut self) {
        if self.is_page_started {
            self.handle_level_change(0);
            self.flush_current_page();
            let page = core::mem::replace(&mut self.current_page, Page::new());
            if self.is_background_page {
                self.pages.add_background_page(page);
            } else {
                self.pages.add_page(page);
            }
            self.is_page_started = false;
            self.is_background_page = false;
        }
    }

    fn end_pages(&mut self) {
        self.pages.draw(self.painter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_xform_order_is_pinloc_flip_rotate_pin() {
        let xform = XForm {
            pin_x: 10.0,
            pin_y: 5.0,
            pin_loc_x: 1.0,
            pin_loc_y: 1.0,
            angle: core::f64::consts::FRAC_PI_2,
            flip_x: true,
            ..XForm::default()
        };
        let (mut x, mut y) = (3.0, 1.0);
        ContentCollector::apply_xform(&mut x, &mut y, &xform);
        // (3,1) → −pinLoc → (2,0) → flip x → (−2,0) → rotate 90° → (0,−2)
        // → +pin → (10,3).
        assert!((x - 10.0).abs() < 1e-12, "{x}");
        assert!((y - 3.0).abs() < 1e-12, "{y}");
    }

    #[test]
    fn chain_application_matches_stepwise_composition() {
        let inner = XForm {
            pin_x: 2.0,
            pin_y: 3.0,
            pin_loc_x: 0.5,
            pin_loc_y: 0.25,
            angle: 0.7,
            flip_y: true,
            ..XForm::default()
        };
        let outer = XForm {
            pin_x: -1.0,
            pin_y: 4.0,
            pin_loc_x: 1.0,
            pin_loc_y: 2.0,
            angle: -1.3,
            flip_x: true,
            ..XForm::default()
        };
        let (mut x1, mut y1) = (0.8, -0.2);
        ContentCollector::apply_xform(&mut x1, &mut y1, &inner);
        ContentCollector::apply_xform(&mut x1, &mut y1, &outer);

        let (mut x2, mut y2) = (0.8, -0.2);
        for xform in [&inner, &outer] {
            ContentCollector::apply_xform(&mut x2, &mut y2, xform);
        }
        assert_eq!((x1, y1), (x2, y2));
    }
}
