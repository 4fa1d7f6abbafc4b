// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry expansion and path flushing for the content collector.

use stencio_draw::{PropertyList, Value};

use super::ContentCollector;
use crate::style::{FillStyle, LineStyle};
use crate::types::MINUS_ONE;

const EPSILON: f64 = 1e-10;
const PI: f64 = core::f64::consts::PI;

/// Sample count for NURBS expansion.
const POLYLINES_PER_NURBS: usize = 200;

impl ContentCollector<'_> {
    fn push_path_element(&mut self, element: PropertyList) {
        if !self.no_fill && !self.no_show {
            self.current_fill_geometry.push(element.clone());
        }
        if !self.no_line && !self.no_show {
            self.current_line_geometry.push(element);
        }
    }

    pub(super) fn content_move_to(&mut self, _id: u32, level: u32, x: f64, y: f64) {
        self.handle_level_change(level);
        self.original_x = x;
        self.original_y = y;
        let (mut x, mut y) = (x, y);
        self.transform_point(&mut x, &mut y, None);
        self.x = x;
        self.y = y;
        let mut end = PropertyList::new();
        end.insert("svg:x", self.scale * self.x);
        end.insert("svg:y", self.scale * self.y);
        end.insert("libwpg:path-action", "M");
        self.push_path_element(end);
    }

    pub(super) fn content_line_to(&mut self, _id: u32, level: u32, x: f64, y: f64) {
        self.handle_level_change(level);
        self.original_x = x;
        self.original_y = y;
        let (mut x, mut y) = (x, y);
        self.transform_point(&mut x, &mut y, None);
        self.x = x;
        self.y = y;
        let mut end = PropertyList::new();
        end.insert("svg:x", self.scale * self.x);
        end.insert("svg:y", self.scale * self.y);
        end.insert("libwpg:path-action", "L");
        self.push_path_element(end);
    }

    /// Circular arc through a perpendicular sagitta. `bow == 0` degenerates
    /// to a straight segment.
    pub(super) fn content_arc_to(&mut self, _id: u32, level: u32, x2: f64, y2: f64, bow: f64) {
        self.handle_level_change(level);
        self.original_x = x2;
        self.original_y = y2;
        let (mut x2, mut y2) = (x2, y2);
        self.transform_point(&mut x2, &mut y2, None);
        let mut angle = 0.0;
        self.transform_angle(&mut angle, None);

        if bow == 0.0 {
            self.x = x2;
            self.y = y2;
            let mut end = PropertyList::new();
            end.insert("svg:x", self.scale * self.x);
            end.insert("svg:y", self.scale * self.y);
            end.insert("libwpg:path-action", "L");
            self.push_path_element(end);
        } else {
            let chord = ((y2 - self.y) * (y2 - self.y) + (x2 - self.x) * (x2 - self.x)).sqrt();
            let radius = (4.0 * bow * bow + chord * chord) / (8.0 * bow.abs());
            let large_arc = i32::from(bow.abs() > radius);
            // Every flip along the ancestor chain (either axis) inverts the
            // sweep direction once.
            let mut flip_x = false;
            let mut flip_y = false;
            self.transform_flips(&mut flip_x, &mut flip_y);
            let sweep = (bow < 0.0) ^ flip_x ^ flip_y;

            self.x = x2;
            self.y = y2;
            let mut arc = PropertyList::new();
            arc.insert("svg:rx", self.scale * radius);
            arc.insert("svg:ry", self.scale * radius);
            arc.insert("libwpg:rotate", Value::generic(angle * 180.0 / PI));
            arc.insert("libwpg:large-arc", large_arc);
            arc.insert("libwpg:sweep", i32::from(sweep));
            arc.insert("svg:x", self.scale * self.x);
            arc.insert("svg:y", self.scale * self.y);
            arc.insert("libwpg:path-action", "A");
            self.push_path_element(arc);
        }
    }

    /// Arc on a rotated ellipse through a mid point; colinear inputs
    /// degenerate to a straight segment.
    pub(super) fn content_elliptical_arc_to(
        &mut self,
        _id: u32,
        level: u32,
        x3: f64,
        y3: f64,
        x2: f64,
        y2: f64,
        angle: f64,
        ecc: f64,
    ) {
        self.handle_level_change(level);
        self.original_x = x3;
        self.original_y = y3;
        let (mut x2, mut y2) = (x2, y2);
        let (mut x3, mut y3) = (x3, y3);
        let mut angle = angle;
        self.transform_point(&mut x2, &mut y2, None);
        self.transform_point(&mut x3, &mut y3, None);
        self.transform_angle(&mut angle, None);

        // Work in the frame rotated by `angle` and squashed by `ecc`.
        let x1 = self.x * angle.cos() + self.y * angle.sin();
        let y1 = ecc * (self.y * angle.cos() - self.x * angle.sin());
        let x2n = x2 * angle.cos() + y2 * angle.sin();
        let y2n = ecc * (y2 * angle.cos() - x2 * angle.sin());
        let x3n = x3 * angle.cos() + y3 * angle.sin();
        let y3n = ecc * (y3 * angle.cos() - x3 * angle.sin());

        self.x = x3;
        self.y = y3;

        if ((x1 - x2n) * (y2n - y3n) - (x2n - x3n) * (y1 - y2n)).abs() <= EPSILON
            || ((x2n - x3n) * (y1 - y2n) - (x1 - x2n) * (y2n - y3n)).abs() <= EPSILON
        {
            let mut end = PropertyList::new();
            end.insert("svg:x", self.scale * self.x);
            end.insert("svg:y", self.scale * self.y);
            end.insert("libwpg:path-action", "L");
            self.push_path_element(end);
            return;
        }

        // Centre as intersection of the two perpendicular bisectors.
        let x0 = ((x1 - x2n) * (x1 + x2n) * (y2n - y3n) - (x2n - x3n) * (x2n + x3n) * (y1 - y2n)
            + (y1 - y2n) * (y2n - y3n) * (y1 - y3n))
            / (2.0 * ((x1 - x2n) * (y2n - y3n) - (x2n - x3n) * (y1 - y2n)));
        let y0 = ((x1 - x2n) * (x2n - x3n) * (x1 - x3n) + (x2n - x3n) * (y1 - y2n) * (y1 + y2n)
            - (x1 - x2n) * (y2n - y3n) * (y2n + y3n))
            / (2.0 * ((x2n - x3n) * (y1 - y2n) - (x1 - x2n) * (y2n - y3n)));

        let rx = ((x1 - x0) * (x1 - x0) + (y1 - y0) * (y1 - y0)).sqrt();
        let ry = rx / ecc;

        // Large arc when centre and mid point fall on the same side of the
        // chord; sweep direction from the mid point's side.
        let centre_side = (x3n - x1) * (y0 - y1) - (y3n - y1) * (x0 - x1);
        let mid_side = (x3n - x1) * (y2n - y1) - (y3n - y1) * (x2n - x1);
        let large_arc = i32::from((centre_side > 0.0 && mid_side > 0.0) || (centre_side < 0.0 && mid_side < 0.0));
        let sweep = i32::from(mid_side <= 0.0);

        let mut arc = PropertyList::new();
        arc.insert("svg:rx", self.scale * rx);
        arc.insert("svg:ry", self.scale * ry);
        arc.insert("libwpg:rotate", Value::generic(angle * 180.0 / PI));
        arc.insert("libwpg:large-arc", large_arc);
        arc.insert("libwpg:sweep", sweep);
        arc.insert("svg:x", self.scale * self.x);
        arc.insert("svg:y", self.scale * self.y);
        arc.insert("libwpg:path-action", "A");
        self.push_path_element(arc);
    }

    /// Full ellipse as a move plus two half-arcs plus close.
    pub(super) fn content_ellipse(
        &mut self,
        _id: u32,
        level: u32,
        cx: f64,
        cy: f64,
        xleft: f64,
        yleft: f64,
        xtop: f64,
        ytop: f64,
    ) {
        self.handle_level_change(level);
        let mut angle = (2.0 * PI
            + (if cy > yleft { 1.0 } else { -1.0 })
                * ((cx - xleft) / ((xleft - cx) * (xleft - cx) + (yleft - cy) * (yleft - cy)).sqrt())
                    .acos())
            % (2.0 * PI);
        let (mut cx, mut cy) = (cx, cy);
        let (mut xleft, mut yleft) = (xleft, yleft);
        let (mut xtop, mut ytop) = (xtop, ytop);
        self.transform_point(&mut cx, &mut cy, None);
        self.transform_point(&mut xleft, &mut yleft, None);
        self.transform_point(&mut xtop, &mut ytop, None);
        self.transform_angle(&mut angle, None);

        let rx = ((xleft - cx) * (xleft - cx) + (yleft - cy) * (yleft - cy)).sqrt();
        let ry = ((xtop - cx) * (xtop - cx) + (ytop - cy) * (ytop - cy)).sqrt();

        let centre_side = (xleft - xtop) * (cy - ytop) - (yleft - ytop) * (cx - xtop);
        let large_arc = centre_side > 0.0;

        let mut ellipse = PropertyList::new();
        ellipse.insert("svg:x", self.scale * xleft);
        ellipse.insert("svg:y", self.scale * yleft);
        ellipse.insert("libwpg:path-action", "M");
        self.push_path_element(ellipse.clone());
        ellipse.insert("svg:rx", self.scale * rx);
        ellipse.insert("svg:ry", self.scale * ry);
        ellipse.insert("svg:x", self.scale * xtop);
        ellipse.insert("svg:y", self.scale * ytop);
        ellipse.insert("libwpg:large-arc", i32::from(large_arc));
        ellipse.insert("libwpg:path-action", "A");
        ellipse.insert("libwpg:rotate", Value::generic(angle * 180.0 / PI));
        self.push_path_element(ellipse.clone());
        ellipse.insert("svg:x", self.scale * xleft);
        ellipse.insert("svg:y", self.scale * yleft);
        ellipse.insert("libwpg:large-arc", i32::from(!large_arc));
        self.push_path_element(ellipse);
        let mut close = PropertyList::new();
        close.insert("libwpg:path-action", "Z");
        self.push_path_element(close);
    }

    /// Clips the infinite line through two points to the page rectangle.
    pub(super) fn content_infinite_line(&mut self, _id: u32, level: u32, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.handle_level_change(level);
        let (mut x1, mut y1) = (x1, y1);
        let (mut x2, mut y2) = (x2, y2);
        self.transform_point(&mut x1, &mut y1, None);
        self.transform_point(&mut x2, &mut y2, None);

        let mut xmove = 0.0;
        let mut ymove = 0.0;
        let mut xline = 0.0;
        let mut yline = 0.0;

        if x1 == x2 {
            xmove = x1;
            ymove = 0.0;
            xline = x1;
            yline = self.page_height;
        } else if y1 == y2 {
            xmove = 0.0;
            ymove = y1;
            xline = self.page_width;
            yline = y1;
        } else {
            // y = p·x + q
            let p = (y1 - y2) / (x1 - x2);
            let q = (x1 * y2 - x2 * y1) / (x1 - x2);
            let mut points: Vec<(f64, f64)> = Vec::new();
            let mut insert = |x: f64, y: f64| {
                match points.iter_mut().find(|(px, _)| *px == x) {
                    Some(slot) => slot.1 = y,
                    None => points.push((x, y)),
                }
            };

            // Intersections with the four page borders, keeping only those
            // inside the page rectangle.
            let y_at_left = q;
            if (0.0..=self.page_height).contains(&y_at_left) {
                insert(0.0, y_at_left);
            }
            let y_at_right = p * self.page_width + q;
            if (0.0..=self.page_height).contains(&y_at_right) {
                insert(self.page_width, y_at_right);
            }
            let x_at_top = -q / p;
            if (0.0..=self.page_width).contains(&x_at_top) {
                insert(x_at_top, 0.0);
            }
            let x_at_bottom = self.page_height / p - q / p;
            if (0.0..=self.page_width).contains(&x_at_bottom) {
                insert(x_at_bottom, self.page_height);
            }

            points.sort_by(|a, b| a.0.total_cmp(&b.0));
            if let Some(&(x0, y0)) = points.first() {
                xmove = x0;
                ymove = y0;
                for &(x, y) in &points {
                    if x != xmove || y != ymove {
                        xline = x;
                        yline = y;
                    }
                }
            }
        }

        let mut line = PropertyList::new();
        line.insert("svg:x", self.scale * xmove);
        line.insert("svg:y", self.scale * ymove);
        line.insert("libwpg:path-action", "M");
        self.push_path_element(line.clone());
        line.insert("svg:x", self.scale * xline);
        line.insert("svg:y", self.scale * yline);
        line.insert("libwpg:path-action", "L");
        self.push_path_element(line);
    }

    pub(super) fn content_rel_cub_bez_to(
        &mut self,
        _id: u32,
        level: u32,
        x: f64,
        y: f64,
        a: f64,
        b: f64,
        c: f64,
        d: f64,
    ) {
        self.handle_level_change(level);
        let (mut x, mut y) = (x * self.xform.width, y * self.xform.height);
        let (mut a, mut b) = (a * self.xform.width, b * self.xform.height);
        let (mut c, mut d) = (c * self.xform.width, d * self.xform.height);
        self.transform_point(&mut x, &mut y, None);
        self.transform_point(&mut a, &mut b, None);
        self.transform_point(&mut c, &mut d, None);
        let mut node = PropertyList::new();
        node.insert("svg:x", self.scale * x);
        node.insert("svg:y", self.scale * y);
        node.insert("svg:x1", self.scale * a);
        node.insert("svg:y1", self.scale * b);
        node.insert("svg:x2", self.scale * c);
        node.insert("svg:y2", self.scale * d);
        node.insert("libwpg:path-action", "C");
        self.push_path_element(node);
        self.x = x;
        self.y = y;
    }

    pub(super) fn content_rel_quad_bez_to(&mut self, _id: u32, level: u32, x: f64, y: f64, a: f64, b: f64) {
        self.handle_level_change(level);
        let (mut x, mut y) = (x * self.xform.width, y * self.xform.height);
        let (mut a, mut b) = (a * self.xform.width, b * self.xform.height);
        self.transform_point(&mut x, &mut y, None);
        self.transform_point(&mut a, &mut b, None);
        let mut node = PropertyList::new();
        node.insert("svg:x", self.scale * x);
        node.insert("svg:y", self.scale * y);
        node.insert("svg:x1", self.scale * a);
        node.insert("svg:y1", self.scale * b);
        node.insert("libwpg:path-action", "Q");
        self.push_path_element(node);
        self.x = x;
        self.y = y;
    }

    /// Samples the curve as straight segments with the Cox-de Boor
    /// recurrence, then lands exactly on the end point.
    pub(super) fn content_nurbs_to(
        &mut self,
        _id: u32,
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
        self.handle_level_change(level);

        if knots.is_empty() || control_points.is_empty() || weights.is_empty() {
            return;
        }

        let mut knots = knots.to_vec();
        while knots.len() < control_points.len() + usize::from(degree) + 2 {
            let back = *knots.last().unwrap_or(&0.0);
            knots.push(back);
        }

        let mut points: Vec<(f64, f64)> = control_points
            .iter()
            .map(|&(px, py)| {
                (
                    if x_type == 0 { px * self.xform.width } else { px },
                    if y_type == 0 { py * self.xform.height } else { py },
                )
            })
            .collect();
        points.push((x2, y2));
        points.insert(0, (self.original_x, self.original_y));

        let first_knot = knots[0];
        let last_knot = *knots.last().unwrap_or(&0.0);
        let step = (last_knot - first_knot) / POLYLINES_PER_NURBS as f64;

        for i in 0..POLYLINES_PER_NURBS {
            let t = first_knot + i as f64 * step;
            let mut next_x = 0.0;
            let mut next_y = 0.0;
            let mut denominator = EPSILON;
            for (p, &(px, py)) in points.iter().enumerate().take(weights.len().min(points.len())) {
                let basis = nurbs_basis(p, usize::from(degree), t, &knots);
                next_x += basis * px * weights[p];
                next_y += basis * py * weights[p];
                denominator += weights[p] * basis;
            }
            let mut next_x = next_x / denominator;
            let mut next_y = next_y / denominator;
            self.transform_point(&mut next_x, &mut next_y, None);
            let mut node = PropertyList::new();
            node.insert("libwpg:path-action", "L");
            node.insert("svg:x", self.scale * next_x);
            node.insert("svg:y", self.scale * next_y);
            self.push_path_element(node);
        }

        self.original_x = x2;
        self.original_y = y2;
        let (mut x, mut y) = (x2, y2);
        self.transform_point(&mut x, &mut y, None);
        self.x = x;
        self.y = y;
        let mut node = PropertyList::new();
        node.insert("libwpg:path-action", "L");
        node.insert("svg:x", self.scale * self.x);
        node.insert("svg:y", self.scale * self.y);
        self.push_path_element(node);
    }

    /// NURBS row referencing shape data; `0xFFFFFFFE` selects the master's
    /// data via the matching geometry section.
    pub(super) fn content_nurbs_to_data(
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
        let data = if data_id == 0xFFFFFFFE {
            self.stencil_geometry_data_id(id).and_then(|master_id| {
                self.stencil_shape
                    .as_ref()
                    .and_then(|s| s.nurbs_data.get(&master_id).cloned())
            })
        } else {
            self.nurbs_data.get(&data_id).cloned()
        };
        match data {
            Some(mut data) => {
                data.knots.push(knot);
                data.knots.push(data.last_knot);
                data.knots.insert(0, knot_prev);
                data.weights.push(weight);
                data.weights.insert(0, weight_prev);
                self.content_nurbs_to(
                    id,
                    level,
                    x2,
                    y2,
                    data.x_type,
                    data.y_type,
                    data.degree,
                    &data.points,
                    &data.knots,
                    &data.weights,
                );
            }
            None => self.handle_level_change(level),
        }
    }

    pub(super) fn content_polyline_to(
        &mut self,
        _id: u32,
        level: u32,
        x: f64,
        y: f64,
        x_type: u8,
        y_type: u8,
        points: &[(f64, f64)],
    ) {
        self.handle_level_change(level);

        for &(px, py) in points {
            let mut px = if x_type == 0 { px * self.xform.width } else { px };
            let mut py = if y_type == 0 { py * self.xform.height } else { py };
            self.transform_point(&mut px, &mut py, None);
            let mut node = PropertyList::new();
            node.insert("libwpg:path-action", "L");
            node.insert("svg:x", self.scale * px);
            node.insert("svg:y", self.scale * py);
            self.push_path_element(node);
        }

        self.original_x = x;
        self.original_y = y;
        let (mut x, mut y) = (x, y);
        self.transform_point(&mut x, &mut y, None);
        self.x = x;
        self.y = y;
        let mut node = PropertyList::new();
        node.insert("libwpg:path-action", "L");
        node.insert("svg:x", self.scale * self.x);
        node.insert("svg:y", self.scale * self.y);
        self.push_path_element(node);
    }

    pub(super) fn content_polyline_to_data(&mut self, id: u32, level: u32, x: f64, y: f64, data_id: u32) {
        let data = if data_id == 0xFFFFFFFE {
            self.stencil_geometry_data_id(id).and_then(|master_id| {
                self.stencil_shape
                    .as_ref()
                    .and_then(|s| s.polyline_data.get(&master_id).cloned())
            })
        } else {
            self.polyline_data.get(&data_id).cloned()
        };
        match data {
            Some(data) => {
                self.content_polyline_to(id, level, x, y, data.x_type, data.y_type, &data.points);
            }
            None => self.handle_level_change(level),
        }
    }

    /// The data id of the master's matching row in the current geometry
    /// section.
    fn stencil_geometry_data_id(&self, element_id: u32) -> Option<u32> {
        let stencil = self.stencil_shape.as_ref()?;
        let section = self.current_geometry_count.checked_sub(1)?;
        let list = stencil.geometries.get(&section)?;
        let data_id = list.element(element_id)?.data_id()?;
        (data_id != MINUS_ONE).then_some(data_id)
    }

    /// Flushes the accumulated fill and stroke sub-paths of the current
    /// shape. The fill path is auto-closed; the stroke path only when it
    /// returns to its start point. Fill and stroke go out as separate draw
    /// calls, wrapped in a layer when both are present.
    pub(super) fn flush_current_path(&mut self) {
        self.style_props.clear();
        let line_style = self.line_style;
        let fill_style = self.fill_style;
        self.line_properties(&line_style);
        self.fill_and_shadow_properties(&fill_style);
        let mut fill_path_props = self.style_props.clone();
        fill_path_props.insert("draw:stroke", "none");
        let mut line_path_props = self.style_props.clone();
        line_path_props.insert("draw:fill", "none");

        let has_fill = self
            .style_props
            .get_str("draw:fill")
            .is_some_and(|f| f != "none");
        let has_stroke = self
            .style_props
            .get_str("draw:stroke")
            .is_some_and(|s| s != "none");
        let needs_group = has_fill
            && has_stroke
            && !self.current_fill_geometry.is_empty()
            && !self.current_line_geometry.is_empty();

        if needs_group {
            self.shape_output_drawing().add_start_layer(PropertyList::new());
        }

        if has_fill {
            let mut path: Vec<PropertyList> = Vec::new();
            let mut was_move = false;
            let mut first_point = true;
            for element in core::mem::take(&mut self.current_fill_geometry) {
                if first_point {
                    first_point = false;
                    was_move = true;
                } else if element.get_str("libwpg:path-action") == Some("M") {
                    if !path.is_empty() {
                        if was_move {
                            // A sub-path of a single move renders nothing.
                            path.pop();
                        } else {
                            close_if_open(&mut path);
                        }
                    }
                    was_move = true;
                } else {
                    was_move = false;
                }
                path.push(element);
            }
            if !path.is_empty() {
                if was_move {
                    path.pop();
                } else {
                    close_if_open(&mut path);
                }
            }
            if !path.is_empty() {
                let output = self.shape_output_drawing();
                output.add_style(fill_path_props, Vec::new());
                output.add_path(path);
            }
        }
        self.current_fill_geometry.clear();

        if has_stroke {
            let mut path: Vec<PropertyList> = Vec::new();
            let mut was_move = false;
            let mut first_point = true;
            let mut start = (0.0, 0.0);
            let mut prev = (0.0, 0.0);
            for element in core::mem::take(&mut self.current_line_geometry) {
                if first_point {
                    first_point = false;
                    was_move = true;
                    start = element_point(&element);
                } else if element.get_str("libwpg:path-action") == Some("M") {
                    if !path.is_empty() {
                        if was_move {
                            path.pop();
                        } else if start == prev {
                            close_if_open(&mut path);
                        }
                    }
                    start = element_point(&element);
                    was_move = true;
                } else {
                    was_move = false;
                }
                if element.contains("svg:x") {
                    prev = element_point(&element);
                }
                path.push(element);
            }
            if !path.is_empty() {
                if was_move {
                    path.pop();
                } else if start == prev {
                    close_if_open(&mut path);
                }
            }
            if !path.is_empty() {
                let output = self.shape_output_drawing();
                output.add_style(line_path_props, Vec::new());
                output.add_path(path);
            }
        }
        self.current_line_geometry.clear();

        if needs_group {
            self.shape_output_drawing().add_end_layer();
        }
    }

    fn line_properties(&mut self, style: &LineStyle) {
        self.line_pattern = style.pattern;

        if style.pattern == 0 {
            self.style_props.insert("draw:stroke", "none");
            return;
        }

        self.style_props
            .insert("svg:stroke-width", self.scale * style.width);
        self.style_props
            .insert("svg:stroke-color", style.colour.to_hex());
        let opacity = if style.colour.a != 0 {
            1.0 - f64::from(style.colour.a) / 255.0
        } else {
            1.0
        };
        self.style_props
            .insert("svg:stroke-opacity", Value::percent(opacity));
        match style.cap {
            0 => {
                self.style_props.insert("svg:stroke-linecap", "round");
                self.style_props.insert("svg:stroke-linejoin", "round");
            }
            2 => {
                self.style_props.insert("svg:stroke-linecap", "square");
                self.style_props.insert("svg:stroke-linejoin", "miter");
            }
            _ => {
                self.style_props.insert("svg:stroke-linecap", "butt");
                self.style_props.insert("svg:stroke-linejoin", "miter");
            }
        }

        self.apply_line_pattern();

        if style.start_marker > 0 {
            self.style_props
                .insert("draw:marker-start-viewbox", marker_viewbox(style.start_marker));
            self.style_props
                .insert("draw:marker-start-path", marker_path(style.start_marker));
            self.style_props.insert(
                "draw:marker-start-width",
                self.scale
                    * marker_scale(style.start_marker)
                    * (0.1 / (style.width * style.width + 1.0) + 2.54 * style.width),
            );
        }
        if style.end_marker > 0 {
            self.style_props
                .insert("draw:marker-end-viewbox", marker_viewbox(style.end_marker));
            self.style_props
                .insert("draw:marker-end-path", marker_path(style.end_marker));
            self.style_props.insert(
                "draw:marker-end-width",
                self.scale
                    * marker_scale(style.end_marker)
                    * (0.1 / (style.width * style.width + 1.0) + 2.54 * style.width),
            );
        }
    }

    /// Dash arrays for line patterns 2-23; everything above (including the
    /// stencil-referenced custom pattern 0xfe) degrades to a solid stroke.
    fn apply_line_pattern(&mut self) {
        self.style_props.remove("draw:stroke");

        let (dots1, dots1len, dots2, dots2len, gap): (i32, f64, i32, f64, f64) =
            match self.line_pattern {
                2 => (1, 6.0, 1, 6.0, 3.0),
                3 => (1, 1.0, 1, 1.0, 3.0),
                4 => (1, 6.0, 1, 1.0, 3.0),
                5 => (1, 6.0, 2, 1.0, 3.0),
                6 => (2, 6.0, 1, 1.0, 3.0),
                7 => (1, 14.0, 1, 6.0, 2.0),
                8 => (1, 14.0, 2, 6.0, 2.0),
                9 => (1, 3.0, 1, 3.0, 2.0),
                10 => (1, 1.0, 1, 1.0, 2.0),
                11 => (1, 3.0, 1, 1.0, 2.0),
                12 => (1, 3.0, 2, 1.0, 2.0),
                13 => (2, 3.0, 1, 1.0, 2.0),
                14 => (1, 7.0, 1, 3.0, 2.0),
                15 => (1, 7.0, 2, 3.0, 2.0),
                16 => (1, 11.0, 1, 11.0, 5.0),
                17 => (1, 1.0, 1, 1.0, 5.0),
                18 => (1, 11.0, 1, 1.0, 5.0),
                19 => (1, 11.0, 2, 1.0, 5.0),
                20 => (2, 11.0, 1, 1.0, 5.0),
                21 => (1, 27.0, 1, 11.0, 5.0),
                22 => (1, 27.0, 2, 11.0, 5.0),
                23 => (1, 2.0, 1, 2.0, 2.0),
                _ => (0, 0.0, 0, 0.0, 0.0),
            };

        match self.line_pattern {
            0 => self.style_props.insert("draw:stroke", "none"),
            1 => self.style_props.insert("draw:stroke", "solid"),
            2..=23 => {
                self.style_props.insert("draw:stroke", "dash");
                self.style_props.insert("draw:dots1", dots1);
                self.style_props
                    .insert("draw:dots1-length", Value::percent(dots1len));
                self.style_props.insert("draw:dots2", dots2);
                self.style_props
                    .insert("draw:dots2-length", Value::percent(dots2len));
                self.style_props.insert("draw:distance", Value::percent(gap));
            }
            _ => self.style_props.insert("draw:stroke", "solid"),
        }
    }

    /// Fill patterns: none, solid, the gradient families, and the documented
    /// degradation of everything else to a background-colour solid.
    fn fill_and_shadow_properties(&mut self, style: &FillStyle) {
        self.fill_pattern = style.pattern;
        self.fill_fg_transparency = style.fg_transparency;
        self.fill_bg_transparency = style.bg_transparency;

        if style.pattern != 0 {
            self.style_props.insert("svg:fill-rule", "evenodd");
        }

        let fill_type = match style.pattern {
            0 => "none",
            1 => {
                self.style_props
                    .insert("draw:fill-color", style.fg_colour.to_hex());
                if self.fill_fg_transparency > 0.0 {
                    self.style_props.insert(
                        "draw:opacity",
                        Value::percent(1.0 - self.fill_fg_transparency),
                    );
                } else {
                    self.style_props.remove("draw:opacity");
                }
                "solid"
            }
            26 | 29 => {
                self.gradient_props();
                self.style_props.insert("draw:style", "axial");
                self.style_props
                    .insert("draw:start-color", style.fg_colour.to_hex());
                self.style_props
                    .insert("draw:end-color", style.bg_colour.to_hex());
                self.style_props
                    .insert("draw:angle", if style.pattern == 26 { 90 } else { 0 });
                "gradient"
            }
            25 | 27 | 28 | 30..=34 => {
                self.gradient_props();
                self.style_props.insert("draw:style", "linear");
                self.style_props
                    .insert("draw:start-color", style.bg_colour.to_hex());
                self.style_props
                    .insert("draw:end-color", style.fg_colour.to_hex());
                let angle = match style.pattern {
                    25 => 270,
                    27 => 90,
                    28 => 180,
                    30 => 0,
                    31 => 225,
                    32 => 135,
                    33 => 315,
                    _ => 45,
                };
                self.style_props.insert("draw:angle", angle);
                "gradient"
            }
            35 => {
                self.gradient_props();
                self.style_props.insert("draw:style", "rectangular");
                self.style_props.insert("svg:cx", Value::percent(0.5));
                self.style_props.insert("svg:cy", Value::percent(0.5));
                self.style_props
                    .insert("draw:start-color", style.bg_colour.to_hex());
                self.style_props
                    .insert("draw:end-color", style.fg_colour.to_hex());
                self.style_props.insert("draw:angle", 0);
                "gradient"
            }
            36..=40 => {
                self.gradient_props();
                self.style_props.insert("draw:style", "radial");
                self.style_props
                    .insert("draw:start-color", style.bg_colour.to_hex());
                self.style_props
                    .insert("draw:end-color", style.fg_colour.to_hex());
                let (cx, cy) = match style.pattern {
                    36 => (0.0, 0.0),
                    37 => (1.0, 0.0),
                    38 => (0.0, 1.0),
                    39 => (1.0, 1.0),
                    _ => (0.5, 0.5),
                };
                self.style_props.insert("svg:cx", Value::percent(cx));
                self.style_props.insert("svg:cy", Value::percent(cy));
                "gradient"
            }
            _ => {
                // Hatch and texture patterns approximate as a solid fill in
                // the background colour.
                self.style_props
                    .insert("draw:fill-color", style.bg_colour.to_hex());
                "solid"
            }
        };

        if style.shadow_pattern != 0 {
            self.style_props.insert("draw:shadow", "visible");
            self.style_props.insert(
                "draw:shadow-offset-x",
                if style.shadow_offset_x != 0.0 {
                    style.shadow_offset_x
                } else {
                    self.shadow_offset_x
                },
            );
            self.style_props.insert(
                "draw:shadow-offset-y",
                if style.shadow_offset_y != 0.0 {
                    style.shadow_offset_y
                } else {
                    self.shadow_offset_y
                },
            );
            self.style_props
                .insert("draw:shadow-color", style.shadow_fg_colour.to_hex());
            self.style_props.insert(
                "draw:shadow-opacity",
                Value::percent(1.0 - f64::from(style.shadow_fg_colour.a) / 255.0),
            );
        }
        self.style_props.insert("draw:fill", fill_type);
    }

    fn gradient_props(&mut self) {
        self.style_props.remove("draw:opacity");
        self.style_props.insert(
            "libwpg:start-opacity",
            Value::percent(if self.fill_bg_transparency > 0.0 {
                1.0 - self.fill_bg_transparency
            } else {
                1.0
            }),
        );
        self.style_props.insert(
            "libwpg:end-opacity",
            Value::percent(if self.fill_fg_transparency > 0.0 {
                1.0 - self.fill_fg_transparency
            } else {
                1.0
            }),
        );
        self.style_props.insert("draw:border", Value::percent(0.0));
    }
}

/// Appends a `Z` unless the sub-path already ends with one.
fn close_if_open(path: &mut Vec<PropertyList>) {
    if path
        .last()
        .is_some_and(|e| e.get_str("libwpg:path-action") != Some("Z"))
    {
        let mut close = PropertyList::new();
        close.insert("libwpg:path-action", "Z");
        path.push(close);
    }
}

fn element_point(element: &PropertyList) -> (f64, f64) {
    (
        element.get_f64("svg:x").unwrap_or(0.0),
        element.get_f64("svg:y").unwrap_or(0.0),
    )
}

/// Cox-de Boor basis function, evaluated recursively.
fn nurbs_basis(knot: usize, degree: usize, point: f64, knots: &[f64]) -> f64 {
    if knots.is_empty() {
        return 0.0;
    }
    if degree == 0 {
        return if knots.len() > knot + 1 && knots[knot] <= point && point < knots[knot + 1] {
            1.0
        } else {
            0.0
        };
    }
    let mut basis = 0.0;
    if knots.len() > knot + degree && knots[knot + degree] - knots[knot] > 0.0 {
        basis = (point - knots[knot]) / (knots[knot + degree] - knots[knot])
            * nurbs_basis(knot, degree - 1, point, knots);
    }
    if knots.len() > knot + degree + 1 && knots[knot + degree + 1] - knots[knot + 1] > 0.0 {
        basis += (knots[knot + degree + 1] - point) / (knots[knot + degree + 1] - knots[knot + 1])
            * nurbs_basis(knot + 1, degree - 1, point, knots);
    }
    basis
}

/// Marker viewboxes for start/end arrowheads 1-39.
fn marker_viewbox(marker: u8) -> &'static str {
    match marker {
        1 | 2 | 9 | 15 => "0 0 20 10",
        8 => "0 0 20 18",
        3..=6 | 11 | 16..=18 => "0 0 20 20",
        12..=14 => "0 0 20 30",
        22 | 39 => "0 0 20 40",
        21 => "0 0 30 30",
        10 => "0 0 1131 1131",
        _ => "0 0 20 30",
    }
}

fn marker_path(marker: u8) -> &'static str {
    match marker {
        1 => "m10 -4l-14 14l4 4l10 -10l10 10l4 -4z",
        2 => "m10 0-10 10h20z",
        3 => "m10 -8l-14 28l6 3l8 -16l8 16l6 -3z",
        4 => "m10 0-10 20h20z",
        5 => "m10 0-10 20q10,-5 20,0z",
        6 => "m10 0-10 20q10,5 20,0z",
        8 => "m10 0q-2.6,13.4 -10,18q10,-5 20,0q-7.4,-4.6 -10,-18",
        9 => "m-2 -8l4 -4l20 20l-4 4z",
        // Matches the circle marker a well-known office suite exports.
        10 => "m462 1118-102-29-102-51-93-72-72-93-51-102-29-102-13-105 13-102 29-106 51-102 72-89 93-72 102-50 102-34 106-9 101 9 106 34 98 50 93 72 72 89 51 102 29 106 13 102-13 105-29 102-51 102-72 93-93 72-98 51-106 29-101 13z",
        11 => "m0 0v10h10v-10z",
        12 => "m10 -12l-14 42l9 3l5 -15l5 15l9 -3z",
        13 => "m10 0-10 30h20z",
        14 => "m10 0-10 30h20z m0 12l-5 15h10z",
        15 => "m10 0-10 10h20z m0 3l-5 5h10z",
        16 => "m10 0-10 20h20z m0 7l-5 10h10z",
        17 => "m10 0-10 20q10,-5 20,0z m0 7l-4 8q4,-2 8,0z",
        18 => "m10 0-10 20q10,5 20,0z m0 7l-5 10q5,2 10,0z",
        21 => "m0 0v30h30v-30z m10 10v10h10v-10z",
        22 => "m10 0-10 20l10 20l10 -20z m0 8l-6 12l6 12l6 -12z",
        39 => "m10 0-10 20h20z m0 20-10 20h20z",
        _ => "m10 0-10 30h20z",
    }
}

fn marker_scale(marker: u8) -> f64 {
    match marker {
        10 | 11 => 0.7,
        14..=18 | 22 => 1.2,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nurbs_basis_is_deterministic() {
        let knots = [0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 2.0, 2.0, 2.0];
        let a: Vec<f64> = (0..5).map(|k| nurbs_basis(k, 3, 0.7, &knots)).collect();
        let b: Vec<f64> = (0..5).map(|k| nurbs_basis(k, 3, 0.7, &knots)).collect();
        assert_eq!(a, b);
        // Partition of unity inside the domain.
        let sum: f64 = a.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12, "basis sum {sum}");
    }

    #[test]
    fn marker_tables_cover_known_ids() {
        assert_eq!(marker_viewbox(2), "0 0 20 10");
        assert_eq!(marker_path(4), "m10 0-10 20h20z");
        assert_eq!(marker_scale(22), 1.2);
        // Unknown markers fall back to the plain triangle.
        assert_eq!(marker_viewbox(33), "0 0 20 30");
        assert_eq!(marker_scale(33), 1.0);
    }
}
