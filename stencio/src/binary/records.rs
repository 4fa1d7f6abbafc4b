// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chunk record readers for the 32-bit generations (6 and 11), plus the
//! version dispatch into the 16-bit layouts.

use crate::collector::Collector;
use crate::error::Result;
use crate::geometry::GeometryElement;
use crate::source::Stream;
use crate::style::{
    OptionalCharStyle, OptionalFillStyle, OptionalLineStyle, OptionalParaStyle,
    OptionalTextBlockStyle,
};
use crate::types::{Colour, Name, NurbsData, PolylineData, TextFormat, XForm, MINUS_ONE};

use super::header::{read_legacy_uint, Version};
use super::VsdParser;

impl VsdParser<'_> {
    fn read_colour(&mut self, input: &mut Stream<'_>) -> Result<Colour> {
        Ok(Colour {
            r: input.read_u8()?,
            g: input.read_u8()?,
            b: input.read_u8()?,
            a: input.read_u8()?,
        })
    }

    fn get_uint(&self, input: &mut Stream<'_>) -> Result<u32> {
        if self.version.is_legacy() {
            read_legacy_uint(input)
        } else {
            input.read_u32()
        }
    }

    // --- geometry rows -------------------------------------------------

    pub(super) fn read_geometry(&mut self, input: &mut Stream<'_>) -> Result<()> {
        let flags = input.read_u8()?;
        let element = GeometryElement::Geometry {
            no_fill: flags & 1 != 0,
            no_line: flags & 2 != 0,
            no_show: flags & 4 != 0,
        };
        let (id, level) = (self.header.id, self.header.level);
        self.current_geometry_list().add(id, level, element);
        Ok(())
    }

    pub(super) fn read_move_to(&mut self, input: &mut Stream<'_>) -> Result<()> {
        input.skip(1);
        let x = input.read_f64()?;
        input.skip(1);
        let y = input.read_f64()?;
        let (id, level) = (self.header.id, self.header.level);
        self.current_geometry_list()
            .add(id, level, GeometryElement::MoveTo { x, y });
        Ok(())
    }

    pub(super) fn read_line_to(&mut self, input: &mut Stream<'_>) -> Result<()> {
        input.skip(1);
        let x = input.read_f64()?;
        input.skip(1);
        let y = input.read_f64()?;
        let (id, level) = (self.header.id, self.header.level);
        self.current_geometry_list()
            .add(id, level, GeometryElement::LineTo { x, y });
        Ok(())
    }

    pub(super) fn read_arc_to(&mut self, input: &mut Stream<'_>) -> Result<()> {
        input.skip(1);
        let x2 = input.read_f64()?;
        input.skip(1);
        let y2 = input.read_f64()?;
        input.skip(1);
        let bow = input.read_f64()?;
        let (id, level) = (self.header.id, self.header.level);
        self.current_geometry_list()
            .add(id, level, GeometryElement::ArcTo { x2, y2, bow });
        Ok(())
    }

    pub(super) fn read_ellipse(&mut self, input: &mut Stream<'_>) -> Result<()> {
        input.skip(1);
        let cx = input.read_f64()?;
        input.skip(1);
        let cy = input.read_f64()?;
        input.skip(1);
        let xleft = input.read_f64()?;
        input.skip(1);
        let yleft = input.read_f64()?;
        input.skip(1);
        let xtop = input.read_f64()?;
        input.skip(1);
        let ytop = input.read_f64()?;
        let (id, level) = (self.header.id, self.header.level);
        self.current_geometry_list().add(
            id,
            level,
            GeometryElement::Ellipse {
                cx,
                cy,
                xleft,
                yleft,
                xtop,
                ytop,
            },
        );
        Ok(())
    }

    pub(super) fn read_elliptical_arc_to(&mut self, input: &mut Stream<'_>) -> Result<()> {
        input.skip(1);
        let x3 = input.read_f64()?;
        input.skip(1);
        let y3 = input.read_f64()?;
        input.skip(1);
        let x2 = input.read_f64()?;
        input.skip(1);
        let y2 = input.read_f64()?;
        input.skip(1);
        let angle = input.read_f64()?;
        input.skip(1);
        let ecc = input.read_f64()?;
        let (id, level) = (self.header.id, self.header.level);
        self.current_geometry_list().add(
            id,
            level,
            GeometryElement::EllipticalArcTo {
                x3,
                y3,
                x2,
                y2,
                angle,
                ecc,
            },
        );
        Ok(())
    }

    pub(super) fn read_infinite_line(&mut self, input: &mut Stream<'_>) -> Result<()> {
        input.skip(1);
        let x1 = input.read_f64()?;
        input.skip(1);
        let y1 = input.read_f64()?;
        input.skip(1);
        let x2 = input.read_f64()?;
        input.skip(1);
        let y2 = input.read_f64()?;
        let (id, level) = (self.header.id, self.header.level);
        self.current_geometry_list()
            .add(id, level, GeometryElement::InfiniteLine { x1, y1, x2, y2 });
        Ok(())
    }

    pub(super) fn read_spline_start(&mut self, input: &mut Stream<'_>) -> Result<()> {
        input.skip(1);
        let x = input.read_f64()?;
        input.skip(1);
        let y = input.read_f64()?;
        let second_knot = input.read_f64()?;
        let first_knot = input.read_f64()?;
        let last_knot = input.read_f64()?;
        let degree = input.read_u8()?;
        let (id, level) = (self.header.id, self.header.level);
        self.current_geometry_list().add(
            id,
            level,
            GeometryElement::SplineStart {
                x,
                y,
                second_knot,
                first_knot,
                last_knot,
                degree,
            },
        );
        Ok(())
    }

    pub(super) fn read_spline_knot(&mut self, input: &mut Stream<'_>) -> Result<()> {
        input.skip(1);
        let x = input.read_f64()?;
        input.skip(1);
        let y = input.read_f64()?;
        let knot = input.read_f64()?;
        let (id, level) = (self.header.id, self.header.level);
        self.current_geometry_list()
            .add(id, level, GeometryElement::SplineKnot { x, y, knot });
        Ok(())
    }

    /// NURBS rows either reference a shape-data block by id (`0x8a` marker)
    /// or inline a formula block for cell E whose parameters may each carry
    /// their own value type.
    pub(super) fn read_nurbs_to(&mut self, input: &mut Stream<'_>) -> Result<()> {
        input.skip(1);
        let x = input.read_f64()?;
        input.skip(1);
        let y = input.read_f64()?;
        let knot = input.read_f64()?;
        let weight = input.read_f64()?;
        let knot_prev = input.read_f64()?;
        let weight_prev = input.read_f64()?;

        input.skip(1);
        let use_data = input.read_u8()?;
        if use_data == 0x8a {
            input.skip(3);
            let data_id = input.read_u32()?;
            let (id, level) = (self.header.id, self.header.level);
            self.current_geometry_list().add(
                id,
                level,
                GeometryElement::NurbsToData {
                    x2: x,
                    y2: y,
                    knot,
                    knot_prev,
                    weight,
                    weight_prev,
                    data_id,
                },
            );
            return Ok(());
        }

        let mut knots = vec![knot_prev];
        let mut control_points: Vec<(f64, f64)> = Vec::new();
        let mut weights = vec![weight_prev];

        // Blocks start at 0x50; find the formula block for cell E (6).
        input.skip(9);
        let mut chunk_bytes_read = 0x50u64;
        let mut cell_ref = 0u8;
        let mut length = 0u32;
        let mut input_pos = input.tell();
        while cell_ref != 6
            && !input.at_end()
            && u64::from(self.header.data_length) > chunk_bytes_read + 4
        {
            length = input.read_u32()?;
            input.skip(1);
            cell_ref = input.read_u8()?;
            if cell_ref < 6 {
                input.skip(length.saturating_sub(6) as usize);
            }
            chunk_bytes_read += (input.tell() - input_pos) as u64;
            input_pos = input.tell();
        }

        if input.at_end() {
            return Ok(());
        }

        if cell_ref == 6 {
            let param_type = input.read_u8()?;

            let (last_knot, degree, x_type, y_type, mut repetitions) = if param_type == 0x8a {
                // Static parameter layout.
                (
                    input.read_f64()?,
                    input.read_u16()?,
                    input.read_u8()?,
                    input.read_u8()?,
                    input.read_u32()?,
                )
            } else {
                let last_knot = if param_type == 0x20 {
                    input.read_f64()?
                } else {
                    f64::from(input.read_u16()?)
                };
                input.skip(1);
                let degree = input.read_u16()?;
                input.skip(1);
                let x_type = input.read_u16()? as u8;
                input.skip(1);
                let y_type = input.read_u16()? as u8;
                (last_knot, degree, x_type, y_type, 0)
            };

            // (x, y, knot, weight) tuples until the terminator.
            let mut bytes_read = (input.tell() - input_pos) as u64;
            let mut flag = 0u8;
            if param_type != 0x8a {
                flag = input.read_u8()?;
            }
            while (flag != 0x81 || (param_type == 0x8a && repetitions > 0))
                && bytes_read < u64::from(length)
            {
                input_pos = input.tell();
                let control_x;
                let control_y;
                let mut knot_ = 0.0;
                let mut weight_ = 0.0;

                if param_type == 0x8a {
                    control_x = input.read_f64()?;
                    control_y = input.read_f64()?;
                    knot_ = input.read_f64()?;
                    weight_ = input.read_f64()?;
                } else {
                    control_x = if flag == 0x20 {
                        input.read_f64()?
                    } else {
                        f64::from(input.read_u16()?)
                    };
                    let value_type = input.read_u8()?;
                    control_y = if value_type == 0x20 {
                        input.read_f64()?
                    } else {
                        f64::from(input.read_u16()?)
                    };
                    let value_type = input.read_u8()?;
                    if value_type == 0x20 {
                        knot_ = input.read_f64()?;
                    } else if value_type == 0x62 {
                        knot_ = f64::from(input.read_u16()?);
                    }
                    let value_type = input.read_u8()?;
                    if value_type == 0x20 {
                        weight_ = input.read_f64()?;
                    } else if value_type == 0x62 {
                        weight_ = f64::from(input.read_u16()?);
                    }
                }
                control_points.push((control_x, control_y));
                knots.push(knot_);
                weights.push(weight_);

                if param_type != 0x8a {
                    flag = input.read_u8()?;
                } else {
                    repetitions = repetitions.saturating_sub(1);
                }
                bytes_read += (input.tell() - input_pos) as u64;
            }
            knots.push(knot);
            knots.push(last_knot);
            weights.push(weight);

            let (id, level) = (self.header.id, self.header.level);
            self.current_geometry_list().add(
                id,
                level,
                GeometryElement::NurbsTo {
                    x2: x,
                    y2: y,
                    x_type,
                    y_type,
                    degree: degree as u8,
                    control_points,
                    knots,
                    weights,
                },
            );
        } else {
            // No formula block: degrade to a straight segment.
            let (id, level) = (self.header.id, self.header.level);
            self.current_geometry_list()
                .add(id, level, GeometryElement::LineTo { x, y });
        }
        Ok(())
    }

    /// Polyline rows mirror the NURBS encoding, with the formula block for
    /// cell A (2) and an `0x8b` marker for shape-data references.
    pub(super) fn read_polyline_to(&mut self, input: &mut Stream<'_>) -> Result<()> {
        input.skip(1);
        let x = input.read_f64()?;
        input.skip(1);
        let y = input.read_f64()?;

        input.skip(1);
        let use_data = input.read_u8()?;
        if use_data == 0x8b {
            input.skip(3);
            let data_id = input.read_u32()?;
            let (id, level) = (self.header.id, self.header.level);
            self.current_geometry_list()
                .add(id, level, GeometryElement::PolylineToData { x, y, data_id });
            return Ok(());
        }

        // Blocks start at 0x30.
        input.skip(9);
        let mut chunk_bytes_read = 0x30u64;
        let mut cell_ref = 0u8;
        let mut length = 0u32;
        let mut input_pos = input.tell();
        while cell_ref != 2
            && !input.at_end()
            && u64::from(self.header.data_length) > chunk_bytes_read + 4
        {
            length = input.read_u32()?;
            if length == 0 {
                break;
            }
            input.skip(1);
            cell_ref = input.read_u8()?;
            if cell_ref < 2 {
                input.skip(length.saturating_sub(6) as usize);
            }
            chunk_bytes_read += (input.tell() - input_pos) as u64;
            input_pos = input.tell();
        }

        if input.at_end() {
            return Ok(());
        }

        let mut points: Vec<(f64, f64)> = Vec::new();
        if cell_ref == 2 {
            let mut block_bytes_read = 6u64;
            input_pos = input.tell();

            input.skip(1);
            let x_type = input.read_u16()? as u8;
            input.skip(1);
            let y_type = input.read_u16()? as u8;

            let mut flag = input.read_u8()?;
            block_bytes_read += (input.tell() - input_pos) as u64;
            while flag != 0x81 && block_bytes_read < u64::from(length) {
                input_pos = input.tell();
                let x2 = if flag == 0x20 {
                    input.read_f64()?
                } else {
                    f64::from(input.read_u16()?)
                };
                let value_type = input.read_u8()?;
                let y2 = if value_type == 0x20 {
                    input.read_f64()?
                } else {
                    f64::from(input.read_u16()?)
                };
                points.push((x2, y2));
                flag = input.read_u8()?;
                block_bytes_read += (input.tell() - input_pos) as u64;
            }

            let (id, level) = (self.header.id, self.header.level);
            self.current_geometry_list().add(
                id,
                level,
                GeometryElement::PolylineTo {
                    x,
                    y,
                    x_type,
                    y_type,
                    points,
                },
            );
        } else {
            let (id, level) = (self.header.id, self.header.level);
            self.current_geometry_list()
                .add(id, level, GeometryElement::LineTo { x, y });
        }
        Ok(())
    }

    /// Shape-data blocks: raw polyline (`0x80`) or NURBS (`0x82`) control
    /// data referenced from geometry rows.
    pub(super) fn read_shape_data(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        let data_type = input.read_u8()?;
        input.skip(15);
        if data_type == 0x80 {
            let x_type = input.read_u8()?;
            let y_type = input.read_u8()?;
            let point_count = input.read_u32()?;
            let mut points = Vec::new();
            for _ in 0..point_count {
                let x = input.read_f64()?;
                let y = input.read_f64()?;
                points.push((x, y));
            }
            let data = PolylineData {
                x_type,
                y_type,
                points,
            };
            if self.is_stencil_started {
                self.shape.polyline_data.insert(self.header.id, data);
            } else {
                collector.collect_polyline_data(self.header.id, self.header.level, &data);
            }
        } else if data_type == 0x82 {
            let last_knot = input.read_f64()?;
            let degree = input.read_u16()? as u8;
            let x_type = input.read_u8()?;
            let y_type = input.read_u8()?;
            let point_count = input.read_u32()?;
            let mut points = Vec::new();
            let mut knots = Vec::new();
            let mut weights = Vec::new();
            for _ in 0..point_count {
                let x = input.read_f64()?;
                let y = input.read_f64()?;
                knots.push(input.read_f64()?);
                weights.push(input.read_f64()?);
                points.push((x, y));
            }
            let data = NurbsData {
                x_type,
                y_type,
                degree,
                last_knot,
                points,
                knots,
                weights,
            };
            if self.is_stencil_started {
                self.shape.nurbs_data.insert(self.header.id, data);
            } else {
                collector.collect_nurbs_data(self.header.id, self.header.level, &data);
            }
        }
        Ok(())
    }

    // --- shape structure -----------------------------------------------

    pub(super) fn read_shape(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        if self.version.is_legacy() {
            return self.read_shape_legacy(input, collector);
        }
        if self.header.id != MINUS_ONE {
            self.current_shape_id = self.header.id;
        }
        self.current_shape_level = self.header.level;
        self.current_geom_list_count = 0;

        let mut master_page = MINUS_ONE;
        let mut master_shape = MINUS_ONE;
        let mut fill_style = MINUS_ONE;
        let mut line_style = MINUS_ONE;
        let mut text_style = MINUS_ONE;
        // The record may be truncated; whatever was read still applies.
        let _ = (|| -> Result<()> {
            input.skip(0x12);
            master_page = input.read_u32()?;
            input.skip(4);
            master_shape = input.read_u32()?;
            input.skip(4);
            fill_style = input.read_u32()?;
            input.skip(4);
            line_style = input.read_u32()?;
            input.skip(4);
            text_style = input.read_u32()?;
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
            self.shape.master_page = master_page;
            self.shape.master_shape = master_shape;
            self.shape.shape_id = self.current_shape_id;
        } else {
            collector.collect_shape(
                self.current_shape_id,
                self.header.level,
                0,
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

    pub(super) fn read_shape_id(&mut self, input: &mut Stream<'_>) -> Result<()> {
        let shape_id = self.get_uint(input)?;
        self.shape_list.add(self.header.id, self.header.level, shape_id);
        Ok(())
    }

    pub(super) fn read_shape_list(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        if self.version.is_legacy() {
            return self.read_list_legacy(input, collector);
        }
        let order = self.read_children_order(input)?;
        self.shape_list.set_elements_order(order);
        collector.collect_unhandled_chunk(self.header.id, self.header.level);
        Ok(())
    }

    fn read_children_order(&mut self, input: &mut Stream<'_>) -> Result<Vec<u32>> {
        let sub_header_length = input.read_u32()?;
        let children_list_length = input.read_u32()?;
        input.skip(sub_header_length as usize);
        let count = children_list_length / 4;
        let mut order = Vec::with_capacity(count as usize);
        for _ in 0..count {
            order.push(input.read_u32()?);
        }
        Ok(order)
    }

    pub(super) fn read_geom_list(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        if self.is_stencil_started {
            self.current_geom_list_count += 1;
        }
        if self.version.is_legacy() {
            if !self.is_stencil_started {
                collector.collect_unhandled_chunk(self.header.id, self.header.level);
            }
            return self.handle_chunk_records(input, collector);
        }
        let order = self.read_children_order(input)?;
        if self.is_stencil_started {
            self.current_geometry_list().set_elements_order(order);
        } else {
            self.geom_list.set_elements_order(order);
            collector.collect_unhandled_chunk(self.header.id, self.header.level);
        }
        Ok(())
    }

    pub(super) fn read_char_list(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        if self.version.is_legacy() {
            return self.read_list_legacy(input, collector);
        }
        let order = self.read_children_order(input)?;
        self.char_list.set_elements_order(order);
        collector.collect_unhandled_chunk(self.header.id, self.header.level);
        Ok(())
    }

    pub(super) fn read_para_list(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        if self.version.is_legacy() {
            return self.read_list_legacy(input, collector);
        }
        let order = self.read_children_order(input)?;
        self.para_list.set_elements_order(order);
        collector.collect_unhandled_chunk(self.header.id, self.header.level);
        Ok(())
    }

    pub(super) fn read_field_list(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        if self.version.is_legacy() {
            return self.read_list_legacy(input, collector);
        }
        let order = self.read_children_order(input)?;
        if self.is_stencil_started {
            self.shape.fields.clear();
            self.shape.fields.set_elements_order(order);
        } else {
            self.field_list.set_elements_order(order);
            self.field_list.add_field_list(self.header.id, self.header.level);
            collector.collect_unhandled_chunk(self.header.id, self.header.level);
        }
        Ok(())
    }

    pub(super) fn read_xform_data(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        let mut xform = XForm::default();
        input.skip(1);
        xform.pin_x = input.read_f64()?;
        input.skip(1);
        xform.pin_y = input.read_f64()?;
        input.skip(1);
        xform.width = input.read_f64()?;
        input.skip(1);
        xform.height = input.read_f64()?;
        input.skip(1);
        xform.pin_loc_x = input.read_f64()?;
        input.skip(1);
        xform.pin_loc_y = input.read_f64()?;
        input.skip(1);
        xform.angle = input.read_f64()?;
        xform.flip_x = input.read_u8()? != 0;
        xform.flip_y = input.read_u8()? != 0;

        if self.is_stencil_started {
            self.shape.xform = xform;
        } else {
            collector.collect_xform(self.header.level, &xform);
        }
        Ok(())
    }

    pub(super) fn read_txt_xform(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        let mut xform = XForm::default();
        input.skip(1);
        xform.pin_x = input.read_f64()?;
        input.skip(1);
        xform.pin_y = input.read_f64()?;
        input.skip(1);
        xform.width = input.read_f64()?;
        input.skip(1);
        xform.height = input.read_f64()?;
        input.skip(1);
        xform.pin_loc_x = input.read_f64()?;
        input.skip(1);
        xform.pin_loc_y = input.read_f64()?;
        input.skip(1);
        xform.angle = input.read_f64()?;

        if self.is_stencil_started {
            self.shape.txtxform = Some(xform);
        } else {
            collector.collect_txt_xform(self.header.level, &xform);
        }
        Ok(())
    }

    // --- styles on shapes ----------------------------------------------

    pub(super) fn read_line(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        if self.version.is_legacy() {
            return self.read_line_legacy(input, collector);
        }
        input.skip(1);
        let stroke_width = input.read_f64()?;
        input.skip(1);
        let colour = self.read_colour(input)?;
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

    pub(super) fn read_fill_and_shadow(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        if self.version.is_legacy() {
            return self.read_fill_and_shadow_legacy(input, collector);
        }
        let fg_index = input.read_u8()?;
        input.skip(3);
        let fg_transparency = input.read_u8()?;
        let bg_index = input.read_u8()?;
        input.skip(3);
        let bg_transparency = input.read_u8()?;
        let fill_pattern = input.read_u8()?;
        input.skip(1);
        let shadow_fg = self.read_colour(input)?;
        input.skip(5);
        let shadow_pattern = input.read_u8()?;

        let (shadow_offset_x, shadow_offset_y) = if self.version == Version::V11 {
            input.skip(2);
            let x = input.read_f64()?;
            input.skip(1);
            let y = -input.read_f64()?;
            (x, y)
        } else if self.is_stencil_started {
            self.current_stencil
                .as_ref()
                .map(|s| (s.shadow_offset_x, s.shadow_offset_y))
                .unwrap_or((0.0, 0.0))
        } else {
            (self.shadow_offset_x, self.shadow_offset_y)
        };

        let style = OptionalFillStyle {
            fg_colour: Some(self.colour_from_index(fg_index)),
            bg_colour: Some(self.colour_from_index(bg_index)),
            pattern: Some(fill_pattern),
            fg_transparency: Some(f64::from(fg_transparency) / 255.0),
            bg_transparency: Some(f64::from(bg_transparency) / 255.0),
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

    pub(super) fn read_text_block(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        if self.version.is_legacy() {
            return self.read_text_block_legacy(input, collector);
        }
        input.skip(1);
        let left_margin = input.read_f64()?;
        input.skip(1);
        let right_margin = input.read_f64()?;
        input.skip(1);
        let top_margin = input.read_f64()?;
        input.skip(1);
        let bottom_margin = input.read_f64()?;
        let vertical_align = input.read_u8()?;
        let is_bg_filled = input.read_u8()? != 0;
        let colour = self.read_colour(input)?;
        input.skip(1);
        let default_tab_stop = input.read_f64()?;
        input.skip(12);
        let text_direction = input.read_u8()?;

        let style = OptionalTextBlockStyle {
            left_margin: Some(left_margin),
            right_margin: Some(right_margin),
            top_margin: Some(top_margin),
            bottom_margin: Some(bottom_margin),
            vertical_align: Some(vertical_align),
            is_text_bkgnd_filled: Some(is_bg_filled),
            text_bkgnd_colour: Some(colour),
            default_tab_stop: Some(default_tab_stop),
            text_direction: Some(text_direction),
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

    pub(super) fn read_char_ix(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        if self.version.is_legacy() {
            return self.read_char_ix_legacy(input, collector);
        }
        let char_count = input.read_u32()?;
        let font_id = input.read_u16()?;
        input.skip(1); // colour id
        let font_colour = self.read_colour(input)?;

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

        let font_mod = input.read_u8()?;
        let doubleunderline = font_mod & 1 != 0;
        let strikeout = font_mod & 4 != 0;
        let doublestrikeout = font_mod & 0x20 != 0;

        let style = OptionalCharStyle {
            char_count: Some(char_count),
            font_id: Some(font_id),
            colour: Some(font_colour),
            size: Some(font_size),
            bold: Some(bold),
            italic: Some(italic),
            underline: Some(underline),
            doubleunderline: Some(doubleunderline),
            strikeout: Some(strikeout),
            doublestrikeout: Some(doublestrikeout),
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

    pub(super) fn read_para_ix(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        let char_count = self.get_uint(input)?;
        input.skip(1);
        let ind_first = input.read_f64()?;
        input.skip(1);
        let ind_left = input.read_f64()?;
        input.skip(1);
        let ind_right = input.read_f64()?;
        input.skip(1);
        let sp_line = input.read_f64()?;
        input.skip(1);
        let sp_before = input.read_f64()?;
        input.skip(1);
        let sp_after = input.read_f64()?;
        let align = input.read_u8()?;
        // Bullet and keep-together attributes sit between; the flags word is
        // absent from short records.
        input.skip(16);
        let flags = input.read_u32().unwrap_or(0);

        let style = OptionalParaStyle {
            char_count: Some(char_count),
            ind_first: Some(ind_first),
            ind_left: Some(ind_left),
            ind_right: Some(ind_right),
            sp_line: Some(sp_line),
            sp_before: Some(sp_before),
            sp_after: Some(sp_after),
            align: Some(align),
            flags: Some(flags),
        };
        if self.is_in_styles {
            collector.collect_para_ix_style(self.header.level, &style);
        } else if self.is_stencil_started {
            self.shape.para_style.overlay(&style);
        } else {
            self.para_list.add(self.header.id, self.header.level, style);
        }
        Ok(())
    }

    // --- text, fonts, names, fields ------------------------------------

    pub(super) fn read_text(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        input.skip(8);
        let (length, format) = if self.version == Version::V11 {
            (self.header.data_length.saturating_sub(8), TextFormat::Utf16)
        } else {
            (self.header.data_length.saturating_sub(9), TextFormat::Ansi)
        };
        let text = input.read_bytes(length as usize)?.to_vec();

        if self.is_stencil_started {
            self.shape.text = text;
            self.shape.text_format = format;
        } else {
            collector.collect_text(self.header.level, &text, format);
        }
        Ok(())
    }

    pub(super) fn read_font(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        input.skip(4);
        let mut name = Vec::new();
        for _ in 0..32 {
            let cur = input.read_u8()?;
            let next = input.read_u8()?;
            if cur == 0 && next == 0 {
                break;
            }
            name.push(cur);
            name.push(next);
        }
        collector.collect_font(self.header.id as u16, &name, TextFormat::Utf16);
        Ok(())
    }

    pub(super) fn read_font_ix(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        input.skip(2);
        let code_page = input.read_u8()?;
        input.skip(3);
        let mut name = Vec::new();
        for _ in 0..self.header.data_length.saturating_sub(6) {
            let byte = input.read_u8()?;
            if byte == 0 {
                break;
            }
            name.push(byte);
        }
        let format = match code_page {
            0xa1 => TextFormat::Greek,
            0xa2 => TextFormat::Turkish,
            0xa3 => TextFormat::Vietnamese,
            0xb1 => TextFormat::Hebrew,
            0xb2 => TextFormat::Arabic,
            0xba => TextFormat::Baltic,
            0xcc => TextFormat::Russian,
            0xde => TextFormat::Thai,
            0xee => TextFormat::CentralEurope,
            _ => TextFormat::Ansi,
        };
        collector.collect_font(self.header.id as u16, &name, format);
        Ok(())
    }

    pub(super) fn read_name_list(
        &mut self,
        _input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        if self.is_stencil_started {
            self.shape.names.clear();
        } else {
            collector.collect_name_list(self.header.id, self.header.level);
        }
        Ok(())
    }

    pub(super) fn read_name(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        let format = if self.version.is_legacy() {
            TextFormat::Ansi
        } else {
            TextFormat::Utf16
        };
        let data = input.read_bytes(self.header.data_length as usize)?.to_vec();
        let name = Name::new(data, format);
        if self.is_stencil_started {
            self.shape.names.insert(self.header.id, name);
        } else {
            collector.collect_name(self.header.id, self.header.level, &name);
        }
        Ok(())
    }

    pub(super) fn read_text_field(&mut self, input: &mut Stream<'_>) -> Result<()> {
        if self.version.is_legacy() {
            return self.read_text_field_legacy(input);
        }
        input.skip(7);
        let code = input.read_u8()?;
        let fields = if self.is_stencil_started {
            &mut self.shape.fields
        } else {
            &mut self.field_list
        };
        if code == 0xe8 {
            let name_id = input.read_u32()? as i32;
            input.skip(6);
            let format_id = input.read_u32()? as i32;
            fields.add_text_field(self.header.id, self.header.level, name_id, format_id);
        } else {
            let value = input.read_f64()?;
            input.skip(2);
            let format_id = input.read_u32()? as i32;
            fields.add_numeric_field(
                self.header.id,
                self.header.level,
                crate::fields::FORMAT_UNKNOWN,
                value,
                format_id,
            );
        }
        Ok(())
    }

    // --- sheets, pages, colours ----------------------------------------

    pub(super) fn read_style_sheet(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        if self.version.is_legacy() {
            input.skip(10);
            let line = read_legacy_uint(input)?;
            let fill = read_legacy_uint(input)?;
            let text = read_legacy_uint(input)?;
            collector.collect_style_sheet(self.header.id, self.header.level, line, fill, text);
            return Ok(());
        }
        input.skip(0x22);
        let line = input.read_u32()?;
        input.skip(4);
        let fill = input.read_u32()?;
        input.skip(4);
        let text = input.read_u32()?;
        collector.collect_style_sheet(self.header.id, self.header.level, line, fill, text);
        Ok(())
    }

    pub(super) fn read_page_sheet(
        &mut self,
        _input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        self.current_shape_level = self.header.level;
        collector.collect_page_sheet(self.header.id, self.header.level);
        Ok(())
    }

    pub(super) fn read_page_props(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        // The unit bytes before each value always declare inches.
        input.skip(1);
        let page_width = input.read_f64()?;
        input.skip(1);
        let page_height = input.read_f64()?;
        input.skip(1);
        let shadow_offset_x = input.read_f64()?;
        input.skip(1);
        let shadow_offset_y = -input.read_f64()?;
        input.skip(1);
        let mut scale = input.read_f64().unwrap_or(1.0);
        input.skip(1);
        match input.read_f64() {
            Ok(divisor) if divisor != 0.0 => scale /= divisor,
            _ => scale = 1.0,
        }

        self.shadow_offset_x = shadow_offset_x;
        self.shadow_offset_y = shadow_offset_y;
        if self.is_stencil_started {
            if let Some(stencil) = self.current_stencil.as_mut() {
                stencil.shadow_offset_x = shadow_offset_x;
                stencil.shadow_offset_y = shadow_offset_y;
            }
        }
        collector.collect_page_props(
            self.header.id,
            self.header.level,
            page_width,
            page_height,
            shadow_offset_x,
            shadow_offset_y,
            scale,
        );
        Ok(())
    }

    pub(super) fn read_page(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        let background_id = if self.version.is_legacy() {
            read_legacy_uint(input)?
        } else {
            input.skip(8); // sub header and children list lengths
            input.read_u32()?
        };
        collector.collect_page(
            self.header.id,
            self.header.level,
            background_id,
            self.is_background_page,
            "",
        );
        Ok(())
    }

    pub(super) fn read_colours(&mut self, input: &mut Stream<'_>) -> Result<()> {
        if self.version == Version::V2 {
            input.seek(2);
        } else {
            input.seek(6);
        }
        let count = input.read_u8()?;
        input.skip(1);
        self.colours.clear();
        for _ in 0..count {
            let colour = self.read_colour(input)?;
            self.colours.push(colour);
        }
        Ok(())
    }

    // --- foreign data ---------------------------------------------------

    pub(super) fn read_foreign_data_type(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        input.skip(1);
        let offset_x = input.read_f64()?;
        input.skip(1);
        let offset_y = input.read_f64()?;
        input.skip(1);
        let width = input.read_f64()?;
        input.skip(1);
        let height = input.read_f64()?;
        let kind = input.read_u16()?;
        input.skip(0xb);
        let format = input.read_u32()?;

        if self.is_stencil_started {
            let foreign = self.shape.foreign_mut();
            foreign.kind = kind;
            foreign.format = format;
            foreign.offset_x = offset_x;
            foreign.offset_y = offset_y;
            foreign.width = width;
            foreign.height = height;
        } else {
            collector.collect_foreign_data_type(
                self.header.level,
                kind,
                format,
                offset_x,
                offset_y,
                width,
                height,
            );
        }
        Ok(())
    }

    pub(super) fn read_foreign_data(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        let data = input.read_bytes(self.header.data_length as usize)?.to_vec();
        if self.is_stencil_started {
            self.shape.foreign_mut().data = data;
        } else {
            collector.collect_foreign_data(self.header.level, &data);
        }
        Ok(())
    }

    pub(super) fn read_ole_list(
        &mut self,
        _input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        if self.is_stencil_started {
            self.shape.foreign_mut();
        } else {
            collector.collect_ole_list(self.header.id, self.header.level);
        }
        Ok(())
    }

    pub(super) fn read_ole_data(
        &mut self,
        input: &mut Stream<'_>,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        let data = input.read_bytes(self.header.data_length as usize)?.to_vec();
        if self.is_stencil_started {
            // Multi-stream OLE objects append across chunks.
            self.shape.foreign_mut().data.extend_from_slice(&data);
        } else {
            collector.collect_ole_data(self.header.id, self.header.level, &data);
        }
        Ok(())
    }
}
