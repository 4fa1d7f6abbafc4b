// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry sections: ordered lists of drawing primitives.

use std::collections::BTreeMap;

use crate::collector::Collector;

/// One row of a geometry section, as decoded from either container format.
///
/// Coordinates are local to the owning shape. The `*Data` variants reference
/// NURBS/polyline control data stored separately on the shape by data id.
#[derive(Clone, Debug, PartialEq)]
pub enum GeometryElement {
    Geometry {
        no_fill: bool,
        no_line: bool,
        no_show: bool,
    },
    MoveTo {
        x: f64,
        y: f64,
    },
    LineTo {
        x: f64,
        y: f64,
    },
    ArcTo {
        x2: f64,
        y2: f64,
        bow: f64,
    },
    Ellipse {
        cx: f64,
        cy: f64,
        xleft: f64,
        yleft: f64,
        xtop: f64,
        ytop: f64,
    },
    EllipticalArcTo {
        x3: f64,
        y3: f64,
        x2: f64,
        y2: f64,
        angle: f64,
        ecc: f64,
    },
    NurbsTo {
        x2: f64,
        y2: f64,
        x_type: u8,
        y_type: u8,
        degree: u8,
        control_points: Vec<(f64, f64)>,
        knots: Vec<f64>,
        weights: Vec<f64>,
    },
    NurbsToData {
        x2: f64,
        y2: f64,
        knot: f64,
        knot_prev: f64,
        weight: f64,
        weight_prev: f64,
        data_id: u32,
    },
    PolylineTo {
        x: f64,
        y: f64,
        x_type: u8,
        y_type: u8,
        points: Vec<(f64, f64)>,
    },
    PolylineToData {
        x: f64,
        y: f64,
        data_id: u32,
    },
    InfiniteLine {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },
    SplineStart {
        x: f64,
        y: f64,
        second_knot: f64,
        first_knot: f64,
        last_knot: f64,
        degree: u8,
    },
    SplineKnot {
        x: f64,
        y: f64,
        knot: f64,
    },
    RelMoveTo {
        x: f64,
        y: f64,
    },
    RelLineTo {
        x: f64,
        y: f64,
    },
    RelCubBezTo {
        x: f64,
        y: f64,
        a: f64,
        b: f64,
        c: f64,
        d: f64,
    },
    RelQuadBezTo {
        x: f64,
        y: f64,
        a: f64,
        b: f64,
    },
    RelEllipticalArcTo {
        x: f64,
        y: f64,
        a: f64,
        b: f64,
        c: f64,
        d: f64,
    },
}

impl GeometryElement {
    fn is_spline(&self) -> bool {
        matches!(self, Self::SplineStart { .. } | Self::SplineKnot { .. })
    }

    /// The data id referenced by this row, if any.
    pub fn data_id(&self) -> Option<u32> {
        match *self {
            Self::NurbsToData { data_id, .. } | Self::PolylineToData { data_id, .. } => {
                Some(data_id)
            }
            _ => None,
        }
    }

    fn replay(&self, id: u32, level: u32, collector: &mut dyn Collector) {
        match self {
            Self::Geometry {
                no_fill,
                no_line,
                no_show,
            } => collector.collect_geometry(id, level, *no_fill, *no_line, *no_show),
            Self::MoveTo { x, y } => collector.collect_move_to(id, level, *x, *y),
            Self::LineTo { x, y } => collector.collect_line_to(id, level, *x, *y),
            Self::ArcTo { x2, y2, bow } => collector.collect_arc_to(id, level, *x2, *y2, *bow),
            Self::Ellipse {
                cx,
                cy,
                xleft,
                yleft,
                xtop,
                ytop,
            } => collector.collect_ellipse(id, level, *cx, *cy, *xleft, *yleft, *xtop, *ytop),
            Self::EllipticalArcTo {
                x3,
                y3,
                x2,
                y2,
                angle,
                ecc,
            } => collector.collect_elliptical_arc_to(id, level, *x3, *y3, *x2, *y2, *angle, *ecc),
            Self::NurbsTo {
                x2,
                y2,
                x_type,
                y_type,
                degree,
                control_points,
                knots,
                weights,
            } => collector.collect_nurbs_to(
                id,
                level,
                *x2,
                *y2,
                *x_type,
                *y_type,
                *degree,
                control_points,
                knots,
                weights,
            ),
            Self::NurbsToData {
                x2,
                y2,
                knot,
                knot_prev,
                weight,
                weight_prev,
                data_id,
            } => collector.collect_nurbs_to_data(
                id,
                level,
                *x2,
                *y2,
                *knot,
                *knot_prev,
                *weight,
                *weight_prev,
                *data_id,
            ),
            Self::PolylineTo {
                x,
                y,
                x_type,
                y_type,
                points,
            } => collector.collect_polyline_to(id, level, *x, *y, *x_type, *y_type, points),
            Self::PolylineToData { x, y, data_id } => {
                collector.collect_polyline_to_data(id, level, *x, *y, *data_id);
            }
            Self::InfiniteLine { x1, y1, x2, y2 } => {
                collector.collect_infinite_line(id, level, *x1, *y1, *x2, *y2);
            }
            Self::SplineStart {
                x,
                y,
                second_knot,
                first_knot,
                last_knot,
                degree,
            } => collector.collect_spline_start(
                id,
                level,
                *x,
                *y,
                *second_knot,
                *first_knot,
                *last_knot,
                *degree,
            ),
            Self::SplineKnot { x, y, knot } => {
                collector.collect_spline_knot(id, level, *x, *y, *knot);
            }
            Self::RelMoveTo { x, y } => collector.collect_rel_move_to(id, level, *x, *y),
            Self::RelLineTo { x, y } => collector.collect_rel_line_to(id, level, *x, *y),
            Self::RelCubBezTo { x, y, a, b, c, d } => {
                collector.collect_rel_cub_bez_to(id, level, *x, *y, *a, *b, *c, *d);
            }
            Self::RelQuadBezTo { x, y, a, b } => {
                collector.collect_rel_quad_bez_to(id, level, *x, *y, *a, *b);
            }
            Self::RelEllipticalArcTo { x, y, a, b, c, d } => {
                collector.collect_rel_elliptical_arc_to(id, level, *x, *y, *a, *b, *c, *d);
            }
        }
    }
}

/// One geometry section: rows keyed by element id, optionally with an
/// explicit replay order.
///
/// Without an explicit order, rows replay in ascending id order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometryList {
    elements: BTreeMap<u32, (u32, GeometryElement)>,
    order: Vec<u32>,
}

impl GeometryList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: u32, level: u32, element: GeometryElement) {
        self.elements.insert(id, (level, element));
    }

    pub fn set_elements_order(&mut self, order: Vec<u32>) {
        self.order = order;
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.order.clear();
    }

    pub fn element(&self, id: u32) -> Option<&GeometryElement> {
        self.elements.get(&id).map(|(_, e)| e)
    }

    /// Replays the section against the collector, closing any pending spline
    /// run when a non-spline row follows it or the section ends.
    pub fn replay(&self, collector: &mut dyn Collector) {
        if self.is_empty() {
            return;
        }
        let mut in_spline = false;
        let mut each = |id: u32, level: u32, element: &GeometryElement| {
            if in_spline && !element.is_spline() {
                collector.collect_spline_end();
                in_spline = false;
            }
            if element.is_spline() {
                in_spline = true;
            }
            element.replay(id, level, collector);
        };
        if self.order.is_empty() {
            for (&id, (level, element)) in &self.elements {
                each(id, *level, element);
            }
        } else {
            for &id in &self.order {
                if let Some((level, element)) = self.elements.get(&id) {
                    each(id, *level, element);
                }
            }
        }
        if in_spline {
            collector.collect_spline_end();
        }
    }
}
