// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The shape aggregate built while parsing one shape.

use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::fields::FieldList;
use crate::geometry::GeometryList;
use crate::style::{
    OptionalCharStyle, OptionalFillStyle, OptionalLineStyle, OptionalParaStyle,
    OptionalTextBlockStyle,
};
use crate::types::{ForeignData, Name, NurbsData, PolylineData, TextFormat, XForm, MINUS_ONE};

/// Everything a single shape owns.
///
/// The decoder accumulates master (stencil) shapes into this aggregate; the
/// content collector later copies whatever it inherits, so a master is never
/// aliased mutably.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    pub shape_id: u32,
    pub parent: u32,
    pub master_page: u32,
    pub master_shape: u32,
    pub line_style_id: u32,
    pub fill_style_id: u32,
    pub text_style_id: u32,
    pub line_style: OptionalLineStyle,
    pub fill_style: OptionalFillStyle,
    pub text_block_style: OptionalTextBlockStyle,
    pub char_style: OptionalCharStyle,
    pub para_style: OptionalParaStyle,
    pub xform: XForm,
    pub txtxform: Option<XForm>,
    /// Geometry sections keyed by section index, iterated in key order.
    pub geometries: BTreeMap<u32, GeometryList>,
    pub nurbs_data: HashMap<u32, NurbsData>,
    pub polyline_data: HashMap<u32, PolylineData>,
    pub text: Vec<u8>,
    pub text_format: TextFormat,
    pub names: BTreeMap<u32, Name>,
    pub fields: FieldList,
    pub foreign: Option<ForeignData>,
}

impl Default for Shape {
    fn default() -> Self {
        Self {
            shape_id: MINUS_ONE,
            parent: 0,
            master_page: MINUS_ONE,
            master_shape: MINUS_ONE,
            line_style_id: MINUS_ONE,
            fill_style_id: MINUS_ONE,
            text_style_id: MINUS_ONE,
            line_style: OptionalLineStyle::default(),
            fill_style: OptionalFillStyle::default(),
            text_block_style: OptionalTextBlockStyle::default(),
            char_style: OptionalCharStyle::default(),
            para_style: OptionalParaStyle::default(),
            xform: XForm::default(),
            txtxform: None,
            geometries: BTreeMap::new(),
            nurbs_data: HashMap::new(),
            polyline_data: HashMap::new(),
            text: Vec::new(),
            text_format: TextFormat::Ansi,
            names: BTreeMap::new(),
            fields: FieldList::new(),
            foreign: None,
        }
    }
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// The foreign-data record, created on first touch.
    pub fn foreign_mut(&mut self) -> &mut ForeignData {
        self.foreign.get_or_insert_with(ForeignData::default)
    }
}
