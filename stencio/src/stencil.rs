// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The read-only registry of master shapes.

use hashbrown::HashMap;

use crate::shape::Shape;
use crate::types::MINUS_ONE;

/// One stencil: its master shapes plus page-level shadow offsets.
#[derive(Clone, Debug, Default)]
pub struct Stencil {
    shapes: HashMap<u32, Shape>,
    pub shadow_offset_x: f64,
    pub shadow_offset_y: f64,
    first_shape_id: Option<u32>,
}

impl Stencil {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_shape(&mut self, id: u32, shape: Shape) {
        self.first_shape_id.get_or_insert(id);
        self.shapes.insert(id, shape);
    }

    pub fn shape(&self, id: u32) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    pub fn first_shape_id(&self) -> Option<u32> {
        self.first_shape_id
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }
}

/// All stencils of the document, keyed by master page id.
///
/// Loaded once before any drawing page and immutable afterwards. A failed
/// lookup is non-fatal: the shape simply has no master.
#[derive(Clone, Debug, Default)]
pub struct Stencils {
    stencils: HashMap<u32, Stencil>,
}

impl Stencils {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stencil(&mut self, id: u32, stencil: Stencil) {
        self.stencils.insert(id, stencil);
    }

    pub fn stencil(&self, id: u32) -> Option<&Stencil> {
        self.stencils.get(&id)
    }

    /// Looks up a master shape. `MINUS_ONE` for `master_shape` selects the
    /// stencil's first shape.
    pub fn shape(&self, master_page: u32, master_shape: u32) -> Option<&Shape> {
        let stencil = self.stencils.get(&master_page)?;
        let id = if master_shape == MINUS_ONE {
            stencil.first_shape_id()?
        } else {
            master_shape
        };
        stencil.shape(id)
    }

    pub fn count(&self) -> usize {
        self.stencils.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stencils.is_empty()
    }

    pub fn clear(&mut self) {
        self.stencils.clear();
    }
}
