// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered element lists for character runs, paragraph runs and shape order.
//!
//! Each list stores rows keyed by element id plus an optional explicit order
//! read from the list chunk's children table; replay walks the explicit order
//! when present and ascending ids otherwise.

use std::collections::BTreeMap;

use crate::collector::Collector;
use crate::style::{OptionalCharStyle, OptionalParaStyle};

macro_rules! ordered_list {
    ($name:ident, $entry:ty, $replay:expr) => {
        #[derive(Clone, Debug, Default, PartialEq)]
        pub struct $name {
            elements: BTreeMap<u32, (u32, $entry)>,
            order: Vec<u32>,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn add(&mut self, id: u32, level: u32, entry: $entry) {
                self.elements.insert(id, (level, entry));
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

            pub fn replay(&self, collector: &mut dyn Collector) {
                if self.is_empty() {
                    return;
                }
                #[allow(clippy::redundant_closure_call)]
                if self.order.is_empty() {
                    for (&id, (level, entry)) in &self.elements {
                        ($replay)(collector, id, *level, entry);
                    }
                } else {
                    for &id in &self.order {
                        if let Some((level, entry)) = self.elements.get(&id) {
                            ($replay)(collector, id, *level, entry);
                        }
                    }
                }
            }
        }
    };
}

ordered_list!(
    CharacterList,
    OptionalCharStyle,
    |collector: &mut dyn Collector, id, level, entry: &OptionalCharStyle| {
        collector.collect_char_ix(id, level, entry);
    }
);

ordered_list!(
    ParagraphList,
    OptionalParaStyle,
    |collector: &mut dyn Collector, id, level, entry: &OptionalParaStyle| {
        collector.collect_para_ix(id, level, entry);
    }
);

ordered_list!(
    ShapeList,
    u32,
    |collector: &mut dyn Collector, id, level, entry: &u32| {
        collector.collect_shape_id(id, level, *entry);
    }
);
