// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text fields: placeholders in the text stream resolved to strings.

use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::collector::Collector;

/// Field format codes that render the date part of a date/time value.
const DATE_FORMATS: &[u16] = &[
    20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 44, 45, 50, 51, 52, 53, 54, 55, 56, 57, 58, 59, 60,
    61, 62, 63, 64, 65, 76, 77, 78, 79, 200, 201, 202, 203, 204, 205, 206, 207, 208, 209, 210,
];

/// Field format codes that render the time part.
const TIME_FORMATS: &[u16] = &[
    30, 31, 32, 33, 34, 35, 36, 46, 66, 67, 68, 69, 70, 71, 72, 73, 74, 75, 80, 81, 213, 214,
    215, 216,
];

/// Field format codes that render both.
const DATETIME_FORMATS: &[u16] = &[211, 212];

pub const FORMAT_UNKNOWN: u16 = 0xffff;

/// One field definition from a field list.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldElement {
    /// Text field referencing a named constant.
    Text { name_id: i32, format_id: i32 },
    /// Numeric field: a value plus a format code (dates and times are days
    /// since 1899-12-30).
    Numeric {
        format: u16,
        value: f64,
        format_id: i32,
    },
}

impl FieldElement {
    /// Resolves the field to its display string.
    pub fn format(&self, names: &HashMap<u32, String>) -> String {
        match *self {
            Self::Text { name_id, .. } => {
                if name_id < 0 {
                    String::new()
                } else {
                    names.get(&(name_id as u32)).cloned().unwrap_or_default()
                }
            }
            Self::Numeric { format, value, .. } => format_number(format, value),
        }
    }
}

pub(crate) fn format_number(format: u16, value: f64) -> String {
    if format == FORMAT_UNKNOWN {
        return String::new();
    }
    if DATE_FORMATS.contains(&format) {
        let (date, _) = split_datetime(value);
        date
    } else if TIME_FORMATS.contains(&format) {
        let (_, time) = split_datetime(value);
        time
    } else if DATETIME_FORMATS.contains(&format) {
        let (date, time) = split_datetime(value);
        format!("{date} {time}")
    } else {
        format_double(value)
    }
}

/// Seconds between 1899-12-30 and the Unix epoch.
const VISIO_EPOCH_OFFSET: i64 = 2_209_161_600;

/// Splits a day count since 1899-12-30 into ISO date and time strings.
fn split_datetime(days: f64) -> (String, String) {
    let unix = (86400.0 * days) as i64 - VISIO_EPOCH_OFFSET;
    let day = unix.div_euclid(86400);
    let secs = unix.rem_euclid(86400);
    let (y, m, d) = civil_from_days(day);
    (
        format!("{y:04}-{m:02}-{d:02}"),
        format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60),
    )
}

/// Proleptic Gregorian date for a day count since the Unix epoch.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

/// Renders a plain numeric field value: integers bare, the rest with four
/// decimals, trailing zeros trimmed.
pub(crate) fn format_double(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let mut s = format!("{value:.4}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

/// Parses an explicit field format reference of the form `{<NN>}` or
/// `esc(NN)` into a format code.
pub(crate) fn parse_format_id(s: &str) -> Option<u16> {
    let s = s.trim();
    let digits = if let Some(rest) = s.strip_prefix("{<") {
        rest.strip_suffix(">}")?
    } else if let Some(rest) = s.strip_prefix("esc(") {
        rest.strip_suffix(')')?
    } else {
        return None;
    };
    digits.trim().parse::<u16>().ok()
}

/// The ordered field list of one shape.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldList {
    elements: BTreeMap<u32, (u32, FieldElement)>,
    order: Vec<u32>,
    id: u32,
    level: u32,
}

impl FieldList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field_list(&mut self, id: u32, level: u32) {
        self.id = id;
        self.level = level;
    }

    pub fn add_text_field(&mut self, id: u32, level: u32, name_id: i32, format_id: i32) {
        self.elements
            .insert(id, (level, FieldElement::Text { name_id, format_id }));
    }

    pub fn add_numeric_field(&mut self, id: u32, level: u32, format: u16, value: f64, format_id: i32) {
        self.elements.insert(
            id,
            (
                level,
                FieldElement::Numeric {
                    format,
                    value,
                    format_id,
                },
            ),
        );
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
        self.id = 0;
        self.level = 0;
    }

    /// The `index`-th field in display order.
    pub fn element(&self, index: usize) -> Option<&FieldElement> {
        let id = match self.order.get(index) {
            Some(&id) => id,
            None => index as u32,
        };
        self.elements.get(&id).map(|(_, e)| e)
    }

    pub fn replay(&self, collector: &mut dyn Collector) {
        if self.is_empty() {
            return;
        }
        let replay_one = |collector: &mut dyn Collector, id: u32, level: u32, e: &FieldElement| match *e {
            FieldElement::Text { name_id, format_id } => {
                collector.collect_text_field(id, level, name_id, format_id);
            }
            FieldElement::Numeric {
                format,
                value,
                format_id,
            } => collector.collect_numeric_field(id, level, format, value, format_id),
        };
        if self.order.is_empty() {
            for (&id, (level, e)) in &self.elements {
                replay_one(collector, id, *level, e);
            }
        } else {
            for &id in &self.order {
                if let Some((level, e)) = self.elements.get(&id) {
                    replay_one(collector, id, *level, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_and_time_formats() {
        // 2011-06-15 12:00:00 is 40709.5 days after 1899-12-30.
        assert_eq!(format_number(22, 40709.5), "2011-06-15");
        assert_eq!(format_number(31, 40709.5), "12:00:00");
        assert_eq!(format_number(211, 40709.5), "2011-06-15 12:00:00");
    }

    #[test]
    fn plain_numbers() {
        assert_eq!(format_number(0, 42.0), "42");
        assert_eq!(format_number(2, 1.25), "1.25");
        assert_eq!(format_number(FORMAT_UNKNOWN, 1.0), "");
    }

    #[test]
    fn format_id_syntax() {
        assert_eq!(parse_format_id("{<33>}"), Some(33));
        assert_eq!(parse_format_id("esc(21)"), Some(21));
        assert_eq!(parse_format_id("nope"), None);
    }
}
