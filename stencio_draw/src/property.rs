// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property lists: ordered key/value attribute sets passed to the painter.

use alloc::string::{String, ToString};
use core::fmt;
use smallvec::SmallVec;

/// Measurement unit attached to a numeric property value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Unit {
    /// Inches, the document-space unit. The default for bare `f64` inserts.
    #[default]
    Inch,
    /// A fraction in `[0, 1]`, rendered as a percentage.
    Percent,
    /// Typographic points.
    Point,
    /// A unitless number (angles in degrees, counts).
    Generic,
}

/// A single property value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Str(String),
    Bool(bool),
    Int(i32),
    Double(f64, Unit),
}

impl Value {
    pub fn percent(value: f64) -> Self {
        Self::Double(value, Unit::Percent)
    }

    pub fn points(value: f64) -> Self {
        Self::Double(value, Unit::Point)
    }

    pub fn generic(value: f64) -> Self {
        Self::Double(value, Unit::Generic)
    }

    /// The numeric value, if this is a number (in its stored unit).
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Double(v, _) => Some(v),
            Self::Int(v) => Some(f64::from(v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Double(v, Unit::Inch) => write!(f, "{v:.4}in"),
            Self::Double(v, Unit::Percent) => write!(f, "{:.4}%", v * 100.0),
            Self::Double(v, Unit::Point) => write!(f, "{v:.4}pt"),
            Self::Double(v, Unit::Generic) => write!(f, "{v:.4}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value, Unit::Inch)
    }
}

/// An ordered set of named properties.
///
/// Keys are static strings from the decoder's own vocabulary, so lookups are
/// linear scans over a small inline vector rather than hashes. `insert`
/// replaces an existing binding in place, preserving first-insert order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyList {
    props: SmallVec<[(&'static str, Value); 8]>,
}

impl PropertyList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &'static str, value: impl Into<Value>) {
        let value = value.into();
        if let Some(slot) = self.props.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.props.push((key, value));
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.props.retain(|(k, _)| *k != key);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.props.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn clear(&mut self) {
        self.props.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.props.iter().map(|(k, v)| (*k, v))
    }
}

impl fmt::Display for PropertyList {
    /// Renders `key=value` pairs sorted by key, for stable test output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pairs: SmallVec<[(&'static str, &Value); 8]> =
            self.props.iter().map(|(k, v)| (*k, v)).collect();
        pairs.sort_unstable_by_key(|(k, _)| *k);
        let mut first = true;
        for (key, value) in pairs {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut props = PropertyList::new();
        props.insert("svg:x", 1.0);
        props.insert("svg:y", 2.0);
        props.insert("svg:x", 3.0);
        assert_eq!(props.len(), 2);
        assert_eq!(props.get_f64("svg:x"), Some(3.0));
    }

    #[test]
    fn unit_rendering() {
        assert_eq!(Value::from(0.01).to_string(), "0.0100in");
        assert_eq!(Value::percent(0.5).to_string(), "50.0000%");
        assert_eq!(Value::points(12.0).to_string(), "12.0000pt");
        assert_eq!(Value::generic(90.0).to_string(), "90.0000");
    }
}
