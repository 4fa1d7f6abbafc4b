// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The XML node decoder shared by VDX and VSDX.
//!
//! The lexer is an external collaborator: it feeds pre-tokenised pull events
//! ([`XmlNode`]) through a [`TokenSource`]. Element and attribute names are
//! resolved against the crate's token table, nesting depth stands in for the
//! binary format's chunk level, and a `del="1"` attribute deletes an
//! inherited value where an empty element without it is merely a "touch".
//!
//! Both XML parsers accumulate a page's shape tree and then replay it as the
//! same event stream the binary decoder produces, with a fixed level scheme
//! (page sheet 2, shapes 3, shape content 4, list rows and shape ids 5) so
//! the collectors' level bookkeeping works unchanged.

pub mod tokens;
mod reader;
mod vdx;
mod vsdx;

use std::collections::VecDeque;

use crate::error::Result;

pub use tokens::Token;
pub use vdx::VdxParser;
pub use vsdx::{Package, VsdxParser};

/// One pre-tokenised XML pull event.
#[derive(Clone, Debug, PartialEq)]
pub enum XmlNode {
    StartElement {
        token: Token,
        /// Attributes with resolved names; unknown names may be dropped by
        /// the lexer.
        attributes: Vec<(Token, String)>,
        /// True for `<Element/>`; no matching end event follows.
        is_empty: bool,
    },
    EndElement {
        token: Token,
    },
    Text(String),
}

impl XmlNode {
    pub fn start(token: Token) -> Self {
        Self::StartElement {
            token,
            attributes: Vec::new(),
            is_empty: false,
        }
    }

    pub fn start_with(token: Token, attributes: Vec<(Token, String)>) -> Self {
        Self::StartElement {
            token,
            attributes,
            is_empty: false,
        }
    }

    pub fn empty_with(token: Token, attributes: Vec<(Token, String)>) -> Self {
        Self::StartElement {
            token,
            attributes,
            is_empty: true,
        }
    }

    pub fn end(token: Token) -> Self {
        Self::EndElement { token }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub(crate) fn attribute<'a>(attributes: &'a [(Token, String)], token: Token) -> Option<&'a str> {
        attributes
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, v)| v.as_str())
    }
}

/// A pull source of XML events, produced by the external lexer.
pub trait TokenSource {
    fn next_node(&mut self) -> Result<Option<XmlNode>>;
}

/// A token source over an in-memory event list.
#[derive(Clone, Debug, Default)]
pub struct NodeSource {
    nodes: VecDeque<XmlNode>,
}

impl NodeSource {
    pub fn new(nodes: impl Into<VecDeque<XmlNode>>) -> Self {
        Self {
            nodes: nodes.into(),
        }
    }
}

impl TokenSource for NodeSource {
    fn next_node(&mut self) -> Result<Option<XmlNode>> {
        Ok(self.nodes.pop_front())
    }
}

/// A re-iterable XML document; parsers walk it once per collection pass.
pub trait XmlSource {
    fn tokens(&self) -> Result<Box<dyn TokenSource + '_>>;
}

/// An in-memory document of pre-tokenised events.
#[derive(Clone, Debug, Default)]
pub struct NodeDocument {
    nodes: Vec<XmlNode>,
}

impl NodeDocument {
    pub fn new(nodes: Vec<XmlNode>) -> Self {
        Self { nodes }
    }
}

impl XmlSource for NodeDocument {
    fn tokens(&self) -> Result<Box<dyn TokenSource + '_>> {
        Ok(Box::new(NodeSource::new(self.nodes.clone())))
    }
}

/// Locale-independent double parse; Visio XML always uses `.` decimals.
pub(crate) fn parse_double(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}

pub(crate) fn parse_long(value: &str) -> Option<i64> {
    let value = value.trim();
    // Tolerate doubles in integer cells.
    value
        .parse::<i64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().map(|v| v as i64))
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

/// A colour cell: either `#rrggbb` or an index into the document palette.
pub(crate) fn parse_colour(value: &str, palette: &[crate::types::Colour]) -> Option<crate::types::Colour> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        if hex.len() >= 6 {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            return Some(crate::types::Colour::new(r, g, b, 0));
        }
        return None;
    }
    let index = parse_long(value)?;
    palette.get(index.max(0) as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_parsing_is_locale_independent() {
        assert_eq!(parse_double("8.26"), Some(8.26));
        assert_eq!(parse_double(" 0.5 "), Some(0.5));
        assert_eq!(parse_long("42"), Some(42));
        assert_eq!(parse_long("1.0"), Some(1));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
    }

    #[test]
    fn colour_cells() {
        let palette = [crate::types::Colour::new(1, 2, 3, 0)];
        assert_eq!(
            parse_colour("#ff0000", &palette),
            Some(crate::types::Colour::new(0xff, 0, 0, 0))
        );
        assert_eq!(parse_colour("0", &palette), Some(palette[0]));
        assert_eq!(parse_colour("9", &palette), None);
    }
}
