// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Decoder for Microsoft Visio drawings.
//!
//! Stencio turns Visio documents, the legacy binary container (format
//! generations 2, 5, 6 and 11) and the XML packages (VDX and VSDX), into a
//! stream of resolution-independent drawing events: pages, filled and stroked
//! paths, embedded images, and styled text, delivered to a
//! [`Painter`](stencio_draw::Painter) you implement.
//!
//! The pipeline runs two passes over a document. The first pass harvests
//! style sheets, group transforms, group memberships and per-page z-order;
//! the second resolves styles through their parent chains and stencil
//! masters, expands geometry (NURBS sampling, arc fitting, polylines), lays
//! out text across char/paragraph runs, and replays everything in page
//! z-order.
//!
//! The container readers are external collaborators: the binary parser
//! consumes the raw `VisioDocument` stream an OLE reader hands it, and the
//! XML parsers consume pre-tokenised pull events from your lexer through
//! [`TokenSource`] (per OPC part via [`Package`] for VSDX).
//!
//! ```
//! use stencio::VsdParser;
//! use stencio_draw::CallRecorder;
//!
//! # fn demo(visio_document_stream: &[u8]) -> stencio::Result<()> {
//! let mut painter = CallRecorder::new();
//! VsdParser::new(visio_document_stream)?.parse(&mut painter)?;
//! # Ok(())
//! # }
//! ```

// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// END LINEBENDER LINT SET
#![allow(clippy::too_many_arguments)]

mod binary;
mod charsets;
pub mod chunks;
mod collector;
mod content;
mod error;
mod fields;
mod geometry;
mod lists;
mod pages;
mod shape;
mod source;
mod stencil;
mod style;
mod styles_collector;
mod types;
pub mod xml;

pub use binary::{ParseOptions, Version, VsdParser};
pub use collector::Collector;
pub use content::ContentCollector;
pub use error::{ParseError, Result};
pub use fields::{FieldElement, FieldList, FORMAT_UNKNOWN};
pub use geometry::{GeometryElement, GeometryList};
pub use lists::{CharacterList, ParagraphList, ShapeList};
pub use pages::{Page, Pages};
pub use shape::Shape;
pub use stencil::{Stencil, Stencils};
pub use style::{
    CharStyle, FillStyle, LineStyle, OptionalCharStyle, OptionalFillStyle, OptionalLineStyle,
    OptionalParaStyle, OptionalTextBlockStyle, ParaStyle, Styles, TextBlockStyle,
};
pub use source::Stream;
pub use styles_collector::{DocumentLayout, StylesCollector};
pub use types::{
    foreign_format, foreign_kind, Colour, Font, ForeignData, Name, NurbsData, PolylineData,
    TextFormat, XForm, MINUS_ONE,
};
pub use xml::{
    NodeDocument, NodeSource, Package, Token, TokenSource, VdxParser, VsdxParser, XmlNode,
    XmlSource,
};

use stencio_draw::Painter;

/// Decodes a binary `VisioDocument` stream against `painter`.
///
/// The format generation is sniffed from the stream header; versions outside
/// {2, 5, 6, 11} are rejected up front.
pub fn parse_binary(input: &[u8], painter: &mut dyn Painter) -> Result<()> {
    VsdParser::new(input)?.parse(painter)
}

/// Decodes a VDX document given as pre-tokenised XML events.
pub fn parse_vdx(source: &dyn XmlSource, painter: &mut dyn Painter) -> Result<()> {
    VdxParser::new(source).parse(painter)
}

/// Decodes a VSDX package through its part provider.
pub fn parse_vsdx(package: &dyn Package, painter: &mut dyn Painter) -> Result<()> {
    VsdxParser::new(package).parse(painter)
}
