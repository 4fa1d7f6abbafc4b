// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element and attribute tokens of the XML vocabularies.
//!
//! Covers the 2003 XML schema (one element per cell, as in VDX), the OPC
//! package schema (generic `Cell`/`Section`/`Row` elements, as in VSDX), and
//! the relationship vocabulary of `.rels` parts. Lexers map names to tokens
//! through [`lookup`]; unknown names become [`Token::Unknown`]. A handful of
//! names (`Master`, `LineStyle`, ...) serve as both element and
//! attribute; the readers disambiguate by position.

/// A resolved XML name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Token {
    Unknown,

    // Document structure.
    VisioDocument,
    Colors,
    ColorEntry,
    FaceNames,
    FaceName,
    StyleSheets,
    StyleSheet,
    Masters,
    Master,
    Pages,
    Page,
    PageContents,
    PageSheet,
    PageProps,
    Shapes,
    Shape,
    Text,

    // Text run markers.
    Cp,
    Pp,
    Tp,

    // Shape sections (2003 schema).
    XForm,
    TextXForm,
    Line,
    Fill,
    TextBlock,
    Char,
    Para,
    Geom,
    Foreign,
    ForeignData,
    Field,
    Value,

    // Geometry rows.
    MoveTo,
    LineTo,
    ArcTo,
    EllipticalArcTo,
    Ellipse,
    InfiniteLine,
    NurbsTo,
    PolylineTo,
    SplineStart,
    SplineKnot,
    RelMoveTo,
    RelLineTo,
    RelCubBezTo,
    RelQuadBezTo,
    RelEllipticalArcTo,
    NoFill,
    NoLine,
    NoShow,
    X,
    Y,
    A,
    B,
    C,
    D,
    E,

    // XForm cells.
    PinX,
    PinY,
    Width,
    Height,
    LocPinX,
    LocPinY,
    Angle,
    FlipX,
    FlipY,
    TxtPinX,
    TxtPinY,
    TxtWidth,
    TxtHeight,
    TxtLocPinX,
    TxtLocPinY,
    TxtAngle,

    // Line cells.
    LineWeight,
    LineColor,
    LinePattern,
    BeginArrow,
    EndArrow,
    LineCap,

    // Fill and shadow cells.
    FillForegnd,
    FillBkgnd,
    FillPattern,
    FillForegndTrans,
    FillBkgndTrans,
    ShdwForegnd,
    ShdwPattern,
    ShapeShdwOffsetX,
    ShapeShdwOffsetY,

    // Text block cells.
    LeftMargin,
    RightMargin,
    TopMargin,
    BottomMargin,
    VerticalAlign,
    TextBkgnd,
    DefaultTabStop,
    TextDirection,

    // Char cells.
    Font,
    Color,
    Size,
    FontStyle,
    Case,
    Pos,

    // Para cells.
    IndFirst,
    IndLeft,
    IndRight,
    SpLine,
    SpBefore,
    SpAfter,
    HorzAlign,
    Flags,

    // Page cells.
    PageWidth,
    PageHeight,
    ShdwOffsetX,
    ShdwOffsetY,
    PageScale,
    DrawingScale,

    // Generic cell schema (OPC package).
    Cell,
    Section,
    Row,
    Rel,

    // Package relationships.
    Relationship,
    RelationshipType,
    Target,

    // Attributes.
    Id,
    Ix,
    Del,
    N,
    V,
    T,
    F,
    NameAttr,
    NameU,
    MasterShape,
    LineStyle,
    FillStyle,
    TextStyle,
    BackPage,
    Background,
    RelId,
    ForeignType,
    CompressionType,
    Rgb,
}

/// Maps an element or attribute name to its token.
pub fn lookup(name: &str) -> Token {
    match name {
        "VisioDocument" => Token::VisioDocument,
        "Colors" => Token::Colors,
        "ColorEntry" => Token::ColorEntry,
        "FaceNames" => Token::FaceNames,
        "FaceName" => Token::FaceName,
        "StyleSheets" => Token::StyleSheets,
        "StyleSheet" => Token::StyleSheet,
        "Masters" => Token::Masters,
        "Master" => Token::Master,
        "Pages" => Token::Pages,
        "Page" => Token::Page,
        "PageContents" => Token::PageContents,
        "PageSheet" => Token::PageSheet,
        "PageProps" => Token::PageProps,
        "Shapes" => Token::Shapes,
        "Shape" => Token::Shape,
        "Text" => Token::Text,
        "cp" => Token::Cp,
        "pp" => Token::Pp,
        "tp" => Token::Tp,
        "XForm" => Token::XForm,
        "TextXForm" => Token::TextXForm,
        "Line" => Token::Line,
        "Fill" => Token::Fill,
        "TextBlock" => Token::TextBlock,
        "Char" => Token::Char,
        "Para" => Token::Para,
        "Geom" => Token::Geom,
        "Foreign" => Token::Foreign,
        "ForeignData" => Token::ForeignData,
        "Field" => Token::Field,
        "Value" => Token::Value,
        "MoveTo" => Token::MoveTo,
        "LineTo" => Token::LineTo,
        "ArcTo" => Token::ArcTo,
        "EllipticalArcTo" => Token::EllipticalArcTo,
        "Ellipse" => Token::Ellipse,
        "InfiniteLine" => Token::InfiniteLine,
        "NURBSTo" => Token::NurbsTo,
        "PolylineTo" => Token::PolylineTo,
        "SplineStart" => Token::SplineStart,
        "SplineKnot" => Token::SplineKnot,
        "RelMoveTo" => Token::RelMoveTo,
        "RelLineTo" => Token::RelLineTo,
        "RelCubBezTo" => Token::RelCubBezTo,
        "RelQuadBezTo" => Token::RelQuadBezTo,
        "RelEllipticalArcTo" => Token::RelEllipticalArcTo,
        "NoFill" => Token::NoFill,
        "NoLine" => Token::NoLine,
        "NoShow" => Token::NoShow,
        "X" => Token::X,
        "Y" => Token::Y,
        "A" => Token::A,
        "B" => Token::B,
        "C" => Token::C,
        "D" => Token::D,
        "E" => Token::E,
        "PinX" => Token::PinX,
        "PinY" => Token::PinY,
        "Width" => Token::Width,
        "Height" => Token::Height,
        "LocPinX" => Token::LocPinX,
        "LocPinY" => Token::LocPinY,
        "Angle" => Token::Angle,
        "FlipX" => Token::FlipX,
        "FlipY" => Token::FlipY,
        "TxtPinX" => Token::TxtPinX,
        "TxtPinY" => Token::TxtPinY,
        "TxtWidth" => Token::TxtWidth,
        "TxtHeight" => Token::TxtHeight,
        "TxtLocPinX" => Token::TxtLocPinX,
        "TxtLocPinY" => Token::TxtLocPinY,
        "TxtAngle" => Token::TxtAngle,
        "LineWeight" => Token::LineWeight,
        "LineColor" => Token::LineColor,
        "LinePattern" => Token::LinePattern,
        "BeginArrow" => Token::BeginArrow,
        "EndArrow" => Token::EndArrow,
        "LineCap" => Token::LineCap,
        "FillForegnd" => Token::FillForegnd,
        "FillBkgnd" => Token::FillBkgnd,
        "FillPattern" => Token::FillPattern,
        "FillForegndTrans" => Token::FillForegndTrans,
        "FillBkgndTrans" => Token::FillBkgndTrans,
        "ShdwForegnd" => Token::ShdwForegnd,
        "ShdwPattern" => Token::ShdwPattern,
        "ShapeShdwOffsetX" => Token::ShapeShdwOffsetX,
        "ShapeShdwOffsetY" => Token::ShapeShdwOffsetY,
        "LeftMargin" => Token::LeftMargin,
        "RightMargin" => Token::RightMargin,
        "TopMargin" => Token::TopMargin,
        "BottomMargin" => Token::BottomMargin,
        "VerticalAlign" => Token::VerticalAlign,
        "TextBkgnd" => Token::TextBkgnd,
        "DefaultTabStop" => Token::DefaultTabStop,
        "TextDirection" => Token::TextDirection,
        "Font" => Token::Font,
        "Color" => Token::Color,
        "Size" => Token::Size,
        "Style" => Token::FontStyle,
        "Case" => Token::Case,
        "Pos" => Token::Pos,
        "IndFirst" => Token::IndFirst,
        "IndLeft" => Token::IndLeft,
        "IndRight" => Token::IndRight,
        "SpLine" => Token::SpLine,
        "SpBefore" => Token::SpBefore,
        "SpAfter" => Token::SpAfter,
        "HorzAlign" => Token::HorzAlign,
        "Flags" => Token::Flags,
        "PageWidth" => Token::PageWidth,
        "PageHeight" => Token::PageHeight,
        "ShdwOffsetX" => Token::ShdwOffsetX,
        "ShdwOffsetY" => Token::ShdwOffsetY,
        "PageScale" => Token::PageScale,
        "DrawingScale" => Token::DrawingScale,
        "Cell" => Token::Cell,
        "Section" => Token::Section,
        "Row" => Token::Row,
        "Rel" => Token::Rel,
        "Relationship" => Token::Relationship,
        "Type" => Token::RelationshipType,
        "Target" => Token::Target,
        "ID" => Token::Id,
        "IX" => Token::Ix,
        "Del" | "del" => Token::Del,
        "N" => Token::N,
        "V" => Token::V,
        "T" => Token::T,
        "F" => Token::F,
        "Name" => Token::NameAttr,
        "NameU" => Token::NameU,
        "MasterShape" => Token::MasterShape,
        "LineStyle" => Token::LineStyle,
        "FillStyle" => Token::FillStyle,
        "TextStyle" => Token::TextStyle,
        "BackPage" => Token::BackPage,
        "Background" => Token::Background,
        "r:id" | "RelID" => Token::RelId,
        "ForeignType" => Token::ForeignType,
        "CompressionType" => Token::CompressionType,
        "RGB" => Token::Rgb,
        _ => Token::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_names() {
        assert_eq!(lookup("Shape"), Token::Shape);
        assert_eq!(lookup("NURBSTo"), Token::NurbsTo);
        assert_eq!(lookup("r:id"), Token::RelId);
        assert_eq!(lookup("NotAVisioElement"), Token::Unknown);
    }
}
