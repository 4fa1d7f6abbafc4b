// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive value types shared across the pipeline.

/// Sentinel for "unset" ids (style references, master references, parents).
pub const MINUS_ONE: u32 = u32::MAX;

/// An RGBA colour. `a` is transparency (0 = opaque), matching the wire
/// encoding of the binary format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Colour {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// CSS hex form, `#rrggbb`. Transparency travels separately as an
    /// opacity property.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A Visio affine transform: translate(−pinLoc) → flips about the local
/// origin → rotate(angle) → translate(+pin).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct XForm {
    pub pin_x: f64,
    pub pin_y: f64,
    pub width: f64,
    pub height: f64,
    pub pin_loc_x: f64,
    pub pin_loc_y: f64,
    pub angle: f64,
    pub flip_x: bool,
    pub flip_y: bool,
    /// Cached origin (`pin − pinLoc`), set for text transforms.
    pub x: f64,
    pub y: f64,
}

/// Encoding of a raw text buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextFormat {
    /// Single-byte, Windows-1252.
    #[default]
    Ansi,
    /// Single-byte, Windows-1250.
    CentralEurope,
    /// Single-byte, Windows-1251.
    Russian,
    /// Single-byte, Windows-1253.
    Greek,
    /// Single-byte, Windows-1254.
    Turkish,
    /// Single-byte, Windows-1255.
    Hebrew,
    /// Single-byte, Windows-1256.
    Arabic,
    /// Single-byte, Windows-1257.
    Baltic,
    /// Single-byte, Windows-1258.
    Vietnamese,
    /// Single-byte, Windows-874.
    Thai,
    Utf16,
    Utf8,
}

impl TextFormat {
    pub fn is_single_byte(self) -> bool {
        !matches!(self, Self::Utf16 | Self::Utf8)
    }
}

/// Raw NURBS control data referenced from geometry rows by data id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NurbsData {
    pub x_type: u8,
    pub y_type: u8,
    pub degree: u8,
    pub last_knot: f64,
    pub points: Vec<(f64, f64)>,
    pub knots: Vec<f64>,
    pub weights: Vec<f64>,
}

/// Raw polyline points referenced from geometry rows by data id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolylineData {
    pub x_type: u8,
    pub y_type: u8,
    pub points: Vec<(f64, f64)>,
}

/// Embedded-object kinds carried by foreign shapes.
pub mod foreign_kind {
    pub const BITMAP: u16 = 1;
    pub const OBJECT_OLE: u16 = 2;
    pub const ENHANCED_METAFILE: u16 = 4;
}

/// Bitmap formats carried by foreign shapes.
pub mod foreign_format {
    pub const BMP: u32 = 0;
    pub const JPEG: u32 = 1;
    pub const GIF: u32 = 2;
    pub const TIFF: u32 = 3;
    pub const PNG: u32 = 4;
    pub const BMP_ALT: u32 = 255;
}

/// An embedded raster image, metafile, or OLE blob.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ForeignData {
    pub kind: u16,
    pub format: u32,
    pub offset_x: f64,
    pub offset_y: f64,
    pub width: f64,
    pub height: f64,
    pub data: Vec<u8>,
}

/// A named constant: format-tagged raw bytes, decoded lazily.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Name {
    pub data: Vec<u8>,
    pub format: TextFormat,
}

impl Name {
    pub fn new(data: Vec<u8>, format: TextFormat) -> Self {
        Self { data, format }
    }
}

/// A font table entry: resolved face name plus the code page its text runs
/// decode through.
#[derive(Clone, Debug, PartialEq)]
pub struct Font {
    pub name: String,
    pub format: TextFormat,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            name: "Arial".to_string(),
            format: TextFormat::Ansi,
        }
    }
}
