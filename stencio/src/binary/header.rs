// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Format generations, chunk headers and stream pointers of the binary
//! container.

use crate::chunks::{self, ChunkHeader};
use crate::error::{ParseError, Result};
use crate::source::Stream;

/// Binary format generations this decoder understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Version {
    /// Visio 2 (16-bit ids, no chunk trailers, inline blobs).
    V2,
    /// Visio 4/5 (16-bit ids, sub-record lists).
    V5,
    /// Visio 2000 (32-bit ids).
    V6,
    /// Visio 2003.
    V11,
}

impl Version {
    /// Reads the format version from the `VisioDocument` stream header.
    pub fn sniff(data: &[u8]) -> Result<Self> {
        let byte = *data.get(0x1a).ok_or(ParseError::EndOfStream)?;
        Self::from_byte(byte).ok_or(ParseError::UnsupportedVersion(byte))
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            2 => Some(Self::V2),
            5 => Some(Self::V5),
            6 => Some(Self::V6),
            11 => Some(Self::V11),
            _ => None,
        }
    }

    /// True for the 16-bit generations (2 and 5).
    pub(crate) fn is_legacy(self) -> bool {
        matches!(self, Self::V2 | Self::V5)
    }
}

/// One entry of a pointer/stream table.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Pointer {
    pub ptr_type: u32,
    pub offset: u32,
    pub length: u32,
    pub format: u16,
}

impl Pointer {
    pub(crate) fn is_compressed(&self) -> bool {
        self.format & 2 == 2
    }
}

pub(crate) fn read_pointer(version: Version, input: &mut Stream<'_>) -> Result<Pointer> {
    let mut ptr = Pointer::default();
    if version.is_legacy() {
        ptr.ptr_type = u32::from(input.read_u16()? & 0x00ff);
        ptr.format = input.read_u16()? & 0x00ff;
        input.skip(4);
        ptr.offset = input.read_u32()?;
        ptr.length = input.read_u32()?;
    } else {
        ptr.ptr_type = input.read_u32()?;
        input.skip(4);
        ptr.offset = input.read_u32()?;
        ptr.length = input.read_u32()?;
        ptr.format = input.read_u16()?;
    }
    Ok(ptr)
}

/// Locates a stream's pointer table and returns `(list_size, pointer_count)`
/// with the cursor positioned at the first pointer.
pub(crate) fn read_pointer_info(
    version: Version,
    input: &mut Stream<'_>,
    ptr_type: u32,
    shift: u32,
) -> Result<(u32, i32)> {
    if version.is_legacy() {
        let offset = match ptr_type {
            chunks::TRAILER_STREAM => 0x82,
            chunks::PAGE => 0x42,
            chunks::FONT_LIST => 0x2e,
            chunks::STYLES => 0x12,
            chunks::STENCILS | chunks::SHAPE_FOREIGN => 0x1e,
            chunks::STENCIL_PAGE => 0x36,
            _ if ptr_type > 0x45 => 0x1e,
            _ => 0x0a,
        };
        input.seek((shift + offset) as usize);
        let pointer_count = i32::from(input.read_i16()?);
        Ok((0, pointer_count))
    } else {
        input.seek(shift as usize);
        let offset = input.read_u32()?;
        input.seek((offset + shift - 4) as usize);
        let list_size = input.read_u32()?;
        let pointer_count = input.read_u32()? as i32;
        input.skip(4);
        Ok((list_size, pointer_count))
    }
}

/// Chunk types that always carry an 8-byte trailer in generation 6.
const V6_TRAILER_TYPES: [u32; 19] = [
    0x0d, 0x2c, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6a, 0x6b, 0x6c, 0x6d, 0x6e, 0x6f, 0x70,
    0x71, 0x72, 0x73, 0x76,
];

/// Chunk types that always carry an 8-byte trailer in generation 11.
const V11_TRAILER_TYPES: [u32; 8] = [0x2c, 0x65, 0x66, 0x69, 0x6a, 0x6b, 0x70, 0x71];

/// Chunk types that take an extra 4-byte word in generation 11 unless they
/// already carry one.
const V11_EXTRA_WORD_TYPES: [u32; 14] = [
    0x64, 0x65, 0x66, 0x69, 0x6a, 0x6b, 0x6f, 0x71, 0x92, 0xa9, 0xb4, 0xb6, 0xb9, 0xc7,
];

/// Decodes the next chunk header, skipping any run of zero padding first.
///
/// Returns `Ok(false)` at a clean end of stream. The trailer size computed
/// here is added to `data_length` to find the next chunk.
pub(crate) fn read_chunk_header(
    version: Version,
    input: &mut Stream<'_>,
    header: &mut ChunkHeader,
) -> Result<bool> {
    if version == Version::V2 {
        // Generation 2 has no chunk framing at this layer; its content is
        // dispatched per stream as inline blobs.
        return Ok(false);
    }

    let mut byte = 0u8;
    while !input.at_end() && byte == 0 {
        byte = input.read_u8()?;
    }
    if input.at_end() {
        return Ok(false);
    }
    input.seek_back(1);

    if version == Version::V5 {
        header.chunk_type = read_legacy_uint(input)?;
        header.id = read_legacy_uint(input)?;
        header.level = u32::from(input.read_u8()?);
        header.unknown = input.read_u8()?;
        header.trailer = 0;
        header.list = read_legacy_uint(input)?;
        header.data_length = input.read_u32()?;
        return Ok(true);
    }

    header.chunk_type = input.read_u32()?;
    header.id = input.read_u32()?;
    header.list = input.read_u32()?;
    header.trailer = 0;

    match version {
        Version::V6 => {
            if header.list != 0 || V6_TRAILER_TYPES.contains(&header.chunk_type) {
                header.trailer += 8;
            }
            header.data_length = input.read_u32()?;
            header.level = u32::from(input.read_u16()?);
            header.unknown = input.read_u8()?;
            // OLE data and the name index never carry a trailer.
            if header.chunk_type == 0x1f || header.chunk_type == 0xc9 {
                header.trailer = 0;
            }
        }
        Version::V11 => {
            if header.list != 0 || V11_TRAILER_TYPES.contains(&header.chunk_type) {
                header.trailer += 8;
            }
            header.data_length = input.read_u32()?;
            header.level = u32::from(input.read_u16()?);
            header.unknown = input.read_u8()?;

            // A separator word shows up under these conditions; the exact
            // pattern is folklore distilled from corpus files.
            if header.list != 0
                || (header.level == 2 && header.unknown == 0x55)
                || (header.level == 2 && header.unknown == 0x54 && header.chunk_type == 0xaa)
                || (header.level == 3 && header.unknown != 0x50 && header.unknown != 0x54)
            {
                header.trailer += 4;
            }
            if V11_EXTRA_WORD_TYPES.contains(&header.chunk_type)
                && header.trailer != 12
                && header.trailer != 4
            {
                header.trailer += 4;
            }
            // Some chunks never have a trailer.
            if matches!(header.chunk_type, 0x1f | 0xc9 | 0x2d | 0xd1) {
                header.trailer = 0;
            }
        }
        Version::V2 | Version::V5 => unreachable!("handled above"),
    }
    Ok(true)
}

/// 16-bit generations store ids as sign-extended 16-bit words, so that the
/// unset sentinel still compares equal to `MINUS_ONE`.
pub(crate) fn read_legacy_uint(input: &mut Stream<'_>) -> Result<u32> {
    Ok(i32::from(input.read_i16()?) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes_v11(chunk_type: u32, id: u32, list: u32, len: u32, level: u16, unknown: u8) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&chunk_type.to_le_bytes());
        bytes.extend_from_slice(&id.to_le_bytes());
        bytes.extend_from_slice(&list.to_le_bytes());
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(&level.to_le_bytes());
        bytes.push(unknown);
        bytes
    }

    #[test]
    fn v11_list_chunk_gets_both_trailers() {
        // A list chunk: 8-byte trailer plus the separator word.
        let bytes = header_bytes_v11(chunks::GEOM_LIST, 1, 1, 0x10, 2, 0x55);
        let mut input = Stream::new(&bytes);
        let mut header = ChunkHeader::default();
        assert!(read_chunk_header(Version::V11, &mut input, &mut header).unwrap());
        assert_eq!(header.trailer, 12);
    }

    #[test]
    fn v11_no_trailer_set_wins() {
        let bytes = header_bytes_v11(chunks::SHAPE_DATA, 1, 0, 0x10, 3, 0x00);
        let mut input = Stream::new(&bytes);
        let mut header = ChunkHeader::default();
        assert!(read_chunk_header(Version::V11, &mut input, &mut header).unwrap());
        assert_eq!(header.trailer, 0);
    }

    #[test]
    fn v11_level_three_separator() {
        let bytes = header_bytes_v11(chunks::LINE, 1, 0, 0x10, 3, 0x00);
        let mut input = Stream::new(&bytes);
        let mut header = ChunkHeader::default();
        assert!(read_chunk_header(Version::V11, &mut input, &mut header).unwrap());
        assert_eq!(header.trailer, 4);
    }

    #[test]
    fn v6_always_trailer_type() {
        let bytes = header_bytes_v11(chunks::GEOM_LIST, 1, 0, 0x10, 2, 0x00);
        let mut input = Stream::new(&bytes);
        let mut header = ChunkHeader::default();
        assert!(read_chunk_header(Version::V6, &mut input, &mut header).unwrap());
        assert_eq!(header.trailer, 8);
    }

    #[test]
    fn zero_padding_is_skipped() {
        let mut bytes = vec![0u8; 5];
        bytes.extend(header_bytes_v11(chunks::LINE, 2, 0, 0x20, 2, 0x00));
        let mut input = Stream::new(&bytes);
        let mut header = ChunkHeader::default();
        assert!(read_chunk_header(Version::V6, &mut input, &mut header).unwrap());
        assert_eq!(header.chunk_type, chunks::LINE);
        assert_eq!(header.id, 2);
        assert_eq!(header.data_length, 0x20);
    }

    #[test]
    fn v5_header_layout() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(chunks::LINE as u16).to_le_bytes());
        bytes.extend_from_slice(&0xffffu16.to_le_bytes()); // id = -1
        bytes.push(2); // level
        bytes.push(0); // unknown
        bytes.extend_from_slice(&0u16.to_le_bytes()); // list
        bytes.extend_from_slice(&0x18u32.to_le_bytes());
        let mut input = Stream::new(&bytes);
        let mut header = ChunkHeader::default();
        assert!(read_chunk_header(Version::V5, &mut input, &mut header).unwrap());
        assert_eq!(header.chunk_type, chunks::LINE);
        assert_eq!(header.id, crate::types::MINUS_ONE);
        assert_eq!(header.level, 2);
        assert_eq!(header.trailer, 0);
        assert_eq!(header.data_length, 0x18);
    }
}
