// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end decode of a synthesised generation-11 `VisioDocument` stream:
//! a colour table, one page, one filled square.

use stencio::{ParseError, VsdParser};
use stencio_draw::CallRecorder;

const UNKNOWN: u8 = 0x50;

fn push_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_f64_cell(out: &mut Vec<u8>, v: f64) {
    out.push(0); // unit byte
    out.extend_from_slice(&v.to_le_bytes());
}

/// The v11 trailer rule for the chunks this builder emits. The `0x50`
/// unknown byte defeats the level-based separator conditions, leaving the
/// list flag and the always-trailer type tables.
fn v11_trailer(chunk_type: u32, list: u32) -> usize {
    let mut trailer = 0;
    if list != 0 || [0x2c, 0x65, 0x66, 0x69, 0x6a, 0x6b, 0x70, 0x71].contains(&chunk_type) {
        trailer += 8;
    }
    if list != 0 {
        trailer += 4;
    }
    if [
        0x64, 0x65, 0x66, 0x69, 0x6a, 0x6b, 0x6f, 0x71, 0x92, 0xa9, 0xb4, 0xb6, 0xb9, 0xc7,
    ]
    .contains(&chunk_type)
        && trailer != 12
        && trailer != 4
    {
        trailer += 4;
    }
    if [0x1f, 0xc9, 0x2d, 0xd1].contains(&chunk_type) {
        trailer = 0;
    }
    trailer
}

fn push_chunk(out: &mut Vec<u8>, chunk_type: u32, id: u32, list: u32, level: u16, data: &[u8]) {
    push_u32(out, chunk_type);
    push_u32(out, id);
    push_u32(out, list);
    push_u32(out, data.len() as u32);
    push_u16(out, level);
    out.push(UNKNOWN);
    out.extend_from_slice(data);
    out.extend(std::iter::repeat(0u8).take(v11_trailer(chunk_type, list)));
}

/// An 18-byte stream pointer.
fn push_pointer(out: &mut Vec<u8>, ptr_type: u32, offset: u32, length: u32, format: u16) {
    push_u32(out, ptr_type);
    push_u32(out, 0);
    push_u32(out, offset);
    push_u32(out, length);
    push_u16(out, format);
}

fn page_stream() -> Vec<u8> {
    let mut chunks = Vec::new();

    // Page properties: 8.26 × 11.69 in, no shadow, scale 1.
    let mut props = Vec::new();
    push_f64_cell(&mut props, 8.26);
    push_f64_cell(&mut props, 11.69);
    push_f64_cell(&mut props, 0.0);
    push_f64_cell(&mut props, 0.0);
    push_f64_cell(&mut props, 1.0);
    push_f64_cell(&mut props, 1.0);
    push_chunk(&mut chunks, 0x92, 0, 0, 0, &props);

    // Page record: no background page.
    let mut page = vec![0u8; 8];
    push_u32(&mut page, u32::MAX);
    push_chunk(&mut chunks, 0x15, 0, 0, 0, &page);

    push_chunk(&mut chunks, 0x46, 0, 0, 1, &[]); // page sheet

    // Shape list with one child, id 1.
    let mut shape_list = Vec::new();
    push_u32(&mut shape_list, 0);
    push_u32(&mut shape_list, 4);
    push_u32(&mut shape_list, 1);
    push_chunk(&mut chunks, 0x65, 0, 1, 2, &shape_list);
    let mut shape_id = Vec::new();
    push_u32(&mut shape_id, 1);
    push_chunk(&mut chunks, 0x83, 0, 0, 3, &shape_id);

    // The shape record: no master, all style references unset.
    let mut shape = vec![0u8; 0x12];
    for _ in 0..5 {
        push_u32(&mut shape, u32::MAX);
        push_u32(&mut shape, 0);
    }
    shape.truncate(0x12 + 4 * 9);
    push_chunk(&mut chunks, 0x48, 1, 0, 2, &shape);

    // Transform: pin (4,4), size 2×2, local pin (1,1).
    let mut xform = Vec::new();
    push_f64_cell(&mut xform, 4.0);
    push_f64_cell(&mut xform, 4.0);
    push_f64_cell(&mut xform, 2.0);
    push_f64_cell(&mut xform, 2.0);
    push_f64_cell(&mut xform, 1.0);
    push_f64_cell(&mut xform, 1.0);
    push_f64_cell(&mut xform, 0.0);
    xform.push(0);
    xform.push(0);
    push_chunk(&mut chunks, 0x9b, 0, 0, 3, &xform);

    // Line: width 0.01, black, solid.
    let mut line = Vec::new();
    line.push(0);
    line.extend_from_slice(&0.01f64.to_le_bytes());
    line.push(0);
    line.extend_from_slice(&[0, 0, 0, 0]); // colour
    line.push(1); // pattern
    line.extend_from_slice(&[0u8; 10]);
    line.extend_from_slice(&[0, 0, 0]); // markers, cap
    push_chunk(&mut chunks, 0x85, 0, 0, 3, &line);

    // Fill: foreground colour index 1 (red), solid.
    let mut fill = Vec::new();
    fill.push(1); // fg index
    fill.extend_from_slice(&[0u8; 3]);
    fill.push(0); // fg transparency
    fill.push(0); // bg index
    fill.extend_from_slice(&[0u8; 3]);
    fill.push(0); // bg transparency
    fill.push(1); // pattern
    fill.push(0);
    fill.extend_from_slice(&[0, 0, 0, 0]); // shadow fg colour
    fill.extend_from_slice(&[0u8; 5]);
    fill.push(0); // shadow pattern
    fill.extend_from_slice(&[0, 0]);
    fill.extend_from_slice(&0.0f64.to_le_bytes());
    fill.push(0);
    fill.extend_from_slice(&0.0f64.to_le_bytes());
    push_chunk(&mut chunks, 0x86, 0, 0, 3, &fill);

    // Geometry list with five rows.
    let mut geom_list = Vec::new();
    push_u32(&mut geom_list, 0);
    push_u32(&mut geom_list, 20);
    for id in 0..5 {
        push_u32(&mut geom_list, id);
    }
    push_chunk(&mut chunks, 0x6c, 0, 1, 3, &geom_list);

    push_chunk(&mut chunks, 0x89, 0, 0, 4, &[0]); // flags: fill + line

    let mut row = Vec::new();
    push_f64_cell(&mut row, 0.0);
    push_f64_cell(&mut row, 0.0);
    push_chunk(&mut chunks, 0x8a, 1, 0, 4, &row);
    for (id, (x, y)) in [(2.0, 0.0), (2.0, 2.0), (0.0, 2.0)].iter().enumerate() {
        let mut row = Vec::new();
        push_f64_cell(&mut row, *x);
        push_f64_cell(&mut row, *y);
        push_chunk(&mut chunks, 0x8b, id as u32 + 2, 0, 4, &row);
    }

    chunks
}

fn colors_stream() -> Vec<u8> {
    let mut out = Vec::new();
    push_u32(&mut out, 12); // blob length prefix
    out.extend_from_slice(&[0, 0]);
    out.push(2); // two colours
    out.push(0);
    out.extend_from_slice(&[0, 0, 0, 0]); // 0: black
    out.extend_from_slice(&[0xff, 0, 0, 0]); // 1: red
    out
}

fn build_document() -> Vec<u8> {
    let mut doc = Vec::new();
    doc.extend_from_slice(b"Visio (TM) Drawing\r\n");
    doc.resize(0x1a, 0);
    doc.push(11);
    doc.resize(0x36, 0);

    let colors = colors_stream();
    let colors_offset = doc.len() as u32;
    doc.extend_from_slice(&colors);

    let page = page_stream();
    let page_offset = doc.len() as u32;
    doc.extend_from_slice(&page);

    // The pages stream: its own pointer table referencing the page stream.
    let mut pages = Vec::new();
    push_u32(&mut pages, 8); // pointer info offset (doubles as blob length)
    push_u32(&mut pages, 0); // list size (read at offset - 4)
    push_u32(&mut pages, 1); // pointer count
    push_u32(&mut pages, 0);
    push_pointer(&mut pages, 0x15, page_offset, page.len() as u32, 0x00d0);
    let pages_offset = doc.len() as u32;
    doc.extend_from_slice(&pages);

    // The trailer stream: colours first, then pages.
    let mut trailer = Vec::new();
    push_u32(&mut trailer, 0);
    push_u32(&mut trailer, 8); // pointer info offset (shift-relative)
    push_u32(&mut trailer, 0); // list size
    push_u32(&mut trailer, 2); // pointer count
    push_u32(&mut trailer, 0);
    push_pointer(&mut trailer, 0x16, colors_offset, colors.len() as u32, 0x0040);
    push_pointer(&mut trailer, 0x27, pages_offset, pages.len() as u32, 0x0050);
    let trailer_offset = doc.len() as u32;
    doc.extend_from_slice(&trailer);

    doc[0x2c..0x30].copy_from_slice(&trailer_offset.to_le_bytes());
    doc[0x30..0x34].copy_from_slice(&(trailer.len() as u32).to_le_bytes());
    doc[0x34..0x36].copy_from_slice(&0u16.to_le_bytes());
    doc
}

#[test]
fn decodes_a_square_from_a_generation_11_stream() {
    let doc = build_document();
    let mut recorder = CallRecorder::new();
    VsdParser::new(&doc)
        .expect("version 11 is supported")
        .parse(&mut recorder)
        .expect("document parses");

    let calls = recorder.calls();
    assert_eq!(calls.first().map(String::as_str), Some("startDocument"));
    assert_eq!(calls.last().map(String::as_str), Some("endDocument"));
    assert!(
        calls
            .iter()
            .any(|c| c.starts_with("startPage") && c.contains("svg:width=8.2600in")),
        "{calls:?}"
    );

    let fill_style = calls
        .iter()
        .find(|c| c.starts_with("setStyle") && c.contains("draw:fill-color"))
        .expect("fill style");
    assert!(fill_style.contains("draw:fill-color=#ff0000"), "{fill_style}");

    let path = calls
        .iter()
        .find(|c| c.starts_with("drawPath"))
        .expect("path drawn");
    assert!(path.contains("libwpg:path-action=M svg:x=3.0000in svg:y=8.6900in"), "{path}");
    assert!(path.contains("libwpg:path-action=L svg:x=5.0000in svg:y=8.6900in"), "{path}");
    assert!(path.contains("libwpg:path-action=L svg:x=5.0000in svg:y=6.6900in"), "{path}");
    assert!(path.contains("libwpg:path-action=L svg:x=3.0000in svg:y=6.6900in"), "{path}");
    assert!(path.contains("libwpg:path-action=Z"), "{path}");

    // Stroke renders as its own path after the fill.
    assert_eq!(calls.iter().filter(|c| c.starts_with("drawPath")).count(), 2);
}

#[test]
fn unsupported_version_is_rejected_up_front() {
    let mut doc = build_document();
    doc[0x1a] = 7;
    assert!(matches!(
        VsdParser::new(&doc),
        Err(ParseError::UnsupportedVersion(7))
    ));
}
