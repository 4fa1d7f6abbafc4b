// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! VDX decoding over a pre-tokenised event stream.

use stencio::xml::Token;
use stencio::{NodeDocument, VdxParser, XmlNode};
use stencio_draw::CallRecorder;

fn scalar(token: Token, value: &str) -> Vec<XmlNode> {
    vec![
        XmlNode::start(token),
        XmlNode::text(value),
        XmlNode::end(token),
    ]
}

fn document_events() -> Vec<XmlNode> {
    let mut nodes = vec![XmlNode::start(Token::VisioDocument)];

    // Style sheet 3: a 0.05in line.
    nodes.push(XmlNode::start_with(
        Token::StyleSheet,
        vec![(Token::Id, "3".to_string())],
    ));
    nodes.push(XmlNode::start(Token::Line));
    nodes.extend(scalar(Token::LineWeight, "0.05"));
    nodes.extend(scalar(Token::LinePattern, "1"));
    nodes.push(XmlNode::end(Token::Line));
    nodes.push(XmlNode::end(Token::StyleSheet));

    nodes.push(XmlNode::start(Token::Pages));
    nodes.push(XmlNode::start_with(
        Token::Page,
        vec![(Token::Id, "0".to_string())],
    ));

    nodes.push(XmlNode::start(Token::PageSheet));
    nodes.push(XmlNode::start(Token::PageProps));
    nodes.extend(scalar(Token::PageWidth, "8.26"));
    nodes.extend(scalar(Token::PageHeight, "11.69"));
    nodes.push(XmlNode::end(Token::PageProps));
    nodes.push(XmlNode::end(Token::PageSheet));

    nodes.push(XmlNode::start(Token::Shapes));
    nodes.push(XmlNode::start_with(
        Token::Shape,
        vec![
            (Token::Id, "1".to_string()),
            (Token::LineStyle, "3".to_string()),
        ],
    ));

    nodes.push(XmlNode::start(Token::XForm));
    nodes.extend(scalar(Token::PinX, "4"));
    nodes.extend(scalar(Token::PinY, "4"));
    nodes.extend(scalar(Token::Width, "2"));
    nodes.extend(scalar(Token::Height, "2"));
    nodes.extend(scalar(Token::LocPinX, "1"));
    nodes.extend(scalar(Token::LocPinY, "1"));
    nodes.push(XmlNode::end(Token::XForm));

    nodes.push(XmlNode::start_with(
        Token::Geom,
        vec![(Token::Ix, "0".to_string())],
    ));
    nodes.push(XmlNode::start_with(
        Token::MoveTo,
        vec![(Token::Ix, "1".to_string())],
    ));
    nodes.extend(scalar(Token::X, "0"));
    nodes.extend(scalar(Token::Y, "0"));
    nodes.push(XmlNode::end(Token::MoveTo));
    nodes.push(XmlNode::start_with(
        Token::LineTo,
        vec![(Token::Ix, "2".to_string())],
    ));
    nodes.extend(scalar(Token::X, "2"));
    nodes.extend(scalar(Token::Y, "0"));
    nodes.push(XmlNode::end(Token::LineTo));
    nodes.push(XmlNode::end(Token::Geom));

    nodes.push(XmlNode::start(Token::Text));
    nodes.push(XmlNode::text("Hello\n"));
    nodes.push(XmlNode::end(Token::Text));

    nodes.push(XmlNode::end(Token::Shape));
    nodes.push(XmlNode::end(Token::Shapes));
    nodes.push(XmlNode::end(Token::Page));
    nodes.push(XmlNode::end(Token::Pages));
    nodes.push(XmlNode::end(Token::VisioDocument));
    nodes
}

#[test]
fn vdx_page_renders_path_and_text() {
    let document = NodeDocument::new(document_events());
    let mut recorder = CallRecorder::new();
    VdxParser::new(&document)
        .parse(&mut recorder)
        .expect("document parses");

    let calls = recorder.calls();
    assert_eq!(calls.first().map(String::as_str), Some("startDocument"));
    assert_eq!(calls.last().map(String::as_str), Some("endDocument"));
    assert!(
        calls
            .iter()
            .any(|c| c.starts_with("startPage") && c.contains("svg:height=11.6900in")),
        "{calls:?}"
    );

    // The style sheet's line weight reaches the stroke through the parent
    // chain referenced by the shape.
    let stroke = calls
        .iter()
        .find(|c| c.starts_with("setStyle") && c.contains("svg:stroke-width"))
        .expect("stroke style");
    assert!(stroke.contains("svg:stroke-width=0.0500in"), "{stroke}");

    // Local (0,0) lands at (3, 8.69) after the pin shift and page flip.
    let path = calls
        .iter()
        .find(|c| c.starts_with("drawPath"))
        .expect("path drawn");
    assert!(path.contains("libwpg:path-action=M svg:x=3.0000in svg:y=8.6900in"), "{path}");
    assert!(path.contains("libwpg:path-action=L svg:x=5.0000in svg:y=8.6900in"), "{path}");

    assert!(calls.iter().any(|c| c == "insertText \"Hello\""), "{calls:?}");
}

#[test]
fn deleted_cells_do_not_override() {
    // A shape whose line weight cell carries del="1" keeps the inherited
    // width from its style sheet.
    let mut nodes = vec![XmlNode::start(Token::VisioDocument)];
    nodes.push(XmlNode::start_with(
        Token::StyleSheet,
        vec![(Token::Id, "2".to_string())],
    ));
    nodes.push(XmlNode::start(Token::Line));
    nodes.extend(scalar(Token::LineWeight, "0.2"));
    nodes.extend(scalar(Token::LinePattern, "1"));
    nodes.push(XmlNode::end(Token::Line));
    nodes.push(XmlNode::end(Token::StyleSheet));

    nodes.push(XmlNode::start_with(
        Token::Page,
        vec![(Token::Id, "0".to_string())],
    ));
    nodes.push(XmlNode::start(Token::Shapes));
    nodes.push(XmlNode::start_with(
        Token::Shape,
        vec![
            (Token::Id, "1".to_string()),
            (Token::LineStyle, "2".to_string()),
        ],
    ));
    nodes.push(XmlNode::start(Token::Line));
    nodes.push(XmlNode::start_with(
        Token::LineWeight,
        vec![(Token::Del, "1".to_string())],
    ));
    nodes.push(XmlNode::text("0.9"));
    nodes.push(XmlNode::end(Token::LineWeight));
    nodes.push(XmlNode::end(Token::Line));
    nodes.push(XmlNode::start(Token::Geom));
    nodes.push(XmlNode::start(Token::MoveTo));
    nodes.extend(scalar(Token::X, "0"));
    nodes.extend(scalar(Token::Y, "0"));
    nodes.push(XmlNode::end(Token::MoveTo));
    nodes.push(XmlNode::start(Token::LineTo));
    nodes.extend(scalar(Token::X, "1"));
    nodes.extend(scalar(Token::Y, "0"));
    nodes.push(XmlNode::end(Token::LineTo));
    nodes.push(XmlNode::end(Token::Geom));
    nodes.push(XmlNode::end(Token::Shape));
    nodes.push(XmlNode::end(Token::Shapes));
    nodes.push(XmlNode::end(Token::Page));
    nodes.push(XmlNode::end(Token::VisioDocument));

    let document = NodeDocument::new(nodes);
    let mut recorder = CallRecorder::new();
    VdxParser::new(&document)
        .parse(&mut recorder)
        .expect("document parses");

    let stroke = recorder
        .calls()
        .iter()
        .find(|c| c.starts_with("setStyle") && c.contains("svg:stroke-width"))
        .cloned()
        .expect("stroke style");
    assert!(stroke.contains("svg:stroke-width=0.2000in"), "{stroke}");
}
