// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pipeline scenarios: the same event stream through both collection passes,
//! checked against the recorded paint calls.

use stencio::{
    Collector, ContentCollector, OptionalFillStyle, OptionalLineStyle, Shape, Stencil, Stencils,
    StylesCollector, TextFormat, XForm, MINUS_ONE,
};
use stencio_draw::CallRecorder;

/// Runs the two-pass pipeline over a scripted event stream.
fn run_pipeline(stencils: Stencils, events: impl Fn(&mut dyn Collector)) -> CallRecorder {
    let mut styles = StylesCollector::new();
    events(&mut styles);
    let layout = styles.into_layout();

    let mut recorder = CallRecorder::new();
    let mut content = ContentCollector::new(&mut recorder, layout, stencils);
    events(&mut content);
    recorder
}

fn page_events(collector: &mut dyn Collector, width: f64, height: f64) {
    collector.start_page(0);
    collector.collect_page_sheet(0, 2);
    collector.collect_page_props(0, 2, width, height, 0.0, 0.0, 1.0);
    collector.collect_page(0, 2, MINUS_ONE, false, "");
}

fn square_xform() -> XForm {
    XForm {
        pin_x: 4.0,
        pin_y: 4.0,
        width: 2.0,
        height: 2.0,
        pin_loc_x: 1.0,
        pin_loc_y: 1.0,
        ..XForm::default()
    }
}

/// Asserts that every `start*`/`open*` has its matching close in LIFO order.
fn assert_bracketed(recorder: &CallRecorder) {
    let mut stack: Vec<&str> = Vec::new();
    for name in recorder.call_names() {
        match name {
            "startDocument" | "startPage" | "startLayer" | "startTextObject" | "openParagraph"
            | "openSpan" => stack.push(name),
            "endDocument" | "endPage" | "endLayer" | "endTextObject" | "closeParagraph"
            | "closeSpan" => {
                let open = stack.pop().expect("close without matching open");
                let expected = match name {
                    "endDocument" => "startDocument",
                    "endPage" => "startPage",
                    "endLayer" => "startLayer",
                    "endTextObject" => "startTextObject",
                    "closeParagraph" => "openParagraph",
                    _ => "openSpan",
                };
                assert_eq!(open, expected, "mismatched bracketing");
            }
            _ => {}
        }
    }
    assert!(stack.is_empty(), "unclosed paint calls: {stack:?}");
}

#[test]
fn empty_page_emits_only_document_brackets() {
    let recorder = run_pipeline(Stencils::new(), |collector| {
        page_events(collector, 8.26, 11.69);
        collector.end_page();
        collector.end_pages();
    });

    let calls: Vec<&str> = recorder.calls().iter().map(String::as_str).collect();
    assert_eq!(
        calls,
        vec![
            "startDocument",
            "startPage svg:height=11.6900in svg:width=8.2600in",
            "endPage",
            "endDocument",
        ]
    );
}

#[test]
fn square_shape_renders_fill_and_stroke_paths() {
    let recorder = run_pipeline(Stencils::new(), |collector| {
        page_events(collector, 8.26, 11.69);
        collector.collect_shape_id(0, 5, 1);
        collector.collect_shape(1, 3, 0, MINUS_ONE, MINUS_ONE, MINUS_ONE, MINUS_ONE, MINUS_ONE);
        collector.collect_xform(4, &square_xform());
        collector.collect_line(
            4,
            &OptionalLineStyle {
                width: Some(0.01),
                ..Default::default()
            },
        );
        collector.collect_fill_and_shadow(
            4,
            &OptionalFillStyle {
                fg_colour: Some(stencio::Colour::new(0xff, 0, 0, 0)),
                pattern: Some(1),
                ..Default::default()
            },
        );
        collector.collect_geometry(0, 5, false, false, false);
        collector.collect_move_to(1, 5, 0.0, 0.0);
        collector.collect_line_to(2, 5, 2.0, 0.0);
        collector.collect_line_to(3, 5, 2.0, 2.0);
        collector.collect_line_to(4, 5, 0.0, 2.0);
        collector.end_page();
        collector.end_pages();
    });

    assert_bracketed(&recorder);
    let calls = recorder.calls();

    // Local (0,0) maps through pin −pinLoc to (3,3), then flips against the
    // page height.
    let fill_path = calls
        .iter()
        .find(|c| c.starts_with("drawPath") && c.contains("M"))
        .expect("a path was drawn");
    assert!(fill_path.contains("libwpg:path-action=M svg:x=3.0000in svg:y=8.6900in"));
    assert!(fill_path.contains("libwpg:path-action=L svg:x=5.0000in svg:y=8.6900in"));
    assert!(fill_path.contains("libwpg:path-action=L svg:x=5.0000in svg:y=6.6900in"));
    assert!(fill_path.contains("libwpg:path-action=L svg:x=3.0000in svg:y=6.6900in"));
    // The fill sub-path closes automatically.
    assert!(fill_path.contains("libwpg:path-action=Z"));

    let style = calls
        .iter()
        .find(|c| c.starts_with("setStyle") && c.contains("draw:fill-color"))
        .expect("fill style was set");
    assert!(style.contains("draw:fill-color=#ff0000"));
    assert!(style.contains("draw:fill=solid"));

    let stroke_style = calls
        .iter()
        .find(|c| c.starts_with("setStyle") && c.contains("svg:stroke-width"))
        .expect("stroke style was set");
    assert!(stroke_style.contains("svg:stroke-width=0.0100in"));

    // Fill and stroke both present: the two paths render inside one layer.
    assert_eq!(recorder.call_names().iter().filter(|n| **n == "startLayer").count(), 1);
    assert_eq!(recorder.call_names().iter().filter(|n| **n == "drawPath").count(), 2);
}

#[test]
fn arc_with_zero_bow_collapses_to_line() {
    let events = |with_arc: bool| {
        move |collector: &mut dyn Collector| {
            page_events(collector, 8.0, 8.0);
            collector.collect_shape_id(0, 5, 1);
            collector.collect_shape(1, 3, 0, MINUS_ONE, MINUS_ONE, MINUS_ONE, MINUS_ONE, MINUS_ONE);
            collector.collect_xform(4, &XForm::default());
            collector.collect_geometry(0, 5, false, false, false);
            collector.collect_move_to(1, 5, 0.0, 0.0);
            if with_arc {
                collector.collect_arc_to(2, 5, 1.0, 0.0, 0.0);
            } else {
                collector.collect_line_to(2, 5, 1.0, 0.0);
            }
            collector.end_page();
            collector.end_pages();
        }
    };

    let with_arc = run_pipeline(Stencils::new(), events(true));
    let with_line = run_pipeline(Stencils::new(), events(false));
    assert_eq!(with_arc.calls(), with_line.calls());
}

#[test]
fn text_object_carries_rotation_and_span() {
    let recorder = run_pipeline(Stencils::new(), |collector| {
        page_events(collector, 8.0, 8.0);
        collector.collect_shape_id(0, 5, 1);
        collector.collect_shape(1, 3, 0, MINUS_ONE, MINUS_ONE, MINUS_ONE, MINUS_ONE, MINUS_ONE);
        let xform = XForm {
            width: 2.0,
            height: 1.0,
            angle: core::f64::consts::FRAC_PI_2,
            flip_x: true,
            ..XForm::default()
        };
        collector.collect_xform(4, &xform);
        collector.collect_text(4, b"Hi\n", TextFormat::Ansi);
        collector.end_page();
        collector.end_pages();
    });

    assert_bracketed(&recorder);
    let calls = recorder.calls();

    let text_object = calls
        .iter()
        .find(|c| c.starts_with("startTextObject"))
        .expect("text object opened");
    // flip X across a 90° rotation lands the frame at −90°.
    assert!(text_object.contains("libwpg:rotate=-90.0000"), "{text_object}");

    assert!(calls.iter().any(|c| c == "insertText \"Hi\""), "{calls:?}");
    assert_eq!(
        recorder.call_names().iter().filter(|n| **n == "openSpan").count(),
        1
    );
}

#[test]
fn stencil_geometry_is_inherited_without_mutation() {
    let mut master = Shape::new();
    master.shape_id = 5;
    {
        let list = master.geometries.entry(0).or_default();
        list.add(0, 5, stencio::GeometryElement::Geometry {
            no_fill: false,
            no_line: true,
            no_show: false,
        });
        list.add(1, 5, stencio::GeometryElement::MoveTo { x: 0.0, y: 0.0 });
        list.add(2, 5, stencio::GeometryElement::LineTo { x: 1.0, y: 1.0 });
    }
    master.fill_style.fg_colour = Some(stencio::Colour::new(0, 0xff, 0, 0));
    master.fill_style.pattern = Some(1);

    let mut stencil = Stencil::new();
    stencil.add_shape(5, master);
    let mut stencils = Stencils::new();
    stencils.add_stencil(9, stencil);
    let pristine = stencils.clone();

    let recorder = run_pipeline(stencils.clone(), |collector| {
        page_events(collector, 8.0, 8.0);
        collector.collect_shape_id(0, 5, 1);
        collector.collect_shape_id(1, 5, 2);
        // Shape 1 overrides the fill colour; the path comes from the master.
        collector.collect_shape(1, 3, 0, 9, 5, MINUS_ONE, MINUS_ONE, MINUS_ONE);
        collector.collect_xform(4, &XForm::default());
        collector.collect_fill_and_shadow(
            4,
            &OptionalFillStyle {
                fg_colour: Some(stencio::Colour::new(0, 0, 0xff, 0)),
                ..Default::default()
            },
        );
        // Shape 2 shares the master untouched.
        collector.collect_shape(2, 3, 0, 9, 5, MINUS_ONE, MINUS_ONE, MINUS_ONE);
        collector.collect_xform(4, &XForm::default());
        collector.end_page();
        collector.end_pages();
    });

    assert_bracketed(&recorder);
    let calls = recorder.calls();
    assert_eq!(
        calls.iter().filter(|c| c.starts_with("drawPath")).count(),
        2,
        "both instances draw the master geometry: {calls:?}"
    );
    assert!(
        calls
            .iter()
            .any(|c| c.starts_with("setStyle") && c.contains("draw:fill-color=#0000ff")),
        "local fill colour wins on the overriding instance: {calls:?}"
    );
    assert!(
        calls
            .iter()
            .any(|c| c.starts_with("setStyle") && c.contains("draw:fill-color=#00ff00")),
        "the sibling instance stays master-identical: {calls:?}"
    );

    // The registry is untouched by rendering.
    let before = pristine.shape(9, 5).expect("master present");
    let after = stencils.shape(9, 5).expect("master present");
    assert_eq!(before, after);
}

#[test]
fn nested_group_text_is_deferred_to_group_end() {
    let recorder = run_pipeline(Stencils::new(), |collector| {
        page_events(collector, 8.0, 8.0);
        collector.collect_shape_id(0, 5, 1);
        // Group 1 with text "outer" and its own geometry.
        collector.collect_shape(1, 3, 0, MINUS_ONE, MINUS_ONE, MINUS_ONE, MINUS_ONE, MINUS_ONE);
        collector.collect_xform(4, &XForm { width: 4.0, height: 4.0, ..XForm::default() });
        collector.collect_geometry(0, 5, false, false, false);
        collector.collect_move_to(1, 5, 0.0, 0.0);
        collector.collect_line_to(2, 5, 4.0, 0.0);
        collector.collect_text(4, b"outer\n", TextFormat::Ansi);
        // Child 2 spliced in after its group.
        collector.collect_shape_id(0, 5, 2);
        collector.collect_shape(2, 3, 1, MINUS_ONE, MINUS_ONE, MINUS_ONE, MINUS_ONE, MINUS_ONE);
        collector.collect_xform(4, &XForm { width: 1.0, height: 1.0, ..XForm::default() });
        collector.collect_geometry(0, 5, false, false, false);
        collector.collect_move_to(1, 5, 0.0, 0.0);
        collector.collect_line_to(2, 5, 1.0, 0.0);
        collector.collect_text(4, b"inner\n", TextFormat::Ansi);
        collector.end_page();
        collector.end_pages();
    });

    assert_bracketed(&recorder);

    let calls = recorder.calls();
    let first_path = calls.iter().position(|c| c.starts_with("drawPath")).unwrap();
    let last_path = calls.iter().rposition(|c| c.starts_with("drawPath")).unwrap();
    let inner_text = calls.iter().position(|c| c == "insertText \"inner\"").unwrap();
    let outer_text = calls.iter().position(|c| c == "insertText \"outer\"").unwrap();

    assert!(first_path < last_path);
    assert!(last_path < inner_text, "all graphics precede all text");
    assert!(inner_text < outer_text, "child text drains before group text");
}

#[test]
fn char_runs_split_across_paragraph_boundaries() {
    let recorder = run_pipeline(Stencils::new(), |collector| {
        page_events(collector, 8.0, 8.0);
        collector.collect_shape_id(0, 5, 1);
        collector.collect_shape(1, 3, 0, MINUS_ONE, MINUS_ONE, MINUS_ONE, MINUS_ONE, MINUS_ONE);
        collector.collect_xform(4, &XForm { width: 2.0, height: 2.0, ..XForm::default() });
        collector.collect_text(4, b"ab\ncd\n", TextFormat::Ansi);
        // One char run spanning both paragraphs; two paragraph runs.
        collector.collect_char_ix(
            0,
            5,
            &stencio::OptionalCharStyle {
                char_count: Some(0),
                bold: Some(true),
                ..Default::default()
            },
        );
        collector.collect_para_ix(
            0,
            5,
            &stencio::OptionalParaStyle {
                char_count: Some(3),
                ..Default::default()
            },
        );
        collector.collect_para_ix(
            1,
            5,
            &stencio::OptionalParaStyle {
                char_count: Some(0),
                ..Default::default()
            },
        );
        collector.end_page();
        collector.end_pages();
    });

    assert_bracketed(&recorder);
    let names = recorder.call_names();
    assert_eq!(names.iter().filter(|n| **n == "openParagraph").count(), 2);
    // The bold run was cloned at the boundary: one span per paragraph.
    assert_eq!(names.iter().filter(|n| **n == "openSpan").count(), 2);
    let calls = recorder.calls();
    assert!(calls.iter().any(|c| c == "insertText \"ab\""), "{calls:?}");
    assert!(calls.iter().any(|c| c == "insertText \"cd\""), "{calls:?}");
}

#[test]
fn background_pages_paint_beneath_and_after() {
    let recorder = run_pipeline(Stencils::new(), |collector| {
        // Background page 7.
        collector.start_page(7);
        collector.collect_page_sheet(7, 2);
        collector.collect_page_props(7, 2, 8.0, 8.0, 0.0, 0.0, 1.0);
        collector.collect_page(7, 2, MINUS_ONE, true, "bg");
        collector.collect_shape_id(0, 5, 1);
        collector.collect_shape(1, 3, 0, MINUS_ONE, MINUS_ONE, MINUS_ONE, MINUS_ONE, MINUS_ONE);
        collector.collect_xform(4, &XForm::default());
        collector.collect_geometry(0, 5, false, false, false);
        collector.collect_move_to(1, 5, 0.0, 0.0);
        collector.collect_line_to(2, 5, 1.0, 0.0);
        collector.end_page();
        // Foreground page referencing it.
        collector.start_page(1);
        collector.collect_page_sheet(1, 2);
        collector.collect_page_props(1, 2, 8.0, 8.0, 0.0, 0.0, 1.0);
        collector.collect_page(1, 2, 7, false, "fg");
        collector.end_page();
        collector.end_pages();
    });

    assert_bracketed(&recorder);
    // Two pages painted: the foreground page (with the background's path
    // beneath it) and the background page's own tab.
    assert_eq!(
        recorder.call_names().iter().filter(|n| **n == "startPage").count(),
        2
    );
    assert_eq!(
        recorder.call_names().iter().filter(|n| **n == "drawPath").count(),
        2
    );
}
