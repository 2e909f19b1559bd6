use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::tempdir;
use tilepdf_core::testing::{FakeDocument, FakeProvider, RecordingHost};
use tilepdf_core::{
    Destination, DestinationKind, DocumentBackend, FindOptions, Link, LinkAction, LinkTarget, LoadError,
    PixelRect, Rotation, SelectionClipboard, Size, UserRect, ViewerConfig, Viewport, Zoom,
};

const DOC: &str = "/docs/manual.pdf";

fn config(continuous: bool) -> ViewerConfig {
    ViewerConfig {
        continuous_mode: continuous,
        initial_zoom: Zoom::Percent(100.0),
        ..ViewerConfig::default()
    }
}

/// Loads `document` into an 800x600 window and shows page 1 at 100%, where one
/// point is one pixel.
fn open(document: FakeDocument, continuous: bool) -> Viewport<RecordingHost> {
    let provider = FakeProvider::new().with_document(DOC, document);
    let mut viewport = Viewport::new(
        Box::new(provider),
        RecordingHost::new(Size::new(800, 600)),
        config(continuous),
    );
    viewport.load_file(Path::new(DOC), None, None).unwrap();
    viewport.display_page(1, Zoom::Percent(100.0), Rotation::None, true, false);
    viewport
}

fn pages_of(viewport: &Viewport<RecordingHost>) -> Vec<usize> {
    viewport.cache().pages().iter().map(|entry| entry.page).collect()
}

#[test]
fn continuous_layout_clamps_scroll_to_document_end() {
    let mut viewport = open(FakeDocument::uniform(3, 600.0, 800.0), true);
    assert_eq!(viewport.layout().total_height, 2406);

    viewport.scroll_to(0, 2406);
    assert_eq!(viewport.scroll_y(), 2406 - 600);
    assert_eq!(viewport.top_page(), 3);
}

#[test]
fn scroll_position_stays_within_content() {
    let mut viewport = open(FakeDocument::uniform(4, 1200.0, 900.0), true);
    let (content_w, content_h) = (1200, 4 * 900 + 3 * 3);
    for step in [
        (5000, 0),
        (-7000, 0),
        (0, 9000),
        (0, -20000),
        (300, 1234),
    ] {
        viewport.scroll_to(viewport.scroll_x() + step.0, viewport.scroll_y() + step.1);
        assert!((0..=content_w - 800).contains(&viewport.scroll_x()));
        assert!((0..=content_h - 600).contains(&viewport.scroll_y()));
    }
}

#[test]
fn continuous_mode_keeps_pages_around_the_window() {
    let mut viewport = open(FakeDocument::uniform(10, 600.0, 800.0), true);
    assert_eq!(pages_of(&viewport), vec![1, 2]);

    viewport.scroll_to(0, 5 * 803);
    assert_eq!(viewport.top_page(), 6);
    assert_eq!(pages_of(&viewport), vec![5, 6, 7]);
    assert_eq!(viewport.host().page_changes.last(), Some(&6));
}

#[test]
fn continuous_mode_paints_gaps_between_pages() {
    let mut viewport = open(FakeDocument::uniform(3, 600.0, 800.0), true);
    let first = viewport.cache().find(1).unwrap();
    assert_eq!((first.dest_x, first.dest_y), (100, 0));

    viewport.host_mut().clear();
    viewport.scroll_to(0, 500);
    let fills = &viewport.host().fills;
    assert!(fills.contains(&PixelRect::new(0, 300, 800, 303)));
    assert!(fills.contains(&PixelRect::new(0, 0, 100, 300)));
    assert_eq!(viewport.cache().find(2).unwrap().dest_y, 303);
}

#[test]
fn coordinate_conversions_round_trip() {
    let viewport = open(FakeDocument::uniform(2, 600.0, 800.0), false);

    let (xd, yd) = viewport.user_to_device(1, 100.5, 700.25).unwrap();
    let (xu, yu) = viewport.device_to_user(1, xd, yd).unwrap();
    assert!((xu - 100.5).abs() < 1e-9 && (yu - 700.25).abs() < 1e-9);

    let (xw, yw) = viewport.device_to_window(1, 50, 60).unwrap();
    assert_eq!((xw, yw), (150, 60));
    assert_eq!(viewport.window_to_device(xw, yw), Some((1, 50, 60)));

    let (xw, yw) = viewport.user_to_window(1, 100.5, 700.25).unwrap();
    let (page, xu, yu) = viewport.window_to_user(xw, yw).unwrap();
    assert_eq!(page, 1);
    assert!((xu - 100.5).abs() <= 1.0 && (yu - 700.25).abs() <= 1.0);

    assert_eq!(viewport.window_to_device(10, 10), None);
    assert_eq!(viewport.user_to_device(2, 0.0, 0.0), None);
}

#[test]
fn history_walks_recorded_pages() {
    let mut viewport = open(FakeDocument::uniform(10, 600.0, 800.0), false);
    viewport.display_page(5, viewport.zoom(), Rotation::None, true, true);
    viewport.display_page(7, viewport.zoom(), Rotation::None, true, true);
    assert!(viewport.can_go_back());

    assert!(viewport.go_backward());
    assert_eq!(viewport.top_page(), 5);
    assert!(!viewport.go_backward());
    assert_eq!(viewport.top_page(), 5);

    assert!(viewport.go_forward());
    assert_eq!(viewport.top_page(), 7);
    assert!(!viewport.can_go_forward());
}

#[test]
fn growing_selection_redraws_only_the_moved_edge() {
    let mut viewport = open(FakeDocument::uniform(1, 600.0, 800.0), false);
    viewport.set_selection(1, PixelRect::new(10, 10, 100, 50));
    viewport.host_mut().clear();

    viewport.set_selection(1, PixelRect::new(10, 10, 150, 50));
    let invalidations = &viewport.host().invalidations;
    assert_eq!(invalidations.len(), 1);
    assert_eq!(invalidations[0], PixelRect::from_origin_size(100 + 100, 10, 51, 41));
    assert_eq!(viewport.scroll_y(), 0);

    let tile = &viewport.cache().find(1).unwrap().tiles()[0];
    assert_eq!(tile.bitmap.pixel(120, 20), Some([0x80, 0x80, 0xff, 0xff]));
    assert_eq!(tile.bitmap.pixel(5, 5), Some([0xff, 0xff, 0xff, 0xff]));
}

#[test]
fn clearing_selection_restores_tiles() {
    let mut viewport = open(FakeDocument::uniform(1, 600.0, 800.0), false);
    viewport.set_selection(1, PixelRect::new(10, 10, 100, 50));
    viewport.set_selection(0, PixelRect::default());
    let tile = &viewport.cache().find(1).unwrap().tiles()[0];
    assert_eq!(tile.bitmap.pixel(20, 20), Some([0xff, 0xff, 0xff, 0xff]));
    assert!(viewport.selection().is_none());
}

#[test]
fn selection_below_window_scrolls_it_into_view() {
    let mut viewport = open(FakeDocument::uniform(1, 600.0, 800.0), false);
    viewport.set_selection(1, PixelRect::new(10, 500, 100, 700));
    assert_eq!(viewport.scroll_y(), 100);
}

#[test]
fn selection_ending_at_window_edge_does_not_scroll() {
    let mut viewport = open(FakeDocument::uniform(1, 1000.0, 800.0), false);
    viewport.set_selection(1, PixelRect::new(700, 400, 800, 600));
    assert_eq!((viewport.scroll_x(), viewport.scroll_y()), (0, 0));

    viewport.set_selection(1, PixelRect::new(700, 400, 801, 601));
    assert_eq!((viewport.scroll_x(), viewport.scroll_y()), (1, 1));
}

#[test]
fn dragging_selects_text_and_publishes_it() {
    let document = FakeDocument::uniform(1, 600.0, 800.0).with_text(1, &["hello world"]);
    let clipboard = SelectionClipboard::new();
    let mut viewport = open(document, false).with_clipboard(clipboard.clone());

    viewport.start_selection(170, 70);
    assert!(viewport.is_selecting());
    viewport.drag_selection(190, 80);
    let text = viewport.end_selection(202, 85);
    assert_eq!(text.as_deref(), Some("hello"));
    assert_eq!(
        viewport.selection_state().rect,
        PixelRect::new(70, 70, 102, 85)
    );

    let entry = clipboard.contents().unwrap();
    assert_eq!(entry.owner, viewport.id());
    assert_eq!(entry.text, "hello");

    drop(viewport);
    assert!(clipboard.contents().is_none());
}

#[test]
fn dragging_back_past_the_anchor_flips_it() {
    let mut viewport = open(FakeDocument::uniform(1, 600.0, 800.0), false);
    viewport.start_selection(300, 100);
    viewport.drag_selection(250, 150);
    assert_eq!(
        viewport.selection_state().rect,
        PixelRect::new(150, 100, 200, 150)
    );
    viewport.drag_selection(350, 150);
    assert_eq!(
        viewport.selection_state().rect,
        PixelRect::new(200, 100, 250, 150)
    );
}

#[test]
fn search_moves_to_matching_page_and_wraps() {
    let document = FakeDocument::uniform(3, 600.0, 800.0)
        .with_text(1, &["nothing here"])
        .with_text(3, &["the needle is here"]);
    let mut viewport = open(document, false);

    assert!(viewport.find("needle", FindOptions::default()));
    assert_eq!(viewport.top_page(), 3);
    let selection = viewport.selection_state();
    assert_eq!(selection.page, 3);
    assert_eq!(selection.rect, PixelRect::new(96, 72, 132, 82));

    let next = FindOptions {
        next: true,
        ..FindOptions::default()
    };
    assert!(viewport.find("needle", next));
    assert_eq!(viewport.top_page(), 3);

    let strict = FindOptions {
        case_sensitive: true,
        ..FindOptions::default()
    };
    assert!(!viewport.find("NEEDLE", strict));
    assert!(viewport.host().busy.ends_with(&[true, false]));
}

#[test]
fn one_page_search_stays_on_page() {
    let document = FakeDocument::uniform(2, 600.0, 800.0).with_text(2, &["elsewhere"]);
    let mut viewport = open(document, false);
    let options = FindOptions {
        one_page_only: true,
        ..FindOptions::default()
    };
    assert!(!viewport.find("elsewhere", options));
    assert_eq!(viewport.top_page(), 1);
}

#[test]
fn zoom_centered_keeps_window_center() {
    let mut viewport = open(FakeDocument::uniform(1, 600.0, 800.0), false);
    viewport.zoom_centered(Zoom::Percent(200.0));
    assert_eq!(viewport.zoom(), Zoom::Percent(200.0));
    assert_eq!((viewport.scroll_x(), viewport.scroll_y()), (200, 300));
    assert_eq!(viewport.cache().first().unwrap().width, 1200);
}

#[test]
fn zoom_to_rect_fills_tighter_axis() {
    let mut viewport = open(FakeDocument::uniform(1, 600.0, 800.0), false);
    viewport.zoom_to_rect(1, UserRect::new(0.0, 500.0, 300.0, 800.0));
    match viewport.zoom() {
        Zoom::Percent(percent) => assert!((percent - 200.0).abs() < 1e-6),
        other => panic!("unexpected zoom {other:?}"),
    }
    assert!((viewport.dpi() - 144.0).abs() < 1e-6);
    assert_eq!((viewport.scroll_x(), viewport.scroll_y()), (0, 0));
}

#[test]
fn current_width_ignores_pages_above_the_top_page() {
    let document = FakeDocument::uniform(10, 600.0, 800.0).with_page_size(1, 1200.0, 800.0);
    let mut viewport = open(document, true);
    viewport.scroll_to(0, 803);
    assert_eq!(viewport.top_page(), 2);
    assert!(pages_of(&viewport).contains(&1));

    viewport.zoom_to_current_width();
    match viewport.zoom() {
        Zoom::Percent(percent) => assert!((percent - 400.0 / 3.0).abs() < 1e-6),
        other => panic!("unexpected zoom {other:?}"),
    }
}

#[test]
fn fit_width_follows_resize() {
    let mut viewport = open(FakeDocument::uniform(2, 600.0, 800.0), false);
    viewport.display_page(1, Zoom::FitWidth, Rotation::None, true, false);
    assert_eq!(viewport.cache().first().unwrap().width, 800);

    viewport.resize(400, 300);
    assert_eq!(viewport.viewport_size(), Size::new(400, 300));
    assert_eq!(viewport.cache().first().unwrap().width, 400);
}

#[test]
fn rotation_swaps_page_axes() {
    let mut viewport = open(FakeDocument::uniform(1, 600.0, 800.0), false);
    viewport.set_rotation(Rotation::Cw90);
    let entry = viewport.cache().first().unwrap();
    assert_eq!((entry.width, entry.height), (800, 600));
}

#[test]
fn single_page_scrolling_turns_pages_at_edges() {
    let mut viewport = open(FakeDocument::uniform(3, 600.0, 800.0), false);
    viewport.scroll_down_next_page(500);
    assert_eq!((viewport.top_page(), viewport.scroll_y()), (1, 200));
    viewport.scroll_down_next_page(16);
    assert_eq!((viewport.top_page(), viewport.scroll_y()), (2, 0));
    viewport.scroll_up_prev_page(16);
    assert_eq!((viewport.top_page(), viewport.scroll_y()), (1, 200));
    viewport.scroll_to_top_left();
    assert_eq!(viewport.scroll_y(), 0);
    viewport.scroll_page_up();
    assert_eq!(viewport.top_page(), 1);
}

#[test]
fn switching_to_single_page_mode_keeps_top_page() {
    let mut viewport = open(FakeDocument::uniform(5, 600.0, 800.0), true);
    viewport.goto_next_page(2, true);
    assert_eq!(viewport.top_page(), 3);
    viewport.set_continuous_mode(false);
    assert_eq!(pages_of(&viewport), vec![3]);
    assert_eq!(viewport.scroll_y(), 0);
}

#[test]
fn xyz_destination_scrolls_to_its_top() {
    let mut viewport = open(FakeDocument::uniform(3, 600.0, 800.0), true);
    viewport.display_destination(&Destination {
        page: 3,
        kind: DestinationKind::Xyz {
            left: None,
            top: Some(700.0),
        },
    });
    assert_eq!(viewport.scroll_y(), 1606 + 100);
    assert!(viewport.host().page_changes.contains(&3));
}

#[test]
fn invalid_destination_page_falls_back_to_first_page() {
    let mut viewport = open(FakeDocument::uniform(3, 600.0, 800.0), false);
    viewport.display_page(2, viewport.zoom(), Rotation::None, true, false);
    viewport.display_destination(&Destination {
        page: 42,
        kind: DestinationKind::Fit,
    });
    assert_eq!(viewport.top_page(), 1);
    assert_eq!(viewport.zoom(), Zoom::FitPage);
}

#[test]
fn links_are_hovered_and_followed() {
    let goto = Link {
        rect: UserRect::new(72.0, 700.0, 200.0, 730.0),
        action: LinkAction::GoTo(LinkTarget::Named("chapter-3".into())),
    };
    let quit = Link {
        rect: UserRect::new(300.0, 300.0, 400.0, 350.0),
        action: LinkAction::Named("Quit".into()),
    };
    let document = FakeDocument::uniform(3, 600.0, 800.0)
        .with_link(1, goto)
        .with_link(1, quit)
        .with_destination(
            "chapter-3",
            Destination {
                page: 3,
                kind: DestinationKind::Xyz {
                    left: None,
                    top: None,
                },
            },
        );
    let mut viewport = open(document, false);
    viewport.display_page(1, viewport.zoom(), Rotation::None, true, true);

    viewport.hover(200, 85);
    viewport.hover(210, 90);
    viewport.hover(110, 590);
    viewport.hover(120, 590);
    assert_eq!(
        viewport.host().hovered,
        vec!["[internal link]".to_string(), String::new()]
    );

    assert!(viewport.click(450, 470));
    assert_eq!(viewport.host().quit_requests, 1);

    assert!(viewport.click(200, 85));
    assert_eq!(viewport.top_page(), 3);
    assert!(viewport.go_backward());
    assert_eq!(viewport.top_page(), 1);
}

#[test]
fn external_links_are_handed_to_host() {
    let link = Link {
        rect: UserRect::new(0.0, 0.0, 600.0, 800.0),
        action: LinkAction::Uri("https://example.org".into()),
    };
    let mut viewport = open(FakeDocument::uniform(1, 600.0, 800.0).with_link(1, link), false);
    assert!(viewport.click(400, 300));
    assert_eq!(
        viewport.host().external,
        vec![LinkAction::Uri("https://example.org".into())]
    );
}

#[test]
fn encrypted_documents_ask_for_passwords() {
    let provider = FakeProvider::new()
        .with_document(DOC, FakeDocument::uniform(2, 600.0, 800.0).with_password("secret"));
    let mut host = RecordingHost::new(Size::new(800, 600));
    host.passwords.extend(["wrong".to_string(), "secret".to_string()]);
    let mut viewport = Viewport::new(Box::new(provider.clone()), host, config(false));

    viewport.load_file(Path::new(DOC), None, None).unwrap();
    assert_eq!(viewport.host().password_requests, 2);
    assert_eq!(viewport.page_count(), 2);

    let mut other = Viewport::new(
        Box::new(provider),
        RecordingHost::new(Size::new(800, 600)),
        config(false),
    );
    let err = other.load_file(Path::new(DOC), None, None).unwrap_err();
    assert!(matches!(err, LoadError::Encrypted));
    assert_eq!(other.host().password_requests, 1);
}

#[test]
fn missing_file_reports_not_found() {
    let dir = tempdir().unwrap();
    let mut viewport = Viewport::new(
        Box::new(FakeProvider::new()),
        RecordingHost::new(Size::new(800, 600)),
        config(false),
    );
    let err = viewport
        .load_file(&dir.path().join("absent.pdf"), None, None)
        .unwrap_err();
    assert!(matches!(err, LoadError::NotFound(_)));
    assert!(viewport.document_info().is_none());
}

#[test]
fn changed_file_is_reloaded_on_forced_update() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    fs::write(&path, "5").unwrap();

    let provider = FakeProvider::new();
    let mut viewport = Viewport::new(
        Box::new(provider.clone()),
        RecordingHost::new(Size::new(800, 600)),
        config(false),
    );
    viewport.load_file(&path, None, None).unwrap();
    viewport.display_page(5, Zoom::Percent(100.0), Rotation::None, true, false);
    assert_eq!(viewport.top_page(), 5);
    assert!(!viewport.check_for_new_file());

    fs::write(&path, "2").unwrap();
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000))
        .unwrap();

    viewport.display_page(5, Zoom::Percent(100.0), Rotation::None, true, false);
    assert_eq!(provider.open_count(), 2);
    assert_eq!(viewport.page_count(), 2);
    assert_eq!(viewport.top_page(), 2);
}

#[test]
fn documents_load_from_memory() {
    let mut viewport = Viewport::new(
        Box::new(FakeProvider::new()),
        RecordingHost::new(Size::new(800, 600)),
        config(true),
    );
    viewport.load_bytes(b"4".to_vec(), None, None).unwrap();
    assert_eq!(viewport.page_count(), 4);
    assert!(viewport.document_info().unwrap().path.is_none());
    assert!(!viewport.check_for_new_file());

    let document = viewport.take_document().unwrap();
    assert_eq!(document.page_count(), 4);
    assert_eq!(viewport.page_count(), 0);
}

#[test]
fn clear_blanks_the_window() {
    let mut viewport = open(FakeDocument::uniform(2, 600.0, 800.0), false);
    viewport.host_mut().clear();
    viewport.clear();
    assert!(viewport.cache().is_empty());
    assert_eq!(viewport.host().fills, vec![PixelRect::new(0, 0, 800, 600)]);
}

#[test]
fn panning_drags_the_page() {
    let mut viewport = open(FakeDocument::uniform(1, 600.0, 800.0), false);
    viewport.start_pan(400, 400);
    viewport.pan_to(400, 300);
    assert_eq!(viewport.scroll_y(), 100);
    viewport.end_pan();
    viewport.pan_to(400, 0);
    assert_eq!(viewport.scroll_y(), 100);
}

#[test]
fn pointer_motion_extends_drag_and_pan() {
    let mut viewport = open(FakeDocument::uniform(1, 600.0, 800.0), false);
    viewport.start_selection(300, 100);
    viewport.hover(250, 150);
    assert_eq!(
        viewport.selection_state().rect,
        PixelRect::new(150, 100, 200, 150)
    );
    viewport.end_selection(250, 150);

    viewport.start_pan(400, 400);
    viewport.hover(400, 300);
    assert_eq!(viewport.scroll_y(), 100);
    viewport.end_pan();
    assert!(viewport.host().hovered.is_empty());
}

#[test]
fn remote_link_to_the_open_file_keeps_the_document() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("notes.pdf");
    fs::write(&path, "3").unwrap();
    let document = FakeDocument::uniform(3, 600.0, 800.0).with_metadata("Notes", "A. Writer");
    let provider = FakeProvider::new().with_document(path.clone(), document);
    let mut viewport = Viewport::new(
        Box::new(provider.clone()),
        RecordingHost::new(Size::new(800, 600)),
        config(false),
    );
    viewport.load_file(&path, None, None).unwrap();
    viewport.display_page(2, Zoom::Percent(100.0), Rotation::None, true, false);
    assert_eq!(
        viewport.document_info().unwrap().display_title(),
        "Notes (A. Writer)"
    );

    viewport.perform_action(&LinkAction::GoToRemote {
        file: PathBuf::from("./notes.pdf"),
        target: None,
    });
    assert_eq!(provider.open_count(), 1);
    assert_eq!(viewport.top_page(), 1);

    viewport.perform_action(&LinkAction::GoToRemote {
        file: PathBuf::from("missing.pdf"),
        target: None,
    });
    assert_eq!(provider.open_count(), 2);
    assert_eq!(viewport.top_page(), 1);
}
