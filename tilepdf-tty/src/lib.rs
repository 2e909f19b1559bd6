//! Terminal front end: a [`tilepdf_core::Host`] that composes the viewport
//! into a frame, kitty graphics output and crossterm input mapping.

use std::io::{self, Write};

mod host;
mod input;
mod kitty;

pub use host::{StatusInfo, TerminalHost};
pub use input::{EventMapper, InputMode, PointerAction, UiEvent, ViewerCommand};
pub use kitty::{DrawParams, KittyRenderer};

pub fn write_status_line<W: Write>(writer: &mut W, label: &str) -> io::Result<()> {
    writer.write_all(label.as_bytes())?;
    writer.flush()
}

/// Status line text: title and position, busy marker, hovered link and the
/// input typed so far.
pub fn format_status(status: &StatusInfo, page_count: usize, pending: Option<&str>) -> String {
    let mut parts = Vec::with_capacity(4);
    if status.title.is_empty() {
        parts.push("[no document]".to_string());
    } else {
        parts.push(format!("{} {}/{}", status.title, status.page, page_count));
    }
    if status.busy {
        parts.push("[busy]".to_string());
    }
    if let Some(link) = &status.hovered_link {
        parts.push(format!("-> {link}"));
    }
    if let Some(pending) = pending.filter(|p| !p.is_empty()) {
        parts.push(pending.to_string());
    }
    parts.join("  ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_shows_position_link_and_pending_input() {
        let status = StatusInfo {
            title: "paper.pdf".into(),
            page: 3,
            busy: false,
            hovered_link: Some("https://example.org".into()),
        };
        assert_eq!(
            format_status(&status, 12, Some("4")),
            "paper.pdf 3/12  -> https://example.org  4"
        );
    }

    #[test]
    fn status_without_document() {
        let status = StatusInfo {
            busy: true,
            ..StatusInfo::default()
        };
        assert_eq!(format_status(&status, 0, Some("")), "[no document]  [busy]");
    }

    #[test]
    fn status_line_is_written_and_flushed() {
        let mut out = Vec::new();
        write_status_line(&mut out, "a.pdf 1/2").unwrap();
        assert_eq!(out, b"a.pdf 1/2");
    }
}
