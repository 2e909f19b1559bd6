use tracing::{debug, instrument, warn};

use crate::backend::{Link, LinkAction, LinkTarget};
use crate::host::Host;
use crate::viewport::Viewport;

impl<H: Host> Viewport<H> {
    /// Topmost link of `page` containing a user-space point. Later links in
    /// the page's link table sit above earlier ones.
    pub fn find_link(&mut self, page: usize, xu: f64, yu: f64) -> Option<Link> {
        let document = self.document.as_deref()?;
        let entry = self.cache.find_mut(page)?;
        entry
            .links(document)
            .iter()
            .rev()
            .find(|link| link.rect.contains(xu, yu))
            .cloned()
    }

    pub fn link_at(&mut self, xw: i32, yw: i32) -> Option<Link> {
        let (page, xu, yu) = self.window_to_user(xw, yw)?;
        self.find_link(page, xu, yu)
    }

    /// Pointer motion. Extends a selection drag or a pan in progress;
    /// otherwise tells the host when the link under the pointer changes.
    /// Leaving a link reports an empty description.
    pub fn hover(&mut self, xw: i32, yw: i32) {
        if self.selection.dragging {
            self.drag_selection(xw, yw);
            return;
        }
        if self.pan_anchor.is_some() {
            self.pan_to(xw, yw);
            return;
        }
        let description = self.link_at(xw, yw).map(|link| link.action.describe());
        if description != self.hovered_link {
            self.host.link_hovered(description.as_deref().unwrap_or(""));
            self.hovered_link = description;
        }
    }

    /// Follows the link under a window position, if there is one.
    pub fn click(&mut self, xw: i32, yw: i32) -> bool {
        match self.link_at(xw, yw) {
            Some(link) => {
                self.follow_link(&link);
                true
            }
            None => false,
        }
    }

    pub fn follow_link(&mut self, link: &Link) {
        self.perform_action(&link.action);
    }

    #[instrument(skip(self))]
    pub fn perform_action(&mut self, action: &LinkAction) {
        match action {
            LinkAction::GoTo(target) => self.goto_target(target),
            LinkAction::GoToRemote { file, target } => {
                let path = match self.document_path().as_deref().and_then(|p| p.parent()) {
                    Some(dir) if file.is_relative() => dir.join(file),
                    _ => file.clone(),
                };
                if !self.is_current_document(&path) {
                    if let Err(err) = self.load_file(&path, None, None) {
                        warn!(?err, path = %path.display(), "failed to open linked document");
                        return;
                    }
                }
                match target {
                    Some(target) => self.goto_target(target),
                    None => self.display_page(1, self.zoom, self.rotation, true, true),
                }
            }
            LinkAction::Launch { .. } | LinkAction::Uri(_) => self.host.open_external(action),
            LinkAction::Named(name) => self.perform_named(name),
            LinkAction::Movie | LinkAction::Unknown => {
                debug!(?action, "ignoring unsupported link action");
            }
        }
    }

    fn goto_target(&mut self, target: &LinkTarget) {
        match target {
            LinkTarget::Explicit(destination) => self.display_destination(destination),
            LinkTarget::Named(name) => {
                self.goto_named_destination(name);
            }
        }
    }

    fn perform_named(&mut self, name: &str) {
        match name {
            "NextPage" => {
                self.goto_next_page(1, true);
            }
            "PrevPage" => {
                self.goto_prev_page(1, true, false);
            }
            "FirstPage" => {
                if self.top_page != 1 {
                    self.display_page(1, self.zoom, self.rotation, true, true);
                }
            }
            "LastPage" => {
                let last = self.page_count();
                if last > 0 && self.top_page != last {
                    self.display_page(last, self.zoom, self.rotation, true, true);
                }
            }
            "GoBack" => {
                self.go_backward();
            }
            "GoForward" => {
                self.go_forward();
            }
            "Quit" => self.host.quit_requested(),
            other => warn!(action = other, "unknown named action"),
        }
    }
}
