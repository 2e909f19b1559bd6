use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::geometry::{PixelRect, UserRect};
use crate::host::Host;
use crate::viewport::{ScrollTarget, Viewport, ViewportId};

/// Rectangle selected on one page, in that page's device space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub page: usize,
    pub rect: PixelRect,
}

impl Selection {
    /// A selection exists only when both dimensions are non-zero.
    pub fn is_empty(&self) -> bool {
        self.page == 0 || self.rect.x_min == self.rect.x_max || self.rect.y_min == self.rect.y_max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SelectionState {
    pub current: Selection,
    pub dragging: bool,
    /// Which corner the pointer is dragging: the left (top) edge when set,
    /// the right (bottom) one otherwise.
    pub drag_left: bool,
    pub drag_top: bool,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            current: Selection::default(),
            dragging: false,
            drag_left: true,
            drag_top: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardEntry {
    pub owner: ViewportId,
    pub text: String,
}

/// Process-wide selection slot shared between viewports. At most one viewport
/// owns it; a viewport releases ownership when it is dropped.
#[derive(Debug, Clone, Default)]
pub struct SelectionClipboard {
    inner: Arc<Mutex<Option<ClipboardEntry>>>,
}

impl SelectionClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, owner: ViewportId, text: String) {
        *self.inner.lock() = Some(ClipboardEntry { owner, text });
    }

    pub fn contents(&self) -> Option<ClipboardEntry> {
        self.inner.lock().clone()
    }

    pub fn owner(&self) -> Option<ViewportId> {
        self.inner.lock().as_ref().map(|entry| entry.owner)
    }

    /// Clears the slot if `owner` holds it.
    pub fn release(&self, owner: ViewportId) {
        let mut slot = self.inner.lock();
        if slot.as_ref().is_some_and(|entry| entry.owner == owner) {
            *slot = None;
        }
    }
}

impl<H: Host> Viewport<H> {
    pub fn selection_state(&self) -> Selection {
        self.selection.current
    }

    /// XORs the selection color over `selection` in every resident tile of
    /// its page. Calling it twice restores the tiles.
    pub(crate) fn xor_selection(&mut self, selection: Selection) {
        let color = self.config.selection_xor();
        if let Some(entry) = self.cache.find_mut(selection.page) {
            for tile in entry.tiles_mut() {
                let local = selection
                    .rect
                    .normalized()
                    .translate(-tile.bounds.x_min, -tile.bounds.y_min);
                tile.bitmap.xor_rect(local, color);
            }
        }
    }

    /// Redraws `rect` (page device space, inclusive corners) of `page`.
    fn redraw_page_area(&mut self, page: usize, x0: i32, y0: i32, x1: i32, y1: i32) {
        let Some(entry) = self.cache.find(page) else {
            return;
        };
        let rect = PixelRect::from_origin_size(
            entry.dest_x + x0,
            entry.dest_y + y0,
            x1 - x0 + 1,
            y1 - y0 + 1,
        );
        self.redraw(rect);
    }

    fn redraw_selection(&mut self, selection: Selection) {
        let rect = selection.rect.normalized();
        self.redraw_page_area(selection.page, rect.x_min, rect.y_min, rect.x_max, rect.y_max);
    }

    /// Replaces the selection, repainting only the strips whose edges moved and
    /// scrolling so that a moved edge stays visible.
    pub fn set_selection(&mut self, page: usize, rect: PixelRect) {
        let old = self.selection.current;
        let new = Selection { page, rect };
        let had = !old.is_empty();
        let has = !new.is_empty();

        if had {
            self.xor_selection(old);
        }
        if has {
            self.xor_selection(new);
        }

        let same_page = had && old.page == page;
        let move_left = !same_page || rect.x_min != old.rect.x_min;
        let move_right = !same_page || rect.x_max != old.rect.x_max;
        let move_top = !same_page || rect.y_min != old.rect.y_min;
        let move_bottom = !same_page || rect.y_max != old.rect.y_max;

        self.selection.current = new;

        match (had, has) {
            (false, true) => self.redraw_selection(new),
            (true, false) => self.redraw_selection(old),
            (true, true) if !same_page => {
                self.redraw_selection(old);
                self.redraw_selection(new);
            }
            (true, true) => {
                let (o, n) = (old.rect, rect);
                if move_left {
                    self.redraw_page_area(
                        page,
                        n.x_min.min(o.x_min),
                        n.y_min.min(o.y_min),
                        n.x_min.max(o.x_min),
                        n.y_max.max(o.y_max),
                    );
                }
                if move_right {
                    self.redraw_page_area(
                        page,
                        n.x_max.min(o.x_max),
                        n.y_min.min(o.y_min),
                        n.x_max.max(o.x_max),
                        n.y_max.max(o.y_max),
                    );
                }
                if move_top {
                    self.redraw_page_area(
                        page,
                        n.x_min.min(o.x_min),
                        n.y_min.min(o.y_min),
                        n.x_max.max(o.x_max),
                        n.y_min.max(o.y_min),
                    );
                }
                if move_bottom {
                    self.redraw_page_area(
                        page,
                        n.x_min.min(o.x_min),
                        n.y_max.min(o.y_max),
                        n.x_max.max(o.x_max),
                        n.y_max.max(o.y_max),
                    );
                }
            }
            (false, false) => {}
        }

        if has {
            self.scroll_selection_into_view(new, [move_left, move_right, move_top, move_bottom]);
        }
    }

    fn scroll_selection_into_view(&mut self, selection: Selection, moved: [bool; 4]) {
        let [move_left, move_right, move_top, move_bottom] = moved;
        let Some(entry) = self.cache.find(selection.page) else {
            return;
        };
        let rect = selection.rect;
        let (width, height) = (self.size.width, self.size.height);
        let left = entry.dest_x + rect.x_min;
        let right = entry.dest_x + rect.x_max;
        let top = entry.dest_y + rect.y_min;
        let bottom = entry.dest_y + rect.y_max;

        let mut dx = 0;
        if move_left && left < 0 {
            dx = left;
        } else if move_right && right > width {
            dx = right - width;
        } else if move_left && left >= width {
            dx = left - width + 1;
        } else if move_right && right < 0 {
            dx = right;
        }
        let mut dy = 0;
        if move_top && top < 0 {
            dy = top;
        } else if move_bottom && bottom > height {
            dy = bottom - height;
        } else if move_top && top >= height {
            dy = top - height + 1;
        } else if move_bottom && bottom < 0 {
            dy = bottom;
        }
        if dx != 0 || dy != 0 {
            debug!(dx, dy, "scrolling selection into view");
            let request = self.request(
                self.top_page,
                self.scroll_x + dx,
                ScrollTarget::To(self.scroll_y + dy),
            );
            self.update(request);
        }
    }

    /// Moves the corner being dragged to `(x, y)` on `page`. The anchor flips
    /// to the opposite edge when the pointer crosses it. Moves onto another
    /// page are ignored.
    pub fn move_selection(&mut self, page: usize, x: i32, y: i32) {
        let current = self.selection.current;
        if page != current.page {
            return;
        }
        let rect = current.rect;
        let state = &mut self.selection;
        let (x_min, x_max) = if state.drag_left {
            if x < rect.x_max {
                (x, rect.x_max)
            } else {
                state.drag_left = false;
                (rect.x_max, x)
            }
        } else if x > rect.x_min {
            (rect.x_min, x)
        } else {
            state.drag_left = true;
            (x, rect.x_min)
        };
        let (y_min, y_max) = if state.drag_top {
            if y < rect.y_max {
                (y, rect.y_max)
            } else {
                state.drag_top = false;
                (rect.y_max, y)
            }
        } else if y > rect.y_min {
            (rect.y_min, y)
        } else {
            state.drag_top = true;
            (y, rect.y_min)
        };
        self.set_selection(page, PixelRect::new(x_min, y_min, x_max, y_max));
    }

    /// Starts a drag selection at a window position on a page.
    pub fn start_selection(&mut self, xw: i32, yw: i32) {
        let Some((page, x, y)) = self.window_to_device(xw, yw) else {
            return;
        };
        self.set_selection(page, PixelRect::new(x, y, x, y));
        self.selection.dragging = true;
        self.selection.drag_left = true;
        self.selection.drag_top = true;
    }

    pub fn drag_selection(&mut self, xw: i32, yw: i32) {
        if !self.selection.dragging {
            return;
        }
        if let Some((page, x, y)) = self.window_to_device(xw, yw) {
            self.move_selection(page, x, y);
        }
    }

    /// Finishes a drag; a non-empty selection is published to the clipboard.
    pub fn end_selection(&mut self, xw: i32, yw: i32) -> Option<String> {
        if !self.selection.dragging {
            return None;
        }
        self.drag_selection(xw, yw);
        self.selection.dragging = false;
        self.copy_selection()
    }

    pub fn is_selecting(&self) -> bool {
        self.selection.dragging
    }

    /// The selection in user space, if any.
    pub fn selection(&self) -> Option<(usize, UserRect)> {
        let current = self.selection.current;
        if current.is_empty() {
            return None;
        }
        let rect = current.rect.normalized();
        let (x0, y0) = self.device_to_user(current.page, rect.x_min as f64, rect.y_min as f64)?;
        let (x1, y1) = self.device_to_user(current.page, rect.x_max as f64, rect.y_max as f64)?;
        Some((current.page, UserRect::new(x0, y0, x1, y1).normalized()))
    }

    /// Text inside a user-space rectangle of `page`.
    pub fn extract_text(&mut self, page: usize, rect: UserRect) -> String {
        let Some(document) = self.document.as_deref() else {
            return String::new();
        };
        let (dpi, rotation) = (self.dpi, self.rotation);
        let transform = crate::backend::page_transform(&document.page_geometry(page), dpi, rotation);
        let (x0, y0) = transform.ctm.apply(rect.x_min, rect.y_min);
        let (x1, y1) = transform.ctm.apply(rect.x_max, rect.y_max);
        let device = UserRect::new(x0, y0, x1, y1).normalized().enclosing_pixels();
        match self.cache.find_mut(page) {
            Some(entry) => entry.text(document, dpi, rotation).text_in(device),
            None => match document.text_page(page, dpi, rotation) {
                Ok(text) => text.text_in(device),
                Err(err) => {
                    tracing::warn!(?err, page, "failed to extract text");
                    String::new()
                }
            },
        }
    }

    /// Publishes the selected text under this viewport's ownership.
    pub fn copy_selection(&mut self) -> Option<String> {
        let (page, rect) = self.selection()?;
        let text = self.extract_text(page, rect);
        self.clipboard.publish(self.id(), text.clone());
        Some(text)
    }
}
