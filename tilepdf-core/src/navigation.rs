use tracing::{instrument, warn};

use crate::backend::{Destination, DestinationKind};
use crate::geometry::{Size, UserRect};
use crate::history::HistoryEntry;
use crate::host::Host;
use crate::layout::{scaled_page_size, Rotation, Zoom, PAGE_SPACING};
use crate::viewport::{ScrollTarget, UpdateRequest, Viewport};

impl<H: Host> Viewport<H> {
    /// Shows `page` at the given zoom and rotation. A zoom change resets the
    /// scroll position to the top-left of the page.
    #[instrument(skip(self))]
    pub fn display_page(
        &mut self,
        page: usize,
        zoom: Zoom,
        rotation: Rotation,
        scroll_to_top: bool,
        add_to_history: bool,
    ) {
        let mut scroll_x = self.scroll_x;
        let mut scroll_y = if self.continuous {
            ScrollTarget::PageTop
        } else if scroll_to_top {
            ScrollTarget::To(0)
        } else {
            ScrollTarget::To(self.scroll_y)
        };
        if zoom.differs_from(&self.zoom) {
            scroll_x = 0;
            scroll_y = if self.continuous {
                ScrollTarget::PageTop
            } else {
                ScrollTarget::To(0)
            };
        }
        self.selection.dragging = false;
        self.selection.drag_left = true;
        self.selection.drag_top = true;
        self.update(UpdateRequest {
            page,
            scroll_x,
            scroll_y,
            zoom,
            rotation,
            force: true,
            add_to_history,
            adjust_scroll_x: true,
        });
    }

    /// Jumps to a resolved destination. History is recorded only when the
    /// page changes.
    #[instrument(skip(self))]
    pub fn display_destination(&mut self, destination: &Destination) {
        let count = self.page_count();
        if count == 0 {
            return;
        }
        let page = if (1..=count).contains(&destination.page) {
            destination.page
        } else {
            1
        };
        let add_to_history = page != self.top_page;
        match &destination.kind {
            DestinationKind::Xyz { left, top } => {
                let (dx, dy) =
                    self.user_to_device_or_default(page, left.unwrap_or(0.0), top.unwrap_or(0.0));
                let scroll_x = if left.is_some() { dx } else { self.scroll_x };
                let scroll_y = self.destination_scroll_y(page, top.map(|_| dy));
                self.update(UpdateRequest {
                    add_to_history,
                    adjust_scroll_x: true,
                    ..self.request(page, scroll_x, scroll_y)
                });
            }
            DestinationKind::Fit => {
                let scroll_y = if self.continuous {
                    ScrollTarget::PageTop
                } else {
                    ScrollTarget::To(0)
                };
                self.update(UpdateRequest {
                    zoom: Zoom::FitPage,
                    add_to_history,
                    adjust_scroll_x: true,
                    ..self.request(page, 0, scroll_y)
                });
            }
            DestinationKind::FitH { top } => {
                let (_, dy) = self.user_to_device_or_default(page, 0.0, top.unwrap_or(0.0));
                let scroll_y = self.destination_scroll_y(page, top.map(|_| dy));
                self.update(UpdateRequest {
                    add_to_history,
                    adjust_scroll_x: true,
                    ..self.request(page, 0, scroll_y)
                });
            }
            DestinationKind::FitV { left } => {
                let (dx, _) = self.user_to_device_or_default(page, left.unwrap_or(0.0), 0.0);
                let scroll_x = if left.is_some() { dx } else { self.scroll_x };
                let scroll_y = if self.continuous {
                    ScrollTarget::PageTop
                } else {
                    ScrollTarget::To(0)
                };
                self.update(UpdateRequest {
                    add_to_history,
                    adjust_scroll_x: true,
                    ..self.request(page, scroll_x, scroll_y)
                });
            }
            DestinationKind::FitR(rect) => self.zoom_to_rect(page, *rect),
        }
    }

    /// Vertical target for a destination that may or may not change the top
    /// coordinate. Without a new top the offset into the page is preserved.
    fn destination_scroll_y(&self, page: usize, device_top: Option<i32>) -> ScrollTarget {
        if self.continuous {
            if self.top_page == 0 {
                ScrollTarget::PageTop
            } else if let Some(dy) = device_top {
                ScrollTarget::To(self.layout.page_top(page) + dy)
            } else {
                ScrollTarget::To(
                    self.layout.page_top(page) + (self.scroll_y - self.layout.page_top(self.top_page)),
                )
            }
        } else if let Some(dy) = device_top {
            ScrollTarget::To(dy)
        } else if self.top_page > 0 {
            ScrollTarget::To(self.scroll_y)
        } else {
            ScrollTarget::To(0)
        }
    }

    /// Resolves a named destination and displays it.
    pub fn goto_named_destination(&mut self, name: &str) -> bool {
        let Some(destination) = self
            .document
            .as_ref()
            .and_then(|document| document.find_destination(name))
        else {
            warn!(name, "unknown named destination");
            return false;
        };
        self.display_destination(&destination);
        true
    }

    pub fn goto_next_page(&mut self, increment: usize, top: bool) -> bool {
        let count = self.page_count();
        if count == 0 || self.top_page >= count {
            return false;
        }
        let page = (self.top_page + increment.max(1)).min(count);
        let scroll_y = if self.continuous {
            ScrollTarget::PageTop
        } else if top {
            ScrollTarget::To(0)
        } else {
            ScrollTarget::To(self.scroll_y)
        };
        self.update(UpdateRequest {
            add_to_history: true,
            adjust_scroll_x: true,
            ..self.request(page, self.scroll_x, scroll_y)
        });
        true
    }

    /// Steps back `decrement` pages, landing on the page top, its bottom, or
    /// the current offset.
    pub fn goto_prev_page(&mut self, decrement: usize, top: bool, bottom: bool) -> bool {
        if self.page_count() == 0 || self.top_page <= 1 {
            return false;
        }
        let page = self.top_page.saturating_sub(decrement.max(1)).max(1);
        let scroll_y = if self.continuous {
            ScrollTarget::PageTop
        } else if top {
            ScrollTarget::To(0)
        } else if bottom {
            let (_, height) = self.page_size(page);
            ScrollTarget::To((height - self.size.height).max(0))
        } else {
            ScrollTarget::To(self.scroll_y)
        };
        self.update(UpdateRequest {
            add_to_history: true,
            adjust_scroll_x: true,
            ..self.request(page, self.scroll_x, scroll_y)
        });
        true
    }

    pub fn go_backward(&mut self) -> bool {
        let Some(entry) = self.history.step_back().cloned() else {
            return false;
        };
        self.revisit(entry)
    }

    pub fn go_forward(&mut self) -> bool {
        let Some(entry) = self.history.step_forward().cloned() else {
            return false;
        };
        self.revisit(entry)
    }

    fn revisit(&mut self, entry: HistoryEntry) -> bool {
        match entry.path.as_deref() {
            Some(path) if !self.is_current_document(path) => {
                if let Err(err) = self.load_file(path, None, None) {
                    warn!(?err, path = %path.display(), "failed to reopen document from history");
                    return false;
                }
            }
            Some(_) => {}
            None if self.document_path().is_some() => return false,
            None => {}
        }
        let scroll_y = self.keep_or_snap();
        self.update(UpdateRequest {
            adjust_scroll_x: true,
            ..self.request(entry.page, self.scroll_x, scroll_y)
        });
        true
    }

    pub fn scroll_to(&mut self, x: i32, y: i32) {
        self.update(self.request(self.top_page, x, ScrollTarget::To(y.max(0))));
    }

    pub fn scroll_left(&mut self, columns: i32) {
        self.scroll_to(self.scroll_x - columns, self.scroll_y);
    }

    pub fn scroll_right(&mut self, columns: i32) {
        self.scroll_to(self.scroll_x + columns, self.scroll_y);
    }

    pub fn scroll_up(&mut self, lines: i32) {
        self.scroll_to(self.scroll_x, self.scroll_y - lines);
    }

    pub fn scroll_down(&mut self, lines: i32) {
        self.scroll_to(self.scroll_x, self.scroll_y + lines);
    }

    fn at_page_top(&self) -> bool {
        !self.continuous && self.scroll_y == 0
    }

    fn at_page_bottom(&self) -> bool {
        !self.continuous
            && self
                .cache
                .first()
                .is_some_and(|entry| self.scroll_y >= entry.height - self.size.height)
    }

    /// Scrolls up, turning to the bottom of the previous page when already at
    /// the top of a page in single-page mode.
    pub fn scroll_up_prev_page(&mut self, lines: i32) {
        if self.at_page_top() {
            self.goto_prev_page(1, false, true);
        } else {
            self.scroll_up(lines);
        }
    }

    pub fn scroll_down_next_page(&mut self, lines: i32) {
        if self.at_page_bottom() {
            self.goto_next_page(1, true);
        } else {
            self.scroll_down(lines);
        }
    }

    pub fn scroll_page_up(&mut self) {
        if self.at_page_top() {
            self.goto_prev_page(1, false, true);
        } else {
            self.scroll_to(self.scroll_x, self.scroll_y - self.size.height);
        }
    }

    pub fn scroll_page_down(&mut self) {
        if self.at_page_bottom() {
            self.goto_next_page(1, true);
        } else {
            self.scroll_to(self.scroll_x, self.scroll_y + self.size.height);
        }
    }

    pub fn scroll_to_left_edge(&mut self) {
        self.update(self.request(self.top_page, 0, ScrollTarget::To(self.scroll_y)));
    }

    pub fn scroll_to_right_edge(&mut self) {
        let Some(width) = self.cache.first().map(|entry| entry.width) else {
            return;
        };
        self.update(self.request(
            self.top_page,
            width - self.size.width,
            ScrollTarget::To(self.scroll_y),
        ));
    }

    fn top_of_top_page(&self) -> ScrollTarget {
        if self.continuous {
            ScrollTarget::To(self.layout.page_top(self.top_page))
        } else {
            ScrollTarget::To(0)
        }
    }

    pub fn scroll_to_top_edge(&mut self) {
        self.update(self.request(self.top_page, self.scroll_x, self.top_of_top_page()));
    }

    pub fn scroll_to_top_left(&mut self) {
        self.update(self.request(self.top_page, 0, self.top_of_top_page()));
    }

    /// Last resident page whose top is inside the window, with the scroll
    /// offset that puts its bottom at the bottom of the window.
    fn bottom_target(&self) -> Option<(usize, i32, i32)> {
        let entry = self
            .cache
            .pages()
            .iter()
            .rev()
            .find(|entry| entry.dest_y < self.size.height)?;
        let base = if self.continuous {
            self.layout.page_top(entry.page)
        } else {
            0
        };
        Some((
            entry.page,
            entry.width,
            base + entry.height - self.size.height,
        ))
    }

    pub fn scroll_to_bottom_edge(&mut self) {
        if let Some((page, _, y)) = self.bottom_target() {
            self.update(self.request(page, self.scroll_x, ScrollTarget::To(y)));
        }
    }

    pub fn scroll_to_bottom_right(&mut self) {
        if let Some((page, width, y)) = self.bottom_target() {
            self.update(self.request(page, width - self.size.width, ScrollTarget::To(y)));
        }
    }

    /// Centers the window on a user-space point of `page`.
    pub fn scroll_to_centered(&mut self, page: usize, xu: f64, yu: f64) {
        if self.page_count() == 0 {
            return;
        }
        let (dx, dy) = self.user_to_device_or_default(page, xu, yu);
        let mut scroll_x = dx - self.size.width / 2;
        let scroll_y = if self.continuous {
            let (width, _) = self.page_size(page);
            if width < self.layout.max_page_width {
                scroll_x += (self.layout.max_page_width - width) / 2;
            }
            self.layout.page_top(page) + dy - self.size.height / 2
        } else {
            dy - self.size.height / 2
        };
        self.update(self.request(page, scroll_x, ScrollTarget::To(scroll_y)));
    }

    /// Zooms so that a user-space rectangle of `page` fills the window along
    /// its tighter axis and is centered along the other.
    #[instrument(skip(self))]
    pub fn zoom_to_rect(&mut self, page: usize, rect: UserRect) {
        if self.page_count() == 0 {
            return;
        }
        let (ax, ay) = self.user_to_device_or_default(page, rect.x_min, rect.y_min);
        let (bx, by) = self.user_to_device_or_default(page, rect.x_max, rect.y_max);
        let (x0, x1) = (ax.min(bx) as f64, ax.max(bx) as f64);
        let (y0, y1) = (ay.min(by) as f64, ay.max(by) as f64);
        if x1 <= x0 || y1 <= y0 {
            return;
        }
        let width = self.size.width as f64;
        let height = self.size.height as f64;
        let rx = width / (x1 - x0);
        let ry = height / (y1 - y0);
        let dpi = if self.dpi > 0.0 { self.dpi } else { 72.0 };
        let (scale, mut sx, mut sy) = if rx < ry {
            let t = (height * (x1 - x0)) / width;
            (rx, (rx * x0) as i32, (rx * (y0 + y1 - t) / 2.0) as i32)
        } else {
            let t = (width * (y1 - y0)) / height;
            (ry, (ry * (x0 + x1 - t) / 2.0) as i32, (ry * y0) as i32)
        };
        if self.continuous {
            let (page_w, _) = self.page_size(page);
            let narrower = self.layout.max_page_width - page_w;
            if narrower > 0 {
                sx += (0.5 * scale * narrower as f64) as i32;
            }
            let gaps = (page as i32 - 1) * PAGE_SPACING;
            sy += (scale * (self.layout.page_top(page) - gaps) as f64) as i32 + gaps;
        }
        let zoom = Zoom::Percent(scale * dpi / 0.72);
        self.update(UpdateRequest {
            zoom,
            ..self.request(page, sx, ScrollTarget::To(sy))
        });
    }

    /// Changes the zoom keeping the center of the window on the same spot of
    /// the document. Fit zooms reset the horizontal position.
    #[instrument(skip(self))]
    pub fn zoom_centered(&mut self, zoom: Zoom) {
        if self.top_page == 0 || self.dpi <= 0.0 {
            return;
        }
        let (new_dpi, sx) = match zoom {
            Zoom::Percent(percent) if percent <= 0.0 => return,
            Zoom::Percent(percent) => {
                let new_dpi = 0.72 * percent;
                let h_adjust = self
                    .cache
                    .first()
                    .map_or(0, |entry| entry.dest_x.max(0));
                let half = self.size.width / 2;
                let sx = ((self.scroll_x - h_adjust + half) as f64 * (new_dpi / self.dpi)) as i32
                    - half;
                (new_dpi, sx.max(0))
            }
            fit => (self.resolve_page_dpi(self.top_page, fit, self.rotation), 0),
        };
        let sy = self.centered_scroll_y(new_dpi);
        self.update(UpdateRequest {
            zoom,
            ..self.request(self.top_page, sx, ScrollTarget::To(sy))
        });
    }

    /// Vertical offset at `new_dpi` that keeps the window's vertical center on
    /// the same document position.
    fn centered_scroll_y(&self, new_dpi: f64) -> i32 {
        let half = self.size.height / 2;
        let ratio = new_dpi / self.dpi;
        if self.continuous {
            let Some(document) = self.document.as_deref() else {
                return 0;
            };
            let above: i32 = (1..self.top_page)
                .map(|page| scaled_page_size(&document.page_geometry(page), new_dpi, self.rotation).1)
                .sum();
            let into_page = self.scroll_y - self.layout.page_top(self.top_page) + half;
            above + (into_page as f64 * ratio) as i32 + (self.top_page as i32 - 1) * PAGE_SPACING
                - half
        } else {
            ((self.scroll_y + half) as f64 * ratio) as i32 - half
        }
    }

    /// Zooms so that the widest page from the top page down to the window
    /// bottom fills the window width.
    #[instrument(skip(self))]
    pub fn zoom_to_current_width(&mut self) {
        if self.top_page == 0 || self.dpi <= 0.0 {
            return;
        }
        let Some(document) = self.document.as_deref() else {
            return;
        };
        let bottom = self.scroll_y + self.size.height;
        let max_w = self
            .cache
            .pages()
            .iter()
            .filter(|entry| {
                entry.page >= self.top_page
                    && (!self.continuous || self.layout.page_top(entry.page) < bottom)
            })
            .map(|entry| {
                let geometry = document.page_geometry(entry.page);
                if geometry.rotation.rotate_by(self.rotation).swaps_axes() {
                    geometry.crop_box.height()
                } else {
                    geometry.crop_box.width()
                }
            })
            .fold(0.0_f64, f64::max);
        if max_w <= 0.0 {
            return;
        }
        let new_dpi = (self.size.width as f64 / max_w) * 72.0;
        let sx = if self.continuous {
            ((self.layout.max_page_width as f64 * new_dpi / self.dpi - self.size.width as f64)
                / 2.0) as i32
        } else {
            0
        };
        let sy = self.centered_scroll_y(new_dpi);
        let zoom = Zoom::Percent(new_dpi * 100.0 / 72.0);
        self.update(UpdateRequest {
            zoom,
            ..self.request(self.top_page, sx, ScrollTarget::To(sy))
        });
    }

    pub fn set_continuous_mode(&mut self, continuous: bool) {
        if self.continuous == continuous {
            return;
        }
        self.continuous = continuous;
        if self.top_page == 0 {
            return;
        }
        self.update(UpdateRequest {
            force: true,
            adjust_scroll_x: true,
            ..self.request(self.top_page, self.scroll_x, ScrollTarget::PageTop)
        });
    }

    pub fn set_rotation(&mut self, rotation: Rotation) {
        if self.top_page == 0 {
            self.rotation = rotation;
            return;
        }
        self.display_page(self.top_page, self.zoom, rotation, true, false);
    }

    pub fn set_reverse_video(&mut self, reverse: bool) {
        self.config.reverse_video = reverse;
        if let Some(document) = self.document.as_mut() {
            document.set_reverse_video(reverse);
        }
        if self.top_page > 0 {
            self.update(UpdateRequest {
                force: true,
                ..self.request(self.top_page, self.scroll_x, ScrollTarget::To(self.scroll_y))
            });
        }
    }

    /// Stores a new window size. Fit zooms are re-resolved from the top-left
    /// of the current page.
    pub fn resize(&mut self, width: i32, height: i32) {
        self.size = Size::new(width, height);
        if self.top_page == 0 {
            self.redraw(self.window_rect());
            return;
        }
        let (scroll_x, scroll_y) = if self.zoom.is_fit() {
            (0, ScrollTarget::PageTop)
        } else {
            (self.scroll_x, ScrollTarget::To(self.scroll_y))
        };
        self.update(UpdateRequest {
            force: true,
            ..self.request(self.top_page, scroll_x, scroll_y)
        });
    }

    pub fn start_pan(&mut self, xw: i32, yw: i32) {
        self.pan_anchor = Some((xw, yw));
    }

    /// Drags the document along with the pointer.
    pub fn pan_to(&mut self, xw: i32, yw: i32) {
        let Some((last_x, last_y)) = self.pan_anchor else {
            return;
        };
        self.pan_anchor = Some((xw, yw));
        self.scroll_to(self.scroll_x - (xw - last_x), self.scroll_y - (yw - last_y));
    }

    pub fn end_pan(&mut self) {
        self.pan_anchor = None;
    }
}
