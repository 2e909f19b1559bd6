use tracing::{debug, instrument, warn};

use crate::geometry::UserRect;
use crate::host::Host;
use crate::layout::Rotation;
use crate::text::{Anchor, SearchRange};
use crate::viewport::{ScrollTarget, UpdateRequest, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FindOptions {
    pub case_sensitive: bool,
    /// Continue from the previous match instead of the selection.
    pub next: bool,
    pub backward: bool,
    /// Accepted for compatibility; matches are not restricted to whole words.
    pub whole_word: bool,
    pub one_page_only: bool,
}

/// Resolution used when scanning pages that are not displayed.
const SCAN_DPI: f64 = 72.0;

impl<H: Host> Viewport<H> {
    pub fn find(&mut self, needle: &str, options: FindOptions) -> bool {
        let chars: Vec<char> = needle.chars().collect();
        self.find_chars(&chars, options)
    }

    /// Searches from the previous match, the selection or the top of the
    /// current page, moving through the document and wrapping around.
    /// A match is selected and scrolled into view.
    #[instrument(skip(self, needle), fields(len = needle.len()))]
    pub fn find_chars(&mut self, needle: &[char], options: FindOptions) -> bool {
        if needle.is_empty() || self.page_count() == 0 || self.top_page == 0 {
            return false;
        }
        self.host.set_busy(true);
        let found = self.run_search(needle, options);
        self.host.set_busy(false);
        if !found {
            debug!("no match");
        }
        found
    }

    fn search_anchor(&self, options: FindOptions) -> (usize, Option<Anchor>) {
        let selection = self.selection.current;
        if options.next {
            let page = self
                .last_find_page
                .filter(|page| self.cache.find(*page).is_some())
                .unwrap_or(self.top_page);
            (page, Some(Anchor::LastMatch))
        } else if !selection.is_empty() {
            let rect = selection.rect.normalized();
            let x = if options.backward {
                rect.x_min - 1
            } else {
                rect.x_min + 1
            };
            let y = (rect.y_min + rect.y_max) as f64 / 2.0;
            (selection.page, Some(Anchor::Point { x: x as f64, y }))
        } else {
            (self.top_page, None)
        }
    }

    fn run_search(&mut self, needle: &[char], options: FindOptions) -> bool {
        let count = self.page_count();
        let (page, start) = self.search_anchor(options);
        if self.cache.find(page).is_none() {
            self.display_page(page, self.zoom, self.rotation, true, false);
        }

        let range = SearchRange { start, stop: None };
        if let Some(rect) = self.find_on_resident_page(page, needle, range, options) {
            self.select_match(page, rect);
            return true;
        }

        if !options.one_page_only {
            let order: Vec<usize> = if options.backward {
                (1..page).rev().chain((page + 1..=count).rev()).collect()
            } else {
                (page + 1..=count).chain(1..page).collect()
            };
            for candidate in order {
                if self.page_contains(candidate, needle, options) {
                    return self.show_match_on(candidate, needle, options);
                }
            }
        }

        if start.is_some() {
            let range = SearchRange { start: None, stop: start };
            if let Some(rect) = self.find_on_resident_page(page, needle, range, options) {
                self.select_match(page, rect);
                return true;
            }
        }
        false
    }

    fn find_on_resident_page(
        &mut self,
        page: usize,
        needle: &[char],
        range: SearchRange,
        options: FindOptions,
    ) -> Option<UserRect> {
        let document = self.document.as_deref()?;
        let (dpi, rotation) = (self.dpi, self.rotation);
        let entry = self.cache.find_mut(page)?;
        entry
            .text(document, dpi, rotation)
            .find(needle, range, options.case_sensitive, options.backward)
    }

    /// Scans a page that is not displayed.
    fn page_contains(&self, page: usize, needle: &[char], options: FindOptions) -> bool {
        let Some(document) = self.document.as_deref() else {
            return false;
        };
        match document.text_page(page, SCAN_DPI, Rotation::None) {
            Ok(mut text) => text
                .find(needle, SearchRange::default(), options.case_sensitive, options.backward)
                .is_some(),
            Err(err) => {
                warn!(?err, page, "skipping page during search");
                false
            }
        }
    }

    fn show_match_on(&mut self, page: usize, needle: &[char], options: FindOptions) -> bool {
        let scroll_y = if self.continuous {
            ScrollTarget::PageTop
        } else {
            ScrollTarget::To(0)
        };
        self.update(UpdateRequest {
            add_to_history: true,
            adjust_scroll_x: true,
            ..self.request(page, self.scroll_x, scroll_y)
        });
        match self.find_on_resident_page(page, needle, SearchRange::default(), options) {
            Some(rect) => {
                self.select_match(page, rect);
                true
            }
            None => false,
        }
    }

    fn select_match(&mut self, page: usize, rect: UserRect) {
        self.last_find_page = Some(page);
        self.set_selection(page, rect.enclosing_pixels());
    }
}
