use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::backend::{DocumentBackend, DocumentProvider, DocumentSource, LoadError};
use crate::config::ViewerConfig;
use crate::geometry::{PixelRect, Size};
use crate::history::{History, HistoryEntry};
use crate::host::{draw_clipped, fill_clipped, Host, ScrollAxis, ScrollbarState};
use crate::layout::{resolve_dpi, scaled_page_size, DocumentLayout, Placement, Rotation, Zoom};
use crate::selection::{SelectionClipboard, SelectionState};
use crate::tile::{InFlightTile, PageEntry, RasterContext, TileCache, TileEdges};
use crate::{document_id_for_path, DocumentInfo};

pub type ViewportId = Uuid;

/// Times a password is asked for before an encrypted document is given up.
const PASSWORD_ATTEMPTS: usize = 3;

/// Vertical scroll target of an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollTarget {
    To(i32),
    /// Top of the target page: its offset in continuous mode, 0 otherwise.
    PageTop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateRequest {
    pub page: usize,
    pub scroll_x: i32,
    pub scroll_y: ScrollTarget,
    pub zoom: Zoom,
    pub rotation: Rotation,
    /// Rebuild the layout and drop every tile even if nothing changed.
    pub force: bool,
    pub add_to_history: bool,
    /// In continuous mode, scroll right far enough that a page narrower than
    /// the widest one is not cut off on the left.
    pub adjust_scroll_x: bool,
}

/// A scrollable window onto one document.
pub struct Viewport<H: Host> {
    id: ViewportId,
    provider: Box<dyn DocumentProvider>,
    pub(crate) document: Option<Box<dyn DocumentBackend>>,
    pub(crate) host: H,
    pub(crate) config: ViewerConfig,
    pub(crate) continuous: bool,
    pub(crate) size: Size,
    max_unscaled: (f64, f64),
    pub(crate) layout: DocumentLayout,
    pub(crate) cache: TileCache,
    pub(crate) in_flight: Option<InFlightTile>,
    pub(crate) top_page: usize,
    pub(crate) mid_page: usize,
    pub(crate) scroll_x: i32,
    pub(crate) scroll_y: i32,
    pub(crate) zoom: Zoom,
    pub(crate) dpi: f64,
    pub(crate) rotation: Rotation,
    pub(crate) selection: SelectionState,
    pub(crate) clipboard: SelectionClipboard,
    pub(crate) history: History,
    modified: Option<SystemTime>,
    pub(crate) pan_anchor: Option<(i32, i32)>,
    pub(crate) hovered_link: Option<String>,
    pub(crate) last_find_page: Option<usize>,
}

impl<H: Host> Viewport<H> {
    pub fn new(provider: Box<dyn DocumentProvider>, host: H, config: ViewerConfig) -> Self {
        let size = host.viewport_size();
        Self {
            id: Uuid::new_v4(),
            provider,
            document: None,
            host,
            continuous: config.continuous_mode,
            zoom: config.initial_zoom,
            config,
            size,
            max_unscaled: (0.0, 0.0),
            layout: DocumentLayout::default(),
            cache: TileCache::default(),
            in_flight: None,
            top_page: 0,
            mid_page: 0,
            scroll_x: 0,
            scroll_y: 0,
            dpi: 0.0,
            rotation: Rotation::None,
            selection: SelectionState::default(),
            clipboard: SelectionClipboard::new(),
            history: History::new(),
            modified: None,
            pan_anchor: None,
            hovered_link: None,
            last_find_page: None,
        }
    }

    /// Shares `clipboard` with other viewports so that only one of them owns
    /// the current selection at a time.
    pub fn with_clipboard(mut self, clipboard: SelectionClipboard) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn id(&self) -> ViewportId {
        self.id
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn clipboard(&self) -> &SelectionClipboard {
        &self.clipboard
    }

    pub fn document_info(&self) -> Option<&DocumentInfo> {
        self.document.as_ref().map(|document| document.info())
    }

    pub fn page_count(&self) -> usize {
        self.document
            .as_ref()
            .map_or(0, |document| document.page_count())
    }

    pub fn top_page(&self) -> usize {
        self.top_page
    }

    pub fn mid_page(&self) -> usize {
        self.mid_page
    }

    pub fn scroll_x(&self) -> i32 {
        self.scroll_x
    }

    pub fn scroll_y(&self) -> i32 {
        self.scroll_y
    }

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn dpi(&self) -> f64 {
        self.dpi
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    pub fn viewport_size(&self) -> Size {
        self.size
    }

    pub fn layout(&self) -> &DocumentLayout {
        &self.layout
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn can_go_back(&self) -> bool {
        self.history.can_go_back()
    }

    pub fn can_go_forward(&self) -> bool {
        self.history.can_go_forward()
    }

    pub(crate) fn document_path(&self) -> Option<PathBuf> {
        self.document
            .as_ref()
            .and_then(|document| document.info().path.clone())
    }

    /// Whether `path` names the file the document was loaded from, however
    /// the path is spelled.
    pub(crate) fn is_current_document(&self, path: &Path) -> bool {
        self.document_info()
            .is_some_and(|info| info.path.is_some() && info.id == document_id_for_path(path))
    }

    /// Opens `path`, asking the host for a password if the document is
    /// encrypted. Nothing is displayed until the caller picks a page.
    #[instrument(skip(self, owner_password, user_password))]
    pub fn load_file(
        &mut self,
        path: &Path,
        owner_password: Option<&str>,
        user_password: Option<&str>,
    ) -> Result<(), LoadError> {
        let modified = modified_time(path);
        self.load_source(
            DocumentSource::Path(path.to_path_buf()),
            owner_password,
            user_password,
            modified,
        )
    }

    #[instrument(skip(self, bytes, owner_password, user_password), fields(len = bytes.len()))]
    pub fn load_bytes(
        &mut self,
        bytes: Vec<u8>,
        owner_password: Option<&str>,
        user_password: Option<&str>,
    ) -> Result<(), LoadError> {
        self.load_source(
            DocumentSource::Bytes(bytes),
            owner_password,
            user_password,
            None,
        )
    }

    fn load_source(
        &mut self,
        source: DocumentSource,
        owner_password: Option<&str>,
        user_password: Option<&str>,
        modified: Option<SystemTime>,
    ) -> Result<(), LoadError> {
        let mut owner = owner_password.map(str::to_owned);
        let mut user = user_password.map(str::to_owned);
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.host.set_busy(true);
            let outcome = self
                .provider
                .open(&source, owner.as_deref(), user.as_deref());
            self.host.set_busy(false);
            match outcome {
                Ok(document) => {
                    self.install_document(document, modified);
                    return Ok(());
                }
                Err(LoadError::Encrypted) if attempt < PASSWORD_ATTEMPTS => {
                    let Some(password) = self.host.request_password() else {
                        return Err(LoadError::Encrypted);
                    };
                    owner = Some(password.clone());
                    user = Some(password);
                }
                Err(err) => {
                    warn!(?err, "failed to open document");
                    return Err(err);
                }
            }
        }
    }

    fn install_document(&mut self, mut document: Box<dyn DocumentBackend>, modified: Option<SystemTime>) {
        document.set_reverse_video(self.config.reverse_video);
        let count = document.page_count();
        let mut max_w: f64 = 0.0;
        let mut max_h: f64 = 0.0;
        for page in 1..=count {
            let (w, h) = document.page_geometry(page).rotated_size();
            max_w = max_w.max(w);
            max_h = max_h.max(h);
        }
        info!(pages = count, path = ?document.info().path, "document loaded");
        self.host.title_changed(document.info());
        self.document = Some(document);
        self.max_unscaled = (max_w, max_h);
        self.modified = modified;
        self.reset_view_state();
    }

    fn reset_view_state(&mut self) {
        self.cache.clear();
        self.layout = DocumentLayout::default();
        self.in_flight = None;
        self.selection = SelectionState::default();
        self.top_page = 0;
        self.mid_page = 0;
        self.hovered_link = None;
        self.last_find_page = None;
        self.pan_anchor = None;
    }

    /// Closes the document and blanks the window.
    pub fn clear(&mut self) {
        self.document = None;
        self.modified = None;
        self.reset_view_state();
        self.scroll_x = 0;
        self.scroll_y = 0;
        self.redraw(self.window_rect());
        self.update_scrollbars();
    }

    /// Hands the document over to the caller; the viewport is left empty.
    pub fn take_document(&mut self) -> Option<Box<dyn DocumentBackend>> {
        let document = self.document.take();
        self.modified = None;
        self.reset_view_state();
        document
    }

    /// Whether the file backing the document changed on disk since it was
    /// loaded. Records the new modification time.
    pub fn check_for_new_file(&mut self) -> bool {
        let Some(path) = self.document_path() else {
            return false;
        };
        let current = modified_time(&path);
        if current != self.modified {
            self.modified = current;
            true
        } else {
            false
        }
    }

    pub(crate) fn resolve_page_dpi(&self, page: usize, zoom: Zoom, rotation: Rotation) -> f64 {
        let unscaled = if self.continuous {
            let (w, h) = self.max_unscaled;
            if rotation.swaps_axes() {
                (h, w)
            } else {
                (w, h)
            }
        } else {
            match self.document.as_ref() {
                Some(document) => {
                    let geometry = document.page_geometry(page);
                    let (w, h) = (geometry.crop_box.width(), geometry.crop_box.height());
                    if geometry.rotation.rotate_by(rotation).swaps_axes() {
                        (h, w)
                    } else {
                        (w, h)
                    }
                }
                None => (0.0, 0.0),
            }
        };
        resolve_dpi(zoom, self.size, unscaled, self.continuous)
    }

    /// Pixel size of `page` at the current resolution.
    pub(crate) fn page_size(&self, page: usize) -> (i32, i32) {
        if let Some(entry) = self.cache.find(page) {
            return (entry.width, entry.height);
        }
        match self.document.as_ref() {
            Some(document) => {
                scaled_page_size(&document.page_geometry(page), self.dpi, self.rotation)
            }
            None => (0, 0),
        }
    }

    pub(crate) fn request(&self, page: usize, scroll_x: i32, scroll_y: ScrollTarget) -> UpdateRequest {
        UpdateRequest {
            page,
            scroll_x,
            scroll_y,
            zoom: self.zoom,
            rotation: self.rotation,
            force: false,
            add_to_history: false,
            adjust_scroll_x: false,
        }
    }

    /// Vertical target that keeps the current position, or snaps to the page
    /// top in continuous mode.
    pub(crate) fn keep_or_snap(&self) -> ScrollTarget {
        if self.continuous {
            ScrollTarget::PageTop
        } else {
            ScrollTarget::To(self.scroll_y)
        }
    }

    /// The single state transition every navigation goes through.
    #[instrument(skip(self), fields(page = request.page))]
    pub fn update(&mut self, request: UpdateRequest) {
        let Some(mut page_count) = self.document.as_ref().map(|document| document.page_count())
        else {
            self.zoom = request.zoom;
            self.rotation = request.rotation;
            self.redraw(self.window_rect());
            self.update_scrollbars();
            return;
        };
        if !(1..=page_count).contains(&request.page) {
            debug!(page_count, "page outside the document, ignoring update");
            return;
        }
        let previous_top = self.top_page;

        if (request.force || (!self.continuous && request.page != self.top_page))
            && self.check_for_new_file()
        {
            if let Some(path) = self.document_path() {
                info!(path = %path.display(), "document changed on disk, reloading");
                match self.load_file(&path, None, None) {
                    Ok(()) => page_count = self.page_count(),
                    Err(err) => warn!(?err, path = %path.display(), "failed to reload document"),
                }
            }
        }
        if page_count == 0 {
            return;
        }
        // The file may have shrunk on reload.
        let page = request.page.min(page_count);

        let dpi = self.resolve_page_dpi(page, request.zoom, request.rotation);
        let relayout = request.force
            || self.cache.is_empty()
            || (!self.continuous && page != self.top_page)
            || request.zoom.differs_from(&self.zoom)
            || (dpi - self.dpi).abs() > 1e-8
            || request.rotation != self.rotation;
        if relayout {
            self.set_selection(0, PixelRect::default());
            self.cache.clear();
            self.zoom = request.zoom;
            self.rotation = request.rotation;
            self.dpi = dpi;
            if self.continuous {
                self.rebuild_layout(page_count);
            } else {
                self.layout = DocumentLayout::default();
                self.add_page(page);
            }
            debug!(dpi, continuous = self.continuous, "layout rebuilt");
        } else if !self.selection.current.is_empty() {
            self.xor_selection(self.selection.current);
        }
        self.top_page = page;
        self.mid_page = page;

        self.scroll_x = request.scroll_x;
        self.scroll_y = match request.scroll_y {
            ScrollTarget::To(y) => y,
            ScrollTarget::PageTop if self.continuous => self.layout.page_top(page),
            ScrollTarget::PageTop => 0,
        };
        if self.continuous && request.adjust_scroll_x {
            let (width, _) = self.page_size(page);
            let inset = (self.layout.max_page_width - width) / 2;
            if self.scroll_x < inset {
                self.scroll_x = inset;
            }
        }
        let (content_w, content_h) = self.content_size();
        self.scroll_x = self.scroll_x.min(content_w - self.size.width).max(0);
        self.scroll_y = self.scroll_y.min(content_h - self.size.height).max(0);

        if self.continuous {
            self.refresh_page_window();
        }
        self.place_pages();
        self.evict_tiles();
        self.rasterize_visible();

        if !self.selection.current.is_empty() {
            self.xor_selection(self.selection.current);
        }
        self.redraw(self.window_rect());
        self.update_scrollbars();

        if request.add_to_history {
            self.history.record(HistoryEntry {
                path: self.document_path(),
                page: self.top_page,
            });
        }
        if request.add_to_history || self.top_page != previous_top {
            self.host.page_changed(self.top_page);
        }
    }

    fn rebuild_layout(&mut self, page_count: usize) {
        let Some(document) = self.document.as_deref() else {
            return;
        };
        let (dpi, rotation) = (self.dpi, self.rotation);
        self.layout = DocumentLayout::compute(
            (1..=page_count)
                .map(|page| scaled_page_size(&document.page_geometry(page), dpi, rotation)),
        );
    }

    fn add_page(&mut self, page: usize) {
        let Some(document) = self.document.as_deref() else {
            return;
        };
        let (width, height) = scaled_page_size(&document.page_geometry(page), self.dpi, self.rotation);
        self.cache.insert(PageEntry::new(page, width, height, self.size));
    }

    /// Scrollable extent: the whole document in continuous mode, the
    /// displayed page otherwise.
    pub(crate) fn content_size(&self) -> (i32, i32) {
        if self.continuous {
            (self.layout.max_page_width, self.layout.total_height)
        } else {
            self.cache
                .first()
                .map_or((0, 0), |entry| (entry.width, entry.height))
        }
    }

    /// Recomputes which pages are resident around the scroll position and
    /// which page is on top.
    fn refresh_page_window(&mut self) {
        let window = self.layout.visible_window(self.scroll_y, self.size.height);
        self.top_page = window.top;
        self.mid_page = window.mid;
        self.cache.retain_range(window.first, window.last);
        let upto = self
            .cache
            .first()
            .map_or(window.last, |entry| entry.page.saturating_sub(1));
        for page in window.first..=upto {
            self.add_page(page);
        }
        let after = self.cache.last().map_or(window.last, |entry| entry.page);
        for page in after + 1..=window.last {
            self.add_page(page);
        }
    }

    pub(crate) fn placement(&self) -> Placement {
        Placement {
            scroll_x: self.scroll_x,
            scroll_y: self.scroll_y,
            viewport: self.size,
            continuous: self.continuous,
            max_page_width: self.layout.max_page_width,
            total_height: self.layout.total_height,
        }
    }

    fn place_pages(&mut self) {
        let placement = self.placement();
        let continuous = self.continuous;
        let layout = &self.layout;
        for entry in self.cache.pages_mut() {
            let top = if continuous { layout.page_top(entry.page) } else { 0 };
            let (x, y) = placement.page_origin(top, entry.width, entry.height);
            entry.set_origin(x, y);
        }
    }

    fn evict_tiles(&mut self) {
        let Size { width, height } = self.size;
        let keep = PixelRect::new(-width / 2, -height / 2, width + width / 2, height + height / 2);
        for entry in self.cache.pages_mut() {
            entry.evict_outside(keep);
        }
    }

    fn rasterize_visible(&mut self) {
        let Some(document) = self.document.as_deref() else {
            return;
        };
        let mut ctx = RasterContext {
            document,
            host: &mut self.host,
            in_flight: &mut self.in_flight,
            dpi: self.dpi,
            rotation: self.rotation,
            continuous: self.continuous,
            page_count: document.page_count(),
            viewport: self.size,
        };
        for entry in self.cache.pages_mut() {
            for (x, y) in entry.wanted_tiles(ctx.viewport) {
                entry.request_tile(x, y, &mut ctx);
            }
        }
    }

    pub(crate) fn window_rect(&self) -> PixelRect {
        PixelRect::from_origin_size(0, 0, self.size.width, self.size.height)
    }

    /// Repaints a window region from resident tiles, painting matte around
    /// and between pages.
    pub fn redraw(&mut self, rect: PixelRect) {
        let Some(clip) = rect.intersect(&self.window_rect()) else {
            return;
        };
        self.host.invalidate(clip);
        let Size {
            width: vw,
            height: vh,
        } = self.size;
        let host: &mut dyn Host = &mut self.host;
        let pages = self.cache.pages();
        if pages.is_empty() {
            fill_clipped(host, clip, clip);
            return;
        }
        for (index, entry) in pages.iter().enumerate() {
            for tile in entry.tiles() {
                let w = tile.bounds.width();
                let h = tile.bounds.height();
                let edge_x = if tile.edges.contains(TileEdges::LEFT) {
                    0
                } else {
                    tile.dest_x
                };
                let edge_w = if tile.edges.contains(TileEdges::RIGHT) {
                    vw - edge_x
                } else {
                    tile.dest_x + w - edge_x
                };
                if tile.edges.contains(TileEdges::TOP) {
                    fill_clipped(
                        host,
                        PixelRect::new(edge_x, 0, edge_x + edge_w, tile.dest_y),
                        clip,
                    );
                }
                let below = tile.dest_y + h;
                if tile.edges.contains(TileEdges::BOTTOM) {
                    fill_clipped(host, PixelRect::new(edge_x, below, edge_x + edge_w, vh), clip);
                } else if tile.edges.contains(TileEdges::BOTTOM_SPACE) {
                    if let Some(next) = pages.get(index + 1) {
                        fill_clipped(
                            host,
                            PixelRect::new(edge_x, below, edge_x + edge_w, next.dest_y),
                            clip,
                        );
                    }
                }
                if tile.edges.contains(TileEdges::LEFT) {
                    fill_clipped(host, PixelRect::new(0, tile.dest_y, tile.dest_x, below), clip);
                }
                if tile.edges.contains(TileEdges::RIGHT) {
                    fill_clipped(
                        host,
                        PixelRect::new(tile.dest_x + w, tile.dest_y, vw, below),
                        clip,
                    );
                }
                draw_clipped(
                    host,
                    &tile.bitmap,
                    tile.bitmap.bounds(),
                    tile.dest_x,
                    tile.dest_y,
                    clip,
                );
            }
        }
    }

    pub(crate) fn update_scrollbars(&mut self) {
        let (content_w, content_h) = self.content_size();
        let step = self.config.scroll_step;
        let axis = |value: i32, content: i32, view: i32| ScrollAxis {
            value,
            maximum: content.max(view),
            slider_size: view,
            increment: step,
            page_increment: view,
        };
        let state = ScrollbarState {
            horizontal: axis(self.scroll_x, content_w, self.size.width),
            vertical: axis(self.scroll_y, content_h, self.size.height),
        };
        self.host.update_scrollbars(&state);
    }
}

impl<H: Host> Drop for Viewport<H> {
    fn drop(&mut self) {
        self.clipboard.release(self.id);
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDocument, FakeProvider, RecordingHost};

    fn viewport(document: FakeDocument, size: Size, continuous: bool) -> Viewport<RecordingHost> {
        let provider = FakeProvider::new().with_document("/docs/test.pdf", document);
        let config = ViewerConfig {
            continuous_mode: continuous,
            initial_zoom: Zoom::Percent(100.0),
            ..ViewerConfig::default()
        };
        let mut viewport = Viewport::new(Box::new(provider), RecordingHost::new(size), config);
        viewport
            .load_file(Path::new("/docs/test.pdf"), None, None)
            .unwrap();
        viewport
    }

    #[test]
    fn update_without_document_only_paints_background() {
        let mut viewport = Viewport::new(
            Box::new(FakeProvider::new()),
            RecordingHost::new(Size::new(100, 50)),
            ViewerConfig::default(),
        );
        viewport.update(viewport.request(3, 0, ScrollTarget::To(0)));
        assert_eq!(viewport.top_page(), 0);
        assert_eq!(viewport.host().fills, vec![PixelRect::new(0, 0, 100, 50)]);
        assert!(viewport.host().draws.is_empty());
    }

    #[test]
    fn single_page_mode_caches_only_the_displayed_page() {
        let mut viewport = viewport(FakeDocument::uniform(3, 600.0, 800.0), Size::new(800, 600), false);
        viewport.update(UpdateRequest {
            page: 2,
            ..viewport.request(2, 0, ScrollTarget::PageTop)
        });
        let pages: Vec<_> = viewport.cache().pages().iter().map(|p| p.page).collect();
        assert_eq!(pages, vec![2]);
        assert_eq!(viewport.top_page(), 2);
        assert_eq!(viewport.content_size(), (600, 800));
    }

    #[test]
    fn pages_outside_the_document_are_ignored() {
        let mut viewport = viewport(FakeDocument::uniform(3, 600.0, 800.0), Size::new(800, 600), false);
        viewport.update(viewport.request(9, 0, ScrollTarget::PageTop));
        assert_eq!(viewport.top_page(), 0);

        viewport.update(viewport.request(1, 0, ScrollTarget::PageTop));
        let draws = viewport.host().draws.len();
        viewport.update(viewport.request(9, 0, ScrollTarget::PageTop));
        viewport.update(viewport.request(0, 0, ScrollTarget::PageTop));
        assert_eq!(viewport.top_page(), 1);
        assert_eq!(viewport.host().draws.len(), draws);
    }

    #[test]
    fn unchanged_update_reuses_tiles() {
        let document = FakeDocument::uniform(3, 600.0, 800.0);
        let log = document.raster_log();
        let mut viewport = viewport(document, Size::new(800, 600), false);
        viewport.update(viewport.request(1, 0, ScrollTarget::PageTop));
        let after_first = log.lock().len();
        viewport.update(viewport.request(1, 0, ScrollTarget::To(100)));
        assert_eq!(log.lock().len(), after_first);
        assert_eq!(viewport.scroll_y(), 100);
    }

    #[test]
    fn failed_tiles_leave_page_blank() {
        let document = FakeDocument::uniform(2, 600.0, 800.0).failing_page(1);
        let mut viewport = viewport(document, Size::new(800, 600), false);
        viewport.update(viewport.request(1, 0, ScrollTarget::PageTop));
        assert_eq!(viewport.cache().tile_count(), 0);
        assert_eq!(viewport.top_page(), 1);
    }

    #[test]
    fn scrollbars_report_content_and_viewport() {
        let mut viewport = viewport(FakeDocument::uniform(3, 600.0, 800.0), Size::new(800, 600), true);
        viewport.update(viewport.request(1, 0, ScrollTarget::PageTop));
        let bars = viewport.host().scrollbars.unwrap();
        assert_eq!(bars.vertical.maximum, 2406);
        assert_eq!(bars.vertical.slider_size, 600);
        assert_eq!(bars.horizontal.maximum, 800);
        assert_eq!(bars.vertical.increment, 16);
    }
}
