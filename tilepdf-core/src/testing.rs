//! In-memory documents and a recording host for exercising viewports without
//! a PDF engine or a window system.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use parking_lot::Mutex;

use crate::backend::{
    page_transform, slice_transform, Destination, DocumentBackend, DocumentProvider,
    DocumentSource, Link, LinkAction, LoadError, PageGeometry, RasterizedSlice, SliceProgress,
    SliceRasterizer, SliceRequest,
};
use crate::bitmap::Bitmap;
use crate::geometry::{PixelRect, Size, UserRect};
use crate::host::{Host, ScrollbarState};
use crate::layout::Rotation;
use crate::text::{TextGlyph, TextPage};
use crate::{document_id_for_path, DocumentInfo, DocumentMetadata};

pub const PAPER: [u8; 3] = [0xff, 0xff, 0xff];

/// Left margin and line pitch of fake page text, in points.
pub const TEXT_LEFT: f64 = 72.0;
pub const TEXT_TOP_MARGIN: f64 = 72.0;
pub const GLYPH_WIDTH: f64 = 6.0;
pub const GLYPH_HEIGHT: f64 = 10.0;
pub const LINE_PITCH: f64 = 14.0;

#[derive(Debug, Clone)]
pub struct FakePage {
    pub geometry: PageGeometry,
    pub lines: Vec<String>,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone)]
pub struct FakeDocument {
    info: DocumentInfo,
    pages: Vec<FakePage>,
    destinations: HashMap<String, Destination>,
    password: Option<String>,
    failing: Vec<usize>,
    reverse_video: bool,
    rasterized: Arc<Mutex<Vec<SliceRequest>>>,
}

impl FakeDocument {
    /// `count` pages of `width` x `height` points.
    pub fn uniform(count: usize, width: f64, height: f64) -> Self {
        let page = FakePage {
            geometry: PageGeometry {
                crop_box: UserRect::new(0.0, 0.0, width, height),
                rotation: Rotation::None,
            },
            lines: Vec::new(),
            links: Vec::new(),
        };
        Self {
            info: DocumentInfo {
                id: uuid::Uuid::nil(),
                path: None,
                page_count: count,
                metadata: DocumentMetadata::default(),
            },
            pages: vec![page; count],
            destinations: HashMap::new(),
            password: None,
            failing: Vec::new(),
            reverse_video: false,
            rasterized: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_page_size(mut self, page: usize, width: f64, height: f64) -> Self {
        if let Some(entry) = self.pages.get_mut(page - 1) {
            entry.geometry.crop_box = UserRect::new(0.0, 0.0, width, height);
        }
        self
    }

    pub fn with_page_rotation(mut self, page: usize, rotation: Rotation) -> Self {
        if let Some(entry) = self.pages.get_mut(page - 1) {
            entry.geometry.rotation = rotation;
        }
        self
    }

    /// Lines of text set from the top-left margin of `page`.
    pub fn with_text(mut self, page: usize, lines: &[&str]) -> Self {
        if let Some(entry) = self.pages.get_mut(page - 1) {
            entry.lines = lines.iter().map(|line| line.to_string()).collect();
        }
        self
    }

    pub fn with_link(mut self, page: usize, link: Link) -> Self {
        if let Some(entry) = self.pages.get_mut(page - 1) {
            entry.links.push(link);
        }
        self
    }

    pub fn with_destination(mut self, name: &str, destination: Destination) -> Self {
        self.destinations.insert(name.to_string(), destination);
        self
    }

    pub fn with_metadata(mut self, title: &str, author: &str) -> Self {
        self.info.metadata = DocumentMetadata {
            title: Some(title.to_string()),
            author: Some(author.to_string()),
        };
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    /// Rasterizing `page` fails.
    pub fn failing_page(mut self, page: usize) -> Self {
        self.failing.push(page);
        self
    }

    pub fn rasterized(&self) -> Vec<SliceRequest> {
        self.rasterized.lock().clone()
    }

    pub fn raster_log(&self) -> Arc<Mutex<Vec<SliceRequest>>> {
        Arc::clone(&self.rasterized)
    }

    pub fn reverse_video(&self) -> bool {
        self.reverse_video
    }

    /// User-space box of glyph `col` on text line `row`.
    pub fn glyph_box(&self, page: usize, row: usize, col: usize) -> UserRect {
        let top = self.geometry(page).crop_box.y_max - TEXT_TOP_MARGIN - row as f64 * LINE_PITCH;
        let left = TEXT_LEFT + col as f64 * GLYPH_WIDTH;
        UserRect::new(left, top - GLYPH_HEIGHT, left + GLYPH_WIDTH, top)
    }

    fn geometry(&self, page: usize) -> PageGeometry {
        self.pages
            .get(page.wrapping_sub(1))
            .map(|entry| entry.geometry)
            .unwrap_or(PageGeometry {
                crop_box: UserRect::new(0.0, 0.0, 612.0, 792.0),
                rotation: Rotation::None,
            })
    }
}

impl SliceRasterizer for FakeDocument {
    fn rasterize_slice(
        &self,
        request: &SliceRequest,
        progress: &mut dyn FnMut(SliceProgress<'_>),
    ) -> Result<RasterizedSlice> {
        self.rasterized.lock().push(*request);
        if self.failing.contains(&request.page) {
            bail!("page {} is broken", request.page);
        }
        let geometry = self.geometry(request.page);
        let transform = slice_transform(&geometry, request.h_dpi, request.rotation, request.slice);
        let mut bitmap = Bitmap::filled(
            request.slice.width().max(0) as u32,
            request.slice.height().max(0) as u32,
            PAPER,
        );
        if self.reverse_video {
            bitmap.invert();
        }
        progress(SliceProgress {
            bitmap: &bitmap,
            transform: &transform,
            dirty: bitmap.bounds(),
        });
        Ok(RasterizedSlice { bitmap, transform })
    }
}

impl DocumentBackend for FakeDocument {
    fn info(&self) -> &DocumentInfo {
        &self.info
    }

    fn page_geometry(&self, page: usize) -> PageGeometry {
        self.geometry(page)
    }

    fn page_links(&self, page: usize) -> Result<Vec<Link>> {
        Ok(self
            .pages
            .get(page.wrapping_sub(1))
            .map(|entry| entry.links.clone())
            .unwrap_or_default())
    }

    fn text_page(&self, page: usize, dpi: f64, rotation: Rotation) -> Result<TextPage> {
        let Some(entry) = self.pages.get(page.wrapping_sub(1)) else {
            bail!("page {page} out of range");
        };
        let transform = page_transform(&entry.geometry, dpi, rotation);
        let mut glyphs = Vec::new();
        for (row, line) in entry.lines.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                let user = self.glyph_box(page, row, col);
                let (x0, y0) = transform.ctm.apply(user.x_min, user.y_min);
                let (x1, y1) = transform.ctm.apply(user.x_max, user.y_max);
                glyphs.push(TextGlyph {
                    ch,
                    bbox: UserRect::new(x0, y0, x1, y1).normalized(),
                });
            }
            glyphs.push(TextGlyph {
                ch: '\n',
                bbox: UserRect::default(),
            });
        }
        Ok(TextPage::from_glyphs(glyphs))
    }

    fn find_destination(&self, name: &str) -> Option<Destination> {
        self.destinations.get(name).cloned()
    }

    fn set_reverse_video(&mut self, reverse: bool) {
        self.reverse_video = reverse;
    }
}

/// Hands out [`FakeDocument`]s registered by path. Unregistered paths are
/// read from disk: the file holds the page count of a letter-sized document.
#[derive(Debug, Clone, Default)]
pub struct FakeProvider {
    documents: Arc<Mutex<HashMap<PathBuf, FakeDocument>>>,
    opens: Arc<Mutex<usize>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, path: impl Into<PathBuf>, document: FakeDocument) -> Self {
        self.insert(path, document);
        self
    }

    pub fn insert(&self, path: impl Into<PathBuf>, document: FakeDocument) {
        self.documents.lock().insert(path.into(), document);
    }

    pub fn open_count(&self) -> usize {
        *self.opens.lock()
    }

    fn from_disk(path: &Path) -> Result<FakeDocument, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => LoadError::PermissionDenied(path.to_path_buf()),
            _ => LoadError::Damaged(err.to_string()),
        })?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<FakeDocument, LoadError> {
        match content.trim().parse::<usize>() {
            Ok(count) => Ok(FakeDocument::uniform(count, 612.0, 792.0)),
            Err(err) => Err(LoadError::Damaged(err.to_string())),
        }
    }
}

impl DocumentProvider for FakeProvider {
    fn open(
        &self,
        source: &DocumentSource,
        owner_password: Option<&str>,
        user_password: Option<&str>,
    ) -> Result<Box<dyn DocumentBackend>, LoadError> {
        *self.opens.lock() += 1;
        let mut document = match source {
            DocumentSource::Path(path) => match self.documents.lock().get(path).cloned() {
                Some(document) => document,
                None => Self::from_disk(path)?,
            },
            DocumentSource::Bytes(bytes) => Self::parse(&String::from_utf8_lossy(bytes))?,
        };
        if let Some(password) = document.password.as_deref() {
            if owner_password != Some(password) && user_password != Some(password) {
                return Err(LoadError::Encrypted);
            }
        }
        let path = source.path().map(Path::to_path_buf);
        let metadata = std::mem::take(&mut document.info.metadata);
        document.info = DocumentInfo {
            id: path
                .as_deref()
                .map(document_id_for_path)
                .unwrap_or_else(uuid::Uuid::nil),
            path,
            page_count: document.pages.len(),
            metadata,
        };
        Ok(Box::new(document))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub src: PixelRect,
    pub dest_x: i32,
    pub dest_y: i32,
}

/// Host that records every call made to it.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub size: Size,
    pub draws: Vec<DrawCall>,
    pub fills: Vec<PixelRect>,
    pub invalidations: Vec<PixelRect>,
    pub scrollbars: Option<ScrollbarState>,
    pub page_changes: Vec<usize>,
    pub busy: Vec<bool>,
    pub titles: Vec<Option<PathBuf>>,
    pub hovered: Vec<String>,
    pub passwords: VecDeque<String>,
    pub password_requests: usize,
    pub external: Vec<LinkAction>,
    pub quit_requests: usize,
}

impl RecordingHost {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Forgets recorded paint traffic.
    pub fn clear(&mut self) {
        self.draws.clear();
        self.fills.clear();
        self.invalidations.clear();
    }
}

impl Host for RecordingHost {
    fn viewport_size(&self) -> Size {
        self.size
    }

    fn draw_tile(&mut self, _bitmap: &Bitmap, src: PixelRect, dest_x: i32, dest_y: i32) {
        self.draws.push(DrawCall {
            src,
            dest_x,
            dest_y,
        });
    }

    fn fill_background(&mut self, rect: PixelRect) {
        self.fills.push(rect);
    }

    fn update_scrollbars(&mut self, state: &ScrollbarState) {
        self.scrollbars = Some(*state);
    }

    fn invalidate(&mut self, rect: PixelRect) {
        self.invalidations.push(rect);
    }

    fn set_busy(&mut self, busy: bool) {
        self.busy.push(busy);
    }

    fn page_changed(&mut self, page: usize) {
        self.page_changes.push(page);
    }

    fn title_changed(&mut self, info: &DocumentInfo) {
        self.titles.push(info.path.clone());
    }

    fn link_hovered(&mut self, description: &str) {
        self.hovered.push(description.to_string());
    }

    fn request_password(&mut self) -> Option<String> {
        self.password_requests += 1;
        self.passwords.pop_front()
    }

    fn open_external(&mut self, action: &LinkAction) {
        self.external.push(action.clone());
    }

    fn quit_requested(&mut self) {
        self.quit_requests += 1;
    }
}
