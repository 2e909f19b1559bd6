use bitflags::bitflags;
use tracing::{debug, instrument, warn};

use crate::backend::{DocumentBackend, Link, SliceProgress, SliceRequest, SliceTransform};
use crate::bitmap::Bitmap;
use crate::geometry::{PixelRect, Size};
use crate::host::{draw_clipped, Host};
use crate::layout::Rotation;
use crate::text::TextPage;

/// Lower bound for a tile side, in pixels.
pub const MIN_TILE_SIZE: i32 = 1500;

bitflags! {
    /// Which sides of a tile touch the outside of the document and need matte
    /// painted next to them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TileEdges: u8 {
        const TOP = 0x01;
        const BOTTOM = 0x02;
        const LEFT = 0x04;
        const RIGHT = 0x08;
        /// Top of a page in continuous mode.
        const TOP_SPACE = 0x10;
        /// Bottom of a page in continuous mode; the gap to the next page is
        /// painted below it.
        const BOTTOM_SPACE = 0x20;
    }
}

/// Tile side for a viewport dimension: twice the viewport but at least
/// [`MIN_TILE_SIZE`], shrunk to the page when the page is smaller.
pub fn tile_extent(viewport: i32, page: i32) -> i32 {
    let extent = (2 * viewport).max(MIN_TILE_SIZE);
    if extent > page {
        page.max(1)
    } else {
        extent
    }
}

#[derive(Debug, Clone)]
pub struct Tile {
    /// Area covered, in page pixels.
    pub bounds: PixelRect,
    pub dest_x: i32,
    pub dest_y: i32,
    pub edges: TileEdges,
    pub bitmap: Bitmap,
    pub transform: SliceTransform,
}

impl Tile {
    pub fn window_rect(&self) -> PixelRect {
        PixelRect::from_origin_size(
            self.dest_x,
            self.dest_y,
            self.bounds.width(),
            self.bounds.height(),
        )
    }
}

/// A tile whose rasterization is in progress. Coordinate conversions fall
/// back to it while the page has no finished tile yet.
#[derive(Debug, Clone, Copy)]
pub struct InFlightTile {
    pub page: usize,
    pub bounds: PixelRect,
    pub transform: SliceTransform,
}

/// A page resident in the cache, rendered at the current resolution.
#[derive(Debug)]
pub struct PageEntry {
    pub page: usize,
    pub width: i32,
    pub height: i32,
    pub tile_width: i32,
    pub tile_height: i32,
    pub dest_x: i32,
    pub dest_y: i32,
    tiles: Vec<Tile>,
    links: Option<Vec<Link>>,
    text: Option<TextPage>,
}

impl PageEntry {
    pub fn new(page: usize, width: i32, height: i32, viewport: Size) -> Self {
        Self {
            page,
            width,
            height,
            tile_width: tile_extent(viewport.width, width),
            tile_height: tile_extent(viewport.height, height),
            dest_x: 0,
            dest_y: 0,
            tiles: Vec::new(),
            links: None,
            text: None,
        }
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub(crate) fn tiles_mut(&mut self) -> &mut [Tile] {
        &mut self.tiles
    }

    pub fn window_rect(&self) -> PixelRect {
        PixelRect::from_origin_size(self.dest_x, self.dest_y, self.width, self.height)
    }

    /// Origins of every tile in the page grid.
    pub fn grid(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let ys = (0..self.height.max(1)).step_by(self.tile_height as usize);
        ys.flat_map(move |y| {
            (0..self.width.max(1))
                .step_by(self.tile_width as usize)
                .map(move |x| (x, y))
        })
    }

    /// Tile rectangle starting at `(x, y)`, clipped to the page.
    pub fn slice_at(&self, x: i32, y: i32) -> PixelRect {
        PixelRect::new(
            x,
            y,
            (x + self.tile_width).min(self.width),
            (y + self.tile_height).min(self.height),
        )
    }

    pub fn has_tile_at(&self, x: i32, y: i32) -> bool {
        self.tiles
            .iter()
            .any(|tile| tile.bounds.x_min == x && tile.bounds.y_min == y)
    }

    pub(crate) fn set_origin(&mut self, dest_x: i32, dest_y: i32) {
        self.dest_x = dest_x;
        self.dest_y = dest_y;
        for tile in &mut self.tiles {
            tile.dest_x = dest_x + tile.bounds.x_min;
            tile.dest_y = dest_y + tile.bounds.y_min;
        }
    }

    /// Drops tiles whose window rectangle lies entirely outside `keep`.
    pub(crate) fn evict_outside(&mut self, keep: PixelRect) {
        let before = self.tiles.len();
        self.tiles.retain(|tile| {
            let rect = tile.window_rect();
            !(rect.x_max < keep.x_min
                || rect.x_min > keep.x_max
                || rect.y_max < keep.y_min
                || rect.y_min > keep.y_max)
        });
        if self.tiles.len() != before {
            debug!(
                page = self.page,
                evicted = before - self.tiles.len(),
                "evicted tiles"
            );
        }
    }

    /// Grid origins of the tiles intersecting the window extended by half a
    /// viewport on every side.
    pub(crate) fn wanted_tiles(&self, viewport: Size) -> Vec<(i32, i32)> {
        let mut x0 = self.dest_x.max(-viewport.width / 2);
        let mut x1 = (self.dest_x + self.width - 1).min(viewport.width + viewport.width / 2);
        let mut y0 = self.dest_y.max(-viewport.height / 2);
        let mut y1 = (self.dest_y + self.height - 1).min(viewport.height + viewport.height / 2);
        x0 = (x0 - self.dest_x).div_euclid(self.tile_width) * self.tile_width;
        x1 = (x1 - self.dest_x).div_euclid(self.tile_width) * self.tile_width;
        y0 = (y0 - self.dest_y).div_euclid(self.tile_height) * self.tile_height;
        y1 = (y1 - self.dest_y).div_euclid(self.tile_height) * self.tile_height;

        let mut origins = Vec::new();
        let mut y = y0;
        while y <= y1 {
            let mut x = x0;
            while x <= x1 {
                origins.push((x, y));
                x += self.tile_width;
            }
            y += self.tile_height;
        }
        origins
    }

    fn edges_for(&self, bounds: PixelRect, continuous: bool, page_count: usize) -> TileEdges {
        let mut edges = TileEdges::empty();
        if bounds.x_min == 0 {
            edges |= TileEdges::LEFT;
        }
        if bounds.x_max == self.width {
            edges |= TileEdges::RIGHT;
        }
        if continuous {
            if bounds.y_min == 0 {
                edges |= TileEdges::TOP_SPACE;
                if self.page == 1 {
                    edges |= TileEdges::TOP;
                }
            }
            if bounds.y_max == self.height {
                edges |= TileEdges::BOTTOM_SPACE;
                if self.page == page_count {
                    edges |= TileEdges::BOTTOM;
                }
            }
        } else {
            if bounds.y_min == 0 {
                edges |= TileEdges::TOP;
            }
            if bounds.y_max == self.height {
                edges |= TileEdges::BOTTOM;
            }
        }
        edges
    }

    /// Rasterizes the tile at grid origin `(x, y)` unless it is already
    /// resident. Returns whether a new tile was produced.
    #[instrument(skip(self, ctx), fields(page = self.page))]
    pub(crate) fn request_tile(&mut self, x: i32, y: i32, ctx: &mut RasterContext<'_>) -> bool {
        if self.has_tile_at(x, y) {
            return false;
        }
        let bounds = self.slice_at(x, y);
        let dest_x = self.dest_x + bounds.x_min;
        let dest_y = self.dest_y + bounds.y_min;
        let edges = self.edges_for(bounds, ctx.continuous, ctx.page_count);
        let request = SliceRequest {
            page: self.page,
            h_dpi: ctx.dpi,
            v_dpi: ctx.dpi,
            rotation: ctx.rotation,
            use_media_box: false,
            slice: bounds,
        };
        let clip = PixelRect::from_origin_size(0, 0, ctx.viewport.width, ctx.viewport.height);
        let page = self.page;
        let document = ctx.document;
        let host: &mut dyn Host = &mut *ctx.host;
        let in_flight = &mut *ctx.in_flight;

        host.set_busy(true);
        let result = document.rasterize_slice(&request, &mut |progress: SliceProgress<'_>| {
            *in_flight = Some(InFlightTile {
                page,
                bounds,
                transform: *progress.transform,
            });
            let tile_area = PixelRect::new(0, 0, bounds.width(), bounds.height());
            if let Some(dirty) = progress.dirty.intersect(&tile_area) {
                draw_clipped(
                    host,
                    progress.bitmap,
                    dirty,
                    dest_x + dirty.x_min,
                    dest_y + dirty.y_min,
                    clip,
                );
            }
        });
        *in_flight = None;
        host.set_busy(false);

        match result {
            Ok(slice) => {
                self.tiles.push(Tile {
                    bounds,
                    dest_x,
                    dest_y,
                    edges,
                    bitmap: slice.bitmap,
                    transform: slice.transform,
                });
                true
            }
            Err(err) => {
                warn!(?err, page, x, y, "failed to rasterize tile");
                false
            }
        }
    }

    /// Link table of the page, fetched on first use.
    pub(crate) fn links(&mut self, document: &dyn DocumentBackend) -> &[Link] {
        let page = self.page;
        self.links.get_or_insert_with(|| {
            document.page_links(page).unwrap_or_else(|err| {
                warn!(?err, page, "failed to read page links");
                Vec::new()
            })
        })
    }

    /// Text of the page at the resolution it is displayed at, extracted on
    /// first use.
    pub(crate) fn text(
        &mut self,
        document: &dyn DocumentBackend,
        dpi: f64,
        rotation: Rotation,
    ) -> &mut TextPage {
        let page = self.page;
        self.text.get_or_insert_with(|| {
            document
                .text_page(page, dpi, rotation)
                .unwrap_or_else(|err| {
                    warn!(?err, page, "failed to extract page text");
                    TextPage::default()
                })
        })
    }

    pub(crate) fn cached_text(&self) -> Option<&TextPage> {
        self.text.as_ref()
    }
}

/// Shared state handed down while rasterizing tiles.
pub(crate) struct RasterContext<'a> {
    pub document: &'a dyn DocumentBackend,
    pub host: &'a mut dyn Host,
    pub in_flight: &'a mut Option<InFlightTile>,
    pub dpi: f64,
    pub rotation: Rotation,
    pub continuous: bool,
    pub page_count: usize,
    pub viewport: Size,
}

/// Pages currently resident, kept sorted by page number. In continuous mode
/// they form a contiguous run.
#[derive(Debug, Default)]
pub struct TileCache {
    pages: Vec<PageEntry>,
}

impl TileCache {
    pub fn pages(&self) -> &[PageEntry] {
        &self.pages
    }

    pub(crate) fn pages_mut(&mut self) -> &mut [PageEntry] {
        &mut self.pages
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }

    pub fn find(&self, page: usize) -> Option<&PageEntry> {
        self.pages.iter().find(|entry| entry.page == page)
    }

    pub(crate) fn find_mut(&mut self, page: usize) -> Option<&mut PageEntry> {
        self.pages.iter_mut().find(|entry| entry.page == page)
    }

    pub fn first(&self) -> Option<&PageEntry> {
        self.pages.first()
    }

    pub fn last(&self) -> Option<&PageEntry> {
        self.pages.last()
    }

    pub(crate) fn insert(&mut self, entry: PageEntry) {
        let index = self.pages.partition_point(|existing| existing.page < entry.page);
        if self.pages.get(index).is_some_and(|existing| existing.page == entry.page) {
            self.pages[index] = entry;
        } else {
            self.pages.insert(index, entry);
        }
    }

    /// Keeps only pages within `first..=last`.
    pub(crate) fn retain_range(&mut self, first: usize, last: usize) {
        self.pages
            .retain(|entry| entry.page >= first && entry.page <= last);
    }

    pub fn tile_count(&self) -> usize {
        self.pages.iter().map(|entry| entry.tiles.len()).sum()
    }
}
