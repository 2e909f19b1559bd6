use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::backend::PageGeometry;
use crate::geometry::Size;

/// Vertical gap between consecutive pages in continuous mode, in pixels.
pub const PAGE_SPACING: i32 = 3;
pub const DEFAULT_ZOOM_PERCENT: f64 = 125.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Zoom {
    FitPage,
    FitWidth,
    FitHeight,
    Percent(f64),
}

impl Zoom {
    pub fn is_fit(&self) -> bool {
        !matches!(self, Zoom::Percent(_))
    }

    pub(crate) fn differs_from(&self, other: &Zoom) -> bool {
        match (self, other) {
            (Zoom::Percent(a), Zoom::Percent(b)) => (a - b).abs() > 1e-8,
            (a, b) => std::mem::discriminant(a) != std::mem::discriminant(b),
        }
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Zoom::Percent(DEFAULT_ZOOM_PERCENT)
    }
}

impl fmt::Display for Zoom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zoom::FitPage => f.write_str("page"),
            Zoom::FitWidth => f.write_str("width"),
            Zoom::FitHeight => f.write_str("height"),
            Zoom::Percent(percent) => write!(f, "{percent}"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid zoom {0:?}: expected page, width, height or a positive percentage")]
pub struct ParseZoomError(String);

impl FromStr for Zoom {
    type Err = ParseZoomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "page" | "fit" => return Ok(Zoom::FitPage),
            "width" => return Ok(Zoom::FitWidth),
            "height" => return Ok(Zoom::FitHeight),
            _ => {}
        }
        let number = trimmed.strip_suffix('%').unwrap_or(trimmed);
        match number.parse::<f64>() {
            Ok(percent) if percent.is_finite() && percent > 0.0 => Ok(Zoom::Percent(percent)),
            _ => Err(ParseZoomError(s.to_string())),
        }
    }
}

/// Clockwise display rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Accepts any multiple of 90, negative values included.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        Some(match degrees.rem_euclid(360) {
            0 => Rotation::None,
            90 => Rotation::Cw90,
            180 => Rotation::Cw180,
            _ => Rotation::Cw270,
        })
    }

    pub fn degrees(self) -> i32 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }

    pub fn rotate_by(self, other: Rotation) -> Rotation {
        Rotation::from_degrees(self.degrees() + other.degrees()).unwrap_or_default()
    }

    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Cw90 | Rotation::Cw270)
    }
}

/// Resolves a zoom to a rendering resolution.
///
/// `unscaled` is the page size in points used for fitting: the largest page of
/// the document in continuous mode, the displayed page otherwise. The caller
/// is responsible for swapping its axes under rotation.
pub fn resolve_dpi(zoom: Zoom, viewport: Size, unscaled: (f64, f64), continuous: bool) -> f64 {
    let (unscaled_w, unscaled_h) = unscaled;
    let h_dpi = || (viewport.width as f64 / unscaled_w) * 72.0;
    let v_dpi = || {
        let usable = if continuous {
            viewport.height - PAGE_SPACING
        } else {
            viewport.height
        };
        (usable as f64 / unscaled_h) * 72.0
    };
    let dpi = match zoom {
        Zoom::FitPage => h_dpi().min(v_dpi()),
        Zoom::FitWidth => h_dpi(),
        Zoom::FitHeight => v_dpi(),
        Zoom::Percent(percent) => 0.01 * percent * 72.0,
    };
    if dpi.is_finite() && dpi > 0.0 {
        dpi
    } else {
        1.0
    }
}

/// Rendered pixel size of a page, rounded to the nearest pixel.
pub fn scaled_page_size(geometry: &PageGeometry, dpi: f64, rotation: Rotation) -> (i32, i32) {
    let width = (geometry.crop_box.width() * dpi / 72.0 + 0.5) as i32;
    let height = (geometry.crop_box.height() * dpi / 72.0 + 0.5) as i32;
    if geometry.rotation.rotate_by(rotation).swaps_axes() {
        (height, width)
    } else {
        (width, height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub first: usize,
    pub top: usize,
    pub mid: usize,
    pub last: usize,
}

/// Vertical arrangement of every page in continuous mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentLayout {
    page_y: Vec<i32>,
    pub max_page_width: i32,
    pub total_height: i32,
}

impl DocumentLayout {
    pub fn compute(sizes: impl IntoIterator<Item = (i32, i32)>) -> Self {
        let mut layout = DocumentLayout::default();
        for (index, (width, height)) in sizes.into_iter().enumerate() {
            if index > 0 {
                layout.total_height += PAGE_SPACING;
            }
            layout.page_y.push(layout.total_height);
            layout.max_page_width = layout.max_page_width.max(width);
            layout.total_height += height;
        }
        layout
    }

    pub fn page_count(&self) -> usize {
        self.page_y.len()
    }

    /// Offset of the top of `page` (1-based); 0 for unknown pages.
    pub fn page_top(&self, page: usize) -> i32 {
        page.checked_sub(1)
            .and_then(|index| self.page_y.get(index))
            .copied()
            .unwrap_or(0)
    }

    /// Number of pages whose top is at or above `y`.
    fn pages_starting_at_or_above(&self, y: i32) -> usize {
        self.page_y.partition_point(|top| *top <= y)
    }

    /// Pages that should be resident for the given scroll position: those
    /// within half a viewport above and below the visible area.
    pub fn visible_window(&self, scroll_y: i32, viewport_height: i32) -> PageWindow {
        let half = viewport_height / 2;
        let first = self.pages_starting_at_or_above(scroll_y - half).max(1);
        let top = self.pages_starting_at_or_above(scroll_y).max(first);
        let mid = self.pages_starting_at_or_above(scroll_y + half).max(top);
        let last = self
            .pages_starting_at_or_above(scroll_y + viewport_height + half)
            .max(mid);
        PageWindow {
            first,
            top,
            mid,
            last,
        }
    }
}

/// Everything needed to turn page-space coordinates into window coordinates.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Placement {
    pub scroll_x: i32,
    pub scroll_y: i32,
    pub viewport: Size,
    pub continuous: bool,
    pub max_page_width: i32,
    pub total_height: i32,
}

impl Placement {
    /// Window position of the top-left corner of a page of the given size.
    /// Pages narrower (or shorter) than the available room are centered.
    pub fn page_origin(&self, page_top: i32, width: i32, height: i32) -> (i32, i32) {
        let mut x = -self.scroll_x;
        let mut y;
        if self.continuous {
            if width < self.max_page_width {
                x += (self.max_page_width - width) / 2;
            }
            if self.max_page_width < self.viewport.width {
                x += (self.viewport.width - self.max_page_width) / 2;
            }
            y = page_top - self.scroll_y;
            if self.total_height < self.viewport.height {
                y += (self.viewport.height - self.total_height) / 2;
            }
        } else {
            if width < self.viewport.width {
                x += (self.viewport.width - width) / 2;
            }
            y = -self.scroll_y;
            if height < self.viewport.height {
                y += (self.viewport.height - height) / 2;
            }
        }
        (x, y)
    }
}
