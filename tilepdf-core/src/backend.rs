use std::path::PathBuf;

use anyhow::Result;
use thiserror::Error;

use crate::bitmap::Bitmap;
use crate::geometry::{Matrix, PixelRect, UserRect};
use crate::layout::Rotation;
use crate::text::TextPage;
use crate::DocumentInfo;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("document not found: {0}")]
    NotFound(PathBuf),
    #[error("document is damaged: {0}")]
    Damaged(String),
    #[error("document is encrypted and no valid password was supplied")]
    Encrypted,
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl DocumentSource {
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            DocumentSource::Path(path) => Some(path),
            DocumentSource::Bytes(_) => None,
        }
    }
}

/// Crop box and intrinsic rotation of a page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub crop_box: UserRect,
    pub rotation: Rotation,
}

impl PageGeometry {
    /// Page size in points with the intrinsic rotation applied.
    pub fn rotated_size(&self) -> (f64, f64) {
        if self.rotation.swaps_axes() {
            (self.crop_box.height(), self.crop_box.width())
        } else {
            (self.crop_box.width(), self.crop_box.height())
        }
    }
}

/// Forward and inverse transforms between user space and slice-local device
/// space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceTransform {
    pub ctm: Matrix,
    pub ictm: Matrix,
}

impl SliceTransform {
    pub fn from_ctm(ctm: Matrix) -> Self {
        let ictm = ctm.invert().unwrap_or(Matrix::IDENTITY);
        Self { ctm, ictm }
    }
}

/// Transform for a whole page rendered at `dpi` with `rotation` applied on top
/// of the page's own rotation. Device space has its origin at the top-left of
/// the rendered page, y pointing down.
pub fn page_transform(geometry: &PageGeometry, dpi: f64, rotation: Rotation) -> SliceTransform {
    let s = dpi / 72.0;
    let UserRect {
        x_min: x0,
        y_min: y0,
        x_max: x1,
        y_max: y1,
    } = geometry.crop_box.normalized();
    let ctm = match geometry.rotation.rotate_by(rotation) {
        Rotation::None => Matrix([s, 0.0, 0.0, -s, -x0 * s, y1 * s]),
        Rotation::Cw90 => Matrix([0.0, s, s, 0.0, -y0 * s, -x0 * s]),
        Rotation::Cw180 => Matrix([-s, 0.0, 0.0, s, x1 * s, -y0 * s]),
        Rotation::Cw270 => Matrix([0.0, -s, -s, 0.0, y1 * s, x1 * s]),
    };
    SliceTransform::from_ctm(ctm)
}

/// Same as [`page_transform`], with device space starting at the slice origin.
pub fn slice_transform(
    geometry: &PageGeometry,
    dpi: f64,
    rotation: Rotation,
    slice: PixelRect,
) -> SliceTransform {
    let page = page_transform(geometry, dpi, rotation);
    SliceTransform::from_ctm(page.ctm.shifted(slice.x_min as f64, slice.y_min as f64))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceRequest {
    pub page: usize,
    pub h_dpi: f64,
    pub v_dpi: f64,
    pub rotation: Rotation,
    pub use_media_box: bool,
    /// Region of the rendered page, in page pixels.
    pub slice: PixelRect,
}

pub struct RasterizedSlice {
    pub bitmap: Bitmap,
    pub transform: SliceTransform,
}

/// Partial result reported while a slice is being rasterized. `dirty` is in
/// slice pixels and may extend past the bitmap; consumers clamp it.
pub struct SliceProgress<'a> {
    pub bitmap: &'a Bitmap,
    pub transform: &'a SliceTransform,
    pub dirty: PixelRect,
}

/// Narrow rendering capability handed to the tile cache.
pub trait SliceRasterizer {
    fn rasterize_slice(
        &self,
        request: &SliceRequest,
        progress: &mut dyn FnMut(SliceProgress<'_>),
    ) -> Result<RasterizedSlice>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DestinationKind {
    Xyz {
        left: Option<f64>,
        top: Option<f64>,
    },
    Fit,
    FitH {
        top: Option<f64>,
    },
    FitV {
        left: Option<f64>,
    },
    FitR(UserRect),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    /// 1-based page number; out-of-range values are treated as page 1.
    pub page: usize,
    pub kind: DestinationKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    Explicit(Destination),
    Named(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkAction {
    GoTo(LinkTarget),
    GoToRemote {
        file: PathBuf,
        target: Option<LinkTarget>,
    },
    Launch {
        file: PathBuf,
        params: Option<String>,
    },
    Uri(String),
    Named(String),
    Movie,
    Unknown,
}

impl LinkAction {
    /// Short human readable description shown while hovering the link.
    pub fn describe(&self) -> String {
        match self {
            LinkAction::GoTo(_) => "[internal link]".to_string(),
            LinkAction::GoToRemote { file, .. } | LinkAction::Launch { file, .. } => {
                file.display().to_string()
            }
            LinkAction::Uri(uri) => uri.clone(),
            LinkAction::Named(name) => name.clone(),
            LinkAction::Movie => "[movie]".to_string(),
            LinkAction::Unknown => "[unknown link]".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Activation area in user space.
    pub rect: UserRect,
    pub action: LinkAction,
}

pub trait DocumentBackend: SliceRasterizer {
    fn info(&self) -> &DocumentInfo;

    fn page_count(&self) -> usize {
        self.info().page_count
    }

    /// Geometry of a 1-based page. Implementations return a default letter
    /// page for numbers they cannot resolve.
    fn page_geometry(&self, page: usize) -> PageGeometry;

    fn page_links(&self, page: usize) -> Result<Vec<Link>>;

    /// Text of a page with glyph boxes in device space for `dpi`/`rotation`.
    fn text_page(&self, page: usize, dpi: f64, rotation: Rotation) -> Result<TextPage>;

    fn find_destination(&self, name: &str) -> Option<Destination>;

    fn set_reverse_video(&mut self, _reverse: bool) {}
}

pub trait DocumentProvider {
    fn open(
        &self,
        source: &DocumentSource,
        owner_password: Option<&str>,
        user_password: Option<&str>,
    ) -> Result<Box<dyn DocumentBackend>, LoadError>;
}
