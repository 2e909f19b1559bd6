use std::convert::TryFrom;
use std::fs::File;
use std::io::ErrorKind;
use std::mem;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use image::{imageops, RgbaImage};
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use tilepdf_core::{
    document_id_for_path, page_transform, slice_transform, Bitmap, Destination, DestinationKind,
    DocumentBackend, DocumentInfo, DocumentMetadata, DocumentProvider, DocumentSource, Link,
    LinkAction, LinkTarget, LoadError, PageGeometry, PixelRect, RasterizedSlice, Rotation,
    SliceProgress, SliceRasterizer, SliceRequest, TextGlyph, TextPage, UserRect,
};
use tracing::{debug, info, instrument, warn};

/// Environment variable naming an explicit pdfium shared library.
pub const PDFIUM_LIBRARY_ENV: &str = "PDFIUM_DYNAMIC_LIB_PATH";

const PAPER: [u8; 3] = [0xff, 0xff, 0xff];

/// Opens PDF files and buffers with pdfium.
pub struct PdfiumProvider {
    pdfium: Arc<Pdfium>,
}

impl PdfiumProvider {
    pub fn new() -> Result<Self> {
        let pdfium = match bind_pdfium_from_env() {
            Some(pdfium) => pdfium,
            None => bind_pdfium_default()?,
        };
        Ok(Self {
            pdfium: Arc::new(pdfium),
        })
    }

    fn load(
        &self,
        source: &DocumentSource,
        password: Option<&str>,
    ) -> Result<PdfDocument<'static>, LoadError> {
        let loaded = match source {
            DocumentSource::Path(path) => self.pdfium.load_pdf_from_file(path, password),
            DocumentSource::Bytes(bytes) => {
                self.pdfium.load_pdf_from_byte_vec(bytes.clone(), password)
            }
        };
        let document = loaded.map_err(classify_pdfium_error)?;
        // SAFETY: the document borrows the bindings owned by `self.pdfium`. It is
        // only ever stored in a `PdfiumDocument`, whose `document` field is
        // declared before its clone of that `Arc`. Fields drop in declaration
        // order, so the bindings outlive the document.
        Ok(unsafe { mem::transmute::<PdfDocument<'_>, PdfDocument<'static>>(document) })
    }
}

impl DocumentProvider for PdfiumProvider {
    #[instrument(skip(self, owner_password, user_password))]
    fn open(
        &self,
        source: &DocumentSource,
        owner_password: Option<&str>,
        user_password: Option<&str>,
    ) -> Result<Box<dyn DocumentBackend>, LoadError> {
        if let DocumentSource::Path(path) = source {
            check_readable(path)?;
        }
        let mut last_error = LoadError::Encrypted;
        for password in password_candidates(owner_password, user_password) {
            match self.load(source, password) {
                Ok(document) => {
                    let document =
                        PdfiumDocument::new(document, Arc::clone(&self.pdfium), source.path());
                    info!(pages = document.info.page_count, "opened with pdfium");
                    return Ok(Box::new(document));
                }
                Err(err) => last_error = err,
            }
        }
        Err(last_error)
    }
}

/// pdfium takes a single password, so the owner password is tried before
/// the user password.
fn password_candidates<'a>(owner: Option<&'a str>, user: Option<&'a str>) -> Vec<Option<&'a str>> {
    let mut candidates: Vec<Option<&str>> = owner.into_iter().chain(user).map(Some).collect();
    candidates.dedup();
    if candidates.is_empty() {
        candidates.push(None);
    }
    candidates
}

fn check_readable(path: &Path) -> Result<(), LoadError> {
    File::open(path)
        .map(drop)
        .map_err(|err| match err.kind() {
            ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => LoadError::PermissionDenied(path.to_path_buf()),
            _ => LoadError::Damaged(err.to_string()),
        })
}

fn classify_pdfium_error(err: PdfiumError) -> LoadError {
    match err {
        PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::PasswordError | PdfiumInternalError::SecurityError,
        ) => LoadError::Encrypted,
        other => LoadError::Damaged(other.to_string()),
    }
}

struct PdfiumDocument {
    document: PdfDocument<'static>,
    pages: Vec<PageGeometry>,
    info: DocumentInfo,
    reverse_video: bool,
    cache: Mutex<Option<RenderCacheEntry>>,
    /// Keeps the bindings `document` borrows alive.
    _pdfium: Arc<Pdfium>,
}

/// Last full page render. Tiles of one page are cut from the same render.
struct RenderCacheEntry {
    page: usize,
    dpi: f64,
    rotation: Rotation,
    image: Arc<RgbaImage>,
}

impl PdfiumDocument {
    fn new(document: PdfDocument<'static>, pdfium: Arc<Pdfium>, path: Option<&Path>) -> Self {
        let pages: Vec<PageGeometry> = document
            .pages()
            .iter()
            .map(|page| page_geometry_of(&page))
            .collect();
        let info = build_document_info(&document, path, pages.len());
        Self {
            document,
            pages,
            info,
            reverse_video: false,
            cache: Mutex::new(None),
            _pdfium: pdfium,
        }
    }

    fn page(&self, page: usize) -> Result<PdfPage<'_>> {
        let index = page
            .checked_sub(1)
            .and_then(|index| PdfPageIndex::try_from(index).ok())
            .ok_or_else(|| anyhow!("page {page} is out of supported range"))?;
        self.document
            .pages()
            .get(index)
            .with_context(|| format!("page {page} out of range"))
    }

    /// The whole page rendered at `dpi` and turned by `rotation`, reusing the
    /// previous render when it matches.
    fn rendered_page(&self, page: usize, dpi: f64, rotation: Rotation) -> Result<Arc<RgbaImage>> {
        {
            let cache = self.cache.lock();
            if let Some(entry) = cache.as_ref() {
                if entry.page == page
                    && (entry.dpi - dpi).abs() < f64::EPSILON
                    && entry.rotation == rotation
                {
                    return Ok(Arc::clone(&entry.image));
                }
            }
        }

        let pdf_page = self.page(page)?;
        let config = PdfRenderConfig::new().scale_page_by_factor((dpi / 72.0).max(0.01) as f32);
        let bitmap = pdf_page
            .render_with_config(&config)
            .with_context(|| format!("failed to render page {page}"))?;
        let rendered = bitmap.as_image().to_rgba8();
        let (width, height) = rendered.dimensions();
        let image = RgbaImage::from_raw(width, height, rendered.into_raw())
            .ok_or_else(|| anyhow!("pdfium returned a short bitmap for page {page}"))?;
        let image = Arc::new(rotate_image(image, rotation));

        *self.cache.lock() = Some(RenderCacheEntry {
            page,
            dpi,
            rotation,
            image: Arc::clone(&image),
        });
        Ok(image)
    }
}

impl SliceRasterizer for PdfiumDocument {
    #[instrument(skip(self, progress), fields(page = request.page))]
    fn rasterize_slice(
        &self,
        request: &SliceRequest,
        progress: &mut dyn FnMut(SliceProgress<'_>),
    ) -> Result<RasterizedSlice> {
        let image = self.rendered_page(request.page, request.h_dpi, request.rotation)?;
        let mut bitmap = crop_slice(&image, request.slice);
        if self.reverse_video {
            bitmap.invert();
        }
        let transform = slice_transform(
            &self.page_geometry(request.page),
            request.h_dpi,
            request.rotation,
            request.slice,
        );
        progress(SliceProgress {
            bitmap: &bitmap,
            transform: &transform,
            dirty: bitmap.bounds(),
        });
        Ok(RasterizedSlice { bitmap, transform })
    }
}

impl DocumentBackend for PdfiumDocument {
    fn info(&self) -> &DocumentInfo {
        &self.info
    }

    fn page_geometry(&self, page: usize) -> PageGeometry {
        self.pages
            .get(page.wrapping_sub(1))
            .copied()
            .unwrap_or(PageGeometry {
                crop_box: UserRect::new(0.0, 0.0, 612.0, 792.0),
                rotation: Rotation::None,
            })
    }

    fn page_links(&self, page: usize) -> Result<Vec<Link>> {
        let pdf_page = self.page(page)?;
        let mut links = Vec::new();
        for link in pdf_page.links().iter() {
            let rect = match link.rect() {
                Ok(rect) => rect,
                Err(err) => {
                    warn!(?err, page, "failed to resolve link rectangle");
                    continue;
                }
            };
            links.push(Link {
                rect: UserRect::new(
                    rect.left().value as f64,
                    rect.bottom().value as f64,
                    rect.right().value as f64,
                    rect.top().value as f64,
                )
                .normalized(),
                action: link_action_from_pdfium(&link),
            });
        }
        Ok(links)
    }

    fn text_page(&self, page: usize, dpi: f64, rotation: Rotation) -> Result<TextPage> {
        let pdf_page = self.page(page)?;
        let text = pdf_page
            .text()
            .with_context(|| format!("failed to extract text for page {page}"))?;
        let transform = page_transform(&self.page_geometry(page), dpi, rotation);
        let mut glyphs = Vec::new();
        for glyph in text.chars().iter() {
            let Some(ch) = glyph.unicode_char() else {
                continue;
            };
            let bbox = match glyph.loose_bounds() {
                Ok(bounds) => {
                    let (x0, y0) = transform
                        .ctm
                        .apply(bounds.left().value as f64, bounds.bottom().value as f64);
                    let (x1, y1) = transform
                        .ctm
                        .apply(bounds.right().value as f64, bounds.top().value as f64);
                    UserRect::new(x0, y0, x1, y1).normalized()
                }
                Err(_) if ch == '\n' => UserRect::default(),
                Err(_) => continue,
            };
            glyphs.push(TextGlyph { ch, bbox });
        }
        Ok(TextPage::from_glyphs(glyphs))
    }

    fn find_destination(&self, name: &str) -> Option<Destination> {
        debug!(name, "named destinations are not resolved by pdfium bindings");
        None
    }

    fn set_reverse_video(&mut self, reverse: bool) {
        self.reverse_video = reverse;
    }
}

fn page_geometry_of(page: &PdfPage<'_>) -> PageGeometry {
    let rotation = match page.rotation() {
        Ok(PdfPageRenderRotation::Degrees90) => Rotation::Cw90,
        Ok(PdfPageRenderRotation::Degrees180) => Rotation::Cw180,
        Ok(PdfPageRenderRotation::Degrees270) => Rotation::Cw270,
        _ => Rotation::None,
    };
    // pdfium reports the size of the page as displayed, with /Rotate applied.
    let (width, height) = (page.width().value as f64, page.height().value as f64);
    let (width, height) = if rotation.swaps_axes() {
        (height, width)
    } else {
        (width, height)
    };
    PageGeometry {
        crop_box: UserRect::new(0.0, 0.0, width, height),
        rotation,
    }
}

fn goto_page(page_index: usize) -> LinkAction {
    LinkAction::GoTo(LinkTarget::Explicit(Destination {
        page: page_index + 1,
        kind: DestinationKind::Xyz {
            left: None,
            top: None,
        },
    }))
}

fn link_action_from_pdfium(link: &PdfLink<'_>) -> LinkAction {
    if let Some(action) = link.action() {
        match action.action_type() {
            PdfActionType::GoToDestinationInSameDocument => {
                if let Some(local) = action.as_local_destination_action() {
                    if let Ok(destination) = local.destination() {
                        if let Ok(page_index) = destination.page_index() {
                            return goto_page(page_index as usize);
                        }
                    }
                }
            }
            PdfActionType::Uri => {
                if let Some(uri_action) = action.as_uri_action() {
                    if let Ok(uri) = uri_action.uri() {
                        if !uri.is_empty() {
                            return LinkAction::Uri(uri);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(destination) = link.destination() {
        if let Ok(page_index) = destination.page_index() {
            return goto_page(page_index as usize);
        }
    }

    LinkAction::Unknown
}

fn build_document_info(
    document: &PdfDocument<'_>,
    path: Option<&Path>,
    page_count: usize,
) -> DocumentInfo {
    let metadata = document.metadata();
    let title = metadata
        .get(PdfDocumentMetadataTagType::Title)
        .map(|t| t.value().to_owned());
    let author = metadata
        .get(PdfDocumentMetadataTagType::Author)
        .map(|t| t.value().to_owned());

    DocumentInfo {
        id: path.map(document_id_for_path).unwrap_or_default(),
        path: path.map(Path::to_path_buf),
        page_count,
        metadata: DocumentMetadata { title, author },
    }
}

fn rotate_image(image: RgbaImage, rotation: Rotation) -> RgbaImage {
    match rotation {
        Rotation::None => image,
        Rotation::Cw90 => imageops::rotate90(&image),
        Rotation::Cw180 => imageops::rotate180(&image),
        Rotation::Cw270 => imageops::rotate270(&image),
    }
}

/// Copies `slice` out of a page render. Parts of the slice past the render
/// (rounding differences at the page edge) stay paper colored.
fn crop_slice(image: &RgbaImage, slice: PixelRect) -> Bitmap {
    let width = slice.width().max(0) as u32;
    let height = slice.height().max(0) as u32;
    let mut bitmap = Bitmap::filled(width, height, PAPER);
    let (x0, y0) = (slice.x_min.max(0) as u32, slice.y_min.max(0) as u32);
    let view = imageops::crop_imm(image, x0, y0, width, height).to_image();
    for (x, y, pixel) in view.enumerate_pixels() {
        let offset = ((y * width + x) * 4) as usize;
        bitmap.pixels[offset..offset + 4].copy_from_slice(&pixel.0);
    }
    bitmap
}

fn bind_pdfium_from_env() -> Option<Pdfium> {
    let path = std::env::var_os(PDFIUM_LIBRARY_ENV)?;
    if path.is_empty() {
        return None;
    }
    match Pdfium::bind_to_library(&path) {
        Ok(bindings) => Some(Pdfium::new(bindings)),
        Err(err) => {
            warn!(
                "failed to load Pdfium from {}: {}",
                Path::new(&path).display(),
                err
            );
            None
        }
    }
}

fn bind_pdfium_default() -> Result<Pdfium> {
    let mut errors = Vec::new();

    let cwd_path = Pdfium::pdfium_platform_library_name_at_path("./");

    match Pdfium::bind_to_library(&cwd_path) {
        Ok(bindings) => return Ok(Pdfium::new(bindings)),
        Err(err) => {
            errors.push(format!("{}: {}", cwd_path.display(), err));
        }
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(err) => {
            errors.push(format!("system: {err}"));
            Err(anyhow!(
                "failed to bind to a pdfium library; set {PDFIUM_LIBRARY_ENV} or install it ({})",
                errors.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use image::Rgba;
    use tempfile::tempdir;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 0xff]))
    }

    #[test]
    fn owner_password_is_tried_first() {
        assert_eq!(password_candidates(None, None), vec![None]);
        assert_eq!(
            password_candidates(Some("owner"), Some("user")),
            vec![Some("owner"), Some("user")]
        );
        assert_eq!(password_candidates(Some("same"), Some("same")), vec![Some("same")]);
        assert_eq!(password_candidates(None, Some("user")), vec![Some("user")]);
    }

    #[test]
    fn missing_files_are_reported_before_pdfium_runs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.pdf");
        assert!(matches!(check_readable(&path), Err(LoadError::NotFound(p)) if p == path));

        let present = dir.path().join("present.pdf");
        std::fs::write(&present, b"%PDF-1.7").unwrap();
        assert!(check_readable(&present).is_ok());
    }

    #[test]
    fn slices_are_cut_from_the_page_render() {
        let image = gradient(40, 30);
        let bitmap = crop_slice(&image, PixelRect::new(10, 5, 20, 15));
        assert_eq!((bitmap.width, bitmap.height), (10, 10));
        assert_eq!(bitmap.pixel(0, 0), Some([10, 5, 0, 0xff]));
        assert_eq!(bitmap.pixel(9, 9), Some([19, 14, 0, 0xff]));
    }

    #[test]
    fn slice_past_render_edge_is_paper() {
        let image = gradient(40, 30);
        let bitmap = crop_slice(&image, PixelRect::new(35, 25, 45, 31));
        assert_eq!(bitmap.pixel(4, 4), Some([39, 29, 0, 0xff]));
        assert_eq!(bitmap.pixel(5, 0), Some([0xff, 0xff, 0xff, 0xff]));
        assert_eq!(bitmap.pixel(0, 5), Some([0xff, 0xff, 0xff, 0xff]));
    }

    #[test]
    fn rotation_turns_the_render() {
        let image = gradient(40, 30);
        let turned = rotate_image(image.clone(), Rotation::Cw90);
        assert_eq!(turned.dimensions(), (30, 40));
        // The top-left pixel of a clockwise turn is the old bottom-left.
        assert_eq!(turned.get_pixel(0, 0), image.get_pixel(0, 29));
        assert_eq!(rotate_image(image.clone(), Rotation::Cw180).dimensions(), (40, 30));
        assert_eq!(rotate_image(image, Rotation::None).get_pixel(3, 4).0, [3, 4, 0, 0xff]);
    }

    #[test]
    fn links_to_pages_are_one_based() {
        match goto_page(0) {
            LinkAction::GoTo(LinkTarget::Explicit(destination)) => assert_eq!(destination.page, 1),
            other => panic!("unexpected action {other:?}"),
        }
    }
}
