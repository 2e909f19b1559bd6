use tilepdf_core::{
    Bitmap, DocumentInfo, Host, LinkAction, PixelRect, ScrollbarState, Size,
};
use tracing::{debug, info};

/// What the status line shows about the viewport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusInfo {
    pub title: String,
    pub page: usize,
    pub busy: bool,
    pub hovered_link: Option<String>,
}

type PasswordPrompt = Box<dyn FnMut() -> Option<String>>;

/// [`Host`] that composes the viewport into an in-memory frame for the
/// terminal to display.
pub struct TerminalHost {
    frame: Bitmap,
    matte: [u8; 3],
    dirty: Option<PixelRect>,
    status: StatusInfo,
    scrollbars: Option<ScrollbarState>,
    password_prompt: Option<PasswordPrompt>,
    external: Vec<LinkAction>,
    quit: bool,
}

impl TerminalHost {
    pub fn new(size: Size, matte: [u8; 3]) -> Self {
        Self {
            frame: blank_frame(size, matte),
            matte,
            dirty: None,
            status: StatusInfo::default(),
            scrollbars: None,
            password_prompt: None,
            external: Vec::new(),
            quit: false,
        }
    }

    /// Called when an encrypted document needs a password.
    pub fn with_password_prompt(
        mut self,
        prompt: impl FnMut() -> Option<String> + 'static,
    ) -> Self {
        self.password_prompt = Some(Box::new(prompt));
        self
    }

    /// Reallocates the frame. The viewport must be told with
    /// `Viewport::resize` afterwards.
    pub fn resize(&mut self, size: Size) {
        self.frame = blank_frame(size, self.matte);
        self.dirty = Some(self.frame.bounds());
    }

    pub fn frame(&self) -> &Bitmap {
        &self.frame
    }

    /// Region painted since the last call.
    pub fn take_dirty(&mut self) -> Option<PixelRect> {
        self.dirty.take()
    }

    pub fn status(&self) -> &StatusInfo {
        &self.status
    }

    pub fn scrollbars(&self) -> Option<&ScrollbarState> {
        self.scrollbars.as_ref()
    }

    /// Link actions the viewport could not perform itself.
    pub fn take_external(&mut self) -> Vec<LinkAction> {
        std::mem::take(&mut self.external)
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    fn mark_dirty(&mut self, rect: PixelRect) {
        let Some(rect) = rect.intersect(&self.frame.bounds()) else {
            return;
        };
        self.dirty = Some(match self.dirty {
            Some(current) => union(current, rect),
            None => rect,
        });
    }
}

impl Host for TerminalHost {
    fn viewport_size(&self) -> Size {
        Size::new(self.frame.width as i32, self.frame.height as i32)
    }

    fn draw_tile(&mut self, bitmap: &Bitmap, src: PixelRect, dest_x: i32, dest_y: i32) {
        let target = PixelRect::from_origin_size(dest_x, dest_y, src.width(), src.height());
        let Some(visible) = target.intersect(&self.frame.bounds()) else {
            return;
        };
        let Some(source) = src
            .translate(visible.x_min - dest_x, visible.y_min - dest_y)
            .intersect(&bitmap.bounds())
        else {
            return;
        };
        let row_bytes = source.width() as usize * 4;
        for row in 0..source.height() {
            let from = pixel_offset(bitmap, source.x_min, source.y_min + row);
            let to = pixel_offset(&self.frame, visible.x_min, visible.y_min + row);
            self.frame.pixels[to..to + row_bytes]
                .copy_from_slice(&bitmap.pixels[from..from + row_bytes]);
        }
        self.mark_dirty(visible);
    }

    fn fill_background(&mut self, rect: PixelRect) {
        let Some(area) = rect.normalized().intersect(&self.frame.bounds()) else {
            return;
        };
        let [r, g, b] = self.matte;
        for y in area.y_min..area.y_max {
            let start = pixel_offset(&self.frame, area.x_min, y);
            let end = start + area.width() as usize * 4;
            for px in self.frame.pixels[start..end].chunks_exact_mut(4) {
                px.copy_from_slice(&[r, g, b, 0xff]);
            }
        }
        self.mark_dirty(area);
    }

    fn update_scrollbars(&mut self, state: &ScrollbarState) {
        self.scrollbars = Some(*state);
    }

    fn invalidate(&mut self, rect: PixelRect) {
        self.mark_dirty(rect);
    }

    fn set_busy(&mut self, busy: bool) {
        self.status.busy = busy;
    }

    fn page_changed(&mut self, page: usize) {
        self.status.page = page;
    }

    fn title_changed(&mut self, info: &DocumentInfo) {
        self.status.title = info.display_title();
    }

    fn link_hovered(&mut self, description: &str) {
        self.status.hovered_link = (!description.is_empty()).then(|| description.to_string());
    }

    fn request_password(&mut self) -> Option<String> {
        match self.password_prompt.as_mut() {
            Some(prompt) => prompt(),
            None => {
                debug!("document needs a password but no prompt is installed");
                None
            }
        }
    }

    fn open_external(&mut self, action: &LinkAction) {
        info!(link = %action.describe(), "external link activated");
        self.external.push(action.clone());
    }

    fn quit_requested(&mut self) {
        self.quit = true;
    }
}

fn blank_frame(size: Size, matte: [u8; 3]) -> Bitmap {
    Bitmap::filled(size.width.max(0) as u32, size.height.max(0) as u32, matte)
}

fn pixel_offset(bitmap: &Bitmap, x: i32, y: i32) -> usize {
    (y as usize * bitmap.width as usize + x as usize) * 4
}

fn union(a: PixelRect, b: PixelRect) -> PixelRect {
    PixelRect::new(
        a.x_min.min(b.x_min),
        a.y_min.min(b.y_min),
        a.x_max.max(b.x_max),
        a.y_max.max(b.y_max),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;

    use tilepdf_core::testing::{FakeDocument, FakeProvider};
    use tilepdf_core::{Rotation, ViewerConfig, Viewport, Zoom};

    const MATTE: [u8; 3] = [0x80, 0x80, 0x80];

    #[test]
    fn tiles_are_copied_and_clipped_to_the_frame() {
        let mut host = TerminalHost::new(Size::new(10, 10), MATTE);
        let tile = Bitmap::filled(8, 8, [0xff, 0, 0]);
        host.draw_tile(&tile, tile.bounds(), 6, 6);

        assert_eq!(host.frame().pixel(6, 6), Some([0xff, 0, 0, 0xff]));
        assert_eq!(host.frame().pixel(9, 9), Some([0xff, 0, 0, 0xff]));
        assert_eq!(host.frame().pixel(5, 5), Some([0x80, 0x80, 0x80, 0xff]));
        assert_eq!(host.take_dirty(), Some(PixelRect::new(6, 6, 10, 10)));
        assert_eq!(host.take_dirty(), None);
    }

    #[test]
    fn negative_destinations_skip_hidden_source_pixels() {
        let mut host = TerminalHost::new(Size::new(4, 4), MATTE);
        let mut tile = Bitmap::filled(4, 4, [0, 0, 0]);
        tile.xor_rect(PixelRect::new(2, 2, 3, 3), [0xff, 0xff, 0xff]);
        host.draw_tile(&tile, tile.bounds(), -2, -2);
        assert_eq!(host.frame().pixel(0, 0), Some([0xff, 0xff, 0xff, 0xff]));
        assert_eq!(host.frame().pixel(1, 1), Some([0, 0, 0, 0xff]));
        assert_eq!(host.frame().pixel(2, 2), Some([0x80, 0x80, 0x80, 0xff]));
    }

    #[test]
    fn viewport_paints_page_and_matte_into_frame() {
        let provider =
            FakeProvider::new().with_document("/docs/a.pdf", FakeDocument::uniform(2, 100.0, 200.0));
        let host = TerminalHost::new(Size::new(300, 150), MATTE);
        let config = ViewerConfig {
            continuous_mode: false,
            initial_zoom: Zoom::Percent(100.0),
            ..ViewerConfig::default()
        };
        let mut viewport = Viewport::new(Box::new(provider), host, config);
        viewport
            .load_file(Path::new("/docs/a.pdf"), None, None)
            .unwrap();
        viewport.display_page(2, Zoom::Percent(100.0), Rotation::None, true, true);

        let host = viewport.host();
        assert_eq!(host.status().page, 2);
        assert_eq!(host.status().title, "a.pdf");
        // The page is centered horizontally: matte, paper, matte.
        assert_eq!(host.frame().pixel(50, 10), Some([0x80, 0x80, 0x80, 0xff]));
        assert_eq!(host.frame().pixel(150, 10), Some([0xff, 0xff, 0xff, 0xff]));
        assert_eq!(host.frame().pixel(250, 10), Some([0x80, 0x80, 0x80, 0xff]));
        assert_eq!(host.scrollbars().unwrap().vertical.maximum, 200);
    }

    #[test]
    fn password_prompt_answers_encrypted_documents() {
        let provider = FakeProvider::new().with_document(
            "/docs/locked.pdf",
            FakeDocument::uniform(1, 100.0, 100.0).with_password("hunter2"),
        );
        let host = TerminalHost::new(Size::new(100, 100), MATTE)
            .with_password_prompt(|| Some("hunter2".to_string()));
        let mut viewport = Viewport::new(Box::new(provider), host, ViewerConfig::default());
        viewport
            .load_file(Path::new("/docs/locked.pdf"), None, None)
            .unwrap();
        assert_eq!(viewport.page_count(), 1);
    }

    #[test]
    fn hovering_nothing_clears_link_status() {
        let mut host = TerminalHost::new(Size::new(10, 10), MATTE);
        host.link_hovered("https://example.org");
        assert_eq!(host.status().hovered_link.as_deref(), Some("https://example.org"));
        host.link_hovered("");
        assert!(host.status().hovered_link.is_none());
    }
}
