use crate::backend::{page_transform, SliceTransform};
use crate::host::Host;
use crate::viewport::Viewport;

/// Conversions between window, device (page pixel) and user (PDF point)
/// coordinates. All of them need the page to be resident; user space also
/// needs a transform from a finished or in-flight tile of that page.
impl<H: Host> Viewport<H> {
    /// Slice origin and transform usable for `page`.
    fn transform_for(&self, page: usize) -> Option<(i32, i32, SliceTransform)> {
        if let Some(tile) = self
            .cache
            .find(page)
            .and_then(|entry| entry.tiles().first())
        {
            return Some((tile.bounds.x_min, tile.bounds.y_min, tile.transform));
        }
        self.in_flight
            .filter(|tile| tile.page == page)
            .map(|tile| (tile.bounds.x_min, tile.bounds.y_min, tile.transform))
    }

    pub fn window_to_device(&self, xw: i32, yw: i32) -> Option<(usize, i32, i32)> {
        self.cache
            .pages()
            .iter()
            .find(|entry| entry.window_rect().contains(xw, yw))
            .map(|entry| (entry.page, xw - entry.dest_x, yw - entry.dest_y))
    }

    pub fn window_to_user(&self, xw: i32, yw: i32) -> Option<(usize, f64, f64)> {
        let (page, xd, yd) = self.window_to_device(xw, yw)?;
        let (xu, yu) = self.device_to_user(page, xd as f64, yd as f64)?;
        Some((page, xu, yu))
    }

    pub fn device_to_window(&self, page: usize, xd: i32, yd: i32) -> Option<(i32, i32)> {
        let entry = self.cache.find(page)?;
        Some((entry.dest_x + xd, entry.dest_y + yd))
    }

    pub fn user_to_device(&self, page: usize, xu: f64, yu: f64) -> Option<(f64, f64)> {
        let (x0, y0, transform) = self.transform_for(page)?;
        let (x, y) = transform.ctm.apply(xu, yu);
        Some((x + x0 as f64, y + y0 as f64))
    }

    pub fn device_to_user(&self, page: usize, xd: f64, yd: f64) -> Option<(f64, f64)> {
        let (x0, y0, transform) = self.transform_for(page)?;
        Some(transform.ictm.apply(xd - x0 as f64, yd - y0 as f64))
    }

    pub fn user_to_window(&self, page: usize, xu: f64, yu: f64) -> Option<(i32, i32)> {
        let (xd, yd) = self.user_to_device(page, xu, yu)?;
        self.device_to_window(page, round_pixel(xd), round_pixel(yd))
    }

    /// Like [`Viewport::user_to_device`], falling back to the page's default
    /// transform at the current resolution when nothing of it is resident.
    pub(crate) fn user_to_device_or_default(&self, page: usize, xu: f64, yu: f64) -> (i32, i32) {
        if let Some((xd, yd)) = self.user_to_device(page, xu, yu) {
            return (round_pixel(xd), round_pixel(yd));
        }
        let Some(document) = self.document.as_deref() else {
            return (0, 0);
        };
        let dpi = if self.dpi > 0.0 { self.dpi } else { 72.0 };
        let transform = page_transform(&document.page_geometry(page), dpi, self.rotation);
        let (xd, yd) = transform.ctm.apply(xu, yu);
        (round_pixel(xd), round_pixel(yd))
    }
}

pub(crate) fn round_pixel(v: f64) -> i32 {
    (v + 0.5).floor() as i32
}
