use crate::backend::LinkAction;
use crate::bitmap::Bitmap;
use crate::geometry::{PixelRect, Size};
use crate::DocumentInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollAxis {
    pub value: i32,
    pub maximum: i32,
    pub slider_size: i32,
    pub increment: i32,
    pub page_increment: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollbarState {
    pub horizontal: ScrollAxis,
    pub vertical: ScrollAxis,
}

/// The window system side of a viewport: where pixels go and where user
/// notifications are delivered.
pub trait Host {
    fn viewport_size(&self) -> Size;

    /// Copies `src` (in bitmap pixels) of `bitmap` to the window at
    /// `(dest_x, dest_y)`.
    fn draw_tile(&mut self, bitmap: &Bitmap, src: PixelRect, dest_x: i32, dest_y: i32);

    /// Paints a window region not covered by any page.
    fn fill_background(&mut self, rect: PixelRect);

    fn update_scrollbars(&mut self, state: &ScrollbarState);

    /// A window region is about to be repainted.
    fn invalidate(&mut self, _rect: PixelRect) {}

    fn set_busy(&mut self, _busy: bool) {}

    fn page_changed(&mut self, _page: usize) {}

    fn title_changed(&mut self, _info: &DocumentInfo) {}

    /// Description of the link under the pointer, empty when leaving a link.
    fn link_hovered(&mut self, _description: &str) {}

    fn request_password(&mut self) -> Option<String> {
        None
    }

    /// Actions the viewport cannot carry out itself: external URIs and
    /// launching other programs.
    fn open_external(&mut self, _action: &LinkAction) {}

    fn quit_requested(&mut self) {}
}

/// Draws the part of `bitmap[src]` placed at `(dest_x, dest_y)` that falls
/// inside `clip`.
pub(crate) fn draw_clipped(
    host: &mut dyn Host,
    bitmap: &Bitmap,
    src: PixelRect,
    dest_x: i32,
    dest_y: i32,
    clip: PixelRect,
) {
    let Some(src) = src.intersect(&bitmap.bounds()) else {
        return;
    };
    let target = PixelRect::from_origin_size(dest_x, dest_y, src.width(), src.height());
    let Some(visible) = target.intersect(&clip) else {
        return;
    };
    let src = visible.translate(src.x_min - dest_x, src.y_min - dest_y);
    host.draw_tile(bitmap, src, visible.x_min, visible.y_min);
}

pub(crate) fn fill_clipped(host: &mut dyn Host, rect: PixelRect, clip: PixelRect) {
    if let Some(visible) = rect.intersect(&clip) {
        host.fill_background(visible);
    }
}
