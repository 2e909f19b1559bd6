use crate::geometry::PixelRect;

/// RGBA8 raster, row-major, no padding between rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Bitmap {
    pub fn filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            pixels.extend_from_slice(&[color[0], color[1], color[2], 0xff]);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width as i32, self.height as i32)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        let px = self.pixels.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// XORs `color` into every pixel of `rect` that lies inside the bitmap.
    /// Applying the same call twice restores the original pixels.
    pub fn xor_rect(&mut self, rect: PixelRect, color: [u8; 3]) -> Option<PixelRect> {
        let area = rect.normalized().intersect(&self.bounds())?;
        let stride = self.width as usize * 4;
        for y in area.y_min..area.y_max {
            let row = y as usize * stride;
            for x in area.x_min..area.x_max {
                let idx = row + x as usize * 4;
                self.pixels[idx] ^= color[0];
                self.pixels[idx + 1] ^= color[1];
                self.pixels[idx + 2] ^= color[2];
            }
        }
        Some(area)
    }

    pub fn invert(&mut self) {
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk[0] = 255 - chunk[0];
            chunk[1] = 255 - chunk[1];
            chunk[2] = 255 - chunk[2];
        }
    }
}
