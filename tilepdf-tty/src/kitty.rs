use std::io::Write;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use crossterm::{
    cursor,
    terminal::{Clear, ClearType},
};
use png::{BitDepth, ColorType, Encoder};
use tilepdf_core::Bitmap;
use tracing::trace;

/// Largest base64 payload the kitty protocol accepts per escape sequence.
const CHUNK_LEN: usize = 4096;

const FRAME_IMAGE_ID: u32 = 1;
const FRAME_PLACEMENT_ID: u32 = 1;

/// Cell area an image is scaled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawParams {
    pub columns: u32,
    pub rows: u32,
}

impl DrawParams {
    pub fn clamped(columns: u32, rows: u32) -> Self {
        Self {
            columns: columns.max(1),
            rows: rows.max(1),
        }
    }
}

/// Presents frames through the kitty graphics protocol. Every frame reuses
/// one image id, so the terminal replaces the previous frame in place.
pub struct KittyRenderer<W: Write> {
    writer: W,
}

impl<W: Write> KittyRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Transmits `frame` and places it at the cursor over `params` cells.
    pub fn draw(&mut self, frame: &Bitmap, params: DrawParams) -> Result<()> {
        if frame.width == 0 || frame.height == 0 {
            return Ok(());
        }
        let payload = BASE64.encode(encode_png(frame)?);
        let control = format!(
            "a=T,f=100,C=1,q=2,i={FRAME_IMAGE_ID},p={FRAME_PLACEMENT_ID},c={},r={},s={},v={},z=-1",
            params.columns, params.rows, frame.width, frame.height
        );
        trace!(bytes = payload.len(), "transmitting frame");
        self.transmit(&control, payload.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes `payload` in chunks; only the first chunk carries `control`.
    fn transmit(&mut self, control: &str, payload: &[u8]) -> Result<()> {
        let count = payload.len().div_ceil(CHUNK_LEN).max(1);
        for index in 0..count {
            let start = index * CHUNK_LEN;
            let chunk = &payload[start.min(payload.len())..(start + CHUNK_LEN).min(payload.len())];
            let more = u8::from(index + 1 < count);
            if index == 0 {
                write!(self.writer, "\u{1b}_G{control},m={more}")?;
            } else {
                write!(self.writer, "\u{1b}_Gm={more},q=2")?;
            }
            if !chunk.is_empty() {
                self.writer.write_all(b";")?;
                self.writer.write_all(chunk)?;
            }
            self.writer.write_all(b"\x1b\\")?;
        }
        Ok(())
    }

    /// Deletes every image placed on screen.
    pub fn delete_images(&mut self) -> Result<()> {
        self.writer.write_all(b"\x1b_Ga=d,d=A,q=2\x1b\\")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Buffers output until [`Self::end_sync_update`], so a frame and its
    /// status line appear together.
    pub fn begin_sync_update(&mut self) -> Result<()> {
        self.writer.write_all(b"\x1b[?2026h")?;
        Ok(())
    }

    pub fn end_sync_update(&mut self) -> Result<()> {
        self.writer.write_all(b"\x1b[?2026l")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn clear_all(&mut self) -> Result<()> {
        crossterm::execute!(self.writer, Clear(ClearType::All), cursor::MoveTo(0, 0))?;
        Ok(())
    }
}

fn encode_png(frame: &Bitmap) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(frame.pixels.len() / 2);
    let mut encoder = Encoder::new(&mut buffer, frame.width, frame.height);
    encoder.set_color(ColorType::Rgba);
    encoder.set_depth(BitDepth::Eight);
    let mut writer = encoder.write_header().context("png header")?;
    writer
        .write_image_data(&frame.pixels)
        .context("png frame data")?;
    writer.finish().context("png trailer")?;
    Ok(buffer)
}
