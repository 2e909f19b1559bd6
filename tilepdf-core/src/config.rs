use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::layout::Zoom;

/// User-tunable viewer settings. Every field has a default, so partial
/// configuration files are accepted.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub continuous_mode: bool,
    #[serde_as(as = "DisplayFromStr")]
    pub initial_zoom: Zoom,
    pub selection_color: [u8; 3],
    pub paper_color: [u8; 3],
    pub matte_color: [u8; 3],
    /// Pixels moved by one line scroll.
    pub scroll_step: i32,
    pub reverse_video: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            continuous_mode: true,
            initial_zoom: Zoom::default(),
            selection_color: [0x80, 0x80, 0xff],
            paper_color: [0xff, 0xff, 0xff],
            matte_color: [0x80, 0x80, 0x80],
            scroll_step: 16,
            reverse_video: false,
        }
    }
}

impl ViewerConfig {
    /// Color XOR-ed into page pixels so that a selection over blank paper
    /// shows up as `selection_color`.
    pub fn selection_xor(&self) -> [u8; 3] {
        let paper = if self.reverse_video {
            self.paper_color.map(|c| 255 - c)
        } else {
            self.paper_color
        };
        [
            self.selection_color[0] ^ paper[0],
            self.selection_color[1] ^ paper[1],
            self.selection_color[2] ^ paper[2],
        ]
    }
}
