use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod backend;
pub mod bitmap;
pub mod config;
pub mod geometry;
pub mod history;
pub mod host;
pub mod layout;
mod links;
mod navigation;
pub mod search;
pub mod selection;
pub mod text;
pub mod tile;
mod transform;
pub mod viewport;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use backend::{
    page_transform, slice_transform, Destination, DestinationKind, DocumentBackend,
    DocumentProvider, DocumentSource, Link, LinkAction, LinkTarget, LoadError, PageGeometry,
    RasterizedSlice, SliceProgress, SliceRasterizer, SliceRequest, SliceTransform,
};
pub use bitmap::Bitmap;
pub use config::ViewerConfig;
pub use geometry::{Matrix, PixelRect, Size, UserRect};
pub use host::{Host, ScrollAxis, ScrollbarState};
pub use layout::{Rotation, Zoom};
pub use search::FindOptions;
pub use selection::{ClipboardEntry, Selection, SelectionClipboard};
pub use text::{TextGlyph, TextPage};
pub use viewport::{ScrollTarget, UpdateRequest, Viewport, ViewportId};

pub type DocumentId = Uuid;

static DOCUMENT_NAMESPACE: Lazy<Uuid> =
    Lazy::new(|| Uuid::new_v5(&Uuid::NAMESPACE_URL, b"tilepdf:document"));

/// Stable identifier for a document file, independent of how its path was
/// spelled.
pub fn document_id_for_path(path: &Path) -> DocumentId {
    let resolved = path
        .canonicalize()
        .or_else(|_| {
            if path.is_absolute() {
                Ok(path.to_path_buf())
            } else {
                std::env::current_dir().map(|cwd| cwd.join(path))
            }
        })
        .unwrap_or_else(|_| path.to_path_buf());
    Uuid::new_v5(&DOCUMENT_NAMESPACE, resolved.to_string_lossy().as_bytes())
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub id: DocumentId,
    /// `None` for documents loaded from memory.
    pub path: Option<PathBuf>,
    pub page_count: usize,
    pub metadata: DocumentMetadata,
}

impl DocumentInfo {
    /// Title for window decorations: the document title with its author,
    /// else the file name.
    pub fn display_title(&self) -> String {
        if let Some(title) = self.metadata.title.as_deref().filter(|t| !t.trim().is_empty()) {
            return match self.metadata.author.as_deref().filter(|a| !a.trim().is_empty()) {
                Some(author) => format!("{title} ({author})"),
                None => title.to_string(),
            };
        }
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    #[test]
    fn document_id_is_stable_for_same_path() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("sample.pdf");
        std::fs::write(&file_path, b"dummy").unwrap();

        let first = document_id_for_path(&file_path);
        let second = document_id_for_path(&dir.path().join(".").join("sample.pdf"));

        assert_eq!(first, second);
    }

    #[test]
    fn display_title_prefers_metadata() {
        let mut info = DocumentInfo {
            id: Uuid::nil(),
            path: Some(PathBuf::from("/tmp/report.pdf")),
            page_count: 1,
            metadata: DocumentMetadata::default(),
        };
        assert_eq!(info.display_title(), "report.pdf");
        info.metadata.title = Some("Annual Report".into());
        assert_eq!(info.display_title(), "Annual Report");
        info.metadata.author = Some("J. Doe".into());
        assert_eq!(info.display_title(), "Annual Report (J. Doe)");
        info.metadata.author = Some("  ".into());
        assert_eq!(info.display_title(), "Annual Report");
        info.path = None;
        info.metadata.title = None;
        assert_eq!(info.display_title(), "untitled");
    }
}
