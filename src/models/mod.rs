mod identifiers;

pub use identifiers::FileId;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A file known to the remote server.
///
/// Replaced wholesale whenever the listing is fetched again; nothing in the
/// client mutates a fetched value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub id: FileId,
    pub name: String,
    /// Extension-like type tag such as `mp4`, `pdf` or `jpg`.
    #[serde(rename = "ty")]
    pub file_type: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl FileMetadata {
    pub fn new(id: impl Into<FileId>, name: impl Into<String>, file_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            file_type: file_type.into(),
            tags: BTreeSet::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

pub const IMAGE_TYPES: &[&str] = &[
    "jpeg", "jpg", "png", "gif", "bmp", "tiff", "tif", "svg", "webp",
];
pub const VIDEO_TYPES: &[&str] = &["mp4"];
pub const DOCUMENT_TYPES: &[&str] = &["pdf"];

/// The browsing tabs a client offers. Each maps to one or more server-side
/// type filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MediaCategory {
    #[default]
    All,
    Images,
    Videos,
    Documents,
    /// Anything that is not an image, video or document. The server has no
    /// endpoint for this, so it is classified locally.
    Other,
}

impl MediaCategory {
    /// Server-side type filters for this category, in request order.
    /// `None` means a single unrestricted request.
    pub fn type_filters(&self) -> Option<&'static [&'static str]> {
        match self {
            MediaCategory::All | MediaCategory::Other => None,
            MediaCategory::Images => Some(IMAGE_TYPES),
            MediaCategory::Videos => Some(VIDEO_TYPES),
            MediaCategory::Documents => Some(DOCUMENT_TYPES),
        }
    }

    pub fn classify(file_type: &str) -> Self {
        let ty = file_type.to_ascii_lowercase();
        if IMAGE_TYPES.contains(&ty.as_str()) {
            MediaCategory::Images
        } else if VIDEO_TYPES.contains(&ty.as_str()) {
            MediaCategory::Videos
        } else if DOCUMENT_TYPES.contains(&ty.as_str()) {
            MediaCategory::Documents
        } else {
            MediaCategory::Other
        }
    }

    pub fn contains(&self, file: &FileMetadata) -> bool {
        match self {
            MediaCategory::All => true,
            other => Self::classify(&file.file_type) == *other,
        }
    }
}

impl std::str::FromStr for MediaCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(MediaCategory::All),
            "images" | "image" => Ok(MediaCategory::Images),
            "videos" | "video" => Ok(MediaCategory::Videos),
            "documents" | "pdf" | "pdfs" => Ok(MediaCategory::Documents),
            "other" => Ok(MediaCategory::Other),
            _ => Err(format!("unknown category: {}", s)),
        }
    }
}

/// Per-item preview state. Only `Pending -> Ready` and `Pending -> Failed`
/// are legal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ThumbnailState {
    #[default]
    Pending,
    Ready {
        uri: String,
    },
    Failed,
}

impl ThumbnailState {
    pub fn is_pending(&self) -> bool {
        matches!(self, ThumbnailState::Pending)
    }

    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    pub fn can_transition_to(&self, next: &ThumbnailState) -> bool {
        self.is_pending() && next.is_settled()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    pub metadata: FileMetadata,
    /// Content URL the preview is sampled from.
    pub source_url: String,
    pub thumbnail: ThumbnailState,
}

impl MediaItem {
    pub fn new(metadata: FileMetadata, source_url: impl Into<String>) -> Self {
        Self {
            metadata,
            source_url: source_url.into(),
            thumbnail: ThumbnailState::Pending,
        }
    }

    pub fn id(&self) -> &FileId {
        &self.metadata.id
    }
}
