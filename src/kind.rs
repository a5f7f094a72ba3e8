//! File-kind buckets used by the kind facet and the thumbnail resolver.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const PHOTO: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "heic", "heif", "bmp", "tiff", "svg", "jfif",
];
const VIDEO: &[&str] = &["mp4", "mov", "avi", "wmv", "mkv", "webm", "ogg"];
const PDF: &[&str] = &["pdf"];
const DOCUMENTS: &[&str] = &[
    "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "rtf", "csv", "one",
];

/// The closed set of file-kind categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KindBucket {
    Photo,
    Video,
    #[serde(rename = "PDF")]
    Pdf,
    Documents,
    /// Everything not in one of the four named buckets.
    Other,
}

impl KindBucket {
    pub const ALL: [KindBucket; 5] = [
        Self::Photo,
        Self::Video,
        Self::Pdf,
        Self::Documents,
        Self::Other,
    ];

    /// Canonical display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "Photo",
            Self::Video => "Video",
            Self::Pdf => "PDF",
            Self::Documents => "Documents",
            Self::Other => "Other",
        }
    }

    /// Extensions belonging to a named bucket. `Other` has none; it is the
    /// complement of the rest.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Photo => PHOTO,
            Self::Video => VIDEO,
            Self::Pdf => PDF,
            Self::Documents => DOCUMENTS,
            Self::Other => &[],
        }
    }

    /// Bucket for a file kind token (case-insensitive).
    pub fn of(file_kind: &str) -> Self {
        let kind = file_kind.to_ascii_lowercase();
        [Self::Photo, Self::Video, Self::Pdf, Self::Documents]
            .into_iter()
            .find(|b| b.extensions().contains(&kind.as_str()))
            .unwrap_or(Self::Other)
    }

    /// Whether `file_kind` falls in this bucket.
    pub fn contains(&self, file_kind: &str) -> bool {
        Self::of(file_kind) == *self
    }
}

impl fmt::Display for KindBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown bucket or kind filter name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown file kind \"{0}\"")]
pub struct UnknownKind(pub String);

impl FromStr for KindBucket {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// The kind facet: either the `All` sentinel or one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KindFilter {
    #[default]
    All,
    Bucket(KindBucket),
}

impl KindFilter {
    pub fn matches(&self, file_kind: &str) -> bool {
        match self {
            Self::All => true,
            Self::Bucket(bucket) => bucket.contains(file_kind),
        }
    }

    /// Selecting the active bucket again returns to `All`.
    pub fn toggled(self, bucket: KindBucket) -> Self {
        if self == Self::Bucket(bucket) {
            Self::All
        } else {
            Self::Bucket(bucket)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Bucket(bucket) => bucket.as_str(),
        }
    }
}

impl fmt::Display for KindFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KindFilter {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Bucket)
        }
    }
}

/// Whether a file kind is one of the video extensions.
pub fn is_video(file_kind: &str) -> bool {
    KindBucket::of(file_kind) == KindBucket::Video
}

/// Derive the lowercase file kind token for an item.
///
/// An explicit type field wins; otherwise the trailing extension of the
/// file name is used, but only when the name actually contains a dot.
pub fn derive_file_kind(explicit: Option<&str>, file_name: Option<&str>) -> String {
    let explicit = explicit.map(str::trim).filter(|t| !t.is_empty());
    let kind = explicit.or_else(|| {
        file_name
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext)
    });
    kind.unwrap_or_default().to_lowercase()
}
