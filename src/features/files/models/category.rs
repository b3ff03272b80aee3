use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::validation::file_extension;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "svg", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "wmv", "flv", "webm"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac", "aac"];
const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "txt", "rtf", "odt", "ppt", "pptx", "odp",
];
const DOCUMENT_MIME_TYPES: &[&str] = &["application/pdf", "text/plain"];
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar", "7z", "tar", "gz"];
const CODE_EXTENSIONS: &[&str] = &[
    "js", "ts", "jsx", "tsx", "html", "css", "py", "java", "cpp", "c", "php", "rs",
];

/// Browse filter for the file views
///
/// `All` is the identity filter; every other variant is a bucket a file can
/// be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    #[default]
    All,
    Images,
    Documents,
    Videos,
    Audio,
    Archives,
    Code,
}

impl FileCategory {
    /// Bucket a file by MIME type first, then by extension
    ///
    /// Returns `None` for files that fit no bucket; those only show up
    /// under `All`.
    pub fn classify(name: &str, mime_type: &str) -> Option<FileCategory> {
        let ext = file_extension(name).unwrap_or_default();
        let ext = ext.as_str();
        let mime = mime_type.to_ascii_lowercase();

        if mime.starts_with("image/") || IMAGE_EXTENSIONS.contains(&ext) {
            Some(FileCategory::Images)
        } else if mime.starts_with("video/") || VIDEO_EXTENSIONS.contains(&ext) {
            Some(FileCategory::Videos)
        } else if mime.starts_with("audio/") || AUDIO_EXTENSIONS.contains(&ext) {
            Some(FileCategory::Audio)
        } else if DOCUMENT_MIME_TYPES.contains(&mime.as_str()) || DOCUMENT_EXTENSIONS.contains(&ext)
        {
            Some(FileCategory::Documents)
        } else if ARCHIVE_EXTENSIONS.contains(&ext) {
            Some(FileCategory::Archives)
        } else if CODE_EXTENSIONS.contains(&ext) {
            Some(FileCategory::Code)
        } else {
            None
        }
    }

    pub fn matches(&self, name: &str, mime_type: &str) -> bool {
        match self {
            FileCategory::All => true,
            category => Self::classify(name, mime_type) == Some(*category),
        }
    }
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileCategory::All => write!(f, "all"),
            FileCategory::Images => write!(f, "images"),
            FileCategory::Documents => write!(f, "documents"),
            FileCategory::Videos => write!(f, "videos"),
            FileCategory::Audio => write!(f, "audio"),
            FileCategory::Archives => write!(f, "archives"),
            FileCategory::Code => write!(f, "code"),
        }
    }
}
