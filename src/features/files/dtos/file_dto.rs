use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::files::models::{FileCategory, FileRecord, LifecycleState};
use crate::features::files::services::PurgeSummary;

/// Upload file request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFileDto {
    /// The file to upload
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

/// Response DTO for file operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileResponseDto {
    pub id: Uuid,
    /// Display name
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub state: LifecycleState,
    /// Browse bucket, absent when the file fits none
    pub category: Option<FileCategory>,
    pub created_at: DateTime<Utc>,
    /// When the file was moved to the trash
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<FileRecord> for FileResponseDto {
    fn from(record: FileRecord) -> Self {
        Self {
            state: record.state(),
            category: FileCategory::classify(&record.name, &record.mime_type),
            id: record.id,
            name: record.name,
            size_bytes: record.size_bytes,
            mime_type: record.mime_type,
            created_at: record.created_at,
            deleted_at: record.deleted_at,
        }
    }
}

/// Query parameters for the active file listing
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListFilesQuery {
    /// Browse bucket (default: all)
    #[serde(default)]
    pub category: FileCategory,
    /// Case-insensitive name filter
    pub q: Option<String>,
}

/// Query parameters for the trash listing
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TrashQuery {
    /// Case-insensitive name filter
    pub q: Option<String>,
}

/// Request DTO for renaming a file
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RenameFileDto {
    #[validate(length(min = 1, max = 255, message = "name must be 1 to 255 characters"))]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurgeFailureDto {
    pub id: Uuid,
    pub error: String,
}

/// Result of emptying the trash
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurgeSummaryDto {
    pub purged: usize,
    pub failed: usize,
    pub failures: Vec<PurgeFailureDto>,
}

impl From<PurgeSummary> for PurgeSummaryDto {
    fn from(summary: PurgeSummary) -> Self {
        Self {
            purged: summary.purged,
            failed: summary.failed,
            failures: summary
                .failures
                .into_iter()
                .map(|(id, error)| PurgeFailureDto { id, error })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileUrlDto {
    /// Time-limited read URL
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReloadResponseDto {
    pub loaded: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignOutResponseDto {
    /// Whether an open session was closed
    pub closed: bool,
}
