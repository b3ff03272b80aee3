use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::features::files::models::FileRecord;

/// Column list matching `FileRow`, for SELECT and RETURNING clauses
pub const FILE_COLUMNS: &str =
    "id, user_id, file_name, size, mime_type, storage_path, created_at, deleted_at";

/// Raw `files` row, as returned by queries and by the change trigger
#[derive(Debug, Clone, FromRow, Deserialize)]
pub struct FileRow {
    pub id: Uuid,
    pub user_id: String,
    pub file_name: String,
    pub size: i64,
    pub mime_type: String,
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<FileRow> for FileRecord {
    fn from(row: FileRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.user_id,
            name: row.file_name,
            // The column carries a CHECK (size >= 0)
            size_bytes: u64::try_from(row.size).unwrap_or_default(),
            mime_type: row.mime_type,
            storage_key: row.storage_path,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        }
    }
}
