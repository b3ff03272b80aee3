use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::files::models::{FileRecord, LifecycleState};
use crate::modules::storage::{StorageTotals, UserUsage};

// =============================================================================
// STORAGE
// =============================================================================

/// Aggregate numbers across every user's files
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StorageOverviewDto {
    pub total_files: i64,
    /// Users owning at least one file
    pub total_users: i64,
    /// Bytes held in the bucket, trash included
    pub total_storage_bytes: i64,
    /// Uploads since the start of the current month
    pub files_this_month: i64,
    pub trashed_files: i64,
}

impl From<StorageTotals> for StorageOverviewDto {
    fn from(totals: StorageTotals) -> Self {
        Self {
            total_files: totals.total_files,
            total_users: totals.total_users,
            total_storage_bytes: totals.total_storage_bytes,
            files_this_month: totals.files_this_month,
            trashed_files: totals.trashed_files,
        }
    }
}

// =============================================================================
// USERS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserUsageDto {
    pub user_id: String,
    pub file_count: i64,
    /// Bytes across active and trashed files
    pub total_bytes: i64,
}

impl From<UserUsage> for UserUsageDto {
    fn from(usage: UserUsage) -> Self {
        Self {
            user_id: usage.user_id,
            file_count: usage.file_count,
            total_bytes: usage.total_bytes,
        }
    }
}

// =============================================================================
// FILES
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminFileDto {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub state: LifecycleState,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<FileRecord> for AdminFileDto {
    fn from(record: FileRecord) -> Self {
        Self {
            state: record.state(),
            id: record.id,
            owner_id: record.owner_id,
            name: record.name,
            size_bytes: record.size_bytes,
            mime_type: record.mime_type,
            created_at: record.created_at,
            deleted_at: record.deleted_at,
        }
    }
}
