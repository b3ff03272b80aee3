use async_trait::async_trait;
use sqlx::FromRow;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use crate::features::files::models::{FileRecord, FileRecordPatch, NewFileRecord};
use crate::modules::realtime::{ConnectionState, EventHandler, Subscription};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Object storage error: {0}")]
    ObjectStorage(String),

    /// The store could not be reached or did not answer in time
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Counts across every owner's files
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct StorageTotals {
    pub total_files: i64,
    pub total_users: i64,
    pub total_storage_bytes: i64,
    /// Rows created since the start of the current UTC month
    pub files_this_month: i64,
    pub trashed_files: i64,
}

/// Per-owner footprint, trash included
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UserUsage {
    pub user_id: String,
    pub file_count: i64,
    pub total_bytes: i64,
}

/// Metadata table, blob bucket and change feed behind one interface
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn insert_file_record(&self, new: NewFileRecord) -> StoreResult<FileRecord>;

    /// Fails with `NotFound` when no row has this id
    async fn update_file_record(&self, id: Uuid, patch: FileRecordPatch)
        -> StoreResult<FileRecord>;

    async fn delete_file_record(&self, id: Uuid) -> StoreResult<()>;

    async fn list_file_records(&self, owner_id: &str) -> StoreResult<Vec<FileRecord>>;

    /// Any owner's record; fails with `NotFound` when no row has this id
    async fn get_file_record(&self, id: Uuid) -> StoreResult<FileRecord>;

    /// One page of every owner's records, newest first, with the total count
    async fn list_all_file_records(
        &self,
        offset: i64,
        limit: i64,
    ) -> StoreResult<(Vec<FileRecord>, i64)>;

    async fn storage_totals(&self) -> StoreResult<StorageTotals>;

    /// One page of owners, largest footprint first, with the owner count
    async fn list_user_usage(&self, offset: i64, limit: i64)
        -> StoreResult<(Vec<UserUsage>, i64)>;

    async fn write_blob(&self, storage_key: &str, data: &[u8], mime_type: &str)
        -> StoreResult<()>;

    /// Deleting an absent blob succeeds
    async fn delete_blob(&self, storage_key: &str) -> StoreResult<()>;

    /// Time-limited read URL for a blob
    async fn presign_blob(&self, storage_key: &str) -> StoreResult<String>;

    /// Deliver change events for `owner_id` rows until the handle is dropped
    fn subscribe(&self, owner_id: &str, handler: EventHandler) -> Subscription;

    fn connection_state(&self) -> watch::Receiver<ConnectionState>;
}
