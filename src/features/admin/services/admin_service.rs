use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::admin::dtos::*;
use crate::features::files::models::FileRecordPatch;
use crate::modules::storage::RemoteStore;

/// Service for admin queries across all users' files
pub struct AdminService {
    store: Arc<dyn RemoteStore>,
}

impl AdminService {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Totals for the storage dashboard
    pub async fn storage_overview(&self) -> Result<StorageOverviewDto> {
        let totals = self.store.storage_totals().await.map_err(|e| {
            tracing::error!("Failed to compute storage overview: {:?}", e);
            e
        })?;
        Ok(StorageOverviewDto::from(totals))
    }

    /// List every user's files with pagination, newest first
    pub async fn list_files(&self, offset: i64, limit: i64) -> Result<(Vec<AdminFileDto>, i64)> {
        let (records, total) = self
            .store
            .list_all_file_records(offset, limit)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list files: {:?}", e);
                e
            })?;

        let items = records.into_iter().map(AdminFileDto::from).collect();
        Ok((items, total))
    }

    /// Per-user file counts and bytes, largest first
    pub async fn list_users(&self, offset: i64, limit: i64) -> Result<(Vec<UserUsageDto>, i64)> {
        let (usage, total) = self
            .store
            .list_user_usage(offset, limit)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list user usage: {:?}", e);
                e
            })?;

        let items = usage.into_iter().map(UserUsageDto::from).collect();
        Ok((items, total))
    }

    /// Move any user's file to its owner's trash
    ///
    /// Goes through the store so the owner's open session hears about it
    /// over the change feed. Already trashed files are returned unchanged.
    pub async fn trash_file(&self, id: Uuid) -> Result<AdminFileDto> {
        let record = self.store.get_file_record(id).await?;
        if record.is_trashed() {
            return Ok(AdminFileDto::from(record));
        }

        let record = self
            .store
            .update_file_record(id, FileRecordPatch::trash(Utc::now()))
            .await?;

        info!("Admin moved file {} of {} to trash", id, record.owner_id);
        Ok(AdminFileDto::from(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AppError;
    use crate::shared::test_helpers::{fake_record, record_for, InMemoryStore, Operation};
    use chrono::Duration;
    use tokio_test::assert_ok;

    fn service(store: &Arc<InMemoryStore>) -> AdminService {
        AdminService::new(store.clone())
    }

    #[tokio::test]
    async fn test_trash_any_users_file() {
        let store = Arc::new(InMemoryStore::new());
        let record = record_for("bob", "bob.txt");
        store.seed(record.clone());

        let trashed = assert_ok!(service(&store).trash_file(record.id).await);

        assert_eq!(trashed.owner_id, "bob");
        assert!(trashed.deleted_at.is_some());
        assert!(store.record(record.id).unwrap().is_trashed());
        // The blob stays until the owner purges
        assert!(store.has_blob(&record.storage_key));
    }

    #[tokio::test]
    async fn test_trash_already_trashed_file_is_unchanged() {
        let store = Arc::new(InMemoryStore::new());
        let mut record = record_for("bob", "old.txt");
        let deleted_at = Utc::now() - Duration::days(3);
        record.deleted_at = Some(deleted_at);
        store.seed(record.clone());

        let trashed = assert_ok!(service(&store).trash_file(record.id).await);

        assert_eq!(trashed.deleted_at, Some(deleted_at));
        assert_eq!(store.calls(Operation::UpdateRecord), 0);
    }

    #[tokio::test]
    async fn test_trash_unknown_file_is_not_found() {
        let store = Arc::new(InMemoryStore::new());

        let result = service(&store).trash_file(Uuid::new_v4()).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(store.calls(Operation::UpdateRecord), 0);
    }

    #[tokio::test]
    async fn test_storage_overview_counts_all_owners() {
        let store = Arc::new(InMemoryStore::new());
        store.seed(record_for("alice", "a.txt"));
        store.seed(record_for("alice", "b.txt"));
        let mut trashed = record_for("bob", "c.txt");
        trashed.deleted_at = Some(Utc::now());
        store.seed(trashed);
        store.seed(fake_record("carol", Utc::now() - Duration::days(400)));

        let overview = assert_ok!(service(&store).storage_overview().await);

        assert_eq!(overview.total_files, 4);
        assert_eq!(overview.total_users, 3);
        assert_eq!(overview.files_this_month, 3);
        assert_eq!(overview.trashed_files, 1);
        assert!(overview.total_storage_bytes >= 3 * 1_024);
    }

    #[tokio::test]
    async fn test_list_files_pages_newest_first() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        for days in 0..5 {
            store.seed(fake_record("alice", now - Duration::days(days)));
        }

        let (first, total) = assert_ok!(service(&store).list_files(0, 2).await);
        let (last, _) = assert_ok!(service(&store).list_files(4, 2).await);

        assert_eq!(total, 5);
        assert_eq!(first.len(), 2);
        assert!(first[0].created_at > first[1].created_at);
        assert_eq!(last.len(), 1);
        assert!(last[0].created_at < first[1].created_at);
    }

    #[tokio::test]
    async fn test_list_users_orders_by_footprint() {
        let store = Arc::new(InMemoryStore::new());
        store.seed(record_for("alice", "a.txt"));
        store.seed(record_for("bob", "b.txt"));
        store.seed(record_for("bob", "c.txt"));

        let (users, total) = assert_ok!(service(&store).list_users(0, 10).await);

        assert_eq!(total, 2);
        assert_eq!(users[0].user_id, "bob");
        assert_eq!(users[0].file_count, 2);
        assert_eq!(users[0].total_bytes, 2 * 1_024);
        assert_eq!(users[1].user_id, "alice");
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_external_error() {
        let store = Arc::new(InMemoryStore::new());
        store.fail(Operation::Aggregate);

        let result = service(&store).storage_overview().await;

        assert!(matches!(result, Err(AppError::ExternalServiceError(_))));
    }
}
