use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::features::files::models::{
    ChangeEvent, FileCategory, FileRecord, FileRecordPatch, LifecycleState, NewFileRecord,
};
use crate::features::files::policy::{validate_file_name, UploadPolicy};
use crate::features::files::projection::{self, StorageUsage};
use crate::features::files::session::FileSession;
use crate::modules::storage::{RemoteStore, StoreError};
use crate::shared::constants::GENERIC_MIME_TYPE;

#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Rejected before any remote call; nothing changed
    #[error("{0}")]
    Validation(String),

    /// The session does not hold a file with this id
    #[error("File {0} not found")]
    NotFound(Uuid),

    #[error("Remote write failed: {0}")]
    RemoteWrite(#[source] StoreError),

    #[error("Remote read failed: {0}")]
    RemoteRead(#[source] StoreError),
}

/// Outcome of emptying the trash
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    pub purged: usize,
    pub failed: usize,
    pub failures: Vec<(Uuid, String)>,
}

/// Drives a file through upload, trash, restore and purge
///
/// Every transition waits for the remote store to confirm before the
/// session cache is touched. A failed step leaves the cache as it was.
#[derive(Clone)]
pub struct LifecycleManager {
    store: Arc<dyn RemoteStore>,
    policy: Arc<UploadPolicy>,
    session: Arc<FileSession>,
}

impl LifecycleManager {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        policy: Arc<UploadPolicy>,
        session: Arc<FileSession>,
    ) -> Self {
        Self {
            store,
            policy,
            session,
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> &Arc<FileSession> {
        &self.session
    }

    /// Replace the cache with the owner's records from the store
    ///
    /// Push events arriving while the listing is in flight are replayed
    /// on top of it, so a row committed mid-listing is not lost.
    pub async fn load(&self) -> Result<usize, LifecycleError> {
        let load = self.session.begin_load();
        let records = self
            .store
            .list_file_records(self.session.owner_id())
            .await
            .map_err(LifecycleError::RemoteRead)?;

        let count = records.len();
        load.finish(records);
        debug!("Loaded {} files for {}", count, self.session.owner_id());
        Ok(count)
    }

    /// Store the blob, then its metadata row
    ///
    /// A failed metadata insert removes the blob again on a best-effort
    /// basis; the cache is only updated once both writes succeeded.
    pub async fn upload(
        &self,
        name: &str,
        mime_type: &str,
        data: &[u8],
    ) -> Result<FileRecord, LifecycleError> {
        let owner_id = self.session.owner_id();
        let name = name.trim();
        let size_bytes = data.len() as u64;

        self.policy
            .validate(name, mime_type, size_bytes)
            .map_err(LifecycleError::Validation)?;

        let mime_type = match mime_type.trim() {
            "" => GENERIC_MIME_TYPE.to_string(),
            declared => declared.to_string(),
        };
        let storage_key = self.policy.storage_key(owner_id, name);
        debug!(
            "{}: writing '{}' ({} bytes) to {}",
            LifecycleState::Uploading,
            name,
            size_bytes,
            storage_key
        );

        self.store
            .write_blob(&storage_key, data, &mime_type)
            .await
            .map_err(LifecycleError::RemoteWrite)?;

        let new_record = NewFileRecord {
            owner_id: owner_id.to_string(),
            name: name.to_string(),
            size_bytes,
            mime_type,
            storage_key: storage_key.clone(),
        };

        let record = match self.store.insert_file_record(new_record).await {
            Ok(record) => record,
            Err(e) => {
                if let Err(cleanup) = self.store.delete_blob(&storage_key).await {
                    warn!(
                        "Failed to remove orphaned blob {} after insert failure: {}",
                        storage_key, cleanup
                    );
                }
                return Err(LifecycleError::RemoteWrite(e));
            }
        };

        self.session.apply(|cache| cache.upsert(record.clone()));
        info!(
            "Uploaded file {} ({} bytes) for {}",
            record.id, record.size_bytes, owner_id
        );
        Ok(record)
    }

    /// Move a file to the trash; its blob stays in place
    pub async fn soft_delete(&self, id: Uuid) -> Result<FileRecord, LifecycleError> {
        let cached = self.cached(id)?;
        if cached.is_trashed() {
            return Ok(cached);
        }

        let record = self.update(id, FileRecordPatch::trash(Utc::now())).await?;
        info!("Moved file {} to trash", id);
        Ok(record)
    }

    /// Bring a file back from the trash; already active files are left alone
    pub async fn restore(&self, id: Uuid) -> Result<FileRecord, LifecycleError> {
        let cached = self.cached(id)?;
        if !cached.is_trashed() {
            return Ok(cached);
        }

        let record = self.update(id, FileRecordPatch::restore()).await?;
        info!("Restored file {} from trash", id);
        Ok(record)
    }

    pub async fn rename(&self, id: Uuid, name: &str) -> Result<FileRecord, LifecycleError> {
        validate_file_name(name).map_err(LifecycleError::Validation)?;
        self.cached(id)?;

        let record = self.update(id, FileRecordPatch::rename(name.trim())).await?;
        info!("Renamed file {} to '{}'", id, record.name);
        Ok(record)
    }

    /// Delete a trashed file for good: blob first, then the metadata row
    ///
    /// Purging an id the cache no longer holds succeeds without touching
    /// the store, so a repeated purge is harmless.
    pub async fn purge(&self, id: Uuid) -> Result<(), LifecycleError> {
        let Some(cached) = self.session.read(|cache| cache.get(&id).cloned()) else {
            debug!("File {} already gone, nothing to purge", id);
            return Ok(());
        };

        if !cached.is_trashed() {
            return Err(LifecycleError::Validation(format!(
                "File {} must be in the trash before it can be deleted permanently",
                id
            )));
        }

        self.store
            .delete_blob(&cached.storage_key)
            .await
            .map_err(LifecycleError::RemoteWrite)?;

        self.store
            .delete_file_record(id)
            .await
            .map_err(LifecycleError::RemoteWrite)?;

        self.session.apply(|cache| cache.remove(&id));
        info!("{} file {}", LifecycleState::Purged, id);
        Ok(())
    }

    /// Purge everything in the trash, carrying on past individual failures
    pub async fn purge_all(&self) -> PurgeSummary {
        let trashed = self.session.read(projection::trashed_files);
        let mut summary = PurgeSummary::default();

        for record in trashed {
            match self.purge(record.id).await {
                Ok(()) => summary.purged += 1,
                Err(e) => {
                    warn!("Failed to purge file {}: {}", record.id, e);
                    summary.failed += 1;
                    summary.failures.push((record.id, e.to_string()));
                }
            }
        }

        info!(
            "Emptied trash for {}: {} purged, {} failed",
            self.session.owner_id(),
            summary.purged,
            summary.failed
        );
        summary
    }

    /// Apply a push notification to the session cache
    pub fn reconcile(&self, event: ChangeEvent) {
        self.session.reconcile(event);
    }

    /// Time-limited read URL for one of the owner's files
    pub async fn presign(&self, id: Uuid) -> Result<String, LifecycleError> {
        let cached = self.cached(id)?;
        self.store
            .presign_blob(&cached.storage_key)
            .await
            .map_err(LifecycleError::RemoteRead)
    }

    pub fn active_files(&self, category: FileCategory, query: &str) -> Vec<FileRecord> {
        let active = self.session.read(projection::active_files);
        projection::search(&projection::filter_by_category(&active, category), query)
    }

    pub fn trashed_files(&self, query: &str) -> Vec<FileRecord> {
        let trashed = self.session.read(projection::trashed_files);
        projection::search(&trashed, query)
    }

    pub fn storage_usage(&self) -> StorageUsage {
        let quota_bytes = self.policy.storage_quota_bytes;
        self.session
            .read(|cache| projection::storage_usage(cache.records(), quota_bytes))
    }

    fn cached(&self, id: Uuid) -> Result<FileRecord, LifecycleError> {
        self.session
            .read(|cache| cache.get(&id).cloned())
            .ok_or(LifecycleError::NotFound(id))
    }

    async fn update(&self, id: Uuid, patch: FileRecordPatch) -> Result<FileRecord, LifecycleError> {
        let record = self
            .store
            .update_file_record(id, patch)
            .await
            .map_err(LifecycleError::RemoteWrite)?;

        self.session.apply(|cache| cache.upsert(record.clone()));
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::files::models::ChangeKind;
    use crate::shared::test_helpers::{InMemoryStore, Operation};
    use tokio_test::assert_ok;

    const OWNER: &str = "alice";

    fn manager_with(store: &Arc<InMemoryStore>, policy: UploadPolicy) -> LifecycleManager {
        LifecycleManager::new(
            store.clone(),
            Arc::new(policy),
            Arc::new(FileSession::new(OWNER)),
        )
    }

    fn manager(store: &Arc<InMemoryStore>) -> LifecycleManager {
        manager_with(store, UploadPolicy::default())
    }

    fn cache_len(manager: &LifecycleManager) -> usize {
        manager.session().read(|cache| cache.records().len())
    }

    #[tokio::test]
    async fn test_upload_report_appears_in_active_files() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(&store);
        let data = vec![0u8; 1_000_000];

        let record = assert_ok!(manager.upload("report.pdf", "application/pdf", &data).await);

        let active = manager.active_files(FileCategory::All, "");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "report.pdf");
        assert_eq!(active[0].size_bytes, 1_000_000);
        assert_eq!(active[0].owner_id, OWNER);
        assert!(manager.trashed_files("").is_empty());
        assert!(store.has_blob(&record.storage_key));
    }

    #[tokio::test]
    async fn test_soft_delete_and_restore_round_trip() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(&store);
        let record = assert_ok!(manager.upload("report.pdf", "application/pdf", b"pdf").await);

        let trashed = assert_ok!(manager.soft_delete(record.id).await);
        assert!(trashed.deleted_at.is_some());
        assert!(manager.active_files(FileCategory::All, "").is_empty());
        assert_eq!(manager.trashed_files("")[0].id, record.id);
        assert!(store.has_blob(&record.storage_key));

        let restored = assert_ok!(manager.restore(record.id).await);
        assert!(restored.deleted_at.is_none());
        assert_eq!(manager.active_files(FileCategory::All, "")[0].id, record.id);
        assert!(manager.trashed_files("").is_empty());
    }

    #[tokio::test]
    async fn test_purge_removes_everywhere_and_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(&store);
        let record = assert_ok!(manager.upload("report.pdf", "application/pdf", b"pdf").await);
        assert_ok!(manager.soft_delete(record.id).await);

        assert_ok!(manager.purge(record.id).await);
        assert!(manager.active_files(FileCategory::All, "").is_empty());
        assert!(manager.trashed_files("").is_empty());
        assert!(!store.has_blob(&record.storage_key));
        assert_eq!(store.record_count(), 0);

        assert_ok!(manager.purge(record.id).await);
        assert_eq!(cache_len(&manager), 0);
    }

    #[tokio::test]
    async fn test_purge_retry_tolerates_missing_blob() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(&store);
        let record = assert_ok!(manager.upload("notes.txt", "text/plain", b"hi").await);
        assert_ok!(manager.soft_delete(record.id).await);

        // Blob goes away but the row delete fails: record stays in trash
        store.fail(Operation::DeleteRecord);
        let result = manager.purge(record.id).await;
        assert!(matches!(result, Err(LifecycleError::RemoteWrite(_))));
        assert!(!store.has_blob(&record.storage_key));
        assert_eq!(manager.trashed_files("").len(), 1);

        store.succeed(Operation::DeleteRecord);
        assert_ok!(manager.purge(record.id).await);
        assert_eq!(cache_len(&manager), 0);
    }

    #[tokio::test]
    async fn test_purge_keeps_row_when_blob_delete_fails() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(&store);
        let record = assert_ok!(manager.upload("notes.txt", "text/plain", b"hi").await);
        assert_ok!(manager.soft_delete(record.id).await);
        store.fail(Operation::DeleteBlob);

        let result = manager.purge(record.id).await;

        assert!(matches!(result, Err(LifecycleError::RemoteWrite(_))));
        assert_eq!(store.calls(Operation::DeleteRecord), 0);
        assert_eq!(store.record_count(), 1);
        assert_eq!(manager.trashed_files("").len(), 1);
    }

    #[tokio::test]
    async fn test_purge_requires_trash() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(&store);
        let record = assert_ok!(manager.upload("notes.txt", "text/plain", b"hi").await);

        let result = manager.purge(record.id).await;

        assert!(matches!(result, Err(LifecycleError::Validation(_))));
        assert_eq!(store.calls(Operation::DeleteBlob), 0);
    }

    #[tokio::test]
    async fn test_insert_failure_leaves_cache_untouched() {
        for cleanup_fails in [false, true] {
            let store = Arc::new(InMemoryStore::new());
            let manager = manager(&store);
            store.fail(Operation::InsertRecord);
            if cleanup_fails {
                store.fail(Operation::DeleteBlob);
            }

            let result = manager.upload("report.pdf", "application/pdf", b"pdf").await;

            assert!(matches!(result, Err(LifecycleError::RemoteWrite(_))));
            assert_eq!(cache_len(&manager), 0);
            assert_eq!(store.calls(Operation::DeleteBlob), 1);
            assert_eq!(store.blob_count(), usize::from(cleanup_fails));
        }
    }

    #[tokio::test]
    async fn test_blob_write_failure_skips_insert() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(&store);
        store.fail(Operation::WriteBlob);

        let result = manager.upload("report.pdf", "application/pdf", b"pdf").await;

        assert!(matches!(result, Err(LifecycleError::RemoteWrite(_))));
        assert_eq!(store.calls(Operation::InsertRecord), 0);
        assert_eq!(cache_len(&manager), 0);
    }

    #[tokio::test]
    async fn test_policy_violations_make_no_remote_calls() {
        let store = Arc::new(InMemoryStore::new());
        let policy = UploadPolicy {
            max_file_size: 10,
            ..UploadPolicy::default()
        };
        let manager = manager_with(&store, policy);

        let too_big = manager.upload("report.pdf", "application/pdf", &[0u8; 11]).await;
        let bad_type = manager.upload("setup.exe", "application/x-msdownload", b"mz").await;
        let no_name = manager.upload("   ", "text/plain", b"x").await;

        assert!(matches!(too_big, Err(LifecycleError::Validation(_))));
        assert!(matches!(bad_type, Err(LifecycleError::Validation(_))));
        assert!(matches!(no_name, Err(LifecycleError::Validation(_))));
        assert_eq!(store.calls(Operation::WriteBlob), 0);
        assert_eq!(cache_len(&manager), 0);
    }

    #[tokio::test]
    async fn test_failed_soft_delete_leaves_cache_unchanged() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(&store);
        let record = assert_ok!(manager.upload("notes.txt", "text/plain", b"hi").await);
        store.fail(Operation::UpdateRecord);

        let result = manager.soft_delete(record.id).await;

        assert!(matches!(result, Err(LifecycleError::RemoteWrite(_))));
        assert_eq!(manager.active_files(FileCategory::All, "").len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_soft_delete_and_restore_are_noops() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(&store);
        let record = assert_ok!(manager.upload("notes.txt", "text/plain", b"hi").await);

        assert_ok!(manager.restore(record.id).await);
        assert_eq!(store.calls(Operation::UpdateRecord), 0);

        let first = assert_ok!(manager.soft_delete(record.id).await);
        let second = assert_ok!(manager.soft_delete(record.id).await);
        assert_eq!(first.deleted_at, second.deleted_at);
        assert_eq!(store.calls(Operation::UpdateRecord), 1);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(&store);
        let id = Uuid::new_v4();

        let trash = manager.soft_delete(id).await;
        let restore = manager.restore(id).await;
        let url = manager.presign(id).await;

        assert!(matches!(trash, Err(LifecycleError::NotFound(_))));
        assert!(matches!(restore, Err(LifecycleError::NotFound(_))));
        assert!(matches!(url, Err(LifecycleError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rename_validates_and_updates_cache() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(&store);
        let record = assert_ok!(manager.upload("notes.txt", "text/plain", b"hi").await);

        let blank = manager.rename(record.id, "  ").await;
        assert!(matches!(blank, Err(LifecycleError::Validation(_))));
        assert_eq!(store.calls(Operation::UpdateRecord), 0);

        let renamed = assert_ok!(manager.rename(record.id, " minutes.txt ").await);
        assert_eq!(renamed.name, "minutes.txt");
        assert_eq!(manager.active_files(FileCategory::All, "minutes").len(), 1);
    }

    #[tokio::test]
    async fn test_purge_all_continues_past_failures() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(&store);
        for name in ["a.txt", "b.txt", "c.txt"] {
            let record = assert_ok!(manager.upload(name, "text/plain", b"x").await);
            assert_ok!(manager.soft_delete(record.id).await);
        }
        let kept = assert_ok!(manager.upload("kept.txt", "text/plain", b"x").await);
        let stuck = manager.trashed_files("b.txt")[0].storage_key.clone();
        store.fail_for_key(Operation::DeleteBlob, &stuck);

        let summary = manager.purge_all().await;

        assert_eq!(summary.purged, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures.len(), 1);
        let trash = manager.trashed_files("");
        assert_eq!(trash.len(), 1);
        assert_eq!(trash[0].name, "b.txt");
        assert_eq!(manager.active_files(FileCategory::All, "")[0].id, kept.id);
    }

    #[tokio::test]
    async fn test_load_failure_is_remote_read_and_keeps_cache() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(&store);
        assert_ok!(manager.upload("notes.txt", "text/plain", b"hi").await);
        store.fail(Operation::ListRecords);

        let result = manager.load().await;

        assert!(matches!(result, Err(LifecycleError::RemoteRead(_))));
        assert_eq!(cache_len(&manager), 1);
    }

    #[tokio::test]
    async fn test_push_created_after_local_upsert_keeps_one_entry() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(&store);
        let record = assert_ok!(manager.upload("report.pdf", "application/pdf", b"pdf").await);

        let mut pushed = record.clone();
        pushed.name = "report (server).pdf".to_string();
        manager.reconcile(ChangeEvent::new(ChangeKind::Created, pushed.clone()));

        assert_eq!(cache_len(&manager), 1);
        let cached = manager.session().read(|cache| cache.get(&record.id).cloned());
        assert_eq!(cached, Some(pushed));
    }

    #[tokio::test]
    async fn test_results_after_close_are_dropped() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(&store);
        manager.session().close();

        let record = assert_ok!(manager.upload("notes.txt", "text/plain", b"hi").await);

        assert_eq!(store.record_count(), 1);
        assert!(manager.session().read(|cache| cache.get(&record.id).is_none()));
    }

    #[tokio::test]
    async fn test_storage_usage_counts_trash() {
        let store = Arc::new(InMemoryStore::new());
        let policy = UploadPolicy {
            storage_quota_bytes: 1_000,
            ..UploadPolicy::default()
        };
        let manager = manager_with(&store, policy);
        let record = assert_ok!(manager.upload("a.txt", "text/plain", &[0u8; 300]).await);
        assert_ok!(manager.upload("b.txt", "text/plain", &[0u8; 200]).await);
        assert_ok!(manager.soft_delete(record.id).await);

        let usage = manager.storage_usage();

        assert_eq!(usage.used_bytes, 500);
        assert_eq!(usage.remaining_bytes, 500);
    }

    #[tokio::test]
    async fn test_padded_name_is_stored_trimmed() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(&store);

        let record = assert_ok!(
            manager
                .upload(" photo.png ", "application/octet-stream", b"png")
                .await
        );

        assert_eq!(record.name, "photo.png");
        assert!(record.storage_key.ends_with(".png"));
        assert_eq!(store.record(record.id).map(|r| r.name), Some("photo.png".to_string()));
    }
}
