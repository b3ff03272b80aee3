use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use super::{
    FileRow, MinIOClient, RemoteStore, StorageTotals, StoreError, StoreResult, UserUsage,
    FILE_COLUMNS,
};
use crate::features::files::models::{FileRecord, FileRecordPatch, NewFileRecord};
use crate::modules::realtime::{ConnectionState, EventHandler, RealtimeHub, Subscription};

/// Production store: `files` table in Postgres, blobs in MinIO, changes
/// fanned out by the realtime hub.
pub struct PgMinioStore {
    pool: PgPool,
    minio_client: Arc<MinIOClient>,
    realtime: Arc<RealtimeHub>,
}

impl PgMinioStore {
    pub fn new(pool: PgPool, minio_client: Arc<MinIOClient>, realtime: Arc<RealtimeHub>) -> Self {
        Self {
            pool,
            minio_client,
            realtime,
        }
    }
}

#[async_trait]
impl RemoteStore for PgMinioStore {
    async fn insert_file_record(&self, new: NewFileRecord) -> StoreResult<FileRecord> {
        let size = i64::try_from(new.size_bytes).map_err(|_| {
            StoreError::ObjectStorage(format!("File size {} out of range", new.size_bytes))
        })?;

        let row = sqlx::query_as::<_, FileRow>(&format!(
            r#"
            INSERT INTO files (user_id, file_name, size, mime_type, storage_path)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {FILE_COLUMNS}
            "#
        ))
        .bind(&new.owner_id)
        .bind(&new.name)
        .bind(size)
        .bind(&new.mime_type)
        .bind(&new.storage_key)
        .fetch_one(&self.pool)
        .await?;

        debug!("Inserted file row: id={}, key={}", row.id, row.storage_path);
        Ok(row.into())
    }

    async fn update_file_record(
        &self,
        id: Uuid,
        patch: FileRecordPatch,
    ) -> StoreResult<FileRecord> {
        // $3 says whether deleted_at is part of the patch, $4 is the new value
        let row = sqlx::query_as::<_, FileRow>(&format!(
            r#"
            UPDATE files
            SET file_name = COALESCE($2, file_name),
                deleted_at = CASE WHEN $3 THEN $4 ELSE deleted_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {FILE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.deleted_at.is_some())
        .bind(patch.deleted_at.flatten())
        .fetch_optional(&self.pool)
        .await?;

        row.map(FileRecord::from)
            .ok_or_else(|| StoreError::NotFound(format!("File {} not found", id)))
    }

    async fn delete_file_record(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!(
            "Deleted file row: id={}, rows_affected={}",
            id,
            result.rows_affected()
        );
        Ok(())
    }

    async fn list_file_records(&self, owner_id: &str) -> StoreResult<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRow>(&format!(
            r#"
            SELECT {FILE_COLUMNS}
            FROM files
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(FileRecord::from).collect())
    }

    async fn get_file_record(&self, id: Uuid) -> StoreResult<FileRecord> {
        let row = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FileRecord::from)
            .ok_or_else(|| StoreError::NotFound(format!("File {} not found", id)))
    }

    async fn list_all_file_records(
        &self,
        offset: i64,
        limit: i64,
    ) -> StoreResult<(Vec<FileRecord>, i64)> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM files")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, FileRow>(&format!(
            r#"
            SELECT {FILE_COLUMNS}
            FROM files
            ORDER BY created_at DESC
            OFFSET $1 LIMIT $2
            "#
        ))
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.into_iter().map(FileRecord::from).collect(), total))
    }

    async fn storage_totals(&self) -> StoreResult<StorageTotals> {
        let totals = sqlx::query_as::<_, StorageTotals>(
            r#"
            SELECT
                COUNT(*)::BIGINT AS total_files,
                COUNT(DISTINCT user_id)::BIGINT AS total_users,
                COALESCE(SUM(size), 0)::BIGINT AS total_storage_bytes,
                COUNT(*) FILTER (
                    WHERE created_at >= date_trunc('month', NOW() AT TIME ZONE 'UTC') AT TIME ZONE 'UTC'
                )::BIGINT AS files_this_month,
                COUNT(*) FILTER (WHERE deleted_at IS NOT NULL)::BIGINT AS trashed_files
            FROM files
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
    }

    async fn list_user_usage(
        &self,
        offset: i64,
        limit: i64,
    ) -> StoreResult<(Vec<UserUsage>, i64)> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(DISTINCT user_id) FROM files")
            .fetch_one(&self.pool)
            .await?;

        let usage = sqlx::query_as::<_, UserUsage>(
            r#"
            SELECT
                user_id,
                COUNT(*)::BIGINT AS file_count,
                COALESCE(SUM(size), 0)::BIGINT AS total_bytes
            FROM files
            GROUP BY user_id
            ORDER BY total_bytes DESC, user_id
            OFFSET $1 LIMIT $2
            "#,
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok((usage, total))
    }

    async fn write_blob(&self, storage_key: &str, data: &[u8], mime_type: &str) -> StoreResult<()> {
        self.minio_client.upload(storage_key, data, mime_type).await
    }

    async fn delete_blob(&self, storage_key: &str) -> StoreResult<()> {
        self.minio_client.delete(storage_key).await
    }

    async fn presign_blob(&self, storage_key: &str) -> StoreResult<String> {
        self.minio_client.get_presigned_url(storage_key).await
    }

    fn subscribe(&self, owner_id: &str, handler: EventHandler) -> Subscription {
        self.realtime.subscribe(owner_id, handler)
    }

    fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.realtime.connection_state()
    }
}
