use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::Request, middleware::Next, Router};
use chrono::{DateTime, Datelike, Utc};
use fake::faker::filesystem::en::{FileName, MimeType};
use fake::Fake;
use tokio::sync::watch;
use uuid::Uuid;

use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::models::{
    ChangeEvent, ChangeKind, FileRecord, FileRecordPatch, NewFileRecord,
};
use crate::modules::realtime::{ConnectionState, EventHandler, RealtimeHub, Subscription};
use crate::modules::storage::{RemoteStore, StorageTotals, StoreError, StoreResult, UserUsage};

pub fn create_user(sub: &str) -> AuthenticatedUser {
    AuthenticatedUser {
        sub: sub.to_string(),
        email: Some(format!("{}@example.com", sub)),
        roles: vec![],
    }
}

pub fn create_admin_user() -> AuthenticatedUser {
    AuthenticatedUser {
        roles: vec!["admin".to_string()],
        ..create_user("test-admin")
    }
}

/// Wrap a router so every request carries the given user
pub fn with_user(router: Router, user: AuthenticatedUser) -> Router {
    router.layer(axum::middleware::from_fn(
        move |mut request: Request, next: Next| {
            let user = user.clone();
            async move {
                request.extensions_mut().insert(user);
                next.run(request).await
            }
        },
    ))
}

/// Active record with the given name, stamped now
pub fn record_for(owner_id: &str, name: &str) -> FileRecord {
    FileRecord {
        id: Uuid::new_v4(),
        owner_id: owner_id.to_string(),
        name: name.to_string(),
        size_bytes: 1_024,
        mime_type: "text/plain".to_string(),
        storage_key: format!("{}/{}-{}", owner_id, Utc::now().timestamp_millis(), name),
        created_at: Utc::now(),
        deleted_at: None,
    }
}

/// Active record with random name, type and size
pub fn fake_record(owner_id: &str, created_at: DateTime<Utc>) -> FileRecord {
    let id = Uuid::new_v4();
    FileRecord {
        id,
        owner_id: owner_id.to_string(),
        name: FileName().fake(),
        size_bytes: (0..10_000_000u64).fake(),
        mime_type: MimeType().fake(),
        storage_key: format!("{}/{}", owner_id, id.simple()),
        created_at,
        deleted_at: None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    InsertRecord,
    UpdateRecord,
    DeleteRecord,
    ListRecords,
    ReadRecord,
    Aggregate,
    WriteBlob,
    DeleteBlob,
    PresignBlob,
}

#[derive(Default)]
struct StoreState {
    records: HashMap<Uuid, FileRecord>,
    blobs: HashMap<String, Vec<u8>>,
    failing: HashSet<Operation>,
    failing_keys: HashMap<Operation, String>,
    calls: HashMap<Operation, usize>,
    commit_during_list: Option<FileRecord>,
}

/// In-memory `RemoteStore` with per-operation failure injection
///
/// Mutations do not publish change events on their own; tests push events
/// explicitly through `emit`.
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    hub: RealtimeHub,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            hub: RealtimeHub::new(64),
        }
    }

    pub fn hub(&self) -> &RealtimeHub {
        &self.hub
    }

    pub fn emit(&self, kind: ChangeKind, record: FileRecord) {
        self.hub.publish(ChangeEvent::new(kind, record));
    }

    /// Store a record and its blob directly, bypassing counters
    pub fn seed(&self, record: FileRecord) {
        let mut state = self.state.lock().unwrap();
        state
            .blobs
            .insert(record.storage_key.clone(), vec![0; record.size_bytes as usize]);
        state.records.insert(record.id, record);
    }

    pub fn fail(&self, operation: Operation) {
        self.state.lock().unwrap().failing.insert(operation);
    }

    /// Fail `operation` only when it targets `storage_key`
    pub fn fail_for_key(&self, operation: Operation, storage_key: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_keys
            .insert(operation, storage_key.to_string());
    }

    pub fn succeed(&self, operation: Operation) {
        let mut state = self.state.lock().unwrap();
        state.failing.remove(&operation);
        state.failing_keys.remove(&operation);
    }

    pub fn calls(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(&operation)
            .copied()
            .unwrap_or(0)
    }

    pub fn has_blob(&self, storage_key: &str) -> bool {
        self.state.lock().unwrap().blobs.contains_key(storage_key)
    }

    pub fn blob_count(&self) -> usize {
        self.state.lock().unwrap().blobs.len()
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    /// On the next owner listing, commit `record` (and announce it) after
    /// the snapshot is taken but before the listing returns
    pub fn commit_during_next_list(&self, record: FileRecord) {
        self.state.lock().unwrap().commit_during_list = Some(record);
    }

    pub fn record(&self, id: Uuid) -> Option<FileRecord> {
        self.state.lock().unwrap().records.get(&id).cloned()
    }

    fn check(&self, operation: Operation, key: Option<&str>) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(operation).or_default() += 1;

        let key_fails = matches!(
            (state.failing_keys.get(&operation), key),
            (Some(failing), Some(key)) if failing == key
        );
        if state.failing.contains(&operation) || key_fails {
            return Err(StoreError::Unavailable(format!(
                "{:?} failed (injected)",
                operation
            )));
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn insert_file_record(&self, new: NewFileRecord) -> StoreResult<FileRecord> {
        self.check(Operation::InsertRecord, Some(&new.storage_key))?;

        let record = FileRecord {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            name: new.name,
            size_bytes: new.size_bytes,
            mime_type: new.mime_type,
            storage_key: new.storage_key,
            created_at: Utc::now(),
            deleted_at: None,
        };
        self.state
            .lock()
            .unwrap()
            .records
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_file_record(
        &self,
        id: Uuid,
        patch: FileRecordPatch,
    ) -> StoreResult<FileRecord> {
        self.check(Operation::UpdateRecord, None)?;

        let mut state = self.state.lock().unwrap();
        let record = state
            .records
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("File {} not found", id)))?;
        patch.apply_to(record);
        Ok(record.clone())
    }

    async fn delete_file_record(&self, id: Uuid) -> StoreResult<()> {
        self.check(Operation::DeleteRecord, None)?;
        self.state.lock().unwrap().records.remove(&id);
        Ok(())
    }

    async fn list_file_records(&self, owner_id: &str) -> StoreResult<Vec<FileRecord>> {
        self.check(Operation::ListRecords, None)?;
        let (snapshot, committed) = {
            let mut state = self.state.lock().unwrap();
            let snapshot: Vec<FileRecord> = state
                .records
                .values()
                .filter(|record| record.owner_id == owner_id)
                .cloned()
                .collect();
            let committed = state.commit_during_list.take();
            if let Some(record) = &committed {
                state.records.insert(record.id, record.clone());
            }
            (snapshot, committed)
        };

        if let Some(record) = committed {
            self.emit(ChangeKind::Created, record);
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Ok(snapshot)
    }

    async fn get_file_record(&self, id: Uuid) -> StoreResult<FileRecord> {
        self.check(Operation::ReadRecord, None)?;
        self.record(id)
            .ok_or_else(|| StoreError::NotFound(format!("File {} not found", id)))
    }

    async fn list_all_file_records(
        &self,
        offset: i64,
        limit: i64,
    ) -> StoreResult<(Vec<FileRecord>, i64)> {
        self.check(Operation::ListRecords, None)?;
        let mut records: Vec<FileRecord> =
            self.state.lock().unwrap().records.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = records.len() as i64;
        let page = records
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn storage_totals(&self) -> StoreResult<StorageTotals> {
        self.check(Operation::Aggregate, None)?;
        let month_start = Utc::now()
            .date_naive()
            .with_day(1)
            .and_then(|day| day.and_hms_opt(0, 0, 0))
            .unwrap()
            .and_utc();

        let state = self.state.lock().unwrap();
        let records: Vec<&FileRecord> = state.records.values().collect();
        let owners: HashSet<&str> = records.iter().map(|r| r.owner_id.as_str()).collect();
        Ok(StorageTotals {
            total_files: records.len() as i64,
            total_users: owners.len() as i64,
            total_storage_bytes: records.iter().map(|r| r.size_bytes as i64).sum(),
            files_this_month: records
                .iter()
                .filter(|r| r.created_at >= month_start)
                .count() as i64,
            trashed_files: records.iter().filter(|r| r.is_trashed()).count() as i64,
        })
    }

    async fn list_user_usage(
        &self,
        offset: i64,
        limit: i64,
    ) -> StoreResult<(Vec<UserUsage>, i64)> {
        self.check(Operation::Aggregate, None)?;
        let mut by_owner: HashMap<String, UserUsage> = HashMap::new();
        for record in self.state.lock().unwrap().records.values() {
            let usage = by_owner
                .entry(record.owner_id.clone())
                .or_insert_with(|| UserUsage {
                    user_id: record.owner_id.clone(),
                    file_count: 0,
                    total_bytes: 0,
                });
            usage.file_count += 1;
            usage.total_bytes += record.size_bytes as i64;
        }

        let mut usage: Vec<UserUsage> = by_owner.into_values().collect();
        usage.sort_by(|a, b| {
            b.total_bytes
                .cmp(&a.total_bytes)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        let total = usage.len() as i64;
        let page = usage
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn write_blob(&self, storage_key: &str, data: &[u8], _mime_type: &str) -> StoreResult<()> {
        self.check(Operation::WriteBlob, Some(storage_key))?;
        self.state
            .lock()
            .unwrap()
            .blobs
            .insert(storage_key.to_string(), data.to_vec());
        Ok(())
    }

    async fn delete_blob(&self, storage_key: &str) -> StoreResult<()> {
        self.check(Operation::DeleteBlob, Some(storage_key))?;
        self.state.lock().unwrap().blobs.remove(storage_key);
        Ok(())
    }

    async fn presign_blob(&self, storage_key: &str) -> StoreResult<String> {
        self.check(Operation::PresignBlob, Some(storage_key))?;
        if !self.has_blob(storage_key) {
            return Err(StoreError::NotFound(format!("Blob {} not found", storage_key)));
        }
        Ok(format!("https://blobs.test/{}?signature=test", storage_key))
    }

    fn subscribe(&self, owner_id: &str, handler: EventHandler) -> Subscription {
        self.hub.subscribe(owner_id, handler)
    }

    fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.hub.connection_state()
    }
}
