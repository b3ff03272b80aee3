use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Metadata for one uploaded blob
///
/// Everything except `name` and `deleted_at` is fixed at upload time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
    /// `None` while the file is active, the trash time otherwise
    pub deleted_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    pub fn state(&self) -> LifecycleState {
        if self.deleted_at.is_some() {
            LifecycleState::Trashed
        } else {
            LifecycleState::Active
        }
    }

    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Lifecycle of a file
///
/// `Uploading` only exists between the blob write and the metadata insert,
/// `Purged` only after both are gone. Neither is ever stored on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Uploading,
    Active,
    Trashed,
    Purged,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Uploading => write!(f, "uploading"),
            LifecycleState::Active => write!(f, "active"),
            LifecycleState::Trashed => write!(f, "trashed"),
            LifecycleState::Purged => write!(f, "purged"),
        }
    }
}

/// Fields supplied by the uploader when creating a metadata row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFileRecord {
    pub owner_id: String,
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub storage_key: String,
}

/// Partial update of a metadata row
///
/// `deleted_at: Some(None)` clears the trash timestamp, `None` leaves it as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRecordPatch {
    pub name: Option<String>,
    pub deleted_at: Option<Option<DateTime<Utc>>>,
}

impl FileRecordPatch {
    pub fn trash(at: DateTime<Utc>) -> Self {
        Self {
            deleted_at: Some(Some(at)),
            ..Default::default()
        }
    }

    pub fn restore() -> Self {
        Self {
            deleted_at: Some(None),
            ..Default::default()
        }
    }

    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Apply the patch to an in-memory record
    #[cfg(test)]
    pub fn apply_to(&self, record: &mut FileRecord) {
        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(deleted_at) = self.deleted_at {
            record.deleted_at = deleted_at;
        }
    }
}
