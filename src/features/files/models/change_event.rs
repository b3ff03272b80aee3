use serde::{Deserialize, Serialize};

use super::FileRecord;

/// Kind of row change delivered by the push feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    /// Map a trigger operation name (`TG_OP`) to a change kind
    pub fn from_operation(op: &str) -> Option<Self> {
        match op.to_ascii_uppercase().as_str() {
            "INSERT" => Some(ChangeKind::Created),
            "UPDATE" => Some(ChangeKind::Updated),
            "DELETE" => Some(ChangeKind::Deleted),
            _ => None,
        }
    }
}

/// One push notification about a file row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub record: FileRecord,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, record: FileRecord) -> Self {
        Self { kind, record }
    }
}
