mod category;
mod change_event;
mod file_record;

pub use category::FileCategory;
pub use change_event::{ChangeEvent, ChangeKind};
pub use file_record::{FileRecord, FileRecordPatch, LifecycleState, NewFileRecord};
