use uuid::Uuid;

use super::models::FileRecord;

/// The signed-in user's file records, newest first
///
/// Holds at most one record per id; a later write for the same id replaces
/// the earlier one.
#[derive(Debug, Clone, Default)]
pub struct RecordCache {
    records: Vec<FileRecord>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole sequence, typically with a fresh listing
    pub fn replace_all(&mut self, records: Vec<FileRecord>) {
        self.records.clear();
        for record in records {
            match self.position(&record.id) {
                Some(index) => self.records[index] = record,
                None => self.records.push(record),
            }
        }
        self.sort();
    }

    /// Insert a record or overwrite the entry with the same id
    pub fn upsert(&mut self, record: FileRecord) {
        match self.position(&record.id) {
            Some(index) => {
                let reorder = self.records[index].created_at != record.created_at;
                self.records[index] = record;
                if reorder {
                    self.sort();
                }
            }
            None => {
                let index = self
                    .records
                    .partition_point(|existing| existing.created_at > record.created_at);
                self.records.insert(index, record);
            }
        }
    }

    /// Remove the entry for `id`; absent ids are ignored
    pub fn remove(&mut self, id: &Uuid) -> Option<FileRecord> {
        self.position(id).map(|index| self.records.remove(index))
    }

    pub fn get(&self, id: &Uuid) -> Option<&FileRecord> {
        self.records.iter().find(|record| record.id == *id)
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    fn position(&self, id: &Uuid) -> Option<usize> {
        self.records.iter().position(|record| record.id == *id)
    }

    fn sort(&mut self) {
        self.records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
}
