//! Pure derivations of what the file views show
//!
//! Nothing here mutates its input; views compose by plain function
//! application, e.g. `search(&filter_by_category(&active_files(cache), c), q)`.

use serde::Serialize;
use utoipa::ToSchema;

use super::cache::RecordCache;
use super::models::{FileCategory, FileRecord};

const WARNING_PERCENT: f64 = 60.0;
const CRITICAL_PERCENT: f64 = 80.0;
const ALMOST_FULL_PERCENT: f64 = 90.0;

/// Records not in the trash, newest upload first
pub fn active_files(cache: &RecordCache) -> Vec<FileRecord> {
    cache
        .records()
        .iter()
        .filter(|record| !record.is_trashed())
        .cloned()
        .collect()
}

/// Records in the trash, most recently trashed first
pub fn trashed_files(cache: &RecordCache) -> Vec<FileRecord> {
    let mut trashed: Vec<FileRecord> = cache
        .records()
        .iter()
        .filter(|record| record.is_trashed())
        .cloned()
        .collect();
    trashed.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
    trashed
}

/// Case-insensitive substring match on the name; an empty query keeps
/// everything
pub fn search(records: &[FileRecord], query: &str) -> Vec<FileRecord> {
    if query.is_empty() {
        return records.to_vec();
    }

    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|record| record.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

pub fn filter_by_category(records: &[FileRecord], category: FileCategory) -> Vec<FileRecord> {
    records
        .iter()
        .filter(|record| category.matches(&record.name, &record.mime_type))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UsageLevel {
    Ok,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StorageUsage {
    pub used_bytes: u64,
    pub quota_bytes: u64,
    pub remaining_bytes: u64,
    pub percentage: f64,
    pub level: UsageLevel,
    pub almost_full: bool,
}

/// Quota consumption of every cached record
///
/// Trashed files count too: their blobs stay in the bucket until purged.
pub fn storage_usage(records: &[FileRecord], quota_bytes: u64) -> StorageUsage {
    let used_bytes: u64 = records.iter().map(|record| record.size_bytes).sum();
    let percentage = if quota_bytes == 0 {
        100.0
    } else {
        used_bytes as f64 / quota_bytes as f64 * 100.0
    };

    let level = if percentage < WARNING_PERCENT {
        UsageLevel::Ok
    } else if percentage < CRITICAL_PERCENT {
        UsageLevel::Warning
    } else {
        UsageLevel::Critical
    };

    StorageUsage {
        used_bytes,
        quota_bytes,
        remaining_bytes: quota_bytes.saturating_sub(used_bytes),
        percentage,
        level,
        almost_full: percentage > ALMOST_FULL_PERCENT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{fake_record, record_for};
    use chrono::{Duration, Utc};
    use fake::Fake;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn random_cache() -> RecordCache {
        let mut cache = RecordCache::new();
        let count: usize = (0..30).fake();
        let records = (0..count)
            .map(|_| {
                let offset: i64 = (0..5_000).fake();
                let mut record = fake_record("alice", Utc::now() - Duration::seconds(offset));
                if (0..2).fake::<u8>() == 0 {
                    record.deleted_at = Some(Utc::now() - Duration::seconds((0..500).fake::<i64>()));
                }
                record
            })
            .collect();
        cache.replace_all(records);
        cache
    }

    #[test]
    fn test_active_and_trashed_partition_the_cache() {
        for _ in 0..50 {
            let cache = random_cache();
            let active: HashSet<Uuid> = active_files(&cache).iter().map(|r| r.id).collect();
            let trashed: HashSet<Uuid> = trashed_files(&cache).iter().map(|r| r.id).collect();
            let all: HashSet<Uuid> = cache.records().iter().map(|r| r.id).collect();

            assert!(active.is_disjoint(&trashed));
            assert_eq!(active.union(&trashed).copied().collect::<HashSet<_>>(), all);
        }
    }

    #[test]
    fn test_trash_is_ordered_by_deleted_at() {
        let mut cache = RecordCache::new();
        let now = Utc::now();
        let mut first = record_for("alice", "first.txt");
        first.deleted_at = Some(now - Duration::minutes(10));
        let mut second = record_for("alice", "second.txt");
        second.deleted_at = Some(now);
        cache.replace_all(vec![first, second]);

        let names: Vec<String> = trashed_files(&cache).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["second.txt", "first.txt"]);
    }

    #[test]
    fn test_search_is_case_insensitive_and_empty_query_is_identity() {
        let records = vec![
            record_for("alice", "Quarterly Report.pdf"),
            record_for("alice", "holiday.png"),
        ];

        assert_eq!(search(&records, ""), records);

        for query in ["report", "REPORT", "rEpOrT"] {
            let found = search(&records, query);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].name, "Quarterly Report.pdf");
        }
        assert!(search(&records, "invoice").is_empty());
    }

    #[test]
    fn test_filter_by_category() {
        let mut image = record_for("alice", "holiday.png");
        image.mime_type = "image/png".to_string();
        let mut code = record_for("alice", "main.rs");
        code.mime_type = "application/octet-stream".to_string();
        let records = vec![image, code];

        assert_eq!(filter_by_category(&records, FileCategory::All), records);
        let images = filter_by_category(&records, FileCategory::Images);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].name, "holiday.png");
        assert_eq!(filter_by_category(&records, FileCategory::Code)[0].name, "main.rs");
        assert!(filter_by_category(&records, FileCategory::Videos).is_empty());
    }

    #[test]
    fn test_storage_usage_levels() {
        let mut record = record_for("alice", "big.bin");
        let quota = 1_000;

        record.size_bytes = 500;
        let usage = storage_usage(std::slice::from_ref(&record), quota);
        assert_eq!(usage.level, UsageLevel::Ok);
        assert_eq!(usage.remaining_bytes, 500);

        record.size_bytes = 700;
        assert_eq!(
            storage_usage(std::slice::from_ref(&record), quota).level,
            UsageLevel::Warning
        );

        record.size_bytes = 950;
        let usage = storage_usage(std::slice::from_ref(&record), quota);
        assert_eq!(usage.level, UsageLevel::Critical);
        assert!(usage.almost_full);

        record.size_bytes = 2_000;
        assert_eq!(storage_usage(std::slice::from_ref(&record), quota).remaining_bytes, 0);
    }
}
