//! Remote store boundary
//!
//! `RemoteStore` is the only way the file lifecycle talks to the outside
//! world. The production implementation keeps metadata in Postgres and
//! bytes in a MinIO/S3 bucket.

mod file_row;
mod minio_client;
mod pg_minio_store;
mod remote_store;

pub use file_row::{FileRow, FILE_COLUMNS};
pub use minio_client::MinIOClient;
pub use pg_minio_store::PgMinioStore;
pub use remote_store::{RemoteStore, StorageTotals, StoreError, StoreResult, UserUsage};
