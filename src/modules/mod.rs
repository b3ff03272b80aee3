//! Modules layer - Infrastructure components for external integrations
//!
//! Contains the remote store boundary (metadata table + blob bucket) and
//! the realtime change feed.

pub mod realtime;
pub mod storage;
