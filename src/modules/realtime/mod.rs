//! Push feed for file row changes
//!
//! Postgres publishes every change to the `files` table on a NOTIFY
//! channel. The hub turns those notifications into `ChangeEvent`s and fans
//! them out to per-owner subscriptions.

mod hub;

pub use hub::{ConnectionState, EventHandler, RealtimeHub, Subscription, FILE_CHANGES_CHANNEL};
