//! Schema-driven query engine for user-defined record apps: per-type filter
//! evaluation, multi-key sorting, saved-view reconciliation and system-field
//! augmentation over in-memory record snapshots.

pub mod query;
pub mod record;
pub mod schema;
pub mod store;
pub mod view;
