//! Repository seams the engine reads schemas, records, views and users
//! through, plus an in-memory implementation backed by an optional JSON
//! snapshot file.

mod memory;

pub use memory::InMemoryStore;

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

use crate::record::Record;
use crate::schema::app_schema::AppSchema;
use crate::schema::system_fields::User;
use crate::view::custom_view::{CustomView, NewCustomView, ViewPatch};

/// Audit identity used when a caller does not name one.
pub const GUEST_USER: &str = "guest";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("app schema '{0}' not found")]
    SchemaNotFound(String),

    #[error("custom view '{view_id}' not found in app '{app_id}'")]
    ViewNotFound { app_id: String, view_id: String },

    #[error("snapshot i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

pub trait SchemaRepository {
    fn get_schema(&self, app_id: &str) -> Result<AppSchema, StoreError>;
    fn list_schemas(&self) -> Result<Vec<AppSchema>, StoreError>;
}

pub trait RecordRepository {
    fn list_records(&self, app_id: &str) -> Result<Vec<Record>, StoreError>;
    fn create_record(
        &mut self,
        app_id: &str,
        values: IndexMap<String, Value>,
        user_id: Option<&str>,
    ) -> Result<Record, StoreError>;
}

pub trait CustomViewRepository {
    fn list_views(&self, app_id: &str) -> Result<Vec<CustomView>, StoreError>;
    fn create_view(
        &mut self,
        app_id: &str,
        view: NewCustomView,
        user_id: Option<&str>,
    ) -> Result<CustomView, StoreError>;
    fn update_view(
        &mut self,
        app_id: &str,
        view_id: &str,
        patch: ViewPatch,
        user_id: Option<&str>,
    ) -> Result<CustomView, StoreError>;
    fn delete_view(&mut self, app_id: &str, view_id: &str) -> Result<(), StoreError>;
}

pub trait UserDirectory {
    fn list_users(&self) -> Result<Vec<User>, StoreError>;
}
