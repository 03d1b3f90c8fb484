use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{
    CustomViewRepository, RecordRepository, SchemaRepository, StoreError, UserDirectory,
    GUEST_USER,
};
use crate::record::Record;
use crate::schema::app_schema::AppSchema;
use crate::schema::system_fields::{User, CREATED_AT, CREATED_BY, UPDATED_AT, UPDATED_BY};
use crate::view::custom_view::{CustomView, NewCustomView, ViewPatch};

/// On-disk layout of a store snapshot.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    schemas: Vec<AppSchema>,
    #[serde(default)]
    records: IndexMap<String, Vec<Record>>,
    #[serde(default)]
    views: Vec<CustomView>,
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    schemas: IndexMap<String, AppSchema>,
    records: IndexMap<String, Vec<Record>>,
    views: Vec<CustomView>,
    users: Vec<User>,
    path: Option<PathBuf>,
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the snapshot at `path` if it exists; later `persist` calls write
    /// back to the same file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let snapshot = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str::<Snapshot>(&raw)?
        } else {
            tracing::info!(path = %path.display(), "no snapshot yet, starting empty");
            Snapshot::default()
        };

        let mut store = Self {
            path: Some(path),
            ..Self::default()
        };
        for schema in snapshot.schemas {
            store.insert_schema(schema);
        }
        store.records = snapshot.records;
        store.views = snapshot.views;
        store.users = snapshot.users;
        Ok(store)
    }

    /// Writes the snapshot file. A store without a path has nothing to do.
    pub fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let snapshot = Snapshot {
            schemas: self.schemas.values().cloned().collect(),
            records: self.records.clone(),
            views: self.views.clone(),
            users: self.users.clone(),
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&snapshot)?)?;
        tracing::info!(path = %path.display(), "store snapshot written");
        Ok(())
    }

    /// Runs `write` and persists the result as one step. When either fails
    /// the store is put back the way it was, so a failed write is never
    /// visible to later reads.
    pub fn transact<T>(
        &mut self,
        write: impl FnOnce(&mut Self) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let before = (
            self.schemas.clone(),
            self.records.clone(),
            self.views.clone(),
            self.users.clone(),
        );
        let result = write(self).and_then(|value| self.persist().map(|()| value));
        if let Err(err) = &result {
            tracing::warn!(error = %err, "store write rolled back");
            (self.schemas, self.records, self.views, self.users) = before;
        }
        result
    }

    pub fn insert_schema(&mut self, schema: AppSchema) {
        self.schemas.insert(schema.id.clone(), schema);
    }

    pub fn insert_records(&mut self, app_id: &str, records: impl IntoIterator<Item = Record>) {
        self.records
            .entry(app_id.to_string())
            .or_default()
            .extend(records);
    }

    pub fn insert_user(&mut self, user: User) {
        self.users.push(user);
    }

    fn view_mut(&mut self, app_id: &str, view_id: &str) -> Result<&mut CustomView, StoreError> {
        self.views
            .iter_mut()
            .find(|v| v.app_id == app_id && v.id == view_id)
            .ok_or_else(|| StoreError::ViewNotFound {
                app_id: app_id.to_string(),
                view_id: view_id.to_string(),
            })
    }
}

impl SchemaRepository for InMemoryStore {
    fn get_schema(&self, app_id: &str) -> Result<AppSchema, StoreError> {
        self.schemas
            .get(app_id)
            .cloned()
            .ok_or_else(|| StoreError::SchemaNotFound(app_id.to_string()))
    }

    fn list_schemas(&self) -> Result<Vec<AppSchema>, StoreError> {
        Ok(self.schemas.values().cloned().collect())
    }
}

impl RecordRepository for InMemoryStore {
    fn list_records(&self, app_id: &str) -> Result<Vec<Record>, StoreError> {
        Ok(self.records.get(app_id).cloned().unwrap_or_default())
    }

    fn create_record(
        &mut self,
        app_id: &str,
        values: IndexMap<String, Value>,
        user_id: Option<&str>,
    ) -> Result<Record, StoreError> {
        let schema = self
            .schemas
            .get(app_id)
            .ok_or_else(|| StoreError::SchemaNotFound(app_id.to_string()))?;
        let stamp = now();
        let user = user_id.unwrap_or(GUEST_USER);

        let mut record = Record {
            id: Uuid::new_v4().to_string(),
            values,
        };
        // a schema field named like an audit stamp keeps the caller's value
        for (name, value) in [
            (CREATED_BY, user),
            (CREATED_AT, stamp.as_str()),
            (UPDATED_BY, user),
            (UPDATED_AT, stamp.as_str()),
        ] {
            if schema.field(name).is_none() {
                record.values.insert(name.to_string(), Value::from(value));
            }
        }
        self.insert_records(app_id, [record.clone()]);
        Ok(record)
    }
}

impl CustomViewRepository for InMemoryStore {
    fn list_views(&self, app_id: &str) -> Result<Vec<CustomView>, StoreError> {
        Ok(self
            .views
            .iter()
            .filter(|v| v.app_id == app_id)
            .cloned()
            .collect())
    }

    fn create_view(
        &mut self,
        app_id: &str,
        view: NewCustomView,
        user_id: Option<&str>,
    ) -> Result<CustomView, StoreError> {
        let stamp = now();
        let user = user_id.unwrap_or(GUEST_USER).to_string();
        let created = CustomView {
            id: Uuid::new_v4().to_string(),
            app_id: app_id.to_string(),
            name: view.name,
            filter_conditions: view.filter_conditions,
            sort_conditions: view.sort_conditions,
            display_fields: view.display_fields,
            created_by: Some(user.clone()),
            created_at: Some(stamp.clone()),
            updated_by: Some(user),
            updated_at: Some(stamp),
        };
        self.views.push(created.clone());
        tracing::debug!(app_id, view_id = %created.id, "custom view created");
        Ok(created)
    }

    fn update_view(
        &mut self,
        app_id: &str,
        view_id: &str,
        patch: ViewPatch,
        user_id: Option<&str>,
    ) -> Result<CustomView, StoreError> {
        let view = self.view_mut(app_id, view_id)?;
        view.apply(patch);
        view.updated_at = Some(now());
        view.updated_by = Some(user_id.unwrap_or(GUEST_USER).to_string());
        Ok(view.clone())
    }

    fn delete_view(&mut self, app_id: &str, view_id: &str) -> Result<(), StoreError> {
        let before = self.views.len();
        self.views.retain(|v| !(v.app_id == app_id && v.id == view_id));
        if self.views.len() == before {
            tracing::debug!(app_id, view_id, "delete of unknown view ignored");
        }
        Ok(())
    }
}

impl UserDirectory for InMemoryStore {
    fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.clone())
    }
}
