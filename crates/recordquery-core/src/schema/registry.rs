use std::path::Path;

use anyhow::{bail, Context};
use indexmap::IndexMap;

use crate::schema::app_schema::AppSchema;

/// Schemas keyed by app id, in file order.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, AppSchema>,
}

impl SchemaRegistry {
    /// Reads a JSON array of schemas. Duplicate app ids or field names are
    /// rejected.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read app schemas: {}", path.display()))?;
        let schemas: Vec<AppSchema> = serde_json::from_str(&raw)
            .with_context(|| format!("parse app schemas: {}", path.display()))?;
        Self::from_schemas(schemas)
    }

    pub fn from_schemas(schemas: Vec<AppSchema>) -> anyhow::Result<Self> {
        let mut registry = Self::default();
        for schema in schemas {
            if let Some(dup) = schema.duplicate_field() {
                bail!("app '{}' declares field '{}' more than once", schema.id, dup);
            }
            if registry.schemas.contains_key(&schema.id) {
                bail!("app id '{}' declared more than once", schema.id);
            }
            registry.schemas.insert(schema.id.clone(), schema);
        }
        Ok(registry)
    }

    pub fn get(&self, app_id: &str) -> Option<&AppSchema> {
        self.schemas.get(app_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AppSchema> {
        self.schemas.values()
    }

    pub fn into_schemas(self) -> Vec<AppSchema> {
        self.schemas.into_values().collect()
    }
}
