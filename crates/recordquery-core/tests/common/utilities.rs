use std::path::PathBuf;

use recordquery_core::record::Record;
use recordquery_core::schema::app_schema::AppSchema;
use recordquery_core::schema::registry::SchemaRegistry;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn load_registry() -> SchemaRegistry {
    SchemaRegistry::load(fixture_path("schemas.json")).expect("load schema registry")
}

pub fn load_schema(app_id: &str) -> AppSchema {
    load_registry()
        .get(app_id)
        .cloned()
        .unwrap_or_else(|| panic!("fixture schema {app_id}"))
}

pub fn load_records(name: &str) -> Vec<Record> {
    let raw = std::fs::read_to_string(fixture_path(name)).expect("fixture read");
    serde_json::from_str(&raw).expect("fixture parse")
}

pub fn ids(records: &[Record]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}
