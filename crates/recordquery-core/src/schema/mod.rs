pub mod app_schema;
pub mod field_catalog;
pub mod registry;
pub mod system_fields;
