use serde::{Deserialize, Serialize};

use crate::schema::field_catalog::FieldDef;

/// One record "app": an ordered list of field definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSchema {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl AppSchema {
    pub fn new(id: impl Into<String>, name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Label for a field name, falling back to the name itself.
    pub fn label_of<'a>(&'a self, name: &'a str) -> &'a str {
        self.field(name).map(|f| f.label.as_str()).unwrap_or(name)
    }

    /// First field name that appears more than once, if any.
    pub fn duplicate_field(&self) -> Option<&str> {
        self.fields.iter().enumerate().find_map(|(i, f)| {
            self.fields[..i]
                .iter()
                .any(|prev| prev.name == f.name)
                .then_some(f.name.as_str())
        })
    }
}
