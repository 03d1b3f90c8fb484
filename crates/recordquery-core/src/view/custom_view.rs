use serde::{Deserialize, Serialize};

use crate::query::filter::FilterCondition;
use crate::query::sort::SortCondition;

/// A named, persisted filter/sort/display configuration for one app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomView {
    pub id: String,
    pub app_id: String,
    pub name: String,
    #[serde(default)]
    pub filter_conditions: Vec<FilterCondition>,
    #[serde(default)]
    pub sort_conditions: Vec<SortCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Payload for creating a view; the store assigns id and audit stamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomView {
    pub name: String,
    #[serde(default)]
    pub filter_conditions: Vec<FilterCondition>,
    #[serde(default)]
    pub sort_conditions: Vec<SortCondition>,
    #[serde(default)]
    pub display_fields: Option<Vec<String>>,
}

/// Partial update; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub filter_conditions: Option<Vec<FilterCondition>>,
    #[serde(default)]
    pub sort_conditions: Option<Vec<SortCondition>>,
    #[serde(default)]
    pub display_fields: Option<Vec<String>>,
}

impl CustomView {
    pub fn apply(&mut self, patch: ViewPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(filters) = patch.filter_conditions {
            self.filter_conditions = filters;
        }
        if let Some(sorts) = patch.sort_conditions {
            self.sort_conditions = sorts;
        }
        if let Some(fields) = patch.display_fields {
            self.display_fields = Some(fields);
        }
    }
}
