use std::fmt;

use serde::{Deserialize, Serialize};

use crate::query::filter::FilterCondition;
use crate::query::sort::SortCondition;
use crate::schema::app_schema::AppSchema;
use crate::schema::field_catalog::FieldDef;
use crate::schema::system_fields::is_system_field;
use crate::store::{CustomViewRepository, StoreError};
use crate::view::custom_view::{CustomView, NewCustomView, ViewPatch};

pub const DEFAULT_VIEW_ID: &str = "default";

/// Which configuration the view selector shows: the implicit default or a
/// saved view. Serialises as `"default"` or the view id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ViewSelection {
    #[default]
    Default,
    Named(String),
}

impl ViewSelection {
    pub fn id(&self) -> &str {
        match self {
            ViewSelection::Default => DEFAULT_VIEW_ID,
            ViewSelection::Named(id) => id,
        }
    }
}

impl From<String> for ViewSelection {
    fn from(id: String) -> Self {
        if id == DEFAULT_VIEW_ID {
            ViewSelection::Default
        } else {
            ViewSelection::Named(id)
        }
    }
}

impl From<ViewSelection> for String {
    fn from(sel: ViewSelection) -> Self {
        match sel {
            ViewSelection::Default => DEFAULT_VIEW_ID.to_string(),
            ViewSelection::Named(id) => id,
        }
    }
}

impl fmt::Display for ViewSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// The active filter/sort/display configuration of a record list and the
/// selector identity it is shown under.
///
/// Transitions take `&self` and return the next state; stored views are
/// only ever copied in or out, never shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub selection: ViewSelection,
    pub filter_conditions: Vec<FilterCondition>,
    pub sort_conditions: Vec<SortCondition>,
    pub display_fields: Vec<String>,
}

impl ViewState {
    /// Default state: no filter, no sort, every schema field displayed.
    pub fn new(schema: &AppSchema) -> Self {
        Self {
            selection: ViewSelection::Default,
            filter_conditions: Vec::new(),
            sort_conditions: Vec::new(),
            display_fields: schema.field_names(),
        }
    }

    /// State for a freshly opened list, optionally deep-linked to a view.
    pub fn open(schema: &AppSchema, views: &[CustomView], view_id: Option<&str>) -> Self {
        let state = Self::new(schema);
        match view_id {
            Some(id) => state.select_view(id, views, schema),
            None => state,
        }
    }

    pub fn is_default(&self) -> bool {
        self.selection == ViewSelection::Default
    }

    /// Switches to `id`. `"default"` and ids missing from `views` both land
    /// in the default state.
    pub fn select_view(&self, id: &str, views: &[CustomView], schema: &AppSchema) -> Self {
        if id == DEFAULT_VIEW_ID {
            tracing::debug!("view selection reset to default");
            return Self::new(schema);
        }
        match views.iter().find(|v| v.id == id) {
            Some(view) => {
                tracing::debug!(view_id = id, name = %view.name, "view selected");
                Self::from_view(view, schema)
            }
            None => {
                tracing::warn!(view_id = id, "view not found, falling back to default");
                Self::new(schema)
            }
        }
    }

    fn from_view(view: &CustomView, schema: &AppSchema) -> Self {
        Self {
            selection: ViewSelection::Named(view.id.clone()),
            filter_conditions: view.filter_conditions.clone(),
            sort_conditions: view.sort_conditions.clone(),
            display_fields: view
                .display_fields
                .clone()
                .unwrap_or_else(|| schema.field_names()),
        }
    }

    /// Replaces the filter. The selector always drops back to default: an
    /// edited named view is an unsaved fork of it.
    pub fn edit_filter(&self, conditions: Vec<FilterCondition>) -> Self {
        Self {
            selection: ViewSelection::Default,
            filter_conditions: conditions,
            ..self.clone()
        }
    }

    /// Replaces the sort. Resets the selector like `edit_filter`.
    pub fn edit_sort(&self, conditions: Vec<SortCondition>) -> Self {
        Self {
            selection: ViewSelection::Default,
            sort_conditions: conditions,
            ..self.clone()
        }
    }

    /// Replaces the displayed columns. Column choice is cosmetic and keeps the
    /// current selector, unlike filter and sort edits.
    pub fn edit_display_fields(&self, fields: Vec<String>) -> Self {
        Self {
            display_fields: fields,
            ..self.clone()
        }
    }

    /// Persists the active configuration as a new view and selects it.
    pub fn save_as_view<R>(
        &self,
        store: &mut R,
        app_id: &str,
        name: &str,
        user_id: Option<&str>,
    ) -> Result<(Self, CustomView), StoreError>
    where
        R: CustomViewRepository + ?Sized,
    {
        let view = store.create_view(
            app_id,
            NewCustomView {
                name: name.to_string(),
                filter_conditions: self.filter_conditions.clone(),
                sort_conditions: self.sort_conditions.clone(),
                display_fields: Some(self.display_fields.clone()),
            },
            user_id,
        )?;
        let next = Self {
            selection: ViewSelection::Named(view.id.clone()),
            ..self.clone()
        };
        Ok((next, view))
    }

    /// Overwrites view `id` with the active configuration and selects it.
    pub fn overwrite_view<R>(
        &self,
        store: &mut R,
        app_id: &str,
        id: &str,
        name: &str,
        user_id: Option<&str>,
    ) -> Result<(Self, CustomView), StoreError>
    where
        R: CustomViewRepository + ?Sized,
    {
        let patch = ViewPatch {
            name: Some(name.to_string()),
            filter_conditions: Some(self.filter_conditions.clone()),
            sort_conditions: Some(self.sort_conditions.clone()),
            display_fields: Some(self.display_fields.clone()),
        };
        let view = store.update_view(app_id, id, patch, user_id)?;
        let next = Self {
            selection: ViewSelection::Named(view.id.clone()),
            ..self.clone()
        };
        Ok((next, view))
    }

    /// Deletes view `id`. Deleting the selected view resets to default.
    pub fn delete_view<R>(
        &self,
        store: &mut R,
        app_id: &str,
        id: &str,
        schema: &AppSchema,
    ) -> Result<Self, StoreError>
    where
        R: CustomViewRepository + ?Sized,
    {
        store.delete_view(app_id, id)?;
        if self.selection.id() == id {
            tracing::debug!(view_id = id, "selected view deleted, resetting to default");
            Ok(Self::new(schema))
        } else {
            Ok(self.clone())
        }
    }

    /// Fields to show, in field-list order. An empty selection falls back to
    /// the schema's own fields; audit fields only show when named.
    pub fn visible_fields<'a>(&self, fields: &'a [FieldDef]) -> Vec<&'a FieldDef> {
        if self.display_fields.is_empty() {
            return fields.iter().filter(|f| !is_system_field(f)).collect();
        }
        fields
            .iter()
            .filter(|f| self.display_fields.contains(&f.name))
            .collect()
    }
}
