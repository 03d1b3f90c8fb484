use thiserror::Error;

use crate::query::filter::{FilterCondition, FilterOperator};
use crate::query::sort::SortCondition;
use crate::schema::app_schema::AppSchema;
use crate::schema::field_catalog::{operators_for, FieldType};
use crate::schema::system_fields::SYSTEM_FIELD_NAMES;

#[derive(Debug, Error, PartialEq)]
pub enum ViewSpecError {
    #[error("view name must not be empty")]
    EmptyName,

    #[error("unknown field '{field}' in {context}")]
    UnknownField { field: String, context: &'static str },

    #[error("invalid operator '{op}' for field '{field}' of type '{field_type:?}'")]
    InvalidOperator {
        field: String,
        op: FilterOperator,
        field_type: FieldType,
    },

    #[error("field '{field}' listed twice in {context}")]
    Duplicate { field: String, context: &'static str },
}

/// Checks a configuration against the schema before it is saved as a view.
///
/// Filters may only target schema fields and must use an operator the field
/// type offers. Sort keys and display fields may also name the system audit
/// fields. Evaluation never calls this; it stays permissive.
pub fn validate_view_conditions(
    schema: &AppSchema,
    filters: &[FilterCondition],
    sorts: &[SortCondition],
    display_fields: Option<&[String]>,
) -> Result<(), ViewSpecError> {
    for f in filters {
        let def = schema.field(&f.field).ok_or_else(|| ViewSpecError::UnknownField {
            field: f.field.clone(),
            context: "filterConditions",
        })?;
        if !operators_for(def.field_type).contains(&f.operator) {
            return Err(ViewSpecError::InvalidOperator {
                field: f.field.clone(),
                op: f.operator.clone(),
                field_type: def.field_type,
            });
        }
    }

    let known = |name: &str| schema.field(name).is_some() || SYSTEM_FIELD_NAMES.contains(&name);

    for (i, s) in sorts.iter().enumerate() {
        if !known(&s.field) {
            return Err(ViewSpecError::UnknownField {
                field: s.field.clone(),
                context: "sortConditions",
            });
        }
        if sorts[..i].iter().any(|prev| prev.field == s.field) {
            return Err(ViewSpecError::Duplicate {
                field: s.field.clone(),
                context: "sortConditions",
            });
        }
    }

    let display_fields = display_fields.unwrap_or_default();
    for (i, name) in display_fields.iter().enumerate() {
        if !known(name) {
            return Err(ViewSpecError::UnknownField {
                field: name.clone(),
                context: "displayFields",
            });
        }
        if display_fields[..i].contains(name) {
            return Err(ViewSpecError::Duplicate {
                field: name.clone(),
                context: "displayFields",
            });
        }
    }

    Ok(())
}

/// Name check for save/overwrite.
pub fn validate_view_name(name: &str) -> Result<(), ViewSpecError> {
    if name.trim().is_empty() {
        return Err(ViewSpecError::EmptyName);
    }
    Ok(())
}
