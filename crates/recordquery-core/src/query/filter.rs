use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{stringify, Record};
use crate::schema::app_schema::AppSchema;
use crate::schema::field_catalog::compare;

/// Comparison operator of a filter condition.
///
/// Operators outside the known set are kept verbatim in `Other` so stored
/// views round-trip unchanged; they evaluate as a pass-through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Other(String),
}

impl FilterOperator {
    pub fn as_str(&self) -> &str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Ne => "ne",
            FilterOperator::Gt => "gt",
            FilterOperator::Lt => "lt",
            FilterOperator::Ge => "ge",
            FilterOperator::Le => "le",
            FilterOperator::Contains => "contains",
            FilterOperator::NotContains => "not_contains",
            FilterOperator::StartsWith => "starts_with",
            FilterOperator::EndsWith => "ends_with",
            FilterOperator::Other(s) => s,
        }
    }

    /// Phrase used when describing a condition to a user.
    pub fn label(&self) -> &str {
        match self {
            FilterOperator::Eq => "is equal to",
            FilterOperator::Ne => "is not equal to",
            FilterOperator::Gt => "is greater than",
            FilterOperator::Lt => "is less than",
            FilterOperator::Ge => "is at least",
            FilterOperator::Le => "is at most",
            FilterOperator::Contains => "contains",
            FilterOperator::NotContains => "does not contain",
            FilterOperator::StartsWith => "starts with",
            FilterOperator::EndsWith => "ends with",
            FilterOperator::Other(s) => s,
        }
    }
}

impl From<String> for FilterOperator {
    fn from(s: String) -> Self {
        match s.as_str() {
            "eq" => FilterOperator::Eq,
            "ne" => FilterOperator::Ne,
            "gt" => FilterOperator::Gt,
            "lt" => FilterOperator::Lt,
            "ge" => FilterOperator::Ge,
            "le" => FilterOperator::Le,
            "contains" => FilterOperator::Contains,
            "not_contains" => FilterOperator::NotContains,
            "starts_with" => FilterOperator::StartsWith,
            "ends_with" => FilterOperator::EndsWith,
            _ => FilterOperator::Other(s),
        }
    }
}

impl From<FilterOperator> for String {
    fn from(op: FilterOperator) -> Self {
        match op {
            FilterOperator::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: Value,
}

impl FilterCondition {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

/// Free-text search: true when the term is empty or any schema field's
/// string form contains it, ignoring case.
pub fn matches_search(record: &Record, schema: &AppSchema, search_term: &str) -> bool {
    if search_term.is_empty() {
        return true;
    }
    let needle = search_term.to_lowercase();
    schema.fields.iter().any(|field| {
        stringify(record.value(&field.name).as_deref())
            .to_lowercase()
            .contains(&needle)
    })
}

/// One condition against one record. A field the schema does not define
/// never matches.
pub fn matches_condition(record: &Record, schema: &AppSchema, condition: &FilterCondition) -> bool {
    let Some(def) = schema.field(&condition.field) else {
        return false;
    };
    let value = record.value(&condition.field);
    compare(def.field_type, &condition.operator, value.as_deref(), &condition.value)
}

/// Search hit AND every condition. An empty condition list is vacuously true.
pub fn matches(
    record: &Record,
    schema: &AppSchema,
    conditions: &[FilterCondition],
    search_term: &str,
) -> bool {
    matches_search(record, schema, search_term)
        && conditions
            .iter()
            .all(|c| matches_condition(record, schema, c))
}

/// Replaces the condition with the same field and operator, or appends.
pub fn upsert_filter_condition(conditions: &mut Vec<FilterCondition>, condition: FilterCondition) {
    match conditions
        .iter_mut()
        .find(|c| c.field == condition.field && c.operator == condition.operator)
    {
        Some(existing) => *existing = condition,
        None => conditions.push(condition),
    }
}

/// Human-readable form, e.g. `Amount is greater than 10`.
pub fn describe_condition(field_label: &str, condition: &FilterCondition) -> String {
    let value = match &condition.value {
        Value::Bool(true) => "checked".to_string(),
        Value::Bool(false) => "unchecked".to_string(),
        other => stringify(Some(other)),
    };
    format!("{} {} {}", field_label, condition.operator.label(), value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field_catalog::{FieldDef, FieldType};
    use serde_json::json;

    fn schema() -> AppSchema {
        AppSchema::new(
            "orders",
            "Orders",
            vec![
                FieldDef::new("status", "Status", FieldType::Select),
                FieldDef::new("amount", "Amount", FieldType::Number),
                FieldDef::new("note", "Note", FieldType::Textarea),
            ],
        )
    }

    #[test]
    fn operator_serde_keeps_unknown_spelling() {
        let op: FilterOperator = serde_json::from_value(json!("not_contains")).unwrap();
        assert_eq!(op, FilterOperator::NotContains);

        let other: FilterOperator = serde_json::from_value(json!("between")).unwrap();
        assert_eq!(other, FilterOperator::Other("between".into()));
        assert_eq!(serde_json::to_value(&other).unwrap(), json!("between"));
    }

    #[test]
    fn search_is_or_across_fields() {
        let record = Record::new("1").with_value("status", "open").with_value("note", "Call BACK");
        assert!(matches_search(&record, &schema(), "back"));
        assert!(matches_search(&record, &schema(), "OPEN"));
        assert!(matches_search(&record, &schema(), ""));
        assert!(!matches_search(&record, &schema(), "closed"));
    }

    #[test]
    fn search_ignores_fields_outside_schema() {
        let record = Record::new("1").with_value("secret", "needle");
        assert!(!matches_search(&record, &schema(), "needle"));
    }

    #[test]
    fn unknown_field_never_matches() {
        let record = Record::new("1").with_value("ghost", "x");
        let cond = FilterCondition::new("ghost", FilterOperator::Eq, "x");
        assert!(!matches(&record, &schema(), &[cond], ""));
    }

    #[test]
    fn conditions_are_conjunctive() {
        let record = Record::new("1").with_value("status", "open").with_value("amount", "10");
        let open = FilterCondition::new("status", FilterOperator::Eq, "open");
        let big = FilterCondition::new("amount", FilterOperator::Gt, 50);

        assert!(matches(&record, &schema(), &[open.clone()], ""));
        assert!(!matches(&record, &schema(), &[big.clone()], ""));
        assert!(!matches(&record, &schema(), &[open, big], ""));
        assert!(matches(&record, &schema(), &[], ""));
    }

    #[test]
    fn upsert_replaces_same_field_and_operator() {
        let mut list = vec![
            FilterCondition::new("amount", FilterOperator::Gt, 1),
            FilterCondition::new("status", FilterOperator::Eq, "open"),
        ];
        upsert_filter_condition(&mut list, FilterCondition::new("amount", FilterOperator::Gt, 5));
        upsert_filter_condition(&mut list, FilterCondition::new("amount", FilterOperator::Lt, 9));

        assert_eq!(list.len(), 3);
        assert_eq!(list[0].value, json!(5));
        assert_eq!(list[2].operator, FilterOperator::Lt);
    }

    #[test]
    fn describes_conditions() {
        let cond = FilterCondition::new("amount", FilterOperator::Gt, 10);
        assert_eq!(describe_condition("Amount", &cond), "Amount is greater than 10");

        let flag = FilterCondition::new("done", FilterOperator::Eq, true);
        assert_eq!(describe_condition("Done", &flag), "Done is equal to checked");
    }
}
