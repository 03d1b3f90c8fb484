use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::filter::FilterOperator;
use crate::record::{parse_timestamp, stringify, to_bool, to_number};
use crate::schema::system_fields::ValueFormatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Date,
    Checkbox,
    Select,
    Radio,
    Email,
    Lookup,
    Table,
    UserSelect,
}

impl FieldType {
    pub const ALL: [FieldType; 11] = [
        FieldType::Text,
        FieldType::Textarea,
        FieldType::Number,
        FieldType::Date,
        FieldType::Checkbox,
        FieldType::Select,
        FieldType::Radio,
        FieldType::Email,
        FieldType::Lookup,
        FieldType::Table,
        FieldType::UserSelect,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// Options as stored: either already structured, or a comma-separated string
/// typed into the schema editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldOptions {
    List(Vec<SelectOption>),
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<FieldOptions>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_formatter: Option<ValueFormatter>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            field_type,
            required: false,
            options: None,
            read_only: false,
            group: None,
            initial_value: None,
            value_formatter: None,
        }
    }

    pub fn with_options(mut self, options: FieldOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Normalised options, empty when none are declared.
    pub fn select_options(&self) -> Vec<SelectOption> {
        self.options.as_ref().map(normalize_options).unwrap_or_default()
    }

    /// The declared initial value, or the type's default.
    pub fn initial_value(&self) -> Value {
        self.initial_value
            .clone()
            .unwrap_or_else(|| initial_value(self.field_type))
    }
}

/// Default value for a freshly created record field.
pub fn initial_value(field_type: FieldType) -> Value {
    match field_type {
        FieldType::Checkbox => Value::Bool(false),
        FieldType::Date | FieldType::Number => Value::Null,
        FieldType::Table => Value::Array(Vec::new()),
        FieldType::Text
        | FieldType::Textarea
        | FieldType::Select
        | FieldType::Radio
        | FieldType::Email
        | FieldType::Lookup
        | FieldType::UserSelect => Value::String(String::new()),
    }
}

/// Turns either options representation into `{value, label}` pairs. Blank
/// entries of a raw string are dropped.
pub fn normalize_options(options: &FieldOptions) -> Vec<SelectOption> {
    match options {
        FieldOptions::List(list) => list.clone(),
        FieldOptions::Raw(raw) => {
            let parsed = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| SelectOption {
                    value: s.to_string(),
                    label: s.to_string(),
                })
                .collect::<Vec<_>>();
            if parsed.is_empty() && !raw.trim().is_empty() {
                tracing::warn!(options = %raw, "options string yielded no entries");
            }
            parsed
        }
    }
}

const TEXT_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Eq,
    FilterOperator::Ne,
    FilterOperator::Contains,
    FilterOperator::NotContains,
    FilterOperator::StartsWith,
    FilterOperator::EndsWith,
];
const ORDERED_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Eq,
    FilterOperator::Ne,
    FilterOperator::Gt,
    FilterOperator::Lt,
    FilterOperator::Ge,
    FilterOperator::Le,
];
const CHECKBOX_OPERATORS: &[FilterOperator] = &[FilterOperator::Eq];
const CHOICE_OPERATORS: &[FilterOperator] = &[FilterOperator::Eq, FilterOperator::Ne];

/// Operators an editor should offer for a field type.
pub fn operators_for(field_type: FieldType) -> &'static [FilterOperator] {
    match field_type {
        FieldType::Text
        | FieldType::Textarea
        | FieldType::Email
        | FieldType::Lookup
        | FieldType::UserSelect => TEXT_OPERATORS,
        FieldType::Number | FieldType::Date => ORDERED_OPERATORS,
        FieldType::Checkbox => CHECKBOX_OPERATORS,
        FieldType::Select | FieldType::Radio => CHOICE_OPERATORS,
        FieldType::Table => &[],
    }
}

/// Evaluates one comparison with the semantics of the field's type.
///
/// Unparseable dates and numbers never match. An operator the type does not
/// know passes (`true`).
#[deny(clippy::wildcard_enum_match_arm)]
pub fn compare(
    field_type: FieldType,
    op: &FilterOperator,
    record_value: Option<&Value>,
    condition_value: &Value,
) -> bool {
    match field_type {
        FieldType::Date => {
            let (Some(a), Some(b)) = (
                parse_timestamp(record_value),
                parse_timestamp(Some(condition_value)),
            ) else {
                return false;
            };
            compare_ordered(op, &a, &b)
        }
        FieldType::Number => {
            let a = to_number(record_value);
            let b = to_number(Some(condition_value));
            if a.is_nan() || b.is_nan() {
                return false;
            }
            compare_ordered(op, &a, &b)
        }
        FieldType::Checkbox => {
            let a = to_bool(record_value);
            let b = to_bool(Some(condition_value));
            match op {
                FilterOperator::Eq => a == b,
                FilterOperator::Ne => a != b,
                FilterOperator::Gt
                | FilterOperator::Lt
                | FilterOperator::Ge
                | FilterOperator::Le
                | FilterOperator::Contains
                | FilterOperator::NotContains
                | FilterOperator::StartsWith
                | FilterOperator::EndsWith
                | FilterOperator::Other(_) => true,
            }
        }
        FieldType::Text
        | FieldType::Textarea
        | FieldType::Select
        | FieldType::Radio
        | FieldType::Email
        | FieldType::Lookup
        | FieldType::Table
        | FieldType::UserSelect => {
            let a = stringify(record_value).to_lowercase();
            let b = stringify(Some(condition_value)).to_lowercase();
            match op {
                FilterOperator::Eq => a == b,
                FilterOperator::Ne => a != b,
                FilterOperator::Contains => a.contains(&b),
                FilterOperator::NotContains => !a.contains(&b),
                FilterOperator::StartsWith => a.starts_with(&b),
                FilterOperator::EndsWith => a.ends_with(&b),
                FilterOperator::Gt
                | FilterOperator::Lt
                | FilterOperator::Ge
                | FilterOperator::Le
                | FilterOperator::Other(_) => true,
            }
        }
    }
}

fn compare_ordered<T: PartialOrd>(op: &FilterOperator, a: &T, b: &T) -> bool {
    match op {
        FilterOperator::Eq => a == b,
        FilterOperator::Ne => a != b,
        FilterOperator::Gt => a > b,
        FilterOperator::Lt => a < b,
        FilterOperator::Ge => a >= b,
        FilterOperator::Le => a <= b,
        // permissive fallback
        FilterOperator::Contains
        | FilterOperator::NotContains
        | FilterOperator::StartsWith
        | FilterOperator::EndsWith
        | FilterOperator::Other(_) => true,
    }
}
