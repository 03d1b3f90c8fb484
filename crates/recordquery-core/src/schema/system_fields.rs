use std::collections::HashMap;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{parse_timestamp, stringify, Record};
use crate::schema::app_schema::AppSchema;
use crate::schema::field_catalog::{FieldDef, FieldType};

pub const SYSTEM_GROUP: &str = "system";

pub const CREATED_BY: &str = "createdBy";
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_BY: &str = "updatedBy";
pub const UPDATED_AT: &str = "updatedAt";

pub const SYSTEM_FIELD_NAMES: [&str; 4] = [CREATED_BY, CREATED_AT, UPDATED_BY, UPDATED_AT];

const DISPLAY_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub display_name: String,
}

/// Everything a formatter may need beyond the raw value.
#[derive(Debug, Clone)]
pub struct FormatContext {
    names: HashMap<String, String>,
    offset: FixedOffset,
}

impl Default for FormatContext {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl FormatContext {
    pub fn new(users: &[User]) -> Self {
        Self {
            names: users
                .iter()
                .map(|u| (u.id.clone(), u.display_name.clone()))
                .collect(),
            offset: Utc.fix(),
        }
    }

    /// Offset applied when rendering timestamps. Out-of-range values keep UTC.
    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        match minutes.checked_mul(60).and_then(FixedOffset::east_opt) {
            Some(offset) => self.offset = offset,
            None => tracing::warn!(minutes, "ignoring out-of-range display offset"),
        }
        self
    }

    pub fn display_name(&self, user_id: &str) -> Option<&str> {
        self.names.get(user_id).map(String::as_str)
    }
}

/// How a field's raw value is turned into display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFormatter {
    /// User id to display name; unknown ids are shown as-is.
    UserName,
    /// ISO-8601 string to a local date-time; empty input stays empty.
    DateTime,
}

impl ValueFormatter {
    pub fn format(&self, raw: Option<&Value>, ctx: &FormatContext) -> String {
        match self {
            ValueFormatter::UserName => {
                let id = stringify(raw);
                ctx.display_name(&id).map(str::to_string).unwrap_or(id)
            }
            ValueFormatter::DateTime => match parse_timestamp(raw) {
                Some(ts) => ts.with_timezone(&ctx.offset).format(DISPLAY_FORMAT).to_string(),
                None => stringify(raw),
            },
        }
    }
}

fn system_field(name: &str, label: &str, formatter: ValueFormatter) -> FieldDef {
    FieldDef {
        read_only: true,
        group: Some(SYSTEM_GROUP.to_string()),
        value_formatter: Some(formatter),
        ..FieldDef::new(name, label, FieldType::Text)
    }
}

/// Schema fields followed by the read-only audit fields.
///
/// A field the schema already declares under an audit name wins and the
/// computed one is skipped. `user_select` fields without a formatter get the
/// user-name formatter.
pub fn augment(schema: &AppSchema) -> Vec<FieldDef> {
    let mut fields = schema
        .fields
        .iter()
        .cloned()
        .map(|mut f| {
            if f.field_type == FieldType::UserSelect && f.value_formatter.is_none() {
                f.value_formatter = Some(ValueFormatter::UserName);
            }
            f
        })
        .collect::<Vec<_>>();

    let system = [
        system_field(CREATED_BY, "Created by", ValueFormatter::UserName),
        system_field(CREATED_AT, "Created at", ValueFormatter::DateTime),
        system_field(UPDATED_BY, "Updated by", ValueFormatter::UserName),
        system_field(UPDATED_AT, "Updated at", ValueFormatter::DateTime),
    ];
    for sys in system {
        if schema.field(&sys.name).is_none() {
            fields.push(sys);
        }
    }
    fields
}

/// True for the audit fields `augment` appends. A schema field that happens
/// to use an audit name is not one of them.
pub fn is_system_field(field: &FieldDef) -> bool {
    field.read_only && field.group.as_deref() == Some(SYSTEM_GROUP)
}

/// Display text for one field of a record.
pub fn format_value(field: &FieldDef, record: &Record, ctx: &FormatContext) -> String {
    let raw = record.value(&field.name);
    match field.value_formatter {
        Some(formatter) => formatter.format(raw.as_deref(), ctx),
        None => stringify(raw.as_deref()),
    }
}
