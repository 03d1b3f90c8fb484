//! Counting and binning over a query result, for chart widgets.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::record::{format_number, parse_timestamp, stringify, to_number, Record};
use crate::schema::app_schema::AppSchema;
use crate::schema::field_catalog::{FieldDef, FieldType};

pub const HISTOGRAM_BINS: usize = 10;
pub const UNSET_LABEL: &str = "(not set)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Pie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateUnit {
    Day,
    #[default]
    Month,
    Year,
}

impl DateUnit {
    fn format(self) -> &'static str {
        match self {
            DateUnit::Day => "%Y-%m-%d",
            DateUnit::Month => "%Y-%m",
            DateUnit::Year => "%Y",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartEntry {
    pub name: String,
    pub value: usize,
}

impl ChartEntry {
    fn new(name: impl Into<String>, value: usize) -> Self {
        Self { name: name.into(), value }
    }
}

pub fn is_chartable(field_type: FieldType) -> bool {
    matches!(
        field_type,
        FieldType::Select | FieldType::Radio | FieldType::Checkbox | FieldType::Number | FieldType::Date
    )
}

pub fn chartable_fields(schema: &AppSchema) -> Vec<&FieldDef> {
    schema.fields.iter().filter(|f| is_chartable(f.field_type)).collect()
}

/// Pie for categories, bar for numbers and dates.
pub fn default_chart_type(field_type: FieldType) -> ChartType {
    match field_type {
        FieldType::Number | FieldType::Date => ChartType::Bar,
        _ => ChartType::Pie,
    }
}

/// Occurrences per distinct value, in first-seen order.
pub fn count_by_category(records: &[Record], field: &str) -> Vec<ChartEntry> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for r in records {
        *counts.entry(stringify(r.value(field).as_deref())).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(name, value)| {
            let name = if name.is_empty() { UNSET_LABEL.to_string() } else { name };
            ChartEntry::new(name, value)
        })
        .collect()
}

/// Equal-width histogram over the numeric values of `field`.
///
/// The maximum lands in the last bin. A zero-width range collapses into one
/// bucket named after the value.
pub fn histogram(records: &[Record], field: &str, bins: usize) -> Vec<ChartEntry> {
    let values = records
        .iter()
        .map(|r| to_number(r.value(field).as_deref()))
        .filter(|n| n.is_finite())
        .collect::<Vec<_>>();
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = (max - min) / bins as f64;
    if width == 0.0 {
        return vec![ChartEntry::new(format_number(min), values.len())];
    }

    let mut counts = vec![0usize; bins];
    for v in &values {
        let idx = (((v - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let lo = min + i as f64 * width;
            let hi = min + (i + 1) as f64 * width;
            ChartEntry::new(format!("{:.1}-{:.1}", lo, hi), count)
        })
        .collect()
}

/// Valid dates counted per day, month or year, oldest first.
pub fn count_by_date(records: &[Record], field: &str, unit: DateUnit) -> Vec<ChartEntry> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for ts in records.iter().filter_map(|r| parse_timestamp(r.value(field).as_deref())) {
        *counts.entry(ts.format(unit.format()).to_string()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(name, value)| ChartEntry::new(name, value))
        .collect()
}

/// Chart series for `field`, picked by its type. Fields that are missing or
/// not chartable produce nothing.
pub fn chart_data(schema: &AppSchema, records: &[Record], field: &str, unit: DateUnit) -> Vec<ChartEntry> {
    let Some(def) = schema.field(field) else {
        return Vec::new();
    };
    match def.field_type {
        FieldType::Select | FieldType::Radio | FieldType::Checkbox => count_by_category(records, field),
        FieldType::Number => histogram(records, field, HISTOGRAM_BINS),
        FieldType::Date => count_by_date(records, field, unit),
        FieldType::Text
        | FieldType::Textarea
        | FieldType::Email
        | FieldType::Lookup
        | FieldType::Table
        | FieldType::UserSelect => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(values: &[&str]) -> Vec<Record> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Record::new(i.to_string()).with_value("score", *v))
            .collect()
    }

    #[test]
    fn categories_keep_first_seen_order() {
        let records = vec![
            Record::new("1").with_value("stage", "won"),
            Record::new("2").with_value("stage", "lost"),
            Record::new("3"),
            Record::new("4").with_value("stage", "won"),
        ];
        assert_eq!(
            count_by_category(&records, "stage"),
            vec![
                ChartEntry::new("won", 2),
                ChartEntry::new("lost", 1),
                ChartEntry::new(UNSET_LABEL, 1),
            ]
        );
    }

    #[test]
    fn histogram_puts_max_in_last_bin() {
        let bins = histogram(&scores(&["0", "5", "10", "abc"]), "score", HISTOGRAM_BINS);
        assert_eq!(bins.len(), 10);
        assert_eq!(bins[0], ChartEntry::new("0.0-1.0", 1));
        assert_eq!(bins[5], ChartEntry::new("5.0-6.0", 1));
        assert_eq!(bins[9], ChartEntry::new("9.0-10.0", 1));
        assert_eq!(bins.iter().map(|b| b.value).sum::<usize>(), 3);
    }

    #[test]
    fn zero_width_collapses_to_one_bucket() {
        assert_eq!(
            histogram(&scores(&["7", "7"]), "score", HISTOGRAM_BINS),
            vec![ChartEntry::new("7", 2)]
        );
        assert!(histogram(&scores(&["x"]), "score", HISTOGRAM_BINS).is_empty());
    }

    #[test]
    fn dates_bucket_by_unit() {
        let records = vec![
            Record::new("1").with_value("due", "2024-02-10"),
            Record::new("2").with_value("due", "2023-12-31"),
            Record::new("3").with_value("due", "2024-02-11"),
            Record::new("4").with_value("due", "never"),
        ];
        assert_eq!(
            count_by_date(&records, "due", DateUnit::Month),
            vec![ChartEntry::new("2023-12", 1), ChartEntry::new("2024-02", 2)]
        );
        assert_eq!(count_by_date(&records, "due", DateUnit::Year).len(), 2);
        assert_eq!(count_by_date(&records, "due", DateUnit::Day).len(), 3);
    }

    #[test]
    fn default_chart_types() {
        assert_eq!(default_chart_type(FieldType::Radio), ChartType::Pie);
        assert_eq!(default_chart_type(FieldType::Date), ChartType::Bar);
        assert!(!is_chartable(FieldType::Text));
    }
}
