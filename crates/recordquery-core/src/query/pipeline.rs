use crate::query::filter::{matches, FilterCondition};
use crate::query::sort::{sort_records, SortCondition};
use crate::record::Record;
use crate::schema::app_schema::AppSchema;
use crate::view::state::ViewState;

/// Filters then sorts. The input is never mutated.
pub fn run_with(
    records: &[Record],
    schema: &AppSchema,
    filters: &[FilterCondition],
    sorts: &[SortCondition],
    search_term: &str,
) -> Vec<Record> {
    let filtered = records
        .iter()
        .filter(|r| matches(r, schema, filters, search_term))
        .cloned()
        .collect::<Vec<_>>();
    tracing::debug!(
        app_id = %schema.id,
        total = records.len(),
        matched = filtered.len(),
        sort_keys = sorts.len(),
        "query pipeline run"
    );
    sort_records(&filtered, sorts)
}

/// Result list for a view state plus the free-text search box.
pub fn run(records: &[Record], schema: &AppSchema, view: &ViewState, search_term: &str) -> Vec<Record> {
    run_with(
        records,
        schema,
        &view.filter_conditions,
        &view.sort_conditions,
        search_term,
    )
}
