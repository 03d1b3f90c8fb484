use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use indexmap::IndexMap;
use recordquery_core::query::aggregate::{
    chart_data, default_chart_type, is_chartable, ChartEntry, ChartType, DateUnit,
};
use recordquery_core::query::filter::FilterCondition;
use recordquery_core::query::pipeline::run;
use recordquery_core::query::sort::SortCondition;
use recordquery_core::record::Record;
use recordquery_core::schema::app_schema::AppSchema;
use recordquery_core::schema::field_catalog::FieldDef;
use recordquery_core::schema::system_fields::{augment, format_value};
use recordquery_core::store::{
    CustomViewRepository, RecordRepository, SchemaRepository, StoreError,
};
use recordquery_core::view::custom_view::{CustomView, NewCustomView, ViewPatch};
use recordquery_core::view::state::{ViewSelection, ViewState};
use recordquery_core::view::validate::{validate_view_conditions, validate_view_name};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/apps", get(list_apps))
        .route("/apps/:app_id/fields", get(list_fields))
        .route("/apps/:app_id/records", post(create_record))
        .route("/apps/:app_id/query", post(query))
        .route("/apps/:app_id/chart", post(chart))
        .route("/apps/:app_id/views", get(list_views).post(create_view))
        .route(
            "/apps/:app_id/views/:view_id",
            put(update_view).delete(delete_view),
        )
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    view_id: Option<String>,
    filter_conditions: Option<Vec<FilterCondition>>,
    sort_conditions: Option<Vec<SortCondition>>,
    display_fields: Option<Vec<String>>,
    #[serde(default)]
    search_term: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    view_id: ViewSelection,
    filter_conditions: Vec<FilterCondition>,
    sort_conditions: Vec<SortCondition>,
    display_fields: Vec<String>,
    records: Vec<Record>,
    /// Display text per visible field, keyed by field name, plus the id.
    rows: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartRequest {
    field: String,
    view_id: Option<String>,
    filter_conditions: Option<Vec<FilterCondition>>,
    #[serde(default)]
    search_term: String,
    #[serde(default)]
    unit: DateUnit,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChartResponse {
    chart_type: ChartType,
    data: Vec<ChartEntry>,
}

/// Opens the requested view, then layers the request's own edits on top.
/// Filter or sort edits turn the result into an unsaved default selection.
fn reconcile(
    schema: &AppSchema,
    views: &[CustomView],
    view_id: Option<&str>,
    filters: Option<Vec<FilterCondition>>,
    sorts: Option<Vec<SortCondition>>,
    display_fields: Option<Vec<String>>,
) -> ViewState {
    let mut state = ViewState::open(schema, views, view_id);
    if let Some(filters) = filters {
        state = state.edit_filter(filters);
    }
    if let Some(sorts) = sorts {
        state = state.edit_sort(sorts);
    }
    if let Some(fields) = display_fields {
        state = state.edit_display_fields(fields);
    }
    state
}

async fn list_apps(State(state): State<AppState>) -> Result<Json<Vec<AppSchema>>, ApiError> {
    let store = state.store.read().await;
    Ok(Json(store.list_schemas()?))
}

async fn list_fields(
    State(state): State<AppState>,
    Path(app_id): Path<String>,
) -> Result<Json<Vec<FieldDef>>, ApiError> {
    let store = state.store.read().await;
    let schema = store.get_schema(&app_id)?;
    Ok(Json(augment(&schema)))
}

async fn create_record(
    State(state): State<AppState>,
    Path(app_id): Path<String>,
    headers: HeaderMap,
    Json(mut body): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    let user = state.user_id(&headers);
    let mut store = state.store.write().await;
    let schema = store.get_schema(&app_id)?;

    let mut values = IndexMap::new();
    for field in &schema.fields {
        let value = body.remove(&field.name).unwrap_or_else(|| field.initial_value());
        values.insert(field.name.clone(), value);
    }
    if let Some(extra) = body.keys().next() {
        return Err(ApiError::BadRequest(format!(
            "unknown field '{extra}' for app '{app_id}'"
        )));
    }

    let record = store.transact(|s| s.create_record(&app_id, values, Some(&user)))?;
    tracing::info!(app_id = %app_id, record_id = %record.id, "record created");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn query(
    State(state): State<AppState>,
    Path(app_id): Path<String>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let store = state.store.read().await;
    let schema = store.get_schema(&app_id)?;
    let views = store.list_views(&app_id)?;
    let view = reconcile(
        &schema,
        &views,
        req.view_id.as_deref(),
        req.filter_conditions,
        req.sort_conditions,
        req.display_fields,
    );

    let records = run(&store.list_records(&app_id)?, &schema, &view, &req.search_term);

    let fields = augment(&schema);
    let visible = view.visible_fields(&fields);
    let ctx = state.format_context(&store)?;
    let rows = records
        .iter()
        .map(|record| {
            let mut row = Map::new();
            row.insert("id".to_string(), Value::String(record.id.clone()));
            for field in &visible {
                row.insert(
                    field.name.clone(),
                    Value::String(format_value(field, record, &ctx)),
                );
            }
            row
        })
        .collect();

    Ok(Json(QueryResponse {
        view_id: view.selection,
        filter_conditions: view.filter_conditions,
        sort_conditions: view.sort_conditions,
        display_fields: visible.iter().map(|f| f.name.clone()).collect(),
        records,
        rows,
    }))
}

async fn chart(
    State(state): State<AppState>,
    Path(app_id): Path<String>,
    Json(req): Json<ChartRequest>,
) -> Result<Json<ChartResponse>, ApiError> {
    let store = state.store.read().await;
    let schema = store.get_schema(&app_id)?;
    let field_type = match schema.field(&req.field) {
        Some(def) if is_chartable(def.field_type) => def.field_type,
        Some(_) => {
            return Err(ApiError::BadRequest(format!(
                "field '{}' cannot be charted",
                req.field
            )))
        }
        None => {
            return Err(ApiError::BadRequest(format!(
                "unknown field '{}' for app '{app_id}'",
                req.field
            )))
        }
    };

    let views = store.list_views(&app_id)?;
    let view = reconcile(
        &schema,
        &views,
        req.view_id.as_deref(),
        req.filter_conditions,
        None,
        None,
    );
    let records = run(&store.list_records(&app_id)?, &schema, &view, &req.search_term);

    Ok(Json(ChartResponse {
        chart_type: default_chart_type(field_type),
        data: chart_data(&schema, &records, &req.field, req.unit),
    }))
}

async fn list_views(
    State(state): State<AppState>,
    Path(app_id): Path<String>,
) -> Result<Json<Vec<CustomView>>, ApiError> {
    let store = state.store.read().await;
    store.get_schema(&app_id)?;
    Ok(Json(store.list_views(&app_id)?))
}

async fn create_view(
    State(state): State<AppState>,
    Path(app_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<NewCustomView>,
) -> Result<(StatusCode, Json<CustomView>), ApiError> {
    validate_view_name(&body.name)?;
    let user = state.user_id(&headers);
    let mut store = state.store.write().await;
    let schema = store.get_schema(&app_id)?;
    validate_view_conditions(
        &schema,
        &body.filter_conditions,
        &body.sort_conditions,
        body.display_fields.as_deref(),
    )?;

    let view = store.transact(|s| s.create_view(&app_id, body, Some(&user)))?;
    tracing::info!(app_id = %app_id, view_id = %view.id, name = %view.name, "custom view saved");
    Ok((StatusCode::CREATED, Json(view)))
}

async fn update_view(
    State(state): State<AppState>,
    Path((app_id, view_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(patch): Json<ViewPatch>,
) -> Result<Json<CustomView>, ApiError> {
    if let Some(name) = &patch.name {
        validate_view_name(name)?;
    }
    let user = state.user_id(&headers);
    let mut store = state.store.write().await;
    let schema = store.get_schema(&app_id)?;

    // validate what the view will look like once the patch lands
    let mut merged = store
        .list_views(&app_id)?
        .into_iter()
        .find(|v| v.id == view_id)
        .ok_or_else(|| StoreError::ViewNotFound {
            app_id: app_id.clone(),
            view_id: view_id.clone(),
        })?;
    merged.apply(patch.clone());
    validate_view_conditions(
        &schema,
        &merged.filter_conditions,
        &merged.sort_conditions,
        merged.display_fields.as_deref(),
    )?;

    let view = store.transact(|s| s.update_view(&app_id, &view_id, patch, Some(&user)))?;
    tracing::info!(app_id = %app_id, view_id = %view.id, "custom view overwritten");
    Ok(Json(view))
}

async fn delete_view(
    State(state): State<AppState>,
    Path((app_id, view_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.store.write().await;
    store.get_schema(&app_id)?;
    store.transact(|s| s.delete_view(&app_id, &view_id))?;
    tracing::info!(app_id = %app_id, view_id = %view_id, "custom view deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use recordquery_core::schema::field_catalog::FieldType;
    use recordquery_core::schema::system_fields::User;
    use recordquery_core::store::InMemoryStore;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::config::ServerConfig;
    use crate::state::USER_HEADER;

    fn app() -> Router {
        seeded(InMemoryStore::new())
    }

    fn seeded(mut store: InMemoryStore) -> Router {
        store.insert_schema(AppSchema::new(
            "deals",
            "Deals",
            vec![
                FieldDef::new("company", "Company", FieldType::Text),
                FieldDef::new("status", "Status", FieldType::Select),
                FieldDef::new("amount", "Amount", FieldType::Number),
                FieldDef::new("owner", "Owner", FieldType::UserSelect),
            ],
        ));
        store.insert_records(
            "deals",
            vec![
                Record::new("1")
                    .with_value("company", "Acme")
                    .with_value("status", "open")
                    .with_value("amount", "10")
                    .with_value("owner", "u1"),
                Record::new("2")
                    .with_value("company", "Globex")
                    .with_value("status", "closed")
                    .with_value("amount", "5")
                    .with_value("owner", "u2"),
                Record::new("3")
                    .with_value("company", "Initech")
                    .with_value("status", "open")
                    .with_value("amount", 42)
                    .with_value("owner", "u1"),
            ],
        );
        store.insert_user(User {
            id: "u1".into(),
            display_name: "Aiko".into(),
        });
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        router(AppState::new(store, &config))
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            req = req.header(USER_HEADER, user);
        }
        let body = match body {
            Some(json) => {
                req = req.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn ids(body: &Value) -> Vec<&str> {
        body["records"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn lists_apps_and_augmented_fields() {
        let app = app();
        let (status, body) = send(&app, "GET", "/apps", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], "deals");

        let (status, body) = send(&app, "GET", "/apps/deals/fields", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let fields = body.as_array().unwrap();
        assert_eq!(fields.len(), 8);
        assert_eq!(fields[3]["valueFormatter"], "user_name");
        assert_eq!(fields[7]["name"], "updatedAt");
        assert_eq!(fields[7]["readOnly"], true);
        assert_eq!(fields[7]["valueFormatter"], "date_time");
    }

    #[tokio::test]
    async fn unknown_app_is_not_found() {
        let (status, body) = send(&app(), "POST", "/apps/nope/query", None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "app schema 'nope' not found");
    }

    #[tokio::test]
    async fn ad_hoc_query_filters_sorts_and_formats() {
        let req = json!({
            "filterConditions": [{ "field": "status", "operator": "eq", "value": "open" }],
            "sortConditions": [{ "field": "amount", "direction": "desc" }],
        });
        let (status, body) = send(&app(), "POST", "/apps/deals/query", None, Some(req)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["viewId"], "default");
        assert_eq!(ids(&body), ["3", "1"]);
        assert_eq!(body["displayFields"], json!(["company", "status", "amount", "owner"]));
        assert_eq!(body["rows"][0]["owner"], "Aiko");
        assert_eq!(body["rows"][0]["amount"], "42");
    }

    #[tokio::test]
    async fn search_term_narrows_results() {
        let req = json!({ "searchTerm": "GLOB" });
        let (_, body) = send(&app(), "POST", "/apps/deals/query", None, Some(req)).await;
        assert_eq!(ids(&body), ["2"]);
    }

    #[tokio::test]
    async fn saved_view_drives_queries() {
        let app = app();
        let new_view = json!({
            "name": "Open deals",
            "filterConditions": [{ "field": "status", "operator": "eq", "value": "open" }],
            "sortConditions": [{ "field": "amount", "direction": "desc" }],
            "displayFields": ["company", "amount"],
        });
        let (status, view) = send(&app, "POST", "/apps/deals/views", Some("u7"), Some(new_view)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(view["createdBy"], "u7");
        let view_id = view["id"].as_str().unwrap().to_string();

        let (_, body) = send(&app, "POST", "/apps/deals/query", None, Some(json!({ "viewId": view_id }))).await;
        assert_eq!(body["viewId"], view_id.as_str());
        assert_eq!(ids(&body), ["3", "1"]);
        assert_eq!(body["displayFields"], json!(["company", "amount"]));

        // a sort edit forks the view but keeps its filter
        let forked = json!({
            "viewId": view_id,
            "sortConditions": [{ "field": "company", "direction": "asc" }],
        });
        let (_, body) = send(&app, "POST", "/apps/deals/query", None, Some(forked)).await;
        assert_eq!(body["viewId"], "default");
        assert_eq!(ids(&body), ["1", "3"]);

        // a column edit does not
        let columns = json!({ "viewId": view_id, "displayFields": ["status"] });
        let (_, body) = send(&app, "POST", "/apps/deals/query", None, Some(columns)).await;
        assert_eq!(body["viewId"], view_id.as_str());
        assert_eq!(body["displayFields"], json!(["status"]));
    }

    #[tokio::test]
    async fn missing_view_falls_back_to_default() {
        let req = json!({ "viewId": "gone" });
        let (status, body) = send(&app(), "POST", "/apps/deals/query", None, Some(req)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["viewId"], "default");
        assert_eq!(ids(&body), ["1", "2", "3"]);
    }

    #[tokio::test]
    async fn invalid_views_are_rejected() {
        let app = app();
        let bad_operator = json!({
            "name": "bad",
            "filterConditions": [{ "field": "status", "operator": "contains", "value": "o" }],
        });
        let (status, body) = send(&app, "POST", "/apps/deals/views", None, Some(bad_operator)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("invalid operator 'contains'"));

        let (status, _) = send(&app, "POST", "/apps/deals/views", None, Some(json!({ "name": " " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, views) = send(&app, "GET", "/apps/deals/views", None, None).await;
        assert_eq!(views, json!([]));
    }

    #[tokio::test]
    async fn overwrite_and_delete_view() {
        let app = app();
        let (_, view) = send(&app, "POST", "/apps/deals/views", None, Some(json!({ "name": "Mine" }))).await;
        let uri = format!("/apps/deals/views/{}", view["id"].as_str().unwrap());

        let patch = json!({ "name": "Renamed", "sortConditions": [{ "field": "updatedAt", "direction": "desc" }] });
        let (status, updated) = send(&app, "PUT", &uri, Some("u2"), Some(patch)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Renamed");
        assert_eq!(updated["id"], view["id"]);
        assert_eq!(updated["createdBy"], "guest");
        assert_eq!(updated["updatedBy"], "u2");

        let (status, _) = send(&app, "DELETE", &uri, None, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, views) = send(&app, "GET", "/apps/deals/views", None, None).await;
        assert_eq!(views, json!([]));

        let (status, _) = send(&app, "PUT", &uri, None, Some(json!({ "name": "again" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn charts_follow_field_type() {
        let app = app();
        let (status, body) = send(&app, "POST", "/apps/deals/chart", None, Some(json!({ "field": "status" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["chartType"], "pie");
        assert_eq!(
            body["data"],
            json!([{ "name": "open", "value": 2 }, { "name": "closed", "value": 1 }])
        );

        let req = json!({
            "field": "amount",
            "filterConditions": [{ "field": "status", "operator": "eq", "value": "open" }],
        });
        let (_, body) = send(&app, "POST", "/apps/deals/chart", None, Some(req)).await;
        assert_eq!(body["chartType"], "bar");
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 10);
        assert_eq!(data[0]["value"], 1);
        assert_eq!(data[9]["value"], 1);

        let (status, _) = send(&app, "POST", "/apps/deals/chart", None, Some(json!({ "field": "company" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn failed_writes_are_not_visible() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let app = seeded(InMemoryStore::open(blocker.join("store.json")).unwrap());

        let (status, body) = send(&app, "POST", "/apps/deals/records", None, Some(json!({ "company": "Hooli" }))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().starts_with("snapshot i/o failed"));
        let (_, body) = send(&app, "POST", "/apps/deals/query", None, Some(json!({}))).await;
        assert_eq!(ids(&body), ["1", "2", "3"]);

        let (status, _) = send(&app, "POST", "/apps/deals/views", None, Some(json!({ "name": "Mine" }))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let (_, views) = send(&app, "GET", "/apps/deals/views", None, None).await;
        assert_eq!(views, json!([]));
    }

    #[tokio::test]
    async fn schema_owned_audit_name_keeps_its_value() {
        let mut store = InMemoryStore::new();
        store.insert_schema(AppSchema::new(
            "events",
            "Events",
            vec![FieldDef::new("createdAt", "Happened on", FieldType::Date)],
        ));
        let app = seeded(store);

        let (status, record) = send(
            &app,
            "POST",
            "/apps/events/records",
            Some("u1"),
            Some(json!({ "createdAt": "2020-01-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(record["createdAt"], "2020-01-01");
        assert_eq!(record["createdBy"], "u1");

        let req = json!({
            "filterConditions": [{ "field": "createdAt", "operator": "eq", "value": "2020-01-01" }],
        });
        let (_, body) = send(&app, "POST", "/apps/events/query", None, Some(req)).await;
        assert_eq!(body["records"].as_array().unwrap().len(), 1);
        assert_eq!(body["displayFields"], json!(["createdAt"]));
        assert_eq!(body["rows"][0]["createdAt"], "2020-01-01");
    }

    #[tokio::test]
    async fn created_records_get_defaults_and_stamps() {
        let app = app();
        let (status, record) = send(
            &app,
            "POST",
            "/apps/deals/records",
            Some("u5"),
            Some(json!({ "company": "Hooli" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(record["company"], "Hooli");
        assert_eq!(record["status"], "");
        assert_eq!(record["amount"], Value::Null);
        assert_eq!(record["createdBy"], "u5");
        assert!(record["createdAt"].as_str().unwrap().ends_with('Z'));

        let (_, body) = send(&app, "POST", "/apps/deals/query", None, Some(json!({}))).await;
        assert_eq!(ids(&body).len(), 4);

        let (status, _) = send(&app, "POST", "/apps/deals/records", None, Some(json!({ "bogus": 1 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
