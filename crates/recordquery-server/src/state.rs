use std::sync::Arc;

use axum::http::HeaderMap;
use recordquery_core::schema::system_fields::FormatContext;
use recordquery_core::store::{InMemoryStore, UserDirectory};
use tokio::sync::RwLock;

use crate::config::ServerConfig;
use crate::error::ApiError;

pub const USER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<InMemoryStore>>,
    default_user_id: Arc<str>,
    display_utc_offset_minutes: i32,
}

impl AppState {
    pub fn new(store: InMemoryStore, config: &ServerConfig) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            default_user_id: Arc::from(config.default_user_id.as_str()),
            display_utc_offset_minutes: config.display_utc_offset_minutes,
        }
    }

    /// Audit identity for a write: the `x-user-id` header or the configured
    /// default.
    pub fn user_id(&self, headers: &HeaderMap) -> String {
        headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(&*self.default_user_id)
            .to_string()
    }

    pub fn format_context(&self, store: &InMemoryStore) -> Result<FormatContext, ApiError> {
        Ok(FormatContext::new(&store.list_users()?)
            .with_utc_offset_minutes(self.display_utc_offset_minutes))
    }
}
