use std::path::PathBuf;

use anyhow::Context;
use recordquery_core::store::GUEST_USER;

/// Process configuration, read once at startup from the environment (after
/// `.env` has been loaded).
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// JSON snapshot backing the store. Without it nothing survives a restart.
    pub data_file: Option<PathBuf>,
    /// Schema file loaded over whatever the snapshot holds.
    pub schema_file: Option<PathBuf>,
    pub default_user_id: String,
    pub display_utc_offset_minutes: i32,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = match lookup("SERVER_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("SERVER_PORT is not a port number: {raw}"))?,
            None => 8080,
        };
        let display_utc_offset_minutes = match lookup("DISPLAY_UTC_OFFSET_MINUTES") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("DISPLAY_UTC_OFFSET_MINUTES is not an integer: {raw}"))?,
            None => 0,
        };

        Ok(Self {
            host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            data_file: lookup("DATA_FILE").filter(|s| !s.is_empty()).map(PathBuf::from),
            schema_file: lookup("SCHEMA_FILE").filter(|s| !s.is_empty()).map(PathBuf::from),
            default_user_id: lookup("DEFAULT_USER_ID")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| GUEST_USER.to_string()),
            display_utc_offset_minutes,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
