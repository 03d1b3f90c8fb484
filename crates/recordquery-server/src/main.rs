mod config;
mod error;
mod routes;
mod state;

use anyhow::Context;
use recordquery_core::schema::registry::SchemaRegistry;
use recordquery_core::store::InMemoryStore;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::state::AppState;

fn load_store(config: &ServerConfig) -> anyhow::Result<InMemoryStore> {
    let mut store = match &config.data_file {
        Some(path) => InMemoryStore::open(path)
            .with_context(|| format!("open data file: {}", path.display()))?,
        None => InMemoryStore::new(),
    };
    if let Some(path) = &config.schema_file {
        let registry = SchemaRegistry::load(path)?;
        for schema in registry.into_schemas() {
            store.insert_schema(schema);
        }
    }
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    let store = load_store(&config)?;
    let app = routes::router(AppState::new(store, &config));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, data_file = ?config.data_file, "server running");
    axum::serve(listener, app).await.context("server stopped")?;
    Ok(())
}
