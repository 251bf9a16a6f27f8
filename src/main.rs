//! Development server: in-memory storage, header-based sessions
//!
//! ```text
//! NOTEGATE_NAMESPACE=myapp NOTEGATE_ENV=testing cargo run
//! curl -H 'x-account-id: a1' -d '{"title":"T","body":"B"}' localhost:3000/notes
//! ```

use anyhow::{Context, Result};
use notegate::config::StoreConfig;
use notegate::core::store::ResourceStore;
use notegate::logging::{DEFAULT_DIRECTIVE, init_tracing};
use notegate::notes::NotesService;
use notegate::server::NotesApp;
use notegate::storage::InMemoryStorageClient;
use std::sync::Arc;

const ADDR_VAR: &str = "NOTEGATE_ADDR";
const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(DEFAULT_DIRECTIVE)?;

    let config = StoreConfig::from_env().context("failed to load store configuration")?;
    tracing::info!(
        namespace = %config.namespace,
        environment = %config.environment,
        "Starting notegate"
    );

    let store = ResourceStore::new(&config, Arc::new(InMemoryStorageClient::new()))?;
    let addr = std::env::var(ADDR_VAR).unwrap_or_else(|_| DEFAULT_ADDR.to_string());

    NotesApp::new(NotesService::new(store)).serve(&addr).await
}
