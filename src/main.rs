use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use ironrest::endpoint::EndpointConfig;
use ironrest::registry::{ConfigureOptions, Registry};
use ironrest::store::memory::MemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let http_port: u16 = std::env::var("IRONREST_HTTP_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(7878);
    let prefix = std::env::var("IRONREST_PREFIX").unwrap_or_else(|_| "/api".to_string());
    let access_token = std::env::var("IRONREST_ACCESS_TOKEN").unwrap_or_default();
    info!(
        target: "ironrest",
        "ironrest starting: RUST_LOG='{}', http_port={}, prefix='{}', access_token_set={}",
        rust_log, http_port, prefix, !access_token.is_empty()
    );
    if access_token.is_empty() {
        warn!(target: "ironrest", "IRONREST_ACCESS_TOKEN is unset; every request will be rejected with 401");
    }

    let registry = Arc::new(Registry::new());
    registry.configure(ConfigureOptions {
        prefix: Some(prefix),
        access_token: Some(access_token),
    });

    // Demo binding so a fresh start has something to talk to.
    registry.attach("widgets", Arc::new(MemoryStore::new()), EndpointConfig::default());
    info!(target: "ironrest", "attached demo collection 'widgets' (in-memory)");

    ironrest::server::run(registry, http_port).await
}
