//!
//! ironrest HTTP server
//! --------------------
//! Thin Axum layer over the registry: two routes under the configured
//! prefix (`{prefix}/{collection}` and `{prefix}/{collection}/{id}`), every
//! method accepted and forwarded. Parsing the JSON body and decoding path
//! parameters happens here; everything else — token check, permissions,
//! hooks, store access — is the registry's and endpoints' business.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method};
use axum::routing::any;
use axum::{Json, Router};
use serde_json::Value;
use tracing::info;

use crate::endpoint::{PathParams, Reply};
use crate::registry::Registry;

/// Shared server state injected into the route handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
}

/// Build the router for the registry's current prefix. The prefix is read
/// once here; reconfigure before mounting, not after.
pub fn router(registry: Arc<Registry>) -> Router {
    let prefix = registry.settings().prefix;
    Router::new()
        .route(&format!("{}/{{collection}}", prefix), any(collection_route))
        .route(&format!("{}/{{collection}}/{{id}}", prefix), any(document_route))
        .with_state(AppState { registry })
}

/// Serve the registry on the given port until the task is aborted.
pub async fn run(registry: Arc<Registry>, http_port: u16) -> anyhow::Result<()> {
    let app = router(registry);
    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn collection_route(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Reply {
    let params = PathParams { collection, id: None };
    let body = body.map(|Json(v)| v).unwrap_or(Value::Null);
    state.registry.handle_request(&params, &method, &headers, body).await
}

async fn document_route(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Reply {
    let params = PathParams { collection, id: Some(id) };
    let body = body.map(|Json(v)| v).unwrap_or(Value::Null);
    state.registry.handle_request(&params, &method, &headers, body).await
}
