//! Axum server for the SQL mediation API.
//!
//! Every route sits behind the `x-api-token` check. One
//! `/sql/ask-<backend>` route is registered per configured backend.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::HeaderMap,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::error::{ApiError, ServeError};
use super::sql::{self, AskBody};
use crate::config::Settings;
use crate::gateway::ModelGateway;
use crate::metadata::{MetadataProvider, SchemaCatalog, StoreMetadataProvider};
use crate::pipeline::AskPipeline;
use crate::store::{ExecutionGate, PoolManager};

/// Header carrying the shared secret.
pub const API_TOKEN_HEADER: &str = "x-api-token";

/// Application state shared across handlers.
pub struct AppState {
    pub pipeline: AskPipeline,
    pub gate: ExecutionGate,
    pub pools: Arc<PoolManager>,
    api_token: String,
}

impl AppState {
    /// Assemble the state from parts (tests inject their own gateway).
    pub fn new(
        pools: Arc<PoolManager>,
        catalog: SchemaCatalog,
        gateway: ModelGateway,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            pipeline: AskPipeline::new(catalog, gateway),
            gate: ExecutionGate::new(Arc::clone(&pools)),
            pools,
            api_token: api_token.into(),
        }
    }

    /// Build the state from resolved settings. No connection is opened yet.
    pub fn from_settings(settings: &Settings) -> Result<Self, ServeError> {
        let api_token = settings.server.resolved_api_token()?;
        let pools = Arc::new(PoolManager::new(settings.store.clone()));
        let provider: Arc<dyn MetadataProvider> =
            Arc::new(StoreMetadataProvider::new(Arc::clone(&pools)));
        let catalog = SchemaCatalog::new(provider, settings.catalog.clone());
        let gateway = ModelGateway::from_settings(settings)?;

        Ok(Self::new(pools, catalog, gateway, api_token))
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        self.pipeline.catalog()
    }

    fn token_matches(&self, presented: &str) -> bool {
        constant_time_eq(self.api_token.as_bytes(), presented.as_bytes())
    }
}

/// Build the axum router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/sql/tables", post(sql::list_tables))
        .route("/sql/describe", post(sql::describe_table))
        .route("/sql/query", post(sql::run_query));

    let backends: Vec<String> = state.pipeline.gateway().names().map(String::from).collect();
    for backend in backends {
        if !is_route_segment(&backend) {
            warn!(backend = %backend, "backend name is not usable in a route, skipping");
            continue;
        }
        let path = format!("/sql/ask-{backend}");
        app = app.route(
            &path,
            post(
                move |state: State<Arc<AppState>>, body: Result<Json<AskBody>, JsonRejection>| {
                    let backend = backend.clone();
                    async move { sql::ask(state, backend, body).await }
                },
            ),
        );
    }

    app.fallback(not_found)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_token,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Reject requests without the shared secret before any work begins.
async fn require_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let presented = headers
        .get(API_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());

    match presented {
        Some(token) if state.token_matches(token) => next.run(request).await,
        _ => ApiError::Unauthorized.into_response(),
    }
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Start the server and run until Ctrl-C.
pub async fn serve(state: Arc<AppState>, addr: &str) -> Result<(), ServeError> {
    let backends: Vec<String> = state.pipeline.gateway().names().map(String::from).collect();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, backends = ?backends, "mcp-sql listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

fn is_route_segment(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
