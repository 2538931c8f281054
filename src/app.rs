use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::jikan::{JikanApi, JikanClient};
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
}

impl AppState {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct AnimeQuery {
    pub kind: Option<String>,
    pub q: Option<String>,
    pub id: Option<String>,
}

impl AnimeQuery {
    /// A repeated key keeps its first value. Unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "type" => &mut query.kind,
                "q" => &mut query.q,
                "id" => &mut query.id,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let jikan: Arc<dyn JikanApi> = Arc::new(JikanClient::new(
        &config.jikan_base_url,
        config.upstream_timeout,
    )?);
    info!("Using Jikan API at {}", config.jikan_base_url);
    info!(
        list_ttl_secs = config.cache.list_ttl.as_secs(),
        detail_ttl_secs = config.cache.detail_ttl.as_secs(),
        max_entries = config.cache.max_entries,
        "Response cache configured"
    );

    let state = AppState::new(Catalog::new(jikan, config.cache));
    let app = build_router(state);

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/anime", get(handle_anime))
        .route("/health", get(health))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn handle_anime(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Response> {
    let params = AnimeQuery::from_pairs(pairs);
    debug!(kind = ?params.kind, q = ?params.q, id = ?params.id, "Catalog request");
    match params.kind.as_deref() {
        Some("search") => {
            let query = params
                .q
                .filter(|q| !q.is_empty())
                .ok_or(ApiError::BadRequest("Query parameter required"))?;
            let items = state.catalog.search(&query).await?;
            Ok(Json(items).into_response())
        }
        Some("trending") => Ok(Json(state.catalog.trending().await?).into_response()),
        Some("seasonal") => Ok(Json(state.catalog.seasonal().await?).into_response()),
        Some("details") => {
            let raw = params
                .id
                .filter(|id| !id.is_empty())
                .ok_or(ApiError::BadRequest("ID parameter required"))?;
            // Ids that do not parse cannot exist upstream either.
            let id = parse_id(&raw).ok_or(ApiError::NotFound)?;
            let item = state.catalog.details(id).await?.ok_or(ApiError::NotFound)?;
            Ok(Json(item).into_response())
        }
        _ => Err(ApiError::BadRequest("Invalid type parameter")),
    }
}

/// Leading decimal digits of `raw`, so `"20abc"` reads as 20.
fn parse_id(raw: &str) -> Option<u32> {
    let trimmed = raw.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
