use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use bm25_core::persist::SledStore;
use bm25_core::pipeline::{index_lines, IndexRun, PipelineOptions};
use bm25_core::rank::rank_query;
use bm25_core::store::IndexStore;
use bm25_core::{CorpusStats, DocId, DocInfo, RankedDoc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<RankedDoc>,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub corpus: String,
    pub admin_token: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn IndexStore>,
    pub config: Arc<ServerConfig>,
}

type ApiError = (StatusCode, String);

fn internal(err: anyhow::Error) -> ApiError {
    tracing::error!(error = %err, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
}

/// Open the sled store at `index_dir` and build the router. The admin token is
/// read from `ADMIN_TOKEN`.
pub fn build_app(index_dir: &str, corpus: &str) -> Result<Router> {
    let store = SledStore::open(index_dir)?;
    let config = ServerConfig { corpus: corpus.to_string(), admin_token: std::env::var("ADMIN_TOKEN").ok() };
    Ok(build_app_with_store(Arc::new(store), config))
}

pub fn build_app_with_store(store: Arc<dyn IndexStore>, config: ServerConfig) -> Router {
    let app_state = AppState { store, config: Arc::new(config) };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/corpus", get(corpus_handler))
        .route("/index/batch", post(index_batch))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let ranking = rank_query(state.store.as_ref(), &state.config.corpus, &params.q).map_err(internal)?;
    let elapsed = start.elapsed();
    tracing::debug!(query = %params.q, outcome = ?ranking.outcome, hits = ranking.candidates, "search");
    Ok(Json(SearchResponse {
        query: params.q,
        took_s: elapsed.as_secs_f64(),
        total_hits: ranking.candidates,
        results: ranking.results,
    }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<DocInfo>, ApiError> {
    match state.store.doc_info(doc_id).map_err(internal)? {
        Some(info) => Ok(Json(info)),
        None => Err((StatusCode::NOT_FOUND, "not found".into())),
    }
}

pub async fn corpus_handler(State(state): State<AppState>) -> Result<Json<CorpusStats>, ApiError> {
    match state.store.corpus_stats(&state.config.corpus).map_err(internal)? {
        Some(stats) => Ok(Json(stats)),
        None => Err((StatusCode::NOT_FOUND, "corpus has no statistics".into())),
    }
}

/// Index a body of `doc_id<TAB>doc_title<TAB>content` lines as one run.
async fn index_batch(State(state): State<AppState>, headers: HeaderMap, body: String) -> Result<Json<IndexRun>, ApiError> {
    authorize(&state, &headers)?;
    let store = state.store.clone();
    let corpus = state.config.corpus.clone();
    let run = tokio::task::spawn_blocking(move || {
        let lines: Vec<&str> = body.lines().collect();
        index_lines(store.as_ref(), &corpus, &lines, PipelineOptions::default())
    })
    .await
    .map_err(|e| internal(e.into()))?
    .map_err(internal)?;
    tracing::info!(records = run.records, dropped = run.dropped_lines, "batch indexed");
    Ok(Json(run))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.config.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
