pub mod llm;

use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use llm::{LlmClient, LlmConfig};
use parking_lot::RwLock;
use placement_core::stats::{Overview, PlacementStats, ProgramStats, TopPackage};
use placement_core::{EngineConfig, PlacementEngine, Record};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    /// Overrides the engine's retrieval floor for this request.
    pub floor: Option<f32>,
}

#[derive(Deserialize)]
pub struct RowsParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_ms: u128,
    pub took_s: f64,
    /// Whether the match also clears the answer floor.
    pub answered: bool,
    pub result: Option<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub row_index: usize,
    pub similarity: f32,
    pub row: Record,
    pub matched_text: String,
    pub highlighted: String,
}

#[derive(Serialize)]
pub struct RowsResponse {
    pub query: String,
    pub total_hits: usize,
    pub results: Vec<Record>,
}

#[derive(Serialize)]
pub struct DatasetInfo {
    pub source: String,
    pub loaded_at: String,
    #[serde(flatten)]
    pub overview: Overview,
}

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub question: String,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub model: String,
    pub answer: String,
}

pub struct Loaded {
    pub engine: Arc<PlacementEngine>,
    pub loaded_at: String,
}

#[derive(Clone)]
pub struct AppState {
    pub source: PathBuf,
    pub engine_config: EngineConfig,
    pub loaded: Arc<RwLock<Loaded>>,
    pub llm: Option<Arc<LlmClient>>,
    pub admin_token: Option<String>,
}

impl AppState {
    fn engine(&self) -> Arc<PlacementEngine> { self.loaded.read().engine.clone() }
}

pub struct ServerOptions {
    pub data: PathBuf,
    pub engine: EngineConfig,
    pub llm: Option<LlmConfig>,
    pub admin_token: Option<String>,
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_else(|_| "".into())
}

pub fn build_app(options: ServerOptions) -> Result<Router> {
    // Load and index the dataset at startup
    let engine = PlacementEngine::open(&options.data, options.engine.clone())?;
    let llm = match options.llm {
        Some(cfg) => Some(Arc::new(LlmClient::new(cfg)?)),
        None => {
            tracing::warn!("no language model configured; /analyze disabled");
            None
        }
    };
    let app_state = AppState {
        source: options.data,
        engine_config: options.engine,
        loaded: Arc::new(RwLock::new(Loaded { engine: Arc::new(engine), loaded_at: now_rfc3339() })),
        llm,
        admin_token: options.admin_token,
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/dataset", get(dataset_handler))
        .route("/dataset/reload", post(reload_handler))
        .route("/stats", get(stats_handler))
        .route("/stats/program/:name", get(program_handler))
        .route("/search", get(search_handler))
        .route("/companies", get(companies_handler))
        .route("/roles", get(roles_handler))
        .route("/highest", get(highest_handler))
        .route("/summary", get(summary_handler))
        .route("/analyze", post(analyze_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn dataset_handler(State(state): State<AppState>) -> Json<DatasetInfo> {
    let (engine, loaded_at) = {
        let loaded = state.loaded.read();
        (loaded.engine.clone(), loaded.loaded_at.clone())
    };
    Json(DatasetInfo { source: state.source.display().to_string(), loaded_at, overview: engine.overview() })
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<PlacementStats> {
    Json(state.engine().snapshot())
}

pub async fn program_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ProgramStats>, (StatusCode, Json<serde_json::Value>)> {
    state
        .engine()
        .program_stats(&name)
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "no data", "program": name }))))
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let engine = state.engine();
    let floor = params.floor.unwrap_or(engine.config().retrieval_floor);
    let hit = engine.query_with_floor(&params.q, floor);
    let answered = hit.as_ref().is_some_and(|m| m.similarity > engine.config().answer_floor);

    // Capture raw query terms for highlighting
    let raw_terms: Vec<String> = params
        .q
        .split_whitespace()
        .map(|s| s.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|s| s.chars().count() > 1)
        .collect();
    let result = hit.map(|m| SearchHit {
        highlighted: highlight_terms(&m.matched_text, &raw_terms),
        row_index: m.row_index,
        similarity: m.similarity,
        row: m.row,
        matched_text: m.matched_text,
    });

    let elapsed = start.elapsed();
    Json(SearchResponse { query: params.q, took_ms: elapsed.as_millis(), took_s: elapsed.as_secs_f64(), answered, result })
}

fn rows_response(query: String, rows: Vec<Record>, k: usize) -> Json<RowsResponse> {
    let total_hits = rows.len();
    let k = k.max(1).min(100);
    Json(RowsResponse { query, total_hits, results: rows.into_iter().take(k).collect() })
}

pub async fn companies_handler(State(state): State<AppState>, Query(params): Query<RowsParams>) -> Json<RowsResponse> {
    let rows = state.engine().search_by_company(&params.q);
    rows_response(params.q, rows, params.k)
}

pub async fn roles_handler(State(state): State<AppState>, Query(params): Query<RowsParams>) -> Json<RowsResponse> {
    let rows = state.engine().search_by_role(&params.q);
    rows_response(params.q, rows, params.k)
}

pub async fn highest_handler(State(state): State<AppState>) -> Result<Json<TopPackage>, (StatusCode, String)> {
    state
        .engine()
        .highest_package()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "no compensation data".into()))
}

pub async fn summary_handler(State(state): State<AppState>) -> String {
    state.engine().data_summary()
}

pub async fn analyze_handler(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, (StatusCode, String)> {
    let Some(llm) = state.llm.clone() else {
        return Err((StatusCode::SERVICE_UNAVAILABLE, "no language model configured".into()));
    };
    let prompt = state.engine().analysis_prompt(&req.question);
    match llm.complete(&prompt).await {
        Ok(answer) => Ok(Json(AnalyzeResponse { model: llm.model().to_string(), answer })),
        Err(e) => {
            tracing::warn!(error = %e, "analysis request failed");
            Err((StatusCode::BAD_GATEWAY, format!("language model error: {e}")))
        }
    }
}

/// Rebuild the engine from the source file and swap it in. Readers keep the
/// old engine until the new one is ready.
pub async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<DatasetInfo>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let source = state.source.clone();
    let config = state.engine_config.clone();
    let engine = tokio::task::spawn_blocking(move || PlacementEngine::open(source, config))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    let engine = Arc::new(engine);
    let loaded_at = now_rfc3339();
    *state.loaded.write() = Loaded { engine: engine.clone(), loaded_at: loaded_at.clone() };
    tracing::info!(rows = engine.table().len(), "dataset reloaded");
    Ok(Json(DatasetInfo { source: state.source.display().to_string(), loaded_at, overview: engine.overview() }))
}

fn highlight_terms(text: &str, terms: &[String]) -> String {
    let mut s = text.to_string();
    for t in terms {
        if t.trim().is_empty() { continue; }
        let Ok(pat) = regex::RegexBuilder::new(&format!(r"\b{}\b", regex::escape(t)))
            .case_insensitive(true)
            .build()
        else {
            continue;
        };
        s = pat.replace_all(&s, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).to_string();
    }
    s
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
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
