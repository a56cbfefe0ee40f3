// src/api.rs
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics::counter;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::corpus::CorpusHandle;
use crate::filters::{anon_hash, QueryFilters};
use crate::parse_ai::{self, QueryParser};
use crate::ratelimit::RateLimiter;
use crate::search::{self, RelevanceScorer, SearchResultPage};

#[derive(Clone)]
pub struct AppState {
    pub corpus: CorpusHandle,
    pub parser: Arc<QueryParser>,
    pub scorer: Arc<dyn RelevanceScorer>,
    pub limiter: Arc<RateLimiter>,
    pub cfg: Arc<AppConfig>,
}

impl AppState {
    pub fn new(cfg: AppConfig) -> Self {
        let corpus = CorpusHandle::new(cfg.corpus.clone());
        Self::with_corpus(cfg, corpus)
    }

    /// Wire the state around an existing corpus handle; tests use this with
    /// [`CorpusHandle::with_records`].
    pub fn with_corpus(cfg: AppConfig, corpus: CorpusHandle) -> Self {
        Self {
            corpus,
            parser: Arc::new(parse_ai::build_parser(&cfg.ai)),
            scorer: Arc::from(search::select_scorer(&cfg.scorer)),
            limiter: Arc::new(RateLimiter::new(
                cfg.rate_limit_budget,
                cfg.rate_limit_window_secs,
            )),
            cfg: Arc::new(cfg),
        }
    }
}

static METRICS_DESCRIBED: OnceCell<()> = OnceCell::new();

fn ensure_metrics_described() {
    METRICS_DESCRIBED.get_or_init(|| {
        metrics::describe_counter!("queries_total", "Search queries handled");
        metrics::describe_counter!(
            "queries_throttled_total",
            "Queries rejected by the rate limiter"
        );
        metrics::describe_counter!("queries_empty_total", "Queries that matched nothing");
    });
}

pub fn create_router(state: AppState) -> Router {
    ensure_metrics_described();
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/parse", post(parse_query))
        .route("/search", post(search_query))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct ParseReq {
    text: String,
}

#[derive(Serialize)]
struct ParseResp {
    filters: QueryFilters,
    summary: String,
}

async fn parse_query(State(state): State<AppState>, Json(body): Json<ParseReq>) -> Json<ParseResp> {
    let filters = state.parser.parse(&body.text).await;
    let summary = filters.human_summary();
    Json(ParseResp { filters, summary })
}

#[derive(Deserialize)]
struct SearchReq {
    text: String,
    #[serde(default)]
    user_id: Option<u64>,
    #[serde(default)]
    offset: usize,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Serialize)]
struct SearchResp {
    filters: QueryFilters,
    page: SearchResultPage,
}

/// Distinct from an empty result page so callers can show a cooldown
/// message instead of "nothing found".
#[derive(Serialize)]
struct ThrottledResp {
    error: &'static str,
    retry_after_secs: u64,
}

async fn search_query(State(state): State<AppState>, Json(body): Json<SearchReq>) -> Response {
    let user_id = body.user_id.unwrap_or(0);
    if !state.limiter.allow(user_id) {
        counter!("queries_throttled_total").increment(1);
        let resp = ThrottledResp {
            error: "rate_limited",
            retry_after_secs: state.cfg.rate_limit_window_secs,
        };
        return (StatusCode::TOO_MANY_REQUESTS, Json(resp)).into_response();
    }

    counter!("queries_total").increment(1);
    let filters = state.parser.parse(&body.text).await;
    let records = state.corpus.ensure_fresh().await;
    let limit = body.limit.unwrap_or(state.cfg.page_size).clamp(1, 50);
    let page = search::search(
        &body.text,
        &filters,
        body.offset,
        limit,
        &records,
        state.scorer.as_ref(),
    );

    if page.total_matching == 0 {
        counter!("queries_empty_total").increment(1);
    }
    // Raw text never hits the logs, only its hash.
    info!(
        target: "search",
        query = %anon_hash(&body.text),
        matched = page.total_matching,
        offset = page.offset,
        "search served"
    );
    Json(SearchResp { filters, page }).into_response()
}
