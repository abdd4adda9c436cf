// src/api.rs
//! HTTP surface and request orchestration.
//!
//! Every aggregated route is one linear pass:
//! gate -> params -> single upstream call -> normalize -> envelope.
//! Gate rejection or upstream failure ends the pass with an `{error, details}` 500.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use metrics::counter;
use serde::Serialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, warn};

use crate::config::gate::{ConfigGate, Readiness};
use crate::config::{AppConfig, Upstream};
use crate::error::AggregatorError;
use crate::normalize::{Article, ArticleNormalizer, ResponseNormalizer, Story, StoryNormalizer};
use crate::params::{self, ArticleParams, PopularityParams, QueryArgs, YesterdayParams};
use crate::upstream::{
    build_http_client, ArticleSearch, ChartbeatConnector, NewsApiConnector, PopularitySource,
};

pub const SERVICE_NAME: &str = "Sky News Summariser API";

/// Shared, read-only per-process state. Nothing in here changes after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub gate: Arc<ConfigGate>,
    pub articles: Arc<dyn ArticleSearch>,
    pub popularity: Arc<dyn PopularitySource>,
}

impl AppState {
    /// Real connectors sharing one bounded HTTP client.
    pub fn new(config: AppConfig) -> Result<Self> {
        let http = build_http_client(&config.http)?;
        let articles = Arc::new(NewsApiConnector::new(&config.newsapi, http.clone()));
        let popularity = Arc::new(ChartbeatConnector::new(&config.chartbeat, http));
        Ok(Self::with_sources(config, articles, popularity))
    }

    pub fn with_sources(
        config: AppConfig,
        articles: Arc<dyn ArticleSearch>,
        popularity: Arc<dyn PopularitySource>,
    ) -> Self {
        let gate = ConfigGate::from_config(&config);
        Self {
            config: Arc::new(config),
            gate: Arc::new(gate),
            articles,
            popularity,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(|| async { "ok" }))
        .route("/api/news/sky", get(sky_news))
        .route("/api/news/sky/yesterday", get(sky_news_yesterday))
        .route("/api/news/chartbeat/top", get(chartbeat_top))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/* ----------------------------
Orchestrator
---------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    GateChecked,
    ParamsBuilt,
    UpstreamCalled,
    Normalized,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::GateChecked => "gate_checked",
            Stage::ParamsBuilt => "params_built",
            Stage::UpstreamCalled => "upstream_called",
            Stage::Normalized => "normalized",
        })
    }
}

fn gate(state: &AppState, route: &'static str, upstream: Upstream) -> Result<(), AggregatorError> {
    match state.gate.check(upstream) {
        Readiness::Ready => {
            debug!(route, stage = %Stage::GateChecked, "gate ready");
            Ok(())
        }
        Readiness::Unready(missing) => {
            counter!("config_gate_rejections_total", "upstream" => upstream.name()).increment(1);
            warn!(route, upstream = upstream.name(), missing = ?missing, "upstream not configured");
            Err(AggregatorError::ConfigMissing { upstream, missing })
        }
    }
}

fn upstream_failed(route: &'static str, err: crate::upstream::UpstreamFailure) -> AggregatorError {
    warn!(route, upstream = err.upstream().name(), error = %err, "upstream call failed");
    AggregatorError::from(err)
}

#[derive(Debug, Serialize)]
pub struct ArticlesEnvelope {
    pub status: &'static str,
    #[serde(rename = "totalResults")]
    pub total_results: u64,
    pub articles: Vec<Article>,
    pub page: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
}

#[derive(Debug, Serialize)]
pub struct YesterdayEnvelope {
    pub status: &'static str,
    pub date: String,
    #[serde(rename = "totalResults")]
    pub total_results: u64,
    pub articles: Vec<Article>,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
}

#[derive(Debug, Serialize)]
pub struct StoriesEnvelope {
    pub status: &'static str,
    pub total_stories: u64,
    pub stories: Vec<Story>,
    pub limit: u32,
    pub sort_by: Option<String>,
}

async fn sky_news(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<ArticlesEnvelope>, AggregatorError> {
    const ROUTE: &str = "/api/news/sky";
    gate(&state, ROUTE, Upstream::NewsApi)?;
    let raw = ArticleParams::from(&QueryArgs::from_pairs(pairs));

    let query = params::build_article_query(&raw, &state.config.newsapi.domain);
    debug!(route = ROUTE, stage = %Stage::ParamsBuilt, ?query);

    let payload = state
        .articles
        .search(&query)
        .await
        .map_err(|e| upstream_failed(ROUTE, e))?;
    debug!(route = ROUTE, stage = %Stage::UpstreamCalled);

    let normalized = ArticleNormalizer.normalize(payload);
    debug!(route = ROUTE, stage = %Stage::Normalized, count = normalized.items.len());

    Ok(Json(ArticlesEnvelope {
        status: "success",
        total_results: normalized.total,
        articles: normalized.items,
        page: query.page,
        page_size: query.page_size,
    }))
}

async fn sky_news_yesterday(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<YesterdayEnvelope>, AggregatorError> {
    const ROUTE: &str = "/api/news/sky/yesterday";
    gate(&state, ROUTE, Upstream::NewsApi)?;
    let raw = YesterdayParams::from(&QueryArgs::from_pairs(pairs));

    // Per request, never cached: the server may run across midnight.
    let window = params::yesterday_window();
    let query = params::build_yesterday_query(&raw, &state.config.newsapi.domain, window);
    debug!(route = ROUTE, stage = %Stage::ParamsBuilt, ?query);

    let payload = state
        .articles
        .search(&query)
        .await
        .map_err(|e| upstream_failed(ROUTE, e))?;
    debug!(route = ROUTE, stage = %Stage::UpstreamCalled);

    let normalized = ArticleNormalizer.normalize(payload);
    debug!(route = ROUTE, stage = %Stage::Normalized, count = normalized.items.len());

    Ok(Json(YesterdayEnvelope {
        status: "success",
        date: window.start_ymd(),
        total_results: normalized.total,
        articles: normalized.items,
        page_size: query.page_size,
    }))
}

async fn chartbeat_top(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<StoriesEnvelope>, AggregatorError> {
    const ROUTE: &str = "/api/news/chartbeat/top";
    gate(&state, ROUTE, Upstream::Chartbeat)?;
    let raw = PopularityParams::from(&QueryArgs::from_pairs(pairs));

    let query = params::build_popularity_query(&raw, &state.config.chartbeat.host);
    debug!(route = ROUTE, stage = %Stage::ParamsBuilt, ?query);

    let payload = state
        .popularity
        .top_pages(&query)
        .await
        .map_err(|e| upstream_failed(ROUTE, e))?;
    debug!(route = ROUTE, stage = %Stage::UpstreamCalled);

    let normalized = StoryNormalizer::new(query.host.as_str(), query.limit).normalize(payload);
    debug!(route = ROUTE, stage = %Stage::Normalized, count = normalized.items.len());

    Ok(Json(StoriesEnvelope {
        status: "success",
        total_stories: normalized.total,
        stories: normalized.items,
        limit: query.limit,
        sort_by: query.sort_by,
    }))
}

/* ----------------------------
Static
---------------------------- */

async fn home() -> Json<serde_json::Value> {
    Json(json!({
        "message": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/api/news/sky": "Get Sky News articles",
            "/api/news/sky/yesterday": "Get Sky News articles from yesterday",
            "/api/news/chartbeat/top": "Get the most-read Sky News stories right now",
        }
    }))
}
