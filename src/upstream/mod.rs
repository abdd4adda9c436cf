// src/upstream/mod.rs
//! Upstream connectors: one outbound GET per request, no retries.

pub mod chartbeat;
pub mod newsapi;

use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;

use crate::config::{HttpConfig, Upstream};
use crate::params::{ArticleQuery, PopularityQuery};

pub use chartbeat::{ChartbeatConnector, ChartbeatPayload, RawPage, RawStats};
pub use newsapi::{NewsApiConnector, NewsApiPayload, RawArticle, RawSource};

/// Longest slice of an upstream error body echoed back in `details`.
const BODY_EXCERPT_CHARS: usize = 200;

/// Why a single upstream call failed. Every variant is terminal for the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamFailure {
    /// DNS, connect, TLS, timeout or body read.
    #[error("request to {upstream} failed: {detail}")]
    Transport { upstream: Upstream, detail: String },

    #[error("{upstream} returned HTTP {status}: {detail}")]
    Status {
        upstream: Upstream,
        status: u16,
        detail: String,
    },

    #[error("{upstream} returned an unreadable payload: {detail}")]
    Decode { upstream: Upstream, detail: String },
}

impl UpstreamFailure {
    pub fn upstream(&self) -> Upstream {
        match self {
            UpstreamFailure::Transport { upstream, .. }
            | UpstreamFailure::Status { upstream, .. }
            | UpstreamFailure::Decode { upstream, .. } => *upstream,
        }
    }

    fn outcome(&self) -> &'static str {
        match self {
            UpstreamFailure::Transport { .. } => "transport_error",
            UpstreamFailure::Status { .. } => "http_error",
            UpstreamFailure::Decode { .. } => "decode_error",
        }
    }

    /// reqwest errors print the request URL, which carries the NewsAPI key.
    pub(crate) fn transport(upstream: Upstream, err: reqwest::Error) -> Self {
        let timed_out = err.is_timeout();
        let err = err.without_url();
        let mut detail = error_chain(&err);
        if timed_out && !detail.contains("timed out") {
            detail.push_str(" (timed out)");
        }
        UpstreamFailure::Transport { upstream, detail }
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut cur = err.source();
    while let Some(e) = cur {
        let s = e.to_string();
        if !parts.iter().any(|p| p.contains(&s)) {
            parts.push(s);
        }
        cur = e.source();
    }
    parts.join(": ")
}

/// Article-search upstream.
#[async_trait]
pub trait ArticleSearch: Send + Sync {
    async fn search(&self, query: &ArticleQuery) -> Result<NewsApiPayload, UpstreamFailure>;
}

/// Real-time popularity upstream.
#[async_trait]
pub trait PopularitySource: Send + Sync {
    async fn top_pages(&self, query: &PopularityQuery) -> Result<ChartbeatPayload, UpstreamFailure>;
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "upstream_requests_total",
            "Outbound upstream calls by upstream and outcome."
        );
        describe_histogram!(
            "upstream_request_ms",
            "Outbound upstream call latency in milliseconds."
        );
    });
}

/// Shared outbound client: both timeouts bound every upstream call.
pub fn build_http_client(cfg: &HttpConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(cfg.user_agent.as_str())
        .connect_timeout(cfg.connect_timeout())
        .timeout(cfg.timeout())
        .build()
        .context("building upstream http client")
}

/// Send a prepared request and decode a 2xx JSON body into `T`.
/// Non-2xx bodies are summarised into the failure detail.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    upstream: Upstream,
    request: reqwest::RequestBuilder,
) -> Result<T, UpstreamFailure> {
    ensure_metrics_described();
    let t0 = Instant::now();

    let result = send_and_decode(upstream, request).await;

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("upstream_request_ms", "upstream" => upstream.name()).record(ms);
    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => e.outcome(),
    };
    counter!("upstream_requests_total", "upstream" => upstream.name(), "outcome" => outcome)
        .increment(1);

    result
}

async fn send_and_decode<T: DeserializeOwned>(
    upstream: Upstream,
    request: reqwest::RequestBuilder,
) -> Result<T, UpstreamFailure> {
    let resp = request
        .send()
        .await
        .map_err(|e| UpstreamFailure::transport(upstream, e))?;

    let status = resp.status();
    let body = resp
        .bytes()
        .await
        .map_err(|e| UpstreamFailure::transport(upstream, e))?;

    if !status.is_success() {
        return Err(UpstreamFailure::Status {
            upstream,
            status: status.as_u16(),
            detail: error_body_detail(status, &body),
        });
    }

    serde_json::from_slice(&body).map_err(|e| UpstreamFailure::Decode {
        upstream,
        detail: e.to_string(),
    })
}

/// Prefer the upstream's own `message` field; fall back to a body excerpt.
fn error_body_detail(status: reqwest::StatusCode, body: &[u8]) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        code: Option<String>,
        message: Option<String>,
    }

    if let Ok(ErrorBody {
        code,
        message: Some(message),
    }) = serde_json::from_slice::<ErrorBody>(body)
    {
        return match code {
            Some(code) => format!("{code}: {message}"),
            None => message,
        };
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        text.chars().take(BODY_EXCERPT_CHARS).collect()
    }
}
