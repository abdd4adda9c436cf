// src/upstream/chartbeat.rs
use async_trait::async_trait;
use serde::Deserialize;

use super::{fetch_json, PopularitySource, UpstreamFailure};
use crate::config::{ChartbeatConfig, Upstream};
use crate::params::PopularityQuery;

pub const API_KEY_HEADER: &str = "X-CB-AK";

/// Top-pages response. `pages` is required: a body without it is a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartbeatPayload {
    pub pages: Vec<RawPage>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawPage {
    /// Absolute URL, host-relative path or bare slug, depending on the page.
    pub path: Option<String>,
    pub title: Option<String>,
    pub stats: Option<RawStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawStats {
    pub people: Option<u64>,
}

/// Chartbeat live top pages, keyed by the `X-CB-AK` header.
pub struct ChartbeatConnector {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl ChartbeatConnector {
    pub fn new(cfg: &ChartbeatConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            api_url: cfg.api_url.clone(),
            api_key: cfg.api_key.clone(),
        }
    }
}

#[async_trait]
impl PopularitySource for ChartbeatConnector {
    async fn top_pages(&self, query: &PopularityQuery) -> Result<ChartbeatPayload, UpstreamFailure> {
        tracing::debug!(
            target: "upstream",
            upstream = Upstream::Chartbeat.name(),
            host = %query.host,
            limit = query.limit,
            fetch = query.fetch_count(),
            "top pages"
        );

        let request = self
            .http
            .get(&self.api_url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&query.to_pairs());
        fetch_json(Upstream::Chartbeat, request).await
    }
}
