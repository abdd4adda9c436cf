// src/upstream/newsapi.rs
use async_trait::async_trait;
use serde::Deserialize;

use super::{fetch_json, ArticleSearch, UpstreamFailure};
use crate::config::{NewsApiConfig, Upstream};
use crate::params::ArticleQuery;

/// `/everything` response. Every field is optional; gaps are filled downstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsApiPayload {
    pub status: Option<String>,
    #[serde(rename = "totalResults")]
    pub total_results: Option<u64>,
    #[serde(default)]
    pub articles: Vec<RawArticle>,
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawArticle {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    pub source: Option<RawSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSource {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// NewsAPI `/everything`, keyed by the `apiKey` query parameter.
pub struct NewsApiConnector {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NewsApiConnector {
    pub fn new(cfg: &NewsApiConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/everything", self.base_url)
    }
}

#[async_trait]
impl ArticleSearch for NewsApiConnector {
    async fn search(&self, query: &ArticleQuery) -> Result<NewsApiPayload, UpstreamFailure> {
        let mut pairs = query.to_pairs();
        pairs.push(("apiKey", self.api_key.clone()));

        tracing::debug!(
            target: "upstream",
            upstream = Upstream::NewsApi.name(),
            q = %query.search_term,
            page_size = query.page_size,
            page = query.page,
            "article search"
        );

        let request = self.http.get(self.endpoint()).query(&pairs);
        let payload: NewsApiPayload = fetch_json(Upstream::NewsApi, request).await?;

        // NewsAPI can report errors in a 2xx body.
        if payload.status.as_deref() == Some("error") {
            let detail = match (&payload.code, &payload.message) {
                (Some(code), Some(msg)) => format!("{code}: {msg}"),
                (None, Some(msg)) => msg.clone(),
                (Some(code), None) => code.clone(),
                (None, None) => "status=error".to_string(),
            };
            return Err(UpstreamFailure::Status {
                upstream: Upstream::NewsApi,
                status: 200,
                detail,
            });
        }

        Ok(payload)
    }
}
