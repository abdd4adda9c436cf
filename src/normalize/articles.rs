// src/normalize/articles.rs
use serde::{Deserialize, Serialize};

use super::{Normalized, ResponseNormalizer};
use crate::upstream::{NewsApiPayload, RawArticle};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub published_at: Option<String>,
    pub source_name: Option<String>,
}

impl From<RawArticle> for Article {
    fn from(raw: RawArticle) -> Self {
        Self {
            title: raw.title.unwrap_or_default(),
            description: raw.description,
            url: raw.url.unwrap_or_default(),
            published_at: raw.published_at,
            source_name: raw.source.and_then(|s| s.name),
        }
    }
}

/// One `Article` per upstream item, upstream order kept.
/// `total` is NewsAPI's match count before pagination, not `items.len()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArticleNormalizer;

impl ResponseNormalizer for ArticleNormalizer {
    type Raw = NewsApiPayload;
    type Item = Article;

    fn normalize(&self, raw: NewsApiPayload) -> Normalized<Article> {
        Normalized {
            total: raw.total_results.unwrap_or(0),
            items: raw.articles.into_iter().map(Article::from).collect(),
        }
    }
}
