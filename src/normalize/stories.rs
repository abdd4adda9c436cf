// src/normalize/stories.rs
//! Popularity normalizer: keeps story pages only, canonicalizes their URLs,
//! truncates to the requested limit.

use metrics::counter;
use serde::{Deserialize, Serialize};

use super::{Normalized, ResponseNormalizer};
use crate::upstream::{ChartbeatPayload, RawPage};

pub const UNTITLED: &str = "No title";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub title: String,
    pub url: String,
    pub concurrent_visitors: u64,
}

/// Substring heuristic: the `path` field mixes absolute URLs, host-relative
/// paths and bare slugs, so no stricter check is possible.
pub fn is_story_path(path: &str) -> bool {
    path.contains("/story/") || path.starts_with("story/")
}

/// Total and deterministic for any input.
pub fn canonical_url(path: &str, host: &str) -> String {
    if path.starts_with("http") {
        path.to_string()
    } else if path.starts_with(host) {
        format!("https://{path}")
    } else if path.starts_with('/') {
        format!("https://{host}{path}")
    } else {
        format!("https://{host}/{path}")
    }
}

/// Pages with a story `path`, upstream order kept. Idempotent.
pub fn filter_story_pages<I>(pages: I) -> Vec<RawPage>
where
    I: IntoIterator<Item = RawPage>,
{
    pages
        .into_iter()
        .filter(|p| p.path.as_deref().is_some_and(is_story_path))
        .collect()
}

#[derive(Debug, Clone)]
pub struct StoryNormalizer {
    pub host: String,
    pub limit: usize,
}

impl StoryNormalizer {
    pub fn new(host: impl Into<String>, limit: u32) -> Self {
        Self {
            host: host.into(),
            limit: limit as usize,
        }
    }

    fn to_story(&self, page: RawPage) -> Option<Story> {
        let path = page.path?;
        Some(Story {
            url: canonical_url(&path, &self.host),
            title: page.title.unwrap_or_else(|| UNTITLED.to_string()),
            concurrent_visitors: page.stats.and_then(|s| s.people).unwrap_or(0),
        })
    }
}

impl ResponseNormalizer for StoryNormalizer {
    type Raw = ChartbeatPayload;
    type Item = Story;

    /// Filter and map the whole over-fetched batch, then truncate. Fewer than
    /// `limit` stories is a valid result; `total` is the returned count.
    fn normalize(&self, raw: ChartbeatPayload) -> Normalized<Story> {
        let fetched = raw.pages.len();
        let mut items: Vec<Story> = filter_story_pages(raw.pages)
            .into_iter()
            .filter_map(|p| self.to_story(p))
            .collect();

        counter!("stories_filtered_total").increment((fetched - items.len()) as u64);
        items.truncate(self.limit);

        tracing::debug!(
            target: "normalize",
            fetched,
            kept = items.len(),
            limit = self.limit,
            "story pages normalized"
        );

        Normalized {
            total: items.len() as u64,
            items,
        }
    }
}
