// src/normalize/mod.rs
//! Response normalizers: upstream payloads -> canonical entities.
//! Infallible by construction; missing fields are defaulted, never rejected.

pub mod articles;
pub mod stories;

pub use articles::{Article, ArticleNormalizer};
pub use stories::{canonical_url, filter_story_pages, is_story_path, Story, StoryNormalizer};

/// Canonical items plus the count reported alongside them.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// One variant per upstream; the orchestrator picks the variant per route.
pub trait ResponseNormalizer {
    type Raw;
    type Item: serde::Serialize;

    fn normalize(&self, raw: Self::Raw) -> Normalized<Self::Item>;
}
