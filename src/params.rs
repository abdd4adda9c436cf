// src/params.rs
//! Parameter normalizer: raw inbound query strings -> bounded, defaulted
//! upstream queries. Everything here is pure except `yesterday_window`,
//! which reads the local clock at call time.

use std::collections::HashMap;
use std::num::IntErrorKind;

use chrono::{Duration, Local, NaiveDate};

pub const DEFAULT_SEARCH_TERM: &str = "news";
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_PAGE: u32 = 1;
pub const ARTICLE_SORT: &str = "publishedAt";
pub const ARTICLE_LANGUAGE: &str = "en";

pub const DEFAULT_LIMIT: u32 = 10;
pub const MIN_LIMIT: u32 = 1;
pub const MAX_LIMIT: u32 = 50;
/// Story filtering drops pages after the fetch, so ask for more than we need.
pub const OVER_FETCH_MULTIPLIER: u32 = 3;

const DATE_FORMAT: &str = "%Y-%m-%d";

/* ----------------------------
Raw inbound parameters
---------------------------- */

/// Decoded query string. A repeated key keeps its first value; later ones are
/// ignored rather than rejected.
#[derive(Debug, Clone, Default)]
pub struct QueryArgs {
    values: HashMap<String, String>,
}

impl QueryArgs {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut values = HashMap::new();
        for (key, value) in pairs {
            values.entry(key).or_insert(value);
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// `GET /api/news/sky`. Everything arrives as text; numbers are parsed leniently.
#[derive(Debug, Clone, Default)]
pub struct ArticleParams {
    pub q: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub page_size: Option<String>,
    pub page: Option<String>,
}

impl From<&QueryArgs> for ArticleParams {
    fn from(args: &QueryArgs) -> Self {
        Self {
            q: args.get("q"),
            from_date: args.get("from_date"),
            to_date: args.get("to_date"),
            page_size: args.get("page_size"),
            page: args.get("page"),
        }
    }
}

/// `GET /api/news/sky/yesterday`. Date and page parameters are not accepted.
#[derive(Debug, Clone, Default)]
pub struct YesterdayParams {
    pub q: Option<String>,
    pub page_size: Option<String>,
}

impl From<&QueryArgs> for YesterdayParams {
    fn from(args: &QueryArgs) -> Self {
        Self {
            q: args.get("q"),
            page_size: args.get("page_size"),
        }
    }
}

/// `GET /api/news/chartbeat/top`.
#[derive(Debug, Clone, Default)]
pub struct PopularityParams {
    pub limit: Option<String>,
    pub sort_by: Option<String>,
}

impl From<&QueryArgs> for PopularityParams {
    fn from(args: &QueryArgs) -> Self {
        Self {
            limit: args.get("limit"),
            sort_by: args.get("sort_by"),
        }
    }
}

/* ----------------------------
Normalized upstream queries
---------------------------- */

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleQuery {
    pub search_term: String,
    pub domain_filter: String,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub page_size: u32,
    pub page: u32,
    pub sort: &'static str,
    pub language: &'static str,
}

impl ArticleQuery {
    /// Query-string pairs in NewsAPI's naming. The API key is added by the connector.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("q", self.search_term.clone()),
            ("domains", self.domain_filter.clone()),
            ("pageSize", self.page_size.to_string()),
            ("page", self.page.to_string()),
            ("sortBy", self.sort.to_string()),
            ("language", self.language.to_string()),
        ];
        if let Some(from) = &self.date_from {
            pairs.push(("from", from.clone()));
        }
        if let Some(to) = &self.date_to {
            pairs.push(("to", to.clone()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopularityQuery {
    pub host: String,
    pub limit: u32,
    pub sort_by: Option<String>,
    pub all_platforms: bool,
}

impl PopularityQuery {
    /// Number of raw pages requested upstream.
    pub fn fetch_count(&self) -> u32 {
        self.limit * OVER_FETCH_MULTIPLIER
    }

    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("host", self.host.clone()),
            ("limit", self.fetch_count().to_string()),
            ("all_platforms", if self.all_platforms { "1" } else { "0" }.to_string()),
        ];
        if let Some(sort_by) = &self.sort_by {
            pairs.push(("sort_by", sort_by.clone()));
        }
        pairs
    }
}

/// Inclusive `from..to` date pair sent to the article search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    pub fn start_ymd(&self) -> String {
        self.from.format(DATE_FORMAT).to_string()
    }

    pub fn end_ymd(&self) -> String {
        self.to.format(DATE_FORMAT).to_string()
    }
}

/* ----------------------------
Builders
---------------------------- */

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Lenient integer parse: non-numeric text counts as absent. Out-of-range
/// integers saturate so they still clamp to the right end.
fn parse_int(raw: Option<&str>) -> Option<i64> {
    match non_empty(raw)?.parse::<i64>() {
        Ok(n) => Some(n),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

fn search_term(raw: Option<&str>) -> String {
    match raw {
        Some(q) if !q.trim().is_empty() => q.to_string(),
        _ => DEFAULT_SEARCH_TERM.to_string(),
    }
}

/// Absent or < 1 -> default; above the cap -> capped.
pub fn page_size(raw: Option<&str>) -> u32 {
    match parse_int(raw) {
        Some(n) if n >= 1 => n.min(MAX_PAGE_SIZE as i64) as u32,
        _ => DEFAULT_PAGE_SIZE,
    }
}

pub fn page(raw: Option<&str>) -> u32 {
    match parse_int(raw) {
        Some(n) if n >= 1 => n.min(u32::MAX as i64) as u32,
        _ => DEFAULT_PAGE,
    }
}

/// Clamped on both ends.
pub fn limit(raw: Option<&str>) -> u32 {
    match parse_int(raw) {
        Some(n) => n.clamp(MIN_LIMIT as i64, MAX_LIMIT as i64) as u32,
        None => DEFAULT_LIMIT,
    }
}

pub fn build_article_query(raw: &ArticleParams, domain: &str) -> ArticleQuery {
    ArticleQuery {
        search_term: search_term(raw.q.as_deref()),
        domain_filter: domain.to_string(),
        date_from: non_empty(raw.from_date.as_deref()).map(str::to_string),
        date_to: non_empty(raw.to_date.as_deref()).map(str::to_string),
        page_size: page_size(raw.page_size.as_deref()),
        page: page(raw.page.as_deref()),
        sort: ARTICLE_SORT,
        language: ARTICLE_LANGUAGE,
    }
}

/// The window always comes from the server; nothing in `raw` can move it.
pub fn build_yesterday_query(raw: &YesterdayParams, domain: &str, window: DateWindow) -> ArticleQuery {
    ArticleQuery {
        search_term: search_term(raw.q.as_deref()),
        domain_filter: domain.to_string(),
        date_from: Some(window.start_ymd()),
        date_to: Some(window.end_ymd()),
        page_size: page_size(raw.page_size.as_deref()),
        page: DEFAULT_PAGE,
        sort: ARTICLE_SORT,
        language: ARTICLE_LANGUAGE,
    }
}

pub fn build_popularity_query(raw: &PopularityParams, host: &str) -> PopularityQuery {
    PopularityQuery {
        host: host.to_string(),
        limit: limit(raw.limit.as_deref()),
        sort_by: non_empty(raw.sort_by.as_deref()).map(str::to_string),
        all_platforms: true,
    }
}

/// `today - 1 day ..= today` for the given `today`.
pub fn window_ending(today: NaiveDate) -> DateWindow {
    DateWindow {
        from: today - Duration::days(1),
        to: today,
    }
}

/// Yesterday..today on the server's local clock, evaluated per call.
pub fn yesterday_window() -> DateWindow {
    window_ending(Local::now().date_naive())
}
