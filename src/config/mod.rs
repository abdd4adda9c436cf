// src/config/mod.rs
//! Process-wide configuration. Built once at startup, read-only afterwards.
//!
//! Layering (lowest precedence first): built-in defaults, optional TOML file,
//! environment variables. API keys only ever come from the environment.

pub mod gate;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "AGGREGATOR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/aggregator.toml";

pub const ENV_NEWS_API_KEY: &str = "NEWS_API_KEY";
pub const ENV_NEWS_API_BASE_URL: &str = "NEWS_API_BASE_URL";
pub const ENV_NEWS_DOMAIN: &str = "NEWS_DOMAIN";
pub const ENV_CHARTBEAT_API_KEY: &str = "CHARTBEAT_API_KEY";
pub const ENV_CHARTBEAT_API_URL: &str = "CHARTBEAT_API_URL";
pub const ENV_CHARTBEAT_HOST: &str = "CHARTBEAT_HOST";
pub const ENV_TIMEOUT_MS: &str = "UPSTREAM_TIMEOUT_MS";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "UPSTREAM_CONNECT_TIMEOUT_MS";

fn default_news_base_url() -> String {
    "https://newsapi.org/v2".to_string()
}
fn default_news_domain() -> String {
    "sky.com".to_string()
}
fn default_chartbeat_host() -> String {
    "news.sky.com".to_string()
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_connect_timeout_ms() -> u64 {
    4_000
}
fn default_user_agent() -> String {
    concat!("sky-news-aggregator/", env!("CARGO_PKG_VERSION")).to_string()
}

/// The two upstreams this service fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Upstream {
    NewsApi,
    Chartbeat,
}

impl Upstream {
    pub const ALL: [Upstream; 2] = [Upstream::NewsApi, Upstream::Chartbeat];

    /// Stable label used in logs and metrics.
    pub fn name(self) -> &'static str {
        match self {
            Upstream::NewsApi => "newsapi",
            Upstream::Chartbeat => "chartbeat",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Upstream::NewsApi => "NewsAPI",
            Upstream::Chartbeat => "Chartbeat",
        }
    }
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsApiConfig {
    #[serde(skip)]
    pub api_key: String,
    pub base_url: String,
    /// Publisher domain every article search is restricted to.
    pub domain: String,
}

impl Default for NewsApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_news_base_url(),
            domain: default_news_domain(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChartbeatConfig {
    #[serde(skip)]
    pub api_key: String,
    /// Full top-pages endpoint; no default, it must be configured.
    pub api_url: String,
    pub host: String,
}

impl Default for ChartbeatConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: String::new(),
            host: default_chartbeat_host(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub newsapi: NewsApiConfig,
    pub chartbeat: ChartbeatConfig,
    pub http: HttpConfig,
}

impl AppConfig {
    /// Load using the TOML fallbacks and the real process environment:
    /// 1) $AGGREGATOR_CONFIG_PATH (must exist when set)
    /// 2) config/aggregator.toml
    /// 3) built-in defaults
    pub fn load() -> Result<Self> {
        let base = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!(
                        "{ENV_CONFIG_PATH} points to non-existent path {}",
                        pb.display()
                    ));
                }
                Self::from_toml_file(&pb)?
            }
            Err(_) => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_toml_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        base.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Apply environment-style overrides from `lookup`. Values are trimmed; an
    /// explicitly empty value still overrides (and will fail the config gate).
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string());

        if let Some(v) = get(ENV_NEWS_API_KEY) {
            self.newsapi.api_key = v;
        }
        if let Some(v) = get(ENV_NEWS_API_BASE_URL) {
            self.newsapi.base_url = v;
        }
        if let Some(v) = get(ENV_NEWS_DOMAIN).filter(|v| !v.is_empty()) {
            self.newsapi.domain = v;
        }
        if let Some(v) = get(ENV_CHARTBEAT_API_KEY) {
            self.chartbeat.api_key = v;
        }
        if let Some(v) = get(ENV_CHARTBEAT_API_URL) {
            self.chartbeat.api_url = v;
        }
        if let Some(v) = get(ENV_CHARTBEAT_HOST).filter(|v| !v.is_empty()) {
            self.chartbeat.host = v;
        }
        if let Some(v) = get(ENV_TIMEOUT_MS) {
            self.http.timeout_ms = parse_ms(ENV_TIMEOUT_MS, &v)?;
        }
        if let Some(v) = get(ENV_CONNECT_TIMEOUT_MS) {
            self.http.connect_timeout_ms = parse_ms(ENV_CONNECT_TIMEOUT_MS, &v)?;
        }
        Ok(self)
    }

    /// Credential view of one upstream: which required fields are set.
    pub fn credential(&self, upstream: Upstream) -> UpstreamCredential {
        // The domain and host have defaults, but an explicit empty value would
        // turn the domain filter and the story-path host match into no-ops.
        let fields: [(&'static str, &str); 3] = match upstream {
            Upstream::NewsApi => [
                (ENV_NEWS_API_KEY, self.newsapi.api_key.as_str()),
                (ENV_NEWS_API_BASE_URL, self.newsapi.base_url.as_str()),
                (ENV_NEWS_DOMAIN, self.newsapi.domain.as_str()),
            ],
            Upstream::Chartbeat => [
                (ENV_CHARTBEAT_API_KEY, self.chartbeat.api_key.as_str()),
                (ENV_CHARTBEAT_API_URL, self.chartbeat.api_url.as_str()),
                (ENV_CHARTBEAT_HOST, self.chartbeat.host.as_str()),
            ],
        };
        UpstreamCredential {
            upstream,
            required_fields: fields.iter().map(|(name, _)| *name).collect(),
            missing: fields
                .iter()
                .filter(|(_, value)| value.trim().is_empty())
                .map(|(name, _)| *name)
                .collect(),
        }
    }
}

fn parse_ms(key: &str, raw: &str) -> Result<u64> {
    let ms: u64 = raw
        .parse()
        .with_context(|| format!("{key} must be a whole number of milliseconds, got '{raw}'"))?;
    if ms == 0 {
        return Err(anyhow!("{key} must be greater than zero"));
    }
    Ok(ms)
}

/// Presence of the credentials/endpoints one upstream needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamCredential {
    pub upstream: Upstream,
    pub required_fields: BTreeSet<&'static str>,
    pub missing: BTreeSet<&'static str>,
}

impl UpstreamCredential {
    pub fn present(&self) -> bool {
        self.missing.is_empty()
    }
}
