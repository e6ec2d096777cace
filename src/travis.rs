//! Travis-CI build history feed

use crate::error::{Error, Result};
use crate::page::RepoSlug;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// Default public API host for build history.
pub const DEFAULT_API_BASE: &str = "https://api.travis-ci.org";

/// Default web host used for build links.
pub const DEFAULT_WEB_BASE: &str = "https://travis-ci.org";

/// Where the feed and the build pages live
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// Base URL of the build history API
    pub api_base: String,
    /// Base URL of the Travis-CI web interface
    pub web_base: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            web_base: DEFAULT_WEB_BASE.to_string(),
        }
    }
}

impl FeedConfig {
    /// URL of the build history for a repository
    pub fn builds_url(&self, repo: &RepoSlug) -> String {
        format!(
            "{}/repositories/{}/{}/builds.json",
            self.api_base.trim_end_matches('/'),
            repo.owner,
            repo.name
        )
    }

    /// URL of a single build page
    pub fn build_url(&self, repo: &RepoSlug, build_id: u64) -> String {
        format!(
            "{}/{}/{}/builds/{}",
            self.web_base.trim_end_matches('/'),
            repo.owner,
            repo.name,
            build_id
        )
    }
}

/// Lifecycle state reported for a build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildState {
    Created,
    Received,
    Started,
    Finished,
    Passed,
    Failed,
    Errored,
    Canceled,
    #[default]
    #[serde(other)]
    Unknown,
}

/// One entry of the build history feed, as received
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BuildRecord {
    /// Record id, used in build page links
    #[serde(default, deserialize_with = "lenient_u64")]
    pub id: Option<u64>,
    /// Human facing build number
    #[serde(default, deserialize_with = "lenient_string")]
    pub number: Option<String>,
    #[serde(default, deserialize_with = "lenient_state")]
    pub state: BuildState,
    /// 0 = failure, 1 = success, anything else = other
    #[serde(default, deserialize_with = "lenient_i64")]
    pub result: Option<i64>,
    /// Duration in seconds
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub started_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub finished_at: Option<String>,
}

impl BuildRecord {
    /// Start time, if present and well formed
    pub fn started_time(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.started_at.as_deref()?)
    }

    /// Whether the feed sent a non-empty start timestamp
    pub fn has_started_at(&self) -> bool {
        self.started_at.as_deref().is_some_and(|s| !s.is_empty())
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// The feed is third-party; a bad field must not reject the whole list.

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<f64>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<i64>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.and_then(|v| match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<u64>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.and_then(|v| match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

fn lenient_string<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.and_then(|v| match v {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

fn lenient_state<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<BuildState, D::Error> {
    Ok(Option::<Value>::deserialize(d)?
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default())
}

/// Parse a feed body into build records, newest first
pub fn parse_builds(body: &str) -> Result<Vec<BuildRecord>> {
    let builds: Vec<BuildRecord> = serde_json::from_str(body)?;
    Ok(builds)
}

/// Source of build history for a repository
#[allow(async_fn_in_trait)]
pub trait BuildFeed {
    /// Fetch the recent builds, newest first
    async fn fetch_builds(&self, repo: &RepoSlug) -> Result<Vec<BuildRecord>>;

    /// Link to the page of one build
    fn build_url(&self, repo: &RepoSlug, build_id: u64) -> String;
}

/// HTTP client for the public Travis-CI API
pub struct TravisClient {
    client: reqwest::Client,
    config: FeedConfig,
}

impl TravisClient {
    /// Create a new client
    pub fn new(config: FeedConfig) -> Result<Self> {
        url::Url::parse(&config.api_base)?;
        url::Url::parse(&config.web_base)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("travis-chart"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }
}

impl BuildFeed for TravisClient {
    async fn fetch_builds(&self, repo: &RepoSlug) -> Result<Vec<BuildRecord>> {
        let url = self.config.builds_url(repo);
        debug!("Fetching build history from {}", url);

        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::FeedError(format!("Failed to get builds: {}", e)))?
            .text()
            .await?;

        parse_builds(&body)
    }

    fn build_url(&self, repo: &RepoSlug, build_id: u64) -> String {
        self.config.build_url(repo, build_id)
    }
}
