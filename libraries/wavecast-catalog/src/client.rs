//! HTTP client for the episode listing service.

use crate::catalog::EpisodeSource;
use crate::error::{CatalogError, Result};
use crate::parse::{parse_episode_list, sort_newest_first};
use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;
use wavecast_core::{Category, Episode, Language};

/// Listing service used when none is configured
pub const DEFAULT_BASE_URL: &str = "https://signed-url.davidtnfsh.workers.dev";

/// Per-request timeout used when none is configured
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Listing service connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Service root; listings and stream proxies hang off it
    pub base_url: String,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl CatalogConfig {
    /// Settings for `base_url` with the default timeout
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Builder-style timeout override
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Static description of what the client talks to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiStatus {
    pub base_url: String,
    pub supported_languages: Vec<Language>,
    pub supported_categories: Vec<Category>,
    pub timeout_ms: u64,
}

/// Client for the episode listing service.
///
/// Every language/category pair has its own listing
/// (`{base}?prefix=audio/{language}/{category}/`); streams are served through
/// `{base}/proxy/{path}`.
///
/// # Example
///
/// ```ignore
/// use wavecast_catalog::{CatalogClient, CatalogConfig};
/// use wavecast_core::{Category, Language};
///
/// let client = CatalogClient::new(CatalogConfig::default())?;
/// let episodes = client.fetch_episode_list(Language::EnUs, Category::Ai).await?;
/// println!("{} episodes", episodes.len());
/// ```
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: Client,
    base_url: String,
    listing: Url,
    timeout_ms: u64,
}

impl CatalogClient {
    /// Create a client, validating and normalizing the base URL.
    pub fn new(config: CatalogConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(CatalogError::InvalidUrl("URL cannot be empty".into()));
        }

        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(CatalogError::InvalidUrl(
                "URL must start with http:// or https://".into(),
            ));
        }
        let listing =
            Url::parse(&base_url).map_err(|e| CatalogError::InvalidUrl(e.to_string()))?;

        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(format!("Wavecast/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        debug!(base_url = %base_url, timeout_ms = config.timeout_ms, "Created catalog client");

        Ok(Self {
            http,
            base_url,
            listing,
            timeout_ms: config.timeout_ms,
        })
    }

    /// Normalized service root (no trailing slash)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Listing URL for one language/category pair
    pub fn list_url(&self, language: Language, category: Category) -> Url {
        let mut url = self.listing.clone();
        url.query_pairs_mut()
            .append_pair("prefix", &format!("audio/{language}/{category}/"));
        url
    }

    /// Playable URL for an object-storage path
    pub fn stream_url(&self, path: &str) -> String {
        format!("{}/proxy/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn status(&self) -> ApiStatus {
        ApiStatus {
            base_url: self.base_url.clone(),
            supported_languages: Language::ALL.to_vec(),
            supported_categories: Category::ALL.to_vec(),
            timeout_ms: self.timeout_ms,
        }
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Fetch the episodes of one language/category pair.
    pub async fn fetch_episode_list(
        &self,
        language: Language,
        category: Category,
    ) -> Result<Vec<Episode>> {
        let url = self.list_url(language, category);
        debug!(url = %url, "Fetching episode list");

        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| CatalogError::from_transport(&e, self.timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CatalogError::from_transport(&e, self.timeout_ms))?;

        let episodes =
            parse_episode_list(&body, language, category, |path| self.stream_url(path))?;
        debug!(%language, %category, count = episodes.len(), "Parsed episode list");
        Ok(episodes)
    }

    /// Fetch every category of one language in parallel.
    ///
    /// Failed categories are logged and skipped. Newest episodes come first.
    pub async fn fetch_all_for_language(&self, language: Language) -> Vec<Episode> {
        let requests = Category::ALL.into_iter().map(|category| async move {
            (
                category.to_string(),
                self.fetch_episode_list(language, category).await,
            )
        });

        let results = join_all(requests).await;
        merge_listings(results, language.as_str())
    }

    /// Fetch every language/category pair in parallel.
    ///
    /// Failed pairs are logged and skipped. Newest episodes come first.
    pub async fn fetch_all_episodes(&self) -> Vec<Episode> {
        let requests = Language::ALL.into_iter().flat_map(move |language| {
            Category::ALL.into_iter().map(move |category| async move {
                (
                    format!("{language}/{category}"),
                    self.fetch_episode_list(language, category).await,
                )
            })
        });

        let requests: Vec<_> = requests.collect();
        info!(requests = requests.len(), "Loading all episode listings");

        let results = join_all(requests).await;
        let episodes = merge_listings(results, "all listings");
        info!(count = episodes.len(), "Loaded all episode listings");
        episodes
    }

    /// Whether the service answers with a non-empty listing.
    pub async fn check_connectivity(&self) -> bool {
        match self
            .fetch_episode_list(Language::ZhTw, Category::Startup)
            .await
        {
            Ok(episodes) => !episodes.is_empty(),
            Err(e) => {
                error!(error = %e, "Listing service connectivity check failed");
                false
            }
        }
    }
}

#[async_trait]
impl EpisodeSource for CatalogClient {
    async fn fetch_all_episodes(&self) -> Result<Vec<Episode>> {
        Ok(CatalogClient::fetch_all_episodes(self).await)
    }
}

fn merge_listings(results: Vec<(String, Result<Vec<Episode>>)>, scope: &str) -> Vec<Episode> {
    let mut episodes = Vec::new();
    let mut failures = Vec::new();

    for (listing, result) in results {
        match result {
            Ok(mut list) => episodes.append(&mut list),
            Err(e) => failures.push(format!("{listing}: {e}")),
        }
    }

    if !failures.is_empty() {
        warn!(
            scope,
            failed = failures.len(),
            "Some listings failed: {}",
            failures.join(", ")
        );
    }

    sort_newest_first(&mut episodes);
    episodes
}
