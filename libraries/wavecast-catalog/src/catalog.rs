//! Episode catalog store
//!
//! Holds every episode the listing service knows about and the subset that
//! passes the current language, category and search filters. Observers read
//! snapshots or subscribe to changes.

use crate::error::Result;
use crate::parse::filter_episodes_by_query;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};
use wavecast_core::{Category, Episode, Language};

/// Where the catalog gets its episodes from
#[async_trait]
pub trait EpisodeSource: Send + Sync {
    /// Every published episode, newest first
    async fn fetch_all_episodes(&self) -> Result<Vec<Episode>>;
}

/// Catalog contents and filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogState {
    /// Everything from the last successful load
    pub all_episodes: Vec<Episode>,

    /// `all_episodes` narrowed by the filters below
    pub filtered_episodes: Vec<Episode>,

    pub is_loading: bool,

    /// Message of the last failed load
    pub error: Option<String>,

    /// `None` means every language
    pub selected_language: Option<Language>,

    /// `None` means every category
    pub selected_category: Option<Category>,

    pub search_query: String,
}

impl CatalogState {
    fn apply_filters(&mut self) {
        let language = self.selected_language;
        let category = self.selected_category;
        let narrowed: Vec<Episode> = self
            .all_episodes
            .iter()
            .filter(|e| language.is_none() || language == Some(e.language))
            .filter(|e| category.is_none() || category == Some(e.category))
            .cloned()
            .collect();

        self.filtered_episodes = filter_episodes_by_query(&narrowed, &self.search_query);
    }

    pub fn has_filters(&self) -> bool {
        self.selected_language.is_some()
            || self.selected_category.is_some()
            || !self.search_query.trim().is_empty()
    }
}

/// Filterable catalog backed by an [`EpisodeSource`]
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Clone)]
pub struct EpisodeCatalog {
    source: Arc<dyn EpisodeSource>,
    state: Arc<watch::Sender<CatalogState>>,
}

impl std::fmt::Debug for EpisodeCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("EpisodeCatalog")
            .field("episodes", &state.all_episodes.len())
            .field("filtered", &state.filtered_episodes.len())
            .field("is_loading", &state.is_loading)
            .finish_non_exhaustive()
    }
}

impl EpisodeCatalog {
    pub fn new(source: Arc<dyn EpisodeSource>) -> Self {
        let (state, _) = watch::channel(CatalogState::default());
        Self {
            source,
            state: Arc::new(state),
        }
    }

    pub fn snapshot(&self) -> CatalogState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.state.subscribe()
    }

    pub fn filtered_episodes(&self) -> Vec<Episode> {
        self.state.borrow().filtered_episodes.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    /// Look up a loaded episode by id
    pub fn episode(&self, id: &str) -> Option<Episode> {
        self.state
            .borrow()
            .all_episodes
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    /// Load everything from the source and re-apply the filters.
    ///
    /// A failure keeps the previous episodes, records the message and is
    /// returned to the caller.
    pub async fn load(&self) -> Result<()> {
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });

        match self.source.fetch_all_episodes().await {
            Ok(episodes) => {
                info!(count = episodes.len(), "Episode catalog loaded");
                self.state.send_modify(|state| {
                    state.all_episodes = episodes;
                    state.is_loading = false;
                    state.apply_filters();
                });
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to load episodes");
                self.state.send_modify(|state| {
                    state.is_loading = false;
                    state.error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    pub async fn refresh(&self) -> Result<()> {
        self.load().await
    }

    pub fn set_language(&self, language: Option<Language>) {
        debug!(?language, "Catalog language filter");
        self.state.send_modify(|state| {
            state.selected_language = language;
            state.apply_filters();
        });
    }

    pub fn set_category(&self, category: Option<Category>) {
        debug!(?category, "Catalog category filter");
        self.state.send_modify(|state| {
            state.selected_category = category;
            state.apply_filters();
        });
    }

    pub fn set_search_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.state.send_modify(|state| {
            state.search_query = query;
            state.apply_filters();
        });
    }

    /// Drop every filter; the filtered list becomes the full list
    pub fn clear_filters(&self) {
        self.state.send_modify(|state| {
            state.selected_language = None;
            state.selected_category = None;
            state.search_query.clear();
            state.filtered_episodes = state.all_episodes.clone();
        });
    }
}
