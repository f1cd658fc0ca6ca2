//! Command implementations
//!
//! Each command writes human-readable output to the given writer so the
//! binary can hand it stdout and tests a buffer.

use crate::config::AppConfig;
use crate::error::AppError;
use std::io::Write;
use std::sync::Arc;
use tracing::info;
use wavecast_catalog::{CatalogClient, EpisodeCatalog};
use wavecast_core::format::format_duration;
use wavecast_core::{Category, Episode, FileStore, Language};
use wavecast_progress::{EpisodeProgress, ProgressStore};

/// Filters for the `episodes` command
#[derive(Debug, Clone, Default)]
pub struct EpisodeFilters {
    pub language: Option<Language>,
    pub category: Option<Category>,
    pub query: Option<String>,
    pub limit: Option<usize>,
}

/// Shared state for every command
pub struct App {
    config: AppConfig,
    progress: ProgressStore,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let storage = FileStore::new(config.progress.storage_path.clone());
        let progress = ProgressStore::with_policy(Arc::new(storage), config.progress.policy());
        Self { config, progress }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    fn catalog_client(&self) -> Result<CatalogClient, AppError> {
        Ok(CatalogClient::new(self.config.catalog.clone())?)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// List published episodes matching `filters`, newest first
    pub async fn episodes(
        &self,
        out: &mut impl Write,
        filters: EpisodeFilters,
    ) -> anyhow::Result<()> {
        let catalog = EpisodeCatalog::new(Arc::new(self.catalog_client()?));
        catalog.set_language(filters.language);
        catalog.set_category(filters.category);
        if let Some(query) = filters.query {
            catalog.set_search_query(query);
        }
        catalog.load().await?;

        let episodes = catalog.filtered_episodes();
        let shown = filters.limit.unwrap_or(episodes.len()).min(episodes.len());
        info!(total = episodes.len(), shown, "Listing episodes");

        for episode in &episodes[..shown] {
            writeln!(out, "{}", self.episode_line(episode))?;
        }
        if episodes.is_empty() {
            writeln!(out, "No episodes found")?;
        }
        Ok(())
    }

    fn episode_line(&self, episode: &Episode) -> String {
        let marker = match self.progress.get_progress(&episode.id) {
            Some(p) if p.completed => " [done]".to_string(),
            Some(p) => format!(" [{:.0}%]", p.progress * 100.0),
            None => String::new(),
        };
        let date = episode.date.get(..10).unwrap_or(&episode.date);
        format!(
            "{date:<10}  {:<5}  {:<10}  {}  {}{marker}",
            episode.language.as_str(),
            episode.category.as_str(),
            episode.id,
            episode.title
        )
    }

    /// Describe the listing service and probe it
    pub async fn status(&self, out: &mut impl Write) -> anyhow::Result<()> {
        let client = self.catalog_client()?;
        let status = client.status();

        writeln!(out, "Listing service: {}", status.base_url)?;
        writeln!(out, "Timeout: {}ms", status.timeout_ms)?;
        let languages: Vec<_> = status.supported_languages.iter().map(Language::as_str).collect();
        writeln!(out, "Languages: {}", languages.join(", "))?;
        let categories: Vec<_> = status
            .supported_categories
            .iter()
            .map(Category::as_str)
            .collect();
        writeln!(out, "Categories: {}", categories.join(", "))?;

        let reachable = client.check_connectivity().await;
        writeln!(out, "Reachable: {}", if reachable { "yes" } else { "no" })?;
        Ok(())
    }

    // =========================================================================
    // Progress
    // =========================================================================

    /// Print the saved progress of one episode
    pub fn show_progress(&self, out: &mut impl Write, episode_id: &str) -> anyhow::Result<()> {
        let record = self
            .progress
            .get_progress(episode_id)
            .ok_or_else(|| AppError::UnknownEpisode(episode_id.to_string()))?;

        writeln!(out, "{}", progress_line(episode_id, &record))?;
        let resume = self.progress.get_resume_position(episode_id);
        if resume > 0.0 {
            writeln!(out, "Resumes at {}", format_duration(resume, false))?;
        } else {
            writeln!(out, "Starts from the beginning")?;
        }
        writeln!(out, "Last played {}", record.last_played.to_rfc3339())?;
        Ok(())
    }

    /// Print the most recently played episodes
    pub fn recent(&self, out: &mut impl Write, limit: usize) -> anyhow::Result<()> {
        let ids = self.progress.get_recent_episodes(limit);
        self.print_ids(out, &ids, "No recent episodes")
    }

    /// Print episodes started but not finished
    pub fn unfinished(&self, out: &mut impl Write) -> anyhow::Result<()> {
        let ids = self.progress.get_unfinished_episodes();
        self.print_ids(out, &ids, "Nothing left to finish")
    }

    fn print_ids(&self, out: &mut impl Write, ids: &[String], empty: &str) -> anyhow::Result<()> {
        if ids.is_empty() {
            writeln!(out, "{empty}")?;
        }
        for id in ids {
            if let Some(record) = self.progress.get_progress(id) {
                writeln!(out, "{}", progress_line(id, &record))?;
            }
        }
        Ok(())
    }

    pub fn clear(&self, out: &mut impl Write, episode_id: &str) -> anyhow::Result<()> {
        if self.progress.get_progress(episode_id).is_none() {
            return Err(AppError::UnknownEpisode(episode_id.to_string()).into());
        }
        self.progress.clear_progress(episode_id);
        writeln!(out, "Cleared progress for {episode_id}")?;
        Ok(())
    }

    pub fn clear_all(&self, out: &mut impl Write) -> anyhow::Result<()> {
        let count = self.progress.len();
        self.progress.clear_all_progress();
        writeln!(out, "Cleared progress for {count} episode(s)")?;
        Ok(())
    }
}

fn progress_line(episode_id: &str, record: &EpisodeProgress) -> String {
    let state = if record.completed {
        "completed".to_string()
    } else {
        format!("{:.0}%", record.progress * 100.0)
    };
    format!(
        "{episode_id}  {} / {}  {state}",
        format_duration(record.position, false),
        format_duration(record.duration, false)
    )
}
