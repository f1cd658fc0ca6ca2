//! Wavecast - Episode Catalog
//!
//! Discovers published episodes through the listing service and keeps a
//! filterable catalog of them.
//!
//! This crate provides:
//! - `CatalogClient`: listing requests per language/category, fanned out in
//!   parallel, with stream URLs routed through the service proxy
//! - Listing response parsing and case-insensitive query filtering
//! - `EpisodeCatalog`: all/filtered episodes with language, category and
//!   search filters
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wavecast_catalog::{CatalogClient, CatalogConfig, EpisodeCatalog};
//! use wavecast_core::Language;
//!
//! let client = CatalogClient::new(CatalogConfig::default())?;
//! let catalog = EpisodeCatalog::new(Arc::new(client));
//!
//! catalog.load().await?;
//! catalog.set_language(Some(Language::EnUs));
//! catalog.set_search_query("ethereum");
//!
//! for episode in catalog.filtered_episodes() {
//!     println!("{} {}", episode.date, episode.title);
//! }
//! ```

#![forbid(unsafe_code)]

mod catalog;
mod client;
mod error;
pub mod parse;

pub use catalog::{CatalogState, EpisodeCatalog, EpisodeSource};
pub use client::{ApiStatus, CatalogClient, CatalogConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_MS};
pub use error::{CatalogError, Result};
pub use parse::filter_episodes_by_query;
