//! Wavecast - Episode Progress
//!
//! Tracks how far each episode has been listened to and decides where
//! playback should resume.
//!
//! This crate provides:
//! - Per-episode progress records (position, duration, ratio, last played)
//! - Completion detection (>= 95% counts as finished)
//! - Resume policy (only resume inside the 5%-95% band)
//! - "Recently played" and "continue listening" lists
//! - Persistence of the whole map as one JSON document through a
//!   `KeyValueStore`
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use wavecast_core::MemoryStore;
//! use wavecast_progress::ProgressStore;
//!
//! let progress = ProgressStore::open(Arc::new(MemoryStore::new()));
//!
//! progress.update_progress("ep-1", 60.0, 100.0);
//! assert_eq!(progress.get_resume_position("ep-1"), 60.0);
//!
//! progress.update_progress("ep-1", 96.0, 100.0);
//! assert!(progress.get_progress("ep-1").unwrap().completed);
//! assert_eq!(progress.get_resume_position("ep-1"), 0.0);
//! ```

mod store;
pub mod types;

pub use store::{ProgressStore, DEFAULT_RECENT_LIMIT, PROGRESS_STORAGE_KEY};
pub use types::{EpisodeProgress, ProgressPolicy};
