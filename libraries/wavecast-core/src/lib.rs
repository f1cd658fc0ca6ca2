//! Wavecast Core
//!
//! Platform-agnostic building blocks shared by every Wavecast crate.
//!
//! The core crate defines:
//! - **Domain Types**: `Episode`, `Category`, `Language`
//! - **Formatting**: position/duration display strings
//! - **Storage**: the `KeyValueStore` collaborator used for persisted state
//!
//! # Example
//!
//! ```rust
//! use wavecast_core::format::{format_duration, parse_duration};
//!
//! assert_eq!(format_duration(3665.0, false), "1:01:05");
//! assert_eq!(parse_duration("1:01:05"), 3665);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod format;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use error::{Result, StorageError};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use types::{Category, Episode, EpisodeStatus, Language, StreamingUrls};
