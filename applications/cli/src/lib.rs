//! Wavecast command-line front end
//!
//! Loads layered configuration, lists episodes from the listing service and
//! inspects or clears saved listening progress.

pub mod commands;
pub mod config;
pub mod error;

pub use commands::{App, EpisodeFilters};
pub use config::AppConfig;
