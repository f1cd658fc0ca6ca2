//! Listing response parsing, query filtering and ordering
//!
//! The listing service returns object-storage entries rather than finished
//! episodes. Each entry is keyed by its path
//! (`audio/{language}/{category}/{id}/audio.m3u8`) and the episode is
//! reconstructed from that path plus the language and category that were
//! requested.

use crate::error::{CatalogError, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use wavecast_core::{Category, Episode, Language};

/// Container keys that may wrap the entry list, checked in order
const LIST_KEYS: [&str; 3] = ["episodes", "data", "files"];

/// One entry as published by the listing service
#[derive(Debug, Deserialize)]
struct ListingEntry {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, rename = "lastModified")]
    last_modified: Option<String>,
}

/// Turn a listing response body into episodes
///
/// Accepts a bare array, an object wrapping the array under `episodes`,
/// `data` or `files`, or a single entry object. Entries without a path or
/// with an unreadable shape are skipped with a warning. `stream_url` maps an
/// entry path to its playable URL.
pub fn parse_episode_list<F>(
    body: &Value,
    language: Language,
    category: Category,
    stream_url: F,
) -> Result<Vec<Episode>>
where
    F: Fn(&str) -> String,
{
    let entries = entry_values(body)?;
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    let mut episodes = Vec::with_capacity(entries.len());
    for value in entries {
        let entry = match ListingEntry::deserialize(value) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, entry = %value, "Skipping unreadable listing entry");
                continue;
            }
        };

        let Some(path) = entry.path.as_deref().filter(|p| !p.is_empty()) else {
            warn!(entry = %value, "Skipping listing entry with missing path");
            continue;
        };

        let id = episode_id(path, entry.id.as_deref());
        let date = date_prefix(&id)
            .map(str::to_string)
            .or_else(|| entry.last_modified.clone())
            .unwrap_or_else(|| now.clone());
        let title = entry.title.clone().unwrap_or_else(|| id.clone());

        let mut episode =
            Episode::new(id, language, category, title).with_stream_url(stream_url(path));
        episode.date = date;
        episode.updated_at = entry.last_modified.unwrap_or_else(|| now.clone());
        episode.path = Some(path.to_string());
        episodes.push(episode);
    }

    Ok(episodes)
}

fn entry_values(body: &Value) -> Result<&[Value]> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(map) => match LIST_KEYS.iter().find_map(|key| map.get(*key)) {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(CatalogError::UnexpectedFormat(format!(
                "entry list is {}",
                type_name(other)
            ))),
            None => Ok(std::slice::from_ref(body)),
        },
        other => Err(CatalogError::UnexpectedFormat(type_name(other).to_string())),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Fourth path segment, else the entry id, else the whole path
fn episode_id(path: &str, fallback: Option<&str>) -> String {
    path.split('/')
        .nth(3)
        .filter(|segment| !segment.is_empty())
        .or(fallback.filter(|id| !id.is_empty()))
        .unwrap_or(path)
        .to_string()
}

/// Leading `YYYY-MM-DD` of an id, if it has one
fn date_prefix(id: &str) -> Option<&str> {
    let prefix = id.get(..10)?;
    let shaped = prefix.bytes().enumerate().all(|(i, b)| match i {
        4 | 7 => b == b'-',
        _ => b.is_ascii_digit(),
    });
    shaped.then_some(prefix)
}

/// Keep episodes whose title, id, category, description or content contain
/// `query` (case-insensitive). A blank query keeps everything.
pub fn filter_episodes_by_query(episodes: &[Episode], query: &str) -> Vec<Episode> {
    if query.trim().is_empty() {
        return episodes.to_vec();
    }

    let needle = query.to_lowercase();
    let contains = |haystack: &str| haystack.to_lowercase().contains(&needle);

    episodes
        .iter()
        .filter(|episode| {
            contains(&episode.title)
                || contains(&episode.id)
                || contains(episode.category.as_str())
                || episode.description.as_deref().is_some_and(contains)
                || contains(&episode.content)
        })
        .cloned()
        .collect()
}

/// Sort newest first by publication date
///
/// Dates are either plain `YYYY-MM-DD` or RFC 3339 timestamps. Unparseable
/// dates sort last; ties keep their incoming order.
pub fn sort_newest_first(episodes: &mut [Episode]) {
    episodes.sort_by_cached_key(|episode| std::cmp::Reverse(date_millis(&episode.date)));
}

fn date_millis(date: &str) -> Option<i64> {
    if let Ok(day) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return day.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp_millis());
    }
    DateTime::parse_from_rfc3339(date)
        .ok()
        .map(|dt| dt.timestamp_millis())
}
