//! Persistent progress store
//!
//! Holds one `EpisodeProgress` per episode id and writes the whole map to a
//! `KeyValueStore` after every change. The playback manager is the only
//! writer in practice; UI code reads through the query methods.

use crate::types::{EpisodeProgress, ProgressPolicy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};
use wavecast_core::KeyValueStore;

/// Storage key holding the serialized progress map
pub const PROGRESS_STORAGE_KEY: &str = "episode-progress";

/// Default length of the "recently played" list
pub const DEFAULT_RECENT_LIMIT: usize = 20;

/// Version tag written alongside the persisted map
const PERSIST_VERSION: u32 = 0;

type ProgressMap = BTreeMap<String, EpisodeProgress>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    #[serde(default)]
    progress: ProgressMap,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEnvelope {
    state: PersistedState,
    #[serde(default)]
    version: u32,
}

struct Shared {
    records: Mutex<ProgressMap>,
    storage: Arc<dyn KeyValueStore>,
    policy: ProgressPolicy,
}

/// Per-episode progress with resume/completion policy
///
/// Cloning is cheap; clones share the same records and storage.
#[derive(Clone)]
pub struct ProgressStore {
    shared: Arc<Shared>,
}

impl ProgressStore {
    /// Open the store with the default policy, rehydrating saved progress
    pub fn open(storage: Arc<dyn KeyValueStore>) -> Self {
        Self::with_policy(storage, ProgressPolicy::default())
    }

    /// Open the store with a custom policy, rehydrating saved progress
    ///
    /// Missing or unreadable saved state starts an empty map.
    pub fn with_policy(storage: Arc<dyn KeyValueStore>, policy: ProgressPolicy) -> Self {
        let records = load(storage.as_ref());
        debug!("Loaded progress for {} episodes", records.len());

        Self {
            shared: Arc::new(Shared {
                records: Mutex::new(records),
                storage,
                policy,
            }),
        }
    }

    /// Active policy
    pub fn policy(&self) -> ProgressPolicy {
        self.shared.policy
    }

    // ===== Writes =====

    /// Record the listening position of an episode
    ///
    /// Ignored when `episode_id` is empty or either number is not finite. A
    /// negative position is treated as 0.
    /// At or above the completion threshold the record is stored as
    /// completed with position 0 and progress 1. The previous record for the
    /// episode is replaced, never merged.
    pub fn update_progress(&self, episode_id: &str, position: f64, duration: f64) {
        self.update_progress_at(episode_id, position, duration, Utc::now());
    }

    pub(crate) fn update_progress_at(
        &self,
        episode_id: &str,
        position: f64,
        duration: f64,
        now: DateTime<Utc>,
    ) {
        if episode_id.is_empty() || !position.is_finite() || !duration.is_finite() {
            return;
        }

        let position = position.max(0.0);
        let ratio = if duration > 0.0 {
            position / duration
        } else {
            0.0
        };
        let completed = self.shared.policy.is_complete(ratio);

        let record = EpisodeProgress {
            position: if completed { 0.0 } else { position },
            duration,
            progress: if completed { 1.0 } else { ratio },
            last_played: now,
            completed,
        };

        self.mutate(|records| {
            records.insert(episode_id.to_string(), record);
        });
    }

    /// Force an existing record to completed
    ///
    /// No-op when the episode has no record.
    pub fn mark_completed(&self, episode_id: &str) {
        self.mutate(|records| {
            if let Some(record) = records.get_mut(episode_id) {
                record.position = 0.0;
                record.progress = 1.0;
                record.completed = true;
                record.last_played = Utc::now();
            }
        });
    }

    /// Delete the record of one episode
    pub fn clear_progress(&self, episode_id: &str) {
        self.mutate(|records| {
            records.remove(episode_id);
        });
    }

    /// Delete every record
    pub fn clear_all_progress(&self) {
        self.mutate(BTreeMap::clear);
    }

    // ===== Queries =====

    /// Saved progress of an episode
    pub fn get_progress(&self, episode_id: &str) -> Option<EpisodeProgress> {
        self.records().get(episode_id).cloned()
    }

    /// Position playback should resume from, in seconds
    ///
    /// Returns 0 when there is no record, the episode is completed, or the
    /// saved ratio lies outside the resume band.
    pub fn get_resume_position(&self, episode_id: &str) -> f64 {
        let records = self.records();
        match records.get(episode_id) {
            Some(record)
                if !record.completed && self.shared.policy.in_resume_band(record.progress) =>
            {
                record.position
            }
            _ => 0.0,
        }
    }

    /// Episode ids ordered by most recently played, at most `limit`
    pub fn get_recent_episodes(&self, limit: usize) -> Vec<String> {
        let records = self.records();
        let mut entries: Vec<(&String, &EpisodeProgress)> = records.iter().collect();
        sort_newest_first(&mut entries);

        entries
            .into_iter()
            .take(limit)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Started-but-unfinished episode ids, most recently played first
    pub fn get_unfinished_episodes(&self) -> Vec<String> {
        let policy = self.shared.policy;
        let records = self.records();
        let mut entries: Vec<(&String, &EpisodeProgress)> = records
            .iter()
            .filter(|(_, record)| !record.completed && policy.in_resume_band(record.progress))
            .collect();
        sort_newest_first(&mut entries);

        entries.into_iter().map(|(id, _)| id.clone()).collect()
    }

    /// Snapshot of every record
    pub fn all_progress(&self) -> BTreeMap<String, EpisodeProgress> {
        self.records().clone()
    }

    /// Look up several episodes at once
    pub fn progress_for<I, S>(&self, episode_ids: I) -> BTreeMap<String, Option<EpisodeProgress>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let records = self.records();
        episode_ids
            .into_iter()
            .map(|id| {
                let id = id.as_ref();
                (id.to_string(), records.get(id).cloned())
            })
            .collect()
    }

    /// Number of episodes with a record
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// Whether no episode has a record
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    // ===== Internals =====

    fn records(&self) -> MutexGuard<'_, ProgressMap> {
        self.shared
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a change and persist the result while still holding the lock,
    /// so writes reach storage in the order they were made
    fn mutate(&self, apply: impl FnOnce(&mut ProgressMap)) {
        let mut records = self.records();
        apply(&mut records);
        persist(self.shared.storage.as_ref(), &records);
    }
}

impl std::fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStore")
            .field("episodes", &self.len())
            .field("policy", &self.shared.policy)
            .finish()
    }
}

fn sort_newest_first(entries: &mut [(&String, &EpisodeProgress)]) {
    entries.sort_by(|a, b| b.1.last_played.cmp(&a.1.last_played));
}

fn load(storage: &dyn KeyValueStore) -> ProgressMap {
    let Some(text) = storage.get_item(PROGRESS_STORAGE_KEY) else {
        return ProgressMap::new();
    };

    match serde_json::from_str::<PersistedEnvelope>(&text) {
        Ok(envelope) => envelope.state.progress,
        Err(e) => {
            warn!("Discarding unreadable saved progress: {}", e);
            ProgressMap::new()
        }
    }
}

fn persist(storage: &dyn KeyValueStore, records: &ProgressMap) {
    #[derive(Serialize)]
    struct StateRef<'a> {
        progress: &'a ProgressMap,
    }

    #[derive(Serialize)]
    struct EnvelopeRef<'a> {
        state: StateRef<'a>,
        version: u32,
    }

    let envelope = EnvelopeRef {
        state: StateRef { progress: records },
        version: PERSIST_VERSION,
    };

    match serde_json::to_string(&envelope) {
        Ok(json) => {
            if !storage.set_item(PROGRESS_STORAGE_KEY, &json) {
                warn!("Progress kept in memory only; storage write failed");
            }
        }
        Err(e) => warn!("Failed to serialize progress: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use wavecast_core::MemoryStore;

    fn store() -> (ProgressStore, Arc<MemoryStore>) {
        let storage = Arc::new(MemoryStore::new());
        (ProgressStore::open(storage.clone()), storage)
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap() + Duration::seconds(seconds)
    }

    #[test]
    fn update_stores_ratio() {
        let (progress, _) = store();
        progress.update_progress("ep", 30.0, 120.0);

        let record = progress.get_progress("ep").unwrap();
        assert_eq!(record.position, 30.0);
        assert_eq!(record.duration, 120.0);
        assert_eq!(record.progress, 0.25);
        assert!(!record.completed);
    }

    #[test]
    fn update_ignores_invalid_input() {
        let (progress, _) = store();
        progress.update_progress("", 10.0, 100.0);
        progress.update_progress("ep", f64::NAN, 100.0);
        progress.update_progress("ep", 10.0, f64::INFINITY);
        assert!(progress.is_empty());
    }

    #[test]
    fn negative_position_clamps_to_start() {
        let (progress, _) = store();
        progress.update_progress("ep", -5.0, 100.0);

        let record = progress.get_progress("ep").unwrap();
        assert_eq!(record.position, 0.0);
        assert_eq!(record.progress, 0.0);
        assert!(!record.completed);
        assert_eq!(progress.get_resume_position("ep"), 0.0);
    }

    #[test]
    fn zero_duration_stores_zero_ratio() {
        let (progress, _) = store();
        progress.update_progress("ep", 10.0, 0.0);
        assert_eq!(progress.get_progress("ep").unwrap().progress, 0.0);
    }

    #[test]
    fn completion_threshold_resets_position() {
        let (progress, _) = store();
        progress.update_progress("ep", 95.0, 100.0);

        let record = progress.get_progress("ep").unwrap();
        assert!(record.completed);
        assert_eq!(record.position, 0.0);
        assert_eq!(record.progress, 1.0);
        assert_eq!(progress.get_resume_position("ep"), 0.0);
    }

    #[test]
    fn later_update_overwrites_completion() {
        let (progress, _) = store();
        progress.update_progress("ep", 99.0, 100.0);
        progress.update_progress("ep", 40.0, 100.0);

        let record = progress.get_progress("ep").unwrap();
        assert!(!record.completed);
        assert_eq!(progress.get_resume_position("ep"), 40.0);
    }

    #[test]
    fn resume_position_respects_band() {
        let (progress, _) = store();
        assert_eq!(progress.get_resume_position("missing"), 0.0);

        progress.update_progress("early", 4.0, 100.0);
        assert_eq!(progress.get_resume_position("early"), 0.0);

        progress.update_progress("edge", 5.0, 100.0);
        assert_eq!(progress.get_resume_position("edge"), 5.0);

        progress.update_progress("middle", 60.0, 100.0);
        assert_eq!(progress.get_resume_position("middle"), 60.0);
    }

    #[test]
    fn custom_policy_moves_thresholds() {
        let storage = Arc::new(MemoryStore::new());
        let policy = ProgressPolicy {
            completion_threshold: 0.8,
            resume_min: 0.1,
            resume_max: 0.8,
        };
        let progress = ProgressStore::with_policy(storage, policy);

        progress.update_progress("ep", 85.0, 100.0);
        assert!(progress.get_progress("ep").unwrap().completed);

        progress.update_progress("ep", 8.0, 100.0);
        assert_eq!(progress.get_resume_position("ep"), 0.0);
    }

    #[test]
    fn mark_completed_only_touches_existing() {
        let (progress, _) = store();
        progress.mark_completed("missing");
        assert!(progress.get_progress("missing").is_none());

        progress.update_progress("ep", 50.0, 100.0);
        progress.mark_completed("ep");

        let record = progress.get_progress("ep").unwrap();
        assert!(record.completed);
        assert_eq!(record.position, 0.0);
        assert_eq!(record.progress, 1.0);
        assert_eq!(record.duration, 100.0);
    }

    #[test]
    fn clear_removes_records() {
        let (progress, _) = store();
        progress.update_progress("a", 50.0, 100.0);
        progress.update_progress("b", 50.0, 100.0);

        progress.clear_progress("a");
        assert!(progress.get_progress("a").is_none());
        assert_eq!(progress.len(), 1);

        progress.clear_all_progress();
        assert!(progress.is_empty());
    }

    #[test]
    fn recent_episodes_newest_first() {
        let (progress, _) = store();
        progress.update_progress_at("old", 10.0, 100.0, at(0));
        progress.update_progress_at("newest", 10.0, 100.0, at(20));
        progress.update_progress_at("middle", 10.0, 100.0, at(10));

        assert_eq!(
            progress.get_recent_episodes(DEFAULT_RECENT_LIMIT),
            vec!["newest", "middle", "old"]
        );
        assert_eq!(progress.get_recent_episodes(2), vec!["newest", "middle"]);
    }

    #[test]
    fn unfinished_episodes_filter_band_and_completion() {
        let (progress, _) = store();
        progress.update_progress_at("barely", 1.0, 100.0, at(0));
        progress.update_progress_at("half", 50.0, 100.0, at(1));
        progress.update_progress_at("done", 99.0, 100.0, at(2));
        progress.update_progress_at("third", 30.0, 100.0, at(3));

        assert_eq!(progress.get_unfinished_episodes(), vec!["third", "half"]);
    }

    #[test]
    fn progress_for_reports_missing_entries() {
        let (progress, _) = store();
        progress.update_progress("a", 50.0, 100.0);

        let map = progress.progress_for(["a", "b"]);
        assert!(map["a"].is_some());
        assert!(map["b"].is_none());
    }

    #[test]
    fn persists_and_rehydrates() {
        let (progress, storage) = store();
        progress.update_progress("ep", 42.0, 100.0);

        let raw = storage.get_item(PROGRESS_STORAGE_KEY).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["state"]["progress"]["ep"]["position"], 42.0);
        assert_eq!(json["version"], 0);

        let reopened = ProgressStore::open(storage);
        assert_eq!(reopened.get_resume_position("ep"), 42.0);
    }

    #[test]
    fn unreadable_saved_state_starts_empty() {
        let storage = Arc::new(MemoryStore::new());
        storage.set_item(PROGRESS_STORAGE_KEY, "{not json");

        let progress = ProgressStore::open(storage);
        assert!(progress.is_empty());
    }
}
