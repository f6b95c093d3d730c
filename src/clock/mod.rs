//! # Clock Persistence
//!
//! The display has no battery-backed clock. The last time received from the
//! sending device is kept as one 64-bit millisecond value in a key-value store,
//! restored at startup and rewritten on every accepted `display_test` sync.
//!
//! Both directions are sanity checked against the device clock:
//!
//! - restore discards a value more than `restore_window_secs` in the future;
//! - save refuses non-positive values and warns, but still saves, when the value
//!   is more than `save_warn_window_secs` in the future.

pub mod kv;

pub use kv::{JsonFileStore, KeyValueStore, MemoryStore, StorageError};

use crate::config::EngineConfig;
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// One persisted timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRecord {
    pub millis: i64,
}

/// Reads and writes the persisted [`TimeRecord`].
#[derive(Clone)]
pub struct ClockKeeper {
    store: Arc<dyn KeyValueStore>,
    key: String,
    restore_window_ms: i64,
    save_warn_window_ms: i64,
}

impl std::fmt::Debug for ClockKeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockKeeper").field("key", &self.key).finish_non_exhaustive()
    }
}

impl ClockKeeper {
    pub fn new(config: &EngineConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            key: config.time_key.clone(),
            restore_window_ms: config.restore_window_secs.saturating_mul(1000),
            save_warn_window_ms: config.save_warn_window_secs.saturating_mul(1000),
        }
    }

    /// Returns the persisted time if it passes the sanity check against `now`.
    pub fn restore(&self, now: DateTime<Utc>) -> Result<Option<TimeRecord>, StorageError> {
        let Some(millis) = self.store.get_i64(&self.key)? else {
            info!(key = %self.key, "No saved time");
            return Ok(None);
        };
        if millis <= 0 {
            warn!(millis, "Saved time is not positive, ignoring");
            return Ok(None);
        }
        let ahead = millis.saturating_sub(now.timestamp_millis());
        if ahead > self.restore_window_ms {
            warn!(millis, ahead_ms = ahead, "Saved time too far in the future, ignoring");
            return Ok(None);
        }
        info!(millis, "Restored saved time");
        Ok(Some(TimeRecord { millis }))
    }

    /// Persists `millis`. Returns `Ok(false)` when the value was refused.
    pub fn save(&self, millis: i64, now: DateTime<Utc>) -> Result<bool, StorageError> {
        if millis <= 0 {
            warn!(millis, "Refusing to save non-positive time");
            return Ok(false);
        }
        let ahead = millis.saturating_sub(now.timestamp_millis());
        if ahead > self.save_warn_window_ms {
            warn!(millis, ahead_ms = ahead, "Saving a time far ahead of the device clock");
        }
        self.store.set_i64(&self.key, millis)?;
        info!(millis, "Saved time");
        Ok(true)
    }

    /// [`restore`](Self::restore) on the blocking pool.
    pub async fn load(&self, now: DateTime<Utc>) -> Result<Option<TimeRecord>, StorageError> {
        let keeper = self.clone();
        tokio::task::spawn_blocking(move || keeper.restore(now))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }

    /// [`save`](Self::save) on the blocking pool. File-backed stores block on I/O.
    pub async fn persist(&self, millis: i64, now: DateTime<Utc>) -> Result<bool, StorageError> {
        let keeper = self.clone();
        tokio::task::spawn_blocking(move || keeper.save(millis, now))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

/// Status-bar rendering of `millis`: `"AM 9:05"`, `"PM 12:30"`.
pub fn format_status_time(millis: i64) -> Option<String> {
    let time = DateTime::from_timestamp_millis(millis)?;
    let (pm, hour) = time.hour12();
    let meridiem = if pm { "PM" } else { "AM" };
    Some(format!("{meridiem} {hour}:{:02}", time.minute()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SYNCED: i64 = 1_759_082_426_000; // 2025-09-28 18:00:26 UTC

    fn keeper() -> (ClockKeeper, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ClockKeeper::new(&EngineConfig::default(), store.clone()), store)
    }

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[tokio::test]
    async fn file_backed_persist_and_load_run_off_the_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("clock.json")));
        let keeper = ClockKeeper::new(&EngineConfig::default(), store.clone());

        assert!(keeper.persist(SYNCED, at(SYNCED)).await.unwrap());
        assert!(!keeper.persist(0, at(SYNCED)).await.unwrap());
        assert_eq!(store.get_i64("system_time").unwrap(), Some(SYNCED));
        assert_eq!(keeper.load(at(SYNCED)).await.unwrap(), Some(TimeRecord { millis: SYNCED }));
    }

    #[test]
    fn save_then_restore() {
        let (keeper, _) = keeper();
        assert!(keeper.save(SYNCED, at(SYNCED)).unwrap());
        assert_eq!(keeper.restore(at(SYNCED)).unwrap(), Some(TimeRecord { millis: SYNCED }));
    }

    #[test]
    fn nothing_saved() {
        let (keeper, _) = keeper();
        assert_eq!(keeper.restore(at(SYNCED)).unwrap(), None);
    }

    #[test]
    fn non_positive_is_refused() {
        let (keeper, store) = keeper();
        assert!(!keeper.save(0, at(SYNCED)).unwrap());
        assert!(!keeper.save(-1, at(SYNCED)).unwrap());
        assert_eq!(store.get_i64("system_time").unwrap(), None);
    }

    #[test]
    fn far_future_save_is_kept() {
        let (keeper, store) = keeper();
        let two_hours_ahead = SYNCED + 2 * 3_600_000;
        assert!(keeper.save(two_hours_ahead, at(SYNCED)).unwrap());
        assert_eq!(store.get_i64("system_time").unwrap(), Some(two_hours_ahead));
    }

    #[test]
    fn restore_window() {
        let (keeper, store) = keeper();
        let day = 24 * 3_600_000;

        store.set_i64("system_time", SYNCED + day).unwrap();
        assert!(keeper.restore(at(SYNCED)).unwrap().is_some());

        store.set_i64("system_time", SYNCED + day + 1).unwrap();
        assert_eq!(keeper.restore(at(SYNCED)).unwrap(), None);

        // A device clock that never got set is far in the past, so anything
        // synced later looks too far ahead.
        store.set_i64("system_time", SYNCED).unwrap();
        assert_eq!(keeper.restore(at(0)).unwrap(), None);
    }

    #[test]
    fn status_time_format() {
        assert_eq!(format_status_time(SYNCED).as_deref(), Some("PM 6:00"));
        assert_eq!(format_status_time(1_735_689_900_000).as_deref(), Some("AM 12:05"));
        assert_eq!(format_status_time(1_759_062_600_000).as_deref(), Some("PM 12:30"));
        assert_eq!(format_status_time(1_759_035_900_000).as_deref(), Some("AM 5:05"));
    }
}
