//! Session middleware configuration.
//!
//! Sessions live in a bounded moka cache. The cookie carries no `Max-Age`, so
//! the session (and everything stored in it) ends with the browser session or
//! a server restart. Server-side, records are evicted once they sit unused for
//! the configured idle timeout, or when the store is full.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tower_sessions::cookie::time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore, session_store};

use crate::config::AppConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "kiosk_session";

/// In-process session store with a capacity and an idle timeout.
///
/// Anonymous visitors create records too (form drafts, tab storage), so the
/// store has to forget them on its own.
#[derive(Clone)]
pub struct MokaSessionStore {
    records: Cache<Id, Record>,
}

impl MokaSessionStore {
    /// Create a store holding at most `capacity` sessions, each dropped after
    /// `idle_timeout` without a load or save.
    #[must_use]
    pub fn new(capacity: u64, idle_timeout: Duration) -> Self {
        let records = Cache::builder()
            .max_capacity(capacity)
            .time_to_idle(idle_timeout)
            .build();
        Self { records }
    }

    /// Create a store sized from configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.session_capacity, config.session_idle_timeout)
    }

    /// Number of stored sessions, after pending evictions have run.
    pub async fn record_count(&self) -> u64 {
        self.records.run_pending_tasks().await;
        self.records.entry_count()
    }
}

impl fmt::Debug for MokaSessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MokaSessionStore")
            .field("entries", &self.records.entry_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionStore for MokaSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        loop {
            let candidate = record.clone();
            let entry = self
                .records
                .entry(record.id)
                .or_insert_with(async move { candidate })
                .await;
            if entry.is_fresh() {
                return Ok(());
            }
            // Id collision
            record.id = Id::default();
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.records.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let Some(record) = self.records.get(session_id).await else {
            return Ok(None);
        };
        if record.expiry_date > OffsetDateTime::now_utc() {
            return Ok(Some(record));
        }
        self.records.invalidate(session_id).await;
        Ok(None)
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.records.invalidate(session_id).await;
        Ok(())
    }
}

/// Create the session layer over `store`.
#[must_use]
pub fn create_session_layer(
    config: &AppConfig,
    store: MokaSessionStore,
) -> SessionManagerLayer<MokaSessionStore> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnSessionEnd)
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use tower_sessions::cookie::time::Duration as TimeDuration;

    use super::*;

    fn record(expires_in: TimeDuration) -> Record {
        Record {
            id: Id::default(),
            data: HashMap::from([("k".to_string(), serde_json::json!(1))]),
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[tokio::test]
    async fn test_create_then_load() {
        let store = MokaSessionStore::new(10, Duration::from_secs(60));
        let mut rec = record(TimeDuration::hours(1));

        store.create(&mut rec).await.unwrap();

        assert_eq!(store.load(&rec.id).await.unwrap(), Some(rec));
    }

    #[tokio::test]
    async fn test_create_assigns_new_id_on_collision() {
        let store = MokaSessionStore::new(10, Duration::from_secs(60));
        let mut first = record(TimeDuration::hours(1));
        store.create(&mut first).await.unwrap();

        let mut second = record(TimeDuration::hours(1));
        second.id = first.id;
        store.create(&mut second).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(store.record_count().await, 2);
    }

    #[tokio::test]
    async fn test_expired_record_is_not_loaded() {
        let store = MokaSessionStore::new(10, Duration::from_secs(60));
        let rec = record(TimeDuration::seconds(-1));
        store.save(&rec).await.unwrap();

        assert_eq!(store.load(&rec.id).await.unwrap(), None);
        assert_eq!(store.record_count().await, 0);
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let store = MokaSessionStore::new(10, Duration::from_secs(60));
        let rec = record(TimeDuration::hours(1));
        store.save(&rec).await.unwrap();

        store.delete(&rec.id).await.unwrap();

        assert_eq!(store.load(&rec.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_idle_records_are_evicted() {
        let store = MokaSessionStore::new(10, Duration::from_millis(50));
        let rec = record(TimeDuration::hours(1));
        store.save(&rec).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(store.load(&rec.id).await.unwrap(), None);
        assert_eq!(store.record_count().await, 0);
    }

    #[tokio::test]
    async fn test_capacity_bounds_record_count() {
        let store = MokaSessionStore::new(5, Duration::from_secs(60));
        for _ in 0..50 {
            store.save(&record(TimeDuration::hours(1))).await.unwrap();
        }

        assert!(store.record_count().await <= 5);
    }

    #[test]
    fn test_debug_hides_records() {
        let store = MokaSessionStore::new(1, Duration::from_secs(1));
        let output = format!("{store:?}");
        assert!(output.starts_with("MokaSessionStore"));
        assert!(!output.contains("data"));
    }
}
