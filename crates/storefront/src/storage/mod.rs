//! Ephemeral per-browser-session key/value storage.
//!
//! [`ClientStorage`] stores JSON-encoded values under string keys in a
//! [`StorageBackend`]. It never fails outward: every backend or encoding fault
//! degrades to `None` or a no-op and is reported to a [`DiagnosticSink`]
//! instead.
//!
//! # Backends
//!
//! - [`SessionBackend`] - the `tab_storage` map inside the visitor's session
//!   (the request-path backend, built per request by [`TabStorage`])
//! - [`MemoryBackend`] - a process-local map, used in tests
//!
//! A store built with [`ClientStorage::unavailable`] has no backend at all and
//! silently ignores every operation.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn handler(TabStorage(storage): TabStorage) {
//!     storage.set_item("last-visit", &Utc::now()).await;
//!     let visit: Option<DateTime<Utc>> = storage.get_item("last-visit").await;
//! }
//! ```

mod memory;
mod namespace;
mod session;

pub use memory::MemoryBackend;
pub use namespace::{AppData, keys};
pub use session::{SessionBackend, TabStorage};

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Key written and removed by [`ClientStorage::is_available`].
pub const PROBE_KEY: &str = "__test__";

// =============================================================================
// Errors
// =============================================================================

/// Errors raised by a storage backend.
///
/// These never escape [`ClientStorage`]; they are only seen by backends and
/// diagnostic sinks.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing session could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// A value could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend refused the operation.
    #[error("Backend error: {0}")]
    Backend(String),
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Storage operation, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp {
    Set,
    Get,
    Remove,
    Clear,
    Probe,
}

impl fmt::Display for StorageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Set => "set",
            Self::Get => "get",
            Self::Remove => "remove",
            Self::Clear => "clear",
            Self::Probe => "probe",
        })
    }
}

/// Something that happened inside a [`ClientStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageEvent {
    Stored { key: String },
    Retrieved { key: String, found: bool },
    Removed { key: String },
    Cleared,
    Failed {
        op: StorageOp,
        key: Option<String>,
        error: String,
    },
}

impl StorageEvent {
    fn failed(op: StorageOp, key: Option<&str>, error: &impl fmt::Display) -> Self {
        Self::Failed {
            op,
            key: key.map(String::from),
            error: error.to_string(),
        }
    }
}

/// Observer for storage activity.
///
/// Sinks only observe; they cannot change the outcome of an operation.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, event: StorageEvent);
}

/// Sink that logs through `tracing`: successes at debug, failures at warn.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: StorageEvent) {
        match event {
            StorageEvent::Stored { key } => tracing::debug!(key = %key, "Stored item"),
            StorageEvent::Retrieved { key, found } => {
                tracing::debug!(key = %key, found, "Retrieved item");
            }
            StorageEvent::Removed { key } => tracing::debug!(key = %key, "Removed item"),
            StorageEvent::Cleared => tracing::debug!("Cleared storage"),
            StorageEvent::Failed { op, key, error } => tracing::warn!(
                op = %op,
                key = key.as_deref().unwrap_or(""),
                error = %error,
                "Storage operation failed"
            ),
        }
    }
}

/// Sink that keeps every event in memory, for assertions in tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<StorageEvent>>>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<StorageEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Recorded failures only.
    #[must_use]
    pub fn failures(&self) -> Vec<StorageEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, StorageEvent::Failed { .. }))
            .collect()
    }
}

impl DiagnosticSink for RecordingSink {
    fn record(&self, event: StorageEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

// =============================================================================
// Backend
// =============================================================================

/// Raw string storage underneath [`ClientStorage`].
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    async fn clear(&self) -> Result<(), StorageError>;
}

// =============================================================================
// ClientStorage
// =============================================================================

/// Typed, fault-tolerant view over a [`StorageBackend`].
pub struct ClientStorage<B> {
    backend: Option<B>,
    sink: Arc<dyn DiagnosticSink>,
}

impl<B> fmt::Debug for ClientStorage<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientStorage")
            .field("available", &self.backend.is_some())
            .finish_non_exhaustive()
    }
}

impl<B: StorageBackend> ClientStorage<B> {
    /// Wrap a backend, reporting to `sink`.
    #[must_use]
    pub fn new(backend: B, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            backend: Some(backend),
            sink,
        }
    }

    /// A store with no backend. Every operation is a silent no-op.
    #[must_use]
    pub fn unavailable(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            backend: None,
            sink,
        }
    }

    /// Serialize `value` as JSON and store it under `key`.
    ///
    /// Failures are reported to the sink and leave the store unchanged.
    pub async fn set_item<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let Some(backend) = &self.backend else {
            return;
        };

        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                self.sink
                    .record(StorageEvent::failed(StorageOp::Set, Some(key), &e));
                return;
            }
        };

        match backend.set(key, encoded).await {
            Ok(()) => self.sink.record(StorageEvent::Stored {
                key: key.to_string(),
            }),
            Err(e) => self
                .sink
                .record(StorageEvent::failed(StorageOp::Set, Some(key), &e)),
        }
    }

    /// Read and decode the value under `key`.
    ///
    /// Returns `None` when the key is absent, the stored text does not decode
    /// as `T`, or the backend fails.
    pub async fn get_item<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let backend = self.backend.as_ref()?;

        let raw = match backend.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                self.sink
                    .record(StorageEvent::failed(StorageOp::Get, Some(key), &e));
                return None;
            }
        };

        self.sink.record(StorageEvent::Retrieved {
            key: key.to_string(),
            found: raw.is_some(),
        });

        match serde_json::from_str(&raw?) {
            Ok(value) => Some(value),
            Err(e) => {
                self.sink
                    .record(StorageEvent::failed(StorageOp::Get, Some(key), &e));
                None
            }
        }
    }

    /// Delete the entry under `key`, if any.
    pub async fn remove_item(&self, key: &str) {
        let Some(backend) = &self.backend else {
            return;
        };

        match backend.remove(key).await {
            Ok(()) => self.sink.record(StorageEvent::Removed {
                key: key.to_string(),
            }),
            Err(e) => self
                .sink
                .record(StorageEvent::failed(StorageOp::Remove, Some(key), &e)),
        }
    }

    /// Delete every entry.
    pub async fn clear(&self) {
        let Some(backend) = &self.backend else {
            return;
        };

        match backend.clear().await {
            Ok(()) => self.sink.record(StorageEvent::Cleared),
            Err(e) => self
                .sink
                .record(StorageEvent::failed(StorageOp::Clear, None, &e)),
        }
    }

    /// Whether the backend accepts a write and a delete.
    ///
    /// Writes and removes [`PROBE_KEY`]. The probe is removed even when the
    /// write fails part-way.
    pub async fn is_available(&self) -> bool {
        let Some(backend) = &self.backend else {
            return false;
        };

        let written = backend.set(PROBE_KEY, PROBE_KEY.to_string()).await;
        let removed = backend.remove(PROBE_KEY).await;

        match written.and(removed) {
            Ok(()) => true,
            Err(e) => {
                self.sink
                    .record(StorageEvent::failed(StorageOp::Probe, Some(PROBE_KEY), &e));
                false
            }
        }
    }

    /// Preference namespace over this store.
    #[must_use]
    pub const fn app_data(&self) -> AppData<'_, B> {
        AppData::new(self)
    }
}
