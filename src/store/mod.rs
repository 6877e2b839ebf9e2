//! Remote store adapter: the realtime key-value tree the dashboard reads from
//! and writes to.
//!
//! Listeners always receive the full current contents of their path, never a
//! delta. `None` means the path is empty or absent.

mod sqlite;
#[cfg(test)]
pub mod fake;

pub use sqlite::SqliteStore;

use serde_json::{json, Value};
use std::rc::Rc;

pub type RecordId = String;

/// Direct children of a path as `(key, body)` pairs, in arrival order.
pub type Snapshot = Vec<(RecordId, Value)>;

pub type Delivery = Result<Option<Snapshot>, StoreError>;

pub type SnapshotFn = Box<dyn FnMut(Delivery)>;

pub type SharedStore = Rc<dyn RemoteStore>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid path: {0:?}")]
    InvalidPath(String),
}

pub trait RemoteStore {
    /// Registers `on_snapshot` for `path`. The first delivery carries the
    /// current contents; later deliveries follow every write under `path`.
    fn subscribe(&self, path: &str, on_snapshot: SnapshotFn) -> Result<ListenerId, StoreError>;

    /// Stops deliveries to `listener`. Unknown ids are ignored.
    fn unsubscribe(&self, listener: ListenerId);

    /// Appends `record` under `path` with a store-assigned id. Listeners may
    /// be called before this returns, so callers must not hold the view.
    fn push(&self, path: &str, record: Value) -> Result<RecordId, StoreError>;

    /// Deletes whatever lives at `path`. Absent paths are not an error.
    fn remove(&self, path: &str) -> Result<(), StoreError>;
}

/// Placeholder the store replaces with its own clock (epoch millis) on write.
pub fn server_timestamp() -> Value {
    json!({ ".sv": "timestamp" })
}

pub fn is_server_timestamp(v: &Value) -> bool {
    v.as_object()
        .and_then(|o| o.get(".sv"))
        .and_then(|v| v.as_str())
        == Some("timestamp")
}

/// Splits a slash-separated path into segments, rejecting empty segments.
pub fn split_path(path: &str) -> Result<Vec<&str>, StoreError> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}
