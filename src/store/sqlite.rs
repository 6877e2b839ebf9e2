use rusqlite::Connection;
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use uuid::Uuid;

use super::{
    is_server_timestamp, split_path, Delivery, ListenerId, RecordId, RemoteStore, Snapshot,
    SnapshotFn, StoreError,
};

struct Listener {
    path: String,
    // Taken out while the callback runs so it may touch the store again.
    callback: Option<SnapshotFn>,
}

/// Realtime tree persisted in the workspace database.
///
/// Writes commit immediately but listeners only hear about them on the next
/// [`SqliteStore::pump`], which the daemon loop runs once per turn. Pending
/// deliveries for one listener coalesce: a pump always reads the latest
/// contents of the listener's path.
pub struct SqliteStore {
    conn: Connection,
    listeners: RefCell<BTreeMap<ListenerId, Listener>>,
    pending: RefCell<VecDeque<ListenerId>>,
    next_listener: Cell<u64>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            listeners: RefCell::new(BTreeMap::new()),
            pending: RefCell::new(VecDeque::new()),
            next_listener: Cell::new(1),
        }
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Delivers every queued snapshot. Returns how many callbacks ran.
    pub fn pump(&self) -> usize {
        let mut delivered = 0;
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(id) = next else {
                break;
            };
            let path = match self.listeners.borrow().get(&id) {
                Some(l) => l.path.clone(),
                None => continue,
            };
            let delivery = self.snapshot(&path);
            if let Err(e) = &delivery {
                tracing::warn!(path = %path, error = %e, "snapshot read failed");
            }

            let callback = self
                .listeners
                .borrow_mut()
                .get_mut(&id)
                .and_then(|l| l.callback.take());
            let Some(mut callback) = callback else {
                continue;
            };
            callback(delivery);
            if let Some(l) = self.listeners.borrow_mut().get_mut(&id) {
                l.callback = Some(callback);
            }
            delivered += 1;
        }
        if delivered > 0 {
            tracing::debug!(delivered, "store deliveries pumped");
        }
        delivered
    }

    /// Current contents of `path`: direct leaves as-is, deeper leaves nested
    /// under the child segment they live in.
    pub fn snapshot(&self, path: &str) -> Delivery {
        split_path(path)?;
        let mut stmt = self.conn.prepare(
            "SELECT parent, key, body
             FROM nodes
             WHERE parent = ?1 OR substr(parent, 1, length(?1) + 1) = ?1 || '/'
             ORDER BY seq",
        )?;
        let rows = stmt
            .query_map([path], |row| {
                let parent: String = row.get(0)?;
                let key: String = row.get(1)?;
                let body: String = row.get(2)?;
                Ok((parent, key, body))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut entries: Snapshot = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for (parent, key, body) in rows {
            let body: Value = serde_json::from_str(&body)?;
            if parent == path {
                index.insert(key.clone(), entries.len());
                entries.push((key, body));
                continue;
            }
            let rel = &parent[path.len() + 1..];
            let mut segments = rel.split('/');
            let Some(child) = segments.next() else {
                continue;
            };
            let at = *index.entry(child.to_string()).or_insert_with(|| {
                entries.push((child.to_string(), Value::Object(Map::new())));
                entries.len() - 1
            });
            let mut node = &mut entries[at].1;
            for seg in segments {
                node = ensure_object(node)
                    .entry(seg.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
            }
            ensure_object(node).insert(key, body);
        }

        if entries.is_empty() {
            Ok(None)
        } else {
            Ok(Some(entries))
        }
    }

    fn enqueue_affected<F>(&self, affected: F)
    where
        F: Fn(&str) -> bool,
    {
        let listeners = self.listeners.borrow();
        let mut pending = self.pending.borrow_mut();
        for (id, l) in listeners.iter() {
            if affected(&l.path) && !pending.contains(id) {
                pending.push_back(*id);
            }
        }
    }
}

impl RemoteStore for SqliteStore {
    fn subscribe(&self, path: &str, on_snapshot: SnapshotFn) -> Result<ListenerId, StoreError> {
        split_path(path)?;
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().insert(
            id,
            Listener {
                path: path.to_string(),
                callback: Some(on_snapshot),
            },
        );
        self.pending.borrow_mut().push_back(id);
        tracing::debug!(path, listener = id.0, "listener attached");
        Ok(id)
    }

    fn unsubscribe(&self, listener: ListenerId) {
        if self.listeners.borrow_mut().remove(&listener).is_some() {
            tracing::debug!(listener = listener.0, "listener detached");
        }
        self.pending.borrow_mut().retain(|id| *id != listener);
    }

    fn push(&self, path: &str, mut record: Value) -> Result<RecordId, StoreError> {
        split_path(path)?;
        resolve_server_values(&mut record, chrono::Utc::now().timestamp_millis());
        let key = Uuid::now_v7().to_string();
        self.conn.execute(
            "INSERT INTO nodes(parent, key, body) VALUES(?, ?, ?)",
            (path, &key, serde_json::to_string(&record)?),
        )?;
        self.enqueue_affected(|l| is_same_or_under(path, l));
        Ok(key)
    }

    fn remove(&self, path: &str) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        let removed = if segments.len() > 1 {
            let parent = segments[..segments.len() - 1].join("/");
            let key = segments[segments.len() - 1];
            self.conn.execute(
                "DELETE FROM nodes
                 WHERE (parent = ?1 AND key = ?2)
                    OR parent = ?3
                    OR substr(parent, 1, length(?3) + 1) = ?3 || '/'",
                (&parent, key, path),
            )?
        } else {
            self.conn.execute(
                "DELETE FROM nodes
                 WHERE parent = ?1 OR substr(parent, 1, length(?1) + 1) = ?1 || '/'",
                [path],
            )?
        };
        if removed > 0 {
            self.enqueue_affected(|l| is_same_or_under(path, l) || is_same_or_under(l, path));
        }
        Ok(())
    }
}

/// True when `path` equals `ancestor` or lies below it.
fn is_same_or_under(path: &str, ancestor: &str) -> bool {
    path == ancestor
        || (path.len() > ancestor.len()
            && path.starts_with(ancestor)
            && path.as_bytes()[ancestor.len()] == b'/')
}

fn resolve_server_values(v: &mut Value, now_millis: i64) {
    if is_server_timestamp(v) {
        *v = Value::from(now_millis);
        return;
    }
    match v {
        Value::Object(map) => {
            for child in map.values_mut() {
                resolve_server_values(child, now_millis);
            }
        }
        Value::Array(items) => {
            for child in items.iter_mut() {
                resolve_server_values(child, now_millis);
            }
        }
        _ => {}
    }
}

fn ensure_object(v: &mut Value) -> &mut Map<String, Value> {
    if !v.is_object() {
        *v = Value::Object(Map::new());
    }
    match v {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}
