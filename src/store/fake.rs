//! In-memory adapter for unit tests. Nothing is delivered on its own: tests
//! call [`FakeStore::emit`] or [`FakeStore::emit_current`] to play the
//! store's part. Callbacks are kept after `unsubscribe` so tests can
//! simulate a late delivery from a released listener.

use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use super::{Delivery, ListenerId, RecordId, RemoteStore, SnapshotFn, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Subscribe(String),
    Unsubscribe(ListenerId),
    Push(String, Value),
    Remove(String),
}

#[derive(Default)]
pub struct FakeStore {
    pub calls: RefCell<Vec<Call>>,
    callbacks: RefCell<BTreeMap<ListenerId, (String, SnapshotFn)>>,
    active: RefCell<Vec<ListenerId>>,
    data: RefCell<BTreeMap<String, Vec<(RecordId, Value)>>>,
    next_id: Cell<u64>,
    pub fail_writes: Cell<bool>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pushes(&self) -> Vec<(String, Value)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Push(p, v) => Some((p.clone(), v.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn active_paths(&self) -> Vec<String> {
        let active = self.active.borrow();
        self.callbacks
            .borrow()
            .iter()
            .filter(|(id, _)| active.contains(*id))
            .map(|(_, (path, _))| path.clone())
            .collect()
    }

    pub fn listener_for(&self, path: &str) -> Option<ListenerId> {
        self.callbacks
            .borrow()
            .iter()
            .rev()
            .find(|(_, (p, _))| p == path)
            .map(|(id, _)| *id)
    }

    /// Invokes a listener's callback, whether or not it is still subscribed.
    pub fn emit(&self, listener: ListenerId, delivery: Delivery) {
        let taken = self.callbacks.borrow_mut().remove(&listener);
        let Some((path, mut cb)) = taken else {
            return;
        };
        cb(delivery);
        self.callbacks.borrow_mut().insert(listener, (path, cb));
    }

    /// Delivers current contents of `path` to its active listeners.
    pub fn emit_current(&self, path: &str) {
        let snapshot = self
            .data
            .borrow()
            .get(path)
            .filter(|rows| !rows.is_empty())
            .cloned();
        let targets: Vec<ListenerId> = {
            let active = self.active.borrow();
            self.callbacks
                .borrow()
                .iter()
                .filter(|(id, (p, _))| p == path && active.contains(*id))
                .map(|(id, _)| *id)
                .collect()
        };
        for id in targets {
            self.emit(id, Ok(snapshot.clone()));
        }
    }

    fn next(&self) -> u64 {
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        n
    }
}

impl RemoteStore for FakeStore {
    fn subscribe(&self, path: &str, on_snapshot: SnapshotFn) -> Result<ListenerId, StoreError> {
        self.calls.borrow_mut().push(Call::Subscribe(path.to_string()));
        let id = ListenerId(self.next());
        self.callbacks
            .borrow_mut()
            .insert(id, (path.to_string(), on_snapshot));
        self.active.borrow_mut().push(id);
        Ok(id)
    }

    fn unsubscribe(&self, listener: ListenerId) {
        self.calls.borrow_mut().push(Call::Unsubscribe(listener));
        self.active.borrow_mut().retain(|id| *id != listener);
    }

    fn push(&self, path: &str, record: Value) -> Result<RecordId, StoreError> {
        if self.fail_writes.get() {
            return Err(StoreError::InvalidPath(format!("{path} (write refused)")));
        }
        self.calls
            .borrow_mut()
            .push(Call::Push(path.to_string(), record.clone()));
        let id = format!("rec-{}", self.next());
        self.data
            .borrow_mut()
            .entry(path.to_string())
            .or_default()
            .push((id.clone(), record));
        Ok(id)
    }

    fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.calls.borrow_mut().push(Call::Remove(path.to_string()));
        if let Some((parent, key)) = path.rsplit_once('/') {
            if let Some(rows) = self.data.borrow_mut().get_mut(parent) {
                rows.retain(|(id, _)| id != key);
            }
        }
        Ok(())
    }
}
