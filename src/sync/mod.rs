//! Collection synchronizer: one live subscription per tracked path, each
//! snapshot turned into an ordered record list and published whole.

mod view_state;

pub use view_state::{ViewKey, ViewStateStore};

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::model::{schedule_path, Collection, Record};
use crate::store::{ListenerId, SharedStore, Snapshot, SnapshotFn, StoreError};

pub type SharedView = Rc<RefCell<ViewStateStore>>;

/// Turns a snapshot payload into records. Arrival order is kept unless
/// `newest_first`, which stable-sorts by `createdAt` descending with
/// undated records last.
pub fn materialize(payload: Option<Snapshot>, newest_first: bool) -> Vec<Record> {
    let Some(entries) = payload else {
        return Vec::new();
    };
    let mut records: Vec<Record> = entries
        .into_iter()
        .filter_map(|(id, body)| Record::from_entry(id, body))
        .collect();
    if newest_first {
        records.sort_by(|a, b| b.created_at_millis().cmp(&a.created_at_millis()));
    }
    records
}

/// A live subscription. Released by [`TrackHandle::release`] or on drop;
/// releasing twice is harmless.
pub struct TrackHandle {
    store: SharedStore,
    listener: Option<ListenerId>,
    live: Rc<Cell<bool>>,
    path: String,
}

impl TrackHandle {
    pub fn is_active(&self) -> bool {
        self.listener.is_some()
    }

    pub fn release(&mut self) {
        // Flip first so a delivery racing the unsubscribe is dropped.
        self.live.set(false);
        if let Some(id) = self.listener.take() {
            self.store.unsubscribe(id);
            tracing::debug!(path = %self.path, "subscription released");
        }
    }
}

impl Drop for TrackHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Clone)]
pub struct Synchronizer {
    store: SharedStore,
    view: SharedView,
}

impl Synchronizer {
    pub fn new(store: SharedStore, view: SharedView) -> Self {
        Self { store, view }
    }

    pub fn view(&self) -> &SharedView {
        &self.view
    }

    pub fn track(&self, collection: Collection) -> Result<TrackHandle, StoreError> {
        self.track_path(
            ViewKey::Collection(collection),
            collection.path(),
            collection.newest_first(),
        )
    }

    pub fn untrack(&self, handle: &mut TrackHandle) {
        handle.release();
    }

    fn track_path(
        &self,
        key: ViewKey,
        path: &str,
        newest_first: bool,
    ) -> Result<TrackHandle, StoreError> {
        let live = Rc::new(Cell::new(true));
        let on_snapshot = snapshot_sink(
            Rc::downgrade(&self.view),
            live.clone(),
            key,
            path.to_string(),
            newest_first,
        );
        match self.store.subscribe(path, on_snapshot) {
            Ok(listener) => {
                tracing::debug!(path, "subscription opened");
                Ok(TrackHandle {
                    store: self.store.clone(),
                    listener: Some(listener),
                    live,
                    path: path.to_string(),
                })
            }
            Err(e) => {
                live.set(false);
                tracing::warn!(path, error = %e, "subscribe failed; view left empty");
                self.clear(key);
                Err(e)
            }
        }
    }

    fn clear(&self, key: ViewKey) {
        self.view.borrow_mut().publish(key, Rc::from(Vec::new()));
    }
}

fn snapshot_sink(
    view: Weak<RefCell<ViewStateStore>>,
    live: Rc<Cell<bool>>,
    key: ViewKey,
    path: String,
    newest_first: bool,
) -> SnapshotFn {
    Box::new(move |delivery| {
        if !live.get() {
            tracing::trace!(path = %path, "late delivery ignored");
            return;
        }
        let Some(view) = view.upgrade() else {
            return;
        };
        let records = match delivery {
            Ok(payload) => materialize(payload, newest_first),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "subscription failed; view emptied");
                Vec::new()
            }
        };
        tracing::debug!(path = %path, count = records.len(), "snapshot applied");
        view.borrow_mut().publish(key, Rc::from(records));
    })
}

/// The timetable's class-scoped subscription. At most one class is tracked;
/// switching releases the old listener before the new one is opened.
pub struct ScheduleTracker {
    sync: Synchronizer,
    current: Option<(String, TrackHandle)>,
}

impl ScheduleTracker {
    pub fn new(sync: Synchronizer) -> Self {
        Self {
            sync,
            current: None,
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.current.as_ref().map(|(id, _)| id.as_str())
    }

    pub fn select(&mut self, class_id: Option<&str>) -> Result<(), StoreError> {
        let class_id = class_id.map(str::trim).filter(|s| !s.is_empty());
        if self.selected() == class_id && self.current.is_some() {
            return Ok(());
        }

        if let Some((_, mut handle)) = self.current.take() {
            self.sync.untrack(&mut handle);
        }
        self.sync.clear(ViewKey::Schedule);
        self.sync.view.borrow_mut().set_schedule_class(class_id);

        let Some(class_id) = class_id else {
            return Ok(());
        };
        match self
            .sync
            .track_path(ViewKey::Schedule, &schedule_path(class_id), false)
        {
            Ok(handle) => {
                self.current = Some((class_id.to_string(), handle));
                Ok(())
            }
            Err(e) => {
                self.sync.view.borrow_mut().set_schedule_class(None);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn seeded_view(seed: Vec<(Collection, Vec<(&str, serde_json::Value)>)>) -> ViewStateStore {
    let mut view = ViewStateStore::default();
    for (collection, rows) in seed {
        let snapshot: Snapshot = rows
            .into_iter()
            .map(|(id, body)| (id.to_string(), body))
            .collect();
        let records = materialize(Some(snapshot), collection.newest_first());
        view.publish(ViewKey::Collection(collection), Rc::from(records));
    }
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fake::{Call, FakeStore};
    use serde_json::json;

    fn setup() -> (Rc<FakeStore>, Synchronizer) {
        let fake = Rc::new(FakeStore::new());
        let store: SharedStore = fake.clone();
        let view = Rc::new(RefCell::new(ViewStateStore::default()));
        (fake, Synchronizer::new(store, view))
    }

    fn ids(view: &ViewStateStore, key: ViewKey) -> Vec<String> {
        view.records(key).iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn track_opens_exactly_one_subscription() {
        let (fake, sync) = setup();
        let _h = sync.track(Collection::Teachers).expect("track");
        assert_eq!(
            fake.calls.borrow().as_slice(),
            &[Call::Subscribe("teachers".to_string())]
        );
    }

    #[test]
    fn empty_payload_materializes_empty() {
        let (fake, sync) = setup();
        let _h = sync.track(Collection::Students).expect("track");
        let id = fake.listener_for("students").expect("listener");

        fake.emit(id, Ok(Some(vec![("s1".into(), json!({ "name": "A" }))])));
        assert_eq!(ids(&sync.view().borrow(), ViewKey::Collection(Collection::Students)), vec!["s1"]);

        fake.emit(id, Ok(None));
        assert!(sync.view().borrow().collection(Collection::Students).is_empty());
    }

    #[test]
    fn announcements_sort_newest_first_and_keep_arrival_for_ties() {
        let (fake, sync) = setup();
        let _h = sync.track(Collection::Announcements).expect("track");
        let id = fake.listener_for("announcements").expect("listener");

        fake.emit(
            id,
            Ok(Some(vec![
                ("a".into(), json!({ "title": "old", "createdAt": 100 })),
                ("b".into(), json!({ "title": "tie-1", "createdAt": 300 })),
                ("c".into(), json!({ "title": "undated" })),
                ("d".into(), json!({ "title": "tie-2", "createdAt": 300 })),
                ("e".into(), json!({ "title": "mid", "createdAt": 200 })),
            ])),
        );

        let view = sync.view().borrow();
        assert_eq!(
            ids(&view, ViewKey::Collection(Collection::Announcements)),
            vec!["b", "d", "e", "a", "c"]
        );
    }

    #[test]
    fn other_collections_keep_arrival_order() {
        let (fake, sync) = setup();
        let _h = sync.track(Collection::Classes).expect("track");
        let id = fake.listener_for("classes").expect("listener");
        fake.emit(
            id,
            Ok(Some(vec![
                ("z".into(), json!({ "name": "Z", "createdAt": 1 })),
                ("a".into(), json!({ "name": "A", "createdAt": 2 })),
            ])),
        );
        assert_eq!(ids(&sync.view().borrow(), ViewKey::Collection(Collection::Classes)), vec!["z", "a"]);
    }

    #[test]
    fn untrack_is_idempotent_and_stops_late_deliveries() {
        let (fake, sync) = setup();
        let mut h = sync.track(Collection::Teachers).expect("track");
        let id = fake.listener_for("teachers").expect("listener");

        sync.untrack(&mut h);
        sync.untrack(&mut h);
        drop(h);

        let unsubscribes = fake
            .calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Unsubscribe(_)))
            .count();
        assert_eq!(unsubscribes, 1);

        let before = sync.view().borrow().revision();
        fake.emit(id, Ok(Some(vec![("t1".into(), json!({ "name": "late" }))])));
        assert_eq!(sync.view().borrow().revision(), before);
        assert!(sync.view().borrow().collection(Collection::Teachers).is_empty());
    }

    #[test]
    fn subscription_failure_empties_the_view() {
        let (fake, sync) = setup();
        let _h = sync.track(Collection::Classes).expect("track");
        let id = fake.listener_for("classes").expect("listener");
        fake.emit(id, Ok(Some(vec![("c1".into(), json!({ "name": "7A" }))])));

        fake.emit(id, Err(StoreError::InvalidPath("classes".into())));
        assert!(sync.view().borrow().collection(Collection::Classes).is_empty());
    }

    #[test]
    fn each_publish_replaces_the_whole_collection() {
        let (fake, sync) = setup();
        let _h = sync.track(Collection::Teachers).expect("track");
        let id = fake.listener_for("teachers").expect("listener");

        fake.emit(
            id,
            Ok(Some(vec![
                ("t1".into(), json!({ "name": "A" })),
                ("t2".into(), json!({ "name": "B" })),
            ])),
        );
        let first = sync.view().borrow().collection(Collection::Teachers);
        fake.emit(id, Ok(Some(vec![("t3".into(), json!({ "name": "C" }))])));

        // A reader holding the earlier value still sees it intact.
        assert_eq!(first.len(), 2);
        assert_eq!(ids(&sync.view().borrow(), ViewKey::Collection(Collection::Teachers)), vec!["t3"]);
    }

    #[test]
    fn schedule_switch_unsubscribes_before_subscribing() {
        let (fake, sync) = setup();
        let mut tracker = ScheduleTracker::new(sync.clone());

        tracker.select(Some("c1")).expect("select c1");
        let old = fake.listener_for("schedules/c1").expect("c1 listener");
        fake.emit(
            old,
            Ok(Some(vec![(
                "Monday".into(),
                json!({ "e1": { "subject": "Math", "time": "08:00" } }),
            )])),
        );
        assert_eq!(sync.view().borrow().timetable().len(), 1);

        tracker.select(Some("c2")).expect("select c2");
        {
            let calls = fake.calls.borrow();
            let unsub = calls
                .iter()
                .position(|c| *c == Call::Unsubscribe(old))
                .expect("old listener released");
            let sub = calls
                .iter()
                .position(|c| *c == Call::Subscribe("schedules/c2".to_string()))
                .expect("new listener opened");
            assert!(unsub < sub);
        }
        assert_eq!(fake.active_paths(), vec!["schedules/c2".to_string()]);
        assert_eq!(sync.view().borrow().schedule_class(), Some("c2"));
        assert!(sync.view().borrow().timetable().is_empty());

        // The old listener fires right after the switch; it must not land.
        fake.emit(
            old,
            Ok(Some(vec![(
                "Friday".into(),
                json!({ "e9": { "subject": "Stale", "time": "12:00" } }),
            )])),
        );
        assert!(sync.view().borrow().timetable().is_empty());
    }

    #[test]
    fn selecting_no_class_leaves_no_subscription() {
        let (fake, sync) = setup();
        let mut tracker = ScheduleTracker::new(sync.clone());
        tracker.select(Some("c1")).expect("select");
        tracker.select(None).expect("deselect");

        assert!(fake.active_paths().is_empty());
        assert_eq!(tracker.selected(), None);
        assert_eq!(sync.view().borrow().schedule_class(), None);
        assert!(sync.view().borrow().records(ViewKey::Schedule).is_empty());
    }

    #[test]
    fn reselecting_the_same_class_is_a_no_op() {
        let (fake, sync) = setup();
        let mut tracker = ScheduleTracker::new(sync);
        tracker.select(Some("c1")).expect("select");
        tracker.select(Some(" c1 ")).expect("reselect");
        let subscribes = fake
            .calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Subscribe(_)))
            .count();
        assert_eq!(subscribes, 1);
    }
}
