use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::commands::{self, CommandError, Draft};
use crate::model::Collection;
use crate::store::{RecordId, SharedStore, StoreError};
use crate::sync::{ScheduleTracker, Synchronizer, TrackHandle, ViewStateStore};

/// Everything one open dashboard keeps alive: a subscription per collection,
/// the timetable's scoped subscription and the view they feed. Dropping the
/// session releases every listener.
pub struct DashboardSession {
    store: SharedStore,
    sync: Synchronizer,
    handles: Vec<TrackHandle>,
    schedule: ScheduleTracker,
}

impl DashboardSession {
    pub fn start(store: SharedStore) -> Self {
        let view = Rc::new(RefCell::new(ViewStateStore::default()));
        let sync = Synchronizer::new(store.clone(), view);
        let mut handles = Vec::with_capacity(Collection::ALL.len());
        for collection in Collection::ALL {
            // A failed subscribe leaves that collection empty; the others still load.
            if let Ok(handle) = sync.track(collection) {
                handles.push(handle);
            }
        }
        tracing::info!(tracked = handles.len(), "dashboard session started");
        let schedule = ScheduleTracker::new(sync.clone());
        Self {
            store,
            sync,
            handles,
            schedule,
        }
    }

    pub fn view(&self) -> Ref<'_, ViewStateStore> {
        self.sync.view().borrow()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.handles.iter().filter(|h| h.is_active()).count()
            + usize::from(self.schedule.selected().is_some())
    }

    pub fn selected_class(&self) -> Option<&str> {
        self.schedule.selected()
    }

    pub fn select_schedule(&mut self, class_id: Option<&str>) -> Result<(), StoreError> {
        self.schedule.select(class_id)
    }

    pub fn submit(&self, draft: Draft) -> Result<RecordId, CommandError> {
        commands::submit(self.store.as_ref(), self.sync.view(), draft)
    }

    pub fn remove(&self, path: &str) -> Result<(), StoreError> {
        commands::remove(self.store.as_ref(), path)
    }

    /// Releases every subscription now instead of waiting for drop.
    pub fn close(&mut self) {
        for handle in self.handles.iter_mut() {
            self.sync.untrack(handle);
        }
        // Deselecting cannot fail: it never opens a listener.
        let _ = self.schedule.select(None);
        tracing::info!("dashboard session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{ClassDraft, TeacherDraft};
    use crate::store::fake::FakeStore;
    use crate::store::{ListenerId, RemoteStore, SnapshotFn};
    use serde_json::Value;

    /// Delivers every write to its listeners before `push` returns.
    struct EagerStore(FakeStore);

    impl RemoteStore for EagerStore {
        fn subscribe(&self, path: &str, on_snapshot: SnapshotFn) -> Result<ListenerId, StoreError> {
            self.0.subscribe(path, on_snapshot)
        }

        fn unsubscribe(&self, listener: ListenerId) {
            self.0.unsubscribe(listener)
        }

        fn push(&self, path: &str, record: Value) -> Result<RecordId, StoreError> {
            let id = self.0.push(path, record)?;
            self.0.emit_current(path);
            Ok(id)
        }

        fn remove(&self, path: &str) -> Result<(), StoreError> {
            self.0.remove(path)?;
            if let Some((parent, _)) = path.rsplit_once('/') {
                self.0.emit_current(parent);
            }
            Ok(())
        }
    }

    fn teacher(name: &str) -> Draft {
        Draft::Teacher(TeacherDraft {
            name: Some(name.into()),
            username: Some(name.to_lowercase()),
            password: Some("pw".into()),
            subject: Some("Math".into()),
        })
    }

    #[test]
    fn session_tracks_all_collections_and_closes_cleanly() {
        let fake = Rc::new(FakeStore::new());
        let mut session = DashboardSession::start(fake.clone());
        assert_eq!(
            fake.active_paths(),
            vec!["teachers", "classes", "students", "announcements"]
        );
        session.select_schedule(Some("c1")).expect("select");
        assert_eq!(session.active_subscriptions(), 5);

        session.close();
        session.close();
        assert_eq!(session.active_subscriptions(), 0);
        assert!(fake.active_paths().is_empty());
    }

    #[test]
    fn submitted_write_becomes_visible_only_after_delivery() {
        let fake = Rc::new(FakeStore::new());
        let session = DashboardSession::start(fake.clone());
        session.submit(teacher("Ada")).expect("submit");
        assert!(session.view().teachers().is_empty());

        fake.emit_current("teachers");
        let teachers = session.view().teachers();
        assert_eq!(teachers.len(), 1);
        assert_eq!(teachers[0].name, "Ada");
    }

    #[test]
    fn store_delivering_inside_push_updates_the_view() {
        let store = Rc::new(EagerStore(FakeStore::new()));
        let session = DashboardSession::start(store.clone());

        let teacher_id = session.submit(teacher("Ada")).expect("teacher");
        assert_eq!(session.view().teachers().len(), 1);

        session
            .submit(Draft::Class(ClassDraft {
                name: Some("7A".into()),
                grade: Some("7".into()),
                teacher_id: Some(teacher_id.clone()),
            }))
            .expect("class");
        let classes = session.view().classes();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].teacher_name, "Ada");

        session.remove(&format!("teachers/{teacher_id}")).expect("remove");
        assert!(session.view().teachers().is_empty());
    }

    #[test]
    fn dropping_the_session_releases_listeners() {
        let fake = Rc::new(FakeStore::new());
        let session = DashboardSession::start(fake.clone());
        assert_eq!(fake.active_paths().len(), 4);
        drop(session);
        assert!(fake.active_paths().is_empty());
    }
}
