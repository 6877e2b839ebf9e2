use std::collections::HashMap;
use std::rc::Rc;

use crate::model::{
    Announcement, Class, Collection, DaySchedule, Record, Student, Teacher,
};
use crate::reports;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKey {
    Collection(Collection),
    /// Days of the currently selected class, each record keyed by day name.
    Schedule,
}

/// Session-local mirror of the tracked collections.
///
/// Every value is replaced wholesale by the synchronizer; nothing else can
/// publish into it, so a reader always sees one complete snapshot.
#[derive(Debug, Default)]
pub struct ViewStateStore {
    views: HashMap<ViewKey, Rc<[Record]>>,
    schedule_class: Option<String>,
    revision: u64,
}

impl ViewStateStore {
    pub fn records(&self, key: ViewKey) -> Rc<[Record]> {
        self.views
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Rc::from(Vec::new()))
    }

    pub fn collection(&self, collection: Collection) -> Rc<[Record]> {
        self.records(ViewKey::Collection(collection))
    }

    pub fn find(&self, collection: Collection, id: &str) -> Option<Record> {
        self.views
            .get(&ViewKey::Collection(collection))?
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Bumped on every publish so the host can tell when to re-render.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn schedule_class(&self) -> Option<&str> {
        self.schedule_class.as_deref()
    }

    pub fn teachers(&self) -> Vec<Teacher> {
        self.collection(Collection::Teachers)
            .iter()
            .filter_map(Teacher::from_record)
            .collect()
    }

    pub fn classes(&self) -> Vec<Class> {
        self.collection(Collection::Classes)
            .iter()
            .filter_map(Class::from_record)
            .collect()
    }

    pub fn students(&self) -> Vec<Student> {
        self.collection(Collection::Students)
            .iter()
            .filter_map(Student::from_record)
            .collect()
    }

    pub fn announcements(&self) -> Vec<Announcement> {
        self.collection(Collection::Announcements)
            .iter()
            .filter_map(Announcement::from_record)
            .collect()
    }

    pub fn timetable(&self) -> Vec<DaySchedule> {
        reports::timetable(&self.records(ViewKey::Schedule))
    }

    pub(super) fn publish(&mut self, key: ViewKey, records: Rc<[Record]>) {
        self.views.insert(key, records);
        self.revision += 1;
    }

    pub(super) fn set_schedule_class(&mut self, class_id: Option<&str>) {
        self.schedule_class = class_id.map(str::to_string);
    }
}
