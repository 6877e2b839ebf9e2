//! Form-driven writes. Every draft is validated, denormalized against the
//! current view, then written with a single push. The write's effect shows
//! up later through the subscriptions, never through the return value.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cell::RefCell;

use crate::model::{normalize_day, Collection, Priority, UNASSIGNED};
use crate::store::{server_timestamp, RecordId, RemoteStore, StoreError};
use crate::sync::ViewStateStore;

pub const DEFAULT_AUTHOR: &str = "Admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationKind {
    MissingFields,
    InvalidValue,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?}: {}", .fields.join(", "))]
pub struct ValidationError {
    pub kind: ValidationKind,
    pub fields: Vec<&'static str>,
}

impl ValidationError {
    fn invalid(field: &'static str) -> Self {
        Self {
            kind: ValidationKind::InvalidValue,
            fields: vec![field],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("remote write failed: {0}")]
    RemoteWrite(#[source] StoreError),
}

/// Accepts strings and numbers; anything else reads as absent.
fn opt_text<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn present(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn text(v: Option<String>) -> String {
    v.map(|s| s.trim().to_string()).unwrap_or_default()
}

fn path_segment(v: &Option<String>, field: &'static str) -> Result<(), ValidationError> {
    match present(v) {
        Some(s) if s.contains('/') => Err(ValidationError::invalid(field)),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherDraft {
    #[serde(default, deserialize_with = "opt_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDraft {
    #[serde(default, deserialize_with = "opt_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub grade: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub teacher_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDraft {
    #[serde(default, deserialize_with = "opt_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub class_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementDraft {
    #[serde(default, deserialize_with = "opt_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntryDraft {
    #[serde(default, deserialize_with = "opt_text")]
    pub class_id: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub day: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub time: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Draft {
    Teacher(TeacherDraft),
    Class(ClassDraft),
    Student(StudentDraft),
    Announcement(AnnouncementDraft),
    ScheduleEntry(ScheduleEntryDraft),
}

/// Shared shape of every create form.
pub trait Form {
    /// Required fields with their current values, in display order.
    fn required(&self) -> Vec<(&'static str, Option<&str>)>;

    /// Checks on values that are present. Runs after the required check.
    fn check_values(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn target_path(&self) -> String;

    /// The body to push. Only called on a validated form.
    fn into_record(self, view: &ViewStateStore) -> Value;
}

pub fn validate<F: Form>(form: &F) -> Result<(), ValidationError> {
    let missing: Vec<&'static str> = form
        .required()
        .into_iter()
        .filter(|(_, v)| v.map(str::trim).filter(|s| !s.is_empty()).is_none())
        .map(|(name, _)| name)
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError {
            kind: ValidationKind::MissingFields,
            fields: missing,
        });
    }
    form.check_values()
}

/// Name of the referenced record at this moment, or [`UNASSIGNED`].
fn resolve_name(view: &ViewStateStore, collection: Collection, id: &str) -> String {
    view.find(collection, id)
        .and_then(|r| r.str_field("name").map(str::trim).map(str::to_string))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| UNASSIGNED.to_string())
}

impl Form for TeacherDraft {
    fn required(&self) -> Vec<(&'static str, Option<&str>)> {
        vec![
            ("name", self.name.as_deref()),
            ("username", self.username.as_deref()),
            ("password", self.password.as_deref()),
            ("subject", self.subject.as_deref()),
        ]
    }

    fn target_path(&self) -> String {
        Collection::Teachers.path().to_string()
    }

    fn into_record(self, _view: &ViewStateStore) -> Value {
        json!({
            "name": text(self.name),
            "username": text(self.username),
            // Stored exactly as typed; surrounding spaces may be part of it.
            "password": self.password.unwrap_or_default(),
            "subject": text(self.subject),
            "createdAt": server_timestamp(),
        })
    }
}

impl Form for ClassDraft {
    fn required(&self) -> Vec<(&'static str, Option<&str>)> {
        vec![
            ("name", self.name.as_deref()),
            ("grade", self.grade.as_deref()),
            ("teacherId", self.teacher_id.as_deref()),
        ]
    }

    fn target_path(&self) -> String {
        Collection::Classes.path().to_string()
    }

    fn into_record(self, view: &ViewStateStore) -> Value {
        let teacher_id = text(self.teacher_id);
        let teacher_name = resolve_name(view, Collection::Teachers, &teacher_id);
        json!({
            "name": text(self.name),
            "grade": text(self.grade),
            "teacherId": teacher_id,
            "teacherName": teacher_name,
            "createdAt": server_timestamp(),
        })
    }
}

impl Form for StudentDraft {
    fn required(&self) -> Vec<(&'static str, Option<&str>)> {
        vec![
            ("name", self.name.as_deref()),
            ("username", self.username.as_deref()),
            ("password", self.password.as_deref()),
            ("classId", self.class_id.as_deref()),
        ]
    }

    fn target_path(&self) -> String {
        Collection::Students.path().to_string()
    }

    fn into_record(self, view: &ViewStateStore) -> Value {
        let class_id = text(self.class_id);
        let class_name = resolve_name(view, Collection::Classes, &class_id);
        json!({
            "name": text(self.name),
            "username": text(self.username),
            // Same as teachers: not trimmed.
            "password": self.password.unwrap_or_default(),
            "classId": class_id,
            "className": class_name,
            "createdAt": server_timestamp(),
        })
    }
}

impl Form for AnnouncementDraft {
    fn required(&self) -> Vec<(&'static str, Option<&str>)> {
        vec![
            ("title", self.title.as_deref()),
            ("content", self.content.as_deref()),
        ]
    }

    fn check_values(&self) -> Result<(), ValidationError> {
        match present(&self.priority) {
            Some(p) if Priority::parse(p).is_none() => Err(ValidationError::invalid("priority")),
            _ => Ok(()),
        }
    }

    fn target_path(&self) -> String {
        Collection::Announcements.path().to_string()
    }

    fn into_record(self, _view: &ViewStateStore) -> Value {
        let priority = present(&self.priority)
            .and_then(Priority::parse)
            .unwrap_or_default();
        let author = present(&self.author).unwrap_or(DEFAULT_AUTHOR).to_string();
        json!({
            "title": text(self.title),
            "content": text(self.content),
            "priority": priority.as_str(),
            "author": author,
            "createdAt": server_timestamp(),
        })
    }
}

impl Form for ScheduleEntryDraft {
    fn required(&self) -> Vec<(&'static str, Option<&str>)> {
        vec![
            ("classId", self.class_id.as_deref()),
            ("day", self.day.as_deref()),
            ("subject", self.subject.as_deref()),
            ("time", self.time.as_deref()),
        ]
    }

    fn check_values(&self) -> Result<(), ValidationError> {
        path_segment(&self.class_id, "classId")?;
        match present(&self.day) {
            Some(d) if normalize_day(d).is_none() => Err(ValidationError::invalid("day")),
            _ => Ok(()),
        }
    }

    fn target_path(&self) -> String {
        let class_id = present(&self.class_id).unwrap_or_default();
        let day = present(&self.day)
            .and_then(normalize_day)
            .unwrap_or_default();
        format!("schedules/{class_id}/{day}")
    }

    fn into_record(self, _view: &ViewStateStore) -> Value {
        json!({
            "subject": text(self.subject),
            "time": text(self.time),
            "createdAt": server_timestamp(),
        })
    }
}

/// Validates, denormalizes and pushes `draft`. The draft is consumed either
/// way; on success the caller only gets the new id. The view is only
/// borrowed while the record is built, never across the push.
pub fn submit(
    store: &dyn RemoteStore,
    view: &RefCell<ViewStateStore>,
    draft: Draft,
) -> Result<RecordId, CommandError> {
    let (path, record) = prepare(&view.borrow(), draft)?;
    write(store, &path, record)
}

/// Target path and body for `draft`.
fn prepare(view: &ViewStateStore, draft: Draft) -> Result<(String, Value), ValidationError> {
    match draft {
        Draft::Teacher(d) => prepare_form(view, d),
        Draft::Class(d) => prepare_form(view, d),
        Draft::Student(d) => prepare_form(view, d),
        Draft::Announcement(d) => prepare_form(view, d),
        Draft::ScheduleEntry(d) => prepare_form(view, d),
    }
}

fn prepare_form<F: Form>(view: &ViewStateStore, form: F) -> Result<(String, Value), ValidationError> {
    validate(&form)?;
    let path = form.target_path();
    Ok((path, form.into_record(view)))
}

/// One push. The store may deliver the new snapshot before this returns.
fn write(store: &dyn RemoteStore, path: &str, record: Value) -> Result<RecordId, CommandError> {
    match store.push(path, record) {
        Ok(id) => {
            tracing::debug!(path = %path, id = %id, "record pushed");
            Ok(id)
        }
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "push failed");
            Err(CommandError::RemoteWrite(e))
        }
    }
}

/// Unconditional delete. Deleting something already gone is not an error.
pub fn remove(store: &dyn RemoteStore, path: &str) -> Result<(), StoreError> {
    store.remove(path)?;
    tracing::debug!(path, "record removed");
    Ok(())
}

pub fn record_path(collection: Collection, id: &str) -> Result<String, ValidationError> {
    let id = id.trim();
    if id.is_empty() || id.contains('/') {
        return Err(ValidationError::invalid("id"));
    }
    Ok(format!("{}/{}", collection.path(), id))
}

pub fn schedule_entry_path(
    class_id: &str,
    day: &str,
    entry_id: &str,
) -> Result<String, ValidationError> {
    let class_id = class_id.trim();
    let entry_id = entry_id.trim();
    if class_id.is_empty() || class_id.contains('/') {
        return Err(ValidationError::invalid("classId"));
    }
    let Some(day) = normalize_day(day) else {
        return Err(ValidationError::invalid("day"));
    };
    if entry_id.is_empty() || entry_id.contains('/') {
        return Err(ValidationError::invalid("entryId"));
    }
    Ok(format!("schedules/{class_id}/{day}/{entry_id}"))
}
