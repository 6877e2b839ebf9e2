use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Literal written in place of a foreign-key name that could not be resolved.
pub const UNASSIGNED: &str = "Unassigned";

/// Seats per class used by the capacity report.
pub const CLASS_CAPACITY: u64 = 30;

pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Teachers,
    Classes,
    Students,
    Announcements,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Teachers,
        Collection::Classes,
        Collection::Students,
        Collection::Announcements,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Collection::Teachers => "teachers",
            Collection::Classes => "classes",
            Collection::Students => "students",
            Collection::Announcements => "announcements",
        }
    }

    /// Only announcements carry an ordering contract; the rest keep arrival order.
    pub fn newest_first(self) -> bool {
        matches!(self, Collection::Announcements)
    }
}

pub fn schedule_path(class_id: &str) -> String {
    format!("schedules/{class_id}")
}

/// A materialized record: the store key plus whatever fields the body had.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Builds `{id} ∪ body`. Returns `None` for bodies that are not objects.
    pub fn from_entry(id: String, body: Value) -> Option<Self> {
        match body {
            Value::Object(mut fields) => {
                fields.remove("id");
                Some(Self { id, fields })
            }
            _ => None,
        }
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }

    /// `createdAt` as epoch millis. Accepts numbers and RFC 3339 strings.
    pub fn created_at_millis(&self) -> Option<i64> {
        created_at_millis(self.fields.get("createdAt")?)
    }

    fn project<T: for<'de> Deserialize<'de>>(&self) -> Option<T> {
        let mut obj = self.fields.clone();
        obj.insert("id".to_string(), Value::String(self.id.clone()));
        match serde_json::from_value(Value::Object(obj)) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::debug!(id = %self.id, error = %e, "record does not fit read model");
                None
            }
        }
    }
}

pub fn created_at_millis(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|d| d.timestamp_millis())
            .or_else(|| s.trim().parse::<i64>().ok()),
        _ => None,
    }
}

/// Lenient `createdAt`: whatever shape the store holds, read it as millis.
fn de_created_at<'de, D>(d: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(created_at_millis(&v))
}

/// Lenient text field: numbers (e.g. a grade stored as `7`) become strings.
fn de_text<'de, D>(d: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub name: String,
    #[serde(default, deserialize_with = "de_text")]
    pub username: String,
    #[serde(default, skip_serializing, deserialize_with = "de_text")]
    pub password: String,
    #[serde(default, deserialize_with = "de_text")]
    pub subject: String,
    #[serde(default, deserialize_with = "de_created_at")]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub name: String,
    #[serde(default, deserialize_with = "de_text")]
    pub grade: String,
    #[serde(default, deserialize_with = "de_text")]
    pub teacher_id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub teacher_name: String,
    #[serde(default, deserialize_with = "de_created_at")]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub name: String,
    #[serde(default, deserialize_with = "de_text")]
    pub username: String,
    #[serde(default, skip_serializing, deserialize_with = "de_text")]
    pub password: String,
    #[serde(default, deserialize_with = "de_text")]
    pub class_id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub class_name: String,
    #[serde(default, deserialize_with = "de_created_at")]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    Important,
    Urgent,
}

impl Priority {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(Priority::Normal),
            "important" => Some(Priority::Important),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Normal => "normal",
            Priority::Important => "important",
            Priority::Urgent => "urgent",
        }
    }
}

fn de_priority<'de, D>(d: D) -> Result<Priority, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(v.as_str().and_then(Priority::parse).unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub title: String,
    #[serde(default, deserialize_with = "de_text")]
    pub content: String,
    #[serde(default, deserialize_with = "de_priority")]
    pub priority: Priority,
    #[serde(default, deserialize_with = "de_text")]
    pub author: String,
    #[serde(default, deserialize_with = "de_created_at")]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub subject: String,
    #[serde(default, deserialize_with = "de_text")]
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub day: String,
    pub entries: Vec<ScheduleEntry>,
}

impl Teacher {
    pub fn from_record(r: &Record) -> Option<Self> {
        r.project()
    }
}

impl Class {
    pub fn from_record(r: &Record) -> Option<Self> {
        r.project()
    }
}

impl Student {
    pub fn from_record(r: &Record) -> Option<Self> {
        r.project()
    }
}

impl Announcement {
    pub fn from_record(r: &Record) -> Option<Self> {
        r.project()
    }
}

impl ScheduleEntry {
    pub fn from_entry(id: &str, body: &Value) -> Option<Self> {
        let record = Record::from_entry(id.to_string(), body.clone())?;
        record.project()
    }
}

/// Canonical weekday name for user input such as `"monday"`.
pub fn normalize_day(day: &str) -> Option<&'static str> {
    let day = day.trim();
    WEEKDAYS
        .iter()
        .copied()
        .find(|d| d.eq_ignore_ascii_case(day))
}
