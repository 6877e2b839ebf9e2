use serde_json::json;

use crate::commands::{AnnouncementDraft, Draft};
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{handle_create, handle_delete, object_params, param_str, session};
use crate::ipc::types::{AppState, Request};
use crate::model::{Collection, Priority};

fn handle_announcements_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let priority = match param_str(req, "priority") {
        Some(p) => match Priority::parse(p) {
            Some(p) => Some(p),
            None => return err(&req.id, "bad_params", "unknown priority", None),
        },
        None => None,
    };
    let limit = req
        .params
        .get("limit")
        .and_then(|v| v.as_u64())
        .map(|n| n as usize);

    // Already newest first.
    let announcements: Vec<_> = session
        .view()
        .announcements()
        .into_iter()
        .filter(|a| priority.map_or(true, |p| a.priority == p))
        .take(limit.unwrap_or(usize::MAX))
        .collect();
    ok(&req.id, json!({ "announcements": announcements }))
}

/// Announcements without an explicit author are signed with the
/// `adminName` setting when one is saved.
fn handle_announcements_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let mut params = match object_params(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if param_str(req, "author").is_none() {
        let admin = state
            .store
            .as_ref()
            .and_then(|s| db::settings_get_json(s.conn(), "adminName").ok().flatten())
            .and_then(|v| v.as_str().map(str::trim).map(str::to_string))
            .filter(|v| !v.is_empty());
        if let Some(admin) = admin {
            params.insert("author".to_string(), json!(admin));
        }
    }
    let req = Request {
        params: serde_json::Value::Object(params),
        ..req.clone()
    };
    handle_create::<AnnouncementDraft>(state, &req, Draft::Announcement)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "announcements.list" => Some(handle_announcements_list(state, req)),
        "announcements.create" => Some(handle_announcements_create(state, req)),
        "announcements.delete" => Some(handle_delete(state, req, Collection::Announcements)),
        _ => None,
    }
}
