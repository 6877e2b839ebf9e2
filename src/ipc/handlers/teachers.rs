use serde_json::json;

use crate::commands::{Draft, TeacherDraft};
use crate::ipc::error::ok;
use crate::ipc::helpers::{handle_create, handle_delete, param_str, session};
use crate::ipc::types::{AppState, Request};
use crate::model::Collection;

fn handle_teachers_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let mut teachers = session.view().teachers();
    if let Some(subject) = param_str(req, "subject") {
        teachers.retain(|t| t.subject.trim().eq_ignore_ascii_case(subject));
    }
    ok(&req.id, json!({ "teachers": teachers }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "teachers.list" => Some(handle_teachers_list(state, req)),
        "teachers.create" => Some(handle_create::<TeacherDraft>(state, req, Draft::Teacher)),
        "teachers.delete" => Some(handle_delete(state, req, Collection::Teachers)),
        _ => None,
    }
}
