use serde_json::json;

use crate::commands::{Draft, StudentDraft};
use crate::ipc::error::ok;
use crate::ipc::helpers::{handle_create, handle_delete, param_str, session};
use crate::ipc::types::{AppState, Request};
use crate::model::Collection;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let students = session.view().students();
    // Optional roster filter; without it the whole school is returned.
    let students: Vec<_> = match param_str(req, "classId") {
        Some(class_id) => students
            .into_iter()
            .filter(|s| s.class_id == class_id)
            .collect(),
        None => students,
    };
    ok(&req.id, json!({ "students": students }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.create" => Some(handle_create::<StudentDraft>(state, req, Draft::Student)),
        "students.delete" => Some(handle_delete(state, req, Collection::Students)),
        _ => None,
    }
}
