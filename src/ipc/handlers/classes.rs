use serde_json::json;
use std::collections::HashMap;

use crate::commands::{ClassDraft, Draft};
use crate::ipc::error::ok;
use crate::ipc::helpers::{handle_create, handle_delete, session};
use crate::ipc::types::{AppState, Request};
use crate::model::Collection;

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let view = session.view();

    // Include roster counts so the UI can show a useful class table.
    let mut counts: HashMap<String, usize> = HashMap::new();
    for s in view.students() {
        *counts.entry(s.class_id).or_default() += 1;
    }

    let classes: Vec<serde_json::Value> = view
        .classes()
        .into_iter()
        .map(|c| {
            let student_count = counts.get(&c.id).copied().unwrap_or(0);
            let mut v = json!(c);
            v["studentCount"] = json!(student_count);
            v
        })
        .collect();
    ok(&req.id, json!({ "classes": classes }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "classes.create" => Some(handle_create::<ClassDraft>(state, req, Draft::Class)),
        // No cascade: students keep their classId and stale className.
        "classes.delete" => Some(handle_delete(state, req, Collection::Classes)),
        _ => None,
    }
}
