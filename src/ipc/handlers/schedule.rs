use serde_json::json;

use crate::commands::{schedule_entry_path, Draft, ScheduleEntryDraft};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{handle_create, param_str, session, session_mut};
use crate::ipc::types::{AppState, Request};

fn handle_schedule_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session_mut(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    // null, "" or a missing classId all mean "no class selected".
    let class_id = param_str(req, "classId");
    if let Err(e) = session.select_schedule(class_id) {
        return err(&req.id, "subscribe_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "classId": session.selected_class() }))
}

fn handle_schedule_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let view = session.view();
    ok(
        &req.id,
        json!({
            "classId": view.schedule_class(),
            "days": view.timetable(),
        }),
    )
}

fn handle_schedule_delete_entry(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let (Some(class_id), Some(day), Some(entry_id)) = (
        param_str(req, "classId"),
        param_str(req, "day"),
        param_str(req, "entryId"),
    ) else {
        return err(&req.id, "bad_params", "missing classId, day or entryId", None);
    };
    let path = match schedule_entry_path(class_id, day, entry_id) {
        Ok(p) => p,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    match session.remove(&path) {
        Ok(()) => ok(&req.id, json!({ "id": entry_id })),
        Err(e) => err(&req.id, "remote_remove_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schedule.select" => Some(handle_schedule_select(state, req)),
        "schedule.get" => Some(handle_schedule_get(state, req)),
        "schedule.addEntry" => Some(handle_create::<ScheduleEntryDraft>(
            state,
            req,
            Draft::ScheduleEntry,
        )),
        "schedule.deleteEntry" => Some(handle_schedule_delete_entry(state, req)),
        _ => None,
    }
}
