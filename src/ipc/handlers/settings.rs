use serde_json::{json, Map, Value};

use crate::commands::DEFAULT_AUTHOR;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

/// Keys the settings page always shows, with their values before first save.
const DEFAULTS: [(&str, &str); 3] = [
    ("schoolName", ""),
    ("academicYear", ""),
    ("adminName", DEFAULT_AUTHOR),
];

fn merged_settings(conn: &rusqlite::Connection) -> anyhow::Result<Map<String, Value>> {
    let mut out: Map<String, Value> = DEFAULTS
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();
    out.extend(db::settings_all(conn)?);
    Ok(out)
}

fn handle_settings_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match merged_settings(store.conn()) {
        Ok(settings) => ok(&req.id, json!({ "settings": settings })),
        Err(e) => err(&req.id, "settings_failed", format!("{e:?}"), None),
    }
}

fn handle_settings_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(values) = req.params.get("values").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing values object", None);
    };

    let rejected: Vec<&str> = values
        .iter()
        .filter(|(k, v)| k.trim().is_empty() || v.is_object() || v.is_array())
        .map(|(k, _)| k.as_str())
        .collect();
    if !rejected.is_empty() {
        return err(
            &req.id,
            "bad_params",
            "settings values must be strings, numbers, booleans or null",
            Some(json!({ "keys": rejected })),
        );
    }

    let conn = store.conn();
    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "settings_failed", e.to_string(), None),
    };
    for (key, value) in values {
        if let Err(e) = db::settings_set_json(&tx, key.trim(), value) {
            let _ = tx.rollback();
            return err(
                &req.id,
                "settings_failed",
                format!("{e:?}"),
                Some(json!({ "key": key })),
            );
        }
    }
    if let Err(e) = tx.commit() {
        return err(&req.id, "settings_failed", e.to_string(), None);
    }
    tracing::info!(keys = values.len(), "settings updated");

    match merged_settings(conn) {
        Ok(settings) => ok(&req.id, json!({ "settings": settings })),
        Err(e) => err(&req.id, "settings_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "settings.get" => Some(handle_settings_get(state, req)),
        "settings.update" => Some(handle_settings_update(state, req)),
        _ => None,
    }
}
