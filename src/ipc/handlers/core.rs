use anyhow::Context;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::session;
use crate::ipc::types::{AppState, Request};
use crate::session::DashboardSession;
use crate::store::{SharedStore, SqliteStore};

/// Opens (or creates) the workspace database and starts a fresh dashboard
/// session on it. Any previous session is closed first.
pub fn open_workspace(state: &mut AppState, path: &Path) -> anyhow::Result<()> {
    let conn = db::open_db(path)
        .with_context(|| format!("failed to open workspace {}", path.to_string_lossy()))?;
    state.close_workspace();

    let store = Rc::new(SqliteStore::new(conn));
    let shared: SharedStore = store.clone();
    state.session = Some(DashboardSession::start(shared));
    state.store = Some(store);
    state.workspace = Some(path.to_path_buf());
    tracing::info!(workspace = %path.to_string_lossy(), "workspace opened");
    Ok(())
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "subscriptions": state.session.as_ref().map(|s| s.active_subscriptions()).unwrap_or(0)
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match open_workspace(state, &path) {
        Ok(()) => ok(&req.id, json!({ "workspacePath": path.to_string_lossy() })),
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

fn handle_workspace_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.close_workspace();
    ok(&req.id, json!({ "workspacePath": null }))
}

fn handle_state_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let view = session.view();
    ok(
        &req.id,
        json!({
            "revision": view.revision(),
            "teachers": view.teachers(),
            "classes": view.classes(),
            "students": view.students(),
            "announcements": view.announcements(),
            "schedule": {
                "classId": view.schedule_class(),
                "days": view.timetable(),
            },
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "workspace.close" => Some(handle_workspace_close(state, req)),
        "state.get" => Some(handle_state_get(state, req)),
        _ => None,
    }
}
