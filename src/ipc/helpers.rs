use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::commands::{record_path, Draft};
use crate::ipc::error::{command_err, err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::Collection;
use crate::session::DashboardSession;

pub fn session<'a>(
    state: &'a AppState,
    req: &Request,
) -> Result<&'a DashboardSession, serde_json::Value> {
    state
        .session
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn session_mut<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<&'a mut DashboardSession, serde_json::Value> {
    state
        .session
        .as_mut()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// Trimmed, non-empty string param.
pub fn param_str<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Named params of `req`. A missing or null body reads as `{}`; arrays and
/// scalars are rejected so drafts never fill fields by position.
pub fn object_params(req: &Request) -> Result<Map<String, Value>, Value> {
    match &req.params {
        Value::Null => Ok(Map::new()),
        Value::Object(m) => Ok(m.clone()),
        _ => Err(err(&req.id, "bad_params", "params must be an object", None)),
    }
}

/// Shared `*.create`: params are the draft, the reply carries the new id.
pub fn handle_create<D>(state: &mut AppState, req: &Request, wrap: fn(D) -> Draft) -> serde_json::Value
where
    D: DeserializeOwned,
{
    let session = match session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let params = match object_params(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let draft: D = match serde_json::from_value(Value::Object(params)) {
        Ok(d) => d,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    match session.submit(wrap(draft)) {
        Ok(id) => ok(&req.id, json!({ "id": id })),
        Err(e) => command_err(&req.id, e),
    }
}

/// Shared `*.delete`: no existence check, deleting twice is fine.
pub fn handle_delete(
    state: &mut AppState,
    req: &Request,
    collection: Collection,
) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let Some(id) = param_str(req, "id") else {
        return err(&req.id, "bad_params", "missing id", None);
    };
    let path = match record_path(collection, id) {
        Ok(p) => p,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    match session.remove(&path) {
        Ok(()) => ok(&req.id, json!({ "id": id })),
        Err(e) => err(&req.id, "remote_remove_failed", e.to_string(), None),
    }
}
