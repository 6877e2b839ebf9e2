use serde_json::json;

use crate::commands::CommandError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn command_err(id: &str, e: CommandError) -> serde_json::Value {
    match e {
        CommandError::Validation(v) => err(
            id,
            "validation_failed",
            v.to_string(),
            Some(json!({ "kind": v.kind, "fields": v.fields })),
        ),
        CommandError::RemoteWrite(e) => err(id, "remote_write_failed", e.to_string(), None),
    }
}
