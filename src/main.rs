mod commands;
mod config;
mod db;
mod ipc;
mod logger;
mod model;
mod reports;
mod session;
mod store;
mod sync;

use std::io::{self, BufRead, Write};

fn main() {
    let config = config::Config::from_env();
    logger::init_logging(&config.log_level);

    let mut state = ipc::AppState::default();
    if let Some(path) = config.workspace.as_ref() {
        // A bad startup workspace is not fatal; the host can still select one.
        if let Err(e) = ipc::open_workspace(&mut state, path) {
            tracing::warn!(error = ?e, "startup workspace not opened");
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };

        // Deliver what earlier writes changed before looking at the next request.
        state.pump();

        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id; answer with an id-less error.
                let resp = ipc::err("", "bad_json", e.to_string(), None);
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        tracing::debug!(method = %req.method, id = %req.id, "request");
        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    state.close_workspace();
}
