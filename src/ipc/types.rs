use std::path::PathBuf;
use std::rc::Rc;

use serde::Deserialize;

use crate::session::DashboardSession;
use crate::store::SqliteStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<Rc<SqliteStore>>,
    pub session: Option<DashboardSession>,
}

impl AppState {
    /// One event-loop turn's worth of store deliveries.
    pub fn pump(&self) -> usize {
        self.store.as_ref().map(|s| s.pump()).unwrap_or(0)
    }

    /// Closes the current session before its store goes away.
    pub fn close_workspace(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
        self.store = None;
        self.workspace = None;
    }
}
