use serde_json::json;

use crate::ipc::error::ok;
use crate::ipc::helpers::session;
use crate::ipc::types::{AppState, Request};
use crate::reports;

fn handle_reports(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let view = session.view();
    let teachers = view.teachers();
    let classes = view.classes();
    let students = view.students();
    let announcements = view.announcements();

    let result = match req.method.as_str() {
        "reports.summary" => json!(reports::summary(
            &teachers,
            &classes,
            &students,
            &announcements
        )),
        "reports.enrollmentByGrade" => {
            json!({ "grades": reports::enrollment_by_grade(&classes, &students) })
        }
        "reports.teachersBySubject" => {
            json!({ "subjects": reports::teachers_by_subject(&teachers) })
        }
        "reports.announcementsByPriority" => {
            json!(reports::announcements_by_priority(&announcements))
        }
        _ => json!(reports::overview(
            &teachers,
            &classes,
            &students,
            &announcements
        )),
    };
    ok(&req.id, result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.summary"
        | "reports.enrollmentByGrade"
        | "reports.teachersBySubject"
        | "reports.announcementsByPriority"
        | "dashboard.overview" => Some(handle_reports(state, req)),
        _ => None,
    }
}
