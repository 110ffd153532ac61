use crate::ipc::error::ok;
use crate::ipc::helpers::{
    bad_params, get_required_str, not_found, require_store, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::legacy;
use crate::state::UserRole;
use chrono::Utc;
use serde_json::json;

fn handle_get(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = require_store(state)?;
    let session = store.state();
    Ok(json!({
        "sessionId": session.session_id,
        "userRole": session.user_role,
        "studentName": session.student_name,
        "currentAssessmentId": session.current_assessment_id,
        "totalStudents": session.students.len(),
    }))
}

fn handle_join(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = require_store(state)?;
    let name = get_required_str(&req.params, "studentName")?.trim().to_string();
    if name.is_empty() {
        return Err(bad_params("studentName must not be empty"));
    }

    store.join_session(&name);
    Ok(json!({
        "studentName": name,
        "totalStudents": store.state().students.len(),
    }))
}

fn handle_set_role(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = require_store(state)?;
    let role = match get_required_str(&req.params, "role")?.as_str() {
        "teacher" => UserRole::Teacher,
        "student" => UserRole::Student,
        other => {
            return Err(bad_params(format!(
                "role must be teacher or student, got: {}",
                other
            )))
        }
    };

    store.set_user_role(role);
    Ok(json!({ "userRole": role }))
}

fn handle_set_student_name(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let store = require_store(state)?;
    let name = get_required_str(&req.params, "studentName")?.trim().to_string();
    if name.is_empty() {
        return Err(bad_params("studentName must not be empty"));
    }

    store.set_student_name(&name);
    Ok(json!({ "studentName": name }))
}

fn handle_reset_role(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = require_store(state)?;
    store.reset_user_role();
    Ok(json!({}))
}

fn handle_import_legacy(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let store = require_store(state)?;

    // Either an explicit exported JSON file, or the workspace's own
    // legacy slot.
    let raw = match req.params.get("path").and_then(|v| v.as_str()) {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| HandlerErr::new("io_failed", format!("failed to read {}: {}", path, e)))?,
        None => store
            .load_slot(legacy::LEGACY_POLL_SLOT)
            .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?
            .ok_or_else(|| not_found("no legacy poll snapshot in this workspace"))?,
    };

    let import = legacy::upgrade_poll_snapshot(&raw, Utc::now())
        .map_err(|e| HandlerErr::new("bad_snapshot", format!("{e:?}")))?;
    let summary = json!({
        "assessments": import.assessments.len(),
        "answers": import.answers.len(),
        "students": import.students.len(),
        "collapsedVotes": import.collapsed_votes,
    });
    store.import_collections(import.assessments, import.answers, import.students);
    Ok(summary)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "session.get" => handle_get(state, req),
        "session.join" => handle_join(state, req),
        "session.setRole" => handle_set_role(state, req),
        "session.setStudentName" => handle_set_student_name(state, req),
        "session.resetRole" => handle_reset_role(state, req),
        "session.importLegacy" => handle_import_legacy(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(value) => ok(&req.id, value),
        Err(e) => e.response(&req.id),
    })
}
