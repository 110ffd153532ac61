use crate::ipc::error::ok;
use crate::ipc::helpers::{
    bad_params, get_required_str, get_required_u64, get_str_array, not_found, require_store,
    to_json, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::state::SessionStore;
use crate::{tally, timer};
use chrono::Utc;
use serde_json::json;

fn handle_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = require_store(state)?;

    let question = get_required_str(&req.params, "question")?.trim().to_string();
    if question.is_empty() {
        return Err(bad_params("question must not be empty"));
    }

    // Blank rows from the option form are dropped, duplicates keep
    // their first position.
    let mut options: Vec<String> = Vec::new();
    for raw in get_str_array(&req.params, "options")? {
        let option = raw.trim().to_string();
        if option.is_empty() || options.contains(&option) {
            continue;
        }
        options.push(option);
    }
    if options.len() < 2 {
        return Err(bad_params("at least 2 distinct non-empty options required"));
    }

    let time_limit = get_required_u64(&req.params, "timeLimitSeconds")?;
    if time_limit == 0 || time_limit > u64::from(u32::MAX) {
        return Err(bad_params("timeLimitSeconds must be a positive integer"));
    }

    let assessment = store.create_assessment(question, options, time_limit as u32);
    Ok(json!({ "assessment": to_json(&assessment) }))
}

fn require_assessment(store: &SessionStore, id: &str) -> Result<(), HandlerErr> {
    if store.state().assessment(id).is_none() {
        return Err(not_found(format!("unknown assessment: {}", id)));
    }
    Ok(())
}

fn handle_start(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = require_store(state)?;
    let id = get_required_str(&req.params, "assessmentId")?;
    require_assessment(store, &id)?;

    store.start_assessment(&id);
    let assessment = store.state().assessment(&id).map(to_json);
    Ok(json!({ "assessment": assessment }))
}

fn handle_end(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = require_store(state)?;
    let id = get_required_str(&req.params, "assessmentId")?;
    require_assessment(store, &id)?;

    store.end_assessment(&id);
    let assessment = store.state().assessment(&id).map(to_json);
    Ok(json!({ "assessment": assessment }))
}

fn handle_list(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = require_store(state)?;
    let session = store.state();

    // Include answer counts so the dashboard can render a useful list
    // without one results call per row.
    let assessments: Vec<serde_json::Value> = session
        .assessments
        .iter()
        .map(|a| {
            let mut row = to_json(a);
            let count = session
                .answers
                .iter()
                .filter(|ans| ans.assessment_id == a.id)
                .count();
            row["answerCount"] = json!(count);
            row
        })
        .collect();

    Ok(json!({
        "assessments": assessments,
        "currentAssessmentId": session.current_assessment_id,
    }))
}

fn handle_can_create(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = require_store(state)?;
    Ok(json!({ "canCreate": tally::can_create_new(store.state()) }))
}

fn handle_results(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = require_store(state)?;
    let id = get_required_str(&req.params, "assessmentId")?;
    match tally::assessment_results(store.state(), &id) {
        Some(results) => Ok(to_json(&results)),
        None => Err(not_found(format!("unknown assessment: {}", id))),
    }
}

fn handle_timer_status(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let store = require_store(state)?;
    let session = store.state();

    let assessment = match req.params.get("assessmentId").and_then(|v| v.as_str()) {
        Some(id) => session
            .assessment(id)
            .ok_or_else(|| not_found(format!("unknown assessment: {}", id)))?,
        None => session
            .active_assessment()
            .ok_or_else(|| not_found("no active assessment"))?,
    };

    let status = timer::countdown_status(assessment, Utc::now());
    let (remaining, expired) = match &status {
        Some(s) => (s.remaining_seconds, s.expired),
        None => (assessment.time_limit_seconds, false),
    };
    Ok(json!({
        "assessmentId": assessment.id,
        "running": assessment.is_active && status.is_some() && !expired,
        "remainingSeconds": remaining,
        "expired": expired,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "assessments.create" => handle_create(state, req),
        "assessments.start" => handle_start(state, req),
        "assessments.end" => handle_end(state, req),
        "assessments.list" => handle_list(state, req),
        "assessments.canCreate" => handle_can_create(state, req),
        "assessments.results" => handle_results(state, req),
        "timer.status" => handle_timer_status(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(value) => ok(&req.id, value),
        Err(e) => e.response(&req.id),
    })
}
