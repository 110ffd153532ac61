use crate::ipc::error::ok;
use crate::ipc::helpers::{
    bad_params, get_required_str, not_found, require_store, to_json, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_submit(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = require_store(state)?;

    let assessment_id = get_required_str(&req.params, "assessmentId")?;
    let option = get_required_str(&req.params, "option")?;
    let student_name = get_required_str(&req.params, "studentName")?.trim().to_string();
    if student_name.is_empty() {
        return Err(bad_params("studentName must not be empty"));
    }

    let Some(assessment) = store.state().assessment(&assessment_id) else {
        return Err(not_found(format!("unknown assessment: {}", assessment_id)));
    };
    if !assessment.options.iter().any(|o| *o == option) {
        return Err(bad_params(format!(
            "option is not part of this assessment: {}",
            option
        )));
    }

    let answer = store.submit_answer(&assessment_id, &option, &student_name);
    Ok(json!({ "answer": to_json(&answer) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "answers.submit" => handle_submit(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(value) => ok(&req.id, value),
        Err(e) => e.response(&req.id),
    })
}
