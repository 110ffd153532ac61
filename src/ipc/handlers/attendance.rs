use crate::ipc::error::ok;
use crate::ipc::helpers::{get_required_str, not_found, require_store, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::tally;

fn handle_get(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = require_store(state)?;
    let id = get_required_str(&req.params, "assessmentId")?;
    match tally::attendance_data(store.state(), &id) {
        Some(attendance) => Ok(to_json(&attendance)),
        None => Err(not_found(format!("unknown assessment: {}", id))),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.get" => handle_get(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(value) => ok(&req.id, value),
        Err(e) => e.response(&req.id),
    })
}
