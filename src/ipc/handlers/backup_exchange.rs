use crate::backup;
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_required_str, require_store, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_export(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = require_store(state)?;
    let out_path = PathBuf::from(get_required_str(&req.params, "outPath")?);

    let state_json = serde_json::to_string(store.state())
        .map_err(|e| HandlerErr::new("encode_failed", e.to_string()))?;
    let summary = backup::export_session_bundle(&state_json, &out_path)
        .map_err(|e| HandlerErr::new("io_failed", format!("{e:?}")))?;

    Ok(json!({
        "outPath": out_path.to_string_lossy(),
        "bundleFormat": summary.bundle_format,
        "entryCount": summary.entry_count,
        "stateSha256": summary.state_sha256,
    }))
}

fn handle_import(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = require_store(state)?;
    let in_path = PathBuf::from(get_required_str(&req.params, "inPath")?);

    // Verification happens before anything is written; a rejected
    // bundle leaves the current snapshot in place.
    let bundle = backup::import_session_bundle(&in_path)
        .map_err(|e| HandlerErr::new("bad_bundle", format!("{e:?}")))?;
    store.restore_snapshot(&bundle.state_json);

    Ok(json!({
        "bundleFormatDetected": bundle.bundle_format_detected,
        "sessionId": store.state().session_id,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "backup.export" => handle_export(state, req),
        "backup.import" => handle_import(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(value) => ok(&req.id, value),
        Err(e) => e.response(&req.id),
    })
}
