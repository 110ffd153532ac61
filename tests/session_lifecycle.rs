use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_pollroomd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn pollroomd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

#[test]
fn create_start_answer_results_flow() {
    let workspace = temp_dir("pollroom-lifecycle");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health.get("version").and_then(|v| v.as_str()).is_some());

    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert!(selected.get("sessionId").and_then(|v| v.as_str()).is_some());

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "assessments.create",
        json!({
            "question": "Pick a color",
            "options": ["Red", "Blue"],
            "timeLimitSeconds": 30
        }),
    );
    let assessment = created.get("assessment").expect("assessment");
    let assessment_id = assessment
        .get("id")
        .and_then(|v| v.as_str())
        .expect("assessment id")
        .to_string();
    assert_eq!(assessment.get("isActive").and_then(|v| v.as_bool()), Some(false));
    assert!(assessment.get("createdAt").and_then(|v| v.as_str()).is_some());

    // Retrievable immediately, inactive, not current.
    let list = request_ok(&mut stdin, &mut reader, "4", "assessments.list", json!({}));
    let rows = list.get("assessments").and_then(|v| v.as_array()).expect("rows");
    assert_eq!(rows.len(), 1);
    assert!(list.get("currentAssessmentId").map(|v| v.is_null()).unwrap_or(true));

    let started = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "assessments.start",
        json!({ "assessmentId": assessment_id }),
    );
    assert_eq!(
        started
            .get("assessment")
            .and_then(|a| a.get("isActive"))
            .and_then(|v| v.as_bool()),
        Some(true)
    );

    let timer = request_ok(&mut stdin, &mut reader, "6", "timer.status", json!({}));
    assert_eq!(timer.get("expired").and_then(|v| v.as_bool()), Some(false));
    let remaining = timer
        .get("remainingSeconds")
        .and_then(|v| v.as_u64())
        .expect("remainingSeconds");
    assert!(remaining <= 30 && remaining > 20, "remaining = {}", remaining);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "session.setRole",
        json!({ "role": "student" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "session.setStudentName",
        json!({ "studentName": "Ana" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "session.join",
        json!({ "studentName": "Ana" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "answers.submit",
        json!({
            "assessmentId": assessment_id,
            "option": "Red",
            "studentName": "Ana"
        }),
    );

    let results = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "assessments.results",
        json!({ "assessmentId": assessment_id }),
    );
    assert_eq!(results.get("totalAnswers").and_then(|v| v.as_u64()), Some(1));
    let rows = results.get("results").and_then(|v| v.as_array()).expect("results rows");
    assert_eq!(rows[0].get("option").and_then(|v| v.as_str()), Some("Red"));
    assert_eq!(rows[0].get("answers").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(rows[0].get("percentage").and_then(|v| v.as_u64()), Some(100));
    assert_eq!(rows[1].get("answers").and_then(|v| v.as_u64()), Some(0));
    assert_eq!(rows[1].get("percentage").and_then(|v| v.as_u64()), Some(0));
    assert_eq!(
        results
            .get("participants")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(1)
    );

    let session = request_ok(&mut stdin, &mut reader, "12", "session.get", json!({}));
    assert_eq!(session.get("userRole").and_then(|v| v.as_str()), Some("student"));
    assert_eq!(session.get("studentName").and_then(|v| v.as_str()), Some("Ana"));
    assert_eq!(
        session.get("currentAssessmentId").and_then(|v| v.as_str()),
        Some(assessment_id.as_str())
    );

    let ended = request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "assessments.end",
        json!({ "assessmentId": assessment_id }),
    );
    let ended_assessment = ended.get("assessment").expect("assessment");
    assert_eq!(
        ended_assessment.get("isActive").and_then(|v| v.as_bool()),
        Some(false)
    );
    assert!(ended_assessment.get("endedAt").and_then(|v| v.as_str()).is_some());

    let session = request_ok(&mut stdin, &mut reader, "14", "session.get", json!({}));
    assert!(session
        .get("currentAssessmentId")
        .map(|v| v.is_null())
        .unwrap_or(true));

    let _ = request_ok(&mut stdin, &mut reader, "15", "session.resetRole", json!({}));
    let session = request_ok(&mut stdin, &mut reader, "16", "session.get", json!({}));
    assert!(session.get("userRole").map(|v| v.is_null()).unwrap_or(true));
    assert_eq!(session.get("studentName").and_then(|v| v.as_str()), Some(""));
}
