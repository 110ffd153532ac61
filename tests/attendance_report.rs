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
fn half_the_class_participating_is_fifty_percent() {
    let workspace = temp_dir("pollroom-attendance");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "assessments.create",
        json!({
            "question": "Did you do the reading?",
            "options": ["Yes", "No"],
            "timeLimitSeconds": 20
        }),
    );
    let id = created
        .get("assessment")
        .and_then(|a| a.get("id"))
        .and_then(|v| v.as_str())
        .expect("assessment id")
        .to_string();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "assessments.start",
        json!({ "assessmentId": id }),
    );

    for (req_id, name) in [("4", "Ana"), ("5", "Ben"), ("6", "Cho"), ("7", "Dee")] {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            req_id,
            "session.join",
            json!({ "studentName": name }),
        );
    }
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "answers.submit",
        json!({ "assessmentId": id, "option": "Yes", "studentName": "Ana" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "answers.submit",
        json!({ "assessmentId": id, "option": "No", "studentName": "Ben" }),
    );

    let attendance = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "attendance.get",
        json!({ "assessmentId": id }),
    );
    assert_eq!(attendance.get("totalStudents").and_then(|v| v.as_u64()), Some(4));
    assert_eq!(
        attendance.get("participatedStudents").and_then(|v| v.as_u64()),
        Some(2)
    );
    assert_eq!(attendance.get("attendanceRate").and_then(|v| v.as_u64()), Some(50));

    let rows = attendance
        .get("studentList")
        .and_then(|v| v.as_array())
        .expect("studentList");
    assert_eq!(rows.len(), 4);
    let row = |name: &str| {
        rows.iter()
            .find(|r| r.get("name").and_then(|v| v.as_str()) == Some(name))
            .expect("student row")
    };
    assert_eq!(row("Ana").get("participated").and_then(|v| v.as_bool()), Some(true));
    assert!(row("Ana").get("answeredAt").and_then(|v| v.as_str()).is_some());
    assert_eq!(row("Cho").get("participated").and_then(|v| v.as_bool()), Some(false));
    assert!(row("Cho").get("answeredAt").map(|v| v.is_null()).unwrap_or(true));
}

#[test]
fn rejoining_keeps_a_single_roster_entry() {
    let workspace = temp_dir("pollroom-rejoin");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    for req_id in ["2", "3", "4"] {
        let joined = request_ok(
            &mut stdin,
            &mut reader,
            req_id,
            "session.join",
            json!({ "studentName": "Ana" }),
        );
        assert_eq!(joined.get("totalStudents").and_then(|v| v.as_u64()), Some(1));
    }

    // Names are case-sensitive: "ana" is a different student.
    let joined = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "session.join",
        json!({ "studentName": "ana" }),
    );
    assert_eq!(joined.get("totalStudents").and_then(|v| v.as_u64()), Some(2));
}
