//! End-to-end tests driving the compiled `tl` binary.
//!
//! Covers request printing, offline transformation of saved responses, and
//! failure reporting when the query API is unreachable.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn tl_binary() -> String {
    env!("CARGO_BIN_EXE_tl").to_string()
}

/// Run `tl` with an isolated home so no user config leaks in.
fn run_tl(home: &Path, args: &[&str]) -> Output {
    Command::new(tl_binary())
        .env("HOME", home)
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("TL_API_BASE_URL")
        .env_remove("TL_API_TOKEN")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("failed to run tl")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "tl should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_query_prints_session_trace_filters() {
    let temp = TempDir::new().unwrap();
    let output = run_tl(
        temp.path(),
        &[
            "query",
            "--session",
            "sess-1",
            "--trace",
            "trace-7",
            "--start",
            "2025-01-01T00:00:00Z",
            "--end",
            "2025-01-02T00:00:00Z",
        ],
    );

    let json = stdout_json(&output);
    assert_eq!(json["dataType"], "TRACES");
    assert_eq!(json["timeRange"]["start"], "2025-01-01T00:00:00.000Z");
    assert_eq!(json["timeRange"]["end"], "2025-01-02T00:00:00.000Z");
    assert_eq!(
        json["filters"],
        serde_json::json!([
            {"field": "SessionId", "operator": "EQ", "value": ["sess-1"]},
            {"field": "TraceId", "operator": "EQ", "value": ["trace-7"]},
        ])
    );
}

#[test]
fn test_query_interaction_takes_precedence_and_is_escaped() {
    let temp = TempDir::new().unwrap();
    let output = run_tl(
        temp.path(),
        &[
            "query",
            "--data-type",
            "logs",
            "--session",
            "sess-1",
            "--trace",
            "ignored",
            "--interaction",
            "it's_50%",
        ],
    );

    let json = stdout_json(&output);
    assert_eq!(json["dataType"], "LOGS");
    let filters = json["filters"].as_array().unwrap();
    assert_eq!(filters.len(), 2);
    assert_eq!(filters[1]["operator"], "ADDITIONAL");
    let expression = filters[1]["value"][0].as_str().unwrap();
    assert!(expression.starts_with("LogAttributes['pulse.interaction.ids']"));
    assert!(expression.contains(r"LIKE '%it''s\_50\%%'"));
    assert!(expression.ends_with("TraceId = 'it''s_50%'"));
}

#[test]
fn test_query_rejects_blank_session() {
    let temp = TempDir::new().unwrap();
    let output = run_tl(temp.path(), &["query", "--session", "   "]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--session"));
}

#[test]
fn test_transform_outputs_sorted_json_timeline() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("traces.json");
    std::fs::write(
        &input,
        r#"{
            "fields": ["spanid", "spanname", "timestamp", "error_type", "os_name"],
            "rows": [
                ["b", "crash", "2025-01-15T09:00:01.500Z", "Crash: NPE", "Android"],
                ["a", "start", "2025-01-15T09:00:00.000Z", null, "Android"]
            ]
        }"#,
    )
    .unwrap();

    let output = run_tl(
        temp.path(),
        &[
            "transform",
            "--input",
            input.to_str().unwrap(),
            "--session",
            "sess-42",
            "--json",
        ],
    );

    let json = stdout_json(&output);
    let summary = &json["summary"];
    assert_eq!(summary["sessionId"], "sess-42");
    assert_eq!(summary["platform"], "android");
    assert_eq!(summary["status"], "crashed");
    assert_eq!(summary["crashes"], 1);
    assert_eq!(summary["duration"], 0);
    assert_eq!(summary["totalEvents"], 2);

    // The first row anchors the session, so the earlier row clamps to zero
    // and sorts after it.
    let ids: Vec<&str> = json["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|event| event["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["b", "a"]);
    assert!(
        json["events"]
            .as_array()
            .unwrap()
            .iter()
            .all(|event| event["timestamp"] == 0)
    );
}

#[test]
fn test_transform_empty_response() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("empty.json");
    std::fs::write(&input, r#"{"data":null,"error":null,"status":200}"#).unwrap();

    let output = run_tl(
        temp.path(),
        &["transform", "--input", input.to_str().unwrap(), "--json"],
    );

    let json = stdout_json(&output);
    assert_eq!(
        json["summary"],
        serde_json::json!({
            "sessionId": "unknown",
            "platform": "unknown",
            "status": "completed",
            "duration": 0,
            "crashes": 0,
            "anrs": 0,
            "frozenFrames": 0,
            "totalEvents": 0,
            "signals": {
                "rowCrashes": 0,
                "rowAnrs": 0,
                "classifiedCrashes": 0,
                "classifiedAnrs": 0,
                "classifiedFrozenFrames": 0
            }
        })
    );
    assert_eq!(json["events"], serde_json::json!([]));
}

#[test]
fn test_transform_kind_filter() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("traces.json");
    std::fs::write(
        &input,
        r#"{"fields":["spanid","spanname","frozen_frame"],"rows":[["a","feed",2],["b","GET request",0]]}"#,
    )
    .unwrap();

    let output = run_tl(
        temp.path(),
        &[
            "transform",
            "--input",
            input.to_str().unwrap(),
            "--kind",
            "trace",
            "--json",
        ],
    );

    let json = stdout_json(&output);
    assert_eq!(json["summary"]["totalEvents"], 2);
    assert_eq!(json["summary"]["frozenFrames"], 1);
    let events = json["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["type"], "trace");
}

#[test]
fn test_timeline_reports_unreachable_api() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("tl.toml");
    std::fs::write(
        &config,
        "api_base_url = \"http://127.0.0.1:9\"\ntimeout_secs = 2\n",
    )
    .unwrap();

    let output = run_tl(
        temp.path(),
        &[
            "--config",
            config.to_str().unwrap(),
            "timeline",
            "--session",
            "sess-1",
        ],
    );

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to fetch session"));
}
