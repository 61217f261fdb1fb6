use std::io::Write;
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use serde_json::Value;

fn vidcheck_binary() -> PathBuf {
	let mut path = std::env::current_exe().expect("current_exe should resolve");
	path.pop();
	path.pop();
	path.push("vidcheck");
	path
}

fn run(args: &[&str]) -> Output {
	Command::new(vidcheck_binary())
		.args(args)
		.env_remove("VIDCHECK_BASE_URL")
		.env_remove("RUST_LOG")
		.output()
		.expect("failed to execute vidcheck")
}

fn stdout(output: &Output) -> String {
	String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A loopback port nothing listens on.
fn closed_port() -> u16 {
	let listener = TcpListener::bind("127.0.0.1:0").expect("bind scratch listener");
	let port = listener.local_addr().expect("local addr").port();
	drop(listener);
	port
}

#[test]
fn heatmap_resolves_against_default_base() {
	let output = run(&["heatmap", "./temp/frame_1.jpg"]);
	assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
	assert_eq!(stdout(&output), "http://localhost:8000/temp/frame_1.jpg");
}

#[test]
fn heatmap_base_url_flag_beats_env() {
	let output = Command::new(vidcheck_binary())
		.args(["heatmap", "/static/h.png", "--base-url", "https://flag.example/"])
		.env("VIDCHECK_BASE_URL", "https://env.example")
		.output()
		.expect("failed to execute vidcheck");
	assert!(output.status.success());
	assert_eq!(stdout(&output), "https://flag.example/static/h.png");

	let output = Command::new(vidcheck_binary())
		.args(["heatmap", "/static/h.png"])
		.env("VIDCHECK_BASE_URL", "https://env.example")
		.output()
		.expect("failed to execute vidcheck");
	assert!(output.status.success());
	assert_eq!(stdout(&output), "https://env.example/static/h.png");
}

#[test]
fn heatmap_reads_base_from_config_file() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("vidcheck.json");
	std::fs::write(&path, r#"{ "baseUrl": "https://file.example", "maxReconnectAttempts": 5 }"#).unwrap();

	let output = run(&["heatmap", "frame_2.jpg", "--config", path.to_str().unwrap()]);
	assert!(output.status.success());
	assert_eq!(stdout(&output), "https://file.example/temp/frame_2.jpg");
}

#[test]
fn heatmap_rejects_unknown_config_keys() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("vidcheck.json");
	std::fs::write(&path, r#"{ "baseURL": "https://typo.example" }"#).unwrap();

	let output = run(&["heatmap", "frame_2.jpg", "--config", path.to_str().unwrap()]);
	assert_eq!(output.status.code(), Some(1));
	let stderr = String::from_utf8_lossy(&output.stderr);
	assert!(stderr.contains("CONFIG_ERROR"), "stderr: {stderr}");
}

#[test]
fn heatmap_json_envelope() {
	let output = run(&["heatmap", "https://cdn.example/h.png", "-f", "json"]);
	assert!(output.status.success());

	let envelope: Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
	assert_eq!(envelope["ok"], true);
	assert_eq!(envelope["command"], "heatmap");
	assert_eq!(envelope["data"]["url"], "https://cdn.example/h.png");
}

#[test]
fn normalize_argument_frame() {
	let output = run(&["normalize", r#"{"stage":"video_complete","result":{"video_score":0.8,"status":"Real"}}"#, "-f", "json"]);
	assert!(output.status.success());

	let line: Value = serde_json::from_str(&stdout(&output)).unwrap();
	assert_eq!(line["ok"], true);
	assert_eq!(line["event"]["event"], "video_complete");
	assert_eq!(line["event"]["score"], 0.8);
}

#[test]
fn normalize_invalid_argument_fails() {
	let output = run(&["normalize", "not json", "-f", "json"]);
	assert_eq!(output.status.code(), Some(1));

	let line: Value = serde_json::from_str(&stdout(&output)).unwrap();
	assert_eq!(line["ok"], false);
	let stderr = String::from_utf8_lossy(&output.stderr);
	assert!(stderr.contains("PROTOCOL_ERROR"), "stderr: {stderr}");
}

#[test]
fn normalize_rejects_wrapped_frame_without_result() {
	let output = run(&["normalize", r#"{"stage":"final"}"#, "-f", "json"]);
	assert_eq!(output.status.code(), Some(1));

	let line: Value = serde_json::from_str(&stdout(&output)).unwrap();
	assert_eq!(line["ok"], false);
	assert!(line["error"].as_str().unwrap().contains("no `result`"), "line: {line}");
}

#[test]
fn normalize_reads_stdin_lines() {
	let mut child = Command::new(vidcheck_binary())
		.args(["normalize", "-f", "json"])
		.stdin(Stdio::piped())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.spawn()
		.expect("spawn vidcheck");

	{
		let stdin = child.stdin.as_mut().unwrap();
		writeln!(stdin, r#"{{"type":"audio","audio_score":0.25}}"#).unwrap();
		writeln!(stdin).unwrap();
		writeln!(stdin, "{{").unwrap();
		writeln!(stdin, r#"{{"stage":"heartbeat"}}"#).unwrap();
	}
	let output = child.wait_with_output().unwrap();
	assert!(output.status.success(), "bad lines are reported inline");

	let lines: Vec<Value> = stdout(&output).lines().map(|line| serde_json::from_str(line).unwrap()).collect();
	assert_eq!(lines.len(), 3);
	assert_eq!(lines[0]["event"]["event"], "audio_complete");
	assert_eq!(lines[1]["ok"], false);
	assert_eq!(lines[2]["ignored"], true);
}

#[test]
fn analyze_without_input_fails_validation() {
	let output = run(&["analyze"]);
	assert_eq!(output.status.code(), Some(1));

	let stderr = String::from_utf8_lossy(&output.stderr);
	assert!(stderr.contains("Provide a video URL or upload a file."), "stderr: {stderr}");
	assert!(stderr.contains("INVALID_INPUT"), "stderr: {stderr}");
}

#[test]
fn analyze_reports_unreachable_backend() {
	let base = format!("http://127.0.0.1:{}", closed_port());
	let output = run(&["analyze", "--url", "https://videos.example/clip.mp4", "--base-url", &base, "-f", "json"]);
	assert_eq!(output.status.code(), Some(1));

	let envelope: Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
	assert_eq!(envelope["ok"], false);
	assert_eq!(envelope["command"], "analyze");
	assert_eq!(envelope["error"]["code"], "SUBMISSION_FAILED");
	assert_eq!(envelope["data"]["session"]["status"], "failed");
	assert!(envelope["data"].get("streamUrl").is_none());
}
