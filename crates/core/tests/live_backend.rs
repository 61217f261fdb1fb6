//! End to end: HTTP submission and WebSocket stream against one axum server.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use vidcheck::link::CloseReason;
use vidcheck::{
	AnalysisInput, ClientConfig, ConnectionLabel, DisplaySink, LinkState, ReconnectPolicy, SessionClient, SessionStatus, Stage, StageResult,
};

#[derive(Default)]
struct Backend {
	stream_ids: Vec<String>,
	handshakes: Vec<Value>,
}

type Shared = Arc<Mutex<Backend>>;

#[derive(Default)]
struct Labels {
	labels: Vec<ConnectionLabel>,
	heatmaps: Vec<String>,
}

impl DisplaySink for Labels {
	fn set_stage(&mut self, _stage: Stage, _value: &StageResult) {}
	fn set_progress(&mut self, _text: &str, _percent: u8) {}
	fn set_connection_state(&mut self, label: ConnectionLabel) {
		self.labels.push(label);
	}
	fn show_error(&mut self, _message: &str) {}
	fn show_heatmap(&mut self, resolved: &str) {
		self.heatmaps.push(resolved.to_string());
	}
	fn set_submit_enabled(&mut self, _enabled: bool) {}
}

async fn analyze(Json(body): Json<Value>) -> Json<Value> {
	Json(json!({
		"analysis_id": body["analysis_id"],
		"video_task_id": "v-1",
		"audio_task_id": "a-1",
		"metadata_task_id": "m-1"
	}))
}

async fn stream(ws: WebSocketUpgrade, Path(id): Path<String>, State(shared): State<Shared>) -> Response {
	shared.lock().stream_ids.push(id);
	ws.on_upgrade(move |socket| play(socket, shared))
}

async fn play(mut socket: WebSocket, shared: Shared) {
	let Some(Ok(Message::Text(first))) = socket.recv().await else {
		return;
	};
	let handshake: Value = serde_json::from_str(first.as_str()).unwrap_or(Value::Null);
	shared.lock().handshakes.push(handshake);

	let frames = [
		json!({ "stage": "task_state", "result": { "video": "STARTED", "audio": "PENDING", "metadata": "PENDING" } }),
		json!({ "type": "video", "video_score": 0.71, "status": "Fake", "heatmap": "./temp/heat.jpg" }),
		json!({ "stage": "audio_complete", "result": { "audio_score": 0.2, "status": "Real" } }),
		json!({ "type": "metadata", "metadata_score": 0.5, "recycled": true }),
		json!({ "stage": "final", "result": { "final_score": 0.64, "verdict": "Fake" } }),
	];
	for frame in frames {
		if socket.send(Message::Text(frame.to_string().into())).await.is_err() {
			return;
		}
	}
	let _ = socket.send(Message::Close(None)).await;
}

async fn serve() -> (ClientConfig, Shared) {
	let shared = Shared::default();
	let app = Router::new()
		.route("/analyze", post(analyze))
		.route("/ws/{id}", get(stream))
		.with_state(shared.clone());

	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		axum::serve(listener, app).await.unwrap();
	});

	let config = ClientConfig::new(&format!("http://{addr}"))
		.unwrap()
		.with_reconnect(ReconnectPolicy {
			max_attempts: 3,
			base_delay: Duration::from_millis(20),
		});
	(config, shared)
}

#[tokio::test]
async fn full_analysis_over_http_and_websocket() {
	let (config, shared) = serve().await;
	let base = config.base().to_string();
	let mut client = SessionClient::new(config, Labels::default()).unwrap();

	client
		.submit(AnalysisInput::Url("https://videos.test/clip.mp4".into()))
		.await
		.unwrap();
	let status = tokio::time::timeout(Duration::from_secs(10), client.run_until_settled())
		.await
		.unwrap();
	assert_eq!(status, Some(SessionStatus::Completed));

	// The server hangs up after the final frame; that must not trigger a reconnect.
	while !client.link_state().is_closed() {
		let stepped = tokio::time::timeout(Duration::from_secs(10), client.step()).await.unwrap();
		assert!(stepped);
	}
	assert_eq!(client.link_state(), LinkState::Closed(CloseReason::Completed));

	let session = client.session().unwrap();
	let final_result = session.final_result().unwrap();
	assert_eq!(final_result.verdict, "Fake");
	assert_eq!(final_result.score.map(|s| s.value()), Some(0.64));
	assert_eq!(session.metadata().unwrap().recycled, Some(true));
	assert_eq!(session.task_states().unwrap().video, "STARTED");
	assert_eq!(session.heatmap_url(), Some(format!("{base}/temp/heat.jpg").as_str()));

	let backend = shared.lock();
	assert_eq!(backend.stream_ids, vec![session.id().to_string()]);
	assert_eq!(
		backend.handshakes,
		vec![json!({ "video_task_id": "v-1", "audio_task_id": "a-1", "metadata_task_id": "m-1" })]
	);

	let labels = &client.sink().labels;
	assert_eq!(labels.first(), Some(&ConnectionLabel::Idle));
	assert!(labels.contains(&ConnectionLabel::Connected));
	assert_eq!(labels.last(), Some(&ConnectionLabel::Completed));
	assert!(!labels.contains(&ConnectionLabel::Reconnecting));
	assert_eq!(client.sink().heatmaps.len(), 1);
}
