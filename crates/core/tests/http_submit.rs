//! HttpSubmitter against a local axum backend.

use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use vidcheck::{Acknowledgement, AnalysisId, AnalysisInput, ClientConfig, Error, HttpSubmitter, Submitter, VideoFile};

async fn serve(app: Router) -> ClientConfig {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		axum::serve(listener, app).await.unwrap();
	});
	ClientConfig::new(&format!("http://{addr}")).unwrap()
}

async fn echo_json(Json(body): Json<Value>) -> Json<Value> {
	Json(json!({
		"analysis_id": body["analysis_id"],
		"video_task_id": body["video_url"],
		"audio_task_id": "a-1",
		"metadata_task_id": 7
	}))
}

async fn echo_multipart(mut multipart: Multipart) -> Json<Value> {
	let mut seen = serde_json::Map::new();
	while let Some(field) = multipart.next_field().await.unwrap() {
		let name = field.name().unwrap_or_default().to_string();
		if name == "file" {
			seen.insert("file_name".into(), json!(field.file_name()));
			seen.insert("content_type".into(), json!(field.content_type()));
			seen.insert("len".into(), json!(field.bytes().await.unwrap().len()));
		} else {
			seen.insert(name, json!(field.text().await.unwrap()));
		}
	}
	Json(json!({
		"analysis_id": seen.get("analysis_id"),
		"video_task_id": seen.get("file_name"),
		"audio_task_id": seen.get("content_type"),
		"metadata_task_id": seen.get("len"),
	}))
}

#[tokio::test]
async fn url_submission_posts_json_body() {
	let config = serve(Router::new().route("/analyze", post(echo_json))).await;
	let submitter = HttpSubmitter::new(&config).unwrap();
	let id = AnalysisId::generate();

	let ack = submitter
		.submit(&AnalysisInput::Url("https://videos.test/a.mp4".into()), &id)
		.await
		.unwrap();
	let accepted = Acknowledgement::try_from(ack).unwrap();

	assert_eq!(accepted.analysis_id.as_ref(), Some(&id));
	assert_eq!(accepted.task_ids.video_task_id, "https://videos.test/a.mp4");
	assert_eq!(accepted.task_ids.metadata_task_id, "7");
	assert!(accepted.inline.is_empty());
}

#[tokio::test]
async fn file_submission_uses_multipart_form() {
	let config = serve(Router::new().route("/analyze", post(echo_multipart))).await;
	let submitter = HttpSubmitter::new(&config).unwrap();
	let id = AnalysisId::generate();
	let file = VideoFile::new("clip.webm", vec![0u8; 1024]);

	let ack = submitter.submit(&AnalysisInput::File(file), &id).await.unwrap();

	assert_eq!(ack.analysis_id.as_deref(), Some(id.as_str()));
	assert_eq!(ack.video_task_id.as_deref(), Some("clip.webm"));
	assert_eq!(ack.audio_task_id.as_deref(), Some("video/webm"));
	assert_eq!(ack.metadata_task_id.as_deref(), Some("1024"));
}

#[tokio::test]
async fn non_success_status_carries_body() {
	let app = Router::new().route("/analyze", post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "workers busy") }));
	let config = serve(app).await;
	let submitter = HttpSubmitter::new(&config).unwrap();

	let err = submitter
		.submit(&AnalysisInput::Url("https://videos.test/a.mp4".into()), &AnalysisId::generate())
		.await
		.unwrap_err();

	match err {
		Error::Submission { status, body } => {
			assert_eq!(status, 503);
			assert_eq!(body, "workers busy");
		}
		other => panic!("expected submission error, got {other:?}"),
	}
}

#[tokio::test]
async fn non_json_success_is_a_protocol_error() {
	let app = Router::new().route("/analyze", post(|| async { "queued!" }));
	let config = serve(app).await;
	let submitter = HttpSubmitter::new(&config).unwrap();

	let err = submitter
		.submit(&AnalysisInput::Url("https://videos.test/a.mp4".into()), &AnalysisId::generate())
		.await
		.unwrap_err();
	assert!(matches!(err, Error::Protocol(_)), "{err:?}");
}

#[tokio::test]
async fn null_body_reads_as_missing_task_ids() {
	let app = Router::new().route("/analyze", post(|| async { Json(Value::Null) }));
	let config = serve(app).await;
	let submitter = HttpSubmitter::new(&config).unwrap();

	let ack = submitter
		.submit(&AnalysisInput::Url("https://videos.test/a.mp4".into()), &AnalysisId::generate())
		.await
		.unwrap();
	let err = Acknowledgement::try_from(ack).unwrap_err();
	assert_eq!(err.to_string(), "Protocol error: missing task ids");
}
