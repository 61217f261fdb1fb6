//! Message normalizer: wire frames to canonical stage events.
//!
//! Shape discrimination happens once, in [`vidcheck_protocol::Frame`]. This
//! module only reads fields out of the already-discriminated body, tolerating
//! the name variants the backend is known to send.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use vidcheck_protocol::{AnalyzeAck, FlatKind, Frame, FrameError, WrappedStage};

use crate::stage::{AudioResult, DEFAULT_VERDICT, FinalResult, MetadataResult, Score, TaskStates, VideoResult};

/// Message used when a wrapped `error` frame carries none.
pub const DEFAULT_SERVER_ERROR: &str = "Analysis failed.";

const UNKNOWN_TASK_STATE: &str = "?";

/// Canonical event produced from either wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StageEvent {
	VideoComplete(VideoResult),
	AudioComplete(AudioResult),
	MetadataComplete(MetadataResult),
	Final(FinalResult),
	TaskStateSnapshot(TaskStates),
	ServerError { message: String },
}

/// Where a final event's score may come from.
#[derive(Debug, Clone, Copy)]
enum FinalScore {
	/// Flat frames read `final_score` only.
	FinalOnly,
	/// Wrapped frames and inline acks fall back to `score`.
	FinalThenScore,
}

/// Normalizes one raw text frame.
///
/// `Ok(None)` means the frame was well-formed but carried a discriminator this
/// client does not act on.
pub fn normalize(raw: &str) -> Result<Option<StageEvent>, FrameError> {
	Frame::parse(raw).map(normalize_frame)
}

/// Normalizes an already-discriminated frame.
pub fn normalize_frame(frame: Frame) -> Option<StageEvent> {
	match frame {
		Frame::Flat { kind, fields } => Some(match kind {
			FlatKind::Video => StageEvent::VideoComplete(video(&fields)),
			FlatKind::Audio => StageEvent::AudioComplete(audio(&fields)),
			FlatKind::Metadata => StageEvent::MetadataComplete(metadata(&fields)),
			FlatKind::Final => StageEvent::Final(final_result(&fields, FinalScore::FinalOnly, false)),
		}),
		Frame::Wrapped { stage, result } => Some(match stage {
			WrappedStage::VideoComplete => StageEvent::VideoComplete(video(&result)),
			WrappedStage::AudioComplete => StageEvent::AudioComplete(audio(&result)),
			WrappedStage::MetadataComplete => StageEvent::MetadataComplete(metadata(&result)),
			WrappedStage::Final => StageEvent::Final(final_result(&result, FinalScore::FinalThenScore, false)),
			WrappedStage::TaskState => StageEvent::TaskStateSnapshot(task_states(&result)),
			WrappedStage::Error => StageEvent::ServerError {
				message: text(&result, "message").unwrap_or_else(|| DEFAULT_SERVER_ERROR.to_string()),
			},
		}),
		Frame::Unrecognized { discriminator } => {
			debug!(target = "vidcheck.normalize", %discriminator, "ignoring unrecognized frame");
			None
		}
	}
}

/// Events carried inline by an `/analyze` acknowledgement, in stage order.
///
/// Inline results use the flat field names, except `final`, whose verdict may
/// also come from `status` and whose score may come from `score`.
pub fn normalize_inline(ack: &AnalyzeAck) -> Vec<StageEvent> {
	let mut events = Vec::new();

	if let Some(fields) = inline_object("video_result", ack.video_result.as_ref()) {
		events.push(StageEvent::VideoComplete(video(fields)));
	}
	if let Some(fields) = inline_object("audio_result", ack.audio_result.as_ref()) {
		events.push(StageEvent::AudioComplete(audio(fields)));
	}
	if let Some(fields) = inline_object("metadata_result", ack.metadata_result.as_ref()) {
		events.push(StageEvent::MetadataComplete(metadata(fields)));
	}
	if let Some(fields) = inline_object("final", ack.final_result.as_ref()) {
		events.push(StageEvent::Final(final_result(fields, FinalScore::FinalThenScore, true)));
	}

	events
}

fn inline_object<'a>(field: &str, value: Option<&'a Value>) -> Option<&'a Map<String, Value>> {
	match value? {
		Value::Null => None,
		Value::Object(fields) => Some(fields),
		other => {
			warn!(target = "vidcheck.normalize", field, value = %other, "inline result is not an object; skipping");
			None
		}
	}
}

fn video(fields: &Map<String, Value>) -> VideoResult {
	VideoResult {
		score: score(fields, "video_score"),
		status: text(fields, "status"),
		heatmap: text(fields, "heatmap"),
	}
}

fn audio(fields: &Map<String, Value>) -> AudioResult {
	let raw = number(fields, "audio_probability").or_else(|| number(fields, "audio_score"));
	AudioResult {
		score: raw.and_then(Score::new),
		status: text(fields, "status"),
	}
}

fn metadata(fields: &Map<String, Value>) -> MetadataResult {
	MetadataResult {
		score: score(fields, "metadata_score"),
		recycled: fields.get("recycled").and_then(Value::as_bool),
	}
}

fn final_result(fields: &Map<String, Value>, source: FinalScore, status_is_verdict: bool) -> FinalResult {
	let raw = match source {
		FinalScore::FinalOnly => number(fields, "final_score"),
		FinalScore::FinalThenScore => number(fields, "final_score").or_else(|| number(fields, "score")),
	};
	let verdict = text(fields, "verdict")
		.or_else(|| status_is_verdict.then(|| text(fields, "status")).flatten())
		.unwrap_or_else(|| DEFAULT_VERDICT.to_string());

	FinalResult {
		score: raw.and_then(Score::new),
		verdict,
	}
}

fn task_states(fields: &Map<String, Value>) -> TaskStates {
	let state = |key| text(fields, key).unwrap_or_else(|| UNKNOWN_TASK_STATE.to_string());
	TaskStates {
		video: state("video"),
		audio: state("audio"),
		metadata: state("metadata"),
	}
}

fn number(fields: &Map<String, Value>, key: &str) -> Option<f64> {
	fields.get(key).and_then(Value::as_f64)
}

fn score(fields: &Map<String, Value>, key: &str) -> Option<Score> {
	number(fields, key).and_then(Score::new)
}

fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
	fields.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}
