//! Inbound stream frames.
//!
//! The backend emits two shapes for the same information:
//!
//! Shape A ("flat"), fields at top level:
//! ```json
//! { "type": "video", "video_score": 0.8, "status": "Real", "heatmap": "frame_1.jpg" }
//! ```
//!
//! Shape B ("wrapped"), fields nested under `result`:
//! ```json
//! { "stage": "video_complete", "result": { "video_score": 0.8, "status": "Real" } }
//! ```
//!
//! [`Frame::from_value`] is the single place where the two shapes are told
//! apart. A known `type` wins over `stage`, matching what the backend's
//! first-party web client does.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Discriminator values of the flat shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlatKind {
	Video,
	Audio,
	Metadata,
	Final,
}

impl FlatKind {
	pub fn from_wire(value: &str) -> Option<Self> {
		match value {
			"video" => Some(Self::Video),
			"audio" => Some(Self::Audio),
			"metadata" => Some(Self::Metadata),
			"final" => Some(Self::Final),
			_ => None,
		}
	}
}

/// Discriminator values of the wrapped shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrappedStage {
	VideoComplete,
	AudioComplete,
	MetadataComplete,
	Final,
	TaskState,
	Error,
}

impl WrappedStage {
	pub fn from_wire(value: &str) -> Option<Self> {
		match value {
			"video_complete" => Some(Self::VideoComplete),
			"audio_complete" => Some(Self::AudioComplete),
			"metadata_complete" => Some(Self::MetadataComplete),
			"final" => Some(Self::Final),
			"task_state" => Some(Self::TaskState),
			"error" => Some(Self::Error),
			_ => None,
		}
	}
}

/// One inbound frame, discriminated by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
	/// Shape A. `fields` is the frame object minus its `type` key.
	Flat { kind: FlatKind, fields: Map<String, Value> },
	/// Shape B. A missing or null `result` reads as an empty object.
	Wrapped { stage: WrappedStage, result: Map<String, Value> },
	/// A well-formed frame whose discriminator this client does not know.
	Unrecognized { discriminator: String },
}

/// Why a frame could not be assigned to either shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
	#[error("frame is not valid JSON: {0}")]
	Malformed(String),
	#[error("frame is not a JSON object")]
	NotAnObject,
	#[error("frame carries neither `type` nor `stage`")]
	NoDiscriminator,
	#[error("wrapped frame carries no `result`")]
	MissingResult,
	#[error("wrapped frame `result` is not an object")]
	InvalidResult,
}

impl Frame {
	/// Parses a raw text frame.
	pub fn parse(raw: &str) -> Result<Self, FrameError> {
		let value: Value = serde_json::from_str(raw).map_err(|e| FrameError::Malformed(e.to_string()))?;
		Self::from_value(value)
	}

	/// Assigns an already-decoded JSON value to a shape.
	pub fn from_value(value: Value) -> Result<Self, FrameError> {
		let Value::Object(mut map) = value else {
			return Err(FrameError::NotAnObject);
		};

		if let Some(kind) = map.get("type").and_then(Value::as_str).and_then(FlatKind::from_wire) {
			map.remove("type");
			return Ok(Frame::Flat { kind, fields: map });
		}

		if let Some(stage) = map.get("stage").and_then(Value::as_str) {
			let Some(stage) = WrappedStage::from_wire(stage) else {
				return Ok(Frame::Unrecognized {
					discriminator: stage.to_string(),
				});
			};
			let result = match map.remove("result") {
				None | Some(Value::Null) => return Err(FrameError::MissingResult),
				Some(Value::Object(result)) => result,
				Some(_) => return Err(FrameError::InvalidResult),
			};
			return Ok(Frame::Wrapped { stage, result });
		}

		match map.get("type").and_then(Value::as_str) {
			Some(other) => Ok(Frame::Unrecognized {
				discriminator: other.to_string(),
			}),
			None => Err(FrameError::NoDiscriminator),
		}
	}
}
