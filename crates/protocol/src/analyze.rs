//! `/analyze` request and acknowledgement bodies.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// JSON body for URL submissions.
///
/// ```json
/// { "video_url": "https://example.com/clip.mp4", "analysis_id": "9b2f..." }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
	pub video_url: String,
	pub analysis_id: String,
}

/// Multipart field names used for file submissions.
pub const MULTIPART_FILE_FIELD: &str = "file";
pub const MULTIPART_ID_FIELD: &str = "analysis_id";

/// Acknowledgement returned by a successful `/analyze` call.
///
/// Every field is optional on the wire; [`AnalyzeAck::task_ids`] enforces the
/// three required task identifiers. Task ids are accepted as strings or
/// numbers, and empty strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnalyzeAck {
	#[serde(default, deserialize_with = "id_like")]
	pub analysis_id: Option<String>,
	#[serde(default, deserialize_with = "id_like")]
	pub video_task_id: Option<String>,
	#[serde(default, deserialize_with = "id_like")]
	pub audio_task_id: Option<String>,
	#[serde(default, deserialize_with = "id_like")]
	pub metadata_task_id: Option<String>,
	#[serde(default)]
	pub video_result: Option<Value>,
	#[serde(default)]
	pub audio_result: Option<Value>,
	#[serde(default)]
	pub metadata_result: Option<Value>,
	#[serde(default, rename = "final")]
	pub final_result: Option<Value>,
}

impl AnalyzeAck {
	/// Returns the handshake triple, or `None` when any id is missing.
	pub fn task_ids(&self) -> Option<TaskIds> {
		Some(TaskIds {
			video_task_id: self.video_task_id.clone()?,
			audio_task_id: self.audio_task_id.clone()?,
			metadata_task_id: self.metadata_task_id.clone()?,
		})
	}
}

/// Handshake payload sent as the first outbound stream frame after each open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskIds {
	pub video_task_id: String,
	pub audio_task_id: String,
	pub metadata_task_id: String,
}

fn id_like<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Option::<Value>::deserialize(deserializer)?;
	Ok(match value {
		Some(Value::String(s)) if !s.is_empty() => Some(s),
		Some(Value::Number(n)) => Some(n.to_string()),
		_ => None,
	})
}
