//! Per-stage result types.

use std::fmt;

use serde::Serialize;

/// Verdict used when a final result carries none.
pub const DEFAULT_VERDICT: &str = "Suspicious";

/// The four stages a session tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
	Video,
	Audio,
	Metadata,
	Final,
}

impl Stage {
	pub fn as_str(self) -> &'static str {
		match self {
			Stage::Video => "video",
			Stage::Audio => "audio",
			Stage::Metadata => "metadata",
			Stage::Final => "final",
		}
	}
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A detection score, always finite and within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Score(f64);

impl Score {
	/// Returns `None` for non-finite or out-of-range values.
	pub fn new(value: f64) -> Option<Self> {
		(value.is_finite() && (0.0..=1.0).contains(&value)).then_some(Self(value))
	}

	pub fn value(self) -> f64 {
		self.0
	}
}

impl fmt::Display for Score {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:.2}", self.0)
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VideoResult {
	pub score: Option<Score>,
	pub status: Option<String>,
	/// Heatmap reference exactly as the backend sent it.
	pub heatmap: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AudioResult {
	pub score: Option<Score>,
	pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetadataResult {
	pub score: Option<Score>,
	pub recycled: Option<bool>,
}

impl MetadataResult {
	/// `Recycled` / `Original`, or `None` when the backend did not say.
	pub fn recycled_label(&self) -> Option<&'static str> {
		self.recycled.map(|recycled| if recycled { "Recycled" } else { "Original" })
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalResult {
	pub score: Option<Score>,
	pub verdict: String,
}

/// Best-effort textual state of each worker task; `?` when unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskStates {
	pub video: String,
	pub audio: String,
	pub metadata: String,
}

impl fmt::Display for TaskStates {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "video={}, audio={}, metadata={}", self.video, self.audio, self.metadata)
	}
}

/// A stage value handed to the display sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageResult {
	Video(VideoResult),
	Audio(AudioResult),
	Metadata(MetadataResult),
	Final(FinalResult),
}

impl StageResult {
	pub fn stage(&self) -> Stage {
		match self {
			StageResult::Video(_) => Stage::Video,
			StageResult::Audio(_) => Stage::Audio,
			StageResult::Metadata(_) => Stage::Metadata,
			StageResult::Final(_) => Stage::Final,
		}
	}

	pub fn score(&self) -> Option<Score> {
		match self {
			StageResult::Video(r) => r.score,
			StageResult::Audio(r) => r.score,
			StageResult::Metadata(r) => r.score,
			StageResult::Final(r) => r.score,
		}
	}

	/// Status-like text for the stage: worker status, recycled label, or verdict.
	pub fn label(&self) -> Option<&str> {
		match self {
			StageResult::Video(r) => r.status.as_deref(),
			StageResult::Audio(r) => r.status.as_deref(),
			StageResult::Metadata(r) => r.recycled_label(),
			StageResult::Final(r) => Some(r.verdict.as_str()),
		}
	}
}
