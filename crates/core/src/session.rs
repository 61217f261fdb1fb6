//! Per-session aggregate state.

use serde::Serialize;

use crate::id::AnalysisId;
use crate::stage::{AudioResult, FinalResult, MetadataResult, TaskStates, VideoResult};

/// Lifecycle of one analysis session as seen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
	Idle,
	Submitted,
	Connected,
	Reconnecting,
	Completed,
	Failed,
}

impl SessionStatus {
	pub fn is_terminal(self) -> bool {
		matches!(self, SessionStatus::Completed | SessionStatus::Failed)
	}
}

/// Everything known about the active session.
///
/// Owned by the reactor and replaced wholesale on every submission. Mutated
/// only by the aggregator (stage events) and the connection manager
/// (lifecycle events).
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSession {
	id: AnalysisId,
	pub(crate) status: SessionStatus,
	pub(crate) video: Option<VideoResult>,
	pub(crate) audio: Option<AudioResult>,
	pub(crate) metadata: Option<MetadataResult>,
	pub(crate) final_result: Option<FinalResult>,
	pub(crate) task_states: Option<TaskStates>,
	pub(crate) heatmap_url: Option<String>,
	pub(crate) reconnect_attempts: u32,
	pub(crate) in_flight: bool,
	pub(crate) last_error: Option<String>,
}

impl AnalysisSession {
	pub fn new(id: AnalysisId) -> Self {
		Self {
			id,
			status: SessionStatus::Idle,
			video: None,
			audio: None,
			metadata: None,
			final_result: None,
			task_states: None,
			heatmap_url: None,
			reconnect_attempts: 0,
			in_flight: false,
			last_error: None,
		}
	}

	pub fn id(&self) -> &AnalysisId {
		&self.id
	}

	pub fn status(&self) -> SessionStatus {
		self.status
	}

	pub fn video(&self) -> Option<&VideoResult> {
		self.video.as_ref()
	}

	pub fn audio(&self) -> Option<&AudioResult> {
		self.audio.as_ref()
	}

	pub fn metadata(&self) -> Option<&MetadataResult> {
		self.metadata.as_ref()
	}

	pub fn final_result(&self) -> Option<&FinalResult> {
		self.final_result.as_ref()
	}

	pub fn task_states(&self) -> Option<&TaskStates> {
		self.task_states.as_ref()
	}

	/// Absolute heatmap address, once the video stage reported one.
	pub fn heatmap_url(&self) -> Option<&str> {
		self.heatmap_url.as_deref()
	}

	pub fn reconnect_attempts(&self) -> u32 {
		self.reconnect_attempts
	}

	/// Whether new submissions should currently be blocked.
	pub fn in_flight(&self) -> bool {
		self.in_flight
	}

	pub fn last_error(&self) -> Option<&str> {
		self.last_error.as_deref()
	}

	pub fn is_completed(&self) -> bool {
		self.status == SessionStatus::Completed
	}

	/// Applies a connection lifecycle status without leaving a terminal state.
	pub(crate) fn set_link_status(&mut self, status: SessionStatus) {
		if !self.status.is_terminal() {
			self.status = status;
		}
	}

	/// Records a failure and releases the submit gate.
	pub(crate) fn fail(&mut self, message: impl Into<String>) {
		if self.final_result.is_none() {
			self.status = SessionStatus::Failed;
		}
		self.last_error = Some(message.into());
		self.in_flight = false;
	}
}
