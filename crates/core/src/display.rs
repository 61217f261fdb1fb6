//! Display sink contract and presentation helpers.
//!
//! The session client never renders anything itself. It pushes normalized
//! state into a [`DisplaySink`] implemented by the front end (terminal, GUI,
//! test recorder).

use std::fmt;

use serde::Serialize;

use crate::id::AnalysisId;
use crate::stage::{Score, Stage, StageResult};

/// Placeholder rendered for absent values.
pub const PLACEHOLDER: &str = "-";

/// Connection state label shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionLabel {
	Idle,
	Connecting,
	Connected,
	Reconnecting,
	Completed,
	Disconnected,
	Error,
}

impl ConnectionLabel {
	pub fn as_str(self) -> &'static str {
		match self {
			ConnectionLabel::Idle => "Idle",
			ConnectionLabel::Connecting => "Connecting",
			ConnectionLabel::Connected => "Connected",
			ConnectionLabel::Reconnecting => "Reconnecting",
			ConnectionLabel::Completed => "Completed",
			ConnectionLabel::Disconnected => "Disconnected",
			ConnectionLabel::Error => "Error",
		}
	}

	pub fn tone(self) -> Tone {
		match self {
			ConnectionLabel::Connected => Tone::Good,
			ConnectionLabel::Disconnected | ConnectionLabel::Error => Tone::Bad,
			ConnectionLabel::Connecting | ConnectionLabel::Reconnecting => Tone::Warn,
			ConnectionLabel::Idle | ConnectionLabel::Completed => Tone::Neutral,
		}
	}
}

impl fmt::Display for ConnectionLabel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Coarse sentiment of a status, verdict or label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tone {
	Good,
	Bad,
	Warn,
	Neutral,
}

impl Tone {
	/// `Good` for text mentioning "real", `Bad` for "fake", `Warn` otherwise.
	pub fn classify(text: &str) -> Self {
		let lower = text.to_lowercase();
		if lower.contains("real") {
			Tone::Good
		} else if lower.contains("fake") {
			Tone::Bad
		} else {
			Tone::Warn
		}
	}
}

/// Two-decimal score text, or the placeholder.
pub fn format_score(score: Option<Score>) -> String {
	score.map_or_else(|| PLACEHOLDER.to_string(), |s| s.to_string())
}

/// Receiver of normalized session state.
///
/// Calls arrive on the reactor's control flow, one at a time.
pub trait DisplaySink {
	/// A stage produced (or replaced) its result.
	fn set_stage(&mut self, stage: Stage, value: &StageResult);

	/// Advisory progress; `percent` is within `0..=100`.
	fn set_progress(&mut self, text: &str, percent: u8);

	fn set_connection_state(&mut self, label: ConnectionLabel);

	/// A single human-readable error line.
	fn show_error(&mut self, message: &str);

	/// Absolute heatmap address, ready to fetch.
	fn show_heatmap(&mut self, resolved: &str);

	/// Whether the user may start a new submission.
	fn set_submit_enabled(&mut self, enabled: bool);

	/// A new session is starting; forget everything about the previous one.
	fn reset(&mut self, _id: &AnalysisId) {
		self.set_progress("Waiting for analysis...", 0);
		self.set_connection_state(ConnectionLabel::Idle);
	}
}

impl<S: DisplaySink + ?Sized> DisplaySink for &mut S {
	fn set_stage(&mut self, stage: Stage, value: &StageResult) {
		(**self).set_stage(stage, value)
	}

	fn set_progress(&mut self, text: &str, percent: u8) {
		(**self).set_progress(text, percent)
	}

	fn set_connection_state(&mut self, label: ConnectionLabel) {
		(**self).set_connection_state(label)
	}

	fn show_error(&mut self, message: &str) {
		(**self).show_error(message)
	}

	fn show_heatmap(&mut self, resolved: &str) {
		(**self).show_heatmap(resolved)
	}

	fn set_submit_enabled(&mut self, enabled: bool) {
		(**self).set_submit_enabled(enabled)
	}

	fn reset(&mut self, id: &AnalysisId) {
		(**self).reset(id)
	}
}
