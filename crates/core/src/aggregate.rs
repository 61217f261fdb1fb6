//! Session state aggregator.
//!
//! Applies [`StageEvent`]s to an [`AnalysisSession`] strictly in arrival
//! order (last write per stage wins) and mirrors each change into the
//! display sink.

use tracing::{debug, info, warn};

use crate::display::{ConnectionLabel, DisplaySink};
use crate::error::Error;
use crate::normalize::StageEvent;
use crate::session::{AnalysisSession, SessionStatus};
use crate::stage::{Stage, StageResult};

/// Advisory progress markers. Not a guarantee of backend completion.
pub mod progress {
	pub const CREATED: u8 = 5;
	pub const QUEUED: u8 = 8;
	pub const CONNECTED: u8 = 10;
	pub const RECONNECTING: u8 = 12;
	pub const TASK_STATE: u8 = 20;
	pub const VIDEO: u8 = 35;
	pub const AUDIO: u8 = 65;
	pub const METADATA: u8 = 85;
	pub const FINAL: u8 = 100;
}

/// Resolves a heatmap reference against the backend base address.
///
/// - `http://` / `https://` references are returned verbatim;
/// - `/`-rooted references are prefixed with `base`;
/// - anything else is a file under the backend's `/temp/` directory, after
///   stripping one leading `./` and one leading `temp/`.
pub fn resolve_heatmap(base: &str, reference: &str) -> Option<String> {
	if reference.is_empty() {
		return None;
	}

	let lower = reference.get(..8).unwrap_or(reference).to_ascii_lowercase();
	if lower.starts_with("http://") || lower.starts_with("https://") {
		return Some(reference.to_string());
	}

	let base = base.trim_end_matches('/');
	if reference.starts_with('/') {
		return Some(format!("{base}{reference}"));
	}

	let cleaned = reference.strip_prefix("./").unwrap_or(reference);
	let cleaned = cleaned.strip_prefix("temp/").unwrap_or(cleaned);
	Some(format!("{base}/temp/{cleaned}"))
}

/// Applies stage events for one backend.
#[derive(Debug, Clone)]
pub struct Aggregator {
	base: String,
}

impl Aggregator {
	pub fn new(base: impl Into<String>) -> Self {
		Self { base: base.into() }
	}

	pub fn apply(&self, session: &mut AnalysisSession, event: StageEvent, sink: &mut dyn DisplaySink) {
		match event {
			StageEvent::VideoComplete(result) => {
				let resolved = result.heatmap.as_deref().and_then(|reference| resolve_heatmap(&self.base, reference));
				session.video = Some(result.clone());
				sink.set_stage(Stage::Video, &StageResult::Video(result));
				if let Some(url) = resolved {
					debug!(target = "vidcheck.session", heatmap = %url, "heatmap resolved");
					sink.show_heatmap(&url);
					session.heatmap_url = Some(url);
				}
				sink.set_progress("Video analysis complete.", progress::VIDEO);
			}
			StageEvent::AudioComplete(result) => {
				session.audio = Some(result.clone());
				sink.set_stage(Stage::Audio, &StageResult::Audio(result));
				sink.set_progress("Audio analysis complete.", progress::AUDIO);
			}
			StageEvent::MetadataComplete(result) => {
				session.metadata = Some(result.clone());
				sink.set_stage(Stage::Metadata, &StageResult::Metadata(result));
				sink.set_progress("Metadata analysis complete.", progress::METADATA);
			}
			StageEvent::Final(result) => {
				info!(
					target = "vidcheck.session",
					id = %session.id(),
					verdict = %result.verdict,
					score = ?result.score.map(|s| s.value()),
					"analysis finished"
				);
				session.final_result = Some(result.clone());
				session.status = SessionStatus::Completed;
				session.in_flight = false;
				sink.set_stage(Stage::Final, &StageResult::Final(result));
				sink.set_progress("Analysis finished.", progress::FINAL);
				sink.set_submit_enabled(true);
			}
			StageEvent::TaskStateSnapshot(states) => {
				sink.set_progress(&format!("Task states: {states}"), progress::TASK_STATE);
				session.task_states = Some(states);
			}
			StageEvent::ServerError { message } => {
				let err = Error::Server(message);
				warn!(target = "vidcheck.session", id = %session.id(), error = %err, "backend reported failure");
				let message = err.to_string();
				sink.show_error(&message);
				sink.set_connection_state(ConnectionLabel::Error);
				sink.set_submit_enabled(true);
				session.fail(message);
			}
		}
	}
}
