//! Session identifiers.

use std::fmt;

use serde::Serialize;

/// Client-chosen analysis identifier.
///
/// Sent to the backend as the correlation key and used as the stream
/// namespace (`/ws/{id}`). The backend may echo a different id in its
/// acknowledgement, in which case that one wins for the stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AnalysisId(String);

impl AnalysisId {
	/// Generates a fresh random (v4) identifier.
	pub fn generate() -> Self {
		Self(uuid::Uuid::new_v4().to_string())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// First eight characters, for progress text.
	pub fn short(&self) -> &str {
		match self.0.char_indices().nth(8) {
			Some((idx, _)) => &self.0[..idx],
			None => &self.0,
		}
	}
}

impl From<String> for AnalysisId {
	fn from(value: String) -> Self {
		Self(value)
	}
}

impl fmt::Display for AnalysisId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}
