use serde::Serialize;

/// The result envelope printed by every command in JSON mode.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	pub ok: bool,
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
}

/// Stable error codes for scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	InvalidInput,
	SubmissionFailed,
	ProtocolError,
	StreamFailed,
	AnalysisFailed,
	ConfigError,
	IoError,
	InternalError,
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let code = match self {
			ErrorCode::InvalidInput => "INVALID_INPUT",
			ErrorCode::SubmissionFailed => "SUBMISSION_FAILED",
			ErrorCode::ProtocolError => "PROTOCOL_ERROR",
			ErrorCode::StreamFailed => "STREAM_FAILED",
			ErrorCode::AnalysisFailed => "ANALYSIS_FAILED",
			ErrorCode::ConfigError => "CONFIG_ERROR",
			ErrorCode::IoError => "IO_ERROR",
			ErrorCode::InternalError => "INTERNAL_ERROR",
		};
		f.write_str(code)
	}
}
