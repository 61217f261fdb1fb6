use thiserror::Error;

use crate::output::ErrorCode;

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Client(#[from] vidcheck::Error),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Invalid configuration: {0}")]
	Config(String),

	/// The session ended without a final result.
	#[error("Analysis did not complete: {0}")]
	Incomplete(String),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

impl CliError {
	pub fn code(&self) -> ErrorCode {
		use vidcheck::Error as E;

		match self {
			CliError::Client(E::Validation(_)) => ErrorCode::InvalidInput,
			CliError::Client(E::Submission { .. } | E::Http(_)) => ErrorCode::SubmissionFailed,
			CliError::Client(E::Protocol(_) | E::InvalidFrame(_) | E::Json(_)) => ErrorCode::ProtocolError,
			CliError::Client(E::ConnectivityExhausted { .. } | E::Transport(_)) => ErrorCode::StreamFailed,
			CliError::Client(E::Server(_)) | CliError::Incomplete(_) => ErrorCode::AnalysisFailed,
			CliError::Client(E::Config(_)) | CliError::Config(_) => ErrorCode::ConfigError,
			CliError::Client(E::Io(_)) | CliError::Io(_) => ErrorCode::IoError,
			CliError::Anyhow(_) => ErrorCode::InternalError,
		}
	}
}

pub type Result<T> = std::result::Result<T, CliError>;
