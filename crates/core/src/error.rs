//! Error types for the session client.

use thiserror::Error;

/// Result type alias for session client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the session client.
///
/// Every variant renders as a single human-readable line suitable for a
/// display sink.
#[derive(Debug, Error)]
pub enum Error {
	/// Neither (or both) of URL and file were provided. No network call is made.
	#[error("{0}")]
	Validation(String),

	/// `/analyze` answered with a non-2xx status.
	#[error("Analyze failed ({status}): {body}")]
	Submission { status: u16, body: String },

	/// The backend answered 2xx but the body broke the protocol contract.
	#[error("Protocol error: {0}")]
	Protocol(String),

	/// A stream frame matched neither wire shape.
	#[error("Received invalid stream message: {0}")]
	InvalidFrame(#[from] vidcheck_protocol::FrameError),

	/// The reconnect budget is spent.
	#[error("Stream connection failed after {attempts} reconnection attempts")]
	ConnectivityExhausted { attempts: u32 },

	/// The backend reported an analysis failure on the stream.
	#[error("{0}")]
	Server(String),

	/// The stream transport failed to dial, read or write.
	#[error("Transport error: {0}")]
	Transport(String),

	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// Invalid client configuration (bad base URL, zero attempts, ...).
	#[error("Invalid configuration: {0}")]
	Config(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
	fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
		Error::Transport(err.to_string())
	}
}
