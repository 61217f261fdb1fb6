//! Client configuration: backend address and reconnection policy.

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::id::AnalysisId;

/// Backend address used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Bounded linear backoff for stream reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
	/// Reattempts allowed after an unexpected close before giving up.
	pub max_attempts: u32,
	/// Delay unit; attempt `n` waits `base_delay * n`.
	pub base_delay: Duration,
}

impl Default for ReconnectPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(1200),
		}
	}
}

impl ReconnectPolicy {
	/// Delay before reattempt `attempt` (1-based).
	pub fn delay_for(&self, attempt: u32) -> Duration {
		self.base_delay * attempt
	}
}

/// Everything the session client needs to reach the backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
	base_url: Url,
	base: String,
	pub reconnect: ReconnectPolicy,
	pub request_timeout: Option<Duration>,
}

impl ClientConfig {
	/// Parses `base_url`, which must be an absolute `http` or `https` URL.
	pub fn new(base_url: &str) -> Result<Self> {
		let parsed = Url::parse(base_url.trim()).map_err(|e| Error::Config(format!("invalid base URL {base_url:?}: {e}")))?;
		if !matches!(parsed.scheme(), "http" | "https") {
			return Err(Error::Config(format!("base URL must use http or https, got {:?}", parsed.scheme())));
		}
		let base = parsed.as_str().trim_end_matches('/').to_string();

		Ok(Self {
			base_url: parsed,
			base,
			reconnect: ReconnectPolicy::default(),
			request_timeout: None,
		})
	}

	pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
		self.reconnect = reconnect;
		self
	}

	pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.request_timeout = timeout;
		self
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Base address without a trailing slash, used as a prefix for backend paths.
	pub fn base(&self) -> &str {
		&self.base
	}

	/// `POST` target for submissions.
	pub fn analyze_url(&self) -> String {
		format!("{}/analyze", self.base)
	}

	/// Stream address for `id`, with `http(s)` mapped to `ws(s)`.
	pub fn stream_url(&self, id: &AnalysisId) -> String {
		let rest = self
			.base
			.strip_prefix("https://")
			.map(|rest| format!("wss://{rest}"))
			.or_else(|| self.base.strip_prefix("http://").map(|rest| format!("ws://{rest}")))
			.unwrap_or_else(|| self.base.clone());
		format!("{rest}/ws/{id}")
	}
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self::new(DEFAULT_BASE_URL).expect("default base URL is valid")
	}
}
