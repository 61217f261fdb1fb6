//! Effective client configuration: defaults, then an optional JSON file, then
//! flags and environment.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use vidcheck::{ClientConfig, DEFAULT_BASE_URL, ReconnectPolicy};

use crate::error::{CliError, Result};

/// On-disk configuration. Every key is optional.
///
/// ```json
/// { "baseUrl": "https://vidcheck.example", "maxReconnectAttempts": 5, "reconnectDelayMs": 500 }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileConfig {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub base_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_reconnect_attempts: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reconnect_delay_ms: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub request_timeout_ms: Option<u64>,
}

impl FileConfig {
	pub fn load(path: &Path) -> Result<Self> {
		let raw = std::fs::read_to_string(path)?;
		serde_json::from_str(&raw).map_err(|e| CliError::Config(format!("{}: {e}", path.display())))
	}
}

/// Builds the client configuration. `base_url` comes from `--base-url` or
/// `VIDCHECK_BASE_URL` and beats the file.
pub fn resolve(config_path: Option<&Path>, base_url: Option<&str>) -> Result<ClientConfig> {
	let file = match config_path {
		Some(path) => FileConfig::load(path)?,
		None => FileConfig::default(),
	};

	let base = base_url.or(file.base_url.as_deref()).unwrap_or(DEFAULT_BASE_URL);

	let mut reconnect = ReconnectPolicy::default();
	if let Some(attempts) = file.max_reconnect_attempts {
		reconnect.max_attempts = attempts;
	}
	if let Some(ms) = file.reconnect_delay_ms {
		reconnect.base_delay = Duration::from_millis(ms);
	}

	let config = ClientConfig::new(base)?
		.with_reconnect(reconnect)
		.with_request_timeout(file.request_timeout_ms.map(Duration::from_millis));

	debug!(
		target = "vidcheck.config",
		base = config.base(),
		max_attempts = reconnect.max_attempts,
		delay_ms = reconnect.base_delay.as_millis() as u64,
		"configuration resolved"
	);
	Ok(config)
}
