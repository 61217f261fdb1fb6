//! Submission client: one `POST {base}/analyze` per analysis.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, info};
use vidcheck_protocol::{AnalyzeAck, AnalyzeRequest, MULTIPART_FILE_FIELD, MULTIPART_ID_FIELD, TaskIds};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::id::AnalysisId;
use crate::normalize::{StageEvent, normalize_inline};

/// A local video, read fully into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
	pub name: String,
	pub bytes: Vec<u8>,
	pub content_type: Option<String>,
}

impl VideoFile {
	pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
		let name = name.into();
		let content_type = guess_content_type(&name).map(str::to_string);
		Self {
			name,
			bytes,
			content_type,
		}
	}

	pub async fn read(path: &Path) -> Result<Self> {
		let bytes = tokio::fs::read(path).await?;
		let name = path
			.file_name()
			.map(|name| name.to_string_lossy().into_owned())
			.unwrap_or_else(|| "upload".to_string());
		Ok(Self::new(name, bytes))
	}
}

fn guess_content_type(name: &str) -> Option<&'static str> {
	let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
	Some(match ext.as_str() {
		"mp4" | "m4v" => "video/mp4",
		"webm" => "video/webm",
		"mov" => "video/quicktime",
		"mkv" => "video/x-matroska",
		"avi" => "video/x-msvideo",
		_ => return None,
	})
}

/// What to analyze: a remote address or an uploaded file, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisInput {
	Url(String),
	File(VideoFile),
}

impl AnalysisInput {
	/// Validates raw user input.
	///
	/// The URL is trimmed; blank URLs and zero-byte files count as absent.
	/// Exactly one of the two must remain.
	pub fn from_parts(url: Option<&str>, file: Option<VideoFile>) -> Result<Self> {
		let url = url.map(str::trim).filter(|url| !url.is_empty());
		let file = file.filter(|file| !file.bytes.is_empty());

		match (url, file) {
			(Some(url), None) => Ok(AnalysisInput::Url(url.to_string())),
			(None, Some(file)) => Ok(AnalysisInput::File(file)),
			(None, None) => Err(Error::Validation("Provide a video URL or upload a file.".into())),
			(Some(_), Some(_)) => Err(Error::Validation("Provide either a video URL or a file, not both.".into())),
		}
	}

	pub fn describe(&self) -> String {
		match self {
			AnalysisInput::Url(url) => url.clone(),
			AnalysisInput::File(file) => format!("{} ({} bytes)", file.name, file.bytes.len()),
		}
	}
}

/// A validated acknowledgement.
#[derive(Debug, Clone, PartialEq)]
pub struct Acknowledgement {
	/// Id echoed by the backend; preferred over the client id for the stream.
	pub analysis_id: Option<AnalysisId>,
	pub task_ids: TaskIds,
	/// Results the backend already had, in stage order.
	pub inline: Vec<StageEvent>,
}

impl TryFrom<AnalyzeAck> for Acknowledgement {
	type Error = Error;

	fn try_from(ack: AnalyzeAck) -> Result<Self> {
		let task_ids = ack.task_ids().ok_or_else(|| Error::Protocol("missing task ids".into()))?;
		let inline = normalize_inline(&ack);
		Ok(Self {
			analysis_id: ack.analysis_id.map(AnalysisId::from),
			task_ids,
			inline,
		})
	}
}

/// Sends submissions to the backend.
pub trait Submitter: Send + Sync {
	/// Performs the request and decodes a 2xx body. Task-id validation is
	/// left to [`Acknowledgement::try_from`].
	fn submit<'a>(&'a self, input: &'a AnalysisInput, id: &'a AnalysisId) -> Pin<Box<dyn Future<Output = Result<AnalyzeAck>> + Send + 'a>>;
}

/// [`Submitter`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
	client: reqwest::Client,
	analyze_url: String,
}

impl HttpSubmitter {
	pub fn new(config: &ClientConfig) -> Result<Self> {
		let mut builder = reqwest::Client::builder();
		if let Some(timeout) = config.request_timeout {
			builder = builder.timeout(timeout);
		}
		Ok(Self {
			client: builder.build()?,
			analyze_url: config.analyze_url(),
		})
	}
}

impl Submitter for HttpSubmitter {
	fn submit<'a>(&'a self, input: &'a AnalysisInput, id: &'a AnalysisId) -> Pin<Box<dyn Future<Output = Result<AnalyzeAck>> + Send + 'a>> {
		Box::pin(async move {
			let request = match input {
				AnalysisInput::Url(video_url) => self.client.post(&self.analyze_url).json(&AnalyzeRequest {
					video_url: video_url.clone(),
					analysis_id: id.to_string(),
				}),
				AnalysisInput::File(file) => {
					let mut part = Part::bytes(file.bytes.clone()).file_name(file.name.clone());
					if let Some(content_type) = &file.content_type {
						part = part.mime_str(content_type)?;
					}
					let form = Form::new().part(MULTIPART_FILE_FIELD, part).text(MULTIPART_ID_FIELD, id.to_string());
					self.client.post(&self.analyze_url).multipart(form)
				}
			};

			info!(target = "vidcheck.submit", %id, input = %input.describe(), url = %self.analyze_url, "submitting analysis");
			let response = request.send().await?;
			let status = response.status();
			let body = response.text().await?;
			debug!(target = "vidcheck.submit", %id, status = status.as_u16(), len = body.len(), "analyze responded");

			if !status.is_success() {
				return Err(Error::Submission {
					status: status.as_u16(),
					body,
				});
			}

			let value: Value = serde_json::from_str(&body).map_err(|e| Error::Protocol(format!("acknowledgement is not JSON: {e}")))?;
			if value.is_null() {
				return Ok(AnalyzeAck::default());
			}
			serde_json::from_value(value).map_err(|e| Error::Protocol(format!("unexpected acknowledgement shape: {e}")))
		})
	}
}
