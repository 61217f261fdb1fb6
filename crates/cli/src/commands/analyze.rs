use colored::Colorize;
use serde::Serialize;
use tracing::{info, warn};
use vidcheck::{AnalysisSession, ClientConfig, CloseReason, Error, LinkState, SessionClient, SessionStatus, Tone, VideoFile, format_score};

use crate::cli::AnalyzeArgs;
use crate::error::{CliError, Result};
use crate::output::{OutputFormat, ResultBuilder, print_result};
use crate::sink::{TerminalSink, paint};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeReport<'a> {
	#[serde(skip_serializing_if = "Option::is_none")]
	stream_url: Option<&'a str>,
	session: &'a AnalysisSession,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	errors: Vec<String>,
}

pub async fn execute(args: AnalyzeArgs, config: ClientConfig, format: OutputFormat) -> Result<()> {
	let file = match &args.file {
		Some(path) => Some(VideoFile::read(path).await?),
		None => None,
	};

	let mut client = SessionClient::new(config, TerminalSink::new(format.is_text()))?;
	let builder = ResultBuilder::new("analyze");

	let outcome = tokio::select! {
		outcome = run(&mut client, args.url.as_deref(), file) => outcome,
		_ = tokio::signal::ctrl_c() => {
			warn!(target = "vidcheck.cli", "interrupted; tearing down session");
			Err(CliError::Incomplete("interrupted".into()))
		}
	};
	client.close();

	let result = outcome.and_then(|status| settled(&client, status));

	let Some(session) = client.session() else {
		// Validation failed before any session existed.
		return result;
	};
	info!(target = "vidcheck.cli", id = %session.id(), status = ?session.status(), "session settled");

	match format {
		OutputFormat::Json => {
			let report = AnalyzeReport {
				stream_url: client.stream_url(),
				session,
				errors: client.sink().errors().to_vec(),
			};
			let builder = builder.data(report);
			let builder = match &result {
				Ok(()) => builder,
				Err(err) => builder.error(err.code(), err.to_string()),
			};
			print_result(&builder.build(), format)?;
		}
		OutputFormat::Text => {
			if let Some(final_result) = session.final_result() {
				println!(
					"{} {} ({})",
					"verdict".bold(),
					paint(&final_result.verdict, Tone::classify(&final_result.verdict)),
					format_score(final_result.score)
				);
			}
		}
	}

	result
}

/// Maps how the session settled onto the command outcome.
fn settled(client: &SessionClient<TerminalSink>, status: SessionStatus) -> Result<()> {
	let reason = client.session().and_then(AnalysisSession::last_error).map(str::to_string);
	match (status, client.link_state()) {
		(SessionStatus::Completed, _) => Ok(()),
		(SessionStatus::Failed, LinkState::Closed(CloseReason::Exhausted)) => Err(Error::ConnectivityExhausted {
			attempts: client.config().reconnect.max_attempts,
		}
		.into()),
		(SessionStatus::Failed, _) => Err(Error::Server(reason.unwrap_or_else(|| "Analysis failed.".into())).into()),
		(other, _) => Err(CliError::Incomplete(reason.unwrap_or_else(|| format!("session ended as {other:?}")))),
	}
}

async fn run(client: &mut SessionClient<TerminalSink>, url: Option<&str>, file: Option<VideoFile>) -> Result<SessionStatus> {
	client.submit_parts(url, file).await?;
	Ok(client.run_until_settled().await.unwrap_or(SessionStatus::Failed))
}

#[cfg(test)]
mod tests {
	use std::future::Future;
	use std::pin::Pin;
	use std::sync::Arc;
	use std::time::Duration;

	use serde_json::json;
	use vidcheck::transport::fake_transport;
	use vidcheck::{AnalysisId, AnalysisInput, ReconnectPolicy, Submitter};
	use vidcheck_protocol::AnalyzeAck;

	use super::*;
	use crate::output::ErrorCode;

	struct Acks;

	impl Submitter for Acks {
		fn submit<'a>(&'a self, _input: &'a AnalysisInput, _id: &'a AnalysisId) -> Pin<Box<dyn Future<Output = vidcheck::Result<AnalyzeAck>> + Send + 'a>> {
			Box::pin(async {
				Ok(serde_json::from_value(json!({
					"video_task_id": "v", "audio_task_id": "a", "metadata_task_id": "m"
				}))?)
			})
		}
	}

	fn client(dialer: vidcheck::transport::FakeDialer) -> SessionClient<TerminalSink> {
		let config = ClientConfig::new("http://backend.test").unwrap().with_reconnect(ReconnectPolicy {
			max_attempts: 2,
			base_delay: Duration::from_millis(1),
		});
		SessionClient::with_parts(config, Arc::new(Acks), Arc::new(dialer), TerminalSink::new(false))
	}

	fn input() -> AnalysisInput {
		AnalysisInput::Url("https://videos.test/clip.mp4".into())
	}

	#[tokio::test]
	async fn backend_failure_maps_to_server_error() {
		let (dialer, controller) = fake_transport();
		let mut client = client(dialer);
		client.submit(input()).await.unwrap();
		while client.link_state() != LinkState::Open {
			assert!(client.step().await);
		}

		controller.inject_latest(r#"{"stage":"error","result":{"message":"decoder crashed"}}"#);
		let status = client.run_until_settled().await.unwrap();
		client.close();

		let err = settled(&client, status).unwrap_err();
		assert!(matches!(err, CliError::Client(Error::Server(ref message)) if message == "decoder crashed"), "{err:?}");
		assert_eq!(err.code(), ErrorCode::AnalysisFailed);
	}

	#[tokio::test]
	async fn exhausted_stream_maps_to_stream_failure() {
		let (dialer, controller) = fake_transport();
		controller.refuse_next(10);
		let mut client = client(dialer);
		client.submit(input()).await.unwrap();

		let status = client.run_until_settled().await.unwrap();
		client.close();

		let err = settled(&client, status).unwrap_err();
		assert!(matches!(err, CliError::Client(Error::ConnectivityExhausted { attempts: 2 })), "{err:?}");
		assert_eq!(err.code(), ErrorCode::StreamFailed);
		assert!(!client.session().unwrap().in_flight());
	}
}
