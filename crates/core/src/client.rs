//! Session client: owns the active analysis session and drives its stream.
//!
//! All session mutation happens on the caller's task inside
//! [`SessionClient::step`]. Connection tasks only forward signals tagged with
//! the epoch they were spawned under; a signal whose epoch does not match the
//! current connection belongs to a connection the client already let go of
//! and is dropped on arrival.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::aggregate::{Aggregator, progress};
use crate::config::ClientConfig;
use crate::display::{ConnectionLabel, DisplaySink};
use crate::error::{Error, Result};
use crate::id::AnalysisId;
use crate::link::{CloseReason, LinkEvent, LinkState};
use crate::normalize::{StageEvent, normalize};
use crate::session::{AnalysisSession, SessionStatus};
use crate::submit::{Acknowledgement, AnalysisInput, HttpSubmitter, Submitter, VideoFile};
use crate::transport::{Dialer, TransportParts, WebSocketDialer};

type Signal = (u64, LinkSignal);

#[derive(Debug)]
enum LinkSignal {
	Opened(mpsc::UnboundedSender<String>),
	Frame(String),
	Dropped,
}

/// The client's grip on one spawned connection task.
///
/// Dropping it lets the connection go: an open connection is closed
/// gracefully, one still dialing is aborted.
struct ConnectionHandle {
	epoch: u64,
	outbound: Option<mpsc::UnboundedSender<String>>,
	task: JoinHandle<()>,
}

impl ConnectionHandle {
	fn send(&self, message: String) -> bool {
		self.outbound.as_ref().is_some_and(|tx| tx.send(message).is_ok())
	}
}

impl Drop for ConnectionHandle {
	fn drop(&mut self) {
		if self.outbound.is_none() {
			self.task.abort();
		}
	}
}

struct Spawner {
	dialer: Arc<dyn Dialer>,
	signals: mpsc::UnboundedSender<Signal>,
	next_epoch: u64,
}

impl Spawner {
	fn spawn(&mut self, url: &str) -> ConnectionHandle {
		self.next_epoch += 1;
		let epoch = self.next_epoch;
		let task = tokio::spawn(drive_link(epoch, url.to_string(), Arc::clone(&self.dialer), self.signals.clone()));
		ConnectionHandle {
			epoch,
			outbound: None,
			task,
		}
	}
}

/// Dials, then shuttles frames both ways until either side lets go.
async fn drive_link(epoch: u64, url: String, dialer: Arc<dyn Dialer>, signals: mpsc::UnboundedSender<Signal>) {
	let TransportParts { mut sender, receiver } = match dialer.dial(&url).await {
		Ok(parts) => parts,
		Err(err) => {
			warn!(target = "vidcheck.link", epoch, %url, error = %err, "dial failed");
			let _ = signals.send((epoch, LinkSignal::Dropped));
			return;
		}
	};

	let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
	let (frames_tx, mut frames_rx) = mpsc::unbounded_channel::<String>();
	if signals.send((epoch, LinkSignal::Opened(outbound_tx))).is_err() {
		return;
	}

	let mut pump = receiver.run(frames_tx);
	let mut pump_done = false;

	loop {
		tokio::select! {
			res = &mut pump, if !pump_done => {
				pump_done = true;
				if let Err(err) = res {
					debug!(target = "vidcheck.link", epoch, error = %err, "stream read ended with error");
				}
			}
			frame = frames_rx.recv() => match frame {
				Some(frame) => {
					if signals.send((epoch, LinkSignal::Frame(frame))).is_err() {
						break;
					}
				}
				None => break,
			},
			message = outbound_rx.recv() => match message {
				Some(message) => {
					if let Err(err) = sender.send(message).await {
						warn!(target = "vidcheck.link", epoch, error = %err, "stream write failed");
						break;
					}
				}
				None => {
					trace!(target = "vidcheck.link", epoch, "released by client; closing");
					sender.close().await;
					return;
				}
			},
		}
	}

	let _ = signals.send((epoch, LinkSignal::Dropped));
}

struct StreamTarget {
	url: String,
	handshake: String,
}

struct SessionContext {
	session: AnalysisSession,
	link: LinkState,
	handle: Option<ConnectionHandle>,
	retry_at: Option<Instant>,
	stream: Option<StreamTarget>,
}

impl SessionContext {
	fn new(session: AnalysisSession, stream: Option<StreamTarget>) -> Self {
		Self {
			session,
			link: LinkState::Idle,
			handle: None,
			retry_at: None,
			stream,
		}
	}
}

enum Wake {
	Signal(Option<Signal>),
	Retry,
}

async fn sleep_until(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => tokio::time::sleep_until(deadline).await,
		None => std::future::pending().await,
	}
}

/// Submits analyses and follows their live results.
///
/// At most one session is active. A new submission tears the previous one
/// down first, so nothing from the old connection can touch the new session.
pub struct SessionClient<S> {
	config: ClientConfig,
	aggregator: Aggregator,
	submitter: Arc<dyn Submitter>,
	spawner: Spawner,
	signals: mpsc::UnboundedReceiver<Signal>,
	sink: S,
	active: Option<SessionContext>,
}

impl<S: DisplaySink> SessionClient<S> {
	/// Client talking HTTP and WebSocket to `config`'s backend.
	pub fn new(config: ClientConfig, sink: S) -> Result<Self> {
		let submitter = HttpSubmitter::new(&config)?;
		Ok(Self::with_parts(config, Arc::new(submitter), Arc::new(WebSocketDialer), sink))
	}

	pub fn with_parts(config: ClientConfig, submitter: Arc<dyn Submitter>, dialer: Arc<dyn Dialer>, sink: S) -> Self {
		let (signals_tx, signals_rx) = mpsc::unbounded_channel();
		Self {
			aggregator: Aggregator::new(config.base()),
			config,
			submitter,
			spawner: Spawner {
				dialer,
				signals: signals_tx,
				next_epoch: 0,
			},
			signals: signals_rx,
			sink,
			active: None,
		}
	}

	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	pub fn sink(&self) -> &S {
		&self.sink
	}

	pub fn sink_mut(&mut self) -> &mut S {
		&mut self.sink
	}

	/// The active (or most recent) session.
	pub fn session(&self) -> Option<&AnalysisSession> {
		self.active.as_ref().map(|ctx| &ctx.session)
	}

	pub fn link_state(&self) -> LinkState {
		self.active.as_ref().map_or(LinkState::Idle, |ctx| ctx.link)
	}

	/// Stream address of the active session, once acknowledged.
	pub fn stream_url(&self) -> Option<&str> {
		self.active.as_ref()?.stream.as_ref().map(|stream| stream.url.as_str())
	}

	/// Validates raw user input, then submits it.
	///
	/// Validation failures are shown on the sink and never reach the network.
	pub async fn submit_parts(&mut self, url: Option<&str>, file: Option<VideoFile>) -> Result<()> {
		match AnalysisInput::from_parts(url, file) {
			Ok(input) => self.submit(input).await,
			Err(err) => {
				self.sink.show_error(&err.to_string());
				Err(err)
			}
		}
	}

	/// Starts a new session for `input`.
	///
	/// Returns once the backend acknowledged the submission and the first
	/// stream dial is underway. Drive the stream with [`step`](Self::step) or
	/// [`run_until_settled`](Self::run_until_settled).
	pub async fn submit(&mut self, input: AnalysisInput) -> Result<()> {
		self.close();
		self.active = None;

		let id = AnalysisId::generate();
		let mut session = AnalysisSession::new(id.clone());
		session.status = SessionStatus::Submitted;
		session.in_flight = true;

		self.sink.reset(&id);
		self.sink.set_submit_enabled(false);
		self.sink.set_progress(&format!("Created analysis: {}...", id.short()), progress::CREATED);

		let accepted = match self.submitter.submit(&input, &id).await.and_then(Acknowledgement::try_from) {
			Ok(accepted) => accepted,
			Err(err) => {
				warn!(target = "vidcheck.submit", %id, error = %err, "submission failed");
				let message = err.to_string();
				session.fail(message.as_str());
				self.sink.show_error(&message);
				self.sink.set_connection_state(ConnectionLabel::Error);
				self.sink.set_submit_enabled(true);
				self.active = Some(SessionContext::new(session, None));
				return Err(err);
			}
		};

		let stream_id = accepted.analysis_id.clone().unwrap_or_else(|| id.clone());
		let stream = StreamTarget {
			url: self.config.stream_url(&stream_id),
			handshake: serde_json::to_string(&accepted.task_ids)?,
		};
		info!(target = "vidcheck.session", %id, stream = %stream.url, "analysis queued");
		self.sink.set_progress("Analysis queued. Connecting to live updates...", progress::QUEUED);

		self.active = Some(SessionContext::new(session, Some(stream)));
		self.transition(LinkEvent::Dial);

		for event in accepted.inline {
			self.apply(event);
		}
		Ok(())
	}

	/// Waits for and handles the next connection signal or retry deadline.
	///
	/// Returns `false` without waiting when there is nothing to wait for.
	pub async fn step(&mut self) -> bool {
		let Some(ctx) = self.active.as_ref() else {
			return false;
		};
		if ctx.handle.is_none() && ctx.retry_at.is_none() {
			return false;
		}
		let retry_at = ctx.retry_at;

		let wake = tokio::select! {
			signal = self.signals.recv() => Wake::Signal(signal),
			() = sleep_until(retry_at) => Wake::Retry,
		};

		match wake {
			Wake::Signal(Some((epoch, signal))) => self.on_signal(epoch, signal),
			Wake::Signal(None) => return false,
			Wake::Retry => self.on_retry_due(),
		}
		true
	}

	/// Whether the active session reached a terminal status or its stream
	/// closed for good.
	pub fn is_settled(&self) -> bool {
		self.active
			.as_ref()
			.is_none_or(|ctx| ctx.session.status().is_terminal() || ctx.link.is_closed())
	}

	/// Steps until [`is_settled`](Self::is_settled). A completed session has
	/// already released its stream; a failed one may still hold it, so call
	/// [`close`](Self::close) when done.
	pub async fn run_until_settled(&mut self) -> Option<SessionStatus> {
		while !self.is_settled() {
			if !self.step().await {
				break;
			}
		}
		self.session().map(AnalysisSession::status)
	}

	/// Releases the active connection and cancels any pending retry.
	/// Idempotent.
	pub fn close(&mut self) {
		self.transition(LinkEvent::Close);
	}

	fn on_signal(&mut self, epoch: u64, signal: LinkSignal) {
		let Some(ctx) = self.active.as_mut() else {
			return;
		};
		let Some(handle) = ctx.handle.as_mut().filter(|handle| handle.epoch == epoch) else {
			trace!(target = "vidcheck.link", epoch, ?signal, "signal from released connection ignored");
			return;
		};

		match signal {
			LinkSignal::Opened(outbound) => {
				handle.outbound = Some(outbound);
				self.transition(LinkEvent::Opened);
			}
			LinkSignal::Frame(raw) => self.on_frame(&raw),
			LinkSignal::Dropped => {
				let session_complete = ctx.session.is_completed();
				ctx.handle = None;
				self.transition(LinkEvent::Dropped { session_complete });
			}
		}
	}

	fn on_frame(&mut self, raw: &str) {
		match normalize(raw) {
			Ok(Some(event)) => self.apply(event),
			Ok(None) => {}
			Err(err) => {
				let err = Error::InvalidFrame(err);
				warn!(target = "vidcheck.link", error = %err, "invalid stream frame");
				self.sink.show_error(&err.to_string());
			}
		}
	}

	fn on_retry_due(&mut self) {
		if let Some(ctx) = self.active.as_mut() {
			ctx.retry_at = None;
		}
		self.transition(LinkEvent::RetryDue);
	}

	fn apply(&mut self, event: StageEvent) {
		let Some(ctx) = self.active.as_mut() else {
			return;
		};
		self.aggregator.apply(&mut ctx.session, event, &mut self.sink);
		if ctx.session.is_completed() && !ctx.link.is_closed() {
			self.transition(LinkEvent::Finished);
		}
	}

	/// Runs `event` through the state machine and performs the entry actions
	/// of the state it lands in.
	fn transition(&mut self, event: LinkEvent) {
		let Some(ctx) = self.active.as_mut() else {
			return;
		};
		let from = ctx.link;
		let to = match from.next(event, &self.config.reconnect) {
			Ok(to) => to,
			Err(err) => {
				debug!(target = "vidcheck.link", %err, "event ignored");
				return;
			}
		};
		if to == from {
			return;
		}
		ctx.link = to;
		let id = ctx.session.id();
		let max = self.config.reconnect.max_attempts;
		debug!(target = "vidcheck.link", %id, ?from, ?to, "link transition");

		match to {
			LinkState::Idle => {}
			LinkState::Connecting { attempt } => {
				ctx.retry_at = None;
				if let Some(stream) = &ctx.stream {
					info!(target = "vidcheck.link", %id, url = %stream.url, attempt, "connecting");
					ctx.handle = Some(self.spawner.spawn(&stream.url));
				}
				self.sink.set_connection_state(ConnectionLabel::Connecting);
			}
			LinkState::Open => {
				info!(target = "vidcheck.link", %id, "stream open");
				let queued = match (&ctx.handle, &ctx.stream) {
					(Some(handle), Some(stream)) => handle.send(stream.handshake.clone()),
					_ => false,
				};
				if !queued {
					warn!(target = "vidcheck.link", %id, "handshake not queued");
				}
				ctx.session.reconnect_attempts = 0;
				ctx.session.set_link_status(SessionStatus::Connected);
				self.sink.set_connection_state(ConnectionLabel::Connected);
				self.sink.set_progress("Connected. Waiting for updates...", progress::CONNECTED);
			}
			LinkState::Reconnecting { attempt } => {
				let delay = self.config.reconnect.delay_for(attempt);
				warn!(
					target = "vidcheck.link",
					%id,
					attempt,
					max,
					delay_ms = delay.as_millis() as u64,
					"stream lost; reconnecting"
				);
				ctx.handle = None;
				ctx.retry_at = Some(Instant::now() + delay);
				ctx.session.reconnect_attempts = attempt;
				ctx.session.set_link_status(SessionStatus::Reconnecting);
				self.sink.set_connection_state(ConnectionLabel::Reconnecting);
				self.sink
					.set_progress(&format!("Connection lost. Reconnecting ({attempt}/{max})..."), progress::RECONNECTING);
			}
			LinkState::Closed(reason) => {
				ctx.handle = None;
				ctx.retry_at = None;
				match reason {
					CloseReason::Completed => {
						info!(target = "vidcheck.link", id = %ctx.session.id(), "stream closed after completion");
						self.sink.set_connection_state(ConnectionLabel::Completed);
					}
					CloseReason::Exhausted => {
						let message = Error::ConnectivityExhausted { attempts: max }.to_string();
						warn!(target = "vidcheck.link", id = %ctx.session.id(), "{message}");
						ctx.session.fail(message.as_str());
						self.sink.set_connection_state(ConnectionLabel::Disconnected);
						self.sink.show_error(&message);
						self.sink.set_submit_enabled(true);
					}
					CloseReason::UserClosed => {
						debug!(target = "vidcheck.link", id = %ctx.session.id(), "stream released");
						ctx.session.in_flight = false;
					}
				}
			}
		}
	}
}
