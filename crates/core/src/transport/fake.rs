//! In-memory stream transport for exercising the session client without a
//! backend.
//!
//! # Example
//!
//! ```ignore
//! let (dialer, controller) = fake_transport();
//! let mut client = SessionClient::with_parts(config, submitter, Arc::new(dialer), sink);
//!
//! client.submit(AnalysisInput::Url("https://v/x.mp4".into())).await?;
//! client.step().await; // dial
//! client.step().await; // opened, handshake sent
//!
//! controller.inject_latest(r#"{"type":"final","verdict":"Real"}"#);
//! controller.hang_up_latest();
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::{Dialer, Transport, TransportParts, TransportReceiver};
use crate::error::{Error, Result};

/// Creates a connected dialer/controller pair.
pub fn fake_transport() -> (FakeDialer, FakeController) {
	let shared = Arc::new(Mutex::new(Shared::default()));
	(
		FakeDialer {
			shared: Arc::clone(&shared),
		},
		FakeController { shared },
	)
}

#[derive(Default)]
struct Shared {
	refusals: u32,
	links: Vec<FakeLink>,
}

struct FakeLink {
	url: String,
	at: Instant,
	accepted: bool,
	inbound: Option<mpsc::UnboundedSender<String>>,
	sent: Arc<Mutex<Vec<String>>>,
	closed_by_client: Arc<AtomicBool>,
}

/// One dial attempt as observed by the fake server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialRecord {
	pub url: String,
	pub at: Instant,
	pub accepted: bool,
}

/// [`Dialer`] half of [`fake_transport`].
pub struct FakeDialer {
	shared: Arc<Mutex<Shared>>,
}

impl Dialer for FakeDialer {
	fn dial<'a>(&'a self, url: &'a str) -> Pin<Box<dyn Future<Output = Result<TransportParts>> + Send + 'a>> {
		Box::pin(async move {
			let mut shared = self.shared.lock();
			let sent = Arc::new(Mutex::new(Vec::new()));
			let closed_by_client = Arc::new(AtomicBool::new(false));

			if shared.refusals > 0 {
				shared.refusals -= 1;
				shared.links.push(FakeLink {
					url: url.to_string(),
					at: Instant::now(),
					accepted: false,
					inbound: None,
					sent,
					closed_by_client,
				});
				return Err(Error::Transport(format!("connection refused: {url}")));
			}

			let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
			shared.links.push(FakeLink {
				url: url.to_string(),
				at: Instant::now(),
				accepted: true,
				inbound: Some(inbound_tx),
				sent: Arc::clone(&sent),
				closed_by_client: Arc::clone(&closed_by_client),
			});

			Ok(TransportParts {
				sender: Box::new(FakeSender { sent, closed_by_client }),
				receiver: Box::new(FakeReceiver { inbound_rx }),
			})
		})
	}
}

/// Server side of the fake: scripts dial outcomes, injects frames and
/// inspects what the client sent.
#[derive(Clone)]
pub struct FakeController {
	shared: Arc<Mutex<Shared>>,
}

impl FakeController {
	/// Makes the next `count` dials fail.
	pub fn refuse_next(&self, count: u32) {
		self.shared.lock().refusals += count;
	}

	pub fn dial_count(&self) -> usize {
		self.shared.lock().links.len()
	}

	pub fn dials(&self) -> Vec<DialRecord> {
		self.shared
			.lock()
			.links
			.iter()
			.map(|link| DialRecord {
				url: link.url.clone(),
				at: link.at,
				accepted: link.accepted,
			})
			.collect()
	}

	/// Sends a text frame down the connection opened by dial `index`.
	///
	/// Returns `false` if that dial was refused, already hung up, or the client
	/// stopped reading.
	pub fn inject(&self, index: usize, frame: impl Into<String>) -> bool {
		let shared = self.shared.lock();
		match shared.links.get(index).and_then(|link| link.inbound.as_ref()) {
			Some(inbound) => inbound.send(frame.into()).is_ok(),
			None => false,
		}
	}

	pub fn inject_latest(&self, frame: impl Into<String>) -> bool {
		let latest = self.dial_count().saturating_sub(1);
		self.inject(latest, frame)
	}

	/// Closes the connection from the server side.
	pub fn hang_up(&self, index: usize) {
		if let Some(link) = self.shared.lock().links.get_mut(index) {
			link.inbound = None;
		}
	}

	pub fn hang_up_latest(&self) {
		let latest = self.dial_count().saturating_sub(1);
		self.hang_up(latest);
	}

	/// Messages the client sent on connection `index`.
	pub fn sent(&self, index: usize) -> Vec<String> {
		self.shared
			.lock()
			.links
			.get(index)
			.map(|link| link.sent.lock().clone())
			.unwrap_or_default()
	}

	/// Whether the client closed connection `index` itself.
	pub fn closed_by_client(&self, index: usize) -> bool {
		self.shared
			.lock()
			.links
			.get(index)
			.is_some_and(|link| link.closed_by_client.load(Ordering::SeqCst))
	}
}

struct FakeSender {
	sent: Arc<Mutex<Vec<String>>>,
	closed_by_client: Arc<AtomicBool>,
}

impl Transport for FakeSender {
	fn send(&mut self, message: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		let sent = Arc::clone(&self.sent);
		Box::pin(async move {
			sent.lock().push(message);
			Ok(())
		})
	}

	fn close(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
		self.closed_by_client.store(true, Ordering::SeqCst);
		Box::pin(async {})
	}
}

struct FakeReceiver {
	inbound_rx: mpsc::UnboundedReceiver<String>,
}

impl TransportReceiver for FakeReceiver {
	fn run(mut self: Box<Self>, frames: mpsc::UnboundedSender<String>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			while let Some(frame) = self.inbound_rx.recv().await {
				if frames.send(frame).is_err() {
					break;
				}
			}
			Ok(())
		})
	}
}
