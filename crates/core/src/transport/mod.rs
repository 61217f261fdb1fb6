//! Stream transports.
//!
//! A [`Dialer`] opens one stream connection and hands back its two halves:
//! a [`Transport`] for outbound text and a [`TransportReceiver`] that pumps
//! inbound text frames into a channel until the peer goes away.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::error::Result;

pub mod fake;
pub mod websocket;

pub use fake::{FakeController, FakeDialer, fake_transport};
pub use websocket::WebSocketDialer;

/// Outbound half of a stream connection.
pub trait Transport: Send {
	fn send(&mut self, message: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

	/// Closes the connection gracefully. Errors are not actionable.
	fn close(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Inbound half of a stream connection.
pub trait TransportReceiver: Send {
	/// Forwards every text frame into `frames` and returns once the peer
	/// closes, the read fails, or `frames` is dropped.
	fn run(self: Box<Self>, frames: mpsc::UnboundedSender<String>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
}

/// Opens stream connections.
pub trait Dialer: Send + Sync {
	fn dial<'a>(&'a self, url: &'a str) -> Pin<Box<dyn Future<Output = Result<TransportParts>> + Send + 'a>>;
}
