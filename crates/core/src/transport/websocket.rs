//! WebSocket stream transport over tokio-tungstenite.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use super::{Dialer, Transport, TransportParts, TransportReceiver};
use crate::error::Result;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Dials `ws://` and `wss://` stream addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketDialer;

impl Dialer for WebSocketDialer {
	fn dial<'a>(&'a self, url: &'a str) -> Pin<Box<dyn Future<Output = Result<TransportParts>> + Send + 'a>> {
		Box::pin(async move {
			let (stream, response) = connect_async(url).await?;
			debug!(target = "vidcheck.transport", %url, status = %response.status(), "websocket connected");

			let (sink, stream) = stream.split();
			Ok(TransportParts {
				sender: Box::new(WebSocketSender { sink }),
				receiver: Box::new(WebSocketReceiver { stream }),
			})
		})
	}
}

struct WebSocketSender {
	sink: SplitSink<WsStream, Message>,
}

impl Transport for WebSocketSender {
	fn send(&mut self, message: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			trace!(target = "vidcheck.transport", len = message.len(), "send");
			self.sink.send(Message::Text(message.into())).await?;
			Ok(())
		})
	}

	fn close(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
		Box::pin(async move {
			if let Err(err) = self.sink.send(Message::Close(None)).await {
				trace!(target = "vidcheck.transport", error = %err, "close frame not sent");
			}
			let _ = self.sink.close().await;
		})
	}
}

struct WebSocketReceiver {
	stream: SplitStream<WsStream>,
}

impl TransportReceiver for WebSocketReceiver {
	fn run(mut self: Box<Self>, frames: mpsc::UnboundedSender<String>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			while let Some(message) = self.stream.next().await {
				let text = match message? {
					Message::Text(text) => text.to_string(),
					Message::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
					Message::Close(frame) => {
						debug!(target = "vidcheck.transport", ?frame, "peer closed stream");
						break;
					}
					Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
				};
				if frames.send(text).is_err() {
					break;
				}
			}
			Ok(())
		})
	}
}
