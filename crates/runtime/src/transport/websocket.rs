use async_trait::async_trait;
use futures_util::future;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use super::{Dialer, Link};
use crate::error::{Error, Result};

/// Dials the host's WebSocket endpoint (`ws://` or `wss://`).
#[derive(Debug, Clone)]
pub struct WebSocketDialer {
	url: String,
}

impl WebSocketDialer {
	pub fn new(url: impl Into<String>) -> Self {
		Self { url: url.into() }
	}

	pub fn url(&self) -> &str {
		&self.url
	}
}

#[async_trait]
impl Dialer for WebSocketDialer {
	async fn dial(&self) -> Result<Link> {
		tracing::debug!(url = %self.url, "Dialing WebSocket");
		let (ws_stream, response) = connect_async(self.url.as_str())
			.await
			.map_err(|e| Error::ConnectionFailed(format!("WebSocket connect to {} failed: {e}", self.url)))?;
		tracing::debug!(url = %self.url, status = %response.status(), "WebSocket handshake complete");

		let (write, read) = ws_stream.split();

		let sink = write
			.with(|text: String| future::ready(Ok::<_, WsError>(Message::Text(text))))
			.sink_map_err(|e| Error::TransportError(e.to_string()));

		let stream = read.filter_map(|message| {
			future::ready(match message {
				Ok(Message::Text(text)) => Some(Ok(text)),
				Ok(Message::Close(frame)) => {
					tracing::debug!(?frame, "WebSocket close frame");
					None
				}
				Ok(Message::Binary(bytes)) => {
					tracing::debug!(len = bytes.len(), "Ignoring binary frame");
					None
				}
				Ok(_) => None,
				Err(e) => Some(Err(Error::TransportError(e.to_string()))),
			})
		});

		Ok(Link::new(Box::pin(sink), Box::pin(stream)))
	}

	fn endpoint(&self) -> String {
		self.url.clone()
	}
}
