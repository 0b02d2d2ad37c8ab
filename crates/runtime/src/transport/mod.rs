//! Transport abstraction.
//!
//! [`Transport`] is the single seam every host call goes through. Two
//! implementations exist:
//!
//! - [`SocketTransport`](crate::SocketTransport): JSON envelopes over a duplex
//!   text link obtained from a [`Dialer`]
//! - [`HostCommandTransport`](crate::HostCommandTransport): the native
//!   in-process command interface
//!
//! A [`Link`] is a pair of boxed sink/stream halves carrying whole text
//! frames. [`WebSocketDialer`] produces links over tokio-tungstenite;
//! [`LoopbackDialer`] produces in-memory links for tests and embedding.

mod loopback;
mod websocket;


use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Sink, Stream};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::events::{EventHandler, Subscription};

pub use loopback::{LoopbackDialer, LoopbackPeer};
pub use websocket::WebSocketDialer;

/// Which transport a client ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionMode {
	/// Running inside the host process.
	InProcess,
	/// Talking to the host over a network socket.
	Socket,
}

impl std::fmt::Display for ConnectionMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ConnectionMode::InProcess => f.write_str("in-process"),
			ConnectionMode::Socket => f.write_str("socket"),
		}
	}
}

/// Request/response and push-event access to the host.
///
/// Both implementations share the same contract: `call` returns the host's
/// payload or an [`Error`]; `subscribe` registers a handler for one push kind
/// and returns an RAII [`Subscription`].
#[async_trait]
pub trait Transport: Send + Sync {
	fn mode(&self) -> ConnectionMode;

	fn is_connected(&self) -> bool;

	/// Sends `kind` with `payload` and awaits the correlated response.
	async fn call(&self, kind: &str, payload: Value) -> Result<Value>;

	fn subscribe(&self, kind: &str, handler: EventHandler) -> Subscription;

	/// Re-establishes the link with a fresh retry budget.
	async fn reconnect(&self) -> Result<()>;

	/// Releases the link and background tasks. Idempotent.
	fn shutdown(&self);
}

/// Outbound half of a link. Each item is one text frame.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = Error> + Send>>;

/// Inbound half of a link. Ends when the peer closes.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// An established duplex text link.
pub struct Link {
	pub sink: FrameSink,
	pub stream: FrameStream,
}

impl Link {
	pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
		Self { sink, stream }
	}
}

impl std::fmt::Debug for Link {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Link").finish_non_exhaustive()
	}
}

/// Opens physical links to the host.
#[async_trait]
pub trait Dialer: Send + Sync {
	async fn dial(&self) -> Result<Link>;

	/// Human-readable endpoint for logs.
	fn endpoint(&self) -> String;
}
