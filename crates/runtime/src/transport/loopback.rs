use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use eazy_protocol::Envelope;
use futures_util::{sink, stream};
use serde_json::Value;
use tokio::sync::mpsc;

use super::{Dialer, Link};
use crate::error::{Error, Result};

/// In-memory dialer. Every successful dial hands the far end of the new link
/// to whoever holds the peer receiver returned by [`LoopbackDialer::new`].
pub struct LoopbackDialer {
	peers: mpsc::UnboundedSender<LoopbackPeer>,
	refusing: AtomicBool,
	dials: AtomicUsize,
}

impl LoopbackDialer {
	pub fn new() -> (Self, mpsc::UnboundedReceiver<LoopbackPeer>) {
		let (peers, rx) = mpsc::unbounded_channel();
		let dialer = Self {
			peers,
			refusing: AtomicBool::new(false),
			dials: AtomicUsize::new(0),
		};
		(dialer, rx)
	}

	/// Makes subsequent dials fail with [`Error::ConnectionFailed`].
	pub fn set_refusing(&self, refusing: bool) {
		self.refusing.store(refusing, Ordering::SeqCst);
	}

	/// Number of dial attempts so far, failed ones included.
	pub fn dial_count(&self) -> usize {
		self.dials.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl Dialer for LoopbackDialer {
	async fn dial(&self) -> Result<Link> {
		let attempt = self.dials.fetch_add(1, Ordering::SeqCst) + 1;
		if self.refusing.load(Ordering::SeqCst) {
			tracing::debug!(attempt, "Loopback dial refused");
			return Err(Error::ConnectionFailed("loopback peer refused".into()));
		}

		let (client_tx, peer_rx) = mpsc::unbounded_channel::<String>();
		let (peer_tx, client_rx) = mpsc::unbounded_channel::<String>();

		let peer = LoopbackPeer {
			inbound: peer_rx,
			outbound: peer_tx,
		};
		if self.peers.send(peer).is_err() {
			return Err(Error::ConnectionFailed("loopback peer receiver dropped".into()));
		}

		let sink = sink::unfold(client_tx, |tx, frame: String| async move {
			tx.send(frame).map_err(|_| Error::ChannelClosed)?;
			Ok::<_, Error>(tx)
		});
		let stream = stream::unfold(client_rx, |mut rx| async move {
			let frame = rx.recv().await?;
			Some((Ok::<_, Error>(frame), rx))
		});

		Ok(Link::new(Box::pin(sink), Box::pin(stream)))
	}

	fn endpoint(&self) -> String {
		"loopback".to_string()
	}
}

/// Far end of a loopback link, acting as the host.
///
/// Dropping the peer closes the link from the host side.
pub struct LoopbackPeer {
	inbound: mpsc::UnboundedReceiver<String>,
	outbound: mpsc::UnboundedSender<String>,
}

impl LoopbackPeer {
	/// Next raw frame sent by the client, or `None` once it hung up.
	pub async fn recv(&mut self) -> Option<String> {
		self.inbound.recv().await
	}

	/// Next frame sent by the client, parsed. Unparseable frames are skipped.
	pub async fn recv_envelope(&mut self) -> Option<Envelope> {
		loop {
			let text = self.recv().await?;
			match Envelope::parse(&text) {
				Ok(envelope) => return Some(envelope),
				Err(e) => tracing::debug!(error = %e, "Loopback peer skipped unparseable frame"),
			}
		}
	}

	/// Sends a raw text frame to the client.
	pub fn send_raw(&self, text: impl Into<String>) -> bool {
		self.outbound.send(text.into()).is_ok()
	}

	pub fn send_envelope(&self, envelope: &Envelope) -> bool {
		match envelope.to_text() {
			Ok(text) => self.send_raw(text),
			Err(_) => false,
		}
	}

	/// Sends `{type: kind, data}` to the client.
	pub fn reply(&self, kind: &str, data: Value) -> bool {
		self.send_envelope(&Envelope {
			kind: kind.to_string(),
			data: Some(data),
			message: None,
		})
	}

	/// Closes the link from the host side.
	pub fn close(self) {}
}
