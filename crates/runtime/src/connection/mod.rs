//! Reconnecting socket transport.
//!
//! [`SocketTransport`] composes a [`Correlator`], a [`Reconnector`] and an
//! [`EventBus`] over links produced by a [`Dialer`].
//!
//! # Message flow
//!
//! 1. `call` serializes `{type, data}`, registers a pending entry keyed by the
//!    expected response kind and queues the frame on the outbound channel
//! 2. The supervisor task writes queued frames and reads inbound frames
//! 3. Inbound push kinds go to the event bus, `error` rejects the oldest
//!    pending call, anything else is delivered to the correlator
//! 4. When the link drops, the supervisor asks the reconnector whether to
//!    retry; once the budget is spent it publishes `connection_lost` once
//!
//! Subscriptions live on the event bus, which outlives individual links, so
//! handlers survive reconnects.

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eazy_protocol::{CONNECTION_LOST, Envelope, response_kind_for};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, watch};

use crate::correlator::{Correlator, DEFAULT_CALL_TIMEOUT};
use crate::error::{Error, Result};
use crate::events::{EventBus, EventHandler, Subscription};
use crate::reconnector::{ConnectionState, ReconnectDecision, ReconnectPolicy, Reconnector};
use crate::task::ScheduledTask;
use crate::transport::{ConnectionMode, Dialer, Link, Transport, WebSocketDialer};

/// Tuning for a [`SocketTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketConfig {
	pub call_timeout: Duration,
	pub reconnect: ReconnectPolicy,
}

impl Default for SocketConfig {
	fn default() -> Self {
		Self {
			call_timeout: DEFAULT_CALL_TIMEOUT,
			reconnect: ReconnectPolicy::default(),
		}
	}
}

/// JSON-envelope client for the host's socket endpoint.
///
/// Dropping the transport disconnects it.
pub struct SocketTransport {
	inner: Arc<Inner>,
}

struct Inner {
	dialer: Arc<dyn Dialer>,
	correlator: Correlator,
	events: EventBus,
	reconnector: Mutex<Reconnector>,
	/// Frames queued for the live link. `None` while no link is open.
	outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
	state: watch::Sender<ConnectionState>,
	supervisor: Mutex<Option<ScheduledTask>>,
}

impl SocketTransport {
	pub fn new(dialer: Arc<dyn Dialer>, config: SocketConfig) -> Self {
		let (state, _) = watch::channel(ConnectionState::Idle);
		Self {
			inner: Arc::new(Inner {
				dialer,
				correlator: Correlator::new(config.call_timeout),
				events: EventBus::new(),
				reconnector: Mutex::new(Reconnector::new(config.reconnect)),
				outbound: Mutex::new(None),
				state,
				supervisor: Mutex::new(None),
			}),
		}
	}

	/// Transport that dials `url` over WebSocket.
	pub fn websocket(url: impl Into<String>, config: SocketConfig) -> Self {
		Self::new(Arc::new(WebSocketDialer::new(url)), config)
	}

	/// Opens the link.
	///
	/// A failed first dial is returned to the caller and also counts as an
	/// unexpected close, so background retries continue under the normal
	/// budget.
	pub async fn connect(&self) -> Result<()> {
		if self.is_connected() {
			return Ok(());
		}
		self.inner.stop_supervisor();
		self.inner.reconnector.lock().connect();
		self.inner.publish_state();

		let endpoint = self.inner.dialer.endpoint();
		tracing::info!(%endpoint, "Connecting to host");

		let dialed = self.inner.dialer.dial().await;
		if self.inner.reconnector.lock().is_intentionally_closed() {
			tracing::debug!(%endpoint, "Disconnected while dialing");
			return Err(Error::NotConnected);
		}

		let (first, outcome) = match dialed {
			Ok(link) => {
				let outbound = self.inner.attach();
				tracing::info!(%endpoint, "Connected to host");
				(Some((link, outbound)), Ok(()))
			}
			Err(e) => {
				tracing::warn!(%endpoint, error = %e, "Initial connection failed");
				(None, Err(e))
			}
		};

		let inner = Arc::clone(&self.inner);
		let task = ScheduledTask::spawn("socket-supervisor", inner.supervise(first));
		*self.inner.supervisor.lock() = Some(task);
		outcome
	}

	/// Closes the link without scheduling a retry. Idempotent.
	///
	/// Pending calls are rejected with [`Error::NotConnected`].
	pub fn disconnect(&self) {
		let was_active = {
			let mut reconnector = self.inner.reconnector.lock();
			let was_active = !reconnector.is_intentionally_closed() && reconnector.state() != ConnectionState::Idle;
			reconnector.disconnect_intentionally();
			was_active
		};
		self.inner.stop_supervisor();
		self.inner.outbound.lock().take();
		let rejected = self.inner.correlator.reject_all(|| Error::NotConnected);
		self.inner.publish_state();

		if was_active {
			tracing::info!(endpoint = %self.inner.dialer.endpoint(), rejected, "Disconnected from host");
		}
	}

	/// Drops the current link intentionally and dials again with a full
	/// retry budget.
	pub async fn reconnect(&self) -> Result<()> {
		self.disconnect();
		self.inner.reconnector.lock().reset();
		self.connect().await
	}

	pub fn state(&self) -> ConnectionState {
		self.inner.reconnector.lock().state()
	}

	/// Receiver observing every state transition.
	pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
		self.inner.state.subscribe()
	}

	pub fn is_connected(&self) -> bool {
		self.state().is_open() && self.inner.outbound.lock().is_some()
	}

	pub fn events(&self) -> &EventBus {
		&self.inner.events
	}

	/// Number of calls awaiting a response.
	pub fn pending_calls(&self) -> usize {
		self.inner.correlator.pending_count()
	}

	pub async fn call(&self, kind: &str, payload: Value) -> Result<Value> {
		let text = Envelope::request(kind, payload.clone()).to_text()?;
		let expected = response_kind_for(kind);

		let response = {
			let outbound = self.inner.outbound.lock();
			let Some(tx) = outbound.as_ref() else {
				return Err(Error::NotConnected);
			};
			// Registered before the frame leaves, so the reply cannot overtake it.
			let response = self.inner.correlator.issue(kind, payload, expected);
			tx.send(text).map_err(|_| Error::NotConnected)?;
			response
		};

		response.await
	}
}

impl Drop for SocketTransport {
	fn drop(&mut self) {
		self.disconnect();
	}
}

impl std::fmt::Debug for SocketTransport {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SocketTransport")
			.field("endpoint", &self.inner.dialer.endpoint())
			.field("state", &self.state())
			.field("pending", &self.inner.correlator.pending_count())
			.finish()
	}
}

#[async_trait]
impl Transport for SocketTransport {
	fn mode(&self) -> ConnectionMode {
		ConnectionMode::Socket
	}

	fn is_connected(&self) -> bool {
		SocketTransport::is_connected(self)
	}

	async fn call(&self, kind: &str, payload: Value) -> Result<Value> {
		SocketTransport::call(self, kind, payload).await
	}

	fn subscribe(&self, kind: &str, handler: EventHandler) -> Subscription {
		self.inner.events.subscribe_arc(kind, handler)
	}

	async fn reconnect(&self) -> Result<()> {
		SocketTransport::reconnect(self).await
	}

	fn shutdown(&self) {
		self.disconnect();
	}
}

impl Inner {
	fn publish_state(&self) {
		let state = self.reconnector.lock().state();
		self.state.send_replace(state);
	}

	fn stop_supervisor(&self) {
		if let Some(task) = self.supervisor.lock().take() {
			task.cancel();
		}
	}

	/// Marks a freshly dialed link as open and returns its outbound queue.
	fn attach(&self) -> mpsc::UnboundedReceiver<String> {
		let (tx, rx) = mpsc::unbounded_channel();
		*self.outbound.lock() = Some(tx);
		self.reconnector.lock().on_open();
		self.publish_state();
		rx
	}

	/// Drives links until an intentional close or an exhausted budget.
	async fn supervise(self: Arc<Self>, mut current: Option<(Link, mpsc::UnboundedReceiver<String>)>) {
		loop {
			if let Some((link, outbound)) = current.take() {
				self.run_link(link, outbound).await;
				let dropped = self.correlator.reject_all(|| Error::NotConnected);
				if dropped > 0 {
					tracing::debug!(dropped, "Rejected calls pending on the closed link");
				}
			}

			let decision = self.reconnector.lock().on_close();
			self.publish_state();

			match decision {
				ReconnectDecision::Retry { attempt, delay } => {
					let max = self.reconnector.lock().policy().max_attempts;
					tracing::warn!(
						attempt,
						max,
						delay_ms = delay.as_millis() as u64,
						"Connection closed unexpectedly, scheduling reconnect"
					);
					tokio::time::sleep(delay).await;

					{
						let mut reconnector = self.reconnector.lock();
						if reconnector.is_intentionally_closed() {
							return;
						}
						reconnector.begin_retry();
					}
					self.publish_state();

					match self.dialer.dial().await {
						Ok(link) => {
							let outbound = self.attach();
							tracing::info!(attempt, endpoint = %self.dialer.endpoint(), "Reconnected to host");
							current = Some((link, outbound));
						}
						Err(e) => {
							tracing::warn!(attempt, error = %e, "Reconnect attempt failed");
						}
					}
				}
				ReconnectDecision::GiveUp { attempts } => {
					tracing::error!(
						attempts,
						endpoint = %self.dialer.endpoint(),
						"{}",
						Error::ReconnectExhausted { attempts }
					);
					self.events.emit(CONNECTION_LOST, &Value::Null);
					return;
				}
				ReconnectDecision::Stop => return,
			}
		}
	}

	/// Pumps one link until either side closes it.
	async fn run_link(&self, link: Link, mut outbound: mpsc::UnboundedReceiver<String>) {
		let Link { mut sink, mut stream } = link;

		loop {
			tokio::select! {
				frame = outbound.recv() => match frame {
					Some(text) => {
						tracing::trace!(frame = %text, "Sending frame");
						if let Err(e) = sink.send(text).await {
							tracing::warn!(error = %e, "Write failed, dropping link");
							break;
						}
					}
					None => break,
				},
				inbound = stream.next() => match inbound {
					Some(Ok(text)) => self.handle_frame(&text),
					Some(Err(e)) => {
						tracing::warn!(error = %e, "Read failed, dropping link");
						break;
					}
					None => {
						tracing::debug!("Host closed the link");
						break;
					}
				},
			}
		}

		self.outbound.lock().take();
		let _ = sink.close().await;
	}

	fn handle_frame(&self, text: &str) {
		let envelope = match Envelope::parse(text) {
			Ok(envelope) => envelope,
			Err(e) => {
				tracing::warn!(error = %e, frame = %text, "Dropping malformed frame");
				return;
			}
		};

		if let Some(push) = envelope.push_kind() {
			let handlers = self.events.emit(push.as_str(), &envelope.payload());
			tracing::debug!(kind = %push, handlers, "Dispatched push event");
			return;
		}

		if envelope.is_error() {
			self.correlator.deliver_error(envelope.error_detail());
			return;
		}

		self.correlator.deliver(&envelope.kind, envelope.payload());
	}
}
