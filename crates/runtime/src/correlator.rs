//! Request/response correlation by response kind.
//!
//! The host does not echo request identifiers, so an inbound response is
//! matched to the **oldest** pending request whose expected response kind
//! equals the response's `type`. Concurrent requests of the same kind
//! therefore resolve in issuance order.
//!
//! # Lifecycle of a pending entry
//!
//! 1. [`Correlator::issue`] records a pending entry and returns a
//!    [`ResponseFuture`] armed with the call timeout
//! 2. Exactly one of the following removes the entry:
//!    - [`Correlator::deliver`] resolves it with a payload
//!    - [`Correlator::deliver_error`] or [`Correlator::reject_all`] rejects it
//!    - the timeout fires and the future rejects with [`Error::Timeout`]
//!    - the future is dropped (cancellation)
//! 3. Every removal happens under the pending-map lock and the result is sent
//!    while that lock is held, so the first remover wins and later attempts
//!    find nothing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::{Instant, Sleep, sleep_until};

use crate::error::{Error, Result};

/// Default window for a call to be answered.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// An outgoing request as tracked by the correlator.
#[derive(Debug, Clone)]
pub struct Request {
	pub kind: String,
	pub payload: Value,
	/// Response `type` that resolves this request.
	pub expected: String,
	pub issued_at: Instant,
}

struct PendingEntry {
	request: Request,
	tx: oneshot::Sender<Result<Value>>,
	expiry: Instant,
}

impl PendingEntry {
	fn timeout_error(&self, timeout: Duration) -> Error {
		Error::Timeout {
			kind: self.request.kind.clone(),
			expected: self.request.expected.clone(),
			timeout_ms: timeout.as_millis() as u64,
		}
	}
}

/// Pending entries in issuance order, keyed by a local sequence number.
type PendingMap = Arc<Mutex<IndexMap<u64, PendingEntry>>>;

/// Tracks in-flight requests and resolves them from inbound responses.
pub struct Correlator {
	next_id: AtomicU64,
	pending: PendingMap,
	timeout: Duration,
}

impl Default for Correlator {
	fn default() -> Self {
		Self::new(DEFAULT_CALL_TIMEOUT)
	}
}

impl Correlator {
	pub fn new(timeout: Duration) -> Self {
		Self {
			next_id: AtomicU64::new(1),
			pending: Arc::new(Mutex::new(IndexMap::new())),
			timeout,
		}
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Records a pending request and returns the future that settles it.
	pub fn issue(&self, kind: &str, payload: Value, expected: &str) -> ResponseFuture {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let issued_at = Instant::now();
		let expiry = issued_at + self.timeout;
		let (tx, rx) = oneshot::channel();

		let request = Request {
			kind: kind.to_string(),
			payload,
			expected: expected.to_string(),
			issued_at,
		};
		tracing::debug!(id, kind, expected, "Issuing request");
		self.pending.lock().insert(id, PendingEntry { request, tx, expiry });

		ResponseFuture {
			rx,
			guard: CancelGuard {
				id,
				pending: Arc::clone(&self.pending),
				completed: false,
			},
			sleep: Box::pin(sleep_until(expiry)),
			timeout: self.timeout,
		}
	}

	/// Resolves the oldest pending request expecting `kind`.
	///
	/// Returns false when nothing was waiting for it (late or unsolicited
	/// response); the payload is dropped.
	pub fn deliver(&self, kind: &str, payload: Value) -> bool {
		let mut pending = self.pending.lock();
		self.purge_expired(&mut pending);

		let Some(index) = pending.values().position(|entry| entry.request.expected == kind) else {
			tracing::debug!(kind, "Dropping unsolicited response");
			return false;
		};
		if let Some((id, entry)) = pending.shift_remove_index(index) {
			tracing::debug!(id, kind, request = %entry.request.kind, "Resolved request");
			let _ = entry.tx.send(Ok(payload));
		}
		true
	}

	/// Rejects the oldest pending request, whatever its kind, with a host error.
	pub fn deliver_error(&self, detail: impl Into<String>) -> bool {
		let detail = detail.into();
		let mut pending = self.pending.lock();
		self.purge_expired(&mut pending);

		match pending.shift_remove_index(0) {
			Some((id, entry)) => {
				tracing::debug!(id, request = %entry.request.kind, detail = %detail, "Host rejected request");
				let _ = entry.tx.send(Err(Error::Host(detail)));
				true
			}
			None => {
				tracing::warn!(detail = %detail, "Host error with no pending request");
				false
			}
		}
	}

	/// Rejects every pending request with the error produced by `make_err`.
	pub fn reject_all(&self, make_err: impl Fn() -> Error) -> usize {
		let mut pending = self.pending.lock();
		let count = pending.len();
		for (_, entry) in pending.drain(..) {
			let _ = entry.tx.send(Err(make_err()));
		}
		if count > 0 {
			tracing::debug!(count, "Rejected all pending requests");
		}
		count
	}

	/// Number of requests still awaiting a response.
	pub fn pending_count(&self) -> usize {
		self.pending.lock().len()
	}

	/// Snapshot of the pending requests, oldest first.
	pub fn pending_requests(&self) -> Vec<Request> {
		self.pending.lock().values().map(|entry| entry.request.clone()).collect()
	}

	/// Expires entries whose deadline passed before their future was polled,
	/// so a late response can never resolve them.
	fn purge_expired(&self, pending: &mut IndexMap<u64, PendingEntry>) {
		let now = Instant::now();
		let expired: Vec<u64> = pending
			.iter()
			.filter(|(_, entry)| entry.expiry <= now)
			.map(|(id, _)| *id)
			.collect();

		for id in expired {
			if let Some(entry) = pending.shift_remove(&id) {
				let err = entry.timeout_error(self.timeout);
				tracing::debug!(id, request = %entry.request.kind, "Request expired");
				let _ = entry.tx.send(Err(err));
			}
		}
	}
}

impl std::fmt::Debug for Correlator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Correlator")
			.field("pending", &self.pending_count())
			.field("timeout", &self.timeout)
			.finish()
	}
}

/// RAII guard ensuring the pending entry is removed when a response future is
/// dropped before settling.
struct CancelGuard {
	id: u64,
	pending: PendingMap,
	completed: bool,
}

impl CancelGuard {
	fn complete(&mut self) {
		self.completed = true;
	}
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if self.completed {
			return;
		}
		if self.pending.lock().shift_remove(&self.id).is_some() {
			tracing::debug!(id = self.id, "CancelGuard: removed orphaned request");
		}
	}
}

/// Future returned by [`Correlator::issue`].
///
/// Settles with the delivered payload, a host error, or [`Error::Timeout`].
pub struct ResponseFuture {
	rx: oneshot::Receiver<Result<Value>>,
	guard: CancelGuard,
	sleep: Pin<Box<Sleep>>,
	timeout: Duration,
}

impl Future for ResponseFuture {
	type Output = Result<Value>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let this = &mut *self;

		if let Poll::Ready(result) = Pin::new(&mut this.rx).poll(cx) {
			this.guard.complete();
			return Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r));
		}

		if this.sleep.as_mut().poll(cx).is_pending() {
			return Poll::Pending;
		}

		this.guard.complete();
		let removed = this.guard.pending.lock().shift_remove(&this.guard.id);
		match removed {
			Some(entry) => {
				tracing::debug!(id = this.guard.id, request = %entry.request.kind, "Request timed out");
				Poll::Ready(Err(entry.timeout_error(this.timeout)))
			}
			// Settled concurrently: the result is already in the channel.
			None => Poll::Ready(this.rx.try_recv().map_err(|_| Error::ChannelClosed).and_then(|r| r)),
		}
	}
}
