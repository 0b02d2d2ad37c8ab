//! Socket lifecycle state machine.
//!
//! ```text
//! Idle ──connect──▶ Connecting ──open──▶ Open
//!                       ▲                  │
//!                       │ retry            │ close
//!                       │                  ▼
//!                   Closed(Unexpected) ◀───┤
//!                       │                  └──▶ Closed(Intentional)   (terminal)
//!                       │ budget spent
//!                       ▼
//!                     Failed                                          (terminal)
//! ```
//!
//! The reconnector only decides; the socket supervisor owns timers and dials.

use std::time::Duration;

/// Default delay between reconnect attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(3);

/// Default number of reconnect attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Fixed-interval retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
	pub interval: Duration,
	pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
	fn default() -> Self {
		Self {
			interval: DEFAULT_RECONNECT_INTERVAL,
			max_attempts: DEFAULT_MAX_ATTEMPTS,
		}
	}
}

/// Why a link closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
	/// Closed by the local side; never retried.
	Intentional,
	/// Dropped by the peer or the network.
	Unexpected,
}

/// Observable link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
	Idle,
	Connecting,
	Open,
	Closed(CloseKind),
	/// Reconnect budget exhausted.
	Failed,
}

impl ConnectionState {
	pub fn is_open(self) -> bool {
		self == ConnectionState::Open
	}

	/// Returns true for states no automatic transition leaves.
	pub fn is_terminal(self) -> bool {
		matches!(self, ConnectionState::Closed(CloseKind::Intentional) | ConnectionState::Failed)
	}
}

impl std::fmt::Display for ConnectionState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let label = match self {
			ConnectionState::Idle => "idle",
			ConnectionState::Connecting => "connecting",
			ConnectionState::Open => "open",
			ConnectionState::Closed(CloseKind::Intentional) => "closed",
			ConnectionState::Closed(CloseKind::Unexpected) => "closed (unexpected)",
			ConnectionState::Failed => "failed",
		};
		f.write_str(label)
	}
}

/// What the supervisor should do after a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
	/// Wait `delay`, then dial again as attempt number `attempt` (1-based).
	Retry { attempt: u32, delay: Duration },
	/// Budget spent. Emitted once per failure; the caller publishes
	/// `connection_lost`.
	GiveUp { attempts: u32 },
	/// Nothing to do: intentional close or already failed.
	Stop,
}

/// Bounded reconnect bookkeeping for one socket.
#[derive(Debug, Clone)]
pub struct Reconnector {
	policy: ReconnectPolicy,
	state: ConnectionState,
	attempts: u32,
	intentionally_closed: bool,
}

impl Reconnector {
	pub fn new(policy: ReconnectPolicy) -> Self {
		Self {
			policy,
			state: ConnectionState::Idle,
			attempts: 0,
			intentionally_closed: false,
		}
	}

	pub fn policy(&self) -> ReconnectPolicy {
		self.policy
	}

	pub fn state(&self) -> ConnectionState {
		self.state
	}

	/// Attempts consumed since the last successful open.
	pub fn attempts(&self) -> u32 {
		self.attempts
	}

	pub fn is_intentionally_closed(&self) -> bool {
		self.intentionally_closed
	}

	/// Starts a user-initiated connect with a full attempt budget. Clears the
	/// intentional-close flag.
	pub fn connect(&mut self) {
		self.attempts = 0;
		self.intentionally_closed = false;
		self.state = ConnectionState::Connecting;
	}

	/// Marks a scheduled retry as dialing.
	pub fn begin_retry(&mut self) {
		if !self.intentionally_closed {
			self.state = ConnectionState::Connecting;
		}
	}

	/// The link opened; the attempt budget is refilled.
	pub fn on_open(&mut self) {
		self.attempts = 0;
		self.state = ConnectionState::Open;
	}

	/// The link closed or a dial failed. Decides whether to retry.
	pub fn on_close(&mut self) -> ReconnectDecision {
		if self.intentionally_closed {
			self.state = ConnectionState::Closed(CloseKind::Intentional);
			return ReconnectDecision::Stop;
		}
		if self.state == ConnectionState::Failed {
			return ReconnectDecision::Stop;
		}

		if self.attempts < self.policy.max_attempts {
			self.attempts += 1;
			self.state = ConnectionState::Closed(CloseKind::Unexpected);
			ReconnectDecision::Retry {
				attempt: self.attempts,
				delay: self.policy.interval,
			}
		} else {
			self.state = ConnectionState::Failed;
			ReconnectDecision::GiveUp { attempts: self.attempts }
		}
	}

	/// Records a local close. Any retry decided afterwards is suppressed.
	pub fn disconnect_intentionally(&mut self) {
		self.intentionally_closed = true;
		self.state = ConnectionState::Closed(CloseKind::Intentional);
	}

	/// Back to `Idle` with a full budget.
	pub fn reset(&mut self) {
		self.attempts = 0;
		self.intentionally_closed = false;
		self.state = ConnectionState::Idle;
	}
}

impl Default for Reconnector {
	fn default() -> Self {
		Self::new(ReconnectPolicy::default())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn policy(max_attempts: u32) -> ReconnectPolicy {
		ReconnectPolicy {
			interval: Duration::from_millis(3000),
			max_attempts,
		}
	}

	#[test]
	fn test_happy_path() {
		let mut r = Reconnector::new(policy(10));
		assert_eq!(r.state(), ConnectionState::Idle);
		r.connect();
		assert_eq!(r.state(), ConnectionState::Connecting);
		r.on_open();
		assert!(r.state().is_open());
	}

	#[test]
	fn test_attempt_cap_and_single_give_up() {
		let mut r = Reconnector::new(policy(10));
		r.connect();
		r.on_open();

		for expected in 1..=10 {
			match r.on_close() {
				ReconnectDecision::Retry { attempt, delay } => {
					assert_eq!(attempt, expected);
					assert_eq!(delay, Duration::from_secs(3));
				}
				other => panic!("expected retry, got {other:?}"),
			}
			r.begin_retry();
		}

		assert_eq!(r.on_close(), ReconnectDecision::GiveUp { attempts: 10 });
		assert_eq!(r.state(), ConnectionState::Failed);
		assert_eq!(r.on_close(), ReconnectDecision::Stop);
		assert!(r.state().is_terminal());
	}

	#[test]
	fn test_open_resets_budget() {
		let mut r = Reconnector::new(policy(2));
		r.connect();
		r.on_open();
		assert!(matches!(r.on_close(), ReconnectDecision::Retry { attempt: 1, .. }));
		assert!(matches!(r.on_close(), ReconnectDecision::Retry { attempt: 2, .. }));
		r.on_open();
		assert_eq!(r.attempts(), 0);
		assert!(matches!(r.on_close(), ReconnectDecision::Retry { attempt: 1, .. }));
	}

	#[test]
	fn test_intentional_close_never_retries() {
		let mut r = Reconnector::new(policy(10));
		r.connect();
		r.on_open();
		r.disconnect_intentionally();

		assert_eq!(r.on_close(), ReconnectDecision::Stop);
		r.begin_retry();
		assert_eq!(r.state(), ConnectionState::Closed(CloseKind::Intentional));
	}

	#[test]
	fn test_zero_budget_gives_up_immediately() {
		let mut r = Reconnector::new(policy(0));
		r.connect();
		r.on_open();
		assert_eq!(r.on_close(), ReconnectDecision::GiveUp { attempts: 0 });
	}

	#[test]
	fn test_reset_and_connect_clear_flags() {
		let mut r = Reconnector::new(policy(1));
		r.connect();
		r.on_open();
		r.on_close();
		r.on_close();
		assert_eq!(r.state(), ConnectionState::Failed);

		r.reset();
		assert_eq!(r.state(), ConnectionState::Idle);
		r.disconnect_intentionally();
		r.connect();
		assert!(!r.is_intentionally_closed());
	}

	#[test]
	fn test_connect_after_failure_refills_budget() {
		let mut r = Reconnector::new(policy(2));
		r.connect();
		r.on_open();
		r.on_close();
		r.on_close();
		assert_eq!(r.on_close(), ReconnectDecision::GiveUp { attempts: 2 });

		r.connect();
		assert_eq!(r.attempts(), 0);
		assert!(matches!(r.on_close(), ReconnectDecision::Retry { attempt: 1, .. }));
	}
}
