//! In-process transport over the host's native command interface.
//!
//! When the client runs inside the host process there is no socket: requests
//! become direct command invocations and push events are handed to a
//! [`HostEventSink`]. The native command layer expects camelCase argument
//! keys and names its events with hyphens; both are normalized here so call
//! sites see the same contract as over the socket.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eazy_protocol::{PushKind, response_kind_for};
use serde_json::{Map, Value};

use crate::correlator::DEFAULT_CALL_TIMEOUT;
use crate::error::{Error, Result};
use crate::events::{EventBus, EventHandler, Subscription};
use crate::transport::{ConnectionMode, Transport};

/// The host's native command interface.
#[async_trait]
pub trait HostCommands: Send + Sync {
	/// Runs `command` with camelCase `args`. Failures come back as the host's
	/// error message.
	async fn invoke(&self, command: &str, args: Value) -> std::result::Result<Value, String>;
}

/// [`Transport`] backed by [`HostCommands`].
pub struct HostCommandTransport {
	commands: Arc<dyn HostCommands>,
	events: EventBus,
	call_timeout: Duration,
}

impl HostCommandTransport {
	pub fn new(commands: Arc<dyn HostCommands>) -> Self {
		Self::with_timeout(commands, DEFAULT_CALL_TIMEOUT)
	}

	pub fn with_timeout(commands: Arc<dyn HostCommands>, call_timeout: Duration) -> Self {
		Self {
			commands,
			events: EventBus::new(),
			call_timeout,
		}
	}

	/// Handle the host uses to push events into this transport.
	pub fn event_sink(&self) -> HostEventSink {
		HostEventSink {
			events: self.events.clone(),
		}
	}
}

impl std::fmt::Debug for HostCommandTransport {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HostCommandTransport")
			.field("call_timeout", &self.call_timeout)
			.finish_non_exhaustive()
	}
}

#[async_trait]
impl Transport for HostCommandTransport {
	fn mode(&self) -> ConnectionMode {
		ConnectionMode::InProcess
	}

	fn is_connected(&self) -> bool {
		true
	}

	async fn call(&self, kind: &str, payload: Value) -> Result<Value> {
		let args = camel_case_args(payload);
		tracing::debug!(command = kind, "Invoking host command");

		match tokio::time::timeout(self.call_timeout, self.commands.invoke(kind, args)).await {
			Ok(Ok(value)) => Ok(value),
			Ok(Err(message)) => {
				tracing::debug!(command = kind, error = %message, "Host command failed");
				Err(Error::Host(message))
			}
			Err(_) => Err(Error::Timeout {
				kind: kind.to_string(),
				expected: response_kind_for(kind).to_string(),
				timeout_ms: self.call_timeout.as_millis() as u64,
			}),
		}
	}

	fn subscribe(&self, kind: &str, handler: EventHandler) -> Subscription {
		self.events.subscribe_arc(kind, handler)
	}

	async fn reconnect(&self) -> Result<()> {
		Ok(())
	}

	fn shutdown(&self) {
		self.events.clear();
	}
}

/// Entry point for host-originated push events.
#[derive(Clone, Debug)]
pub struct HostEventSink {
	events: EventBus,
}

impl HostEventSink {
	/// Publishes `name` to subscribers. Hyphenated host event names are
	/// delivered under their underscore form. Returns the number of handlers
	/// invoked.
	pub fn emit(&self, name: &str, payload: Value) -> usize {
		let kind = match PushKind::from_any(name) {
			Some(push) => push.as_str().to_string(),
			None => name.replace('-', "_"),
		};
		self.events.emit(&kind, &payload)
	}
}

/// Converts top-level snake_case keys to camelCase. `null` becomes `{}`.
fn camel_case_args(payload: Value) -> Value {
	match payload {
		Value::Null => Value::Object(Map::new()),
		Value::Object(map) => Value::Object(map.into_iter().map(|(key, value)| (to_camel_case(&key), value)).collect()),
		other => other,
	}
}

fn to_camel_case(key: &str) -> String {
	let mut out = String::with_capacity(key.len());
	let mut upper_next = false;
	for ch in key.chars() {
		if ch == '_' {
			upper_next = !out.is_empty();
		} else if upper_next {
			out.extend(ch.to_uppercase());
			upper_next = false;
		} else {
			out.push(ch);
		}
	}
	out
}
