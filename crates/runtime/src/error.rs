//! Error types for the Eazy runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the host.
#[derive(Debug, Error)]
pub enum Error {
	/// No open link when a call was issued.
	#[error("Not connected to the host")]
	NotConnected,

	/// No correlated response arrived within the call window.
	#[error("Timeout: no {expected} response to {kind} within {timeout_ms}ms")]
	Timeout {
		kind: String,
		expected: String,
		timeout_ms: u64,
	},

	/// The host explicitly reported a failure.
	#[error("Host error: {0}")]
	Host(String),

	/// The reconnect budget was spent without re-establishing the link.
	#[error("Connection lost after {attempts} reconnect attempts")]
	ReconnectExhausted { attempts: u32 },

	/// An inbound frame could not be parsed.
	#[error("Malformed message: {0}")]
	MalformedMessage(String),

	/// Failed to establish the link.
	#[error("Failed to connect to host: {0}")]
	ConnectionFailed(String),

	/// Link-level read/write failure.
	#[error("Transport error: {0}")]
	TransportError(String),

	/// A response payload did not have the expected shape.
	#[error("Unexpected {kind} payload: {message}")]
	UnexpectedPayload { kind: String, message: String },

	/// Response channel dropped before a result was delivered.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout { .. })
	}

	/// Returns true if the call failed because no link was open.
	pub fn is_not_connected(&self) -> bool {
		matches!(self, Error::NotConnected | Error::ChannelClosed)
	}

	/// Returns the host-provided detail if this is a host error.
	pub fn host_detail(&self) -> Option<&str> {
		match self {
			Error::Host(detail) => Some(detail),
			_ => None,
		}
	}
}
