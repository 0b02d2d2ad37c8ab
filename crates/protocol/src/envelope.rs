//! The JSON envelope carried by every socket frame in both directions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kinds::{ERROR, PushKind};

/// Bidirectional wire envelope: `{ "type": string, "data"?: any, "message"?: string }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
	/// Request, response or event kind.
	#[serde(rename = "type")]
	pub kind: String,
	/// Structured payload.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
	/// Human-readable detail, used by the host for confirmations and errors.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl Envelope {
	/// Builds an outgoing request envelope. A `null` payload is omitted.
	pub fn request(kind: impl Into<String>, data: Value) -> Self {
		Self {
			kind: kind.into(),
			data: (!data.is_null()).then_some(data),
			message: None,
		}
	}

	/// Parses a text frame.
	pub fn parse(text: &str) -> serde_json::Result<Self> {
		serde_json::from_str(text)
	}

	/// Serializes the envelope into a text frame.
	pub fn to_text(&self) -> serde_json::Result<String> {
		serde_json::to_string(self)
	}

	/// Returns the push kind if this envelope is an unsolicited event.
	pub fn push_kind(&self) -> Option<PushKind> {
		PushKind::from_wire(&self.kind)
	}

	/// Returns true if the host reported a failure.
	pub fn is_error(&self) -> bool {
		self.kind == ERROR
	}

	/// Payload handed to whoever awaits this envelope: `data`, falling back to
	/// `message`, falling back to `null`.
	pub fn payload(&self) -> Value {
		match (&self.data, &self.message) {
			(Some(data), _) => data.clone(),
			(None, Some(message)) => Value::String(message.clone()),
			(None, None) => Value::Null,
		}
	}

	/// Error detail for an `error` envelope.
	pub fn error_detail(&self) -> String {
		match self.payload() {
			Value::String(detail) => detail,
			Value::Null => "unknown host error".to_string(),
			other => other.to_string(),
		}
	}
}
