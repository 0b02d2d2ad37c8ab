use std::path::PathBuf;

use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Config(#[from] eazy::ConfigError),

	#[error(transparent)]
	Host(#[from] eazy::Error),

	#[error("no media session to act on")]
	NoMediaSession,

	#[error("thumbnail for {session} is not valid base64: {source}")]
	BadThumbnail {
		session: String,
		#[source]
		source: base64::DecodeError,
	},

	#[error("failed to write {path}: {source}")]
	Write {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("connection to the host was lost")]
	ConnectionLost,

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

impl CliError {
	/// Convert this error to a CommandError for structured output
	pub fn to_command_error(&self) -> CommandError {
		let (code, details) = match self {
			CliError::Config(_) => (ErrorCode::ConfigError, None),
			CliError::Host(err) => (classify_host_error(err), None),
			CliError::NoMediaSession => (ErrorCode::InvalidInput, None),
			CliError::BadThumbnail { session, .. } => {
				(ErrorCode::ProtocolError, Some(serde_json::json!({ "session": session })))
			}
			CliError::Write { path, .. } => (ErrorCode::IoError, Some(serde_json::json!({ "path": path }))),
			CliError::ConnectionLost => (ErrorCode::NotConnected, None),
			CliError::Io(_) => (ErrorCode::IoError, None),
			CliError::Anyhow(_) => (ErrorCode::InternalError, None),
		};

		CommandError {
			code,
			message: self.to_string(),
			details,
		}
	}
}

fn classify_host_error(err: &eazy::Error) -> ErrorCode {
	use eazy::Error;

	match err {
		Error::NotConnected
		| Error::ConnectionFailed(_)
		| Error::ReconnectExhausted { .. }
		| Error::TransportError(_)
		| Error::ChannelClosed => ErrorCode::NotConnected,
		Error::Timeout { .. } => ErrorCode::Timeout,
		Error::Host(_) => ErrorCode::HostError,
		Error::MalformedMessage(_) | Error::UnexpectedPayload { .. } => ErrorCode::ProtocolError,
		Error::Io(_) => ErrorCode::IoError,
		Error::Json(_) => ErrorCode::InternalError,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn host_errors_map_to_codes() {
		let timeout = CliError::from(eazy::Error::Timeout {
			kind: "get_audio_sessions".into(),
			expected: "audio_sessions".into(),
			timeout_ms: 10_000,
		});
		assert_eq!(timeout.to_command_error().code, ErrorCode::Timeout);

		let host = CliError::from(eazy::Error::Host("Session not found".into())).to_command_error();
		assert_eq!(host.code, ErrorCode::HostError);
		assert_eq!(host.message, "Host error: Session not found");

		assert_eq!(
			CliError::from(eazy::Error::NotConnected).to_command_error().code,
			ErrorCode::NotConnected
		);
	}

	#[test]
	fn write_error_carries_path() {
		let err = CliError::Write {
			path: PathBuf::from("/tmp/cover.png"),
			source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
		}
		.to_command_error();
		assert_eq!(err.code, ErrorCode::IoError);
		assert_eq!(err.details, Some(serde_json::json!({ "path": "/tmp/cover.png" })));
	}
}
