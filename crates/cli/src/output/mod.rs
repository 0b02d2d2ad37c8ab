//! Result envelope and rendering for CLI commands.
//!
//! ## Output Contract
//!
//! With `--format json` every command prints one envelope on stdout:
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "ok": true,
//!   "command": "sessions",
//!   "data": { ... },
//!   "timings": { "durationMs": 42 }
//! }
//! ```
//!
//! On failure `data` is replaced by `error: { code, message }`. With
//! `--format text` only the data is rendered, for humans.


use std::fmt;
use std::io::{self, Write};
use std::time::Instant;

use serde::Serialize;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Plain lines for a terminal
	#[default]
	Text,
	/// One JSON envelope per command
	Json,
}

/// Data that knows how to print itself for `--format text`.
pub trait TextOutput {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()>;
}

impl TextOutput for () {
	fn write_text(&self, _out: &mut dyn Write) -> io::Result<()> {
		Ok(())
	}
}

impl TextOutput for String {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		writeln!(out, "{self}")
	}
}

/// Envelope around one command's outcome.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T> {
	pub schema_version: u32,
	pub ok: bool,
	/// Dotted command name, e.g. `media.next`.
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
	pub timings: Timings,
}

impl<T> CommandResult<T> {
	pub fn success(command: impl Into<String>, data: T, started: Instant) -> Self {
		Self {
			schema_version: SCHEMA_VERSION,
			ok: true,
			command: command.into(),
			data: Some(data),
			error: None,
			timings: Timings::since(started),
		}
	}

	pub fn failure(command: impl Into<String>, error: CommandError, started: Instant) -> Self {
		Self {
			schema_version: SCHEMA_VERSION,
			ok: false,
			command: command.into(),
			data: None,
			error: Some(error),
			timings: Timings::since(started),
		}
	}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

impl CommandError {
	pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
		Self {
			code,
			message: message.into(),
			details: None,
		}
	}
}

/// Stable codes for scripts consuming `--format json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// No usable link to the host
	NotConnected,
	Timeout,
	/// The host answered with an error
	HostError,
	/// The host answered with something unexpected
	ProtocolError,
	ConfigError,
	InvalidInput,
	IoError,
	InternalError,
}

impl ErrorCode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::NotConnected => "NOT_CONNECTED",
			Self::Timeout => "TIMEOUT",
			Self::HostError => "HOST_ERROR",
			Self::ProtocolError => "PROTOCOL_ERROR",
			Self::ConfigError => "CONFIG_ERROR",
			Self::InvalidInput => "INVALID_INPUT",
			Self::IoError => "IO_ERROR",
			Self::InternalError => "INTERNAL_ERROR",
		}
	}
}

impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
	pub duration_ms: u64,
}

impl Timings {
	fn since(started: Instant) -> Self {
		Self {
			duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
		}
	}
}

pub fn print_result<T: Serialize + TextOutput>(result: &CommandResult<T>, format: OutputFormat) {
	let _ = write_result(&mut io::stdout().lock(), result, format);
}

/// Renders `result` into `out`.
pub fn write_result<T: Serialize + TextOutput>(
	out: &mut dyn Write,
	result: &CommandResult<T>,
	format: OutputFormat,
) -> io::Result<()> {
	match (format, &result.data, &result.error) {
		(OutputFormat::Json, ..) => {
			let json = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
			writeln!(out, "{json}")
		}
		(OutputFormat::Text, _, Some(error)) => writeln!(out, "Error [{}]: {}", error.code, error.message),
		(OutputFormat::Text, Some(data), None) => data.write_text(out),
		(OutputFormat::Text, None, None) => Ok(()),
	}
}

pub fn print_error_stderr(error: &CommandError) {
	eprintln!("Error [{}]: {}", error.code, error.message);
}

/// Single-line JSON, for streaming commands.
pub fn print_json_line<T: Serialize>(value: &T) {
	if let Ok(json) = serde_json::to_string(value) {
		println!("{json}");
	}
}
