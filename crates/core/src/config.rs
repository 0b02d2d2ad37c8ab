//! Client configuration: [`ClientConfig`].
//!
//! Layering, lowest to highest precedence:
//!
//! 1. Built-in defaults
//! 2. JSON file (`$XDG_CONFIG_HOME/eazy/config.json` or an explicit path)
//! 3. Environment: `EAZY_URL`, `EAZY_TRANSPORT`
//! 4. Command-line flags (applied by the caller)

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use eazy_runtime::{ReconnectPolicy, SocketConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reconciler::ReconcilerConfig;

/// Host WebSocket endpoint advertised on the local network.
pub const DEFAULT_URL: &str = "ws://eazycontroller.local/ws";

/// Overrides [`ClientConfig::url`].
pub const URL_ENV: &str = "EAZY_URL";

/// Overrides [`ClientConfig::transport`].
pub const TRANSPORT_ENV: &str = "EAZY_TRANSPORT";

/// Errors raised while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("Failed to read config {path}: {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Invalid config {path}: {source}")]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("Invalid transport '{0}' (expected auto, socket or in-process)")]
	InvalidTransport(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

/// Which transport to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportPreference {
	/// In-process when a host command interface is available, socket otherwise.
	#[default]
	Auto,
	Socket,
	InProcess,
}

impl FromStr for TransportPreference {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"auto" | "" => Ok(Self::Auto),
			"socket" | "websocket" | "ws" => Ok(Self::Socket),
			"in-process" | "inprocess" | "embedded" => Ok(Self::InProcess),
			other => Err(ConfigError::InvalidTransport(other.to_string())),
		}
	}
}

impl fmt::Display for TransportPreference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Auto => f.write_str("auto"),
			Self::Socket => f.write_str("socket"),
			Self::InProcess => f.write_str("in-process"),
		}
	}
}

/// Client settings. Every field is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
	pub url: String,
	pub transport: TransportPreference,
	pub call_timeout_ms: u64,
	pub reconnect_interval_ms: u64,
	pub max_reconnect_attempts: u32,
	pub refresh_interval_ms: u64,
	pub poll_interval_ms: u64,
	pub poll_attempts: u32,
	pub poll_delay_ms: u64,
	pub overview_timeout_ms: u64,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			url: DEFAULT_URL.to_string(),
			transport: TransportPreference::Auto,
			call_timeout_ms: 10_000,
			reconnect_interval_ms: 3_000,
			max_reconnect_attempts: 10,
			refresh_interval_ms: 2_000,
			poll_interval_ms: 1_000,
			poll_attempts: 10,
			poll_delay_ms: 300,
			overview_timeout_ms: 10_000,
		}
	}
}

impl ClientConfig {
	/// `$XDG_CONFIG_HOME/eazy/config.json`, falling back to `~/.config`.
	pub fn default_path() -> PathBuf {
		let config_home = std::env::var_os("XDG_CONFIG_HOME")
			.map(PathBuf::from)
			.or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
			.unwrap_or_else(|| PathBuf::from("."));
		config_home.join("eazy").join("config.json")
	}

	/// Loads the file layer and applies environment overrides.
	///
	/// An explicit `path` must exist; a missing default file yields defaults.
	pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
		Self::load_with(path, |key| std::env::var(key).ok())
	}

	/// [`load`](Self::load) with environment variables read through `lookup`.
	pub fn load_with(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		let mut config = match path {
			Some(path) => Self::from_file(path)?,
			None => {
				let path = Self::default_path();
				if path.exists() {
					Self::from_file(&path)?
				} else {
					Self::default()
				}
			}
		};
		config.apply_env_from(lookup)?;
		Ok(config)
	}

	pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
		let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
			path: path.to_path_buf(),
			source,
		})?;
		tracing::debug!(path = %path.display(), "Loaded config");
		Ok(config)
	}

	pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)?;
		}
		fs::write(path, serde_json::to_string_pretty(self)?)?;
		Ok(())
	}

	/// Applies `EAZY_URL` / `EAZY_TRANSPORT` as read through `lookup`.
	pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
		if let Some(url) = lookup(URL_ENV).filter(|url| !url.trim().is_empty()) {
			self.url = url;
		}
		if let Some(transport) = lookup(TRANSPORT_ENV) {
			self.transport = transport.parse()?;
		}
		Ok(())
	}

	pub fn call_timeout(&self) -> Duration {
		Duration::from_millis(self.call_timeout_ms)
	}

	pub fn overview_timeout(&self) -> Duration {
		Duration::from_millis(self.overview_timeout_ms)
	}

	pub fn socket_config(&self) -> SocketConfig {
		SocketConfig {
			call_timeout: self.call_timeout(),
			reconnect: ReconnectPolicy {
				interval: Duration::from_millis(self.reconnect_interval_ms),
				max_attempts: self.max_reconnect_attempts,
			},
		}
	}

	pub fn reconciler_config(&self) -> ReconcilerConfig {
		ReconcilerConfig {
			refresh_interval: Duration::from_millis(self.refresh_interval_ms),
			poll_interval: Duration::from_millis(self.poll_interval_ms),
			poll_attempts: self.poll_attempts,
			poll_delay: Duration::from_millis(self.poll_delay_ms),
		}
	}
}
