//! Host data types and request payloads.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// An application's independent volume/mute control unit on the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSession {
	pub name: String,
	/// Linear volume in `0.0..=1.0`.
	pub volume: f32,
	pub is_muted: bool,
}

/// An audio output device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDevice {
	pub id: String,
	pub name: String,
	pub is_default: bool,
}

/// A host-tracked playback source with transport controls and metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
	/// Stable identity of the media session.
	pub session_id: String,
	pub app_name: String,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub artist: String,
	#[serde(default)]
	pub album: String,
	pub is_playing: bool,
	/// Base64-encoded PNG cover art.
	#[serde(default)]
	pub thumbnail: Option<String>,
	#[serde(default)]
	pub can_go_next: bool,
	#[serde(default)]
	pub can_go_previous: bool,
}

impl MediaInfo {
	/// Returns true if any of title, artist or album is populated.
	pub fn has_metadata(&self) -> bool {
		!self.title.is_empty() || !self.artist.is_empty() || !self.album.is_empty()
	}

	/// Returns true if the metadata identifying the displayed content differs.
	pub fn display_differs(&self, other: &MediaInfo) -> bool {
		self.title != other.title || self.artist != other.artist || self.album != other.album
	}

	/// Returns true if any tracked field differs. The thumbnail is not tracked.
	pub fn tracked_differs(&self, other: &MediaInfo) -> bool {
		self.display_differs(other)
			|| self.is_playing != other.is_playing
			|| self.app_name != other.app_name
			|| self.can_go_next != other.can_go_next
			|| self.can_go_previous != other.can_go_previous
	}

	/// Returns true if this session can move in `direction`.
	pub fn can_skip(&self, direction: SkipDirection) -> bool {
		match direction {
			SkipDirection::Next => self.can_go_next,
			SkipDirection::Previous => self.can_go_previous,
		}
	}

	/// Decodes the thumbnail into raw PNG bytes.
	pub fn thumbnail_bytes(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
		self.thumbnail.as_deref().map(|encoded| STANDARD.decode(encoded))
	}
}

/// Track skip direction for next/previous commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipDirection {
	Next,
	Previous,
}

/// Payload of `set_session_volume`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionVolumeParams {
	pub session_name: String,
	pub volume: f32,
}

/// Payload of `set_session_mute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMuteParams {
	pub session_name: String,
	pub mute: bool,
}

/// Payload of `set_default_device`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultDeviceParams {
	pub device_id: String,
}

/// Payload of `set_default_device_volume`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeParams {
	pub volume: f32,
}

/// Payload of `set_default_device_mute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuteParams {
	pub mute: bool,
}

/// Payload of media commands and thumbnail requests. `None` targets the
/// host's current session and is sent as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MediaTarget {
	pub session_id: Option<String>,
}

impl MediaTarget {
	pub fn new(session_id: Option<&str>) -> Self {
		Self {
			session_id: session_id.map(str::to_string),
		}
	}
}
