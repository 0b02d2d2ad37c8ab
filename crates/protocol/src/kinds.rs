//! Message kinds and the request → response correlation table.
//!
//! The host does not echo request identifiers. A response is matched to its
//! request by the `type` the host answers with, so every request kind has a
//! fixed expected response kind. Mutations answer with the generic
//! [`SUCCESS`] kind.

use std::fmt;
use std::str::FromStr;

/// Response kind sent by the host for every successful mutation.
pub const SUCCESS: &str = "success";

/// Envelope kind the host uses to report a failed request.
pub const ERROR: &str = "error";

/// Locally emitted event published once the reconnect budget is exhausted.
pub const CONNECTION_LOST: &str = "connection_lost";

/// Every request the client can issue to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
	GetAudioSessions,
	SetSessionVolume,
	SetSessionMute,
	GetAudioDevices,
	SetDefaultDevice,
	GetDefaultDeviceVolume,
	SetDefaultDeviceVolume,
	GetDefaultDeviceMute,
	SetDefaultDeviceMute,
	GetAllMediaSessions,
	GetMediaInfo,
	GetMediaThumbnail,
	MediaPlayPause,
	MediaNext,
	MediaPrevious,
	ResetMediaApi,
	GetMediaApiStatus,
}

impl RequestKind {
	/// All request kinds, in table order.
	pub const ALL: [RequestKind; 17] = [
		RequestKind::GetAudioSessions,
		RequestKind::SetSessionVolume,
		RequestKind::SetSessionMute,
		RequestKind::GetAudioDevices,
		RequestKind::SetDefaultDevice,
		RequestKind::GetDefaultDeviceVolume,
		RequestKind::SetDefaultDeviceVolume,
		RequestKind::GetDefaultDeviceMute,
		RequestKind::SetDefaultDeviceMute,
		RequestKind::GetAllMediaSessions,
		RequestKind::GetMediaInfo,
		RequestKind::GetMediaThumbnail,
		RequestKind::MediaPlayPause,
		RequestKind::MediaNext,
		RequestKind::MediaPrevious,
		RequestKind::ResetMediaApi,
		RequestKind::GetMediaApiStatus,
	];

	/// Wire name of the request (`type` field of the outgoing envelope).
	pub fn as_str(self) -> &'static str {
		match self {
			RequestKind::GetAudioSessions => "get_audio_sessions",
			RequestKind::SetSessionVolume => "set_session_volume",
			RequestKind::SetSessionMute => "set_session_mute",
			RequestKind::GetAudioDevices => "get_audio_devices",
			RequestKind::SetDefaultDevice => "set_default_device",
			RequestKind::GetDefaultDeviceVolume => "get_default_device_volume",
			RequestKind::SetDefaultDeviceVolume => "set_default_device_volume",
			RequestKind::GetDefaultDeviceMute => "get_default_device_mute",
			RequestKind::SetDefaultDeviceMute => "set_default_device_mute",
			RequestKind::GetAllMediaSessions => "get_all_media_sessions",
			RequestKind::GetMediaInfo => "get_media_info",
			RequestKind::GetMediaThumbnail => "get_media_thumbnail",
			RequestKind::MediaPlayPause => "media_play_pause",
			RequestKind::MediaNext => "media_next",
			RequestKind::MediaPrevious => "media_previous",
			RequestKind::ResetMediaApi => "reset_media_api",
			RequestKind::GetMediaApiStatus => "get_media_api_status",
		}
	}

	/// Response kind the host answers this request with.
	pub fn response_kind(self) -> &'static str {
		match self {
			RequestKind::GetAudioSessions => "audio_sessions",
			RequestKind::GetAudioDevices => "audio_devices",
			RequestKind::GetDefaultDeviceVolume => "default_device_volume",
			RequestKind::GetDefaultDeviceMute => "default_device_mute",
			RequestKind::GetAllMediaSessions => "all_media_sessions",
			RequestKind::GetMediaInfo => "media_info",
			RequestKind::GetMediaThumbnail => "media_thumbnail",
			_ => SUCCESS,
		}
	}

	/// Returns true for requests that mutate host state.
	pub fn is_mutation(self) -> bool {
		self.response_kind() == SUCCESS
	}
}

impl fmt::Display for RequestKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when parsing an unknown request kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "unknown request kind: {}", self.0)
	}
}

impl std::error::Error for UnknownKind {}

impl FromStr for RequestKind {
	type Err = UnknownKind;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		RequestKind::ALL
			.into_iter()
			.find(|kind| kind.as_str() == s)
			.ok_or_else(|| UnknownKind(s.to_string()))
	}
}

/// Looks up the expected response kind for a raw request kind.
///
/// Kinds missing from the table default to [`SUCCESS`].
pub fn response_kind_for(request_kind: &str) -> &'static str {
	request_kind
		.parse::<RequestKind>()
		.map(RequestKind::response_kind)
		.unwrap_or(SUCCESS)
}

/// Unsolicited live-update events pushed by the host.
///
/// These are never produced in answer to a request and bypass correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushKind {
	MediaInfoUpdated,
	MediaThumbnailUpdated,
	MediaInfoCleared,
}

impl PushKind {
	pub const ALL: [PushKind; 3] = [
		PushKind::MediaInfoUpdated,
		PushKind::MediaThumbnailUpdated,
		PushKind::MediaInfoCleared,
	];

	/// Canonical (socket) name of the event.
	pub fn as_str(self) -> &'static str {
		match self {
			PushKind::MediaInfoUpdated => "media_info_updated",
			PushKind::MediaThumbnailUpdated => "media_thumbnail_updated",
			PushKind::MediaInfoCleared => "media_info_cleared",
		}
	}

	/// Name the in-process host emits the event under.
	pub fn host_event_name(self) -> &'static str {
		match self {
			PushKind::MediaInfoUpdated => "media-info-updated",
			PushKind::MediaThumbnailUpdated => "media-thumbnail-updated",
			PushKind::MediaInfoCleared => "media-info-cleared",
		}
	}

	/// Parses a socket envelope `type` into a push kind.
	pub fn from_wire(kind: &str) -> Option<Self> {
		PushKind::ALL.into_iter().find(|push| push.as_str() == kind)
	}

	/// Parses either the socket or the in-process event name.
	pub fn from_any(name: &str) -> Option<Self> {
		PushKind::ALL
			.into_iter()
			.find(|push| push.as_str() == name || push.host_event_name() == name)
	}
}

impl fmt::Display for PushKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
