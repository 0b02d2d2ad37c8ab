//! Transport-agnostic host API: [`Controller`].

use std::sync::Arc;
use std::time::Duration;

use eazy_protocol::{
	AudioDevice, AudioSession, CONNECTION_LOST, DefaultDeviceParams, MediaInfo, MediaTarget, MuteParams, PushKind,
	RequestKind, SessionMuteParams, SessionVolumeParams, SkipDirection, VolumeParams,
};
use eazy_runtime::{
	ConnectionMode, Error, HostCommandTransport, HostCommands, HostEventSink, Result, SocketTransport, Subscription,
	Transport,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{ClientConfig, TransportPreference};
use crate::sessions::volume_percent;

/// Single entry point for every host operation.
///
/// The transport is chosen once, at construction. Cloning is cheap and
/// clones share the transport.
#[derive(Clone)]
pub struct Controller {
	transport: Arc<dyn Transport>,
	host_events: Option<HostEventSink>,
}

impl Controller {
	/// Wraps an already connected transport.
	pub fn new(transport: Arc<dyn Transport>) -> Self {
		Self {
			transport,
			host_events: None,
		}
	}

	/// Controller running inside the host process.
	pub fn in_process(commands: Arc<dyn HostCommands>, call_timeout: Duration) -> Self {
		let transport = HostCommandTransport::with_timeout(commands, call_timeout);
		let host_events = transport.event_sink();
		Self {
			transport: Arc::new(transport),
			host_events: Some(host_events),
		}
	}

	/// Composition root: picks the transport from `config` and the runtime
	/// environment, then connects.
	///
	/// `host` is the native command interface when running inside the host.
	/// With [`TransportPreference::Auto`] its presence selects the in-process
	/// transport. A failed first dial is returned and the socket released; use
	/// [`open`](Self::open) to keep retrying instead.
	pub async fn connect(config: &ClientConfig, host: Option<Arc<dyn HostCommands>>) -> Result<Self> {
		let (controller, dialed) = Self::open(config, host).await?;
		if let Err(e) = dialed {
			controller.shutdown();
			return Err(e);
		}
		Ok(controller)
	}

	/// Like [`connect`](Self::connect), but a failed first dial keeps the
	/// controller: the socket goes on retrying in the background under its
	/// reconnect budget. The dial outcome is handed back for reporting.
	pub async fn open(config: &ClientConfig, host: Option<Arc<dyn HostCommands>>) -> Result<(Self, Result<()>)> {
		let use_host = match config.transport {
			TransportPreference::Auto => host.is_some(),
			TransportPreference::InProcess => true,
			TransportPreference::Socket => false,
		};

		if use_host {
			let commands = host.ok_or_else(|| {
				Error::ConnectionFailed("in-process transport requested but no host command interface is available".into())
			})?;
			tracing::info!("Using in-process host transport");
			return Ok((Self::in_process(commands, config.call_timeout()), Ok(())));
		}

		let socket = SocketTransport::websocket(config.url.clone(), config.socket_config());
		Ok(Self::over_socket(socket).await)
	}

	/// Dials `socket` and wraps it whatever the outcome.
	pub async fn over_socket(socket: SocketTransport) -> (Self, Result<()>) {
		let dialed = socket.connect().await;
		if let Err(e) = &dialed {
			tracing::warn!(error = %e, "First dial failed, retrying in the background");
		}
		(Self::new(Arc::new(socket)), dialed)
	}

	pub fn connection_mode(&self) -> ConnectionMode {
		self.transport.mode()
	}

	/// Always true in-process; live link state over the socket.
	pub fn is_connected(&self) -> bool {
		self.transport.is_connected()
	}

	/// Sink the host pushes events into. Only present in-process.
	pub fn host_event_sink(&self) -> Option<HostEventSink> {
		self.host_events.clone()
	}

	pub async fn reconnect(&self) -> Result<()> {
		self.transport.reconnect().await
	}

	/// Releases the link and its timers. Idempotent.
	pub fn shutdown(&self) {
		self.transport.shutdown();
	}

	/// Raw call. Prefer the typed methods.
	pub async fn call(&self, kind: RequestKind, payload: Value) -> Result<Value> {
		self.transport.call(kind.as_str(), payload).await
	}

	async fn request<P: Serialize, T: DeserializeOwned>(&self, kind: RequestKind, params: &P) -> Result<T> {
		let value = self.call(kind, serde_json::to_value(params)?).await?;
		decode(kind, value)
	}

	async fn query<T: DeserializeOwned>(&self, kind: RequestKind) -> Result<T> {
		let value = self.call(kind, Value::Null).await?;
		decode(kind, value)
	}

	async fn mutate<P: Serialize>(&self, kind: RequestKind, params: &P) -> Result<()> {
		self.call(kind, serde_json::to_value(params)?).await?;
		Ok(())
	}

	pub async fn get_audio_sessions(&self) -> Result<Vec<AudioSession>> {
		self.query(RequestKind::GetAudioSessions).await
	}

	pub async fn set_session_volume(&self, session_name: &str, volume: f32) -> Result<()> {
		let params = SessionVolumeParams {
			session_name: session_name.to_string(),
			volume,
		};
		self.mutate(RequestKind::SetSessionVolume, &params).await
	}

	pub async fn set_session_mute(&self, session_name: &str, mute: bool) -> Result<()> {
		let params = SessionMuteParams {
			session_name: session_name.to_string(),
			mute,
		};
		self.mutate(RequestKind::SetSessionMute, &params).await
	}

	pub async fn get_audio_devices(&self) -> Result<Vec<AudioDevice>> {
		self.query(RequestKind::GetAudioDevices).await
	}

	pub async fn set_default_device(&self, device_id: &str) -> Result<()> {
		let params = DefaultDeviceParams {
			device_id: device_id.to_string(),
		};
		self.mutate(RequestKind::SetDefaultDevice, &params).await
	}

	pub async fn get_default_device_volume(&self) -> Result<f32> {
		self.query(RequestKind::GetDefaultDeviceVolume).await
	}

	pub async fn set_default_device_volume(&self, volume: f32) -> Result<()> {
		self.mutate(RequestKind::SetDefaultDeviceVolume, &VolumeParams { volume })
			.await
	}

	pub async fn get_default_device_mute(&self) -> Result<bool> {
		self.query(RequestKind::GetDefaultDeviceMute).await
	}

	pub async fn set_default_device_mute(&self, mute: bool) -> Result<()> {
		self.mutate(RequestKind::SetDefaultDeviceMute, &MuteParams { mute }).await
	}

	pub async fn get_all_media_sessions(&self) -> Result<Vec<MediaInfo>> {
		self.query(RequestKind::GetAllMediaSessions).await
	}

	/// The host's current media session, if any.
	pub async fn get_media_info(&self) -> Result<Option<MediaInfo>> {
		self.query(RequestKind::GetMediaInfo).await
	}

	/// Base64 PNG cover art. `None` targets the host's current session.
	pub async fn get_media_thumbnail(&self, session_id: Option<&str>) -> Result<Option<String>> {
		self.request(RequestKind::GetMediaThumbnail, &MediaTarget::new(session_id))
			.await
	}

	pub async fn media_play_pause(&self, session_id: Option<&str>) -> Result<()> {
		self.mutate(RequestKind::MediaPlayPause, &MediaTarget::new(session_id))
			.await
	}

	pub async fn media_next(&self, session_id: Option<&str>) -> Result<()> {
		self.media_skip(SkipDirection::Next, session_id).await
	}

	pub async fn media_previous(&self, session_id: Option<&str>) -> Result<()> {
		self.media_skip(SkipDirection::Previous, session_id).await
	}

	pub async fn media_skip(&self, direction: SkipDirection, session_id: Option<&str>) -> Result<()> {
		let kind = match direction {
			SkipDirection::Next => RequestKind::MediaNext,
			SkipDirection::Previous => RequestKind::MediaPrevious,
		};
		self.mutate(kind, &MediaTarget::new(session_id)).await
	}

	/// Asks the host to rebuild its OS media integration.
	pub async fn reset_media_api(&self) -> Result<String> {
		let value = self.call(RequestKind::ResetMediaApi, Value::Null).await?;
		Ok(status_text(value))
	}

	pub async fn get_media_api_status(&self) -> Result<String> {
		let value = self.call(RequestKind::GetMediaApiStatus, Value::Null).await?;
		Ok(status_text(value))
	}

	/// Loads everything a dashboard needs in one go.
	///
	/// All requests run concurrently; the whole batch fails with
	/// [`Error::Timeout`] if it does not complete within `timeout`.
	pub async fn load_overview(&self, timeout: Duration) -> Result<Overview> {
		let batch = async {
			tokio::try_join!(
				self.get_audio_sessions(),
				self.get_audio_devices(),
				self.get_default_device_volume(),
				self.get_default_device_mute(),
				self.get_all_media_sessions(),
			)
		};

		let (sessions, devices, volume, muted, media_sessions) =
			tokio::time::timeout(timeout, batch)
				.await
				.map_err(|_| Error::Timeout {
					kind: "overview".into(),
					expected: "overview".into(),
					timeout_ms: timeout.as_millis() as u64,
				})??;

		Ok(Overview {
			sessions,
			devices,
			default_volume_percent: volume_percent(volume),
			default_muted: muted,
			media_sessions,
		})
	}

	/// Registers a raw handler for any event kind.
	pub fn subscribe<F>(&self, kind: &str, handler: F) -> Subscription
	where
		F: Fn(&Value) + Send + Sync + 'static,
	{
		self.transport.subscribe(kind, Arc::new(handler))
	}

	pub fn on_media_info_updated<F>(&self, handler: F) -> Subscription
	where
		F: Fn(MediaInfo) + Send + Sync + 'static,
	{
		let kind = PushKind::MediaInfoUpdated.as_str();
		self.subscribe(kind, move |payload| match MediaInfo::deserialize(payload) {
			Ok(info) => handler(info),
			Err(e) => tracing::warn!(kind, error = %e, "Ignoring undecodable media info push"),
		})
	}

	pub fn on_media_thumbnail_updated<F>(&self, handler: F) -> Subscription
	where
		F: Fn(String) + Send + Sync + 'static,
	{
		self.subscribe(PushKind::MediaThumbnailUpdated.as_str(), move |payload| {
			handler(payload.as_str().unwrap_or_default().to_string())
		})
	}

	pub fn on_media_info_cleared<F>(&self, handler: F) -> Subscription
	where
		F: Fn() + Send + Sync + 'static,
	{
		self.subscribe(PushKind::MediaInfoCleared.as_str(), move |_| handler())
	}

	/// Fires once when the socket gives up reconnecting.
	pub fn on_connection_lost<F>(&self, handler: F) -> Subscription
	where
		F: Fn() + Send + Sync + 'static,
	{
		self.subscribe(CONNECTION_LOST, move |_| handler())
	}
}

impl std::fmt::Debug for Controller {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Controller")
			.field("mode", &self.connection_mode())
			.field("connected", &self.is_connected())
			.finish()
	}
}

/// Result of [`Controller::load_overview`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
	pub sessions: Vec<AudioSession>,
	pub devices: Vec<AudioDevice>,
	/// Default device volume as a rounded 0-100 percentage.
	pub default_volume_percent: u8,
	pub default_muted: bool,
	pub media_sessions: Vec<MediaInfo>,
}

fn decode<T: DeserializeOwned>(kind: RequestKind, value: Value) -> Result<T> {
	serde_json::from_value(value).map_err(|e| Error::UnexpectedPayload {
		kind: kind.response_kind().to_string(),
		message: e.to_string(),
	})
}

fn status_text(value: Value) -> String {
	match value {
		Value::String(text) => text,
		Value::Null => String::new(),
		other => other.to_string(),
	}
}

#[cfg(test)]
mod tests;
