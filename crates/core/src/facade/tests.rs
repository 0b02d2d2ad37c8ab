use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use eazy_protocol::Envelope;
use eazy_runtime::{Dialer, LoopbackDialer, SocketConfig};
use parking_lot::Mutex;
use serde_json::json;

use super::*;

#[derive(Default)]
struct FakeHost {
	calls: Mutex<Vec<(String, Value)>>,
	garbled: AtomicBool,
	hang_media_list: AtomicBool,
}

impl FakeHost {
	fn args_of(&self, command: &str) -> Option<Value> {
		self.calls
			.lock()
			.iter()
			.rev()
			.find(|(c, _)| c == command)
			.map(|(_, args)| args.clone())
	}
}

#[async_trait]
impl HostCommands for FakeHost {
	async fn invoke(&self, command: &str, args: Value) -> std::result::Result<Value, String> {
		self.calls.lock().push((command.to_string(), args));
		match command {
			"get_audio_sessions" if self.garbled.load(Ordering::SeqCst) => Ok(json!("not a list")),
			"get_audio_sessions" => Ok(json!([
				{"name": "Spotify", "volume": 0.75, "is_muted": false},
				{"name": "Discord", "volume": 0.5, "is_muted": true},
			])),
			"get_audio_devices" => Ok(json!([
				{"id": "{0.0.0.00000000}.{speakers}", "name": "Speakers", "is_default": true},
				{"id": "{0.0.0.00000000}.{headset}", "name": "Headset", "is_default": false},
			])),
			"get_default_device_volume" => Ok(json!(0.456)),
			"get_default_device_mute" => Ok(json!(false)),
			"get_all_media_sessions" => {
				if self.hang_media_list.load(Ordering::SeqCst) {
					std::future::pending::<()>().await;
				}
				Ok(json!([{
					"session_id": "Spotify.exe",
					"app_name": "Spotify",
					"title": "Song",
					"artist": "Band",
					"album": "",
					"is_playing": true,
					"can_go_next": true,
					"can_go_previous": false,
				}]))
			}
			"get_media_info" => Ok(Value::Null),
			"get_media_thumbnail" => Ok(json!("aGVsbG8=")),
			"reset_media_api" => Ok(json!("Media API reset")),
			"get_media_api_status" => Ok(json!({"initialized": true})),
			"set_default_device" => Err("Device not found".into()),
			_ => Ok(json!("ok")),
		}
	}
}

fn in_process() -> (Controller, Arc<FakeHost>) {
	let host = Arc::new(FakeHost::default());
	let controller = Controller::in_process(Arc::clone(&host) as Arc<dyn HostCommands>, Duration::from_secs(10));
	(controller, host)
}

#[tokio::test]
async fn test_typed_queries_decode() {
	let (controller, _host) = in_process();

	let sessions = controller.get_audio_sessions().await.unwrap();
	assert_eq!(sessions.len(), 2);
	assert_eq!(sessions[0].name, "Spotify");
	assert!(sessions[1].is_muted);

	let devices = controller.get_audio_devices().await.unwrap();
	assert!(devices[0].is_default);
	assert_eq!(devices[1].name, "Headset");

	assert!(!controller.get_default_device_mute().await.unwrap());
	assert_eq!(controller.get_media_info().await.unwrap(), None);
	assert_eq!(controller.get_media_thumbnail(None).await.unwrap().as_deref(), Some("aGVsbG8="));

	let media = controller.get_all_media_sessions().await.unwrap();
	assert_eq!(media[0].session_id, "Spotify.exe");
	assert!(media[0].thumbnail.is_none());
}

#[tokio::test]
async fn test_mutations_send_camel_case_args() {
	let (controller, host) = in_process();

	controller.set_session_volume("Spotify", 0.5).await.unwrap();
	controller.set_session_mute("Discord", false).await.unwrap();
	controller.set_default_device_volume(0.25).await.unwrap();
	controller.media_next(None).await.unwrap();
	controller.media_play_pause(Some("Spotify.exe")).await.unwrap();

	assert_eq!(host.args_of("set_session_volume"), Some(json!({"sessionName": "Spotify", "volume": 0.5})));
	assert_eq!(host.args_of("set_session_mute"), Some(json!({"sessionName": "Discord", "mute": false})));
	assert_eq!(host.args_of("set_default_device_volume"), Some(json!({"volume": 0.25})));
	assert_eq!(host.args_of("media_next"), Some(json!({"sessionId": null})));
	assert_eq!(host.args_of("media_play_pause"), Some(json!({"sessionId": "Spotify.exe"})));
}

#[tokio::test]
async fn test_host_failure_surfaces() {
	let (controller, _host) = in_process();
	let err = controller.set_default_device("missing").await.unwrap_err();
	assert_eq!(err.host_detail(), Some("Device not found"));
}

#[tokio::test]
async fn test_unexpected_payload() {
	let (controller, host) = in_process();
	host.garbled.store(true, Ordering::SeqCst);

	let err = controller.get_audio_sessions().await.unwrap_err();
	match err {
		Error::UnexpectedPayload { kind, .. } => assert_eq!(kind, "audio_sessions"),
		other => panic!("expected UnexpectedPayload, got {other:?}"),
	}
}

#[tokio::test]
async fn test_media_api_status_text() {
	let (controller, _host) = in_process();
	assert_eq!(controller.reset_media_api().await.unwrap(), "Media API reset");
	assert_eq!(controller.get_media_api_status().await.unwrap(), r#"{"initialized":true}"#);
}

#[tokio::test]
async fn test_load_overview() {
	let (controller, _host) = in_process();
	let overview = controller.load_overview(Duration::from_secs(10)).await.unwrap();

	assert_eq!(overview.sessions.len(), 2);
	assert_eq!(overview.devices.len(), 2);
	assert_eq!(overview.default_volume_percent, 46);
	assert!(!overview.default_muted);
	assert_eq!(overview.media_sessions[0].title, "Song");
}

#[tokio::test(start_paused = true)]
async fn test_load_overview_times_out_as_a_whole() {
	let (controller, host) = in_process();
	host.hang_media_list.store(true, Ordering::SeqCst);

	let err = controller
		.load_overview(Duration::from_secs(2))
		.await
		.unwrap_err();
	assert!(err.is_timeout());
	assert!(err.to_string().contains("overview"));
}

#[tokio::test]
async fn test_typed_subscriptions_in_process() {
	let (controller, _host) = in_process();
	let sink = controller.host_event_sink().unwrap();

	let titles = Arc::new(Mutex::new(Vec::new()));
	let titles_clone = Arc::clone(&titles);
	let _info = controller.on_media_info_updated(move |info| titles_clone.lock().push(info.title));

	let cleared = Arc::new(AtomicUsize::new(0));
	let cleared_clone = Arc::clone(&cleared);
	let mut cleared_sub = controller.on_media_info_cleared(move || {
		cleared_clone.fetch_add(1, Ordering::SeqCst);
	});

	let thumbs = Arc::new(Mutex::new(Vec::new()));
	let thumbs_clone = Arc::clone(&thumbs);
	let _thumb = controller.on_media_thumbnail_updated(move |b64| thumbs_clone.lock().push(b64));

	let info = json!({
		"session_id": "Spotify.exe",
		"app_name": "Spotify",
		"title": "Song",
		"is_playing": true,
	});
	assert_eq!(sink.emit("media-info-updated", info), 1);
	assert_eq!(sink.emit("media_info_updated", json!({"title": 42})), 1);
	assert_eq!(sink.emit("media-thumbnail-updated", json!("aGVsbG8=")), 1);
	assert_eq!(sink.emit("media-info-cleared", Value::Null), 1);

	cleared_sub.unsubscribe();
	cleared_sub.unsubscribe();
	assert_eq!(sink.emit("media-info-cleared", Value::Null), 0);

	assert_eq!(*titles.lock(), ["Song"]);
	assert_eq!(*thumbs.lock(), ["aGVsbG8="]);
	assert_eq!(cleared.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_connect_prefers_host_when_available() {
	let host = Arc::new(FakeHost::default()) as Arc<dyn HostCommands>;
	let controller = Controller::connect(&ClientConfig::default(), Some(host))
		.await
		.unwrap();

	assert_eq!(controller.connection_mode(), ConnectionMode::InProcess);
	assert!(controller.is_connected());
	assert!(controller.host_event_sink().is_some());
	controller.reconnect().await.unwrap();
}

#[tokio::test]
async fn test_connect_in_process_requires_host() {
	let config = ClientConfig {
		transport: TransportPreference::InProcess,
		..Default::default()
	};
	let err = Controller::connect(&config, None).await.unwrap_err();
	assert!(matches!(err, Error::ConnectionFailed(_)));
}

#[tokio::test(start_paused = true)]
async fn test_open_socket_keeps_retrying_after_failed_dial() {
	let (dialer, mut peers) = LoopbackDialer::new();
	let dialer = Arc::new(dialer);
	dialer.set_refusing(true);
	let socket = SocketTransport::new(Arc::clone(&dialer) as Arc<dyn Dialer>, SocketConfig::default());

	let (controller, dialed) = Controller::over_socket(socket).await;
	assert!(matches!(dialed, Err(Error::ConnectionFailed(_))));
	assert!(!controller.is_connected());

	dialer.set_refusing(false);
	let mut peer = peers.recv().await.unwrap();
	assert!(controller.is_connected());
	assert_eq!(dialer.dial_count(), 2);

	let host = async {
		peer.recv_envelope().await.unwrap();
		peer.reply("default_device_mute", json!(true));
	};
	let (muted, ()) = tokio::join!(controller.get_default_device_mute(), host);
	assert!(muted.unwrap());
	controller.shutdown();
}

#[tokio::test]
async fn test_socket_controller_round_trip() {
	let (dialer, mut peers) = LoopbackDialer::new();
	let socket = SocketTransport::new(Arc::new(dialer) as Arc<dyn Dialer>, SocketConfig::default());
	socket.connect().await.unwrap();
	let mut peer = peers.recv().await.unwrap();

	let controller = Controller::new(Arc::new(socket));
	assert_eq!(controller.connection_mode(), ConnectionMode::Socket);
	assert!(controller.host_event_sink().is_none());

	let host = async {
		let request: Envelope = peer.recv_envelope().await.unwrap();
		assert_eq!(request.kind, "get_default_device_volume");
		peer.reply("default_device_volume", json!(0.8));
	};
	let (volume, ()) = tokio::join!(controller.get_default_device_volume(), host);
	assert_eq!(volume.unwrap(), 0.8);

	let lost = Arc::new(AtomicUsize::new(0));
	let lost_clone = Arc::clone(&lost);
	let _sub = controller.on_connection_lost(move || {
		lost_clone.fetch_add(1, Ordering::SeqCst);
	});

	controller.shutdown();
	assert!(!controller.is_connected());
	let err = controller.get_audio_sessions().await.unwrap_err();
	assert!(err.is_not_connected());
	assert_eq!(lost.load(Ordering::SeqCst), 0);
}
