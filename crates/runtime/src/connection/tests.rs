use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use super::*;
use crate::reconnector::CloseKind;
use crate::transport::{LoopbackDialer, LoopbackPeer};

fn config() -> SocketConfig {
	SocketConfig {
		call_timeout: Duration::from_secs(10),
		reconnect: ReconnectPolicy {
			interval: Duration::from_secs(3),
			max_attempts: 10,
		},
	}
}

async fn connected() -> (SocketTransport, Arc<LoopbackDialer>, mpsc::UnboundedReceiver<LoopbackPeer>, LoopbackPeer) {
	let (dialer, mut peers) = LoopbackDialer::new();
	let dialer = Arc::new(dialer);
	let transport = SocketTransport::new(Arc::clone(&dialer) as Arc<dyn Dialer>, config());
	transport.connect().await.unwrap();
	let peer = peers.recv().await.unwrap();
	(transport, dialer, peers, peer)
}

fn counter(transport: &SocketTransport, kind: &str) -> (Arc<AtomicUsize>, Subscription) {
	let hits = Arc::new(AtomicUsize::new(0));
	let hits_clone = Arc::clone(&hits);
	let sub = Transport::subscribe(
		transport,
		kind,
		Arc::new(move |_: &Value| {
			hits_clone.fetch_add(1, Ordering::SeqCst);
		}),
	);
	(hits, sub)
}

#[tokio::test]
async fn test_call_before_connect_fails_fast() {
	let (dialer, _peers) = LoopbackDialer::new();
	let transport = SocketTransport::new(Arc::new(dialer), config());

	let err = transport.call("get_audio_sessions", Value::Null).await.unwrap_err();
	assert!(matches!(err, Error::NotConnected));
	assert_eq!(transport.pending_calls(), 0);
}

#[tokio::test]
async fn test_call_round_trip() {
	let (transport, _dialer, _peers, mut peer) = connected().await;
	assert!(transport.is_connected());
	assert_eq!(transport.state(), ConnectionState::Open);

	let host = async {
		let request = peer.recv_envelope().await.unwrap();
		assert_eq!(request.kind, "set_session_volume");
		assert_eq!(request.data, Some(json!({"session_name": "Spotify", "volume": 0.5})));
		peer.send_raw(r#"{"type":"success","message":"Volume set"}"#);
	};
	let (result, ()) = tokio::join!(
		transport.call("set_session_volume", json!({"session_name": "Spotify", "volume": 0.5})),
		host
	);

	assert_eq!(result.unwrap(), json!("Volume set"));
	assert_eq!(transport.pending_calls(), 0);
}

#[tokio::test]
async fn test_error_frame_rejects_pending_call() {
	let (transport, _dialer, _peers, mut peer) = connected().await;

	let host = async {
		peer.recv_envelope().await.unwrap();
		peer.send_raw(r#"{"type":"error","message":"Session not found"}"#);
	};
	let (result, ()) = tokio::join!(transport.call("get_media_info", Value::Null), host);

	let err = result.unwrap_err();
	assert_eq!(err.host_detail(), Some("Session not found"));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_keeps_link_open() {
	let (transport, _dialer, _peers, mut peer) = connected().await;

	let err = transport.call("get_media_thumbnail", json!({"session_id": null})).await.unwrap_err();
	assert!(err.is_timeout());
	assert_eq!(transport.pending_calls(), 0);
	assert!(transport.is_connected());

	// The late answer is unsolicited and must not disturb the next call.
	let stale = peer.recv_envelope().await.unwrap();
	assert_eq!(stale.kind, "get_media_thumbnail");
	peer.reply("media_thumbnail", json!("c3RhbGU="));

	let host = async {
		peer.recv_envelope().await.unwrap();
		peer.reply("default_device_volume", json!(0.25));
	};
	let (result, ()) = tokio::join!(transport.call("get_default_device_volume", Value::Null), host);
	assert_eq!(result.unwrap(), json!(0.25));
}

#[tokio::test]
async fn test_push_events_and_malformed_frames() {
	let (transport, _dialer, _peers, mut peer) = connected().await;
	let (updates, _updates_sub) = counter(&transport, "media_info_updated");
	let (cleared, _cleared_sub) = counter(&transport, "media_info_cleared");

	peer.send_raw("not json at all");
	peer.send_raw(r#"{"data": 1}"#);
	peer.send_envelope(&Envelope::request("media_info_updated", json!({"session_id": "a"})));
	peer.send_raw(r#"{"type":"media_info_cleared"}"#);

	// A round trip guarantees every earlier frame has been dispatched.
	let host = async {
		peer.recv_envelope().await.unwrap();
		peer.reply("audio_devices", json!([]));
	};
	let (result, ()) = tokio::join!(transport.call("get_audio_devices", Value::Null), host);
	assert_eq!(result.unwrap(), json!([]));

	assert_eq!(updates.load(Ordering::SeqCst), 1);
	assert_eq!(cleared.load(Ordering::SeqCst), 1);
	assert!(transport.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_unexpected_close_reconnects_and_keeps_subscriptions() {
	let (transport, dialer, mut peers, peer) = connected().await;
	let (updates, _sub) = counter(&transport, "media_info_updated");

	peer.close();
	let peer = peers.recv().await.unwrap();
	assert_eq!(dialer.dial_count(), 2);
	assert!(transport.is_connected());

	peer.reply("media_info_updated", json!({}));
	tokio::time::sleep(Duration::from_millis(10)).await;
	assert_eq!(updates.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_attempt_cap_emits_single_connection_lost() {
	let (transport, dialer, _peers, peer) = connected().await;
	let (lost, _sub) = counter(&transport, CONNECTION_LOST);

	dialer.set_refusing(true);
	peer.close();

	tokio::time::sleep(Duration::from_secs(120)).await;
	assert_eq!(dialer.dial_count(), 11);
	assert_eq!(lost.load(Ordering::SeqCst), 1);
	assert_eq!(transport.state(), ConnectionState::Failed);
	assert!(!transport.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_intentional_disconnect_never_retries() {
	let (transport, dialer, _peers, mut peer) = connected().await;
	let (lost, _sub) = counter(&transport, CONNECTION_LOST);

	transport.disconnect();
	transport.disconnect();
	assert!(peer.recv().await.is_none());

	tokio::time::sleep(Duration::from_secs(60)).await;
	assert_eq!(dialer.dial_count(), 1);
	assert_eq!(lost.load(Ordering::SeqCst), 0);
	assert_eq!(transport.state(), ConnectionState::Closed(CloseKind::Intentional));

	let err = transport.call("media_play_pause", Value::Null).await.unwrap_err();
	assert!(err.is_not_connected());
}

#[tokio::test]
async fn test_disconnect_rejects_pending_calls() {
	let (transport, _dialer, _peers, mut peer) = connected().await;

	let host = async {
		peer.recv_envelope().await.unwrap();
		transport.disconnect();
	};
	let (result, ()) = tokio::join!(transport.call("get_all_media_sessions", Value::Null), host);
	assert!(result.unwrap_err().is_not_connected());
}

#[tokio::test(start_paused = true)]
async fn test_manual_reconnect_resets_budget() {
	let (transport, dialer, mut peers, peer) = connected().await;

	dialer.set_refusing(true);
	peer.close();
	tokio::time::sleep(Duration::from_secs(120)).await;
	assert_eq!(transport.state(), ConnectionState::Failed);

	dialer.set_refusing(false);
	transport.reconnect().await.unwrap();
	let _peer = peers.recv().await.unwrap();
	assert!(transport.is_connected());
	assert_eq!(transport.state(), ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_connect_after_failure_retries_with_full_budget() {
	let (transport, dialer, _peers, peer) = connected().await;
	let (lost, _sub) = counter(&transport, CONNECTION_LOST);

	dialer.set_refusing(true);
	peer.close();
	tokio::time::sleep(Duration::from_secs(120)).await;
	assert_eq!(transport.state(), ConnectionState::Failed);
	assert_eq!(lost.load(Ordering::SeqCst), 1);
	assert_eq!(dialer.dial_count(), 11);

	let err = transport.connect().await.unwrap_err();
	assert!(matches!(err, Error::ConnectionFailed(_)));
	tokio::time::sleep(Duration::from_secs(120)).await;

	// One explicit dial plus ten background retries, then a single new loss.
	assert_eq!(dialer.dial_count(), 22);
	assert_eq!(lost.load(Ordering::SeqCst), 2);
	assert_eq!(transport.state(), ConnectionState::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_initial_failure_retries_in_background() {
	let (dialer, mut peers) = LoopbackDialer::new();
	let dialer = Arc::new(dialer);
	dialer.set_refusing(true);
	let transport = SocketTransport::new(Arc::clone(&dialer) as Arc<dyn Dialer>, config());

	let err = transport.connect().await.unwrap_err();
	assert!(matches!(err, Error::ConnectionFailed(_)));
	assert!(!transport.is_connected());

	dialer.set_refusing(false);
	let _peer = peers.recv().await.unwrap();
	assert!(transport.is_connected());
	assert_eq!(dialer.dial_count(), 2);
}
