//! Media commands and `watch`.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use eazy::{ClientConfig, Controller, MediaInfo, MediaReconciler, SkipDirection};
use serde::Serialize;
use tokio::sync::Notify;

use super::CommandContext;
use super::audio::Ack;
use crate::cli::{MediaAction, SessionArg};
use crate::error::{CliError, Result};
use crate::output::{self, OutputFormat, TextOutput};

/// Media session without its cover art.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRow {
	pub session_id: String,
	pub app_name: String,
	pub title: String,
	pub artist: String,
	pub album: String,
	pub is_playing: bool,
	pub can_go_next: bool,
	pub can_go_previous: bool,
	pub has_thumbnail: bool,
}

impl From<&MediaInfo> for MediaRow {
	fn from(info: &MediaInfo) -> Self {
		Self {
			session_id: info.session_id.clone(),
			app_name: info.app_name.clone(),
			title: info.title.clone(),
			artist: info.artist.clone(),
			album: info.album.clone(),
			is_playing: info.is_playing,
			can_go_next: info.can_go_next,
			can_go_previous: info.can_go_previous,
			has_thumbnail: info.thumbnail.is_some(),
		}
	}
}

impl MediaRow {
	/// One-line description: state, track and application.
	pub fn summary(&self) -> String {
		let state = if self.is_playing { "playing" } else { "paused" };
		let track = match (self.artist.is_empty(), self.title.is_empty()) {
			(_, true) if self.album.is_empty() => "unknown track".to_string(),
			(_, true) => self.album.clone(),
			(true, false) => self.title.clone(),
			(false, false) => format!("{} - {}", self.artist, self.title),
		};
		format!("[{state}] {track} ({})", self.app_name)
	}
}

pub fn format_snapshot(info: Option<&MediaInfo>) -> String {
	info.map_or_else(|| "No media".to_string(), |info| MediaRow::from(info).summary())
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaListData {
	pub sessions: Vec<MediaRow>,
}

impl TextOutput for MediaListData {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		if self.sessions.is_empty() {
			return writeln!(out, "No media sessions");
		}
		for row in &self.sessions {
			writeln!(out, "{}  {}", row.session_id, row.summary())?;
		}
		Ok(())
	}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailData {
	pub session_id: Option<String>,
	pub bytes: usize,
	/// Where the PNG was written.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub path: Option<PathBuf>,
	/// Base64 PNG, when not written to a file.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub base64: Option<String>,
}

impl TextOutput for ThumbnailData {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		match &self.path {
			Some(path) => writeln!(out, "Wrote {} bytes to {}", self.bytes, path.display()),
			None => writeln!(out, "Thumbnail: {} bytes (use --out to save it)", self.bytes),
		}
	}
}

pub(super) async fn run(
	controller: &Controller,
	config: &ClientConfig,
	action: &MediaAction,
	ctx: &CommandContext,
) -> Result<()> {
	match action {
		MediaAction::List => {
			let sessions = controller.get_all_media_sessions().await?;
			ctx.emit(MediaListData {
				sessions: sessions.iter().map(MediaRow::from).collect(),
			});
		}
		MediaAction::PlayPause(target) => control(controller, config, Control::PlayPause, target, ctx).await?,
		MediaAction::Next(target) => control(controller, config, Control::Skip(SkipDirection::Next), target, ctx).await?,
		MediaAction::Previous(target) => {
			control(controller, config, Control::Skip(SkipDirection::Previous), target, ctx).await?
		}
		MediaAction::Thumbnail { target, out } => {
			let session_id = target.session.as_deref();
			let data = match controller.get_media_thumbnail(session_id).await? {
				Some(encoded) => thumbnail_data(session_id, encoded, out.as_ref())?,
				None => return Err(CliError::NoMediaSession),
			};
			ctx.emit(data);
		}
		MediaAction::Reset => {
			let message = controller.reset_media_api().await?;
			ctx.emit(Ack { message });
		}
		MediaAction::ApiStatus => {
			let message = controller.get_media_api_status().await?;
			ctx.emit(Ack { message });
		}
	}
	Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Control {
	PlayPause,
	Skip(SkipDirection),
}

/// Runs a transport control. An explicit session is addressed directly;
/// otherwise the reconciler picks the session, falling back to one that can
/// skip in the requested direction.
async fn control(
	controller: &Controller,
	config: &ClientConfig,
	action: Control,
	target: &SessionArg,
	ctx: &CommandContext,
) -> Result<()> {
	let session = match target.session.as_deref() {
		Some(session) => {
			match action {
				Control::PlayPause => controller.media_play_pause(Some(session)).await?,
				Control::Skip(direction) => controller.media_skip(direction, Some(session)).await?,
			}
			session.to_string()
		}
		None => {
			let reconciler = MediaReconciler::new(controller.clone(), config.reconciler_config());
			let outcome = control_selected(&reconciler, action).await;
			reconciler.shutdown();
			outcome?
		}
	};

	let verb = match action {
		Control::PlayPause => "Toggled playback on",
		Control::Skip(SkipDirection::Next) => "Skipped forward on",
		Control::Skip(SkipDirection::Previous) => "Skipped back on",
	};
	ctx.emit(Ack {
		message: format!("{verb} {session}"),
	});
	Ok(())
}

async fn control_selected(reconciler: &MediaReconciler, action: Control) -> Result<String> {
	reconciler.refresh().await?;
	if reconciler.selected_session_id().is_none() {
		return Err(CliError::NoMediaSession);
	}

	match action {
		Control::PlayPause => reconciler.play_pause().await?,
		Control::Skip(direction) => reconciler.skip(direction).await?,
	}
	reconciler
		.selected_session_id()
		.ok_or(CliError::NoMediaSession)
}

fn thumbnail_data(session_id: Option<&str>, encoded: String, out: Option<&PathBuf>) -> Result<ThumbnailData> {
	let bytes = STANDARD
		.decode(encoded.as_bytes())
		.map_err(|source| CliError::BadThumbnail {
			session: session_id.unwrap_or("current").to_string(),
			source,
		})?;

	let Some(path) = out else {
		return Ok(ThumbnailData {
			session_id: session_id.map(str::to_string),
			bytes: bytes.len(),
			path: None,
			base64: Some(encoded),
		});
	};

	std::fs::write(path, &bytes).map_err(|source| CliError::Write {
		path: path.clone(),
		source,
	})?;
	tracing::debug!(path = %path.display(), bytes = bytes.len(), "Wrote thumbnail");
	Ok(ThumbnailData {
		session_id: session_id.map(str::to_string),
		bytes: bytes.len(),
		path: Some(path.clone()),
		base64: None,
	})
}

/// Streams the selected session until Ctrl-C or connection loss.
pub(super) async fn watch(controller: &Controller, config: &ClientConfig, ctx: &CommandContext) -> Result<()> {
	let reconciler = MediaReconciler::new(controller.clone(), config.reconciler_config());

	let lost = Arc::new(Notify::new());
	let lost_signal = Arc::clone(&lost);
	let _lost_sub = controller.on_connection_lost(move || lost_signal.notify_one());

	let mut changes = reconciler.watch();
	if let Err(e) = reconciler.start().await {
		tracing::warn!(error = %e, "Initial media refresh failed");
	}
	print_snapshot(reconciler.snapshot().as_deref(), ctx.format);
	let _ = changes.borrow_and_update();

	let outcome = loop {
		tokio::select! {
			changed = changes.changed() => {
				if changed.is_err() {
					break Ok(());
				}
				let snapshot = changes.borrow_and_update().clone();
				print_snapshot(snapshot.as_deref(), ctx.format);
			}
			_ = lost.notified() => break Err(CliError::ConnectionLost),
			_ = tokio::signal::ctrl_c() => break Ok(()),
		}
	};

	reconciler.shutdown();
	outcome
}

fn print_snapshot(info: Option<&MediaInfo>, format: OutputFormat) {
	match format {
		OutputFormat::Text => println!("{}", format_snapshot(info)),
		OutputFormat::Json => output::print_json_line(&info.map(MediaRow::from)),
	}
}
