//! Audio commands: status, sessions, devices, volume, mute, default device,
//! master volume.

use std::io::{self, Write};

use eazy::{
	AudioDevice, AudioSession, ClientConfig, Controller, SessionCounts, filter_sessions, volume_from_percent,
	volume_percent,
};
use serde::Serialize;

use super::CommandContext;
use crate::cli::{MasterArgs, MuteArgs, SessionsArgs, VolumeArgs};
use crate::error::Result;
use crate::output::TextOutput;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRow {
	pub name: String,
	pub volume_percent: u8,
	pub muted: bool,
}

impl From<&AudioSession> for SessionRow {
	fn from(session: &AudioSession) -> Self {
		Self {
			name: session.name.clone(),
			volume_percent: volume_percent(session.volume),
			muted: session.is_muted,
		}
	}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsData {
	pub filter: String,
	pub counts: SessionCounts,
	pub sessions: Vec<SessionRow>,
}

impl TextOutput for SessionsData {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		let width = self.sessions.iter().map(|s| s.name.len()).max().unwrap_or(0);
		for row in &self.sessions {
			let muted = if row.muted { "  muted" } else { "" };
			writeln!(out, "{:<width$}  {:>3}%{muted}", row.name, row.volume_percent)?;
		}
		writeln!(
			out,
			"{} shown ({}: all {}, active {}, muted {})",
			self.sessions.len(),
			self.filter,
			self.counts.all,
			self.counts.active,
			self.counts.muted
		)
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct DevicesData {
	pub devices: Vec<AudioDevice>,
}

impl TextOutput for DevicesData {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		if self.devices.is_empty() {
			return writeln!(out, "No output devices");
		}
		for device in &self.devices {
			let marker = if device.is_default { '*' } else { ' ' };
			writeln!(out, "{marker} {}  [{}]", device.name, device.id)?;
		}
		Ok(())
	}
}

/// Confirmation of a mutation.
#[derive(Debug, Clone, Serialize)]
pub struct Ack {
	pub message: String,
}

impl TextOutput for Ack {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		writeln!(out, "{}", self.message)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterData {
	pub volume_percent: u8,
	pub muted: bool,
}

impl TextOutput for MasterData {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		let state = if self.muted { " (muted)" } else { "" };
		writeln!(out, "Master volume {}%{state}", self.volume_percent)
	}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
	pub mode: String,
	pub master: MasterData,
	pub default_device: Option<String>,
	pub devices: usize,
	pub sessions: SessionCounts,
	pub media_sessions: usize,
	pub now_playing: Option<String>,
}

impl TextOutput for StatusData {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		writeln!(out, "Connection:   {}", self.mode)?;
		write!(out, "Master:       ")?;
		self.master.write_text(out)?;
		writeln!(
			out,
			"Output:       {} ({} devices)",
			self.default_device.as_deref().unwrap_or("unknown"),
			self.devices
		)?;
		writeln!(
			out,
			"Sessions:     {} ({} active, {} muted)",
			self.sessions.all, self.sessions.active, self.sessions.muted
		)?;
		writeln!(
			out,
			"Media:        {} session(s){}",
			self.media_sessions,
			self.now_playing
				.as_deref()
				.map(|track| format!(", {track}"))
				.unwrap_or_default()
		)
	}
}

pub(super) async fn status(controller: &Controller, config: &ClientConfig, ctx: &CommandContext) -> Result<()> {
	let overview = controller.load_overview(config.overview_timeout()).await?;

	let now_playing = overview
		.media_sessions
		.iter()
		.find(|m| m.is_playing && m.has_metadata())
		.or_else(|| overview.media_sessions.first())
		.map(|m| super::format_snapshot(Some(m)));

	ctx.emit(StatusData {
		mode: controller.connection_mode().to_string(),
		master: MasterData {
			volume_percent: overview.default_volume_percent,
			muted: overview.default_muted,
		},
		default_device: overview
			.devices
			.iter()
			.find(|d| d.is_default)
			.map(|d| d.name.clone()),
		devices: overview.devices.len(),
		sessions: SessionCounts::of(&overview.sessions),
		media_sessions: overview.media_sessions.len(),
		now_playing,
	});
	Ok(())
}

pub(super) async fn sessions(controller: &Controller, args: &SessionsArgs, ctx: &CommandContext) -> Result<()> {
	let all = controller.get_audio_sessions().await?;
	ctx.emit(sessions_data(&all, args));
	Ok(())
}

fn sessions_data(all: &[AudioSession], args: &SessionsArgs) -> SessionsData {
	let query = args.search.as_deref().unwrap_or_default();
	SessionsData {
		filter: args.filter.to_string(),
		counts: SessionCounts::of(all),
		sessions: filter_sessions(all, args.filter, query)
			.into_iter()
			.map(SessionRow::from)
			.collect(),
	}
}

pub(super) async fn devices(controller: &Controller, ctx: &CommandContext) -> Result<()> {
	let devices = controller.get_audio_devices().await?;
	ctx.emit(DevicesData { devices });
	Ok(())
}

pub(super) async fn volume(controller: &Controller, args: &VolumeArgs, ctx: &CommandContext) -> Result<()> {
	controller
		.set_session_volume(&args.session, volume_from_percent(args.percent))
		.await?;
	ctx.emit(Ack {
		message: format!("{} volume set to {}%", args.session, args.percent),
	});
	Ok(())
}

pub(super) async fn mute(controller: &Controller, args: &MuteArgs, ctx: &CommandContext) -> Result<()> {
	let mute = !args.off;
	controller.set_session_mute(&args.session, mute).await?;
	let state = if mute { "muted" } else { "unmuted" };
	ctx.emit(Ack {
		message: format!("{} {state}", args.session),
	});
	Ok(())
}

pub(super) async fn default_device(controller: &Controller, id: &str, ctx: &CommandContext) -> Result<()> {
	controller.set_default_device(id).await?;
	ctx.emit(Ack {
		message: format!("Default output set to {id}"),
	});
	Ok(())
}

pub(super) async fn master(controller: &Controller, args: &MasterArgs, ctx: &CommandContext) -> Result<()> {
	if let Some(percent) = args.volume {
		controller
			.set_default_device_volume(volume_from_percent(percent))
			.await?;
	}
	if let Some(mute) = args.mute {
		controller.set_default_device_mute(mute.is_on()).await?;
	}

	let (volume, muted) = tokio::try_join!(controller.get_default_device_volume(), controller.get_default_device_mute())?;
	ctx.emit(MasterData {
		volume_percent: volume_percent(volume),
		muted,
	});
	Ok(())
}

#[cfg(test)]
mod tests {
	use eazy::SessionFilter;

	use super::*;

	fn render(data: &impl TextOutput) -> String {
		let mut buf = Vec::new();
		data.write_text(&mut buf).unwrap();
		String::from_utf8(buf).unwrap()
	}

	fn sample() -> Vec<AudioSession> {
		vec![
			AudioSession {
				name: "Spotify".into(),
				volume: 0.8,
				is_muted: false,
			},
			AudioSession {
				name: "discord".into(),
				volume: 0.5,
				is_muted: true,
			},
		]
	}

	#[test]
	fn sessions_data_filters_and_counts() {
		let args = SessionsArgs {
			search: None,
			filter: SessionFilter::Muted,
		};
		let data = sessions_data(&sample(), &args);

		assert_eq!(data.counts.all, 2);
		assert_eq!(
			data.sessions,
			[SessionRow {
				name: "discord".into(),
				volume_percent: 50,
				muted: true
			}]
		);
		assert_eq!(render(&data), "discord   50%  muted\n1 shown (muted: all 2, active 1, muted 1)\n");
	}

	#[test]
	fn devices_text_marks_default() {
		let data = DevicesData {
			devices: vec![
				AudioDevice {
					id: "spk".into(),
					name: "Speakers".into(),
					is_default: true,
				},
				AudioDevice {
					id: "hs".into(),
					name: "Headset".into(),
					is_default: false,
				},
			],
		};
		assert_eq!(render(&data), "* Speakers  [spk]\n  Headset  [hs]\n");
		assert_eq!(render(&DevicesData { devices: vec![] }), "No output devices\n");
	}

	#[test]
	fn master_text() {
		let data = MasterData {
			volume_percent: 46,
			muted: true,
		};
		assert_eq!(render(&data), "Master volume 46% (muted)\n");
	}
}
