
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use eazy::{SessionFilter, TransportPreference};

use crate::output::OutputFormat;

/// Root CLI for eazy.
#[derive(Parser, Debug)]
#[command(name = "eazy")]
#[command(about = "Remote control for the Eazy Controller audio/media host")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: text (default) or json
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	/// Config file (default: $XDG_CONFIG_HOME/eazy/config.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Host WebSocket URL, overrides config and EAZY_URL
	#[arg(long, global = true, value_name = "URL")]
	pub url: Option<String>,

	/// Transport: auto, socket or in-process
	#[arg(long, global = true, value_name = "KIND")]
	pub transport: Option<TransportPreference>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Overview of volume, sessions, devices and media.
	Status,
	/// List per-application audio sessions.
	Sessions(SessionsArgs),
	/// List output devices.
	Devices,
	/// Set an application's volume.
	Volume(VolumeArgs),
	/// Mute or unmute an application.
	Mute(MuteArgs),
	/// Make a device the default output.
	DefaultDevice {
		#[arg(value_name = "ID")]
		id: String,
	},
	/// Show or change the default device volume and mute.
	Master(MasterArgs),
	/// Media session controls.
	#[command(subcommand)]
	Media(MediaAction),
	/// Follow the selected media session until interrupted.
	Watch,
}

impl Commands {
	/// Name reported in the result envelope.
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Status => "status",
			Commands::Sessions(_) => "sessions",
			Commands::Devices => "devices",
			Commands::Volume(_) => "volume",
			Commands::Mute(_) => "mute",
			Commands::DefaultDevice { .. } => "default-device",
			Commands::Master(_) => "master",
			Commands::Media(action) => action.name(),
			Commands::Watch => "watch",
		}
	}
}

#[derive(Args, Debug, Clone)]
pub struct SessionsArgs {
	/// Case-insensitive name filter.
	#[arg(short, long, value_name = "TEXT")]
	pub search: Option<String>,

	/// all, active or muted.
	#[arg(long, default_value = "all")]
	pub filter: SessionFilter,
}

#[derive(Args, Debug, Clone)]
pub struct VolumeArgs {
	#[arg(value_name = "SESSION")]
	pub session: String,

	/// Volume percentage (0-100).
	#[arg(value_name = "PERCENT", value_parser = clap::value_parser!(u8).range(0..=100))]
	pub percent: u8,
}

#[derive(Args, Debug, Clone)]
pub struct MuteArgs {
	#[arg(value_name = "SESSION")]
	pub session: String,

	/// Unmute instead.
	#[arg(long)]
	pub off: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MasterArgs {
	/// New volume percentage (0-100).
	#[arg(long, value_name = "PERCENT", value_parser = clap::value_parser!(u8).range(0..=100))]
	pub volume: Option<u8>,

	/// Mute state.
	#[arg(long, value_enum, value_name = "STATE")]
	pub mute: Option<Toggle>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
	On,
	Off,
}

impl Toggle {
	pub fn is_on(self) -> bool {
		self == Toggle::On
	}
}

#[derive(Args, Debug, Clone, Default)]
pub struct SessionArg {
	/// Media session id (default: the host's current session).
	#[arg(short, long, value_name = "ID")]
	pub session: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum MediaAction {
	/// List media sessions.
	List,
	/// Toggle playback.
	PlayPause(SessionArg),
	/// Skip to the next track.
	Next(SessionArg),
	/// Go back to the previous track.
	Previous(SessionArg),
	/// Fetch cover art.
	Thumbnail {
		#[command(flatten)]
		target: SessionArg,

		/// Write the decoded PNG here instead of printing it.
		#[arg(short, long, value_name = "FILE")]
		out: Option<PathBuf>,
	},
	/// Rebuild the host's media integration.
	Reset,
	/// Report the host's media integration status.
	ApiStatus,
}

impl MediaAction {
	pub fn name(&self) -> &'static str {
		match self {
			MediaAction::List => "media.list",
			MediaAction::PlayPause(_) => "media.play-pause",
			MediaAction::Next(_) => "media.next",
			MediaAction::Previous(_) => "media.previous",
			MediaAction::Thumbnail { .. } => "media.thumbnail",
			MediaAction::Reset => "media.reset",
			MediaAction::ApiStatus => "media.api-status",
		}
	}
}
