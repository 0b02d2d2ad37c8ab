//! Command dispatch.

mod audio;
mod media;

use std::path::Path;
use std::time::Instant;

use eazy::{ClientConfig, Controller, TransportPreference};
use serde::Serialize;

use crate::cli::{Cli, Commands};
use crate::error::Result;
use crate::output::{self, CommandResult, OutputFormat, TextOutput};

pub use audio::{Ack, DevicesData, MasterData, SessionRow, SessionsData, StatusData};
pub use media::{MediaListData, MediaRow, ThumbnailData, format_snapshot};

/// Connects, runs one command and prints its result.
pub async fn dispatch(cli: Cli) -> Result<()> {
	let config = resolve_config(cli.config.as_deref(), cli.url.as_deref(), cli.transport)?;
	let ctx = CommandContext {
		format: cli.format,
		started: Instant::now(),
		command: cli.command.name(),
	};

	tracing::debug!(url = %config.url, transport = %config.transport, command = ctx.command, "Connecting");
	let controller = Controller::connect(&config, None).await?;
	tracing::info!(mode = %controller.connection_mode(), "Connected");

	let outcome = run(&cli.command, &controller, &config, &ctx).await;
	controller.shutdown();
	outcome
}

/// Config file and environment, then command-line overrides.
pub fn resolve_config(
	path: Option<&Path>,
	url: Option<&str>,
	transport: Option<TransportPreference>,
) -> Result<ClientConfig> {
	resolve_config_with(path, url, transport, |key| std::env::var(key).ok())
}

fn resolve_config_with(
	path: Option<&Path>,
	url: Option<&str>,
	transport: Option<TransportPreference>,
	env: impl Fn(&str) -> Option<String>,
) -> Result<ClientConfig> {
	let mut config = ClientConfig::load_with(path, env)?;
	if let Some(url) = url {
		config.url = url.to_string();
	}
	if let Some(transport) = transport {
		config.transport = transport;
	}
	Ok(config)
}

/// Per-invocation output settings.
pub(crate) struct CommandContext {
	pub format: OutputFormat,
	pub started: Instant,
	pub command: &'static str,
}

impl CommandContext {
	pub fn emit<T: Serialize + TextOutput>(&self, data: T) {
		output::print_result(&CommandResult::success(self.command, data, self.started), self.format);
	}
}

async fn run(command: &Commands, controller: &Controller, config: &ClientConfig, ctx: &CommandContext) -> Result<()> {
	match command {
		Commands::Status => audio::status(controller, config, ctx).await,
		Commands::Sessions(args) => audio::sessions(controller, args, ctx).await,
		Commands::Devices => audio::devices(controller, ctx).await,
		Commands::Volume(args) => audio::volume(controller, args, ctx).await,
		Commands::Mute(args) => audio::mute(controller, args, ctx).await,
		Commands::DefaultDevice { id } => audio::default_device(controller, id, ctx).await,
		Commands::Master(args) => audio::master(controller, args, ctx).await,
		Commands::Media(action) => media::run(controller, config, action, ctx).await,
		Commands::Watch => media::watch(controller, config, ctx).await,
	}
}
