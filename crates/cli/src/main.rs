use std::time::Instant;

use clap::Parser;
use eazy_cli::cli::Cli;
use eazy_cli::error::CliError;
use eazy_cli::output::{self, CommandResult, OutputFormat};
use eazy_cli::{commands, logging};

#[tokio::main]
async fn main() {
	let started = Instant::now();
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;
	let command = cli.command.name();

	if let Err(err) = commands::dispatch(cli).await {
		handle_error(command, err, format, started);
		std::process::exit(1);
	}
}

fn handle_error(command: &str, err: CliError, format: OutputFormat, started: Instant) {
	let error = err.to_command_error();
	output::print_error_stderr(&error);

	if format == OutputFormat::Json {
		output::print_result(&CommandResult::<()>::failure(command, error, started), format);
	}
}
