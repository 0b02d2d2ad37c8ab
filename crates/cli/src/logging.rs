use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

/// Filter for a `-v` count when `RUST_LOG` is unset.
///
/// Quiet runs hide the runtime's retry warnings.
fn directives(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "error,eazy_runtime=off",
		1 => "info,eazy_runtime=warn",
		2 => "debug,tokio_tungstenite=info,tungstenite=info",
		_ => "trace",
	}
}

/// Installs the stderr subscriber. `RUST_LOG` wins over `-v`.
///
/// Stdout stays reserved for command output, `watch` lines included.
pub fn init_logging(verbosity: u8) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(verbosity)));

	let installed = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(std::io::stderr().is_terminal())
		.with_target(verbosity > 1)
		.compact()
		.try_init();
	if installed.is_err() {
		tracing::debug!("Subscriber already installed");
	}
}
