use color_eyre::eyre::{Result, eyre};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level follows the `-v` count
/// (`info`, then `debug`, `trace`).
pub fn init(verbosity: u8) -> Result<()> {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity > 0)
        .compact();

    let filter_layer =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| eyre!("Failed to initialize logging: {e}"))
}
