//! Tracing setup. Daemons log to stdout for the service manager to capture,
//! so unlike a desktop CLI there's no file appender or format switch here.

use std::env;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes the global tracing subscriber.
///
/// `UPOWERD_LOG` (an `EnvFilter` directive string) takes precedence; `-v`
/// bumps the default level once per occurrence when it isn't set.
///
/// # Errors
/// Returns an error if a subscriber is already installed.
pub fn init(verbosity: u8) -> Result<(), Box<dyn std::error::Error>> {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = env::var("UPOWERD_LOG")
        .ok()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_level(true))
        .try_init()?;

    Ok(())
}
