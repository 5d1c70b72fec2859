//! Entry point: parse flags, initialize tracing, load configuration, bring
//! up the bus, coldplug every source, then run until shutdown.

mod cli;
mod logging;
mod sources;

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use upowerd_daemon::Daemon;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    if let Err(err) = logging::init(cli.verbose) {
        eprintln!("failed to initialize logging: {err}");
    }

    let config = match upowerd_config::Config::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "failed to load configuration");
            return ExitCode::from(1);
        }
    };

    let exit_policy = cli.exit_policy();
    let sources = sources::platform_sources();

    let mut daemon = match Daemon::init(config, sources, exit_policy, cli.replace).await {
        Ok(daemon) => daemon,
        Err(err @ upowerd_daemon::Error::Bus(_)) => {
            tracing::error!(%err, "failed to acquire the bus");
            return ExitCode::from(2);
        }
        Err(err) => {
            tracing::error!(%err, "failed to initialize daemon");
            return ExitCode::from(1);
        }
    };

    if let Err(err) = daemon.coldplug().await {
        tracing::error!(%err, "initial coldplug enumeration failed");
        return ExitCode::from(1);
    }

    let shutdown = CancellationToken::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_shutdown.cancel();
        }
    });

    if let Err(err) = daemon.run(shutdown).await {
        tracing::error!(%err, "daemon run loop exited with an error");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}
