mod bridge;
mod cli;
mod error;
mod mqtt;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use nexa_core::Orchestrator;

use crate::cli::Cli;
use crate::error::BridgeError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), BridgeError> {
    let config = nexa_config::load(cli.config.as_deref())?;

    if cli.print_config {
        print!("{}", config.to_redacted_toml()?);
        return Ok(());
    }

    init_tracing(cli.log_filter(&config.log_level));

    let sync = config.to_sync_config()?;
    let mqtt = config.mqtt_settings()?;
    if cli.check {
        println!("configuration ok");
        return Ok(());
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        api_mode = %sync.api_mode,
        broker = %mqtt.host,
        "starting nexa-mqtt"
    );

    let orchestrator = Orchestrator::from_config(&sync)?;
    orchestrator.login().await?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_signal().await;
            info!("signal received");
            shutdown.cancel();
        }
    });

    bridge::run(orchestrator, &mqtt, shutdown).await
}

/// SIGINT or SIGTERM.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "could not listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
