//! signalhub-relay binary: load config, start listeners, stop on signal.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use signalhub_common::ConfigError;
use signalhub_config::{LoggingConfig, RelayConfig};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "signalhub-relay", about = "WebRTC signaling relay for meetings")]
struct Args {
    /// Path to a TOML config file (default: platform config dir).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// WebSocket port to listen on.
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Interface to bind both listeners to.
    #[arg(long, env = "BIND_ADDRESS")]
    bind: Option<String>,

    /// Also serve the status routes on this dedicated port.
    #[arg(long, env = "STATUS_PORT")]
    status_port: Option<u16>,

    /// Disable the HTTP status routes.
    #[arg(long)]
    no_status: bool,
}

impl Args {
    /// Command-line and environment values win over the file.
    fn apply(&self, mut config: RelayConfig) -> Result<RelayConfig, ConfigError> {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(bind) = &self.bind {
            config.server.bind_address = bind.clone();
            config.status.bind_address = bind.clone();
        }
        if let Some(port) = self.status_port {
            config.status.port = Some(port);
        }
        if self.no_status {
            config.status.enabled = false;
        }
        signalhub_config::validation::validate(&config)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let loaded = signalhub_config::load_config(args.config.as_deref())
        .and_then(|config| args.apply(config));

    let directive = match &loaded {
        Ok(config) => config.logging.filter_directive(),
        Err(_) => LoggingConfig::default().filter_directive(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| directive.into()),
        )
        .init();

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        bind = %config.server.bind_address,
        port = config.server.port,
        status_enabled = config.status.enabled,
        status_port = ?config.status.port,
        outbound_queue = config.limits.outbound_queue,
        max_message_bytes = config.limits.max_message_bytes,
        "Configuration loaded"
    );
    tracing::debug!("Effective config:\n{}", signalhub_config::config_to_json(&config));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        signalhub_relay::shutdown_signal().await;
        signal_token.cancel();
    });

    match signalhub_relay::run(&config, shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Relay failed");
            ExitCode::FAILURE
        }
    }
}
