use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fanlink_core::DeviceState;
use fanlink_relay::{Relay, config::Config};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "fanlink-relay")]
#[command(about = "Relays LAN fan telemetry to WebSocket subscribers")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "fanlink-relay.toml")]
    config: PathBuf,

    /// Override the UDP ingest address
    #[arg(long)]
    udp_addr: Option<SocketAddr>,

    /// Override the WebSocket listen address
    #[arg(long)]
    ws_addr: Option<SocketAddr>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a device state string and print it as JSON
    Decode {
        /// Comma-separated state string; only the first field is used
        state_string: String,

        #[arg(long)]
        device_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Some(Command::Decode {
        state_string,
        device_id,
    }) = cli.command
    {
        let state = DeviceState::decode(device_id.map(Value::from), &state_string);
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    let mut config = if cli.config.exists() {
        info!(path = ?cli.config, "Loading configuration");
        Config::load(&cli.config)?
    } else {
        info!("No configuration file found, using defaults");
        Config::default()
    };

    if let Some(udp_addr) = cli.udp_addr {
        config.server.udp_addr = udp_addr;
    }
    if let Some(ws_addr) = cli.ws_addr {
        config.server.ws_addr = ws_addr;
    }

    info!(
        udp_addr = %config.server.udp_addr,
        ws_addr = %config.server.ws_addr,
        "Starting relay"
    );

    let relay = Relay::bind(&config).await?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down...");
                shutdown.cancel();
            }
            Err(e) => error!(error = ?e, "failed to listen for Ctrl+C"),
        }
    });

    relay.run(cancel).await?;

    Ok(())
}
