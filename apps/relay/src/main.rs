//! Vigil Relay - headless live-view relay.
//!
//! Resolves a live view for one camera and writes the media segments to a
//! file, or refreshes a camera thumbnail and prints the new image URL.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::broadcast;
use vigil_core::liveview::SinkError;
use vigil_core::{
    bootstrap_services, AccountContext, BootstrappedServices, BroadcastEvent, ConnectionState,
    DeviceType, FileSinkProvider, LiveViewEvent, LoggingEventEmitter, PlaybackSink, SinkProvider,
    StreamTarget,
};

use crate::config::RelayConfig;

/// Time granted to the socket writer to flush the stop frame on exit.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

/// Vigil Relay - headless live view and thumbnail tool for cloud cameras.
#[derive(Parser, Debug)]
#[command(name = "vigil-relay")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "VIGIL_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bearer token (overrides config file).
    #[arg(long, env = "VIGIL_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Account id (overrides config file).
    #[arg(long, env = "VIGIL_ACCOUNT_ID")]
    account_id: Option<u64>,

    /// REST tier (overrides config file).
    #[arg(long, env = "VIGIL_TIER")]
    tier: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream a live view into a file until the camera stops or Ctrl+C.
    Live {
        #[command(flatten)]
        device: DeviceArgs,

        /// Output file for the media segments.
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Refresh a thumbnail and print the URL of the new image.
    Thumbnail {
        #[command(flatten)]
        device: DeviceArgs,
    },
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct DeviceArgs {
    /// Network the device belongs to.
    #[arg(long)]
    network: u64,

    /// Device id.
    #[arg(long)]
    device: u64,

    /// Device type (camera, doorbell, owl).
    #[arg(long = "type", default_value = "camera")]
    device_type: DeviceType,
}

/// Sink provider for commands that never stream.
struct NoSinks;

impl SinkProvider for NoSinks {
    fn create_sink(&self, _target: &StreamTarget) -> Result<Box<dyn PlaybackSink>, SinkError> {
        Err(SinkError::Initialize("no output configured".into()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Vigil Relay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        RelayConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(token) = args.token {
        config.token = Some(token);
    }
    if let Some(account_id) = args.account_id {
        config.account_id = Some(account_id);
    }
    if let Some(tier) = args.tier {
        config.tier = Some(tier);
    }

    let account = config.account()?;
    let core_config = config.to_core_config();

    match args.command {
        Command::Live { device, output } => {
            log::info!("Relaying {} {} to {}", device.device_type, device.device, output.display());
            let services =
                bootstrap(account, &core_config, Arc::new(FileSinkProvider::new(output)))?;

            let mut events = services.event_bridge.subscribe();
            let target = StreamTarget::new(device.network, device.device, device.device_type);
            services
                .live_view
                .start(target)
                .await
                .context("Failed to start live view")?;

            tokio::select! {
                _ = shutdown_signal() => {
                    log::info!("Shutdown signal received, stopping live view...");
                }
                state = wait_for_end(&mut events) => {
                    log::info!("Live view ended ({})", state);
                }
            }

            services.shutdown();
            tokio::time::sleep(SHUTDOWN_GRACE).await;

            let stats = services.live_view.stats();
            log::info!(
                "Appended {} of {} segment(s), {} bytes",
                stats.segments_appended,
                stats.segments_received,
                stats.bytes_appended
            );
            if let Some(error) = services.live_view.last_error() {
                return Err(error).context("Live view failed");
            }
        }
        Command::Thumbnail { device } => {
            let services = bootstrap(account, &core_config, Arc::new(NoSinks))?;
            let url = services
                .commands
                .try_refresh_thumbnail(device.network, device.device, device.device_type)
                .await
                .context("Thumbnail refresh failed")?;
            println!("{}", url);
        }
    }

    log::info!("Shutdown complete");
    Ok(())
}

/// Bootstraps the core services and mirrors every event to the debug log.
fn bootstrap(
    account: AccountContext,
    config: &vigil_core::Config,
    sinks: Arc<dyn SinkProvider>,
) -> Result<BootstrappedServices> {
    let services =
        bootstrap_services(account, config, sinks).context("Failed to bootstrap services")?;
    services
        .event_bridge
        .set_external_emitter(Arc::new(LoggingEventEmitter));
    Ok(services)
}

/// Waits until the live view reaches a terminal state.
async fn wait_for_end(events: &mut broadcast::Receiver<BroadcastEvent>) -> ConnectionState {
    loop {
        match events.recv().await {
            Ok(BroadcastEvent::LiveView(LiveViewEvent::StateChanged { state, .. }))
                if state.is_terminal() =>
            {
                return state;
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::debug!("Event receiver lagged, skipped {} event(s)", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => return ConnectionState::Closed,
        }
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
