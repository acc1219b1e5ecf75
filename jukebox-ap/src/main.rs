//! Jukebox Audio Player (jukebox-ap) - Main entry point
//!
//! Remote-controlled music player: HTTP commands in, one supervised `mpv`
//! process out, live state pushed to every observer over SSE and WebSocket.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use jukebox_ap::api;
use jukebox_ap::config::{Config, Overrides};
use jukebox_ap::control::IpcControlClient;
use jukebox_ap::events::EventBroadcaster;
use jukebox_ap::playback::{EngineParts, PlaybackEngine};
use jukebox_ap::player::MpvLauncher;
use jukebox_ap::resolver::YtDlpResolver;
use jukebox_common::config::{log_config_source, TomlConfig};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for jukebox-ap
#[derive(Parser, Debug)]
#[command(name = "jukebox-ap")]
#[command(about = "Remote-controlled music player")]
#[command(version)]
struct Args {
    /// Config file (defaults to ~/.config/jukebox/config.toml)
    #[arg(short, long, env = "JUKEBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "JUKEBOX_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "JUKEBOX_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "JUKEBOX_LOG_LEVEL")]
    log_level: Option<String>,

    /// Player executable
    #[arg(long, env = "JUKEBOX_PLAYER")]
    player: Option<String>,

    /// Player control socket path
    #[arg(long, env = "JUKEBOX_CONTROL_SOCKET")]
    control_socket: Option<PathBuf>,

    /// Player audio device (empty for the player's default)
    #[arg(long, env = "JUKEBOX_AUDIO_DEVICE")]
    audio_device: Option<String>,

    /// Stream resolver executable
    #[arg(long, env = "JUKEBOX_RESOLVER")]
    resolver: Option<String>,

    /// Playback poll interval in milliseconds
    #[arg(long, env = "JUKEBOX_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    /// Volume at startup (0-100)
    #[arg(long, env = "JUKEBOX_VOLUME")]
    volume: Option<u8>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            port: self.port,
            bind_address: self.bind_address.clone(),
            log_level: self.log_level.clone(),
            player_program: self.player.clone(),
            control_socket: self.control_socket.clone(),
            audio_device: self.audio_device.clone(),
            resolver_program: self.resolver.clone(),
            poll_interval_ms: self.poll_interval_ms,
            initial_volume: self.volume,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (toml, config_source) = TomlConfig::load_with_source(args.config.as_deref())
        .context("Failed to load config file")?;
    let config = Config::build(args.overrides(), toml);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    log_config_source(config_source.as_deref());

    info!(
        "Starting jukebox-ap {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!(
        "Player: {} (socket {}), resolver: {}",
        config.player.program,
        config.player.control_socket.display(),
        config.resolver.program
    );

    // Initialize playback engine
    let broadcaster = EventBroadcaster::new(config.event_buffer);
    let parts = EngineParts {
        launcher: Arc::new(MpvLauncher::new(&config.player)),
        resolver: Arc::new(YtDlpResolver::new(&config.resolver)),
        control: Arc::new(IpcControlClient::new(
            config.player.control_socket.clone(),
            config.player.control_timeout,
        )),
    };
    let engine = PlaybackEngine::new(
        config.engine.clone(),
        config.player.settle_delay,
        parts,
        broadcaster,
    );
    engine
        .start()
        .await
        .context("Failed to start playback engine")?;
    info!("Playback engine initialized");

    let app = api::create_router(api::AppState::new(Arc::clone(&engine), config.port));

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_address))?;
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    engine.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
