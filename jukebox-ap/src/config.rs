//! jukebox-ap specific configuration
//!
//! Built once at startup from command-line arguments (which carry their own
//! environment fallbacks) layered over `config.toml` and compiled defaults.

use jukebox_common::config::{resolve, TomlConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Compiled defaults
pub mod defaults {
    pub const PORT: u16 = 3000;
    pub const BIND_ADDRESS: &str = "0.0.0.0";
    pub const LOG_LEVEL: &str = "jukebox_ap=debug,tower_http=debug";
    pub const PLAYER_PROGRAM: &str = "mpv";
    pub const CONTROL_SOCKET: &str = "/tmp/mpv-socket";
    pub const AUDIO_DEVICE: &str = "pulse";
    pub const RESOLVER_PROGRAM: &str = "yt-dlp";
    pub const RESOLVER_TIMEOUT_MS: u64 = 30_000;
    pub const CONTROL_TIMEOUT_MS: u64 = 1_000;
    pub const POLL_INTERVAL_MS: u64 = 500;
    /// Lower bound; a zero period cannot drive a timer
    pub const MIN_POLL_INTERVAL_MS: u64 = 1;
    pub const SETTLE_DELAY_MS: u64 = 200;
    pub const INITIAL_VOLUME: u8 = 100;
    pub const EVENT_BUFFER: usize = 100;
}

/// Values supplied on the command line or through `JUKEBOX_*` variables
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub log_level: Option<String>,
    pub player_program: Option<String>,
    pub control_socket: Option<PathBuf>,
    pub audio_device: Option<String>,
    pub resolver_program: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub initial_volume: Option<u8>,
}

/// Audio Player configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bind_address: String,
    pub log_level: String,
    pub player: PlayerConfig,
    pub resolver: ResolverConfig,
    pub engine: EngineConfig,
    /// Broadcast channel capacity for observer events
    pub event_buffer: usize,
}

/// External player process settings
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Executable; its file name is also the orphan-sweep pattern
    pub program: String,
    /// Fixed local control-channel address passed to every player
    pub control_socket: PathBuf,
    /// `--audio-device` value; empty disables the flag
    pub audio_device: Option<String>,
    /// Wait after the orphan sweep before a replacement may start
    pub settle_delay: Duration,
    /// Bound on a single control-channel round trip
    pub control_timeout: Duration,
}

/// External resolver settings
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub program: String,
    pub timeout: Duration,
}

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub poll_interval: Duration,
    pub initial_volume: u8,
}

impl Config {
    /// Merge overrides, TOML values and compiled defaults
    pub fn build(overrides: Overrides, toml: TomlConfig) -> Self {
        let audio_device = resolve(
            overrides.audio_device,
            toml.audio_device,
            defaults::AUDIO_DEVICE.to_string(),
        );

        Self {
            port: resolve(overrides.port, toml.port, defaults::PORT),
            bind_address: resolve(
                overrides.bind_address,
                toml.bind_address,
                defaults::BIND_ADDRESS.to_string(),
            ),
            log_level: resolve(
                overrides.log_level,
                toml.log_level,
                defaults::LOG_LEVEL.to_string(),
            ),
            player: PlayerConfig {
                program: resolve(
                    overrides.player_program,
                    toml.player_program,
                    defaults::PLAYER_PROGRAM.to_string(),
                ),
                control_socket: resolve(
                    overrides.control_socket,
                    toml.control_socket,
                    PathBuf::from(defaults::CONTROL_SOCKET),
                ),
                audio_device: if audio_device.is_empty() {
                    None
                } else {
                    Some(audio_device)
                },
                settle_delay: Duration::from_millis(
                    toml.settle_delay_ms.unwrap_or(defaults::SETTLE_DELAY_MS),
                ),
                control_timeout: Duration::from_millis(
                    toml.control_timeout_ms.unwrap_or(defaults::CONTROL_TIMEOUT_MS),
                ),
            },
            resolver: ResolverConfig {
                program: resolve(
                    overrides.resolver_program,
                    toml.resolver_program,
                    defaults::RESOLVER_PROGRAM.to_string(),
                ),
                timeout: Duration::from_millis(
                    toml.resolver_timeout_ms.unwrap_or(defaults::RESOLVER_TIMEOUT_MS),
                ),
            },
            engine: EngineConfig {
                poll_interval: Duration::from_millis(resolve(
                    overrides.poll_interval_ms,
                    toml.poll_interval_ms,
                    defaults::POLL_INTERVAL_MS,
                )
                .max(defaults::MIN_POLL_INTERVAL_MS)),
                initial_volume: resolve(
                    overrides.initial_volume,
                    toml.initial_volume,
                    defaults::INITIAL_VOLUME,
                )
                .min(100),
            },
            event_buffer: toml.event_buffer.unwrap_or(defaults::EVENT_BUFFER),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::build(Overrides::default(), TomlConfig::default())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Config::default().engine
    }
}
