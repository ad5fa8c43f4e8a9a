//! Configuration management for the ToolsUniverse server.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables or defaults.

use super::error::{Error, Result};
use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Default ceiling on decoded image size (40 megapixels).
pub const DEFAULT_MAX_IMAGE_PIXELS: u64 = 40_000_000;

/// Default ceiling on decoded audio length (20 minutes).
pub const DEFAULT_MAX_AUDIO_SECONDS: u64 = 20 * 60;

/// Largest DFT window the spectrum tool accepts by default.
pub const DEFAULT_MAX_SPECTRUM_WINDOW: usize = 8192;

/// Smallest DFT window the spectrum tool supports.
pub const MIN_SPECTRUM_WINDOW: usize = 64;

/// Main configuration structure for the server.
///
/// This struct contains all configurable aspects of the server, organized
/// by domain for clarity and maintainability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Per-category tool limits.
    pub tools: ToolsConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Security and path validation configuration.
    pub security: SecurityConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Resource ceilings applied by the file-based tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub image: ImageConfig,
    pub audio: AudioConfig,
}

/// Image tool limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Images with more pixels than this are rejected before decoding.
    pub max_pixels: u64,
}

/// Audio tool limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Decoding stops with an error once this many seconds have been read.
    pub max_duration_secs: u64,

    /// Largest window accepted by the spectrum analyzer.
    pub max_spectrum_window: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,

    /// Whether to include timestamps in log output.
    pub with_timestamps: bool,
}

/// Configuration for security and path validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Optional root directory for path operations.
    /// If None, no path restrictions are enforced.
    /// All file reads and writes are validated against this root.
    pub root_path: Option<PathBuf>,

    /// Whether symlinks may be followed.
    /// If true, symlinks are followed and their targets are validated.
    /// If false, any symlink is rejected while a root is configured.
    pub allow_symlinks: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_pixels: DEFAULT_MAX_IMAGE_PIXELS,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: DEFAULT_MAX_AUDIO_SECONDS,
            max_spectrum_window: DEFAULT_MAX_SPECTRUM_WINDOW,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            root_path: None,
            allow_symlinks: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "tools-universe".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            tools: ToolsConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                with_timestamps: true,
            },
            transport: TransportConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `MCP_`.
    /// For example: `MCP_SERVER_NAME`, `MCP_LOG_LEVEL`, `MCP_MAX_IMAGE_PIXELS`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Some(timestamps) = parse_env::<bool>("MCP_LOG_TIMESTAMPS") {
            config.logging.with_timestamps = timestamps;
        }

        config.transport = TransportConfig::from_env();

        if let Some(max_pixels) = parse_env::<u64>("MCP_MAX_IMAGE_PIXELS") {
            config.tools.image.max_pixels = max_pixels;
            info!("Image pixel limit: {}", max_pixels);
        }

        if let Some(max_secs) = parse_env::<u64>("MCP_MAX_AUDIO_SECONDS") {
            config.tools.audio.max_duration_secs = max_secs;
            info!("Audio duration limit: {}s", max_secs);
        }

        if let Some(window) = parse_env::<usize>("MCP_MAX_SPECTRUM_WINDOW") {
            config.tools.audio.max_spectrum_window = window;
        }

        if let Ok(root_path) = std::env::var("MCP_ROOT_PATH") {
            config.security.root_path = Some(PathBuf::from(root_path));
            info!("Path security enabled: root directory set to {:?}", config.security.root_path);
        } else {
            warn!(
                "MCP_ROOT_PATH not set - no path restrictions active. \
                 All filesystem paths will be allowed."
            );
        }

        if let Ok(allow_symlinks) = std::env::var("MCP_ALLOW_SYMLINKS") {
            config.security.allow_symlinks = allow_symlinks.parse().unwrap_or(true);
            info!("Symlinks allowed: {}", config.security.allow_symlinks);
        }

        config
    }

    /// Reject limits the tools cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.tools.image.max_pixels == 0 {
            return Err(Error::config("MCP_MAX_IMAGE_PIXELS must be positive"));
        }
        if self.tools.audio.max_duration_secs == 0 {
            return Err(Error::config("MCP_MAX_AUDIO_SECONDS must be positive"));
        }
        let window = self.tools.audio.max_spectrum_window;
        if window < MIN_SPECTRUM_WINDOW || !window.is_power_of_two() {
            return Err(Error::config(format!(
                "MCP_MAX_SPECTRUM_WINDOW must be a power of two >= {}, got {}",
                MIN_SPECTRUM_WINDOW, window
            )));
        }
        match &self.security.root_path {
            Some(root) if !root.is_dir() => Err(Error::config(format!(
                "MCP_ROOT_PATH is not a directory: {}",
                root.display()
            ))),
            _ => Ok(()),
        }
    }
}

/// Parse an environment variable, ignoring (and logging) bad values.
pub(crate) fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}
