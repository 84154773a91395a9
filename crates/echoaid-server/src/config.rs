//! Server configuration loading from file and environment variables.

use echoaid_voice::ProviderConfig;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Upstream speech, generation and synthesis providers.
    #[serde(default)]
    pub providers: ProviderConfig,

    /// Output and static asset directories.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "echoaid_voice=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Where synthesized replies and client assets live.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory synthesized replies are written to, served at `/audio`.
    #[serde(default = "default_audio_dir")]
    pub audio_dir: String,

    /// Directory holding the browser client, served as the fallback.
    #[serde(default = "default_client_dir")]
    pub client_dir: String,

    /// Age in seconds after which generated audio is deleted. 0 keeps files forever.
    #[serde(default = "default_audio_retention_seconds")]
    pub audio_retention_seconds: u64,

    /// Seconds between retention sweeps.
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,

    /// Body limit for `/process-audio` uploads.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_audio_dir() -> String {
    "data/audio".to_string()
}

fn default_client_dir() -> String {
    "client".to_string()
}

fn default_audio_retention_seconds() -> u64 {
    3600
}

fn default_sweep_interval_seconds() -> u64 {
    300
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            audio_dir: default_audio_dir(),
            client_dir: default_client_dir(),
            audio_retention_seconds: default_audio_retention_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required secret is absent from both the file and the environment.
    #[error("missing required secret: set {0}")]
    MissingSecret(&'static str),

    /// The `.env` file exists but could not be read or parsed.
    #[error("failed to load env file: {0}")]
    EnvFile(#[from] dotenvy::Error),

    /// A value is present but unusable.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `ECHOAID_HOST` overrides `server.host`
/// - `ECHOAID_PORT` overrides `server.port`
/// - `ECHOAID_LOG_LEVEL` overrides `logging.level`
/// - `ECHOAID_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `ECHOAID_AUDIO_DIR` overrides `storage.audio_dir`
/// - `ECHOAID_CLIENT_DIR` overrides `storage.client_dir`
/// - `ECHOAID_AUDIO_RETENTION_SECONDS` overrides `storage.audio_retention_seconds`
/// - `ELEVENLABS_API_KEY` overrides `providers.elevenlabs_api_key`
/// - `GEMINI_API_KEY` overrides `providers.gemini_api_key`
/// - `ELEVENLABS_BASE_URL` overrides `providers.elevenlabs_base_url`
/// - `GEMINI_BASE_URL` overrides `providers.gemini_base_url`
/// - `GEMINI_MODEL` overrides `providers.gemini_model`
/// - `ECHOAID_VOICE_ID` overrides `providers.voice_id`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if either provider key is missing after overrides are applied.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    let config = apply_env_overrides(config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

/// Loads a `.env` file into the process environment.
///
/// With no `path`, `.env` is searched for in the working directory and its
/// ancestors. Variables already set in the environment are kept. Returns the
/// loaded file, or `None` when there is no file to load.
///
/// # Errors
///
/// Returns `ConfigError::EnvFile` if the file exists but is unreadable or
/// malformed.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    let loaded = match path {
        Some(p) => dotenvy::from_path(p).map(|()| p.to_path_buf()),
        None => dotenvy::dotenv(),
    };
    match loaded {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(ConfigError::EnvFile(e)),
    }
}

/// Applies environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("ECHOAID_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("ECHOAID_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(level) = lookup("ECHOAID_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("ECHOAID_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(dir) = lookup("ECHOAID_AUDIO_DIR") {
        config.storage.audio_dir = dir;
    }
    if let Some(dir) = lookup("ECHOAID_CLIENT_DIR") {
        config.storage.client_dir = dir;
    }
    if let Some(secs) = lookup("ECHOAID_AUDIO_RETENTION_SECONDS") {
        if let Ok(parsed) = secs.parse() {
            config.storage.audio_retention_seconds = parsed;
        }
    }
    if let Some(key) = lookup("ELEVENLABS_API_KEY") {
        config.providers.elevenlabs_api_key = key;
    }
    if let Some(key) = lookup("GEMINI_API_KEY") {
        config.providers.gemini_api_key = key;
    }
    if let Some(url) = lookup("ELEVENLABS_BASE_URL") {
        config.providers.elevenlabs_base_url = url;
    }
    if let Some(url) = lookup("GEMINI_BASE_URL") {
        config.providers.gemini_base_url = url;
    }
    if let Some(model) = lookup("GEMINI_MODEL") {
        config.providers.gemini_model = model;
    }
    if let Some(voice) = lookup("ECHOAID_VOICE_ID") {
        config.providers.voice_id = voice;
    }

    config
}

/// Checks that the configuration can start a server.
///
/// # Errors
///
/// Returns `ConfigError::MissingSecret` for an absent provider key and
/// `ConfigError::Invalid` for unusable storage settings.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.providers.elevenlabs_api_key.trim().is_empty() {
        return Err(ConfigError::MissingSecret("ELEVENLABS_API_KEY"));
    }
    if config.providers.gemini_api_key.trim().is_empty() {
        return Err(ConfigError::MissingSecret("GEMINI_API_KEY"));
    }
    if config.storage.audio_dir.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "storage.audio_dir must not be empty".to_string(),
        ));
    }
    if config.storage.audio_retention_seconds > 0 && config.storage.sweep_interval_seconds == 0 {
        return Err(ConfigError::Invalid(
            "storage.sweep_interval_seconds must be positive when retention is enabled"
                .to_string(),
        ));
    }
    Ok(())
}
