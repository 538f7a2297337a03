//! Core configuration structures and loading logic

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file
    Io(std::io::Error),
    /// TOML parsing error
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Listen address of the webhook server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Host to bind (default all interfaces)
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind (default 8080)
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Filesystem locations shared with the recorder
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    /// Recorder work directory; relative recording paths resolve against it
    #[serde(default = "default_dir")]
    pub base_dir: PathBuf,
    /// Directory holding the recorder's own `bilirec*.txt` logs
    #[serde(default = "default_dir")]
    pub log_dir: PathBuf,
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_dir: default_dir(),
            log_dir: default_dir(),
        }
    }
}

/// Bot endpoint that receives room notifications
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotifyConfig {
    #[serde(default = "default_bot_api")]
    pub bot_api: String,
}

fn default_bot_api() -> String {
    "http://localhost:8888".to_string()
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            bot_api: default_bot_api(),
        }
    }
}

/// External transcoder settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscodeConfig {
    /// Transcoder executable (resolved through PATH when bare)
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub transcode: TranscodeConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Parses the config file and handles missing optional fields with defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Overrides the following values if environment variables are set:
    /// - BILIREC_HOST -> server.host
    /// - BILIREC_PORT -> server.port
    /// - BILIREC_BASE_DIR -> paths.base_dir
    /// - BILIREC_LOG_DIR -> paths.log_dir
    /// - BILIREC_BOT_API -> notify.bot_api
    /// - BILIREC_FFMPEG -> transcode.ffmpeg_path
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("BILIREC_HOST") {
            self.server.host = val;
        }

        if let Ok(val) = env::var("BILIREC_PORT") {
            if let Ok(port) = val.parse::<u16>() {
                self.server.port = port;
            }
        }

        if let Ok(val) = env::var("BILIREC_BASE_DIR") {
            self.paths.base_dir = PathBuf::from(val);
        }

        if let Ok(val) = env::var("BILIREC_LOG_DIR") {
            self.paths.log_dir = PathBuf::from(val);
        }

        if let Ok(val) = env::var("BILIREC_BOT_API") {
            self.notify.bot_api = val;
        }

        if let Ok(val) = env::var("BILIREC_FFMPEG") {
            self.transcode.ffmpeg_path = PathBuf::from(val);
        }
    }

    /// Load configuration from file and apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a config file
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// `host:port` string suitable for binding
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Directory receiving one diagnostic report per transcoder run
    pub fn ffmpeg_log_dir(&self) -> PathBuf {
        self.paths.base_dir.join("ffmpeg-logs")
    }
}
