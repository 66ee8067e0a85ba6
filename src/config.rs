//! Configuration for kvdb
//!
//! Centralized configuration with sensible defaults. A record comes from
//! [`Config::default`], the builder, or a YAML file:
//!
//! ```yaml
//! engine:
//!   type: in_memory
//! logger:
//!   level: info          # debug | info | warn | error
//!   output: stdout       # stdout | stderr | <file path>
//!   format: text         # text | json
//! network:
//!   address: 127.0.0.1:3223
//!   max_connections: 100
//!   max_message_size: 4096
//!   idle_timeout_secs: 300
//! ```
//!
//! Every key is optional; missing keys keep their defaults.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{KvError, Result};
use crate::storage::EngineType;

/// Main configuration for a kvdb server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Storage engine backing the database
    pub engine: EngineType,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections (0 = unlimited)
    pub max_connections: usize,

    /// Largest request payload accepted, in bytes
    pub max_message_size: usize,

    /// Close connections that send nothing for this long
    pub idle_timeout: Option<Duration>,

    // -------------------------------------------------------------------------
    // Logging Configuration
    // -------------------------------------------------------------------------
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineType::default(),
            listen_addr: "127.0.0.1:3223".to_string(),
            max_connections: 100,
            max_message_size: 4096,
            idle_timeout: None,
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load configuration from a YAML file
    ///
    /// Missing keys take their defaults; the result is validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            KvError::Config(format!("failed to read config file '{}': {e}", path.display()))
        })?;

        Self::from_yaml_str(&content).map_err(|e| match e {
            KvError::Config(message) => {
                KvError::Config(format!("{message} (in '{}')", path.display()))
            }
            other => other,
        })
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: FileConfig = if content.trim().is_empty() {
            FileConfig::default()
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| KvError::Config(format!("failed to parse config: {e}")))?
        };

        let config = file.apply(Config::default())?;
        config.validate()?;
        Ok(config)
    }

    /// Start a builder from this record, for overriding single fields
    pub fn into_builder(self) -> ConfigBuilder {
        ConfigBuilder { config: self }
    }

    /// Check the record before it is handed to the server
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.trim().is_empty() {
            return Err(KvError::Config("listen address must not be empty".to_string()));
        }

        if self.max_message_size == 0 {
            return Err(KvError::Config("max message size must be non-zero".to_string()));
        }

        // The frame header carries the length as a u32
        if self.max_message_size as u64 > u32::MAX as u64 {
            return Err(KvError::Config(format!(
                "max message size {} exceeds the frame limit of {} bytes",
                self.max_message_size,
                u32::MAX
            )));
        }

        if self.idle_timeout == Some(Duration::ZERO) {
            return Err(KvError::Config("idle timeout must be non-zero".to_string()));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the storage engine
    pub fn engine(mut self, engine: EngineType) -> Self {
        self.config.engine = engine;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the maximum request payload size (in bytes)
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    /// Set the idle connection timeout
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log.level = level;
        self
    }

    pub fn log_output(mut self, output: LogOutput) -> Self {
        self.config.log.output = output;
        self
    }

    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.config.log.format = format;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Where and how verbosely to log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LogLevel,
    pub output: LogOutput,
    pub format: LogFormat,
}

/// Minimum level of events that are emitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = KvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(KvError::Config(format!("unknown log level: {other}"))),
        }
    }
}

/// Log destination
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Append to a file, creating it and its parent directories
    File(PathBuf),
}

impl fmt::Display for LogOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogOutput::Stdout => f.write_str("stdout"),
            LogOutput::Stderr => f.write_str("stderr"),
            LogOutput::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl FromStr for LogOutput {
    type Err = KvError;

    /// `stdout`, `stderr`, or anything else as a file path
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" => Err(KvError::Config("log output must not be empty".to_string())),
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            path => Ok(LogOutput::File(PathBuf::from(path))),
        }
    }
}

/// Log line encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event, with source file and line
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogFormat {
    type Err = KvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(KvError::Config(format!("unknown log format: {other}"))),
        }
    }
}

// =============================================================================
// File Layout
// =============================================================================

/// On-disk shape of the configuration file
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    engine: EngineSection,
    logger: LoggerSection,
    network: NetworkSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct EngineSection {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LoggerSection {
    level: Option<String>,
    output: Option<String>,
    format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct NetworkSection {
    address: Option<String>,
    max_connections: Option<usize>,
    max_message_size: Option<usize>,
    idle_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Overlay the keys present in the file onto `base`
    fn apply(self, base: Config) -> Result<Config> {
        let mut builder = base.into_builder();

        if let Some(kind) = self.engine.kind {
            builder = builder.engine(kind.parse()?);
        }

        if let Some(level) = self.logger.level {
            builder = builder.log_level(level.parse()?);
        }
        if let Some(output) = self.logger.output {
            builder = builder.log_output(output.parse()?);
        }
        if let Some(format) = self.logger.format {
            builder = builder.log_format(format.parse()?);
        }

        if let Some(address) = self.network.address {
            builder = builder.listen_addr(address);
        }
        if let Some(count) = self.network.max_connections {
            builder = builder.max_connections(count);
        }
        if let Some(size) = self.network.max_message_size {
            builder = builder.max_message_size(size);
        }
        if let Some(secs) = self.network.idle_timeout_secs {
            builder = builder.idle_timeout(Some(Duration::from_secs(secs)));
        }

        Ok(builder.build())
    }
}
