use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;

/// Storage backend configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (no persistence)
    #[serde(rename = "memory")]
    Memory,

    /// SQLite database (default for most deployments)
    Sqlite {
        /// Path to the SQLite database file
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./telemetry.db")
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Targets used to seed the in-memory directory.
    pub targets: Option<Vec<TargetConfig>>,

    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub writer: WriterConfig,

    #[serde(default)]
    pub channels: ChannelConfig,

    /// Storage configuration (optional - defaults to SQLite)
    pub storage: Option<StorageConfig>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct TargetConfig {
    pub id: String,
    pub url: String,
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u32,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct DispatcherConfig {
    /// Seconds between dispatch ticks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_seconds: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: default_tick_interval(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProbeConfig {
    /// Per-probe timeout in seconds. A probe exceeding this is cancelled
    /// and recorded as a transport failure.
    #[serde(default = "default_probe_timeout")]
    pub timeout_seconds: u64,

    /// Number of concurrent probe workers.
    #[serde(default = "default_probe_workers")]
    pub workers: usize,
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_probe_timeout(),
            workers: default_probe_workers(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct WriterConfig {
    /// Number of concurrent writer consumers.
    #[serde(default = "default_writer_pool")]
    pub pool_size: usize,

    /// Write attempts against the store before a result is dead-lettered.
    #[serde(default = "default_write_attempts")]
    pub write_attempts: u32,

    /// Base backoff between write attempts, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl WriterConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            pool_size: default_writer_pool(),
            write_attempts: default_write_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ChannelConfig {
    /// Bound on queued messages per channel.
    #[serde(default = "default_channel_capacity")]
    pub capacity: usize,

    /// Seconds before an unacked delivery becomes visible again.
    #[serde(default = "default_visibility_timeout")]
    pub visibility_timeout_seconds: u64,
}

impl ChannelConfig {
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_seconds)
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: default_channel_capacity(),
            visibility_timeout_seconds: default_visibility_timeout(),
        }
    }
}

fn default_check_interval() -> u32 {
    60
}

fn default_tick_interval() -> u64 {
    10
}

fn default_probe_timeout() -> u64 {
    10
}

fn default_probe_workers() -> usize {
    8
}

fn default_writer_pool() -> usize {
    2
}

fn default_write_attempts() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    200
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_visibility_timeout() -> u64 {
    30
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
