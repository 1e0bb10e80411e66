//! Application configuration — persisted as TOML in the host's config directory.
//!
//! Every field has a serde default, so a partial or empty `config.toml` is
//! valid and a missing file yields `AppConfig::default()`.
use crate::pipeline::PipelineConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "config.toml";

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory for the rolling log file. Empty = `<tmp>/device-health/logs`.
    #[serde(default)]
    pub log_dir: PathBuf,

    /// `EnvFilter` directive applied on top of `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Capacity of the record and batch channels between pipeline stages.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Interval for polling producers.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Warn if the first insight batch has not arrived after this long. 0 disables.
    #[serde(default = "default_first_batch_timeout_ms")]
    pub first_batch_timeout_ms: u64,

    /// JSON device report written by the host. Empty disables the file producer.
    #[serde(default)]
    pub report_path: PathBuf,
}

fn default_log_filter() -> String { "device_health_lib=debug".to_owned() }
fn default_channel_capacity() -> usize { 64 }
fn default_poll_interval_ms() -> u64 { 5_000 }
fn default_first_batch_timeout_ms() -> u64 { 10_000 }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_dir:                PathBuf::new(),
            log_filter:             default_log_filter(),
            channel_capacity:       default_channel_capacity(),
            poll_interval_ms:       default_poll_interval_ms(),
            first_batch_timeout_ms: default_first_batch_timeout_ms(),
            report_path:            PathBuf::new(),
        }
    }
}

impl AppConfig {
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            channel_capacity:    self.channel_capacity.max(1),
            first_batch_timeout: (self.first_batch_timeout_ms > 0)
                .then(|| Duration::from_millis(self.first_batch_timeout_ms)),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(100))
    }

    pub fn resolved_log_dir(&self) -> PathBuf {
        if self.log_dir.as_os_str().is_empty() {
            std::env::temp_dir().join("device-health").join("logs")
        } else {
            self.log_dir.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

pub fn load_or_default(config_dir: &Path) -> Result<AppConfig> {
    let path = config_dir.join(CONFIG_FILE);
    if path.exists() {
        let raw = std::fs::read_to_string(&path)?;
        let cfg: AppConfig = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Config parse error: {}", e))?;
        Ok(cfg)
    } else {
        Ok(AppConfig::default())
    }
}

pub fn save(config: &AppConfig, config_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(config_dir)?;
    let raw = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("Config serialize error: {}", e))?;
    std::fs::write(config_dir.join(CONFIG_FILE), raw)?;
    Ok(())
}
