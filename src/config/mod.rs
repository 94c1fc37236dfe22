use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

use crate::errors::{AppError, AppResult};
use crate::models::SourceReference;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    /// Named references used when no input is supplied
    #[serde(default)]
    pub presets: Vec<PresetSource>,
}

/// Metadata extraction service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Extractor command; a full path or a name looked up on $PATH
    #[serde(default = "default_extractor_command")]
    pub command: String,
    /// Per-lookup timeout
    #[serde(default = "default_extractor_timeout", with = "duration_serde::duration")]
    pub timeout: Duration,
    /// Extra arguments appended to every invocation
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Hosts accepted as sources; empty accepts every host
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,
}

/// Resolution pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of concurrent lookups
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Number of items dispatched per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Playback session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Start the first item as soon as a session is initialized
    #[serde(default = "default_autoplay")]
    pub autoplay: bool,
    /// Initial engine volume (0-100)
    #[serde(default = "default_volume")]
    pub volume: u8,
}

/// A named reference from the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetSource {
    pub name: String,
    pub url: String,
}

impl PresetSource {
    pub fn to_reference(&self) -> SourceReference {
        SourceReference::new(self.url.clone()).with_title(self.name.clone())
    }
}

fn default_extractor_command() -> String {
    DEFAULT_EXTRACTOR_COMMAND.to_string()
}

fn default_extractor_timeout() -> Duration {
    Duration::from_secs(DEFAULT_EXTRACTOR_TIMEOUT_SECS)
}

fn default_allowed_hosts() -> Vec<String> {
    DEFAULT_ALLOWED_HOSTS.iter().map(|h| h.to_string()).collect()
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_autoplay() -> bool {
    DEFAULT_AUTOPLAY
}

fn default_volume() -> u8 {
    DEFAULT_VOLUME
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            command: default_extractor_command(),
            timeout: default_extractor_timeout(),
            extra_args: Vec::new(),
            allowed_hosts: default_allowed_hosts(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            autoplay: default_autoplay(),
            volume: default_volume(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("pipeline.concurrency must be at least 1".to_string());
        }
        if self.batch_size == 0 {
            return Err("pipeline.batch_size must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Config {
    pub fn load() -> AppResult<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from_file(&config_file)
    }

    pub fn load_from_file(config_file: &str) -> AppResult<Self> {
        if Path::new(config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            let config: Config = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            Ok(default_config)
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        self.pipeline.validate().map_err(AppError::configuration)?;

        if self.playback.volume > MAX_VOLUME {
            return Err(AppError::configuration(format!(
                "playback.volume must be between 0 and {MAX_VOLUME}, got {}",
                self.playback.volume
            )));
        }

        if self.extractor.command.trim().is_empty() {
            return Err(AppError::configuration("extractor.command must not be empty"));
        }

        Ok(())
    }

    /// Preset references in declaration order
    pub fn preset_references(&self) -> Vec<SourceReference> {
        self.presets.iter().map(PresetSource::to_reference).collect()
    }
}
